//! Liveness probe through each service's status operation.

use serde::Serialize;

use crate::error::WsError;
use crate::service::Service;
use crate::soap::{SoapBody, SoapOutcome, SoapTransport};
use crate::xml::XmlError;

/// Subsystem states reported by a status operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ServiceStatus {
    pub app_server: Option<String>,
    pub db_server: Option<String>,
    pub auth_server: Option<String>,
}

impl ServiceStatus {
    pub fn from_body(body: &SoapBody) -> Result<Self, XmlError> {
        Ok(Self {
            app_server: body.text("AppServer")?,
            db_server: body.text("DbServer")?,
            auth_server: body.text("AuthServer")?,
        })
    }

    fn entries(&self) -> [(&'static str, Option<&str>); 3] {
        [
            ("AppServer", self.app_server.as_deref()),
            ("DbServer", self.db_server.as_deref()),
            ("AuthServer", self.auth_server.as_deref()),
        ]
    }

    /// Every subsystem reported and `OK`.
    pub fn is_healthy(&self) -> bool {
        self.entries()
            .into_iter()
            .all(|(_, state)| state.is_some_and(|s| s.trim().eq_ignore_ascii_case("ok")))
    }

    /// `AppServer=OK, DbServer=?, AuthServer=ERROR`
    pub fn describe(&self) -> String {
        self.entries()
            .into_iter()
            .map(|(name, state)| format!("{name}={}", state.unwrap_or("?")))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Call the status operation of `service` and require a healthy answer.
pub async fn probe(
    transport: &dyn SoapTransport,
    service: Service,
) -> Result<ServiceStatus, WsError> {
    let operation = service.status_operation();
    let body = match transport.invoke(operation, &[]).await? {
        SoapOutcome::Response(body) => body,
        SoapOutcome::Fault(fault) => {
            return Err(WsError::TransportFault {
                code: fault.code,
                message: fault.message,
            })
        }
    };

    let status = ServiceStatus::from_body(&body)?;
    if !status.is_healthy() {
        return Err(WsError::ServiceDegraded {
            service: service.key().to_string(),
            details: status.describe(),
        });
    }
    Ok(status)
}
