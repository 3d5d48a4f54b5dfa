//! `loginCms` client for the authentication service.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::WsError;
use crate::soap::{SoapOutcome, SoapParam, SoapTransport};
use crate::store::TicketStore;
use crate::ticket::{LOGIN_REQUEST_AUDIT, LOGIN_RESPONSE_AUDIT};

/// Login operation of the authentication service.
pub const LOGIN_OPERATION: &str = "loginCms";

const LOGIN_PARAM: &str = "in0";
const LOGIN_RESULT: &str = "loginCmsReturn";

/// Client for the `loginCms` operation.
///
/// Owns the transport it was built with; every exchange is copied to the
/// tickets directory for audit.
pub struct AuthServiceClient {
    transport: Box<dyn SoapTransport>,
    store: Arc<dyn TicketStore>,
    tickets_dir: PathBuf,
}

impl AuthServiceClient {
    pub fn new(
        transport: Box<dyn SoapTransport>,
        store: Arc<dyn TicketStore>,
        tickets_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            transport,
            store,
            tickets_dir: tickets_dir.into(),
        }
    }

    pub fn location(&self) -> &str {
        self.transport.location()
    }

    /// Submit a signed envelope and return the issued ticket document as text.
    pub async fn login_cms(&self, cms: &str) -> Result<String, WsError> {
        debug!(location = self.transport.location(), "Submitting login request");

        let result = self
            .transport
            .invoke(LOGIN_OPERATION, &[SoapParam::text(LOGIN_PARAM, cms)])
            .await;
        self.write_audit();

        match result? {
            SoapOutcome::Fault(fault) => {
                warn!(code = %fault.code, message = %fault.message, "Login rejected");
                Err(WsError::TransportFault {
                    code: fault.code,
                    message: fault.message,
                })
            }
            SoapOutcome::Response(body) => body.text(LOGIN_RESULT)?.ok_or_else(|| {
                WsError::malformed_response(LOGIN_OPERATION, format!("missing {LOGIN_RESULT}"))
            }),
        }
    }

    fn write_audit(&self) {
        let Some(exchange) = self.transport.last_exchange() else {
            return;
        };

        for (name, content) in [
            (LOGIN_REQUEST_AUDIT, &exchange.request),
            (LOGIN_RESPONSE_AUDIT, &exchange.response),
        ] {
            let path = self.tickets_dir.join(name);
            if let Err(e) = self.store.put(&path, content) {
                warn!(path = %path.display(), error = %e, "Failed to write login audit copy");
            }
        }
    }
}
