//! Catalogue of the web services this crate can authenticate against.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::WsError;

/// A target web service, identified by its internal key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Service {
    /// Electronic invoicing with item detail (MTXCA).
    Wsmtxca,
    /// Electronic invoicing (FEv1).
    Wsfe,
    /// Taxpayer registry, level 3 lookups.
    Wspn3,
}

impl Service {
    pub const ALL: [Service; 3] = [Service::Wsmtxca, Service::Wsfe, Service::Wspn3];

    /// Internal key, used in file names and configuration tables.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Wsmtxca => "wsmtxca",
            Self::Wsfe => "wsfe",
            Self::Wspn3 => "wspn3",
        }
    }

    /// Service name the authentication endpoint expects in a ticket request.
    pub fn canonical_name(&self) -> &'static str {
        match self {
            Self::Wsmtxca => "wsmtxca",
            Self::Wsfe => "wsfe",
            Self::Wspn3 => "padron-puc-ws",
        }
    }

    /// SOAP description used to bind a connection to this service.
    pub fn endpoint_description(&self) -> EndpointDescription {
        match self {
            Self::Wsmtxca => EndpointDescription {
                name: "wsmtxca",
                namespace: "http://impl.service.wsmtxca.afip.gov.ar/service/",
                action_prefix: "",
            },
            Self::Wsfe => EndpointDescription {
                name: "wsfe",
                namespace: "http://ar.gov.afip.dif.FEV1/",
                action_prefix: "http://ar.gov.afip.dif.FEV1/",
            },
            Self::Wspn3 => EndpointDescription {
                name: "wspn3",
                namespace: "http://a3.soap.ws.server.puc.sr/",
                action_prefix: "",
            },
        }
    }

    /// Operation answering with the infrastructure status of the service.
    pub fn status_operation(&self) -> &'static str {
        match self {
            Self::Wsfe => "FEDummy",
            Self::Wsmtxca | Self::Wspn3 => "dummy",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Service {
    type Err = WsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|service| service.key() == s)
            .ok_or_else(|| WsError::configuration(format!("unknown service: {s}")))
    }
}

/// Minimal protocol description of a SOAP endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointDescription {
    /// Short name used in logs and metrics.
    pub name: &'static str,
    /// Target namespace of the service operations.
    pub namespace: &'static str,
    /// Prepended to the operation name to form the SOAP action. ASMX services
    /// route on the full action; the Axis and CXF ones accept the bare name.
    pub action_prefix: &'static str,
}

impl EndpointDescription {
    /// SOAP action sent with `operation`.
    pub fn soap_action(&self, operation: &str) -> String {
        format!("{}{operation}", self.action_prefix)
    }
}

/// The authentication service (WSAA) itself.
pub const WSAA: EndpointDescription = EndpointDescription {
    name: "wsaa",
    namespace: "http://wsaa.view.sua.dvadac.desein.afip.gov",
    action_prefix: "",
};
