//! Ticket documents: the login request (TRA) and the issued access ticket (TA).
//!
//! File names follow the layout used by existing ticket caches:
//! `TRA-<service>.xml`, `TA-<cuit>-<service>.xml` and the audit copies of the
//! last login exchange.

mod access;
mod request;

pub use access::AccessTicket;
pub use request::{TicketRequest, TicketRequestBuilder, REQUEST_VALIDITY};

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::service::Service;

/// Audit copy of the last outgoing login request.
pub const LOGIN_REQUEST_AUDIT: &str = "request-loginCms.xml";

/// Audit copy of the last login response.
pub const LOGIN_RESPONSE_AUDIT: &str = "response-loginCms.xml";

/// Taxpayer identity tickets are issued for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    /// Taxpayer id (CUIT).
    pub cuit: String,
    /// Whether the homologation (sandbox) environment is targeted.
    pub sandbox: bool,
}

impl Identity {
    pub fn new(cuit: impl Into<String>, sandbox: bool) -> Self {
        Self {
            cuit: cuit.into(),
            sandbox,
        }
    }
}

/// Path of the request document for `service`.
pub fn request_path(dir: &Path, service: Service) -> PathBuf {
    dir.join(format!("TRA-{}.xml", service.key()))
}

/// Path of the access ticket for `(service, identity)`.
pub fn access_ticket_path(dir: &Path, identity: &Identity, service: Service) -> PathBuf {
    dir.join(format!("TA-{}-{}.xml", identity.cuit, service.key()))
}
