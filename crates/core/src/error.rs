//! Crate-level error type.

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::signer::SigningError;
use crate::soap::TransportError;
use crate::store::StoreError;
use crate::xml::XmlError;

/// Errors surfaced to callers of the renewal orchestrator and service connector.
#[derive(Debug, Error)]
pub enum WsError {
    /// Missing or unreadable certificate, key, ticket or storage path.
    #[error("Cannot access {path}: {reason}")]
    FileAccess { path: PathBuf, reason: String },

    /// The signing primitive failed.
    #[error("Signing failed: {0}")]
    Signing(#[from] SigningError),

    /// The remote service answered with a SOAP fault.
    #[error("SOAP fault [{code}]: {message}")]
    TransportFault { code: String, message: String },

    /// The remote service could not be reached.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Unknown service, missing endpoint mapping or invalid settings.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A document could not be produced or parsed.
    #[error(transparent)]
    Xml(#[from] XmlError),

    /// A stored access ticket lacks required fields.
    #[error("Malformed access ticket {path}: {reason}")]
    MalformedTicket { path: PathBuf, reason: String },

    /// A remote response lacks the expected payload.
    #[error("Unexpected response to {operation}: {reason}")]
    MalformedResponse { operation: String, reason: String },

    /// The liveness probe reported a degraded subsystem.
    #[error("Service {service} is degraded: {details}")]
    ServiceDegraded { service: String, details: String },
}

impl WsError {
    pub fn file_access(path: impl AsRef<Path>, reason: impl Into<String>) -> Self {
        Self::FileAccess {
            path: path.as_ref().to_path_buf(),
            reason: reason.into(),
        }
    }

    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration(reason.into())
    }

    pub fn malformed_response(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedResponse {
            operation: operation.into(),
            reason: reason.into(),
        }
    }
}

impl From<StoreError> for WsError {
    fn from(err: StoreError) -> Self {
        let reason = match &err {
            StoreError::NotFound { .. } => "not found".to_string(),
            StoreError::Io { source, .. } => source.to_string(),
        };
        Self::FileAccess {
            path: err.path().to_path_buf(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_maps_to_file_access() {
        let err: WsError = StoreError::NotFound {
            path: PathBuf::from("/tmp/TA-1-wsfe.xml"),
        }
        .into();

        match err {
            WsError::FileAccess { path, reason } => {
                assert_eq!(path, PathBuf::from("/tmp/TA-1-wsfe.xml"));
                assert_eq!(reason, "not found");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_fault_display() {
        let err = WsError::TransportFault {
            code: "ns1:coe.alreadyAuthenticated".to_string(),
            message: "El CEE ya posee un TA valido".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "SOAP fault [ns1:coe.alreadyAuthenticated]: El CEE ya posee un TA valido"
        );
    }
}
