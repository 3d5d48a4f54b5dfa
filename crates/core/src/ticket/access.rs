//! Access ticket (TA) issued by the authentication service.

use std::path::Path;

use chrono::{DateTime, FixedOffset, Utc};

use crate::error::WsError;
use crate::xml::text_at;

/// Credentials issued for one `(service, identity)` pair.
///
/// Only the fields the lifecycle needs are extracted; the full document is
/// kept untouched in [`AccessTicket::raw`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessTicket {
    pub token: String,
    pub sign: String,
    pub expiration_time: DateTime<FixedOffset>,
    raw: Vec<u8>,
}

impl AccessTicket {
    /// Parse a stored ticket. `path` is only used for error context.
    pub fn parse(path: &Path, raw: &[u8]) -> Result<Self, WsError> {
        let malformed = |reason: String| WsError::MalformedTicket {
            path: path.to_path_buf(),
            reason,
        };

        let document = std::str::from_utf8(raw).map_err(|e| malformed(e.to_string()))?;
        let field = |nodes: &[&str]| -> Result<String, WsError> {
            text_at(document, nodes)
                .map_err(|e| malformed(e.to_string()))?
                .ok_or_else(|| malformed(format!("missing {}", nodes.join("."))))
        };

        let token = field(&["credentials", "token"])?;
        let sign = field(&["credentials", "sign"])?;
        let expiration = field(&["header", "expirationTime"])?;
        let expiration_time = DateTime::parse_from_rfc3339(expiration.trim())
            .map_err(|e| malformed(format!("invalid expirationTime {expiration:?}: {e}")))?;

        Ok(Self {
            token,
            sign,
            expiration_time,
            raw: raw.to_vec(),
        })
    }

    /// Whether the ticket expired before `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiration_time < now
    }

    /// The document as issued, including fields this crate does not interpret.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;
    use chrono::TimeZone;

    fn path() -> &'static Path {
        Path::new("/tickets/TA-30000000007-wsfe.xml")
    }

    #[test]
    fn test_parse_ticket() {
        let raw = fixtures::access_ticket("T1", "S1", "2024-03-01T22:00:00.000-03:00");

        let ticket = AccessTicket::parse(path(), raw.as_bytes()).unwrap();

        assert_eq!(ticket.token, "T1");
        assert_eq!(ticket.sign, "S1");
        assert_eq!(
            ticket.expiration_time.with_timezone(&Utc),
            Utc.with_ymd_and_hms(2024, 3, 2, 1, 0, 0).unwrap()
        );
        assert_eq!(ticket.raw(), raw.as_bytes());
    }

    #[test]
    fn test_expiration_compares_instants() {
        let raw = fixtures::access_ticket("T1", "S1", "2024-03-01T22:00:00-03:00");
        let ticket = AccessTicket::parse(path(), raw.as_bytes()).unwrap();

        // 00:59 UTC is 21:59 local: still valid.
        assert!(!ticket.is_expired(Utc.with_ymd_and_hms(2024, 3, 2, 0, 59, 0).unwrap()));
        assert!(ticket.is_expired(Utc.with_ymd_and_hms(2024, 3, 2, 1, 0, 1).unwrap()));
    }

    #[test]
    fn test_missing_credentials() {
        let raw = r#"<loginTicketResponse><header><expirationTime>2024-03-01T22:00:00-03:00</expirationTime></header></loginTicketResponse>"#;

        let err = AccessTicket::parse(path(), raw.as_bytes()).unwrap_err();

        match err {
            WsError::MalformedTicket { reason, .. } => assert_eq!(reason, "missing credentials.token"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_expiration() {
        let raw = fixtures::access_ticket("T1", "S1", "tomorrow");
        assert!(matches!(
            AccessTicket::parse(path(), raw.as_bytes()),
            Err(WsError::MalformedTicket { .. })
        ));
    }

    #[test]
    fn test_not_xml() {
        assert!(AccessTicket::parse(path(), b"<html><body>502").is_err());
    }
}
