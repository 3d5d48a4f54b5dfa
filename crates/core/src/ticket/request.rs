//! Login ticket request (TRA) construction.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use tracing::debug;

use super::request_path;
use crate::error::WsError;
use crate::service::Service;
use crate::store::TicketStore;
use crate::xml::{XmlBuilder, XmlError};

/// Clock-skew window, in seconds, applied on both sides of the issue time.
pub const REQUEST_VALIDITY: i64 = 60;

/// Unsigned login request for one service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketRequest {
    /// Issue time as Unix seconds.
    pub unique_id: i64,
    pub generation_time: DateTime<Utc>,
    pub expiration_time: DateTime<Utc>,
    /// Canonical service name expected by the authentication endpoint.
    pub service: String,
}

impl TicketRequest {
    /// Request for `service` issued at `now`.
    pub fn new(service: Service, now: DateTime<Utc>) -> Self {
        Self {
            unique_id: now.timestamp(),
            generation_time: now - Duration::seconds(REQUEST_VALIDITY),
            expiration_time: now + Duration::seconds(REQUEST_VALIDITY),
            service: service.canonical_name().to_string(),
        }
    }

    /// Serialize as a `loginTicketRequest` document.
    pub fn to_xml(&self) -> Result<Vec<u8>, XmlError> {
        let mut xml = XmlBuilder::new();
        xml.declaration()?
            .start("loginTicketRequest", &[("version", "1.0")])?
            .start("header", &[])?
            .text_element("uniqueId", &self.unique_id.to_string())?
            .text_element("generationTime", &iso8601(self.generation_time))?
            .text_element("expirationTime", &iso8601(self.expiration_time))?
            .end("header")?
            .text_element("service", &self.service)?
            .end("loginTicketRequest")?;
        Ok(xml.finish())
    }
}

fn iso8601(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// Builds request documents and writes them to the ticket directory.
pub struct TicketRequestBuilder {
    store: Arc<dyn TicketStore>,
    tickets_dir: PathBuf,
}

impl TicketRequestBuilder {
    pub fn new(store: Arc<dyn TicketStore>, tickets_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            tickets_dir: tickets_dir.into(),
        }
    }

    /// Build the request for `service` at `now`, persist it as
    /// `TRA-<service>.xml` and return it with its serialized form.
    pub fn build(
        &self,
        service: Service,
        now: DateTime<Utc>,
    ) -> Result<(TicketRequest, Vec<u8>), WsError> {
        let request = TicketRequest::new(service, now);
        let xml = request.to_xml()?;

        let path = request_path(&self.tickets_dir, service);
        self.store.put(&path, &xml)?;
        debug!(
            service = %service,
            unique_id = request.unique_id,
            path = %path.display(),
            "Ticket request written"
        );

        Ok((request, xml))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryStore;
    use crate::xml::text_at;
    use chrono::TimeZone;
    use std::path::Path;

    fn issue_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_request_window() {
        let request = TicketRequest::new(Service::Wsfe, issue_time());

        assert_eq!(request.unique_id, 1709294400);
        assert_eq!(
            request.generation_time,
            Utc.with_ymd_and_hms(2024, 3, 1, 11, 59, 0).unwrap()
        );
        assert_eq!(
            request.expiration_time,
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 1, 0).unwrap()
        );
    }

    #[test]
    fn test_request_document_fields() {
        let xml = TicketRequest::new(Service::Wsmtxca, issue_time())
            .to_xml()
            .unwrap();
        let xml = String::from_utf8(xml).unwrap();

        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(xml.contains(r#"<loginTicketRequest version="1.0">"#));
        assert_eq!(
            text_at(&xml, &["header", "uniqueId"]).unwrap().as_deref(),
            Some("1709294400")
        );
        assert_eq!(
            text_at(&xml, &["header", "generationTime"]).unwrap().as_deref(),
            Some("2024-03-01T11:59:00+00:00")
        );
        assert_eq!(
            text_at(&xml, &["header", "expirationTime"]).unwrap().as_deref(),
            Some("2024-03-01T12:01:00+00:00")
        );
        assert_eq!(
            text_at(&xml, &["service"]).unwrap().as_deref(),
            Some("wsmtxca")
        );
    }

    #[test]
    fn test_service_uses_canonical_name() {
        for service in Service::ALL {
            let xml = TicketRequest::new(service, issue_time()).to_xml().unwrap();
            let xml = String::from_utf8(xml).unwrap();
            assert_eq!(
                text_at(&xml, &["service"]).unwrap().as_deref(),
                Some(service.canonical_name())
            );
        }
    }

    #[test]
    fn test_builder_writes_request_document() {
        let store = Arc::new(MemoryStore::new());
        let builder = TicketRequestBuilder::new(store.clone(), "/tickets");

        let (request, xml) = builder.build(Service::Wspn3, issue_time()).unwrap();

        assert_eq!(request.service, "padron-puc-ws");
        assert_eq!(
            store.get(Path::new("/tickets/TRA-wspn3.xml")).unwrap(),
            xml
        );
    }
}
