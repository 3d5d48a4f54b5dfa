//! Testing utilities and mock implementations.
//!
//! This module provides in-memory or scripted implementations of every seam
//! the ticket lifecycle talks through, so renewal and connection flows can be
//! exercised without certificates, an openssl binary or network access.
//!
//! # Example
//!
//! ```rust,ignore
//! use afipws_core::testing::{fixtures, MemoryStore, MockSigner, MockTransport};
//!
//! let store = MemoryStore::new();
//! store.insert("/certs/cert.crt", b"CERT");
//!
//! let wsaa = MockTransport::new("https://wsaa.test/LoginCms");
//! wsaa.respond("loginCms", fixtures::login_response(&ticket_xml));
//!
//! // Wire into a RenewalOrchestrator...
//! ```

mod memory_store;
mod mock_signer;
mod mock_transport;

pub use memory_store::MemoryStore;
pub use mock_signer::{MockSigner, RecordedSignature};
pub use mock_transport::{MockTransport, MockTransportFactory, RecordedCall};

/// Test fixtures and helper functions.
pub mod fixtures {
    use quick_xml::escape::escape;

    /// An access ticket document as issued by the authentication service.
    pub fn access_ticket(token: &str, sign: &str, expiration: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<loginTicketResponse version="1.0">
    <header>
        <source>CN=wsaahomo, O=AFIP, C=AR, SERIALNUMBER=CUIT 33693450239</source>
        <destination>SERIALNUMBER=CUIT 30000000007, CN=test</destination>
        <uniqueId>1709294400</uniqueId>
        <generationTime>2024-03-01T09:00:00.000-03:00</generationTime>
        <expirationTime>{expiration}</expirationTime>
    </header>
    <credentials>
        <token>{token}</token>
        <sign>{sign}</sign>
    </credentials>
</loginTicketResponse>"#
        )
    }

    /// A `loginCms` response carrying `ticket` as escaped text.
    pub fn login_response(ticket: &str) -> String {
        envelope(&format!(
            r#"<loginCmsResponse xmlns="http://wsaa.view.sua.dvadac.desein.afip.gov"><loginCmsReturn>{}</loginCmsReturn></loginCmsResponse>"#,
            escape(ticket)
        ))
    }

    /// A status operation response reporting the three subsystems.
    pub fn dummy_response(operation: &str, app: &str, db: &str, auth: &str) -> String {
        envelope(&format!(
            "<{operation}Response><{operation}Result><AppServer>{app}</AppServer><DbServer>{db}</DbServer><AuthServer>{auth}</AuthServer></{operation}Result></{operation}Response>"
        ))
    }

    /// A SOAP 1.1 fault, as raised by the authentication service.
    pub fn fault_response(code: &str, message: &str) -> String {
        envelope(&format!(
            r#"<soapenv:Fault><faultcode xmlns:ns1="http://xml.apache.org/axis/">{code}</faultcode><faultstring>{message}</faultstring></soapenv:Fault>"#
        ))
    }

    fn envelope(body: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="utf-8"?><soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/"><soapenv:Body>{body}</soapenv:Body></soapenv:Envelope>"#
        )
    }
}
