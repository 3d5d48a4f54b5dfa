//! Minimal SOAP 1.2 plumbing.
//!
//! Only what the ticket lifecycle needs: calling one operation with named
//! parameters, telling faults from responses, and keeping the last raw
//! exchange around for audit.

mod envelope;
mod http;

pub use envelope::{build_envelope, parse_response};
pub use http::{HttpSoapClient, HttpTransportFactory};

use async_trait::async_trait;
use thiserror::Error;

use crate::service::EndpointDescription;
use crate::xml::{self, XmlError};

/// Errors raised below the SOAP layer (network, HTTP, unparseable bodies).
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Request timed out")]
    Timeout,

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Client setup failed: {0}")]
    Setup(String),
}

impl From<XmlError> for TransportError {
    fn from(err: XmlError) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}

/// Value of an operation parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SoapValue {
    Text(String),
    Struct(Vec<SoapParam>),
}

/// Named operation parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoapParam {
    pub name: String,
    pub value: SoapValue,
}

impl SoapParam {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: SoapValue::Text(value.into()),
        }
    }

    pub fn structure(name: impl Into<String>, fields: Vec<SoapParam>) -> Self {
        Self {
            name: name.into(),
            value: SoapValue::Struct(fields),
        }
    }
}

/// Fault reported by the remote side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoapFault {
    pub code: String,
    pub message: String,
}

/// Successful response document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoapBody {
    xml: String,
}

impl SoapBody {
    pub fn new(xml: impl Into<String>) -> Self {
        Self { xml: xml.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.xml
    }

    /// Text of the first element named `name`.
    pub fn text(&self, name: &str) -> Result<Option<String>, XmlError> {
        xml::first_text(&self.xml, name)
    }

    /// `(element, text)` pairs nested anywhere below an element named `ancestor`.
    pub fn texts_under(&self, ancestor: &str) -> Result<Vec<(String, String)>, XmlError> {
        xml::texts_under(&self.xml, ancestor)
    }
}

/// Result of invoking an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SoapOutcome {
    Response(SoapBody),
    Fault(SoapFault),
}

/// Raw bytes of one request/response exchange.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SoapExchange {
    pub request: Vec<u8>,
    pub response: Vec<u8>,
}

/// A client bound to one SOAP endpoint.
#[async_trait]
pub trait SoapTransport: Send + Sync {
    /// Endpoint URL this client posts to.
    fn location(&self) -> &str;

    /// Invoke `operation` with `params`.
    async fn invoke(
        &self,
        operation: &str,
        params: &[SoapParam],
    ) -> Result<SoapOutcome, TransportError>;

    /// Raw bytes of the most recent exchange, if any.
    fn last_exchange(&self) -> Option<SoapExchange>;
}

/// Builds transports from an endpoint description and a location URL.
pub trait TransportFactory: Send + Sync {
    fn connect(
        &self,
        description: EndpointDescription,
        location: &str,
    ) -> Result<Box<dyn SoapTransport>, TransportError>;
}
