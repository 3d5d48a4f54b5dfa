//! Scripted SOAP transport for testing.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use crate::service::{EndpointDescription, WSAA};
use crate::soap::{
    build_envelope, parse_response, SoapExchange, SoapOutcome, SoapParam, SoapTransport,
    TransportError, TransportFactory,
};

/// A recorded operation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub operation: String,
    pub params: Vec<SoapParam>,
}

#[derive(Debug, Clone)]
enum Scripted {
    Body(String),
    ConnectionFailed(String),
}

#[derive(Debug, Default)]
struct State {
    scripts: HashMap<String, VecDeque<Scripted>>,
    last_served: HashMap<String, Scripted>,
    calls: Vec<RecordedCall>,
    last_exchange: Option<SoapExchange>,
}

/// Mock implementation of [`SoapTransport`].
///
/// Responses are scripted per operation as raw response documents and go
/// through the same envelope parsing as the HTTP client. Once the queue for an
/// operation drains, the last response served is repeated.
///
/// # Example
///
/// ```rust,ignore
/// let transport = MockTransport::new("https://wsaa.test/LoginCms");
/// transport.respond("loginCms", fixtures::login_response(&ticket));
/// transport.fail("loginCms", "connection reset");
/// ```
#[derive(Debug, Clone)]
pub struct MockTransport {
    description: EndpointDescription,
    location: String,
    state: Arc<Mutex<State>>,
}

impl MockTransport {
    /// Transport bound to the authentication service.
    pub fn new(location: impl Into<String>) -> Self {
        Self::for_endpoint(WSAA, location)
    }

    pub fn for_endpoint(description: EndpointDescription, location: impl Into<String>) -> Self {
        Self {
            description,
            location: location.into(),
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn push(&self, operation: &str, scripted: Scripted) {
        self.state()
            .scripts
            .entry(operation.to_string())
            .or_default()
            .push_back(scripted);
    }

    /// Answer `operation` with the response document `body`.
    pub fn respond(&self, operation: &str, body: impl Into<String>) {
        self.push(operation, Scripted::Body(body.into()));
    }

    /// Fail `operation` before any response is received.
    pub fn fail(&self, operation: &str, reason: impl Into<String>) {
        self.push(operation, Scripted::ConnectionFailed(reason.into()));
    }

    /// All recorded calls.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state().calls.clone()
    }

    /// Number of calls to `operation`.
    pub fn call_count(&self, operation: &str) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|call| call.operation == operation)
            .count()
    }
}

#[async_trait]
impl SoapTransport for MockTransport {
    fn location(&self) -> &str {
        &self.location
    }

    async fn invoke(
        &self,
        operation: &str,
        params: &[SoapParam],
    ) -> Result<SoapOutcome, TransportError> {
        let request = build_envelope(self.description.namespace, operation, params)
            .map_err(|e| TransportError::Setup(e.to_string()))?;

        let mut state = self.state();
        state.calls.push(RecordedCall {
            operation: operation.to_string(),
            params: params.to_vec(),
        });

        let next = state
            .scripts
            .get_mut(operation)
            .and_then(VecDeque::pop_front);
        let scripted = match next {
            Some(next) => {
                state.last_served.insert(operation.to_string(), next.clone());
                Some(next)
            }
            None => state.last_served.get(operation).cloned(),
        };

        match scripted {
            Some(Scripted::Body(body)) => {
                state.last_exchange = Some(SoapExchange {
                    request,
                    response: body.clone().into_bytes(),
                });
                Ok(parse_response(body.as_bytes())?)
            }
            Some(Scripted::ConnectionFailed(reason)) => {
                state.last_exchange = Some(SoapExchange {
                    request,
                    response: Vec::new(),
                });
                Err(TransportError::ConnectionFailed(reason))
            }
            None => Err(TransportError::InvalidResponse(format!(
                "no scripted response for {operation}"
            ))),
        }
    }

    fn last_exchange(&self) -> Option<SoapExchange> {
        self.state().last_exchange.clone()
    }
}

/// Mock implementation of [`TransportFactory`].
///
/// Hands out clones of registered [`MockTransport`]s, keyed by endpoint name,
/// and records every connection.
#[derive(Debug, Clone, Default)]
pub struct MockTransportFactory {
    transports: Arc<Mutex<HashMap<String, MockTransport>>>,
    connections: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockTransportFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `transport` for connections to the endpoint named `name`.
    pub fn register(&self, name: &str, transport: MockTransport) {
        self.transports
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(name.to_string(), transport);
    }

    /// `(endpoint name, location)` of every connection made.
    pub fn connections(&self) -> Vec<(String, String)> {
        self.connections
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl TransportFactory for MockTransportFactory {
    fn connect(
        &self,
        description: EndpointDescription,
        location: &str,
    ) -> Result<Box<dyn SoapTransport>, TransportError> {
        self.connections
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((description.name.to_string(), location.to_string()));

        let transport = self
            .transports
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(description.name)
            .cloned()
            .ok_or_else(|| {
                TransportError::Setup(format!("no mock transport for {}", description.name))
            })?;

        Ok(Box::new(MockTransport {
            description,
            location: location.to_string(),
            state: transport.state,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    #[tokio::test]
    async fn test_scripted_responses_drain_then_repeat() {
        let transport = MockTransport::new("https://wsaa.test");
        transport.fail("loginCms", "reset");
        transport.respond("loginCms", fixtures::login_response("<ta/>"));

        assert!(transport.invoke("loginCms", &[]).await.is_err());
        for _ in 0..2 {
            let outcome = transport.invoke("loginCms", &[]).await.unwrap();
            assert!(matches!(outcome, SoapOutcome::Response(_)));
        }
        assert_eq!(transport.call_count("loginCms"), 3);
    }

    #[tokio::test]
    async fn test_unscripted_operation_fails() {
        let transport = MockTransport::new("https://wsaa.test");
        assert!(matches!(
            transport.invoke("dummy", &[]).await,
            Err(TransportError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_factory_shares_script_state() {
        let factory = MockTransportFactory::new();
        let wsaa = MockTransport::new("unused");
        wsaa.respond("loginCms", fixtures::login_response("<ta/>"));
        factory.register("wsaa", wsaa.clone());

        let connected = factory.connect(WSAA, "https://wsaa.test").unwrap();
        assert_eq!(connected.location(), "https://wsaa.test");
        connected.invoke("loginCms", &[]).await.unwrap();

        assert_eq!(wsaa.call_count("loginCms"), 1);
        assert_eq!(
            factory.connections(),
            vec![("wsaa".to_string(), "https://wsaa.test".to_string())]
        );
    }
}
