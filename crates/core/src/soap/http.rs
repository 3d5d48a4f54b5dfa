//! SOAP over HTTP with `reqwest`.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Proxy};
use tracing::{debug, warn};

use super::{
    build_envelope, parse_response, SoapExchange, SoapOutcome, SoapParam, SoapTransport,
    TransportError, TransportFactory,
};
use crate::config::TransportConfig;
use crate::metrics;
use crate::service::EndpointDescription;

/// SOAP client bound to a single endpoint location.
pub struct HttpSoapClient {
    client: Client,
    description: EndpointDescription,
    location: String,
    last_exchange: Mutex<Option<SoapExchange>>,
}

impl HttpSoapClient {
    /// Create a client for `description` posting to `location`.
    pub fn new(
        description: EndpointDescription,
        location: impl Into<String>,
        config: &TransportConfig,
    ) -> Result<Self, TransportError> {
        let mut builder =
            Client::builder().timeout(Duration::from_secs(config.timeout_secs as u64));

        if let Some(proxy) = &config.proxy {
            let proxy = Proxy::all(proxy.url())
                .map_err(|e| TransportError::Setup(format!("invalid proxy: {e}")))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| TransportError::Setup(e.to_string()))?;

        Ok(Self {
            client,
            description,
            location: location.into(),
            last_exchange: Mutex::new(None),
        })
    }

    fn record(&self, exchange: SoapExchange) {
        if let Ok(mut last) = self.last_exchange.lock() {
            *last = Some(exchange);
        }
    }

    async fn post(&self, operation: &str, envelope: Vec<u8>) -> Result<(u16, Vec<u8>), TransportError> {
        let action = self.description.soap_action(operation);
        let response = self
            .client
            .post(&self.location)
            .header(
                CONTENT_TYPE,
                format!("application/soap+xml; charset=utf-8; action=\"{action}\""),
            )
            .body(envelope)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout
                } else if e.is_connect() {
                    TransportError::ConnectionFailed(e.to_string())
                } else {
                    TransportError::InvalidResponse(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout
            } else {
                TransportError::InvalidResponse(e.to_string())
            }
        })?;

        Ok((status, body.to_vec()))
    }
}

#[async_trait]
impl SoapTransport for HttpSoapClient {
    fn location(&self) -> &str {
        &self.location
    }

    async fn invoke(
        &self,
        operation: &str,
        params: &[SoapParam],
    ) -> Result<SoapOutcome, TransportError> {
        let envelope = build_envelope(self.description.namespace, operation, params)
            .map_err(|e| TransportError::Setup(e.to_string()))?;

        let started = Instant::now();
        debug!(
            service = self.description.name,
            operation,
            location = %self.location,
            "Invoking SOAP operation"
        );

        let result = self.post(operation, envelope.clone()).await;
        metrics::SOAP_REQUEST_DURATION
            .with_label_values(&[self.description.name, operation])
            .observe(started.elapsed().as_secs_f64());

        let (status, body) = match result {
            Ok(response) => response,
            Err(e) => {
                metrics::SOAP_REQUESTS
                    .with_label_values(&[self.description.name, operation, "error"])
                    .inc();
                self.record(SoapExchange {
                    request: envelope,
                    response: Vec::new(),
                });
                return Err(e);
            }
        };

        self.record(SoapExchange {
            request: envelope,
            response: body.clone(),
        });

        let outcome = match parse_response(&body) {
            Ok(outcome) => outcome,
            Err(e) if !(200..300).contains(&status) => {
                warn!(status, error = %e, "Non-SOAP error response");
                metrics::SOAP_REQUESTS
                    .with_label_values(&[self.description.name, operation, "error"])
                    .inc();
                return Err(TransportError::Http {
                    status,
                    body: String::from_utf8_lossy(&body).chars().take(200).collect(),
                });
            }
            Err(e) => {
                metrics::SOAP_REQUESTS
                    .with_label_values(&[self.description.name, operation, "error"])
                    .inc();
                return Err(e.into());
            }
        };

        let label = match outcome {
            SoapOutcome::Response(_) => "success",
            SoapOutcome::Fault(_) => "fault",
        };
        metrics::SOAP_REQUESTS
            .with_label_values(&[self.description.name, operation, label])
            .inc();

        Ok(outcome)
    }

    fn last_exchange(&self) -> Option<SoapExchange> {
        self.last_exchange.lock().ok().and_then(|last| last.clone())
    }
}

/// Builds [`HttpSoapClient`]s sharing one transport configuration.
#[derive(Debug, Clone)]
pub struct HttpTransportFactory {
    config: TransportConfig,
}

impl HttpTransportFactory {
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }
}

impl TransportFactory for HttpTransportFactory {
    fn connect(
        &self,
        description: EndpointDescription,
        location: &str,
    ) -> Result<Box<dyn SoapTransport>, TransportError> {
        Ok(Box::new(HttpSoapClient::new(
            description,
            location,
            &self.config,
        )?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProxyConfig;
    use crate::service::{Service, WSAA};
    use crate::soap::SoapFault;
    use crate::testing::fixtures;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const LOGIN_RESPONSE: &str = r#"<?xml version="1.0" encoding="utf-8"?><soapenv:Envelope xmlns:soapenv="http://www.w3.org/2003/05/soap-envelope"><soapenv:Body><loginCmsResponse xmlns="http://wsaa.view.sua.dvadac.desein.afip.gov"><loginCmsReturn>&lt;loginTicketResponse/&gt;</loginCmsReturn></loginCmsResponse></soapenv:Body></soapenv:Envelope>"#;

    const FAULT_RESPONSE: &str = r#"<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/"><soapenv:Body><soapenv:Fault><faultcode>ns1:cms.bad</faultcode><faultstring>CMS invalido</faultstring></soapenv:Fault></soapenv:Body></soapenv:Envelope>"#;

    fn client(server: &MockServer) -> HttpSoapClient {
        HttpSoapClient::new(
            WSAA,
            format!("{}/ws/services/LoginCms", server.uri()),
            &TransportConfig::default(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_invoke_returns_response_and_records_exchange() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ws/services/LoginCms"))
            .and(header(
                "content-type",
                "application/soap+xml; charset=utf-8; action=\"loginCms\"",
            ))
            .and(body_string_contains("<ws:in0>CMS</ws:in0>"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LOGIN_RESPONSE))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server);
        assert!(client.last_exchange().is_none());

        let outcome = client
            .invoke("loginCms", &[SoapParam::text("in0", "CMS")])
            .await
            .unwrap();

        match outcome {
            SoapOutcome::Response(body) => assert_eq!(
                body.text("loginCmsReturn").unwrap().as_deref(),
                Some("<loginTicketResponse/>")
            ),
            other => panic!("unexpected outcome: {other:?}"),
        }

        let exchange = client.last_exchange().unwrap();
        assert!(String::from_utf8(exchange.request)
            .unwrap()
            .contains("<ws:loginCms>"));
        assert_eq!(exchange.response, LOGIN_RESPONSE.as_bytes());
    }

    #[tokio::test]
    async fn test_asmx_service_gets_namespaced_action() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header(
                "content-type",
                "application/soap+xml; charset=utf-8; action=\"http://ar.gov.afip.dif.FEV1/FEDummy\"",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                fixtures::dummy_response("FEDummy", "OK", "OK", "OK"),
            ))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpSoapClient::new(
            Service::Wsfe.endpoint_description(),
            format!("{}/wsfev1/service.asmx", server.uri()),
            &TransportConfig::default(),
        )
        .unwrap();

        let outcome = client.invoke("FEDummy", &[]).await.unwrap();
        assert!(matches!(outcome, SoapOutcome::Response(_)));
    }

    #[tokio::test]
    async fn test_axis_service_gets_bare_action() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header(
                "content-type",
                "application/soap+xml; charset=utf-8; action=\"dummy\"",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                fixtures::dummy_response("dummy", "OK", "OK", "OK"),
            ))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpSoapClient::new(
            Service::Wsmtxca.endpoint_description(),
            format!("{}/wsmtxca/services/MTXCAService", server.uri()),
            &TransportConfig::default(),
        )
        .unwrap();

        let outcome = client.invoke("dummy", &[]).await.unwrap();
        assert!(matches!(outcome, SoapOutcome::Response(_)));
    }

    #[tokio::test]
    async fn test_fault_with_http_500_is_a_fault_not_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string(FAULT_RESPONSE))
            .mount(&server)
            .await;

        let outcome = client(&server)
            .invoke("loginCms", &[SoapParam::text("in0", "CMS")])
            .await
            .unwrap();

        assert_eq!(
            outcome,
            SoapOutcome::Fault(SoapFault {
                code: "ns1:cms.bad".to_string(),
                message: "CMS invalido".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn test_non_soap_error_page() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad gateway</html>"))
            .mount(&server)
            .await;

        let client = client(&server);
        let err = client.invoke("loginCms", &[]).await.unwrap_err();

        assert!(matches!(err, TransportError::Http { status: 502, .. }));
        assert_eq!(
            client.last_exchange().unwrap().response,
            b"<html>Bad gateway</html>"
        );
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let client = HttpSoapClient::new(
            WSAA,
            "http://127.0.0.1:1/ws/services/LoginCms",
            &TransportConfig::default(),
        )
        .unwrap();

        let err = client.invoke("loginCms", &[]).await.unwrap_err();
        assert!(matches!(
            err,
            TransportError::ConnectionFailed(_) | TransportError::InvalidResponse(_)
        ));
    }

    #[test]
    fn test_factory_builds_bound_client() {
        let factory = HttpTransportFactory::new(TransportConfig {
            timeout_secs: 5,
            proxy: Some(ProxyConfig {
                host: "190.122.183.81".to_string(),
                port: 80,
            }),
        });

        let transport = factory
            .connect(WSAA, "https://wsaahomo.afip.gov.ar/ws/services/LoginCms")
            .unwrap();
        assert_eq!(
            transport.location(),
            "https://wsaahomo.afip.gov.ar/ws/services/LoginCms"
        );
    }
}
