//! Per-service credential shapes.

use serde::Serialize;

use crate::service::Service;
use crate::soap::SoapParam;
use crate::ticket::{AccessTicket, Identity};

/// Credentials in the exact shape each service expects.
///
/// Field names are case-sensitive on the remote side and differ per service,
/// so each variant renames its fields explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CredentialEnvelope {
    Wsmtxca {
        token: String,
        sign: String,
        #[serde(rename = "cuitRepresentada")]
        cuit_representada: String,
    },
    Wsfe {
        #[serde(rename = "Token")]
        token: String,
        #[serde(rename = "Sign")]
        sign: String,
        #[serde(rename = "Cuit")]
        cuit: String,
    },
    Wspn3 {
        token: String,
        sign: String,
    },
}

impl CredentialEnvelope {
    pub fn new(service: Service, ticket: &AccessTicket, identity: &Identity) -> Self {
        let token = ticket.token.clone();
        let sign = ticket.sign.clone();
        match service {
            Service::Wsmtxca => Self::Wsmtxca {
                token,
                sign,
                cuit_representada: identity.cuit.clone(),
            },
            Service::Wsfe => Self::Wsfe {
                token,
                sign,
                cuit: identity.cuit.clone(),
            },
            Service::Wspn3 => Self::Wspn3 { token, sign },
        }
    }

    pub fn service(&self) -> Service {
        match self {
            Self::Wsmtxca { .. } => Service::Wsmtxca,
            Self::Wsfe { .. } => Service::Wsfe,
            Self::Wspn3 { .. } => Service::Wspn3,
        }
    }

    /// `(wire name, value)` pairs in declaration order.
    pub fn fields(&self) -> Vec<(&'static str, &str)> {
        match self {
            Self::Wsmtxca {
                token,
                sign,
                cuit_representada,
            } => vec![
                ("token", token.as_str()),
                ("sign", sign.as_str()),
                ("cuitRepresentada", cuit_representada.as_str()),
            ],
            Self::Wsfe { token, sign, cuit } => vec![
                ("Token", token.as_str()),
                ("Sign", sign.as_str()),
                ("Cuit", cuit.as_str()),
            ],
            Self::Wspn3 { token, sign } => {
                vec![("token", token.as_str()), ("sign", sign.as_str())]
            }
        }
    }

    /// The credentials as a structured operation parameter named `name`.
    pub fn to_param(&self, name: &str) -> SoapParam {
        SoapParam::structure(
            name,
            self.fields()
                .into_iter()
                .map(|(field, value)| SoapParam::text(field, value))
                .collect(),
        )
    }
}
