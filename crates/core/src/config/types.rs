use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::ticket::Identity;

/// Homologation (sandbox) endpoints.
pub const SANDBOX_ENDPOINTS: &[(&str, &str)] = &[
    ("wsaa", "https://wsaahomo.afip.gov.ar/ws/services/LoginCms"),
    ("wsmtxca", "https://fwshomo.afip.gov.ar/wsmtxca/services/MTXCAService"),
    ("wsfe", "https://wswhomo.afip.gov.ar/wsfev1/service.asmx"),
    (
        "wspn3",
        "https://awshomo.afip.gov.ar/padron-puc-ws/services/select.ContribuyenteNivel3SelectServiceImpl",
    ),
];

/// Production endpoints.
pub const PRODUCTION_ENDPOINTS: &[(&str, &str)] = &[
    ("wsaa", "https://wsaa.afip.gov.ar/ws/services/LoginCms"),
    ("wsmtxca", "https://serviciosjava.afip.gob.ar/wsmtxca/services/MTXCAService"),
    ("wsfe", "https://servicios1.afip.gov.ar/wsfev1/service.asmx"),
    (
        "wspn3",
        "https://aws.afip.gov.ar/padron-puc-ws/services/select.ContribuyenteNivel3SelectServiceImpl",
    ),
];

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Taxpayer id tickets are requested for.
    pub cuit: String,
    /// Target the homologation environment (default: true).
    #[serde(default = "default_sandbox")]
    pub sandbox: bool,
    /// Private key passphrase.
    #[serde(default)]
    pub passphrase: Option<String>,
    pub files: FilesConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub signer: SignerConfig,
    #[serde(default)]
    pub endpoints: EndpointsConfig,
    /// Per-service settings, keyed by service key.
    #[serde(default)]
    pub services: BTreeMap<String, ServiceConfig>,
    /// Call the service status operation when connecting (default: true).
    #[serde(default = "default_probe_status")]
    pub probe_status: bool,
}

fn default_sandbox() -> bool {
    true
}

fn default_probe_status() -> bool {
    true
}

impl Config {
    /// Identity tickets are issued for.
    pub fn identity(&self) -> Identity {
        Identity::new(self.cuit.clone(), self.sandbox)
    }

    /// Endpoint URL for `name` in the selected environment.
    pub fn endpoint(&self, name: &str) -> Option<String> {
        self.endpoints.lookup(name, self.sandbox)
    }

    /// Protocol description file configured for a service, if any.
    pub fn service_wsdl(&self, name: &str) -> Option<&PathBuf> {
        self.services.get(name).and_then(|s| s.wsdl.as_ref())
    }
}

/// Credential files.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FilesConfig {
    /// Signer certificate (PEM), read through the ticket store.
    pub certificate: PathBuf,
    /// Private key (PEM), read from the local filesystem by the signer.
    pub private_key: PathBuf,
    /// Authentication service description; checked for presence when set.
    #[serde(default)]
    pub wsaa_wsdl: Option<PathBuf>,
}

/// Ticket storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Directory holding request documents, access tickets and login audit copies.
    #[serde(default = "default_tickets_dir")]
    pub tickets_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            tickets_dir: default_tickets_dir(),
        }
    }
}

fn default_tickets_dir() -> PathBuf {
    PathBuf::from("afipws-tickets")
}

/// HTTP transport configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransportConfig {
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
    #[serde(default)]
    pub proxy: Option<ProxyConfig>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            proxy: None,
        }
    }
}

fn default_timeout() -> u32 {
    30
}

/// HTTP proxy
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ProxyConfig {
    pub host: String,
    #[serde(default = "default_proxy_port")]
    pub port: u16,
}

impl ProxyConfig {
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

fn default_proxy_port() -> u16 {
    80
}

/// Signing tool configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SignerConfig {
    /// Path to the openssl binary (default: "openssl" on PATH)
    #[serde(default = "default_openssl_path")]
    pub openssl_path: PathBuf,
    /// Digest passed as `-md` (default: tool default)
    #[serde(default)]
    pub digest: Option<String>,
    /// Where scoped signing directories are created (default: system temp dir)
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
}

impl Default for SignerConfig {
    fn default() -> Self {
        Self {
            openssl_path: default_openssl_path(),
            digest: None,
            temp_dir: None,
        }
    }
}

fn default_openssl_path() -> PathBuf {
    PathBuf::from("openssl")
}

/// Endpoint overrides. Missing keys fall back to the built-in tables; an empty
/// value removes the endpoint.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EndpointsConfig {
    #[serde(default)]
    pub sandbox: BTreeMap<String, String>,
    #[serde(default)]
    pub production: BTreeMap<String, String>,
}

impl EndpointsConfig {
    pub fn lookup(&self, name: &str, sandbox: bool) -> Option<String> {
        let (overrides, defaults) = if sandbox {
            (&self.sandbox, SANDBOX_ENDPOINTS)
        } else {
            (&self.production, PRODUCTION_ENDPOINTS)
        };

        match overrides.get(name) {
            Some(url) if url.is_empty() => None,
            Some(url) => Some(url.clone()),
            None => defaults
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, url)| url.to_string()),
        }
    }
}

/// Per-service settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ServiceConfig {
    /// Service description file; must exist when set.
    #[serde(default)]
    pub wsdl: Option<PathBuf>,
}

/// Sanitized config for display (passphrase redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub cuit: String,
    pub sandbox: bool,
    pub passphrase_configured: bool,
    pub files: FilesConfig,
    pub storage: StorageConfig,
    pub transport: TransportConfig,
    pub signer: SignerConfig,
    pub endpoints: BTreeMap<String, String>,
    pub probe_status: bool,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        let defaults = if config.sandbox {
            SANDBOX_ENDPOINTS
        } else {
            PRODUCTION_ENDPOINTS
        };
        let overrides = if config.sandbox {
            &config.endpoints.sandbox
        } else {
            &config.endpoints.production
        };
        let endpoints = defaults
            .iter()
            .map(|(key, _)| key.to_string())
            .chain(overrides.keys().cloned())
            .filter_map(|key| config.endpoint(&key).map(|url| (key, url)))
            .collect();

        Self {
            cuit: config.cuit.clone(),
            sandbox: config.sandbox,
            passphrase_configured: config.passphrase.as_deref().is_some_and(|p| !p.is_empty()),
            files: config.files.clone(),
            storage: config.storage.clone(),
            transport: config.transport.clone(),
            signer: config.signer.clone(),
            endpoints,
            probe_status: config.probe_status,
        }
    }
}
