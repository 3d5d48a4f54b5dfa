//! CMS signing of ticket requests.
//!
//! The cryptography itself is delegated to a [`SigningPrimitive`]; this module
//! stages its inputs in a scoped temporary directory and extracts the
//! transport payload from its output.

mod openssl;
mod smime;

pub use openssl::OpensslSigner;
pub use smime::extract_payload;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur while signing.
#[derive(Debug, Error)]
pub enum SigningError {
    /// Signing tool binary not found.
    #[error("Signing tool not found at path: {path}")]
    ToolNotFound { path: PathBuf },

    /// The primitive reported failure (bad passphrase, unreadable key, ...).
    #[error("Signature generation failed: {reason}")]
    Failed {
        reason: String,
        stderr: Option<String>,
    },

    /// The primitive's output has no recognizable payload.
    #[error("Malformed signer output: {reason}")]
    MalformedOutput { reason: String },

    /// I/O error while staging inputs or reading output.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SigningError {
    pub fn failed(reason: impl Into<String>, stderr: Option<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
            stderr,
        }
    }

    pub fn malformed_output(reason: impl Into<String>) -> Self {
        Self::MalformedOutput {
            reason: reason.into(),
        }
    }
}

/// Files handed to a signing primitive. All paths live in one scoped
/// directory owned by [`TicketSigner`].
#[derive(Debug, Clone)]
pub struct SignJob<'a> {
    /// Document to sign.
    pub input: &'a Path,
    /// Signer certificate (PEM).
    pub certificate: &'a Path,
    /// Private key matching the certificate.
    pub private_key: &'a Path,
    pub passphrase: Option<&'a str>,
    /// Where the primitive writes its raw output.
    pub output: &'a Path,
}

/// A primitive that produces an S/MIME or PEM wrapped CMS signed-data
/// structure with the signed content embedded.
#[async_trait]
pub trait SigningPrimitive: Send + Sync {
    /// Name of this primitive, for logs.
    fn name(&self) -> &str;

    /// Sign `job.input`, writing the raw result to `job.output`.
    async fn sign(&self, job: &SignJob<'_>) -> Result<(), SigningError>;
}

/// Signs ticket requests with a certificate and private key.
pub struct TicketSigner {
    primitive: Arc<dyn SigningPrimitive>,
    temp_root: Option<PathBuf>,
}

impl TicketSigner {
    pub fn new(primitive: Arc<dyn SigningPrimitive>) -> Self {
        Self {
            primitive,
            temp_root: None,
        }
    }

    /// Stage temporary artifacts under `dir` instead of the system temp dir.
    pub fn with_temp_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_root = Some(dir.into());
        self
    }

    /// Sign `request` and return the base64 CMS payload.
    ///
    /// The request copy, certificate copy and raw output live in a temporary
    /// directory that is removed when this call returns, on every path.
    pub async fn sign(
        &self,
        request: &[u8],
        certificate: &[u8],
        private_key: &Path,
        passphrase: Option<&str>,
    ) -> Result<String, SigningError> {
        let started = Instant::now();
        let mut builder = tempfile::Builder::new();
        builder.prefix("afipws-sign-");
        let workdir = match &self.temp_root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };

        let input = workdir.path().join("request.xml");
        let certificate_path = workdir.path().join("certificate.crt");
        let output = workdir.path().join("signed.smime");
        tokio::fs::write(&input, request).await?;
        tokio::fs::write(&certificate_path, certificate).await?;

        let job = SignJob {
            input: &input,
            certificate: &certificate_path,
            private_key,
            passphrase,
            output: &output,
        };
        self.primitive.sign(&job).await?;

        let raw = tokio::fs::read(&output).await?;
        let payload = extract_payload(&raw)?;

        debug!(
            primitive = self.primitive.name(),
            payload_len = payload.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Ticket request signed"
        );
        Ok(payload)
    }
}
