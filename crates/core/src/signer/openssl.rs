//! `openssl smime` based signing primitive.

use std::ffi::OsString;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::{SignJob, SigningError, SigningPrimitive};
use crate::config::SignerConfig;

/// Environment variable carrying the key passphrase to the child process.
const PASSPHRASE_ENV: &str = "AFIPWS_KEY_PASSPHRASE";

/// Signs by running the `openssl` binary.
pub struct OpensslSigner {
    config: SignerConfig,
}

impl OpensslSigner {
    pub fn new(config: SignerConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(SignerConfig::default())
    }

    /// Builds `openssl smime` arguments for an opaque (embedded content)
    /// signature in S/MIME format.
    fn build_args(&self, job: &SignJob<'_>) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "smime".into(),
            "-sign".into(),
            "-nodetach".into(),
            "-binary".into(),
            "-outform".into(),
            "SMIME".into(),
            "-in".into(),
            job.input.into(),
            "-out".into(),
            job.output.into(),
            "-signer".into(),
            job.certificate.into(),
            "-inkey".into(),
            job.private_key.into(),
        ];

        if let Some(digest) = &self.config.digest {
            args.extend(["-md".into(), digest.into()]);
        }

        if job.passphrase.is_some() {
            args.extend(["-passin".into(), format!("env:{PASSPHRASE_ENV}").into()]);
        }

        args
    }

    /// Checks that the configured binary can be executed.
    pub async fn validate(&self) -> Result<(), SigningError> {
        let output = Command::new(&self.config.openssl_path)
            .arg("version")
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            return Err(SigningError::failed(
                "openssl version check failed",
                Some(String::from_utf8_lossy(&output.stderr).into_owned()),
            ));
        }
        Ok(())
    }

    fn spawn_error(&self, e: std::io::Error) -> SigningError {
        if e.kind() == std::io::ErrorKind::NotFound {
            SigningError::ToolNotFound {
                path: self.config.openssl_path.clone(),
            }
        } else {
            SigningError::Io(e)
        }
    }
}

#[async_trait]
impl SigningPrimitive for OpensslSigner {
    fn name(&self) -> &str {
        "openssl"
    }

    async fn sign(&self, job: &SignJob<'_>) -> Result<(), SigningError> {
        let args = self.build_args(job);
        debug!(
            openssl = %self.config.openssl_path.display(),
            input = %job.input.display(),
            "Running openssl smime -sign"
        );

        let mut command = Command::new(&self.config.openssl_path);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(passphrase) = job.passphrase {
            command.env(PASSPHRASE_ENV, passphrase);
        }

        let output = command.output().await.map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let reason = stderr
                .lines()
                .next()
                .map(str::to_string)
                .unwrap_or_else(|| format!("openssl exited with {}", output.status));
            return Err(SigningError::failed(reason, Some(stderr)));
        }

        Ok(())
    }
}
