//! Mock signing primitive for testing.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::signer::{SignJob, SigningError, SigningPrimitive};

/// A recorded signing call for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedSignature {
    /// Bytes of the request document handed to the primitive.
    pub input: Vec<u8>,
    /// Bytes of the certificate copy handed to the primitive.
    pub certificate: Vec<u8>,
    pub private_key: PathBuf,
    pub passphrase: Option<String>,
}

#[derive(Debug, Default)]
struct State {
    calls: Vec<RecordedSignature>,
    next_error: Option<SigningError>,
    raw_output: Option<Vec<u8>>,
}

/// Mock implementation of [`SigningPrimitive`].
///
/// Writes an S/MIME entity whose payload is the hex encoding of the input,
/// so tests can predict the CMS string with [`MockSigner::payload_for`].
#[derive(Debug, Clone, Default)]
pub struct MockSigner {
    state: Arc<Mutex<State>>,
}

impl MockSigner {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Payload the mock produces for `input`.
    pub fn payload_for(input: &[u8]) -> String {
        input.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Fail the next call with `error`.
    pub fn fail_with(&self, error: SigningError) {
        self.state().next_error = Some(error);
    }

    /// Write `raw` verbatim instead of a well-formed entity.
    pub fn set_raw_output(&self, raw: Vec<u8>) {
        self.state().raw_output = Some(raw);
    }

    /// All recorded calls.
    pub fn calls(&self) -> Vec<RecordedSignature> {
        self.state().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state().calls.len()
    }
}

#[async_trait]
impl SigningPrimitive for MockSigner {
    fn name(&self) -> &str {
        "mock"
    }

    async fn sign(&self, job: &SignJob<'_>) -> Result<(), SigningError> {
        let input = tokio::fs::read(job.input).await?;
        let certificate = tokio::fs::read(job.certificate).await?;

        let (error, raw_output) = {
            let mut state = self.state();
            state.calls.push(RecordedSignature {
                input: input.clone(),
                certificate,
                private_key: job.private_key.to_path_buf(),
                passphrase: job.passphrase.map(str::to_string),
            });
            (state.next_error.take(), state.raw_output.clone())
        };

        if let Some(error) = error {
            return Err(error);
        }

        let output = raw_output.unwrap_or_else(|| {
            format!(
                "MIME-Version: 1.0\n\
                 Content-Disposition: attachment; filename=\"smime.p7m\"\n\
                 Content-Type: application/x-pkcs7-mime; smime-type=signed-data; name=\"smime.p7m\"\n\
                 Content-Transfer-Encoding: base64\n\
                 \n\
                 {}\n",
                Self::payload_for(&input)
            )
            .into_bytes()
        });
        tokio::fs::write(job.output, output).await?;
        Ok(())
    }
}
