//! Ticket freshness checks and re-authentication.
//!
//! The ticket cache is read, checked and rewritten without any locking. Two
//! processes renewing the same `(service, identity)` at once will both
//! authenticate and the last write wins; the authentication service may also
//! reject the second login while the first ticket is still valid. Callers that
//! share a tickets directory across processes must serialize renewals
//! themselves.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::{AuthServiceClient, LOGIN_OPERATION};
use crate::config::Config;
use crate::error::WsError;
use crate::metrics;
use crate::service::{Service, WSAA};
use crate::signer::TicketSigner;
use crate::soap::TransportFactory;
use crate::store::TicketStore;
use crate::ticket::{access_ticket_path, AccessTicket, Identity, TicketRequestBuilder};

/// Result of a freshness check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenewalOutcome {
    /// A new ticket was obtained and stored.
    Renewed,
    /// The stored ticket is still valid; nothing was done.
    Valid,
}

impl RenewalOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Renewed => "renewed",
            Self::Valid => "valid",
        }
    }
}

/// Paths and secrets needed to authenticate.
#[derive(Debug, Clone)]
pub struct RenewalSettings {
    pub tickets_dir: PathBuf,
    /// Read through the ticket store.
    pub certificate: PathBuf,
    /// Read by the signing tool from the local filesystem.
    pub private_key: PathBuf,
    pub passphrase: Option<String>,
    /// Checked for presence on the local filesystem when set.
    pub wsaa_wsdl: Option<PathBuf>,
    pub wsaa_endpoint: String,
}

impl RenewalSettings {
    pub fn from_config(config: &Config) -> Result<Self, WsError> {
        let wsaa_endpoint = config.endpoint(WSAA.name).ok_or_else(|| {
            WsError::configuration(format!(
                "no {} endpoint for the {} environment",
                WSAA.name,
                if config.sandbox { "sandbox" } else { "production" }
            ))
        })?;

        Ok(Self {
            tickets_dir: config.storage.tickets_dir.clone(),
            certificate: config.files.certificate.clone(),
            private_key: config.files.private_key.clone(),
            passphrase: config.passphrase.clone().filter(|p| !p.is_empty()),
            wsaa_wsdl: config.files.wsaa_wsdl.clone(),
            wsaa_endpoint,
        })
    }
}

/// Keeps the access ticket of each `(service, identity)` current.
pub struct RenewalOrchestrator {
    store: Arc<dyn TicketStore>,
    builder: TicketRequestBuilder,
    signer: TicketSigner,
    transports: Arc<dyn TransportFactory>,
    settings: RenewalSettings,
}

impl RenewalOrchestrator {
    pub fn new(
        store: Arc<dyn TicketStore>,
        signer: TicketSigner,
        transports: Arc<dyn TransportFactory>,
        settings: RenewalSettings,
    ) -> Self {
        let builder = TicketRequestBuilder::new(store.clone(), settings.tickets_dir.clone());
        Self {
            store,
            builder,
            signer,
            transports,
            settings,
        }
    }

    pub fn store(&self) -> &Arc<dyn TicketStore> {
        &self.store
    }

    pub fn settings(&self) -> &RenewalSettings {
        &self.settings
    }

    /// Location of the stored ticket for `(service, identity)`.
    pub fn ticket_path(&self, service: Service, identity: &Identity) -> PathBuf {
        access_ticket_path(&self.settings.tickets_dir, identity, service)
    }

    /// Read and parse the stored ticket.
    pub fn read_ticket(&self, service: Service, identity: &Identity) -> Result<AccessTicket, WsError> {
        let path = self.ticket_path(service, identity);
        let raw = self.store.get(&path)?;
        AccessTicket::parse(&path, &raw)
    }

    /// Renew the ticket if it is absent or expired, using the wall clock.
    pub async fn check_renewal(
        &self,
        service: Service,
        identity: &Identity,
    ) -> Result<RenewalOutcome, WsError> {
        self.check_renewal_at(service, identity, Utc::now()).await
    }

    /// Renew the ticket if it is absent or expired at `now`.
    ///
    /// A stored ticket that cannot be read or parsed counts as expired.
    pub async fn check_renewal_at(
        &self,
        service: Service,
        identity: &Identity,
        now: DateTime<Utc>,
    ) -> Result<RenewalOutcome, WsError> {
        let path = self.ticket_path(service, identity);

        let stale = if !self.store.exists(&path) {
            Some("absent")
        } else {
            match self.read_ticket(service, identity) {
                Ok(ticket) if ticket.is_expired(now) => Some("expired"),
                Ok(ticket) => {
                    debug!(
                        service = %service,
                        cuit = %identity.cuit,
                        expires = %ticket.expiration_time,
                        "Access ticket still valid"
                    );
                    None
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Stored access ticket unusable");
                    Some("unusable")
                }
            }
        };

        let outcome = match stale {
            None => RenewalOutcome::Valid,
            Some(reason) => {
                info!(service = %service, cuit = %identity.cuit, reason, "Renewing access ticket");
                if let Err(e) = self.authenticate(service, identity, now).await {
                    metrics::RENEWAL_CHECKS
                        .with_label_values(&[service.key(), "failed"])
                        .inc();
                    return Err(e);
                }
                RenewalOutcome::Renewed
            }
        };

        metrics::RENEWAL_CHECKS
            .with_label_values(&[service.key(), outcome.as_str()])
            .inc();
        Ok(outcome)
    }

    /// Obtain a new ticket unconditionally and store it.
    pub async fn authenticate(
        &self,
        service: Service,
        identity: &Identity,
        now: DateTime<Utc>,
    ) -> Result<(), WsError> {
        let started = Instant::now();
        let result = self.run_authentication(service, identity, now).await;

        metrics::LOGIN_DURATION
            .with_label_values(&[service.key()])
            .observe(started.elapsed().as_secs_f64());
        let label = if result.is_ok() { "success" } else { "failed" };
        metrics::AUTHENTICATIONS
            .with_label_values(&[service.key(), label])
            .inc();

        result
    }

    async fn run_authentication(
        &self,
        service: Service,
        identity: &Identity,
        now: DateTime<Utc>,
    ) -> Result<(), WsError> {
        let settings = &self.settings;

        if !self.store.is_directory(&settings.tickets_dir) {
            self.store.make_directory(&settings.tickets_dir, true)?;
            debug!(path = %settings.tickets_dir.display(), "Created tickets directory");
        }

        if !self.store.exists(&settings.certificate) {
            return Err(WsError::file_access(
                &settings.certificate,
                "certificate not found",
            ));
        }
        if !settings.private_key.exists() {
            return Err(WsError::file_access(
                &settings.private_key,
                "private key not found",
            ));
        }
        if let Some(wsdl) = &settings.wsaa_wsdl {
            if !wsdl.exists() {
                return Err(WsError::file_access(wsdl, "service description not found"));
            }
        }

        let (request, xml) = self.builder.build(service, now)?;
        let certificate = self.store.get(&settings.certificate)?;
        let cms = self
            .signer
            .sign(
                &xml,
                &certificate,
                &settings.private_key,
                settings.passphrase.as_deref(),
            )
            .await?;

        let transport = self.transports.connect(WSAA, &settings.wsaa_endpoint)?;
        let client = AuthServiceClient::new(
            transport,
            self.store.clone(),
            settings.tickets_dir.clone(),
        );
        let ticket = client.login_cms(&cms).await?;

        let path = self.ticket_path(service, identity);
        let issued = AccessTicket::parse(&path, ticket.as_bytes()).map_err(|e| {
            warn!(service = %service, error = %e, "Discarding unusable ticket from login");
            WsError::malformed_response(LOGIN_OPERATION, e.to_string())
        })?;
        self.store.put(&path, issued.raw())?;

        info!(
            service = %service,
            cuit = %identity.cuit,
            unique_id = request.unique_id,
            path = %path.display(),
            "Access ticket stored"
        );
        Ok(())
    }
}
