//! Authenticated connections to the target web services.

mod credentials;
mod status;

pub use credentials::CredentialEnvelope;
pub use status::{probe, ServiceStatus};

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::WsError;
use crate::service::Service;
use crate::signer::{OpensslSigner, TicketSigner};
use crate::soap::{HttpTransportFactory, SoapTransport, TransportFactory};
use crate::store::TicketStore;
use crate::ticket::Identity;
use crate::wsaa::{RenewalOrchestrator, RenewalOutcome, RenewalSettings};

/// A transport bound to a service, with the credentials to pass along.
pub struct ServiceConnection {
    pub service: Service,
    pub endpoint: String,
    pub transport: Box<dyn SoapTransport>,
    pub credentials: CredentialEnvelope,
    /// How the ticket check went before connecting.
    pub renewal: RenewalOutcome,
    /// Present when the liveness probe ran.
    pub status: Option<ServiceStatus>,
}

/// Opens service connections, renewing the access ticket first when needed.
pub struct ServiceConnector {
    config: Config,
    identity: Identity,
    orchestrator: RenewalOrchestrator,
    transports: Arc<dyn TransportFactory>,
}

impl ServiceConnector {
    pub fn new(
        config: Config,
        orchestrator: RenewalOrchestrator,
        transports: Arc<dyn TransportFactory>,
    ) -> Self {
        let identity = config.identity();
        Self {
            config,
            identity,
            orchestrator,
            transports,
        }
    }

    /// Wire the production stack: `openssl` signing and HTTP transports.
    pub fn from_config(config: Config, store: Arc<dyn TicketStore>) -> Result<Self, WsError> {
        let transports: Arc<dyn TransportFactory> =
            Arc::new(HttpTransportFactory::new(config.transport.clone()));

        let mut signer = TicketSigner::new(Arc::new(OpensslSigner::new(config.signer.clone())));
        if let Some(dir) = &config.signer.temp_dir {
            signer = signer.with_temp_root(dir);
        }

        let orchestrator = RenewalOrchestrator::new(
            store,
            signer,
            transports.clone(),
            RenewalSettings::from_config(&config)?,
        );
        Ok(Self::new(config, orchestrator, transports))
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn orchestrator(&self) -> &RenewalOrchestrator {
        &self.orchestrator
    }

    /// Connect to `service` using the wall clock for the ticket check.
    pub async fn connect(&self, service: Service) -> Result<ServiceConnection, WsError> {
        self.connect_at(service, Utc::now()).await
    }

    pub async fn connect_at(
        &self,
        service: Service,
        now: DateTime<Utc>,
    ) -> Result<ServiceConnection, WsError> {
        let renewal = self
            .orchestrator
            .check_renewal_at(service, &self.identity, now)
            .await?;

        let endpoint = self.config.endpoint(service.key()).ok_or_else(|| {
            WsError::configuration(format!(
                "no endpoint for {} in the {} environment",
                service,
                if self.identity.sandbox { "sandbox" } else { "production" }
            ))
        })?;

        if let Some(wsdl) = self.config.service_wsdl(service.key()) {
            if !wsdl.exists() {
                return Err(WsError::file_access(wsdl, "service description not found"));
            }
        }

        let transport = self
            .transports
            .connect(service.endpoint_description(), &endpoint)?;

        let ticket = self.orchestrator.read_ticket(service, &self.identity)?;
        let credentials = CredentialEnvelope::new(service, &ticket, &self.identity);

        let status = if self.config.probe_status {
            let status = probe(transport.as_ref(), service).await?;
            debug!(service = %service, status = %status.describe(), "Service is up");
            Some(status)
        } else {
            None
        };

        info!(
            service = %service,
            cuit = %self.identity.cuit,
            endpoint = %endpoint,
            renewal = renewal.as_str(),
            "Service connection ready"
        );

        Ok(ServiceConnection {
            service,
            endpoint,
            transport,
            credentials,
            renewal,
            status,
        })
    }
}
