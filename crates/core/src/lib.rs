pub mod config;
pub mod connector;
pub mod error;
pub mod metrics;
pub mod service;
pub mod signer;
pub mod soap;
pub mod store;
pub mod testing;
pub mod ticket;
pub mod wsaa;
pub mod xml;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use connector::{CredentialEnvelope, ServiceConnection, ServiceConnector, ServiceStatus};
pub use error::WsError;
pub use service::Service;
pub use signer::{OpensslSigner, SigningError, SigningPrimitive, TicketSigner};
pub use soap::{HttpTransportFactory, SoapTransport, TransportError, TransportFactory};
pub use store::{LocalFileStore, StoreError, TicketStore};
pub use ticket::{AccessTicket, Identity, TicketRequest, TicketRequestBuilder};
pub use wsaa::{AuthServiceClient, RenewalOrchestrator, RenewalOutcome, RenewalSettings};
