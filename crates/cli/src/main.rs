mod metrics;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use afipws_core::{
    load_config, validate_config, CredentialEnvelope, LocalFileStore, OpensslSigner,
    RenewalOutcome, SanitizedConfig, Service, ServiceConnector, ServiceStatus, TicketStore,
};

#[derive(Parser)]
#[command(name = "afipws")]
#[command(about = "Obtain and keep current AFIP web service access tickets", version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "AFIPWS_CONFIG", default_value = "afipws.toml")]
    config: PathBuf,

    /// Print Prometheus metrics after the command finishes
    #[arg(long)]
    metrics: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Renew the access ticket for a service if it is absent or expired
    Renew {
        /// Service key (wsmtxca, wsfe, wspn3)
        service: Service,

        /// Authenticate even if the stored ticket is still valid
        #[arg(long)]
        force: bool,
    },
    /// Open a connection and print the credentials to send with each call
    Connect {
        /// Service key (wsmtxca, wsfe, wspn3)
        service: Service,
    },
    /// Print the effective configuration with secrets redacted
    Config,
    /// Check that the signing tool can be run
    CheckSigner,
}

#[derive(Serialize)]
struct ConnectReport<'a> {
    service: Service,
    endpoint: &'a str,
    renewal: &'static str,
    credentials: &'a CredentialEnvelope,
    status: Option<&'a ServiceStatus>,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    // Load configuration
    info!("Loading configuration from {:?}", cli.config);
    let config = load_config(&cli.config)
        .with_context(|| format!("Failed to load config from {:?}", cli.config))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;
    info!(
        cuit = %config.cuit,
        sandbox = config.sandbox,
        tickets_dir = %config.storage.tickets_dir.display(),
        "Configuration loaded"
    );

    match cli.command {
        Command::Renew { service, force } => renew(config, service, force).await?,
        Command::Connect { service } => connect(config, service).await?,
        Command::Config => {
            let sanitized = SanitizedConfig::from(&config);
            println!("{}", serde_json::to_string_pretty(&sanitized)?);
        }
        Command::CheckSigner => {
            OpensslSigner::new(config.signer.clone())
                .validate()
                .await
                .context("Signing tool check failed")?;
            println!("{}: ok", config.signer.openssl_path.display());
        }
    }

    if cli.metrics {
        print!("{}", metrics::encode_metrics()?);
    }

    Ok(())
}

fn connector(config: afipws_core::Config) -> Result<ServiceConnector> {
    let store: Arc<dyn TicketStore> = Arc::new(LocalFileStore::new());
    ServiceConnector::from_config(config, store).context("Failed to set up service connector")
}

async fn renew(config: afipws_core::Config, service: Service, force: bool) -> Result<()> {
    let connector = connector(config)?;
    let orchestrator = connector.orchestrator();
    let identity = connector.identity();

    let outcome = if force {
        orchestrator
            .authenticate(service, identity, chrono::Utc::now())
            .await
            .with_context(|| format!("Authentication for {service} failed"))?;
        RenewalOutcome::Renewed
    } else {
        orchestrator
            .check_renewal(service, identity)
            .await
            .with_context(|| format!("Ticket renewal for {service} failed"))?
    };

    let ticket = orchestrator
        .read_ticket(service, identity)
        .context("Failed to read stored ticket")?;
    println!(
        "{service}: {} (expires {})",
        outcome.as_str(),
        ticket.expiration_time
    );
    Ok(())
}

async fn connect(config: afipws_core::Config, service: Service) -> Result<()> {
    let connector = connector(config)?;
    let connection = connector
        .connect(service)
        .await
        .with_context(|| format!("Connection to {service} failed"))?;

    let report = ConnectReport {
        service: connection.service,
        endpoint: &connection.endpoint,
        renewal: connection.renewal.as_str(),
        credentials: &connection.credentials,
        status: connection.status.as_ref(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
