use clap::{Parser, Subcommand};
use festreg::application::orders::OrderService;
use festreg::application::pipeline::RegistrationPipeline;
use festreg::config::{GatewayConfig, ServeArgs, load_catalog};
use festreg::domain::ports::{PaymentGatewayBox, RegistrationStoreBox};
use festreg::domain::signature::PaymentVerifier;
use festreg::infrastructure::in_memory::{InMemoryPaymentGateway, InMemoryRegistrationStore};
use festreg::infrastructure::razorpay::RazorpayGateway;
use festreg::interfaces::csv::writer::CsvExporter;
use festreg::interfaces::http::{AppState, serve};
use miette::{IntoDiagnostic, Result, miette};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the registration HTTP server
    Serve(ServeArgs),
    /// Print the event catalog as CSV
    Events {
        /// Only events of this department id (e.g. `civil`)
        #[arg(long)]
        department: Option<String>,
        /// Event catalog JSON file. The bundled catalog is used when absent.
        #[arg(long, env = "EVENT_CATALOG")]
        catalog: Option<PathBuf>,
    },
    /// Print recorded registrations from a persistent store as CSV
    Export {
        /// Path to the RocksDB database written by `serve --db-path`
        #[arg(long)]
        db_path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve(args) => run_server(args).await,
        Command::Events {
            department,
            catalog,
        } => print_events(department.as_deref(), catalog.as_deref()),
        Command::Export { db_path } => export_registrations(&db_path).await,
    }
}

async fn run_server(args: ServeArgs) -> Result<()> {
    let config = args.into_config().into_diagnostic()?;

    let catalog = Arc::new(config.load_catalog().into_diagnostic()?);
    info!(events = catalog.len(), "Event catalog loaded");

    let store = open_store(config.db_path.as_deref())?;

    let gateway: PaymentGatewayBox = match &config.gateway {
        GatewayConfig::Razorpay {
            base_url,
            key_id,
            key_secret,
        } => Box::new(
            RazorpayGateway::new(base_url, key_id.as_str(), key_secret.as_str(), config.gateway_timeout)
                .into_diagnostic()?,
        ),
        GatewayConfig::Offline => {
            warn!("Using the offline payment gateway; orders are not real");
            Box::new(InMemoryPaymentGateway::new())
        }
    };

    let state = Arc::new(AppState {
        catalog: Arc::clone(&catalog),
        pipeline: RegistrationPipeline::new(
            catalog,
            store,
            PaymentVerifier::new(config.signing_secret.as_str()),
        ),
        orders: OrderService::new(gateway, config.gateway_timeout),
    });

    info!("Binding to {}", config.bind_address);
    let listener = TcpListener::bind(&config.bind_address)
        .await
        .into_diagnostic()?;
    serve(listener, state).await.into_diagnostic()
}

fn open_store(db_path: Option<&Path>) -> Result<RegistrationStoreBox> {
    match db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => {
            use festreg::infrastructure::rocksdb::RocksDBStore;
            info!("Using RocksDB registration store at {}", path.display());
            Ok(Box::new(RocksDBStore::open(path).into_diagnostic()?))
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => {
            warn!(
                "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
            );
            Ok(Box::new(InMemoryRegistrationStore::new()))
        }
        None => Ok(Box::new(InMemoryRegistrationStore::new())),
    }
}

fn print_events(department: Option<&str>, catalog: Option<&Path>) -> Result<()> {
    let catalog = load_catalog(catalog).into_diagnostic()?;
    let stdout = io::stdout();
    let mut exporter = CsvExporter::new(stdout.lock());

    match department {
        Some(id) => {
            let events = catalog.department_events(id);
            if events.is_empty() {
                return Err(miette!("Unknown department: {id}"));
            }
            exporter.write_events(events).into_diagnostic()
        }
        None => exporter.write_events(catalog.events()).into_diagnostic(),
    }
}

#[cfg(feature = "storage-rocksdb")]
async fn export_registrations(db_path: &Path) -> Result<()> {
    use festreg::domain::ports::RegistrationStore;
    use festreg::infrastructure::rocksdb::RocksDBStore;

    let store = RocksDBStore::open(db_path).into_diagnostic()?;
    let registrations = store.all().await.into_diagnostic()?;
    info!(count = registrations.len(), "Exporting registrations");

    let stdout = io::stdout();
    CsvExporter::new(stdout.lock())
        .write_registrations(&registrations)
        .into_diagnostic()
}

#[cfg(not(feature = "storage-rocksdb"))]
async fn export_registrations(db_path: &Path) -> Result<()> {
    Err(miette!(
        "Cannot export {}: the 'storage-rocksdb' feature is not enabled",
        db_path.display()
    ))
}
