use anyhow::{Context, Result};
use proofpot_ledger::{CorrelationIndex, OwnershipLedger};
use proofpot_registry::AuthorshipRegistry;
use proofpot_rpc::{start_server, AppState, EventBus};
use proofpot_storage::{LedgerStore, MemoryStorage, RegistryStore, SledStorage};
use proofpot_types::SystemClock;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod config;

use config::{NodeConfig, StorageBackend};

const PROOFPOT_VERSION: &str = env!("CARGO_PKG_VERSION");

fn git_commit_hash() -> &'static str {
    option_env!("GIT_COMMIT_HASH").unwrap_or("unknown")
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = config::command().get_matches();

    if matches.get_flag("version_flag") {
        println!("ProofPot {} (commit {})", PROOFPOT_VERSION, git_commit_hash());
        return Ok(());
    }

    let mut config = NodeConfig::load(matches.get_one::<String>("config").map(String::as_str))?;
    config.apply_overrides(&matches);
    config.validate()?;

    init_logging(&config)?;

    if matches.get_flag("check") {
        let storage = config.storage_backend()?;
        let policy = config.access_policy()?;
        info!(%storage, ?policy, "configuration is valid");
        return Ok(());
    }

    run(config).await
}

async fn run(config: NodeConfig) -> Result<()> {
    info!(
        version = PROOFPOT_VERSION,
        commit = git_commit_hash(),
        node_id = %config.node_id,
        "starting ProofPot node"
    );

    let mut sled = None;
    let (registry_store, ledger_store): (Arc<dyn RegistryStore>, Arc<dyn LedgerStore>) =
        match config.storage_backend()? {
            StorageBackend::Sled => {
                let storage = Arc::new(SledStorage::new(&config.data_dir).with_context(|| {
                    format!("failed to open sled store at {}", config.data_dir.display())
                })?);
                info!("Using sled storage at {}", config.data_dir.display());
                sled = Some(storage.clone());
                (storage.clone() as Arc<dyn RegistryStore>, storage as Arc<dyn LedgerStore>)
            }
            StorageBackend::Memory => {
                warn!("Using in-memory storage; state is lost on shutdown");
                let storage = Arc::new(MemoryStorage::new());
                (storage.clone() as Arc<dyn RegistryStore>, storage as Arc<dyn LedgerStore>)
            }
        };

    let clock = Arc::new(SystemClock::new());
    let registry = AuthorshipRegistry::open(registry_store, clock.clone(), config.registry_config()?)
        .context("failed to open authorship registry")?;
    let ledger =
        OwnershipLedger::new(ledger_store, clock).with_confirmation_delay(config.mint_delay());
    let events = Arc::new(EventBus::new(config.event_log_capacity));

    spawn_event_logger(&events);

    let state = AppState::new(
        Arc::new(registry),
        Arc::new(ledger),
        Arc::new(CorrelationIndex::new()),
        events,
        config.node_id.clone(),
    );

    let served = start_server(state, &config.rpc_addr()).await;

    if let Some(storage) = sled {
        storage.flush().context("failed to flush sled store")?;
        info!("sled store flushed");
    }

    served
}

fn spawn_event_logger(events: &EventBus) {
    let mut rx = events.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(recorded) => info!(
                    sequence = recorded.sequence,
                    event = recorded.event.name(),
                    "provenance event"
                ),
                Err(RecvError::Lagged(skipped)) => {
                    warn!("event logger lagged; skipped {} events", skipped)
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}

fn init_logging(config: &NodeConfig) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    if config.log_format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init()?;
    }

    Ok(())
}
