//! Application state wiring the engine to its SQLite storage.
//!
//! `ProcessService` is generic over the repository trait; AppState pins it to
//! the concrete infra implementation.

use std::sync::Arc;

use procflow_core::event::EventBus;
use procflow_core::executor::Executor;
use procflow_core::observer::EventBusObserver;
use procflow_core::registry::NodeRegistry;
use procflow_core::service::ProcessService;
use procflow_infra::config::load_engine_config;
use procflow_infra::filesystem::{prepare_data_dir, resolve_data_dir};
use procflow_infra::sqlite::pool::DatabasePool;
use procflow_infra::sqlite::process::SqliteProcessRepository;
use procflow_types::config::EngineConfig;
use procflow_types::event::ProcessEvent;
use tokio::sync::broadcast;

/// Concrete service type pinned to the SQLite repository.
pub type ConcreteProcessService = ProcessService<SqliteProcessRepository>;

/// Shared application state used by the CLI commands.
#[derive(Clone)]
pub struct AppState {
    pub process_service: Arc<ConcreteProcessService>,
    pub db_pool: DatabasePool,
}

impl AppState {
    /// Resolve the data directory, open the database and wire the service.
    pub async fn init(config: EngineConfig) -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        let db_path = prepare_data_dir(&data_dir, &config.database_file).await?;
        let db_pool = DatabasePool::open(&db_path).await?;

        let repo = Arc::new(SqliteProcessRepository::new(db_pool.clone()));
        let registry = Arc::new(NodeRegistry::with_defaults());
        let event_bus = EventBus::new(config.event_bus_capacity);

        let executor = Executor::new(repo, registry)
            .with_observer(Arc::new(EventBusObserver::new(event_bus.clone())))
            .with_event_bus(event_bus.clone())
            .with_max_steps(config.max_steps_per_trigger);

        spawn_event_logger(event_bus.subscribe());

        Ok(Self {
            process_service: Arc::new(ProcessService::new(executor)),
            db_pool,
        })
    }
}

/// Load the configuration from the resolved data directory.
pub async fn load_config() -> EngineConfig {
    load_engine_config(&resolve_data_dir()).await
}

/// Forward engine events to the trace log.
fn spawn_event_logger(mut rx: broadcast::Receiver<ProcessEvent>) {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => tracing::trace!(
                    process_id = %event.process_id(),
                    node_id = event.node_id().unwrap_or("-"),
                    event = ?event,
                    "engine event"
                ),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "event logger lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}
