use std::sync::Arc;

use mosq_engine::{
    InMemoryRecordStore, MongoRecordStore, RecordStore, RewardEngine, SystemClock, Uid,
};
use tokio::net::TcpListener;

use crate::config::{ServerConfig, StoreConfig};
use crate::error::{ServerError, ServerResult};
use crate::router::build_router;

/// Mosq rewards server.
pub struct MosqServer {
    config: ServerConfig,
}

impl MosqServer {
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Open the configured store and wrap it in an engine.
    ///
    /// A MongoDB store is pinged and has its unique indexes created before
    /// the engine is returned.
    pub async fn build_engine(&self) -> ServerResult<RewardEngine> {
        self.config.validate()?;
        let store: Arc<dyn RecordStore> = match &self.config.store {
            StoreConfig::Memory => {
                tracing::warn!("using in-memory store; records are lost on exit");
                Arc::new(InMemoryRecordStore::new())
            }
            StoreConfig::Mongodb { uri, database } => {
                let store = MongoRecordStore::connect(uri, database).await?;
                tracing::info!(database = %database, "connected to MongoDB");
                Arc::new(store)
            }
        };
        store.ensure_indexes().await?;

        let clock = SystemClock::with_offset_hours(self.config.checkin_utc_offset_hours)
            .ok_or_else(|| {
                ServerError::Config(format!(
                    "invalid check-in offset: {}",
                    self.config.checkin_utc_offset_hours
                ))
            })?;
        let fallback = Uid::parse(&self.config.fallback_invitor)
            .map_err(|e| ServerError::Config(format!("fallback_invitor: {e}")))?;

        Ok(RewardEngine::new(store, Arc::new(clock)).with_fallback_invitor(fallback))
    }

    /// Start serving requests until Ctrl-C.
    pub async fn serve(self) -> ServerResult<()> {
        let engine = self.build_engine().await?;
        let app = build_router(engine);
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        tracing::info!("Mosq server listening on {}", self.config.bind_addr);
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
