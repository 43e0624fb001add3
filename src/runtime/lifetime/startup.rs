use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::{SnapshotCache, create_snapshot_cache};
use crate::config::get_config;
use crate::services::{CacheSyncService, CampService};
use crate::storage::{CampStorage, StorageFactory};

pub struct StartupContext {
    pub storage: Arc<CampStorage>,
    pub cache: Arc<dyn SnapshotCache>,
    pub cache_sync: Arc<CacheSyncService>,
    pub service: Arc<CampService>,
    /// 缓存后端为 none 时不启动
    pub sync_worker: Option<JoinHandle<()>>,
    pub shutdown_tx: watch::Sender<bool>,
}

/// 准备服务器启动的上下文：存储、缓存、同步 worker 和业务服务
pub async fn prepare_server_startup() -> Result<StartupContext> {
    let start_time = std::time::Instant::now();
    debug!("Starting pre-startup processing...");

    let config = get_config();

    let storage = StorageFactory::create()
        .await
        .context("Failed to create storage backend")?;
    info!(
        "Using storage backend: {}",
        storage.get_backend_config().storage_type
    );

    let cache = match create_snapshot_cache(&config.cache).await {
        Ok(cache) => cache,
        Err(e) => {
            // Redis 连不上时降级为内存缓存
            warn!("Snapshot cache unavailable ({}), falling back to memory", e);
            let mut fallback = config.cache.clone();
            fallback.backend = crate::config::CacheBackend::Memory;
            create_snapshot_cache(&fallback)
                .await
                .context("Failed to create fallback cache")?
        }
    };

    let cache_sync = Arc::new(CacheSyncService::new(
        storage.clone(),
        cache.clone(),
        config.cache.retry_count,
    ));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut service = CampService::new(storage.clone(), config.sync.clone());
    let sync_worker = if cache.is_enabled() {
        service = service.with_trigger(cache_sync.trigger());
        let interval = Duration::from_secs(config.cache.refresh_interval_secs.max(1));
        Some(cache_sync.clone().spawn_worker(interval, shutdown_rx))
    } else {
        info!("Snapshot cache disabled, sync worker not started");
        None
    };

    info!(
        "Pre-startup processing completed in {} ms",
        start_time.elapsed().as_millis()
    );

    Ok(StartupContext {
        storage,
        cache,
        cache_sync,
        service: Arc::new(service),
        sync_worker,
        shutdown_tx,
    })
}
