use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::storage::CampStorage;

/// 关闭超时时间（秒）
const SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// 单个任务超时时间（秒）
const TASK_TIMEOUT_SECS: u64 = 10;

/// 关闭时需要收尾的资源
pub struct ShutdownContext {
    pub storage: Arc<CampStorage>,
    pub sync_worker: Option<JoinHandle<()>>,
    pub shutdown_tx: watch::Sender<bool>,
}

/// 等待 Ctrl+C
pub async fn wait_for_signal() {
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Shutdown signal received");
        }
        Err(e) => {
            warn!(
                "Failed to listen for Ctrl+C: {}. Proceeding with shutdown anyway.",
                e
            );
        }
    }
}

/// 停止同步 worker、关闭数据库，整体有超时
pub async fn perform_shutdown(ctx: ShutdownContext) {
    match timeout(
        Duration::from_secs(SHUTDOWN_TIMEOUT_SECS),
        perform_shutdown_tasks(ctx),
    )
    .await
    {
        Ok(()) => {
            info!("All shutdown tasks completed successfully");
        }
        Err(_) => {
            error!(
                "Shutdown tasks timed out after {} seconds",
                SHUTDOWN_TIMEOUT_SECS
            );
        }
    }
}

async fn perform_shutdown_tasks(ctx: ShutdownContext) {
    let ShutdownContext {
        storage,
        sync_worker,
        shutdown_tx,
    } = ctx;

    // receiver 可能已随 worker 退出而关闭
    let _ = shutdown_tx.send(true);

    if let Some(worker) = sync_worker {
        match timeout(Duration::from_secs(TASK_TIMEOUT_SECS), worker).await {
            Ok(Ok(())) => info!("Cache sync worker stopped"),
            Ok(Err(e)) => error!("Cache sync worker panicked: {}", e),
            Err(_) => error!(
                "Cache sync worker did not stop within {} seconds",
                TASK_TIMEOUT_SECS
            ),
        }
    }

    match timeout(Duration::from_secs(TASK_TIMEOUT_SECS), storage.close()).await {
        Ok(Ok(())) => info!("Database connection closed"),
        Ok(Err(e)) => error!("Failed to close database: {}", e),
        Err(_) => error!("Database close timed out after {} seconds", TASK_TIMEOUT_SECS),
    }
}
