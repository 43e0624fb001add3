use actix_web::{HttpResponse, Responder, web};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, trace};

use crate::cache::{CacheHealthStatus, SnapshotCache};
use crate::storage::{CampCounts, CampStorage};

/// 存储检查超时
const STORAGE_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

// 应用启动时间
#[derive(Clone, Debug)]
pub struct AppStartTime {
    pub start_datetime: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
pub struct HealthStorageCheck {
    pub status: String,
    pub backend: String,
    pub counts: Option<CampCounts>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthChecks {
    pub storage: HealthStorageCheck,
    pub cache: CacheHealthStatus,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub uptime: u64,
    pub checks: HealthChecks,
    pub response_time_ms: u64,
}

/// Health Service
///
/// 直接读 storage 和 cache，不经过 CampService：探针要快，也不该受业务逻辑影响。
/// 缓存异常只体现在 checks.cache 中，不影响整体状态。
pub struct HealthService;

impl HealthService {
    pub async fn health_check(
        storage: web::Data<Arc<CampStorage>>,
        cache: web::Data<Arc<dyn SnapshotCache>>,
        app_start_time: web::Data<AppStartTime>,
    ) -> impl Responder {
        let start_time = Instant::now();
        trace!("Received health check request");

        let backend = storage.get_backend_config().storage_type;
        let storage_status = match storage.count_all_within(STORAGE_CHECK_TIMEOUT).await {
            Ok(counts) => {
                trace!("Storage health check passed: {:?}", counts);
                HealthStorageCheck {
                    status: "healthy".to_string(),
                    backend,
                    counts: Some(counts),
                    error: None,
                }
            }
            Err(e) => {
                error!("Storage health check failed: {}", e);
                HealthStorageCheck {
                    status: "unhealthy".to_string(),
                    backend,
                    counts: None,
                    error: Some(e.to_string()),
                }
            }
        };

        let cache_status = cache.health_check().await;

        let now = chrono::Utc::now();
        let uptime = (now - app_start_time.start_datetime).num_seconds().max(0) as u64;
        let is_healthy = storage_status.status == "healthy";

        let body = HealthResponse {
            status: if is_healthy { "healthy" } else { "unhealthy" }.to_string(),
            timestamp: now.to_rfc3339(),
            uptime,
            checks: HealthChecks {
                storage: storage_status,
                cache: cache_status,
            },
            response_time_ms: start_time.elapsed().as_millis() as u64,
        };

        info!(
            "Health check completed in {:?}, status: {}",
            start_time.elapsed(),
            body.status
        );

        if is_healthy {
            HttpResponse::Ok().json(body)
        } else {
            HttpResponse::ServiceUnavailable().json(body)
        }
    }

    // 就绪检查，只返回 200
    pub async fn readiness_check() -> impl Responder {
        trace!("Received readiness check request");

        HttpResponse::Ok()
            .append_header(("Content-Type", "text/plain"))
            .body("OK")
    }

    // 存活检查
    pub async fn liveness_check() -> impl Responder {
        trace!("Received liveness check request");

        HttpResponse::NoContent().finish()
    }
}

/// Health 路由配置
pub fn health_routes() -> actix_web::Scope {
    web::scope("")
        .route("", web::get().to(HealthService::health_check))
        .route("", web::head().to(HealthService::health_check))
        .route("/ready", web::get().to(HealthService::readiness_check))
        .route("/ready", web::head().to(HealthService::readiness_check))
        .route("/live", web::get().to(HealthService::liveness_check))
        .route("/live", web::head().to(HealthService::liveness_check))
}
