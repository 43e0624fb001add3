//! Server mode
//!
//! Configures and starts the HTTP server: GraphQL endpoint, health probes,
//! request ids and CORS. Ctrl+C stops the server, then the cache sync worker
//! and the database are shut down.

use actix_cors::Cors;
use actix_web::{
    App, HttpServer,
    http::{Method, header},
    middleware::{Compress, DefaultHeaders},
    web,
};
use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{info, warn};

use crate::api::graphql::{GraphqlPath, build_schema, graphql_routes};
use crate::api::middleware::{GraphqlAuth, RequestIdMiddleware};
use crate::api::services::{AppStartTime, health_routes};
use crate::config::{ApiConfig, get_config};
use crate::runtime::lifetime;
use crate::runtime::lifetime::shutdown::ShutdownContext;

/// 按 api.cors_allowed_origins 构建 CORS：空列表为同源，`*` 为任意来源
pub fn build_cors(api: &ApiConfig) -> Cors {
    let origins = &api.cors_allowed_origins;
    if origins.is_empty() {
        return Cors::default();
    }

    let cors = if origins.iter().any(|o| o == "*") {
        Cors::default().allow_any_origin()
    } else {
        origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
    };

    cors.allowed_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allowed_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::HeaderName::from_static(
            crate::api::middleware::request_id::REQUEST_ID_HEADER,
        )])
        .max_age(3600)
}

/// 注册路由：GraphQL（带 token 校验）和健康检查
///
/// 需要的 app_data：`CampSchema`、`GraphqlPath`、`Arc<CampStorage>`、
/// `Arc<dyn SnapshotCache>`、`AppStartTime`。
pub fn configure_routes(cfg: &mut web::ServiceConfig, api: &ApiConfig) {
    cfg.service(
        web::scope(&api.graphql_path)
            .wrap(GraphqlAuth::new(&api.token, api.enable_playground))
            .service(graphql_routes(api.enable_playground)),
    )
    .service(web::scope(&api.health_prefix).service(health_routes()));
}

/// Run the HTTP server
///
/// **Note**: Logging must be initialized before calling this function
pub async fn run_server() -> Result<()> {
    let app_start_time = AppStartTime {
        start_datetime: chrono::Utc::now(),
    };

    let startup = lifetime::startup::prepare_server_startup()
        .await
        .inspect_err(|e| tracing::error!("Server startup failed: {}", e))?;

    let config = get_config();
    let api = config.api.clone();

    if api.token.is_empty() {
        warn!("GraphQL endpoint is disabled (api.token is empty)");
    } else {
        info!("GraphQL endpoint available at: {}", api.graphql_path);
        if api.enable_playground {
            info!("GraphiQL playground enabled at GET {}", api.graphql_path);
        }
    }
    info!("Health endpoints available at: {}", api.health_prefix);

    let schema = build_schema(
        startup.service.clone(),
        startup.cache_sync.clone(),
        &api,
    );
    let storage = startup.storage.clone();
    let cache = startup.cache.clone();
    let graphql_path = GraphqlPath(api.graphql_path.clone());

    let cpu_count = config.server.cpu_count.clamp(1, 32);
    info!("Using {} worker threads for the server", cpu_count);

    let bind_address = format!("{}:{}", config.server.host, config.server.port);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(RequestIdMiddleware)
            .wrap(build_cors(&api))
            .wrap(Compress::default())
            .wrap(DefaultHeaders::new().add(("Cache-Control", "no-store")))
            .app_data(web::Data::new(schema.clone()))
            .app_data(web::Data::new(graphql_path.clone()))
            .app_data(web::Data::new(storage.clone()))
            .app_data(web::Data::new(cache.clone()))
            .app_data(web::Data::new(app_start_time.clone()))
            .configure(|cfg| configure_routes(cfg, &api))
    })
    .keep_alive(Duration::from_secs(30))
    .client_request_timeout(Duration::from_millis(5000))
    .workers(cpu_count)
    .disable_signals()
    .bind(&bind_address)
    .with_context(|| format!("Failed to bind {}", bind_address))?
    .run();

    warn!("Starting server at http://{}", bind_address);

    let handle = server.handle();
    tokio::pin!(server);

    tokio::select! {
        res = &mut server => {
            res.context("HTTP server error")?;
        }
        _ = lifetime::shutdown::wait_for_signal() => {
            info!("Stopping HTTP server...");
            handle.stop(true).await;
        }
    }

    lifetime::shutdown::perform_shutdown(ShutdownContext {
        storage: startup.storage,
        sync_worker: startup.sync_worker,
        shutdown_tx: startup.shutdown_tx,
    })
    .await;

    warn!("Graceful shutdown: all tasks completed");
    Ok(())
}
