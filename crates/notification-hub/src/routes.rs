//! 路由配置模块

use std::time::Duration;

use axum::{Router, http::HeaderValue, middleware, routing::get};
use hub_shared::config::ServerConfig;
use hub_shared::observability::middleware as obs_middleware;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tracing::info;

use crate::handlers;
use crate::middleware::auth_middleware;
use crate::state::AppState;

/// 业务与探针路由
///
/// `/api` 需要 Bearer Token；`/health` 与 `/ready` 公开。
pub fn api_routes(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api", get(handlers::feed::get_feed))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected)
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .with_state(state)
}

/// 完整应用：业务路由加上超时、CORS 和可观测性中间件
pub fn build_app(state: AppState, server: &ServerConfig) -> Router {
    api_routes(state)
        .layer(TimeoutLayer::new(Duration::from_secs(server.request_timeout_secs)))
        .layer(cors_layer(&server.cors_origins))
        .layer(middleware::from_fn(obs_middleware::http_tracing))
        .layer(middleware::from_fn(obs_middleware::request_id))
}

/// CORS 配置："*" 放行全部来源，否则按逗号分隔的来源列表放行
pub fn cors_layer(allowed_origins: &str) -> CorsLayer {
    if allowed_origins.trim() == "*" {
        info!("CORS allowed_origins: * (all origins)");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        info!("CORS allowed_origins: {}", allowed_origins);
        let origins: Vec<HeaderValue> = allowed_origins
            .split(',')
            .filter_map(|s| s.trim().parse::<HeaderValue>().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
