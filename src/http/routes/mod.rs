//! HTTP 路由模块
//!
//! 路由结构：
//! - `POST /triggers/{collection}/{document_id}` - 文档创建事件（可选 X-Trigger-Secret 认证）
//! - `GET /health` - 存活检查
//! - `GET /metrics` - Prometheus 抓取端点

pub mod health;
pub mod metrics;
pub mod trigger;

use axum::{routing::get, Router};
use crate::http::HttpServerState;

/// 创建所有路由
pub fn create_routes() -> Router<HttpServerState> {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/metrics", get(metrics::metrics_handler))
        .merge(trigger::create_route())
}
