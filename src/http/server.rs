//! HTTP 服务器 - 使用 Axum 接收触发事件

use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::auth::TriggerSecret;
use crate::dispatcher::TriggerDispatcher;
use crate::http::routes;

/// HTTP 服务器共享状态
#[derive(Clone)]
pub struct HttpServerState {
    pub dispatcher: Arc<TriggerDispatcher>,
    pub trigger_secret: Arc<TriggerSecret>,
}

/// 触发器 HTTP 服务器
pub struct TriggerHttpServer {
    state: HttpServerState,
    bind_address: String,
}

impl TriggerHttpServer {
    pub fn new(
        dispatcher: Arc<TriggerDispatcher>,
        trigger_secret: TriggerSecret,
        bind_address: String,
    ) -> Self {
        Self {
            state: HttpServerState {
                dispatcher,
                trigger_secret: Arc::new(trigger_secret),
            },
            bind_address,
        }
    }

    /// 构建路由（测试中可直接 oneshot）
    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    /// 启动 HTTP 服务器，直到收到 Ctrl+C
    pub async fn start(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let app = self.router();

        let listener = tokio::net::TcpListener::bind(&self.bind_address).await?;

        info!("🌐 HTTP 服务器启动在 {}", self.bind_address);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("🛑 HTTP 服务器已停止");
        Ok(())
    }
}

pub fn build_router(state: HttpServerState) -> Router {
    Router::new()
        .merge(routes::create_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("无法监听 Ctrl+C: {}", e);
    }
}
