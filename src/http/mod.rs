//! HTTP 服务器模块 - 使用 Axum 接收触发事件
//!
//! 功能包括：
//! - 触发器入口
//! - 健康检查
//! - Prometheus 指标

pub mod routes;
pub mod server;

pub use server::{HttpServerState, TriggerHttpServer};
