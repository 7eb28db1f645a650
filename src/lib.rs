pub mod auth;
pub mod cli;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod http;  // 触发器 HTTP 入口
pub mod infra;
pub mod logging;
pub mod model;
pub mod push;
pub mod repository;
pub mod server;

pub use config::ServerConfig;
pub use context::TriggerContext;
pub use dispatcher::{TriggerDispatcher, TriggerDispatcherBuilder};
pub use error::{Result, ServerError};
pub use handler::{
    AnnouncementBroadcastDispatcher, DirectNotificationDispatcher, HandlerResult, TriggerHandler,
};
pub use model::*;
pub use server::PushRelayServer;
