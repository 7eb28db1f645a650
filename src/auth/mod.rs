// 认证模块 - Google OAuth access token 与触发器密钥校验

pub mod google_auth;
pub mod trigger_secret;

// 重新导出主要类型
pub use google_auth::{GoogleAuth, ServiceAccountKey, SCOPE_DATASTORE, SCOPE_FIREBASE_MESSAGING};
pub use trigger_secret::TriggerSecret;
