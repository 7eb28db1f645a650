//! 用户文档存储
//!
//! 公告广播前需要读取 users 集合中的全部 token。

pub mod firestore_user_repo;
pub mod memory_user_repo;

pub use firestore_user_repo::FirestoreUserRepository;
pub use memory_user_repo::InMemoryUserRepository;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::UserRecord;

/// 用户仓库 trait（只读）
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// 读取集合中的全部用户文档
    async fn list_users(&self) -> Result<Vec<UserRecord>>;

    /// 实现名称（用于日志）
    fn name(&self) -> &'static str;
}
