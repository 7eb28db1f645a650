//! 用户仓库 - 内存实现（本地运行 / 测试）

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{Result, ServerError};
use crate::model::UserRecord;
use crate::repository::UserRepository;

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<Vec<UserRecord>>,
    fetches: AtomicUsize,
}

impl InMemoryUserRepository {
    pub fn new(users: Vec<UserRecord>) -> Self {
        Self {
            users: RwLock::new(users),
            fetches: AtomicUsize::new(0),
        }
    }

    /// 从 JSON 文件加载，格式为用户文档数组
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ServerError::Configuration(format!("无法读取用户文件 {:?}: {}", path.as_ref(), e))
        })?;
        let users: Vec<UserRecord> = serde_json::from_str(&content)?;
        Ok(Self::new(users))
    }

    pub async fn push(&self, user: UserRecord) {
        self.users.write().await.push(user);
    }

    /// list_users 被调用的次数
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn list_users(&self) -> Result<Vec<UserRecord>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.users.read().await.clone())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
