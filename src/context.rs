use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// 触发上下文
///
/// 对应一次"文档已创建"事件：集合名、文档 ID 以及事件元数据。
#[derive(Debug, Clone, Serialize)]
pub struct TriggerContext {
    /// 事件 ID（由宿主平台提供，缺省时生成）
    pub event_id: String,
    /// 集合名
    pub collection: String,
    /// 新文档 ID
    pub document_id: String,
    /// 事件时间
    pub timestamp: DateTime<Utc>,
    /// 路径参数（例如 notificationId / announcementId）
    pub params: HashMap<String, String>,
}

impl TriggerContext {
    /// 创建新的触发上下文
    pub fn new(collection: impl Into<String>, document_id: impl Into<String>) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            collection: collection.into(),
            document_id: document_id.into(),
            timestamp: Utc::now(),
            params: HashMap::new(),
        }
    }

    /// 设置事件 ID
    pub fn with_event_id(mut self, event_id: impl Into<String>) -> Self {
        self.event_id = event_id.into();
        self
    }

    /// 添加路径参数
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// 获取路径参数
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_builder() {
        let ctx = TriggerContext::new("announcements", "a1")
            .with_event_id("evt-1")
            .with_param("announcementId", "a1");
        assert_eq!(ctx.event_id, "evt-1");
        assert_eq!(ctx.document_id, "a1");
        assert_eq!(ctx.param("announcementId"), Some("a1"));
        assert_eq!(ctx.param("missing"), None);
    }
}
