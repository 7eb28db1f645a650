use async_trait::async_trait;
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::context::TriggerContext;

/// 触发器处理器 trait
///
/// 每次"文档已创建"事件调用一次。处理器自行捕获错误，结果总是一个 HandlerResult。
#[async_trait]
pub trait TriggerHandler: Send + Sync {
    /// `snapshot` 为 None 表示文档快照缺失
    async fn handle(&self, context: &TriggerContext, snapshot: Option<serde_json::Value>)
        -> HandlerResult;
    fn name(&self) -> &'static str;
}

/// 处理结果
///
/// JSON 形式：跳过为 `null`；成功为 `{"success":true,"sentCount":N}`
/// （topic 发送不带 sentCount）；失败为 `{"error":"..."}`。
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerResult {
    Skipped(String),
    Sent { sent_count: Option<usize> },
    Failed { error: String },
}

impl HandlerResult {
    pub fn skipped(reason: impl Into<String>) -> Self {
        HandlerResult::Skipped(reason.into())
    }

    pub fn failed(error: impl ToString) -> Self {
        HandlerResult::Failed {
            error: error.to_string(),
        }
    }

    /// 指标中的 outcome 标签
    pub fn outcome(&self) -> &'static str {
        match self {
            HandlerResult::Skipped(_) => "skipped",
            HandlerResult::Sent { .. } => "sent",
            HandlerResult::Failed { .. } => "failed",
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl Serialize for HandlerResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            HandlerResult::Skipped(_) => serializer.serialize_none(),
            HandlerResult::Sent { sent_count } => {
                let mut map = serializer.serialize_map(None)?;
                map.serialize_entry("success", &true)?;
                if let Some(count) = sent_count {
                    map.serialize_entry("sentCount", count)?;
                }
                map.end()
            }
            HandlerResult::Failed { error } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("error", error)?;
                map.end()
            }
        }
    }
}

pub mod announcement_handler;
pub mod notification_handler;

pub use announcement_handler::AnnouncementBroadcastDispatcher;
pub use notification_handler::DirectNotificationDispatcher;
