use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};

use crate::context::TriggerContext;
use crate::error::Result;
use crate::handler::{HandlerResult, TriggerHandler};
use crate::infra::metrics;
use crate::model::{collect_tokens, is_truthy, AnnouncementRecord};
use crate::push::{MessagePlanner, PushProvider};
use crate::repository::UserRepository;

/// 路径参数名
pub const PARAM_ANNOUNCEMENT_ID: &str = "announcementId";

const FIELD_IS_IMPORTANT: &str = "isImportant";

/// announcements 集合触发器：重要公告广播到 topic
///
/// 发送前会读取全部用户的 token，但消息只发往 topic，token 仅用于日志。
pub struct AnnouncementBroadcastDispatcher {
    planner: MessagePlanner,
    provider: Arc<dyn PushProvider>,
    users: Arc<dyn UserRepository>,
}

impl AnnouncementBroadcastDispatcher {
    pub fn new(
        planner: MessagePlanner,
        provider: Arc<dyn PushProvider>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            planner,
            provider,
            users,
        }
    }

    async fn dispatch(
        &self,
        context: &TriggerContext,
        snapshot: serde_json::Value,
    ) -> Result<HandlerResult> {
        // 先看原始字段，其余字段类型有误也不影响跳过
        if !snapshot.get(FIELD_IS_IMPORTANT).is_some_and(is_truthy) {
            info!("[ANNOUNCE] Not an important announcement, skipping notification");
            return Ok(HandlerResult::skipped("not important"));
        }

        let record: AnnouncementRecord = serde_json::from_value(snapshot)?;

        let users = self.users.list_users().await?;
        let tokens = collect_tokens(&users);
        info!(
            "[ANNOUNCE] Collected {} tokens from {} users via {}",
            tokens.len(),
            users.len(),
            self.users.name()
        );

        if tokens.is_empty() && self.planner.delivery().announcement_skip_without_tokens {
            info!("[ANNOUNCE] No tokens to send to");
            return Ok(HandlerResult::skipped("no tokens"));
        }

        let announcement_id = context
            .param(PARAM_ANNOUNCEMENT_ID)
            .unwrap_or(context.document_id.as_str());
        let message = self.planner.plan_announcement(&record, announcement_id);
        let message_id = self.provider.send(&message).await?;

        info!(
            "[ANNOUNCE] Successfully sent announcement notification: {}",
            message_id
        );
        metrics::record_push(1, 0);

        Ok(HandlerResult::Sent { sent_count: None })
    }
}

#[async_trait]
impl TriggerHandler for AnnouncementBroadcastDispatcher {
    async fn handle(
        &self,
        context: &TriggerContext,
        snapshot: Option<serde_json::Value>,
    ) -> HandlerResult {
        let snapshot = match snapshot {
            Some(value) if !value.is_null() => value,
            _ => {
                info!("[ANNOUNCE] No announcement data found: id={}", context.document_id);
                return HandlerResult::skipped("no announcement data");
            }
        };

        match self.dispatch(context, snapshot).await {
            Ok(result) => result,
            Err(e) => {
                error!(
                    "[ANNOUNCE] Error sending announcement notification: id={}, error={}",
                    context.document_id, e
                );
                HandlerResult::failed(e)
            }
        }
    }

    fn name(&self) -> &'static str {
        "AnnouncementBroadcastDispatcher"
    }
}
