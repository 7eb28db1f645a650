use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::context::TriggerContext;
use crate::error::Result;
use crate::handler::{HandlerResult, TriggerHandler};
use crate::infra::metrics;
use crate::model::{has_length, NotificationRecord};
use crate::push::{BatchResponse, FailedToken, MessagePlanner, PushProvider};

const FIELD_TOKENS: &str = "tokens";

/// notifications 集合触发器：向文档中列出的 token 做 multicast
pub struct DirectNotificationDispatcher {
    planner: MessagePlanner,
    provider: Arc<dyn PushProvider>,
}

impl DirectNotificationDispatcher {
    pub fn new(planner: MessagePlanner, provider: Arc<dyn PushProvider>) -> Self {
        Self { planner, provider }
    }

    async fn dispatch(&self, snapshot: serde_json::Value) -> Result<HandlerResult> {
        // 先看原始字段，其余字段类型有误也不影响跳过
        if !has_length(snapshot.get(FIELD_TOKENS)) {
            info!("[NOTIFY] No tokens to send to");
            return Ok(HandlerResult::skipped("no tokens"));
        }

        let record: NotificationRecord = serde_json::from_value(snapshot)?;

        let message = self.planner.plan_notification(&record);
        let response = self.provider.send_multicast(&message).await?;

        info!(
            "[NOTIFY] {} messages were sent successfully",
            response.success_count
        );
        log_failures(&response, &record.tokens);
        metrics::record_push(response.success_count, response.failure_count);

        Ok(HandlerResult::Sent {
            sent_count: Some(response.success_count),
        })
    }
}

/// 失败的 token 只记录日志，不重试；返回记录下的条目
fn log_failures(response: &BatchResponse, tokens: &[String]) -> Vec<FailedToken> {
    if response.failure_count == 0 {
        return Vec::new();
    }
    let failed_tokens = response.failed_tokens(tokens);
    warn!(
        failure_count = response.failure_count,
        failed_tokens = ?failed_tokens,
        "[NOTIFY] List of failed tokens"
    );
    failed_tokens
}

#[async_trait]
impl TriggerHandler for DirectNotificationDispatcher {
    async fn handle(
        &self,
        context: &TriggerContext,
        snapshot: Option<serde_json::Value>,
    ) -> HandlerResult {
        let snapshot = match snapshot {
            Some(value) if !value.is_null() => value,
            _ => {
                info!("[NOTIFY] No notification data found: id={}", context.document_id);
                return HandlerResult::skipped("no notification data");
            }
        };

        match self.dispatch(snapshot).await {
            Ok(result) => result,
            Err(e) => {
                error!(
                    "[NOTIFY] Error sending notification: id={}, error={}",
                    context.document_id, e
                );
                HandlerResult::failed(e)
            }
        }
    }

    fn name(&self) -> &'static str {
        "DirectNotificationDispatcher"
    }
}
