use async_trait::async_trait;
use tracing::info;

use crate::error::{Result, ServerError};
use crate::push::provider::provider_trait::PushProvider;
use crate::push::types::{BatchResponse, OutboundMessage, SendResponse, Target};

/// Mock Provider（未配置 FCM 凭据时使用）
///
/// 不调用真实 API，只打印日志并视为全部成功
pub struct MockProvider;

#[async_trait]
impl PushProvider for MockProvider {
    async fn send(&self, message: &OutboundMessage) -> Result<String> {
        if let Target::Tokens(_) = message.target {
            return Err(ServerError::InvalidRequest(
                "multicast message passed to send()".to_string(),
            ));
        }
        let message_id = format!("mock-{}", uuid::Uuid::new_v4());
        info!(
            "[MOCK PUSH] send: target={}, notification={:?}, data={:?}, message_id={}",
            message.target.describe(),
            message.notification,
            message.data,
            message_id
        );
        Ok(message_id)
    }

    async fn send_multicast(&self, message: &OutboundMessage) -> Result<BatchResponse> {
        let tokens = message.tokens();
        info!(
            "[MOCK PUSH] multicast: tokens={}, notification={:?}, data={:?}",
            tokens.len(),
            message.notification,
            message.data
        );
        let responses = tokens
            .iter()
            .enumerate()
            .map(|(idx, _)| SendResponse::ok(format!("mock-{}", idx)))
            .collect();
        Ok(BatchResponse::from_responses(responses))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_multicast_succeeds_for_every_token() {
        let message = OutboundMessage::new(Target::Tokens(vec!["a".into(), "b".into()]));
        let batch = MockProvider.send_multicast(&message).await.unwrap();
        assert_eq!(batch.success_count, 2);
        assert_eq!(batch.failure_count, 0);
    }

    #[tokio::test]
    async fn test_mock_send_rejects_multicast_target() {
        let message = OutboundMessage::new(Target::Tokens(vec!["a".into()]));
        assert!(MockProvider.send(&message).await.is_err());

        let topic = OutboundMessage::new(Target::Topic("news".into()));
        assert!(MockProvider.send(&topic).await.unwrap().starts_with("mock-"));
    }
}
