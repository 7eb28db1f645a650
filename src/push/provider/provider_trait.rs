use async_trait::async_trait;

use crate::error::Result;
use crate::push::types::{BatchResponse, OutboundMessage};

/// Push Provider Trait（推送网关接口）
#[async_trait]
pub trait PushProvider: Send + Sync {
    /// 发送单条消息（Token 或 Topic 目标），返回网关的消息 ID
    async fn send(&self, message: &OutboundMessage) -> Result<String>;

    /// multicast 发送（Tokens 目标），每个 token 独立投递，结果与 token 顺序一致
    ///
    /// 单个 token 的失败体现在 BatchResponse 中；鉴权或请求构造失败时整体返回错误。
    async fn send_multicast(&self, message: &OutboundMessage) -> Result<BatchResponse>;

    /// Provider 名称（用于日志）
    fn name(&self) -> &'static str;
}
