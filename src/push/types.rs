use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// 通知栏内容
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub title: Option<String>,
    pub body: Option<String>,
}

/// Android 投递参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AndroidConfig {
    /// "high" / "normal"
    pub priority: String,
    pub channel_id: Option<String>,
}

/// APNs 投递参数（aps 字典）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApnsConfig {
    pub content_available: bool,
    pub badge: Option<u32>,
    pub sound: Option<String>,
}

/// 投递目标：单个 token、token 列表（multicast）或 topic，三选一
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Target {
    Token(String),
    Tokens(Vec<String>),
    Topic(String),
}

impl Target {
    pub fn describe(&self) -> String {
        match self {
            Target::Token(_) => "token".to_string(),
            Target::Tokens(tokens) => format!("{} tokens", tokens.len()),
            Target::Topic(topic) => format!("topic:{}", topic),
        }
    }
}

/// 待发送的推送消息，每次触发构造一次，不落库
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub notification: Option<Notification>,
    pub data: BTreeMap<String, String>,
    pub target: Target,
    pub android: Option<AndroidConfig>,
    pub apns: Option<ApnsConfig>,
}

impl OutboundMessage {
    pub fn new(target: Target) -> Self {
        Self {
            notification: None,
            data: BTreeMap::new(),
            target,
            android: None,
            apns: None,
        }
    }

    pub fn with_notification(mut self, title: Option<String>, body: Option<String>) -> Self {
        self.notification = Some(Notification { title, body });
        self
    }

    pub fn with_data(mut self, data: BTreeMap<String, String>) -> Self {
        self.data = data;
        self
    }

    pub fn with_android(mut self, android: AndroidConfig) -> Self {
        self.android = Some(android);
        self
    }

    pub fn with_apns(mut self, apns: ApnsConfig) -> Self {
        self.apns = Some(apns);
        self
    }

    /// multicast 消息展开成单 token 消息
    pub fn for_token(&self, token: &str) -> Self {
        Self {
            target: Target::Token(token.to_string()),
            ..self.clone()
        }
    }

    /// multicast 的 token 列表（非 multicast 时为空）
    pub fn tokens(&self) -> &[String] {
        match &self.target {
            Target::Tokens(tokens) => tokens,
            _ => &[],
        }
    }
}

/// 单个 token 的发送错误
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendError {
    /// FCM 错误码，如 UNREGISTERED / INVALID_ARGUMENT
    pub code: String,
    pub message: String,
}

impl SendError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for SendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// 单个 token 的发送结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendResponse {
    pub success: bool,
    pub message_id: Option<String>,
    pub error: Option<SendError>,
}

impl SendResponse {
    pub fn ok(message_id: impl Into<String>) -> Self {
        Self {
            success: true,
            message_id: Some(message_id.into()),
            error: None,
        }
    }

    pub fn failed(error: SendError) -> Self {
        Self {
            success: false,
            message_id: None,
            error: Some(error),
        }
    }
}

/// multicast 发送结果，`responses` 与 token 顺序一致
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchResponse {
    pub success_count: usize,
    pub failure_count: usize,
    pub responses: Vec<SendResponse>,
}

impl BatchResponse {
    pub fn from_responses(responses: Vec<SendResponse>) -> Self {
        let success_count = responses.iter().filter(|r| r.success).count();
        Self {
            success_count,
            failure_count: responses.len() - success_count,
            responses,
        }
    }

    /// 失败的 token 及其错误
    pub fn failed_tokens(&self, tokens: &[String]) -> Vec<FailedToken> {
        self.responses
            .iter()
            .zip(tokens)
            .filter(|(resp, _)| !resp.success)
            .map(|(resp, token)| FailedToken {
                token: token.clone(),
                error: resp.error.clone(),
            })
            .collect()
    }
}

/// 发送失败的 token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedToken {
    pub token: String,
    pub error: Option<SendError>,
}
