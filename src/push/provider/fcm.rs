use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::auth::GoogleAuth;
use crate::config::FcmConfig;
use crate::error::{Result, ServerError};
use crate::push::provider::provider_trait::PushProvider;
use crate::push::types::{BatchResponse, OutboundMessage, SendError, SendResponse, Target};

/// 单次 multicast 的 token 上限
pub const MAX_MULTICAST_TOKENS: usize = 500;

/// FCM (Firebase Cloud Messaging) Provider
///
/// 使用 FCM HTTP v1 API。multicast 按 token 逐条调用 messages:send 并发执行。
pub struct FcmProvider {
    client: Client,
    endpoint: String,
    project_id: String,
    auth: Arc<GoogleAuth>,
    validate_only: bool,
}

impl FcmProvider {
    /// 按配置创建（端点、超时、validate_only）
    pub fn from_config(config: &FcmConfig, project_id: String, auth: Arc<GoogleAuth>) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ServerError::Configuration(format!("FCM HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            project_id,
            auth,
            validate_only: config.validate_only,
        })
    }

    fn send_url(&self) -> String {
        format!(
            "{}/v1/projects/{}/messages:send",
            self.endpoint, self.project_id
        )
    }

    /// 构建 FCM 请求体
    fn build_fcm_payload(&self, message: &OutboundMessage) -> Result<FcmRequest> {
        let (token, topic) = match &message.target {
            Target::Token(token) => {
                if token.is_empty() {
                    return Err(ServerError::InvalidRequest(
                        "registration token must be a non-empty string".to_string(),
                    ));
                }
                (Some(token.clone()), None)
            }
            Target::Topic(topic) => (None, Some(normalize_topic(topic)?)),
            Target::Tokens(_) => {
                return Err(ServerError::InvalidRequest(
                    "multicast message must be sent with send_multicast".to_string(),
                ))
            }
        };

        let notification = message.notification.as_ref().map(|n| FcmNotification {
            title: n.title.clone(),
            body: n.body.clone(),
        });

        let android = message.android.as_ref().map(|a| FcmAndroid {
            priority: a.priority.to_uppercase(),
            notification: a.channel_id.as_ref().map(|channel_id| FcmAndroidNotification {
                channel_id: channel_id.clone(),
            }),
        });

        let apns = message.apns.as_ref().map(|a| FcmApns {
            payload: FcmApnsPayload {
                aps: FcmAps {
                    content_available: a.content_available.then_some(1),
                    badge: a.badge,
                    sound: a.sound.clone(),
                },
            },
        });

        Ok(FcmRequest {
            validate_only: self.validate_only,
            message: FcmMessage {
                token,
                topic,
                notification,
                data: (!message.data.is_empty()).then(|| message.data.clone()),
                android,
                apns,
            },
        })
    }

    /// 发送一条已构建的请求，返回消息名或该条消息的错误
    async fn post_message(
        &self,
        request: &FcmRequest,
        access_token: Option<&str>,
    ) -> std::result::Result<String, SendError> {
        let mut builder = self
            .client
            .post(self.send_url())
            .header("Content-Type", "application/json")
            .json(request);
        if let Some(token) = access_token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| SendError::new("NETWORK", format!("FCM request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            let body: FcmSendResponse = response
                .json()
                .await
                .map_err(|e| SendError::new("INTERNAL", format!("invalid FCM response: {}", e)))?;
            Ok(body.name)
        } else {
            let error_text = response.text().await.unwrap_or_default();
            Err(parse_fcm_error(status.as_u16(), &error_text))
        }
    }
}

#[async_trait]
impl PushProvider for FcmProvider {
    async fn send(&self, message: &OutboundMessage) -> Result<String> {
        let request = self.build_fcm_payload(message)?;
        let access_token = self.auth.access_token().await?;

        info!(
            "[FCM] Sending push: target={}, validate_only={}",
            message.target.describe(),
            self.validate_only
        );

        match self.post_message(&request, access_token.as_deref()).await {
            Ok(name) => {
                info!("[FCM] Push sent successfully: name={}", name);
                Ok(name)
            }
            Err(e) => {
                error!("[FCM] Push failed: target={}, error={}", message.target.describe(), e);
                Err(ServerError::Gateway(e.to_string()))
            }
        }
    }

    async fn send_multicast(&self, message: &OutboundMessage) -> Result<BatchResponse> {
        let tokens = match &message.target {
            Target::Tokens(tokens) => tokens,
            _ => {
                return Err(ServerError::InvalidRequest(
                    "send_multicast requires a token list".to_string(),
                ))
            }
        };
        if tokens.is_empty() {
            return Err(ServerError::InvalidRequest(
                "tokens must be a non-empty array".to_string(),
            ));
        }
        if tokens.len() > MAX_MULTICAST_TOKENS {
            return Err(ServerError::InvalidRequest(format!(
                "tokens list must not contain more than {} items, got {}",
                MAX_MULTICAST_TOKENS,
                tokens.len()
            )));
        }

        let requests = tokens
            .iter()
            .map(|token| self.build_fcm_payload(&message.for_token(token)))
            .collect::<Result<Vec<_>>>()?;
        let access_token = self.auth.access_token().await?;

        info!(
            "[FCM] Sending multicast: tokens={}, validate_only={}",
            tokens.len(),
            self.validate_only
        );

        let results = join_all(
            requests
                .iter()
                .map(|request| self.post_message(request, access_token.as_deref())),
        )
        .await;

        let responses = results
            .into_iter()
            .map(|result| match result {
                Ok(name) => SendResponse::ok(name),
                Err(e) => SendResponse::failed(e),
            })
            .collect();
        let batch = BatchResponse::from_responses(responses);

        debug!(
            "[FCM] Multicast finished: success={}, failure={}",
            batch.success_count, batch.failure_count
        );
        Ok(batch)
    }

    fn name(&self) -> &'static str {
        "fcm"
    }
}

/// 去掉 /topics/ 前缀并校验 topic 名
fn normalize_topic(topic: &str) -> Result<String> {
    let name = topic.strip_prefix("/topics/").unwrap_or(topic);
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~' | '%'));
    if valid {
        Ok(name.to_string())
    } else {
        Err(ServerError::InvalidRequest(format!(
            "malformed topic name: {:?}",
            topic
        )))
    }
}

/// 解析 FCM 错误响应，优先取 FcmError.errorCode
fn parse_fcm_error(status: u16, body: &str) -> SendError {
    match serde_json::from_str::<FcmErrorBody>(body) {
        Ok(FcmErrorBody { error }) => {
            let code = error
                .details
                .iter()
                .find_map(|d| d.error_code.clone())
                .or(error.status)
                .unwrap_or_else(|| format!("HTTP_{}", status));
            SendError::new(code, error.message.unwrap_or_default())
        }
        Err(_) => SendError::new(format!("HTTP_{}", status), body.to_string()),
    }
}

#[derive(Debug, Serialize)]
struct FcmRequest {
    validate_only: bool,
    message: FcmMessage,
}

#[derive(Debug, Serialize)]
struct FcmMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    notification: Option<FcmNotification>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    android: Option<FcmAndroid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    apns: Option<FcmApns>,
}

#[derive(Debug, Serialize)]
struct FcmNotification {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<String>,
}

#[derive(Debug, Serialize)]
struct FcmAndroid {
    priority: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    notification: Option<FcmAndroidNotification>,
}

#[derive(Debug, Serialize)]
struct FcmAndroidNotification {
    channel_id: String,
}

#[derive(Debug, Serialize)]
struct FcmApns {
    payload: FcmApnsPayload,
}

#[derive(Debug, Serialize)]
struct FcmApnsPayload {
    aps: FcmAps,
}

#[derive(Debug, Serialize)]
struct FcmAps {
    #[serde(rename = "content-available", skip_serializing_if = "Option::is_none")]
    content_available: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    badge: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sound: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FcmSendResponse {
    name: String,
}

#[derive(Debug, Deserialize)]
struct FcmErrorBody {
    error: FcmErrorStatus,
}

#[derive(Debug, Deserialize)]
struct FcmErrorStatus {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    details: Vec<FcmErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct FcmErrorDetail {
    #[serde(rename = "errorCode", default)]
    error_code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeliveryConfig;
    use crate::model::NotificationRecord;
    use crate::push::planner::MessagePlanner;
    use axum::{body::Bytes, http::{HeaderMap, StatusCode, Uri}, Json, Router};
    use serde_json::{json, Value};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Captured {
        requests: Mutex<Vec<(String, Option<String>, Value)>>,
    }

    /// 本地模拟 FCM：token "bad" 返回 UNREGISTERED，其余成功
    async fn spawn_fake_fcm(captured: Arc<Captured>) -> String {
        let app = Router::new().fallback(move |uri: Uri, headers: HeaderMap, body: Bytes| {
            let captured = captured.clone();
            async move {
                let value: Value = serde_json::from_slice(&body).unwrap();
                let auth = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                captured
                    .requests
                    .lock()
                    .unwrap()
                    .push((uri.path().to_string(), auth, value.clone()));

                if value["message"]["token"] == "bad" {
                    (
                        StatusCode::NOT_FOUND,
                        Json(json!({
                            "error": {
                                "code": 404,
                                "message": "Requested entity was not found.",
                                "status": "NOT_FOUND",
                                "details": [{
                                    "@type": "type.googleapis.com/google.firebase.fcm.v1.FcmError",
                                    "errorCode": "UNREGISTERED"
                                }]
                            }
                        })),
                    )
                } else {
                    (
                        StatusCode::OK,
                        Json(json!({ "name": "projects/demo/messages/0:1" })),
                    )
                }
            }
        });
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn provider(endpoint: String) -> FcmProvider {
        let config = FcmConfig {
            endpoint,
            ..FcmConfig::default()
        };
        FcmProvider::from_config(
            &config,
            "demo".to_string(),
            Arc::new(GoogleAuth::with_static_token("test-token")),
        )
        .unwrap()
    }

    fn planner() -> MessagePlanner {
        MessagePlanner::new(Arc::new(DeliveryConfig::default()))
    }

    #[test]
    fn test_payload_shape() {
        let p = provider("http://localhost".into());
        let message = planner()
            .plan_notification(&NotificationRecord {
                tokens: vec!["t1".into()],
                title: Some("Hi".into()),
                body: Some("There".into()),
                kind: Some("chat".into()),
                ..Default::default()
            })
            .for_token("t1");

        let value = serde_json::to_value(p.build_fcm_payload(&message).unwrap()).unwrap();
        assert_eq!(value["validate_only"], false);
        let msg = &value["message"];
        assert_eq!(msg["token"], "t1");
        assert!(msg.get("topic").is_none());
        assert_eq!(msg["notification"]["title"], "Hi");
        assert_eq!(msg["data"]["type"], "chat");
        assert_eq!(msg["data"]["click_action"], "FLUTTER_NOTIFICATION_CLICK");
        assert_eq!(msg["android"]["priority"], "HIGH");
        assert_eq!(msg["android"]["notification"]["channel_id"], "high_importance_channel");
        assert_eq!(msg["apns"]["payload"]["aps"]["content-available"], 1);
        assert_eq!(msg["apns"]["payload"]["aps"]["badge"], 1);
        assert_eq!(msg["apns"]["payload"]["aps"]["sound"], "default");
    }

    #[test]
    fn test_normalize_topic() {
        assert_eq!(normalize_topic("announcements").unwrap(), "announcements");
        assert_eq!(normalize_topic("/topics/news-1").unwrap(), "news-1");
        assert!(normalize_topic("").is_err());
        assert!(normalize_topic("bad topic").is_err());
    }

    #[test]
    fn test_parse_fcm_error() {
        let err = parse_fcm_error(
            400,
            r#"{"error":{"code":400,"message":"bad token","status":"INVALID_ARGUMENT"}}"#,
        );
        assert_eq!(err.code, "INVALID_ARGUMENT");
        assert_eq!(err.message, "bad token");

        let err = parse_fcm_error(502, "upstream down");
        assert_eq!(err.code, "HTTP_502");
    }

    #[tokio::test]
    async fn test_multicast_reports_each_token() {
        let captured = Arc::new(Captured::default());
        let endpoint = spawn_fake_fcm(captured.clone()).await;
        let p = provider(endpoint);

        let message = OutboundMessage::new(Target::Tokens(vec!["good".into(), "bad".into()]))
            .with_notification(Some("Hi".into()), Some("There".into()));
        let batch = p.send_multicast(&message).await.unwrap();

        assert_eq!(batch.success_count, 1);
        assert_eq!(batch.failure_count, 1);
        assert!(batch.responses[0].success);
        assert_eq!(batch.responses[1].error.as_ref().unwrap().code, "UNREGISTERED");

        let requests = captured.requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        for (path, auth, _) in requests.iter() {
            assert_eq!(path, "/v1/projects/demo/messages:send");
            assert_eq!(auth.as_deref(), Some("Bearer test-token"));
        }
    }

    #[tokio::test]
    async fn test_topic_send_returns_name() {
        let captured = Arc::new(Captured::default());
        let endpoint = spawn_fake_fcm(captured.clone()).await;
        let p = provider(endpoint);

        let message = OutboundMessage::new(Target::Topic("announcements".into()));
        let name = p.send(&message).await.unwrap();
        assert_eq!(name, "projects/demo/messages/0:1");

        let requests = captured.requests.lock().unwrap();
        assert_eq!(requests[0].2["message"]["topic"], "announcements");
    }

    #[tokio::test]
    async fn test_multicast_limits() {
        let p = provider("http://127.0.0.1:9".into());

        let empty = OutboundMessage::new(Target::Tokens(vec![]));
        assert!(matches!(p.send_multicast(&empty).await, Err(ServerError::InvalidRequest(_))));

        let tokens = (0..=MAX_MULTICAST_TOKENS).map(|i| format!("t{}", i)).collect();
        let too_many = OutboundMessage::new(Target::Tokens(tokens));
        assert!(matches!(p.send_multicast(&too_many).await, Err(ServerError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_unreachable_gateway_fails_per_token() {
        // 端口 9 (discard) 上通常没有 HTTP 服务
        let p = provider("http://127.0.0.1:9".into());
        let message = OutboundMessage::new(Target::Tokens(vec!["a".into()]));
        let batch = p.send_multicast(&message).await.unwrap();
        assert_eq!(batch.failure_count, 1);
        assert_eq!(batch.responses[0].error.as_ref().unwrap().code, "NETWORK");
    }
}
