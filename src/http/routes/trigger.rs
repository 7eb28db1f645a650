//! POST /triggers/{collection}/{document_id} - "文档已创建"事件入口
//!
//! 请求体为文档快照 JSON；空请求体或 `null` 视为快照缺失。

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
    response::Json,
    routing::post,
    Router,
};
use serde_json::Value;
use tracing::{info, warn};

use crate::context::TriggerContext;
use crate::error::{Result, ServerError};
use crate::http::HttpServerState;

/// 事件 ID 请求头
pub const HEADER_EVENT_ID: &str = "x-event-id";
/// 共享密钥请求头
pub const HEADER_TRIGGER_SECRET: &str = "x-trigger-secret";

pub fn create_route() -> Router<HttpServerState> {
    Router::new().route("/triggers/{collection}/{document_id}", post(handle_trigger))
}

fn verify_trigger_secret(headers: &HeaderMap, state: &HttpServerState) -> Result<()> {
    if !state.trigger_secret.is_enabled() {
        return Ok(());
    }

    let provided = headers
        .get(HEADER_TRIGGER_SECRET)
        .and_then(|v| v.to_str().ok());
    if !state.trigger_secret.verify(provided) {
        warn!("❌ 无效的 X-Trigger-Secret");
        return Err(ServerError::Unauthorized(
            "missing or invalid X-Trigger-Secret".to_string(),
        ));
    }
    Ok(())
}

/// 解析快照：空请求体与 `null` 都视为缺失
pub fn parse_snapshot(body: &[u8]) -> Result<Option<Value>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| ServerError::InvalidRequest(format!("snapshot is not valid JSON: {}", e)))?;
    Ok((!value.is_null()).then_some(value))
}

async fn handle_trigger(
    State(state): State<HttpServerState>,
    Path((collection, document_id)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>> {
    verify_trigger_secret(&headers, &state)?;

    if !state.dispatcher.has_collection(&collection) {
        return Err(ServerError::NotFound(format!(
            "no trigger registered for collection {}",
            collection
        )));
    }

    let snapshot = parse_snapshot(&body)?;

    let mut context = TriggerContext::new(collection, document_id);
    if let Some(event_id) = headers.get(HEADER_EVENT_ID).and_then(|v| v.to_str().ok()) {
        context = context.with_event_id(event_id);
    }

    info!(
        "📥 Trigger {}/{} (event_id={})",
        context.collection, context.document_id, context.event_id
    );

    let result = state.dispatcher.dispatch(context, snapshot).await?;
    Ok(Json(result.to_json()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_snapshot() {
        assert_eq!(parse_snapshot(b"").unwrap(), None);
        assert_eq!(parse_snapshot(b"  \n").unwrap(), None);
        assert_eq!(parse_snapshot(b"null").unwrap(), None);
        assert_eq!(
            parse_snapshot(br#"{"tokens":[]}"#).unwrap(),
            Some(serde_json::json!({ "tokens": [] }))
        );
        assert!(matches!(
            parse_snapshot(b"{not json"),
            Err(ServerError::InvalidRequest(_))
        ));
    }
}
