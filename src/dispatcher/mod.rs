use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use crate::context::TriggerContext;
use crate::error::{Result, ServerError};
use crate::handler::{HandlerResult, TriggerHandler};
use crate::infra::metrics;

/// notifications 集合
pub const COLLECTION_NOTIFICATIONS: &str = "notifications";
/// announcements 集合
pub const COLLECTION_ANNOUNCEMENTS: &str = "announcements";

struct Registration {
    /// 文档 ID 对应的路径参数名，如 notificationId
    id_param: &'static str,
    handler: Arc<dyn TriggerHandler>,
}

/// 触发器分发器：集合名 → 处理器
pub struct TriggerDispatcher {
    handlers: HashMap<String, Registration>,
}

impl TriggerDispatcher {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    pub fn register_handler(
        &mut self,
        collection: impl Into<String>,
        id_param: &'static str,
        handler: Arc<dyn TriggerHandler>,
    ) {
        self.handlers.insert(
            collection.into(),
            Registration { id_param, handler },
        );
    }

    pub fn has_collection(&self, collection: &str) -> bool {
        self.handlers.contains_key(collection)
    }

    /// 已注册的集合名（排序）
    pub fn collections(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// 将一次"文档已创建"事件交给对应处理器
    ///
    /// 未注册的集合返回 NotFound；处理器自身的失败体现在 HandlerResult 中。
    pub async fn dispatch(
        &self,
        context: TriggerContext,
        snapshot: Option<serde_json::Value>,
    ) -> Result<HandlerResult> {
        let Some(registration) = self.handlers.get(&context.collection) else {
            warn!("未找到集合 {} 的处理器", context.collection);
            return Err(ServerError::NotFound(format!(
                "no trigger registered for collection {}",
                context.collection
            )));
        };

        let context = if context.param(registration.id_param).is_none() {
            let document_id = context.document_id.clone();
            context.with_param(registration.id_param, document_id)
        } else {
            context
        };

        debug!(
            "Dispatching {}/{} to {} (event_id={})",
            context.collection,
            context.document_id,
            registration.handler.name(),
            context.event_id
        );

        let started = Instant::now();
        let result = registration.handler.handle(&context, snapshot).await;
        metrics::record_trigger(
            &context.collection,
            result.outcome(),
            started.elapsed().as_secs_f64(),
        );

        Ok(result)
    }
}

impl Default for TriggerDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// 触发器分发器构建器
pub struct TriggerDispatcherBuilder {
    dispatcher: TriggerDispatcher,
}

impl TriggerDispatcherBuilder {
    pub fn new() -> Self {
        Self {
            dispatcher: TriggerDispatcher::new(),
        }
    }

    pub fn with_handler(
        mut self,
        collection: impl Into<String>,
        id_param: &'static str,
        handler: Arc<dyn TriggerHandler>,
    ) -> Self {
        self.dispatcher
            .register_handler(collection, id_param, handler);
        self
    }

    pub fn build(self) -> TriggerDispatcher {
        self.dispatcher
    }
}

impl Default for TriggerDispatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct EchoHandler;

    #[async_trait]
    impl TriggerHandler for EchoHandler {
        async fn handle(
            &self,
            context: &TriggerContext,
            snapshot: Option<serde_json::Value>,
        ) -> HandlerResult {
            match snapshot {
                Some(_) => HandlerResult::failed(context.param("itemId").unwrap_or("-")),
                None => HandlerResult::skipped("empty"),
            }
        }

        fn name(&self) -> &'static str {
            "EchoHandler"
        }
    }

    fn dispatcher() -> TriggerDispatcher {
        TriggerDispatcherBuilder::new()
            .with_handler("items", "itemId", Arc::new(EchoHandler))
            .build()
    }

    #[tokio::test]
    async fn test_dispatch_sets_id_param() {
        let result = dispatcher()
            .dispatch(
                TriggerContext::new("items", "doc-7"),
                Some(serde_json::json!({})),
            )
            .await
            .unwrap();
        assert_eq!(result, HandlerResult::failed("doc-7"));
    }

    #[tokio::test]
    async fn test_unknown_collection() {
        let result = dispatcher()
            .dispatch(TriggerContext::new("other", "x"), None)
            .await;
        assert!(matches!(result, Err(ServerError::NotFound(_))));
    }

    #[test]
    fn test_collections_sorted() {
        let d = TriggerDispatcherBuilder::new()
            .with_handler("b", "bId", Arc::new(EchoHandler))
            .with_handler("a", "aId", Arc::new(EchoHandler))
            .build();
        assert_eq!(d.collections(), vec!["a", "b"]);
        assert!(d.has_collection("a"));
        assert!(!d.has_collection("c"));
    }
}
