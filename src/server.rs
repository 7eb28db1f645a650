use std::sync::Arc;

use tracing::{info, warn};

use crate::auth::{GoogleAuth, TriggerSecret, SCOPE_DATASTORE, SCOPE_FIREBASE_MESSAGING};
use crate::config::{DeliveryConfig, ServerConfig};
use crate::dispatcher::{
    TriggerDispatcher, TriggerDispatcherBuilder, COLLECTION_ANNOUNCEMENTS,
    COLLECTION_NOTIFICATIONS,
};
use crate::error::{Result, ServerError};
use crate::handler::announcement_handler::PARAM_ANNOUNCEMENT_ID;
use crate::handler::{AnnouncementBroadcastDispatcher, DirectNotificationDispatcher};
use crate::http::TriggerHttpServer;
use crate::push::{FcmProvider, MessagePlanner, MockProvider, PushProvider};
use crate::repository::{FirestoreUserRepository, InMemoryUserRepository, UserRepository};

/// notifications 集合的路径参数名
pub const PARAM_NOTIFICATION_ID: &str = "notificationId";

/// 注册两个触发器
pub fn build_dispatcher(
    delivery: Arc<DeliveryConfig>,
    provider: Arc<dyn PushProvider>,
    users: Arc<dyn UserRepository>,
) -> TriggerDispatcher {
    let planner = MessagePlanner::new(delivery);

    TriggerDispatcherBuilder::new()
        .with_handler(
            COLLECTION_NOTIFICATIONS,
            PARAM_NOTIFICATION_ID,
            Arc::new(DirectNotificationDispatcher::new(
                planner.clone(),
                provider.clone(),
            )),
        )
        .with_handler(
            COLLECTION_ANNOUNCEMENTS,
            PARAM_ANNOUNCEMENT_ID,
            Arc::new(AnnouncementBroadcastDispatcher::new(planner, provider, users)),
        )
        .build()
}

/// push-relay 服务
pub struct PushRelayServer {
    config: ServerConfig,
    dispatcher: Arc<TriggerDispatcher>,
}

impl PushRelayServer {
    /// 按配置创建推送网关与用户仓库
    pub fn new(config: ServerConfig) -> Result<Self> {
        info!("🔧 初始化 push-relay 组件...");

        let auth = build_google_auth(&config)?;

        let provider = build_provider(&config, auth.clone())?;
        info!("✅ 推送网关: {}", provider.name());

        let users = build_user_repository(&config, auth)?;
        info!("✅ 用户仓库: {}", users.name());

        Ok(Self::from_parts(config, provider, users))
    }

    /// 使用现成的网关与仓库（测试 / 嵌入）
    pub fn from_parts(
        config: ServerConfig,
        provider: Arc<dyn PushProvider>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        let delivery = Arc::new(config.delivery.clone());
        let dispatcher = Arc::new(build_dispatcher(delivery, provider, users));
        Self { config, dispatcher }
    }

    pub fn dispatcher(&self) -> Arc<TriggerDispatcher> {
        self.dispatcher.clone()
    }

    pub fn http_server(&self) -> TriggerHttpServer {
        TriggerHttpServer::new(
            self.dispatcher.clone(),
            TriggerSecret::new(self.config.trigger_secret.clone()),
            self.config.bind_address(),
        )
    }

    /// 启动 HTTP 服务直到退出
    pub async fn run(&self) -> Result<()> {
        if self.config.enable_metrics && !crate::infra::metrics::is_initialized() {
            match crate::infra::metrics::init() {
                Ok(()) => info!("📈 Prometheus 指标已启用: GET /metrics"),
                Err(e) => warn!("⚠️ Prometheus 指标初始化失败: {}", e),
            }
        }

        if self.config.trigger_secret.is_none() {
            warn!("⚠️ 未配置 trigger_secret，触发器入口不做认证");
        }

        info!(
            "🚀 push-relay 就绪，已注册集合: {:?}",
            self.dispatcher.collections()
        );

        self.http_server()
            .start()
            .await
            .map_err(|e| ServerError::Internal(format!("HTTP 服务器运行失败: {}", e)))
    }
}

/// FCM / Firestore 共用的 access token 来源；未配置凭据时为 None
fn build_google_auth(config: &ServerConfig) -> Result<Option<Arc<GoogleAuth>>> {
    if !config.fcm.has_credentials() {
        return Ok(None);
    }
    if let Some(token) = &config.fcm.access_token {
        return Ok(Some(Arc::new(GoogleAuth::with_static_token(token.clone()))));
    }
    if let Some(path) = &config.fcm.service_account_path {
        let auth = GoogleAuth::from_service_account_file(
            path,
            &[SCOPE_FIREBASE_MESSAGING, SCOPE_DATASTORE],
        )?;
        return Ok(Some(Arc::new(auth)));
    }
    Ok(None)
}

fn build_provider(
    config: &ServerConfig,
    auth: Option<Arc<GoogleAuth>>,
) -> Result<Arc<dyn PushProvider>> {
    let Some(auth) = auth else {
        warn!("⚠️ 未配置 FCM 凭据，使用 MockProvider（只打印日志，不投递）");
        return Ok(Arc::new(MockProvider));
    };

    let project_id = config
        .fcm
        .project_id
        .clone()
        .or_else(|| auth.project_id().map(str::to_string))
        .ok_or_else(|| {
            ServerError::Configuration(
                "FCM project_id 未配置，且 service account 中没有 project_id".to_string(),
            )
        })?;

    info!(
        "📨 FCM project={}, validate_only={}",
        project_id, config.fcm.validate_only
    );
    Ok(Arc::new(FcmProvider::from_config(
        &config.fcm,
        project_id,
        auth,
    )?))
}

fn build_user_repository(
    config: &ServerConfig,
    auth: Option<Arc<GoogleAuth>>,
) -> Result<Arc<dyn UserRepository>> {
    if let Some(path) = &config.firestore.users_file {
        info!("📄 从文件加载用户: {}", path);
        return Ok(Arc::new(InMemoryUserRepository::from_json_file(path)?));
    }

    let project_id = config
        .firestore_project_id()
        .map(str::to_string)
        .or_else(|| auth.as_ref().and_then(|a| a.project_id().map(str::to_string)));

    let auth = if config.firestore.emulator {
        Some(Arc::new(GoogleAuth::anonymous()))
    } else {
        auth
    };

    match (project_id, auth) {
        (Some(project_id), Some(auth)) => {
            info!(
                "🗄️ Firestore project={}, collection={}, endpoint={}",
                project_id, config.firestore.users_collection, config.firestore.endpoint
            );
            Ok(Arc::new(FirestoreUserRepository::new(
                &config.firestore,
                project_id,
                auth,
            )?))
        }
        _ => {
            warn!("⚠️ 未配置 Firestore，使用空的内存用户仓库");
            Ok(Arc::new(InMemoryUserRepository::default()))
        }
    }
}
