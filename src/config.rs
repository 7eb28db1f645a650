use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::info;
use serde::{Deserialize, Serialize};
use anyhow::{Result, Context};

/// FCM 默认端点
pub const DEFAULT_FCM_ENDPOINT: &str = "https://fcm.googleapis.com";
/// Firestore 默认端点
pub const DEFAULT_FIRESTORE_ENDPOINT: &str = "https://firestore.googleapis.com";

/// 服务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    pub host: String,
    /// 监听端口
    pub port: u16,
    /// 触发器共享密钥（配置后请求必须携带 X-Trigger-Secret）
    pub trigger_secret: Option<String>,
    /// 是否启用 Prometheus 指标
    pub enable_metrics: bool,
    /// 日志级别
    pub log_level: String,
    /// FCM 推送网关配置
    pub fcm: FcmConfig,
    /// Firestore 文档存储配置
    pub firestore: FirestoreConfig,
    /// 推送消息的固定参数
    pub delivery: DeliveryConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            trigger_secret: None,
            enable_metrics: true,
            log_level: "info".to_string(),
            fcm: FcmConfig::default(),
            firestore: FirestoreConfig::default(),
            delivery: DeliveryConfig::default(),
        }
    }
}

/// FCM HTTP v1 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FcmConfig {
    /// Firebase 项目 ID（未配置时取 service account 中的 project_id）
    pub project_id: Option<String>,
    pub endpoint: String,
    /// 预先获取的 OAuth 2.0 access token（优先于 service account）
    pub access_token: Option<String>,
    /// service account JSON 文件路径
    pub service_account_path: Option<String>,
    /// 只校验不投递（FCM validate_only）
    pub validate_only: bool,
    pub timeout_secs: u64,
}

impl Default for FcmConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            endpoint: DEFAULT_FCM_ENDPOINT.to_string(),
            access_token: None,
            service_account_path: None,
            validate_only: false,
            timeout_secs: 10,
        }
    }
}

impl FcmConfig {
    /// 是否配置了真实的 FCM 凭据
    pub fn has_credentials(&self) -> bool {
        self.access_token.is_some() || self.service_account_path.is_some()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Firestore REST 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirestoreConfig {
    /// 项目 ID（未配置时沿用 fcm.project_id）
    pub project_id: Option<String>,
    pub database_id: String,
    pub endpoint: String,
    /// 连接模拟器时不带 Authorization 头
    pub emulator: bool,
    pub users_collection: String,
    pub page_size: u32,
    pub timeout_secs: u64,
    /// 本地运行时从 JSON 文件加载用户（不访问 Firestore）
    pub users_file: Option<String>,
}

impl Default for FirestoreConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            database_id: "(default)".to_string(),
            endpoint: DEFAULT_FIRESTORE_ENDPOINT.to_string(),
            emulator: false,
            users_collection: "users".to_string(),
            page_size: 300,
            timeout_secs: 30,
            users_file: None,
        }
    }
}

impl FirestoreConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// 推送消息的固定参数，进程启动时加载，运行期间不变
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// 写入 data.click_action 的客户端路由常量
    pub click_action: String,
    pub android_channel_id: String,
    pub android_priority: String,
    pub apns_badge: u32,
    pub apns_sound: String,
    pub apns_content_available: bool,
    pub announcement_topic: String,
    pub announcement_title: String,
    /// 公告消息 data.type
    pub announcement_type: String,
    /// 没有任何已注册 token 时跳过公告广播
    pub announcement_skip_without_tokens: bool,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            click_action: "FLUTTER_NOTIFICATION_CLICK".to_string(),
            android_channel_id: "high_importance_channel".to_string(),
            android_priority: "high".to_string(),
            apns_badge: 1,
            apns_sound: "default".to_string(),
            apns_content_available: true,
            announcement_topic: "announcements".to_string(),
            announcement_title: "Important Announcement".to_string(),
            announcement_type: "announcement".to_string(),
            announcement_skip_without_tokens: false,
        }
    }
}

/// 配置校验错误
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("fcm.project_id is required when FCM credentials are configured")]
    MissingProjectId,
    #[error("fcm.access_token and fcm.service_account_path are mutually exclusive")]
    ConflictingCredentials,
    #[error("{0} must not be empty")]
    EmptyValue(&'static str),
    #[error("firestore.page_size must be between 1 and 1000, got {0}")]
    InvalidPageSize(u32),
    #[error("fcm.android_priority must be \"high\" or \"normal\", got {0:?}")]
    InvalidPriority(String),
}

impl ServerConfig {
    /// 创建新的配置
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Firestore 实际使用的项目 ID
    pub fn firestore_project_id(&self) -> Option<&str> {
        self.firestore
            .project_id
            .as_deref()
            .or(self.fcm.project_id.as_deref())
    }

    /// 从 TOML 文件加载配置
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("无法读取配置文件: {:?}", path.as_ref()))?;

        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let toml_config: TomlConfig = toml::from_str(content)
            .with_context(|| "配置文件格式错误")?;

        Ok(toml_config.into())
    }

    /// 从环境变量合并
    pub fn merge_from_env(&mut self) -> Result<()> {
        self.merge_from_vars(|key| env::var(key).ok())
    }

    /// 按给定的查找函数合并环境变量
    pub fn merge_from_vars<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("PUSH_RELAY_HOST") {
            self.host = host;
        }
        if let Some(port) = lookup("PUSH_RELAY_PORT").or_else(|| lookup("PORT")) {
            self.port = port
                .parse()
                .with_context(|| format!("无效的端口: {}", port))?;
        }
        if let Some(secret) = lookup("PUSH_RELAY_TRIGGER_SECRET") {
            self.trigger_secret = Some(secret);
        }
        if let Some(log_level) = lookup("PUSH_RELAY_LOG_LEVEL") {
            self.log_level = log_level;
        }

        // FCM
        if let Some(project_id) = lookup("FCM_PROJECT_ID").or_else(|| lookup("GOOGLE_CLOUD_PROJECT")) {
            self.fcm.project_id = Some(project_id);
        }
        if let Some(token) = lookup("FCM_ACCESS_TOKEN") {
            self.fcm.access_token = Some(token);
        }
        if let Some(path) = lookup("GOOGLE_APPLICATION_CREDENTIALS") {
            self.fcm.service_account_path = Some(path);
        }
        if let Some(validate_only) = lookup("PUSH_RELAY_FCM_VALIDATE_ONLY") {
            self.fcm.validate_only = matches!(validate_only.as_str(), "1" | "true" | "yes");
        }

        // Firestore 模拟器
        if let Some(host) = lookup("FIRESTORE_EMULATOR_HOST") {
            self.firestore.endpoint = format!("http://{}", host);
            self.firestore.emulator = true;
        }

        Ok(())
    }

    /// 从命令行参数合并配置
    pub fn merge_from_cli(&mut self, cli: &crate::cli::Cli) {
        if let Some(host) = &cli.host {
            self.host = host.clone();
        }
        if let Some(port) = cli.port {
            self.port = port;
        }
        if let Some(project_id) = &cli.project_id {
            self.fcm.project_id = Some(project_id.clone());
        }
        if let Some(path) = &cli.service_account {
            self.fcm.service_account_path = Some(path.clone());
        }
        if let Some(secret) = &cli.trigger_secret {
            self.trigger_secret = Some(secret.clone());
        }
        if cli.validate_only {
            self.fcm.validate_only = true;
        }
        if cli.disable_metrics {
            self.enable_metrics = false;
        }
        if let Some(log_level) = cli.get_log_level() {
            self.log_level = log_level;
        }
    }

    /// 加载配置（按优先级：命令行 > 环境变量 > 配置文件 > 默认值）
    pub fn load(cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if let Some(config_file) = &cli.config_file {
            if Path::new(config_file).exists() {
                info!("📄 从配置文件加载: {}", config_file);
                Self::from_toml_file(config_file)?
            } else {
                tracing::warn!("⚠️ 配置文件不存在: {}", config_file);
                Self::new()
            }
        } else if Path::new("config.toml").exists() {
            info!("📄 从默认配置文件加载: config.toml");
            Self::from_toml_file("config.toml")?
        } else {
            Self::new()
        };

        config.merge_from_env()?;
        config.merge_from_cli(cli);
        config.validate()?;

        Ok(config)
    }

    /// 启动前校验
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.fcm.access_token.is_some() && self.fcm.service_account_path.is_some() {
            return Err(ConfigError::ConflictingCredentials);
        }
        if self.fcm.access_token.is_some() && self.fcm.project_id.is_none() {
            return Err(ConfigError::MissingProjectId);
        }
        if self.firestore.page_size == 0 || self.firestore.page_size > 1000 {
            return Err(ConfigError::InvalidPageSize(self.firestore.page_size));
        }
        if !matches!(self.delivery.android_priority.as_str(), "high" | "normal") {
            return Err(ConfigError::InvalidPriority(self.delivery.android_priority.clone()));
        }
        if self.delivery.announcement_topic.is_empty() {
            return Err(ConfigError::EmptyValue("delivery.announcement_topic"));
        }
        if self.delivery.click_action.is_empty() {
            return Err(ConfigError::EmptyValue("delivery.click_action"));
        }
        if self.firestore.users_collection.is_empty() {
            return Err(ConfigError::EmptyValue("firestore.users_collection"));
        }
        Ok(())
    }
}

/// 日志初始化前读取的 [logging] 段
#[derive(Debug, Default, Clone)]
pub struct EarlyLoggingConfig {
    pub level: Option<String>,
    pub format: Option<String>,
    pub file: Option<String>,
}

/// 快速读取配置文件中的 [logging] 段（不加载完整配置，失败时返回空）
pub fn load_early_logging_config(config_file: Option<&str>) -> EarlyLoggingConfig {
    let path = config_file.unwrap_or("config.toml");
    let Ok(content) = fs::read_to_string(path) else {
        return EarlyLoggingConfig::default();
    };

    #[derive(Deserialize)]
    struct LoggingOnly {
        logging: Option<TomlLoggingConfig>,
    }

    match toml::from_str::<LoggingOnly>(&content) {
        Ok(LoggingOnly { logging: Some(logging) }) => EarlyLoggingConfig {
            level: logging.level,
            format: logging.format,
            file: logging.file,
        },
        _ => EarlyLoggingConfig::default(),
    }
}

/// TOML 配置文件结构（用于反序列化）
#[derive(Debug, Deserialize)]
struct TomlConfig {
    server: Option<TomlServerConfig>,
    fcm: Option<TomlFcmConfig>,
    firestore: Option<TomlFirestoreConfig>,
    delivery: Option<TomlDeliveryConfig>,
    logging: Option<TomlLoggingConfig>,
}

#[derive(Debug, Deserialize)]
struct TomlServerConfig {
    host: Option<String>,
    port: Option<u16>,
    trigger_secret: Option<String>,
    enable_metrics: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct TomlFcmConfig {
    project_id: Option<String>,
    endpoint: Option<String>,
    access_token: Option<String>,
    service_account_path: Option<String>,
    validate_only: Option<bool>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TomlFirestoreConfig {
    project_id: Option<String>,
    database_id: Option<String>,
    endpoint: Option<String>,
    emulator: Option<bool>,
    users_collection: Option<String>,
    page_size: Option<u32>,
    timeout_secs: Option<u64>,
    users_file: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TomlDeliveryConfig {
    click_action: Option<String>,
    android_channel_id: Option<String>,
    android_priority: Option<String>,
    apns_badge: Option<u32>,
    apns_sound: Option<String>,
    apns_content_available: Option<bool>,
    announcement_topic: Option<String>,
    announcement_title: Option<String>,
    announcement_type: Option<String>,
    announcement_skip_without_tokens: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct TomlLoggingConfig {
    level: Option<String>,
    format: Option<String>,
    file: Option<String>,
}

impl From<TomlConfig> for ServerConfig {
    fn from(toml: TomlConfig) -> Self {
        let mut config = Self::default();

        if let Some(server) = toml.server {
            if let Some(host) = server.host {
                config.host = host;
            }
            if let Some(port) = server.port {
                config.port = port;
            }
            if server.trigger_secret.is_some() {
                config.trigger_secret = server.trigger_secret;
            }
            if let Some(enable) = server.enable_metrics {
                config.enable_metrics = enable;
            }
        }

        if let Some(fcm) = toml.fcm {
            if fcm.project_id.is_some() {
                config.fcm.project_id = fcm.project_id;
            }
            if let Some(endpoint) = fcm.endpoint {
                config.fcm.endpoint = endpoint;
            }
            if fcm.access_token.is_some() {
                config.fcm.access_token = fcm.access_token;
            }
            if fcm.service_account_path.is_some() {
                config.fcm.service_account_path = fcm.service_account_path;
            }
            if let Some(validate_only) = fcm.validate_only {
                config.fcm.validate_only = validate_only;
            }
            if let Some(timeout) = fcm.timeout_secs {
                config.fcm.timeout_secs = timeout;
            }
        }

        if let Some(firestore) = toml.firestore {
            if firestore.project_id.is_some() {
                config.firestore.project_id = firestore.project_id;
            }
            if let Some(database_id) = firestore.database_id {
                config.firestore.database_id = database_id;
            }
            if let Some(endpoint) = firestore.endpoint {
                config.firestore.endpoint = endpoint;
            }
            if let Some(emulator) = firestore.emulator {
                config.firestore.emulator = emulator;
            }
            if let Some(collection) = firestore.users_collection {
                config.firestore.users_collection = collection;
            }
            if let Some(page_size) = firestore.page_size {
                config.firestore.page_size = page_size;
            }
            if let Some(timeout) = firestore.timeout_secs {
                config.firestore.timeout_secs = timeout;
            }
            if firestore.users_file.is_some() {
                config.firestore.users_file = firestore.users_file;
            }
        }

        if let Some(delivery) = toml.delivery {
            let d = &mut config.delivery;
            if let Some(v) = delivery.click_action {
                d.click_action = v;
            }
            if let Some(v) = delivery.android_channel_id {
                d.android_channel_id = v;
            }
            if let Some(v) = delivery.android_priority {
                d.android_priority = v;
            }
            if let Some(v) = delivery.apns_badge {
                d.apns_badge = v;
            }
            if let Some(v) = delivery.apns_sound {
                d.apns_sound = v;
            }
            if let Some(v) = delivery.apns_content_available {
                d.apns_content_available = v;
            }
            if let Some(v) = delivery.announcement_topic {
                d.announcement_topic = v;
            }
            if let Some(v) = delivery.announcement_title {
                d.announcement_title = v;
            }
            if let Some(v) = delivery.announcement_type {
                d.announcement_type = v;
            }
            if let Some(v) = delivery.announcement_skip_without_tokens {
                d.announcement_skip_without_tokens = v;
            }
        }

        if let Some(logging) = toml.logging {
            if let Some(level) = logging.level {
                config.log_level = level;
            }
        }

        config
    }
}

/// 默认配置文件内容（generate-config 子命令使用）
pub const DEFAULT_CONFIG_TOML: &str = r#"# push-relay 配置文件
# 此文件由 push-relay generate-config 生成

[server]
host = "0.0.0.0"
port = 8080
enable_metrics = true
# trigger_secret = "change-me"

[fcm]
# project_id = "my-firebase-project"
# service_account_path = "./service-account.json"
validate_only = false
timeout_secs = 10

[firestore]
database_id = "(default)"
users_collection = "users"
page_size = 300
timeout_secs = 30
# users_file = "./users.json"

[delivery]
click_action = "FLUTTER_NOTIFICATION_CLICK"
android_channel_id = "high_importance_channel"
android_priority = "high"
apns_badge = 1
apns_sound = "default"
apns_content_available = true
announcement_topic = "announcements"
announcement_title = "Important Announcement"
announcement_type = "announcement"
announcement_skip_without_tokens = false

[logging]
level = "info"
format = "compact"
# file = "./logs/push-relay.log"
"#;
