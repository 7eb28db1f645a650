use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{Result, ServerError};

/// FCM 发送所需的 scope
pub const SCOPE_FIREBASE_MESSAGING: &str = "https://www.googleapis.com/auth/firebase.messaging";
/// Firestore 读取所需的 scope
pub const SCOPE_DATASTORE: &str = "https://www.googleapis.com/auth/datastore";

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
/// assertion 有效期（Google 上限 1 小时）
const ASSERTION_TTL_SECS: i64 = 3600;
/// 距离过期不足该秒数时提前刷新
const REFRESH_MARGIN_SECS: i64 = 60;

/// Google service account JSON（只取需要的字段）
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(default)]
    pub project_id: Option<String>,
    pub private_key: String,
    pub client_email: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ServerError::Configuration(format!(
                "无法读取 service account 文件 {:?}: {}",
                path.as_ref(),
                e
            ))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            ServerError::Configuration(format!("service account 文件格式错误: {}", e))
        })
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - Duration::seconds(REFRESH_MARGIN_SECS) > now
    }
}

/// 凭据来源
enum CredentialSource {
    /// 不带 Authorization（模拟器）
    Anonymous,
    /// 预先获取的 access token
    Static(String),
    /// service account 签发 JWT 换取 access token
    ServiceAccount {
        key: ServiceAccountKey,
        encoding_key: EncodingKey,
    },
}

/// Google OAuth 2.0 access token 提供者
///
/// service account 模式下缓存 token，过期前自动刷新。
pub struct GoogleAuth {
    client: Client,
    source: CredentialSource,
    scopes: String,
    cache: RwLock<Option<CachedToken>>,
}

impl GoogleAuth {
    /// 不携带凭据（Firestore 模拟器 / 本地调试）
    pub fn anonymous() -> Self {
        Self::with_source(CredentialSource::Anonymous, &[])
    }

    /// 使用预先获取的 access token
    pub fn with_static_token(access_token: impl Into<String>) -> Self {
        Self::with_source(CredentialSource::Static(access_token.into()), &[])
    }

    /// 从 service account 文件创建
    pub fn from_service_account_file<P: AsRef<Path>>(path: P, scopes: &[&str]) -> Result<Self> {
        let key = ServiceAccountKey::from_file(path)?;
        Self::from_service_account(key, scopes)
    }

    pub fn from_service_account(key: ServiceAccountKey, scopes: &[&str]) -> Result<Self> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())?;
        info!(
            "[AUTH] Using service account {} (project={:?})",
            key.client_email, key.project_id
        );
        Ok(Self::with_source(
            CredentialSource::ServiceAccount { key, encoding_key },
            scopes,
        ))
    }

    fn with_source(source: CredentialSource, scopes: &[&str]) -> Self {
        Self {
            client: Client::new(),
            source,
            scopes: scopes.join(" "),
            cache: RwLock::new(None),
        }
    }

    /// service account 中的项目 ID
    pub fn project_id(&self) -> Option<&str> {
        match &self.source {
            CredentialSource::ServiceAccount { key, .. } => key.project_id.as_deref(),
            _ => None,
        }
    }

    /// 获取 access token；匿名模式返回 None
    pub async fn access_token(&self) -> Result<Option<String>> {
        match &self.source {
            CredentialSource::Anonymous => Ok(None),
            CredentialSource::Static(token) => Ok(Some(token.clone())),
            CredentialSource::ServiceAccount { key, encoding_key } => {
                let now = Utc::now();
                if let Some(cached) = self.cache.read().await.as_ref() {
                    if cached.is_fresh(now) {
                        return Ok(Some(cached.access_token.clone()));
                    }
                }

                let mut cache = self.cache.write().await;
                // 等写锁期间可能已被其他请求刷新
                if let Some(cached) = cache.as_ref() {
                    if cached.is_fresh(now) {
                        return Ok(Some(cached.access_token.clone()));
                    }
                }

                let fresh = self.exchange_assertion(key, encoding_key, now).await?;
                let token = fresh.access_token.clone();
                *cache = Some(fresh);
                Ok(Some(token))
            }
        }
    }

    /// 签发 JWT assertion 并换取 access token
    async fn exchange_assertion(
        &self,
        key: &ServiceAccountKey,
        encoding_key: &EncodingKey,
        now: DateTime<Utc>,
    ) -> Result<CachedToken> {
        let iat = now.timestamp();
        let claims = AssertionClaims {
            iss: &key.client_email,
            scope: &self.scopes,
            aud: &key.token_uri,
            iat,
            exp: iat + ASSERTION_TTL_SECS,
        };
        let assertion = encode(&Header::new(Algorithm::RS256), &claims, encoding_key)?;

        debug!("[AUTH] Exchanging JWT assertion at {}", key.token_uri);

        let response = self
            .client
            .post(&key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| ServerError::Network(format!("OAuth token request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ServerError::Unauthorized(format!(
                "OAuth token exchange failed: status={}, error={}",
                status, error_text
            )));
        }

        let token: TokenResponse = response.json().await?;
        let expires_in = token.expires_in.unwrap_or(ASSERTION_TTL_SECS);
        info!("[AUTH] Access token refreshed, expires_in={}s", expires_in);

        Ok(CachedToken {
            access_token: token.access_token,
            expires_at: now + Duration::seconds(expires_in),
        })
    }
}
