//! 用户仓库 - Firestore REST 实现

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::auth::GoogleAuth;
use crate::config::FirestoreConfig;
use crate::error::{Result, ServerError};
use crate::model::UserRecord;
use crate::repository::UserRepository;

const FIELD_FCM_TOKENS: &str = "fcmTokens";

/// 用户仓库 (Firestore REST 实现)
///
/// 按 pageSize/pageToken 翻页读取整个集合，结果全部加载到内存。
pub struct FirestoreUserRepository {
    client: Client,
    endpoint: String,
    project_id: String,
    database_id: String,
    collection: String,
    page_size: u32,
    auth: Arc<GoogleAuth>,
}

impl FirestoreUserRepository {
    pub fn new(config: &FirestoreConfig, project_id: String, auth: Arc<GoogleAuth>) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ServerError::Configuration(format!("Firestore HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            project_id,
            database_id: config.database_id.clone(),
            collection: config.users_collection.clone(),
            page_size: config.page_size,
            auth,
        })
    }

    fn collection_url(&self) -> String {
        format!(
            "{}/v1/projects/{}/databases/{}/documents/{}",
            self.endpoint, self.project_id, self.database_id, self.collection
        )
    }

    async fn fetch_page(
        &self,
        page_token: Option<&str>,
        access_token: Option<&str>,
    ) -> Result<ListDocumentsResponse> {
        let page_size = self.page_size.to_string();
        let mut query = vec![
            ("pageSize", page_size.as_str()),
            ("mask.fieldPaths", FIELD_FCM_TOKENS),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }

        let mut builder = self.client.get(self.collection_url()).query(&query);
        if let Some(token) = access_token {
            builder = builder.bearer_auth(token);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ServerError::Store(format!("Firestore request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ServerError::Store(format!(
                "Firestore list {} failed: status={}, error={}",
                self.collection, status, error_text
            )));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl UserRepository for FirestoreUserRepository {
    async fn list_users(&self) -> Result<Vec<UserRecord>> {
        let access_token = self.auth.access_token().await?;
        let mut users = Vec::new();
        let mut page_token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = self
                .fetch_page(page_token.as_deref(), access_token.as_deref())
                .await?;
            pages += 1;
            debug!(
                "[FIRESTORE] Page {} of {}: {} documents",
                pages,
                self.collection,
                page.documents.len()
            );

            users.extend(page.documents.into_iter().map(Document::into_user));

            match page.next_page_token {
                Some(next) if !next.is_empty() => page_token = Some(next),
                _ => break,
            }
        }

        info!(
            "[FIRESTORE] Loaded {} users from {} ({} pages)",
            users.len(),
            self.collection,
            pages
        );
        Ok(users)
    }

    fn name(&self) -> &'static str {
        "firestore"
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListDocumentsResponse {
    #[serde(default)]
    documents: Vec<Document>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Document {
    name: String,
    #[serde(default)]
    fields: serde_json::Map<String, Value>,
}

impl Document {
    fn into_user(self) -> UserRecord {
        let id = self
            .name
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();
        let fcm_tokens = self
            .fields
            .get(FIELD_FCM_TOKENS)
            .map(string_array)
            .unwrap_or_default();
        UserRecord::new(id, fcm_tokens)
    }
}

/// 解码 Firestore 类型化数组，非字符串元素忽略
fn string_array(value: &Value) -> Vec<String> {
    value
        .pointer("/arrayValue/values")
        .and_then(Value::as_array)
        .map(|values| {
            values
                .iter()
                .filter_map(|v| v.get("stringValue").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Query, http::HeaderMap, Json, Router};
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// 两页数据：第一页带 nextPageToken
    async fn spawn_fake_firestore(seen: Arc<Mutex<Vec<(HashMap<String, String>, Option<String>)>>>) -> String {
        let app = Router::new().fallback(
            move |Query(query): Query<HashMap<String, String>>, headers: HeaderMap| {
                let seen = seen.clone();
                async move {
                    let auth = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);
                    seen.lock().unwrap().push((query.clone(), auth));

                    match query.get("pageToken").map(String::as_str) {
                        None => Json(json!({
                            "documents": [
                                {
                                    "name": "projects/demo/databases/(default)/documents/users/u1",
                                    "fields": {
                                        "fcmTokens": { "arrayValue": { "values": [
                                            { "stringValue": "a" },
                                            { "stringValue": "b" }
                                        ]}}
                                    }
                                },
                                {
                                    "name": "projects/demo/databases/(default)/documents/users/u2",
                                    "fields": {}
                                }
                            ],
                            "nextPageToken": "p2"
                        })),
                        Some(_) => Json(json!({
                            "documents": [
                                {
                                    "name": "projects/demo/databases/(default)/documents/users/u3",
                                    "fields": {
                                        "fcmTokens": { "arrayValue": { "values": [
                                            { "stringValue": "c" },
                                            { "integerValue": "7" }
                                        ]}}
                                    }
                                }
                            ]
                        })),
                    }
                }
            },
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_list_users_follows_pages() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let endpoint = spawn_fake_firestore(seen.clone()).await;
        let config = FirestoreConfig {
            endpoint,
            page_size: 2,
            ..FirestoreConfig::default()
        };
        let repo =
            FirestoreUserRepository::new(&config, "demo".into(), Arc::new(GoogleAuth::anonymous()))
                .unwrap();

        let users = repo.list_users().await.unwrap();
        let ids: Vec<_> = users.iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, vec!["u1", "u2", "u3"]);
        assert_eq!(users[0].fcm_tokens, vec!["a", "b"]);
        assert!(users[1].fcm_tokens.is_empty());
        assert_eq!(users[2].fcm_tokens, vec!["c"]);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].0.get("pageSize").map(String::as_str), Some("2"));
        assert_eq!(seen[1].0.get("pageToken").map(String::as_str), Some("p2"));
        assert!(seen[0].1.is_none());
    }

    #[tokio::test]
    async fn test_store_error_is_reported() {
        let config = FirestoreConfig {
            endpoint: "http://127.0.0.1:9".into(),
            ..FirestoreConfig::default()
        };
        let repo =
            FirestoreUserRepository::new(&config, "demo".into(), Arc::new(GoogleAuth::anonymous()))
                .unwrap();
        assert!(matches!(repo.list_users().await, Err(ServerError::Store(_))));
    }

    #[test]
    fn test_string_array_handles_empty_array() {
        assert!(string_array(&json!({ "arrayValue": {} })).is_empty());
        assert!(string_array(&json!({ "stringValue": "x" })).is_empty());
    }
}
