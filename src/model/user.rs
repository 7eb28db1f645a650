use serde::{Deserialize, Serialize};

use super::null_as_default;

/// users 集合中的用户文档（只关心已注册的设备 token）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    /// 文档 ID
    #[serde(default)]
    pub id: String,
    #[serde(rename = "fcmTokens", default, deserialize_with = "null_as_default")]
    pub fcm_tokens: Vec<String>,
}

impl UserRecord {
    pub fn new(id: impl Into<String>, fcm_tokens: Vec<String>) -> Self {
        Self {
            id: id.into(),
            fcm_tokens,
        }
    }
}

/// 按顺序拼接所有用户的 token
pub fn collect_tokens(users: &[UserRecord]) -> Vec<String> {
    users
        .iter()
        .filter(|user| !user.fcm_tokens.is_empty())
        .flat_map(|user| user.fcm_tokens.iter().cloned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_tokens_keeps_order() {
        let users = vec![
            UserRecord::new("u1", vec!["a".into(), "b".into()]),
            UserRecord::new("u2", vec![]),
            UserRecord::new("u3", vec!["c".into()]),
        ];
        assert_eq!(collect_tokens(&users), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_missing_tokens_field() {
        let user: UserRecord = serde_json::from_str(r#"{"displayName":"x"}"#).unwrap();
        assert!(user.fcm_tokens.is_empty());
    }
}
