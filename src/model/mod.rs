//! 数据模型模块
//!
//! 触发器收到的文档快照（只读）以及 users 集合中的用户文档。

pub mod announcement;
pub mod notification;
pub mod user;

pub use announcement::*;
pub use notification::*;
pub use user::*;

use serde::{Deserialize, Deserializer};

/// `null` 与缺失字段一样按默认值处理
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// 按真值语义解析标志位：false / null / 0 / "" 为假，其余为真
pub(crate) fn truthy<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().is_some_and(is_truthy))
}

/// 值的真值语义
pub fn is_truthy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => false,
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
        serde_json::Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

/// 字段存在且长度非零（非空数组或非空字符串）
pub fn has_length(value: Option<&serde_json::Value>) -> bool {
    match value {
        Some(serde_json::Value::Array(items)) => !items.is_empty(),
        Some(serde_json::Value::String(s)) => !s.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_has_length() {
        assert!(has_length(Some(&json!(["t1"]))));
        assert!(has_length(Some(&json!("t1"))));
        assert!(!has_length(Some(&json!([]))));
        assert!(!has_length(Some(&json!(null))));
        assert!(!has_length(Some(&json!(3))));
        assert!(!has_length(None));
    }
}
