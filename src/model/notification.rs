use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::null_as_default;

/// notifications 集合中新建的文档
///
/// 由客户端写入，这里只读一次。`tokens` 为空时不发送。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationRecord {
    #[serde(default, deserialize_with = "null_as_default")]
    pub tokens: Vec<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    /// 附加数据，原样透传给客户端
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: BTreeMap<String, String>,
}
