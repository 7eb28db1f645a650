use serde::{Deserialize, Serialize};

use super::truthy;

/// announcements 集合中新建的文档
///
/// 只有 `isImportant` 为真时才会广播；文档 ID 来自触发上下文。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnouncementRecord {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "isImportant", default, deserialize_with = "truthy")]
    pub is_important: bool,
}
