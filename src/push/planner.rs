use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::DeliveryConfig;
use crate::model::{AnnouncementRecord, NotificationRecord};
use crate::push::types::{AndroidConfig, ApnsConfig, OutboundMessage, Target};

/// data 中的消息类型键
pub const DATA_KEY_TYPE: &str = "type";
/// data 中的客户端路由键
pub const DATA_KEY_CLICK_ACTION: &str = "click_action";
/// 公告消息携带的公告 ID 键
pub const DATA_KEY_ANNOUNCEMENT_ID: &str = "announcementId";

/// Message Planner（消息构造器）
///
/// 根据文档快照和固定投递参数构造 OutboundMessage，不做任何 IO。
#[derive(Debug, Clone)]
pub struct MessagePlanner {
    delivery: Arc<DeliveryConfig>,
}

impl MessagePlanner {
    pub fn new(delivery: Arc<DeliveryConfig>) -> Self {
        Self { delivery }
    }

    pub fn delivery(&self) -> &DeliveryConfig {
        &self.delivery
    }

    fn android(&self) -> AndroidConfig {
        AndroidConfig {
            priority: self.delivery.android_priority.clone(),
            channel_id: Some(self.delivery.android_channel_id.clone()),
        }
    }

    fn apns(&self) -> ApnsConfig {
        ApnsConfig {
            content_available: self.delivery.apns_content_available,
            badge: Some(self.delivery.apns_badge),
            sound: Some(self.delivery.apns_sound.clone()),
        }
    }

    /// 通知文档 → multicast 消息
    ///
    /// 记录自带的 data 原样保留，`type` 与 `click_action` 覆盖同名键。
    pub fn plan_notification(&self, record: &NotificationRecord) -> OutboundMessage {
        let mut data = record.data.clone();
        if let Some(kind) = &record.kind {
            data.insert(DATA_KEY_TYPE.to_string(), kind.clone());
        }
        data.insert(
            DATA_KEY_CLICK_ACTION.to_string(),
            self.delivery.click_action.clone(),
        );

        OutboundMessage::new(Target::Tokens(record.tokens.clone()))
            .with_notification(record.title.clone(), record.body.clone())
            .with_data(data)
            .with_android(self.android())
            .with_apns(self.apns())
    }

    /// 公告文档 → topic 消息
    pub fn plan_announcement(
        &self,
        record: &AnnouncementRecord,
        announcement_id: &str,
    ) -> OutboundMessage {
        let mut data = BTreeMap::new();
        data.insert(
            DATA_KEY_ANNOUNCEMENT_ID.to_string(),
            announcement_id.to_string(),
        );
        data.insert(
            DATA_KEY_TYPE.to_string(),
            self.delivery.announcement_type.clone(),
        );
        data.insert(
            DATA_KEY_CLICK_ACTION.to_string(),
            self.delivery.click_action.clone(),
        );

        OutboundMessage::new(Target::Topic(self.delivery.announcement_topic.clone()))
            .with_notification(
                Some(self.delivery.announcement_title.clone()),
                record.name.clone(),
            )
            .with_data(data)
            .with_android(self.android())
            .with_apns(self.apns())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn planner() -> MessagePlanner {
        MessagePlanner::new(Arc::new(DeliveryConfig::default()))
    }

    #[test]
    fn test_plan_notification_injects_keys() {
        let mut record = NotificationRecord {
            tokens: vec!["t1".into(), "t2".into()],
            title: Some("Hi".into()),
            body: Some("There".into()),
            kind: Some("chat".into()),
            data: BTreeMap::new(),
        };
        record.data.insert("chatId".into(), "c42".into());
        record.data.insert("type".into(), "overridden".into());

        let message = planner().plan_notification(&record);

        assert_eq!(message.target, Target::Tokens(vec!["t1".into(), "t2".into()]));
        assert_eq!(message.data.get("type").map(String::as_str), Some("chat"));
        assert_eq!(
            message.data.get("click_action").map(String::as_str),
            Some("FLUTTER_NOTIFICATION_CLICK")
        );
        assert_eq!(message.data.get("chatId").map(String::as_str), Some("c42"));
        assert_eq!(message.data.len(), 3);

        let notification = message.notification.unwrap();
        assert_eq!(notification.title.as_deref(), Some("Hi"));
        assert_eq!(notification.body.as_deref(), Some("There"));
    }

    #[test]
    fn test_plan_notification_without_type() {
        let record = NotificationRecord {
            tokens: vec!["t1".into()],
            ..Default::default()
        };
        let message = planner().plan_notification(&record);
        assert!(!message.data.contains_key("type"));
        assert!(message.data.contains_key("click_action"));
    }

    #[test]
    fn test_platform_hints() {
        let message = planner().plan_notification(&NotificationRecord {
            tokens: vec!["t1".into()],
            ..Default::default()
        });
        let android = message.android.unwrap();
        assert_eq!(android.priority, "high");
        assert_eq!(android.channel_id.as_deref(), Some("high_importance_channel"));

        let apns = message.apns.unwrap();
        assert!(apns.content_available);
        assert_eq!(apns.badge, Some(1));
        assert_eq!(apns.sound.as_deref(), Some("default"));
    }

    #[test]
    fn test_plan_announcement() {
        let record = AnnouncementRecord {
            name: Some("Server maintenance".into()),
            is_important: true,
        };
        let message = planner().plan_announcement(&record, "ann-1");

        assert_eq!(message.target, Target::Topic("announcements".into()));
        let notification = message.notification.as_ref().unwrap();
        assert_eq!(notification.title.as_deref(), Some("Important Announcement"));
        assert_eq!(notification.body.as_deref(), Some("Server maintenance"));
        assert_eq!(message.data.get("announcementId").map(String::as_str), Some("ann-1"));
        assert_eq!(message.data.get("type").map(String::as_str), Some("announcement"));
        assert_eq!(
            message.data.get("click_action").map(String::as_str),
            Some("FLUTTER_NOTIFICATION_CLICK")
        );
    }
}
