//! 通知记录与渲染结果

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::NotificationKind;

/// 待写入的通知记录
///
/// raw_payload 是总线消息体原文，扇出时每个接收者持有同一份字节相同的副本。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub recipient_id: String,
    pub kind: NotificationKind,
    pub raw_payload: String,
}

/// 已持久化的通知记录
///
/// kind 保留存储中的原始标签，渲染时再解析，未知标签在渲染阶段单独报告。
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct NotificationRecord {
    pub id: i64,
    pub recipient_id: String,
    pub kind: String,
    pub raw_payload: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// 模板渲染产物
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedContent {
    pub title: String,
    pub body: String,
    /// 关联的项目 ID，注册通知为 0
    pub reference: u64,
}

/// feed 响应中的单条通知
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedNotification {
    pub notification_id: i64,
    pub title: String,
    pub body: String,
    pub target: NotificationKind,
    pub target_data: u64,
    pub is_read: bool,
}
