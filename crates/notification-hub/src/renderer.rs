//! 通知渲染
//!
//! 把存储中的 (类别标签, 原始负载) 还原为标题和正文。
//! 模板为固定的英文文案，渲染是纯函数，不访问任何外部状态。

use tracing::warn;

use crate::error::{NotificationError, Result};
use crate::models::{
    NotificationEvent, NotificationKind, NotificationRecord, RenderedContent, RenderedNotification,
};
use hub_shared::observability::metrics;

/// 通知渲染器
pub struct NotificationRenderer;

impl NotificationRenderer {
    /// 按存储标签和原始负载渲染
    ///
    /// 未知标签和无法解码的负载都返回 `NotificationError::Render`。
    pub fn render(kind_tag: &str, raw_payload: &str) -> Result<RenderedContent> {
        let kind: NotificationKind = kind_tag.parse()?;
        Self::render_as(kind, raw_payload)
    }

    fn render_as(kind: NotificationKind, raw_payload: &str) -> Result<RenderedContent> {
        let event = NotificationEvent::decode_str(kind, raw_payload).map_err(|e| {
            NotificationError::Render {
                kind: kind.tag().to_string(),
                reason: e.to_string(),
            }
        })?;
        Ok(Self::render_event(&event))
    }

    /// 对已解码的事件套用模板
    pub fn render_event(event: &NotificationEvent) -> RenderedContent {
        match event {
            NotificationEvent::Registration(e) => RenderedContent {
                title: "Registration complete".to_string(),
                body: format!(
                    "Welcome to our service, {}. You are registered as {}. \
                     Please fill in your profile to complete the registration.",
                    e.email, e.role
                ),
                reference: 0,
            },
            NotificationEvent::ProjectJoinRequest(e) => RenderedContent {
                title: "Join request".to_string(),
                body: format!("{} applied to join project {}", e.requester, e.project_title),
                reference: e.project_id,
            },
            NotificationEvent::ProjectStatusChanged(e) => RenderedContent {
                title: "Status changed".to_string(),
                body: format!(
                    "Project {} status changed to {}",
                    e.project_title, e.new_status
                ),
                reference: e.project_id,
            },
            NotificationEvent::NegotiationCreated(e) => RenderedContent {
                title: "Negotiation required".to_string(),
                body: format!("Project {} requires negotiation", e.project_title),
                reference: e.project_id,
            },
        }
    }

    /// 渲染单条存储记录
    fn render_stored(
        kind: NotificationKind,
        record: &NotificationRecord,
    ) -> Result<RenderedNotification> {
        let content = Self::render_as(kind, &record.raw_payload)?;
        Ok(RenderedNotification {
            notification_id: record.id,
            title: content.title,
            body: content.body,
            target: kind,
            target_data: content.reference,
            is_read: record.read,
        })
    }

    /// 按存储顺序渲染一组记录
    ///
    /// 单条记录渲染失败只记录日志和指标并跳过，不影响其余记录。
    pub fn render_feed(records: &[NotificationRecord]) -> Vec<RenderedNotification> {
        records
            .iter()
            .filter_map(|record| {
                let kind = record.kind.parse::<NotificationKind>();
                let label = failure_label(&kind);

                match kind.and_then(|kind| Self::render_stored(kind, record)) {
                    Ok(rendered) => Some(rendered),
                    Err(e) => {
                        warn!(
                            notification_id = record.id,
                            recipient_id = %record.recipient_id,
                            kind = %record.kind,
                            error = %e,
                            "通知记录无法渲染，已从 feed 中排除"
                        );
                        metrics::record_render_failure(label);
                        None
                    }
                }
            })
            .collect()
    }
}

/// 渲染失败指标的 kind 标签，存储中出现的未知标签统一归为 unknown
fn failure_label(kind: &Result<NotificationKind>) -> &'static str {
    kind.as_ref().map_or("unknown", |kind| kind.tag())
}
