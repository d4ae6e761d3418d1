//! 事件类别与总线路由的绑定表
//!
//! 每一行实例化一个摄取订阅。新增类别只需在 `NotificationKind` 中加一个变体并在此登记。

use crate::models::NotificationKind;

/// 一个事件类别的订阅绑定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    pub kind: NotificationKind,
    /// 路由键（Kafka 中即 topic）
    pub routing_key: &'static str,
    /// 持久队列名（Kafka 中作为消费组后缀）
    pub queue: &'static str,
}

/// 全部绑定
///
/// `user.registred` 与 `Notification_Negotaition` 的拼写与已部署的上游和队列保持一致。
pub const BINDINGS: [Binding; 4] = [
    Binding {
        kind: NotificationKind::Registration,
        routing_key: "user.registred",
        queue: "Notification_Registration",
    },
    Binding {
        kind: NotificationKind::ProjectStatusChanged,
        routing_key: "project.status_changed",
        queue: "Notification_ProjectStatus",
    },
    Binding {
        kind: NotificationKind::ProjectJoinRequest,
        routing_key: "project.join_request",
        queue: "Notification_ProjectJoinRequest",
    },
    Binding {
        kind: NotificationKind::NegotiationCreated,
        routing_key: "project.negotiation.created",
        queue: "Notification_Negotaition",
    },
];

/// 按类别查找绑定
pub fn binding_for(kind: NotificationKind) -> Binding {
    match kind {
        NotificationKind::Registration => BINDINGS[0],
        NotificationKind::ProjectStatusChanged => BINDINGS[1],
        NotificationKind::ProjectJoinRequest => BINDINGS[2],
        NotificationKind::NegotiationCreated => BINDINGS[3],
    }
}
