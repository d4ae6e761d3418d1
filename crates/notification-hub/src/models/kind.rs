//! 通知类别

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::NotificationError;

/// 通知类别（封闭枚举）
///
/// 序列化形式即存储中的类别标签，也是 feed 响应中的 `target` 字段。
/// `fill_user` 与拼写有误的 `responce` 是前端已经依赖的取值，不能修正。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationKind {
    #[serde(rename = "fill_user")]
    Registration,
    #[serde(rename = "status_changed")]
    ProjectStatusChanged,
    #[serde(rename = "responce")]
    ProjectJoinRequest,
    #[serde(rename = "negotiation")]
    NegotiationCreated,
}

impl NotificationKind {
    pub const ALL: [NotificationKind; 4] = [
        Self::Registration,
        Self::ProjectStatusChanged,
        Self::ProjectJoinRequest,
        Self::NegotiationCreated,
    ];

    /// 存储标签
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Registration => "fill_user",
            Self::ProjectStatusChanged => "status_changed",
            Self::ProjectJoinRequest => "responce",
            Self::NegotiationCreated => "negotiation",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for NotificationKind {
    type Err = NotificationError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.tag() == tag)
            .ok_or_else(|| NotificationError::Render {
                kind: tag.to_string(),
                reason: "未知的通知类别".to_string(),
            })
    }
}
