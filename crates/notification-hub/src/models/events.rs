//! 总线事件负载定义
//!
//! 字段名与上游服务发布的 JSON 保持一致，同时接受若干别名。
//! 原始消息体会原样入库，这里的结构只用于校验和渲染。

use serde::{Deserialize, Serialize};

use super::NotificationKind;
use crate::error::{NotificationError, Result};

/// 用户注册完成
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationEvent {
    #[serde(rename = "uuid", alias = "recipient", alias = "recipient_id")]
    pub recipient_id: String,
    pub email: String,
    pub role: String,
}

/// 项目状态变更，通知项目的全部参与者
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectStatusChangedEvent {
    pub project_id: u64,
    pub project_title: String,
    pub new_status: String,
    #[serde(rename = "uuid", alias = "recipients")]
    pub recipients: Vec<String>,
}

/// 申请加入项目，通知项目负责人
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectJoinRequestEvent {
    pub project_id: u64,
    pub project_title: String,
    #[serde(rename = "from_name", alias = "requester")]
    pub requester: String,
    #[serde(rename = "user_uuid", alias = "recipient", alias = "recipient_id")]
    pub recipient_id: String,
}

/// 项目需要协商
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NegotiationCreatedEvent {
    pub project_id: u64,
    pub project_title: String,
    #[serde(rename = "user_uuid", alias = "recipient", alias = "recipient_id")]
    pub recipient_id: String,
}

/// 已解码的总线事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationEvent {
    Registration(RegistrationEvent),
    ProjectStatusChanged(ProjectStatusChangedEvent),
    ProjectJoinRequest(ProjectJoinRequestEvent),
    NegotiationCreated(NegotiationCreatedEvent),
}

/// 状态变更事件的最少接收者数量
pub const MIN_STATUS_RECIPIENTS: usize = 2;

impl NotificationEvent {
    /// 按类别解码消息体
    ///
    /// 非 UTF-8、非法 JSON、缺少字段都归为解码错误。
    pub fn decode(kind: NotificationKind, body: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(body)
            .map_err(|e| NotificationError::Decode(format!("消息体不是合法的 UTF-8: {e}")))?;
        Self::decode_str(kind, text)
    }

    pub fn decode_str(kind: NotificationKind, text: &str) -> Result<Self> {
        let event = match kind {
            NotificationKind::Registration => Self::Registration(serde_json::from_str(text)?),
            NotificationKind::ProjectStatusChanged => {
                Self::ProjectStatusChanged(serde_json::from_str(text)?)
            }
            NotificationKind::ProjectJoinRequest => {
                Self::ProjectJoinRequest(serde_json::from_str(text)?)
            }
            NotificationKind::NegotiationCreated => {
                Self::NegotiationCreated(serde_json::from_str(text)?)
            }
        };
        Ok(event)
    }

    pub fn kind(&self) -> NotificationKind {
        match self {
            Self::Registration(_) => NotificationKind::Registration,
            Self::ProjectStatusChanged(_) => NotificationKind::ProjectStatusChanged,
            Self::ProjectJoinRequest(_) => NotificationKind::ProjectJoinRequest,
            Self::NegotiationCreated(_) => NotificationKind::NegotiationCreated,
        }
    }

    /// 提取接收者并做语义校验
    ///
    /// 状态变更事件按原顺序返回全部接收者，其余类别恰好一个。
    /// 重复的接收者不去重，每个位置各产生一条记录。
    pub fn recipients(&self) -> Result<Vec<&str>> {
        let recipients: Vec<&str> = match self {
            Self::Registration(e) => vec![e.recipient_id.as_str()],
            Self::ProjectJoinRequest(e) => vec![e.recipient_id.as_str()],
            Self::NegotiationCreated(e) => vec![e.recipient_id.as_str()],
            Self::ProjectStatusChanged(e) => {
                if e.recipients.len() < MIN_STATUS_RECIPIENTS {
                    return Err(NotificationError::Validation(format!(
                        "状态变更事件至少需要 {MIN_STATUS_RECIPIENTS} 个接收者，实际 {} 个",
                        e.recipients.len()
                    )));
                }
                e.recipients.iter().map(String::as_str).collect()
            }
        };

        if let Some(pos) = recipients.iter().position(|r| r.trim().is_empty()) {
            return Err(NotificationError::Validation(format!(
                "第 {} 个接收者 ID 为空",
                pos + 1
            )));
        }
        // 存储层的 TEXT 列不接受 NUL，控制字符在这里统一拒绝
        if let Some(pos) = recipients.iter().position(|r| r.chars().any(char::is_control)) {
            return Err(NotificationError::Validation(format!(
                "第 {} 个接收者 ID 含有控制字符",
                pos + 1
            )));
        }

        Ok(recipients)
    }
}
