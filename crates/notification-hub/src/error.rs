//! 通知中心错误类型
//!
//! 覆盖事件解码、语义校验、持久化、认证和渲染五类错误。
//! 摄取侧根据错误类别决定确认还是重新投递；读取侧映射为 HTTP 状态码。

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use hub_shared::error::HubError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotificationError {
    /// 消息体不是合法 JSON、不是 UTF-8 或缺少字段
    #[error("事件解码失败: {0}")]
    Decode(String),

    /// 结构完整但语义非法，例如状态变更事件的接收者不足两个
    #[error("事件校验失败: {0}")]
    Validation(String),

    /// 存储后端暂时不可用（连接、超时、IO）
    #[error("持久化失败: {0}")]
    Persistence(String),

    /// 存储后端拒绝了数据本身（数据异常、约束冲突），重放结果不变
    #[error("存储拒绝写入: {0}")]
    Rejected(String),

    /// 缺少凭证、凭证格式错误、签名无效或已过期
    #[error("未授权: {0}")]
    Unauthorized(String),

    /// 存储中的记录无法渲染（未知类别或负载损坏）
    #[error("渲染失败: 类别={kind}, 原因={reason}")]
    Render { kind: String, reason: String },

    /// 事件总线订阅故障
    #[error("事件总线错误: {0}")]
    Transport(String),

    #[error(transparent)]
    Shared(#[from] HubError),
}

impl NotificationError {
    /// 返回对应的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Decode(_) | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Persistence(_)
            | Self::Rejected(_)
            | Self::Render { .. }
            | Self::Transport(_)
            | Self::Shared(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 返回错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Decode(_) => "DECODE_ERROR",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Persistence(_) => "PERSISTENCE_ERROR",
            Self::Rejected(_) => "PERSISTENCE_REJECTED",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Render { .. } => "RENDER_ERROR",
            Self::Transport(_) => "TRANSPORT_ERROR",
            Self::Shared(e) => e.code(),
        }
    }

    /// 是否值得通过重新投递再试一次
    ///
    /// 解码和校验错误重放多少次结果都一样，只有存储与传输类故障可能自愈。
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Persistence(_) | Self::Transport(_) => true,
            Self::Shared(e) => e.is_retryable(),
            Self::Decode(_)
            | Self::Validation(_)
            | Self::Rejected(_)
            | Self::Unauthorized(_)
            | Self::Render { .. } => false,
        }
    }

    /// 摄取失败指标的 reason 标签
    pub fn failure_reason(&self) -> &'static str {
        match self {
            Self::Decode(_) => "decode",
            Self::Validation(_) => "validation",
            Self::Persistence(_) | Self::Shared(_) => "persistence",
            Self::Rejected(_) => "rejected",
            Self::Unauthorized(_) => "auth",
            Self::Render { .. } => "render",
            Self::Transport(_) => "transport",
        }
    }
}

/// SQLSTATE 22（数据异常）和 23（完整性约束冲突）由数据本身导致
pub fn is_permanent_sqlstate(code: &str) -> bool {
    code.starts_with("22") || code.starts_with("23")
}

impl From<sqlx::Error> for NotificationError {
    fn from(err: sqlx::Error) -> Self {
        let permanent = err
            .as_database_error()
            .and_then(|db| db.code())
            .is_some_and(|code| is_permanent_sqlstate(&code));

        if permanent {
            Self::Rejected(err.to_string())
        } else {
            Self::Persistence(err.to_string())
        }
    }
}

impl From<serde_json::Error> for NotificationError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

impl IntoResponse for NotificationError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // 5xx 只返回通用提示，详细信息仅记录日志
        let message = if status.is_server_error() {
            tracing::error!(error = %self, code = self.error_code(), "请求处理失败");
            "服务内部错误，请稍后重试".to_string()
        } else {
            self.to_string()
        };

        let body = json!({
            "success": false,
            "code": self.error_code(),
            "message": message,
            "data": serde_json::Value::Null
        });

        (status, axum::Json(body)).into_response()
    }
}

/// 服务层 Result 类型别名
pub type Result<T> = std::result::Result<T, NotificationError>;
