//! 认证模块
//!
//! Token 由独立的身份服务签发，本服务只负责校验并取出接收者 ID。

mod jwt;

pub use jwt::{Claims, ClaimsPayload, JwtVerifier};

use async_trait::async_trait;

use crate::error::Result;

/// 已认证的调用者，即 feed 的接收者 ID
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject(pub String);

impl Subject {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Token 校验接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// 校验 Token 并返回调用者身份；无效或过期返回 `NotificationError::Unauthorized`
    async fn verify(&self, token: &str) -> Result<Subject>;
}
