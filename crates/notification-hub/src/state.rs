//! 应用状态定义

use std::sync::Arc;

use crate::auth::TokenVerifier;
use crate::repository::NotificationRepositoryTrait;

/// Axum 应用共享状态
///
/// 仓储和 Token 校验器都以 trait 对象持有，测试中可替换为内存实现或 mock。
#[derive(Clone)]
pub struct AppState {
    pub repository: Arc<dyn NotificationRepositoryTrait>,
    pub verifier: Arc<dyn TokenVerifier>,
}

impl AppState {
    pub fn new(
        repository: Arc<dyn NotificationRepositoryTrait>,
        verifier: Arc<dyn TokenVerifier>,
    ) -> Self {
        Self {
            repository,
            verifier,
        }
    }
}
