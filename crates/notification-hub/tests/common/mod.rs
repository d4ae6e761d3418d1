//! 集成测试共用的辅助函数

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use hub_shared::config::{AuthConfig, ServerConfig};
use jsonwebtoken::{EncodingKey, Header, encode};
use notification_hub::Result;
use notification_hub::auth::JwtVerifier;
use notification_hub::models::{NewNotification, NotificationRecord};
use notification_hub::repository::{InMemoryNotificationRepository, NotificationRepositoryTrait};
use notification_hub::routes;
use notification_hub::state::AppState;
use serde_json::json;

pub const SECRET: &str = "integration-test-secret";

/// 包装内存仓储并统计查询次数，用于断言认证失败时不会访问存储
#[derive(Default)]
pub struct CountingRepository {
    pub inner: InMemoryNotificationRepository,
    pub find_calls: AtomicUsize,
}

impl CountingRepository {
    pub fn find_calls(&self) -> usize {
        self.find_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NotificationRepositoryTrait for CountingRepository {
    async fn insert_batch(&self, records: &[NewNotification]) -> Result<Vec<i64>> {
        self.inner.insert_batch(records).await
    }

    async fn find_by_recipient(&self, recipient_id: &str) -> Result<Vec<NotificationRecord>> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.find_by_recipient(recipient_id).await
    }

    async fn health_check(&self) -> Result<()> {
        self.inner.health_check().await
    }
}

pub fn auth_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: SECRET.to_string(),
        issuer: None,
        leeway_secs: 0,
    }
}

/// 构建完整应用
pub fn app(repository: Arc<dyn NotificationRepositoryTrait>) -> Router {
    let state = AppState::new(repository, Arc::new(JwtVerifier::new(&auth_config())));
    routes::build_app(state, &ServerConfig::default())
}

/// 签发一个有效期一小时的 Token
pub fn token_for(subject: &str) -> String {
    sign(json!({
        "sub": subject,
        "exp": chrono::Utc::now().timestamp() + 3600,
    }))
}

pub fn sign(claims: serde_json::Value) -> String {
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

/// 轮询直到条件满足，超过两秒则失败
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..400 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("条件未在预期时间内满足");
}
