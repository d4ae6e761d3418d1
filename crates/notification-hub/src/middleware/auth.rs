//! Bearer Token 认证中间件
//!
//! 校验通过后把 [`Subject`](crate::auth::Subject) 注入请求扩展，缺少或格式错误的 header 直接返回 401，
//! 不会触达存储。

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, header::AUTHORIZATION},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::error::{NotificationError, Result};
use crate::state::AppState;

const BEARER_PREFIX: &str = "Bearer ";

/// 从 Authorization header 取出 Bearer Token
pub fn bearer_token(headers: &HeaderMap) -> Result<&str> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| NotificationError::Unauthorized("缺少认证 Token".to_string()))?;

    let value = value
        .to_str()
        .map_err(|_| NotificationError::Unauthorized("Authorization header 格式错误".to_string()))?;

    match value.strip_prefix(BEARER_PREFIX).map(str::trim) {
        Some(token) if !token.is_empty() => Ok(token),
        _ => Err(NotificationError::Unauthorized(
            "Authorization header 格式错误，应为 Bearer <token>".to_string(),
        )),
    }
}

/// 认证中间件
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let token = match bearer_token(request.headers()) {
        Ok(token) => token.to_string(),
        Err(e) => return e.into_response(),
    };

    match state.verifier.verify(&token).await {
        Ok(subject) => {
            debug!(subject = subject.as_str(), "请求已认证");
            request.extensions_mut().insert(subject);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}
