//! JWT Token 校验

use async_trait::async_trait;
use hub_shared::config::AuthConfig;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use super::{Subject, TokenVerifier};
use crate::error::{NotificationError, Result};

/// 身份服务签发的 Token 中与本服务相关的载荷
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClaimsPayload {
    #[serde(default)]
    pub uuid: Option<String>,
}

/// JWT Claims（Token 载荷）
///
/// 身份服务把用户 ID 放在 `payload.uuid` 中；标准的 `sub` 存在时优先使用。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default)]
    pub sub: Option<String>,
    pub exp: i64,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default)]
    pub iss: Option<String>,
    #[serde(default)]
    pub payload: Option<ClaimsPayload>,
}

impl Claims {
    /// 取出接收者 ID，空字符串视为缺失
    pub fn subject(&self) -> Option<&str> {
        let from_payload = self.payload.as_ref().and_then(|p| p.uuid.as_deref());
        self.sub
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .or_else(|| from_payload.filter(|s| !s.trim().is_empty()))
    }
}

/// HS256 共享密钥校验器
pub struct JwtVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = config.leeway_secs;
        validation.set_required_spec_claims(&["exp"]);
        if let Some(issuer) = &config.issuer {
            validation.set_issuer(&[issuer]);
        }

        Self {
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
        }
    }

    /// 验证签名和有效期并解析 Claims
    pub fn decode_claims(&self, token: &str) -> Result<Claims> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(
            |e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    NotificationError::Unauthorized("Token 已过期".to_string())
                }
                jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                    NotificationError::Unauthorized("Token 签名无效".to_string())
                }
                jsonwebtoken::errors::ErrorKind::InvalidToken => {
                    NotificationError::Unauthorized("无效的 Token".to_string())
                }
                _ => NotificationError::Unauthorized(format!("Token 验证失败: {e}")),
            },
        )?;

        Ok(token_data.claims)
    }
}

#[async_trait]
impl TokenVerifier for JwtVerifier {
    async fn verify(&self, token: &str) -> Result<Subject> {
        let claims = self.decode_claims(token)?;
        let subject = claims
            .subject()
            .ok_or_else(|| NotificationError::Unauthorized("Token 中缺少用户标识".to_string()))?;
        Ok(Subject(subject.to_string()))
    }
}
