//! JWT Token 处理

use attendance_ledger::UserRole;
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use passport_shared::config::AuthConfig;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// JWT Claims（Token 载荷）
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// 用户 ID 的字符串形式
    pub sub: String,
    pub user_id: i64,
    pub role: UserRole,
    /// 签发时间
    pub iat: i64,
    /// 过期时间
    pub exp: i64,
    /// 签发者
    pub iss: String,
}

/// JWT 管理器
#[derive(Clone)]
pub struct JwtManager {
    issuer: String,
    ttl_seconds: i64,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtManager {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            issuer: config.jwt_issuer.clone(),
            ttl_seconds: config.token_ttl_seconds,
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        }
    }

    /// 生成 JWT Token，返回 (token, 过期时间戳)
    ///
    /// 测试辅助：服务本身只验证 Token，不提供签发接口，
    /// 仅供测试构造已认证请求使用
    pub fn generate_token(&self, user_id: i64, role: UserRole) -> Result<(String, i64), ApiError> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.ttl_seconds);

        let claims = Claims {
            sub: user_id.to_string(),
            user_id,
            role,
            iat: now.timestamp(),
            exp: exp.timestamp(),
            iss: self.issuer.clone(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| ApiError::Internal(format!("JWT 生成失败: {}", e)))?;

        Ok((token, exp.timestamp()))
    }

    /// 验证并解析 JWT Token
    pub fn verify_token(&self, token: &str) -> Result<Claims, ApiError> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.issuer]);

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(
            |e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    ApiError::Unauthorized("Token 已过期".to_string())
                }
                jsonwebtoken::errors::ErrorKind::InvalidToken => {
                    ApiError::Unauthorized("无效的 Token".to_string())
                }
                _ => ApiError::Unauthorized(format!("Token 验证失败: {}", e)),
            },
        )?;

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> JwtManager {
        JwtManager::new(&AuthConfig::default())
    }

    #[test]
    fn test_generate_and_verify_token() {
        let manager = manager();
        let (token, exp) = manager.generate_token(42, UserRole::Staff).unwrap();

        let claims = manager.verify_token(&token).unwrap();
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.user_id, 42);
        assert_eq!(claims.role, UserRole::Staff);
        assert_eq!(claims.exp, exp);
    }

    #[test]
    fn test_invalid_token() {
        let result = manager().verify_token("invalid.token.here");
        assert!(matches!(result, Err(ApiError::Unauthorized(_))));
    }

    #[test]
    fn test_expired_token_rejected() {
        let config = AuthConfig {
            token_ttl_seconds: -3600,
            ..AuthConfig::default()
        };
        let manager = JwtManager::new(&config);
        let (token, _) = manager.generate_token(1, UserRole::Admin).unwrap();

        let err = manager.verify_token(&token).unwrap_err();
        assert!(err.to_string().contains("过期"));
    }

    #[test]
    fn test_issuer_mismatch_rejected() {
        let other = JwtManager::new(&AuthConfig {
            jwt_issuer: "someone-else".to_string(),
            ..AuthConfig::default()
        });
        let (token, _) = other.generate_token(1, UserRole::Admin).unwrap();

        assert!(manager().verify_token(&token).is_err());
    }
}
