use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::JwtConfig;
use crate::error::ApiError;
use crate::models::Admin;

/// Содержимое JWT администратора.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub email: String,
    pub name: String,
    pub exp: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminUser {
    pub id: i64,
    pub email: String,
    pub name: String,
}

// Выпуск токена после успешного входа
pub fn issue_token(admin: &Admin, jwt: &JwtConfig) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = Claims {
        sub: admin.id,
        email: admin.email.clone(),
        name: admin.name.clone(),
        exp: (Utc::now() + Duration::hours(jwt.expires_in_hours)).timestamp(),
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(jwt.secret.as_bytes()))
}

pub fn verify_token(token: &str, jwt: &JwtConfig) -> Option<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt.secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .ok()
}

// Bearer JWT extractor для админских маршрутов
impl FromRequestParts<Arc<crate::AppState>> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<crate::AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(ApiError::Unauthorized)?;

        let claims = verify_token(token.trim(), &state.config.jwt).ok_or(ApiError::Unauthorized)?;

        Ok(AdminUser {
            id: claims.sub,
            email: claims.email,
            name: claims.name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jwt(secret: &str) -> JwtConfig {
        JwtConfig {
            secret: secret.to_string(),
            expires_in_hours: 1,
        }
    }

    fn admin() -> Admin {
        Admin {
            id: 7,
            name: "Admin".to_string(),
            email: "admin@example.com".to_string(),
            password_hash: String::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn issued_token_verifies_with_same_secret() {
        let token = issue_token(&admin(), &jwt("secret")).unwrap();
        let claims = verify_token(&token, &jwt("secret")).unwrap();
        assert_eq!(claims.sub, 7);
        assert_eq!(claims.email, "admin@example.com");

        assert!(verify_token(&token, &jwt("other")).is_none());
    }

    #[test]
    fn expired_token_is_rejected() {
        let mut config = jwt("secret");
        config.expires_in_hours = -2;
        let token = issue_token(&admin(), &config).unwrap();
        assert!(verify_token(&token, &jwt("secret")).is_none());
    }
}
