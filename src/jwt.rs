use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};

use crate::app::AppState;
use crate::authz::Principal;
use crate::errors::AppError;
use crate::models::user::Role;

/// Why a session token was refused.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid session token")]
    Invalid,
    #[error("session token expired")]
    Expired,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: Arc<Vec<u8>>,
    pub exp_hours: i64,
}

impl JwtConfig {
    pub fn new(secret: impl Into<Vec<u8>>, exp_hours: i64) -> Self {
        Self {
            secret: Arc::new(secret.into()),
            exp_hours,
        }
    }

    pub fn from_env() -> Result<Self, AppError> {
        let secret = std::env::var("JWT_SECRET").map_err(|_| AppError::configuration("JWT_SECRET not set"))?;
        let exp_hours = std::env::var("JWT_EXP_HOURS")
            .map(|val| val.parse::<i64>())
            .unwrap_or(Ok(24 * 30))
            .map_err(|_| AppError::configuration("JWT_EXP_HOURS must be a valid integer"))?;

        Ok(Self::new(secret.into_bytes(), exp_hours))
    }

    pub fn encode(&self, user_id: &str, role: Role) -> Result<String, AppError> {
        self.encode_at(user_id, role, Utc::now())
    }

    /// Sign a token as if issued at `issued_at`.
    pub fn encode_at(&self, user_id: &str, role: Role, issued_at: DateTime<Utc>) -> Result<String, AppError> {
        let exp = issued_at + Duration::hours(self.exp_hours);

        let claims = Claims {
            sub: user_id.to_string(),
            role: role.as_str().to_string(),
            exp: exp.timestamp(),
            iat: issued_at.timestamp(),
        };

        jsonwebtoken::encode(&Header::default(), &claims, &EncodingKey::from_secret(&self.secret))
            .map_err(|err| AppError::token(err.to_string()))
    }

    /// Verify the signature and shape of a token without looking at its expiry.
    pub fn decode(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::default();
        // Expiry is checked by `resolve_at` against an explicit clock, with no leeway.
        validation.validate_exp = false;

        jsonwebtoken::decode::<Claims>(token, &DecodingKey::from_secret(&self.secret), &validation)
            .map(|data| data.claims)
            .map_err(|err| {
                tracing::debug!(error = %err, "token verification failed");
                AuthError::Invalid
            })
    }

    pub fn resolve(&self, token: &str) -> Result<Principal, AuthError> {
        self.resolve_at(token, Utc::now())
    }

    /// Turn a bearer token into a principal. A correctly signed token past its expiry is
    /// `Expired`, never `Invalid`.
    pub fn resolve_at(&self, token: &str, now: DateTime<Utc>) -> Result<Principal, AuthError> {
        let claims = self.decode(token)?;

        if claims.exp < now.timestamp() {
            return Err(AuthError::Expired);
        }

        let role = claims.role.parse::<Role>().map_err(|_| AuthError::Invalid)?;
        Ok(Principal::new(claims.sub, role))
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub principal: Principal,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| AppError::unauthorized("Authorization header missing"))?;

        let principal = state.jwt.resolve(token).map_err(|err| {
            tracing::warn!(error = %err, "rejected session token");
            err
        })?;

        Ok(AuthUser { principal })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> JwtConfig {
        JwtConfig::new("test-secret", 24)
    }

    #[test]
    fn resolves_principal_from_claims() {
        let jwt = config();
        let token = jwt.encode("u9", Role::User).unwrap();

        let principal = jwt.resolve(&token).unwrap();
        assert_eq!(principal, Principal::user("u9"));
    }

    #[test]
    fn role_comes_from_the_token() {
        let jwt = config();
        let token = jwt.encode("a1", Role::Admin).unwrap();
        assert!(jwt.resolve(&token).unwrap().is_admin());
    }

    #[test]
    fn expired_token_is_expired_not_invalid() {
        let jwt = config();
        let issued = Utc::now() - Duration::hours(48);
        let token = jwt.encode_at("u9", Role::User, issued).unwrap();

        assert_eq!(jwt.resolve(&token), Err(AuthError::Expired));
    }

    #[test]
    fn expiry_boundary_uses_supplied_clock() {
        let jwt = config();
        let issued = Utc::now();
        let token = jwt.encode_at("u9", Role::User, issued).unwrap();

        let at_expiry = issued + Duration::hours(24);
        let just_after = at_expiry + Duration::seconds(1);
        assert!(jwt.resolve_at(&token, at_expiry).is_ok(), "valid through its exp second");
        assert_eq!(jwt.resolve_at(&token, just_after), Err(AuthError::Expired));
    }

    #[test]
    fn wrong_secret_is_invalid() {
        let token = JwtConfig::new("other-secret", 24).encode("u9", Role::User).unwrap();
        assert_eq!(config().resolve(&token), Err(AuthError::Invalid));
    }

    #[test]
    fn expired_token_with_wrong_secret_is_invalid() {
        let issued = Utc::now() - Duration::hours(48);
        let token = JwtConfig::new("other-secret", 24)
            .encode_at("u9", Role::User, issued)
            .unwrap();
        assert_eq!(config().resolve(&token), Err(AuthError::Invalid));
    }

    #[test]
    fn garbage_is_invalid() {
        assert_eq!(config().resolve("not.a.token"), Err(AuthError::Invalid));
        assert_eq!(config().resolve(""), Err(AuthError::Invalid));
    }

    #[test]
    fn unknown_role_is_invalid() {
        let jwt = config();
        let claims = Claims {
            sub: "u9".to_string(),
            role: "Owner".to_string(),
            exp: (Utc::now() + Duration::hours(1)).timestamp(),
            iat: Utc::now().timestamp(),
        };
        let token = jsonwebtoken::encode(&Header::default(), &claims, &EncodingKey::from_secret(b"test-secret"))
            .unwrap();

        assert_eq!(jwt.resolve(&token), Err(AuthError::Invalid));
    }
}
