use crate::{error::AppError, models::session::Session, models::user::Role, postal::PostalClient};
use axum::{
    RequestPartsExt,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::{
    TypedHeader,
    extract::CookieJar,
    headers::{Authorization, authorization::Bearer},
};
use hmac::{Hmac, Mac};
use jwt::{SignWithKey, VerifyWithKey};
use serde::{Deserialize, Serialize};
use sha2::Sha384;
use time::OffsetDateTime;

pub const SESSION_COOKIE: &str = "jwt";

#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    account_id: i64,
    role: Role,
    exp: i64,
}

#[derive(Clone)]
pub struct ApiContext {
    pub db: sqlx::SqlitePool,
    pub jwt_secret: String,
    pub postal: PostalClient,
}

impl Session {
    pub fn from_token(ctx: &ApiContext, token: &str) -> Result<Self, AppError> {
        let hmac = Hmac::<Sha384>::new_from_slice(ctx.jwt_secret.as_bytes())
            .map_err(|e| AppError::Auth(format!("Invalid HMAC key: {e}")))?;

        let claims: SessionClaims = token.verify_with_key(&hmac).map_err(|e| {
            tracing::debug!("JWT failed to verify: {e}");
            AppError::Auth("Invalid token".to_string())
        })?;

        if claims.exp < OffsetDateTime::now_utc().unix_timestamp() {
            tracing::debug!("Token expired");
            return Err(AppError::Auth("Token expired".to_string()));
        }

        Ok(Self {
            account_id: claims.account_id,
            role: claims.role,
        })
    }

    pub fn to_jwt(&self, ctx: &ApiContext) -> Result<String, AppError> {
        use time::Duration;

        let hmac = Hmac::<Sha384>::new_from_slice(ctx.jwt_secret.as_bytes())
            .map_err(|e| AppError::Auth(format!("Invalid HMAC key: {e}")))?;

        let claims = SessionClaims {
            account_id: self.account_id,
            role: self.role,
            exp: (OffsetDateTime::now_utc() + Duration::hours(12)).unix_timestamp(),
        };

        claims
            .sign_with_key(&hmac)
            .map_err(|e| AppError::Auth(format!("Failed to sign JWT: {e}")))
    }
}

#[derive(Debug, Clone)]
pub struct MaybeSession(pub Option<Session>);

impl MaybeSession {
    pub fn into_inner(self) -> Option<Session> {
        self.0
    }
}

impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
    ApiContext: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match MaybeSession::from_request_parts(parts, state).await? {
            MaybeSession(Some(session)) => Ok(session),
            MaybeSession(None) => Err(AppError::Auth("Not authenticated".to_string())),
        }
    }
}

impl<S> FromRequestParts<S> for MaybeSession
where
    S: Send + Sync,
    ApiContext: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let ctx: ApiContext = ApiContext::from_ref(state);

        if let Some(TypedHeader(Authorization(bearer))) = parts
            .extract::<Option<TypedHeader<Authorization<Bearer>>>>()
            .await
            .ok()
            .flatten()
        {
            let session = Session::from_token(&ctx, bearer.token())?;
            return Ok(Self(Some(session)));
        }

        let Ok(jar) = parts.extract::<CookieJar>().await;

        if let Some(cookie) = jar.get(SESSION_COOKIE) {
            let session = Session::from_token(&ctx, cookie.value())?;
            return Ok(Self(Some(session)));
        }

        Ok(Self(None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_context(secret: &str) -> ApiContext {
        ApiContext {
            db: sqlx::SqlitePool::connect_lazy("sqlite::memory:").unwrap(),
            jwt_secret: secret.to_string(),
            postal: PostalClient::new("http://127.0.0.1:1"),
        }
    }

    #[tokio::test]
    async fn token_round_trip_preserves_session() {
        let ctx = test_context("test-secret");
        let session = Session {
            account_id: 42,
            role: Role::Supervisor,
        };

        let token = session.to_jwt(&ctx).unwrap();
        let recovered = Session::from_token(&ctx, &token).unwrap();

        assert_eq!(recovered.account_id, 42);
        assert_eq!(recovered.role, Role::Supervisor);
    }

    #[tokio::test]
    async fn token_signed_with_other_secret_is_rejected() {
        let session = Session {
            account_id: 1,
            role: Role::School,
        };
        let token = session.to_jwt(&test_context("secret-a")).unwrap();

        let err = Session::from_token(&test_context("secret-b"), &token).unwrap_err();
        assert!(matches!(err, AppError::Auth(_)));
    }
}
