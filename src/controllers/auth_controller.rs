use crate::{
    auth::{authenticate, session_extractor::{ApiContext, SESSION_COOKIE}},
    error::{AppError, AppResult},
    models::{
        session::{Session, select_role},
        user::{AccountInfo, Role},
    },
    repositories::account_repository::AccountRepository,
};
use axum::{Json, extract::State};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use serde::{Deserialize, Serialize};
use time::Duration;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "jane.doe")]
    pub username: String,

    #[schema(example = "SecurePass123!")]
    pub password: String,

    /// Required when the account holds more than one role.
    #[schema(example = "school")]
    pub role: Option<Role>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    /// Absent when a multi-role account has not yet selected a role.
    pub token: Option<String>,

    /// The active role bound to the token.
    pub role: Option<Role>,

    /// All roles assigned to the account; the candidate set for selection.
    pub roles: Vec<Role>,

    pub user: AccountInfo,
}

/// Authenticates a credential pair and, once a single active role is
/// resolved, issues a session token. Accounts holding several roles get the
/// candidate set back and log in again with an explicit `role`.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Authentication",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = crate::error::ErrorResponse),
    )
)]
pub async fn login(
    State(ctx): State<ApiContext>,
    jar: CookieJar,
    Json(data): Json<LoginRequest>,
) -> AppResult<(CookieJar, Json<LoginResponse>)> {
    let account = authenticate(&ctx.db, &data.username, &data.password).await?;
    let selected = select_role(&account.roles, data.role)?;

    let roles = account.roles.clone();
    let user = AccountInfo::from(account.clone());

    let Some(role) = selected else {
        return Ok((
            jar,
            Json(LoginResponse {
                token: None,
                role: None,
                roles,
                user,
            }),
        ));
    };

    let session = Session {
        account_id: account.id,
        role,
    };
    let token = session.to_jwt(&ctx)?;

    let cookie = Cookie::build((SESSION_COOKIE, token.clone()))
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Strict)
        .max_age(Duration::hours(12))
        .path("/")
        .build();

    Ok((
        jar.add(cookie),
        Json(LoginResponse {
            token: Some(token),
            role: Some(role),
            roles,
            user,
        }),
    ))
}

/// Discards the session: the cookie is cleared and no session-scoped state
/// survives on the server.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "Authentication",
    responses((status = 200, description = "Session discarded"))
)]
pub async fn logout(jar: CookieJar) -> AppResult<CookieJar> {
    let cookie = Cookie::build(SESSION_COOKIE)
        .path("/")
        .max_age(Duration::seconds(0))
        .build();

    Ok(jar.remove(cookie))
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "Authentication",
    responses(
        (status = 200, description = "The authenticated account", body = AccountInfo),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse),
    )
)]
pub async fn get_current_user(
    session: Session,
    State(ctx): State<ApiContext>,
) -> AppResult<Json<AccountInfo>> {
    let account = AccountRepository::get_by_id(&ctx.db, session.account_id)
        .await?
        .ok_or_else(|| AppError::NotFound("account not found".to_string()))?;

    Ok(Json(AccountInfo::from(account)))
}
