use crate::{
    auth::{session_extractor::ApiContext, utils::hash_password},
    error::{AppError, AppResult},
    models::{
        session::{Capability, Session},
        user::{AccountInfo, Role},
    },
    repositories::account_repository::AccountRepository,
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateAccountRequest {
    #[schema(example = "Jane Doe")]
    pub full_name: String,

    #[schema(example = "jane.doe")]
    pub username: String,

    #[schema(example = "SecurePass123!", min_length = 8)]
    pub password: String,

    #[schema(example = json!(["school", "supervisor"]))]
    pub roles: Vec<Role>,
}

#[utoipa::path(
    post,
    path = "/api/users",
    tag = "Accounts",
    request_body = CreateAccountRequest,
    responses(
        (status = 201, description = "Account created", body = AccountInfo),
        (status = 403, description = "Role may not manage accounts", body = crate::error::ErrorResponse),
        (status = 409, description = "Username already taken", body = crate::error::ErrorResponse),
    )
)]
pub async fn create_account(
    session: Session,
    State(ctx): State<ApiContext>,
    Json(data): Json<CreateAccountRequest>,
) -> AppResult<(StatusCode, Json<AccountInfo>)> {
    session.require(Capability::ManageAccounts)?;

    if data.password.len() < 8 {
        return Err(AppError::Validation(
            "password must be at least 8 characters".to_string(),
        ));
    }

    let password_hash = hash_password(&data.password).await?;
    let account = AccountRepository::create_account(
        &ctx.db,
        &data.full_name,
        &data.username,
        &password_hash,
        &data.roles,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(AccountInfo::from(account))))
}

#[utoipa::path(
    get,
    path = "/api/users",
    tag = "Accounts",
    responses(
        (status = 200, description = "All accounts", body = [AccountInfo]),
        (status = 403, description = "Role may not manage accounts", body = crate::error::ErrorResponse),
    )
)]
pub async fn list_accounts(
    session: Session,
    State(ctx): State<ApiContext>,
) -> AppResult<Json<Vec<AccountInfo>>> {
    session.require(Capability::ManageAccounts)?;

    let accounts = AccountRepository::list_accounts(&ctx.db).await?;
    Ok(Json(accounts.into_iter().map(AccountInfo::from).collect()))
}

#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    tag = "Accounts",
    params(("id" = i64, Path, description = "Account id")),
    responses(
        (status = 204, description = "Account deleted"),
        (status = 400, description = "The default administrator cannot be deleted", body = crate::error::ErrorResponse),
        (status = 404, description = "Unknown id", body = crate::error::ErrorResponse),
    )
)]
pub async fn delete_account(
    session: Session,
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    session.require(Capability::ManageAccounts)?;

    AccountRepository::delete_account(&ctx.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
