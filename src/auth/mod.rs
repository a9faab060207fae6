pub mod session_extractor;
pub mod utils;

use crate::error::{AppError, AppResult};
use crate::models::user::UserAccount;
use crate::repositories::account_repository::AccountRepository;
use sqlx::SqlitePool;

/// Resolves a credential pair to the matching account. The caller never
/// learns whether the username or the password was wrong.
pub async fn authenticate(
    pool: &SqlitePool,
    username: &str,
    password: &str,
) -> AppResult<UserAccount> {
    let (account, password_hash) = AccountRepository::get_with_password(pool, username)
        .await?
        .ok_or_else(|| AppError::Auth("invalid username or password".to_string()))?;

    utils::verify_password(password, &password_hash).await?;

    Ok(account)
}
