use crate::{
    auth::utils::hash_password,
    error::{AppError, AppResult},
    models::user::{Role, UserAccount, join_roles},
};
use sqlx::SqlitePool;
use time::OffsetDateTime;

/// The account every deployment starts with. It may never be deleted.
pub const DEFAULT_ADMIN_USERNAME: &str = "adm";

pub struct AccountRepository;

impl AccountRepository {
    pub async fn create_account(
        pool: &SqlitePool,
        full_name: &str,
        username: &str,
        password_hash: &str,
        roles: &[Role],
    ) -> AppResult<UserAccount> {
        if username.trim().is_empty() {
            return Err(AppError::Validation("username is required".to_string()));
        }
        if full_name.trim().is_empty() {
            return Err(AppError::Validation("full name is required".to_string()));
        }
        if roles.is_empty() {
            return Err(AppError::Validation(
                "at least one role is required".to_string(),
            ));
        }
        if Self::username_exists(pool, username).await? {
            return Err(AppError::Conflict(format!(
                "username {username} is already taken"
            )));
        }

        let result = sqlx::query(
            "INSERT INTO accounts (full_name, username, password_hash, roles, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(full_name)
        .bind(username)
        .bind(password_hash)
        .bind(join_roles(roles))
        .bind(OffsetDateTime::now_utc())
        .execute(pool)
        .await?;

        let account = Self::get_by_id(pool, result.last_insert_rowid())
            .await?
            .ok_or_else(|| AppError::Other("account vanished after insert".to_string()))?;
        Ok(account)
    }

    pub async fn get_by_id(pool: &SqlitePool, id: i64) -> AppResult<Option<UserAccount>> {
        let account = sqlx::query_as::<_, UserAccount>(
            "SELECT id, full_name, username, roles, created_at FROM accounts WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(account)
    }

    pub async fn get_by_username(
        pool: &SqlitePool,
        username: &str,
    ) -> AppResult<Option<UserAccount>> {
        let account = sqlx::query_as::<_, UserAccount>(
            "SELECT id, full_name, username, roles, created_at FROM accounts WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(pool)
        .await?;
        Ok(account)
    }

    pub async fn get_with_password(
        pool: &SqlitePool,
        username: &str,
    ) -> AppResult<Option<(UserAccount, String)>> {
        let Some(account) = Self::get_by_username(pool, username).await? else {
            return Ok(None);
        };

        let password_hash: String =
            sqlx::query_scalar("SELECT password_hash FROM accounts WHERE id = ?")
                .bind(account.id)
                .fetch_one(pool)
                .await?;

        Ok(Some((account, password_hash)))
    }

    pub async fn list_accounts(pool: &SqlitePool) -> AppResult<Vec<UserAccount>> {
        let accounts = sqlx::query_as::<_, UserAccount>(
            "SELECT id, full_name, username, roles, created_at FROM accounts ORDER BY id",
        )
        .fetch_all(pool)
        .await?;
        Ok(accounts)
    }

    pub async fn delete_account(pool: &SqlitePool, id: i64) -> AppResult<()> {
        let account = Self::get_by_id(pool, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("account {id}")))?;

        if account.username == DEFAULT_ADMIN_USERNAME {
            return Err(AppError::Validation(
                "the default administrator account cannot be deleted".to_string(),
            ));
        }

        sqlx::query("DELETE FROM accounts WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn username_exists(pool: &SqlitePool, username: &str) -> AppResult<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM accounts WHERE username = ?")
            .bind(username)
            .fetch_optional(pool)
            .await?;
        Ok(found.is_some())
    }

    /// First-run seeding: creates the `adm` administrator account if it is
    /// absent. Returns whether it was created on this call.
    pub async fn ensure_default_admin(pool: &SqlitePool, password: &str) -> AppResult<bool> {
        if Self::username_exists(pool, DEFAULT_ADMIN_USERNAME).await? {
            return Ok(false);
        }

        let password_hash = hash_password(password).await?;
        Self::create_account(
            pool,
            "Default Administrator",
            DEFAULT_ADMIN_USERNAME,
            &password_hash,
            &[Role::Administrator],
        )
        .await?;

        tracing::warn!(
            "created default administrator account '{DEFAULT_ADMIN_USERNAME}'; change its password"
        );
        Ok(true)
    }
}
