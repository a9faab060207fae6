use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::error::{AppError, AppResult};

pub async fn hash_password(password: &str) -> AppResult<String> {
    let password = password.to_string();

    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();

        argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::Auth(format!("Failed to hash password: {e}")))
    })
    .await
    .map_err(|e| AppError::Other(format!("Task join error: {e}")))?
}

pub async fn verify_password(password: &str, password_hash: &str) -> AppResult<()> {
    let password = password.to_string();
    let password_hash = password_hash.to_string();

    tokio::task::spawn_blocking(move || {
        let parsed_hash = PasswordHash::new(&password_hash)
            .map_err(|e| AppError::Auth(format!("Invalid password hash: {e}")))?;

        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .map_err(|_| AppError::Auth("invalid username or password".to_string()))
    })
    .await
    .map_err(|e| AppError::Other(format!("Task join error: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_and_verify_round_trip() {
        let hash = hash_password("correct horse").await.unwrap();
        assert_ne!(hash, "correct horse");
        verify_password("correct horse", &hash).await.unwrap();
    }

    #[tokio::test]
    async fn wrong_password_fails_verification() {
        let hash = hash_password("correct horse").await.unwrap();
        let err = verify_password("battery staple", &hash).await.unwrap_err();
        assert!(matches!(err, AppError::Auth(_)));
    }
}
