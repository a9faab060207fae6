use dotenvy::dotenv;
use school_transport_backend::{
    auth::session_extractor::ApiContext,
    db::{init_pool_default, run_migrations},
    error::AppResult,
    postal::{DEFAULT_BASE_URL, PostalClient},
    repositories::account_repository::AccountRepository,
    routes::api_router,
};
use std::env;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> AppResult<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let database_url =
        env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://transport.db?mode=rwc".to_string());
    let jwt_secret = env::var("JWT_SECRET")?;

    let pool = init_pool_default(&database_url).await?;
    run_migrations(&pool).await?;

    let default_admin_password =
        env::var("ADMIN_DEFAULT_PASSWORD").unwrap_or_else(|_| "adm-change-me".to_string());
    AccountRepository::ensure_default_admin(&pool, &default_admin_password).await?;

    let postal_base_url =
        env::var("POSTAL_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
    let ctx = ApiContext {
        db: pool,
        jwt_secret,
        postal: PostalClient::new(postal_base_url),
    };

    let port = env::var("PORT").unwrap_or_else(|_| "4000".to_string());
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("listening on {addr}");

    axum::serve(listener, api_router().with_state(ctx))
        .await
        .map_err(Into::into)
}
