use crate::{
    auth::session_extractor::ApiContext,
    controllers::auth_controller::{get_current_user, login, logout},
};
use axum::{
    Router,
    routing::{get, post},
};

pub fn auth_routes() -> Router<ApiContext> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(get_current_user))
}
