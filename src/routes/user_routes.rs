use crate::{
    auth::session_extractor::ApiContext,
    controllers::user_controller::{create_account, delete_account, list_accounts},
};
use axum::{
    Router,
    routing::{delete, get},
};

pub fn user_routes() -> Router<ApiContext> {
    Router::new()
        .route("/", get(list_accounts).post(create_account))
        .route("/{id}", delete(delete_account))
}
