mod auth_routes;
mod request_routes;
mod user_routes;

use crate::{
    auth::session_extractor::ApiContext, controllers::request_controller::postal_suggest,
    swagger::ApiDoc,
};
use axum::{Json, Router, routing::get};
use utoipa::OpenApi;

pub fn api_router() -> Router<ApiContext> {
    Router::new()
        .nest("/api/auth", auth_routes::auth_routes())
        .nest("/api/requests", request_routes::request_routes())
        .nest("/api/users", user_routes::user_routes())
        .route("/api/postal/{code}", get(postal_suggest))
        .route("/api-docs/openapi.json", get(openapi))
}

async fn openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
