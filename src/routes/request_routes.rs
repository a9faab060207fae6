use crate::{
    auth::session_extractor::ApiContext,
    controllers::request_controller::{
        delete_request, download_document, evaluate_request, export_report, get_request,
        list_requests, patch_request, submit_request,
    },
};
use axum::{
    Router,
    routing::{get, post},
};

pub fn request_routes() -> Router<ApiContext> {
    Router::new()
        .route("/", post(submit_request).get(list_requests))
        .route("/report.csv", get(export_report))
        .route(
            "/{id}",
            get(get_request).patch(patch_request).delete(delete_request),
        )
        .route("/{id}/evaluation", post(evaluate_request))
        .route("/{id}/documents/{kind}", get(download_document))
}
