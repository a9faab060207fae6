use utoipa::OpenApi;

use crate::{
    controllers::auth_controller::{
        __path_get_current_user, __path_login, __path_logout, LoginRequest, LoginResponse,
    },
    controllers::request_controller::{
        __path_delete_request, __path_download_document, __path_evaluate_request,
        __path_export_report, __path_get_request, __path_list_requests, __path_patch_request,
        __path_postal_suggest, __path_submit_request, CreatedResponse, RequestResponse,
    },
    controllers::user_controller::{
        __path_create_account, __path_delete_account, __path_list_accounts, CreateAccountRequest,
    },
    error::ErrorResponse,
    models::{
        request::{
            AdministrativePatch, Address, DocumentKind, DocumentUpload, EvaluationDecision,
            EvaluationInput, NewRequest, RejectionReason, RequestStatus, RequestSummary, Weekday,
        },
        user::{AccountInfo, Role},
    },
    postal::PostalAddress,
};

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};

#[derive(OpenApi)]
#[openapi(
    paths(
        login,
        logout,
        get_current_user,
        submit_request,
        list_requests,
        get_request,
        download_document,
        evaluate_request,
        patch_request,
        delete_request,
        export_report,
        postal_suggest,
        create_account,
        list_accounts,
        delete_account
    ),
    components(
        schemas(
            LoginRequest,
            LoginResponse,
            AccountInfo,
            CreateAccountRequest,
            Role,
            NewRequest,
            Address,
            DocumentUpload,
            DocumentKind,
            Weekday,
            RequestStatus,
            RejectionReason,
            EvaluationDecision,
            EvaluationInput,
            AdministrativePatch,
            RequestResponse,
            RequestSummary,
            CreatedResponse,
            PostalAddress,
            ErrorResponse
        )
    ),
    tags(
        (name = "Authentication", description = "Login, role selection and session endpoints"),
        (name = "Requests", description = "Transport-eligibility request lifecycle"),
        (name = "Accounts", description = "Administrator-only account management"),
        (name = "Postal", description = "Advisory postal-code address suggestion"),
    ),
    modifiers(&SecurityAddon),
    info(
        title = "School Transport Eligibility API",
        version = "1.0.0",
        description = "Role-gated workflow for school-transport eligibility requests",
    ),
    servers(
        (url = "http://localhost:4000", description = "Local development server"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Enter your session token in the format: Bearer <token>"))
                        .build(),
                ),
            )
        }
    }
}
