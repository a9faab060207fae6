use crate::{
    auth::session_extractor::ApiContext,
    error::{AppError, AppResult},
    export::write_report_csv,
    models::{
        request::{
            AdministrativePatch, Address, DocumentKind, EvaluationInput, NewRequest,
            RequestRecord, RequestStatus, RequestSummary, Weekday,
        },
        session::{Capability, Session},
    },
    postal::PostalAddress,
    repositories::request_repository::RequestRepository,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{
        StatusCode,
        header::{self, HeaderName, HeaderValue},
    },
};
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct CreatedResponse {
    #[schema(example = 1)]
    pub id: i64,
}

/// Everything on a record except the document bytes; those are fetched
/// through the download endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct RequestResponse {
    pub id: i64,
    pub student_name: String,
    pub student_tax_id: String,
    pub student_registration: String,
    pub wheelchair_user: bool,
    pub medical_code: Option<String>,
    pub student_address: Address,
    pub school_name: String,
    pub school_address: Address,
    pub resource_room: bool,
    pub attendance_days: Vec<Weekday>,
    pub entry_time: String,
    pub exit_time: String,
    pub medical_document_name: String,
    pub travel_document_name: String,
    pub status: RequestStatus,
    pub supervisor_name: Option<String>,
    pub supervisor_tax_id: Option<String>,
    pub rejection_reason: Option<String>,
    pub signed_document_name: Option<String>,
    #[schema(example = "2026-08-23T12:00:00Z")]
    pub last_updated_at: Option<String>,
    pub carrier_company: Option<String>,
}

impl From<RequestRecord> for RequestResponse {
    fn from(record: RequestRecord) -> Self {
        Self {
            id: record.id,
            student_name: record.student_name,
            student_tax_id: record.student_tax_id,
            student_registration: record.student_registration,
            wheelchair_user: record.wheelchair_user,
            medical_code: record.medical_code,
            student_address: record.student_address,
            school_name: record.school_name,
            school_address: record.school_address,
            resource_room: record.resource_room,
            attendance_days: record.attendance_days,
            entry_time: record.entry_time,
            exit_time: record.exit_time,
            medical_document_name: record.medical_document_name,
            travel_document_name: record.travel_document_name,
            status: record.status,
            supervisor_name: record.supervisor_name,
            supervisor_tax_id: record.supervisor_tax_id,
            rejection_reason: record.rejection_reason,
            signed_document_name: record.signed_document_name,
            last_updated_at: record
                .last_updated_at
                .and_then(|at| at.format(&Rfc3339).ok()),
            carrier_company: record.carrier_company,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ListQuery {
    pub status: Option<RequestStatus>,
}

#[utoipa::path(
    post,
    path = "/api/requests",
    tag = "Requests",
    request_body = NewRequest,
    responses(
        (status = 201, description = "Request created with status Pending", body = CreatedResponse),
        (status = 400, description = "A required field is missing", body = crate::error::ErrorResponse),
        (status = 403, description = "Role may not submit requests", body = crate::error::ErrorResponse),
    )
)]
pub async fn submit_request(
    session: Session,
    State(ctx): State<ApiContext>,
    Json(data): Json<NewRequest>,
) -> AppResult<(StatusCode, Json<CreatedResponse>)> {
    session.require(Capability::SubmitRequest)?;

    let id = RequestRepository::create_request(&ctx.db, &data).await?;
    tracing::info!(request_id = id, "request submitted");

    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

#[utoipa::path(
    get,
    path = "/api/requests",
    tag = "Requests",
    params(("status" = Option<RequestStatus>, Query, description = "Filter by lifecycle status")),
    responses((status = 200, description = "Requests in insertion order", body = [RequestSummary]))
)]
pub async fn list_requests(
    session: Session,
    State(ctx): State<ApiContext>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<RequestSummary>>> {
    session.require(Capability::ViewRequest)?;

    let summaries = RequestRepository::list_requests(&ctx.db, query.status).await?;
    Ok(Json(summaries))
}

#[utoipa::path(
    get,
    path = "/api/requests/{id}",
    tag = "Requests",
    params(("id" = i64, Path, description = "Request id")),
    responses(
        (status = 200, description = "The full record", body = RequestResponse),
        (status = 404, description = "Unknown id", body = crate::error::ErrorResponse),
    )
)]
pub async fn get_request(
    session: Session,
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> AppResult<Json<RequestResponse>> {
    session.require(Capability::ViewRequest)?;

    let record = RequestRepository::get_request(&ctx.db, id).await?;
    Ok(Json(RequestResponse::from(record)))
}

#[utoipa::path(
    get,
    path = "/api/requests/{id}/documents/{kind}",
    tag = "Requests",
    params(
        ("id" = i64, Path, description = "Request id"),
        ("kind" = DocumentKind, Path, description = "medical, travel or signed"),
    ),
    responses(
        (status = 200, description = "The stored file", content_type = "application/octet-stream"),
        (status = 404, description = "Unknown id or empty slot", body = crate::error::ErrorResponse),
    )
)]
pub async fn download_document(
    session: Session,
    State(ctx): State<ApiContext>,
    Path((id, kind)): Path<(i64, DocumentKind)>,
) -> AppResult<([(HeaderName, HeaderValue); 2], Vec<u8>)> {
    session.require(Capability::ViewRequest)?;

    let (filename, content) = RequestRepository::get_document(&ctx.db, id, kind).await?;
    Ok((attachment_headers("application/octet-stream", &filename)?, content))
}

#[utoipa::path(
    post,
    path = "/api/requests/{id}/evaluation",
    tag = "Requests",
    params(("id" = i64, Path, description = "Request id")),
    request_body = EvaluationInput,
    responses(
        (status = 204, description = "Evaluation recorded"),
        (status = 400, description = "Invariant not satisfied or record not Pending", body = crate::error::ErrorResponse),
        (status = 403, description = "Role may not evaluate requests", body = crate::error::ErrorResponse),
        (status = 404, description = "Unknown id", body = crate::error::ErrorResponse),
    )
)]
pub async fn evaluate_request(
    session: Session,
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
    Json(data): Json<EvaluationInput>,
) -> AppResult<StatusCode> {
    session.require(Capability::EvaluateRequest)?;

    RequestRepository::update_evaluation(&ctx.db, id, &data).await?;
    tracing::info!(request_id = id, decision = ?data.decision, "evaluation recorded");

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    patch,
    path = "/api/requests/{id}",
    tag = "Requests",
    params(("id" = i64, Path, description = "Request id")),
    request_body = AdministrativePatch,
    responses(
        (status = 204, description = "Fields overwritten"),
        (status = 403, description = "Role may not manage records", body = crate::error::ErrorResponse),
        (status = 404, description = "Unknown id", body = crate::error::ErrorResponse),
    )
)]
pub async fn patch_request(
    session: Session,
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
    Json(patch): Json<AdministrativePatch>,
) -> AppResult<StatusCode> {
    session.require(Capability::ManageRecords)?;

    RequestRepository::update_administrative(&ctx.db, id, &patch).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    delete,
    path = "/api/requests/{id}",
    tag = "Requests",
    params(("id" = i64, Path, description = "Request id")),
    responses(
        (status = 204, description = "Record deleted, irreversibly"),
        (status = 404, description = "Unknown id", body = crate::error::ErrorResponse),
    )
)]
pub async fn delete_request(
    session: Session,
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    session.require(Capability::ManageRecords)?;

    RequestRepository::delete_request(&ctx.db, id).await?;
    tracing::info!(request_id = id, "request deleted");

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/requests/report.csv",
    tag = "Requests",
    responses(
        (status = 200, description = "Full-table audit projection", content_type = "text/csv"),
        (status = 403, description = "Role may not manage records", body = crate::error::ErrorResponse),
    )
)]
pub async fn export_report(
    session: Session,
    State(ctx): State<ApiContext>,
) -> AppResult<([(HeaderName, HeaderValue); 2], Vec<u8>)> {
    session.require(Capability::ManageRecords)?;

    let rows = RequestRepository::report_rows(&ctx.db).await?;
    let bytes = write_report_csv(&rows)?;

    Ok((
        attachment_headers("text/csv; charset=utf-8", "requests-report.csv")?,
        bytes,
    ))
}

/// Advisory address pre-fill. Always 200; a failed lookup is `null`.
#[utoipa::path(
    get,
    path = "/api/postal/{code}",
    tag = "Postal",
    params(("code" = String, Path, description = "Postal code, separators allowed")),
    responses((status = 200, description = "Suggestion or null", body = Option<PostalAddress>))
)]
pub async fn postal_suggest(
    _session: Session,
    State(ctx): State<ApiContext>,
    Path(code): Path<String>,
) -> AppResult<Json<Option<PostalAddress>>> {
    Ok(Json(ctx.postal.lookup(&code).await))
}

fn attachment_headers(
    content_type: &'static str,
    filename: &str,
) -> AppResult<[(HeaderName, HeaderValue); 2]> {
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{filename}\""))
        .map_err(|e| AppError::Other(format!("invalid attachment filename: {e}")))?;

    Ok([
        (header::CONTENT_TYPE, HeaderValue::from_static(content_type)),
        (header::CONTENT_DISPOSITION, disposition),
    ])
}
