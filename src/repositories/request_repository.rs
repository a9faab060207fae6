use crate::{
    error::{AppError, AppResult},
    models::request::{
        APPROVED_SENTINEL, AdministrativePatch, DocumentKind, EvaluationDecision, EvaluationInput,
        NewRequest, ReportRow, RequestRecord, RequestStatus, RequestSummary, join_days,
    },
};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use time::OffsetDateTime;

pub struct RequestRepository;

impl RequestRepository {
    /// Inserts a new record with status Pending. Nothing is persisted when
    /// validation fails.
    pub async fn create_request(pool: &SqlitePool, data: &NewRequest) -> AppResult<i64> {
        data.validate()?;

        let result = sqlx::query(
            "INSERT INTO requests (
                student_name, student_tax_id, student_registration,
                wheelchair_user, medical_code,
                student_postal_code, student_street, student_number, student_municipality,
                school_name,
                school_postal_code, school_street, school_number, school_municipality,
                resource_room, attendance_days, entry_time, exit_time,
                medical_document, medical_document_name,
                travel_document, travel_document_name,
                status
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&data.student_name)
        .bind(&data.student_tax_id)
        .bind(&data.student_registration)
        .bind(data.wheelchair_user)
        .bind(&data.medical_code)
        .bind(&data.student_address.postal_code)
        .bind(&data.student_address.street)
        .bind(&data.student_address.number)
        .bind(&data.student_address.municipality)
        .bind(&data.school_name)
        .bind(&data.school_address.postal_code)
        .bind(&data.school_address.street)
        .bind(&data.school_address.number)
        .bind(&data.school_address.municipality)
        .bind(data.resource_room)
        .bind(join_days(&data.attendance_days))
        .bind(&data.entry_time)
        .bind(&data.exit_time)
        .bind(&data.medical_document.content)
        .bind(&data.medical_document.filename)
        .bind(&data.travel_document.content)
        .bind(&data.travel_document.filename)
        .bind(RequestStatus::Pending.as_str())
        .execute(pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn get_request(pool: &SqlitePool, id: i64) -> AppResult<RequestRecord> {
        sqlx::query_as::<_, RequestRecord>("SELECT * FROM requests WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("request {id}")))
    }

    /// Insertion-ordered listing, optionally filtered by status. The pending
    /// worklist is `list_requests(pool, Some(RequestStatus::Pending))`.
    pub async fn list_requests(
        pool: &SqlitePool,
        status: Option<RequestStatus>,
    ) -> AppResult<Vec<RequestSummary>> {
        let summaries = match status {
            Some(status) => {
                sqlx::query_as::<_, RequestSummary>(
                    "SELECT id, student_name, status FROM requests WHERE status = ? ORDER BY id",
                )
                .bind(status.as_str())
                .fetch_all(pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, RequestSummary>(
                    "SELECT id, student_name, status FROM requests ORDER BY id",
                )
                .fetch_all(pool)
                .await?
            }
        };
        Ok(summaries)
    }

    /// The only lifecycle transition: Pending to Approved or Rejected. The
    /// update is guarded by the current status, so a record that already left
    /// Pending is reported as a validation failure and left untouched.
    pub async fn update_evaluation(
        pool: &SqlitePool,
        id: i64,
        evaluation: &EvaluationInput,
    ) -> AppResult<()> {
        if evaluation.supervisor_name.trim().is_empty() {
            return Err(AppError::Validation("supervisor name is required".to_string()));
        }
        if evaluation.supervisor_tax_id.trim().is_empty() {
            return Err(AppError::Validation(
                "supervisor tax id is required".to_string(),
            ));
        }
        if evaluation.signed_document.filename.trim().is_empty()
            || evaluation.signed_document.content.is_empty()
        {
            return Err(AppError::Validation(
                "a signed document is required to record an evaluation".to_string(),
            ));
        }

        let (status, reason) = match evaluation.decision {
            EvaluationDecision::Approve => (RequestStatus::Approved, APPROVED_SENTINEL),
            EvaluationDecision::Reject => {
                let reason = evaluation.reason.ok_or_else(|| {
                    AppError::Validation("a rejection reason is required".to_string())
                })?;
                (RequestStatus::Rejected, reason.as_str())
            }
        };

        let result = sqlx::query(
            "UPDATE requests
             SET status = ?, supervisor_name = ?, supervisor_tax_id = ?,
                 rejection_reason = ?, signed_document = ?, signed_document_name = ?,
                 last_updated_at = ?
             WHERE id = ? AND status = ?",
        )
        .bind(status.as_str())
        .bind(&evaluation.supervisor_name)
        .bind(&evaluation.supervisor_tax_id)
        .bind(reason)
        .bind(&evaluation.signed_document.content)
        .bind(&evaluation.signed_document.filename)
        .bind(OffsetDateTime::now_utc())
        .bind(id)
        .bind(RequestStatus::Pending.as_str())
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            if Self::exists(pool, id).await? {
                return Err(AppError::Validation(format!(
                    "request {id} has already been evaluated"
                )));
            }
            return Err(AppError::NotFound(format!("request {id}")));
        }

        Ok(())
    }

    /// Administrator escape hatch: overwrites the provided fields without
    /// checking the evaluation invariant. A status overwrite is audited.
    pub async fn update_administrative(
        pool: &SqlitePool,
        id: i64,
        patch: &AdministrativePatch,
    ) -> AppResult<()> {
        if patch.is_empty() {
            return Err(AppError::Validation(
                "at least one field must be provided".to_string(),
            ));
        }

        let mut query: QueryBuilder<'_, Sqlite> = QueryBuilder::new("UPDATE requests SET ");
        if let Some(student_name) = &patch.student_name {
            query.push("student_name = ").push_bind(student_name).push(", ");
        }
        if let Some(status) = patch.status {
            query.push("status = ").push_bind(status.as_str()).push(", ");
        }
        if let Some(school_name) = &patch.school_name {
            query.push("school_name = ").push_bind(school_name).push(", ");
        }
        if let Some(carrier_company) = &patch.carrier_company {
            query
                .push("carrier_company = ")
                .push_bind(carrier_company)
                .push(", ");
        }
        query
            .push("last_updated_at = ")
            .push_bind(OffsetDateTime::now_utc())
            .push(" WHERE id = ")
            .push_bind(id);

        let result = query.build().execute(pool).await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("request {id}")));
        }

        if let Some(status) = patch.status {
            tracing::warn!(
                request_id = id,
                status = %status,
                "administrative status override applied outside the evaluation lifecycle"
            );
        }

        Ok(())
    }

    pub async fn delete_request(pool: &SqlitePool, id: i64) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM requests WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("request {id}")));
        }
        Ok(())
    }

    /// Full-table projection for the audit/reporting CSV.
    pub async fn report_rows(pool: &SqlitePool) -> AppResult<Vec<ReportRow>> {
        let rows = sqlx::query_as::<_, ReportRow>(
            "SELECT id, student_name, student_tax_id, student_registration,
                    school_name, status, supervisor_name, rejection_reason
             FROM requests ORDER BY id",
        )
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    /// Fetches one stored file for download: `(filename, content)`.
    pub async fn get_document(
        pool: &SqlitePool,
        id: i64,
        kind: DocumentKind,
    ) -> AppResult<(String, Vec<u8>)> {
        let record = Self::get_request(pool, id).await?;

        match kind {
            DocumentKind::Medical => Ok((record.medical_document_name, record.medical_document)),
            DocumentKind::Travel => Ok((record.travel_document_name, record.travel_document)),
            DocumentKind::Signed => {
                let content = record.signed_document.ok_or_else(|| {
                    AppError::NotFound(format!("request {id} has no signed document"))
                })?;
                let filename = record
                    .signed_document_name
                    .unwrap_or_else(|| "signed-document.pdf".to_string());
                Ok((filename, content))
            }
        }
    }

    async fn exists(pool: &SqlitePool, id: i64) -> AppResult<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM requests WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(found.is_some())
    }
}
