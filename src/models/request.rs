use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use sqlx::{Row, sqlite::SqliteRow};
use std::fmt;
use std::str::FromStr;
use time::{OffsetDateTime, Time, format_description::BorrowedFormatItem, macros::format_description};
use utoipa::ToSchema;

/// Times of day are carried as `HH:MM` strings and validated at submission.
const TIME_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[hour]:[minute]");

/// Reason stored on an approved record instead of a rejection reason.
pub const APPROVED_SENTINEL: &str = "approved, no restrictions";

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, ToSchema)]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Approved" => Ok(Self::Approved),
            "Rejected" => Ok(Self::Rejected),
            other => Err(format!("unknown request status: {other}")),
        }
    }
}

/// The closed set of reasons a supervisor may give for rejecting a request.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, ToSchema)]
pub enum RejectionReason {
    #[serde(rename = "missing documentation")]
    MissingDocumentation,
    #[serde(rename = "not eligible for transport")]
    NotEligible,
    #[serde(rename = "needs re-evaluation of transport necessity")]
    NeedsReevaluation,
}

impl RejectionReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MissingDocumentation => "missing documentation",
            Self::NotEligible => "not eligible for transport",
            Self::NeedsReevaluation => "needs re-evaluation of transport necessity",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationDecision {
    Approve,
    Reject,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
}

impl Weekday {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Monday => "monday",
            Self::Tuesday => "tuesday",
            Self::Wednesday => "wednesday",
            Self::Thursday => "thursday",
            Self::Friday => "friday",
        }
    }
}

impl FromStr for Weekday {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "monday" => Ok(Self::Monday),
            "tuesday" => Ok(Self::Tuesday),
            "wednesday" => Ok(Self::Wednesday),
            "thursday" => Ok(Self::Thursday),
            "friday" => Ok(Self::Friday),
            other => Err(format!("unknown weekday: {other}")),
        }
    }
}

pub fn parse_days(raw: &str) -> Result<Vec<Weekday>, String> {
    raw.split(',')
        .filter(|part| !part.trim().is_empty())
        .map(Weekday::from_str)
        .collect()
}

pub fn join_days(days: &[Weekday]) -> String {
    days.iter()
        .map(|day| day.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, ToSchema)]
pub struct Address {
    #[schema(example = "01001-000")]
    pub postal_code: Option<String>,

    #[schema(example = "Main Street")]
    pub street: Option<String>,

    #[schema(example = "10")]
    pub number: String,

    #[schema(example = "Springfield")]
    pub municipality: String,
}

/// An uploaded file, buffered fully in memory. Content travels as base64
/// over the wire and is stored as a raw BLOB.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, ToSchema)]
pub struct DocumentUpload {
    #[schema(example = "medical-record.pdf")]
    pub filename: String,

    #[serde(with = "base64_bytes")]
    #[schema(value_type = String, format = Byte)]
    pub content: Vec<u8>,
}

pub mod base64_bytes {
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Deserialize, Clone, ToSchema)]
pub struct NewRequest {
    pub student_name: String,
    pub student_tax_id: String,
    pub student_registration: String,

    #[serde(default)]
    pub wheelchair_user: bool,
    pub medical_code: Option<String>,

    pub student_address: Address,

    pub school_name: String,
    pub school_address: Address,

    #[serde(default)]
    pub resource_room: bool,
    #[serde(default)]
    pub attendance_days: Vec<Weekday>,

    #[schema(example = "07:00")]
    pub entry_time: String,
    #[schema(example = "12:00")]
    pub exit_time: String,

    pub medical_document: DocumentUpload,
    pub travel_document: DocumentUpload,
}

impl NewRequest {
    /// Checks every field the store requires at submission. The first missing
    /// field is reported by name so the caller can surface it.
    pub fn validate(&self) -> AppResult<()> {
        require_text(&self.student_name, "student name")?;
        require_text(&self.student_tax_id, "student tax id")?;
        require_text(&self.student_registration, "student registration")?;
        require_text(&self.student_address.number, "student address number")?;
        require_text(&self.student_address.municipality, "student address municipality")?;
        require_text(&self.school_name, "school name")?;
        require_text(&self.school_address.number, "school address number")?;
        require_text(&self.school_address.municipality, "school address municipality")?;
        require_time(&self.entry_time, "entry time")?;
        require_time(&self.exit_time, "exit time")?;
        require_document(&self.medical_document, "medical document")?;
        require_document(&self.travel_document, "travel document")?;
        Ok(())
    }
}

fn require_text(value: &str, field: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    Ok(())
}

fn require_time(value: &str, field: &str) -> AppResult<()> {
    require_text(value, field)?;
    Time::parse(value, TIME_FORMAT)
        .map_err(|_| AppError::Validation(format!("{field} must be a valid HH:MM time")))?;
    Ok(())
}

fn require_document(document: &DocumentUpload, field: &str) -> AppResult<()> {
    if document.filename.trim().is_empty() || document.content.is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    Ok(())
}

/// A supervisor's terminal decision on a pending request.
#[derive(Debug, Deserialize, Clone, ToSchema)]
pub struct EvaluationInput {
    pub decision: EvaluationDecision,
    pub reason: Option<RejectionReason>,
    pub supervisor_name: String,
    pub supervisor_tax_id: String,
    pub signed_document: DocumentUpload,
}

/// Administrator-only field overwrite. Bypasses the evaluation invariant.
#[derive(Debug, Deserialize, Clone, Default, ToSchema)]
pub struct AdministrativePatch {
    pub student_name: Option<String>,
    pub status: Option<RequestStatus>,
    pub school_name: Option<String>,
    pub carrier_company: Option<String>,
}

impl AdministrativePatch {
    pub fn is_empty(&self) -> bool {
        self.student_name.is_none()
            && self.status.is_none()
            && self.school_name.is_none()
            && self.carrier_company.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct RequestRecord {
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
    pub medical_document: Vec<u8>,
    pub medical_document_name: String,
    pub travel_document: Vec<u8>,
    pub travel_document_name: String,
    pub status: RequestStatus,
    pub supervisor_name: Option<String>,
    pub supervisor_tax_id: Option<String>,
    pub rejection_reason: Option<String>,
    pub signed_document: Option<Vec<u8>>,
    pub signed_document_name: Option<String>,
    pub last_updated_at: Option<OffsetDateTime>,
    pub carrier_company: Option<String>,
}

impl sqlx::FromRow<'_, SqliteRow> for RequestRecord {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let status: String = row.try_get("status")?;
        let status = status.parse().map_err(|e: String| sqlx::Error::ColumnDecode {
            index: "status".to_string(),
            source: e.into(),
        })?;

        let days: String = row.try_get("attendance_days")?;
        let attendance_days = parse_days(&days).map_err(|e| sqlx::Error::ColumnDecode {
            index: "attendance_days".to_string(),
            source: e.into(),
        })?;

        Ok(Self {
            id: row.try_get("id")?,
            student_name: row.try_get("student_name")?,
            student_tax_id: row.try_get("student_tax_id")?,
            student_registration: row.try_get("student_registration")?,
            wheelchair_user: row.try_get("wheelchair_user")?,
            medical_code: row.try_get("medical_code")?,
            student_address: Address {
                postal_code: row.try_get("student_postal_code")?,
                street: row.try_get("student_street")?,
                number: row.try_get("student_number")?,
                municipality: row.try_get("student_municipality")?,
            },
            school_name: row.try_get("school_name")?,
            school_address: Address {
                postal_code: row.try_get("school_postal_code")?,
                street: row.try_get("school_street")?,
                number: row.try_get("school_number")?,
                municipality: row.try_get("school_municipality")?,
            },
            resource_room: row.try_get("resource_room")?,
            attendance_days,
            entry_time: row.try_get("entry_time")?,
            exit_time: row.try_get("exit_time")?,
            medical_document: row.try_get("medical_document")?,
            medical_document_name: row.try_get("medical_document_name")?,
            travel_document: row.try_get("travel_document")?,
            travel_document_name: row.try_get("travel_document_name")?,
            status,
            supervisor_name: row.try_get("supervisor_name")?,
            supervisor_tax_id: row.try_get("supervisor_tax_id")?,
            rejection_reason: row.try_get("rejection_reason")?,
            signed_document: row.try_get("signed_document")?,
            signed_document_name: row.try_get("signed_document_name")?,
            last_updated_at: row.try_get("last_updated_at")?,
            carrier_company: row.try_get("carrier_company")?,
        })
    }
}

/// Worklist entry: enough to pick a record for review.
#[derive(Debug, Serialize, Clone, ToSchema)]
pub struct RequestSummary {
    pub id: i64,
    pub student_name: String,
    pub status: RequestStatus,
}

impl sqlx::FromRow<'_, SqliteRow> for RequestSummary {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let status: String = row.try_get("status")?;
        let status = status.parse().map_err(|e: String| sqlx::Error::ColumnDecode {
            index: "status".to_string(),
            source: e.into(),
        })?;

        Ok(Self {
            id: row.try_get("id")?,
            student_name: row.try_get("student_name")?,
            status,
        })
    }
}

/// Flat projection used by the audit/reporting export.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct ReportRow {
    pub id: i64,
    pub student_name: String,
    pub student_tax_id: String,
    pub student_registration: String,
    pub school_name: String,
    pub status: String,
    pub supervisor_name: Option<String>,
    pub rejection_reason: Option<String>,
}

/// Which stored file a download request targets.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Medical,
    Travel,
    Signed,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(name: &str) -> DocumentUpload {
        DocumentUpload {
            filename: name.to_string(),
            content: b"content".to_vec(),
        }
    }

    fn valid_request() -> NewRequest {
        NewRequest {
            student_name: "Ana Silva".to_string(),
            student_tax_id: "111".to_string(),
            student_registration: "RA1".to_string(),
            wheelchair_user: false,
            medical_code: None,
            student_address: Address {
                postal_code: None,
                street: None,
                number: "10".to_string(),
                municipality: "Springfield".to_string(),
            },
            school_name: "Springfield Elementary".to_string(),
            school_address: Address {
                postal_code: None,
                street: None,
                number: "1".to_string(),
                municipality: "Springfield".to_string(),
            },
            resource_room: false,
            attendance_days: vec![Weekday::Monday, Weekday::Friday],
            entry_time: "07:00".to_string(),
            exit_time: "12:00".to_string(),
            medical_document: document("medical.pdf"),
            travel_document: document("travel.pdf"),
        }
    }

    #[test]
    fn valid_request_passes_validation() {
        assert!(valid_request().validate().is_ok());
    }

    #[test]
    fn blank_name_is_rejected() {
        let mut request = valid_request();
        request.student_name = "   ".to_string();
        let err = request.validate().unwrap_err().to_string();
        assert!(err.contains("student name"));
    }

    #[test]
    fn malformed_time_is_rejected() {
        let mut request = valid_request();
        request.entry_time = "7am".to_string();
        assert!(request.validate().is_err());
    }

    #[test]
    fn empty_document_content_is_rejected() {
        let mut request = valid_request();
        request.medical_document.content.clear();
        assert!(request.validate().is_err());
    }

    #[test]
    fn rejection_reasons_serialize_to_fixed_strings() {
        let json = serde_json::to_string(&RejectionReason::MissingDocumentation).unwrap();
        assert_eq!(json, "\"missing documentation\"");
        let parsed: RejectionReason =
            serde_json::from_str("\"not eligible for transport\"").unwrap();
        assert_eq!(parsed, RejectionReason::NotEligible);
    }

    #[test]
    fn attendance_days_round_trip() {
        let days = vec![Weekday::Monday, Weekday::Wednesday];
        assert_eq!(parse_days(&join_days(&days)).unwrap(), days);
        assert_eq!(parse_days("").unwrap(), vec![]);
    }

    #[test]
    fn document_content_round_trips_through_base64() {
        let original = DocumentUpload {
            filename: "file.pdf".to_string(),
            content: vec![0, 1, 2, 255],
        };
        let json = serde_json::to_string(&original).unwrap();
        let decoded: DocumentUpload = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, original);
    }
}
