use crate::error::{AppError, AppResult};
use crate::models::request::ReportRow;

const HEADERS: [&str; 8] = [
    "id",
    "student_name",
    "student_tax_id",
    "student_registration",
    "school_name",
    "status",
    "supervisor_name",
    "rejection_reason",
];

/// Renders the report projection as comma-separated UTF-8 with a header row.
/// The header is always written, even for an empty table.
pub fn write_report_csv(rows: &[ReportRow]) -> AppResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer
        .write_record(HEADERS)
        .map_err(|e| AppError::Other(format!("csv write error: {e}")))?;

    for row in rows {
        writer
            .write_record([
                row.id.to_string().as_str(),
                &row.student_name,
                &row.student_tax_id,
                &row.student_registration,
                &row.school_name,
                &row.status,
                row.supervisor_name.as_deref().unwrap_or(""),
                row.rejection_reason.as_deref().unwrap_or(""),
            ])
            .map_err(|e| AppError::Other(format!("csv write error: {e}")))?;
    }

    writer
        .into_inner()
        .map_err(|e| AppError::Other(format!("csv buffer error: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: i64, name: &str, status: &str) -> ReportRow {
        ReportRow {
            id,
            student_name: name.to_string(),
            student_tax_id: "111".to_string(),
            student_registration: "RA1".to_string(),
            school_name: "Springfield Elementary".to_string(),
            status: status.to_string(),
            supervisor_name: None,
            rejection_reason: None,
        }
    }

    #[test]
    fn empty_report_still_carries_the_header() {
        let bytes = write_report_csv(&[]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(
            text.trim_end(),
            "id,student_name,student_tax_id,student_registration,school_name,status,supervisor_name,rejection_reason"
        );
    }

    #[test]
    fn rows_are_projected_in_order() {
        let rows = vec![row(1, "Ana Silva", "Pending"), row(2, "José Souza", "Approved")];
        let text = String::from_utf8(write_report_csv(&rows).unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("1,Ana Silva,111,RA1"));
        // non-ASCII survives as UTF-8
        assert!(lines[2].contains("José Souza"));
    }

    #[test]
    fn missing_optionals_are_blank_fields() {
        let text = String::from_utf8(write_report_csv(&[row(1, "Ana", "Pending")]).unwrap()).unwrap();
        assert!(text.lines().nth(1).unwrap().ends_with("Pending,,"));
    }
}
