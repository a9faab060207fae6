use school_transport_backend::{
    auth::{authenticate, utils::hash_password},
    db::{init_pool_default, run_migrations},
    error::AppError,
    export::write_report_csv,
    models::{
        request::{
            APPROVED_SENTINEL, AdministrativePatch, Address, DocumentKind, DocumentUpload,
            EvaluationDecision, EvaluationInput, NewRequest, RejectionReason, RequestStatus,
            Weekday,
        },
        user::Role,
    },
    repositories::{
        account_repository::AccountRepository, request_repository::RequestRepository,
    },
};
use sqlx::SqlitePool;

async fn setup() -> SqlitePool {
    let pool = init_pool_default("sqlite::memory:").await.unwrap();
    run_migrations(&pool).await.unwrap();
    pool
}

fn document(name: &str, content: &[u8]) -> DocumentUpload {
    DocumentUpload {
        filename: name.to_string(),
        content: content.to_vec(),
    }
}

fn ana_silva() -> NewRequest {
    NewRequest {
        student_name: "Ana Silva".to_string(),
        student_tax_id: "111".to_string(),
        student_registration: "RA1".to_string(),
        wheelchair_user: false,
        medical_code: Some("F84.0".to_string()),
        student_address: Address {
            postal_code: Some("01001-000".to_string()),
            street: Some("Main Street".to_string()),
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
        resource_room: true,
        attendance_days: vec![Weekday::Monday, Weekday::Wednesday, Weekday::Friday],
        entry_time: "07:00".to_string(),
        exit_time: "12:00".to_string(),
        medical_document: document("medical.pdf", b"MEDICAL-BYTES\x00\x01"),
        travel_document: document("travel.pdf", b"TRAVEL-BYTES\xff"),
    }
}

fn evaluation(decision: EvaluationDecision, reason: Option<RejectionReason>) -> EvaluationInput {
    EvaluationInput {
        decision,
        reason,
        supervisor_name: "Bob".to_string(),
        supervisor_tax_id: "222".to_string(),
        signed_document: document("signed.pdf", b"SIGNED"),
    }
}

async fn request_count(pool: &SqlitePool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM requests")
        .fetch_one(pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn submit_and_fetch_round_trip() {
    let pool = setup().await;

    let id = RequestRepository::create_request(&pool, &ana_silva())
        .await
        .unwrap();
    assert_eq!(id, 1);

    let record = RequestRepository::get_request(&pool, id).await.unwrap();
    assert_eq!(record.status, RequestStatus::Pending);
    assert_eq!(record.student_name, "Ana Silva");
    assert_eq!(record.student_tax_id, "111");
    assert_eq!(record.student_registration, "RA1");
    assert_eq!(record.student_address.number, "10");
    assert_eq!(record.student_address.municipality, "Springfield");
    assert_eq!(record.entry_time, "07:00");
    assert_eq!(record.exit_time, "12:00");
    assert_eq!(
        record.attendance_days,
        vec![Weekday::Monday, Weekday::Wednesday, Weekday::Friday]
    );
    // document content must survive byte-for-byte
    assert_eq!(record.medical_document, b"MEDICAL-BYTES\x00\x01");
    assert_eq!(record.travel_document, b"TRAVEL-BYTES\xff");
    assert_eq!(record.medical_document_name, "medical.pdf");
    assert!(record.supervisor_name.is_none());
    assert!(record.signed_document.is_none());
    assert!(record.last_updated_at.is_none());
    assert!(record.carrier_company.is_none());
}

#[tokio::test]
async fn each_missing_required_field_persists_nothing() {
    let pool = setup().await;

    let mutations: Vec<Box<dyn Fn(&mut NewRequest)>> = vec![
        Box::new(|r| r.student_name.clear()),
        Box::new(|r| r.student_tax_id = "  ".to_string()),
        Box::new(|r| r.student_registration.clear()),
        Box::new(|r| r.student_address.number.clear()),
        Box::new(|r| r.student_address.municipality.clear()),
        Box::new(|r| r.school_name.clear()),
        Box::new(|r| r.school_address.number.clear()),
        Box::new(|r| r.school_address.municipality.clear()),
        Box::new(|r| r.entry_time.clear()),
        Box::new(|r| r.entry_time = "7am".to_string()),
        Box::new(|r| r.exit_time = "25:00".to_string()),
        Box::new(|r| r.medical_document.content.clear()),
        Box::new(|r| r.travel_document.filename.clear()),
    ];

    for mutate in mutations {
        let mut request = ana_silva();
        mutate(&mut request);

        let err = RequestRepository::create_request(&pool, &request)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)), "got: {err}");
    }

    assert_eq!(request_count(&pool).await, 0);
}

#[tokio::test]
async fn rejection_records_the_chosen_reason() {
    let pool = setup().await;
    let id = RequestRepository::create_request(&pool, &ana_silva())
        .await
        .unwrap();

    RequestRepository::update_evaluation(
        &pool,
        id,
        &evaluation(
            EvaluationDecision::Reject,
            Some(RejectionReason::MissingDocumentation),
        ),
    )
    .await
    .unwrap();

    let record = RequestRepository::get_request(&pool, id).await.unwrap();
    assert_eq!(record.status, RequestStatus::Rejected);
    assert_eq!(
        record.rejection_reason.as_deref(),
        Some("missing documentation")
    );
    assert_eq!(record.supervisor_name.as_deref(), Some("Bob"));
    assert_eq!(record.supervisor_tax_id.as_deref(), Some("222"));
    assert_eq!(record.signed_document.as_deref(), Some(b"SIGNED".as_ref()));
    assert!(record.last_updated_at.is_some());
}

#[tokio::test]
async fn approval_stores_the_sentinel_reason() {
    let pool = setup().await;
    let id = RequestRepository::create_request(&pool, &ana_silva())
        .await
        .unwrap();

    RequestRepository::update_evaluation(&pool, id, &evaluation(EvaluationDecision::Approve, None))
        .await
        .unwrap();

    let record = RequestRepository::get_request(&pool, id).await.unwrap();
    assert_eq!(record.status, RequestStatus::Approved);
    assert_eq!(record.rejection_reason.as_deref(), Some(APPROVED_SENTINEL));
}

#[tokio::test]
async fn approval_without_signed_document_changes_nothing() {
    let pool = setup().await;
    let id = RequestRepository::create_request(&pool, &ana_silva())
        .await
        .unwrap();

    let mut input = evaluation(EvaluationDecision::Approve, None);
    input.signed_document.content.clear();

    let err = RequestRepository::update_evaluation(&pool, id, &input)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let record = RequestRepository::get_request(&pool, id).await.unwrap();
    assert_eq!(record.status, RequestStatus::Pending);
    assert!(record.supervisor_name.is_none());
}

#[tokio::test]
async fn evaluation_requires_supervisor_identity_and_reason() {
    let pool = setup().await;
    let id = RequestRepository::create_request(&pool, &ana_silva())
        .await
        .unwrap();

    let mut input = evaluation(EvaluationDecision::Approve, None);
    input.supervisor_name = " ".to_string();
    assert!(matches!(
        RequestRepository::update_evaluation(&pool, id, &input)
            .await
            .unwrap_err(),
        AppError::Validation(_)
    ));

    let mut input = evaluation(EvaluationDecision::Approve, None);
    input.supervisor_tax_id.clear();
    assert!(matches!(
        RequestRepository::update_evaluation(&pool, id, &input)
            .await
            .unwrap_err(),
        AppError::Validation(_)
    ));

    // a rejection with no reason never fires
    let input = evaluation(EvaluationDecision::Reject, None);
    assert!(matches!(
        RequestRepository::update_evaluation(&pool, id, &input)
            .await
            .unwrap_err(),
        AppError::Validation(_)
    ));

    let record = RequestRepository::get_request(&pool, id).await.unwrap();
    assert_eq!(record.status, RequestStatus::Pending);
}

#[tokio::test]
async fn terminal_state_blocks_a_second_evaluation() {
    let pool = setup().await;
    let id = RequestRepository::create_request(&pool, &ana_silva())
        .await
        .unwrap();

    RequestRepository::update_evaluation(&pool, id, &evaluation(EvaluationDecision::Approve, None))
        .await
        .unwrap();

    let err = RequestRepository::update_evaluation(
        &pool,
        id,
        &evaluation(
            EvaluationDecision::Reject,
            Some(RejectionReason::NotEligible),
        ),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    // the record keeps its first outcome
    let record = RequestRepository::get_request(&pool, id).await.unwrap();
    assert_eq!(record.status, RequestStatus::Approved);

    // an unknown id is NotFound, not a validation failure
    let err = RequestRepository::update_evaluation(
        &pool,
        999,
        &evaluation(EvaluationDecision::Approve, None),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn pending_worklist_excludes_evaluated_records() {
    let pool = setup().await;
    let first = RequestRepository::create_request(&pool, &ana_silva())
        .await
        .unwrap();
    let mut second_request = ana_silva();
    second_request.student_name = "Bruno Costa".to_string();
    let second = RequestRepository::create_request(&pool, &second_request)
        .await
        .unwrap();

    RequestRepository::update_evaluation(
        &pool,
        first,
        &evaluation(EvaluationDecision::Approve, None),
    )
    .await
    .unwrap();

    let pending = RequestRepository::list_requests(&pool, Some(RequestStatus::Pending))
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, second);

    let all = RequestRepository::list_requests(&pool, None).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].id, first);
    assert_eq!(all[1].id, second);
}

#[tokio::test]
async fn administrative_override_bypasses_the_evaluation_invariant() {
    let pool = setup().await;
    let id = RequestRepository::create_request(&pool, &ana_silva())
        .await
        .unwrap();

    RequestRepository::update_administrative(
        &pool,
        id,
        &AdministrativePatch {
            status: Some(RequestStatus::Approved),
            carrier_company: Some("Acme Buses".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let record = RequestRepository::get_request(&pool, id).await.unwrap();
    assert_eq!(record.status, RequestStatus::Approved);
    assert_eq!(record.carrier_company.as_deref(), Some("Acme Buses"));
    // the override never fabricates an evaluation
    assert!(record.signed_document.is_none());
    assert!(record.supervisor_name.is_none());
    assert!(record.last_updated_at.is_some());
}

#[tokio::test]
async fn empty_or_misaddressed_patches_fail() {
    let pool = setup().await;
    let id = RequestRepository::create_request(&pool, &ana_silva())
        .await
        .unwrap();

    let err = RequestRepository::update_administrative(&pool, id, &AdministrativePatch::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let err = RequestRepository::update_administrative(
        &pool,
        999,
        &AdministrativePatch {
            student_name: Some("Someone".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn delete_is_hard_and_irreversible() {
    let pool = setup().await;
    let id = RequestRepository::create_request(&pool, &ana_silva())
        .await
        .unwrap();

    RequestRepository::delete_request(&pool, id).await.unwrap();

    assert!(matches!(
        RequestRepository::get_request(&pool, id).await.unwrap_err(),
        AppError::NotFound(_)
    ));
    assert!(matches!(
        RequestRepository::delete_request(&pool, id).await.unwrap_err(),
        AppError::NotFound(_)
    ));
}

#[tokio::test]
async fn stored_documents_are_downloadable() {
    let pool = setup().await;
    let id = RequestRepository::create_request(&pool, &ana_silva())
        .await
        .unwrap();

    let (name, content) = RequestRepository::get_document(&pool, id, DocumentKind::Medical)
        .await
        .unwrap();
    assert_eq!(name, "medical.pdf");
    assert_eq!(content, b"MEDICAL-BYTES\x00\x01");

    // no signed document before evaluation
    assert!(matches!(
        RequestRepository::get_document(&pool, id, DocumentKind::Signed)
            .await
            .unwrap_err(),
        AppError::NotFound(_)
    ));

    RequestRepository::update_evaluation(&pool, id, &evaluation(EvaluationDecision::Approve, None))
        .await
        .unwrap();

    let (name, content) = RequestRepository::get_document(&pool, id, DocumentKind::Signed)
        .await
        .unwrap();
    assert_eq!(name, "signed.pdf");
    assert_eq!(content, b"SIGNED");
}

#[tokio::test]
async fn csv_report_projects_the_audit_columns() {
    let pool = setup().await;
    RequestRepository::create_request(&pool, &ana_silva())
        .await
        .unwrap();
    let second = RequestRepository::create_request(&pool, &ana_silva())
        .await
        .unwrap();
    RequestRepository::update_evaluation(
        &pool,
        second,
        &evaluation(
            EvaluationDecision::Reject,
            Some(RejectionReason::NeedsReevaluation),
        ),
    )
    .await
    .unwrap();

    let rows = RequestRepository::report_rows(&pool).await.unwrap();
    let text = String::from_utf8(write_report_csv(&rows).unwrap()).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines.len(), 3);
    assert_eq!(
        lines[0],
        "id,student_name,student_tax_id,student_registration,school_name,status,supervisor_name,rejection_reason"
    );
    assert!(lines[1].contains("Pending"));
    assert!(lines[2].contains("Rejected"));
    assert!(lines[2].contains("needs re-evaluation of transport necessity"));
}

#[tokio::test]
async fn default_admin_is_seeded_once_and_protected() {
    let pool = setup().await;

    assert!(AccountRepository::ensure_default_admin(&pool, "adm-change-me")
        .await
        .unwrap());
    // second initialization is a no-op
    assert!(!AccountRepository::ensure_default_admin(&pool, "adm-change-me")
        .await
        .unwrap());

    let accounts = AccountRepository::list_accounts(&pool).await.unwrap();
    assert_eq!(accounts.len(), 1);
    assert_eq!(accounts[0].username, "adm");
    assert_eq!(accounts[0].roles, vec![Role::Administrator]);

    let err = AccountRepository::delete_account(&pool, accounts[0].id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert!(AccountRepository::username_exists(&pool, "adm").await.unwrap());
}

#[tokio::test]
async fn duplicate_usernames_conflict() {
    let pool = setup().await;
    let hash = hash_password("password-one").await.unwrap();

    AccountRepository::create_account(&pool, "Jane Doe", "jane", &hash, &[Role::School])
        .await
        .unwrap();

    let err = AccountRepository::create_account(&pool, "Other Jane", "jane", &hash, &[Role::School])
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
async fn account_creation_rejects_empty_fields() {
    let pool = setup().await;
    let hash = hash_password("password-one").await.unwrap();

    assert!(matches!(
        AccountRepository::create_account(&pool, "Jane", "", &hash, &[Role::School])
            .await
            .unwrap_err(),
        AppError::Validation(_)
    ));
    assert!(matches!(
        AccountRepository::create_account(&pool, "Jane", "jane", &hash, &[])
            .await
            .unwrap_err(),
        AppError::Validation(_)
    ));
}

#[tokio::test]
async fn authentication_never_reveals_which_credential_was_wrong() {
    let pool = setup().await;
    let hash = hash_password("right-password").await.unwrap();
    AccountRepository::create_account(&pool, "Jane Doe", "jane", &hash, &[Role::School])
        .await
        .unwrap();

    let unknown_user = authenticate(&pool, "nobody", "whatever").await.unwrap_err();
    let wrong_password = authenticate(&pool, "jane", "wrong").await.unwrap_err();

    assert_eq!(unknown_user.to_string(), wrong_password.to_string());
    assert!(matches!(unknown_user, AppError::Auth(_)));

    let account = authenticate(&pool, "jane", "right-password").await.unwrap();
    assert_eq!(account.username, "jane");
    assert_eq!(account.roles, vec![Role::School]);
}
