use rusqlite::Connection;
use tos_core::db::open_db_in_memory;
use tos_core::{
    has_user_agreed_latest_tos, AgreementValidationError, NoActiveTermsOfService, RepoError,
    SqliteTermsOfServiceRepository, SqliteUserAgreementRepository, TermsOfService,
    TermsOfServiceRepository, TermsService, User, UserAgreement, UserAgreementRepository, UserId,
};
use uuid::Uuid;

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

fn service(
    conn: &Connection,
) -> TermsService<SqliteTermsOfServiceRepository<'_>, SqliteUserAgreementRepository<'_>> {
    TermsService::new(
        SqliteTermsOfServiceRepository::try_new(conn).unwrap(),
        SqliteUserAgreementRepository::try_new(conn).unwrap(),
    )
}

#[test]
fn agreement_to_stale_version_does_not_count_until_latest_is_accepted() {
    let conn = setup();
    let terms = SqliteTermsOfServiceRepository::try_new(&conn).unwrap();
    let agreements = SqliteUserAgreementRepository::try_new(&conn).unwrap();
    let user = User::new("u-1", "alice");

    let a = terms.save_terms(&TermsOfService::new("A", true)).unwrap();
    let b = terms.save_terms(&TermsOfService::new("B", true)).unwrap();
    assert!(!terms.get_terms(a.id).unwrap().unwrap().active);
    assert!(terms.get_terms(b.id).unwrap().unwrap().active);

    agreements
        .create_agreement(&UserAgreement::new("u-1", a.id))
        .unwrap();
    assert!(!has_user_agreed_latest_tos(&terms, &agreements, &user).unwrap());

    agreements
        .create_agreement(&UserAgreement::new("u-1", b.id))
        .unwrap();
    assert!(has_user_agreed_latest_tos(&terms, &agreements, &user).unwrap());
}

#[test]
fn agreement_of_another_user_does_not_count() {
    let conn = setup();
    let terms = SqliteTermsOfServiceRepository::try_new(&conn).unwrap();
    let agreements = SqliteUserAgreementRepository::try_new(&conn).unwrap();

    let current = terms.save_terms(&TermsOfService::new("A", true)).unwrap();
    agreements
        .create_agreement(&UserAgreement::new("bob-id", current.id))
        .unwrap();

    let alice = User::new("alice-id", "alice");
    assert!(!has_user_agreed_latest_tos(&terms, &agreements, &alice).unwrap());
}

#[test]
fn agreement_check_propagates_no_active_terms() {
    let conn = setup();
    let terms = SqliteTermsOfServiceRepository::try_new(&conn).unwrap();
    let agreements = SqliteUserAgreementRepository::try_new(&conn).unwrap();

    let err = has_user_agreed_latest_tos(&terms, &agreements, &User::new("u-1", "alice"))
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::NoActiveTermsOfService(NoActiveTermsOfService::Lookup)
    ));
}

#[test]
fn create_agreement_assigns_timestamps_and_allows_duplicates() {
    let conn = setup();
    let terms = SqliteTermsOfServiceRepository::try_new(&conn).unwrap();
    let agreements = SqliteUserAgreementRepository::try_new(&conn).unwrap();
    let current = terms.save_terms(&TermsOfService::new("A", true)).unwrap();

    let first = agreements
        .create_agreement(&UserAgreement::new("u-1", current.id))
        .unwrap();
    let second = agreements
        .create_agreement(&UserAgreement::new("u-1", current.id))
        .unwrap();

    assert_ne!(first.id, second.id);
    assert!(first.created_at.is_some());
    assert_eq!(first.created_at, first.modified_at);

    let listed = agreements
        .list_agreements_for_user(&UserId::new("u-1"))
        .unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, second.id);
    assert_eq!(agreements.get_agreement(first.id).unwrap(), Some(first));
}

#[test]
fn create_agreement_for_unknown_terms_returns_not_found() {
    let conn = setup();
    let agreements = SqliteUserAgreementRepository::try_new(&conn).unwrap();
    let missing = Uuid::new_v4();

    let err = agreements
        .create_agreement(&UserAgreement::new("u-1", missing))
        .unwrap_err();
    assert!(matches!(err, RepoError::TermsNotFound(id) if id == missing));
}

#[test]
fn create_agreement_rejects_blank_user_id() {
    let conn = setup();
    let terms = SqliteTermsOfServiceRepository::try_new(&conn).unwrap();
    let agreements = SqliteUserAgreementRepository::try_new(&conn).unwrap();
    let current = terms.save_terms(&TermsOfService::new("A", true)).unwrap();

    let err = agreements
        .create_agreement(&UserAgreement::new("  ", current.id))
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(AgreementValidationError::BlankUserId)
    ));
    assert!(agreements
        .list_agreements_for_user(&UserId::new("  "))
        .unwrap()
        .is_empty());
}

#[test]
fn service_accepts_current_terms_and_tracks_new_versions() {
    let conn = setup();
    let service = service(&conn);
    let user = User::new("u-7", "carol");

    let v1 = service.publish_terms("version one").unwrap();
    let agreement = service.accept_current_terms(&user).unwrap();
    assert_eq!(agreement.terms_of_service, v1.id);
    assert!(service.has_user_agreed_latest_tos(&user).unwrap());

    service.publish_terms("version two").unwrap();
    assert!(!service.has_user_agreed_latest_tos(&user).unwrap());

    service.accept_current_terms(&user).unwrap();
    assert!(service.has_user_agreed_latest_tos(&user).unwrap());
}

#[test]
fn service_accept_without_active_terms_fails() {
    let conn = setup();
    let service = service(&conn);

    let err = service
        .accept_current_terms(&User::new("u-1", "alice"))
        .unwrap_err();
    assert!(err.is_no_active_terms());
}

#[test]
fn describe_agreement_uses_username_and_terms_display() {
    let conn = setup();
    let service = service(&conn);
    let user = User::new("u-1", "alice");

    let current = service.publish_terms("v1").unwrap();
    let agreement = service.accept_current_terms(&user).unwrap();

    let line = service.describe_agreement(&agreement, &user).unwrap();
    assert_eq!(
        line,
        format!("alice agreed to TOS: {}: active", current.created_at.unwrap())
    );
}

#[test]
fn agreement_serializes_user_id_as_plain_string() {
    let agreement = UserAgreement::new("u-42", Uuid::nil());
    let value = serde_json::to_value(&agreement).unwrap();

    assert_eq!(value["user_id"], "u-42");
    assert_eq!(
        value["terms_of_service"],
        "00000000-0000-0000-0000-000000000000"
    );
    assert!(value["created_at"].is_null());
}

#[test]
fn list_agreements_for_terms_returns_only_that_version() {
    let conn = setup();
    let terms = SqliteTermsOfServiceRepository::try_new(&conn).unwrap();
    let agreements = SqliteUserAgreementRepository::try_new(&conn).unwrap();

    let a = terms.save_terms(&TermsOfService::new("A", true)).unwrap();
    let b = terms.save_terms(&TermsOfService::new("B", true)).unwrap();
    let on_a = agreements
        .create_agreement(&UserAgreement::new("u-1", a.id))
        .unwrap();
    let first_on_b = agreements
        .create_agreement(&UserAgreement::new("u-1", b.id))
        .unwrap();
    let second_on_b = agreements
        .create_agreement(&UserAgreement::new("u-2", b.id))
        .unwrap();

    let for_b: Vec<Uuid> = agreements
        .list_agreements_for_terms(b.id)
        .unwrap()
        .into_iter()
        .map(|agreement| agreement.id)
        .collect();
    assert_eq!(for_b, vec![second_on_b.id, first_on_b.id]);

    let for_a = agreements.list_agreements_for_terms(a.id).unwrap();
    assert_eq!(for_a, vec![on_a]);
    assert!(agreements
        .list_agreements_for_terms(Uuid::new_v4())
        .unwrap()
        .is_empty());
}

#[test]
fn describe_agreement_falls_back_to_terms_id_when_version_is_unknown() {
    let conn = setup();
    let service = service(&conn);
    let user = User::new("u-1", "alice");
    let orphan = UserAgreement::new("u-1", Uuid::nil());

    let line = service.describe_agreement(&orphan, &user).unwrap();
    assert_eq!(
        line,
        "alice agreed to TOS: 00000000-0000-0000-0000-000000000000"
    );
}
