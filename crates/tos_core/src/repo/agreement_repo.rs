//! User agreement repository contract and SQLite implementation.
//!
//! # Invariants
//! - Writes call `UserAgreement::validate()` before touching SQL.
//! - An agreement can only reference an existing terms version.
//! - Duplicate (user, version) agreements are stored as separate rows.

use crate::model::agreement::{UserAgreement, UserAgreementId};
use crate::model::terms::TermsOfServiceId;
use crate::model::user::UserId;
use crate::repo::terms_repo::{RepoError, RepoResult};
use crate::repo::{ensure_connection_ready, parse_uuid, NOW_MS_SQL};
use log::info;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};

const AGREEMENT_SELECT_SQL: &str = "SELECT
    id,
    terms_of_service_id,
    user_id,
    created_at,
    modified_at
FROM user_agreements";

/// Repository interface for user agreements.
pub trait UserAgreementRepository {
    /// Stores a new agreement and returns it with store-assigned timestamps.
    fn create_agreement(&self, agreement: &UserAgreement) -> RepoResult<UserAgreement>;
    fn get_agreement(&self, id: UserAgreementId) -> RepoResult<Option<UserAgreement>>;
    /// Agreements of one user, newest first.
    fn list_agreements_for_user(&self, user_id: &UserId) -> RepoResult<Vec<UserAgreement>>;
    /// Agreements recorded against one terms version, newest first.
    fn list_agreements_for_terms(
        &self,
        terms_id: TermsOfServiceId,
    ) -> RepoResult<Vec<UserAgreement>>;
    /// Returns whether `user_id` agreed to `terms_id` at least once.
    fn has_agreement(&self, user_id: &UserId, terms_id: TermsOfServiceId) -> RepoResult<bool>;
}

/// SQLite-backed agreement repository.
pub struct SqliteUserAgreementRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserAgreementRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl UserAgreementRepository for SqliteUserAgreementRepository<'_> {
    fn create_agreement(&self, agreement: &UserAgreement) -> RepoResult<UserAgreement> {
        agreement.validate()?;

        let id_text = agreement.id.to_string();
        let terms_text = agreement.terms_of_service.to_string();
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        if !terms_exist_in_tx(&tx, terms_text.as_str())? {
            return Err(RepoError::TermsNotFound(agreement.terms_of_service));
        }

        tx.execute(
            &format!(
                "INSERT INTO user_agreements (
                    id,
                    terms_of_service_id,
                    user_id,
                    created_at,
                    modified_at
                ) VALUES (?1, ?2, ?3, {NOW_MS_SQL}, {NOW_MS_SQL});"
            ),
            params![
                id_text.as_str(),
                terms_text.as_str(),
                agreement.user_id.as_str()
            ],
        )?;

        let stored = tx.query_row(
            &format!("{AGREEMENT_SELECT_SQL} WHERE id = ?1;"),
            [id_text.as_str()],
            |row| Ok(parse_agreement_row(row)),
        )??;
        tx.commit()?;

        info!(
            "event=agreement_create module=repo status=ok agreement_id={} terms_id={}",
            stored.id, stored.terms_of_service
        );
        Ok(stored)
    }

    fn get_agreement(&self, id: UserAgreementId) -> RepoResult<Option<UserAgreement>> {
        self.conn
            .query_row(
                &format!("{AGREEMENT_SELECT_SQL} WHERE id = ?1;"),
                [id.to_string()],
                |row| Ok(parse_agreement_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn list_agreements_for_user(&self, user_id: &UserId) -> RepoResult<Vec<UserAgreement>> {
        list_agreements_where(self.conn, "user_id", user_id.as_str())
    }

    fn list_agreements_for_terms(
        &self,
        terms_id: TermsOfServiceId,
    ) -> RepoResult<Vec<UserAgreement>> {
        list_agreements_where(
            self.conn,
            "terms_of_service_id",
            terms_id.to_string().as_str(),
        )
    }

    fn has_agreement(&self, user_id: &UserId, terms_id: TermsOfServiceId) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM user_agreements
                WHERE user_id = ?1
                  AND terms_of_service_id = ?2
            );",
            params![user_id.as_str(), terms_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }
}

/// `column` is always one of this module's literals, never caller input.
fn list_agreements_where(
    conn: &Connection,
    column: &'static str,
    value: &str,
) -> RepoResult<Vec<UserAgreement>> {
    let mut stmt = conn.prepare(&format!(
        "{AGREEMENT_SELECT_SQL}
         WHERE {column} = ?1
         ORDER BY created_at DESC, rowid DESC;"
    ))?;
    let mut rows = stmt.query([value])?;
    let mut agreements = Vec::new();
    while let Some(row) = rows.next()? {
        agreements.push(parse_agreement_row(row)?);
    }
    Ok(agreements)
}

fn terms_exist_in_tx(tx: &Transaction<'_>, terms_id: &str) -> RepoResult<bool> {
    let exists: i64 = tx.query_row(
        "SELECT EXISTS(SELECT 1 FROM terms_of_service WHERE id = ?1);",
        [terms_id],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn parse_agreement_row(row: &Row<'_>) -> RepoResult<UserAgreement> {
    let id_text: String = row.get("id")?;
    let terms_text: String = row.get("terms_of_service_id")?;
    let user_id: String = row.get("user_id")?;
    Ok(UserAgreement {
        id: parse_uuid(&id_text, "user_agreements.id")?,
        terms_of_service: parse_uuid(&terms_text, "user_agreements.terms_of_service_id")?,
        user_id: UserId::new(user_id),
        created_at: Some(row.get("created_at")?),
        modified_at: Some(row.get("modified_at")?),
    })
}
