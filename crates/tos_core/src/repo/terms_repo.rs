//! Terms-of-service repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist terms versions with the single-active-version rule.
//! - Resolve the currently active version for agreement checks.
//!
//! # Invariants
//! - Saving an active version deactivates every other version in the same
//!   transaction, with one bulk `UPDATE` that bypasses save-time checks.
//! - Saving an inactive version is rejected when no other version is active.
//! - A rejected save writes nothing.

use crate::db::DbError;
use crate::model::agreement::AgreementValidationError;
use crate::model::terms::{TermsOfService, TermsOfServiceId};
use crate::repo::{bool_to_int, ensure_connection_ready, parse_flag, parse_uuid, NOW_MS_SQL};
use log::{info, warn};
use rusqlite::types::Value;
use rusqlite::{
    params, params_from_iter, Connection, OptionalExtension, Row, Transaction,
    TransactionBehavior,
};
use std::error::Error;
use std::fmt::{Display, Formatter};

const TERMS_SELECT_SQL: &str = "SELECT
    id,
    active,
    content,
    created_at,
    modified_at
FROM terms_of_service";

const TERMS_ORDER_SQL: &str = " ORDER BY created_at DESC, rowid DESC";

pub type RepoResult<T> = Result<T, RepoError>;

/// Why an active terms version was required but missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoActiveTermsOfService {
    /// A read needed the current version and none is active.
    Lookup,
    /// A save would have left the store with no active version.
    LastActiveDeactivation,
}

impl NoActiveTermsOfService {
    pub fn message(self) -> &'static str {
        match self {
            Self::Lookup => "Please create an active Terms-of-Service",
            Self::LastActiveDeactivation => "One of the terms of service must be marked active",
        }
    }
}

impl Display for NoActiveTermsOfService {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

impl Error for NoActiveTermsOfService {}

/// Repository error for terms and agreement persistence.
#[derive(Debug)]
pub enum RepoError {
    /// No active terms version where one is required.
    NoActiveTermsOfService(NoActiveTermsOfService),
    /// More than one version is flagged active. Only reachable when the
    /// single-active index has been bypassed.
    MultipleActiveTermsOfService { count: usize },
    Validation(AgreementValidationError),
    Db(DbError),
    /// Referenced terms version does not exist.
    TermsNotFound(TermsOfServiceId),
    /// Connection schema is not at the migrated version this build expects.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    /// Persisted row cannot be mapped back to a model.
    InvalidData(String),
}

impl RepoError {
    /// Returns whether this is the "no active terms of service" condition.
    pub fn is_no_active_terms(&self) -> bool {
        matches!(self, Self::NoActiveTermsOfService(_))
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoActiveTermsOfService(reason) => write!(f, "{reason}"),
            Self::MultipleActiveTermsOfService { count } => {
                write!(f, "expected one active terms of service, found {count}")
            }
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::TermsNotFound(id) => write!(f, "terms of service not found: {id}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "terms store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "terms store requires table `{table}`")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted terms data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::NoActiveTermsOfService(reason) => Some(reason),
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<NoActiveTermsOfService> for RepoError {
    fn from(value: NoActiveTermsOfService) -> Self {
        Self::NoActiveTermsOfService(value)
    }
}

impl From<AgreementValidationError> for RepoError {
    fn from(value: AgreementValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Listing options for terms versions. Results are newest first.
#[derive(Debug, Clone, Default)]
pub struct TermsListQuery {
    pub active_only: bool,
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Repository interface for terms-of-service versions.
pub trait TermsOfServiceRepository {
    /// Inserts or updates one version and returns it as stored.
    fn save_terms(&self, terms: &TermsOfService) -> RepoResult<TermsOfService>;
    /// Returns the single active version.
    fn get_current_tos(&self) -> RepoResult<TermsOfService>;
    fn get_terms(&self, id: TermsOfServiceId) -> RepoResult<Option<TermsOfService>>;
    fn list_terms(&self, query: &TermsListQuery) -> RepoResult<Vec<TermsOfService>>;
    /// Most recently created version, active or not.
    fn latest_terms(&self) -> RepoResult<Option<TermsOfService>>;
}

/// SQLite-backed terms repository.
pub struct SqliteTermsOfServiceRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTermsOfServiceRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl TermsOfServiceRepository for SqliteTermsOfServiceRepository<'_> {
    fn save_terms(&self, terms: &TermsOfService) -> RepoResult<TermsOfService> {
        let id_text = terms.id.to_string();
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        let deactivated = if terms.active {
            tx.execute(
                "UPDATE terms_of_service
                 SET active = 0
                 WHERE id <> ?1
                   AND active = 1;",
                [id_text.as_str()],
            )?
        } else {
            if !other_active_exists_in_tx(&tx, id_text.as_str())? {
                warn!(
                    "event=terms_save module=repo status=rejected terms_id={} reason=last_active",
                    terms.id
                );
                return Err(NoActiveTermsOfService::LastActiveDeactivation.into());
            }
            0
        };

        let existed = terms_exist_in_tx(&tx, id_text.as_str())?;
        tx.execute(
            &format!(
                "INSERT INTO terms_of_service (id, active, content, created_at, modified_at)
                 VALUES (?1, ?2, ?3, {NOW_MS_SQL}, {NOW_MS_SQL})
                 ON CONFLICT(id) DO UPDATE SET
                    active = excluded.active,
                    content = excluded.content,
                    modified_at = excluded.modified_at;"
            ),
            params![
                id_text.as_str(),
                bool_to_int(terms.active),
                terms.content.as_str()
            ],
        )?;

        let stored = tx
            .query_row(
                &format!("{TERMS_SELECT_SQL} WHERE id = ?1;"),
                [id_text.as_str()],
                |row| Ok(parse_terms_row(row)),
            )??;
        tx.commit()?;

        info!(
            "event=terms_save module=repo status=ok terms_id={} op={} active={} deactivated={}",
            stored.id,
            if existed { "update" } else { "insert" },
            stored.active,
            deactivated
        );
        Ok(stored)
    }

    fn get_current_tos(&self) -> RepoResult<TermsOfService> {
        let mut active = self.list_terms(&TermsListQuery {
            active_only: true,
            ..TermsListQuery::default()
        })?;

        match active.len() {
            0 => {
                warn!("event=terms_current module=repo status=error error_code=no_active_terms");
                Err(NoActiveTermsOfService::Lookup.into())
            }
            1 => Ok(active.remove(0)),
            count => {
                warn!(
                    "event=terms_current module=repo status=error error_code=multiple_active_terms count={count}"
                );
                Err(RepoError::MultipleActiveTermsOfService { count })
            }
        }
    }

    fn get_terms(&self, id: TermsOfServiceId) -> RepoResult<Option<TermsOfService>> {
        self.conn
            .query_row(
                &format!("{TERMS_SELECT_SQL} WHERE id = ?1;"),
                [id.to_string()],
                |row| Ok(parse_terms_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn list_terms(&self, query: &TermsListQuery) -> RepoResult<Vec<TermsOfService>> {
        let mut sql = format!("{TERMS_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if query.active_only {
            sql.push_str(" AND active = 1");
        }

        sql.push_str(TERMS_ORDER_SQL);

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
        } else if query.offset > 0 {
            sql.push_str(" LIMIT -1");
        }
        if query.offset > 0 {
            sql.push_str(" OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut terms = Vec::new();
        while let Some(row) = rows.next()? {
            terms.push(parse_terms_row(row)?);
        }

        Ok(terms)
    }

    fn latest_terms(&self) -> RepoResult<Option<TermsOfService>> {
        let mut latest = self.list_terms(&TermsListQuery {
            limit: Some(1),
            ..TermsListQuery::default()
        })?;
        Ok(latest.pop())
    }
}

fn other_active_exists_in_tx(tx: &Transaction<'_>, id: &str) -> RepoResult<bool> {
    let exists: i64 = tx.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM terms_of_service
            WHERE id <> ?1
              AND active = 1
        );",
        [id],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn terms_exist_in_tx(tx: &Transaction<'_>, id: &str) -> RepoResult<bool> {
    let exists: i64 = tx.query_row(
        "SELECT EXISTS(SELECT 1 FROM terms_of_service WHERE id = ?1);",
        [id],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn parse_terms_row(row: &Row<'_>) -> RepoResult<TermsOfService> {
    let id_text: String = row.get("id")?;
    Ok(TermsOfService {
        id: parse_uuid(&id_text, "terms_of_service.id")?,
        active: parse_flag(row.get("active")?, "terms_of_service.active")?,
        content: row.get("content")?,
        created_at: Some(row.get("created_at")?),
        modified_at: Some(row.get("modified_at")?),
    })
}
