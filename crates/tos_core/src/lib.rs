//! Terms-of-service versions and per-user agreement records on SQLite.
//!
//! This crate owns the single-active-version rule; callers should only write
//! through the repositories or `TermsService`.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::agreement::{AgreementValidationError, UserAgreement, UserAgreementId};
pub use model::terms::{TermsOfService, TermsOfServiceId};
pub use model::user::{User, UserId, UserIdentity};
pub use repo::agreement_repo::{SqliteUserAgreementRepository, UserAgreementRepository};
pub use repo::terms_repo::{
    NoActiveTermsOfService, RepoError, RepoResult, SqliteTermsOfServiceRepository,
    TermsListQuery, TermsOfServiceRepository,
};
pub use service::terms_service::{has_user_agreed_latest_tos, TermsService};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
