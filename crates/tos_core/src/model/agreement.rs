//! User agreement model.
//!
//! # Invariants
//! - `user_id` must not be blank.
//! - `terms_of_service` must reference an existing terms version when saved.
//! - Several agreements for the same (user, version) pair are allowed.

use crate::model::terms::TermsOfServiceId;
use crate::model::user::UserId;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of one agreement record.
pub type UserAgreementId = Uuid;

/// Record of one user accepting one terms-of-service version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAgreement {
    pub id: UserAgreementId,
    pub terms_of_service: TermsOfServiceId,
    pub user_id: UserId,
    pub created_at: Option<i64>,
    pub modified_at: Option<i64>,
}

/// Validation failures for agreement writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgreementValidationError {
    BlankUserId,
}

impl Display for AgreementValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankUserId => write!(f, "agreement user id must not be blank"),
        }
    }
}

impl Error for AgreementValidationError {}

impl UserAgreement {
    /// Builds an unsaved agreement with a fresh id.
    pub fn new(user_id: impl Into<UserId>, terms_of_service: TermsOfServiceId) -> Self {
        Self {
            id: Uuid::new_v4(),
            terms_of_service,
            user_id: user_id.into(),
            created_at: None,
            modified_at: None,
        }
    }

    pub fn validate(&self) -> Result<(), AgreementValidationError> {
        if self.user_id.is_blank() {
            return Err(AgreementValidationError::BlankUserId);
        }
        Ok(())
    }

    /// Human-readable line, e.g. `alice agreed to TOS: 1700000000000: active`.
    ///
    /// `terms` is usually the loaded `TermsOfService`; callers without it
    /// pass the raw `terms_of_service` id instead.
    pub fn describe(&self, username: &str, terms: &impl Display) -> String {
        format!("{username} agreed to TOS: {terms}")
    }
}

#[cfg(test)]
mod tests {
    use super::{AgreementValidationError, UserAgreement};
    use crate::model::terms::TermsOfService;
    use uuid::Uuid;

    #[test]
    fn validate_rejects_blank_user_id() {
        let terms = TermsOfService::new("v1", true);
        let agreement = UserAgreement::new("   ", terms.id);
        assert_eq!(
            agreement.validate(),
            Err(AgreementValidationError::BlankUserId)
        );
    }

    #[test]
    fn describe_includes_username_and_terms_status() {
        let mut terms = TermsOfService::new("v1", true);
        terms.created_at = Some(42);
        let agreement = UserAgreement::new("u-1", terms.id);
        assert_eq!(
            agreement.describe("alice", &terms),
            "alice agreed to TOS: 42: active"
        );
    }

    #[test]
    fn describe_accepts_bare_terms_id() {
        let agreement = UserAgreement::new("u-1", Uuid::nil());
        assert_eq!(
            agreement.describe("bob", &agreement.terms_of_service),
            "bob agreed to TOS: 00000000-0000-0000-0000-000000000000"
        );
    }
}
