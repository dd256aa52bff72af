//! Terms-of-service document model.
//!
//! # Invariants
//! - At most one persisted `TermsOfService` has `active == true`.
//! - `created_at` / `modified_at` are epoch milliseconds set by the store.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of one terms-of-service version.
pub type TermsOfServiceId = Uuid;

/// One versioned terms-of-service document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermsOfService {
    pub id: TermsOfServiceId,
    /// Only one terms of service is allowed to be active.
    pub active: bool,
    /// Document body. Empty content is allowed.
    pub content: String,
    /// Set once on insert. `None` until the record is saved.
    pub created_at: Option<i64>,
    /// Refreshed on every save. `None` until the record is saved.
    pub modified_at: Option<i64>,
}

impl TermsOfService {
    /// Builds an unsaved version with a fresh id.
    pub fn new(content: impl Into<String>, active: bool) -> Self {
        Self::with_id(Uuid::new_v4(), content, active)
    }

    /// Builds an unsaved version with a caller-provided id.
    ///
    /// Saving a record whose id already exists updates that row.
    pub fn with_id(id: TermsOfServiceId, content: impl Into<String>, active: bool) -> Self {
        Self {
            id,
            active,
            content: content.into(),
            created_at: None,
            modified_at: None,
        }
    }

    /// Returns whether the store has assigned timestamps to this record.
    pub fn is_persisted(&self) -> bool {
        self.created_at.is_some()
    }

    pub fn status_label(&self) -> &'static str {
        if self.active {
            "active"
        } else {
            "inactive"
        }
    }
}

impl Display for TermsOfService {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.created_at {
            Some(created_at) => write!(f, "{created_at}: {}", self.status_label()),
            None => write!(f, "unsaved: {}", self.status_label()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::TermsOfService;

    #[test]
    fn new_terms_are_unsaved() {
        let terms = TermsOfService::new("v1", true);
        assert!(!terms.is_persisted());
        assert_eq!(terms.modified_at, None);
    }

    #[test]
    fn display_shows_creation_time_and_status() {
        let mut terms = TermsOfService::new("v1", false);
        assert_eq!(terms.to_string(), "unsaved: inactive");

        terms.created_at = Some(1_700_000_000_000);
        terms.active = true;
        assert_eq!(terms.to_string(), "1700000000000: active");
    }
}
