//! Terms-of-service use-case service.
//!
//! # Responsibility
//! - Offer publish / accept / check entry points to callers.
//! - Compose the current-terms lookup with agreement checks.
//!
//! # Invariants
//! - The service never bypasses repository save rules.
//! - `NoActiveTermsOfService` from the lookup is propagated unchanged.

use crate::model::agreement::UserAgreement;
use crate::model::terms::TermsOfService;
use crate::model::user::UserIdentity;
use crate::repo::agreement_repo::UserAgreementRepository;
use crate::repo::terms_repo::{RepoResult, TermsListQuery, TermsOfServiceRepository};
use log::debug;

/// Returns whether `user` agreed to the currently active terms version.
///
/// Agreements to older versions do not count.
///
/// # Errors
/// - `RepoError::NoActiveTermsOfService` when no version is active.
pub fn has_user_agreed_latest_tos<T, A>(
    terms: &T,
    agreements: &A,
    user: &impl UserIdentity,
) -> RepoResult<bool>
where
    T: TermsOfServiceRepository,
    A: UserAgreementRepository,
{
    let current = terms.get_current_tos()?;
    let agreed = agreements.has_agreement(user.user_id(), current.id)?;
    debug!(
        "event=agreement_check module=service status=ok terms_id={} agreed={agreed}",
        current.id
    );
    Ok(agreed)
}

/// Use-case facade over the terms and agreement repositories.
pub struct TermsService<T: TermsOfServiceRepository, A: UserAgreementRepository> {
    terms: T,
    agreements: A,
}

impl<T: TermsOfServiceRepository, A: UserAgreementRepository> TermsService<T, A> {
    pub fn new(terms: T, agreements: A) -> Self {
        Self { terms, agreements }
    }

    /// Creates a new version and makes it the active one.
    pub fn publish_terms(&self, content: impl Into<String>) -> RepoResult<TermsOfService> {
        self.terms.save_terms(&TermsOfService::new(content, true))
    }

    /// Inserts or updates a version under the single-active rule.
    pub fn save_terms(&self, terms: &TermsOfService) -> RepoResult<TermsOfService> {
        self.terms.save_terms(terms)
    }

    pub fn get_current_tos(&self) -> RepoResult<TermsOfService> {
        self.terms.get_current_tos()
    }

    pub fn list_terms(&self, query: &TermsListQuery) -> RepoResult<Vec<TermsOfService>> {
        self.terms.list_terms(query)
    }

    /// Records that `user` accepted the currently active version.
    pub fn accept_current_terms(&self, user: &impl UserIdentity) -> RepoResult<UserAgreement> {
        let current = self.terms.get_current_tos()?;
        self.agreements
            .create_agreement(&UserAgreement::new(user.user_id().clone(), current.id))
    }

    pub fn has_user_agreed_latest_tos(&self, user: &impl UserIdentity) -> RepoResult<bool> {
        has_user_agreed_latest_tos(&self.terms, &self.agreements, user)
    }

    /// Display line for an agreement. Falls back to the raw terms id when the
    /// referenced version cannot be loaded.
    pub fn describe_agreement(
        &self,
        agreement: &UserAgreement,
        user: &impl UserIdentity,
    ) -> RepoResult<String> {
        Ok(match self.terms.get_terms(agreement.terms_of_service)? {
            Some(terms) => agreement.describe(user.username(), &terms),
            None => agreement.describe(user.username(), &agreement.terms_of_service),
        })
    }
}
