//! External user identity as seen by the terms store.
//!
//! The account system lives outside this crate. Agreements only keep the
//! opaque `UserId`; the username is used for display.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Opaque identifier of an externally-owned user account.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Blank ids cannot identify an account.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for UserId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// What the terms store needs to know about a user.
pub trait UserIdentity {
    fn user_id(&self) -> &UserId;
    /// Username-like display string.
    fn username(&self) -> &str;
}

/// Plain user handle for callers without their own account type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
}

impl User {
    pub fn new(id: impl Into<UserId>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
        }
    }
}

impl UserIdentity for User {
    fn user_id(&self) -> &UserId {
        &self.id
    }

    fn username(&self) -> &str {
        self.username.as_str()
    }
}
