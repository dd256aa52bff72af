//! Domain records for terms-of-service versions and user agreements.
//!
//! # Invariants
//! - Timestamps are assigned by the store; records built in memory carry `None`.
//! - Identity of a terms version or agreement never changes after creation.

pub mod agreement;
pub mod terms;
pub mod user;
