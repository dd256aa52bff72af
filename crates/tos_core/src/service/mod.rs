//! Use-case services on top of the repositories.
//!
//! # Responsibility
//! - Keep CLI and embedding callers decoupled from SQL details.

pub mod terms_service;
