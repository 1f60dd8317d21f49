//! Error types for identifier validation
//!
//! Parsing caller-supplied identifier lists is the only fallible operation in
//! this crate; both failures are caller mistakes and abort the whole parse.

use thiserror::Error;

/// Errors that can occur while building an [`IdentifierSet`](crate::IdentifierSet)
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentifierError {
    /// A token is not a base-10 unsigned 64-bit integer
    #[error("malformed validator identifier '{token}'")]
    Malformed { token: String },

    /// More tokens than the caller's tier allows
    #[error("{count} validator identifiers exceed the limit of {limit}")]
    TooMany { count: usize, limit: usize },
}
