use serde::Serialize;
use thiserror::Error;

/// Structured classification of a datastore failure, supplied by the client
/// that observed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DatabaseErrorKind {
    UniqueViolation,
    ForeignKeyViolation,
    CheckViolation,
    Connection,
    Timeout,
    Unavailable,
    Query,
    NotConfigured,
}

impl DatabaseErrorKind {
    /// Postgres SQLSTATE codes for the integrity classes we care about.
    pub fn from_sqlstate(code: &str) -> Self {
        match code {
            "23505" => DatabaseErrorKind::UniqueViolation,
            "23503" => DatabaseErrorKind::ForeignKeyViolation,
            "23514" => DatabaseErrorKind::CheckViolation,
            "57014" => DatabaseErrorKind::Timeout,
            "53300" | "57P01" | "57P03" => DatabaseErrorKind::Unavailable,
            code if code.starts_with("08") => DatabaseErrorKind::Connection,
            _ => DatabaseErrorKind::Query,
        }
    }

    pub fn is_integrity_violation(&self) -> bool {
        matches!(
            self,
            DatabaseErrorKind::UniqueViolation
                | DatabaseErrorKind::ForeignKeyViolation
                | DatabaseErrorKind::CheckViolation
        )
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("Database error ({kind:?}): {message}")]
pub struct DatabaseError {
    pub kind: DatabaseErrorKind,
    pub message: String,
}

impl DatabaseError {
    pub fn new(kind: DatabaseErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_configured() -> Self {
        Self::new(
            DatabaseErrorKind::NotConfigured,
            "Database not configured. Please set DATABASE_URL in your environment.",
        )
    }

    /// Integrity violations will fail the same way on every attempt.
    pub fn is_retryable(&self) -> bool {
        !self.kind.is_integrity_violation()
    }
}

impl From<reqwest::Error> for DatabaseError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            DatabaseErrorKind::Timeout
        } else if err.is_connect() {
            DatabaseErrorKind::Connection
        } else if err.is_decode() {
            DatabaseErrorKind::Query
        } else {
            DatabaseErrorKind::Unavailable
        };

        DatabaseError::new(kind, err.to_string())
    }
}
