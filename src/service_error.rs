//! Collaborator Error Type
//!
//! Every account/ledger service call reports failures through [`ServiceError`].
//! The variant tells the caller whether the outcome is known:
//!
//! - `Rejected`: the store refused the operation; nothing was applied
//! - `Unavailable`: timeout, pool exhaustion, network error; the operation
//!   MAY have been applied and must be retried, never assumed to have failed

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("Operation rejected: {0}")]
    Rejected(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Record not found: {0}")]
    NotFound(String),
}

impl ServiceError {
    /// Transient failures are worth re-invoking the same step for
    #[inline]
    pub fn is_transient(&self) -> bool {
        matches!(self, ServiceError::Unavailable(_))
    }

    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::Rejected(_) => "REJECTED",
            ServiceError::Unavailable(_) => "UNAVAILABLE",
            ServiceError::NotFound(_) => "NOT_FOUND",
        }
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => ServiceError::NotFound(e.to_string()),
            sqlx::Error::Io(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => ServiceError::Unavailable(e.to_string()),
            _ => ServiceError::Rejected(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(ServiceError::Unavailable("timeout".into()).is_transient());
        assert!(!ServiceError::Rejected("constraint".into()).is_transient());
        assert!(!ServiceError::NotFound("tx".into()).is_transient());
    }

    #[test]
    fn test_from_sqlx() {
        assert!(ServiceError::from(sqlx::Error::PoolTimedOut).is_transient());
        assert_eq!(
            ServiceError::from(sqlx::Error::RowNotFound).code(),
            "NOT_FOUND"
        );
        assert_eq!(
            ServiceError::from(sqlx::Error::Protocol("bad".into())).code(),
            "REJECTED"
        );
    }
}
