// Error taxonomy surfaced by the core API.

use std::fmt;

use thiserror::Error;

/// The kind of record a lookup failed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Event,
    User,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Event => write!(f, "event"),
            Entity::User => write!(f, "user"),
        }
    }
}

/// Failures of a single core operation. An outbid buy is not an error; it
/// is reported as a `false` return from the buy operation.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{entity} {id} not found")]
    NotFound { entity: Entity, id: i64 },

    #[error("invalid index {index}: expected 1..={len}")]
    InvalidIndex { index: i64, len: usize },

    #[error("invalid range {start}..={end}: expected 1 <= start <= end <= {len}")]
    InvalidRange { start: i64, end: i64, len: usize },

    #[error("invalid rank {0}: ranks start at 1")]
    InvalidRank(u32),

    #[error("invalid amount {0}: must be positive and keep the vote count in range")]
    InvalidAmount(u32),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl ServiceError {
    pub fn event_not_found(id: i64) -> Self {
        ServiceError::NotFound {
            entity: Entity::Event,
            id,
        }
    }

    pub fn user_not_found(id: i64) -> Self {
        ServiceError::NotFound {
            entity: Entity::User,
            id,
        }
    }

    /// Whether the error was caused by caller input rather than the store.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, ServiceError::Storage(_))
    }
}

pub type Result<T, E = ServiceError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_input() {
        assert_eq!(ServiceError::event_not_found(3).to_string(), "event 3 not found");
        assert_eq!(ServiceError::user_not_found(9).to_string(), "user 9 not found");
        assert_eq!(
            ServiceError::InvalidRange { start: 0, end: 2, len: 5 }.to_string(),
            "invalid range 0..=2: expected 1 <= start <= end <= 5"
        );
    }

    #[test]
    fn storage_errors_are_not_client_errors() {
        let err = ServiceError::from(rusqlite::Error::QueryReturnedNoRows);
        assert!(!err.is_client_error());
        assert!(ServiceError::InvalidRank(0).is_client_error());
    }
}
