//! Errors raised while parsing or validating core types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TypesError {
    #[error("invalid account name: {0}")]
    InvalidAccount(String),

    #[error("invalid authorperm: {0}")]
    InvalidAuthorperm(String),

    #[error("malformed sponsee map in event {event_id}: {reason}")]
    MalformedSponsee { event_id: u64, reason: String },

    #[error("unknown share type: {0}")]
    UnknownShareType(String),

    #[error("unknown event status: {0}")]
    UnknownStatus(String),
}
