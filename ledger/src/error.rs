//! Ledger-specific errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("invalid reward parameters: {0}")]
    InvalidParams(String),

    #[error("storage error: {0}")]
    Store(#[from] sbi_store::StoreError),

    #[error("arithmetic overflow in ledger computation")]
    Overflow,
}
