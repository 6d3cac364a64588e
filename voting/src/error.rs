use thiserror::Error;

#[derive(Debug, Error)]
pub enum VotingError {
    #[error("chain error: {0}")]
    Chain(#[from] sbi_chain::ChainError),

    #[error("storage error: {0}")]
    Store(#[from] sbi_store::StoreError),

    #[error("voter pool is empty")]
    EmptyPool,
}
