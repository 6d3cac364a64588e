use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("config error: {0}")]
    Config(String),

    #[error("ledger error: {0}")]
    Ledger(#[from] sbi_ledger::LedgerError),

    #[error("store error: {0}")]
    Store(#[from] sbi_store::StoreError),

    #[error("chain error: {0}")]
    Chain(#[from] sbi_chain::ChainError),

    #[error("voting error: {0}")]
    Voting(#[from] sbi_voting::VotingError),
}
