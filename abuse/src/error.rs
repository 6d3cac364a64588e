use thiserror::Error;

#[derive(Debug, Error)]
pub enum AbuseError {
    #[error("chain error: {0}")]
    Chain(#[from] sbi_chain::ChainError),

    #[error("signer recovery failed: {0}")]
    Crypto(#[from] sbi_crypto::CryptoError),

    #[error("storage error: {0}")]
    Store(#[from] sbi_store::StoreError),
}
