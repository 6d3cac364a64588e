use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("invalid chain id: {0}")]
    InvalidChainId(String),

    #[error("invalid signature encoding")]
    InvalidSignature,

    #[error("invalid recovery id byte {0}")]
    InvalidRecoveryId(u8),

    #[error("public key recovery failed")]
    RecoveryFailed,

    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("malformed transaction bytes: {0}")]
    MalformedTransaction(String),
}
