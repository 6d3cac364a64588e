use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out")]
    Timeout,

    #[error("node error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("broadcast rejected: {0}")]
    Broadcast(String),

    #[error("crypto error: {0}")]
    Crypto(#[from] sbi_crypto::CryptoError),
}

impl ChainError {
    /// Errors worth retrying against another node.
    pub fn is_transient(&self) -> bool {
        match self {
            ChainError::Transport(_) | ChainError::Timeout | ChainError::Broadcast(_) => true,
            // -32603 is the generic internal error nodes return when overloaded.
            ChainError::Rpc { code, .. } => *code == -32603,
            ChainError::Decode(_) | ChainError::NotFound(_) | ChainError::Crypto(_) => false,
        }
    }
}

impl From<reqwest::Error> for ChainError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ChainError::Timeout
        } else if e.is_decode() {
            ChainError::Decode(e.to_string())
        } else {
            ChainError::Transport(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_transient_errors() {
        assert!(ChainError::Timeout.is_transient());
        assert!(ChainError::Transport("reset".into()).is_transient());
        assert!(ChainError::Rpc { code: -32603, message: "busy".into() }.is_transient());
        assert!(!ChainError::Rpc { code: -32602, message: "bad params".into() }.is_transient());
        assert!(!ChainError::NotFound("x".into()).is_transient());
    }
}
