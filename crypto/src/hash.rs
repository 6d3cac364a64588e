//! Transaction digests.

use sha2::{Digest, Sha256};

use crate::CryptoError;

/// Decode a hex chain id into its 32 raw bytes.
pub fn parse_chain_id(hex_id: &str) -> Result<[u8; 32], CryptoError> {
    let bytes = hex::decode(hex_id.trim()).map_err(|_| CryptoError::InvalidChainId(hex_id.to_string()))?;
    bytes
        .try_into()
        .map_err(|_| CryptoError::InvalidChainId(hex_id.to_string()))
}

/// The digest a transaction's signers sign: `sha256(chain_id ‖ unsigned_tx)`.
pub fn transaction_digest(chain_id: &[u8; 32], unsigned_tx: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(chain_id);
    hasher.update(unsigned_tx);
    hasher.finalize().into()
}
