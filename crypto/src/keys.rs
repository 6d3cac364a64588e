//! Public key text encoding.

use k256::ecdsa::VerifyingKey;
use ripemd::{Digest, Ripemd160};

use crate::CryptoError;

pub const DEFAULT_KEY_PREFIX: &str = "STM";

fn checksum(data: &[u8]) -> [u8; 4] {
    let digest = Ripemd160::digest(data);
    let mut out = [0u8; 4];
    out.copy_from_slice(&digest[..4]);
    out
}

/// Encode a key as `prefix + base58(compressed ‖ ripemd160(compressed)[..4])`.
pub fn format_public_key(key: &VerifyingKey, prefix: &str) -> String {
    let point = key.to_encoded_point(true);
    let compressed = point.as_bytes();
    let mut payload = Vec::with_capacity(compressed.len() + 4);
    payload.extend_from_slice(compressed);
    payload.extend_from_slice(&checksum(compressed));
    format!("{prefix}{}", bs58::encode(payload).into_string())
}

/// Decode a key produced by [`format_public_key`], verifying the checksum.
pub fn parse_public_key(text: &str, prefix: &str) -> Result<VerifyingKey, CryptoError> {
    let body = text
        .strip_prefix(prefix)
        .ok_or_else(|| CryptoError::InvalidPublicKey(format!("missing prefix {prefix}")))?;
    let payload = bs58::decode(body)
        .into_vec()
        .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;
    if payload.len() != 37 {
        return Err(CryptoError::InvalidPublicKey(format!(
            "expected 37 bytes, got {}",
            payload.len()
        )));
    }
    let (key, check) = payload.split_at(33);
    if checksum(key) != check {
        return Err(CryptoError::InvalidPublicKey("checksum mismatch".into()));
    }
    VerifyingKey::from_sec1_bytes(key).map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))
}
