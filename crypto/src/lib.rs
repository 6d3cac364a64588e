//! Cryptographic primitives for signer recovery.
//!
//! - **SHA-256** transaction digests, domain-separated by chain id
//! - **secp256k1** recovery of signer keys from 65-byte compact signatures
//! - Public key text form: prefix + base58(compressed key ‖ RIPEMD-160 checksum)

pub mod error;
pub mod hash;
pub mod keys;
pub mod recover;

pub use error::CryptoError;
pub use hash::{parse_chain_id, transaction_digest};
pub use keys::{format_public_key, parse_public_key, DEFAULT_KEY_PREFIX};
pub use recover::{
    recover_signer, recover_signers, sign_digest_compact, split_signatures, CompactSignature,
};
