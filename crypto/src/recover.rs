//! Compact signature handling and signer recovery.
//!
//! A compact signature is 65 bytes: a header byte followed by `r ‖ s`.
//! The header is `27 + recovery_id`, plus 4 when the signer's key is
//! compressed.

use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};

use crate::CryptoError;

const HEADER_BASE: u8 = 27;
const COMPRESSED_FLAG: u8 = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompactSignature(pub [u8; 65]);

impl CompactSignature {
    pub fn from_hex(hex_sig: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(hex_sig).map_err(|_| CryptoError::InvalidSignature)?;
        let arr: [u8; 65] = bytes.try_into().map_err(|_| CryptoError::InvalidSignature)?;
        Ok(Self(arr))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    fn recovery_id(&self) -> Result<RecoveryId, CryptoError> {
        let header = self.0[0];
        let id = match header {
            h if (HEADER_BASE + COMPRESSED_FLAG..HEADER_BASE + COMPRESSED_FLAG + 4).contains(&h) => {
                h - HEADER_BASE - COMPRESSED_FLAG
            }
            h if (HEADER_BASE..HEADER_BASE + 4).contains(&h) => h - HEADER_BASE,
            h => return Err(CryptoError::InvalidRecoveryId(h)),
        };
        RecoveryId::try_from(id).map_err(|_| CryptoError::InvalidRecoveryId(header))
    }
}

/// Recover the key that produced `signature` over `digest`.
pub fn recover_signer(
    digest: &[u8; 32],
    signature: &CompactSignature,
) -> Result<VerifyingKey, CryptoError> {
    let recovery_id = signature.recovery_id()?;
    let sig = Signature::from_slice(&signature.0[1..]).map_err(|_| CryptoError::InvalidSignature)?;
    VerifyingKey::recover_from_prehash(digest, &sig, recovery_id)
        .map_err(|_| CryptoError::RecoveryFailed)
}

/// Recover every signer that can be recovered. Bad signatures are dropped;
/// callers only care about the accounts that did sign.
pub fn recover_signers(digest: &[u8; 32], signatures: &[CompactSignature]) -> Vec<VerifyingKey> {
    signatures
        .iter()
        .filter_map(|s| recover_signer(digest, s).ok())
        .collect()
}

/// Produce a compact signature over a prehashed digest.
pub fn sign_digest_compact(key: &SigningKey, digest: &[u8; 32]) -> Result<CompactSignature, CryptoError> {
    let (sig, recid) = key
        .sign_prehash_recoverable(digest)
        .map_err(|_| CryptoError::InvalidSignature)?;
    let mut out = [0u8; 65];
    out[0] = HEADER_BASE + COMPRESSED_FLAG + recid.to_byte();
    out[1..].copy_from_slice(&sig.to_bytes());
    Ok(CompactSignature(out))
}

fn encode_varint(mut n: u64, out: &mut Vec<u8>) {
    loop {
        let byte = (n & 0x7f) as u8;
        n >>= 7;
        if n == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

/// Split a serialized signed transaction into its unsigned prefix.
///
/// The signed form is `unsigned ‖ varint(n) ‖ n × 65-byte signatures`. The
/// expected signatures come from the transaction's JSON form and must match
/// the trailing bytes exactly.
pub fn split_signatures<'a>(
    signed_tx: &'a [u8],
    signatures: &[CompactSignature],
) -> Result<&'a [u8], CryptoError> {
    let mut suffix = Vec::with_capacity(1 + signatures.len() * 65);
    encode_varint(signatures.len() as u64, &mut suffix);
    for s in signatures {
        suffix.extend_from_slice(&s.0);
    }
    if signed_tx.len() < suffix.len() || !signed_tx.ends_with(&suffix) {
        return Err(CryptoError::MalformedTransaction(
            "signature block does not match transaction tail".into(),
        ));
    }
    Ok(&signed_tx[..signed_tx.len() - suffix.len()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::transaction_digest;

    fn signer(seed: u8) -> SigningKey {
        SigningKey::from_slice(&[seed; 32]).unwrap()
    }

    #[test]
    fn recovers_signer_key() {
        let key = signer(5);
        let digest = transaction_digest(&[0u8; 32], b"vote op");
        let sig = sign_digest_compact(&key, &digest).unwrap();
        assert!(sig.0[0] >= 31 && sig.0[0] <= 34);
        assert_eq!(recover_signer(&digest, &sig).unwrap(), *key.verifying_key());
    }

    #[test]
    fn uncompressed_header_is_accepted() {
        let key = signer(6);
        let digest = transaction_digest(&[0u8; 32], b"vote op");
        let mut sig = sign_digest_compact(&key, &digest).unwrap();
        sig.0[0] -= COMPRESSED_FLAG;
        assert_eq!(recover_signer(&digest, &sig).unwrap(), *key.verifying_key());
    }

    #[test]
    fn bad_header_is_rejected() {
        let mut sig = CompactSignature([1u8; 65]);
        sig.0[0] = 3;
        assert_eq!(
            recover_signer(&[0u8; 32], &sig),
            Err(CryptoError::InvalidRecoveryId(3))
        );
    }

    #[test]
    fn multi_signer_recovery_skips_garbage() {
        let digest = transaction_digest(&[0u8; 32], b"tx");
        let a = sign_digest_compact(&signer(1), &digest).unwrap();
        let b = sign_digest_compact(&signer(2), &digest).unwrap();
        let junk = CompactSignature([0u8; 65]);
        let keys = recover_signers(&digest, &[a, junk, b]);
        assert_eq!(keys, vec![*signer(1).verifying_key(), *signer(2).verifying_key()]);
    }

    #[test]
    fn splits_signature_block() {
        let digest = [9u8; 32];
        let sig = sign_digest_compact(&signer(3), &digest).unwrap();
        let mut signed = b"unsigned-body".to_vec();
        signed.push(1);
        signed.extend_from_slice(&sig.0);
        assert_eq!(split_signatures(&signed, &[sig]).unwrap(), b"unsigned-body");
        assert!(split_signatures(b"short", &[sig]).is_err());
    }

    #[test]
    fn hex_round_trip() {
        let sig = sign_digest_compact(&signer(4), &[1u8; 32]).unwrap();
        assert_eq!(CompactSignature::from_hex(&sig.to_hex()).unwrap(), sig);
        assert!(CompactSignature::from_hex("abcd").is_err());
    }
}
