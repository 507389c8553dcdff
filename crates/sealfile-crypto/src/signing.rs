//! Ed25519 signatures with a one-shot key pair
//!
//! Every call to [`sign`] generates a new key pair; the private half is
//! dropped once the signature is made, so only the public key is kept.

use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey, PUBLIC_KEY_LENGTH, SIGNATURE_LENGTH};
use rand::rngs::OsRng;

use sealfile_core::{SealError, SealResult};

/// A detached signature and the public key that verifies it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureRecord {
    pub signature: Vec<u8>,
    pub public_key: Vec<u8>,
}

pub fn sign(bytes: &[u8]) -> SealResult<SignatureRecord> {
    let signing_key = SigningKey::generate(&mut OsRng);
    let signature = signing_key.sign(bytes);
    let public_key = signing_key.verifying_key();

    tracing::debug!(input_len = bytes.len(), "signed input with ephemeral Ed25519 key");
    Ok(SignatureRecord {
        signature: signature.to_bytes().to_vec(),
        public_key: public_key.to_bytes().to_vec(),
    })
}

/// Check `record` against `bytes`.
///
/// `Ok(false)` means the signature does not match. A record whose key or
/// signature cannot be decoded at all is an error.
pub fn verify(bytes: &[u8], record: &SignatureRecord) -> SealResult<bool> {
    let public_key: [u8; PUBLIC_KEY_LENGTH] =
        record.public_key.as_slice().try_into().map_err(|_| {
            SealError::config(format!(
                "public key must be {PUBLIC_KEY_LENGTH} bytes, got {}",
                record.public_key.len()
            ))
        })?;
    let signature: [u8; SIGNATURE_LENGTH] =
        record.signature.as_slice().try_into().map_err(|_| {
            SealError::config(format!(
                "signature must be {SIGNATURE_LENGTH} bytes, got {}",
                record.signature.len()
            ))
        })?;

    let verifying_key = VerifyingKey::from_bytes(&public_key)
        .map_err(|e| SealError::config(format!("invalid public key: {e}")))?;
    let signature = Signature::from_bytes(&signature);

    let valid = verifying_key.verify_strict(bytes, &signature).is_ok();
    tracing::debug!(valid, "verified signature");
    Ok(valid)
}
