//! Keyed and unkeyed hashing
//!
//! MAC algorithms get a fresh 256-bit key per call; the key is part of the
//! returned [`HashRecord`] so the digest can be recomputed later.

use aes::{Aes128, Aes192, Aes256};
use cmac::Cmac;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use sealfile_core::{SealError, SealResult};

use crate::catalog::HashAlgorithm;
use crate::keys::{generate_key, SymmetricKey};

/// MAC key length for the keyed algorithms.
const MAC_KEY_BITS: u32 = 256;

/// A digest plus whatever is needed to recompute it.
#[derive(Debug, Clone)]
pub struct HashRecord {
    pub algorithm: HashAlgorithm,
    pub digest: Vec<u8>,
    /// Present iff `algorithm` is keyed
    pub key: Option<SymmetricKey>,
}

pub fn hash(bytes: &[u8], algorithm: HashAlgorithm) -> SealResult<HashRecord> {
    let key = algorithm.is_keyed().then(|| generate_key(MAC_KEY_BITS));
    let digest = compute(bytes, algorithm, key.as_ref())?;

    tracing::debug!(
        algorithm = %algorithm,
        input_len = bytes.len(),
        digest_len = digest.len(),
        "hashed input"
    );
    Ok(HashRecord {
        algorithm,
        digest,
        key,
    })
}

/// Recompute the digest of `bytes` and compare it with the record.
///
/// `Ok(false)` means the input changed. Errors are reserved for malformed
/// records.
pub fn check_hash(bytes: &[u8], record: &HashRecord) -> SealResult<bool> {
    match (record.algorithm.is_keyed(), record.key.as_ref()) {
        (true, None) => {
            return Err(SealError::config(format!(
                "{} record is missing its key",
                record.algorithm
            )))
        }
        (false, Some(_)) => {
            return Err(SealError::config(format!(
                "{} is unkeyed but the record carries a key",
                record.algorithm
            )))
        }
        _ => {}
    }

    let matches = match (record.algorithm, record.key.as_ref()) {
        (HashAlgorithm::HmacSha256, Some(key)) => {
            let mut mac = hmac_sha256(key)?;
            mac.update(bytes);
            mac.verify_slice(&record.digest).is_ok()
        }
        (HashAlgorithm::AesCmac, Some(key)) => cmac_verify(key, bytes, &record.digest)?,
        (algorithm, _) => compute(bytes, algorithm, None)? == record.digest,
    };

    tracing::debug!(algorithm = %record.algorithm, matches, "checked hash");
    Ok(matches)
}

fn compute(bytes: &[u8], algorithm: HashAlgorithm, key: Option<&SymmetricKey>) -> SealResult<Vec<u8>> {
    let missing_key = || SealError::config(format!("{algorithm} needs a key"));

    Ok(match algorithm {
        HashAlgorithm::Sha256 => Sha256::digest(bytes).to_vec(),
        HashAlgorithm::Blake3 => blake3::hash(bytes).as_bytes().to_vec(),
        HashAlgorithm::HmacSha256 => {
            let mut mac = hmac_sha256(key.ok_or_else(missing_key)?)?;
            mac.update(bytes);
            mac.finalize().into_bytes().to_vec()
        }
        HashAlgorithm::AesCmac => cmac_tag(key.ok_or_else(missing_key)?, bytes)?,
    })
}

fn hmac_sha256(key: &SymmetricKey) -> SealResult<Hmac<Sha256>> {
    <Hmac<Sha256> as Mac>::new_from_slice(key.as_bytes())
        .map_err(|e| SealError::CryptoProvider(format!("HMAC-SHA256 init failed: {e}")))
}

/// CMAC over the AES variant matching the key length.
macro_rules! with_cmac {
    ($key:expr, |$mac:ident| $body:expr) => {
        match $key.as_bytes().len() {
            16 => {
                let $mac = <Cmac<Aes128> as Mac>::new_from_slice($key.as_bytes());
                $body
            }
            24 => {
                let $mac = <Cmac<Aes192> as Mac>::new_from_slice($key.as_bytes());
                $body
            }
            32 => {
                let $mac = <Cmac<Aes256> as Mac>::new_from_slice($key.as_bytes());
                $body
            }
            n => Err(SealError::config(format!("invalid AES-CMAC key length: {n} bytes"))),
        }
    };
}

fn cmac_tag(key: &SymmetricKey, bytes: &[u8]) -> SealResult<Vec<u8>> {
    with_cmac!(key, |mac| {
        let mut mac = mac.map_err(|e| SealError::CryptoProvider(format!("AES-CMAC init failed: {e}")))?;
        mac.update(bytes);
        Ok(mac.finalize().into_bytes().to_vec())
    })
}

fn cmac_verify(key: &SymmetricKey, bytes: &[u8], expected: &[u8]) -> SealResult<bool> {
    with_cmac!(key, |mac| {
        let mut mac = mac.map_err(|e| SealError::CryptoProvider(format!("AES-CMAC init failed: {e}")))?;
        mac.update(bytes);
        Ok(mac.verify_slice(expected).is_ok())
    })
}
