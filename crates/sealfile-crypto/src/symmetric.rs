//! Symmetric encryption with a freshly generated key
//!
//! The key is returned inside the [`TransformationParameters`] and is meant
//! to be persisted in the sidecar; whoever holds the sidecar can decrypt.

use sealfile_core::{SealError, SealResult};

use crate::catalog::{self, AlgorithmFamily};
use crate::keys::{generate_iv, generate_key};
use crate::params::{CipherSelection, TransformationParameters};
use crate::provider::{self, reclassify, Direction, KeySource};

/// Encrypt `plaintext` under a new random key.
///
/// Each call generates a fresh key and IV, so encrypting the same input twice
/// gives different ciphertexts.
pub fn encrypt(
    plaintext: &[u8],
    selection: &CipherSelection,
) -> SealResult<(Vec<u8>, TransformationParameters)> {
    catalog::validate(
        AlgorithmFamily::Aes,
        selection.padding,
        selection.block_mode,
        selection.key_length_bits,
        None,
    )?;
    catalog::check_alignment(selection.block_mode, selection.padding, plaintext.len())?;

    let key = generate_key(selection.key_length_bits);
    let iv = generate_iv(selection.block_mode);

    let ciphertext = provider::encrypt(
        selection.block_mode,
        selection.padding,
        key.as_bytes(),
        iv.as_deref(),
        plaintext,
    )
    .map_err(|e| reclassify(e, Direction::Encrypt, KeySource::Generated))?;

    tracing::debug!(
        block_mode = %selection.block_mode,
        padding = %selection.padding,
        key_bits = selection.key_length_bits,
        plaintext_len = plaintext.len(),
        ciphertext_len = ciphertext.len(),
        "symmetric encrypt"
    );

    let params = TransformationParameters {
        family: AlgorithmFamily::Aes,
        padding: selection.padding,
        block_mode: selection.block_mode,
        key_length_bits: selection.key_length_bits,
        kdf: None,
        salt: None,
        iv,
        key: Some(key),
    };
    Ok((ciphertext, params))
}

/// Decrypt `ciphertext` with the key and IV recorded at encryption time.
///
/// Under GCM a tag mismatch is an [`SealError::AuthenticationFailure`]; for
/// the other modes any primitive failure is a
/// [`SealError::CryptoProvider`].
pub fn decrypt(ciphertext: &[u8], params: &TransformationParameters) -> SealResult<Vec<u8>> {
    if params.family != AlgorithmFamily::Aes {
        return Err(SealError::config(format!(
            "expected AES parameters, got {}",
            params.family
        )));
    }
    params.validate()?;

    let key = params
        .key
        .as_ref()
        .ok_or_else(|| SealError::config("missing key for AES parameters"))?;

    let plaintext = provider::decrypt(
        params.block_mode,
        params.padding,
        key.as_bytes(),
        params.iv.as_deref(),
        ciphertext,
    )
    .map_err(|e| reclassify(e, Direction::Decrypt, KeySource::Generated))?;

    tracing::debug!(
        block_mode = %params.block_mode,
        padding = %params.padding,
        ciphertext_len = ciphertext.len(),
        "symmetric decrypt"
    );
    Ok(plaintext)
}
