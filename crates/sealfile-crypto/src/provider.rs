//! AES mode driver
//!
//! Runs one of ECB, CBC, CTR or GCM over a whole buffer with a 128, 192 or
//! 256-bit key. Errors are reported as [`ProviderError`], which callers turn
//! into a [`SealError`] with [`reclassify`] once they know the direction and
//! where the key came from.

use aes::cipher::block_padding::{AnsiX923, Iso7816, NoPadding, Pkcs7};
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyInit, KeyIvInit, StreamCipher};
use aes::{Aes128, Aes192, Aes256};
use aes_gcm::aead::consts::U12;
use aes_gcm::aead::Aead;
use aes_gcm::{AesGcm, Nonce};
use thiserror::Error;

use sealfile_core::SealError;

use crate::catalog::{BlockMode, PaddingMode, AES_BLOCK_SIZE};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("invalid AES key length: {0} bytes")]
    InvalidKeyLength(usize),

    #[error("{mode} needs a {expected}-byte IV, got {got}")]
    InvalidIvLength {
        mode: BlockMode,
        expected: usize,
        got: usize,
    },

    #[error("{0} needs an IV but none was given")]
    MissingIv(BlockMode),

    #[error("{0} does not take an IV")]
    UnexpectedIv(BlockMode),

    #[error("input of {len} bytes is not a multiple of the {block_size}-byte block size")]
    Misaligned { len: usize, block_size: usize },

    #[error("only NoPadding can be used with {0}")]
    PaddingRejected(BlockMode),

    #[error("authentication tag mismatch")]
    TagMismatch,

    #[error("invalid padding")]
    BadPadding,

    #[error("{0}")]
    Primitive(String),
}

impl ProviderError {
    /// Failures a wrong key produces during decryption.
    fn is_wrong_key_symptom(&self) -> bool {
        matches!(
            self,
            ProviderError::TagMismatch | ProviderError::BadPadding | ProviderError::Misaligned { .. }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Encrypt,
    Decrypt,
}

/// Where the AES key came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    /// Random key stored in the sidecar
    Generated,
    /// Derived from a passphrase
    Passphrase,
}

/// Map a primitive failure onto the caller-facing error classes.
///
/// With a passphrase-derived key, every decrypt failure a wrong passphrase can
/// cause (tag mismatch, bad padding, misaligned length) is reported as an
/// authentication failure. With a generated key only a tag mismatch is.
pub fn reclassify(err: ProviderError, direction: Direction, source: KeySource) -> SealError {
    match (direction, source) {
        (Direction::Decrypt, KeySource::Passphrase) if err.is_wrong_key_symptom() => {
            SealError::AuthenticationFailure(
                "wrong password or the file might have been manipulated".into(),
            )
        }
        (Direction::Decrypt, _) if err == ProviderError::TagMismatch => {
            SealError::AuthenticationFailure(
                "MAC check failed, the file might have been manipulated".into(),
            )
        }
        (_, _) => match err {
            ProviderError::PaddingRejected(_) => SealError::ParameterIncompatibility(err.to_string()),
            ProviderError::Misaligned { .. } if direction == Direction::Encrypt => {
                SealError::ParameterIncompatibility(format!(
                    "{err}; choose a padding mode"
                ))
            }
            other => SealError::CryptoProvider(other.to_string()),
        },
    }
}

/// Select the AES variant for a key by its length.
macro_rules! with_aes {
    ($key:expr, |$cipher:ident| $body:expr) => {
        match $key.len() {
            16 => {
                type $cipher = Aes128;
                $body
            }
            24 => {
                type $cipher = Aes192;
                $body
            }
            32 => {
                type $cipher = Aes256;
                $body
            }
            n => Err(ProviderError::InvalidKeyLength(n)),
        }
    };
}

macro_rules! with_padding {
    ($padding:expr, |$pad:ident| $body:expr) => {
        match $padding {
            PaddingMode::NoPadding => {
                type $pad = NoPadding;
                $body
            }
            PaddingMode::Pkcs7 => {
                type $pad = Pkcs7;
                $body
            }
            PaddingMode::Iso7816 => {
                type $pad = Iso7816;
                $body
            }
            PaddingMode::AnsiX923 => {
                type $pad = AnsiX923;
                $body
            }
        }
    };
}

pub fn encrypt(
    mode: BlockMode,
    padding: PaddingMode,
    key: &[u8],
    iv: Option<&[u8]>,
    plaintext: &[u8],
) -> Result<Vec<u8>, ProviderError> {
    check_padding(mode, padding)?;
    let iv = check_iv(mode, iv)?;
    if mode.is_block_aligned() && padding.is_none() {
        check_aligned(plaintext.len())?;
    }

    match mode {
        BlockMode::Ecb => with_aes!(key, |C| with_padding!(padding, |P| {
            let enc = ecb::Encryptor::<C>::new_from_slice(key)
                .map_err(|_| ProviderError::InvalidKeyLength(key.len()))?;
            Ok(enc.encrypt_padded_vec_mut::<P>(plaintext))
        })),
        BlockMode::Cbc => with_aes!(key, |C| with_padding!(padding, |P| {
            let enc = cbc::Encryptor::<C>::new_from_slices(key, iv)
                .map_err(|_| iv_error(mode, iv))?;
            Ok(enc.encrypt_padded_vec_mut::<P>(plaintext))
        })),
        BlockMode::Ctr => apply_ctr(key, iv, plaintext),
        BlockMode::Gcm => with_aes!(key, |C| {
            let cipher = AesGcm::<C, U12>::new_from_slice(key)
                .map_err(|_| ProviderError::InvalidKeyLength(key.len()))?;
            cipher
                .encrypt(Nonce::<U12>::from_slice(iv), plaintext)
                .map_err(|_| ProviderError::Primitive("GCM encryption failed".into()))
        }),
    }
}

pub fn decrypt(
    mode: BlockMode,
    padding: PaddingMode,
    key: &[u8],
    iv: Option<&[u8]>,
    ciphertext: &[u8],
) -> Result<Vec<u8>, ProviderError> {
    check_padding(mode, padding)?;
    let iv = check_iv(mode, iv)?;
    if mode.is_block_aligned() {
        check_aligned(ciphertext.len())?;
    }

    match mode {
        BlockMode::Ecb => with_aes!(key, |C| with_padding!(padding, |P| {
            let dec = ecb::Decryptor::<C>::new_from_slice(key)
                .map_err(|_| ProviderError::InvalidKeyLength(key.len()))?;
            dec.decrypt_padded_vec_mut::<P>(ciphertext)
                .map_err(|_| ProviderError::BadPadding)
        })),
        BlockMode::Cbc => with_aes!(key, |C| with_padding!(padding, |P| {
            let dec = cbc::Decryptor::<C>::new_from_slices(key, iv)
                .map_err(|_| iv_error(mode, iv))?;
            dec.decrypt_padded_vec_mut::<P>(ciphertext)
                .map_err(|_| ProviderError::BadPadding)
        })),
        BlockMode::Ctr => apply_ctr(key, iv, ciphertext),
        BlockMode::Gcm => with_aes!(key, |C| {
            let cipher = AesGcm::<C, U12>::new_from_slice(key)
                .map_err(|_| ProviderError::InvalidKeyLength(key.len()))?;
            cipher
                .decrypt(Nonce::<U12>::from_slice(iv), ciphertext)
                .map_err(|_| ProviderError::TagMismatch)
        }),
    }
}

/// CTR is its own inverse.
fn apply_ctr(key: &[u8], iv: &[u8], data: &[u8]) -> Result<Vec<u8>, ProviderError> {
    with_aes!(key, |C| {
        let mut cipher = ctr::Ctr128BE::<C>::new_from_slices(key, iv)
            .map_err(|_| iv_error(BlockMode::Ctr, iv))?;
        let mut buf = data.to_vec();
        cipher
            .try_apply_keystream(&mut buf)
            .map_err(|e| ProviderError::Primitive(format!("CTR keystream: {e}")))?;
        Ok(buf)
    })
}

fn check_padding(mode: BlockMode, padding: PaddingMode) -> Result<(), ProviderError> {
    if !mode.is_block_aligned() && !padding.is_none() {
        return Err(ProviderError::PaddingRejected(mode));
    }
    Ok(())
}

fn check_aligned(len: usize) -> Result<(), ProviderError> {
    if len % AES_BLOCK_SIZE != 0 {
        return Err(ProviderError::Misaligned {
            len,
            block_size: AES_BLOCK_SIZE,
        });
    }
    Ok(())
}

/// Returns the IV to use, empty for ECB.
fn check_iv(mode: BlockMode, iv: Option<&[u8]>) -> Result<&[u8], ProviderError> {
    match (mode.iv_len(), iv) {
        (None, None) => Ok(&[]),
        (None, Some(_)) => Err(ProviderError::UnexpectedIv(mode)),
        (Some(_), None) => Err(ProviderError::MissingIv(mode)),
        (Some(expected), Some(iv)) if iv.len() != expected => {
            Err(ProviderError::InvalidIvLength {
                mode,
                expected,
                got: iv.len(),
            })
        }
        (Some(_), Some(iv)) => Ok(iv),
    }
}

fn iv_error(mode: BlockMode, iv: &[u8]) -> ProviderError {
    ProviderError::InvalidIvLength {
        mode,
        expected: mode.iv_len().unwrap_or(0),
        got: iv.len(),
    }
}
