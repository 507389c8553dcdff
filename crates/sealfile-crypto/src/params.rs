//! Transformation parameters: everything needed to reverse an encryption

use sealfile_core::{SealError, SealResult};

use crate::catalog::{self, AlgorithmFamily, BlockMode, PaddingMode};
use crate::kdf::KdfSpec;
use crate::keys::SymmetricKey;
use crate::SALT_SIZE;

/// What the caller asks for when encrypting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CipherSelection {
    pub padding: PaddingMode,
    pub block_mode: BlockMode,
    pub key_length_bits: u32,
}

impl CipherSelection {
    pub fn new(block_mode: BlockMode, padding: PaddingMode, key_length_bits: u32) -> Self {
        Self {
            padding,
            block_mode,
            key_length_bits,
        }
    }
}

/// The full parameter set of one encryption.
///
/// Shape depends on the family: `Aes` carries the generated `key` and no
/// salt, `AesPbe` carries a `salt` plus `kdf` and never a key. `iv` is
/// present exactly when the block mode uses one.
#[derive(Debug, Clone)]
pub struct TransformationParameters {
    pub family: AlgorithmFamily,
    pub padding: PaddingMode,
    pub block_mode: BlockMode,
    pub key_length_bits: u32,
    pub kdf: Option<KdfSpec>,
    pub salt: Option<[u8; SALT_SIZE]>,
    pub iv: Option<Vec<u8>>,
    pub key: Option<SymmetricKey>,
}

impl TransformationParameters {
    pub fn selection(&self) -> CipherSelection {
        CipherSelection::new(self.block_mode, self.padding, self.key_length_bits)
    }

    /// Check the catalog combination, the KDF cost bounds, and that the
    /// fields present match the family and block mode.
    pub fn validate(&self) -> SealResult<()> {
        catalog::validate(
            self.family,
            self.padding,
            self.block_mode,
            self.key_length_bits,
            self.kdf.as_ref().map(KdfSpec::function),
        )?;
        if let Some(kdf) = &self.kdf {
            kdf.validate()?;
        }

        match self.family {
            AlgorithmFamily::Aes => {
                let key = self
                    .key
                    .as_ref()
                    .ok_or_else(|| SealError::config("missing key for AES parameters"))?;
                if key.len_bits() != self.key_length_bits {
                    return Err(SealError::config(format!(
                        "key is {} bits but keyLength says {}",
                        key.len_bits(),
                        self.key_length_bits
                    )));
                }
                if self.salt.is_some() {
                    return Err(SealError::config("AES parameters must not carry a salt"));
                }
            }
            AlgorithmFamily::AesPbe => {
                if self.salt.is_none() {
                    return Err(SealError::config("missing salt for password parameters"));
                }
                if self.key.is_some() {
                    return Err(SealError::config(
                        "password parameters must not carry a key",
                    ));
                }
            }
        }

        match (self.block_mode.iv_len(), self.iv.as_deref()) {
            (Some(_), None) => Err(SealError::config(format!(
                "missing iv for {}",
                self.block_mode
            ))),
            (Some(expected), Some(iv)) if iv.len() != expected => Err(SealError::config(format!(
                "iv for {} must be {expected} bytes, got {}",
                self.block_mode,
                iv.len()
            ))),
            (None, Some(_)) => Err(SealError::config(format!(
                "{} does not use an iv",
                self.block_mode
            ))),
            _ => Ok(()),
        }
    }
}
