//! Algorithm catalog: which padding modes, block modes, key lengths and KDFs
//! each algorithm family accepts, and the rules for combining them.
//!
//! ```text
//! family   block modes          padding                      key bits       KDF
//! AES      CBC ECB CTR GCM      NoPadding PKCS7 ISO7816 X923 128 192 256    -
//! AESPBE   GCM CBC              NoPadding PKCS7 ISO7816 X923 256            SHA256 SCRYPT ARGON2ID
//! ```
//!
//! GCM and CTR never pad. ECB and CBC with `NoPadding` need block-aligned
//! input, which can only be checked once the input length is known
//! ([`check_alignment`]).

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// AES block size in bytes
pub const AES_BLOCK_SIZE: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlgorithmFamily {
    /// AES with a freshly generated key
    Aes,
    /// AES with a key derived from a passphrase
    AesPbe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockMode {
    Ecb,
    Cbc,
    Ctr,
    Gcm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaddingMode {
    NoPadding,
    Pkcs7,
    Iso7816,
    AnsiX923,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyDerivationFunction {
    /// PBKDF2-HMAC-SHA256
    Pbkdf2Sha256,
    Scrypt,
    Argon2id,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    Sha256,
    AesCmac,
    HmacSha256,
    Blake3,
}

/// A name that matches no catalog entry.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown {kind} '{value}' (expected one of: {expected})")]
pub struct ParseNameError {
    kind: &'static str,
    value: String,
    expected: String,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IncompatibilityError {
    #[error("{family} does not support block mode {block_mode}")]
    UnsupportedBlockMode {
        family: AlgorithmFamily,
        block_mode: BlockMode,
    },

    #[error("{family} does not support padding mode {padding}")]
    UnsupportedPadding {
        family: AlgorithmFamily,
        padding: PaddingMode,
    },

    #[error("{family} does not support a {bits}-bit key")]
    UnsupportedKeyLength { family: AlgorithmFamily, bits: u32 },

    #[error("{family} does not use key derivation function {kdf}")]
    UnsupportedKdf {
        family: AlgorithmFamily,
        kdf: KeyDerivationFunction,
    },

    #[error("{family} requires a key derivation function")]
    MissingKdf { family: AlgorithmFamily },

    #[error("only NoPadding can be used with {block_mode}, got {padding}")]
    PaddingNotAllowed {
        block_mode: BlockMode,
        padding: PaddingMode,
    },

    #[error(
        "{block_mode} without padding needs input aligned to {block_size} bytes, got {len} bytes; choose a padding mode"
    )]
    Misaligned {
        block_mode: BlockMode,
        len: usize,
        block_size: usize,
    },
}

impl From<IncompatibilityError> for sealfile_core::SealError {
    fn from(err: IncompatibilityError) -> Self {
        sealfile_core::SealError::ParameterIncompatibility(err.to_string())
    }
}

impl AlgorithmFamily {
    pub const ALL: [AlgorithmFamily; 2] = [AlgorithmFamily::Aes, AlgorithmFamily::AesPbe];

    pub fn as_str(self) -> &'static str {
        self.names()[0]
    }

    fn names(self) -> &'static [&'static str] {
        match self {
            AlgorithmFamily::Aes => &["AES"],
            AlgorithmFamily::AesPbe => &["AESPBE"],
        }
    }

    /// Cipher name recorded in the sidecar `algorithm` field.
    pub fn cipher_name(self) -> &'static str {
        "AES"
    }
}

impl BlockMode {
    pub const ALL: [BlockMode; 4] = [BlockMode::Ecb, BlockMode::Cbc, BlockMode::Ctr, BlockMode::Gcm];

    pub fn as_str(self) -> &'static str {
        self.names()[0]
    }

    fn names(self) -> &'static [&'static str] {
        match self {
            BlockMode::Ecb => &["ECB"],
            BlockMode::Cbc => &["CBC"],
            BlockMode::Ctr => &["CTR"],
            BlockMode::Gcm => &["GCM"],
        }
    }

    /// Produces and checks an authentication tag.
    pub fn is_authenticated(self) -> bool {
        matches!(self, BlockMode::Gcm)
    }

    /// IV / nonce length in bytes, `None` for modes without one.
    pub fn iv_len(self) -> Option<usize> {
        match self {
            BlockMode::Ecb => None,
            BlockMode::Cbc | BlockMode::Ctr => Some(AES_BLOCK_SIZE),
            BlockMode::Gcm => Some(crate::GCM_NONCE_SIZE),
        }
    }

    /// Operates on whole blocks, so either pads or needs aligned input.
    pub fn is_block_aligned(self) -> bool {
        matches!(self, BlockMode::Ecb | BlockMode::Cbc)
    }
}

impl PaddingMode {
    pub const ALL: [PaddingMode; 4] = [
        PaddingMode::NoPadding,
        PaddingMode::Pkcs7,
        PaddingMode::Iso7816,
        PaddingMode::AnsiX923,
    ];

    pub fn as_str(self) -> &'static str {
        self.names()[0]
    }

    fn names(self) -> &'static [&'static str] {
        match self {
            PaddingMode::NoPadding => &["NoPadding", "None"],
            PaddingMode::Pkcs7 => &["PKCS7Padding", "PKCS5Padding", "PKCS7", "PKCS5"],
            PaddingMode::Iso7816 => &["ISO7816-4Padding", "ISO7816"],
            PaddingMode::AnsiX923 => &["X923Padding", "X923"],
        }
    }

    pub fn is_none(self) -> bool {
        self == PaddingMode::NoPadding
    }
}

impl KeyDerivationFunction {
    pub const ALL: [KeyDerivationFunction; 3] = [
        KeyDerivationFunction::Pbkdf2Sha256,
        KeyDerivationFunction::Scrypt,
        KeyDerivationFunction::Argon2id,
    ];

    pub fn as_str(self) -> &'static str {
        self.names()[0]
    }

    fn names(self) -> &'static [&'static str] {
        match self {
            KeyDerivationFunction::Pbkdf2Sha256 => &["SHA256", "PBKDF2", "PBKDF2WithHmacSHA256"],
            KeyDerivationFunction::Scrypt => &["SCRYPT"],
            KeyDerivationFunction::Argon2id => &["ARGON2ID", "ARGON2"],
        }
    }
}

impl HashAlgorithm {
    pub const ALL: [HashAlgorithm; 4] = [
        HashAlgorithm::Sha256,
        HashAlgorithm::AesCmac,
        HashAlgorithm::HmacSha256,
        HashAlgorithm::Blake3,
    ];

    pub fn as_str(self) -> &'static str {
        self.names()[0]
    }

    fn names(self) -> &'static [&'static str] {
        match self {
            HashAlgorithm::Sha256 => &["SHA-256"],
            HashAlgorithm::AesCmac => &["AESCMAC", "CMAC"],
            HashAlgorithm::HmacSha256 => &["HMACSHA256", "HMAC"],
            HashAlgorithm::Blake3 => &["BLAKE3"],
        }
    }

    /// MAC variants need a secret key alongside the digest.
    pub fn is_keyed(self) -> bool {
        matches!(self, HashAlgorithm::AesCmac | HashAlgorithm::HmacSha256)
    }
}

/// Block modes `family` accepts; the first entry is the preferred default.
pub fn supported_block_modes(family: AlgorithmFamily) -> &'static [BlockMode] {
    match family {
        AlgorithmFamily::Aes => &[BlockMode::Cbc, BlockMode::Ecb, BlockMode::Ctr, BlockMode::Gcm],
        AlgorithmFamily::AesPbe => &[BlockMode::Gcm, BlockMode::Cbc],
    }
}

pub fn supported_padding_modes(_family: AlgorithmFamily) -> &'static [PaddingMode] {
    &PaddingMode::ALL
}

pub fn supported_key_lengths(family: AlgorithmFamily) -> &'static [u32] {
    match family {
        AlgorithmFamily::Aes => &[128, 192, 256],
        AlgorithmFamily::AesPbe => &[256],
    }
}

/// Empty for families that do not derive keys from a passphrase.
pub fn supported_kdfs(family: AlgorithmFamily) -> &'static [KeyDerivationFunction] {
    match family {
        AlgorithmFamily::Aes => &[],
        AlgorithmFamily::AesPbe => &KeyDerivationFunction::ALL,
    }
}

pub fn supported_hash_algorithms() -> &'static [HashAlgorithm] {
    &HashAlgorithm::ALL
}

/// Check a requested combination against the catalog.
///
/// Input-dependent rules (alignment) are checked by [`check_alignment`].
pub fn validate(
    family: AlgorithmFamily,
    padding: PaddingMode,
    block_mode: BlockMode,
    key_length_bits: u32,
    kdf: Option<KeyDerivationFunction>,
) -> Result<(), IncompatibilityError> {
    if !supported_block_modes(family).contains(&block_mode) {
        return Err(IncompatibilityError::UnsupportedBlockMode { family, block_mode });
    }
    if !supported_padding_modes(family).contains(&padding) {
        return Err(IncompatibilityError::UnsupportedPadding { family, padding });
    }
    if !supported_key_lengths(family).contains(&key_length_bits) {
        return Err(IncompatibilityError::UnsupportedKeyLength {
            family,
            bits: key_length_bits,
        });
    }

    let kdfs = supported_kdfs(family);
    match kdf {
        Some(kdf) if !kdfs.contains(&kdf) => {
            return Err(IncompatibilityError::UnsupportedKdf { family, kdf });
        }
        None if !kdfs.is_empty() => return Err(IncompatibilityError::MissingKdf { family }),
        _ => {}
    }

    if !block_mode.is_block_aligned() && !padding.is_none() {
        return Err(IncompatibilityError::PaddingNotAllowed {
            block_mode,
            padding,
        });
    }

    Ok(())
}

/// Reject unpadded input that a block-aligned mode cannot process.
pub fn check_alignment(
    block_mode: BlockMode,
    padding: PaddingMode,
    len: usize,
) -> Result<(), IncompatibilityError> {
    if block_mode.is_block_aligned() && padding.is_none() && len % AES_BLOCK_SIZE != 0 {
        return Err(IncompatibilityError::Misaligned {
            block_mode,
            len,
            block_size: AES_BLOCK_SIZE,
        });
    }
    Ok(())
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '-' | '_' | ' '))
        .flat_map(char::to_uppercase)
        .collect()
}

fn lookup<T: Copy>(
    kind: &'static str,
    value: &str,
    all: &[T],
    names: fn(T) -> &'static [&'static str],
) -> Result<T, ParseNameError> {
    let wanted = normalize(value);
    all.iter()
        .copied()
        .find(|v| names(*v).iter().any(|n| normalize(n) == wanted))
        .ok_or_else(|| ParseNameError {
            kind,
            value: value.to_string(),
            expected: all
                .iter()
                .map(|v| names(*v)[0])
                .collect::<Vec<_>>()
                .join(", "),
        })
}

macro_rules! impl_name_traits {
    ($ty:ty, $kind:literal) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = ParseNameError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                lookup($kind, s, &<$ty>::ALL, <$ty>::names)
            }
        }
    };
}

impl_name_traits!(AlgorithmFamily, "algorithm family");
impl_name_traits!(BlockMode, "block mode");
impl_name_traits!(PaddingMode, "padding mode");
impl_name_traits!(KeyDerivationFunction, "key derivation function");
impl_name_traits!(HashAlgorithm, "hash algorithm");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_canonical_names() {
        for mode in BlockMode::ALL {
            assert_eq!(mode.as_str().parse::<BlockMode>().unwrap(), mode);
        }
        for padding in PaddingMode::ALL {
            assert_eq!(padding.as_str().parse::<PaddingMode>().unwrap(), padding);
        }
        for kdf in KeyDerivationFunction::ALL {
            assert_eq!(kdf.as_str().parse::<KeyDerivationFunction>().unwrap(), kdf);
        }
        for algo in HashAlgorithm::ALL {
            assert_eq!(algo.as_str().parse::<HashAlgorithm>().unwrap(), algo);
        }
    }

    #[test]
    fn test_parse_aliases_and_case() {
        assert_eq!("PKCS5Padding".parse::<PaddingMode>().unwrap(), PaddingMode::Pkcs7);
        assert_eq!("iso7816-4padding".parse::<PaddingMode>().unwrap(), PaddingMode::Iso7816);
        assert_eq!("gcm".parse::<BlockMode>().unwrap(), BlockMode::Gcm);
        assert_eq!("SHA256".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha256);
        assert_eq!(
            "pbkdf2".parse::<KeyDerivationFunction>().unwrap(),
            KeyDerivationFunction::Pbkdf2Sha256
        );
    }

    #[test]
    fn test_parse_unknown_name() {
        let err = "OFB".parse::<BlockMode>().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("OFB"));
        assert!(msg.contains("GCM"));
    }

    #[test]
    fn test_password_family_restrictions() {
        assert_eq!(
            supported_block_modes(AlgorithmFamily::AesPbe),
            &[BlockMode::Gcm, BlockMode::Cbc]
        );
        assert_eq!(supported_key_lengths(AlgorithmFamily::AesPbe), &[256u32]);
        assert!(supported_kdfs(AlgorithmFamily::Aes).is_empty());
        assert_eq!(supported_kdfs(AlgorithmFamily::AesPbe).len(), 3);
    }

    #[test]
    fn test_authenticated_mode_rejects_padding() {
        let err = validate(
            AlgorithmFamily::Aes,
            PaddingMode::Pkcs7,
            BlockMode::Gcm,
            256,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, IncompatibilityError::PaddingNotAllowed { .. }));
    }

    #[test]
    fn test_stream_mode_rejects_padding() {
        let err = validate(
            AlgorithmFamily::Aes,
            PaddingMode::AnsiX923,
            BlockMode::Ctr,
            128,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, IncompatibilityError::PaddingNotAllowed { .. }));
    }

    #[test]
    fn test_unsupported_key_length() {
        let err = validate(
            AlgorithmFamily::AesPbe,
            PaddingMode::NoPadding,
            BlockMode::Gcm,
            128,
            Some(KeyDerivationFunction::Scrypt),
        )
        .unwrap_err();
        assert_eq!(
            err,
            IncompatibilityError::UnsupportedKeyLength {
                family: AlgorithmFamily::AesPbe,
                bits: 128
            }
        );
    }

    #[test]
    fn test_kdf_presence_rules() {
        assert!(matches!(
            validate(AlgorithmFamily::AesPbe, PaddingMode::NoPadding, BlockMode::Gcm, 256, None),
            Err(IncompatibilityError::MissingKdf { .. })
        ));
        assert!(matches!(
            validate(
                AlgorithmFamily::Aes,
                PaddingMode::NoPadding,
                BlockMode::Gcm,
                256,
                Some(KeyDerivationFunction::Scrypt)
            ),
            Err(IncompatibilityError::UnsupportedKdf { .. })
        ));
    }

    #[test]
    fn test_password_family_rejects_ecb() {
        assert!(matches!(
            validate(
                AlgorithmFamily::AesPbe,
                PaddingMode::Pkcs7,
                BlockMode::Ecb,
                256,
                Some(KeyDerivationFunction::Pbkdf2Sha256)
            ),
            Err(IncompatibilityError::UnsupportedBlockMode { .. })
        ));
    }

    #[test]
    fn test_valid_combinations() {
        for family in AlgorithmFamily::ALL {
            let kdf = supported_kdfs(family).first().copied();
            for &mode in supported_block_modes(family) {
                for &bits in supported_key_lengths(family) {
                    assert!(validate(family, PaddingMode::NoPadding, mode, bits, kdf).is_ok());
                    if mode.is_block_aligned() {
                        assert!(validate(family, PaddingMode::Pkcs7, mode, bits, kdf).is_ok());
                    }
                }
            }
        }
    }

    #[test]
    fn test_alignment() {
        assert!(check_alignment(BlockMode::Cbc, PaddingMode::NoPadding, 32).is_ok());
        assert!(check_alignment(BlockMode::Cbc, PaddingMode::NoPadding, 0).is_ok());
        assert!(check_alignment(BlockMode::Cbc, PaddingMode::Pkcs7, 5).is_ok());
        assert!(check_alignment(BlockMode::Gcm, PaddingMode::NoPadding, 5).is_ok());
        assert!(check_alignment(BlockMode::Ctr, PaddingMode::NoPadding, 7).is_ok());
        assert_eq!(
            check_alignment(BlockMode::Ecb, PaddingMode::NoPadding, 5),
            Err(IncompatibilityError::Misaligned {
                block_mode: BlockMode::Ecb,
                len: 5,
                block_size: 16
            })
        );
    }
}
