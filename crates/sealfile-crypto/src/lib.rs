//! sealfile-crypto: the transformation engine
//!
//! Four produce/reverse pairs, each a pure function of its explicit inputs:
//!
//! ```text
//! symmetric::encrypt  (bytes, selection)              -> (ciphertext, params{key, iv?})
//! symmetric::decrypt  (ciphertext, params)            -> plaintext
//! password::encrypt   (bytes, selection, kdf, pass)   -> (ciphertext, params{salt, kdf, iv?})
//! password::decrypt   (ciphertext, params, pass)      -> plaintext
//! hashing::hash       (bytes, algorithm)              -> HashRecord{digest, key?}
//! hashing::check_hash (bytes, record)                 -> bool
//! signing::sign       (bytes)                         -> SignatureRecord{signature, public_key}
//! signing::verify     (bytes, record)                 -> bool
//! ```
//!
//! Records are persisted through the codecs in [`artifact`]; AES itself is
//! driven by [`provider`], whose errors are reclassified into
//! [`sealfile_core::SealError`] before leaving an engine.

pub mod artifact;
pub mod catalog;
pub mod hashing;
pub mod kdf;
pub mod keys;
pub mod params;
pub mod password;
pub mod provider;
pub mod signing;
pub mod symmetric;

pub use artifact::{HashArtifact, SidecarArtifact, SignatureArtifact};
pub use catalog::{
    AlgorithmFamily, BlockMode, HashAlgorithm, IncompatibilityError, KeyDerivationFunction,
    PaddingMode,
};
pub use hashing::{check_hash, hash, HashRecord};
pub use kdf::{derive_key, DerivedKey, KdfSpec};
pub use keys::{generate_key, SymmetricKey};
pub use params::{CipherSelection, TransformationParameters};
pub use signing::{sign, verify, SignatureRecord};

/// Salt length for passphrase key derivation (128-bit)
pub const SALT_SIZE: usize = 16;

/// Length of a passphrase-derived key (256-bit)
pub const DERIVED_KEY_SIZE: usize = 32;

/// GCM nonce length (96-bit)
pub const GCM_NONCE_SIZE: usize = 12;

/// GCM authentication tag length, appended to the ciphertext
pub const GCM_TAG_SIZE: usize = 16;
