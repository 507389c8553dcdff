//! Key derivation: passphrase + salt → 256-bit AES key
//!
//! Three functions are offered for the password family: PBKDF2-HMAC-SHA256,
//! scrypt and Argon2id. PBKDF2 and scrypt encrypt at fixed costs; Argon2id
//! costs come from `[kdf]` configuration. The costs actually used are
//! persisted in the sidecar so decryption never depends on local
//! configuration.

use argon2::{Algorithm, Argon2, Params, Version};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use zeroize::Zeroize;

use sealfile_core::config::KdfConfig;
use sealfile_core::{SealError, SealResult};

use crate::catalog::KeyDerivationFunction;
use crate::{DERIVED_KEY_SIZE, SALT_SIZE};

/// A 256-bit key derived from a passphrase.
///
/// Zeroized on drop to prevent secrets lingering in memory.
#[derive(Clone)]
pub struct DerivedKey {
    bytes: [u8; DERIVED_KEY_SIZE],
}

impl DerivedKey {
    pub fn from_bytes(bytes: [u8; DERIVED_KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; DERIVED_KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for DerivedKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// PBKDF2-HMAC-SHA256 iteration count for new files.
pub const PBKDF2_ITERATIONS: u32 = 1000;
/// scrypt cost N for new files.
pub const SCRYPT_COST: u32 = 65536;
/// scrypt block size r for new files.
pub const SCRYPT_BLOCK_SIZE: u32 = 128;
/// scrypt parallelization p for new files.
pub const SCRYPT_PARALLELISM: u32 = 1;

/// Largest Argon2id memory cost accepted, in KiB (1 GiB).
pub const ARGON2_MAX_MEM_COST_KIB: u32 = 1 << 20;
pub const ARGON2_MAX_TIME_COST: u32 = 32;
pub const ARGON2_MAX_PARALLELISM: u32 = 16;

/// A key derivation function together with the costs it runs at.
///
/// Costs are bounded above: PBKDF2 and scrypt by their fixed values,
/// Argon2id by the `ARGON2_MAX_*` limits. Anything outside the bounds is a
/// configuration error, never an allocation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KdfSpec {
    Pbkdf2 {
        iterations: u32,
    },
    Scrypt {
        cost: u32,
        block_size: u32,
        parallelism: u32,
    },
    Argon2id {
        mem_cost_kib: u32,
        time_cost: u32,
        parallelism: u32,
    },
}

impl KdfSpec {
    /// The costs new files are encrypted with.
    ///
    /// PBKDF2 and scrypt are fixed; only Argon2id follows `config`.
    pub fn standard(function: KeyDerivationFunction, config: &KdfConfig) -> Self {
        match function {
            KeyDerivationFunction::Pbkdf2Sha256 => Self::Pbkdf2 {
                iterations: PBKDF2_ITERATIONS,
            },
            KeyDerivationFunction::Scrypt => Self::Scrypt {
                cost: SCRYPT_COST,
                block_size: SCRYPT_BLOCK_SIZE,
                parallelism: SCRYPT_PARALLELISM,
            },
            KeyDerivationFunction::Argon2id => Self::Argon2id {
                mem_cost_kib: config.argon2_mem_cost_kib,
                time_cost: config.argon2_time_cost,
                parallelism: config.argon2_parallelism,
            },
        }
    }

    pub fn function(&self) -> KeyDerivationFunction {
        match self {
            Self::Pbkdf2 { .. } => KeyDerivationFunction::Pbkdf2Sha256,
            Self::Scrypt { .. } => KeyDerivationFunction::Scrypt,
            Self::Argon2id { .. } => KeyDerivationFunction::Argon2id,
        }
    }

    /// True when PBKDF2 or scrypt run at exactly their fixed costs.
    /// Argon2id costs are configurable and always qualify.
    pub fn is_standard(&self) -> bool {
        match *self {
            Self::Pbkdf2 { iterations } => iterations == PBKDF2_ITERATIONS,
            Self::Scrypt {
                cost,
                block_size,
                parallelism,
            } => {
                cost == SCRYPT_COST
                    && block_size == SCRYPT_BLOCK_SIZE
                    && parallelism == SCRYPT_PARALLELISM
            }
            Self::Argon2id { .. } => true,
        }
    }

    /// Check the costs without running the KDF.
    pub fn validate(&self) -> SealResult<()> {
        match *self {
            Self::Pbkdf2 { iterations } => {
                bounded("PBKDF2 iterations", iterations, 1, PBKDF2_ITERATIONS)?;
            }
            Self::Scrypt { .. } => {
                self.scrypt_params()?;
            }
            Self::Argon2id { .. } => {
                self.argon2_params()?;
            }
        }
        Ok(())
    }

    fn scrypt_params(&self) -> SealResult<scrypt::Params> {
        let Self::Scrypt {
            cost,
            block_size,
            parallelism,
        } = *self
        else {
            return Err(SealError::config(format!("{} is not scrypt", self.function())));
        };
        if cost < 2 || !cost.is_power_of_two() {
            return Err(SealError::config(format!(
                "scrypt cost parameter must be a power of two greater than 1, got {cost}"
            )));
        }
        bounded("scrypt cost parameter", cost, 2, SCRYPT_COST)?;
        bounded("scrypt block size", block_size, 1, SCRYPT_BLOCK_SIZE)?;
        bounded("scrypt parallelism", parallelism, 1, SCRYPT_PARALLELISM)?;

        scrypt::Params::new(cost.trailing_zeros() as u8, block_size, parallelism, DERIVED_KEY_SIZE)
            .map_err(|e| SealError::config(format!("invalid scrypt params: {e}")))
    }

    fn argon2_params(&self) -> SealResult<Params> {
        let Self::Argon2id {
            mem_cost_kib,
            time_cost,
            parallelism,
        } = *self
        else {
            return Err(SealError::config(format!("{} is not Argon2id", self.function())));
        };
        bounded("Argon2id memory cost", mem_cost_kib, 1, ARGON2_MAX_MEM_COST_KIB)?;
        bounded("Argon2id time cost", time_cost, 1, ARGON2_MAX_TIME_COST)?;
        bounded("Argon2id parallelism", parallelism, 1, ARGON2_MAX_PARALLELISM)?;

        Params::new(mem_cost_kib, time_cost, parallelism, Some(DERIVED_KEY_SIZE))
            .map_err(|e| SealError::config(format!("invalid Argon2id params: {e}")))
    }
}

fn bounded(what: &str, value: u32, min: u32, max: u32) -> SealResult<()> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(SealError::config(format!(
            "{what} must be between {min} and {max}, got {value}"
        )))
    }
}

/// Derive a 256-bit key from a passphrase and salt.
///
/// The salt is 16 random bytes stored alongside the ciphertext; it does not
/// need to be secret.
pub fn derive_key(
    spec: &KdfSpec,
    passphrase: &SecretString,
    salt: &[u8; SALT_SIZE],
) -> SealResult<DerivedKey> {
    let password = passphrase.expose_secret().as_bytes();
    let mut key = [0u8; DERIVED_KEY_SIZE];

    match *spec {
        KdfSpec::Pbkdf2 { iterations } => {
            spec.validate()?;
            pbkdf2::pbkdf2_hmac::<Sha256>(password, salt, iterations, &mut key);
        }
        KdfSpec::Scrypt { .. } => {
            let scrypt_params = spec.scrypt_params()?;
            scrypt::scrypt(password, salt, &scrypt_params, &mut key)
                .map_err(|e| SealError::CryptoProvider(format!("scrypt KDF failed: {e}")))?;
        }
        KdfSpec::Argon2id { .. } => {
            let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, spec.argon2_params()?);
            argon2
                .hash_password_into(password, salt, &mut key)
                .map_err(|e| SealError::CryptoProvider(format!("Argon2id KDF failed: {e}")))?;
        }
    }

    tracing::debug!(kdf = %spec.function(), "derived passphrase key");
    let derived = DerivedKey::from_bytes(key);
    key.zeroize();
    Ok(derived)
}

/// Cheap costs for tests; never use these for real data.
#[cfg(test)]
pub(crate) fn test_spec(function: KeyDerivationFunction) -> KdfSpec {
    match function {
        KeyDerivationFunction::Pbkdf2Sha256 => KdfSpec::Pbkdf2 { iterations: 10 },
        KeyDerivationFunction::Scrypt => KdfSpec::Scrypt {
            cost: 1024,
            block_size: 8,
            parallelism: 1,
        },
        KeyDerivationFunction::Argon2id => KdfSpec::Argon2id {
            mem_cost_kib: 1024,
            time_cost: 1,
            parallelism: 1,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    #[test]
    fn test_kdf_deterministic() {
        let passphrase = SecretString::from("test-passphrase-123");
        let salt = [1u8; 16];

        for kdf in KeyDerivationFunction::ALL {
            let spec = test_spec(kdf);
            let key1 = derive_key(&spec, &passphrase, &salt).unwrap();
            let key2 = derive_key(&spec, &passphrase, &salt).unwrap();
            assert_eq!(key1.as_bytes(), key2.as_bytes(), "{kdf} must be deterministic");
        }
    }

    #[test]
    fn test_kdf_different_passphrases() {
        let salt = [1u8; 16];

        for kdf in KeyDerivationFunction::ALL {
            let spec = test_spec(kdf);
            let key1 = derive_key(&spec, &SecretString::from("passphrase-a"), &salt).unwrap();
            let key2 = derive_key(&spec, &SecretString::from("passphrase-b"), &salt).unwrap();
            assert_ne!(
                key1.as_bytes(),
                key2.as_bytes(),
                "different passphrases must produce different keys"
            );
        }
    }

    #[test]
    fn test_kdf_different_salts() {
        let passphrase = SecretString::from("same-passphrase");

        for kdf in KeyDerivationFunction::ALL {
            let spec = test_spec(kdf);
            let key1 = derive_key(&spec, &passphrase, &[1u8; 16]).unwrap();
            let key2 = derive_key(&spec, &passphrase, &[2u8; 16]).unwrap();
            assert_ne!(
                key1.as_bytes(),
                key2.as_bytes(),
                "different salts must produce different keys"
            );
        }
    }

    #[test]
    fn test_functions_disagree() {
        let passphrase = SecretString::from("pw");
        let salt = [9u8; 16];

        let a = derive_key(&test_spec(KeyDerivationFunction::Pbkdf2Sha256), &passphrase, &salt).unwrap();
        let b = derive_key(&test_spec(KeyDerivationFunction::Scrypt), &passphrase, &salt).unwrap();
        assert_ne!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn test_scrypt_cost_must_be_power_of_two() {
        let spec = KdfSpec::Scrypt {
            cost: 1000,
            block_size: 8,
            parallelism: 1,
        };
        let err = derive_key(&spec, &SecretString::from("pw"), &[0u8; 16]).unwrap_err();
        assert!(matches!(err, SealError::Configuration(_)));
    }

    #[test]
    fn test_zero_iterations_rejected() {
        assert!(KdfSpec::Pbkdf2 { iterations: 0 }.validate().is_err());
        assert!(test_spec(KeyDerivationFunction::Scrypt).validate().is_ok());
    }

    #[test]
    fn test_costs_above_bounds_rejected_before_running() {
        let oversized = [
            KdfSpec::Pbkdf2 {
                iterations: PBKDF2_ITERATIONS + 1,
            },
            KdfSpec::Scrypt {
                cost: 1 << 24,
                block_size: 8,
                parallelism: 1,
            },
            KdfSpec::Scrypt {
                cost: 1024,
                block_size: 4096,
                parallelism: 1,
            },
            KdfSpec::Scrypt {
                cost: 1024,
                block_size: 8,
                parallelism: 64,
            },
            KdfSpec::Argon2id {
                mem_cost_kib: u32::MAX,
                time_cost: 1,
                parallelism: 1,
            },
            KdfSpec::Argon2id {
                mem_cost_kib: 1024,
                time_cost: u32::MAX,
                parallelism: 1,
            },
            KdfSpec::Argon2id {
                mem_cost_kib: 1024,
                time_cost: 1,
                parallelism: 255,
            },
        ];
        for spec in oversized {
            let err = derive_key(&spec, &SecretString::from("pw"), &[0u8; 16]).unwrap_err();
            assert!(matches!(err, SealError::Configuration(_)), "{spec:?}: {err}");
        }
    }

    #[test]
    fn test_standard_costs_are_fixed() {
        let mut config = KdfConfig::default();
        config.argon2_time_cost = 5;

        assert_eq!(
            KdfSpec::standard(KeyDerivationFunction::Pbkdf2Sha256, &config),
            KdfSpec::Pbkdf2 { iterations: 1000 }
        );
        assert_eq!(
            KdfSpec::standard(KeyDerivationFunction::Scrypt, &config),
            KdfSpec::Scrypt {
                cost: 65536,
                block_size: 128,
                parallelism: 1
            }
        );
        assert_eq!(
            KdfSpec::standard(KeyDerivationFunction::Argon2id, &config),
            KdfSpec::Argon2id {
                mem_cost_kib: 65536,
                time_cost: 5,
                parallelism: 4
            }
        );

        for function in KeyDerivationFunction::ALL {
            let spec = KdfSpec::standard(function, &KdfConfig::default());
            assert!(spec.is_standard());
            assert!(spec.validate().is_ok());
            assert_eq!(spec.function(), function);
        }
    }

    #[test]
    fn test_cheap_costs_are_not_standard() {
        assert!(!test_spec(KeyDerivationFunction::Pbkdf2Sha256).is_standard());
        assert!(!test_spec(KeyDerivationFunction::Scrypt).is_standard());
        assert!(test_spec(KeyDerivationFunction::Argon2id).is_standard());
    }

    #[test]
    fn test_debug_redacts() {
        let key = DerivedKey::from_bytes([7u8; 32]);
        assert!(format!("{key:?}").contains("REDACTED"));
    }
}
