//! Password-based encryption
//!
//! The AES key is derived from a passphrase and a fresh 16-byte salt. Only
//! the salt, the KDF and its cost parameters, and the IV are returned for
//! persistence; the derived key and the passphrase never leave this module.

use secrecy::SecretString;

use sealfile_core::{SealError, SealResult};

use crate::catalog::{self, AlgorithmFamily};
use crate::kdf::{derive_key, KdfSpec};
use crate::keys::{generate_iv, generate_salt};
use crate::params::{CipherSelection, TransformationParameters};
use crate::provider::{self, reclassify, Direction, KeySource};

/// Encrypt under a passphrase-derived key.
///
/// PBKDF2 and scrypt must run at their fixed costs (see
/// [`KdfSpec::standard`]); any other PBKDF2 or scrypt costs are a
/// configuration error.
pub fn encrypt(
    plaintext: &[u8],
    selection: &CipherSelection,
    kdf: KdfSpec,
    passphrase: &SecretString,
) -> SealResult<(Vec<u8>, TransformationParameters)> {
    if !kdf.is_standard() {
        return Err(SealError::config(format!(
            "{} must run at its fixed cost parameters, got {kdf:?}",
            kdf.function()
        )));
    }
    encrypt_with_costs(plaintext, selection, kdf, passphrase)
}

/// [`encrypt`] for any in-bounds KDF costs.
pub(crate) fn encrypt_with_costs(
    plaintext: &[u8],
    selection: &CipherSelection,
    kdf: KdfSpec,
    passphrase: &SecretString,
) -> SealResult<(Vec<u8>, TransformationParameters)> {
    catalog::validate(
        AlgorithmFamily::AesPbe,
        selection.padding,
        selection.block_mode,
        selection.key_length_bits,
        Some(kdf.function()),
    )?;
    catalog::check_alignment(selection.block_mode, selection.padding, plaintext.len())?;
    kdf.validate()?;

    let salt = generate_salt();
    let key = derive_key(&kdf, passphrase, &salt)?;
    let iv = generate_iv(selection.block_mode);

    let ciphertext = provider::encrypt(
        selection.block_mode,
        selection.padding,
        key.as_bytes(),
        iv.as_deref(),
        plaintext,
    )
    .map_err(|e| reclassify(e, Direction::Encrypt, KeySource::Passphrase))?;

    tracing::debug!(
        block_mode = %selection.block_mode,
        padding = %selection.padding,
        kdf = %kdf.function(),
        plaintext_len = plaintext.len(),
        "password encrypt"
    );

    let params = TransformationParameters {
        family: AlgorithmFamily::AesPbe,
        padding: selection.padding,
        block_mode: selection.block_mode,
        key_length_bits: selection.key_length_bits,
        kdf: Some(kdf),
        salt: Some(salt),
        iv,
        key: None,
    };
    Ok((ciphertext, params))
}

/// Re-derive the key from `passphrase` and the recorded salt, then decrypt.
///
/// Any failure a wrong passphrase can cause is reported as
/// [`SealError::AuthenticationFailure`], including padding errors under CBC.
/// A corrupted file under CBC is therefore indistinguishable from a wrong
/// passphrase.
pub fn decrypt(
    ciphertext: &[u8],
    params: &TransformationParameters,
    passphrase: &SecretString,
) -> SealResult<Vec<u8>> {
    if params.family != AlgorithmFamily::AesPbe {
        return Err(SealError::config(format!(
            "expected password parameters, got {}",
            params.family
        )));
    }
    params.validate()?;

    let (Some(kdf), Some(salt)) = (params.kdf.as_ref(), params.salt.as_ref()) else {
        return Err(SealError::config("password parameters need a salt and a KDF"));
    };
    let key = derive_key(kdf, passphrase, salt)?;

    let plaintext = provider::decrypt(
        params.block_mode,
        params.padding,
        key.as_bytes(),
        params.iv.as_deref(),
        ciphertext,
    )
    .map_err(|e| reclassify(e, Direction::Decrypt, KeySource::Passphrase))?;

    tracing::debug!(
        block_mode = %params.block_mode,
        kdf = %kdf.function(),
        ciphertext_len = ciphertext.len(),
        "password decrypt"
    );
    Ok(plaintext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{BlockMode, KeyDerivationFunction, PaddingMode};
    use crate::kdf::test_spec;
    use crate::SALT_SIZE;
    use sealfile_core::config::KdfConfig;
    use sealfile_core::ErrorKind;

    fn pw(s: &str) -> SecretString {
        SecretString::from(s)
    }

    fn encrypt_fast(
        plaintext: &[u8],
        selection: &CipherSelection,
        function: KeyDerivationFunction,
        passphrase: &str,
    ) -> SealResult<(Vec<u8>, TransformationParameters)> {
        encrypt_with_costs(plaintext, selection, test_spec(function), &pw(passphrase))
    }

    #[test]
    fn test_roundtrip_every_catalog_combination() {
        let family = AlgorithmFamily::AesPbe;
        let unaligned: &[u8] = b"password protected contents";
        let aligned: &[u8] = b"exactly thirty-two bytes long!!!";

        for function in KeyDerivationFunction::ALL {
            for &mode in catalog::supported_block_modes(family) {
                for &padding in catalog::supported_padding_modes(family) {
                    if catalog::validate(family, padding, mode, 256, Some(function)).is_err() {
                        continue;
                    }
                    let plaintext = if mode.is_block_aligned() && padding.is_none() {
                        aligned
                    } else {
                        unaligned
                    };
                    let selection = CipherSelection::new(mode, padding, 256);
                    let (ct, params) =
                        encrypt_fast(plaintext, &selection, function, "correct horse").unwrap();
                    assert_ne!(ct.as_slice(), plaintext);
                    let pt = decrypt(&ct, &params, &pw("correct horse")).unwrap();
                    assert_eq!(pt, plaintext, "{function}/{mode}/{padding}");
                }
            }
        }
    }

    #[test]
    fn test_cbc_without_padding_rejects_unaligned_input() {
        let selection = CipherSelection::new(BlockMode::Cbc, PaddingMode::NoPadding, 256);
        for function in KeyDerivationFunction::ALL {
            let err = encrypt_fast(b"not sixteen-byte aligned", &selection, function, "pw")
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ParameterIncompatibility, "{function}");
        }
    }

    #[test]
    fn test_standard_pbkdf2_roundtrip() {
        let selection = CipherSelection::new(BlockMode::Gcm, PaddingMode::NoPadding, 256);
        let kdf = KdfSpec::standard(KeyDerivationFunction::Pbkdf2Sha256, &KdfConfig::default());
        let (ct, params) = encrypt(b"fixed cost", &selection, kdf, &pw("pw")).unwrap();
        assert_eq!(params.kdf, Some(KdfSpec::Pbkdf2 { iterations: 1000 }));
        assert_eq!(decrypt(&ct, &params, &pw("pw")).unwrap(), b"fixed cost");
    }

    #[test]
    fn test_non_standard_costs_rejected() {
        let selection = CipherSelection::new(BlockMode::Gcm, PaddingMode::NoPadding, 256);
        for kdf in [
            KdfSpec::Pbkdf2 { iterations: 1 },
            KdfSpec::Scrypt {
                cost: 1024,
                block_size: 8,
                parallelism: 1,
            },
        ] {
            let err = encrypt(b"x", &selection, kdf, &pw("pw")).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Configuration, "{kdf:?}");
        }
    }

    #[test]
    fn test_configured_argon2_costs_accepted() {
        let selection = CipherSelection::new(BlockMode::Cbc, PaddingMode::Pkcs7, 256);
        let config = KdfConfig {
            argon2_mem_cost_kib: 2048,
            argon2_time_cost: 1,
            argon2_parallelism: 1,
        };
        let kdf = KdfSpec::standard(KeyDerivationFunction::Argon2id, &config);
        let (ct, params) = encrypt(b"argon", &selection, kdf, &pw("pw")).unwrap();
        assert_eq!(decrypt(&ct, &params, &pw("pw")).unwrap(), b"argon");
    }

    #[test]
    fn test_persists_salt_never_key() {
        let selection = CipherSelection::new(BlockMode::Gcm, PaddingMode::NoPadding, 256);
        let (_, params) =
            encrypt_fast(b"x", &selection, KeyDerivationFunction::Pbkdf2Sha256, "pw").unwrap();

        assert!(params.key.is_none());
        assert_eq!(params.salt.unwrap().len(), SALT_SIZE);
        assert_eq!(params.iv.as_ref().unwrap().len(), 12);
        assert_eq!(
            params.kdf.as_ref().map(KdfSpec::function),
            Some(KeyDerivationFunction::Pbkdf2Sha256)
        );
    }

    #[test]
    fn test_fresh_salt_per_call() {
        let selection = CipherSelection::new(BlockMode::Gcm, PaddingMode::NoPadding, 256);
        let (ct1, p1) = encrypt_fast(b"same", &selection, KeyDerivationFunction::Scrypt, "pw").unwrap();
        let (ct2, p2) = encrypt_fast(b"same", &selection, KeyDerivationFunction::Scrypt, "pw").unwrap();
        assert_ne!(p1.salt, p2.salt);
        assert_ne!(ct1, ct2);
    }

    #[test]
    fn test_wrong_passphrase_gcm() {
        let selection = CipherSelection::new(BlockMode::Gcm, PaddingMode::NoPadding, 256);
        let (ct, params) =
            encrypt_fast(b"top secret", &selection, KeyDerivationFunction::Argon2id, "right")
                .unwrap();

        let err = decrypt(&ct, &params, &pw("wrong")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AuthenticationFailure);
    }

    #[test]
    fn test_wrong_passphrase_cbc_never_returns_plaintext() {
        let selection = CipherSelection::new(BlockMode::Cbc, PaddingMode::Pkcs7, 256);
        let (ct, params) =
            encrypt_fast(b"top secret", &selection, KeyDerivationFunction::Pbkdf2Sha256, "right")
                .unwrap();

        match decrypt(&ct, &params, &pw("wrong")) {
            Ok(pt) => assert_ne!(pt, b"top secret"),
            Err(err) => assert_eq!(err.kind(), ErrorKind::AuthenticationFailure),
        }
    }

    #[test]
    fn test_truncated_cbc_is_authentication_failure() {
        let selection = CipherSelection::new(BlockMode::Cbc, PaddingMode::Pkcs7, 256);
        let (ct, params) = encrypt_fast(
            b"0123456789abcdef0123",
            &selection,
            KeyDerivationFunction::Pbkdf2Sha256,
            "pw",
        )
        .unwrap();

        let err = decrypt(&ct[..ct.len() - 1], &params, &pw("pw")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AuthenticationFailure);
    }

    #[test]
    fn test_rejects_ecb_and_short_keys() {
        let ecb = CipherSelection::new(BlockMode::Ecb, PaddingMode::Pkcs7, 256);
        let err = encrypt_fast(b"x", &ecb, KeyDerivationFunction::Scrypt, "pw").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ParameterIncompatibility);

        let short = CipherSelection::new(BlockMode::Gcm, PaddingMode::NoPadding, 128);
        let err = encrypt_fast(b"x", &short, KeyDerivationFunction::Scrypt, "pw").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ParameterIncompatibility);
    }

    #[test]
    fn test_invalid_cost_parameter_is_configuration() {
        let selection = CipherSelection::new(BlockMode::Gcm, PaddingMode::NoPadding, 256);
        let kdf = KdfSpec::Scrypt {
            cost: 1000,
            block_size: 8,
            parallelism: 1,
        };
        let err = encrypt_with_costs(b"x", &selection, kdf, &pw("pw")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_oversized_recorded_cost_is_configuration() {
        let selection = CipherSelection::new(BlockMode::Gcm, PaddingMode::NoPadding, 256);
        let (ct, mut params) =
            encrypt_fast(b"x", &selection, KeyDerivationFunction::Argon2id, "pw").unwrap();
        params.kdf = Some(KdfSpec::Argon2id {
            mem_cost_kib: u32::MAX,
            time_cost: 1,
            parallelism: 1,
        });
        let err = decrypt(&ct, &params, &pw("pw")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_rejects_symmetric_parameters() {
        let selection = CipherSelection::new(BlockMode::Gcm, PaddingMode::NoPadding, 256);
        let (ct, params) = crate::symmetric::encrypt(b"x", &selection).unwrap();
        let err = decrypt(&ct, &params, &pw("pw")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }
}
