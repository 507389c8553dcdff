//! Artifact codecs: the encryption sidecar, hash and signature records
//!
//! All three are JSON objects with camelCase keys whose values are strings;
//! binary fields are standard base64.
//!
//! ```json
//! { "algorithm": "AES", "paddingMode": "PKCS7Padding", "blockMode": "CBC",
//!   "keyLength": "256", "iv": "…", "key": "…" }
//!
//! { "algorithm": "AES", "paddingMode": "NoPadding", "blockMode": "GCM",
//!   "keyLength": "256", "keyDerivationFunction": "SCRYPT",
//!   "costParameter": "65536", "blockSize": "128", "parallelism": "1",
//!   "salt": "…", "iv": "…" }
//! ```
//!
//! Password sidecars carry the KDF cost parameters that were used:
//! `iterations` (PBKDF2 count, Argon2id passes), `costParameter` (scrypt N),
//! `blockSize` (scrypt r), `parallelism` (scrypt p, Argon2id lanes) and
//! `memoryCost` (Argon2id KiB). A missing cost field falls back to the
//! default for that KDF; a cost above the accepted bounds is rejected.

use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use sealfile_core::config::KdfConfig;
use sealfile_core::{SealError, SealResult};

use crate::catalog::{AlgorithmFamily, BlockMode, HashAlgorithm, KeyDerivationFunction, PaddingMode};
use crate::hashing::HashRecord;
use crate::kdf::KdfSpec;
use crate::keys::SymmetricKey;
use crate::params::TransformationParameters;
use crate::signing::SignatureRecord;
use crate::SALT_SIZE;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SidecarArtifact {
    pub algorithm: String,
    pub padding_mode: String,
    pub block_mode: String,
    pub key_length: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_derivation_function: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iterations: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_parameter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallelism: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_cost: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iv: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HashArtifact {
    pub hash_algorithm: String,
    pub hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureArtifact {
    pub signature: String,
    pub public_key: String,
}

impl SidecarArtifact {
    pub fn from_params(params: &TransformationParameters) -> Self {
        let mut artifact = Self {
            algorithm: params.family.cipher_name().to_string(),
            padding_mode: params.padding.as_str().to_string(),
            block_mode: params.block_mode.as_str().to_string(),
            key_length: params.key_length_bits.to_string(),
            salt: params.salt.as_ref().map(|s| BASE64.encode(s)),
            iv: params.iv.as_ref().map(|iv| BASE64.encode(iv)),
            key: params.key.as_ref().map(|k| BASE64.encode(k.as_bytes())),
            ..Self::default()
        };

        if let Some(kdf) = &params.kdf {
            artifact.key_derivation_function = Some(kdf.function().as_str().to_string());
            match *kdf {
                KdfSpec::Pbkdf2 { iterations } => {
                    artifact.iterations = Some(iterations.to_string());
                }
                KdfSpec::Scrypt {
                    cost,
                    block_size,
                    parallelism,
                } => {
                    artifact.cost_parameter = Some(cost.to_string());
                    artifact.block_size = Some(block_size.to_string());
                    artifact.parallelism = Some(parallelism.to_string());
                }
                KdfSpec::Argon2id {
                    mem_cost_kib,
                    time_cost,
                    parallelism,
                } => {
                    artifact.iterations = Some(time_cost.to_string());
                    artifact.memory_cost = Some(mem_cost_kib.to_string());
                    artifact.parallelism = Some(parallelism.to_string());
                }
            }
        }
        artifact
    }

    /// Rebuild the parameter record.
    ///
    /// The family follows from which secret-side field is present: `key`
    /// for AES, `salt` for AESPBE.
    pub fn to_params(&self) -> SealResult<TransformationParameters> {
        if !self
            .algorithm
            .eq_ignore_ascii_case(AlgorithmFamily::Aes.cipher_name())
        {
            return Err(SealError::config(format!(
                "unsupported algorithm '{}'",
                self.algorithm
            )));
        }

        let family = match (&self.key, &self.salt) {
            (Some(_), None) => AlgorithmFamily::Aes,
            (None, Some(_)) => AlgorithmFamily::AesPbe,
            (Some(_), Some(_)) => {
                return Err(SealError::config("sidecar carries both a key and a salt"))
            }
            (None, None) => return Err(SealError::config("sidecar carries neither a key nor a salt")),
        };

        let padding: PaddingMode = parse_name("paddingMode", &self.padding_mode)?;
        let block_mode: BlockMode = parse_name("blockMode", &self.block_mode)?;
        let key_length_bits: u32 = parse_number("keyLength", &self.key_length)?;

        let salt = match &self.salt {
            Some(encoded) => {
                let bytes = decode_b64("salt", encoded)?;
                let salt: [u8; SALT_SIZE] = bytes.as_slice().try_into().map_err(|_| {
                    SealError::config(format!("salt must be {SALT_SIZE} bytes, got {}", bytes.len()))
                })?;
                Some(salt)
            }
            None => None,
        };
        let iv = self.iv.as_deref().map(|iv| decode_b64("iv", iv)).transpose()?;
        let key = self
            .key
            .as_deref()
            .map(|k| decode_b64("key", k).map(SymmetricKey::from_bytes))
            .transpose()?;

        let kdf = match (family, &self.key_derivation_function) {
            (AlgorithmFamily::AesPbe, Some(name)) => {
                Some(self.kdf_spec(parse_name("keyDerivationFunction", name)?)?)
            }
            (AlgorithmFamily::AesPbe, None) => {
                return Err(SealError::config("sidecar is missing keyDerivationFunction"))
            }
            (AlgorithmFamily::Aes, Some(_)) => {
                return Err(SealError::config("keyDerivationFunction given for a keyed sidecar"))
            }
            (AlgorithmFamily::Aes, None) => None,
        };

        let params = TransformationParameters {
            family,
            padding,
            block_mode,
            key_length_bits,
            kdf,
            salt,
            iv,
            key,
        };
        params.validate()?;
        Ok(params)
    }

    fn kdf_spec(&self, function: KeyDerivationFunction) -> SealResult<KdfSpec> {
        let field = |name: &str, value: &Option<String>, default: u32| -> SealResult<u32> {
            value.as_deref().map_or(Ok(default), |v| parse_number(name, v))
        };

        let spec = match KdfSpec::standard(function, &KdfConfig::default()) {
            KdfSpec::Pbkdf2 { iterations } => KdfSpec::Pbkdf2 {
                iterations: field("iterations", &self.iterations, iterations)?,
            },
            KdfSpec::Scrypt {
                cost,
                block_size,
                parallelism,
            } => KdfSpec::Scrypt {
                cost: field("costParameter", &self.cost_parameter, cost)?,
                block_size: field("blockSize", &self.block_size, block_size)?,
                parallelism: field("parallelism", &self.parallelism, parallelism)?,
            },
            KdfSpec::Argon2id {
                mem_cost_kib,
                time_cost,
                parallelism,
            } => KdfSpec::Argon2id {
                mem_cost_kib: field("memoryCost", &self.memory_cost, mem_cost_kib)?,
                time_cost: field("iterations", &self.iterations, time_cost)?,
                parallelism: field("parallelism", &self.parallelism, parallelism)?,
            },
        };
        spec.validate()?;
        Ok(spec)
    }

    pub fn to_bytes(&self) -> SealResult<Vec<u8>> {
        to_json(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> SealResult<Self> {
        from_json("sidecar", bytes)
    }
}

impl HashArtifact {
    pub fn from_record(record: &HashRecord) -> Self {
        Self {
            hash_algorithm: record.algorithm.as_str().to_string(),
            hash: BASE64.encode(&record.digest),
            key: record.key.as_ref().map(|k| BASE64.encode(k.as_bytes())),
        }
    }

    pub fn to_record(&self) -> SealResult<HashRecord> {
        Ok(HashRecord {
            algorithm: parse_name::<HashAlgorithm>("hashAlgorithm", &self.hash_algorithm)?,
            digest: decode_b64("hash", &self.hash)?,
            key: self
                .key
                .as_deref()
                .map(|k| decode_b64("key", k).map(SymmetricKey::from_bytes))
                .transpose()?,
        })
    }

    pub fn to_bytes(&self) -> SealResult<Vec<u8>> {
        to_json(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> SealResult<Self> {
        from_json("hash artifact", bytes)
    }
}

impl SignatureArtifact {
    pub fn from_record(record: &SignatureRecord) -> Self {
        Self {
            signature: BASE64.encode(&record.signature),
            public_key: BASE64.encode(&record.public_key),
        }
    }

    pub fn to_record(&self) -> SealResult<SignatureRecord> {
        Ok(SignatureRecord {
            signature: decode_b64("signature", &self.signature)?,
            public_key: decode_b64("publicKey", &self.public_key)?,
        })
    }

    pub fn to_bytes(&self) -> SealResult<Vec<u8>> {
        to_json(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> SealResult<Self> {
        from_json("signature artifact", bytes)
    }
}

fn to_json<T: Serialize>(value: &T) -> SealResult<Vec<u8>> {
    let mut bytes = serde_json::to_vec_pretty(value)
        .map_err(|e| SealError::config(format!("serializing artifact: {e}")))?;
    bytes.push(b'\n');
    Ok(bytes)
}

fn from_json<T: DeserializeOwned>(what: &str, bytes: &[u8]) -> SealResult<T> {
    serde_json::from_slice(bytes).map_err(|e| SealError::config(format!("invalid {what}: {e}")))
}

fn decode_b64(field: &str, value: &str) -> SealResult<Vec<u8>> {
    BASE64
        .decode(value.trim())
        .map_err(|e| SealError::config(format!("{field} is not valid base64: {e}")))
}

fn parse_name<T>(field: &str, value: &str) -> SealResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| SealError::config(format!("{field}: {e}")))
}

fn parse_number(field: &str, value: &str) -> SealResult<u32> {
    value
        .trim()
        .parse()
        .map_err(|_| SealError::config(format!("{field} must be an integer, got '{value}'")))
}
