use serde::{Deserialize, Serialize};

/// Top-level CLI configuration (loaded from config.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SealConfig {
    pub logging: LoggingConfig,
    pub defaults: DefaultsConfig,
    pub kdf: KdfConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (default: info)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

/// Parameter choices used when the command line does not name one.
///
/// Names are kept as strings here and parsed by the algorithm catalog, so a
/// typo surfaces as a parameter error rather than a config parse failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Block mode for `encrypt` (default: CBC)
    pub block_mode: String,
    /// Padding mode for `encrypt` (default: PKCS7Padding)
    pub padding_mode: String,
    /// AES key length in bits for `encrypt` (default: 256)
    pub key_length: u32,
    /// Block mode for `pbe-encrypt` (default: GCM)
    pub pbe_block_mode: String,
    /// Padding mode for `pbe-encrypt` (default: NoPadding)
    pub pbe_padding_mode: String,
    /// Key derivation function for `pbe-encrypt` (default: SCRYPT)
    pub kdf: String,
    /// Algorithm for `hash` (default: SHA-256)
    pub hash_algorithm: String,
}

/// Argon2id cost parameters for `pbe-encrypt`.
///
/// PBKDF2 (1000 iterations) and scrypt (N=65536, r=128, p=1) run at fixed
/// costs and have no keys here; naming one is a parse error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KdfConfig {
    /// Argon2id memory cost in KiB (default: 65536 = 64 MiB)
    pub argon2_mem_cost_kib: u32,
    /// Argon2id time cost (default: 3)
    pub argon2_time_cost: u32,
    /// Argon2id parallelism (default: 4)
    pub argon2_parallelism: u32,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            block_mode: "CBC".into(),
            padding_mode: "PKCS7Padding".into(),
            key_length: 256,
            pbe_block_mode: "GCM".into(),
            pbe_padding_mode: "NoPadding".into(),
            kdf: "SCRYPT".into(),
            hash_algorithm: "SHA-256".into(),
        }
    }
}

impl Default for KdfConfig {
    fn default() -> Self {
        Self {
            argon2_mem_cost_kib: 65536,
            argon2_time_cost: 3,
            argon2_parallelism: 4,
        }
    }
}
