//! sealfile: encrypt, hash or sign a single file
//!
//! Commands:
//!   encrypt <file>        - AES with a generated key → <file>.encrypted + sidecar
//!   decrypt <file>        - reverse `encrypt` using the sidecar
//!   pbe-encrypt <file>    - AES with a passphrase-derived key
//!   pbe-decrypt <file>    - reverse `pbe-encrypt`
//!   hash <file>           - digest or MAC → <file>_hash.json
//!   check-hash <file>     - recompute and compare (exit 1 on mismatch)
//!   sign <file>           - Ed25519 signature → <file>_sig.json
//!   verify <file>         - check the signature (exit 1 on mismatch)
//!   catalog               - supported modes, paddings, key lengths, KDFs
//!   config show           - display the effective configuration

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use secrecy::SecretString;
use zeroize::Zeroize;

use sealfile_core::config::SealConfig;
use sealfile_core::{ErrorKind, SealError};
use sealfile_crypto::catalog::{self, AlgorithmFamily};
use sealfile_crypto::{
    BlockMode, CipherSelection, HashAlgorithm, KdfSpec, KeyDerivationFunction,
    PaddingMode,
};

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "sealfile",
    version,
    about = "Encrypt, hash or sign a single file",
    long_about = "sealfile: reversible file transforms with a self-describing JSON sidecar"
)]
struct Cli {
    /// Path to config.toml
    #[arg(
        long,
        short = 'c',
        env = "SEALFILE_CONFIG",
        default_value = "~/.config/sealfile/config.toml"
    )]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides [logging] level
    #[arg(long, env = "SEALFILE_LOG")]
    log: Option<String>,

    /// Log format; overrides [logging] format
    #[arg(long, env = "SEALFILE_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq)]
enum LogFormat {
    Json,
    Text,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Encrypt a file with a freshly generated AES key
    ///
    /// The key is stored in the sidecar (<file>.encrypted.json); keep it as
    /// safe as you would the plaintext.
    Encrypt {
        input: PathBuf,
        /// CBC, ECB, CTR or GCM (default from config)
        #[arg(long, short = 'm')]
        block_mode: Option<BlockMode>,
        /// NoPadding, PKCS7Padding, ISO7816-4Padding or X923Padding
        #[arg(long, short = 'p')]
        padding: Option<PaddingMode>,
        /// 128, 192 or 256
        #[arg(long, short = 'k')]
        key_length: Option<u32>,
    },

    /// Decrypt a file produced by `encrypt`
    Decrypt {
        input: PathBuf,
        /// Sidecar path (default: <file>.json)
        #[arg(long, short = 's')]
        sidecar: Option<PathBuf>,
    },

    /// Encrypt a file with a key derived from a passphrase
    #[command(name = "pbe-encrypt")]
    PbeEncrypt {
        input: PathBuf,
        /// GCM or CBC (default from config)
        #[arg(long, short = 'm')]
        block_mode: Option<BlockMode>,
        #[arg(long, short = 'p')]
        padding: Option<PaddingMode>,
        /// SHA256 (PBKDF2), SCRYPT or ARGON2ID
        #[arg(long)]
        kdf: Option<KeyDerivationFunction>,
        /// Passphrase (prompted for if not given)
        #[arg(long, env = "SEALFILE_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Decrypt a file produced by `pbe-encrypt`
    #[command(name = "pbe-decrypt")]
    PbeDecrypt {
        input: PathBuf,
        #[arg(long, short = 's')]
        sidecar: Option<PathBuf>,
        #[arg(long, env = "SEALFILE_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Hash a file (SHA-256, BLAKE3) or MAC it with a fresh key (HMACSHA256, AESCMAC)
    Hash {
        input: PathBuf,
        #[arg(long, short = 'a')]
        algorithm: Option<HashAlgorithm>,
    },

    /// Check a file against its hash artifact
    #[command(name = "check-hash")]
    CheckHash {
        input: PathBuf,
        /// Hash artifact (default: <file>_hash.json)
        #[arg(long)]
        artifact: Option<PathBuf>,
    },

    /// Sign a file with a one-time Ed25519 key
    Sign { input: PathBuf },

    /// Verify a file against its signature artifact
    Verify {
        input: PathBuf,
        /// Signature artifact (default: <file>_sig.json)
        #[arg(long)]
        artifact: Option<PathBuf>,
    },

    /// List supported algorithms and parameters
    Catalog,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the active configuration (merged defaults + config file)
    Show,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> ExitCode {
    let cli = Cli::parse();
    let uses_passphrase = matches!(
        cli.command,
        Commands::PbeEncrypt { .. } | Commands::PbeDecrypt { .. }
    );
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            report(&err, uses_passphrase);
            err.downcast_ref::<SealError>()
                .map_or(ExitCode::FAILURE, |e| ExitCode::from(e.exit_code()))
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config_path = expand_tilde(&cli.config);
    let config = load_config(&config_path)?;

    let level = cli.log.as_deref().unwrap_or(&config.logging.level);
    let format = match cli.log_format {
        Some(format) => format,
        None => <LogFormat as ValueEnum>::from_str(&config.logging.format, true)
            .map_err(|e| SealError::config(format!("[logging] format: {e}")))?,
    };
    init_logging(level, format);
    tracing::debug!(config = %config_path.display(), "configuration loaded");

    match cli.command {
        Commands::Encrypt {
            input,
            block_mode,
            padding,
            key_length,
        } => cmd_encrypt(&config, &input, block_mode, padding, key_length),
        Commands::Decrypt { input, sidecar } => cmd_decrypt(&input, sidecar.as_deref()),
        Commands::PbeEncrypt {
            input,
            block_mode,
            padding,
            kdf,
            password,
        } => cmd_pbe_encrypt(&config, &input, block_mode, padding, kdf, password),
        Commands::PbeDecrypt {
            input,
            sidecar,
            password,
        } => cmd_pbe_decrypt(&input, sidecar.as_deref(), password),
        Commands::Hash { input, algorithm } => cmd_hash(&config, &input, algorithm),
        Commands::CheckHash { input, artifact } => cmd_check_hash(&input, artifact.as_deref()),
        Commands::Sign { input } => cmd_sign(&input),
        Commands::Verify { input, artifact } => cmd_verify(&input, artifact.as_deref()),
        Commands::Catalog => cmd_catalog(),
        Commands::Config {
            action: ConfigAction::Show,
        } => cmd_config_show(&config, &config_path),
    }
}

fn init_logging(level: &str, format: LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

/// Print the error chain and, for known failure classes, what to try next.
fn report(err: &anyhow::Error, uses_passphrase: bool) {
    eprintln!("error: {err:#}");

    if let Some(hint) = err
        .downcast_ref::<SealError>()
        .and_then(|seal| hint(seal.kind(), uses_passphrase))
    {
        eprintln!("hint: {hint}");
    }
}

fn hint(kind: ErrorKind, uses_passphrase: bool) -> Option<&'static str> {
    let hint = match kind {
        ErrorKind::Configuration => {
            "the sidecar or artifact is missing or malformed; pass its path with --sidecar/--artifact"
        }
        ErrorKind::ParameterIncompatibility => {
            "only NoPadding can be used with GCM and CTR; ECB and CBC without padding need input aligned to 16 bytes, choose a padding mode"
        }
        ErrorKind::AuthenticationFailure if uses_passphrase => {
            "wrong password, or the file might have been manipulated"
        }
        ErrorKind::AuthenticationFailure => {
            "the file or its sidecar might have been manipulated"
        }
        ErrorKind::CryptoProvider => "the file does not match its sidecar parameters",
        ErrorKind::Io => return None,
    };
    Some(hint)
}

// ── Config loading ────────────────────────────────────────────────────────────

fn load_config(path: &Path) -> Result<SealConfig> {
    if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        toml::from_str(&content)
            .map_err(|e| SealError::config(format!("parsing config {}: {e}", path.display())))
            .map_err(Into::into)
    } else {
        Ok(SealConfig::default())
    }
}

/// Expand `~` in path to the user's home directory
fn expand_tilde(path: &Path) -> PathBuf {
    match path.to_str().and_then(|s| s.strip_prefix("~/")) {
        Some(rest) => {
            let home = std::env::var("HOME").unwrap_or_default();
            PathBuf::from(home).join(rest)
        }
        None => path.to_path_buf(),
    }
}

/// Parse a name taken from the config file.
fn config_value<T>(section: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| SealError::config(format!("[{section}] {e}")).into())
}

// ── Passphrase + progress helpers ─────────────────────────────────────────────

fn read_passphrase(given: Option<String>, confirm: bool) -> Result<SecretString> {
    let password = match given {
        Some(password) => password,
        None => prompt_passphrase(confirm)?,
    };
    if password.is_empty() {
        return Err(SealError::config("password must not be empty").into());
    }
    Ok(SecretString::from(password))
}

fn prompt_passphrase(confirm: bool) -> Result<String> {
    let mut first = rpassword::prompt_password("Password: ").context("reading password")?;
    if confirm {
        let mut second =
            rpassword::prompt_password("Confirm password: ").context("reading password")?;
        let matches = first == second;
        second.zeroize();
        if !matches {
            first.zeroize();
            return Err(SealError::config("passwords do not match").into());
        }
    }
    Ok(first)
}

fn make_spinner(prefix: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{prefix:.bold} {spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_prefix(prefix.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// Run a KDF-bound operation behind a spinner.
fn with_kdf_spinner<T>(message: &str, f: impl FnOnce() -> T) -> T {
    let pb = make_spinner("kdf");
    pb.set_message(message.to_string());
    let out = f();
    pb.finish_and_clear();
    out
}

// ── `sealfile encrypt` / `decrypt` ────────────────────────────────────────────

fn cmd_encrypt(
    config: &SealConfig,
    input: &Path,
    block_mode: Option<BlockMode>,
    padding: Option<PaddingMode>,
    key_length: Option<u32>,
) -> Result<ExitCode> {
    let defaults = &config.defaults;
    let selection = CipherSelection::new(
        match block_mode {
            Some(mode) => mode,
            None => config_value("defaults", &defaults.block_mode)?,
        },
        match padding {
            Some(padding) => padding,
            None => config_value("defaults", &defaults.padding_mode)?,
        },
        key_length.unwrap_or(defaults.key_length),
    );

    let outcome = sealfile_ops::encrypt_file(input, &selection)
        .with_context(|| format!("encrypting {}", input.display()))?;

    println!(
        "Encrypted {} → {} (AES-{} {}/{})",
        input.display(),
        outcome.output.display(),
        selection.key_length_bits,
        selection.block_mode,
        selection.padding,
    );
    println!("Sidecar:  {}", outcome.sidecar.display());
    Ok(ExitCode::SUCCESS)
}

fn cmd_decrypt(input: &Path, sidecar: Option<&Path>) -> Result<ExitCode> {
    let outcome = sealfile_ops::decrypt_file(input, sidecar)
        .with_context(|| format!("decrypting {}", input.display()))?;

    println!("Decrypted {} → {}", input.display(), outcome.output.display());
    Ok(ExitCode::SUCCESS)
}

// ── `sealfile pbe-encrypt` / `pbe-decrypt` ────────────────────────────────────

fn cmd_pbe_encrypt(
    config: &SealConfig,
    input: &Path,
    block_mode: Option<BlockMode>,
    padding: Option<PaddingMode>,
    kdf: Option<KeyDerivationFunction>,
    password: Option<String>,
) -> Result<ExitCode> {
    let defaults = &config.defaults;
    let block_mode = match block_mode {
        Some(mode) => mode,
        None => config_value("defaults", &defaults.pbe_block_mode)?,
    };
    let padding = match padding {
        Some(padding) => padding,
        None => config_value("defaults", &defaults.pbe_padding_mode)?,
    };
    let function = match kdf {
        Some(kdf) => kdf,
        None => config_value("defaults", &defaults.kdf)?,
    };
    let key_bits = catalog::supported_key_lengths(AlgorithmFamily::AesPbe)
        .last()
        .copied()
        .unwrap_or(256);
    let selection = CipherSelection::new(block_mode, padding, key_bits);

    // Reject bad combinations before asking for a passphrase
    catalog::validate(
        AlgorithmFamily::AesPbe,
        padding,
        block_mode,
        key_bits,
        Some(function),
    )
    .map_err(SealError::from)?;

    let passphrase = read_passphrase(password, true)?;
    let kdf = KdfSpec::standard(function, &config.kdf);

    let outcome = with_kdf_spinner(&format!("deriving key ({function})"), || {
        sealfile_ops::password_encrypt_file(input, &selection, kdf, &passphrase)
    })
    .with_context(|| format!("encrypting {}", input.display()))?;

    println!(
        "Encrypted {} → {} (AES-{} {}/{}, {})",
        input.display(),
        outcome.output.display(),
        key_bits,
        block_mode,
        padding,
        function,
    );
    println!("Sidecar:  {}", outcome.sidecar.display());
    Ok(ExitCode::SUCCESS)
}

fn cmd_pbe_decrypt(
    input: &Path,
    sidecar: Option<&Path>,
    password: Option<String>,
) -> Result<ExitCode> {
    let passphrase = read_passphrase(password, false)?;

    let outcome = with_kdf_spinner("deriving key", || {
        sealfile_ops::password_decrypt_file(input, sidecar, &passphrase)
    })
    .with_context(|| format!("decrypting {}", input.display()))?;

    println!("Decrypted {} → {}", input.display(), outcome.output.display());
    Ok(ExitCode::SUCCESS)
}

// ── `sealfile hash` / `check-hash` ────────────────────────────────────────────

fn cmd_hash(config: &SealConfig, input: &Path, algorithm: Option<HashAlgorithm>) -> Result<ExitCode> {
    let algorithm = match algorithm {
        Some(algorithm) => algorithm,
        None => config_value("defaults", &config.defaults.hash_algorithm)?,
    };

    let outcome = sealfile_ops::hash_file(input, algorithm)
        .with_context(|| format!("hashing {}", input.display()))?;

    println!(
        "Hashed {} ({}) → {}",
        input.display(),
        outcome.algorithm,
        outcome.artifact.display()
    );
    Ok(ExitCode::SUCCESS)
}

fn cmd_check_hash(input: &Path, artifact: Option<&Path>) -> Result<ExitCode> {
    let outcome = sealfile_ops::check_hash_file(input, artifact)
        .with_context(|| format!("checking hash of {}", input.display()))?;
    Ok(report_check(input, "hash", outcome.matches))
}

// ── `sealfile sign` / `verify` ────────────────────────────────────────────────

fn cmd_sign(input: &Path) -> Result<ExitCode> {
    let outcome =
        sealfile_ops::sign_file(input).with_context(|| format!("signing {}", input.display()))?;

    println!("Signed {} → {}", input.display(), outcome.artifact.display());
    Ok(ExitCode::SUCCESS)
}

fn cmd_verify(input: &Path, artifact: Option<&Path>) -> Result<ExitCode> {
    let outcome = sealfile_ops::verify_file(input, artifact)
        .with_context(|| format!("verifying {}", input.display()))?;
    Ok(report_check(input, "signature", outcome.matches))
}

fn report_check(input: &Path, what: &str, matches: bool) -> ExitCode {
    if matches {
        println!("{}: {what} OK", input.display());
        ExitCode::SUCCESS
    } else {
        println!("{}: {what} MISMATCH", input.display());
        ExitCode::from(1)
    }
}

// ── `sealfile catalog` ────────────────────────────────────────────────────────

fn cmd_catalog() -> Result<ExitCode> {
    fn join<T: std::fmt::Display>(items: &[T]) -> String {
        items
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }

    for family in AlgorithmFamily::ALL {
        println!("{family}");
        println!("  block modes:  {}", join(catalog::supported_block_modes(family)));
        println!("  padding:      {}", join(catalog::supported_padding_modes(family)));
        println!("  key lengths:  {}", join(catalog::supported_key_lengths(family)));
        let kdfs = catalog::supported_kdfs(family);
        if !kdfs.is_empty() {
            println!("  KDFs:         {}", join(kdfs));
        }
    }
    println!("hash algorithms: {}", join(catalog::supported_hash_algorithms()));
    println!();
    println!("GCM and CTR take NoPadding only; ECB and CBC with NoPadding need 16-byte aligned input.");
    Ok(ExitCode::SUCCESS)
}

// ── `sealfile config show` ────────────────────────────────────────────────────

fn cmd_config_show(config: &SealConfig, config_path: &Path) -> Result<ExitCode> {
    if config_path.exists() {
        println!("# Configuration from: {}", config_path.display());
    } else {
        println!("# Configuration: defaults (no file at {})", config_path.display());
    }
    println!();
    let rendered = toml::to_string_pretty(config).context("serializing config to TOML")?;
    print!("{rendered}");
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_encrypt_flags() {
        let cli = Cli::try_parse_from([
            "sealfile", "encrypt", "a.txt", "-m", "gcm", "-p", "NoPadding", "-k", "128",
        ])
        .unwrap();
        match cli.command {
            Commands::Encrypt {
                block_mode,
                padding,
                key_length,
                ..
            } => {
                assert_eq!(block_mode, Some(BlockMode::Gcm));
                assert_eq!(padding, Some(PaddingMode::NoPadding));
                assert_eq!(key_length, Some(128));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_mode_rejected_by_parser() {
        assert!(Cli::try_parse_from(["sealfile", "encrypt", "a.txt", "-m", "OFB"]).is_err());
    }

    #[test]
    fn test_parse_pbe_kdf_alias() {
        let cli = Cli::try_parse_from(["sealfile", "pbe-encrypt", "a.txt", "--kdf", "pbkdf2"]).unwrap();
        match cli.command {
            Commands::PbeEncrypt { kdf, .. } => {
                assert_eq!(kdf, Some(KeyDerivationFunction::Pbkdf2Sha256));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_load_config_missing_file_gives_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let config = load_config(&tmp.path().join("absent.toml")).unwrap();
        assert_eq!(config.defaults.block_mode, "CBC");
    }

    #[test]
    fn test_load_config_invalid_is_configuration_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[kdf]\nargon2_time_cost = \"lots\"\n").unwrap();

        let err = load_config(&path).unwrap_err();
        let seal = err.downcast_ref::<SealError>().unwrap();
        assert_eq!(seal.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_load_config_fixed_kdf_cost_is_configuration_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[kdf]\npbkdf2_iterations = 1\n").unwrap();

        let err = load_config(&path).unwrap_err();
        assert_eq!(
            err.downcast_ref::<SealError>().map(SealError::kind),
            Some(ErrorKind::Configuration)
        );
    }

    #[test]
    fn test_authentication_hint_mentions_password_only_for_pbe() {
        let pbe = hint(ErrorKind::AuthenticationFailure, true).unwrap();
        assert!(pbe.contains("password"));

        let symmetric = hint(ErrorKind::AuthenticationFailure, false).unwrap();
        assert!(!symmetric.contains("password"));
        assert!(symmetric.contains("manipulated"));

        assert_eq!(hint(ErrorKind::Io, true), None);
    }

    #[test]
    fn test_empty_password_flag_rejected() {
        for confirm in [true, false] {
            let err = read_passphrase(Some(String::new()), confirm).unwrap_err();
            assert_eq!(
                err.downcast_ref::<SealError>().map(SealError::kind),
                Some(ErrorKind::Configuration)
            );
        }
    }

    #[test]
    fn test_password_flag_skips_prompt() {
        use secrecy::ExposeSecret;

        let passphrase = read_passphrase(Some("hunter2".into()), true).unwrap();
        assert_eq!(passphrase.expose_secret(), "hunter2");
    }

    #[test]
    fn test_config_defaults_parse_against_catalog() {
        let config = SealConfig::default();
        let _: BlockMode = config_value("defaults", &config.defaults.block_mode).unwrap();
        let _: PaddingMode = config_value("defaults", &config.defaults.padding_mode).unwrap();
        let _: BlockMode = config_value("defaults", &config.defaults.pbe_block_mode).unwrap();
        let _: KeyDerivationFunction = config_value("defaults", &config.defaults.kdf).unwrap();
        let _: HashAlgorithm = config_value("defaults", &config.defaults.hash_algorithm).unwrap();
    }

    #[test]
    fn test_bad_config_name_is_configuration_error() {
        let err = config_value::<BlockMode>("defaults", "XTS").unwrap_err();
        assert_eq!(
            err.downcast_ref::<SealError>().map(SealError::kind),
            Some(ErrorKind::Configuration)
        );
    }

    #[test]
    fn test_expand_tilde() {
        std::env::set_var("HOME", "/home/tester");
        assert_eq!(
            expand_tilde(Path::new("~/.config/sealfile/config.toml")),
            PathBuf::from("/home/tester/.config/sealfile/config.toml")
        );
        assert_eq!(expand_tilde(Path::new("/etc/x.toml")), PathBuf::from("/etc/x.toml"));
    }
}
