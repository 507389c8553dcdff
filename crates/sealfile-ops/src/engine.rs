//! File workflows
//!
//!   - `encrypt_file` / `password_encrypt_file`: input → `<input>.encrypted` + `<input>.encrypted.json`
//!   - `decrypt_file` / `password_decrypt_file`: `<x>.encrypted` + sidecar → `<x-base>_decrypted.<ext>`
//!   - `hash_file` / `check_hash_file`: input ↔ `<input>_hash.json`
//!   - `sign_file` / `verify_file`: input ↔ `<input>_sig.json`
//!
//! A failure part-way through can leave an output file without its sidecar;
//! such leftovers are not cleaned up.

use std::path::{Path, PathBuf};

use secrecy::SecretString;
use tracing::{debug, info};

use sealfile_core::{paths, SealError, SealResult};
use sealfile_crypto::{
    check_hash, hash, password, sign, symmetric, verify, CipherSelection, HashAlgorithm,
    HashArtifact, KdfSpec, SidecarArtifact, SignatureArtifact, TransformationParameters,
};

/// Result of encrypting a single file
#[derive(Debug, Clone)]
pub struct EncryptOutcome {
    pub input: PathBuf,
    pub output: PathBuf,
    pub sidecar: PathBuf,
    pub bytes_in: u64,
    pub bytes_out: u64,
}

/// Result of decrypting a single file
#[derive(Debug, Clone)]
pub struct DecryptOutcome {
    pub input: PathBuf,
    pub output: PathBuf,
    pub bytes: u64,
}

#[derive(Debug, Clone)]
pub struct HashOutcome {
    pub input: PathBuf,
    pub artifact: PathBuf,
    pub algorithm: HashAlgorithm,
}

#[derive(Debug, Clone)]
pub struct SignOutcome {
    pub input: PathBuf,
    pub artifact: PathBuf,
}

/// Result of `check_hash_file` / `verify_file`
#[derive(Debug, Clone)]
pub struct CheckOutcome {
    pub input: PathBuf,
    pub artifact: PathBuf,
    /// false when the check ran and the input did not match
    pub matches: bool,
}

/// Encrypt `input` under a freshly generated key.
pub fn encrypt_file(input: &Path, selection: &CipherSelection) -> SealResult<EncryptOutcome> {
    let plaintext = read_input(input)?;
    let (ciphertext, params) = symmetric::encrypt(&plaintext, selection)?;
    write_encrypted(input, &plaintext, &ciphertext, &params)
}

/// Decrypt a file produced by [`encrypt_file`].
///
/// `sidecar` defaults to `<input>.json`.
pub fn decrypt_file(input: &Path, sidecar: Option<&Path>) -> SealResult<DecryptOutcome> {
    let params = read_sidecar(&sidecar_path(input, sidecar))?;
    let ciphertext = read_input(input)?;
    let plaintext = symmetric::decrypt(&ciphertext, &params)?;
    write_decrypted(input, &plaintext)
}

pub fn password_encrypt_file(
    input: &Path,
    selection: &CipherSelection,
    kdf: KdfSpec,
    passphrase: &SecretString,
) -> SealResult<EncryptOutcome> {
    let plaintext = read_input(input)?;
    let (ciphertext, params) = password::encrypt(&plaintext, selection, kdf, passphrase)?;
    write_encrypted(input, &plaintext, &ciphertext, &params)
}

/// Decrypt a file produced by [`password_encrypt_file`].
///
/// Nothing is written when the passphrase is wrong.
pub fn password_decrypt_file(
    input: &Path,
    sidecar: Option<&Path>,
    passphrase: &SecretString,
) -> SealResult<DecryptOutcome> {
    let params = read_sidecar(&sidecar_path(input, sidecar))?;
    let ciphertext = read_input(input)?;
    let plaintext = password::decrypt(&ciphertext, &params, passphrase)?;
    write_decrypted(input, &plaintext)
}

pub fn hash_file(input: &Path, algorithm: HashAlgorithm) -> SealResult<HashOutcome> {
    let bytes = read_input(input)?;
    let record = hash(&bytes, algorithm)?;

    let artifact = paths::hash_output(input);
    write_output(&artifact, &HashArtifact::from_record(&record).to_bytes()?)?;

    info!(
        path = %input.display(),
        artifact = %artifact.display(),
        algorithm = %algorithm,
        "hashed"
    );
    Ok(HashOutcome {
        input: input.to_path_buf(),
        artifact,
        algorithm,
    })
}

/// Recompute the digest of `input` and compare it with the hash artifact
/// (default `<input>_hash.json`).
pub fn check_hash_file(input: &Path, artifact: Option<&Path>) -> SealResult<CheckOutcome> {
    let artifact = artifact.map_or_else(|| paths::hash_output(input), Path::to_path_buf);
    let record = HashArtifact::from_bytes(&read_artifact(&artifact)?)?.to_record()?;
    let bytes = read_input(input)?;
    let matches = check_hash(&bytes, &record)?;

    info!(path = %input.display(), algorithm = %record.algorithm, matches, "hash checked");
    Ok(CheckOutcome {
        input: input.to_path_buf(),
        artifact,
        matches,
    })
}

pub fn sign_file(input: &Path) -> SealResult<SignOutcome> {
    let bytes = read_input(input)?;
    let record = sign(&bytes)?;

    let artifact = paths::signature_output(input);
    write_output(&artifact, &SignatureArtifact::from_record(&record).to_bytes()?)?;

    info!(path = %input.display(), artifact = %artifact.display(), "signed");
    Ok(SignOutcome {
        input: input.to_path_buf(),
        artifact,
    })
}

/// Verify `input` against its signature artifact (default `<input>_sig.json`).
pub fn verify_file(input: &Path, artifact: Option<&Path>) -> SealResult<CheckOutcome> {
    let artifact = artifact.map_or_else(|| paths::signature_output(input), Path::to_path_buf);
    let record = SignatureArtifact::from_bytes(&read_artifact(&artifact)?)?.to_record()?;
    let bytes = read_input(input)?;
    let matches = verify(&bytes, &record)?;

    info!(path = %input.display(), matches, "signature verified");
    Ok(CheckOutcome {
        input: input.to_path_buf(),
        artifact,
        matches,
    })
}

/// Load and decode an encryption sidecar.
pub fn read_sidecar(path: &Path) -> SealResult<TransformationParameters> {
    let params = SidecarArtifact::from_bytes(&read_artifact(path)?)?.to_params()?;
    debug!(
        sidecar = %path.display(),
        family = %params.family,
        block_mode = %params.block_mode,
        "loaded sidecar"
    );
    Ok(params)
}

fn sidecar_path(input: &Path, sidecar: Option<&Path>) -> PathBuf {
    sidecar.map_or_else(|| paths::sidecar_for(input), Path::to_path_buf)
}

fn write_encrypted(
    input: &Path,
    plaintext: &[u8],
    ciphertext: &[u8],
    params: &TransformationParameters,
) -> SealResult<EncryptOutcome> {
    let output = paths::encrypted_output(input);
    let sidecar = paths::encrypt_sidecar(input);

    write_output(&output, ciphertext)?;
    write_output(&sidecar, &SidecarArtifact::from_params(params).to_bytes()?)?;

    info!(
        path = %input.display(),
        output = %output.display(),
        family = %params.family,
        block_mode = %params.block_mode,
        padding = %params.padding,
        bytes = plaintext.len(),
        "encrypted"
    );
    Ok(EncryptOutcome {
        input: input.to_path_buf(),
        output,
        sidecar,
        bytes_in: plaintext.len() as u64,
        bytes_out: ciphertext.len() as u64,
    })
}

fn write_decrypted(input: &Path, plaintext: &[u8]) -> SealResult<DecryptOutcome> {
    let output = paths::decrypted_output(input);
    write_output(&output, plaintext)?;

    info!(path = %input.display(), output = %output.display(), bytes = plaintext.len(), "decrypted");
    Ok(DecryptOutcome {
        input: input.to_path_buf(),
        output,
        bytes: plaintext.len() as u64,
    })
}

fn read_input(path: &Path) -> SealResult<Vec<u8>> {
    std::fs::read(path).map_err(|e| {
        SealError::Io(std::io::Error::new(
            e.kind(),
            format!("reading {}: {e}", path.display()),
        ))
    })
}

/// Artifacts that cannot be read are a configuration problem, not an I/O one.
fn read_artifact(path: &Path) -> SealResult<Vec<u8>> {
    std::fs::read(path)
        .map_err(|e| SealError::config(format!("reading {}: {e}", path.display())))
}

fn write_output(path: &Path, bytes: &[u8]) -> SealResult<()> {
    std::fs::write(path, bytes).map_err(|e| {
        SealError::Io(std::io::Error::new(
            e.kind(),
            format!("writing {}: {e}", path.display()),
        ))
    })
}
