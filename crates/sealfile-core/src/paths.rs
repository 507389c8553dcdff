//! Output and sidecar naming conventions
//!
//! ```text
//! report.pdf                    input
//! report.pdf.encrypted          encrypt output
//! report.pdf.encrypted.json     encrypt sidecar
//! report_decrypted.pdf          decrypt output (from report.pdf.encrypted)
//! report.pdf_hash.json          hash artifact
//! report.pdf_sig.json           signature artifact
//! ```

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

pub const ENCRYPTED_SUFFIX: &str = ".encrypted";
pub const SIDECAR_SUFFIX: &str = ".json";
pub const HASH_SUFFIX: &str = "_hash.json";
pub const SIGNATURE_SUFFIX: &str = "_sig.json";
const ENCRYPTED_EXTENSION: &str = "encrypted";
const DECRYPTED_MARKER: &str = "_decrypted";

/// `<input>.encrypted`
pub fn encrypted_output(input: &Path) -> PathBuf {
    append(input, ENCRYPTED_SUFFIX)
}

/// `<input>.encrypted.json`
pub fn encrypt_sidecar(input: &Path) -> PathBuf {
    sidecar_for(&encrypted_output(input))
}

/// Sidecar colocated with an already-encrypted file: `<encrypted>.json`
pub fn sidecar_for(encrypted: &Path) -> PathBuf {
    append(encrypted, SIDECAR_SUFFIX)
}

/// `<dir>/<base>_decrypted.<ext>` where `<base>.<ext>` is the file name with
/// a trailing `.encrypted` stripped. Names without an extension get no dot.
pub fn decrypted_output(encrypted: &Path) -> PathBuf {
    let name = Path::new(encrypted.file_name().unwrap_or_default());
    let stripped = match name.extension() {
        Some(ext) if ext == ENCRYPTED_EXTENSION => name.file_stem().map_or(name, Path::new),
        _ => name,
    };

    let mut file_name = stripped
        .file_stem()
        .map(OsStr::to_os_string)
        .unwrap_or_default();
    file_name.push(DECRYPTED_MARKER);
    if let Some(ext) = stripped.extension() {
        file_name.push(".");
        file_name.push(ext);
    }
    encrypted.with_file_name(file_name)
}

/// `<input>_hash.json`
pub fn hash_output(input: &Path) -> PathBuf {
    append(input, HASH_SUFFIX)
}

/// `<input>_sig.json`
pub fn signature_output(input: &Path) -> PathBuf {
    append(input, SIGNATURE_SUFFIX)
}

fn append(path: &Path, suffix: &str) -> PathBuf {
    let mut s = path.as_os_str().to_os_string();
    s.push(suffix);
    PathBuf::from(s)
}
