//! sealfile-ops: one file in, one transform, output and artifact out
//!
//! Each workflow reads the whole input into memory, invokes exactly one
//! engine operation from `sealfile-crypto`, and writes its results next to
//! the input following the naming rules in [`sealfile_core::paths`].

pub mod engine;

pub use engine::{
    check_hash_file, decrypt_file, encrypt_file, hash_file, password_decrypt_file,
    password_encrypt_file, read_sidecar, sign_file, verify_file, CheckOutcome, DecryptOutcome,
    EncryptOutcome, HashOutcome, SignOutcome,
};
