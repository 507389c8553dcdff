//! Random key material: AES keys, salts, IVs

use rand::RngCore;
use zeroize::Zeroize;

use crate::catalog::BlockMode;
use crate::SALT_SIZE;

/// A generated AES or MAC key. Zeroized on drop.
#[derive(Clone)]
pub struct SymmetricKey {
    bytes: Vec<u8>,
}

impl SymmetricKey {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len_bits(&self) -> u32 {
        (self.bytes.len() * 8) as u32
    }
}

impl Drop for SymmetricKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymmetricKey")
            .field("bits", &self.len_bits())
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Generate a random key of `bits` length (a multiple of 8).
pub fn generate_key(bits: u32) -> SymmetricKey {
    let mut bytes = vec![0u8; (bits / 8) as usize];
    rand::thread_rng().fill_bytes(&mut bytes);
    SymmetricKey::from_bytes(bytes)
}

/// Generate a random 16-byte salt for passphrase key derivation.
pub fn generate_salt() -> [u8; SALT_SIZE] {
    let mut salt = [0u8; SALT_SIZE];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

/// Generate a fresh IV / nonce sized for `mode`, or `None` if it takes none.
pub fn generate_iv(mode: BlockMode) -> Option<Vec<u8>> {
    mode.iv_len().map(|len| {
        let mut iv = vec![0u8; len];
        rand::thread_rng().fill_bytes(&mut iv);
        iv
    })
}
