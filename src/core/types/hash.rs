use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;

/// SHA-256 of a file's contents, used to address pristine copies on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    pub fn digest(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        let result = hasher.finalize();
        let mut array = [0u8; 32];
        array.copy_from_slice(&result);
        ContentHash(array)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[derive(Debug, Error)]
pub enum HashError {
    #[error("Content does not match its address: expected {expected}, found {found}")]
    Mismatch {
        expected: ContentHash,
        found: ContentHash,
    },
}
