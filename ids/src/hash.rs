// hash.rs — Content digest primitive
//
// Hex-encoded digests. MD4 is the default for module-name suffixes so names
// match those of existing builds; SHA-256 also backs the build-info
// fingerprint.

use std::fmt::Write;

use md4::Md4;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashFunction {
    #[default]
    Md4,
    Sha256,
    Sha512,
}

impl HashFunction {
    pub fn name(self) -> &'static str {
        match self {
            HashFunction::Md4 => "md4",
            HashFunction::Sha256 => "sha256",
            HashFunction::Sha512 => "sha512",
        }
    }
}

/// Lowercase hex digest of `input`.
pub fn digest(input: &str, algorithm: HashFunction) -> String {
    match algorithm {
        HashFunction::Md4 => to_hex(&Md4::digest(input.as_bytes())),
        HashFunction::Sha256 => to_hex(&Sha256::digest(input.as_bytes())),
        HashFunction::Sha512 => to_hex(&Sha512::digest(input.as_bytes())),
    }
}

/// First `len` hex characters of the digest of `input`.
pub fn short_digest(input: &str, algorithm: HashFunction, len: usize) -> String {
    let mut hex = digest(input, algorithm);
    hex.truncate(len);
    hex
}

pub fn to_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{:02x}", b);
    }
    s
}
