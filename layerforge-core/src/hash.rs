//! The non-cryptographic content hash used for cache keys and state
//! identity (spec.md §6 "Hash function").
//!
//! Collisions produce cache misses at worst — callers must never treat a
//! hash match as proof of content equality; every validator re-checks the
//! actual text before accepting a transform.

use std::fmt;

/// A stable hash over code bytes, encoded as a short base-36 string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct CodeHash(u32);

const SEED: u32 = 0x5157_4c46; // arbitrary fixed seed, "LF" stamped in, keeps the hash stable across runs

impl CodeHash {
    pub fn of(code: &str) -> Self {
        Self(xxhash_rust::xxh32::xxh32(code.as_bytes(), SEED))
    }

    pub fn raw(self) -> u32 {
        self.0
    }

    /// Encode as a short base-36 string (spec.md §6).
    pub fn to_base36(self) -> String {
        to_base36(self.0 as u64)
    }
}

impl fmt::Display for CodeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base36())
    }
}

/// Hash `code` and return its `CodeHash`.
pub fn hash_code(code: &str) -> CodeHash {
    CodeHash::of(code)
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut buf = Vec::new();
    while n > 0 {
        buf.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    buf.reverse();
    String::from_utf8(buf).expect("base36 digits are ASCII")
}
