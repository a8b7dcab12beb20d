//! BLAKE3 fingerprints used to detect whether a rebuild input changed

use serde::{Deserialize, Serialize};
use std::fmt;

/// A BLAKE3 digest of some rebuild input (32 bytes)
#[derive(Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex, 64 characters
    pub fn to_hex(&self) -> String {
        const HEX_CHARS: &[u8] = b"0123456789abcdef";
        let mut hex = String::with_capacity(64);
        for &byte in &self.0 {
            hex.push(HEX_CHARS[(byte >> 4) as usize] as char);
            hex.push(HEX_CHARS[(byte & 0xf) as usize] as char);
        }
        hex
    }

    /// Short form for log lines
    pub fn short(&self) -> String {
        self.to_hex()[..12].to_string()
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.short())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Fingerprint raw bytes
pub fn fingerprint_bytes(data: &[u8]) -> Fingerprint {
    Fingerprint::from_bytes(*blake3::hash(data).as_bytes())
}

/// Fingerprint the JSON serialization of a value
///
/// Struct fields serialize in declaration order, so equal values always
/// produce equal fingerprints.
pub fn fingerprint_json<T: Serialize>(value: &T) -> Result<Fingerprint, serde_json::Error> {
    let json = serde_json::to_vec(value)?;
    Ok(fingerprint_bytes(&json))
}

/// Incremental fingerprint over a sequence of fields
///
/// Every field is length-prefixed so `["ab", "c"]` and `["a", "bc"]` differ.
pub struct Fingerprinter {
    inner: blake3::Hasher,
}

impl Fingerprinter {
    pub fn new() -> Self {
        Self {
            inner: blake3::Hasher::new(),
        }
    }

    /// Add one field
    pub fn field(&mut self, data: &str) -> &mut Self {
        self.inner.update(&(data.len() as u64).to_le_bytes());
        self.inner.update(data.as_bytes());
        self
    }

    /// Add a list of fields, prefixed by its length
    pub fn list<S: AsRef<str>>(&mut self, items: &[S]) -> &mut Self {
        self.inner.update(&(items.len() as u64).to_le_bytes());
        for item in items {
            self.field(item.as_ref());
        }
        self
    }

    pub fn finalize(&self) -> Fingerprint {
        Fingerprint::from_bytes(*self.inner.finalize().as_bytes())
    }
}

impl Default for Fingerprinter {
    fn default() -> Self {
        Self::new()
    }
}
