//! Keyed integrity tags over report bodies.

use sha2::{Digest, Sha512};
use std::fmt;
use usrwatch_common_secret::SecretKey;

/// Tag length in bytes (SHA-512 output).
pub const TAG_LEN: usize = 64;

/// Integrity tag binding a report body to the process key.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Tag([u8; TAG_LEN]);

impl Tag {
    /// Raw tag bytes.
    pub fn as_bytes(&self) -> &[u8; TAG_LEN] {
        &self.0
    }

    /// Lowercase hex rendering, 128 characters.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a hex tag as printed in a report.
    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = hex::decode(s.trim()).ok()?;
        let array: [u8; TAG_LEN] = bytes.try_into().ok()?;
        Some(Self(array))
    }

    /// Compare without short-circuiting on the first differing byte.
    pub fn ct_eq(&self, other: &Tag) -> bool {
        self.0
            .iter()
            .zip(other.0.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag({})", self.to_hex())
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Signs report bodies with a borrowed process key.
///
/// The tag is `SHA-512(key || body)`. This secret-prefix construction is
/// what existing report consumers verify against; it is a tamper indicator
/// under a trust-on-first-use key, not an authenticated signature.
pub struct AuditSigner<'k> {
    key: &'k SecretKey,
}

impl<'k> AuditSigner<'k> {
    /// Create a signer over the given key.
    pub fn new(key: &'k SecretKey) -> Self {
        Self { key }
    }

    /// Compute the tag for `body`.
    pub fn sign(&self, body: &str) -> Tag {
        sign(self.key, body)
    }

    /// Check that `tag` was produced for `body` under this key.
    pub fn verify(&self, body: &str, tag: &Tag) -> bool {
        self.sign(body).ct_eq(tag)
    }
}

/// Compute `SHA-512(secret || body)`.
pub fn sign(secret: &SecretKey, body: &str) -> Tag {
    let mut hasher = Sha512::new();
    hasher.update(secret.expose());
    hasher.update(body.as_bytes());

    let mut tag = [0u8; TAG_LEN];
    tag.copy_from_slice(&hasher.finalize());
    Tag(tag)
}
