//! Process-lifetime signing key.
//!
//! The key is generated once at startup, held only in memory and never
//! serialized. `Debug` and `Display` are redacted so the key cannot leak
//! through logging by accident; the one sanctioned way out is
//! [`SecretKey::reveal_hex`], used for the startup announcement.
//!
//! # Example
//!
//! ```rust
//! use usrwatch_common_secret::SecretKey;
//!
//! let key = SecretKey::generate().unwrap();
//! println!("{}", key); // Prints: [REDACTED]
//! println!("{:?}", key); // Prints: SecretKey([REDACTED])
//!
//! assert_eq!(key.reveal_hex().len(), 128);
//! ```

use rand::rngs::OsRng;
use rand::RngCore;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Length of the key material in bytes.
pub const KEY_LEN: usize = 64;

/// Secret key errors.
#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("failed to gather random bytes: {0}")]
    Entropy(#[from] rand::Error),

    #[error("invalid key hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("key must be {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

/// 64 bytes of keying material for report signing.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey([u8; KEY_LEN]);

impl SecretKey {
    /// Generate a fresh key from the operating system RNG.
    pub fn generate() -> Result<Self, SecretError> {
        let mut bytes = [0u8; KEY_LEN];
        OsRng.try_fill_bytes(&mut bytes)?;
        Ok(Self(bytes))
    }

    /// Wrap existing key material.
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse key material from its lowercase (or uppercase) hex form.
    ///
    /// This is how a recipient re-creates the key from the startup
    /// announcement in order to verify reports.
    pub fn from_hex(s: &str) -> Result<Self, SecretError> {
        let mut decoded = hex::decode(s.trim())?;
        if decoded.len() != KEY_LEN {
            let actual = decoded.len();
            decoded.zeroize();
            return Err(SecretError::InvalidLength {
                expected: KEY_LEN,
                actual,
            });
        }

        let mut bytes = [0u8; KEY_LEN];
        bytes.copy_from_slice(&decoded);
        decoded.zeroize();
        Ok(Self(bytes))
    }

    /// Expose the raw key bytes.
    ///
    /// Use this method sparingly and only when necessary.
    pub fn expose(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    /// Render the key as lowercase hex.
    ///
    /// The result is the cleartext key. It is meant for the startup
    /// announcement only and must not be logged.
    pub fn reveal_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretKey([REDACTED])")
    }
}

impl PartialEq for SecretKey {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for SecretKey {}
