//! Buffers serialized using the URL-safe base64 encoding without padding
//!
//! JWT segments and JWK key parameters are both carried in this encoding.
//! Data is stored as the raw bytes; encoding only happens when a value is
//! displayed or serialized.

use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// The value was not properly formatted base64url data
#[derive(Debug, Error)]
#[error("invalid base64url data")]
pub struct InvalidBase64Data {
    #[from]
    source: base64::DecodeError,
}

/// An owned buffer of bytes serialized as base64url without padding
#[derive(Clone, Default, PartialEq, Eq, Hash)]
#[must_use]
pub struct Base64Url(Vec<u8>);

impl Base64Url {
    /// Wraps raw bytes without any decoding
    #[inline]
    pub fn from_raw(raw: impl Into<Vec<u8>>) -> Self {
        Self(raw.into())
    }

    /// Decodes a base64url string into its underlying bytes
    ///
    /// # Errors
    ///
    /// Returns an error if the string contains characters outside the
    /// base64url alphabet or has invalid length.
    pub fn from_encoded(enc: &str) -> Result<Self, InvalidBase64Data> {
        let data = URL_SAFE_NO_PAD.decode(enc)?;
        Ok(Self(data))
    }

    /// A view of the underlying bytes
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Unwraps the underlying buffer
    #[inline]
    #[must_use]
    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }

    /// Encodes the bytes as a base64url string
    #[must_use]
    pub fn encode(&self) -> String {
        URL_SAFE_NO_PAD.encode(&self.0)
    }
}

impl From<Vec<u8>> for Base64Url {
    #[inline]
    fn from(raw: Vec<u8>) -> Self {
        Self(raw)
    }
}

impl From<&[u8]> for Base64Url {
    #[inline]
    fn from(raw: &[u8]) -> Self {
        Self(raw.to_vec())
    }
}

impl fmt::Debug for Base64Url {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "`{}`", self.encode())
    }
}

impl fmt::Display for Base64Url {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl Serialize for Base64Url {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}

impl<'de> Deserialize<'de> for Base64Url {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = std::borrow::Cow::<str>::deserialize(deserializer)?;
        Self::from_encoded(&raw).map_err(serde::de::Error::custom)
    }
}
