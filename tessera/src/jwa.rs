//! Implementations of the JSON Web Algorithms (JWA) standard
//!
//! The specifications for these algorithms can be found in [RFC7518][].
//!
//! Only the asymmetric signature families are implemented: RSA (PKCS#1 and
//! PSS), ECDSA over the NIST curves, and Ed25519. Symmetric (HMAC)
//! algorithms are out of scope for a verifier that only ever holds
//! published public keys.
//!
//! [RFC7518]: https://tools.ietf.org/html/rfc7518

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error;

pub mod ec;
pub mod okp;
pub mod rsa;

mod usage;

pub use usage::Usage;

/// A signature algorithm
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum Algorithm {
    /// RSASSA-PKCS1-v1_5 using SHA-256
    RS256,
    /// RSASSA-PKCS1-v1_5 using SHA-384
    RS384,
    /// RSASSA-PKCS1-v1_5 using SHA-512
    RS512,
    /// RSASSA-PSS using SHA-256
    PS256,
    /// RSASSA-PSS using SHA-384
    PS384,
    /// RSASSA-PSS using SHA-512
    PS512,
    /// ECDSA using the P-256 curve and SHA-256
    ES256,
    /// ECDSA using the P-384 curve and SHA-384
    ES384,
    /// Edwards-curve signatures using Ed25519
    EdDSA,
}

impl Algorithm {
    /// Gets the usage related to this algorithm
    pub fn to_usage(self) -> Usage {
        Usage::Signing
    }

    /// The algorithm's name as it appears in a token header
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RS256 => "RS256",
            Self::RS384 => "RS384",
            Self::RS512 => "RS512",
            Self::PS256 => "PS256",
            Self::PS384 => "PS384",
            Self::PS512 => "PS512",
            Self::ES256 => "ES256",
            Self::ES384 => "ES384",
            Self::EdDSA => "EdDSA",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&'_ str> for Algorithm {
    type Error = error::UnknownAlgorithm;

    fn try_from(value: &'_ str) -> Result<Self, Self::Error> {
        match value {
            "RS256" => Ok(Algorithm::RS256),
            "RS384" => Ok(Algorithm::RS384),
            "RS512" => Ok(Algorithm::RS512),
            "PS256" => Ok(Algorithm::PS256),
            "PS384" => Ok(Algorithm::PS384),
            "PS512" => Ok(Algorithm::PS512),
            "ES256" => Ok(Algorithm::ES256),
            "ES384" => Ok(Algorithm::ES384),
            "EdDSA" => Ok(Algorithm::EdDSA),
            other => Err(error::unknown_algorithm(other.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_by_header_name() {
        let alg: Algorithm = serde_json::from_str("\"EdDSA\"").unwrap();
        assert_eq!(alg, Algorithm::EdDSA);
        assert_eq!(serde_json::to_string(&Algorithm::RS256).unwrap(), "\"RS256\"");
    }

    #[test]
    fn rejects_symmetric_algorithms() {
        assert!(serde_json::from_str::<Algorithm>("\"HS256\"").is_err());
        assert!(Algorithm::try_from("none").is_err());
    }
}
