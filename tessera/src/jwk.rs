//! Implementations of the JSON Web Keys (JWK) standard
//!
//! The specifications for JSON Web Keys can be found in [RFC7517][].
//!
//! [RFC7517]: https://tools.ietf.org/html/rfc7517

use aliri_braid::braid;
use serde::Deserialize;

use crate::jws::Verifier as _;
use crate::{error, jwa, jws};

/// An identifier for a JWK
#[braid(serde, ref_doc = "A borrowed reference to a JWK identifier ([`KeyId`])")]
pub struct KeyId;

/// An identified JSON Web Key
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(from = "JwkDto")]
#[must_use]
pub struct Jwk {
    key_id: Option<KeyId>,
    usage: Option<jwa::Usage>,
    algorithm: Option<jwa::Algorithm>,
    key: Key,
}

impl Jwk {
    /// The key ID
    #[must_use]
    pub fn key_id(&self) -> Option<&KeyIdRef> {
        self.key_id.as_deref()
    }

    /// The intended usage of the key
    #[must_use]
    pub fn usage(&self) -> Option<jwa::Usage> {
        self.usage
    }

    /// The algorithm to be used with this JWK
    #[must_use]
    pub fn algorithm(&self) -> Option<jwa::Algorithm> {
        self.algorithm
    }

    /// Whether the key is compatible with the given algorithm
    #[must_use]
    pub fn is_compatible(&self, alg: jwa::Algorithm) -> bool {
        self.key.can_verify(alg)
    }

    /// Sets the key ID
    pub fn with_key_id(self, kid: impl Into<KeyId>) -> Self {
        Self {
            key_id: Some(kid.into()),
            ..self
        }
    }

    /// Sets the key's usage
    pub fn with_usage(self, usage: jwa::Usage) -> Self {
        Self {
            usage: Some(usage),
            ..self
        }
    }

    /// Sets the algorithm and usage consistent with that algorithm
    pub fn with_algorithm(self, alg: impl Into<jwa::Algorithm>) -> Self {
        let alg = alg.into();
        Self {
            algorithm: Some(alg),
            usage: Some(alg.to_usage()),
            ..self
        }
    }
}

impl From<jwa::rsa::PublicKey> for Jwk {
    fn from(key: jwa::rsa::PublicKey) -> Self {
        Self {
            key_id: None,
            usage: None,
            algorithm: None,
            key: Key::Rsa(key),
        }
    }
}

impl From<jwa::ec::PublicKey> for Jwk {
    fn from(key: jwa::ec::PublicKey) -> Self {
        Self {
            key_id: None,
            usage: None,
            algorithm: None,
            key: Key::EllipticCurve(key),
        }
    }
}

impl From<jwa::okp::PublicKey> for Jwk {
    fn from(key: jwa::okp::PublicKey) -> Self {
        Self {
            key_id: None,
            usage: None,
            algorithm: None,
            key: Key::OctetKeyPair(key),
        }
    }
}

impl jws::Verifier for Jwk {
    type Algorithm = jwa::Algorithm;
    type Error = error::JwkVerifyError;

    fn can_verify(&self, alg: Self::Algorithm) -> bool {
        if let Some(u) = self.usage {
            if u != jwa::Usage::Signing {
                return false;
            }
        }

        if let Some(key_alg) = self.algorithm {
            if key_alg != alg {
                return false;
            }
        }

        self.key.can_verify(alg)
    }

    fn verify(
        &self,
        alg: Self::Algorithm,
        data: &[u8],
        signature: &[u8],
    ) -> Result<(), Self::Error> {
        if let Some(u) = self.usage {
            if u != jwa::Usage::Signing {
                return Err(error::jwk_usage_mismatch().into());
            }
        }

        match self.algorithm {
            Some(key_alg) if key_alg == alg => {}
            Some(_) => {
                return Err(error::incompatible_algorithm(alg).into());
            }
            None => {}
        }

        self.key.verify(alg, data, signature)
    }
}

/// Public key material, discriminated by key type
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "kty")]
enum Key {
    /// An RSA public key
    #[serde(rename = "RSA")]
    Rsa(jwa::rsa::PublicKey),

    /// An elliptic curve public key
    #[serde(rename = "EC")]
    EllipticCurve(jwa::ec::PublicKey),

    /// An octet key pair public key
    #[serde(rename = "OKP")]
    OctetKeyPair(jwa::okp::PublicKey),
}

impl Key {
    fn can_verify(&self, alg: jwa::Algorithm) -> bool {
        match self {
            Self::Rsa(k) => k.can_verify(alg),
            Self::EllipticCurve(k) => k.can_verify(alg),
            Self::OctetKeyPair(k) => k.can_verify(alg),
        }
    }

    fn verify(
        &self,
        alg: jwa::Algorithm,
        data: &[u8],
        signature: &[u8],
    ) -> Result<(), error::JwkVerifyError> {
        match self {
            Self::Rsa(k) => k.verify(alg, data, signature),
            Self::EllipticCurve(k) => k.verify(alg, data, signature),
            Self::OctetKeyPair(k) => k.verify(alg, data, signature),
        }
    }
}

#[derive(Deserialize)]
struct JwkDto {
    #[serde(default)]
    kid: Option<KeyId>,

    #[serde(rename = "use", default)]
    usage: Option<jwa::Usage>,

    #[serde(default)]
    alg: Option<jwa::Algorithm>,

    #[serde(flatten)]
    key: Key,
}

impl From<JwkDto> for Jwk {
    fn from(dto: JwkDto) -> Self {
        Self {
            key_id: dto.kid,
            usage: dto.usage,
            algorithm: dto.alg,
            key: dto.key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zero_modulus() -> String {
        // 342 base64url characters decode to 256 zero bytes
        "A".repeat(342)
    }

    #[test]
    fn deserializes_rsa_jwk() {
        let json = format!(
            r#"{{"kty":"RSA","kid":"key-1","use":"sig","alg":"RS256","n":"{}","e":"AQAB"}}"#,
            zero_modulus()
        );

        let jwk: Jwk = serde_json::from_str(&json).unwrap();
        assert_eq!(jwk.key_id(), Some(KeyIdRef::from_str("key-1")));
        assert_eq!(jwk.usage(), Some(jwa::Usage::Signing));
        assert_eq!(jwk.algorithm(), Some(jwa::Algorithm::RS256));
        assert!(jwk.is_compatible(jwa::Algorithm::RS256));
        assert!(!jwk.is_compatible(jwa::Algorithm::ES256));
    }

    #[test]
    fn rejects_undersized_rsa_modulus() {
        let json = r#"{"kty":"RSA","n":"AAAA","e":"AQAB"}"#;
        assert!(serde_json::from_str::<Jwk>(json).is_err());
    }

    #[test]
    fn deserializes_okp_jwk() {
        let json = r#"{"kty":"OKP","crv":"Ed25519","kid":"ed","x":"AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA"}"#;
        let jwk: Jwk = serde_json::from_str(json).unwrap();
        assert!(jwk.is_compatible(jwa::Algorithm::EdDSA));
    }

    #[test]
    fn encryption_use_blocks_verification() {
        use crate::jws::Verifier as _;

        let json = r#"{"kty":"OKP","crv":"Ed25519","use":"enc","x":"AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA"}"#;
        let jwk: Jwk = serde_json::from_str(json).unwrap();
        let err = jwk
            .verify(jwa::Algorithm::EdDSA, b"data", b"sig")
            .unwrap_err();
        assert!(err.is_usage_mismatch());
    }

    #[test]
    fn declared_algorithm_must_match() {
        use crate::jws::Verifier as _;

        let json = r#"{"kty":"OKP","crv":"Ed25519","alg":"EdDSA","x":"AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA"}"#;
        let jwk: Jwk = serde_json::from_str(json).unwrap();
        let err = jwk.verify(jwa::Algorithm::RS256, b"data", b"sig").unwrap_err();
        assert!(err.is_incompatible_alg());
    }
}
