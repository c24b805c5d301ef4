//! ECDSA JSON Web Algorithm implementations

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::b64::Base64Url;
use crate::{error, jwa, jws};

/// A named ECC curve
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum Curve {
    /// The P-256 curve (prime256v1/secp256r1)
    #[serde(rename = "P-256")]
    P256,

    /// The P-384 curve (secp384r1)
    #[serde(rename = "P-384")]
    P384,
}

impl fmt::Display for Curve {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Self::P256 => "P-256",
            Self::P384 => "P-384",
        };

        f.write_str(s)
    }
}

/// Elliptic curve public key parameters
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct PublicKey {
    /// The named curve
    crv: Curve,

    /// The x-coordinate of the public point
    x: Base64Url,

    /// The y-coordinate of the public point
    y: Base64Url,
}

impl PublicKey {
    /// Constructs a public key from its curve and point coordinates
    pub fn from_coordinates(
        crv: Curve,
        x: impl Into<Base64Url>,
        y: impl Into<Base64Url>,
    ) -> Self {
        Self {
            crv,
            x: x.into(),
            y: y.into(),
        }
    }

    /// The named curve of this key
    #[must_use]
    pub fn curve(&self) -> Curve {
        self.crv
    }

    fn verification_algorithm(
        &self,
        alg: jwa::Algorithm,
    ) -> Option<&'static ring::signature::EcdsaVerificationAlgorithm> {
        match (alg, self.crv) {
            (jwa::Algorithm::ES256, Curve::P256) => Some(&ring::signature::ECDSA_P256_SHA256_FIXED),
            (jwa::Algorithm::ES384, Curve::P384) => Some(&ring::signature::ECDSA_P384_SHA384_FIXED),
            _ => None,
        }
    }

    /// The key expressed as an uncompressed SEC 1 point
    fn uncompressed_point(&self) -> Vec<u8> {
        let x = self.x.as_slice();
        let y = self.y.as_slice();
        let mut point = Vec::with_capacity(1 + x.len() + y.len());
        point.push(0x04);
        point.extend_from_slice(x);
        point.extend_from_slice(y);
        point
    }
}

impl jws::Verifier for PublicKey {
    type Algorithm = jwa::Algorithm;
    type Error = error::JwkVerifyError;

    fn can_verify(&self, alg: Self::Algorithm) -> bool {
        self.verification_algorithm(alg).is_some()
    }

    fn verify(
        &self,
        alg: Self::Algorithm,
        data: &[u8],
        signature: &[u8],
    ) -> Result<(), Self::Error> {
        let params = self
            .verification_algorithm(alg)
            .ok_or_else(|| error::incompatible_algorithm(alg))?;

        let key = ring::signature::UnparsedPublicKey::new(params, self.uncompressed_point());

        key.verify(data, signature)
            .map_err(|_| error::signature_mismatch().into())
    }
}
