//! Edwards-curve (octet key pair) JSON Web Algorithm implementations

use serde::{Deserialize, Serialize};

use crate::b64::Base64Url;
use crate::{error, jwa, jws};

/// A named Edwards curve
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum Curve {
    /// The Ed25519 signature curve
    Ed25519,
}

/// Edwards-curve public key parameters
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct PublicKey {
    /// The named curve
    crv: Curve,

    /// The public key bytes
    x: Base64Url,
}

impl PublicKey {
    /// Constructs an Ed25519 public key from its raw bytes
    pub fn ed25519(x: impl Into<Base64Url>) -> Self {
        Self {
            crv: Curve::Ed25519,
            x: x.into(),
        }
    }

    /// The named curve of this key
    #[must_use]
    pub fn curve(&self) -> Curve {
        self.crv
    }
}

impl jws::Verifier for PublicKey {
    type Algorithm = jwa::Algorithm;
    type Error = error::JwkVerifyError;

    fn can_verify(&self, alg: Self::Algorithm) -> bool {
        matches!(alg, jwa::Algorithm::EdDSA)
    }

    fn verify(
        &self,
        alg: Self::Algorithm,
        data: &[u8],
        signature: &[u8],
    ) -> Result<(), Self::Error> {
        if !matches!(alg, jwa::Algorithm::EdDSA) {
            return Err(error::incompatible_algorithm(alg).into());
        }

        let key =
            ring::signature::UnparsedPublicKey::new(&ring::signature::ED25519, self.x.as_slice());

        key.verify(data, signature)
            .map_err(|_| error::signature_mismatch().into())
    }
}
