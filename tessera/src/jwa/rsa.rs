//! RSA JSON Web Algorithm implementations

use serde::{Deserialize, Serialize};

use crate::b64::Base64Url;
use crate::{error, jwa, jws};

/// RSA public key components
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PublicKeyDto")]
pub struct PublicKey {
    /// The public modulus
    #[serde(rename = "n")]
    modulus: Base64Url,

    /// The public exponent
    #[serde(rename = "e")]
    exponent: Base64Url,
}

impl PublicKey {
    /// The public key's modulus
    #[must_use]
    pub fn modulus(&self) -> &Base64Url {
        &self.modulus
    }

    /// The public key's exponent
    #[must_use]
    pub fn exponent(&self) -> &Base64Url {
        &self.exponent
    }

    /// Constructs a public key from the modulus and exponent
    ///
    /// # Errors
    ///
    /// Returns an error if the modulus is not that of a 2048-bit key.
    pub fn from_components(
        modulus: impl Into<Base64Url>,
        exponent: impl Into<Base64Url>,
    ) -> Result<Self, error::KeyRejected> {
        let modulus = modulus.into();
        let exponent = exponent.into();
        if modulus.as_slice().len() != 256 {
            return Err(error::key_rejected("key modulus must be 2048 bits"));
        }

        Ok(Self { modulus, exponent })
    }

    fn verification_params(
        alg: jwa::Algorithm,
    ) -> Option<&'static ring::signature::RsaParameters> {
        match alg {
            jwa::Algorithm::RS256 => Some(&ring::signature::RSA_PKCS1_2048_8192_SHA256),
            jwa::Algorithm::RS384 => Some(&ring::signature::RSA_PKCS1_2048_8192_SHA384),
            jwa::Algorithm::RS512 => Some(&ring::signature::RSA_PKCS1_2048_8192_SHA512),
            jwa::Algorithm::PS256 => Some(&ring::signature::RSA_PSS_2048_8192_SHA256),
            jwa::Algorithm::PS384 => Some(&ring::signature::RSA_PSS_2048_8192_SHA384),
            jwa::Algorithm::PS512 => Some(&ring::signature::RSA_PSS_2048_8192_SHA512),
            _ => None,
        }
    }
}

impl jws::Verifier for PublicKey {
    type Algorithm = jwa::Algorithm;
    type Error = error::JwkVerifyError;

    fn can_verify(&self, alg: Self::Algorithm) -> bool {
        Self::verification_params(alg).is_some()
    }

    fn verify(
        &self,
        alg: Self::Algorithm,
        data: &[u8],
        signature: &[u8],
    ) -> Result<(), Self::Error> {
        let params =
            Self::verification_params(alg).ok_or_else(|| error::incompatible_algorithm(alg))?;

        let pk = ring::signature::RsaPublicKeyComponents {
            n: self.modulus.as_slice(),
            e: self.exponent.as_slice(),
        };

        pk.verify(params, data, signature)
            .map_err(|_| error::signature_mismatch().into())
    }
}

impl TryFrom<PublicKeyDto> for PublicKey {
    type Error = error::KeyRejected;

    fn try_from(dto: PublicKeyDto) -> Result<Self, Self::Error> {
        Self::from_components(dto.modulus, dto.exponent)
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Deserialize)]
struct PublicKeyDto {
    #[serde(rename = "n")]
    modulus: Base64Url,

    #[serde(rename = "e")]
    exponent: Base64Url,
}
