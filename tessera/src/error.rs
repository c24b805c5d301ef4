//! Common errors

#![allow(missing_copy_implementations)]

use std::error::Error as StdError;

use thiserror::Error;

use crate::clock::UnixTime;

/// The caller misconfigured the verifier or a per-call policy
///
/// These errors indicate a mistake on the relying party's side rather than
/// a defect in the presented token, and are never retried.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// A check that requires an explicit choice was left unset
    ///
    /// Checks are either given required values or explicitly disabled;
    /// leaving one unset is treated as a forgotten configuration.
    #[error("no policy specified for the `{0}` check; provide a value or explicitly disable it")]
    UnspecifiedPolicy(&'static str),

    /// The named issuer is not registered with the verifier
    #[error("issuer '{0}' is not registered")]
    UnknownIssuer(String),

    /// Multiple issuers are configured and the call did not name one
    #[error("multiple issuers are configured; the call must name an issuer")]
    IssuerRequired,

    /// Two issuer configurations share the same issuer string
    #[error("issuer '{0}' is configured more than once")]
    DuplicateIssuer(String),

    /// The user-pool identifier does not match the required shape
    #[error("malformed user-pool identifier '{0}'")]
    MalformedPoolId(String),
}

/// The JWK cannot be used with the requested algorithm
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Error)]
#[error("key incompatible with algorithm '{alg}'")]
pub struct IncompatibleAlgorithm {
    alg: crate::jwa::Algorithm,
}

#[inline]
pub(crate) fn incompatible_algorithm(
    alg: impl Into<crate::jwa::Algorithm>,
) -> IncompatibleAlgorithm {
    IncompatibleAlgorithm { alg: alg.into() }
}

/// The provided name could not be matched with supported algorithms
#[derive(Debug, Error)]
#[error("'{alg}' does not match supported algorithms")]
pub struct UnknownAlgorithm {
    alg: String,
}

#[inline]
pub(crate) fn unknown_algorithm(alg: String) -> UnknownAlgorithm {
    UnknownAlgorithm { alg }
}

/// The JWK has a specific usage that disallows this use
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Error)]
#[error("JWK cannot be used in this way")]
pub struct JwkUsageMismatch {
    _p: (),
}

pub(crate) const fn jwk_usage_mismatch() -> JwkUsageMismatch {
    JwkUsageMismatch { _p: () }
}

/// The JWT is malformed and cannot be parsed out into header, payload, and signature sections
#[derive(Clone, Copy, Debug, Error)]
#[error("malformed JWT")]
pub struct MalformedJwt {
    _p: (),
}

pub(crate) fn malformed_jwt() -> MalformedJwt {
    MalformedJwt { _p: () }
}

/// The JWT header section is malformed
#[derive(Debug, Error)]
#[error("malformed JWT header")]
pub struct MalformedJwtHeader {
    #[from]
    source: Box<dyn StdError + Send + Sync + 'static>,
}

pub(crate) fn malformed_jwt_header(
    source: impl Into<Box<dyn StdError + Send + Sync + 'static>>,
) -> MalformedJwtHeader {
    MalformedJwtHeader {
        source: source.into(),
    }
}

/// The JWT payload section is malformed
#[derive(Debug, Error)]
#[error("malformed JWT payload")]
pub struct MalformedJwtPayload {
    #[from]
    source: Box<dyn StdError + Send + Sync + 'static>,
}

pub(crate) fn malformed_jwt_payload(
    source: impl Into<Box<dyn StdError + Send + Sync + 'static>>,
) -> MalformedJwtPayload {
    MalformedJwtPayload {
        source: source.into(),
    }
}

/// The JWT signature section is malformed
#[derive(Debug, Error)]
#[error("malformed JWT signature")]
pub struct MalformedJwtSignature {
    #[from]
    source: Box<dyn StdError + Send + Sync + 'static>,
}

pub(crate) fn malformed_jwt_signature(
    source: impl Into<Box<dyn StdError + Send + Sync + 'static>>,
) -> MalformedJwtSignature {
    MalformedJwtSignature {
        source: source.into(),
    }
}

/// The signature did not match
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Error)]
#[error("signature mismatch")]
pub struct SignatureMismatch {
    _p: (),
}

pub(crate) const fn signature_mismatch() -> SignatureMismatch {
    SignatureMismatch { _p: () }
}

/// The key was rejected
#[derive(Debug, Error)]
#[error("key rejected")]
pub struct KeyRejected {
    #[from]
    source: Box<dyn StdError + Send + Sync + 'static>,
}

pub(crate) fn key_rejected(
    source: impl Into<Box<dyn StdError + Send + Sync + 'static>>,
) -> KeyRejected {
    KeyRejected {
        source: source.into(),
    }
}

/// A claim value that did not satisfy the evaluated check
///
/// Carries the offending claim value and the set of values the policy
/// would have accepted.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("got {actual:?}, expected one of {expected:?}")]
pub struct UnexpectedClaimValue {
    actual: Vec<String>,
    expected: Vec<String>,
}

impl UnexpectedClaimValue {
    /// Constructs a new value from the offending and expected values
    pub fn new<A, E>(actual: A, expected: E) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        E: IntoIterator,
        E::Item: Into<String>,
    {
        Self {
            actual: actual.into_iter().map(Into::into).collect(),
            expected: expected.into_iter().map(Into::into).collect(),
        }
    }

    /// The offending claim values (empty if the claim was absent)
    #[must_use]
    pub fn actual(&self) -> &[String] {
        &self.actual
    }

    /// The values the policy would have accepted
    #[must_use]
    pub fn expected(&self) -> &[String] {
        &self.expected
    }
}

/// An error occurring while verifying a signature with a JWK
#[derive(Debug, Error)]
pub enum JwkVerifyError {
    /// JWT cannot be used with this algorithm
    #[error(transparent)]
    IncompatibleAlgorithm(#[from] IncompatibleAlgorithm),

    /// JWK cannot be used for signature verification
    #[error(transparent)]
    JwkUsageMismatch(#[from] JwkUsageMismatch),

    /// Signature is invalid
    #[error(transparent)]
    SignatureMismatch(#[from] SignatureMismatch),
}

impl JwkVerifyError {
    /// Whether the error is due to an incompatible algorithm
    #[must_use]
    pub fn is_incompatible_alg(&self) -> bool {
        matches!(self, Self::IncompatibleAlgorithm(_))
    }

    /// Whether the error is due to a usage mismatch
    #[must_use]
    pub fn is_usage_mismatch(&self) -> bool {
        matches!(self, Self::JwkUsageMismatch(_))
    }

    /// Whether the error is due to a signature mismatch
    #[must_use]
    pub fn is_signature_mismatch(&self) -> bool {
        matches!(self, Self::SignatureMismatch(_))
    }
}

/// An error occurring while verifying a JWT
#[derive(Debug, Error)]
pub enum JwtVerifyError {
    /// The JWT was rejected by the JWK
    #[error("token rejected by JWK")]
    JwkVerifyError(#[from] JwkVerifyError),

    /// The JWT is malformed, without a discernible header, payload, and signature
    #[error(transparent)]
    MalformedToken(#[from] MalformedJwt),

    /// The JWT header is malformed
    #[error(transparent)]
    MalformedTokenHeader(#[from] MalformedJwtHeader),

    /// The JWT payload is malformed
    #[error(transparent)]
    MalformedTokenPayload(#[from] MalformedJwtPayload),

    /// The JWT signature is malformed
    #[error(transparent)]
    MalformedTokenSignature(#[from] MalformedJwtSignature),

    /// The JWT was rejected by the claims validator
    #[error("token rejected by claims validator")]
    ClaimsRejected(#[from] ClaimsRejected),
}

/// An error occurring when validating the claims of a JWT
#[derive(Debug, Error)]
pub enum ClaimsRejected {
    /// The token is expired according to the `exp` claim
    #[error("token expired at {expiry} (now {now})")]
    TokenExpired {
        /// The expiry asserted by the token
        expiry: UnixTime,
        /// The time the check was evaluated
        now: UnixTime,
    },

    /// The token is not yet valid according to the `nbf` claim
    #[error("token not valid until {not_before} (now {now})")]
    TokenNotYetValid {
        /// The validity start asserted by the token
        not_before: UnixTime,
        /// The time the check was evaluated
        now: UnixTime,
    },

    /// The token issuer is not acceptable
    #[error("invalid issuer: {0}")]
    InvalidIssuer(UnexpectedClaimValue),

    /// The token audience is not acceptable
    #[error("invalid audience: {0}")]
    InvalidAudience(UnexpectedClaimValue),

    /// The token scope is not acceptable
    #[error("invalid scope: {0}")]
    InvalidScope(UnexpectedClaimValue),

    /// A required claim is missing
    #[error("required {0} claim missing")]
    MissingRequiredClaim(&'static str),
}

/// An error raised while evaluating a claims policy
///
/// Distinguishes a defective policy from a defective token.
#[derive(Debug, Error)]
pub enum ClaimsError {
    /// The policy itself was incomplete
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// The token did not satisfy the policy
    #[error(transparent)]
    Rejected(#[from] ClaimsRejected),
}
