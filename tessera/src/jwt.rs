//! Implementations of the JSON Web Tokens (JWT) standard
//!
//! The specifications for this standard can be found in [RFC7519][].
//!
//! Unencrypted JWTs appear as a three-part base64-encoded string, where
//! each part is separated by a `.`. The first section is the header, whose
//! values elect the specific key used for verifying the token's
//! authenticity; because of this, header values are evaluated against
//! strict expectations before use. The second section is the payload,
//! carrying the claims subject to policy; nothing in it can be trusted
//! before the token's authenticity has been validated. The third section
//! is the binary signature over the first two sections exactly as they
//! appear on the wire.
//!
//! [RFC7519]: https://tools.ietf.org/html/rfc7519

use std::{fmt, time::Duration};

use aliri_braid::braid;
use serde::{Deserialize, Serialize};

use crate::b64::Base64Url;
use crate::clock::{Clock, System, UnixTime};
use crate::error::{self, ClaimsError, ClaimsRejected, ConfigurationError};
use crate::scope::Scope;
use crate::{jwa, jwk, jws};

pub mod assert;

/// An audience
#[braid(serde, ref_doc = "A borrowed reference to an [`Audience`]")]
pub struct Audience;

/// An issuer of JWTs
#[braid(serde, ref_doc = "A borrowed reference to an [`Issuer`]")]
pub struct Issuer;

/// The subject of a JWT
#[braid(serde, ref_doc = "A borrowed reference to a [`Subject`]")]
pub struct Subject;

/// A JSON Web Token
///
/// This type provides custom implementations of [`Display`][JwtRef#impl-Display] and
/// [`Debug`][JwtRef#impl-Debug] to prevent unintentional disclosures of sensitive values.
/// See the documentation on those trait implementations on the [`JwtRef`] type for more
/// information.
#[braid(
    serde,
    debug = "owned",
    display = "owned",
    ord = "omit",
    ref_doc = "\
    A borrowed reference to a JSON Web Token ([`Jwt`])\n\
    \n\
    This type provides custom implementations of [`Display`][Self#impl-Display] and \
    [`Debug`][Self#impl-Debug] to prevent unintentional disclosures of sensitive values. \
    See the documentation on those trait implementations for more information.
    "
)]
#[must_use]
pub struct Jwt;

/// By default, this type will not print out its contents without explicitly
/// specifying the alternate debug format, i.e. `{:#?}`. When specified in
/// that form, it will print out the entire header and payload, but will
/// omit the token's signature. To change the number of characters in the
/// signature that should be printed, specify the amount as a width in the
/// format string, i.e. `{:#25?}`.
///
/// If not specified, a placeholder value will be printed out instead to
/// indicate that it is hiding sensitive information.
impl fmt::Debug for JwtRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if f.alternate() {
            f.write_str("\"")?;
            let last_period = &self.0.rfind('.');
            if let Some(last_period) = *last_period {
                f.write_str(&self.0[..=last_period])?;
                limited_reveal(&self.0[last_period + 1..], &mut *f, 0)?;
            } else {
                limited_reveal(&self.0, &mut *f, 0)?;
            }
            f.write_str("\"")
        } else {
            f.write_str(concat!("***", "JWT", "***"))
        }
    }
}

/// By default, this type will not print out its contents without explicitly
/// specifying the alternate format, i.e. `{:#}`. When specified in that
/// form, it will print out the entire token. If it is preferable to elide
/// some of the characters in the signature, then that can be modified by
/// specifying the quantity as a width in the format string, i.e. `{:#10}`.
///
/// If not specified, a placeholder value will be printed out instead to
/// indicate that it is hiding sensitive information.
impl fmt::Display for JwtRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if f.alternate() {
            let last_period = &self.0.rfind('.');
            if let Some(last_period) = *last_period {
                f.write_str(&self.0[..=last_period])?;
                limited_reveal(&self.0[last_period + 1..], &mut *f, usize::MAX)
            } else {
                limited_reveal(&self.0, &mut *f, usize::MAX)
            }
        } else {
            f.write_str(concat!("***", "JWT", "***"))
        }
    }
}

fn limited_reveal(unprotected: &str, f: &mut fmt::Formatter, default_len: usize) -> fmt::Result {
    let max_len = f.width().unwrap_or(default_len);
    if max_len <= 1 {
        f.write_str("…")
    } else if max_len > unprotected.len() {
        f.write_str(unprotected)
    } else {
        match unprotected.char_indices().nth(max_len - 2) {
            Some((idx, c)) if idx + c.len_utf8() < unprotected.len() => {
                f.write_str(&unprotected[0..idx + c.len_utf8()])?;
                f.write_str("…")
            }
            _ => f.write_str(unprotected),
        }
    }
}

macro_rules! expect_three {
    ($iter:expr) => {{
        let mut i = $iter;
        match (i.next(), i.next(), i.next(), i.next()) {
            (Some(first), Some(second), Some(third), None) => Some((first, second, third)),
            _ => None,
        }
    }};
}

/// A decomposed JWT
///
/// Both JSON sections have been parsed and structurally validated, and the
/// original encoded segments retained so that signature verification
/// operates on the exact bytes presented by the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
#[must_use]
pub struct Decomposed<'a, C = Claims, H = Headers> {
    header: H,
    claims: C,
    message: &'a str,
    header_b64: &'a str,
    payload_b64: &'a str,
    signature: Base64Url,
}

impl JwtRef {
    /// Decomposes the JWT into its parts, preparing it for later processing
    ///
    /// # Errors
    ///
    /// Returns an error if the JWT does not have exactly three non-empty
    /// segments, if a segment is not valid base64url data, or if the header
    /// or payload is not a JSON object of the expected shape.
    pub fn decompose<C, H>(&self) -> Result<Decomposed<C, H>, error::JwtVerifyError>
    where
        C: for<'de> Deserialize<'de>,
        H: for<'de> Deserialize<'de>,
    {
        let (header_b64, payload_b64, s_str) =
            expect_three!(self.as_str().split('.')).ok_or_else(error::malformed_jwt)?;

        if header_b64.is_empty() || payload_b64.is_empty() || s_str.is_empty() {
            return Err(error::malformed_jwt().into());
        }

        let message = &self.as_str()[..header_b64.len() + 1 + payload_b64.len()];

        let h_raw = Base64Url::from_encoded(header_b64).map_err(error::malformed_jwt_header)?;
        let header: H =
            serde_json::from_slice(h_raw.as_slice()).map_err(error::malformed_jwt_header)?;

        let p_raw = Base64Url::from_encoded(payload_b64).map_err(error::malformed_jwt_payload)?;
        let claims: C =
            serde_json::from_slice(p_raw.as_slice()).map_err(error::malformed_jwt_payload)?;

        let signature = Base64Url::from_encoded(s_str).map_err(error::malformed_jwt_signature)?;

        Ok(Decomposed {
            header,
            claims,
            message,
            header_b64,
            payload_b64,
            signature,
        })
    }
}

impl<'a, C, H> Decomposed<'a, C, H> {
    /// The untrusted header of the JWT
    ///
    /// **WARNING:** *This header has not been validated and should not be
    /// trusted.* An adversary can place arbitrary data into the header and
    /// payload of a JWT.
    pub fn untrusted_header(&self) -> &H {
        &self.header
    }

    /// The untrusted claims of the JWT
    ///
    /// **WARNING:** *These claims have not been validated against the
    /// token's signature and should not be trusted beyond policy checks
    /// that will only release the token after verification.*
    pub fn untrusted_claims(&self) -> &C {
        &self.claims
    }

    /// The signing input of the JWT: the original encoded header and
    /// payload, separated by a `.`
    #[must_use]
    pub fn message(&self) -> &'a str {
        self.message
    }

    /// The original encoded header segment
    #[must_use]
    pub fn header_b64(&self) -> &'a str {
        self.header_b64
    }

    /// The original encoded payload segment
    #[must_use]
    pub fn payload_b64(&self) -> &'a str {
        self.payload_b64
    }

    /// The raw signature of the JWT
    pub fn signature(&self) -> &Base64Url {
        &self.signature
    }
}

impl<'a, C, H> Decomposed<'a, C, H>
where
    H: CoreHeaders,
{
    /// Verifies the decomposed JWT's signature against the given key
    ///
    /// The signing input is the original encoded bytes; the decomposed
    /// sections are never re-serialized.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is incompatible with the token's
    /// algorithm or if the signature does not match.
    pub fn verify_signature<V>(self, key: &V) -> Result<Validated<C, H>, error::JwtVerifyError>
    where
        V: jws::Verifier<Algorithm = jwa::Algorithm>,
        error::JwtVerifyError: From<V::Error>,
    {
        key.verify(
            self.header.alg(),
            self.message.as_bytes(),
            self.signature.as_slice(),
        )?;

        Ok(Validated {
            headers: self.header,
            claims: self.claims,
        })
    }
}

impl<'a, C, H> CoreHeaders for Decomposed<'a, C, H>
where
    H: CoreHeaders,
{
    fn alg(&self) -> jwa::Algorithm {
        self.header.alg()
    }

    fn kid(&self) -> Option<&jwk::KeyIdRef> {
        self.header.kid()
    }
}

/// The headers and claims of a JWT whose signature has been verified
///
/// This type can _only_ be generated by this crate's signature
/// verification, so holding one asserts the token's authenticity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Validated<C = Claims, H = Headers> {
    headers: H,
    claims: C,
}

impl<C, H> Validated<C, H> {
    /// Extracts the headers and claims from the token
    pub fn extract(self) -> (H, C) {
        (self.headers, self.claims)
    }

    /// The validated token headers
    pub fn headers(&self) -> &H {
        &self.headers
    }

    /// The validated token claims
    pub fn claims(&self) -> &C {
        &self.claims
    }
}

/// Indicates that the type has values common to a JWT header
pub trait CoreHeaders {
    /// Algorithm
    ///
    /// The algorithm that was used to sign the token. A verifier MUST
    /// reject a token whose algorithm the selected key cannot serve.
    fn alg(&self) -> jwa::Algorithm;

    /// Key ID
    ///
    /// The ID of the JWK used to sign this token. A verifier MUST use the
    /// JWK with the specified ID to verify the token.
    fn kid(&self) -> Option<&jwk::KeyIdRef>;
}

/// Core claims that most compliant and secure JWT tokens should have
pub trait CoreClaims {
    /// Not before
    ///
    /// A verifier MUST reject this token before the given time.
    fn nbf(&self) -> Option<UnixTime>;

    /// Expires
    ///
    /// A verifier MUST reject this token after the given time.
    fn exp(&self) -> Option<UnixTime>;

    /// Audience
    ///
    /// A verifier MUST reject this token if none of the audiences
    /// specified is approved.
    fn aud(&self) -> &Audiences;

    /// Issuer
    ///
    /// A verifier MUST reject this token if the issuer is not approved.
    fn iss(&self) -> Option<&IssuerRef>;

    /// Subject
    fn sub(&self) -> Option<&SubjectRef>;

    /// Scope
    ///
    /// The scopes granted to the bearer of this token.
    fn scope(&self) -> Option<&Scope>;
}

/// Minimal set of headers for common JWTs
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[must_use]
pub struct Headers {
    alg: jwa::Algorithm,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    kid: Option<jwk::KeyId>,
}

impl Headers {
    /// Constructs JWT headers for the specified algorithm
    pub const fn new(alg: jwa::Algorithm) -> Self {
        Self { alg, kid: None }
    }

    /// Constructs JWT headers with a specific algorithm and key ID
    pub fn with_key_id(alg: jwa::Algorithm, kid: impl Into<jwk::KeyId>) -> Self {
        Self {
            alg,
            kid: Some(kid.into()),
        }
    }
}

impl CoreHeaders for Headers {
    fn alg(&self) -> jwa::Algorithm {
        self.alg
    }

    fn kid(&self) -> Option<&jwk::KeyIdRef> {
        self.kid.as_deref()
    }
}

/// A set of zero or more [`Audience`]s
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "OneOrMany<Audience>", into = "OneOrMany<Audience>")]
#[repr(transparent)]
#[must_use]
pub struct Audiences(Vec<Audience>);

impl Audiences {
    /// An empty audience set
    #[inline]
    pub const fn empty() -> Self {
        Self(Vec::new())
    }

    /// An audience set with a single audience
    #[inline]
    pub fn single(aud: impl Into<Audience>) -> Self {
        Self(vec![aud.into()])
    }

    /// Indicates whether the audience set is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates through references to the audiences in the set
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &AudienceRef> {
        self.0.iter().map(AsRef::as_ref)
    }
}

impl From<OneOrMany<Audience>> for Audiences {
    #[inline]
    fn from(vals: OneOrMany<Audience>) -> Self {
        match vals {
            OneOrMany::One(x) => Self(vec![x]),
            OneOrMany::Many(v) => Self(v),
        }
    }
}

impl From<Audiences> for OneOrMany<Audience> {
    #[inline]
    fn from(mut vec: Audiences) -> Self {
        if vec.0.len() == 1 {
            Self::One(vec.0.pop().expect("a single element is present"))
        } else {
            Self::Many(vec.0)
        }
    }
}

impl From<Vec<Audience>> for Audiences {
    #[inline]
    fn from(vals: Vec<Audience>) -> Self {
        Self(vals)
    }
}

impl From<Audience> for Audiences {
    #[inline]
    fn from(aud: Audience) -> Self {
        Self::single(aud)
    }
}

/// A type representing one or more items, primarily for serialization
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    /// A single item
    One(T),

    /// Zero or more items, to be serialized/deserialized as an array
    Many(Vec<T>),
}

/// Common claims used in JWTs
///
/// Providers attach additional claims beyond these; callers needing them
/// can supply their own claim type wherever a `CoreClaims` bound appears.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[must_use]
pub struct Claims {
    #[serde(default, skip_serializing_if = "Audiences::is_empty")]
    aud: Audiences,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    iss: Option<Issuer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sub: Option<Subject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    exp: Option<UnixTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    nbf: Option<UnixTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    iat: Option<UnixTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    jti: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    scope: Option<Scope>,
}

impl Default for Claims {
    fn default() -> Self {
        Self::new()
    }
}

impl Claims {
    /// Constructs a new, empty set of claims
    pub const fn new() -> Self {
        Self {
            aud: Audiences::empty(),
            iss: None,
            sub: None,
            exp: None,
            nbf: None,
            iat: None,
            jti: None,
            scope: None,
        }
    }

    /// Sets the `aud` claim
    pub fn with_audience(mut self, aud: impl Into<Audience>) -> Self {
        self.aud = Audiences::from(vec![aud.into()]);
        self
    }

    /// Sets the `aud` claim, where multiple audiences are allowed
    pub fn with_audiences(mut self, aud: impl Into<Audiences>) -> Self {
        self.aud = aud.into();
        self
    }

    /// Sets the `iss` claim
    pub fn with_issuer(mut self, iss: impl Into<Issuer>) -> Self {
        self.iss = Some(iss.into());
        self
    }

    /// Sets the `sub` claim
    pub fn with_subject(mut self, sub: impl Into<Subject>) -> Self {
        self.sub = Some(sub.into());
        self
    }

    /// Sets the `exp` claim
    pub fn with_expiration(mut self, time: UnixTime) -> Self {
        self.exp = Some(time);
        self
    }

    /// Sets the `exp` claim relative to the system clock
    pub fn with_future_expiration(self, secs: u64) -> Self {
        self.with_future_expiration_from_clock(secs, &System)
    }

    /// Sets the `exp` claim relative to the specified clock
    pub fn with_future_expiration_from_clock<C: Clock>(mut self, secs: u64, clock: &C) -> Self {
        let n = clock.now();
        self.exp = Some(UnixTime(n.0 + secs));
        self
    }

    /// Sets the `nbf` claim
    pub fn with_not_before(mut self, time: UnixTime) -> Self {
        self.nbf = Some(time);
        self
    }

    /// Sets the `iat` claim
    pub fn with_issued_at(mut self, time: UnixTime) -> Self {
        self.iat = Some(time);
        self
    }

    /// Sets the `jti` claim
    pub fn with_jwt_id(mut self, jti: impl Into<String>) -> Self {
        self.jti = Some(jti.into());
        self
    }

    /// Sets the `scope` claim
    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = Some(scope);
        self
    }

    /// The `iat` claim, if present
    #[must_use]
    pub fn iat(&self) -> Option<UnixTime> {
        self.iat
    }

    /// The `jti` claim, if present
    #[must_use]
    pub fn jwt_id(&self) -> Option<&str> {
        self.jti.as_deref()
    }
}

impl CoreClaims for Claims {
    fn nbf(&self) -> Option<UnixTime> {
        self.nbf
    }

    fn exp(&self) -> Option<UnixTime> {
        self.exp
    }

    fn aud(&self) -> &Audiences {
        &self.aud
    }

    fn iss(&self) -> Option<&IssuerRef> {
        self.iss.as_deref()
    }

    fn sub(&self) -> Option<&SubjectRef> {
        self.sub.as_deref()
    }

    fn scope(&self) -> Option<&Scope> {
        self.scope.as_ref()
    }
}

/// A three-valued check policy
///
/// Distinguishes "check against these values" and "this check is
/// intentionally disabled" from "nobody made a choice". The last is always
/// rejected when the policy is evaluated, so a forgotten configuration
/// cannot silently skip a check.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[must_use]
pub enum Expect<T> {
    /// The check must match one of the given values
    Required(T),

    /// The check is intentionally disabled
    Disabled,

    /// No explicit choice was made; evaluation will fail
    #[default]
    Unspecified,
}

impl<T> Expect<T> {
    /// Whether no explicit choice was made
    #[must_use]
    pub fn is_unspecified(&self) -> bool {
        matches!(self, Self::Unspecified)
    }

    /// Whether the check was explicitly disabled
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        matches!(self, Self::Disabled)
    }

    /// The required values, if any
    #[must_use]
    pub fn required(&self) -> Option<&T> {
        match self {
            Self::Required(value) => Some(value),
            _ => None,
        }
    }
}

/// A policy for validating the registered claims of a JWT
///
/// The issuer and audience checks are three-valued (see [`Expect`]);
/// leaving either unspecified is reported as a configuration error at
/// evaluation time.
#[derive(Clone, Debug, Default)]
#[must_use]
pub struct ClaimsPolicy {
    issuer: Expect<Vec<Issuer>>,
    audience: Expect<Vec<Audience>>,
    scope: Option<Scope>,
    leeway: Duration,
}

impl ClaimsPolicy {
    /// Allows a grace period for token validation
    ///
    /// Applies on either side of the "not before" and "expires" claims.
    #[inline]
    pub fn with_leeway(self, leeway: Duration) -> Self {
        Self { leeway, ..self }
    }

    /// Allows a grace period (in seconds) for token validation
    ///
    /// Applies on either side of the "not before" and "expires" claims.
    #[inline]
    pub fn with_leeway_secs(self, leeway: u64) -> Self {
        Self {
            leeway: Duration::from_secs(leeway),
            ..self
        }
    }

    /// Adds an issuer to the set of allowed issuers
    pub fn require_issuer(mut self, issuer: Issuer) -> Self {
        match &mut self.issuer {
            Expect::Required(allowed) => allowed.push(issuer),
            slot => *slot = Expect::Required(vec![issuer]),
        }
        self
    }

    /// Explicitly disables the issuer check
    pub fn ignore_issuer(self) -> Self {
        Self {
            issuer: Expect::Disabled,
            ..self
        }
    }

    /// Replaces the issuer policy wholesale
    pub fn with_issuer_policy(self, issuer: Expect<Vec<Issuer>>) -> Self {
        Self { issuer, ..self }
    }

    /// Adds a single audience to the set of allowed audiences
    pub fn add_allowed_audience(mut self, audience: Audience) -> Self {
        match &mut self.audience {
            Expect::Required(allowed) => allowed.push(audience),
            slot => *slot = Expect::Required(vec![audience]),
        }
        self
    }

    /// Adds multiple audiences to the set of allowed audiences
    pub fn extend_allowed_audiences<I: IntoIterator<Item = Audience>>(mut self, auds: I) -> Self {
        for aud in auds {
            self = self.add_allowed_audience(aud);
        }
        self
    }

    /// Explicitly disables the audience check
    pub fn ignore_audience(self) -> Self {
        Self {
            audience: Expect::Disabled,
            ..self
        }
    }

    /// Replaces the audience policy wholesale
    pub fn with_audience_policy(self, audience: Expect<Vec<Audience>>) -> Self {
        Self { audience, ..self }
    }

    /// Requires the token's scopes to overlap the given set
    pub fn require_scope(self, scope: Scope) -> Self {
        Self {
            scope: Some(scope),
            ..self
        }
    }

    /// Evaluates the policy against the given claims using the system clock
    ///
    /// # Errors
    ///
    /// Returns an error if the policy is incomplete or if the claims do
    /// not satisfy it.
    pub fn evaluate<T: CoreClaims>(&self, claims: &T) -> Result<(), ClaimsError> {
        self.evaluate_with_clock(claims, &System)
    }

    /// Evaluates the policy against the given claims using the given clock
    ///
    /// # Errors
    ///
    /// Returns an error if the policy is incomplete or if the claims do
    /// not satisfy it.
    pub fn evaluate_with_clock<T: CoreClaims, C: Clock>(
        &self,
        claims: &T,
        clock: &C,
    ) -> Result<(), ClaimsError> {
        if self.issuer.is_unspecified() {
            return Err(ConfigurationError::UnspecifiedPolicy("issuer").into());
        }

        if self.audience.is_unspecified() {
            return Err(ConfigurationError::UnspecifiedPolicy("audience").into());
        }

        let now = clock.now();
        let leeway = self.leeway.as_secs();

        if let Some(exp) = claims.exp() {
            if exp.0.saturating_add(leeway) < now.0 {
                return Err(ClaimsRejected::TokenExpired { expiry: exp, now }.into());
            }
        }

        if let Some(nbf) = claims.nbf() {
            if nbf.0.saturating_sub(leeway) > now.0 {
                return Err(ClaimsRejected::TokenNotYetValid {
                    not_before: nbf,
                    now,
                }
                .into());
            }
        }

        if let Expect::Required(allowed) = &self.issuer {
            let iss = claims
                .iss()
                .ok_or(ClaimsRejected::MissingRequiredClaim("iss"))?;

            assert::value_among(iss.as_str(), allowed.iter().map(|i| i.as_str()))
                .map_err(ClaimsRejected::InvalidIssuer)?;
        }

        if let Expect::Required(allowed) = &self.audience {
            if claims.aud().is_empty() {
                return Err(ClaimsRejected::MissingRequiredClaim("aud").into());
            }

            assert::sets_overlap(
                claims.aud().iter().map(|a| a.as_str()),
                allowed.iter().map(|a| a.as_str()),
            )
            .map_err(ClaimsRejected::InvalidAudience)?;
        }

        if let Some(required) = &self.scope {
            assert::sets_overlap(
                claims
                    .scope()
                    .into_iter()
                    .flat_map(|s| s.iter())
                    .map(|t| t.as_str()),
                required.iter().map(|t| t.as_str()),
            )
            .map_err(ClaimsRejected::InvalidScope)?;
        }

        Ok(())
    }
}
