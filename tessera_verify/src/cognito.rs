//! Amazon Cognito user-pool claim profile
//!
//! Cognito user pools publish their signing keys under a well-known path
//! derived from the pool identifier, and mint two token shapes: `id`
//! tokens carry the app client id in the standard `aud` claim, while
//! `access` tokens carry it in a provider-specific `client_id` claim and
//! have no `aud` at all. This profile derives the issuer configuration
//! from a pool identifier and applies the provider's claim rules after
//! signature verification.

use std::fmt;

use aliri_braid::braid;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use tessera::error::{ConfigurationError, UnexpectedClaimValue};
use tessera::jwt::{assert, Audiences, Claims, CoreClaims, Expect, Issuer, IssuerRef, SubjectRef};
use tessera::scope::Scope;

use crate::authority::VerifyErrorKind;
use crate::config::IssuerConfig;
use crate::profile::ClaimsProfile;

/// A Cognito user-pool identifier, e.g. `eu-west-1_AbCdEfGhI`
#[braid(
    serde,
    ref_doc = "A borrowed reference to a Cognito user-pool identifier ([`PoolId`])"
)]
pub struct PoolId;

// the region shape is deliberately permissive; provider region naming has
// grown new prefixes before and the issuer check binds the result anyway
static POOL_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\w+-\w+-\d)_\w+$").expect("pool id pattern is valid"));

/// The `token_use` values Cognito mints
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenUse {
    /// An identity token; carries the app client id in `aud`
    Id,

    /// An access token; carries the app client id in `client_id`
    Access,
}

impl TokenUse {
    /// The claim value for this token use
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Access => "access",
        }
    }
}

impl fmt::Display for TokenUse {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The claim set carried by Cognito user-pool tokens
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[must_use]
pub struct CognitoClaims {
    #[serde(flatten)]
    core: Claims,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    token_use: Option<String>,

    #[serde(rename = "cognito:groups", default, skip_serializing_if = "Vec::is_empty")]
    groups: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    client_id: Option<String>,
}

impl CognitoClaims {
    /// Wraps a set of registered claims with empty provider claims
    pub fn new(core: Claims) -> Self {
        Self {
            core,
            token_use: None,
            groups: Vec::new(),
            client_id: None,
        }
    }

    /// Sets the `token_use` claim
    pub fn with_token_use(mut self, token_use: impl Into<String>) -> Self {
        self.token_use = Some(token_use.into());
        self
    }

    /// Sets the `cognito:groups` claim
    pub fn with_groups<I>(mut self, groups: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.groups = groups.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the `client_id` claim
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// The `token_use` claim, if present
    #[must_use]
    pub fn token_use(&self) -> Option<&str> {
        self.token_use.as_deref()
    }

    /// The `cognito:groups` claim
    #[must_use]
    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    /// The `client_id` claim, if present
    #[must_use]
    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    /// The registered claims
    #[must_use]
    pub fn core(&self) -> &Claims {
        &self.core
    }
}

impl From<Claims> for CognitoClaims {
    fn from(core: Claims) -> Self {
        Self::new(core)
    }
}

impl CoreClaims for CognitoClaims {
    fn nbf(&self) -> Option<tessera::clock::UnixTime> {
        self.core.nbf()
    }

    fn exp(&self) -> Option<tessera::clock::UnixTime> {
        self.core.exp()
    }

    fn aud(&self) -> &Audiences {
        self.core.aud()
    }

    fn iss(&self) -> Option<&IssuerRef> {
        self.core.iss()
    }

    fn sub(&self) -> Option<&SubjectRef> {
        self.core.sub()
    }

    fn scope(&self) -> Option<&Scope> {
        self.core.scope()
    }
}

/// Per-call options for the Cognito claim checks
///
/// The token-use and client-id checks are three-valued (see [`Expect`]);
/// both must be given values or explicitly disabled before a token can
/// verify.
#[derive(Clone, Debug, Default)]
#[must_use]
pub struct CognitoOptions {
    groups: Option<Vec<String>>,
    token_use: Expect<TokenUse>,
    client_id: Expect<Vec<String>>,
}

impl CognitoOptions {
    /// Requires membership in the given group
    ///
    /// May be called repeatedly; the token must belong to at least one of
    /// the required groups.
    pub fn require_group(mut self, group: impl Into<String>) -> Self {
        self.groups.get_or_insert_with(Vec::new).push(group.into());
        self
    }

    /// Requires the token to be of the given use
    pub fn require_token_use(mut self, token_use: TokenUse) -> Self {
        self.token_use = Expect::Required(token_use);
        self
    }

    /// Explicitly accepts both token uses
    pub fn any_token_use(mut self) -> Self {
        self.token_use = Expect::Disabled;
        self
    }

    /// Adds an app client id to the set of allowed client ids
    pub fn require_client_id(mut self, client_id: impl Into<String>) -> Self {
        match &mut self.client_id {
            Expect::Required(allowed) => allowed.push(client_id.into()),
            slot => *slot = Expect::Required(vec![client_id.into()]),
        }
        self
    }

    /// Explicitly disables the client-id check
    pub fn any_client_id(mut self) -> Self {
        self.client_id = Expect::Disabled;
        self
    }
}

/// A Cognito domain claim was rejected
#[derive(Debug, Error)]
pub enum CognitoClaimsError {
    /// The per-call options were incomplete
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// The token does not belong to a required group
    #[error("invalid cognito:groups claim: {0}")]
    InvalidGroup(UnexpectedClaimValue),

    /// The token's use is malformed or not the required one
    #[error("invalid token_use claim: {0}")]
    InvalidTokenUse(UnexpectedClaimValue),

    /// The token was minted for an unrecognized app client
    #[error("invalid client id: {0}")]
    InvalidClientId(UnexpectedClaimValue),
}

impl From<CognitoClaimsError> for VerifyErrorKind {
    fn from(err: CognitoClaimsError) -> Self {
        match err {
            CognitoClaimsError::Configuration(err) => Self::Configuration(err),
            other => Self::Domain(Box::new(other)),
        }
    }
}

/// The claim profile for Amazon Cognito user pools
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CognitoProfile;

impl CognitoProfile {
    /// Derives the issuer and key-set endpoint for a user pool
    ///
    /// # Errors
    ///
    /// Returns an error if the identifier does not have the
    /// `<region>_<identifier>` shape.
    pub fn parse_pool_id(pool_id: &PoolIdRef) -> Result<(Issuer, String), ConfigurationError> {
        let captures = POOL_ID_PATTERN
            .captures(pool_id.as_str())
            .ok_or_else(|| ConfigurationError::MalformedPoolId(pool_id.to_string()))?;

        let region = &captures[1];
        let issuer = Issuer::new(format!(
            "https://cognito-idp.{region}.amazonaws.com/{pool_id}"
        ));
        let jwks_uri = format!("{issuer}/.well-known/jwks.json");

        Ok((issuer, jwks_uri))
    }
}

impl ClaimsProfile for CognitoProfile {
    type Claims = CognitoClaims;
    type Options = CognitoOptions;
    type Error = CognitoClaimsError;
    type ConfigInput = PoolId;

    fn derive_issuer_config(pool_id: PoolId) -> Result<IssuerConfig, ConfigurationError> {
        let (issuer, jwks_uri) = Self::parse_pool_id(&pool_id)?;

        // the client-id check owns audience semantics for this provider,
        // so the generic audience check is disabled rather than left unset
        Ok(IssuerConfig::new(issuer, jwks_uri).ignore_audience())
    }

    fn validate_domain_claims(
        &self,
        claims: &CognitoClaims,
        options: &CognitoOptions,
    ) -> Result<(), CognitoClaimsError> {
        if let Some(required) = &options.groups {
            assert::sets_overlap(
                claims.groups().iter().map(String::as_str),
                required.iter().map(String::as_str),
            )
            .map_err(CognitoClaimsError::InvalidGroup)?;
        }

        // the token use must be well formed even when the policy does not
        // pin it to one shape
        let token_use = match claims.token_use() {
            Some("id") => TokenUse::Id,
            Some("access") => TokenUse::Access,
            other => {
                return Err(CognitoClaimsError::InvalidTokenUse(
                    UnexpectedClaimValue::new(other, ["id", "access"]),
                ));
            }
        };

        match &options.token_use {
            Expect::Required(expected) if *expected != token_use => {
                return Err(CognitoClaimsError::InvalidTokenUse(
                    UnexpectedClaimValue::new([token_use.as_str()], [expected.as_str()]),
                ));
            }
            Expect::Unspecified => {
                return Err(ConfigurationError::UnspecifiedPolicy("token_use").into());
            }
            _ => {}
        }

        match &options.client_id {
            Expect::Required(allowed) => {
                let allowed_ids = allowed.iter().map(String::as_str);
                let result = match token_use {
                    // id tokens carry the client id in `aud`
                    TokenUse::Id => assert::sets_overlap(
                        claims.aud().iter().map(|a| a.as_str()),
                        allowed_ids,
                    ),
                    // access tokens carry no standard aud; the client_id
                    // claim stands in for it
                    TokenUse::Access => match claims.client_id() {
                        Some(client_id) => assert::value_among(client_id, allowed_ids),
                        None => Err(UnexpectedClaimValue::new(
                            std::iter::empty::<&str>(),
                            allowed_ids,
                        )),
                    },
                };

                result.map_err(CognitoClaimsError::InvalidClientId)?;
            }
            Expect::Unspecified => {
                return Err(ConfigurationError::UnspecifiedPolicy("client_id").into());
            }
            Expect::Disabled => {}
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use color_eyre::Result;

    use super::*;
    use crate::authority::Authority;
    use crate::config::VerifyProperties;
    use crate::test_util::{StaticFetcher, TokenSigner};
    use tessera::jwt::Audience;

    const POOL_ID: &str = "eu-west-1_AbCdEfGhI";
    const POOL_ISSUER: &str = "https://cognito-idp.eu-west-1.amazonaws.com/eu-west-1_AbCdEfGhI";

    #[test]
    fn parses_a_well_formed_pool_id() {
        let (issuer, jwks_uri) =
            CognitoProfile::parse_pool_id(PoolIdRef::from_str(POOL_ID)).unwrap();
        assert_eq!(issuer.as_str(), POOL_ISSUER);
        assert_eq!(jwks_uri, format!("{POOL_ISSUER}/.well-known/jwks.json"));
    }

    #[test]
    fn rejects_malformed_pool_ids() {
        for raw in ["not-a-pool-id", "us-east-1", "_abc", "us-east-1_", "a_b"] {
            let err = CognitoProfile::parse_pool_id(PoolIdRef::from_str(raw)).unwrap_err();
            assert!(matches!(err, ConfigurationError::MalformedPoolId(_)), "{raw}");
        }
    }

    #[test]
    fn region_shape_is_permissive() {
        CognitoProfile::parse_pool_id(PoolIdRef::from_str("xx-anything-9_Pool123")).unwrap();
    }

    #[test]
    fn derived_config_disables_the_generic_audience_check() {
        let config =
            CognitoProfile::derive_issuer_config(PoolId::from_static(POOL_ID)).unwrap();
        assert_eq!(config.issuer().as_str(), POOL_ISSUER);
        assert!(config.audience().is_disabled());
    }

    fn base_claims() -> Claims {
        Claims::new()
            .with_issuer(POOL_ISSUER)
            .with_future_expiration(3600)
    }

    fn options() -> CognitoOptions {
        CognitoOptions::default().any_token_use().any_client_id()
    }

    #[test]
    fn group_membership_must_overlap() {
        let profile = CognitoProfile;
        let claims = CognitoClaims::new(base_claims())
            .with_token_use("access")
            .with_groups(["readers", "writers"]);

        profile
            .validate_domain_claims(&claims, &options().require_group("writers"))
            .unwrap();

        let err = profile
            .validate_domain_claims(&claims, &options().require_group("admins"))
            .unwrap_err();
        assert!(matches!(err, CognitoClaimsError::InvalidGroup(_)));
    }

    #[test]
    fn token_use_must_be_well_formed_regardless_of_policy() {
        let profile = CognitoProfile;

        let refresh = CognitoClaims::new(base_claims()).with_token_use("refresh");
        let err = profile.validate_domain_claims(&refresh, &options()).unwrap_err();
        assert!(matches!(err, CognitoClaimsError::InvalidTokenUse(_)));

        let missing = CognitoClaims::new(base_claims());
        let err = profile.validate_domain_claims(&missing, &options()).unwrap_err();
        assert!(matches!(err, CognitoClaimsError::InvalidTokenUse(_)));
    }

    #[test]
    fn a_required_token_use_must_match() {
        let profile = CognitoProfile;
        let claims = CognitoClaims::new(base_claims()).with_token_use("access");

        profile
            .validate_domain_claims(
                &claims,
                &options().require_token_use(TokenUse::Access),
            )
            .unwrap();

        let err = profile
            .validate_domain_claims(&claims, &options().require_token_use(TokenUse::Id))
            .unwrap_err();
        assert!(matches!(err, CognitoClaimsError::InvalidTokenUse(_)));
    }

    #[test]
    fn unspecified_options_are_configuration_errors() {
        let profile = CognitoProfile;
        let claims = CognitoClaims::new(base_claims()).with_token_use("access");

        let err = profile
            .validate_domain_claims(&claims, &CognitoOptions::default().any_client_id())
            .unwrap_err();
        assert!(matches!(
            err,
            CognitoClaimsError::Configuration(ConfigurationError::UnspecifiedPolicy("token_use"))
        ));

        let err = profile
            .validate_domain_claims(&claims, &CognitoOptions::default().any_token_use())
            .unwrap_err();
        assert!(matches!(
            err,
            CognitoClaimsError::Configuration(ConfigurationError::UnspecifiedPolicy("client_id"))
        ));
    }

    #[test]
    fn access_tokens_match_client_id_and_id_tokens_match_aud() {
        let profile = CognitoProfile;
        let policy = options().require_client_id("abc");

        let access = CognitoClaims::new(base_claims())
            .with_token_use("access")
            .with_client_id("abc");
        profile.validate_domain_claims(&access, &policy).unwrap();

        let id = CognitoClaims::new(
            base_claims().with_audience(Audience::from_static("abc")),
        )
        .with_token_use("id");
        profile.validate_domain_claims(&id, &policy).unwrap();

        // an id token must carry the client id in aud; a client_id claim
        // alone does not satisfy the check
        let id_without_aud = CognitoClaims::new(base_claims())
            .with_token_use("id")
            .with_client_id("abc");
        let err = profile
            .validate_domain_claims(&id_without_aud, &policy)
            .unwrap_err();
        assert!(matches!(err, CognitoClaimsError::InvalidClientId(_)));

        let access_without_client_id =
            CognitoClaims::new(base_claims()).with_token_use("access");
        let err = profile
            .validate_domain_claims(&access_without_client_id, &policy)
            .unwrap_err();
        assert!(matches!(err, CognitoClaimsError::InvalidClientId(_)));
    }

    fn pool_authority(signer: &TokenSigner) -> Authority<CognitoProfile> {
        let config =
            CognitoProfile::derive_issuer_config(PoolId::from_static(POOL_ID)).unwrap();
        let (fetcher, _calls) = StaticFetcher::new(signer.jwks());
        let authority = Authority::with_fetcher(config, CognitoProfile, fetcher).unwrap();
        authority.seed_jwks(signer.jwks(), None).unwrap();
        authority
    }

    #[test]
    fn verifies_a_cognito_access_token_end_to_end() -> Result<()> {
        let signer = TokenSigner::new("pool-key");
        let authority = pool_authority(&signer);

        let claims = CognitoClaims::new(base_claims())
            .with_token_use("access")
            .with_client_id("abc")
            .with_groups(["readers"]);
        let token = signer.token(&claims);

        let props = VerifyProperties::default().with_options(
            CognitoOptions::default()
                .require_token_use(TokenUse::Access)
                .require_client_id("abc")
                .require_group("readers"),
        );

        let validated = authority.verify_sync(&token, &props)?;
        assert_eq!(validated.claims(), &claims);
        Ok(())
    }

    #[test]
    fn domain_rejections_can_carry_the_decomposed_token() {
        let signer = TokenSigner::new("pool-key");
        let authority = pool_authority(&signer);

        let claims = CognitoClaims::new(base_claims()).with_token_use("refresh");
        let token = signer.token(&claims);

        let props = VerifyProperties::default()
            .include_raw_jwt_in_errors()
            .with_options(options());

        let err = authority.verify_sync(&token, &props).unwrap_err();
        assert!(matches!(
            err.domain_error::<CognitoClaimsError>(),
            Some(CognitoClaimsError::InvalidTokenUse(_))
        ));

        let rejected = err.rejected_jwt().expect("enrichment was requested");
        assert_eq!(rejected.payload()["token_use"], "refresh");
        assert_eq!(rejected.header()["kid"], "pool-key");

        // without the opt-in, the same rejection carries nothing
        let bare = VerifyProperties::default().with_options(options());
        let err = authority.verify_sync(&token, &bare).unwrap_err();
        assert!(err.rejected_jwt().is_none());
    }
}
