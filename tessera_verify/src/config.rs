use std::time::Duration;

use tessera::jwt::{Audience, Expect, Issuer, IssuerRef};
use tessera::Scope;

/// The trust configuration for a single issuer
///
/// The issuer string doubles as the expected `iss` claim and as the unique
/// key under which the issuer's key set is cached.
#[derive(Clone, Debug)]
#[must_use]
pub struct IssuerConfig {
    issuer: Issuer,
    jwks_uri: String,
    audience: Expect<Vec<Audience>>,
}

impl IssuerConfig {
    /// Constructs a configuration for an issuer and its key-set endpoint
    ///
    /// The audience policy starts out unspecified; verification will fail
    /// with a configuration error until an audience is required here (or
    /// per call) or the check is explicitly disabled.
    pub fn new(issuer: impl Into<Issuer>, jwks_uri: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            jwks_uri: jwks_uri.into(),
            audience: Expect::Unspecified,
        }
    }

    /// Adds an audience to the set of allowed audiences
    pub fn with_audience(mut self, audience: impl Into<Audience>) -> Self {
        match &mut self.audience {
            Expect::Required(allowed) => allowed.push(audience.into()),
            slot => *slot = Expect::Required(vec![audience.into()]),
        }
        self
    }

    /// Explicitly disables the audience check for this issuer
    pub fn ignore_audience(self) -> Self {
        Self {
            audience: Expect::Disabled,
            ..self
        }
    }

    /// The expected `iss` claim
    #[must_use]
    pub fn issuer(&self) -> &Issuer {
        &self.issuer
    }

    /// The endpoint publishing this issuer's key set
    #[must_use]
    pub fn jwks_uri(&self) -> &str {
        &self.jwks_uri
    }

    /// The audience policy applied when a call does not override it
    #[must_use]
    pub fn audience(&self) -> &Expect<Vec<Audience>> {
        &self.audience
    }
}

/// One or more issuer configurations
///
/// Construction of an [`Authority`][crate::Authority] accepts either a
/// single configuration or a list; both normalize into this type so the
/// rest of the pipeline never branches on the construction form.
#[derive(Clone, Debug)]
#[must_use]
pub struct IssuerConfigs(Vec<IssuerConfig>);

impl IssuerConfigs {
    pub(crate) fn into_vec(self) -> Vec<IssuerConfig> {
        self.0
    }
}

impl From<IssuerConfig> for IssuerConfigs {
    fn from(config: IssuerConfig) -> Self {
        Self(vec![config])
    }
}

impl From<Vec<IssuerConfig>> for IssuerConfigs {
    fn from(configs: Vec<IssuerConfig>) -> Self {
        Self(configs)
    }
}

/// Per-call verification properties
///
/// `O` is the option type of the engine's claim profile; the plain
/// profile takes `()`.
#[derive(Clone, Debug, Default)]
#[must_use]
pub struct VerifyProperties<O = ()> {
    issuer: Option<Issuer>,
    audience: Expect<Vec<Audience>>,
    scope: Option<Scope>,
    leeway: Duration,
    include_raw_jwt_in_errors: bool,
    options: O,
}

impl<O> VerifyProperties<O> {
    /// Names the issuer configuration this call verifies against
    ///
    /// Required when the authority is configured with more than one
    /// issuer.
    pub fn for_issuer(mut self, issuer: impl Into<Issuer>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Overrides the configured audience policy with an allowed audience
    pub fn with_audience(mut self, audience: impl Into<Audience>) -> Self {
        match &mut self.audience {
            Expect::Required(allowed) => allowed.push(audience.into()),
            slot => *slot = Expect::Required(vec![audience.into()]),
        }
        self
    }

    /// Overrides the configured audience policy, disabling the check
    pub fn ignore_audience(mut self) -> Self {
        self.audience = Expect::Disabled;
        self
    }

    /// Requires the token's scopes to overlap the given set
    pub fn require_scope(mut self, scope: Scope) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Allows a grace period for time-based claim checks
    pub fn with_leeway(mut self, leeway: Duration) -> Self {
        self.leeway = leeway;
        self
    }

    /// Allows a grace period (in seconds) for time-based claim checks
    pub fn with_leeway_secs(self, leeway: u64) -> Self {
        self.with_leeway(Duration::from_secs(leeway))
    }

    /// Attaches the decomposed token to errors raised after its signature
    /// has been verified
    ///
    /// This lets operators log the claims of a rejected token without
    /// re-parsing it. Errors raised before the signature check never
    /// carry the token.
    pub fn include_raw_jwt_in_errors(mut self) -> Self {
        self.include_raw_jwt_in_errors = true;
        self
    }

    /// Sets the profile-specific options for this call
    pub fn with_options(mut self, options: O) -> Self {
        self.options = options;
        self
    }

    pub(crate) fn issuer(&self) -> Option<&IssuerRef> {
        self.issuer.as_deref()
    }

    pub(crate) fn audience(&self) -> &Expect<Vec<Audience>> {
        &self.audience
    }

    pub(crate) fn scope(&self) -> Option<&Scope> {
        self.scope.as_ref()
    }

    pub(crate) fn leeway(&self) -> Duration {
        self.leeway
    }

    pub(crate) fn includes_raw_jwt_in_errors(&self) -> bool {
        self.include_raw_jwt_in_errors
    }

    /// The profile-specific options for this call
    #[must_use]
    pub fn options(&self) -> &O {
        &self.options
    }
}
