use std::collections::HashMap;
use std::convert::Infallible;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Mutex;

use tessera::clock::{Clock, System, UnixTime};
use tessera::error::{ClaimsError, ConfigurationError, JwtVerifyError};
use tessera::jwk::{KeyId, KeyIdRef};
use tessera::jwt::{
    ClaimsPolicy, CoreHeaders, Decomposed, Expect, Headers, Issuer, IssuerRef, Validated,
};
use tessera::{Jwk, Jwks, JwtRef};

use crate::config::{IssuerConfig, IssuerConfigs, VerifyProperties};
use crate::fetch::{HttpFetcher, JwksFetchError, JwksFetcher};
use crate::profile::ClaimsProfile;

/// The kind of failure raised by the verification pipeline
#[derive(Debug, Error)]
pub enum VerifyErrorKind {
    /// The verifier or a per-call policy was misconfigured
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// The token was malformed or rejected by a claim or signature check
    #[error(transparent)]
    Jwt(#[from] JwtVerifyError),

    /// The token header does not identify a signing key
    #[error("token header does not identify a signing key")]
    MissingKeyId,

    /// No cached signing key satisfies the token
    ///
    /// Raised only by cache-only verification; the asynchronous path
    /// would fetch instead.
    #[error("signing key '{kid}' for issuer '{issuer}' is not cached")]
    SigningKeyNotCached {
        /// The issuer whose cache was consulted
        issuer: Issuer,
        /// The key named by the token header
        kid: KeyId,
    },

    /// The issuer does not publish the requested signing key
    ///
    /// The key set was refetched once before giving up; a legitimate key
    /// rotation is covered by that refetch.
    #[error("issuer '{issuer}' does not publish signing key '{kid}'")]
    SigningKeyNotFound {
        /// The issuer whose key set was fetched
        issuer: Issuer,
        /// The key named by the token header
        kid: KeyId,
    },

    /// The issuer's key set could not be fetched
    #[error(transparent)]
    JwksFetch(#[from] JwksFetchError),

    /// The token was rejected by the provider claim checks
    #[error("token rejected by provider claim checks")]
    Domain(#[source] Box<dyn StdError + Send + Sync + 'static>),
}

impl From<ClaimsError> for VerifyErrorKind {
    fn from(err: ClaimsError) -> Self {
        match err {
            ClaimsError::Configuration(err) => Self::Configuration(err),
            ClaimsError::Rejected(err) => Self::Jwt(JwtVerifyError::ClaimsRejected(err)),
        }
    }
}

impl From<Infallible> for VerifyErrorKind {
    fn from(err: Infallible) -> Self {
        match err {}
    }
}

/// An error raised by the verification pipeline
///
/// Wraps the failure [kind][VerifyErrorKind] and, when the caller opted
/// in via
/// [`VerifyProperties::include_raw_jwt_in_errors`][crate::VerifyProperties::include_raw_jwt_in_errors],
/// the decomposed token. The token is only ever attached to errors raised
/// after its signature has been verified.
#[derive(Debug)]
pub struct VerifyError {
    kind: VerifyErrorKind,
    rejected_jwt: Option<Box<RejectedJwt>>,
}

impl VerifyError {
    /// The kind of failure
    #[must_use]
    pub fn kind(&self) -> &VerifyErrorKind {
        &self.kind
    }

    /// Unwraps the kind of failure
    #[must_use]
    pub fn into_kind(self) -> VerifyErrorKind {
        self.kind
    }

    /// The decomposed token, when enrichment was requested and applicable
    #[must_use]
    pub fn rejected_jwt(&self) -> Option<&RejectedJwt> {
        self.rejected_jwt.as_deref()
    }

    /// The profile error behind a domain rejection, if it is of type `E`
    #[must_use]
    pub fn domain_error<E: StdError + 'static>(&self) -> Option<&E> {
        match &self.kind {
            VerifyErrorKind::Domain(err) => err.downcast_ref(),
            _ => None,
        }
    }

    fn with_rejected_jwt(mut self, jwt: RejectedJwt) -> Self {
        self.rejected_jwt = Some(Box::new(jwt));
        self
    }
}

impl fmt::Display for VerifyError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.kind, f)
    }
}

impl StdError for VerifyError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.kind.source()
    }
}

impl From<VerifyErrorKind> for VerifyError {
    fn from(kind: VerifyErrorKind) -> Self {
        Self {
            kind,
            rejected_jwt: None,
        }
    }
}

impl From<ConfigurationError> for VerifyError {
    fn from(err: ConfigurationError) -> Self {
        VerifyErrorKind::from(err).into()
    }
}

impl From<JwtVerifyError> for VerifyError {
    fn from(err: JwtVerifyError) -> Self {
        VerifyErrorKind::from(err).into()
    }
}

impl From<JwksFetchError> for VerifyError {
    fn from(err: JwksFetchError) -> Self {
        VerifyErrorKind::from(err).into()
    }
}

/// The decomposed sections of a rejected token
///
/// Lets operators log a rejected token's claims without re-parsing the
/// original token string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RejectedJwt {
    header: Value,
    payload: Value,
}

impl RejectedJwt {
    fn from_segments(header_b64: &str, payload_b64: &str) -> Self {
        // decomposition has already proved both segments decode and parse
        fn segment_to_json(segment: &str) -> Value {
            tessera::b64::Base64Url::from_encoded(segment)
                .ok()
                .and_then(|raw| serde_json::from_slice(raw.as_slice()).ok())
                .unwrap_or(Value::Null)
        }

        Self {
            header: segment_to_json(header_b64),
            payload: segment_to_json(payload_b64),
        }
    }

    /// The token's header as a JSON value
    #[must_use]
    pub fn header(&self) -> &Value {
        &self.header
    }

    /// The token's payload as a JSON value
    #[must_use]
    pub fn payload(&self) -> &Value {
        &self.payload
    }
}

/// A cached key set, replaced wholesale on every install
struct KeySetEntry {
    jwks: Jwks,
    fetched_at: UnixTime,
}

struct IssuerEntry {
    config: IssuerConfig,
    keys: ArcSwapOption<KeySetEntry>,
    fetch_lock: Mutex<()>,
}

impl IssuerEntry {
    fn new(config: IssuerConfig) -> Self {
        Self {
            config,
            keys: ArcSwapOption::from(None),
            fetch_lock: Mutex::new(()),
        }
    }

    fn install(&self, jwks: Jwks) -> Arc<KeySetEntry> {
        let entry = Arc::new(KeySetEntry {
            jwks,
            fetched_at: System.now(),
        });
        self.keys.store(Some(Arc::clone(&entry)));
        entry
    }

    /// Resolves a signing key from the cache alone
    fn resolve_sync(&self, kid: &KeyIdRef) -> Result<Jwk, VerifyError> {
        self.keys
            .load_full()
            .as_deref()
            .and_then(|entry| entry.jwks.get_key_by_id(kid))
            .cloned()
            .ok_or_else(|| {
                VerifyErrorKind::SigningKeyNotCached {
                    issuer: self.config.issuer().clone(),
                    kid: kid.to_owned(),
                }
                .into()
            })
    }

    /// Resolves a signing key, fetching the issuer's key set on a miss
    ///
    /// At most one fetch per issuer is in flight at a time; callers that
    /// arrive while a fetch is running wait for it and then retry the
    /// lookup against the refreshed key set instead of fetching again.
    async fn resolve(
        &self,
        fetcher: &dyn JwksFetcher,
        kid: &KeyIdRef,
    ) -> Result<Jwk, VerifyError> {
        let before = self.keys.load_full();
        if let Some(entry) = before.as_deref() {
            if let Some(key) = entry.jwks.get_key_by_id(kid) {
                return Ok(key.clone());
            }
        }

        tracing::debug!(
            issuer = %self.config.issuer(),
            %kid,
            "signing key not cached; refreshing JWKS"
        );

        let _guard = self.fetch_lock.lock().await;

        // a fetch that was in flight while we waited counts as our retry
        let current = self.keys.load_full();
        let refreshed = match (&before, &current) {
            (Some(b), Some(c)) => !Arc::ptr_eq(b, c),
            (None, Some(_)) => true,
            _ => false,
        };

        if refreshed {
            if let Some(entry) = current.as_deref() {
                return entry
                    .jwks
                    .get_key_by_id(kid)
                    .cloned()
                    .ok_or_else(|| self.key_not_found(kid));
            }
        }

        let jwks = fetcher.fetch_jwks(self.config.jwks_uri()).await?;
        let entry = self.install(jwks);
        tracing::info!(
            issuer = %self.config.issuer(),
            fetched_at = %entry.fetched_at,
            "JWKS refreshed"
        );

        entry
            .jwks
            .get_key_by_id(kid)
            .cloned()
            .ok_or_else(|| self.key_not_found(kid))
    }

    fn key_not_found(&self, kid: &KeyIdRef) -> VerifyError {
        tracing::debug!(
            issuer = %self.config.issuer(),
            %kid,
            "no signing key with the requested id after refresh"
        );
        VerifyErrorKind::SigningKeyNotFound {
            issuer: self.config.issuer().clone(),
            kid: kid.to_owned(),
        }
        .into()
    }
}

struct Inner<P> {
    issuers: HashMap<Issuer, IssuerEntry>,
    profile: P,
    fetcher: Box<dyn JwksFetcher>,
}

/// An authority for verifying JWTs presented to one or more trusted issuers
///
/// Cloning an authority is cheap; clones share the same issuer
/// configurations and key-set cache.
#[must_use]
pub struct Authority<P> {
    inner: Arc<Inner<P>>,
}

impl<P> Clone for Authority<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P> fmt::Debug for Authority<P> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Authority")
            .field("issuers", &self.inner.issuers.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl<P: ClaimsProfile> Authority<P> {
    /// Constructs an authority over one or more trusted issuers
    ///
    /// Key sets are fetched over HTTP when a token names a key the cache
    /// does not hold; use [`Authority::with_fetcher`] to supply a
    /// different fetch implementation.
    ///
    /// # Errors
    ///
    /// Returns an error if two configurations share an issuer.
    pub fn new(configs: impl Into<IssuerConfigs>, profile: P) -> Result<Self, ConfigurationError> {
        Self::with_fetcher(configs, profile, HttpFetcher::default())
    }

    /// Constructs an authority with a custom key-set fetcher
    ///
    /// # Errors
    ///
    /// Returns an error if two configurations share an issuer.
    pub fn with_fetcher(
        configs: impl Into<IssuerConfigs>,
        profile: P,
        fetcher: impl JwksFetcher + 'static,
    ) -> Result<Self, ConfigurationError> {
        let configs = configs.into().into_vec();
        let mut issuers = HashMap::with_capacity(configs.len());

        for config in configs {
            let issuer = config.issuer().clone();
            if issuers.contains_key(&issuer) {
                return Err(ConfigurationError::DuplicateIssuer(issuer.to_string()));
            }
            issuers.insert(issuer, IssuerEntry::new(config));
        }

        Ok(Self {
            inner: Arc::new(Inner {
                issuers,
                profile,
                fetcher: Box::new(fetcher),
            }),
        })
    }

    /// Installs a key set for an issuer without fetching
    ///
    /// Overwrites any cached key set for that issuer wholesale. Enables
    /// offline operation and pre-warming the cache so that
    /// [`verify_sync`][Self::verify_sync] never misses.
    ///
    /// # Errors
    ///
    /// Returns an error if more than one issuer is configured and the
    /// call does not name one, or if the named issuer is not registered.
    pub fn seed_jwks(
        &self,
        jwks: Jwks,
        issuer: Option<&IssuerRef>,
    ) -> Result<(), ConfigurationError> {
        let entry = self.entry_for(issuer)?;
        let installed = entry.install(jwks);
        tracing::debug!(
            issuer = %entry.config.issuer(),
            fetched_at = %installed.fetched_at,
            "JWKS seeded"
        );
        Ok(())
    }

    /// Verifies a token using only cached signing keys
    ///
    /// Runs decomposition, the generic claim checks, cache-only key
    /// resolution, signature verification, and the profile's domain
    /// claim checks, in that order. Never performs I/O, making it
    /// suitable for latency-sensitive paths once keys are seeded.
    ///
    /// # Errors
    ///
    /// Returns an error identifying the first check that failed; the
    /// claims are never surrendered on any failure.
    pub fn verify_sync(
        &self,
        token: &JwtRef,
        props: &VerifyProperties<P::Options>,
    ) -> Result<Validated<P::Claims>, VerifyError> {
        let entry = self.entry_for(props.issuer())?;
        let decomposed = token.decompose::<P::Claims, Headers>()?;

        Self::effective_policy(&entry.config, props)
            .evaluate(decomposed.untrusted_claims())
            .map_err(VerifyErrorKind::from)?;

        let kid = decomposed.kid().ok_or(VerifyErrorKind::MissingKeyId)?.to_owned();
        let key = entry.resolve_sync(&kid)?;

        self.finish(decomposed, &key, props)
    }

    /// Verifies a token, fetching the issuer's key set if required
    ///
    /// Identical to [`verify_sync`][Self::verify_sync] except that an
    /// unresolved key identifier triggers one fetch of the issuer's key
    /// set; key resolution is the only point at which this future
    /// suspends.
    ///
    /// # Errors
    ///
    /// Returns an error identifying the first check that failed; the
    /// claims are never surrendered on any failure.
    pub async fn verify(
        &self,
        token: &JwtRef,
        props: &VerifyProperties<P::Options>,
    ) -> Result<Validated<P::Claims>, VerifyError> {
        let entry = self.entry_for(props.issuer())?;
        let decomposed = token.decompose::<P::Claims, Headers>()?;

        Self::effective_policy(&entry.config, props)
            .evaluate(decomposed.untrusted_claims())
            .map_err(VerifyErrorKind::from)?;

        let kid = decomposed.kid().ok_or(VerifyErrorKind::MissingKeyId)?.to_owned();
        let key = entry.resolve(&*self.inner.fetcher, &kid).await?;

        self.finish(decomposed, &key, props)
    }

    fn finish(
        &self,
        decomposed: Decomposed<'_, P::Claims, Headers>,
        key: &Jwk,
        props: &VerifyProperties<P::Options>,
    ) -> Result<Validated<P::Claims>, VerifyError> {
        let raw = props
            .includes_raw_jwt_in_errors()
            .then(|| RejectedJwt::from_segments(decomposed.header_b64(), decomposed.payload_b64()));

        let validated = decomposed.verify_signature(key)?;

        if let Err(err) = self
            .inner
            .profile
            .validate_domain_claims(validated.claims(), props.options())
        {
            let kind: VerifyErrorKind = err.into();
            let mut err = VerifyError::from(kind);
            if let Some(raw) = raw {
                err = err.with_rejected_jwt(raw);
            }
            return Err(err);
        }

        Ok(validated)
    }

    fn entry_for(&self, issuer: Option<&IssuerRef>) -> Result<&IssuerEntry, ConfigurationError> {
        match issuer {
            Some(issuer) => self
                .inner
                .issuers
                .get(issuer)
                .ok_or_else(|| ConfigurationError::UnknownIssuer(issuer.to_string())),
            None => {
                let mut entries = self.inner.issuers.values();
                match (entries.next(), entries.next()) {
                    (Some(entry), None) => Ok(entry),
                    _ => Err(ConfigurationError::IssuerRequired),
                }
            }
        }
    }

    fn effective_policy<O>(config: &IssuerConfig, props: &VerifyProperties<O>) -> ClaimsPolicy {
        let audience = match props.audience() {
            Expect::Unspecified => config.audience().clone(),
            other => other.clone(),
        };

        let mut policy = ClaimsPolicy::default()
            .with_issuer_policy(Expect::Required(vec![config.issuer().clone()]))
            .with_audience_policy(audience)
            .with_leeway(props.leeway());

        if let Some(scope) = props.scope() {
            policy = policy.require_scope(scope.clone());
        }

        policy
    }
}

#[cfg(test)]
mod tests {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine as _;
    use color_eyre::Result;

    use super::*;
    use crate::profile::CoreProfile;
    use crate::test_util::{FailingFetcher, StaticFetcher, TokenSigner};
    use tessera::error::ClaimsRejected;
    use tessera::jwa;
    use tessera::jwt::{Audience, Claims, Jwt, Subject};

    const ISSUER: &str = "https://issuer.test/";
    const AUDIENCE: &str = "https://api.test/";

    fn config() -> IssuerConfig {
        IssuerConfig::new(ISSUER, "https://issuer.test/jwks.json").with_audience(AUDIENCE)
    }

    fn claims() -> Claims {
        Claims::new()
            .with_issuer(ISSUER)
            .with_audience(AUDIENCE)
            .with_subject(Subject::from_static("user-1"))
            .with_future_expiration(3600)
    }

    fn seeded_authority(signer: &TokenSigner) -> Authority<CoreProfile> {
        let authority = Authority::new(config(), CoreProfile).unwrap();
        authority.seed_jwks(signer.jwks(), None).unwrap();
        authority
    }

    #[test]
    fn verify_sync_returns_the_exact_claims() -> Result<()> {
        let signer = TokenSigner::new("key-1");
        let authority = seeded_authority(&signer);

        let claims = claims();
        let token = signer.token(&claims);

        let validated = authority.verify_sync(&token, &VerifyProperties::default())?;
        assert_eq!(validated.claims(), &claims);
        Ok(())
    }

    #[tokio::test]
    async fn verify_accepts_a_seeded_key_without_fetching() -> Result<()> {
        let signer = TokenSigner::new("key-1");
        let (fetcher, calls) = StaticFetcher::new(signer.jwks());
        let authority = Authority::with_fetcher(config(), CoreProfile, fetcher).unwrap();
        authority.seed_jwks(signer.jwks(), None).unwrap();

        let claims = claims();
        let token = signer.token(&claims);

        let validated = authority.verify(&token, &VerifyProperties::default()).await?;
        assert_eq!(validated.claims(), &claims);
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);
        Ok(())
    }

    #[test]
    fn expired_tokens_are_rejected_and_leeway_recovers_them() {
        let signer = TokenSigner::new("key-1");
        let authority = seeded_authority(&signer);

        let expired = claims().with_expiration(UnixTime(System.now().0 - 600));
        let token = signer.token(&expired);

        let err = authority
            .verify_sync(&token, &VerifyProperties::default())
            .unwrap_err();
        assert!(matches!(
            err.kind(),
            VerifyErrorKind::Jwt(JwtVerifyError::ClaimsRejected(
                ClaimsRejected::TokenExpired { .. }
            ))
        ));

        authority
            .verify_sync(&token, &VerifyProperties::default().with_leeway_secs(1200))
            .unwrap();
    }

    #[test]
    fn pre_signature_errors_never_carry_the_token() {
        let signer = TokenSigner::new("key-1");
        let authority = seeded_authority(&signer);

        let expired = claims().with_expiration(UnixTime(System.now().0 - 600));
        let token = signer.token(&expired);

        let err = authority
            .verify_sync(
                &token,
                &VerifyProperties::default().include_raw_jwt_in_errors(),
            )
            .unwrap_err();
        assert!(err.rejected_jwt().is_none());
    }

    #[test]
    fn sync_resolution_never_touches_the_fetcher() {
        let cached_signer = TokenSigner::new("key-1");
        let foreign_signer = TokenSigner::new("key-2");

        let (fetcher, calls) = StaticFetcher::new(foreign_signer.jwks());
        let authority = Authority::with_fetcher(config(), CoreProfile, fetcher).unwrap();
        authority.seed_jwks(cached_signer.jwks(), None).unwrap();

        let token = foreign_signer.token(&claims());
        let err = authority
            .verify_sync(&token, &VerifyProperties::default())
            .unwrap_err();

        assert!(matches!(
            err.kind(),
            VerifyErrorKind::SigningKeyNotCached { .. }
        ));
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn a_miss_fetches_once_and_caches_the_result() -> Result<()> {
        let signer = TokenSigner::new("key-1");
        let (fetcher, calls) = StaticFetcher::new(signer.jwks());
        let authority = Authority::with_fetcher(config(), CoreProfile, fetcher).unwrap();

        let claims = claims();
        let token = signer.token(&claims);

        authority.verify(&token, &VerifyProperties::default()).await?;
        authority.verify(&token, &VerifyProperties::default()).await?;

        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
        Ok(())
    }

    #[tokio::test]
    async fn an_unknown_kid_refetches_exactly_once() {
        let published_signer = TokenSigner::new("key-1");
        let rogue_signer = TokenSigner::new("key-99");

        let (fetcher, calls) = StaticFetcher::new(published_signer.jwks());
        let authority = Authority::with_fetcher(config(), CoreProfile, fetcher).unwrap();

        let token = rogue_signer.token(&claims());
        let err = authority
            .verify(&token, &VerifyProperties::default())
            .await
            .unwrap_err();

        assert!(matches!(
            err.kind(),
            VerifyErrorKind::SigningKeyNotFound { .. }
        ));
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn fetch_failures_are_not_cached() {
        let signer = TokenSigner::new("key-1");
        let (fetcher, calls) = FailingFetcher::new();
        let authority = Authority::with_fetcher(config(), CoreProfile, fetcher).unwrap();

        let token = signer.token(&claims());
        let props = VerifyProperties::default();

        for _ in 0..2 {
            let err = authority.verify(&token, &props).await.unwrap_err();
            assert!(matches!(err.kind(), VerifyErrorKind::JwksFetch(_)));
        }

        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn concurrent_first_use_coalesces_into_one_fetch() -> Result<()> {
        let signer = TokenSigner::new("key-1");
        let (fetcher, calls) = StaticFetcher::new(signer.jwks());
        let fetcher = fetcher.with_delay(std::time::Duration::from_millis(50));
        let authority = Authority::with_fetcher(config(), CoreProfile, fetcher).unwrap();

        let claims = claims();
        let token = signer.token(&claims);
        let props = VerifyProperties::default();

        let (a, b, c, d) = tokio::join!(
            authority.verify(&token, &props),
            authority.verify(&token, &props),
            authority.verify(&token, &props),
            authority.verify(&token, &props),
        );

        for validated in [a?, b?, c?, d?] {
            assert_eq!(validated.claims(), &claims);
        }

        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
        Ok(())
    }

    #[test]
    fn multiple_issuers_require_an_explicit_selection() {
        let signer = TokenSigner::new("key-1");
        let other = IssuerConfig::new("https://other.test/", "https://other.test/jwks.json")
            .with_audience(AUDIENCE);
        let authority = Authority::new(vec![config(), other], CoreProfile).unwrap();

        let err = authority.seed_jwks(signer.jwks(), None).unwrap_err();
        assert!(matches!(err, ConfigurationError::IssuerRequired));

        authority
            .seed_jwks(signer.jwks(), Some(IssuerRef::from_str(ISSUER)))
            .unwrap();

        let claims = claims();
        let token = signer.token(&claims);

        let err = authority
            .verify_sync(&token, &VerifyProperties::default())
            .unwrap_err();
        assert!(matches!(
            err.kind(),
            VerifyErrorKind::Configuration(ConfigurationError::IssuerRequired)
        ));

        let err = authority
            .verify_sync(
                &token,
                &VerifyProperties::default().for_issuer("https://stranger.test/"),
            )
            .unwrap_err();
        assert!(matches!(
            err.kind(),
            VerifyErrorKind::Configuration(ConfigurationError::UnknownIssuer(_))
        ));

        let validated = authority
            .verify_sync(&token, &VerifyProperties::default().for_issuer(ISSUER))
            .unwrap();
        assert_eq!(validated.claims(), &claims);
    }

    #[test]
    fn duplicate_issuers_are_rejected_at_construction() {
        let err = Authority::new(vec![config(), config()], CoreProfile).unwrap_err();
        assert!(matches!(err, ConfigurationError::DuplicateIssuer(_)));
    }

    #[test]
    fn an_unspecified_audience_is_a_call_time_configuration_error() {
        let signer = TokenSigner::new("key-1");
        let bare = IssuerConfig::new(ISSUER, "https://issuer.test/jwks.json");
        let authority = Authority::new(bare, CoreProfile).unwrap();
        authority.seed_jwks(signer.jwks(), None).unwrap();

        let token = signer.token(&claims());

        let err = authority
            .verify_sync(&token, &VerifyProperties::default())
            .unwrap_err();
        assert!(matches!(
            err.kind(),
            VerifyErrorKind::Configuration(ConfigurationError::UnspecifiedPolicy("audience"))
        ));

        // a per-call override satisfies the check
        authority
            .verify_sync(
                &token,
                &VerifyProperties::default().with_audience(Audience::from_static(AUDIENCE)),
            )
            .unwrap();

        // as does an explicit opt-out
        authority
            .verify_sync(&token, &VerifyProperties::default().ignore_audience())
            .unwrap();
    }

    #[test]
    fn a_tampered_payload_fails_the_signature_check() {
        let signer = TokenSigner::new("key-1");
        let authority = seeded_authority(&signer);

        let token = signer.token(&claims());
        let segments: Vec<&str> = token.as_str().split('.').collect();

        let forged_claims = claims().with_subject(Subject::from_static("somebody-else"));
        let forged_payload =
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged_claims).unwrap());
        let forged = Jwt::new(format!(
            "{}.{}.{}",
            segments[0], forged_payload, segments[2]
        ));

        let err = authority
            .verify_sync(&forged, &VerifyProperties::default())
            .unwrap_err();
        assert!(matches!(
            err.kind(),
            VerifyErrorKind::Jwt(JwtVerifyError::JwkVerifyError(err)) if err.is_signature_mismatch()
        ));
    }

    #[test]
    fn a_header_without_a_kid_is_rejected_before_key_resolution() {
        let signer = TokenSigner::new("key-1");
        let authority = seeded_authority(&signer);

        let token =
            signer.token_with_headers(&Headers::new(jwa::Algorithm::EdDSA), &claims());
        let err = authority
            .verify_sync(&token, &VerifyProperties::default())
            .unwrap_err();
        assert!(matches!(err.kind(), VerifyErrorKind::MissingKeyId));
    }

    #[test]
    fn an_algorithm_confusion_is_an_incompatibility_not_a_missing_key() {
        let signer = TokenSigner::new("key-1");
        let authority = seeded_authority(&signer);

        let token = signer.token_with_headers(
            &Headers::with_key_id(jwa::Algorithm::RS256, "key-1"),
            &claims(),
        );
        let err = authority
            .verify_sync(&token, &VerifyProperties::default())
            .unwrap_err();
        assert!(matches!(
            err.kind(),
            VerifyErrorKind::Jwt(JwtVerifyError::JwkVerifyError(err)) if err.is_incompatible_alg()
        ));
    }

    #[test]
    fn scope_policy_applies_to_the_token_scope_claim() {
        use tessera::scope::ScopeToken;
        use tessera::Scope;

        let signer = TokenSigner::new("key-1");
        let authority = seeded_authority(&signer);

        let granted = claims().with_scope(Scope::single(ScopeToken::from_static("read")));
        let token = signer.token(&granted);

        authority
            .verify_sync(
                &token,
                &VerifyProperties::default()
                    .require_scope(Scope::single(ScopeToken::from_static("read"))),
            )
            .unwrap();

        let err = authority
            .verify_sync(
                &token,
                &VerifyProperties::default()
                    .require_scope(Scope::single(ScopeToken::from_static("admin"))),
            )
            .unwrap_err();
        assert!(matches!(
            err.kind(),
            VerifyErrorKind::Jwt(JwtVerifyError::ClaimsRejected(
                ClaimsRejected::InvalidScope(_)
            ))
        ));
    }
}
