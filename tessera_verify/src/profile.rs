use std::convert::Infallible;

use serde::Deserialize;
use tessera::error::ConfigurationError;
use tessera::jwt::{Claims, CoreClaims};

use crate::authority::VerifyErrorKind;
use crate::config::IssuerConfig;

/// A provider claim profile
///
/// A profile specializes the generic verification engine for one identity
/// provider: it knows how to derive an issuer configuration from the
/// provider's native identifier, and which provider-specific claims to
/// check once a token's signature has been verified. The engine never
/// depends on a concrete provider; any number of profiles can implement
/// this capability.
pub trait ClaimsProfile {
    /// The claim set carried by this provider's tokens
    type Claims: for<'de> Deserialize<'de> + CoreClaims;

    /// Per-call options controlling the provider-specific checks
    type Options;

    /// The error raised when a provider-specific check fails
    type Error: Into<VerifyErrorKind>;

    /// The provider's native configuration input
    type ConfigInput;

    /// Derives an issuer configuration from the provider's native input
    ///
    /// # Errors
    ///
    /// Returns an error if the input is malformed.
    fn derive_issuer_config(input: Self::ConfigInput) -> Result<IssuerConfig, ConfigurationError>;

    /// Validates the provider-specific claims of a signature-verified token
    ///
    /// The engine invokes this strictly after signature verification; the
    /// claims seen here are authentic.
    ///
    /// # Errors
    ///
    /// Returns an error if a provider-specific claim does not satisfy the
    /// options for this call.
    fn validate_domain_claims(
        &self,
        claims: &Self::Claims,
        options: &Self::Options,
    ) -> Result<(), Self::Error>;
}

/// A profile with no provider-specific checks
///
/// Suitable for any issuer whose tokens only need the generic claim
/// checks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CoreProfile;

impl ClaimsProfile for CoreProfile {
    type Claims = Claims;
    type Options = ();
    type Error = Infallible;
    type ConfigInput = IssuerConfig;

    fn derive_issuer_config(input: IssuerConfig) -> Result<IssuerConfig, ConfigurationError> {
        Ok(input)
    }

    fn validate_domain_claims(&self, _claims: &Claims, _options: &()) -> Result<(), Infallible> {
        Ok(())
    }
}
