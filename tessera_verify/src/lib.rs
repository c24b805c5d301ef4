//! JWT verification against trusted issuers and their published key sets
//!
//! This crate turns the primitives in [`tessera`] into a bearer-token
//! authority: it maps issuers to their key-set endpoints, caches each
//! issuer's published keys, resolves a token's signing key on demand, and
//! runs the full verification pipeline, with provider-specific claim
//! checks supplied by a pluggable [`ClaimsProfile`].
//!
//! Verification comes in two modes. [`Authority::verify_sync`] never
//! performs I/O and resolves keys only from the cache, suiting
//! latency-sensitive paths with pre-seeded keys. [`Authority::verify`]
//! additionally fetches an issuer's key set when a token names a key the
//! cache does not hold; concurrent calls for the same issuer share a
//! single fetch.
//!
//! # Feature flags
//!
//! This crate does not automatically enable TLS support in `reqwest`
//! itself. If your application already uses `reqwest` with some TLS
//! settings, those settings are used. If the only reason you depend on
//! `reqwest` is transitively through this crate, enable the `default-tls`
//! (on by default) or `rustls-tls` feature to support HTTPS key-set
//! endpoints.
//!
//! # Example
//!
//! ```no_run
//! use tessera::{Jwks, JwtRef};
//! use tessera_verify::{Authority, CoreProfile, IssuerConfig, VerifyProperties};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = IssuerConfig::new(
//!     "https://issuer.example.com/",
//!     "https://issuer.example.com/.well-known/jwks.json",
//! )
//! .ignore_audience();
//!
//! let authority = Authority::new(config, CoreProfile)?;
//!
//! // Pre-seed the key set to keep the hot path free of I/O
//! let jwks: Jwks = serde_json::from_str(r#"{"keys":[]}"#)?;
//! authority.seed_jwks(jwks, None)?;
//!
//! let token = JwtRef::from_str("eyJhbGciOi...");
//! let validated = authority.verify_sync(token, &VerifyProperties::default())?;
//! println!("subject: {:?}", validated.claims());
//! # Ok(())
//! # }
//! ```

#![warn(
    missing_docs,
    unused_import_braces,
    unused_imports,
    unused_qualifications
)]
#![deny(
    missing_debug_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unused_must_use
)]

mod authority;
pub mod cognito;
mod config;
mod fetch;
mod profile;

#[cfg(test)]
mod test_util;

pub use authority::{Authority, RejectedJwt, VerifyError, VerifyErrorKind};
pub use config::{IssuerConfig, IssuerConfigs, VerifyProperties};
pub use fetch::{HttpFetcher, JwksFetchError, JwksFetcher};
pub use profile::{ClaimsProfile, CoreProfile};
