//! Primitives for verifying JSON Web Tokens against published key sets:
//!
//! * JSON Web Signature (JWS): [RFC7515][]
//! * JSON Web Key (JWK): [RFC7517][]
//! * JSON Web Algorithms (JWA): [RFC7518][]
//! * JSON Web Token (JWT): [RFC7519][]
//!
//! This crate covers the pure, non-I/O half of bearer-token authorization:
//! decomposing a compact token into its encoded segments, validating the
//! registered claims against a caller-supplied policy, and checking the
//! token signature against a resolved public key. Resolving which key to
//! trust for which issuer, including fetching and caching remote key sets,
//! is the job of the `tessera_verify` crate.
//!
//! Token issuance and symmetric (HMAC) algorithms are deliberately not
//! supported; verification only ever requires public key material.
//!
//! [RFC7515]: https://tools.ietf.org/html/rfc7515
//! [RFC7517]: https://tools.ietf.org/html/rfc7517
//! [RFC7518]: https://tools.ietf.org/html/rfc7518
//! [RFC7519]: https://tools.ietf.org/html/rfc7519
//!
//! # Example
//!
//! ```
//! use tessera::clock::{TestClock, UnixTime};
//! use tessera::jwt::{self, ClaimsPolicy};
//!
//! let policy = ClaimsPolicy::default()
//!     .require_issuer(jwt::Issuer::from_static("https://issuer.example.com/"))
//!     .ignore_audience()
//!     .with_leeway_secs(30);
//!
//! let claims = jwt::Claims::new()
//!     .with_issuer(jwt::Issuer::from_static("https://issuer.example.com/"))
//!     .with_expiration(UnixTime(700));
//!
//! // 20 seconds past expiry, but within the configured leeway
//! let clock = TestClock::new(UnixTime(720));
//! assert!(policy.evaluate_with_clock(&claims, &clock).is_ok());
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

pub mod b64;
pub mod clock;
pub mod error;
pub mod jwa;
pub mod jwk;
mod jwks;
pub mod jws;
pub mod jwt;
pub mod scope;

#[doc(inline)]
pub use jwk::Jwk;
#[doc(inline)]
pub use jwks::Jwks;
#[doc(inline)]
pub use jwt::{Jwt, JwtRef};
#[doc(inline)]
pub use scope::Scope;
