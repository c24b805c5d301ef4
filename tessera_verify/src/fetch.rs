use std::error::Error as StdError;
use std::fmt;

use async_trait::async_trait;
use reqwest::Client;
use tessera::Jwks;
use thiserror::Error;

/// A key-set document could not be fetched or parsed
///
/// Fetch failures are never cached; a later verification retries the
/// fetch.
#[derive(Debug, Error)]
#[error("failed to fetch JWKS from '{uri}'")]
pub struct JwksFetchError {
    uri: String,
    #[source]
    source: Box<dyn StdError + Send + Sync + 'static>,
}

impl JwksFetchError {
    /// Wraps a transport or parse error for the given endpoint
    pub fn new(
        uri: impl Into<String>,
        source: impl Into<Box<dyn StdError + Send + Sync + 'static>>,
    ) -> Self {
        Self {
            uri: uri.into(),
            source: source.into(),
        }
    }

    /// The endpoint the fetch was directed at
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }
}

/// Fetches an issuer's published key set
///
/// The authority only calls this on a cache miss; rate limiting, retries,
/// and timeouts are the implementation's concern, not the engine's.
#[async_trait]
pub trait JwksFetcher: Send + Sync {
    /// Fetches and parses the JWKS document at `uri`
    async fn fetch_jwks(&self, uri: &str) -> Result<Jwks, JwksFetchError>;
}

/// A [`JwksFetcher`] backed by a `reqwest` client
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Constructs a fetcher using the provided client
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        let client = Client::builder()
            .user_agent(concat!("tessera_verify/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client }
    }
}

impl fmt::Debug for HttpFetcher {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("HttpFetcher").finish_non_exhaustive()
    }
}

#[async_trait]
impl JwksFetcher for HttpFetcher {
    async fn fetch_jwks(&self, uri: &str) -> Result<Jwks, JwksFetchError> {
        tracing::debug!(jwks.url = %uri, "fetching JWKS");

        let response = self
            .client
            .get(uri)
            .send()
            .await
            .map_err(|err| JwksFetchError::new(uri, err))?;

        if let Err(err) = response.error_for_status_ref() {
            tracing::warn!(
                jwks.url = %uri,
                http.status_code = response.status().as_u16(),
                "JWKS fetch failed; unexpected response status",
            );
            return Err(JwksFetchError::new(uri, err));
        }

        let jwks = response
            .json::<Jwks>()
            .await
            .map_err(|err| JwksFetchError::new(uri, err))?;

        tracing::info!(jwks.url = %uri, "JWKS fetched");

        Ok(jwks)
    }
}
