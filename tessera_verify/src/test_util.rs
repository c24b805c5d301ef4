use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use ring::rand::SystemRandom;
use ring::signature::{Ed25519KeyPair, KeyPair};
use serde::Serialize;

use tessera::jwa;
use tessera::jwt::Headers;
use tessera::{Jwk, Jwks, Jwt};

use crate::fetch::{JwksFetchError, JwksFetcher};

/// Mints Ed25519-signed tokens and the key set that verifies them
pub(crate) struct TokenSigner {
    pair: Ed25519KeyPair,
    kid: String,
}

impl TokenSigner {
    pub(crate) fn new(kid: &str) -> Self {
        let rng = SystemRandom::new();
        let doc = Ed25519KeyPair::generate_pkcs8(&rng).expect("ed25519 key generation");
        let pair = Ed25519KeyPair::from_pkcs8(doc.as_ref()).expect("freshly generated key");

        Self {
            pair,
            kid: kid.to_owned(),
        }
    }

    pub(crate) fn jwk(&self) -> Jwk {
        Jwk::from(jwa::okp::PublicKey::ed25519(self.pair.public_key().as_ref()))
            .with_algorithm(jwa::Algorithm::EdDSA)
            .with_key_id(self.kid.clone())
    }

    pub(crate) fn jwks(&self) -> Jwks {
        let mut jwks = Jwks::default();
        jwks.add_key(self.jwk());
        jwks
    }

    pub(crate) fn token<C: Serialize>(&self, claims: &C) -> Jwt {
        self.token_with_headers(
            &Headers::with_key_id(jwa::Algorithm::EdDSA, self.kid.clone()),
            claims,
        )
    }

    pub(crate) fn token_with_headers<H: Serialize, C: Serialize>(
        &self,
        headers: &H,
        claims: &C,
    ) -> Jwt {
        let h64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(headers).expect("serializable headers"));
        let p64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims).expect("serializable claims"));
        let message = format!("{h64}.{p64}");
        let signature = self.pair.sign(message.as_bytes());
        let s64 = URL_SAFE_NO_PAD.encode(signature.as_ref());

        Jwt::new(format!("{message}.{s64}"))
    }
}

/// Serves a fixed key set, counting fetches
pub(crate) struct StaticFetcher {
    jwks: Jwks,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
}

impl StaticFetcher {
    pub(crate) fn new(jwks: Jwks) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let fetcher = Self {
            jwks,
            delay: None,
            calls: Arc::clone(&calls),
        };
        (fetcher, calls)
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl JwksFetcher for StaticFetcher {
    async fn fetch_jwks(&self, _uri: &str) -> Result<Jwks, JwksFetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.jwks.clone())
    }
}

/// Fails every fetch, counting attempts
pub(crate) struct FailingFetcher {
    calls: Arc<AtomicUsize>,
}

impl FailingFetcher {
    pub(crate) fn new() -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let fetcher = Self {
            calls: Arc::clone(&calls),
        };
        (fetcher, calls)
    }
}

#[async_trait]
impl JwksFetcher for FailingFetcher {
    async fn fetch_jwks(&self, uri: &str) -> Result<Jwks, JwksFetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(JwksFetchError::new(uri, "connection refused"))
    }
}
