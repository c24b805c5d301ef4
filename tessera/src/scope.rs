//! OAuth2 scope claims
//!
//! Access tokens carry their granted scopes either as a single
//! space-separated string (the common OAuth2 form) or as an array of
//! strings; both serialize forms deserialize into a [`Scope`].

use aliri_braid::braid;
use serde::{Deserialize, Serialize};

/// A single OAuth2 scope token
#[braid(serde, ref_doc = "A borrowed reference to a [`ScopeToken`]")]
pub struct ScopeToken;

/// A set of scope tokens
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ScopeDto", into = "ScopeDto")]
#[must_use]
pub struct Scope(Vec<ScopeToken>);

impl Scope {
    /// An empty scope set
    #[inline]
    pub const fn empty() -> Self {
        Self(Vec::new())
    }

    /// A scope set holding a single token
    #[inline]
    pub fn single(token: impl Into<ScopeToken>) -> Self {
        Self(vec![token.into()])
    }

    /// Adds a token to the scope set
    pub fn insert(&mut self, token: ScopeToken) {
        if !self.0.iter().any(|t| *t == token) {
            self.0.push(token);
        }
    }

    /// Whether the scope set is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates through references to the tokens in the set
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &ScopeTokenRef> {
        self.0.iter().map(AsRef::as_ref)
    }
}

impl FromIterator<ScopeToken> for Scope {
    fn from_iter<I: IntoIterator<Item = ScopeToken>>(iter: I) -> Self {
        let mut scope = Self::empty();
        for token in iter {
            scope.insert(token);
        }
        scope
    }
}

impl From<ScopeToken> for Scope {
    #[inline]
    fn from(token: ScopeToken) -> Self {
        Self::single(token)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum ScopeDto {
    String(String),
    Array(Vec<ScopeToken>),
}

impl From<ScopeDto> for Scope {
    fn from(dto: ScopeDto) -> Self {
        match dto {
            ScopeDto::String(s) => s.split_whitespace().map(ScopeToken::from).collect(),
            ScopeDto::Array(arr) => arr.into_iter().collect(),
        }
    }
}

impl From<Scope> for ScopeDto {
    fn from(scope: Scope) -> Self {
        let joined = scope
            .0
            .iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        ScopeDto::String(joined)
    }
}
