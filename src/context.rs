use std::{collections::HashMap, convert::Infallible};

use axum::{extract::FromRequestParts, http::request::Parts};
use axum_oidc::{OidcAccessToken, OidcClaims};
use openidconnect::{core::CoreGenderClaim, AccessToken, IdTokenClaims};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ProviderClaims;

/// Token store key under which the current session's access token lives
pub const ACCESS_TOKEN_KEY: &str = "access_token";

/// A single `(type, value)` attribute of the authenticated principal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

impl Claim {
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            value: value.into(),
        }
    }
}

/// The authenticated identity of a request.
///
/// Claims keep the order in which the identity provider supplied them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Principal {
    claims: Vec<Claim>,
}

impl Principal {
    pub fn claims(&self) -> &[Claim] {
        &self.claims
    }

    /// Flatten ID token claims into `(type, value)` pairs.
    ///
    /// Provider-specific claims come first, in the order they were issued,
    /// followed by the standard OpenID Connect claims. Arrays become one claim
    /// per element, nested objects are kept as compact JSON text and `null`s
    /// are dropped.
    pub fn from_id_token_claims(
        claims: &IdTokenClaims<ProviderClaims, CoreGenderClaim>,
    ) -> Result<Self, serde_json::Error> {
        let provider = claims.additional_claims().as_map();

        let Value::Object(mut standard) = serde_json::to_value(claims)? else {
            return Ok(provider.clone().into_iter().collect());
        };
        standard.retain(|kind, _| !provider.contains_key(kind));

        Ok(provider.clone().into_iter().chain(standard).collect())
    }
}

impl FromIterator<(String, Value)> for Principal {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        let mut claims = Vec::new();
        for (kind, value) in iter {
            match value {
                Value::Array(values) => claims.extend(
                    values
                        .into_iter()
                        .filter_map(claim_value)
                        .map(|value| Claim::new(kind.clone(), value)),
                ),
                value => claims.extend(claim_value(value).map(|value| Claim::new(kind, value))),
            }
        }

        Self { claims }
    }
}

fn claim_value(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(value) => Some(value),
        other => Some(other.to_string()),
    }
}

impl FromIterator<Claim> for Principal {
    fn from_iter<T: IntoIterator<Item = Claim>>(iter: T) -> Self {
        Self {
            claims: iter.into_iter().collect(),
        }
    }
}

/// Per-request lookup of previously issued tokens
#[derive(Debug, Clone, Default)]
pub struct TokenStore(HashMap<String, AccessToken>);

impl TokenStore {
    pub fn get(&self, key: &str) -> Option<&AccessToken> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, token: AccessToken) {
        self.0.insert(key.into(), token);
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.insert(ACCESS_TOKEN_KEY, AccessToken::new(token.into()));
        self
    }
}

/// Security state of the request being handled
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub principal: Option<Principal>,
    pub tokens: TokenStore,
}

impl RequestContext {
    #[cfg(test)]
    pub fn anonymous() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn authenticated(principal: Principal, tokens: TokenStore) -> Self {
        Self {
            principal: Some(principal),
            tokens,
        }
    }

    pub fn access_token(&self) -> Option<&AccessToken> {
        self.tokens.get(ACCESS_TOKEN_KEY)
    }
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let principal = parts
            .extensions
            .get::<OidcClaims<ProviderClaims>>()
            .and_then(|claims| match Principal::from_id_token_claims(&claims.0) {
                Ok(principal) => Some(principal),
                Err(err) => {
                    tracing::warn!(error = %err, "Failed to flatten ID token claims");
                    None
                }
            });

        let tokens = match parts.extensions.get::<OidcAccessToken>() {
            Some(OidcAccessToken(token)) => TokenStore::default().with_access_token(token.clone()),
            None => TokenStore::default(),
        };

        Ok(Self { principal, tokens })
    }
}
