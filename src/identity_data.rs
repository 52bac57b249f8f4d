use std::time::Duration;

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::context::{Claim, RequestContext};

/// Path of the identity endpoint, relative to the API base address
pub const IDENTITY_PATH: &str = "identity";

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("an HTTP client is required")]
    MissingHttpClient,

    #[error("an identity API base URL is required")]
    MissingBaseUrl,

    #[error("invalid identity API base URL: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),
}

#[derive(Error, Debug)]
pub enum RemoteClaimsError {
    #[error("{0}")]
    Transport(reqwest::Error),

    #[error("Response status code does not indicate success: {0}")]
    Status(StatusCode),

    #[error("identity API returned invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

impl RemoteClaimsError {
    /// Status code returned by the identity API, if it answered at all
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Transport(err) => err.status(),
            Self::Status(status) => Some(*status),
            Self::InvalidJson(_) => None,
        }
    }
}

impl From<reqwest::Error> for RemoteClaimsError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) if err.is_status() => Self::Status(status),
            _ => Self::Transport(err),
        }
    }
}

#[derive(Error, Debug)]
pub enum LocalClaimsError {
    #[error("no authenticated principal")]
    Unauthenticated,

    #[error("failed to serialize claims: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Reads the current user's claims, either from the identity API or from the
/// request's own principal, as indented JSON text.
#[derive(Debug, Clone)]
pub struct IdentityDataService {
    http_client: reqwest::Client,
    identity_url: Url,
}

#[derive(Debug, Default)]
pub struct IdentityDataServiceBuilder {
    http_client: Option<reqwest::Client>,
    base_url: Option<Url>,
}

impl IdentityDataServiceBuilder {
    pub fn with_http_client(mut self, http_client: reqwest::Client) -> Self {
        self.http_client = Some(http_client);
        self
    }

    /// Build a fresh client, optionally bounded by `timeout`
    pub fn with_default_http_client(
        self,
        timeout: Option<Duration>,
    ) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(self.with_http_client(builder.build()?))
    }

    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    pub fn build(self) -> Result<IdentityDataService, BuildError> {
        let http_client = self.http_client.ok_or(BuildError::MissingHttpClient)?;
        let base_url = self.base_url.ok_or(BuildError::MissingBaseUrl)?;

        Ok(IdentityDataService {
            http_client,
            identity_url: base_url.join(IDENTITY_PATH)?,
        })
    }
}

impl IdentityDataService {
    pub fn builder() -> IdentityDataServiceBuilder {
        IdentityDataServiceBuilder::default()
    }

    pub fn identity_url(&self) -> &Url {
        &self.identity_url
    }

    /// Ask the identity API for the caller's claims.
    ///
    /// The access token, when the request has one, is sent as a bearer token
    /// on this request only; the shared client is never modified.
    #[instrument(skip_all, fields(url = %self.identity_url))]
    pub async fn fetch_remote_claims(
        &self,
        context: &RequestContext,
    ) -> Result<String, RemoteClaimsError> {
        let mut request = self.http_client.get(self.identity_url.clone());

        match context.access_token() {
            Some(token) => {
                debug!("Attaching bearer token to identity request");
                request = request.bearer_auth(token.secret());
            }
            None => debug!("No access token available, calling identity API anonymously"),
        }

        let response = request
            .send()
            .await
            .inspect_err(|err| warn!(error = %err, "Identity API request failed"))?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, "Identity API returned an error status");
            return Err(RemoteClaimsError::Status(status));
        }

        let body = response.text().await?;
        let parsed: Value = serde_json::from_str(&body)?;

        Ok(serde_json::to_string_pretty(&parsed)?)
    }

    /// Serialize the claims of the request's principal in their original order
    pub fn fetch_local_claims(&self, context: &RequestContext) -> Result<String, LocalClaimsError> {
        let principal = context
            .principal
            .as_ref()
            .ok_or(LocalClaimsError::Unauthenticated)?;

        let claims: &[Claim] = principal.claims();

        Ok(serde_json::to_string_pretty(claims)?)
    }
}
