//! Identity Toolkit client.
//!
//! Resolves a Firebase ID token to its account record with the
//! `accounts:lookup` endpoint. The web API key travels as a query parameter,
//! the token in the JSON body; any rejection comes back as `Unauthorized`.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use pagelens_core::{PageLensError, TokenVerifier, VerifiedIdentity};

const LOOKUP_URL: &str = "https://identitytoolkit.googleapis.com/v1/accounts:lookup";

/// Client for the Firebase Identity Toolkit REST API.
pub struct IdentityClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

#[derive(Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    photo_url: Option<String>,
    #[serde(default)]
    email_verified: bool,
    #[serde(default)]
    phone_number: Option<String>,
}

impl IdentityClient {
    pub fn new(http: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self { http, api_key: api_key.into(), base_url: LOOKUP_URL.to_string() }
    }

    /// Override the endpoint, for tests against a local server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl TokenVerifier for IdentityClient {
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, PageLensError> {
        if token.is_empty() {
            return Err(PageLensError::Unauthorized("empty bearer token".into()));
        }

        let resp = self
            .http
            .post(&self.base_url)
            .query(&[("key", self.api_key.as_str())])
            .json(&serde_json::json!({ "idToken": token }))
            .send()
            .await
            .map_err(|err| PageLensError::Unauthorized(format!("token lookup failed: {err}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            warn!(%status, "identity provider rejected token");
            return Err(PageLensError::Unauthorized(format!(
                "identity provider rejected token ({status}): {body}"
            )));
        }

        let lookup: LookupResponse = resp
            .json()
            .await
            .map_err(|err| PageLensError::Unauthorized(format!("malformed lookup response: {err}")))?;

        let user = lookup
            .users
            .into_iter()
            .next()
            .ok_or_else(|| PageLensError::Unauthorized("token matched no account".into()))?;

        debug!(uid = %user.local_id, "bearer token verified");
        Ok(VerifiedIdentity {
            uid: user.local_id,
            email: user.email.unwrap_or_default(),
            display_name: user.display_name.unwrap_or_default(),
            photo_url: user.photo_url,
            email_verified: user.email_verified,
            phone_number: user.phone_number,
        })
    }
}
