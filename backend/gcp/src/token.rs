//! OAuth2 access tokens via the JWT-bearer grant.
//!
//! Mints a short-lived RS256 assertion from the service-account key,
//! exchanges it at the Google token endpoint, and caches the access token
//! until shortly before expiry. One `TokenSource` is shared by every client
//! that talks to a Google API.

use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use crate::credentials::ServiceAccountKey;

const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
/// Firestore and Vision are both covered by the cloud-platform scope.
pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";
/// Refresh this long before the reported expiry.
const EXPIRY_SLACK: Duration = Duration::from_secs(60);

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Caching access-token source for Google APIs.
pub struct TokenSource {
    http: reqwest::Client,
    key: ServiceAccountKey,
    scope: String,
    cached: RwLock<Option<CachedToken>>,
}

impl TokenSource {
    pub fn new(http: reqwest::Client, key: ServiceAccountKey, scope: impl Into<String>) -> Self {
        Self { http, key, scope: scope.into(), cached: RwLock::new(None) }
    }

    /// Current access token, minting a fresh one when the cache is stale.
    pub async fn access_token(&self) -> Result<String> {
        {
            let cached = self.cached.read().await;
            if let Some(token) = cached.as_ref() {
                if token.expires_at > Instant::now() {
                    return Ok(token.value.clone());
                }
            }
        }

        let mut cached = self.cached.write().await;
        // Another task may have refreshed while we waited for the lock.
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() {
                return Ok(token.value.clone());
            }
        }

        let (value, expires_in) = self.fetch_token().await?;
        debug!(scope = %self.scope, expires_in, "minted Google access token");
        let expires_at =
            Instant::now() + Duration::from_secs(expires_in).saturating_sub(EXPIRY_SLACK);
        *cached = Some(CachedToken { value: value.clone(), expires_at });
        Ok(value)
    }

    async fn fetch_token(&self) -> Result<(String, u64)> {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            iss: &self.key.client_email,
            scope: &self.scope,
            aud: TOKEN_URL,
            iat: now,
            exp: now + 3600,
        };
        let encoding_key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())
            .context("service-account private key is not a valid RSA PEM")?;
        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &encoding_key)
            .context("failed to sign service-account assertion")?;

        let resp = self
            .http
            .post(TOKEN_URL)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await
            .context("token exchange request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            bail!("token exchange failed with {status}: {body}");
        }

        let token: TokenResponse =
            resp.json().await.context("token endpoint returned unexpected JSON")?;
        Ok((token.access_token, token.expires_in))
    }
}
