//! Alert sinks: the X (Twitter) v2 API and a log-only dry-run sink.

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Serialize;
use sha1::Sha1;
use tracing::{debug, warn};

use crate::traits::{AlertSink, SinkError};

pub const X_API_URL: &str = "https://api.twitter.com";

/// Variables that supply X credentials, reported when none are configured.
pub const X_CREDENTIAL_VARS: &str = "SENTINEL_X_API_KEY, SENTINEL_X_API_SECRET, \
     SENTINEL_X_ACCESS_TOKEN and SENTINEL_X_ACCESS_TOKEN_SECRET (or SENTINEL_X_BEARER_TOKEN)";

#[derive(Debug, Serialize)]
struct PostRequest<'a> {
    text: &'a str,
}

// ============================================================================
// Credentials
// ============================================================================

/// OAuth 1.0a user-context credentials (consumer key pair plus access token pair).
#[derive(Clone, PartialEq, Eq)]
pub struct OAuth1Credentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub access_token: String,
    pub access_token_secret: String,
}

impl fmt::Debug for OAuth1Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuth1Credentials")
            .field("consumer_key", &self.consumer_key)
            .field("access_token", &self.access_token)
            .finish_non_exhaustive()
    }
}

impl OAuth1Credentials {
    /// Builds the `Authorization` header for one request.
    ///
    /// Only the `oauth_*` parameters are signed: the tweet is sent as a JSON
    /// body, which OAuth 1.0a leaves out of the signature base string.
    pub fn authorization_header(
        &self,
        method: &str,
        url: &str,
        nonce: &str,
        timestamp: u64,
    ) -> Result<String, SinkError> {
        let timestamp = timestamp.to_string();
        let params = [
            ("oauth_consumer_key", self.consumer_key.as_str()),
            ("oauth_nonce", nonce),
            ("oauth_signature_method", "HMAC-SHA1"),
            ("oauth_timestamp", timestamp.as_str()),
            ("oauth_token", self.access_token.as_str()),
            ("oauth_version", "1.0"),
        ];
        let signature = oauth1_signature(
            method,
            url,
            &params,
            &self.consumer_secret,
            &self.access_token_secret,
        )?;

        let mut fields: Vec<String> = params
            .iter()
            .map(|(key, value)| format!("{key}=\"{}\"", oauth_encode(value)))
            .collect();
        fields.push(format!("oauth_signature=\"{}\"", oauth_encode(&signature)));
        fields.sort();

        Ok(format!("OAuth {}", fields.join(", ")))
    }
}

/// How the sink authenticates against the X API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XCredentials {
    /// Long-lived OAuth 1.0a user context, as issued in the developer portal.
    OAuth1(OAuth1Credentials),
    /// OAuth 2.0 user access token. These expire unless refreshed externally.
    Bearer(String),
}

impl XCredentials {
    /// Picks OAuth 1.0a when all four values are present, else a bearer token.
    ///
    /// Blank values count as missing.
    pub fn from_parts(
        consumer_key: Option<String>,
        consumer_secret: Option<String>,
        access_token: Option<String>,
        access_token_secret: Option<String>,
        bearer_token: Option<String>,
    ) -> Option<Self> {
        let present = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        match (
            present(consumer_key),
            present(consumer_secret),
            present(access_token),
            present(access_token_secret),
        ) {
            (Some(consumer_key), Some(consumer_secret), Some(access_token), Some(access_token_secret)) => {
                Some(XCredentials::OAuth1(OAuth1Credentials {
                    consumer_key,
                    consumer_secret,
                    access_token,
                    access_token_secret,
                }))
            }
            _ => present(bearer_token).map(XCredentials::Bearer),
        }
    }

    pub fn scheme(&self) -> &'static str {
        match self {
            XCredentials::OAuth1(_) => "oauth1",
            XCredentials::Bearer(_) => "bearer",
        }
    }
}

fn oauth_encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// HMAC-SHA1 signature over the OAuth 1.0a signature base string, base64 encoded.
///
/// `params` holds every signed parameter (oauth_* plus any query or form
/// parameters), unencoded and in any order.
pub fn oauth1_signature(
    method: &str,
    url: &str,
    params: &[(&str, &str)],
    consumer_secret: &str,
    token_secret: &str,
) -> Result<String, SinkError> {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(key, value)| (oauth_encode(key), oauth_encode(value)))
        .collect();
    encoded.sort();

    let param_string = encoded
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");
    let base_string = format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        oauth_encode(url),
        oauth_encode(&param_string)
    );
    let signing_key = format!(
        "{}&{}",
        oauth_encode(consumer_secret),
        oauth_encode(token_secret)
    );

    let mut mac = Hmac::<Sha1>::new_from_slice(signing_key.as_bytes())
        .map_err(|e| SinkError::Signing(e.to_string()))?;
    mac.update(base_string.as_bytes());
    Ok(BASE64.encode(mac.finalize().into_bytes()))
}

fn oauth_nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

// ============================================================================
// Sinks
// ============================================================================

/// Posts alerts to `POST /2/tweets`.
///
/// Missing credentials are not a startup error: every delivery fails with
/// [`SinkError::MissingCredentials`] and the caller logs it.
#[derive(Debug, Clone)]
pub struct XAlertSink {
    endpoint: String,
    credentials: Option<XCredentials>,
    http: reqwest::Client,
}

impl XAlertSink {
    pub fn new(
        api_url: &str,
        credentials: Option<XCredentials>,
        request_timeout: Duration,
    ) -> Result<Self, SinkError> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;

        Ok(Self {
            endpoint: format!("{}/2/tweets", api_url.trim_end_matches('/')),
            credentials,
            http,
        })
    }

    pub fn credentials(&self) -> Option<&XCredentials> {
        self.credentials.as_ref()
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl AlertSink for XAlertSink {
    fn sink_id(&self) -> &str {
        "x"
    }

    async fn deliver(&self, message: &str) -> Result<(), SinkError> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or(SinkError::MissingCredentials(X_CREDENTIAL_VARS))?;

        debug!(endpoint = %self.endpoint, scheme = credentials.scheme(), "Posting alert");

        let request = self
            .http
            .post(&self.endpoint)
            .json(&PostRequest { text: message });
        let request = match credentials {
            XCredentials::OAuth1(oauth) => {
                let header = oauth.authorization_header(
                    "POST",
                    &self.endpoint,
                    &oauth_nonce(),
                    unix_timestamp(),
                )?;
                request.header(reqwest::header::AUTHORIZATION, header)
            }
            XCredentials::Bearer(token) => request.bearer_auth(token),
        };

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SinkError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}

/// Writes alerts to the log instead of broadcasting them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogAlertSink;

#[async_trait]
impl AlertSink for LogAlertSink {
    fn sink_id(&self) -> &str {
        "log"
    }

    async fn deliver(&self, message: &str) -> Result<(), SinkError> {
        warn!(alert = %message, "Dry run, alert not broadcast");
        Ok(())
    }
}
