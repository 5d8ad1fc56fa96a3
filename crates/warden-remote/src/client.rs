//! Remote authorization client.
//!
//! Sends a decision request to a remote authority and interprets the
//! response: a 2xx status grants (optionally with claims), anything else
//! denies. Compiled-rule verification goes through the same client.
//! Exactly one request is made per call.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, error, instrument, warn};
use warden_rbac::{Claims, DecisionRequest};

use crate::config::RemoteConfig;
use crate::error::{RemoteError, RemoteResult};
use crate::verdict::{Verdict, VerifyEnvelope};
use crate::wire::RemoteDecisionBody;

/// Per-call overrides for a remote decision.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteCall {
    /// Headers for this call; they win over configured defaults.
    pub headers: BTreeMap<String, String>,

    /// Timeout for this call, overriding the configured default.
    pub timeout: Option<Duration>,
}

impl RemoteCall {
    /// Empty call options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a header. The name is stored lower-cased.
    pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers.insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    /// Forward an inbound `authorization` header value verbatim.
    pub fn authorization(self, value: impl Into<String>) -> Self {
        self.header("authorization", value)
    }

    /// Set the timeout for this call.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Client for a remote authorization endpoint.
///
/// # Example
///
/// ```rust,no_run
/// use warden_rbac::DecisionRequest;
/// use warden_remote::{RemoteAuthorizer, RemoteCall, RemoteConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let authorizer = RemoteAuthorizer::new(RemoteConfig::new("https://auth.example.com/authorize"))?;
/// let request = DecisionRequest::new(["users:read"], None)?;
///
/// let claims = authorizer
///     .authorize(&request, &RemoteCall::new().authorization("Bearer abc"))
///     .await?;
/// println!("granted, claims: {claims:?}");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RemoteAuthorizer {
    /// HTTP client instance.
    client: Client,

    /// Endpoint configuration.
    config: RemoteConfig,
}

impl std::fmt::Debug for RemoteAuthorizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteAuthorizer")
            .field("url", &self.config.url)
            .field("timeout_ms", &self.config.timeout_ms)
            .finish()
    }
}

impl RemoteAuthorizer {
    /// Create a client.
    ///
    /// # Errors
    ///
    /// [`RemoteError::Config`] when the configuration is invalid, and
    /// [`RemoteError::Transport`] when the HTTP client cannot be built.
    pub fn new(config: RemoteConfig) -> RemoteResult<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(config.timeout())
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .map_err(RemoteError::Transport)?;

        Ok(Self { client, config })
    }

    /// Endpoint configuration.
    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    /// Ask the remote authority for a decision.
    ///
    /// # Returns
    ///
    /// `Ok(Some(claims))` on a 2xx response with a JSON object body,
    /// `Ok(None)` on a 2xx response with any other body.
    ///
    /// # Errors
    ///
    /// - [`RemoteError::NotConfigured`] without an endpoint (no request is made)
    /// - [`RemoteError::Denied`] on a non-2xx status
    /// - [`RemoteError::Timeout`] / [`RemoteError::Transport`] when no answer arrives
    #[instrument(
        skip(self, request, call),
        fields(permissions = request.permissions().len(), check_type = ?request.combinator())
    )]
    pub async fn authorize(
        &self,
        request: &DecisionRequest,
        call: &RemoteCall,
    ) -> RemoteResult<Option<Claims>> {
        let body = self.post(&RemoteDecisionBody::from(request), call).await?;

        if body.is_empty() {
            debug!("Remote authority granted request without claims");
            return Ok(None);
        }

        match serde_json::from_slice::<Value>(&body) {
            Ok(Value::Object(claims)) => {
                debug!(claims = claims.len(), "Remote authority granted request");
                Ok(Some(claims))
            }
            Ok(_) | Err(_) => {
                debug!("Remote authority granted request with a non-object body");
                Ok(None)
            }
        }
    }

    /// Ask a remote rules service whether a compiled-rule action holds.
    ///
    /// # Returns
    ///
    /// The `requestedActionResult` of a 2xx answer. An answer without a
    /// boolean verdict counts as `false`.
    ///
    /// # Errors
    ///
    /// As [`RemoteAuthorizer::authorize`]; a non-2xx status is
    /// [`RemoteError::Denied`].
    #[instrument(
        skip(self, envelope, call),
        fields(action = %envelope.c8rbac.requested_action)
    )]
    pub async fn verify(&self, envelope: &VerifyEnvelope, call: &RemoteCall) -> RemoteResult<bool> {
        let body = self.post(envelope, call).await?;

        match serde_json::from_slice::<Verdict>(&body) {
            Ok(verdict) => {
                debug!(result = verdict.requested_action_result, "Remote verdict received");
                Ok(verdict.requested_action_result)
            }
            Err(e) => {
                warn!("Remote verdict missing or malformed: {}", e);
                Ok(false)
            }
        }
    }

    /// POST `body` and return the body of a 2xx response.
    async fn post<B: Serialize + ?Sized>(&self, body: &B, call: &RemoteCall) -> RemoteResult<Vec<u8>> {
        let url = self.config.url.as_deref().ok_or(RemoteError::NotConfigured)?;
        let timeout = call.timeout.unwrap_or_else(|| self.config.timeout());
        let headers = self.merged_headers(call)?;

        debug!("Requesting remote decision from {}", url);

        let response = self
            .client
            .post(url)
            .headers(headers)
            .timeout(timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                let err = RemoteError::from_reqwest(e, timeout);
                error!("Remote authorization failed: {}", err);
                err
            })?;

        self.handle_response(response, timeout).await
    }

    /// Configured headers overlaid with per-call headers.
    fn merged_headers(&self, call: &RemoteCall) -> RemoteResult<HeaderMap> {
        let mut merged: BTreeMap<String, &str> = BTreeMap::new();
        for (name, value) in self.config.headers.iter().chain(call.headers.iter()) {
            merged.insert(name.to_ascii_lowercase(), value.as_str());
        }

        let mut headers = HeaderMap::with_capacity(merged.len());
        for (name, value) in merged {
            let header_name =
                HeaderName::from_bytes(name.as_bytes()).map_err(|e| RemoteError::InvalidHeader {
                    name: name.clone(),
                    message: e.to_string(),
                })?;
            let header_value = HeaderValue::from_str(value).map_err(|e| RemoteError::InvalidHeader {
                name: name.clone(),
                message: e.to_string(),
            })?;
            headers.insert(header_name, header_value);
        }
        Ok(headers)
    }

    /// Reject non-2xx responses as denials and read the body of the rest.
    async fn handle_response(&self, response: reqwest::Response, timeout: Duration) -> RemoteResult<Vec<u8>> {
        let status = response.status();

        if !status.is_success() {
            let status_text = status.canonical_reason().unwrap_or_default().to_string();
            let body = response.text().await.ok().filter(|b| !b.is_empty());
            warn!("Remote authority denied request ({}): {}", status.as_u16(), status_text);
            return Err(RemoteError::Denied {
                status: status.as_u16(),
                status_text,
                body,
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| RemoteError::from_reqwest(e, timeout))?;
        Ok(body.to_vec())
    }
}
