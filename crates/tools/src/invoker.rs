//! Endpoint Invoker: dispatches endpoint candidates as real HTTP calls.
//!
//! For each candidate, in order:
//! 1. resolve the base server from the [`ApiCatalog`] (or the default base)
//! 2. substitute `{param}` placeholders, keeping the rest as JSON payload
//! 3. send the request with the access token as the `token` query parameter
//! 4. classify the response into an [`Outcome`]
//!
//! Candidates are awaited one at a time. What a transport failure does to
//! the rest of the batch is governed by [`CandidateFailures`].

use std::sync::Arc;
use std::time::Duration;
use reqwest::Method;
use stepwise_config::{AppConfig, CandidateFailures};
use stepwise_core::error::InvokeError;
use stepwise_core::{EndpointCandidate, InvocationBatch, InvocationResult, Outcome};
use tracing::{debug, info, warn};
use crate::openapi::ApiCatalog;

/// Turns endpoint candidates into classified invocation results.
pub struct EndpointInvoker {
    client: reqwest::Client,
    catalog: Arc<ApiCatalog>,
    access_token: Option<String>,
    default_base_url: String,
    resolve_servers: bool,
    failure_policy: CandidateFailures,
}

fn build_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .expect("Failed to create HTTP client")
}

impl EndpointInvoker {
    pub fn new(catalog: Arc<ApiCatalog>, access_token: Option<String>) -> Self {
        Self {
            client: build_client(Duration::from_secs(600)),
            catalog,
            access_token,
            default_base_url: "https://api.apify.com/v2".into(),
            resolve_servers: true,
            failure_policy: CandidateFailures::AbortBatch,
        }
    }

    /// Build from the `[engine]` and `[api]` configuration sections.
    pub fn from_config(config: &AppConfig, catalog: Arc<ApiCatalog>) -> Self {
        Self::new(catalog, config.api.access_token.clone())
            .with_timeout(Duration::from_secs(config.engine.http_timeout_secs))
            .with_default_base_url(&config.engine.default_base_url)
            .with_server_resolution(config.api.resolve_servers)
            .with_failure_policy(config.engine.candidate_failures)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = build_client(timeout);
        self
    }

    pub fn with_default_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.default_base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// When disabled, every relative URL goes to the default base.
    pub fn with_server_resolution(mut self, enabled: bool) -> Self {
        self.resolve_servers = enabled;
        self
    }

    pub fn with_failure_policy(mut self, policy: CandidateFailures) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn catalog(&self) -> &ApiCatalog {
        &self.catalog
    }

    /// The base server for a URL template.
    pub fn base_url_for(&self, template: &str) -> &str {
        if self.resolve_servers {
            if let Some(server) = self.catalog.server_for(template) {
                return server.trim_end_matches('/');
            }
        }
        &self.default_base_url
    }

    /// The full request URL for a candidate whose path is already substituted.
    fn request_url(&self, template: &str, resolved: &str) -> String {
        if resolved.starts_with("http://") || resolved.starts_with("https://") {
            return resolved.to_string();
        }
        let base = self.base_url_for(template);
        if resolved.starts_with('/') {
            format!("{base}{resolved}")
        } else {
            format!("{base}/{resolved}")
        }
    }

    /// Invoke every candidate in order.
    ///
    /// Under [`CandidateFailures::AbortBatch`] the first transport failure
    /// is returned and no partial results survive. Under
    /// [`CandidateFailures::Isolate`] it is recorded as [`Outcome::Errored`]
    /// and the next candidate runs.
    pub async fn invoke(
        &self,
        candidates: &[EndpointCandidate],
    ) -> std::result::Result<InvocationBatch, InvokeError> {
        let token = self
            .access_token
            .as_deref()
            .ok_or(InvokeError::MissingAccessToken)?;

        let mut batch = InvocationBatch::default();
        for candidate in candidates {
            match self.invoke_one(candidate, token).await {
                Ok(result) => batch.push(result),
                Err(e) => match self.failure_policy {
                    CandidateFailures::AbortBatch => {
                        warn!(url = %candidate.url, error = %e, "Invocation failed, aborting batch");
                        return Err(e);
                    }
                    CandidateFailures::Isolate => {
                        warn!(url = %candidate.url, error = %e, "Invocation failed, continuing");
                        let (resolved, _) = candidate.resolve_template();
                        batch.push(InvocationResult {
                            url: resolved,
                            outcome: Outcome::Errored {
                                message: e.to_string(),
                            },
                        });
                    }
                },
            }
        }

        Ok(batch)
    }

    async fn invoke_one(
        &self,
        candidate: &EndpointCandidate,
        token: &str,
    ) -> std::result::Result<InvocationResult, InvokeError> {
        let method = Method::from_bytes(candidate.method.trim().to_uppercase().as_bytes())
            .map_err(|_| InvokeError::InvalidMethod(candidate.method.clone()))?;

        let (resolved, payload) = candidate.resolve_template();
        let full_url = self.request_url(&candidate.url, &resolved);
        let url = reqwest::Url::parse(&full_url).map_err(|e| InvokeError::InvalidUrl {
            url: full_url.clone(),
            reason: e.to_string(),
        })?;

        debug!(%method, url = %full_url, payload = %serde_json::Value::Object(payload.clone()), "Invoking endpoint");

        let response = self
            .client
            .request(method, url)
            .query(&[("token", token)])
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    InvokeError::Timeout {
                        url: full_url.clone(),
                    }
                } else {
                    InvokeError::Transport {
                        url: full_url.clone(),
                        reason: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| InvokeError::Transport {
            url: full_url.clone(),
            reason: e.to_string(),
        })?;

        let outcome = if status.is_success() {
            match serde_json::from_str(&body) {
                Ok(json) => Outcome::Json { body: json },
                Err(_) => Outcome::Text { body },
            }
        } else {
            Outcome::Failed {
                status: status.as_u16(),
                body,
            }
        };

        info!(
            url = %full_url,
            status = status.as_u16(),
            preview = %preview(&outcome.payload().to_string()),
            "Endpoint responded"
        );

        Ok(InvocationResult {
            url: resolved,
            outcome,
        })
    }
}

fn preview(text: &str) -> &str {
    match text.char_indices().nth(200) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
