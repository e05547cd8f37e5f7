// SPDX-FileCopyrightText: 2026 Reactiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Thin HTTP client for talking to a running `reactiv serve` gateway.

use std::time::Duration;

use reactiv_config::model::GatewayConfig;
use reactiv_core::ReactivError;
use reqwest::StatusCode;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Client bound to the configured gateway address and bearer token.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl GatewayClient {
    pub fn new(config: &GatewayConfig) -> Result<Self, ReactivError> {
        Self::with_base_url(config.base_url(), config.bearer_token.clone())
    }

    pub fn with_base_url(
        base_url: impl Into<String>,
        token: Option<String>,
    ) -> Result<Self, ReactivError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(3))
            .build()
            .map_err(|e| ReactivError::Internal(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// GET without credentials. Any status with a parseable body is accepted.
    pub async fn get_public<T: DeserializeOwned>(&self, path: &str) -> Result<T, ReactivError> {
        let resp = self
            .http
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| gateway_error(format!("request to {path} failed"), e))?;
        resp.json()
            .await
            .map_err(|e| gateway_error(format!("failed to parse {path} response"), e))
    }

    /// Authenticated GET.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ReactivError> {
        let token = self.require_token()?;
        let resp = self
            .http
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| gateway_error(format!("request to {path} failed"), e))?;
        Self::decode(path, resp).await
    }

    /// Authenticated POST with an empty body.
    pub async fn post<T: DeserializeOwned>(&self, path: &str) -> Result<T, ReactivError> {
        let token = self.require_token()?;
        let resp = self
            .http
            .post(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| gateway_error(format!("request to {path} failed"), e))?;
        Self::decode(path, resp).await
    }

    /// Authenticated POST with a JSON body.
    ///
    /// Bodies of statuses listed in `also_accept` are decoded like a 2xx,
    /// for routes that answer a rejection with a result document.
    pub async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        also_accept: &[StatusCode],
    ) -> Result<T, ReactivError> {
        let token = self.require_token()?;
        let resp = self
            .http
            .post(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .map_err(|e| gateway_error(format!("request to {path} failed"), e))?;
        if also_accept.contains(&resp.status()) {
            return resp
                .json()
                .await
                .map_err(|e| gateway_error(format!("failed to parse {path} response"), e));
        }
        Self::decode(path, resp).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn require_token(&self) -> Result<&str, ReactivError> {
        self.token.as_deref().ok_or_else(|| {
            ReactivError::Config(
                "gateway.bearer_token must be set to use the authenticated API".to_string(),
            )
        })
    }

    async fn decode<T: DeserializeOwned>(
        path: &str,
        resp: reqwest::Response,
    ) -> Result<T, ReactivError> {
        let status = resp.status();
        if !status.is_success() {
            return Err(ReactivError::Gateway {
                message: format!("{path} returned {status}"),
                source: None,
            });
        }
        resp.json()
            .await
            .map_err(|e| gateway_error(format!("failed to parse {path} response"), e))
    }
}

fn gateway_error(message: String, source: reqwest::Error) -> ReactivError {
    ReactivError::Gateway {
        message: format!("{message}: {source}"),
        source: Some(Box::new(source)),
    }
}
