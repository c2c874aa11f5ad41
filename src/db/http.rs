//! reqwest-backed transport
//!
//! Injects the bearer token on every request and reports 401s to the
//! `AuthProvider`, mirroring what an HTTP interceptor would do.

use crate::config::AppConfig;
use crate::db::auth::AuthProvider;
use crate::db::driver::{ApiResponse, HttpClient, Method};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Url;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// HTTP client for the dynamic record API
pub struct ReqwestClient {
    base: String,
    client: reqwest::Client,
    auth: Arc<dyn AuthProvider>,
}

impl ReqwestClient {
    pub fn new(config: &AppConfig, auth: Arc<dyn AuthProvider>) -> Result<Self> {
        // Validate the base early so a typo fails at startup, not on first request
        Url::parse(&config.api_url).context("invalid api_url")?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("failed to build http client")?;

        Ok(Self {
            base: config.api_url.trim_end_matches('/').to_string(),
            client,
            auth,
        })
    }

    fn url(&self, path: &str) -> Result<Url> {
        let joined = format!("{}/{}", self.base, path.trim_start_matches('/'));
        Url::parse(&joined).with_context(|| format!("invalid request url: {}", joined))
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(token) = self.auth.current_token() {
            if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", token)) {
                headers.insert(AUTHORIZATION, value);
            }
        }
        headers
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn request(&self, method: Method, path: &str, body: Option<&Value>) -> Result<ApiResponse> {
        let url = self.url(path)?;
        let builder = match method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
            Method::Put => self.client.put(url),
            Method::Delete => self.client.delete(url),
        };
        let builder = builder.headers(self.headers());
        let builder = match body {
            Some(body) => builder.json(body),
            None => builder,
        };

        tracing::debug!(%method, path, "sending request");
        let resp = builder.send().await?;
        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            self.auth.on_unauthorized();
        }
        let body = resp
            .text()
            .await
            .with_context(|| format!("failed to read response body (status: {})", status.as_u16()))?;
        tracing::debug!(%method, path, status = status.as_u16(), "response received");

        Ok(ApiResponse::new(status.as_u16(), body))
    }
}
