//! REST transport
//!
//! The client only needs `GET` with query parameters and form `POST`, both
//! with headers, returning the status and decoded JSON body. Keeping that
//! behind [`RestTransport`] lets tests count calls and script responses.

use super::error::{ClientError, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Header or parameter list, in send order
pub type Pairs = [(String, String)];

/// Status, final URL and decoded body of one REST call
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub url: String,
    pub body: Value,
}

impl ApiResponse {
    pub fn new(status: u16, url: impl Into<String>, body: Value) -> Self {
        Self {
            status,
            url: url.into(),
            body,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Pass 2xx responses through, turn anything else into `BadApiResponse`
    pub fn require_success(self) -> Result<Self> {
        if self.is_success() {
            return Ok(self);
        }

        Err(ClientError::BadApiResponse {
            url: self.url,
            status: self.status,
            body: self.body.to_string(),
        })
    }

    /// Look up a nested value by JSON pointer, failing with `MissingField`
    pub fn field(&self, pointer: &str) -> Result<&Value> {
        self.body
            .pointer(pointer)
            .ok_or_else(|| ClientError::MissingField(pointer.to_string()))
    }
}

#[async_trait]
pub trait RestTransport: Send + Sync {
    async fn get(&self, url: &str, headers: &Pairs, query: &Pairs) -> Result<ApiResponse>;

    async fn post(&self, url: &str, headers: &Pairs, form: &Pairs) -> Result<ApiResponse>;
}

/// [`RestTransport`] backed by a shared `reqwest::Client`
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl RestTransport for ReqwestTransport {
    async fn get(&self, url: &str, headers: &Pairs, query: &Pairs) -> Result<ApiResponse> {
        debug!("GET {}", url);
        let request = with_headers(self.client.get(url), headers).query(query);
        into_api_response(request.send().await?).await
    }

    async fn post(&self, url: &str, headers: &Pairs, form: &Pairs) -> Result<ApiResponse> {
        debug!("POST {}", url);
        let request = with_headers(self.client.post(url), headers).form(form);
        into_api_response(request.send().await?).await
    }
}

/// Add headers to a request builder
fn with_headers(req: RequestBuilder, headers: &Pairs) -> RequestBuilder {
    headers
        .iter()
        .fold(req, |r, (k, v)| r.header(k.as_str(), v.as_str()))
}

async fn into_api_response(response: reqwest::Response) -> Result<ApiResponse> {
    let status = response.status().as_u16();
    let url = response.url().to_string();
    let text = response.text().await?;

    // Error pages are not always JSON; keep them readable in BadApiResponse
    let body = if text.trim().is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).unwrap_or(Value::String(text))
    };

    Ok(ApiResponse { status, url, body })
}

/// Build an owned header/parameter list from string pairs
pub fn pairs<K, V, I>(items: I) -> Vec<(String, String)>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    items
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
