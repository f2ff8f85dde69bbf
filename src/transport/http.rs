use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT_LANGUAGE};
use reqwest::Client;
use serde_json::Value;

use super::{Method, Request, Response, Transport, TransportError};

const DEFAULT_ACCEPT_LANGUAGE: &str = "zh-CN,zh;q=0.9,en;q=0.8,en-GB;q=0.7,en-US;q=0.6";

/// `reqwest`-backed transport shared by every account of a run.
///
/// Cookies are never stored in the client: each request carries the
/// account's credential in its own headers, so accounts cannot leak session
/// state into one another.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static(DEFAULT_ACCEPT_LANGUAGE),
        );

        let client = Client::builder()
            .default_headers(default_headers)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    fn build_headers(request: &Request) -> Result<HeaderMap, TransportError> {
        let mut headers = HeaderMap::with_capacity(request.headers.len());
        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| TransportError::InvalidRequest(format!("header name {name}: {e}")))?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                TransportError::InvalidRequest(format!("header value for {name}: {e}"))
            })?;
            headers.insert(name, value);
        }
        Ok(headers)
    }
}

/// Decode a response body. Empty bodies become `Value::Null`; anything that
/// is not JSON yields `None` and is left for the classifier to judge.
pub(crate) fn parse_body(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Some(Value::Null);
    }
    serde_json::from_str(trimmed).ok()
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &Request) -> Result<Response, TransportError> {
        let headers = Self::build_headers(request)?;
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        }
        .headers(headers);
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        tracing::debug!("{} {}", request.method.as_str(), request.url);
        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout(e.to_string())
            } else if e.is_connect() {
                TransportError::Connect(e.to_string())
            } else {
                TransportError::Http(e)
            }
        })?;

        let status = response.status().as_u16();
        let text = response.text().await?;
        let body = parse_body(&text);
        if body.is_none() {
            tracing::debug!(
                status,
                "Non-JSON response body ({} bytes) from {}",
                text.len(),
                request.url
            );
        }
        Ok(Response { status, body })
    }
}
