//! Transport seam between the client and the wire.
//!
//! The client talks to the API through the [`Transport`] trait so tests can
//! script responses without a server (see [`crate::testing`]). The reqwest
//! implementation is the default.

use crate::error::{DataverseError, Result};
use async_trait::async_trait;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
  Get,
  Post,
  Patch,
  Delete,
}

impl Method {
  pub fn as_str(&self) -> &'static str {
    match self {
      Method::Get => "get",
      Method::Post => "post",
      Method::Patch => "patch",
      Method::Delete => "delete",
    }
  }
}

/// A request as handed to the transport.
#[derive(Debug, Clone)]
pub struct TransportRequest {
  pub method: Method,
  pub url: String,
  pub headers: Vec<(String, String)>,
  pub body: Option<Vec<u8>>,
}

impl TransportRequest {
  /// Look up a header value (case insensitive).
  pub fn header(&self, name: &str) -> Option<&str> {
    self
      .headers
      .iter()
      .find(|(key, _)| key.eq_ignore_ascii_case(name))
      .map(|(_, value)| value.as_str())
  }
}

/// A raw response from the transport.
#[derive(Debug, Clone)]
pub struct TransportResponse {
  pub status: u16,
  pub body: Vec<u8>,
}

impl TransportResponse {
  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }

  pub fn json(&self) -> Result<serde_json::Value> {
    Ok(serde_json::from_slice(&self.body)?)
  }

  pub fn text(&self) -> String {
    String::from_utf8_lossy(&self.body).into_owned()
  }
}

#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
  async fn execute(&self, request: TransportRequest) -> Result<TransportResponse>;
}

/// Transport over a shared reqwest client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
  client: reqwest::Client,
}

impl HttpTransport {
  pub fn new(timeout: Duration) -> Result<Self> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;
    Ok(Self { client })
  }
}

#[async_trait]
impl Transport for HttpTransport {
  async fn execute(&self, request: TransportRequest) -> Result<TransportResponse> {
    let method = match request.method {
      Method::Get => reqwest::Method::GET,
      Method::Post => reqwest::Method::POST,
      Method::Patch => reqwest::Method::PATCH,
      Method::Delete => reqwest::Method::DELETE,
    };

    tracing::trace!(method = request.method.as_str(), url = %request.url, "sending request");

    let mut builder = self.client.request(method, &request.url);
    for (key, value) in &request.headers {
      builder = builder.header(key, value);
    }
    if let Some(body) = request.body {
      builder = builder.body(body);
    }

    let response = builder.send().await.map_err(DataverseError::Http)?;
    let status = response.status().as_u16();
    let body = response.bytes().await.map_err(DataverseError::Http)?.to_vec();

    tracing::trace!(status, body_len = body.len(), "received response");

    Ok(TransportResponse { status, body })
  }
}
