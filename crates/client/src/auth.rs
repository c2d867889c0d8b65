//! OAuth2 client-credentials token acquisition with caching.
//!
//! Tokens are fetched from the configured token endpoint and cached until
//! shortly before they expire, so repeated client calls do not hit the
//! token endpoint. Concurrent callers coalesce on the cache entry.

use crate::error::{DataverseError, Result};
use crate::transport::{Method, Transport, TransportRequest};
use dataverse_core::config::{ApiConfig, CacheConfig};
use moka::Expiry;
use moka::future::Cache;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Tokens are always cached for at least this long, even when the safety
/// margin would push the TTL to zero.
const MIN_TOKEN_TTL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Deserialize)]
struct TokenResponse {
  access_token: String,
  #[serde(default)]
  expires_in: Option<u64>,
}

#[derive(Clone)]
struct CachedToken {
  token: String,
  ttl: Duration,
}

struct TokenExpiry;

impl Expiry<String, CachedToken> for TokenExpiry {
  fn expire_after_create(&self, _key: &String, value: &CachedToken, _created_at: Instant) -> Option<Duration> {
    Some(value.ttl)
  }
}

enum TokenKind {
  OAuth {
    token_url: String,
    client_id: String,
    client_secret: String,
    scope: Vec<String>,
    safety_margin: Duration,
    cache: Cache<String, CachedToken>,
  },
  /// Fixed token, for tests and pre-acquired credentials.
  Static(String),
}

/// Source of bearer tokens for Web API requests.
pub struct TokenSource {
  transport: Arc<dyn Transport>,
  kind: TokenKind,
}

impl std::fmt::Debug for TokenSource {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match &self.kind {
      TokenKind::OAuth { token_url, client_id, .. } => f
        .debug_struct("TokenSource")
        .field("token_url", token_url)
        .field("client_id", client_id)
        .finish_non_exhaustive(),
      TokenKind::Static(_) => f.debug_struct("TokenSource").field("kind", &"static").finish(),
    }
  }
}

impl TokenSource {
  pub fn new(transport: Arc<dyn Transport>, api: &ApiConfig, cache: &CacheConfig) -> Self {
    Self {
      transport,
      kind: TokenKind::OAuth {
        token_url: api.token_url.clone(),
        client_id: api.client_id.clone(),
        client_secret: api.client_secret.clone(),
        scope: api.scope.clone(),
        safety_margin: Duration::from_secs(cache.token_safety_margin_secs),
        cache: Cache::builder().max_capacity(8).expire_after(TokenExpiry).build(),
      },
    }
  }

  /// Token source that always returns the given token.
  pub fn fixed(transport: Arc<dyn Transport>, token: impl Into<String>) -> Self {
    Self {
      transport,
      kind: TokenKind::Static(token.into()),
    }
  }

  /// Get a valid access token, from cache when possible.
  pub async fn token(&self) -> Result<String> {
    match &self.kind {
      TokenKind::Static(token) => Ok(token.clone()),
      TokenKind::OAuth { cache, .. } => {
        let key = self.cache_key();
        let cached = cache
          .try_get_with(key, self.fetch_token())
          .await
          .map_err(|e: Arc<DataverseError>| DataverseError::Token(e.to_string()))?;
        Ok(cached.token)
      }
    }
  }

  /// Drop the cached token so the next call fetches a fresh one.
  pub async fn invalidate(&self) {
    if let TokenKind::OAuth { cache, .. } = &self.kind {
      cache.invalidate(&self.cache_key()).await;
    }
  }

  fn cache_key(&self) -> String {
    match &self.kind {
      TokenKind::OAuth { token_url, client_id, .. } => format!("{token_url}|{client_id}"),
      TokenKind::Static(_) => String::new(),
    }
  }

  async fn fetch_token(&self) -> Result<CachedToken> {
    let TokenKind::OAuth {
      token_url,
      client_id,
      client_secret,
      scope,
      safety_margin,
      ..
    } = &self.kind
    else {
      unreachable!("fetch_token is only called for oauth sources");
    };

    let body = url::form_urlencoded::Serializer::new(String::new())
      .append_pair("grant_type", "client_credentials")
      .append_pair("client_id", client_id)
      .append_pair("client_secret", client_secret)
      .append_pair("scope", &scope.join(" "))
      .finish();

    tracing::debug!(token_url = %token_url, client_id = %client_id, "fetching access token");

    let response = self
      .transport
      .execute(TransportRequest {
        method: Method::Post,
        url: token_url.clone(),
        headers: vec![(
          "Content-Type".to_string(),
          "application/x-www-form-urlencoded".to_string(),
        )],
        body: Some(body.into_bytes()),
      })
      .await?;

    if !response.is_success() {
      tracing::warn!(status = response.status, "token endpoint returned an error");
      return Err(DataverseError::Token(format!(
        "token endpoint returned {}: {}",
        response.status,
        response.text()
      )));
    }

    let parsed: TokenResponse =
      serde_json::from_slice(&response.body).map_err(|e| DataverseError::Token(e.to_string()))?;

    let expires_in = Duration::from_secs(parsed.expires_in.unwrap_or(3600));
    let ttl = expires_in.saturating_sub(*safety_margin).max(MIN_TOKEN_TTL);

    tracing::debug!(ttl_secs = ttl.as_secs(), "caching access token");

    Ok(CachedToken {
      token: parsed.access_token,
      ttl,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::MockTransport;
  use serde_json::json;

  fn api_config() -> ApiConfig {
    ApiConfig {
      api_url: "https://org.example/api/data/v9.1/".to_string(),
      token_url: "https://login.example/token".to_string(),
      client_id: "client".to_string(),
      client_secret: "secret".to_string(),
      scope: vec!["https://org.example/.default".to_string()],
    }
  }

  #[tokio::test]
  async fn test_token_fetch_and_cache() {
    let transport = Arc::new(
      MockTransport::new().with_responses([json!({"access_token": "abc123", "expires_in": 3600})], false),
    );
    let source = TokenSource::new(transport.clone(), &api_config(), &CacheConfig::default());

    assert_eq!(source.token().await.unwrap(), "abc123");
    // Second call is served from cache, no new request
    assert_eq!(source.token().await.unwrap(), "abc123");
    assert_eq!(transport.requests().len(), 1);

    let request = transport.requests().remove(0);
    assert_eq!(request.method, Method::Post);
    assert_eq!(request.url, "https://login.example/token");
    let body = String::from_utf8(request.body.unwrap()).unwrap();
    assert!(body.contains("grant_type=client_credentials"));
    assert!(body.contains("client_id=client"));
    assert!(body.contains("client_secret=secret"));
  }

  #[tokio::test]
  async fn test_token_invalidate_refetches() {
    let transport = Arc::new(MockTransport::new().with_responses(
      [
        json!({"access_token": "first", "expires_in": 3600}),
        json!({"access_token": "second", "expires_in": 3600}),
      ],
      false,
    ));
    let source = TokenSource::new(transport.clone(), &api_config(), &CacheConfig::default());

    assert_eq!(source.token().await.unwrap(), "first");
    source.invalidate().await;
    assert_eq!(source.token().await.unwrap(), "second");
    assert_eq!(transport.requests().len(), 2);
  }

  #[tokio::test]
  async fn test_token_endpoint_error() {
    let transport = Arc::new(
      MockTransport::new()
        .with_responses([json!({"error": "invalid_client"})], false)
        .with_status_codes([400], false),
    );
    let source = TokenSource::new(transport, &api_config(), &CacheConfig::default());

    let error = source.token().await.unwrap_err();
    assert!(matches!(error, DataverseError::Token(_)));
  }

  #[tokio::test]
  async fn test_fixed_token() {
    let transport = Arc::new(MockTransport::new());
    let source = TokenSource::fixed(transport.clone(), "fixed-token");
    assert_eq!(source.token().await.unwrap(), "fixed-token");
    assert!(transport.requests().is_empty());
  }
}
