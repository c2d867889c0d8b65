//! The Web API client.
//!
//! Wraps a [`Transport`] with authentication, default headers, pagination,
//! and error mapping. Requests are built through [`EntityRequest`] via
//! [`Client::entity`].

use crate::auth::TokenSource;
use crate::error::{CONFLICT_ERROR_CODE, DataverseError, Result};
use crate::request::EntityRequest;
use crate::transport::{HttpTransport, Method, Transport, TransportRequest, TransportResponse};
use dataverse_core::Config;
use futures::future::BoxFuture;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

/// Result of a query: the matched rows, and the total count of entities
/// matching the filter criteria when `$count=true` was set.
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
  pub rows: Vec<Value>,
  pub count: Option<u64>,
}

impl QueryResult {
  /// Take the first row, when exactly one was returned.
  pub fn into_single(mut self) -> Option<Value> {
    if self.rows.len() == 1 { self.rows.pop() } else { None }
  }
}

#[derive(Debug)]
struct ClientInner {
  transport: Arc<dyn Transport>,
  auth: TokenSource,
  api_url: String,
  pagesize: u32,
  show_annotations: AtomicBool,
  request_counter: AtomicU64,
}

/// Client for making queries against a Dataverse database.
#[derive(Debug, Clone)]
pub struct Client {
  inner: Arc<ClientInner>,
}

impl Client {
  /// Establish an API client connection using the default HTTP transport.
  pub fn new(mut config: Config) -> Result<Self> {
    config.validate()?;
    let transport: Arc<dyn Transport> =
      Arc::new(HttpTransport::new(Duration::from_secs(config.http.timeout_secs))?);
    let auth = TokenSource::new(transport.clone(), &config.api, &config.cache);
    Ok(Self::build(config, transport, auth))
  }

  /// Create a client from the `DYNAMICS_*` environment variables.
  pub fn from_environment() -> Result<Self> {
    Self::new(Config::from_environment()?)
  }

  /// Create a client over a custom transport. Token requests go through the
  /// same transport.
  pub fn with_transport(mut config: Config, transport: Arc<dyn Transport>) -> Result<Self> {
    config.validate()?;
    let auth = TokenSource::new(transport.clone(), &config.api, &config.cache);
    Ok(Self::build(config, transport, auth))
  }

  /// Create a client that uses a fixed bearer token. Meant for tests and
  /// pre-acquired credentials.
  pub fn with_static_token(mut config: Config, transport: Arc<dyn Transport>, token: &str) -> Result<Self> {
    config.validate()?;
    let auth = TokenSource::fixed(transport.clone(), token);
    Ok(Self::build(config, transport, auth))
  }

  fn build(config: Config, transport: Arc<dyn Transport>, auth: TokenSource) -> Self {
    Self {
      inner: Arc::new(ClientInner {
        transport,
        auth,
        api_url: config.api.api_url,
        pagesize: config.http.pagesize,
        show_annotations: AtomicBool::new(false),
        request_counter: AtomicU64::new(0),
      }),
    }
  }

  /// Start building a request against a table. An empty table name queries
  /// the list of tables in the database.
  pub fn entity(&self, table: impl Into<String>) -> EntityRequest {
    EntityRequest::new(self.clone(), table.into())
  }

  /// Show annotations for returned data, e.g. enum values, GUID names, etc.
  /// Helpful for development and debugging.
  pub fn show_annotations(&self, value: bool) {
    self.inner.show_annotations.store(value, Ordering::Relaxed);
  }

  /// Number of API requests made through this client.
  pub fn request_count(&self) -> u64 {
    self.inner.request_counter.load(Ordering::Relaxed)
  }

  pub fn pagesize(&self) -> u32 {
    self.inner.pagesize
  }

  pub(crate) fn api_url(&self) -> &str {
    &self.inner.api_url
  }

  pub(crate) fn annotations_default(&self) -> bool {
    self.inner.show_annotations.load(Ordering::Relaxed)
  }

  /// Fill in the default headers for an operation, keeping caller-set values.
  pub(crate) fn apply_default_headers(&self, method: Method, headers: &mut BTreeMap<String, String>) {
    fn setdefault(headers: &mut BTreeMap<String, String>, key: &str, value: impl Into<String>) {
      headers.entry(key.to_string()).or_insert_with(|| value.into());
    }

    setdefault(headers, "OData-MaxVersion", "4.0");
    setdefault(headers, "OData-Version", "4.0");
    setdefault(headers, "Accept", "application/json; odata.metadata=minimal");

    if matches!(method, Method::Post | Method::Patch | Method::Delete) {
      setdefault(headers, "Content-Type", "application/json; charset=utf-8");
    }

    if matches!(method, Method::Post | Method::Patch) {
      setdefault(headers, "Prefer", "return=representation");
      setdefault(headers, "MSCRM.SuppressDuplicateDetection", "false");
    }

    if matches!(method, Method::Patch) {
      setdefault(headers, "If-None-Match", "null");
      setdefault(headers, "If-Match", "*");
    }

    setdefault(headers, "Prefer", format!("odata.maxpagesize={}", self.inner.pagesize));
  }

  /// Execute a request with authentication. A 401 invalidates the cached
  /// token and retries once with a fresh one.
  pub(crate) async fn send(
    &self,
    method: Method,
    url: String,
    headers: BTreeMap<String, String>,
    body: Option<Vec<u8>>,
  ) -> Result<TransportResponse> {
    self.inner.request_counter.fetch_add(1, Ordering::Relaxed);

    let mut response = self.execute(method, &url, &headers, body.clone()).await?;

    if response.status == 401 {
      tracing::debug!(url = %url, "got 401, retrying with a fresh token");
      self.inner.auth.invalidate().await;
      response = self.execute(method, &url, &headers, body).await?;
    }

    Ok(response)
  }

  async fn execute(
    &self,
    method: Method,
    url: &str,
    headers: &BTreeMap<String, String>,
    body: Option<Vec<u8>>,
  ) -> Result<TransportResponse> {
    let token = self.inner.auth.token().await?;

    let mut header_vec: Vec<(String, String)> = Vec::with_capacity(headers.len() + 1);
    header_vec.push(("Authorization".to_string(), format!("Bearer {token}")));
    for (key, value) in headers {
      header_vec.push((key.clone(), value.clone()));
    }

    self
      .inner
      .transport
      .execute(TransportRequest {
        method,
        url: url.to_string(),
        headers: header_vec,
        body,
      })
      .await
  }

  /// GET with currently added query options.
  ///
  /// Rows that carry a `<column>@odata.nextLink` get the remaining pages of
  /// that column fetched and merged in. The server sometimes emits these
  /// links even when all items were already returned; a link next to a
  /// column shorter than the pagesize is dropped as spurious.
  pub(crate) fn fetch<'a>(
    &'a self,
    url: String,
    headers: BTreeMap<String, String>,
    not_found_ok: bool,
  ) -> BoxFuture<'a, Result<QueryResult>> {
    Box::pin(async move {
      tracing::debug!(url = %url, "get");
      let response = self.send(Method::Get, url, headers.clone(), None).await?;
      let data = parse_body(&response, "get")?;

      if let Some(error) = data.get("error") {
        return Err(error_from_body(response.status, error, "get"));
      }

      let count = data.get("@odata.count").and_then(Value::as_u64);
      let mut rows = into_rows(data);

      if rows.is_empty() {
        if not_found_ok {
          return Ok(QueryResult { rows, count });
        }
        return Err(DataverseError::from_status(
          404,
          "No records matching the given criteria.",
          "get",
        ));
      }

      for row in rows.iter_mut() {
        let Value::Object(map) = row else { continue };

        let next_link_keys: Vec<String> = map
          .keys()
          .filter(|key| key.ends_with("@odata.nextLink"))
          .cloned()
          .collect();

        for key in next_link_keys {
          let column = key.trim_end_matches("@odata.nextLink").to_string();
          let fetched_len = map
            .get(&column)
            .and_then(Value::as_array)
            .map(|items| items.len())
            .unwrap_or(0);

          // A partial page means everything was already fetched
          if fetched_len < self.inner.pagesize as usize {
            map.remove(&key);
            continue;
          }

          let Some(Value::String(link)) = map.remove(&key) else { continue };

          tracing::debug!(column = %column, "fetching next page of expanded column");
          let extra = self.fetch(link, headers.clone(), true).await?.rows;

          let existing: HashSet<String> = map
            .get(&column)
            .and_then(Value::as_array)
            .map(|items| {
              items
                .iter()
                .filter_map(|item| item.get("@odata.etag").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
            })
            .unwrap_or_default();

          if let Some(Value::Array(items)) = map.get_mut(&column) {
            // The next page can include rows from the previous one
            for item in extra {
              let duplicate = item
                .get("@odata.etag")
                .and_then(Value::as_str)
                .map(|etag| existing.contains(etag))
                .unwrap_or(false);
              if !duplicate {
                items.push(item);
              }
            }
          }
        }
      }

      Ok(QueryResult { rows, count })
    })
  }

  /// Request the next set of records from a top-level continuation link.
  pub async fn get_next(&self, next_link: &str, not_found_ok: bool) -> Result<QueryResult> {
    let mut headers = BTreeMap::new();
    self.apply_default_headers(Method::Get, &mut headers);
    self.fetch(next_link.to_string(), headers, not_found_ok).await
  }

  /// POST or PATCH a payload. A 204 response yields an empty object.
  pub(crate) async fn mutate(
    &self,
    method: Method,
    url: String,
    headers: BTreeMap<String, String>,
    data: Value,
  ) -> Result<Value> {
    tracing::debug!(url = %url, method = method.as_str(), "mutate");
    let body = serde_json::to_vec(&data)?;
    let response = self.send(method, url, headers, Some(body)).await?;

    if response.status == 204 {
      return Ok(Value::Object(Default::default()));
    }

    let data = parse_body(&response, method.as_str())?;

    if let Some(error) = data.get("error") {
      let code = error.get("code").and_then(Value::as_str).unwrap_or_default();
      if code == CONFLICT_ERROR_CODE {
        // No logging since this happens a lot
        return Err(DataverseError::Conflict {
          message: error_message(error),
        });
      }
      return Err(error_from_body(response.status, error, method.as_str()));
    }

    Ok(data)
  }

  /// Delete a row. Requires `table` and `row_id`.
  pub(crate) async fn remove(&self, url: String, headers: BTreeMap<String, String>) -> Result<()> {
    tracing::debug!(url = %url, "delete");
    let response = self.send(Method::Delete, url, headers, None).await?;

    if response.is_success() {
      return Ok(());
    }

    let message = response
      .json()
      .ok()
      .as_ref()
      .and_then(|data| data.get("error"))
      .map(error_message)
      .unwrap_or_else(|| response.text());

    Err(DataverseError::from_status(response.status, message, "delete"))
  }

  /// Execute a Web API action. Bound actions are rooted at their row.
  pub async fn execute_action(&self, action: crate::actions::Action) -> Result<Value> {
    let path = match &action.bound_to {
      Some((table, row_id)) => format!("{table}({row_id})/Microsoft.Dynamics.CRM.{}", action.name),
      None => action.name.clone(),
    };
    let url = format!("{}{}", self.inner.api_url, path);
    let mut headers = BTreeMap::new();
    self.apply_default_headers(Method::Post, &mut headers);
    self.mutate(Method::Post, url, headers, action.data).await
  }

  /// Execute a Web API function. Use [`crate::functions`] to construct the
  /// function fragment.
  pub async fn execute_function(&self, function: &str) -> Result<Value> {
    let url = format!("{}{}", self.inner.api_url, function);
    let mut headers = BTreeMap::new();
    self.apply_default_headers(Method::Get, &mut headers);

    tracing::debug!(url = %url, "executing function");
    let response = self.send(Method::Get, url, headers, None).await?;
    let data = parse_body(&response, "get")?;

    if let Some(error) = data.get("error") {
      return Err(error_from_body(response.status, error, "get"));
    }

    Ok(data)
  }

  /// Run a FetchXML query against a table. Use
  /// [`odata::FetchXmlBuilder`] to construct the document.
  pub async fn fetch_xml(&self, table: &str, fetch_xml: &str) -> Result<QueryResult> {
    let encoded: String = url::form_urlencoded::byte_serialize(fetch_xml.as_bytes()).collect();
    let url = format!("{}{}?fetchXml={}", self.inner.api_url, table, encoded);
    let mut headers = BTreeMap::new();
    self.apply_default_headers(Method::Get, &mut headers);
    self.fetch(url, headers, false).await
  }

  /// Download the `$metadata` document, an XML representation of the
  /// relational aspects of the data.
  pub async fn fetch_metadata(&self) -> Result<String> {
    let url = format!("{}$metadata", self.inner.api_url);
    let mut headers = BTreeMap::new();
    headers.insert("Accept".to_string(), "application/xml".to_string());

    let response = self.send(Method::Get, url, headers, None).await?;
    if !response.is_success() {
      return Err(DataverseError::from_status(response.status, response.text(), "get"));
    }
    Ok(response.text())
  }
}

/// Parse a response body as JSON, mapping unparseable failure responses to
/// their status error.
fn parse_body(response: &TransportResponse, method: &'static str) -> Result<Value> {
  match response.json() {
    Ok(data) => Ok(data),
    Err(_) if !response.is_success() => Err(DataverseError::from_status(response.status, response.text(), method)),
    Err(error) => Err(error),
  }
}

fn error_message(error: &Value) -> String {
  error
    .get("message")
    .and_then(Value::as_str)
    .unwrap_or("unknown error")
    .to_string()
}

fn error_from_body(status: u16, error: &Value, method: &'static str) -> DataverseError {
  DataverseError::from_status(status, error_message(error), method)
}

/// Unwrap the `value` list of a response. Single-entity responses yield
/// one row.
fn into_rows(data: Value) -> Vec<Value> {
  match data {
    Value::Object(mut map) if map.contains_key("value") => match map.remove("value") {
      Some(Value::Array(items)) => items,
      Some(other) => vec![other],
      None => Vec::new(),
    },
    other => vec![other],
  }
}
