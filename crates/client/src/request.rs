//! Request builder for entity operations.
//!
//! An [`EntityRequest`] collects the resource path, query options, and
//! header overrides of one request, then executes it with one of the verb
//! methods. Build a fresh request for every call.

use crate::client::{Client, QueryResult};
use crate::error::{ErrorKind, Result};
use crate::transport::Method;
use odata::query::ExpandOptions;
use odata::{Filter, Order, QueryOptions, ResourcePath};
use serde_json::Value;
use std::collections::BTreeMap;

/// A single request against a table.
#[derive(Debug, Clone)]
pub struct EntityRequest {
  client: Client,
  path: ResourcePath,
  options: QueryOptions,
  headers: BTreeMap<String, String>,
  annotations: Option<bool>,
  not_found_ok: bool,
  simplify_errors: bool,
  raise_separately: Vec<ErrorKind>,
}

impl EntityRequest {
  pub(crate) fn new(client: Client, table: String) -> Self {
    Self {
      client,
      path: ResourcePath::table(table),
      options: QueryOptions::new(),
      headers: BTreeMap::new(),
      annotations: None,
      not_found_ok: false,
      simplify_errors: false,
      raise_separately: Vec::new(),
    }
  }

  // Resource path

  /// Target only the row with this id. Required for PATCH and DELETE.
  /// Alternate keys (`foo=bar` or `foo=bar,fizz=buzz`) pass through as is.
  pub fn row_id(mut self, row_id: impl Into<String>) -> Self {
    self.path.row_id = Some(row_id.into());
    self
  }

  /// Navigate to a linked table before taking any query options into
  /// account. Saves an expand statement when everything needed lives under
  /// the linked table.
  pub fn pre_expand(mut self, navigation: impl Into<String>) -> Self {
    self.path.pre_expand = Some(navigation.into());
    self
  }

  /// Append a raw Web API action to the resource. Prefer
  /// [`Client::execute_action`] with [`crate::actions`] payloads.
  pub fn action(mut self, action: impl Into<String>) -> Self {
    self.path.action = Some(action.into());
    self
  }

  /// Add a reference to this navigation property. POST data should then
  /// contain the api url of the row to link:
  /// `{"@odata.id": "<api url>/<table>(<id>)"}`. Query options are not
  /// added to the query when this is set.
  pub fn add_ref_to_property(mut self, property: impl Into<String>) -> Self {
    self.path.add_ref_to_property = Some(property.into());
    self
  }

  // Query options

  /// Limit the properties returned from the entity.
  pub fn select<S: Into<String>>(mut self, items: impl IntoIterator<Item = S>) -> Self {
    self.options = self.options.select(items);
    self
  }

  /// Set the criteria for which entities will be returned.
  /// Use [`odata::filter`] to construct the conditions.
  pub fn filter(mut self, filter: Filter) -> Self {
    self.options = self.options.filter(filter);
    self
  }

  /// Control what data from related entities is returned.
  pub fn expand(mut self, name: impl Into<String>, options: Option<ExpandOptions>) -> Self {
    self.options = self.options.expand(name, options);
    self
  }

  /// Aggregate and group results. Use [`odata::apply`] to construct this.
  pub fn apply(mut self, statement: impl Into<String>) -> Self {
    self.options = self.options.apply(statement);
    self
  }

  /// Limit the number of results returned. Should not be used with `count`.
  pub fn top(mut self, number: u32) -> Self {
    self.options = self.options.top(number);
    self
  }

  /// Include the total count of matching entities in the result.
  /// Should not be used with `top`.
  pub fn count(mut self) -> Self {
    self.options = self.options.count(true);
    self
  }

  /// Specify the order in which items are returned.
  pub fn orderby(mut self, column: impl Into<String>, order: Order) -> Self {
    self.options = self.options.orderby(column, order);
    self
  }

  // Request behavior

  /// Set a header for this request. Caller-set headers win over the
  /// operation defaults.
  pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.headers.insert(key.into(), value.into());
    self
  }

  /// Override the client's annotation preference for this request.
  pub fn annotations(mut self, value: bool) -> Self {
    self.annotations = Some(value);
    self
  }

  /// An empty result should not raise an error, but return no rows instead.
  pub fn not_found_ok(mut self) -> Self {
    self.not_found_ok = true;
    self
  }

  /// Collapse any error from this request into the generic variant with a
  /// fixed message. Useful for hiding error details from frontend users.
  pub fn simplify_errors(mut self, value: bool) -> Self {
    self.simplify_errors = value;
    self
  }

  /// Error kinds excluded from simplification, when separate handling is
  /// needed.
  pub fn raise_separately(mut self, kinds: impl IntoIterator<Item = ErrorKind>) -> Self {
    self.raise_separately = kinds.into_iter().collect();
    self
  }

  /// The full url this request resolves to.
  pub fn url(&self) -> Result<String> {
    let mut url = format!("{}{}", self.client.api_url(), self.path.render());
    if self.path.query_options_allowed() {
      url.push_str(&self.options.compile()?);
    }
    Ok(url)
  }

  fn headers_for(&self, method: Method) -> BTreeMap<String, String> {
    let mut headers = self.headers.clone();
    let annotations = self.annotations.unwrap_or_else(|| self.client.annotations_default());
    if annotations {
      headers
        .entry("Prefer".to_string())
        .or_insert_with(|| r#"odata.include-annotations="*""#.to_string());
    }
    self.client.apply_default_headers(method, &mut headers);
    headers
  }

  // Verbs

  /// Make a GET request with the currently added query options.
  pub async fn get(self) -> Result<QueryResult> {
    let simplify = self.simplify_errors;
    let keep = self.raise_separately.clone();
    let result = async {
      let url = self.url()?;
      let headers = self.headers_for(Method::Get);
      self.client.fetch(url, headers, self.not_found_ok).await
    }
    .await;
    result.map_err(|e| e.maybe_simplified(simplify, &keep))
  }

  /// Create a new row in the table. Use expand and select to reduce the
  /// returned data.
  pub async fn post(self, data: Value) -> Result<Value> {
    let simplify = self.simplify_errors;
    let keep = self.raise_separately.clone();
    let result = async {
      let url = self.url()?;
      let headers = self.headers_for(Method::Post);
      self.client.mutate(Method::Post, url, headers, data).await
    }
    .await;
    result.map_err(|e| e.maybe_simplified(simplify, &keep))
  }

  /// Update a row in the table. Requires `row_id`. Use expand and select to
  /// reduce the returned data.
  pub async fn patch(self, data: Value) -> Result<Value> {
    let simplify = self.simplify_errors;
    let keep = self.raise_separately.clone();
    let result = async {
      let url = self.url()?;
      let headers = self.headers_for(Method::Patch);
      self.client.mutate(Method::Patch, url, headers, data).await
    }
    .await;
    result.map_err(|e| e.maybe_simplified(simplify, &keep))
  }

  /// Delete a row in the table. Requires `row_id`.
  pub async fn delete(self) -> Result<()> {
    let simplify = self.simplify_errors;
    let keep = self.raise_separately.clone();
    let result = async {
      let url = self.url()?;
      let headers = self.headers_for(Method::Delete);
      self.client.remove(url, headers).await
    }
    .await;
    result.map_err(|e| e.maybe_simplified(simplify, &keep))
  }
}
