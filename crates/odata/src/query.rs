//! Query option compilation for Web API requests.
//!
//! [`QueryOptions`] collects the `$`-options of a query and compiles them
//! into a query string; [`ResourcePath`] composes the resource part of the
//! url (table, row, navigation, action).

use std::collections::BTreeMap;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum QueryError {
  #[error("select list cannot be empty")]
  EmptySelect,
  #[error("filter list cannot be empty")]
  EmptyFilter,
  #[error("orderby list cannot be empty")]
  EmptyOrderby,
  #[error("expand can hold at most {max} statements, got {got}")]
  TooManyExpands { max: usize, got: usize },
}

/// Each request can include a maximum of 10 expand statements, nested or not.
const MAX_EXPANDS: usize = 10;

/// Sort direction for `$orderby`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
  Asc,
  Desc,
}

impl Order {
  fn as_str(&self) -> &'static str {
    match self {
      Order::Asc => "asc",
      Order::Desc => "desc",
    }
  }
}

/// A `$filter` statement. `All` joins the conditions with ` and `,
/// `Any` joins them with ` or `.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
  All(Vec<String>),
  Any(Vec<String>),
}

impl Filter {
  pub(crate) fn compile(&self) -> Result<String, QueryError> {
    let (items, joiner) = match self {
      Filter::All(items) => (items, " and "),
      Filter::Any(items) => (items, " or "),
    };
    if items.is_empty() {
      return Err(QueryError::EmptyFilter);
    }
    Ok(items.iter().map(|i| i.trim()).collect::<Vec<_>>().join(joiner))
  }
}

/// Options applied inside an `$expand` statement.
///
/// Nested expand statements can only be applied to many-to-one, single
/// valued relationships (Web API v9.1), and the total number of expands
/// per request is limited to 10.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpandOptions {
  pub select: Vec<String>,
  pub filter: Option<Filter>,
  pub orderby: Vec<(String, Order)>,
  pub top: Option<u32>,
  pub expand: Vec<(String, Option<ExpandOptions>)>,
}

impl ExpandOptions {
  fn compile(&self) -> Result<String, QueryError> {
    let mut parts: Vec<String> = Vec::new();
    if !self.select.is_empty() {
      parts.push(format!("$select={}", self.select.join(",")));
    }
    if let Some(filter) = &self.filter {
      parts.push(format!("$filter={}", filter.compile()?));
    }
    if !self.orderby.is_empty() {
      parts.push(format!("$orderby={}", compile_orderby(&self.orderby)));
    }
    if let Some(top) = self.top {
      parts.push(format!("$top={top}"));
    }
    if !self.expand.is_empty() {
      parts.push(compile_expand(&self.expand)?);
    }
    Ok(parts.join(";"))
  }

  fn count_expands(&self) -> usize {
    self
      .expand
      .iter()
      .map(|(_, options)| 1 + options.as_ref().map(ExpandOptions::count_expands).unwrap_or(0))
      .sum()
  }
}

fn compile_orderby(items: &[(String, Order)]) -> String {
  items
    .iter()
    .map(|(column, order)| format!("{column} {}", order.as_str()))
    .collect::<Vec<_>>()
    .join(",")
}

fn compile_expand(items: &[(String, Option<ExpandOptions>)]) -> Result<String, QueryError> {
  let compiled: Result<Vec<String>, QueryError> = items
    .iter()
    .map(|(name, options)| match options {
      Some(options) if *options != ExpandOptions::default() => Ok(format!("{name}({})", options.compile()?)),
      _ => Ok(name.clone()),
    })
    .collect();
  Ok(format!("$expand={}", compiled?.join(",")))
}

/// The `$`-options of a single query.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
  select: Vec<String>,
  filter: Option<Filter>,
  expand: Vec<(String, Option<ExpandOptions>)>,
  apply: Option<String>,
  top: Option<u32>,
  count: bool,
  orderby: Vec<(String, Order)>,
}

impl QueryOptions {
  pub fn new() -> Self {
    Self::default()
  }

  /// Limit the properties returned from the current entity.
  pub fn select<S: Into<String>>(mut self, items: impl IntoIterator<Item = S>) -> Self {
    self.select = items.into_iter().map(Into::into).collect();
    self
  }

  /// Set the criteria for which entities will be returned.
  pub fn filter(mut self, filter: Filter) -> Self {
    self.filter = Some(filter);
    self
  }

  /// Control what data from related entities is returned.
  pub fn expand(mut self, name: impl Into<String>, options: Option<ExpandOptions>) -> Self {
    self.expand.push((name.into(), options));
    self
  }

  /// Aggregate and group results. Use [`crate::apply`] to construct this.
  pub fn apply(mut self, statement: impl Into<String>) -> Self {
    self.apply = Some(statement.into());
    self
  }

  /// Limit the number of results returned. Should not be used with `count`.
  pub fn top(mut self, number: u32) -> Self {
    self.top = Some(number);
    self
  }

  /// Include the count of entities matching the filter criteria in the
  /// results. Should not be used with `top`.
  pub fn count(mut self, value: bool) -> Self {
    self.count = value;
    self
  }

  /// Specify the order in which items are returned.
  pub fn orderby(mut self, column: impl Into<String>, order: Order) -> Self {
    self.orderby.push((column.into(), order));
    self
  }

  pub fn is_empty(&self) -> bool {
    self.select.is_empty()
      && self.filter.is_none()
      && self.expand.is_empty()
      && self.apply.is_none()
      && self.top.is_none()
      && !self.count
      && self.orderby.is_empty()
  }

  /// Compile the options into a query string, leaving out empty ones.
  /// Returns an empty string when no options are set.
  pub fn compile(&self) -> Result<String, QueryError> {
    let total_expands: usize = self
      .expand
      .iter()
      .map(|(_, options)| 1 + options.as_ref().map(ExpandOptions::count_expands).unwrap_or(0))
      .sum();
    if total_expands > MAX_EXPANDS {
      return Err(QueryError::TooManyExpands {
        max: MAX_EXPANDS,
        got: total_expands,
      });
    }

    let mut statements: Vec<String> = Vec::new();
    if !self.expand.is_empty() {
      statements.push(compile_expand(&self.expand)?);
    }
    if !self.select.is_empty() {
      if self.select.iter().all(|item| item.is_empty()) {
        return Err(QueryError::EmptySelect);
      }
      statements.push(format!("$select={}", self.select.join(",")));
    }
    if let Some(filter) = &self.filter {
      statements.push(format!("$filter={}", filter.compile()?));
    }
    if let Some(apply) = &self.apply {
      statements.push(format!("$apply={apply}"));
    }
    if let Some(top) = self.top {
      statements.push(format!("$top={top}"));
    }
    if self.count {
      statements.push("$count=true".to_string());
    }
    if !self.orderby.is_empty() {
      if self.orderby.iter().all(|(column, _)| column.is_empty()) {
        return Err(QueryError::EmptyOrderby);
      }
      statements.push(format!("$orderby={}", compile_orderby(&self.orderby)));
    }

    if statements.is_empty() {
      Ok(String::new())
    } else {
      Ok(format!("?{}", statements.join("&")))
    }
  }
}

/// The resource part of a Web API url.
#[derive(Debug, Clone, Default)]
pub struct ResourcePath {
  /// Table to search in. Empty table with no other parts lists the tables
  /// in the database.
  pub table: String,
  /// Search only from the row with this id. Alternate keys
  /// (`foo=bar` or `foo=bar,fizz=buzz`) pass through verbatim.
  pub row_id: Option<String>,
  /// Navigate to a linked table before applying any query options.
  pub pre_expand: Option<String>,
  /// Web API action appended to the resource.
  pub action: Option<String>,
  /// Add a reference for this navigation property. Query options are not
  /// added to the query when this is set.
  pub add_ref_to_property: Option<String>,
}

impl ResourcePath {
  pub fn table(name: impl Into<String>) -> Self {
    Self {
      table: name.into(),
      ..Default::default()
    }
  }

  /// Whether query options may be appended to this path.
  pub fn query_options_allowed(&self) -> bool {
    self.add_ref_to_property.is_none()
  }

  /// Render the path relative to the api root.
  pub fn render(&self) -> String {
    let mut path = self.table.clone();

    if let Some(row_id) = &self.row_id {
      path.push_str(&format!("({row_id})"));
    }
    if let Some(pre_expand) = &self.pre_expand {
      path.push_str(&format!("/{pre_expand}"));
    }
    if let Some(action) = &self.action {
      // Unbound actions are rooted at the api root
      if path.is_empty() {
        path.push_str(action);
      } else {
        path.push_str(&format!("/{action}"));
      }
    }
    if let Some(property) = &self.add_ref_to_property
      && self.pre_expand.is_none()
      && self.action.is_none()
    {
      path.push_str(&format!("/{property}/$ref"));
    }

    path
  }
}

/// Render a `@odata.bind` reference map for linking rows on create.
pub fn bind_references(references: &BTreeMap<String, (String, String)>) -> serde_json::Map<String, serde_json::Value> {
  references
    .iter()
    .map(|(property, (table, row_id))| {
      (
        format!("{property}@odata.bind"),
        serde_json::Value::String(format!("/{table}({row_id})")),
      )
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  #[test]
  fn test_path_table() {
    assert_eq!(ResourcePath::table("table").render(), "table");
  }

  #[test]
  fn test_path_row_id() {
    let path = ResourcePath {
      table: "table".to_string(),
      row_id: Some("row_id".to_string()),
      ..Default::default()
    };
    assert_eq!(path.render(), "table(row_id)");
  }

  #[test]
  fn test_path_add_ref_to_property() {
    let path = ResourcePath {
      table: "table".to_string(),
      row_id: Some("row_id".to_string()),
      add_ref_to_property: Some("property".to_string()),
      ..Default::default()
    };
    assert_eq!(path.render(), "table(row_id)/property/$ref");
    assert!(!path.query_options_allowed());
  }

  #[test]
  fn test_path_pre_expand() {
    let path = ResourcePath {
      table: "table".to_string(),
      pre_expand: Some("foo".to_string()),
      ..Default::default()
    };
    assert_eq!(path.render(), "table/foo");
  }

  #[test]
  fn test_path_action() {
    let path = ResourcePath {
      table: "table".to_string(),
      action: Some("foo".to_string()),
      ..Default::default()
    };
    assert_eq!(path.render(), "table/foo");

    // Unbound action
    let path = ResourcePath {
      action: Some("foo".to_string()),
      ..Default::default()
    };
    assert_eq!(path.render(), "foo");
  }

  #[test]
  fn test_path_action_suppresses_ref() {
    let path = ResourcePath {
      table: "table".to_string(),
      action: Some("foo".to_string()),
      add_ref_to_property: Some("property".to_string()),
      ..Default::default()
    };
    assert_eq!(path.render(), "table/foo");
  }

  #[test]
  fn test_options_empty() {
    assert_eq!(QueryOptions::new().compile().unwrap(), "");
    assert!(QueryOptions::new().is_empty());
  }

  #[test]
  fn test_options_select() {
    assert_eq!(QueryOptions::new().select(["foo"]).compile().unwrap(), "?$select=foo");
    assert_eq!(
      QueryOptions::new().select(["foo", "bar"]).compile().unwrap(),
      "?$select=foo,bar"
    );
  }

  #[test]
  fn test_options_filter_and() {
    let options = QueryOptions::new().filter(Filter::All(vec!["foo".to_string(), "bar".to_string()]));
    assert_eq!(options.compile().unwrap(), "?$filter=foo and bar");
  }

  #[test]
  fn test_options_filter_or() {
    let options = QueryOptions::new().filter(Filter::Any(vec!["foo".to_string(), "bar".to_string()]));
    assert_eq!(options.compile().unwrap(), "?$filter=foo or bar");
  }

  #[test]
  fn test_options_filter_empty() {
    let options = QueryOptions::new().filter(Filter::All(vec![]));
    assert_eq!(options.compile(), Err(QueryError::EmptyFilter));
  }

  #[test]
  fn test_options_expand_bare() {
    let options = QueryOptions::new().expand("foo", None);
    assert_eq!(options.compile().unwrap(), "?$expand=foo");
  }

  #[test]
  fn test_options_expand_with_select() {
    let options = QueryOptions::new().expand(
      "foo",
      Some(ExpandOptions {
        select: vec!["bar".to_string()],
        ..Default::default()
      }),
    );
    assert_eq!(options.compile().unwrap(), "?$expand=foo($select=bar)");
  }

  #[test]
  fn test_options_expand_with_select_and_filter() {
    let options = QueryOptions::new().expand(
      "foo",
      Some(ExpandOptions {
        select: vec!["bar".to_string(), "baz".to_string()],
        filter: Some(Filter::All(vec!["fizz".to_string(), "buzz".to_string()])),
        ..Default::default()
      }),
    );
    assert_eq!(
      options.compile().unwrap(),
      "?$expand=foo($select=bar,baz;$filter=fizz and buzz)"
    );
  }

  #[test]
  fn test_options_expand_with_all_options() {
    let options = QueryOptions::new().expand(
      "foo",
      Some(ExpandOptions {
        select: vec!["bar".to_string(), "baz".to_string()],
        filter: Some(Filter::All(vec!["fizz".to_string(), "buzz".to_string()])),
        orderby: vec![("one".to_string(), Order::Asc)],
        top: Some(10),
        expand: vec![(
          "foobar".to_string(),
          Some(ExpandOptions {
            select: vec!["barbaz".to_string()],
            ..Default::default()
          }),
        )],
      }),
    );
    assert_eq!(
      options.compile().unwrap(),
      "?$expand=foo($select=bar,baz;$filter=fizz and buzz;$orderby=one asc;$top=10;$expand=foobar($select=barbaz))"
    );
  }

  #[test]
  fn test_options_expand_limit() {
    let mut options = QueryOptions::new();
    for i in 0..11 {
      options = options.expand(format!("e{i}"), None);
    }
    assert_eq!(options.compile(), Err(QueryError::TooManyExpands { max: 10, got: 11 }));
  }

  #[test]
  fn test_options_apply() {
    assert_eq!(QueryOptions::new().apply("foo").compile().unwrap(), "?$apply=foo");
  }

  #[test]
  fn test_options_top() {
    assert_eq!(QueryOptions::new().top(1).compile().unwrap(), "?$top=1");
  }

  #[test]
  fn test_options_orderby() {
    assert_eq!(
      QueryOptions::new().orderby("foo", Order::Asc).compile().unwrap(),
      "?$orderby=foo asc"
    );
    assert_eq!(
      QueryOptions::new()
        .orderby("foo", Order::Asc)
        .orderby("bar", Order::Desc)
        .compile()
        .unwrap(),
      "?$orderby=foo asc,bar desc"
    );
  }

  #[test]
  fn test_options_count() {
    assert_eq!(QueryOptions::new().count(true).compile().unwrap(), "?$count=true");
    assert_eq!(QueryOptions::new().count(false).compile().unwrap(), "");
  }

  #[test]
  fn test_options_compile_order() {
    let options = QueryOptions::new()
      .orderby("foo", Order::Asc)
      .count(true)
      .top(3)
      .filter(Filter::All(vec!["bar".to_string()]))
      .select(["baz"])
      .expand("fizz", None);
    assert_eq!(
      options.compile().unwrap(),
      "?$expand=fizz&$select=baz&$filter=bar&$top=3&$count=true&$orderby=foo asc"
    );
  }

  #[test]
  fn test_bind_references() {
    let mut refs = BTreeMap::new();
    refs.insert(
      "customer".to_string(),
      ("contacts".to_string(), "row_id".to_string()),
    );
    let map = bind_references(&refs);
    assert_eq!(
      map.get("customer@odata.bind").unwrap(),
      &serde_json::Value::String("/contacts(row_id)".to_string())
    );
  }
}
