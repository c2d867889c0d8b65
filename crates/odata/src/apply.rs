//! Convenience functions for creating `$apply` parameters.
//!
//! Aggregate and grouping results:
//! https://docs.microsoft.com/en-us/powerapps/developer/data-platform/webapi/query-data-web-api#aggregate-and-grouping-results

use crate::query::{Filter, QueryError};

/// Aggregation function usable in an `aggregate(...)` statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateWith {
  Average,
  Sum,
  Min,
  Max,
  Count,
}

impl AggregateWith {
  fn as_str(&self) -> &'static str {
    match self {
      AggregateWith::Average => "average",
      AggregateWith::Sum => "sum",
      AggregateWith::Min => "min",
      AggregateWith::Max => "max",
      AggregateWith::Count => "count",
    }
  }
}

/// Group results by columns, optionally aggregating the groups.
///
/// Use [`aggregate`] to construct the aggregation statement.
pub fn groupby<S: AsRef<str>>(columns: impl IntoIterator<Item = S>, aggregate: Option<&str>) -> String {
  let columns: Vec<String> = columns.into_iter().map(|c| c.as_ref().to_string()).collect();
  let aggregate = aggregate.map(|a| format!(",{a}")).unwrap_or_default();
  format!("groupby(({}){aggregate})", columns.join(","))
}

/// Aggregate a column with some aggregation function, and alias the result
/// under some name.
pub fn aggregate(column: &str, with: AggregateWith, alias: &str) -> String {
  format!("aggregate({column} with {} as {alias})", with.as_str())
}

/// Group filtered values by columns.
///
/// Use [`crate::filter`] to construct the filter conditions.
pub fn filter<S: AsRef<str>>(by: Filter, group_by_columns: impl IntoIterator<Item = S>) -> Result<String, QueryError> {
  Ok(format!("filter({})/{}", by.compile()?, groupby(group_by_columns, None)))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_groupby() {
    assert_eq!(groupby(["foo"], None), "groupby((foo))");
    assert_eq!(groupby(["foo", "bar"], None), "groupby((foo,bar))");
  }

  #[test]
  fn test_aggregate() {
    assert_eq!(
      aggregate("foo", AggregateWith::Sum, "bar"),
      "aggregate(foo with sum as bar)"
    );
    assert_eq!(
      aggregate("foo", AggregateWith::Average, "bar"),
      "aggregate(foo with average as bar)"
    );
  }

  #[test]
  fn test_groupby_with_aggregate() {
    let agg = aggregate("price", AggregateWith::Max, "highest");
    assert_eq!(
      groupby(["foo", "bar"], Some(&agg)),
      "groupby((foo,bar),aggregate(price with max as highest))"
    );
  }

  #[test]
  fn test_filter() {
    let result = filter(Filter::All(vec!["foo eq 1".to_string()]), ["bar"]).unwrap();
    assert_eq!(result, "filter(foo eq 1)/groupby((bar))");
  }

  #[test]
  fn test_filter_any() {
    let result = filter(
      Filter::Any(vec!["foo eq 1".to_string(), "foo eq 2".to_string()]),
      ["bar", "baz"],
    )
    .unwrap();
    assert_eq!(result, "filter(foo eq 1 or foo eq 2)/groupby((bar,baz))");
  }

  #[test]
  fn test_filter_empty_errors() {
    assert!(filter(Filter::All(vec![]), ["bar"]).is_err());
  }
}
