//! Convenience functions for creating `$filter` parameters.
//!
//! Standard operators reference:
//! https://docs.microsoft.com/en-us/powerapps/developer/data-platform/webapi/query-data-web-api#standard-filter-operators
//!
//! Special operators reference:
//! https://docs.microsoft.com/en-us/dynamics365/customer-engagement/web-api/queryfunctions
//!
//! Every function takes an optional `indicator` (a navigation prefix such as
//! a link alias, rendered as `alias/...`) and a `group` flag that wraps the
//! result in parentheses. All filter conditions for string values are case
//! insensitive on the server.

/// A literal value usable in filter expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
  Str(String),
  Int(i64),
  Float(f64),
  Bool(bool),
  Null,
}

impl FieldValue {
  /// Render as an OData literal: strings quoted (embedded quotes doubled),
  /// numbers and booleans bare, nulls as `null`.
  fn literal(&self) -> String {
    match self {
      FieldValue::Str(s) => format!("'{}'", s.replace('\'', "''")),
      FieldValue::Int(i) => i.to_string(),
      FieldValue::Float(f) => f.to_string(),
      FieldValue::Bool(b) => b.to_string(),
      FieldValue::Null => "null".to_string(),
    }
  }
}

impl From<&str> for FieldValue {
  fn from(v: &str) -> Self {
    FieldValue::Str(v.to_string())
  }
}

impl From<String> for FieldValue {
  fn from(v: String) -> Self {
    FieldValue::Str(v)
  }
}

impl From<i64> for FieldValue {
  fn from(v: i64) -> Self {
    FieldValue::Int(v)
  }
}

impl From<i32> for FieldValue {
  fn from(v: i32) -> Self {
    FieldValue::Int(v as i64)
  }
}

impl From<u32> for FieldValue {
  fn from(v: u32) -> Self {
    FieldValue::Int(v as i64)
  }
}

impl From<f64> for FieldValue {
  fn from(v: f64) -> Self {
    FieldValue::Float(v)
  }
}

impl From<bool> for FieldValue {
  fn from(v: bool) -> Self {
    FieldValue::Bool(v)
  }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
  fn from(v: Option<T>) -> Self {
    v.map(Into::into).unwrap_or(FieldValue::Null)
  }
}

fn grouped(result: String, group: bool) -> String {
  if group { format!("({result})") } else { result }
}

fn prefixed(indicator: Option<&str>, target: &str) -> String {
  match indicator {
    Some(ind) => format!("{ind}/{target}"),
    None => target.to_string(),
  }
}

fn listify<V: Into<FieldValue>>(values: impl IntoIterator<Item = V>) -> String {
  let items: Vec<String> = values.into_iter().map(|v| v.into().literal()).collect();
  format!("[{}]", items.join(","))
}

fn comp(column: &str, value: FieldValue, op: &str, indicator: Option<&str>, group: bool) -> String {
  let result = format!("{} {op} {}", prefixed(indicator, column), value.literal());
  grouped(result, group)
}

fn query_fn(column: &str, value: FieldValue, op: &str, indicator: Option<&str>, group: bool) -> String {
  let result = format!("{op}({},{})", prefixed(indicator, column), value.literal());
  grouped(result, group)
}

fn special_name_only(column: &str, op: &str, indicator: Option<&str>, group: bool) -> String {
  let result = prefixed(indicator, &format!("Microsoft.Dynamics.CRM.{op}(PropertyName='{column}')"));
  grouped(result, group)
}

fn special_single(column: &str, value: FieldValue, op: &str, indicator: Option<&str>, group: bool) -> String {
  let result = prefixed(
    indicator,
    &format!(
      "Microsoft.Dynamics.CRM.{op}(PropertyName='{column}',PropertyValue={})",
      value.literal()
    ),
  );
  grouped(result, group)
}

fn special_two(
  column: &str,
  value1: FieldValue,
  value2: FieldValue,
  op: &str,
  indicator: Option<&str>,
  group: bool,
) -> String {
  let result = prefixed(
    indicator,
    &format!(
      "Microsoft.Dynamics.CRM.{op}(PropertyName='{column}',PropertyValue1={},PropertyValue2={})",
      value1.literal(),
      value2.literal()
    ),
  );
  grouped(result, group)
}

fn special_many<V: Into<FieldValue>>(
  column: &str,
  values: impl IntoIterator<Item = V>,
  op: &str,
  indicator: Option<&str>,
  group: bool,
) -> String {
  let result = prefixed(
    indicator,
    &format!(
      "Microsoft.Dynamics.CRM.{op}(PropertyName='{column}',PropertyValues={})",
      listify(values)
    ),
  );
  grouped(result, group)
}

// Comparison operations

/// Evaluate whether the value in the given column is equal to value.
pub fn eq(column: &str, value: impl Into<FieldValue>, indicator: Option<&str>, group: bool) -> String {
  comp(column, value.into(), "eq", indicator, group)
}

/// Evaluate whether the value in the given column is not equal to value.
pub fn ne(column: &str, value: impl Into<FieldValue>, indicator: Option<&str>, group: bool) -> String {
  comp(column, value.into(), "ne", indicator, group)
}

/// Evaluate whether the value in the given column is greater than value.
pub fn gt(column: &str, value: impl Into<FieldValue>, indicator: Option<&str>, group: bool) -> String {
  comp(column, value.into(), "gt", indicator, group)
}

/// Evaluate whether the value in the given column is greater than or equal to value.
pub fn ge(column: &str, value: impl Into<FieldValue>, indicator: Option<&str>, group: bool) -> String {
  comp(column, value.into(), "ge", indicator, group)
}

/// Evaluate whether the value in the given column is less than value.
pub fn lt(column: &str, value: impl Into<FieldValue>, indicator: Option<&str>, group: bool) -> String {
  comp(column, value.into(), "lt", indicator, group)
}

/// Evaluate whether the value in the given column is less than or equal to value.
pub fn le(column: &str, value: impl Into<FieldValue>, indicator: Option<&str>, group: bool) -> String {
  comp(column, value.into(), "le", indicator, group)
}

// Logical operations

/// Evaluate whether op1 AND op2 are valid.
pub fn and_(op1: &str, op2: &str, group: bool) -> String {
  grouped(format!("{op1} and {op2}"), group)
}

/// Evaluate whether op1 OR op2 is valid.
pub fn or_(op1: &str, op2: &str, group: bool) -> String {
  grouped(format!("{op1} or {op2}"), group)
}

/// Invert the evaluation of an operation. Only works on standard operators!
pub fn not_(operation: &str, group: bool) -> String {
  grouped(format!("not {operation}"), group)
}

// Standard query functions

/// Evaluate whether the string value in the given column contains value.
pub fn contains(column: &str, value: impl Into<FieldValue>, indicator: Option<&str>, group: bool) -> String {
  query_fn(column, value.into(), "contains", indicator, group)
}

/// Evaluate whether the string value in the given column ends with value.
pub fn endswith(column: &str, value: impl Into<FieldValue>, indicator: Option<&str>, group: bool) -> String {
  query_fn(column, value.into(), "endswith", indicator, group)
}

/// Evaluate whether the string value in the given column starts with value.
pub fn startswith(column: &str, value: impl Into<FieldValue>, indicator: Option<&str>, group: bool) -> String {
  query_fn(column, value.into(), "startswith", indicator, group)
}

// Special query functions - value checks

/// Evaluate whether the value in the given column exists in a list of values.
pub fn in_<V: Into<FieldValue>>(
  column: &str,
  values: impl IntoIterator<Item = V>,
  indicator: Option<&str>,
  group: bool,
) -> String {
  special_many(column, values, "In", indicator, group)
}

/// Evaluate whether the value in the given column doesn't exist in a list of values.
pub fn not_in<V: Into<FieldValue>>(
  column: &str,
  values: impl IntoIterator<Item = V>,
  indicator: Option<&str>,
  group: bool,
) -> String {
  special_many(column, values, "NotIn", indicator, group)
}

/// Evaluate whether the value in the given column is between two values.
pub fn between<V: Into<FieldValue>>(column: &str, values: (V, V), indicator: Option<&str>, group: bool) -> String {
  special_many(column, [values.0.into(), values.1.into()], "Between", indicator, group)
}

/// Evaluate whether the value in the given column is not between two values.
pub fn not_between<V: Into<FieldValue>>(column: &str, values: (V, V), indicator: Option<&str>, group: bool) -> String {
  special_many(column, [values.0.into(), values.1.into()], "NotBetween", indicator, group)
}

/// Evaluate whether the value in the given column contains the listed values.
pub fn contain_values<V: Into<FieldValue>>(
  column: &str,
  values: impl IntoIterator<Item = V>,
  indicator: Option<&str>,
  group: bool,
) -> String {
  special_many(column, values, "ContainValues", indicator, group)
}

/// Evaluate whether the value in the given column doesn't contain the listed values.
pub fn not_contain_values<V: Into<FieldValue>>(
  column: &str,
  values: impl IntoIterator<Item = V>,
  indicator: Option<&str>,
  group: bool,
) -> String {
  special_many(column, values, "DoesNotContainValues", indicator, group)
}

// Special query functions - hierarchy checks

/// Evaluates whether the value in the given column is above ref in the hierarchy.
pub fn above(column: &str, ref_: impl Into<FieldValue>, indicator: Option<&str>, group: bool) -> String {
  special_single(column, ref_.into(), "Above", indicator, group)
}

/// Evaluates whether the value in the given column is above or equal to ref in the hierarchy.
pub fn above_or_equal(column: &str, ref_: impl Into<FieldValue>, indicator: Option<&str>, group: bool) -> String {
  special_single(column, ref_.into(), "AboveOrEqual", indicator, group)
}

/// Evaluates whether the value in the given column is below ref in the hierarchy.
pub fn under(column: &str, ref_: impl Into<FieldValue>, indicator: Option<&str>, group: bool) -> String {
  special_single(column, ref_.into(), "Under", indicator, group)
}

/// Evaluates whether the value in the given column is under or equal to ref in the hierarchy.
pub fn under_or_equal(column: &str, ref_: impl Into<FieldValue>, indicator: Option<&str>, group: bool) -> String {
  special_single(column, ref_.into(), "UnderOrEqual", indicator, group)
}

/// Evaluates whether the value in the given column is not below ref in the hierarchy.
pub fn not_under(column: &str, ref_: impl Into<FieldValue>, indicator: Option<&str>, group: bool) -> String {
  special_single(column, ref_.into(), "NotUnder", indicator, group)
}

// Special query functions - dates

/// Evaluates whether the value in the given column equals today's date.
pub fn today(column: &str, indicator: Option<&str>, group: bool) -> String {
  special_name_only(column, "Today", indicator, group)
}

/// Evaluates whether the value in the given column equals tomorrow's date.
pub fn tomorrow(column: &str, indicator: Option<&str>, group: bool) -> String {
  special_name_only(column, "Tomorrow", indicator, group)
}

/// Evaluates whether the value in the given column equals yesterday's date.
pub fn yesterday(column: &str, indicator: Option<&str>, group: bool) -> String {
  special_name_only(column, "Yesterday", indicator, group)
}

/// Evaluates whether the value in the given column is on the specified date.
pub fn on(column: &str, date: impl Into<FieldValue>, indicator: Option<&str>, group: bool) -> String {
  special_single(column, date.into(), "On", indicator, group)
}

/// Evaluates whether the value in the given column is on or after the specified date.
pub fn on_or_after(column: &str, date: impl Into<FieldValue>, indicator: Option<&str>, group: bool) -> String {
  special_single(column, date.into(), "OnOrAfter", indicator, group)
}

/// Evaluates whether the value in the given column is on or before the specified date.
pub fn on_or_before(column: &str, date: impl Into<FieldValue>, indicator: Option<&str>, group: bool) -> String {
  special_single(column, date.into(), "OnOrBefore", indicator, group)
}

// Special query functions - fiscal periods

/// Evaluates whether the value in the given column is within the specified fiscal period.
pub fn in_fiscal_period(column: &str, period: i64, indicator: Option<&str>, group: bool) -> String {
  special_single(column, FieldValue::Int(period), "InFiscalPeriod", indicator, group)
}

/// Evaluates whether the value in the given column is within the specified fiscal period and year.
pub fn in_fiscal_period_and_year(column: &str, period: i64, year: i64, indicator: Option<&str>, group: bool) -> String {
  special_two(
    column,
    FieldValue::Int(period),
    FieldValue::Int(year),
    "InFiscalPeriodAndYear",
    indicator,
    group,
  )
}

/// Evaluates whether the value in the given column is within the specified fiscal year.
pub fn in_fiscal_year(column: &str, year: i64, indicator: Option<&str>, group: bool) -> String {
  special_single(column, FieldValue::Int(year), "InFiscalYear", indicator, group)
}

/// Evaluates whether the value in the given column is within or after the specified fiscal period and year.
pub fn in_or_after_fiscal_period_and_year(
  column: &str,
  period: i64,
  year: i64,
  indicator: Option<&str>,
  group: bool,
) -> String {
  special_two(
    column,
    FieldValue::Int(period),
    FieldValue::Int(year),
    "InOrAfterFiscalPeriodAndYear",
    indicator,
    group,
  )
}

/// Evaluates whether the value in the given column is within or before the specified fiscal period and year.
pub fn in_or_before_fiscal_period_and_year(
  column: &str,
  period: i64,
  year: i64,
  indicator: Option<&str>,
  group: bool,
) -> String {
  special_two(
    column,
    FieldValue::Int(period),
    FieldValue::Int(year),
    "InOrBeforeFiscalPeriodAndYear",
    indicator,
    group,
  )
}

/// Evaluates whether the value in the given column is within the current fiscal period.
pub fn this_fiscal_period(column: &str, indicator: Option<&str>, group: bool) -> String {
  special_name_only(column, "ThisFiscalPeriod", indicator, group)
}

/// Evaluates whether the value in the given column is within the current fiscal year.
pub fn this_fiscal_year(column: &str, indicator: Option<&str>, group: bool) -> String {
  special_name_only(column, "ThisFiscalYear", indicator, group)
}

/// Evaluates whether the value in the given column is within the last fiscal period.
pub fn last_fiscal_period(column: &str, indicator: Option<&str>, group: bool) -> String {
  special_name_only(column, "LastFiscalPeriod", indicator, group)
}

/// Evaluates whether the value in the given column is within the last fiscal year.
pub fn last_fiscal_year(column: &str, indicator: Option<&str>, group: bool) -> String {
  special_name_only(column, "LastFiscalYear", indicator, group)
}

/// Evaluates whether the value in the given column is in the next fiscal period.
pub fn next_fiscal_period(column: &str, indicator: Option<&str>, group: bool) -> String {
  special_name_only(column, "NextFiscalPeriod", indicator, group)
}

/// Evaluates whether the value in the given column is in the next fiscal year.
pub fn next_fiscal_year(column: &str, indicator: Option<&str>, group: bool) -> String {
  special_name_only(column, "NextFiscalYear", indicator, group)
}

// Special query functions - calendar periods

/// Evaluates whether the value in the given column is within the current month.
pub fn this_month(column: &str, indicator: Option<&str>, group: bool) -> String {
  special_name_only(column, "ThisMonth", indicator, group)
}

/// Evaluates whether the value in the given column is within the current week.
pub fn this_week(column: &str, indicator: Option<&str>, group: bool) -> String {
  special_name_only(column, "ThisWeek", indicator, group)
}

/// Evaluates whether the value in the given column is within the current year.
pub fn this_year(column: &str, indicator: Option<&str>, group: bool) -> String {
  special_name_only(column, "ThisYear", indicator, group)
}

/// Evaluates whether the value in the given column is within the last seven days including today.
pub fn last_7_days(column: &str, indicator: Option<&str>, group: bool) -> String {
  special_name_only(column, "Last7Days", indicator, group)
}

/// Evaluates whether the value in the given column is within the last month.
pub fn last_month(column: &str, indicator: Option<&str>, group: bool) -> String {
  special_name_only(column, "LastMonth", indicator, group)
}

/// Evaluates whether the value in the given column is within the last week.
pub fn last_week(column: &str, indicator: Option<&str>, group: bool) -> String {
  special_name_only(column, "LastWeek", indicator, group)
}

/// Evaluates whether the value in the given column is within the last year.
pub fn last_year(column: &str, indicator: Option<&str>, group: bool) -> String {
  special_name_only(column, "LastYear", indicator, group)
}

/// Evaluates whether the value in the given column is in the next month.
pub fn next_month(column: &str, indicator: Option<&str>, group: bool) -> String {
  special_name_only(column, "NextMonth", indicator, group)
}

/// Evaluates whether the value in the given column is in the next week.
pub fn next_week(column: &str, indicator: Option<&str>, group: bool) -> String {
  special_name_only(column, "NextWeek", indicator, group)
}

/// Evaluates whether the value in the given column is within the next year.
pub fn next_year(column: &str, indicator: Option<&str>, group: bool) -> String {
  special_name_only(column, "NextYear", indicator, group)
}

// Special query functions - last x

/// Evaluates whether the value in the given column is within the last X days.
pub fn last_x_days(column: &str, x: i64, indicator: Option<&str>, group: bool) -> String {
  special_single(column, FieldValue::Int(x), "LastXDays", indicator, group)
}

/// Evaluates whether the value in the given column is within the last X fiscal periods.
pub fn last_x_fiscal_periods(column: &str, x: i64, indicator: Option<&str>, group: bool) -> String {
  special_single(column, FieldValue::Int(x), "LastXFiscalPeriods", indicator, group)
}

/// Evaluates whether the value in the given column is within the last X fiscal years.
pub fn last_x_fiscal_years(column: &str, x: i64, indicator: Option<&str>, group: bool) -> String {
  special_single(column, FieldValue::Int(x), "LastXFiscalYears", indicator, group)
}

/// Evaluates whether the value in the given column is within the last X hours.
pub fn last_x_hours(column: &str, x: i64, indicator: Option<&str>, group: bool) -> String {
  special_single(column, FieldValue::Int(x), "LastXHours", indicator, group)
}

/// Evaluates whether the value in the given column is within the last X months.
pub fn last_x_months(column: &str, x: i64, indicator: Option<&str>, group: bool) -> String {
  special_single(column, FieldValue::Int(x), "LastXMonths", indicator, group)
}

/// Evaluates whether the value in the given column is within the last X weeks.
pub fn last_x_weeks(column: &str, x: i64, indicator: Option<&str>, group: bool) -> String {
  special_single(column, FieldValue::Int(x), "LastXWeeks", indicator, group)
}

/// Evaluates whether the value in the given column is within the last X years.
pub fn last_x_years(column: &str, x: i64, indicator: Option<&str>, group: bool) -> String {
  special_single(column, FieldValue::Int(x), "LastXYears", indicator, group)
}

// Special query functions - next x

/// Evaluates whether the value in the given column is within the next X days.
pub fn next_x_days(column: &str, x: i64, indicator: Option<&str>, group: bool) -> String {
  special_single(column, FieldValue::Int(x), "NextXDays", indicator, group)
}

/// Evaluates whether the value in the given column is within the next X fiscal periods.
pub fn next_x_fiscal_periods(column: &str, x: i64, indicator: Option<&str>, group: bool) -> String {
  special_single(column, FieldValue::Int(x), "NextXFiscalPeriods", indicator, group)
}

/// Evaluates whether the value in the given column is within the next X fiscal years.
pub fn next_x_fiscal_years(column: &str, x: i64, indicator: Option<&str>, group: bool) -> String {
  special_single(column, FieldValue::Int(x), "NextXFiscalYears", indicator, group)
}

/// Evaluates whether the value in the given column is within the next X hours.
pub fn next_x_hours(column: &str, x: i64, indicator: Option<&str>, group: bool) -> String {
  special_single(column, FieldValue::Int(x), "NextXHours", indicator, group)
}

/// Evaluates whether the value in the given column is within the next X months.
pub fn next_x_months(column: &str, x: i64, indicator: Option<&str>, group: bool) -> String {
  special_single(column, FieldValue::Int(x), "NextXMonths", indicator, group)
}

/// Evaluates whether the value in the given column is within the next X weeks.
pub fn next_x_weeks(column: &str, x: i64, indicator: Option<&str>, group: bool) -> String {
  special_single(column, FieldValue::Int(x), "NextXWeeks", indicator, group)
}

/// Evaluates whether the value in the given column is within the next X years.
pub fn next_x_years(column: &str, x: i64, indicator: Option<&str>, group: bool) -> String {
  special_single(column, FieldValue::Int(x), "NextXYears", indicator, group)
}

// Special query functions - older than x

/// Evaluates whether the value in the given column is older than the specified amount of minutes.
pub fn older_than_x_minutes(column: &str, x: i64, indicator: Option<&str>, group: bool) -> String {
  special_single(column, FieldValue::Int(x), "OlderThanXMinutes", indicator, group)
}

/// Evaluates whether the value in the given column is older than the specified amount of hours.
pub fn older_than_x_hours(column: &str, x: i64, indicator: Option<&str>, group: bool) -> String {
  special_single(column, FieldValue::Int(x), "OlderThanXHours", indicator, group)
}

/// Evaluates whether the value in the given column is older than the specified amount of days.
pub fn older_than_x_days(column: &str, x: i64, indicator: Option<&str>, group: bool) -> String {
  special_single(column, FieldValue::Int(x), "OlderThanXDays", indicator, group)
}

/// Evaluates whether the value in the given column is older than the specified amount of weeks.
pub fn older_than_x_weeks(column: &str, x: i64, indicator: Option<&str>, group: bool) -> String {
  special_single(column, FieldValue::Int(x), "OlderThanXWeeks", indicator, group)
}

/// Evaluates whether the value in the given column is older than the specified amount of months.
pub fn older_than_x_months(column: &str, x: i64, indicator: Option<&str>, group: bool) -> String {
  special_single(column, FieldValue::Int(x), "OlderThanXMonths", indicator, group)
}

/// Evaluates whether the value in the given column is older than the specified amount of years.
pub fn older_than_x_years(column: &str, x: i64, indicator: Option<&str>, group: bool) -> String {
  special_single(column, FieldValue::Int(x), "OlderThanXYears", indicator, group)
}

// Special query functions - business and user id checks

/// Evaluates whether the value in the given column is equal to the specified business ID.
pub fn equal_business_id(column: &str, indicator: Option<&str>, group: bool) -> String {
  special_name_only(column, "EqualBusinessId", indicator, group)
}

/// Evaluates whether the value in the given column is not equal to the specified business ID.
pub fn not_business_id(column: &str, indicator: Option<&str>, group: bool) -> String {
  special_name_only(column, "NotBusinessId", indicator, group)
}

/// Evaluates whether the value in the given column is equal to the ID of the user.
pub fn equal_user_id(column: &str, indicator: Option<&str>, group: bool) -> String {
  special_name_only(column, "EqualUserId", indicator, group)
}

/// Evaluates whether the value in the given column is not equal to the ID of the user.
pub fn not_user_id(column: &str, indicator: Option<&str>, group: bool) -> String {
  special_name_only(column, "NotUserId", indicator, group)
}

/// Evaluates whether the value in the given column is equal to the language for the user.
pub fn equal_user_language(column: &str, indicator: Option<&str>, group: bool) -> String {
  special_name_only(column, "EqualUserLanguage", indicator, group)
}

/// Evaluates whether the value in the given column equals current user or their reporting hierarchy.
pub fn equal_user_or_user_hierarchy(column: &str, indicator: Option<&str>, group: bool) -> String {
  special_name_only(column, "EqualUserOrUserHierarchy", indicator, group)
}

/// Evaluates whether the value in the given column equals current user, or their reporting hierarchy and teams.
pub fn equal_user_or_user_hierarchy_and_teams(column: &str, indicator: Option<&str>, group: bool) -> String {
  special_name_only(column, "EqualUserOrUserHierarchyAndTeams", indicator, group)
}

/// Evaluates whether the value in the given column equals current user or user teams.
pub fn equal_user_or_user_teams(column: &str, indicator: Option<&str>, group: bool) -> String {
  special_name_only(column, "EqualUserOrUserTeams", indicator, group)
}

/// Evaluates whether the value in the given column equals current user teams.
pub fn equal_user_teams(column: &str, indicator: Option<&str>, group: bool) -> String {
  special_name_only(column, "EqualUserTeams", indicator, group)
}
