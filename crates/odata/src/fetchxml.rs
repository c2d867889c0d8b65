//! FetchXML query construction.
//!
//! FetchXML reference:
//! https://docs.microsoft.com/en-us/powerapps/developer/data-platform/use-fetchxml-construct-query
//!
//! The builder is cursor based: attributes, orders, filters, and conditions
//! attach to the most recently opened entity or link-entity, and the
//! `nested_*` methods step one level deeper instead of opening a sibling.

use crate::filter::FieldValue;
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum FetchXmlError {
  #[error("entity already defined")]
  EntityAlreadyDefined,
  #[error("no entity defined yet")]
  NoEntity,
  #[error("no filter defined yet")]
  NoFilter,
  #[error("all attributes defined, cannot add individual attributes")]
  AllAttributesDefined,
  #[error("individual attributes defined, cannot add all attributes")]
  IndividualAttributesDefined,
  #[error("too many linked tables (>{MAX_LINKED_ENTITIES})")]
  TooManyLinkedEntities,
  #[error("too many conditions (>{MAX_CONDITIONS})")]
  TooManyConditions,
  #[error("xml write failed: {0}")]
  Xml(String),
}

/// The Web API rejects queries with more than 10 link-entities.
pub const MAX_LINKED_ENTITIES: usize = 10;
/// The Web API rejects filters with more than 500 conditions.
pub const MAX_CONDITIONS: usize = 500;

/// Condition operators understood by FetchXML.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchXmlOperator {
  Eq,
  Ne,
  Gt,
  Ge,
  Lt,
  Le,
  Like,
  NotLike,
  In,
  NotIn,
  Between,
  NotBetween,
  Null,
  NotNull,
  BeginsWith,
  NotBeginWith,
  EndsWith,
  NotEndWith,
  On,
  OnOrBefore,
  OnOrAfter,
  Today,
  Yesterday,
  Tomorrow,
  LastXDays,
  NextXDays,
  OlderThanXDays,
  EqUserId,
  NeUserId,
  EqBusinessId,
  NeBusinessId,
  Above,
  AboveOrEqual,
  Under,
  UnderOrEqual,
  NotUnder,
}

impl FetchXmlOperator {
  pub fn as_str(&self) -> &'static str {
    match self {
      FetchXmlOperator::Eq => "eq",
      FetchXmlOperator::Ne => "ne",
      FetchXmlOperator::Gt => "gt",
      FetchXmlOperator::Ge => "ge",
      FetchXmlOperator::Lt => "lt",
      FetchXmlOperator::Le => "le",
      FetchXmlOperator::Like => "like",
      FetchXmlOperator::NotLike => "not-like",
      FetchXmlOperator::In => "in",
      FetchXmlOperator::NotIn => "not-in",
      FetchXmlOperator::Between => "between",
      FetchXmlOperator::NotBetween => "not-between",
      FetchXmlOperator::Null => "null",
      FetchXmlOperator::NotNull => "not-null",
      FetchXmlOperator::BeginsWith => "begins-with",
      FetchXmlOperator::NotBeginWith => "not-begin-with",
      FetchXmlOperator::EndsWith => "ends-with",
      FetchXmlOperator::NotEndWith => "not-end-with",
      FetchXmlOperator::On => "on",
      FetchXmlOperator::OnOrBefore => "on-or-before",
      FetchXmlOperator::OnOrAfter => "on-or-after",
      FetchXmlOperator::Today => "today",
      FetchXmlOperator::Yesterday => "yesterday",
      FetchXmlOperator::Tomorrow => "tomorrow",
      FetchXmlOperator::LastXDays => "last-x-days",
      FetchXmlOperator::NextXDays => "next-x-days",
      FetchXmlOperator::OlderThanXDays => "older-than-x-days",
      FetchXmlOperator::EqUserId => "eq-userid",
      FetchXmlOperator::NeUserId => "ne-userid",
      FetchXmlOperator::EqBusinessId => "eq-businessid",
      FetchXmlOperator::NeBusinessId => "ne-businessid",
      FetchXmlOperator::Above => "above",
      FetchXmlOperator::AboveOrEqual => "above-or-equal",
      FetchXmlOperator::Under => "under",
      FetchXmlOperator::UnderOrEqual => "under-or-equal",
      FetchXmlOperator::NotUnder => "not-under",
    }
  }
}

/// Aggregation function for fetch attributes and conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchAggregate {
  Count,
  CountColumn,
  Sum,
  Avg,
  Min,
  Max,
}

impl FetchAggregate {
  fn as_str(&self) -> &'static str {
    match self {
      FetchAggregate::Count => "count",
      FetchAggregate::CountColumn => "countcolumn",
      FetchAggregate::Sum => "sum",
      FetchAggregate::Avg => "avg",
      FetchAggregate::Min => "min",
      FetchAggregate::Max => "max",
    }
  }
}

/// Date grouping for aggregated fetch attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateGrouping {
  Day,
  Week,
  Month,
  Quarter,
  Year,
  FiscalPeriod,
  FiscalYear,
}

impl DateGrouping {
  fn as_str(&self) -> &'static str {
    match self {
      DateGrouping::Day => "day",
      DateGrouping::Week => "week",
      DateGrouping::Month => "month",
      DateGrouping::Quarter => "quarter",
      DateGrouping::Year => "year",
      DateGrouping::FiscalPeriod => "fiscal-period",
      DateGrouping::FiscalYear => "fiscal-year",
    }
  }
}

/// Output format of the fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
  Ado,
  Auto,
  Elements,
  Raw,
  Platform,
}

impl OutputFormat {
  fn as_str(&self) -> &'static str {
    match self {
      OutputFormat::Ado => "xml-ado",
      OutputFormat::Auto => "xml-auto",
      OutputFormat::Elements => "xml-elements",
      OutputFormat::Raw => "xml-raw",
      OutputFormat::Platform => "xml-platform",
    }
  }
}

/// Mapping attribute of the fetch element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMapping {
  Internal,
  Logical,
}

impl FetchMapping {
  fn as_str(&self) -> &'static str {
    match self {
      FetchMapping::Internal => "internal",
      FetchMapping::Logical => "logical",
    }
  }
}

/// How conditions inside a filter combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
  And,
  Or,
}

impl FilterType {
  fn as_str(&self) -> &'static str {
    match self {
      FilterType::And => "and",
      FilterType::Or => "or",
    }
  }
}

/// Entity element options.
#[derive(Debug, Clone, Default)]
pub struct EntitySpec {
  pub name: String,
  pub enable_prefiltering: Option<bool>,
  pub prefilter_parameter_name: Option<String>,
}

impl EntitySpec {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      ..Default::default()
    }
  }
}

impl From<&str> for EntitySpec {
  fn from(name: &str) -> Self {
    Self::new(name)
  }
}

/// Attribute element options.
#[derive(Debug, Clone, Default)]
pub struct AttributeSpec {
  pub name: String,
  pub alias: Option<String>,
  pub aggregate: Option<FetchAggregate>,
  pub groupby: Option<bool>,
  pub distinct: Option<bool>,
  pub date_grouping: Option<DateGrouping>,
  pub user_timezone: Option<bool>,
  pub added_by: Option<String>,
  pub build: Option<String>,
}

impl AttributeSpec {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      ..Default::default()
    }
  }
}

impl From<&str> for AttributeSpec {
  fn from(name: &str) -> Self {
    Self::new(name)
  }
}

/// Link-entity element options.
#[derive(Debug, Clone, Default)]
pub struct LinkSpec {
  pub name: String,
  pub to: String,
  pub from: Option<String>,
  pub alias: Option<String>,
  pub link_type: Option<String>,
  pub visible: Option<bool>,
  pub intersect: Option<bool>,
  pub enable_prefiltering: Option<bool>,
  pub prefilter_parameter_name: Option<String>,
}

impl LinkSpec {
  pub fn new(name: impl Into<String>, to: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      to: to.into(),
      ..Default::default()
    }
  }
}

/// Filter element options.
#[derive(Debug, Clone, Default)]
pub struct FilterSpec {
  pub filter_type: Option<FilterType>,
  pub is_quick_find_fields: Option<bool>,
  pub override_quick_find_record_limit_enabled: Option<bool>,
}

impl FilterSpec {
  pub fn new(filter_type: FilterType) -> Self {
    Self {
      filter_type: Some(filter_type),
      ..Default::default()
    }
  }
}

/// Condition element options.
#[derive(Debug, Clone, Default)]
pub struct ConditionSpec {
  pub attribute: String,
  pub operator: Option<FetchXmlOperator>,
  pub value: Option<FieldValue>,
  pub values: Vec<FieldValue>,
  pub value_of: Option<String>,
  pub column: Option<String>,
  pub entity_name: Option<String>,
  pub aggregate: Option<FetchAggregate>,
  pub row_aggregate: Option<String>,
  pub alias: Option<String>,
  pub uiname: Option<String>,
  pub uitype: Option<String>,
  pub uihidden: Option<bool>,
}

impl ConditionSpec {
  pub fn new(attribute: impl Into<String>, operator: FetchXmlOperator) -> Self {
    Self {
      attribute: attribute.into(),
      operator: Some(operator),
      ..Default::default()
    }
  }
}

/// Order element options.
#[derive(Debug, Clone, Default)]
pub struct OrderSpec {
  pub attribute: String,
  pub alias: Option<String>,
  pub descending: Option<bool>,
}

impl OrderSpec {
  pub fn new(attribute: impl Into<String>) -> Self {
    Self {
      attribute: attribute.into(),
      ..Default::default()
    }
  }
}

impl From<&str> for OrderSpec {
  fn from(attribute: &str) -> Self {
    Self::new(attribute)
  }
}

#[derive(Debug, Clone, Default)]
struct FilterNode {
  spec: FilterSpec,
  conditions: Vec<ConditionSpec>,
  nested: Vec<FilterNode>,
}

impl FilterNode {
  fn at_path_mut(&mut self, path: &[usize]) -> &mut FilterNode {
    match path.split_first() {
      None => self,
      Some((&idx, rest)) => self.nested[idx].at_path_mut(rest),
    }
  }
}

#[derive(Debug, Clone)]
enum NodeSpec {
  Entity(EntitySpec),
  Link(LinkSpec),
}

#[derive(Debug, Clone)]
struct Node {
  spec: NodeSpec,
  attributes: Vec<AttributeSpec>,
  all_attributes: bool,
  filters: Vec<FilterNode>,
  links: Vec<Node>,
  orders: Vec<OrderSpec>,
}

impl Node {
  fn new(spec: NodeSpec) -> Self {
    Self {
      spec,
      attributes: Vec::new(),
      all_attributes: false,
      filters: Vec::new(),
      links: Vec::new(),
      orders: Vec::new(),
    }
  }

  fn at_path_mut(&mut self, path: &[usize]) -> &mut Node {
    match path.split_first() {
      None => self,
      Some((&idx, rest)) => self.links[idx].at_path_mut(rest),
    }
  }
}

fn fmt_bool(value: bool) -> &'static str {
  if value { "true" } else { "false" }
}

/// Builder for FetchXML queries.
///
/// Attributes, orders, filters, and conditions attach to the most recently
/// opened entity or link-entity. `linked_entity` opens a sibling of the
/// current link-entity (or the first link under the entity);
/// `nested_linked_entity` opens a child of the current one. `filter` opens a
/// new filter on the current entity/link; `nested_filter` a child of the
/// current filter. Conditions go to the innermost open filter.
#[derive(Debug, Clone, Default)]
pub struct FetchXmlBuilder {
  mapping: Option<FetchMapping>,
  version: Option<String>,
  page: Option<u32>,
  count: Option<u32>,
  top: Option<u32>,
  aggregate: Option<bool>,
  distinct: Option<bool>,
  paging_cookie: Option<String>,
  utc_offset: Option<i32>,
  output_format: Option<OutputFormat>,
  min_active_row_version: Option<bool>,
  return_total_record_count: Option<bool>,
  no_lock: Option<bool>,

  entity_node: Option<Node>,
  fetch_orders: Vec<OrderSpec>,

  /// Path of link indices from the entity to the current link-entity.
  link_path: Vec<usize>,
  /// Path into the current node's filter tree: first element indexes
  /// `filters`, the rest index `nested` recursively.
  filter_path: Vec<usize>,
  total_links: usize,
}

impl FetchXmlBuilder {
  pub fn new() -> Self {
    Self::default()
  }

  // Top level fetch options

  pub fn mapping(mut self, mapping: FetchMapping) -> Self {
    self.mapping = Some(mapping);
    self
  }

  pub fn version(mut self, version: impl Into<String>) -> Self {
    self.version = Some(version.into());
    self
  }

  pub fn page(mut self, page: u32) -> Self {
    self.page = Some(page);
    self
  }

  pub fn count(mut self, count: u32) -> Self {
    self.count = Some(count);
    self
  }

  pub fn top(mut self, top: u32) -> Self {
    self.top = Some(top);
    self
  }

  pub fn aggregate(mut self, value: bool) -> Self {
    self.aggregate = Some(value);
    self
  }

  pub fn distinct(mut self, value: bool) -> Self {
    self.distinct = Some(value);
    self
  }

  pub fn paging_cookie(mut self, cookie: impl Into<String>) -> Self {
    self.paging_cookie = Some(cookie.into());
    self
  }

  pub fn utc_offset(mut self, offset: i32) -> Self {
    self.utc_offset = Some(offset);
    self
  }

  pub fn output_format(mut self, format: OutputFormat) -> Self {
    self.output_format = Some(format);
    self
  }

  pub fn min_active_row_version(mut self, value: bool) -> Self {
    self.min_active_row_version = Some(value);
    self
  }

  pub fn return_total_record_count(mut self, value: bool) -> Self {
    self.return_total_record_count = Some(value);
    self
  }

  pub fn no_lock(mut self, value: bool) -> Self {
    self.no_lock = Some(value);
    self
  }

  // Structure

  /// Set the entity the fetch selects from. One per fetch.
  pub fn entity(mut self, spec: impl Into<EntitySpec>) -> Result<Self, FetchXmlError> {
    if self.entity_node.is_some() {
      return Err(FetchXmlError::EntityAlreadyDefined);
    }
    self.entity_node = Some(Node::new(NodeSpec::Entity(spec.into())));
    self.link_path.clear();
    self.filter_path.clear();
    Ok(self)
  }

  fn current_node(&mut self) -> Result<&mut Node, FetchXmlError> {
    let path = self.link_path.clone();
    let entity = self.entity_node.as_mut().ok_or(FetchXmlError::NoEntity)?;
    Ok(entity.at_path_mut(&path))
  }

  /// Add an attribute to the current entity or link-entity.
  pub fn attribute(mut self, spec: impl Into<AttributeSpec>) -> Result<Self, FetchXmlError> {
    let node = self.current_node()?;
    if node.all_attributes {
      return Err(FetchXmlError::AllAttributesDefined);
    }
    node.attributes.push(spec.into());
    Ok(self)
  }

  /// Select all attributes of the current entity or link-entity.
  /// Mutually exclusive with individual attributes.
  pub fn all_attributes(mut self) -> Result<Self, FetchXmlError> {
    let node = self.current_node()?;
    if !node.attributes.is_empty() {
      return Err(FetchXmlError::IndividualAttributesDefined);
    }
    node.all_attributes = true;
    Ok(self)
  }

  /// Add an order to the current entity or link-entity, or to the fetch
  /// itself when no entity has been defined yet.
  pub fn order(mut self, spec: impl Into<OrderSpec>) -> Result<Self, FetchXmlError> {
    if self.entity_node.is_none() {
      self.fetch_orders.push(spec.into());
      return Ok(self);
    }
    let spec = spec.into();
    let node = self.current_node()?;
    node.orders.push(spec);
    Ok(self)
  }

  /// Open a new filter on the current entity or link-entity.
  pub fn filter(mut self, spec: FilterSpec) -> Result<Self, FetchXmlError> {
    let node = self.current_node()?;
    node.filters.push(FilterNode {
      spec,
      ..Default::default()
    });
    let idx = node.filters.len() - 1;
    self.filter_path = vec![idx];
    Ok(self)
  }

  /// Open a filter nested inside the current filter.
  pub fn nested_filter(mut self, spec: FilterSpec) -> Result<Self, FetchXmlError> {
    if self.filter_path.is_empty() {
      return Err(FetchXmlError::NoFilter);
    }
    let path = self.filter_path.clone();
    let node = self.current_node()?;
    let filter = node.filters[path[0]].at_path_mut(&path[1..]);
    filter.nested.push(FilterNode {
      spec,
      ..Default::default()
    });
    let idx = filter.nested.len() - 1;
    self.filter_path.push(idx);
    Ok(self)
  }

  /// Add a condition to the innermost open filter.
  pub fn condition(mut self, spec: ConditionSpec) -> Result<Self, FetchXmlError> {
    if self.filter_path.is_empty() {
      return Err(FetchXmlError::NoFilter);
    }
    let path = self.filter_path.clone();
    let node = self.current_node()?;
    let filter = node.filters[path[0]].at_path_mut(&path[1..]);
    if filter.conditions.len() >= MAX_CONDITIONS {
      return Err(FetchXmlError::TooManyConditions);
    }
    filter.conditions.push(spec);
    Ok(self)
  }

  /// Open a link-entity as a sibling of the current one (or the first link
  /// under the entity).
  pub fn linked_entity(mut self, spec: LinkSpec) -> Result<Self, FetchXmlError> {
    if self.total_links >= MAX_LINKED_ENTITIES {
      return Err(FetchXmlError::TooManyLinkedEntities);
    }
    let mut parent_path = self.link_path.clone();
    parent_path.pop();
    let entity = self.entity_node.as_mut().ok_or(FetchXmlError::NoEntity)?;
    let parent = entity.at_path_mut(&parent_path);
    parent.links.push(Node::new(NodeSpec::Link(spec)));
    let idx = parent.links.len() - 1;
    self.link_path = parent_path;
    self.link_path.push(idx);
    self.filter_path.clear();
    self.total_links += 1;
    Ok(self)
  }

  /// Open a link-entity nested inside the current one.
  pub fn nested_linked_entity(mut self, spec: LinkSpec) -> Result<Self, FetchXmlError> {
    if self.link_path.is_empty() {
      return self.linked_entity(spec);
    }
    if self.total_links >= MAX_LINKED_ENTITIES {
      return Err(FetchXmlError::TooManyLinkedEntities);
    }
    let node = self.current_node()?;
    node.links.push(Node::new(NodeSpec::Link(spec)));
    let idx = node.links.len() - 1;
    self.link_path.push(idx);
    self.filter_path.clear();
    self.total_links += 1;
    Ok(self)
  }

  /// Serialize the fetch into an XML string.
  pub fn build(&self) -> Result<String, FetchXmlError> {
    let mut writer = Writer::new(Vec::new());

    let mut fetch = BytesStart::new("fetch");
    if let Some(mapping) = self.mapping {
      fetch.push_attribute(("mapping", mapping.as_str()));
    }
    if let Some(version) = &self.version {
      fetch.push_attribute(("version", version.as_str()));
    }
    if let Some(page) = self.page {
      fetch.push_attribute(("page", page.to_string().as_str()));
    }
    if let Some(count) = self.count {
      fetch.push_attribute(("count", count.to_string().as_str()));
    }
    if let Some(top) = self.top {
      fetch.push_attribute(("top", top.to_string().as_str()));
    }
    if let Some(aggregate) = self.aggregate {
      fetch.push_attribute(("aggregate", fmt_bool(aggregate)));
    }
    if let Some(distinct) = self.distinct {
      fetch.push_attribute(("distinct", fmt_bool(distinct)));
    }
    if let Some(cookie) = &self.paging_cookie {
      fetch.push_attribute(("paging-cookie", cookie.as_str()));
    }
    if let Some(offset) = self.utc_offset {
      fetch.push_attribute(("utc-offset", offset.to_string().as_str()));
    }
    if let Some(format) = self.output_format {
      fetch.push_attribute(("output-format", format.as_str()));
    }
    if let Some(value) = self.min_active_row_version {
      fetch.push_attribute(("min-active-row-version", fmt_bool(value)));
    }
    if let Some(value) = self.return_total_record_count {
      fetch.push_attribute(("returntotalrecordcount", fmt_bool(value)));
    }
    if let Some(value) = self.no_lock {
      fetch.push_attribute(("no-lock", fmt_bool(value)));
    }

    if self.entity_node.is_none() && self.fetch_orders.is_empty() {
      write_event(&mut writer, Event::Empty(fetch))?;
    } else {
      write_event(&mut writer, Event::Start(fetch))?;
      if let Some(entity) = &self.entity_node {
        write_node(&mut writer, entity)?;
      }
      for order in &self.fetch_orders {
        write_order(&mut writer, order)?;
      }
      write_event(&mut writer, Event::End(BytesEnd::new("fetch")))?;
    }

    String::from_utf8(writer.into_inner()).map_err(|e| FetchXmlError::Xml(e.to_string()))
  }
}

fn write_event(writer: &mut Writer<Vec<u8>>, event: Event) -> Result<(), FetchXmlError> {
  writer.write_event(event).map_err(|e| FetchXmlError::Xml(e.to_string()))
}

fn node_start(node: &Node) -> (&'static str, BytesStart<'static>) {
  match &node.spec {
    NodeSpec::Entity(spec) => {
      let mut el = BytesStart::new("entity");
      el.push_attribute(("name", spec.name.as_str()));
      if let Some(value) = spec.enable_prefiltering {
        el.push_attribute(("enableprefiltering", fmt_bool(value)));
      }
      if let Some(name) = &spec.prefilter_parameter_name {
        el.push_attribute(("prefilterparametername", name.as_str()));
      }
      ("entity", el)
    }
    NodeSpec::Link(spec) => {
      let mut el = BytesStart::new("link-entity");
      el.push_attribute(("name", spec.name.as_str()));
      el.push_attribute(("to", spec.to.as_str()));
      if let Some(from) = &spec.from {
        el.push_attribute(("from", from.as_str()));
      }
      if let Some(alias) = &spec.alias {
        el.push_attribute(("alias", alias.as_str()));
      }
      if let Some(link_type) = &spec.link_type {
        el.push_attribute(("link-type", link_type.as_str()));
      }
      if let Some(value) = spec.visible {
        el.push_attribute(("visible", fmt_bool(value)));
      }
      if let Some(value) = spec.intersect {
        el.push_attribute(("intersect", fmt_bool(value)));
      }
      if let Some(value) = spec.enable_prefiltering {
        el.push_attribute(("enableprefiltering", fmt_bool(value)));
      }
      if let Some(name) = &spec.prefilter_parameter_name {
        el.push_attribute(("prefilterparametername", name.as_str()));
      }
      ("link-entity", el)
    }
  }
}

fn write_node(writer: &mut Writer<Vec<u8>>, node: &Node) -> Result<(), FetchXmlError> {
  let (tag, start) = node_start(node);
  let empty = node.attributes.is_empty() && node.filters.is_empty() && node.links.is_empty() && node.orders.is_empty();

  if empty {
    return write_event(writer, Event::Empty(start));
  }

  write_event(writer, Event::Start(start))?;
  for attribute in &node.attributes {
    write_attribute(writer, attribute)?;
  }
  for filter in &node.filters {
    write_filter(writer, filter)?;
  }
  for link in &node.links {
    write_node(writer, link)?;
  }
  for order in &node.orders {
    write_order(writer, order)?;
  }
  write_event(writer, Event::End(BytesEnd::new(tag)))
}

fn write_attribute(writer: &mut Writer<Vec<u8>>, spec: &AttributeSpec) -> Result<(), FetchXmlError> {
  let mut el = BytesStart::new("attribute");
  el.push_attribute(("name", spec.name.as_str()));
  if let Some(alias) = &spec.alias {
    el.push_attribute(("alias", alias.as_str()));
  }
  if let Some(aggregate) = spec.aggregate {
    el.push_attribute(("aggregate", aggregate.as_str()));
  }
  if let Some(value) = spec.groupby {
    el.push_attribute(("groupby", fmt_bool(value)));
  }
  if let Some(value) = spec.distinct {
    el.push_attribute(("distinct", fmt_bool(value)));
  }
  if let Some(grouping) = spec.date_grouping {
    el.push_attribute(("dategrouping", grouping.as_str()));
  }
  if let Some(value) = spec.user_timezone {
    el.push_attribute(("usertimezone", fmt_bool(value)));
  }
  if let Some(added_by) = &spec.added_by {
    el.push_attribute(("addedby", added_by.as_str()));
  }
  if let Some(build) = &spec.build {
    el.push_attribute(("build", build.as_str()));
  }
  write_event(writer, Event::Empty(el))
}

fn write_order(writer: &mut Writer<Vec<u8>>, spec: &OrderSpec) -> Result<(), FetchXmlError> {
  let mut el = BytesStart::new("order");
  el.push_attribute(("attribute", spec.attribute.as_str()));
  if let Some(alias) = &spec.alias {
    el.push_attribute(("alias", alias.as_str()));
  }
  if let Some(descending) = spec.descending {
    el.push_attribute(("descending", fmt_bool(descending)));
  }
  write_event(writer, Event::Empty(el))
}

fn xml_value(value: &FieldValue) -> String {
  match value {
    FieldValue::Str(s) => s.clone(),
    FieldValue::Int(i) => i.to_string(),
    FieldValue::Float(f) => f.to_string(),
    FieldValue::Bool(b) => fmt_bool(*b).to_string(),
    FieldValue::Null => "null".to_string(),
  }
}

fn write_filter(writer: &mut Writer<Vec<u8>>, filter: &FilterNode) -> Result<(), FetchXmlError> {
  let mut el = BytesStart::new("filter");
  if let Some(filter_type) = filter.spec.filter_type {
    el.push_attribute(("type", filter_type.as_str()));
  }
  if let Some(value) = filter.spec.is_quick_find_fields {
    el.push_attribute(("isquickfindfields", fmt_bool(value)));
  }
  if let Some(value) = filter.spec.override_quick_find_record_limit_enabled {
    el.push_attribute(("overridequickfindrecordlimitenabled", fmt_bool(value)));
  }

  if filter.nested.is_empty() && filter.conditions.is_empty() {
    return write_event(writer, Event::Empty(el));
  }

  write_event(writer, Event::Start(el))?;
  for nested in &filter.nested {
    write_filter(writer, nested)?;
  }
  for condition in &filter.conditions {
    write_condition(writer, condition)?;
  }
  write_event(writer, Event::End(BytesEnd::new("filter")))
}

fn write_condition(writer: &mut Writer<Vec<u8>>, spec: &ConditionSpec) -> Result<(), FetchXmlError> {
  let mut el = BytesStart::new("condition");
  el.push_attribute(("attribute", spec.attribute.as_str()));
  if let Some(operator) = spec.operator {
    el.push_attribute(("operator", operator.as_str()));
  }
  if let Some(value) = &spec.value {
    el.push_attribute(("value", xml_value(value).as_str()));
  }
  if let Some(value_of) = &spec.value_of {
    el.push_attribute(("valueof", value_of.as_str()));
  }
  if let Some(column) = &spec.column {
    el.push_attribute(("column", column.as_str()));
  }
  if let Some(entity_name) = &spec.entity_name {
    el.push_attribute(("entityname", entity_name.as_str()));
  }
  if let Some(aggregate) = spec.aggregate {
    el.push_attribute(("aggregate", aggregate.as_str()));
  }
  if let Some(row_aggregate) = &spec.row_aggregate {
    el.push_attribute(("rowaggregate", row_aggregate.as_str()));
  }
  if let Some(alias) = &spec.alias {
    el.push_attribute(("alias", alias.as_str()));
  }
  if let Some(uiname) = &spec.uiname {
    el.push_attribute(("uiname", uiname.as_str()));
  }
  if let Some(uitype) = &spec.uitype {
    el.push_attribute(("uitype", uitype.as_str()));
  }
  if let Some(uihidden) = spec.uihidden {
    el.push_attribute(("uihidden", if uihidden { "1" } else { "0" }));
  }

  // Multi-value conditions carry their values as child elements
  if spec.values.is_empty() {
    return write_event(writer, Event::Empty(el));
  }

  write_event(writer, Event::Start(el))?;
  for value in &spec.values {
    write_event(writer, Event::Start(BytesStart::new("value")))?;
    write_event(writer, Event::Text(BytesText::new(&xml_value(value))))?;
    write_event(writer, Event::End(BytesEnd::new("value")))?;
  }
  write_event(writer, Event::End(BytesEnd::new("condition")))
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  #[test]
  fn test_simple() {
    let fetch_xml = FetchXmlBuilder::new()
      .mapping(FetchMapping::Logical)
      .entity("account")
      .unwrap()
      .attribute("accountid")
      .unwrap()
      .attribute("name")
      .unwrap()
      .attribute("accountnumber")
      .unwrap()
      .build()
      .unwrap();

    let expected = concat!(
      r#"<fetch mapping="logical">"#,
      r#"<entity name="account">"#,
      r#"<attribute name="accountid"/>"#,
      r#"<attribute name="name"/>"#,
      r#"<attribute name="accountnumber"/>"#,
      "</entity>",
      "</fetch>",
    );

    assert_eq!(fetch_xml, expected);
  }

  #[test]
  fn test_all_top_level_options() {
    let fetch_xml = FetchXmlBuilder::new()
      .mapping(FetchMapping::Logical)
      .version("1.0")
      .page(1)
      .count(2)
      .top(1)
      .aggregate(true)
      .distinct(true)
      .paging_cookie("foo")
      .utc_offset(123123)
      .output_format(OutputFormat::Auto)
      .min_active_row_version(true)
      .return_total_record_count(true)
      .no_lock(true)
      .order("name")
      .unwrap()
      .entity("account")
      .unwrap()
      .build()
      .unwrap();

    let expected = concat!(
      r#"<fetch mapping="logical" version="1.0" page="1" count="2" top="1" "#,
      r#"aggregate="true" distinct="true" paging-cookie="foo" utc-offset="123123" "#,
      r#"output-format="xml-auto" min-active-row-version="true" "#,
      r#"returntotalrecordcount="true" no-lock="true">"#,
      r#"<entity name="account"/><order attribute="name"/></fetch>"#,
    );

    assert_eq!(fetch_xml, expected);
  }

  #[test]
  fn test_all_entity_options() {
    let fetch_xml = FetchXmlBuilder::new()
      .entity(EntitySpec {
        name: "account".to_string(),
        enable_prefiltering: Some(true),
        prefilter_parameter_name: Some("foo".to_string()),
      })
      .unwrap()
      .attribute(AttributeSpec {
        name: "accountid".to_string(),
        alias: Some("pizza".to_string()),
        aggregate: Some(FetchAggregate::Count),
        groupby: Some(true),
        distinct: Some(true),
        date_grouping: Some(DateGrouping::Day),
        user_timezone: Some(true),
        added_by: Some("me".to_string()),
        build: Some("1.003017".to_string()),
      })
      .unwrap()
      .order(OrderSpec {
        attribute: "name".to_string(),
        alias: Some("x".to_string()),
        descending: Some(true),
      })
      .unwrap()
      .filter(FilterSpec {
        filter_type: Some(FilterType::Or),
        is_quick_find_fields: Some(true),
        override_quick_find_record_limit_enabled: Some(true),
      })
      .unwrap()
      .build()
      .unwrap();

    let expected = concat!(
      r#"<fetch><entity name="account" enableprefiltering="true" prefilterparametername="foo">"#,
      r#"<attribute name="accountid" alias="pizza" aggregate="count" groupby="true" "#,
      r#"distinct="true" dategrouping="day" usertimezone="true" addedby="me" build="1.003017"/>"#,
      r#"<filter type="or" isquickfindfields="true" overridequickfindrecordlimitenabled="true"/>"#,
      r#"<order attribute="name" alias="x" descending="true"/>"#,
      "</entity></fetch>",
    );

    assert_eq!(fetch_xml, expected);
  }

  #[test]
  fn test_linked_entity_nesting() {
    let link = |name: &str, to: &str| LinkSpec::new(name, to);

    let fetch_xml = FetchXmlBuilder::new()
      .entity("account")
      .unwrap()
      .linked_entity(link("one", "a"))
      .unwrap()
      .linked_entity(link("two", "b"))
      .unwrap()
      .nested_linked_entity(link("two-nested", "c"))
      .unwrap()
      // After a nested link, a plain linked_entity opens a sibling of it
      .linked_entity(link("two-nested2", "d"))
      .unwrap()
      .build()
      .unwrap();

    let expected = concat!(
      r#"<fetch><entity name="account">"#,
      r#"<link-entity name="one" to="a"/>"#,
      r#"<link-entity name="two" to="b">"#,
      r#"<link-entity name="two-nested" to="c"/>"#,
      r#"<link-entity name="two-nested2" to="d"/>"#,
      "</link-entity>",
      "</entity></fetch>",
    );

    assert_eq!(fetch_xml, expected);
  }

  #[test]
  fn test_filters_and_conditions() {
    let fetch_xml = FetchXmlBuilder::new()
      .entity("account")
      .unwrap()
      .filter(FilterSpec::new(FilterType::Or))
      .unwrap()
      .condition(ConditionSpec::new("1", FetchXmlOperator::Ne))
      .unwrap()
      .linked_entity(LinkSpec::new("x", "y"))
      .unwrap()
      .filter(FilterSpec::new(FilterType::And))
      .unwrap()
      .condition(ConditionSpec::new("1", FetchXmlOperator::Eq))
      .unwrap()
      .nested_filter(FilterSpec::new(FilterType::Or))
      .unwrap()
      .condition(ConditionSpec::new("1", FetchXmlOperator::Lt))
      .unwrap()
      .linked_entity(LinkSpec::new("foo", "bar"))
      .unwrap()
      .filter(FilterSpec::new(FilterType::Or))
      .unwrap()
      .condition(ConditionSpec::new("1", FetchXmlOperator::Gt))
      .unwrap()
      .build()
      .unwrap();

    // Nested filters render before the outer filter's own conditions
    let expected = concat!(
      r#"<fetch><entity name="account">"#,
      r#"<filter type="or"><condition attribute="1" operator="ne"/></filter>"#,
      r#"<link-entity name="x" to="y">"#,
      r#"<filter type="and">"#,
      r#"<filter type="or"><condition attribute="1" operator="lt"/></filter>"#,
      r#"<condition attribute="1" operator="eq"/>"#,
      "</filter>",
      "</link-entity>",
      r#"<link-entity name="foo" to="bar">"#,
      r#"<filter type="or"><condition attribute="1" operator="gt"/></filter>"#,
      "</link-entity>",
      "</entity></fetch>",
    );

    assert_eq!(fetch_xml, expected);
  }

  #[test]
  fn test_condition_with_values() {
    let fetch_xml = FetchXmlBuilder::new()
      .entity("account")
      .unwrap()
      .filter(FilterSpec::default())
      .unwrap()
      .condition(ConditionSpec {
        attribute: "statecode".to_string(),
        operator: Some(FetchXmlOperator::In),
        values: vec![FieldValue::Int(0), FieldValue::Int(1)],
        ..Default::default()
      })
      .unwrap()
      .build()
      .unwrap();

    let expected = concat!(
      r#"<fetch><entity name="account"><filter>"#,
      r#"<condition attribute="statecode" operator="in">"#,
      "<value>0</value><value>1</value>",
      "</condition></filter></entity></fetch>",
    );

    assert_eq!(fetch_xml, expected);
  }

  #[test]
  fn test_all_condition_options() {
    let fetch_xml = FetchXmlBuilder::new()
      .entity("account")
      .unwrap()
      .filter(FilterSpec::default())
      .unwrap()
      .condition(ConditionSpec {
        attribute: "foo".to_string(),
        operator: Some(FetchXmlOperator::Eq),
        value: Some(FieldValue::Int(1)),
        value_of: Some("xxx".to_string()),
        column: Some("xyz".to_string()),
        entity_name: Some("account".to_string()),
        aggregate: Some(FetchAggregate::Count),
        row_aggregate: Some("countchildren".to_string()),
        alias: Some("alias".to_string()),
        uiname: Some("what".to_string()),
        uitype: Some("is".to_string()),
        uihidden: Some(true),
        ..Default::default()
      })
      .unwrap()
      .build()
      .unwrap();

    let expected = concat!(
      r#"<fetch><entity name="account"><filter>"#,
      r#"<condition attribute="foo" operator="eq" value="1" valueof="xxx" column="xyz" "#,
      r#"entityname="account" aggregate="count" rowaggregate="countchildren" alias="alias" "#,
      r#"uiname="what" uitype="is" uihidden="1"/>"#,
      "</filter></entity></fetch>",
    );

    assert_eq!(fetch_xml, expected);
  }

  #[test]
  fn test_order_attaches_per_scope() {
    let fetch_xml = FetchXmlBuilder::new()
      .order(OrderSpec {
        attribute: "foo".to_string(),
        alias: Some("bar".to_string()),
        descending: Some(true),
      })
      .unwrap()
      .entity("account")
      .unwrap()
      .order(OrderSpec {
        attribute: "foo".to_string(),
        alias: Some("bar".to_string()),
        descending: Some(false),
      })
      .unwrap()
      .linked_entity(LinkSpec::new("x", "y"))
      .unwrap()
      .order(OrderSpec {
        attribute: "foo".to_string(),
        alias: Some("bar".to_string()),
        descending: Some(true),
      })
      .unwrap()
      .build()
      .unwrap();

    let expected = concat!(
      r#"<fetch><entity name="account">"#,
      r#"<link-entity name="x" to="y"><order attribute="foo" alias="bar" descending="true"/></link-entity>"#,
      r#"<order attribute="foo" alias="bar" descending="false"/>"#,
      "</entity>",
      r#"<order attribute="foo" alias="bar" descending="true"/>"#,
      "</fetch>",
    );

    assert_eq!(fetch_xml, expected);
  }

  #[test]
  fn test_all_attributes_shorthand() {
    let fetch_xml = FetchXmlBuilder::new()
      .entity("foo")
      .unwrap()
      .all_attributes()
      .unwrap()
      .linked_entity(LinkSpec::new("bar", "baz"))
      .unwrap()
      .all_attributes()
      .unwrap()
      .build()
      .unwrap();

    assert_eq!(
      fetch_xml,
      r#"<fetch><entity name="foo"><link-entity name="bar" to="baz"/></entity></fetch>"#
    );
  }

  #[test]
  fn test_all_attributes_mutually_exclusive() {
    let builder = FetchXmlBuilder::new().entity("foo").unwrap().all_attributes().unwrap();
    assert_eq!(
      builder.attribute("foo").unwrap_err(),
      FetchXmlError::AllAttributesDefined
    );

    let builder = FetchXmlBuilder::new().entity("foo").unwrap().attribute("foo").unwrap();
    assert_eq!(
      builder.all_attributes().unwrap_err(),
      FetchXmlError::IndividualAttributesDefined
    );
  }

  #[test]
  fn test_too_many_linked_entities() {
    let mut builder = FetchXmlBuilder::new().entity("foo").unwrap();
    for i in 0..10 {
      builder = builder.linked_entity(LinkSpec::new(i.to_string(), i.to_string())).unwrap();
    }
    assert_eq!(
      builder.linked_entity(LinkSpec::new("x", "y")).unwrap_err(),
      FetchXmlError::TooManyLinkedEntities
    );
  }

  #[test]
  fn test_too_many_linked_entities_nested() {
    let mut builder = FetchXmlBuilder::new()
      .entity("foo")
      .unwrap()
      .linked_entity(LinkSpec::new("x", "y"))
      .unwrap();
    for i in 0..9 {
      builder = builder
        .nested_linked_entity(LinkSpec::new(i.to_string(), i.to_string()))
        .unwrap();
    }
    assert_eq!(
      builder.nested_linked_entity(LinkSpec::new("x", "y")).unwrap_err(),
      FetchXmlError::TooManyLinkedEntities
    );
  }

  #[test]
  fn test_too_many_conditions() {
    let mut builder = FetchXmlBuilder::new()
      .entity("foo")
      .unwrap()
      .filter(FilterSpec::default())
      .unwrap();
    for i in 0..500 {
      builder = builder
        .condition(ConditionSpec::new(i.to_string(), FetchXmlOperator::Eq))
        .unwrap();
    }
    assert_eq!(
      builder
        .condition(ConditionSpec::new("x", FetchXmlOperator::Eq))
        .unwrap_err(),
      FetchXmlError::TooManyConditions
    );
  }

  #[test]
  fn test_cursor_errors() {
    assert_eq!(
      FetchXmlBuilder::new().attribute("foo").unwrap_err(),
      FetchXmlError::NoEntity
    );
    assert_eq!(
      FetchXmlBuilder::new()
        .entity("foo")
        .unwrap()
        .condition(ConditionSpec::new("x", FetchXmlOperator::Eq))
        .unwrap_err(),
      FetchXmlError::NoFilter
    );
    assert_eq!(
      FetchXmlBuilder::new().entity("a").unwrap().entity("b").unwrap_err(),
      FetchXmlError::EntityAlreadyDefined
    );
  }
}
