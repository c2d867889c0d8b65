//! Url fragment builders for Web API functions.
//!
//! Reference:
//! https://docs.microsoft.com/en-us/dynamics365/customer-engagement/web-api/functions
//!
//! Pass the returned fragment to [`crate::Client::execute_function`].

use dataverse_core::{EntityFilter, TargetFieldType};

fn fmt_bool(value: bool) -> &'static str {
  if value { "true" } else { "false" }
}

/// Converts the calendar rules to an array of available time blocks for the
/// specified period.
pub fn expand_calendar(start: &str, end: &str) -> String {
  format!("ExpandCalendar(Start='{start}',End='{end}')")
}

/// Builds the full address according to country/regional format specific
/// requirements.
pub fn format_address(line_1: &str, city: &str, state: &str, postal_code: &str, country: &str) -> String {
  format!(
    "FormatAddress(Line1='{line_1}',City='{city}',StateOrProvince='{state}',PostalCode='{postal_code}',Country='{country}')"
  )
}

/// Retrieves the default price level (price list) for the current user
/// based on the user's territory relationship with the price level.
pub fn get_default_price_level() -> String {
  "GetDefaultPriceLevel()".to_string()
}

/// Retrieves a list of all the entities that can participate in a
/// Many-to-Many entity relationship.
pub fn get_valid_many_to_many() -> String {
  "GetValidManyToMany()".to_string()
}

/// Retrieves a list of entity logical names that are valid as the primary
/// entity (one) from the specified entity in a one-to-many relationship.
pub fn get_valid_referenced_entities(name: &str) -> String {
  format!("GetValidReferencedEntities(ReferencingEntityName='{name}')")
}

/// Retrieves the set of entities that are valid as the related entity
/// (many) to the specified entity in a one-to-many relationship.
pub fn get_valid_referencing_entities(name: &str) -> String {
  format!("GetValidReferencingEntities(ReferencingEntityName='{name}')")
}

/// Initializes a new record from an existing record.
pub fn initialize_from(table: &str, row_id: &str, entity_name: &str, field_type: TargetFieldType) -> String {
  format!(
    "InitializeFrom(EntityMoniker=@tid,TargetEntityName='{entity_name}',TargetFieldType={})\
     ?@tid={{'@odata.id':'{table}({row_id})'}}",
    field_type.value()
  )
}

/// Retrieves metadata information about all the entities.
///
/// * `filters`: how much data for each entity is retrieved.
/// * `as_if_published`: whether to retrieve metadata that has not been
///   published.
pub fn retrieve_all_entities(filters: EntityFilter, as_if_published: bool) -> String {
  format!(
    "RetrieveAllEntities(EntityFilters={},RetrieveAsIfPublished={})",
    filters.value(),
    fmt_bool(as_if_published)
  )
}

/// Retrieves entity metadata.
///
/// * `row_id`: primary key (metadata id) of the entity.
/// * `name`: the logical name of the target entity.
pub fn retrieve_entity(row_id: &str, name: &str, filters: EntityFilter, as_if_published: bool) -> String {
  format!(
    "RetrieveEntity(EntityFilters={},LogicalName='{name}',MetadataId={row_id},RetrieveAsIfPublished={})",
    filters.value(),
    fmt_bool(as_if_published)
  )
}

/// Detects and retrieves duplicates for a specified record.
pub fn retrieve_duplicates(table: &str, row_id: &str, entity_name: &str) -> String {
  format!(
    "RetrieveDuplicates(BusinessEntity=@tid,MatchingEntityName='{entity_name}')\
     ?@tid={{'@odata.id':'{table}({row_id})'}}"
  )
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_expand_calendar() {
    assert_eq!(
      expand_calendar("2021-05-09", "2021-05-10"),
      "ExpandCalendar(Start='2021-05-09',End='2021-05-10')"
    );
  }

  #[test]
  fn test_format_address() {
    assert_eq!(
      format_address("street 1", "city", "state", "12345", "country"),
      "FormatAddress(Line1='street 1',City='city',StateOrProvince='state',PostalCode='12345',Country='country')"
    );
  }

  #[test]
  fn test_no_argument_functions() {
    assert_eq!(get_default_price_level(), "GetDefaultPriceLevel()");
    assert_eq!(get_valid_many_to_many(), "GetValidManyToMany()");
  }

  #[test]
  fn test_referenced_entities() {
    assert_eq!(
      get_valid_referenced_entities("account"),
      "GetValidReferencedEntities(ReferencingEntityName='account')"
    );
    assert_eq!(
      get_valid_referencing_entities("account"),
      "GetValidReferencingEntities(ReferencingEntityName='account')"
    );
  }

  #[test]
  fn test_initialize_from() {
    assert_eq!(
      initialize_from("accounts", "row", "account", TargetFieldType::Create),
      "InitializeFrom(EntityMoniker=@tid,TargetEntityName='account',TargetFieldType=1)\
       ?@tid={'@odata.id':'accounts(row)'}"
    );
  }

  #[test]
  fn test_retrieve_all_entities() {
    assert_eq!(
      retrieve_all_entities(EntityFilter::Attributes, false),
      "RetrieveAllEntities(EntityFilters=2,RetrieveAsIfPublished=false)"
    );
    assert_eq!(
      retrieve_all_entities(EntityFilter::All, true),
      "RetrieveAllEntities(EntityFilters=16,RetrieveAsIfPublished=true)"
    );
  }

  #[test]
  fn test_retrieve_entity() {
    assert_eq!(
      retrieve_entity("row", "account", EntityFilter::Entity, false),
      "RetrieveEntity(EntityFilters=1,LogicalName='account',MetadataId=row,RetrieveAsIfPublished=false)"
    );
  }

  #[test]
  fn test_retrieve_duplicates() {
    assert_eq!(
      retrieve_duplicates("accounts", "row", "account"),
      "RetrieveDuplicates(BusinessEntity=@tid,MatchingEntityName='account')?@tid={'@odata.id':'accounts(row)'}"
    );
  }
}
