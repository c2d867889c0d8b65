//! Shared types for the Dataverse Web API client: configuration,
//! standard enumerations, date conversion, and response normalizers.

pub mod config;
pub mod datetime;
pub mod enums;
pub mod value;

pub use config::{ApiConfig, CacheConfig, Config, ConfigError, HttpConfig, MAX_PAGESIZE};
pub use enums::{EntityFilter, OrderState, QuoteState, TargetFieldType};

/// Check that a string is a canonical (lowercase, hyphenated) UUID.
///
/// Dataverse row ids are GUIDs; alternate-key lookups are anything else.
pub fn is_valid_uuid(value: &str) -> bool {
  match uuid::Uuid::parse_str(value) {
    Ok(parsed) => parsed.to_string() == value,
    Err(_) => false,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_is_valid_uuid() {
    assert!(is_valid_uuid("2fa45806-9b82-4946-a5c8-d67fd56b0f50"));
    assert!(!is_valid_uuid("2FA45806-9B82-4946-A5C8-D67FD56B0F50")); // not canonical
    assert!(!is_valid_uuid("not-a-uuid"));
    assert!(!is_valid_uuid(""));
    assert!(!is_valid_uuid("accountnumber=123"));
  }
}
