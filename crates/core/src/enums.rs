//! Dataverse standard enumerations.

use serde::{Deserialize, Serialize};

/// State of a quote row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum QuoteState {
  Draft = 0,
  Active = 1,
  Won = 2,
  Closed = 3,
}

/// State of a salesorder row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum OrderState {
  Active = 0,
  Submitted = 1,
  Canceled = 2,
  Fulfilled = 3,
  Invoiced = 4,
}

/// Indicates the attribute type for the target of the InitializeFrom message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum TargetFieldType {
  /// All possible attribute values.
  All = 0,
  /// Attribute values that are valid for create.
  Create = 1,
  /// Attribute values that are valid for update.
  Update = 2,
  /// Attribute values that are valid for read.
  Read = 3,
}

/// Describes the type of entity metadata to retrieve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum EntityFilter {
  /// Retrieve only entity information.
  Entity = 1,
  /// Entity information plus attributes for the entity.
  Attributes = 2,
  /// Entity information plus privileges for the entity.
  Privileges = 4,
  /// Entity information plus entity relationships for the entity.
  Relationships = 8,
  /// All data for an entity.
  All = 16,
}

macro_rules! wire_enum {
  ($name:ident { $($variant:ident = $value:literal),+ $(,)? }) => {
    impl $name {
      /// The integer value used on the wire.
      pub fn value(&self) -> u8 {
        *self as u8
      }
    }

    impl From<$name> for u8 {
      fn from(v: $name) -> u8 {
        v as u8
      }
    }

    impl TryFrom<u8> for $name {
      type Error = String;

      fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
          $($value => Ok($name::$variant),)+
          other => Err(format!("invalid {} value: {}", stringify!($name), other)),
        }
      }
    }
  };
}

wire_enum!(QuoteState { Draft = 0, Active = 1, Won = 2, Closed = 3 });
wire_enum!(OrderState { Active = 0, Submitted = 1, Canceled = 2, Fulfilled = 3, Invoiced = 4 });
wire_enum!(TargetFieldType { All = 0, Create = 1, Update = 2, Read = 3 });
wire_enum!(EntityFilter { Entity = 1, Attributes = 2, Privileges = 4, Relationships = 8, All = 16 });
