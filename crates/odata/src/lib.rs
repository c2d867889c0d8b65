//! OData query construction for the Dataverse Web API.
//!
//! Query reference:
//! https://docs.microsoft.com/en-us/powerapps/developer/data-platform/webapi/query-data-web-api

pub mod apply;
pub mod fetchxml;
pub mod filter;
pub mod query;

pub use fetchxml::{FetchXmlBuilder, FetchXmlError, FetchXmlOperator};
pub use filter::FieldValue;
pub use query::{Filter, Order, QueryError, QueryOptions, ResourcePath};
