//! Client for the Microsoft Dynamics 365 / Dataverse Web API.
//!
//! API reference:
//! https://docs.microsoft.com/en-us/powerapps/developer/data-platform/webapi/query-data-web-api
//!
//! How to use:
//! 1. Create the client: `Client::new(config)` or `Client::from_environment()`
//! 2. Build a request: `client.entity("accounts").select(["name"]).top(3)`
//! 3. Execute it: `.get().await`, `.post(data).await`, `.patch(data).await`,
//!    or `.delete().await` (PATCH and DELETE require `row_id`)
//!
//! Query with no table and no query options to get a list of tables in the
//! database. Use `fetch_metadata` for an XML representation of the
//! relational aspects of the data.

pub mod actions;
pub mod auth;
pub mod client;
pub mod error;
pub mod functions;
pub mod request;
pub mod testing;
pub mod transport;

pub use actions::Action;
pub use auth::TokenSource;
pub use client::{Client, QueryResult};
pub use error::{DataverseError, ErrorKind, Result};
pub use request::EntityRequest;
pub use transport::{HttpTransport, Method, Transport, TransportRequest, TransportResponse};
