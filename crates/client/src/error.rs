//! Error types for Web API calls.
//!
//! Status code mapping follows the documented error statuses:
//! https://docs.microsoft.com/en-us/powerapps/developer/data-platform/webapi/compose-http-requests-handle-errors#identify-status-codes

pub type Result<T, E = DataverseError> = std::result::Result<T, E>;

/// Error code the server uses for rows that would overlap an existing one.
pub const CONFLICT_ERROR_CODE: &str = "0x80040265";

/// Message used when error details are hidden via [`DataverseError::simplified`].
pub const SIMPLIFIED_MESSAGE: &str = "There was a problem communicating with the server.";

#[derive(Debug, thiserror::Error)]
pub enum DataverseError {
  /// Fallback for any unrecognized failure status.
  #[error("Dynamics Web API call failed: {message}")]
  WebApi { message: String },
  #[error("malformed request: {message}")]
  Parse { message: String },
  #[error("authentication failed: {message}")]
  Authentication { message: String },
  #[error("insufficient permissions: {message}")]
  Permission { message: String },
  #[error("not found: {message}")]
  NotFound { message: String },
  #[error("method '{method}' not allowed: {message}")]
  MethodNotAllowed { method: &'static str, message: String },
  #[error("trying to save a duplicate record: {message}")]
  DuplicateRecord { message: String },
  #[error("request length is too large: {message}")]
  PayloadTooLarge { message: String },
  #[error("Dynamics Web API limits were exceeded: {message}")]
  ApiLimits { message: String },
  #[error("requested operation isn't implemented: {message}")]
  NotImplemented { message: String },
  #[error("Web API service isn't available: {message}")]
  Unavailable { message: String },
  /// The server rejected the row because it overlaps an existing one
  /// (error code `0x80040265`).
  #[error("row overlaps an existing row: {message}")]
  Conflict { message: String },
  #[error("failed to acquire access token: {0}")]
  Token(String),
  #[error("invalid configuration: {0}")]
  Config(#[from] dataverse_core::ConfigError),
  #[error("query construction failed: {0}")]
  Query(#[from] odata::QueryError),
  #[error("fetchxml construction failed: {0}")]
  FetchXml(#[from] odata::FetchXmlError),
  #[error(transparent)]
  Http(#[from] reqwest::Error),
  #[error("failed to parse response: {0}")]
  Json(#[from] serde_json::Error),
}

/// Discriminant of [`DataverseError`], used to exclude error classes from
/// simplification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  WebApi,
  Parse,
  Authentication,
  Permission,
  NotFound,
  MethodNotAllowed,
  DuplicateRecord,
  PayloadTooLarge,
  ApiLimits,
  NotImplemented,
  Unavailable,
  Conflict,
  Token,
  Config,
  Query,
  FetchXml,
  Http,
  Json,
}

impl DataverseError {
  /// Map a failure response to an error based on the expected statuses.
  pub fn from_status(status: u16, message: impl Into<String>, method: &'static str) -> Self {
    let message = message.into();
    match status {
      400 => DataverseError::Parse { message },
      401 => DataverseError::Authentication { message },
      403 => DataverseError::Permission { message },
      404 => DataverseError::NotFound { message },
      405 => DataverseError::MethodNotAllowed { method, message },
      412 => DataverseError::DuplicateRecord { message },
      413 => DataverseError::PayloadTooLarge { message },
      429 => DataverseError::ApiLimits { message },
      501 => DataverseError::NotImplemented { message },
      503 => DataverseError::Unavailable { message },
      _ => DataverseError::WebApi { message },
    }
  }

  pub fn kind(&self) -> ErrorKind {
    match self {
      DataverseError::WebApi { .. } => ErrorKind::WebApi,
      DataverseError::Parse { .. } => ErrorKind::Parse,
      DataverseError::Authentication { .. } => ErrorKind::Authentication,
      DataverseError::Permission { .. } => ErrorKind::Permission,
      DataverseError::NotFound { .. } => ErrorKind::NotFound,
      DataverseError::MethodNotAllowed { .. } => ErrorKind::MethodNotAllowed,
      DataverseError::DuplicateRecord { .. } => ErrorKind::DuplicateRecord,
      DataverseError::PayloadTooLarge { .. } => ErrorKind::PayloadTooLarge,
      DataverseError::ApiLimits { .. } => ErrorKind::ApiLimits,
      DataverseError::NotImplemented { .. } => ErrorKind::NotImplemented,
      DataverseError::Unavailable { .. } => ErrorKind::Unavailable,
      DataverseError::Conflict { .. } => ErrorKind::Conflict,
      DataverseError::Token(_) => ErrorKind::Token,
      DataverseError::Config(_) => ErrorKind::Config,
      DataverseError::Query(_) => ErrorKind::Query,
      DataverseError::FetchXml(_) => ErrorKind::FetchXml,
      DataverseError::Http(_) => ErrorKind::Http,
      DataverseError::Json(_) => ErrorKind::Json,
    }
  }

  /// Collapse the error into the generic variant with a fixed message.
  /// Useful for hiding error details from user facing surfaces.
  pub fn simplified(self) -> Self {
    DataverseError::WebApi {
      message: SIMPLIFIED_MESSAGE.to_string(),
    }
  }

  /// Apply [`Self::simplified`] when `simplify` is set, unless the error's
  /// kind is listed in `keep`.
  pub fn maybe_simplified(self, simplify: bool, keep: &[ErrorKind]) -> Self {
    if simplify && !keep.contains(&self.kind()) {
      tracing::warn!(error = %self, "simplifying api error");
      self.simplified()
    } else {
      self
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_from_status_table() {
    let cases: [(u16, ErrorKind); 11] = [
      (400, ErrorKind::Parse),
      (401, ErrorKind::Authentication),
      (403, ErrorKind::Permission),
      (404, ErrorKind::NotFound),
      (405, ErrorKind::MethodNotAllowed),
      (412, ErrorKind::DuplicateRecord),
      (413, ErrorKind::PayloadTooLarge),
      (429, ErrorKind::ApiLimits),
      (501, ErrorKind::NotImplemented),
      (503, ErrorKind::Unavailable),
      (500, ErrorKind::WebApi),
    ];
    for (status, kind) in cases {
      assert_eq!(DataverseError::from_status(status, "oh no", "get").kind(), kind);
    }
  }

  #[test]
  fn test_method_in_message() {
    let error = DataverseError::from_status(405, "oh no", "patch");
    assert!(error.to_string().contains("patch"));
  }

  #[test]
  fn test_simplified() {
    let error = DataverseError::from_status(404, "secret detail", "get");
    let simplified = error.simplified();
    assert_eq!(simplified.kind(), ErrorKind::WebApi);
    assert!(!simplified.to_string().contains("secret detail"));
  }

  #[test]
  fn test_maybe_simplified_keeps_listed_kinds() {
    let error = DataverseError::from_status(404, "secret detail", "get");
    let kept = error.maybe_simplified(true, &[ErrorKind::NotFound]);
    assert_eq!(kept.kind(), ErrorKind::NotFound);

    let error = DataverseError::from_status(404, "secret detail", "get");
    let simplified = error.maybe_simplified(true, &[]);
    assert_eq!(simplified.kind(), ErrorKind::WebApi);

    let error = DataverseError::from_status(404, "secret detail", "get");
    let untouched = error.maybe_simplified(false, &[]);
    assert_eq!(untouched.kind(), ErrorKind::NotFound);
  }
}
