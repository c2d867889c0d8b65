//! Scripted transport for testing code built on the client.
//!
//! List the responses the transport should return; when the client makes a
//! request, the responses are consumed in the order they were given. Status
//! codes are scripted separately and default to 200. Every dispatched
//! request is recorded for assertions.
//!
//! ```ignore
//! let transport = Arc::new(
//!   MockTransport::new()
//!     .with_responses([json!({"value": [{"foo": "bar"}]})], false),
//! );
//! let client = Client::with_static_token(config, transport.clone(), "token")?;
//! ```

use crate::error::Result;
use crate::transport::{Transport, TransportRequest, TransportResponse};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A [`Transport`] that returns scripted responses. Panics when it runs out
/// of scripted responses; only meant for tests.
#[derive(Debug, Default)]
pub struct MockTransport {
  responses: Vec<Value>,
  response_idx: AtomicUsize,
  cycle_responses: bool,
  statuses: Vec<u16>,
  status_idx: AtomicUsize,
  cycle_statuses: bool,
  requests: Mutex<Vec<TransportRequest>>,
}

impl MockTransport {
  pub fn new() -> Self {
    Self::default()
  }

  /// List the response bodies the transport should return, in order.
  /// With `cycle` set the list restarts when exhausted.
  pub fn with_responses(mut self, responses: impl IntoIterator<Item = Value>, cycle: bool) -> Self {
    self.responses = responses.into_iter().collect();
    self.cycle_responses = cycle;
    self
  }

  /// List the status codes the transport should return, in order.
  /// With `cycle` set the list restarts when exhausted. Defaults to 200.
  pub fn with_status_codes(mut self, statuses: impl IntoIterator<Item = u16>, cycle: bool) -> Self {
    self.statuses = statuses.into_iter().collect();
    self.cycle_statuses = cycle;
    self
  }

  /// All requests dispatched so far.
  pub fn requests(&self) -> Vec<TransportRequest> {
    self.requests.lock().expect("mock transport lock poisoned").clone()
  }

  /// The most recently dispatched request.
  pub fn last_request(&self) -> Option<TransportRequest> {
    self.requests().pop()
  }

  fn next_response(&self) -> Value {
    let idx = self.response_idx.fetch_add(1, Ordering::SeqCst);
    if idx < self.responses.len() {
      self.responses[idx].clone()
    } else if self.cycle_responses && !self.responses.is_empty() {
      self.responses[idx % self.responses.len()].clone()
    } else {
      panic!("ran out of responses on the MockTransport");
    }
  }

  fn next_status(&self) -> u16 {
    if self.statuses.is_empty() {
      return 200;
    }
    let idx = self.status_idx.fetch_add(1, Ordering::SeqCst);
    if idx < self.statuses.len() {
      self.statuses[idx]
    } else if self.cycle_statuses {
      self.statuses[idx % self.statuses.len()]
    } else {
      panic!("ran out of status codes on the MockTransport");
    }
  }
}

#[async_trait]
impl Transport for MockTransport {
  async fn execute(&self, request: TransportRequest) -> Result<TransportResponse> {
    self
      .requests
      .lock()
      .expect("mock transport lock poisoned")
      .push(request);

    let response = self.next_response();
    let status = self.next_status();

    Ok(TransportResponse {
      status,
      body: serde_json::to_vec(&response).expect("mock response must serialize"),
    })
  }
}
