//! Scripted in-memory transport
//!
//! Replays queued responses per remote call name and records every request.
//! Used by the test suites and for dry runs against captured responses.

use crate::domain::{ApiResponse, ArrayTransport, Element};
use crate::error::{Error, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, VecDeque};

/// Transport answering from per-call response queues
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    endpoint: String,
    responses: Mutex<BTreeMap<String, VecDeque<ApiResponse>>>,
    requests: Mutex<Vec<Element>>,
    namespace: Mutex<Option<String>>,
}

impl ScriptedTransport {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    /// Queue a response for the next call named `call`
    pub fn respond(&self, call: &str, response: ApiResponse) -> &Self {
        self.responses
            .lock()
            .entry(call.to_string())
            .or_default()
            .push_back(response);
        self
    }

    /// Queue a passed response with the given `results` tree
    pub fn respond_ok(&self, call: &str, results: Element) -> &Self {
        self.respond(call, ApiResponse::passed(results))
    }

    /// Queue a failed response
    pub fn respond_err(&self, call: &str, errno: i64, reason: &str) -> &Self {
        self.respond(call, ApiResponse::failed(errno, reason))
    }

    /// Every request seen so far, in order
    pub fn requests(&self) -> Vec<Element> {
        self.requests.lock().clone()
    }

    /// Names of every call seen so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.requests
            .lock()
            .iter()
            .map(|r| r.name().to_string())
            .collect()
    }

    /// Number of calls named `call`
    pub fn count(&self, call: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.name() == call)
            .count()
    }

    /// Currently selected namespace
    pub fn namespace(&self) -> Option<String> {
        self.namespace.lock().clone()
    }

    /// Number of queued responses not yet consumed
    pub fn pending(&self) -> usize {
        self.responses.lock().values().map(VecDeque::len).sum()
    }
}

#[async_trait]
impl ArrayTransport for ScriptedTransport {
    async fn invoke(&self, request: &Element) -> Result<ApiResponse> {
        self.requests.lock().push(request.clone());
        self.responses
            .lock()
            .get_mut(request.name())
            .and_then(VecDeque::pop_front)
            .ok_or_else(|| {
                Error::Connection(format!(
                    "{}: no scripted response for {}",
                    self.endpoint,
                    request.name()
                ))
            })
    }

    fn select_namespace(&self, vserver: Option<&str>) {
        *self.namespace.lock() = vserver.map(str::to_string);
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn test_replays_in_order_and_records() {
        let transport = ScriptedTransport::new("filer01");
        transport
            .respond_ok("system-get-version", Element::new("results").with_value("version", "1"))
            .respond_err("system-get-version", 13005, "gone");

        let req = Element::new("system-get-version");
        let first = transport.invoke(&req).await.unwrap();
        assert!(first.is_passed());
        let second = transport.invoke(&req).await.unwrap();
        assert_eq!(second.results_reason(), "gone");
        assert_matches!(transport.invoke(&req).await, Err(Error::Connection(_)));

        assert_eq!(transport.count("system-get-version"), 3);
        assert_eq!(transport.pending(), 0);
    }

    #[test]
    fn test_namespace_selection() {
        let transport = ScriptedTransport::new("filer01");
        transport.select_namespace(Some("svm1"));
        assert_eq!(transport.namespace().as_deref(), Some("svm1"));
        transport.select_namespace(None);
        assert_eq!(transport.namespace(), None);
    }
}
