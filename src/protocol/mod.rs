//! Array Protocol Layer
//!
//! Provides the remote call wrapper and the two dialect strategies:
//! - Single-node: name-addressed instances, iterator start/next/end triples
//! - Clustered: UUID-addressed instances, `*-get-iter` paging by next-tag
//!
//! The strategy is chosen once, when the session detects the dialect.

pub mod clustered;
pub mod inventory;
pub mod samples;
pub mod single_node;
pub mod version;

pub use clustered::ClusteredProtocol;
pub use inventory::Listing;
pub use samples::{collect_instances, normalize_counter_name, normalize_instance_key};
pub use single_node::SingleNodeProtocol;
pub use version::{detect_version, parse_version};

use crate::decode::FieldFilter;
use crate::domain::{ArrayTransport, CounterSet, Dialect, Element, InstanceId, InventoryItem};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

// =============================================================================
// Remote Call Names
// =============================================================================

pub const SYSTEM_GET_VERSION: &str = "system-get-version";
pub const PERF_OBJECT_LIST_INFO: &str = "perf-object-list-info";
pub const PERF_OBJECT_COUNTER_LIST_INFO: &str = "perf-object-counter-list-info";
pub const INSTANCE_LIST_ITER_START: &str = "perf-object-instance-list-info-iter-start";
pub const INSTANCE_LIST_ITER_NEXT: &str = "perf-object-instance-list-info-iter-next";
pub const INSTANCE_LIST_ITER_END: &str = "perf-object-instance-list-info-iter-end";
pub const INSTANCE_LIST_ITER: &str = "perf-object-instance-list-info-iter";
pub const GET_INSTANCES_ITER_START: &str = "perf-object-get-instances-iter-start";
pub const GET_INSTANCES_ITER_NEXT: &str = "perf-object-get-instances-iter-next";
/// Releases a counter iterator. Some older callers release counter tags with
/// `perf-object-instance-list-info-iter-end`; this crate pairs each tag with
/// the end call of the iterator that issued it.
pub const GET_INSTANCES_ITER_END: &str = "perf-object-get-instances-iter-end";
pub const GET_INSTANCES: &str = "perf-object-get-instances";

// =============================================================================
// API Client
// =============================================================================

/// Transport handle plus the page bound used by every paged call
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn ArrayTransport>,
    max_records: u32,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn ArrayTransport>, max_records: u32) -> Self {
        Self {
            transport,
            max_records,
        }
    }

    pub fn max_records(&self) -> u32 {
        self.max_records
    }

    pub fn transport(&self) -> &Arc<dyn ArrayTransport> {
        &self.transport
    }

    /// Invoke a remote call and return its `results` tree.
    ///
    /// A non-zero status becomes `Error::Protocol` carrying the call name
    /// and the server's reason.
    pub async fn call(&self, request: Element) -> Result<Element> {
        debug!("{} -> {}", self.transport.endpoint(), request.name());
        let response = self.transport.invoke(&request).await?;
        if !response.is_passed() {
            return Err(Error::protocol(
                request.name(),
                response.results_errno(),
                response.results_reason(),
            ));
        }
        Ok(response.results)
    }
}

/// Read a page's record count. A missing count reads as an empty page.
pub(crate) fn record_count(results: &Element, field: &str, operation: &str) -> Result<u32> {
    match results.child_str(field) {
        None => Ok(0),
        Some(raw) => raw.trim().parse::<u32>().map_err(|e| {
            Error::Parse(format!("{} returned {} '{}': {}", operation, field, raw, e))
        }),
    }
}

/// Release a server-side iterator. Failures are logged and handed back
/// to the caller as a secondary error.
pub(crate) async fn release_cursor(client: &ApiClient, call: &str, tag: &str) -> Result<()> {
    let request = Element::new(call).with_value("tag", tag);
    match client.call(request).await {
        Ok(_) => Ok(()),
        Err(e) => {
            warn!("Failed to release iterator {} via {}: {}", tag, call, e);
            Err(e)
        }
    }
}

// =============================================================================
// Iteration Outcome
// =============================================================================

/// Result of an iterated call: the gathered value plus any failure to
/// release the server-side cursor afterwards
#[derive(Debug)]
pub struct IterOutcome<T> {
    pub value: T,
    pub release_error: Option<Error>,
}

impl<T> IterOutcome<T> {
    pub fn new(value: T, release_error: Option<Error>) -> Self {
        Self {
            value,
            release_error,
        }
    }

    /// Outcome of a call that holds no cursor
    pub fn complete(value: T) -> Self {
        Self::new(value, None)
    }

    pub fn released(&self) -> bool {
        self.release_error.is_none()
    }

    /// Keep the value, dropping any release failure
    pub fn into_value(self) -> T {
        self.value
    }

    /// Treat a release failure as an error
    pub fn into_result(self) -> Result<T> {
        match self.release_error {
            Some(e) => Err(e),
            None => Ok(self.value),
        }
    }
}

// =============================================================================
// Dialect Strategy
// =============================================================================

/// Capability set implemented once per dialect
#[async_trait]
pub trait DialectProtocol: Send + Sync {
    fn dialect(&self) -> Dialect;

    /// Single-shot listing of LUNs, volumes or aggregates (first page only)
    async fn list(
        &self,
        client: &ApiClient,
        listing: Listing,
        filter: Option<&FieldFilter>,
    ) -> Result<Vec<InventoryItem>>;

    /// Enumerate every instance of a countable object
    async fn enumerate_instances(
        &self,
        client: &ApiClient,
        object: &str,
        filter: Option<&str>,
    ) -> Result<IterOutcome<Vec<InstanceId>>>;

    /// Collect counters for the given instances
    async fn collect_counters(
        &self,
        client: &ApiClient,
        object: &str,
        instances: &[InstanceId],
        counters: &[String],
    ) -> Result<IterOutcome<CounterSet>>;
}

/// Strategy for a detected dialect
pub fn protocol_for(dialect: Dialect) -> Box<dyn DialectProtocol> {
    match dialect {
        Dialect::SingleNode => Box::new(SingleNodeProtocol),
        Dialect::Clustered => Box::new(ClusteredProtocol),
    }
}

/// `<name><item>v</item>..</name>` list element
pub(crate) fn string_list<'a, I>(name: &str, item: &str, values: I) -> Element
where
    I: IntoIterator<Item = &'a str>,
{
    values
        .into_iter()
        .fold(Element::new(name), |el, v| el.with_value(item, v))
}
