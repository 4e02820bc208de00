//! Domain Ports - Core trait definitions for the array adapter
//!
//! The transport trait defines the boundary between the protocol logic and
//! the wire. Everything else here is the data model shared by the protocol
//! layer and its callers.

use crate::decode::NormalizedRecord;
use crate::domain::element::{ApiResponse, Element};
use crate::error::Result;
use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// Transport Port
// =============================================================================

/// Transport that performs one remote call against one array.
///
/// Implementations own the connection details (address, credentials, TLS,
/// timeout). They report a failed call through the returned status rather
/// than an `Err`; `Err` is reserved for failures where no response exists.
#[async_trait]
pub trait ArrayTransport: Send + Sync {
    /// Invoke a remote call and return its response tree
    async fn invoke(&self, request: &Element) -> Result<ApiResponse>;

    /// Scope subsequent calls to a namespace (vserver); `None` clears it
    fn select_namespace(&self, vserver: Option<&str>);

    /// Endpoint this transport talks to
    fn endpoint(&self) -> &str;
}

// =============================================================================
// Dialect and Version
// =============================================================================

/// API dialect spoken by the array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Dialect {
    /// Instances addressed by name, `*-list-info` and iter start/next/end calls
    SingleNode,
    /// Instances addressed by UUID, `*-get-iter` calls
    Clustered,
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dialect::SingleNode => write!(f, "single-node"),
            Dialect::Clustered => write!(f, "clustered"),
        }
    }
}

/// Result of the version probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    pub clustered: bool,
    pub generation: String,
    pub major: String,
    pub minor: String,
}

impl Default for VersionInfo {
    fn default() -> Self {
        Self {
            clustered: false,
            generation: "0".to_string(),
            major: "0".to_string(),
            minor: "0".to_string(),
        }
    }
}

impl VersionInfo {
    pub fn dialect(&self) -> Dialect {
        if self.clustered {
            Dialect::Clustered
        } else {
            Dialect::SingleNode
        }
    }
}

impl std::fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.generation, self.major, self.minor)
    }
}

// =============================================================================
// Inventory Types
// =============================================================================

/// Instance identifier: a UUID on clustered arrays, a name on single-node ones
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(pub String);

impl InstanceId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for InstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for InstanceId {
    fn from(s: &str) -> Self {
        InstanceId(s.to_string())
    }
}

impl From<String> for InstanceId {
    fn from(s: String) -> Self {
        InstanceId(s)
    }
}

/// A countable object kind as reported by `perf-object-list-info`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectDescriptor {
    pub description: String,
    pub privilege_level: String,
}

/// A counter as reported by `perf-object-counter-list-info`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterDescriptor {
    pub unit: String,
    pub properties: String,
    pub base_counter: String,
    pub privilege_level: String,
    pub description: String,
    pub labels: Vec<String>,
}

/// One flattened volume, aggregate or LUN
pub type InventoryItem = IndexMap<String, NormalizedRecord>;

// =============================================================================
// Counter Samples
// =============================================================================

/// Counter values of one instance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CounterSample {
    /// Counter name to raw value string
    pub counters: BTreeMap<String, String>,
    /// Epoch seconds at which this sample was decoded
    pub captured_at: f64,
}

/// Samples gathered by one collection call, keyed by normalized instance key
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CounterSet {
    pub samples: BTreeMap<String, CounterSample>,
    /// Server-reported sample time in epoch seconds
    pub server_timestamp: Option<f64>,
}

impl CounterSet {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&CounterSample> {
        self.samples.get(key)
    }

    /// Authoritative time for a sample: the server timestamp when known,
    /// otherwise the instance's capture time
    pub fn sample_time(&self, key: &str) -> Option<f64> {
        let sample = self.samples.get(key)?;
        Some(self.server_timestamp.unwrap_or(sample.captured_at))
    }

    /// Merge a later iterator page into this set.
    ///
    /// An instance already present keeps its counters and gains the page's
    /// entries (page values win on conflict); new instances are inserted
    /// whole. Capture times move to the page's.
    pub fn merge_page(&mut self, page: CounterSet) {
        for (key, partial) in page.samples {
            match self.samples.get_mut(&key) {
                Some(existing) => {
                    existing.counters.extend(partial.counters);
                    existing.captured_at = partial.captured_at;
                }
                None => {
                    self.samples.insert(key, partial);
                }
            }
        }
        if self.server_timestamp.is_none() {
            self.server_timestamp = page.server_timestamp;
        }
    }
}
