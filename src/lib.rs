//! ONTAP Performance Adapter
//!
//! Client-side adapter that reads inventory (volumes, aggregates, LUNs,
//! countable objects) and performance counters from ONTAP storage arrays,
//! reconciling the single-node and clustered API dialects into one model.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                            Session                             │
//! │     (one array: version, namespace, dialect, page bound)       │
//! ├────────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐  ┌──────────────────┐  ┌──────────────────┐  │
//! │  │  Inventory   │  │     Instance     │  │     Counter      │  │
//! │  │   Queries    │  │   Enumeration    │  │    Collection    │  │
//! │  └──────┬───────┘  └────────┬─────────┘  └────────┬─────────┘  │
//! │         └───────────────────┼─────────────────────┘            │
//! │             ┌───────────────┴────────────────┐                 │
//! │             │  SingleNode  /  Clustered      │                 │
//! │             │      dialect strategies        │                 │
//! │             └───────────────┬────────────────┘                 │
//! │             ┌───────────────┴────────────────┐                 │
//! │             │     Response Tree Decoder      │                 │
//! │             └───────────────┬────────────────┘                 │
//! ├─────────────────────────────┴──────────────────────────────────┤
//! │                        ArrayTransport                          │
//! │             (HttpTransport / ScriptedTransport)                │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`session`]: Per-array session and public operations
//! - [`protocol`]: Remote calls, dialect strategies, sample extraction
//! - [`decode`]: Response tree flattening
//! - [`transport`]: HTTP and scripted transports
//! - [`collector`]: Concurrent collection across arrays
//! - [`config`]: Array configuration and YAML loading
//! - [`domain`]: Core domain types and the transport port
//! - [`error`]: Error types and handling

pub mod collector;
pub mod config;
pub mod decode;
pub mod domain;
pub mod error;
pub mod protocol;
pub mod session;
pub mod transport;

// Re-export commonly used types
pub use collector::{ArrayCollection, ArrayReport, CollectionPlan, MultiArrayCollector};

pub use config::{ArrayConfig, Scheme, TransportConfig, DEFAULT_MAX_RECORDS};

pub use decode::{decode, FieldFilter, NodeShape, NormalizedRecord};

pub use domain::{
    ApiResponse, ArrayTransport, CounterDescriptor, CounterSample, CounterSet, Dialect, Element,
    InstanceId, InventoryItem, ObjectDescriptor, ResultStatus, VersionInfo,
};

pub use error::{Error, Result};

pub use protocol::{normalize_instance_key, DialectProtocol, IterOutcome, Listing};

pub use session::Session;

pub use transport::{HttpTransport, ScriptedTransport};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
