//! Array Transports
//!
//! - HTTP: XML envelopes over HTTP(S) to the management servlet
//! - Scripted: in-memory replay of queued responses

pub mod http;
pub mod scripted;
pub mod xml;

pub use http::HttpTransport;
pub use scripted::ScriptedTransport;
