//! Response Tree Decoder
//!
//! Turns the generic response trees into keyed records.

pub mod record;
pub mod tree;

pub use record::{FieldFilter, NormalizedRecord};
pub use tree::{decode, ChildKind, NodeShape};
