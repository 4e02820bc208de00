//! Domain types and traits

pub mod element;
pub mod ports;

pub use element::*;
pub use ports::*;
