//! specs
//!
//! Specifications shipped with this crate, expressed with its own
//! machinery.

pub mod core;
