//! quadbatch core
//!
//! Ambient utilities shared by the quadbatch crates: logging setup, profiling
//! scopes, hashed collections and math types.

pub mod alloc;
pub mod logging;
pub mod math;
pub mod profiling;
