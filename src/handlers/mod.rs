//! HTTP handlers for gateway dispatch.

pub mod gateway;
pub use gateway::*;
