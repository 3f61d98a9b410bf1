pub mod common;
pub mod gateway;

pub use common::*;
pub use gateway::*;
