//! Core engine: the fetch → publish cycle and the loop that drives it.

pub mod orchestrator;
pub mod publisher;
pub mod scheduler;
