//! stepgraph: compile sequential build plans into Tekton job graphs.
//!
//! Steps that implicitly shared one working directory become isolated jobs
//! wired through a single shared storage resource, chained so the runtime
//! keeps the order the plan implied by position.

pub mod cli;
pub mod core;
pub mod steps;
