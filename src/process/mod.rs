//! Compilation pipeline.
//!
//! - [`Compiler`] - builder-based driver: hooks, graph, naming, assembly
//! - [`transform`] - one-shot compilation with defaults

pub mod compile;

pub use compile::{transform, BuildOutput, Compiler};
