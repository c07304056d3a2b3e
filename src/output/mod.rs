//! Output stage: naming and assembly.
//!
//! - [`assign_outputs`] - give every module of the closed graph an output path
//! - [`assemble`] - rewrite references, print, and collect [`Assets`]

mod assemble;
mod asset;
mod namer;

pub use assemble::assemble;
pub use asset::{Asset, Assets};
pub use namer::assign_outputs;
