//! Common functionality shared by the sampling rule engine crates.
#![warn(missing_docs)]

mod glob;
mod project;

pub use crate::glob::*;
pub use crate::project::*;
