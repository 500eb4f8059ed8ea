//! Configuration for the sieve CLI.
//!
//! The configuration is read from a `config.yml` inside a config folder:
//!
//! ```yaml
//! logging:
//!   level: info
//!   format: auto
//! sampling:
//!   random_source: seeded
//! storage:
//!   path: rules
//! ```
//!
//! Every section is optional. A folder without a `config.yml` yields the defaults shown above.
#![warn(missing_docs)]

mod config;

pub use crate::config::*;
