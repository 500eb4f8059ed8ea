//! Event predicates for the sampling categories that are not plain attribute lookups.
//!
//! Each module exposes a `matches` function that inspects an [`Event`](sieve_event::Event) and
//! answers one question about it: does it come from localhost, from a web crawler, from a legacy
//! browser, and so on. Sampling conditions combine these answers with the configured values.
#![warn(missing_docs)]

pub mod browser_extensions;
pub mod client_ips;
pub mod csp;
pub mod error_messages;
pub mod legacy_browsers;
pub mod localhost;
pub mod user_agent;
pub mod web_crawlers;

#[cfg(test)]
mod testutils;

pub use crate::legacy_browsers::LegacyBrowser;
