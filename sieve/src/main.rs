//! Command line interface for dynamic sampling rules.
//!
//! The `sieve` binary manages the rule set of a project and evaluates events against it. Rule
//! sets are stored as one JSON file per project in the storage directory configured in
//! `config.yml`. All commands print JSON to `stdout` and log to `stderr`.
//!
//! ```text
//! $ echo '{"type":"error","conditions":[{"category":"release","operator":"glob","values":["1.*"]}],"sampleRate":0.2}' \
//!     | sieve --project 42 add
//! $ sieve --project 42 evaluate event.json
//! ```
//!
//! See `sieve --help` for the full list of commands.

mod cli;
mod cliapp;
mod setup;
mod utils;

use std::process;

pub fn main() {
    let exit_code = match cli::execute() {
        Ok(()) => 0,
        Err(err) => {
            sieve_log::ensure_error(&err);
            1
        }
    };

    process::exit(exit_code);
}
