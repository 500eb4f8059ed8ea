//! This module implements the definition of the command line app.

use std::path::PathBuf;

use clap::builder::ValueParser;
use clap::{Arg, ArgAction, Command, value_parser};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const ABOUT: &str = "Manage and evaluate dynamic sampling rules of projects.";

const KINDS: [&str; 2] = ["error", "transaction"];

fn file_arg() -> Arg {
    Arg::new("file")
        .value_name("FILE")
        .value_parser(ValueParser::path_buf())
        .help("Read the JSON input from this file instead of stdin. Use '-' for stdin.")
}

fn id_arg() -> Arg {
    Arg::new("id")
        .long("id")
        .value_name("RULE_ID")
        .required(true)
        .value_parser(value_parser!(u32))
        .help("The id of the rule.")
}

fn kind_arg() -> Arg {
    Arg::new("type")
        .long("type")
        .short('t')
        .value_name("TYPE")
        .required(true)
        .value_parser(KINDS)
        .help("The kind of rules.")
}

pub fn make_app() -> Command {
    Command::new("sieve")
        .disable_help_subcommand(true)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .propagate_version(true)
        .max_term_width(79)
        .version(VERSION)
        .about(ABOUT)
        .arg(
            Arg::new("config")
                .value_name("CONFIG")
                .long("config")
                .short('c')
                .global(true)
                .env("SIEVE_CONFIG")
                .value_parser(ValueParser::path_buf())
                .help("The path to the config folder."),
        )
        .arg(
            Arg::new("project")
                .value_name("PROJECT_ID")
                .long("project")
                .short('p')
                .global(true)
                .env("SIEVE_PROJECT")
                .value_parser(value_parser!(u64))
                .help("The project whose rule set is managed."),
        )
        .arg(
            Arg::new("log_level")
                .value_name("LEVEL")
                .long("log-level")
                .global(true)
                .help("Override the log level from the config."),
        )
        .arg(
            Arg::new("storage_path")
                .value_name("PATH")
                .long("storage-path")
                .global(true)
                .help("Override the directory rule sets are stored in."),
        )
        .arg(
            Arg::new("random_source")
                .value_name("SOURCE")
                .long("random-source")
                .global(true)
                .value_parser(["seeded", "entropy"])
                .help("Override the source of random numbers for sampling decisions."),
        )
        .subcommand(
            Command::new("categories")
                .about("List the categories a rule may use")
                .after_help(
                    "Error rules and individual transaction rules may use every category. \
                     Tracing transaction rules only see the dynamic sampling context and \
                     are limited to release, environment, user and transaction.",
                )
                .arg(kind_arg())
                .arg(
                    Arg::new("tracing")
                        .long("tracing")
                        .action(ArgAction::SetTrue)
                        .help("List the categories of tracing rules."),
                ),
        )
        .subcommand(
            Command::new("validate")
                .about("Validate a rule without storing it")
                .after_help(
                    "This validates a rule against the current rule set of the project and \
                     prints the rule it would become, including its id.",
                )
                .arg(file_arg()),
        )
        .subcommand(
            Command::new("add")
                .about("Add a rule")
                .after_help(
                    "New tracing rules are placed after the existing tracing rules, all \
                     other rules at the end of their list.",
                )
                .arg(file_arg()),
        )
        .subcommand(
            Command::new("update")
                .about("Replace an existing rule")
                .arg(id_arg())
                .arg(file_arg()),
        )
        .subcommand(
            Command::new("remove")
                .about("Remove a rule")
                .arg(id_arg()),
        )
        .subcommand(
            Command::new("reorder")
                .about("Set the order of all rules of one kind")
                .arg(kind_arg())
                .arg(
                    Arg::new("ids")
                        .value_name("RULE_ID")
                        .required(true)
                        .num_args(1..)
                        .value_parser(value_parser!(u32))
                        .help("All rule ids of the kind in their new order."),
                ),
        )
        .subcommand(
            Command::new("disable")
                .about("Disable dynamic sampling and remove all rules")
                .after_help("Ids of removed rules are never handed out again."),
        )
        .subcommand(Command::new("show").about("Print the stored rule set"))
        .subcommand(
            Command::new("evaluate")
                .about("Evaluate an event against the rule set")
                .after_help(
                    "This prints the matching rule and the sampling decision. If no rule \
                     matches, the event falls through to the default.",
                )
                .arg(file_arg()),
        )
}

pub fn config_path(matches: &clap::ArgMatches) -> PathBuf {
    matches
        .get_one::<PathBuf>("config")
        .cloned()
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_assert() {
        make_app().debug_assert();
    }

    #[test]
    fn test_global_args_after_subcommand() {
        let matches = make_app()
            .try_get_matches_from(["sieve", "show", "--project", "42", "-c", "/etc/sieve"])
            .unwrap();
        let (name, sub_matches) = matches.subcommand().unwrap();

        assert_eq!(name, "show");
        assert_eq!(sub_matches.get_one::<u64>("project"), Some(&42));
        assert_eq!(config_path(sub_matches), PathBuf::from("/etc/sieve"));
    }

    #[test]
    fn test_reorder_ids() {
        let matches = make_app()
            .try_get_matches_from(["sieve", "reorder", "--type", "transaction", "3", "1", "2"])
            .unwrap();
        let (_, sub_matches) = matches.subcommand().unwrap();

        let ids: Vec<u32> = sub_matches.get_many::<u32>("ids").unwrap().copied().collect();
        assert_eq!(ids, [3, 1, 2]);
    }

    #[test]
    fn test_rejects_unknown_kind() {
        let result = make_app().try_get_matches_from(["sieve", "categories", "--type", "span"]);
        assert!(result.is_err());
    }
}
