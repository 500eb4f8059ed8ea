use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::ArgMatches;
use serde::Serialize;
use sieve_common::ProjectId;
use sieve_config::{Config, OverridableConfig};
use sieve_event::Event;
use sieve_sampling::{
    Category, FileSink, ProjectSampling, RuleCandidate, RuleId, RuleKind, SamplingConfig,
    allowed_categories, evaluate, validate_rule,
};

use crate::{cliapp, setup, utils};

/// Output of the `evaluate` command.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EvaluationReport<'a> {
    kind: RuleKind,
    matched: bool,
    #[serde(flatten)]
    result: Option<sieve_sampling::SamplingMatch<'a>>,
}

/// Collects the config overrides from the command line.
fn extract_config_args(matches: &ArgMatches) -> OverridableConfig {
    OverridableConfig {
        log_level: matches.get_one::<String>("log_level").cloned(),
        storage_path: matches.get_one::<String>("storage_path").cloned(),
        random_source: matches.get_one::<String>("random_source").cloned(),
    }
}

/// Runs the command line application.
pub fn execute() -> Result<()> {
    let app = cliapp::make_app();
    let matches = app.get_matches();
    let (name, matches) = matches
        .subcommand()
        .ok_or_else(|| anyhow!("no command given"))?;

    let mut config = Config::from_path(cliapp::config_path(matches))?;
    config.apply_override(extract_config_args(matches))?;

    setup::init_logging(&config);
    setup::dump_spawn_infos(&config);

    match name {
        "categories" => list_categories(matches),
        "validate" => validate(&config, matches),
        "add" => add_rule(&config, matches),
        "update" => update_rule(&config, matches),
        "remove" => remove_rule(&config, matches),
        "reorder" => reorder_rules(&config, matches),
        "disable" => disable(&config, matches),
        "show" => show(&config, matches),
        "evaluate" => evaluate_event(&config, matches),
        _ => unreachable!(),
    }
}

fn project_id(matches: &ArgMatches) -> Result<ProjectId> {
    matches
        .get_one::<u64>("project")
        .map(|id| ProjectId::new(*id))
        .context("this command requires a project, pass --project or set SIEVE_PROJECT")
}

fn rule_kind(matches: &ArgMatches) -> Result<RuleKind> {
    match matches.get_one::<String>("type").map(String::as_str) {
        Some("error") => Ok(RuleKind::Error),
        Some("transaction") => Ok(RuleKind::Transaction),
        other => Err(anyhow!("unknown rule type {other:?}")),
    }
}

fn rule_id(matches: &ArgMatches) -> Result<RuleId> {
    matches
        .get_one::<u32>("id")
        .map(|id| RuleId(*id))
        .context("missing rule id")
}

fn input_path(matches: &ArgMatches) -> Option<&Path> {
    matches.get_one::<PathBuf>("file").map(PathBuf::as_path)
}

/// Loads the stored rule set of the selected project.
fn open_project(config: &Config, matches: &ArgMatches) -> Result<ProjectSampling<FileSink>> {
    let project_id = project_id(matches)?;
    let sink = FileSink::new(config.storage_path());

    let rule_set = sink
        .load(project_id)
        .with_context(|| format!("failed to load the rule set of project {project_id}"))?;

    Ok(match rule_set {
        Some(rule_set) => ProjectSampling::with_rule_set(project_id, rule_set, sink),
        None => {
            sieve_log::debug!("no rule set stored for project {project_id}");
            ProjectSampling::new(project_id, sink)
        }
    })
}

fn list_categories(matches: &ArgMatches) -> Result<()> {
    let kind = rule_kind(matches)?;
    let tracing = matches.get_flag("tracing");

    let categories: Vec<&str> = allowed_categories(kind, tracing)
        .iter()
        .map(Category::as_str)
        .collect();

    utils::print_json(&categories)
}

fn validate(config: &Config, matches: &ArgMatches) -> Result<()> {
    let project = open_project(config, matches)?;
    let candidate: RuleCandidate = utils::read_json(input_path(matches))?;

    let accepted = validate_rule(&candidate, &project.snapshot())
        .with_context(|| format!("invalid rule for project {}", project.project_id()))?;

    utils::print_json(&accepted.rule)
}

fn add_rule(config: &Config, matches: &ArgMatches) -> Result<()> {
    let project = open_project(config, matches)?;
    let candidate: RuleCandidate = utils::read_json(input_path(matches))?;

    let rule = project.insert(&candidate)?;
    sieve_log::info!("rule {} added to project {}", rule.id, project.project_id());

    utils::print_json(&rule)
}

fn update_rule(config: &Config, matches: &ArgMatches) -> Result<()> {
    let project = open_project(config, matches)?;
    let id = rule_id(matches)?;
    let candidate: RuleCandidate = utils::read_json(input_path(matches))?;

    let rule = project.update(id, &candidate)?;
    sieve_log::info!("rule {id} of project {} updated", project.project_id());

    utils::print_json(&rule)
}

fn remove_rule(config: &Config, matches: &ArgMatches) -> Result<()> {
    let project = open_project(config, matches)?;
    let id = rule_id(matches)?;

    let rule = project.remove(id)?;
    sieve_log::info!("rule {id} removed from project {}", project.project_id());

    utils::print_json(&rule)
}

fn reorder_rules(config: &Config, matches: &ArgMatches) -> Result<()> {
    let project = open_project(config, matches)?;
    let kind = rule_kind(matches)?;
    let order: Vec<RuleId> = matches
        .get_many::<u32>("ids")
        .into_iter()
        .flatten()
        .map(|id| RuleId(*id))
        .collect();

    project.reorder(kind, &order)?;
    sieve_log::info!("{kind} rules of project {} reordered", project.project_id());

    utils::print_json(&SamplingConfig::from(&*project.snapshot()))
}

fn disable(config: &Config, matches: &ArgMatches) -> Result<()> {
    let project = open_project(config, matches)?;

    project.disable()?;
    sieve_log::info!("dynamic sampling disabled for project {}", project.project_id());

    utils::print_json(&SamplingConfig::from(&*project.snapshot()))
}

fn show(config: &Config, matches: &ArgMatches) -> Result<()> {
    let project = open_project(config, matches)?;
    utils::print_json(&SamplingConfig::from(&*project.snapshot()))
}

fn evaluate_event(config: &Config, matches: &ArgMatches) -> Result<()> {
    let project = open_project(config, matches)?;
    let event: Event = utils::read_json(input_path(matches))?;
    let random_source = setup::random_source(config);

    let rule_set = project.snapshot();
    let result = evaluate(&event, &rule_set, &*random_source).with_context(|| {
        format!("the rule set of project {} is corrupted", project.project_id())
    })?;

    utils::print_json(&EvaluationReport {
        kind: RuleKind::for_event(&event),
        matched: result.is_some(),
        result,
    })
}
