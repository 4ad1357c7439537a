// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::BTreeMap;

use abusefilter::unstable::{tokenize, Source, TokenKind};
use abusefilter::*;
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;

/// A filter as written in a filters file.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct FilterSpec {
    id: u64,
    rules: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    group: Option<String>,
    #[serde(default)]
    flags: Option<FilterFlags>,
    #[serde(default)]
    actions: BTreeMap<String, Vec<String>>,
}

fn read_file(file: &str) -> Result<String> {
    std::fs::read_to_string(file).with_context(|| format!("Failed to read {file}"))
}

fn parse_data<T: for<'de> Deserialize<'de>>(file: &str) -> Result<T> {
    let contents = read_file(file)?;
    Ok(if file.ends_with(".json") {
        serde_json::from_str(&contents)?
    } else if file.ends_with(".yaml") || file.ends_with(".yml") {
        serde_yaml::from_str(&contents)?
    } else {
        bail!("Unsupported file `{file}`. Must be json or yaml.")
    })
}

fn load_vars(file: Option<String>) -> Result<VariableHolder> {
    let mut holder = VariableHolder::new();
    if let Some(file) = file {
        let vars: BTreeMap<String, Value> = parse_data(&file)?;
        for (name, value) in vars {
            holder.set_var(&name, value);
        }
    }
    Ok(holder)
}

fn rule_text(rule: Option<String>, file: Option<String>) -> Result<String> {
    match (rule, file) {
        (Some(rule), None) => Ok(rule),
        (None, Some(file)) => read_file(&file),
        _ => bail!("Specify either a rule or a rule file"),
    }
}

fn filter_check(rule: String) -> Result<()> {
    let engine = Engine::default();
    let result = engine.check_syntax(&rule)?;
    if let Some(error) = &result.error {
        println!("{error}");
    } else {
        println!("ok");
    }
    for warning in &result.warnings {
        println!("warning: {warning}");
    }
    Ok(())
}

fn filter_lex(rule: String) -> Result<()> {
    let source = Source::from_contents("<rule>".to_string(), rule)?;
    for token in tokenize(&source)? {
        if token.0 == TokenKind::Eof {
            break;
        }
        println!("{:?} {:?} {}", token.0, token.1.text(), token.2);
    }
    Ok(())
}

fn filter_eval(rule: String, vars: Option<String>) -> Result<()> {
    let mut engine = Engine::default();
    if vars.is_none() {
        let value = engine.evaluate_expression(&rule)?;
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }
    let mut holder = load_vars(vars)?;
    let matched = engine.check_conditions(&rule, &mut holder, &NoSource)?;
    println!("{}", if matched { "match" } else { "no match" });
    Ok(())
}

fn filter_run(
    filters: String,
    vars: Option<String>,
    group: String,
    config: Option<String>,
    user_id: u64,
    registration: Option<String>,
) -> Result<()> {
    let config = match config {
        Some(file) => parse_data(&file)?,
        None => EngineConfig::default(),
    };
    let engine = Engine::new(config);

    let specs: Vec<FilterSpec> = parse_data(&filters)?;
    let mut store = MemoryFilterSource::new();
    for spec in specs {
        let mut filter = Filter::new(spec.id, &spec.rules);
        if let Some(name) = &spec.name {
            filter = filter.with_name(name);
        }
        if let Some(group) = &spec.group {
            filter = filter.with_group(group);
        }
        if let Some(flags) = spec.flags {
            filter = filter.with_flags(flags);
        }
        filter = filter.with_actions_source(ActionsSource::Loaded(spec.actions));
        store.add(filter);
    }

    let sink = MemorySink::new();
    let session = MemorySession::new();
    let host = Host {
        filters: &store,
        variables: &NoSource,
        sink: &sink,
        session: &session,
        cache: None,
    };

    let mut holder = load_vars(vars)?;
    let action = ActionContext::from_vars(&holder, user_id, registration);
    let mut tags = TagCollector::new();
    let outcome = engine.run_filters(&host, &mut holder, &group, &action, &mut tags)?;

    for (id, profile) in &outcome.run.profiles {
        let verdict = match (&profile.error, profile.matched) {
            (Some(e), _) => format!("error: {e}"),
            (None, true) => "match".to_string(),
            (None, false) => "no match".to_string(),
        };
        println!(
            "filter {id}: {verdict} ({} conditions, {}us)",
            profile.conditions,
            profile.elapsed.as_micros()
        );
    }
    println!("conditions used: {}", outcome.run.conditions);
    if outcome.run.condition_limit_reached {
        println!("condition limit reached");
    }
    for message in &outcome.consequences.messages {
        println!("message: {} {:?}", message.key, message.params);
    }
    for (id, taken) in &outcome.consequences.taken {
        println!("filter {id} took: {}", taken.join(", "));
    }
    for block in sink.blocks() {
        println!("block: {block:?}");
    }
    for tag in tags.flush() {
        println!("tag: {tag}");
    }
    println!("vetoed: {}", outcome.vetoed());
    Ok(())
}

#[derive(Subcommand)]
enum FilterCommand {
    /// Check the syntax of a filter.
    Check {
        /// Filter text.
        rule: Option<String>,

        /// File containing the filter.
        #[arg(long, short)]
        file: Option<String>,
    },

    /// Tokenize a filter.
    Lex {
        /// Filter text.
        rule: String,
    },

    /// Evaluate a filter or an expression.
    Eval {
        /// Variables of the action. json or yaml.
        #[arg(long, short, value_name = "vars.json|vars.yaml")]
        vars: Option<String>,

        /// Filter text.
        rule: Option<String>,

        /// File containing the filter.
        #[arg(long, short)]
        file: Option<String>,
    },

    /// Run a group of filters and execute their consequences in memory.
    Run {
        /// Filters file. json or yaml.
        #[arg(long, short, value_name = "filters.yaml")]
        filters: String,

        /// Variables of the action. json or yaml.
        #[arg(long, short, value_name = "vars.json|vars.yaml")]
        vars: Option<String>,

        /// Filter group.
        #[arg(long, short, default_value = "default")]
        group: String,

        /// Engine configuration. json or yaml.
        #[arg(long, short)]
        config: Option<String>,

        /// Account id of the acting user. 0 for anonymous users.
        #[arg(long, default_value_t = 0)]
        user_id: u64,

        /// Registration timestamp of the acting user.
        #[arg(long)]
        registration: Option<String>,
    },
}

#[derive(clap::Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: FilterCommand,
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        FilterCommand::Check { rule, file } => filter_check(rule_text(rule, file)?),
        FilterCommand::Lex { rule } => filter_lex(rule),
        FilterCommand::Eval { vars, rule, file } => filter_eval(rule_text(rule, file)?, vars),
        FilterCommand::Run {
            filters,
            vars,
            group,
            config,
            user_id,
            registration,
        } => filter_run(filters, vars, group, config, user_id, registration),
    }
}
