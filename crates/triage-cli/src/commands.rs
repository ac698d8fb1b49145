//! Subcommand handlers

use crate::render;
use anyhow::{anyhow, Context, Result};
use clap::ArgMatches;
use std::path::PathBuf;
use std::sync::Arc;
use triage_agent::{CancellationToken, DiagnosticAgent, DiagnosticConfig, HttpLlmProvider};
use triage_core::{LogLevel, ReportId, RunId, TaskId};
use triage_store::{
    FileStore, LogQuery, ReportQuery, ReportStore, RunLogStore, DEFAULT_LOG_LIMIT, DEFAULT_REPORT_LIMIT,
};

fn open_store(args: &ArgMatches) -> Result<Arc<FileStore>> {
    let dir = args
        .get_one::<PathBuf>("store")
        .ok_or_else(|| anyhow!("--store is required"))?;
    let store = FileStore::open(dir).with_context(|| format!("cannot open store at {}", dir.display()))?;
    Ok(Arc::new(store))
}

fn string_arg<'a>(args: &'a ArgMatches, name: &str) -> Result<&'a str> {
    args.get_one::<String>(name)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("--{name} is required"))
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// `triage diagnose`
pub(crate) async fn diagnose(args: &ArgMatches) -> Result<()> {
    let store = open_store(args)?;
    let task_id = TaskId::new(string_arg(args, "task")?);
    let run_id = RunId::new(string_arg(args, "run")?);
    let verbose = args.get_flag("verbose");
    let json = args.get_flag("json");

    let mut config = match args.get_one::<PathBuf>("config") {
        Some(path) => DiagnosticConfig::from_file(path)
            .with_context(|| format!("cannot load config {}", path.display()))?,
        None => DiagnosticConfig::default(),
    };
    if args.get_flag("no-llm") {
        config.llm_enabled = false;
    }

    if !args.get_flag("force") {
        if let Some(existing) = store.latest_report(Some(&task_id), Some(&run_id))? {
            tracing::info!(report_id = %existing.id, "reusing existing report; pass --force to re-analyze");
            return output_report(&existing, verbose, json);
        }
    }

    let mut agent = DiagnosticAgent::new(store.clone(), store.clone(), config.clone());
    if config.llm_enabled {
        agent = attach_provider(agent, &config);
    }

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted; finishing with rule-based analysis");
            on_interrupt.cancel();
        }
    });

    let report = agent
        .analyze_with_cancellation(&task_id, &run_id, &cancel)
        .await
        .context("diagnosis failed")?;
    output_report(&report, verbose, json)
}

fn attach_provider(agent: DiagnosticAgent, config: &DiagnosticConfig) -> DiagnosticAgent {
    if std::env::var(&config.llm.api_key_env).map_or(true, |key| key.trim().is_empty()) {
        tracing::info!(
            env = %config.llm.api_key_env,
            "no API key set; language model narrative disabled"
        );
        return agent;
    }
    match HttpLlmProvider::new(config.llm.clone(), config.llm_timeout()) {
        Ok(provider) => agent.with_llm_provider(Arc::new(provider)),
        Err(e) => {
            tracing::warn!(error = %e, "language model provider unavailable");
            agent
        }
    }
}

fn output_report(report: &triage_core::DiagnosticReport, verbose: bool, json: bool) -> Result<()> {
    if json {
        print_json(report)
    } else {
        print!("{}", render::report(report, verbose));
        Ok(())
    }
}

/// `triage show`
pub(crate) fn show(args: &ArgMatches) -> Result<()> {
    let store = open_store(args)?;
    let raw = string_arg(args, "id")?;
    let id: ReportId = raw.parse().with_context(|| format!("invalid report id {raw:?}"))?;

    let report = store
        .get_report(&id)?
        .ok_or_else(|| anyhow!("report not found: {id}"))?;
    output_report(&report, true, args.get_flag("json"))
}

/// `triage logs`
pub(crate) fn logs(args: &ArgMatches) -> Result<()> {
    let store = open_store(args)?;
    let run_id = RunId::new(string_arg(args, "run")?);

    let mut query = LogQuery::all();
    if let Some(level) = args.get_one::<LogLevel>("level") {
        query = query.with_level(*level);
    }
    let limit = args.get_one::<usize>("limit").copied().unwrap_or(DEFAULT_LOG_LIMIT);
    query = query.with_limit(limit);

    let entries = store.query_logs(&run_id, &query)?;
    if args.get_flag("json") {
        print_json(&entries)
    } else {
        print!("{}", render::logs(&entries));
        Ok(())
    }
}

/// `triage reports`
pub(crate) fn reports(args: &ArgMatches) -> Result<()> {
    let store = open_store(args)?;

    let mut query = ReportQuery::new();
    if let Some(task) = args.get_one::<String>("task") {
        query = query.for_task(TaskId::new(task.as_str()));
    }
    let limit = args.get_one::<usize>("limit").copied().unwrap_or(DEFAULT_REPORT_LIMIT);
    query = query.with_limit(limit);

    let reports = store.list_reports(&query)?;
    if args.get_flag("json") {
        print_json(&reports)
    } else {
        print!("{}", render::report_list(&reports));
        Ok(())
    }
}
