//! Command line definition

use clap::{value_parser, Arg, ArgAction, Command};
use std::path::PathBuf;
use triage_core::LogLevel;

fn store_arg() -> Arg {
    Arg::new("store")
        .long("store")
        .env("TRIAGE_STORE")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("Directory holding run logs and reports")
}

fn json_arg() -> Arg {
    Arg::new("json")
        .long("json")
        .action(ArgAction::SetTrue)
        .help("Output as JSON")
}

/// Build the `triage` command
pub(crate) fn build() -> Command {
    Command::new("triage")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Diagnose failed agent task runs")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit process logs as JSON"),
        )
        .subcommand(
            Command::new("diagnose")
                .about("Analyze a failed run and print the diagnostic report")
                .arg(store_arg())
                .arg(Arg::new("task").long("task").required(true).help("Task identifier"))
                .arg(Arg::new("run").long("run").required(true).help("Run identifier"))
                .arg(
                    Arg::new("config")
                        .long("config")
                        .value_parser(value_parser!(PathBuf))
                        .help("TOML configuration file"),
                )
                .arg(
                    Arg::new("no-llm")
                        .long("no-llm")
                        .action(ArgAction::SetTrue)
                        .help("Skip the language model root cause narrative"),
                )
                .arg(
                    Arg::new("force")
                        .long("force")
                        .action(ArgAction::SetTrue)
                        .help("Re-analyze even if a report exists for the run"),
                )
                .arg(
                    Arg::new("verbose")
                        .long("verbose")
                        .short('v')
                        .action(ArgAction::SetTrue)
                        .help("Include the log summary and recommendation reasons"),
                )
                .arg(json_arg()),
        )
        .subcommand(
            Command::new("show")
                .about("Print a saved report")
                .arg(Arg::new("id").required(true).help("Report identifier"))
                .arg(store_arg())
                .arg(json_arg()),
        )
        .subcommand(
            Command::new("logs")
                .about("Print a run's log")
                .arg(store_arg())
                .arg(Arg::new("run").long("run").required(true).help("Run identifier"))
                .arg(
                    Arg::new("level")
                        .long("level")
                        .value_parser(|s: &str| s.parse::<LogLevel>().map_err(|e| e.to_string()))
                        .help("Only entries at this level"),
                )
                .arg(
                    Arg::new("limit")
                        .long("limit")
                        .value_parser(value_parser!(usize))
                        .help("Maximum number of entries [default: 1000]"),
                )
                .arg(json_arg()),
        )
        .subcommand(
            Command::new("reports")
                .about("List saved reports, newest first")
                .arg(store_arg())
                .arg(Arg::new("task").long("task").help("Only reports for this task"))
                .arg(
                    Arg::new("limit")
                        .long("limit")
                        .value_parser(value_parser!(usize))
                        .help("Maximum number of reports [default: 20]"),
                )
                .arg(json_arg()),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_is_well_formed() {
        build().debug_assert();
    }

    #[test]
    fn diagnose_flags_parse() {
        let matches = build()
            .try_get_matches_from([
                "triage", "diagnose", "--store", "/tmp/s", "--task", "t1", "--run", "r1", "--no-llm", "--force",
            ])
            .unwrap();
        let (name, args) = matches.subcommand().unwrap();
        assert_eq!(name, "diagnose");
        assert!(args.get_flag("no-llm"));
        assert!(args.get_flag("force"));
        assert!(!args.get_flag("verbose"));
        assert_eq!(args.get_one::<String>("task").map(String::as_str), Some("t1"));
    }

    #[test]
    fn log_level_is_validated() {
        let ok = build().try_get_matches_from(["triage", "logs", "--store", "/tmp/s", "--run", "r1", "--level", "error"]);
        let (_, args) = ok.as_ref().unwrap().subcommand().unwrap();
        assert_eq!(args.get_one::<LogLevel>("level"), Some(&LogLevel::Error));

        let bad = build().try_get_matches_from(["triage", "logs", "--store", "/tmp/s", "--run", "r1", "--level", "loud"]);
        assert!(bad.is_err());
    }

    #[test]
    fn missing_required_args_fail() {
        assert!(build().try_get_matches_from(["triage", "diagnose", "--store", "/tmp/s"]).is_err());
    }
}
