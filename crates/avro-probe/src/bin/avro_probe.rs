//! `avro-probe`: encode a record and its variants against an Avro schema.
//!
//! Usage:
//!   avro-probe --config probe.toml
//!   avro-probe --schema schema.avsc --record record.json [--format json]
//!
//! Exits 1 when a variant is rejected and `--fail-on-reject` (or
//! `fail_on_reject` in the config) is set, 2 on unreadable input.

use std::path::PathBuf;
use std::process::ExitCode;

use avro_probe::config::{load_record, load_schema, ConfigError, Probe, ProbeConfig};
use avro_probe::report::{render_contracts, render_json, render_text};
use avro_probe::{default_variants, validate_variants, ContractTable, ValidationOutcome};
use clap::{Parser, ValueEnum};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("either --config or both --schema and --record are required")]
    MissingInput,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    contracts: &'a ContractTable,
    outcomes: &'a [ValidationOutcome],
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "avro-probe", version, about)]
struct Args {
    /// Probe config (TOML) naming the schema, record and variants.
    #[arg(short, long, conflicts_with_all = ["schema", "record"])]
    config: Option<PathBuf>,

    /// Avro schema (.avsc JSON).
    #[arg(short, long, requires = "record")]
    schema: Option<PathBuf>,

    /// Candidate record (JSON).
    #[arg(short, long, requires = "schema")]
    record: Option<PathBuf>,

    #[arg(short, long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Print the nullable-field contract table before the outcomes.
    #[arg(long)]
    contracts: bool,

    /// Exit with status 1 if any variant is rejected.
    #[arg(long)]
    fail_on_reject: bool,
}

fn load(args: &Args) -> Result<(Probe, bool), CliError> {
    if let Some(path) = &args.config {
        let config = ProbeConfig::load(path)?;
        let fail_on_reject = config.fail_on_reject || args.fail_on_reject;
        return Ok((Probe::load(&config)?, fail_on_reject));
    }
    match (&args.schema, &args.record) {
        (Some(schema), Some(record)) => {
            let schema = load_schema(schema)?;
            let record = load_record(record)?;
            let variants = default_variants(&record);
            Ok((
                Probe {
                    schema,
                    record,
                    variants,
                },
                args.fail_on_reject,
            ))
        }
        _ => Err(CliError::MissingInput),
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    let (probe, fail_on_reject) = match load(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(2);
        }
    };

    let outcomes = validate_variants(&probe.schema, &probe.record, &probe.variants);
    let rejected = outcomes.iter().filter(|o| !o.accepted()).count();
    log::info!("{} variants, {rejected} rejected", outcomes.len());

    match args.format {
        Format::Text => {
            if args.contracts {
                print!("{}", render_contracts(probe.schema.contracts()));
                println!();
            }
            print!("{}", render_text(&outcomes));
        }
        Format::Json => {
            let rendered = if args.contracts {
                serde_json::to_string_pretty(&JsonReport {
                    contracts: probe.schema.contracts(),
                    outcomes: &outcomes,
                })
            } else {
                render_json(&outcomes)
            };
            match rendered {
                Ok(json) => println!("{json}"),
                Err(e) => {
                    eprintln!("{e}");
                    return ExitCode::from(2);
                }
            }
        }
    }

    if fail_on_reject && rejected > 0 {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}
