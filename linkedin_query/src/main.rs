use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use linkedin_query::cli::{self, QueryArgs};
use linkedin_query::config::QueryConfig;
use linkedin_query::telemetry;
use serde::Serialize;
use std::io::Write;
use std::process::ExitCode;

fn main() -> ExitCode {
    telemetry::init_tracing();

    let args = QueryArgs::parse();
    let config = QueryConfig::from_env();

    match cli::run(&args, &config, Utc::now()) {
        Ok(response) => match emit(&response) {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                tracing::error!(error = ?err, "failed to write response");
                ExitCode::FAILURE
            }
        },
        Err(err) => {
            tracing::debug!(error = ?err, "query failed");
            if let Err(write_err) = emit(&serde_json::json!({ "error": format!("{err:#}") })) {
                tracing::error!(error = ?write_err, "failed to write error response");
            }
            ExitCode::FAILURE
        }
    }
}

fn emit<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value)?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{rendered}")?;
    Ok(())
}
