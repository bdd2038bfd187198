//! This client submits server and dimension records to the map API and
//! prints the raw outcome of each request.
use std::{fs, path::PathBuf};

use anyhow::Context;
use chunkform::{
    config::{config_file_path, ClientConfig},
    LogReport, Outcome, Submitter,
};
use clap::{Parser, Subcommand};
use tokio::sync::oneshot;
use tracing::debug;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    /// Overrides the configured API base URL.
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Reads configuration from this file instead of the default location.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "submit a new server")]
    AddServer { name: String, ip: String },
    #[command(about = "submit a new dimension for a server")]
    AddDimension {
        name: String,
        alias: String,
        server: String,
    },
    #[command(about = "list the servers the API knows about")]
    ListServers,
    #[command(about = "list the dimensions the API knows about")]
    ListDimensions,
}

/// Loads the config file and applies the command line override.
fn load_config(cli: &Cli) -> anyhow::Result<ClientConfig> {
    let path = match &cli.config {
        Some(path) => path.clone(),
        None => config_file_path().context("couldn't find the config file path")?,
    };

    ClientConfig::load(&path, cli.base_url.clone()).context("failed to load config")
}

/// Any response counts as success. Only a transport failure fails the run.
fn finish(outcome: Outcome) -> anyhow::Result<()> {
    match outcome {
        Outcome::Load(_) => Ok(()),
        Outcome::Error(event) => Err(anyhow::Error::new(event.error).context("request failed")),
    }
}

/// Sends logs to `client.log` in the log directory. The returned guard
/// flushes the writer when dropped.
fn setup_logging(config: &ClientConfig) -> anyhow::Result<WorkerGuard> {
    let log_directory = config.log_directory()?;

    fs::create_dir_all(&log_directory).context("failed to create log directory")?;

    let appender = tracing_appender::rolling::never(&log_directory, "client.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("client=info,chunkform=info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(writer)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set global default subscriber")?;

    Ok(guard)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let _guard = setup_logging(&config)?;

    debug!("using api at {:?}", config.base_url);

    let submitter = Submitter::new(config.base_url.as_str())?;

    // log every outcome, then hand it back here for printing
    let (tx, rx) = oneshot::channel::<Outcome>();
    let reporter = move |outcome: Outcome| {
        LogReport.log(&outcome);
        let _ = tx.send(outcome);
    };

    let task = match cli.command {
        Command::AddServer { name, ip } => submitter.add_server(name, ip, reporter),
        Command::AddDimension {
            name,
            alias,
            server,
        } => submitter.add_dimension(name, alias, server, reporter),
        Command::ListServers => submitter.list_servers(reporter),
        Command::ListDimensions => submitter.list_dimensions(reporter),
    };

    task.await.context("request task did not finish")?;

    let outcome = rx.await.context("request finished without an outcome")?;

    println!("{outcome}");

    finish(outcome)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use chunkform::{ErrorEvent, LoadEvent, SubmitError};
    use reqwest::StatusCode;

    use super::*;

    fn load(status: StatusCode) -> Outcome {
        let now = Utc::now();

        Outcome::Load(LoadEvent {
            url: "http://localhost:8080/api/servers".to_string(),
            status,
            body: "Invalid server ip".to_string(),
            dispatched_at: now,
            completed_at: now,
        })
    }

    #[test]
    fn error_statuses_still_succeed() {
        assert!(finish(load(StatusCode::OK)).is_ok());
        assert!(finish(load(StatusCode::BAD_REQUEST)).is_ok());
        assert!(finish(load(StatusCode::INTERNAL_SERVER_ERROR)).is_ok());
    }

    #[test]
    fn transport_errors_fail() {
        let now = Utc::now();
        let outcome = Outcome::Error(ErrorEvent {
            url: "http://localhost:8080/api/dims".to_string(),
            error: SubmitError::NoRuntime,
            dispatched_at: now,
            completed_at: now,
        });

        let err = finish(outcome).unwrap_err();

        assert_eq!(err.to_string(), "request failed");
        assert!(err.downcast_ref::<SubmitError>().is_some());
    }

    #[test]
    fn base_url_flag_is_passed_to_config() {
        let cli = Cli::parse_from([
            "client",
            "--config",
            "/nonexistent/chunkform/config.toml",
            "--base-url",
            "ftp://maps.local",
            "list-servers",
        ]);

        assert!(load_config(&cli).is_err());

        let cli = Cli::parse_from([
            "client",
            "--config",
            "/nonexistent/chunkform/config.toml",
            "--base-url",
            "http://maps.local:9000",
            "list-servers",
        ]);

        assert_eq!(load_config(&cli).unwrap().base_url, "http://maps.local:9000");
    }
}
