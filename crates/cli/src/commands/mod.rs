//! CLI command definitions and execution
//!
//! Each command loads the configuration, builds fresh clients and runs one
//! sequential flow. Failures are reported through the formatter and mapped to
//! an [`ExitCode`].

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use mlink_core::{AppConfig, CancellationToken, ConfigLoader, Error};
use mlink_s3::S3Client;
use mlink_yourls::YourlsClient;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

mod completions;
mod download;
mod list;
mod upload;

/// mlink - share files through S3 and YOURLS
///
/// Uploads files to S3-compatible storage, shortens the resulting links with
/// YOURLS, and downloads files again from their short links.
#[derive(Parser, Debug)]
#[command(name = "mlink")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Env file to read configuration from
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory for the log file
    #[arg(short, long, global = true, value_name = "DIR")]
    pub logs: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true, default_value = "false")]
    pub debug: bool,

    /// Output format: human-readable or JSON
    #[arg(long, global = true, default_value = "false")]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true, default_value = "false")]
    pub no_color: bool,

    /// Disable the spinner
    #[arg(long, global = true, default_value = "false")]
    pub no_progress: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, default_value = "false")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Upload a file and shorten its link
    Upload(upload::UploadArgs),

    /// Download a file through its short link
    Download(download::DownloadArgs),

    /// List the links mlink created and the state of their files
    List(list::ListArgs),

    /// Generate shell completion scripts
    Completions(completions::CompletionsArgs),
}

/// State shared by the commands of one invocation
pub struct CommandContext {
    pub env_file: Option<PathBuf>,
    pub output: OutputConfig,
    pub cancel: CancellationToken,
}

impl CommandContext {
    pub fn formatter(&self) -> Formatter {
        Formatter::new(self.output.clone())
    }

    /// Load the configuration and warn about plaintext endpoints
    pub fn load_config(&self, formatter: &Formatter) -> Result<AppConfig, ExitCode> {
        let loader = match &self.env_file {
            Some(path) => ConfigLoader::with_env_file(path),
            None => ConfigLoader::new(),
        };

        let config = loader
            .load()
            .map_err(|e| report(formatter, "Failed to load configuration", &e))?;
        tracing::debug!(%config, "loaded config");

        if !config.storage.is_tls() {
            tracing::warn!("storage endpoint not using TLS");
            formatter.warning("Storage endpoint is not using SSL / TLS (INSECURE)");
        }
        if !config.shortener.is_tls() {
            tracing::warn!("shortener endpoint not using TLS");
            formatter.warning("YOURLS endpoint is not using SSL / TLS (INSECURE)");
        }

        Ok(config)
    }

    pub async fn object_store(
        &self,
        config: &AppConfig,
        formatter: &Formatter,
    ) -> Result<S3Client, ExitCode> {
        S3Client::new(&config.storage)
            .await
            .map_err(|e| report(formatter, "Failed to create S3 client", &e))
    }

    pub fn shortener(
        &self,
        config: &AppConfig,
        formatter: &Formatter,
    ) -> Result<YourlsClient, ExitCode> {
        YourlsClient::new(&config.shortener)
            .map_err(|e| report(formatter, "Failed to create YOURLS client", &e))
    }
}

/// Print and log a failure, returning its exit code
pub(crate) fn report(formatter: &Formatter, context: &str, err: &Error) -> ExitCode {
    let code = ExitCode::from(err);
    tracing::error!(error = %err, exit_code = code.as_i32(), "{context}");

    if matches!(err, Error::Cancelled) {
        formatter.error("Interrupted");
    } else {
        formatter.error(&format!("{context}: {err}"));
    }
    code
}

/// Execute the CLI command and return an exit code
pub async fn execute(cli: Cli, cancel: CancellationToken) -> ExitCode {
    let ctx = CommandContext {
        env_file: cli.config,
        output: OutputConfig {
            json: cli.json,
            no_color: cli.no_color,
            no_progress: cli.no_progress,
            quiet: cli.quiet,
        },
        cancel,
    };

    match cli.command {
        Commands::Upload(args) => upload::execute(args, &ctx).await,
        Commands::Download(args) => download::execute(args, &ctx).await,
        Commands::List(args) => list::execute(args, &ctx).await,
        Commands::Completions(args) => completions::execute(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_upload_private() {
        let cli = Cli::try_parse_from(["mlink", "upload", "report.pdf", "-p"]).unwrap();
        match cli.command {
            Commands::Upload(args) => {
                assert_eq!(args.path, PathBuf::from("report.pdf"));
                assert!(args.private);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_download_with_filepath() {
        let cli = Cli::try_parse_from([
            "mlink",
            "--config",
            "prod.env",
            "download",
            "https://sho.rt/abc",
            "-f",
            "out/report.pdf",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("prod.env")));
        match cli.command {
            Commands::Download(args) => {
                assert_eq!(args.link, "https://sho.rt/abc");
                assert_eq!(args.filepath, Some(PathBuf::from("out/report.pdf")));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_list_limit() {
        let cli = Cli::try_parse_from(["mlink", "list", "-i", "5", "--json"]).unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::List(args) => assert_eq!(args.limit, 5),
            other => panic!("unexpected command: {other:?}"),
        }

        let cli = Cli::try_parse_from(["mlink", "list"]).unwrap();
        match cli.command {
            Commands::List(args) => assert_eq!(args.limit, 20),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_upload_requires_path() {
        assert!(Cli::try_parse_from(["mlink", "upload"]).is_err());
    }
}
