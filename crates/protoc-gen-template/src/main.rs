//! protoc-gen-template
//!
//! protoc plugin that renders one user-supplied Tera template per input
//! `.proto` file. protoc writes a `CodeGeneratorRequest` to stdin and reads a
//! `CodeGeneratorResponse` from stdout:
//!
//! ```text
//! protoc --template_out=service,format:gen --plugin=protoc-gen-template api.proto
//! ```
//!
//! stdout carries only the protocol response; diagnostics go to stderr.

mod cli_config;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use protogen_core::{FsTemplateSource, Generator};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Debug, Parser)]
#[command(name = "protoc-gen-template")]
#[command(
    version,
    about = "Render Tera templates for each .proto file in a protoc request",
    long_about = None
)]
struct Cli {
    /// Path to a config file
    /// (default: ./.protoc-gen-template.toml, then ~/.config/protoc-gen-template.toml)
    #[arg(long, env = "PROTOC_GEN_TEMPLATE_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Directory to search for templates, before configured paths (repeatable)
    #[arg(long = "template-dir", value_name = "DIR")]
    template_dirs: Vec<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Failed: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let loaded = cli_config::load_config(cli.config.as_deref())?;
    init_tracing(loaded.config.log_filter.as_deref());
    loaded.report();

    let search_paths: Vec<PathBuf> = cli
        .template_dirs
        .into_iter()
        .chain(
            loaded
                .config
                .template_paths
                .iter()
                .map(|path| cli_config::expand_path(path)),
        )
        .collect();
    tracing::debug!(?search_paths, "Template search paths");

    let source = FsTemplateSource::with_search_paths(search_paths);
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    Generator::new(source).run_io(stdin.lock(), stdout.lock())?;
    Ok(())
}

/// Log to stderr. `RUST_LOG` wins over the configured filter.
fn init_tracing(configured: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(configured.unwrap_or(DEFAULT_LOG_FILTER)))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_accepts_no_arguments() {
        let cli = Cli::try_parse_from(["protoc-gen-template"]).unwrap();
        assert!(cli.template_dirs.is_empty());
    }

    #[test]
    fn test_cli_repeatable_template_dirs() {
        let cli = Cli::try_parse_from([
            "protoc-gen-template",
            "--template-dir",
            "a",
            "--template-dir",
            "b",
            "--config",
            "plugin.toml",
        ])
        .unwrap();
        assert_eq!(cli.template_dirs, vec![PathBuf::from("a"), PathBuf::from("b")]);
        assert_eq!(cli.config, Some(PathBuf::from("plugin.toml")));
    }

    #[test]
    fn test_cli_verifies() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
