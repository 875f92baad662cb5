mod embed;
mod graph;
mod pipeline;
mod retry;
mod scholar;
mod score;
mod store;

pub const USER_AGENT: &str = concat!("refscope/", env!("CARGO_PKG_VERSION"));

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use reqwest::Client;
use tracing::{error, info};

use embed::CohereClient;
use pipeline::{Refscope, RunOptions};
use scholar::ScholarClient;

/// TCP connection establishment timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Global HTTP client timeout covering DNS + connect + response body.
const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

/// Score a paper's references by relevance and draw them as an interactive graph.
///
/// Needs `COHERE_API_KEY` unless `--data` replays saved scores.
/// `SEMANTIC_SCHOLAR_API_KEY` is optional and raises the API rate limit.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Title of the paper to look up
    #[arg(short, long, default_value = "Verifiably Robust Conformal Prediction")]
    title: String,

    /// JSON file of saved citation scores (skips fetching and scoring)
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// Directory for the scores JSON and graph HTML
    #[arg(short, long, default_value = ".")]
    out_dir: PathBuf,

    /// Maximum number of references to fetch
    #[arg(long, default_value_t = 1000, value_parser = clap::value_parser!(u32).range(1..))]
    max_references: u32,

    /// Only draw the N highest-scoring references
    #[arg(long)]
    top: Option<usize>,

    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn run_options(&self) -> RunOptions {
        RunOptions {
            title: self.title.clone(),
            data: self.data.clone(),
            out_dir: self.out_dir.clone(),
            max_references: self.max_references as usize,
            top: self.top,
        }
    }
}

fn init_tracing(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let level = if verbose { "refscope=debug" } else { "refscope=info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.parse()?),
        )
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = init_tracing(cli.verbose) {
        eprintln!("failed to initialise logging: {e}");
        return ExitCode::FAILURE;
    }

    let http = match Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(HTTP_TIMEOUT)
        .build()
    {
        Ok(http) => http,
        Err(e) => {
            error!("failed to build HTTP client: {e}");
            return ExitCode::FAILURE;
        }
    };

    let scholar = ScholarClient::from_env(http.clone());
    let cohere = if cli.data.is_some() {
        None
    } else {
        // A missing key surfaces as the pipeline's ApiKeyNotSet error.
        CohereClient::from_env(http).ok()
    };

    match Refscope::new(scholar, cohere).run(&cli.run_options()).await {
        Ok(out) => {
            info!(
                paper = %out.paper.title,
                references = out.scored.len(),
                saved = ?out.saved_to,
                graph = %out.graph_path.display(),
                "done"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults() {
        let cli = Cli::try_parse_from(["refscope"]).unwrap();
        assert_eq!(cli.title, "Verifiably Robust Conformal Prediction");
        assert!(cli.data.is_none());
        assert_eq!(cli.out_dir, PathBuf::from("."));
        assert_eq!(cli.max_references, 1000);
        assert!(cli.top.is_none());
        assert!(!cli.verbose);
    }

    #[test]
    fn cli_short_flags() {
        let cli = Cli::try_parse_from([
            "refscope",
            "-t",
            "Attention Is All You Need",
            "-d",
            "saved.json",
            "-o",
            "out",
            "--top",
            "10",
            "-v",
        ])
        .unwrap();
        let opts = cli.run_options();
        assert_eq!(opts.title, "Attention Is All You Need");
        assert_eq!(opts.data, Some(PathBuf::from("saved.json")));
        assert_eq!(opts.out_dir, PathBuf::from("out"));
        assert_eq!(opts.top, Some(10));
        assert!(cli.verbose);
    }

    #[test]
    fn cli_rejects_zero_max_references() {
        assert!(Cli::try_parse_from(["refscope", "--max-references", "0"]).is_err());
    }

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
