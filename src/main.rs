use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use covdiff::cli::{self, Inputs, Style};
use covdiff::diff::{
    self, ComparisonDiff, DiffFileSource, DiffSource, GitDiff, JsonDiffSource, StdinDiff,
};
use covdiff::ingest;
use covdiff::model::CoverageReport;
use covdiff::source::{FsSource, GitSource, SourceFetcher};

/// covdiff: line-level coverage comparison between two commits.
#[derive(Parser)]
#[command(name = "covdiff", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize coverage changes across every file in the head report.
    Compare {
        #[command(flatten)]
        inputs: InputArgs,

        /// Include per-line rows for every listed file.
        #[arg(long)]
        lines: bool,
    },

    /// Show the line-by-line comparison of a single file.
    File {
        /// The file path (as stored in the head coverage data).
        path: String,

        #[command(flatten)]
        inputs: InputArgs,
    },
}

#[derive(Args)]
struct InputArgs {
    /// Coverage report for the base commit.
    #[arg(long)]
    base: PathBuf,

    /// Coverage report for the head commit.
    #[arg(long)]
    head: PathBuf,

    /// Override format detection for the base report (cobertura, json, lcov).
    #[arg(long)]
    base_format: Option<String>,

    /// Override format detection for the head report (cobertura, json, lcov).
    #[arg(long)]
    head_format: Option<String>,

    /// Git diff arguments, e.g. "HEAD~1" or "main..HEAD".
    /// If no diff option is given, reads a unified diff from stdin.
    #[arg(long, group = "diff_input")]
    git_diff: Option<String>,

    /// Read a unified diff from a file.
    #[arg(long, group = "diff_input")]
    diff_file: Option<PathBuf>,

    /// Read a provider-shaped JSON diff from a file.
    #[arg(long, group = "diff_input")]
    diff_json: Option<PathBuf>,

    /// Compare without a diff: files are aligned line for line.
    #[arg(long, group = "diff_input")]
    no_diff: bool,

    /// Optional path prefix to prepend to diff paths for matching
    /// against coverage data paths.
    #[arg(long)]
    path_prefix: Option<String>,

    /// Read head source lines from this directory.
    #[arg(long, group = "source_input")]
    source_root: Option<PathBuf>,

    /// Read head source lines from this git revision.
    #[arg(long, group = "source_input")]
    source_rev: Option<String>,

    /// Output style.
    #[arg(long, value_enum, default_value_t = Style::Text)]
    style: Style,
}

impl InputArgs {
    fn load_reports(&self) -> Result<(CoverageReport, CoverageReport)> {
        let (base, _) = ingest::load_report(&self.base, self.base_format.as_deref())
            .with_context(|| format!("Failed to load base report {}", self.base.display()))?;
        let (head, _) = ingest::load_report(&self.head, self.head_format.as_deref())
            .with_context(|| format!("Failed to load head report {}", self.head.display()))?;
        Ok((base, head))
    }

    fn load_diff(&self) -> Result<Option<ComparisonDiff>> {
        if self.no_diff {
            return Ok(None);
        }

        let source: Box<dyn DiffSource> = if let Some(args) = &self.git_diff {
            Box::new(GitDiff { args: args.clone() })
        } else if let Some(path) = &self.diff_file {
            Box::new(DiffFileSource { path: path.clone() })
        } else if let Some(path) = &self.diff_json {
            Box::new(JsonDiffSource { path: path.clone() })
        } else {
            Box::new(StdinDiff)
        };

        let mut loaded = source.load()?;
        if let Some(prefix) = &self.path_prefix {
            loaded = diff::apply_path_prefix(loaded, prefix);
        }
        Ok(Some(loaded))
    }

    fn sources(&self) -> Option<Box<dyn SourceFetcher>> {
        if let Some(root) = &self.source_root {
            Some(Box::new(FsSource { root: root.clone() }))
        } else {
            self.source_rev
                .as_ref()
                .map(|rev| Box::new(GitSource { rev: rev.clone() }) as Box<dyn SourceFetcher>)
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("COVDIFF_LOG")
                .unwrap_or_else(|_| EnvFilter::new("covdiff=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Cli::parse();

    let output = match args.command {
        Commands::Compare { inputs, lines } => {
            run(&inputs, |i| cli::cmd_compare(i, inputs.style, lines))?
        }
        Commands::File { path, inputs } => {
            run(&inputs, |i| cli::cmd_file(i, &path, inputs.style))?
        }
    };

    print!("{output}");
    Ok(())
}

/// Load everything the arguments point at, then hand it to a command.
fn run(args: &InputArgs, command: impl FnOnce(&Inputs<'_>) -> Result<String>) -> Result<String> {
    let (base, head) = args.load_reports()?;
    let diff = args.load_diff()?;
    let sources = args.sources();

    let inputs = Inputs {
        base: &base,
        head: &head,
        diff: diff.as_ref(),
        sources: sources.as_deref(),
    };
    command(&inputs)
}
