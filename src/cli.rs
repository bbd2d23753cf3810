use crate::extractor::http::Strictness;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "routescan",
    version,
    about = "Static FastAPI endpoint extractor",
    after_help = r#"Examples:
  routescan extract --repo .
  routescan extract --repo ./service --strictness relaxed --output endpoints.json
  routescan collect --url https://github.com/rednafi/fastapi-nano
  routescan expect --input endpoints.json
"#
)]
pub struct Args {
    /// Log debug output to stderr (otherwise ROUTESCAN_LOG or `warn`).
    #[arg(long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Extract endpoints from a project already on disk.
    Extract {
        #[arg(long, default_value = ".")]
        repo: PathBuf,
        /// Name used in endpoint ids (defaults to the directory name).
        #[arg(long)]
        name: Option<String>,
        /// Accepted verbs: standard or relaxed (adds options/head).
        #[arg(long)]
        strictness: Option<Strictness>,
        /// Class whose instantiation marks the application entry point.
        #[arg(long)]
        app_class: Option<String>,
        /// Include files ignored by .gitignore.
        #[arg(long)]
        no_ignore: bool,
        /// Write JSON here instead of stdout.
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Clone a git repository, extract endpoints, then delete the clone.
    Collect {
        #[arg(long)]
        url: String,
        /// Directory for the temporary clone.
        #[arg(long)]
        workdir: Option<PathBuf>,
        #[arg(long)]
        strictness: Option<Strictness>,
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Print the review keywords each extracted endpoint is expected to trigger.
    Expect {
        /// JSON array of endpoint records.
        #[arg(long, value_name = "PATH")]
        input: PathBuf,
    },
}
