use anyhow::{Context, Result};
use clap::Parser;
use routescan::checkout::RepoCheckout;
use routescan::config::Config;
use routescan::extractor::{self, ExtractOptions, scan::ScanOptions};
use routescan::model::EndpointRecord;
use routescan::{cli, heuristics, util};
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("routescan=debug")
    } else {
        EnvFilter::try_from_env("ROUTESCAN_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn write_output(value: &serde_json::Value, output: Option<&Path>) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => std::fs::write(path, rendered + "\n")
            .with_context(|| format!("write {}", path.display())),
        None => {
            println!("{rendered}");
            Ok(())
        }
    }
}

fn main() -> Result<()> {
    let args = cli::Args::parse();
    init_tracing(args.verbose);
    let config = Config::get();

    match args.command {
        cli::Command::Extract {
            repo,
            name,
            strictness,
            app_class,
            no_ignore,
            output,
        } => {
            let mut options = ExtractOptions::from_config(config);
            options.repo_name = name;
            options.scan = ScanOptions::new(no_ignore);
            if let Some(strictness) = strictness {
                options.strictness = strictness;
            }
            if let Some(app_class) = app_class {
                options.app_class = app_class;
            }
            let endpoints = extractor::extract_endpoints(&repo, options)?;
            write_output(&serde_json::to_value(&endpoints)?, output.as_deref())
        }
        cli::Command::Collect {
            url,
            workdir,
            strictness,
            output,
        } => {
            let workdir = workdir.unwrap_or_else(|| PathBuf::from(&config.workdir));
            let mut checkout = RepoCheckout::clone(&url, &workdir)?;
            let mut options = ExtractOptions::from_config(config);
            options.repo_name = Some(checkout.name().to_string());
            if let Some(strictness) = strictness {
                options.strictness = strictness;
            }
            // Keep the result until the clone is gone; cleanup runs on every path.
            let extracted = extractor::extract_endpoints(checkout.path(), options);
            checkout.cleanup()?;
            write_output(&serde_json::to_value(&extracted?)?, output.as_deref())
        }
        cli::Command::Expect { input } => {
            let raw = util::read_to_string(&input)?;
            let endpoints: Vec<EndpointRecord> = serde_json::from_str(&raw)
                .with_context(|| format!("parse endpoint records from {}", input.display()))?;
            let expectations: Vec<_> = endpoints
                .iter()
                .map(|endpoint| {
                    json!({
                        "id": endpoint.id,
                        "expected_keywords": heuristics::expected_keywords(&endpoint.code),
                    })
                })
                .collect();
            write_output(&json!(expectations), None)
        }
    }
}
