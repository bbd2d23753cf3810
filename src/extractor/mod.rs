//! Static FastAPI route extraction.
//!
//! Stages: scan and index modules, find the application entry points, walk
//! `include_router` edges from them, and collect decorated route handlers in
//! every file reached. Target code is parsed, never executed. Per-file
//! problems (unreadable files, syntax errors, unresolvable imports) are logged
//! and skipped so a run always yields a possibly incomplete list.

use crate::config::Config;
use crate::model::{EndpointRecord, Extraction};
use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use tracing::info;

pub mod endpoints;
pub mod entry;
pub mod graph;
pub mod http;
pub mod imports;
pub mod scan;
pub mod source;
pub mod syntax;

#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Name used in endpoint ids; defaults to the project directory name.
    pub repo_name: Option<String>,
    pub strictness: http::Strictness,
    pub app_class: String,
    pub max_file_bytes: u64,
    pub scan: scan::ScanOptions,
}

impl ExtractOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            repo_name: None,
            strictness: config.strictness,
            app_class: config.app_class.clone(),
            max_file_bytes: config.max_file_bytes,
            scan: scan::ScanOptions::default(),
        }
    }
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// One extraction over one project root. Consumed by [`RouteExtractor::run`].
pub struct RouteExtractor {
    repo_root: PathBuf,
    repo_name: String,
    options: ExtractOptions,
}

impl RouteExtractor {
    pub fn new(repo_root: impl Into<PathBuf>, options: ExtractOptions) -> Result<Self> {
        let repo_root = repo_root.into();
        if !repo_root.is_dir() {
            bail!("project root {} is not a directory", repo_root.display());
        }
        let repo_root = std::fs::canonicalize(&repo_root)
            .with_context(|| format!("canonicalize {}", repo_root.display()))?;
        let repo_name = options
            .repo_name
            .clone()
            .unwrap_or_else(|| repo_name_from_root(&repo_root));
        Ok(Self {
            repo_root,
            repo_name,
            options,
        })
    }

    pub fn repo_name(&self) -> &str {
        &self.repo_name
    }

    pub fn run(self) -> Result<Extraction> {
        let files = scan::scan_python_files(&self.repo_root, self.options.scan);
        let modules = scan::ModuleMap::build(&files);
        let mut cache = source::SourceCache::new(&self.repo_root, self.options.max_file_bytes)?;

        let entry_points = entry::find_entry_points(&mut cache, &files, &self.options.app_class);
        let resolver = imports::ImportResolver::new(&self.repo_root, &modules);
        let walker =
            graph::RouterGraphWalker::new(resolver, self.options.strictness, &self.repo_name);
        let outcome = walker.walk(&mut cache, &entry_points);

        info!(
            repo = %self.repo_name,
            files = files.len(),
            entry_points = entry_points.len(),
            visited = outcome.bindings.len(),
            endpoints = outcome.endpoints.len(),
            parse_errors = cache.parse_errors(),
            "extraction finished"
        );
        Ok(Extraction {
            endpoints: outcome.endpoints,
            entry_points,
            files_indexed: files.len(),
            files_visited: outcome.bindings.len(),
            parse_errors: cache.parse_errors(),
        })
    }
}

/// Extract every endpoint record reachable from the project's entry points.
pub fn extract_endpoints(repo_root: &Path, options: ExtractOptions) -> Result<Vec<EndpointRecord>> {
    Ok(RouteExtractor::new(repo_root, options)?.run()?.endpoints)
}

fn repo_name_from_root(repo_root: &Path) -> String {
    repo_root
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .unwrap_or("repo")
        .to_string()
}
