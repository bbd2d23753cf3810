use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// One discovered route handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointRecord {
    pub id: String,
    /// Path relative to the project root, `/`-separated.
    pub source: String,
    pub method: String,
    pub route: String,
    pub function_name: String,
    pub code: String,
    pub metadata: EndpointMetadata,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointMetadata {
    pub has_async: bool,
    pub lines: usize,
}

/// Where the top-level application object is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryPoint {
    pub path: PathBuf,
    pub variable: String,
}

/// A file queued for a visit together with the names known to be router-like in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterBinding {
    pub path: PathBuf,
    pub variables: BTreeSet<String>,
}

impl RouterBinding {
    pub fn new(path: PathBuf, variable: impl Into<String>) -> Self {
        let mut variables = BTreeSet::new();
        variables.insert(variable.into());
        Self { path, variables }
    }
}

/// Result of one extraction run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Extraction {
    pub endpoints: Vec<EndpointRecord>,
    pub entry_points: Vec<EntryPoint>,
    pub files_indexed: usize,
    pub files_visited: usize,
    pub parse_errors: usize,
}
