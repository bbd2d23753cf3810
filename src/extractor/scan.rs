use crate::util;
use ignore::WalkBuilder;
use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const SKIPPED_DIRS: &[&str] = &[
    ".git",
    ".venv",
    "venv",
    "site-packages",
    "node_modules",
    "__pycache__",
];

#[derive(Debug, Clone)]
pub struct ScannedFile {
    pub rel_path: String,
    pub abs_path: PathBuf,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ScanOptions {
    pub no_ignore: bool,
}

impl ScanOptions {
    pub fn new(no_ignore: bool) -> Self {
        Self { no_ignore }
    }
}

/// Every `.py` file under `repo_root`, sorted by relative path.
pub fn scan_python_files(repo_root: &Path, options: ScanOptions) -> Vec<ScannedFile> {
    let mut files = Vec::new();
    let mut builder = WalkBuilder::new(repo_root);
    if options.no_ignore {
        builder
            .ignore(false)
            .git_ignore(false)
            .git_global(false)
            .git_exclude(false)
            .parents(false);
    } else {
        builder
            .ignore(true)
            .git_ignore(true)
            .git_global(false)
            .git_exclude(true)
            .parents(false)
            .require_git(false);
    }
    let walker = builder
        .hidden(false)
        .filter_entry(|entry| !is_skipped_entry(entry))
        .build();

    for entry in walker {
        let entry = match entry {
            Ok(value) => value,
            Err(err) => {
                warn!(error = %err, "walk error");
                continue;
            }
        };
        if !entry.file_type().map(|ft| ft.is_file()).unwrap_or(false) {
            continue;
        }
        let path = entry.path();
        if path.extension() != Some(OsStr::new("py")) {
            continue;
        }
        let rel_path = match util::normalize_rel_path(repo_root, path) {
            Ok(value) => value,
            Err(err) => {
                debug!(path = %path.display(), error = %err, "skipping file outside root");
                continue;
            }
        };
        files.push(ScannedFile {
            rel_path,
            abs_path: path.to_path_buf(),
        });
    }
    files.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
    files
}

fn is_skipped_entry(entry: &ignore::DirEntry) -> bool {
    let is_dir = entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false);
    is_dir
        && SKIPPED_DIRS
            .iter()
            .any(|name| entry.file_name() == OsStr::new(name))
}

/// `a/b/c.py` -> `a.b.c`, `a/b/__init__.py` -> `a.b`.
pub fn module_name_from_rel_path(rel_path: &str) -> String {
    let path = Path::new(rel_path);
    let mut parts: Vec<String> = path
        .components()
        .filter_map(|comp| comp.as_os_str().to_str().map(|s| s.to_string()))
        .collect();
    if parts.is_empty() {
        return "__init__".to_string();
    }
    let file = parts.pop().unwrap_or_default();
    let stem = Path::new(&file)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(&file)
        .to_string();
    if stem != "__init__" {
        parts.push(stem);
    }
    if parts.is_empty() {
        "__init__".to_string()
    } else {
        parts.join(".")
    }
}

/// Dotted module name -> absolute file path for one project root.
#[derive(Debug, Clone, Default)]
pub struct ModuleMap {
    modules: BTreeMap<String, PathBuf>,
}

impl ModuleMap {
    pub fn build(files: &[ScannedFile]) -> Self {
        let mut modules = BTreeMap::new();
        for file in files {
            let name = module_name_from_rel_path(&file.rel_path);
            // `pkg.py` and `pkg/__init__.py` both claim `pkg`; the first in path order wins.
            modules
                .entry(name)
                .or_insert_with(|| file.abs_path.clone());
        }
        Self { modules }
    }

    pub fn get(&self, module: &str) -> Option<&Path> {
        self.modules.get(module).map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_names_strip_init() {
        assert_eq!(module_name_from_rel_path("foo.py"), "foo");
        assert_eq!(module_name_from_rel_path("pkg/__init__.py"), "pkg");
        assert_eq!(module_name_from_rel_path("pkg/sub/mod.py"), "pkg.sub.mod");
        assert_eq!(module_name_from_rel_path("__init__.py"), "__init__");
    }

    #[test]
    fn scan_skips_virtualenvs_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("app/api")).unwrap();
        std::fs::create_dir_all(root.join(".venv/lib")).unwrap();
        std::fs::write(root.join("app/api/users.py"), "").unwrap();
        std::fs::write(root.join("app/__init__.py"), "").unwrap();
        std::fs::write(root.join("main.py"), "").unwrap();
        std::fs::write(root.join("README.md"), "").unwrap();
        std::fs::write(root.join(".venv/lib/fastapi.py"), "").unwrap();

        let files = scan_python_files(root, ScanOptions::default());
        let rels: Vec<_> = files.iter().map(|f| f.rel_path.as_str()).collect();
        assert_eq!(rels, vec!["app/__init__.py", "app/api/users.py", "main.py"]);

        let map = ModuleMap::build(&files);
        assert_eq!(map.len(), 3);
        assert_eq!(map.get("app"), Some(root.join("app/__init__.py").as_path()));
        assert_eq!(
            map.get("app.api.users"),
            Some(root.join("app/api/users.py").as_path())
        );
        assert!(map.get("app.api").is_none());
    }
}
