use crate::extractor::scan::ScannedFile;
use crate::extractor::source::SourceCache;
use crate::extractor::syntax::node_text;
use crate::model::EntryPoint;
use std::path::Path;
use tree_sitter::Node;
use tracing::{debug, info};

const FALLBACK_FILES: &[&str] = &["main.py", "app.py"];
const FALLBACK_VARIABLE: &str = "app";

/// Files creating the application object at module level, one variable per file.
///
/// When nothing matches, every `main.py`/`app.py` is assumed to define `app`.
pub fn find_entry_points(
    cache: &mut SourceCache,
    files: &[ScannedFile],
    app_class: &str,
) -> Vec<EntryPoint> {
    let mut entries = Vec::new();
    for file in files {
        let Some(text) = cache.text(&file.abs_path) else {
            continue;
        };
        if !text.contains(app_class) {
            continue;
        }
        let Some(parsed) = cache.parsed(&file.abs_path) else {
            continue;
        };
        if let Some(variable) = app_assignment(parsed.tree.root_node(), &parsed.source, app_class) {
            debug!(path = %file.rel_path, variable = %variable, "entry point");
            entries.push(EntryPoint {
                path: file.abs_path.clone(),
                variable,
            });
        }
    }
    if entries.is_empty() {
        entries = fallback_entry_points(files);
        if !entries.is_empty() {
            info!(count = entries.len(), "no {app_class}() assignment found, using fallback files");
        }
    }
    entries
}

fn fallback_entry_points(files: &[ScannedFile]) -> Vec<EntryPoint> {
    files
        .iter()
        .filter(|file| is_fallback_file(&file.abs_path))
        .map(|file| EntryPoint {
            path: file.abs_path.clone(),
            variable: FALLBACK_VARIABLE.to_string(),
        })
        .collect()
}

fn is_fallback_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| FALLBACK_FILES.contains(&name))
}

/// Left-hand name of the first `name = <app_class>(...)` statement at module level.
fn app_assignment(root: Node<'_>, source: &str, app_class: &str) -> Option<String> {
    let mut cursor = root.walk();
    for stmt in root.named_children(&mut cursor) {
        if stmt.kind() != "expression_statement" {
            continue;
        }
        let Some(assignment) = stmt.named_child(0) else {
            continue;
        };
        if let Some(name) = simple_assignment(assignment, source) {
            let Some(right) = assignment.child_by_field_name("right") else {
                continue;
            };
            if is_constructor_call(right, source, app_class) {
                return Some(name);
            }
        }
    }
    None
}

/// Target of `name = value` with a single bare-name target and no annotation.
pub(crate) fn simple_assignment(node: Node<'_>, source: &str) -> Option<String> {
    if node.kind() != "assignment" || node.child_by_field_name("type").is_some() {
        return None;
    }
    let left = node.child_by_field_name("left")?;
    if left.kind() != "identifier" {
        return None;
    }
    node.child_by_field_name("right")?;
    Some(node_text(left, source))
}

fn is_constructor_call(node: Node<'_>, source: &str, class_name: &str) -> bool {
    if node.kind() != "call" {
        return false;
    }
    let Some(function) = node.child_by_field_name("function") else {
        return false;
    };
    match function.kind() {
        "identifier" => node_text(function, source) == class_name,
        "attribute" => function
            .child_by_field_name("attribute")
            .is_some_and(|attr| node_text(attr, source) == class_name),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::scan::{ScanOptions, scan_python_files};

    fn write(root: &Path, rel: &str, body: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, body).unwrap();
    }

    fn entries_for(root: &Path) -> Vec<(String, String)> {
        let files = scan_python_files(root, ScanOptions::default());
        let mut cache = SourceCache::new(root, 1 << 20).unwrap();
        find_entry_points(&mut cache, &files, "FastAPI")
            .into_iter()
            .map(|entry| {
                let rel = crate::util::normalize_rel_path(root, &entry.path).unwrap();
                (rel, entry.variable)
            })
            .collect()
    }

    #[test]
    fn finds_first_top_level_app_per_file() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "server.py",
            "import fastapi\napplication = fastapi.FastAPI()\nsecond = FastAPI()\n",
        );
        write(
            dir.path(),
            "factory.py",
            "from fastapi import FastAPI\ndef create():\n    app = FastAPI()\n    return app\n",
        );
        write(dir.path(), "other.py", "x = 1\n");
        assert_eq!(
            entries_for(dir.path()),
            vec![("server.py".to_string(), "application".to_string())]
        );
    }

    #[test]
    fn annotated_and_tuple_targets_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "svc.py",
            "from fastapi import FastAPI\napp: FastAPI = FastAPI()\na, b = FastAPI(), 1\n",
        );
        assert!(entries_for(dir.path()).is_empty());
    }

    #[test]
    fn falls_back_to_main_and_app_files() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "main.py", "from factory import create\napp = create()\n");
        write(dir.path(), "pkg/app.py", "");
        write(dir.path(), "pkg/views.py", "");
        assert_eq!(
            entries_for(dir.path()),
            vec![
                ("main.py".to_string(), "app".to_string()),
                ("pkg/app.py".to_string(), "app".to_string()),
            ]
        );
    }

    #[test]
    fn broken_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.py", "app = FastAPI(\n");
        write(dir.path(), "b.py", "api = FastAPI()\n");
        assert_eq!(
            entries_for(dir.path()),
            vec![("b.py".to_string(), "api".to_string())]
        );
    }
}
