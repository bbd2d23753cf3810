//! Static, best-effort resolution of a name to the file that defines it.
//!
//! This is not Python's import system: there is no `sys.path`, no namespace
//! package merging, and package-vs-submodule precedence is heuristic. A name is
//! looked up in this order:
//!
//! 1. a `from X import name` (alias-aware) anywhere in the file,
//! 2. an `import a.b as name` / `import name` statement,
//! 3. a module-level `name = ...` assignment in the file itself.
//!
//! Imports that land on a file which only re-exports the name are followed
//! until a file assigning it is found.

use crate::extractor::entry::simple_assignment;
use crate::extractor::scan::ModuleMap;
use crate::extractor::source::{ParsedFile, SourceCache};
use crate::extractor::syntax::{node_text, preorder};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tree_sitter::Node;
use tracing::debug;

const INIT_FILE: &str = "__init__.py";
const MAX_REEXPORT_HOPS: usize = 16;

/// Where a name lives. `variable == None` means the file itself is the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub path: PathBuf,
    pub variable: Option<String>,
    /// Un-aliased name of a `from pkg import name [as alias]` that landed on
    /// the submodule `pkg/name`.
    pub imported: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct FromImport {
    level: usize,
    module: Vec<String>,
    imported: String,
}

pub struct ImportResolver<'a> {
    repo_root: &'a Path,
    modules: &'a ModuleMap,
}

impl<'a> ImportResolver<'a> {
    pub fn new(repo_root: &'a Path, modules: &'a ModuleMap) -> Self {
        Self { repo_root, modules }
    }

    /// Resolve `name` as seen from `origin`, following re-exports.
    pub fn resolve(
        &self,
        cache: &mut SourceCache,
        origin: &ParsedFile,
        name: &str,
    ) -> Option<Resolution> {
        let mut resolution = self.resolve_direct(origin, name)?;
        let mut seen = HashSet::new();
        seen.insert((origin.path.clone(), name.to_string()));
        for _ in 0..MAX_REEXPORT_HOPS {
            let Some(variable) = resolution.variable.clone() else {
                break;
            };
            if resolution.path == origin.path && variable == name {
                break;
            }
            if !seen.insert((resolution.path.clone(), variable.clone())) {
                break;
            }
            let Some(target) = cache.parsed(&resolution.path) else {
                break;
            };
            if assigns_at_module_level(&target, &variable) {
                break;
            }
            match self.resolve_direct(&target, &variable) {
                Some(next) if next.path != target.path => {
                    debug!(
                        from = %target.rel_path,
                        name = %variable,
                        to = %next.path.display(),
                        "following re-export"
                    );
                    resolution = next;
                }
                _ => break,
            }
        }
        Some(resolution)
    }

    /// One resolution step without chasing re-exports.
    pub fn resolve_direct(&self, origin: &ParsedFile, name: &str) -> Option<Resolution> {
        let root = origin.tree.root_node();
        let source = &origin.source;
        if let Some(import) = find_from_import(root, source, name) {
            return self.resolve_from_import(&origin.path, &import);
        }
        if let Some(module) = find_plain_import(root, source, name) {
            let path = self.resolve_module(&origin.path, 0, &module)?;
            return Some(Resolution {
                path,
                variable: None,
                imported: None,
            });
        }
        if assigns_at_module_level(origin, name) {
            return Some(Resolution {
                path: origin.path.clone(),
                variable: Some(name.to_string()),
                imported: None,
            });
        }
        None
    }

    fn resolve_from_import(&self, origin: &Path, import: &FromImport) -> Option<Resolution> {
        let target = self.resolve_module(origin, import.level, &import.module);
        let package_dir = match &target {
            Some(path) if is_init_file(path) => path.parent().map(Path::to_path_buf),
            Some(_) => None,
            // `from . import x` inside a directory without `__init__.py`.
            None => self
                .module_dir(origin, import.level, &import.module)
                .filter(|dir| dir.is_dir()),
        };
        if let Some(dir) = package_dir {
            if let Some(sibling) = probe_module(&dir.join(&import.imported)) {
                return Some(Resolution {
                    path: sibling,
                    variable: None,
                    imported: Some(import.imported.clone()),
                });
            }
        }
        Some(Resolution {
            path: target?,
            variable: Some(import.imported.clone()),
            imported: None,
        })
    }

    /// File for a module reference; `level > 0` is relative to `origin`.
    pub fn resolve_module(&self, origin: &Path, level: usize, module: &[String]) -> Option<PathBuf> {
        if level == 0 {
            if module.is_empty() {
                return None;
            }
            if let Some(path) = self.modules.get(&module.join(".")) {
                return Some(path.to_path_buf());
            }
        }
        let path = self.module_dir(origin, level, module)?;
        if module.is_empty() {
            return probe_package(&path);
        }
        probe_module(&path)
    }

    /// Filesystem location a module reference points at, before probing.
    fn module_dir(&self, origin: &Path, level: usize, module: &[String]) -> Option<PathBuf> {
        let mut base = if level == 0 {
            self.repo_root.to_path_buf()
        } else {
            let mut dir = origin.parent()?.to_path_buf();
            for _ in 1..level {
                dir = dir.parent()?.to_path_buf();
            }
            dir
        };
        if !base.starts_with(self.repo_root) {
            return None;
        }
        for segment in module {
            base.push(segment);
        }
        Some(base)
    }
}

/// `pkg/name.py` or `pkg/name/__init__.py` next to a package's `__init__.py`.
pub fn submodule(path: &Path, name: &str) -> Option<PathBuf> {
    if !is_init_file(path) {
        return None;
    }
    probe_module(&path.parent()?.join(name))
}

fn probe_module(path: &Path) -> Option<PathBuf> {
    let file_name = path.file_name()?.to_str()?;
    let module_file = path.with_file_name(format!("{file_name}.py"));
    if module_file.is_file() {
        return Some(module_file);
    }
    probe_package(path)
}

fn probe_package(dir: &Path) -> Option<PathBuf> {
    let init = dir.join(INIT_FILE);
    if init.is_file() { Some(init) } else { None }
}

fn is_init_file(path: &Path) -> bool {
    path.file_name().and_then(|name| name.to_str()) == Some(INIT_FILE)
}

/// Whether a module-level `name = ...` exists in the file.
pub fn assigns_at_module_level(file: &ParsedFile, name: &str) -> bool {
    let root = file.tree.root_node();
    let mut cursor = root.walk();
    root.named_children(&mut cursor).any(|stmt| {
        stmt.kind() == "expression_statement"
            && stmt
                .named_child(0)
                .and_then(|node| simple_assignment(node, &file.source))
                .is_some_and(|target| target == name)
    })
}

/// Descend into statements that may hold module-level imports; skip function, class and lambda bodies.
fn is_import_scope(node: Node<'_>) -> bool {
    !matches!(
        node.kind(),
        "function_definition"
            | "class_definition"
            | "lambda"
            | "import_statement"
            | "import_from_statement"
    )
}

fn find_from_import(root: Node<'_>, source: &str, name: &str) -> Option<FromImport> {
    preorder(root, is_import_scope)
        .filter(|node| node.kind() == "import_from_statement")
        .find_map(|node| from_import_binding(node, source, name))
}

fn from_import_binding(node: Node<'_>, source: &str, name: &str) -> Option<FromImport> {
    let module_node = node.child_by_field_name("module_name")?;
    let (level, module) = module_reference(module_node, source);
    let mut cursor = node.walk();
    for imported in node.children_by_field_name("name", &mut cursor) {
        let (original, local) = match imported.kind() {
            "aliased_import" => {
                let original = node_text(imported.child_by_field_name("name")?, source);
                let alias = node_text(imported.child_by_field_name("alias")?, source);
                (original, alias)
            }
            _ => {
                let original = node_text(imported, source);
                (original.clone(), original)
            }
        };
        if local == name {
            return Some(FromImport {
                level,
                module,
                imported: original,
            });
        }
    }
    None
}

/// Dot level and dotted segments of `..pkg.mod` / `pkg.mod`.
fn module_reference(node: Node<'_>, source: &str) -> (usize, Vec<String>) {
    let text = node_text(node, source);
    let level = text.chars().take_while(|ch| *ch == '.').count();
    let module = text[level..]
        .split('.')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect();
    (level, module)
}

/// Module bound to `name` by `import a.b as name` or `import name[.x]`.
fn find_plain_import(root: Node<'_>, source: &str, name: &str) -> Option<Vec<String>> {
    preorder(root, is_import_scope)
        .filter(|node| node.kind() == "import_statement")
        .find_map(|node| plain_import_binding(node, source, name))
}

fn plain_import_binding(node: Node<'_>, source: &str, name: &str) -> Option<Vec<String>> {
    let mut cursor = node.walk();
    for imported in node.children_by_field_name("name", &mut cursor) {
        match imported.kind() {
            "aliased_import" => {
                let alias = imported.child_by_field_name("alias")?;
                if node_text(alias, source) == name {
                    let module = imported.child_by_field_name("name")?;
                    return Some(module_reference(module, source).1);
                }
            }
            _ => {
                let (_, module) = module_reference(imported, source);
                if module.first().is_some_and(|first| first == name) {
                    return Some(vec![name.to_string()]);
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::scan::{ScanOptions, scan_python_files};

    struct Project {
        dir: tempfile::TempDir,
    }

    impl Project {
        fn new(files: &[(&str, &str)]) -> Self {
            let dir = tempfile::tempdir().unwrap();
            for (rel, body) in files {
                let path = dir.path().join(rel);
                std::fs::create_dir_all(path.parent().unwrap()).unwrap();
                std::fs::write(path, body).unwrap();
            }
            Self { dir }
        }

        fn root(&self) -> &Path {
            self.dir.path()
        }

        fn resolve(&self, origin: &str, name: &str) -> Option<(String, Option<String>)> {
            let files = scan_python_files(self.root(), ScanOptions::default());
            let modules = ModuleMap::build(&files);
            let mut cache = SourceCache::new(self.root(), 1 << 20).unwrap();
            let resolver = ImportResolver::new(self.root(), &modules);
            let parsed = cache.parsed(&self.root().join(origin)).unwrap();
            resolver.resolve(&mut cache, &parsed, name).map(|res| {
                let rel = crate::util::normalize_rel_path(self.root(), &res.path).unwrap();
                (rel, res.variable)
            })
        }
    }

    fn target(path: &str, variable: Option<&str>) -> Option<(String, Option<String>)> {
        Some((path.to_string(), variable.map(str::to_string)))
    }

    #[test]
    fn absolute_from_import_via_module_map() {
        let project = Project::new(&[
            ("main.py", "from app.routes.users import router as users_router\n"),
            ("app/__init__.py", ""),
            ("app/routes/__init__.py", ""),
            ("app/routes/users.py", "router = APIRouter()\n"),
        ]);
        assert_eq!(
            project.resolve("main.py", "users_router"),
            target("app/routes/users.py", Some("router"))
        );
    }

    #[test]
    fn relative_import_walks_up_levels() {
        let project = Project::new(&[
            ("pkg/__init__.py", ""),
            ("pkg/api/__init__.py", ""),
            ("pkg/api/v1/main.py", "from ..shared import router\n"),
            ("pkg/api/shared.py", "router = APIRouter()\n"),
        ]);
        assert_eq!(
            project.resolve("pkg/api/v1/main.py", "router"),
            target("pkg/api/shared.py", Some("router"))
        );
    }

    #[test]
    fn package_import_prefers_sibling_submodule() {
        let project = Project::new(&[
            ("main.py", "from app.api import users\n"),
            ("app/__init__.py", ""),
            ("app/api/__init__.py", ""),
            ("app/api/users.py", "router = APIRouter()\n"),
        ]);
        assert_eq!(project.resolve("main.py", "users"), target("app/api/users.py", None));
    }

    #[test]
    fn dot_only_import_without_init() {
        let project = Project::new(&[
            ("svc/main.py", "from . import items\n"),
            ("svc/items/__init__.py", "router = APIRouter()\n"),
        ]);
        assert_eq!(
            project.resolve("svc/main.py", "items"),
            target("svc/items/__init__.py", None)
        );
    }

    #[test]
    fn reexports_are_followed_to_the_defining_file() {
        let project = Project::new(&[
            ("main.py", "from api import router\n"),
            ("api/__init__.py", "from .routers import users_router as router\n"),
            ("api/routers.py", "users_router = APIRouter()\n"),
        ]);
        assert_eq!(
            project.resolve("main.py", "router"),
            target("api/routers.py", Some("users_router"))
        );
    }

    #[test]
    fn reexport_cycles_terminate() {
        let project = Project::new(&[
            ("a.py", "from b import router\n"),
            ("b.py", "from a import router\n"),
        ]);
        assert_eq!(project.resolve("a.py", "router"), target("a.py", Some("router")));
    }

    #[test]
    fn plain_imports_target_whole_modules() {
        let project = Project::new(&[
            ("main.py", "import routes.users as users\nimport admin\n"),
            ("routes/__init__.py", ""),
            ("routes/users.py", "router = APIRouter()\n"),
            ("admin.py", "router = APIRouter()\n"),
        ]);
        assert_eq!(project.resolve("main.py", "users"), target("routes/users.py", None));
        assert_eq!(project.resolve("main.py", "admin"), target("admin.py", None));
    }

    #[test]
    fn local_assignment_and_unresolved_names() {
        let project = Project::new(&[(
            "main.py",
            "from fastapi import APIRouter\nrouter = APIRouter()\n",
        )]);
        assert_eq!(project.resolve("main.py", "router"), target("main.py", Some("router")));
        assert_eq!(project.resolve("main.py", "APIRouter"), None);
        assert_eq!(project.resolve("main.py", "missing"), None);
    }
}
