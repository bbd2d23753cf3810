use crate::util;
use anyhow::Result;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tree_sitter::{Parser, Tree};
use tracing::{debug, warn};

/// A Python file read and parsed once for the whole run.
pub struct ParsedFile {
    pub path: PathBuf,
    pub rel_path: String,
    pub source: Rc<str>,
    pub tree: Tree,
}

/// Owns the parser and memoises file text and syntax trees, failures included.
pub struct SourceCache {
    repo_root: PathBuf,
    parser: Parser,
    max_file_bytes: u64,
    texts: HashMap<PathBuf, Option<Rc<str>>>,
    trees: HashMap<PathBuf, Option<Rc<ParsedFile>>>,
    parse_errors: usize,
}

impl SourceCache {
    pub fn new(repo_root: &Path, max_file_bytes: u64) -> Result<Self> {
        let mut parser = Parser::new();
        parser.set_language(&tree_sitter_python::LANGUAGE.into())?;
        Ok(Self {
            repo_root: repo_root.to_path_buf(),
            parser,
            max_file_bytes,
            texts: HashMap::new(),
            trees: HashMap::new(),
            parse_errors: 0,
        })
    }

    /// File text, or `None` when the file is missing, too large or not UTF-8.
    pub fn text(&mut self, path: &Path) -> Option<Rc<str>> {
        if let Some(cached) = self.texts.get(path) {
            return cached.clone();
        }
        let loaded = self.read(path);
        self.texts.insert(path.to_path_buf(), loaded.clone());
        loaded
    }

    fn read(&self, path: &Path) -> Option<Rc<str>> {
        match fs::metadata(path) {
            Ok(meta) if meta.len() > self.max_file_bytes => {
                debug!(path = %path.display(), size = meta.len(), "skipping oversized file");
                return None;
            }
            Ok(_) => {}
            Err(err) => {
                debug!(path = %path.display(), error = %err, "unreadable file");
                return None;
            }
        }
        match util::read_to_string(path) {
            Ok(text) => Some(Rc::from(text)),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "skipping unreadable file");
                None
            }
        }
    }

    /// Syntax tree of `path`, built at most once per run.
    pub fn parsed(&mut self, path: &Path) -> Option<Rc<ParsedFile>> {
        if let Some(cached) = self.trees.get(path) {
            return cached.clone();
        }
        let parsed = self.parse(path).map(Rc::new);
        self.trees.insert(path.to_path_buf(), parsed.clone());
        parsed
    }

    fn parse(&mut self, path: &Path) -> Option<ParsedFile> {
        let source = self.text(path)?;
        let tree = match self.parser.parse(source.as_bytes(), None) {
            Some(tree) => tree,
            None => {
                warn!(path = %path.display(), "parser produced no tree");
                self.parse_errors += 1;
                return None;
            }
        };
        if tree.root_node().has_error() {
            warn!(path = %path.display(), "syntax error, skipping file");
            self.parse_errors += 1;
            return None;
        }
        let rel_path = util::normalize_rel_path(&self.repo_root, path)
            .unwrap_or_else(|_| util::normalize_path(path));
        Some(ParsedFile {
            path: path.to_path_buf(),
            rel_path,
            source,
            tree,
        })
    }

    pub fn parse_errors(&self) -> usize {
        self.parse_errors
    }
}
