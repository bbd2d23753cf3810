use crate::extractor::endpoints::EndpointVisitor;
use crate::extractor::http::Strictness;
use crate::extractor::imports::{ImportResolver, assigns_at_module_level, submodule};
use crate::extractor::source::{ParsedFile, SourceCache};
use crate::extractor::syntax::{call_arguments, dotted_name, method_call, preorder, split_dotted};
use crate::model::{EndpointRecord, EntryPoint, RouterBinding};
use std::collections::{BTreeSet, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use tracing::debug;

const INCLUDE_ROUTER: &str = "include_router";

#[derive(Debug, Default)]
pub struct WalkOutcome {
    pub endpoints: Vec<EndpointRecord>,
    /// Router-like names each visited file was extracted with, in visit order.
    pub bindings: Vec<RouterBinding>,
}

/// Breadth-first walk over `include_router` edges starting at the entry points.
///
/// Each file is visited once. The names it is visited with are the ones known
/// when it is first dequeued; bindings discovered later for the same file are
/// dropped, so unusual router topologies can be under-extracted.
pub struct RouterGraphWalker<'a> {
    resolver: ImportResolver<'a>,
    strictness: Strictness,
    repo_name: &'a str,
}

impl<'a> RouterGraphWalker<'a> {
    pub fn new(resolver: ImportResolver<'a>, strictness: Strictness, repo_name: &'a str) -> Self {
        Self {
            resolver,
            strictness,
            repo_name,
        }
    }

    pub fn walk(&self, cache: &mut SourceCache, entry_points: &[EntryPoint]) -> WalkOutcome {
        let mut queue: VecDeque<RouterBinding> = entry_points
            .iter()
            .map(|entry| RouterBinding::new(entry.path.clone(), entry.variable.clone()))
            .collect();
        let mut processed: HashSet<PathBuf> = HashSet::new();
        let mut ids: HashSet<String> = HashSet::new();
        let mut outcome = WalkOutcome::default();

        while let Some(binding) = queue.pop_front() {
            if processed.contains(&binding.path) {
                debug!(
                    path = %binding.path.display(),
                    names = ?binding.variables,
                    "already visited, keeping first binding"
                );
                continue;
            }
            processed.insert(binding.path.clone());
            let Some(file) = cache.parsed(&binding.path) else {
                continue;
            };

            let (variables, targets) = self.expand_includes(cache, &file, binding.variables);

            let visitor = EndpointVisitor::new(&variables, self.strictness, self.repo_name);
            let records = visitor.visit(&file);
            debug!(
                path = %file.rel_path,
                names = ?variables,
                endpoints = records.len(),
                "visited"
            );
            for mut record in records {
                record.id = unique_id(&mut ids, record.id);
                outcome.endpoints.push(record);
            }

            for target in targets {
                if !processed.contains(&target.path) {
                    queue.push_back(target);
                }
            }
            outcome.bindings.push(RouterBinding {
                path: file.path.clone(),
                variables,
            });
        }
        outcome
    }

    /// Grow `variables` with routers included from the same file, then return
    /// the bindings for every other file this one includes.
    fn expand_includes(
        &self,
        cache: &mut SourceCache,
        file: &ParsedFile,
        mut variables: BTreeSet<String>,
    ) -> (BTreeSet<String>, Vec<RouterBinding>) {
        let mut resolved: HashSet<String> = HashSet::new();
        let mut targets = Vec::new();
        loop {
            let mut grew = false;
            for included in include_router_args(file, &variables) {
                if !resolved.insert(included.clone()) {
                    continue;
                }
                let Some((path, variable)) = self.include_target(cache, file, &included) else {
                    debug!(path = %file.rel_path, name = %included, "unresolved include_router");
                    continue;
                };
                if path == file.path {
                    grew |= variables.insert(variable);
                } else {
                    targets.push(RouterBinding::new(path, variable));
                }
            }
            if !grew {
                break;
            }
        }
        (variables, targets)
    }

    /// File and router name an `include_router(<included>)` argument points at.
    fn include_target(
        &self,
        cache: &mut SourceCache,
        file: &ParsedFile,
        included: &str,
    ) -> Option<(PathBuf, String)> {
        let (base, suffix) = split_dotted(included);
        let resolution = self.resolver.resolve(cache, file, base)?;
        let mut path = resolution.path;
        let mut rest = suffix.as_slice();
        while rest.len() > 1 {
            match submodule(&path, rest[0]) {
                Some(next) => {
                    path = next;
                    rest = &rest[1..];
                }
                None => break,
            }
        }
        let mut variable = match (rest.last(), resolution.variable, resolution.imported) {
            (Some(last), _, _) => last.to_string(),
            (None, Some(variable), _) => variable,
            // `from pkg import router as api_router` landing on `pkg/router.py`.
            (None, None, Some(imported)) if !module_assigns(cache, &path, included) => imported,
            (None, None, _) => included.to_string(),
        };
        if path != file.path {
            if let Some(target) = cache.parsed(&path) {
                if !assigns_at_module_level(&target, &variable) {
                    if let Some(next) = self.resolver.resolve(cache, &target, &variable) {
                        path = next.path;
                        variable = next.variable.unwrap_or(variable);
                    }
                }
            }
        }
        Some((path, variable))
    }
}

fn module_assigns(cache: &mut SourceCache, path: &Path, name: &str) -> bool {
    cache
        .parsed(path)
        .is_some_and(|file| assigns_at_module_level(&file, name))
}

/// Dotted arguments of `<receiver>.include_router(X, ...)` where the receiver is router-like.
pub fn include_router_args(file: &ParsedFile, routers: &BTreeSet<String>) -> Vec<String> {
    let source = &file.source;
    let mut out = Vec::new();
    for node in preorder(file.tree.root_node(), |_| true) {
        let Some((receiver, method)) = method_call(node, source) else {
            continue;
        };
        if method != INCLUDE_ROUTER {
            continue;
        }
        let is_router = dotted_name(receiver, source).is_some_and(|name| {
            let (base, _) = split_dotted(&name);
            routers.contains(&name) || routers.contains(base)
        });
        if !is_router {
            continue;
        }
        let args = call_arguments(node, source);
        let argument = args
            .positional
            .first()
            .copied()
            .or_else(|| args.keyword("router"));
        if let Some(name) = argument.and_then(|arg| dotted_name(arg, source)) {
            if !out.contains(&name) {
                out.push(name);
            }
        }
    }
    out
}

fn unique_id(seen: &mut HashSet<String>, id: String) -> String {
    if seen.insert(id.clone()) {
        return id;
    }
    let mut n = 1;
    loop {
        let candidate = format!("{id}_{n}");
        if seen.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colliding_ids_get_a_suffix() {
        let mut seen = HashSet::new();
        assert_eq!(unique_id(&mut seen, "A_B_f_0".to_string()), "A_B_f_0");
        assert_eq!(unique_id(&mut seen, "A_B_f_0".to_string()), "A_B_f_0_1");
        assert_eq!(unique_id(&mut seen, "A_B_f_0".to_string()), "A_B_f_0_2");
    }
}
