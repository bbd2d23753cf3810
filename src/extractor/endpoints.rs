use crate::extractor::http::{HttpVerb, Strictness};
use crate::extractor::source::ParsedFile;
use crate::extractor::syntax::{
    call_arguments, dotted_name, line_span, node_text, preorder, split_dotted, string_literal,
};
use crate::model::{EndpointMetadata, EndpointRecord};
use crate::util;
use std::collections::BTreeSet;
use tree_sitter::Node;

pub const UNKNOWN_ROUTE: &str = "unknown";

/// Finds functions registered as route handlers on one of `routers`.
pub struct EndpointVisitor<'a> {
    routers: &'a BTreeSet<String>,
    strictness: Strictness,
    repo_name: &'a str,
}

struct RouteMatch<'tree> {
    verb: HttpVerb,
    route: String,
    first_decorator: Node<'tree>,
    definition: Node<'tree>,
}

impl<'a> EndpointVisitor<'a> {
    pub fn new(routers: &'a BTreeSet<String>, strictness: Strictness, repo_name: &'a str) -> Self {
        Self {
            routers,
            strictness,
            repo_name,
        }
    }

    /// Records in source order; ids carry a zero-based ordinal local to this file.
    pub fn visit(&self, file: &ParsedFile) -> Vec<EndpointRecord> {
        let matches: Vec<RouteMatch<'_>> = preorder(file.tree.root_node(), |_| true)
            .filter(|node| node.kind() == "decorated_definition")
            .filter_map(|node| self.match_decorated(node, &file.source))
            .collect();
        let prefix = id_prefix(self.repo_name, &file.rel_path);
        matches
            .into_iter()
            .enumerate()
            .map(|(ordinal, found)| build_record(file, &prefix, ordinal, found))
            .collect()
    }

    fn match_decorated<'tree>(&self, node: Node<'tree>, source: &str) -> Option<RouteMatch<'tree>> {
        let definition = node.child_by_field_name("definition")?;
        if definition.kind() != "function_definition" {
            return None;
        }
        let mut cursor = node.walk();
        let decorators: Vec<Node<'tree>> = node
            .named_children(&mut cursor)
            .filter(|child| child.kind() == "decorator")
            .collect();
        let first_decorator = *decorators.first()?;
        // Only the first route decorator counts, even when several are stacked.
        decorators.iter().find_map(|decorator| {
            let (verb, route) = self.route_decorator(*decorator, source)?;
            Some(RouteMatch {
                verb,
                route,
                first_decorator,
                definition,
            })
        })
    }

    fn route_decorator(&self, decorator: Node<'_>, source: &str) -> Option<(HttpVerb, String)> {
        let call = decorator.named_child(0)?;
        if call.kind() != "call" {
            return None;
        }
        let function = call.child_by_field_name("function")?;
        if function.kind() != "attribute" {
            return None;
        }
        let attribute = node_text(function.child_by_field_name("attribute")?, source);
        let verb = self.strictness.verb_for(&attribute)?;
        let receiver = dotted_name(function.child_by_field_name("object")?, source)?;
        if !self.is_router(&receiver) {
            return None;
        }
        Some((verb, route_from_call(call, source)))
    }

    fn is_router(&self, receiver: &str) -> bool {
        let (base, _) = split_dotted(receiver);
        self.routers.contains(receiver) || self.routers.contains(base)
    }
}

/// First positional string literal, else a `path=`/`url=` string keyword.
fn route_from_call(call: Node<'_>, source: &str) -> String {
    let args = call_arguments(call, source);
    if let Some(route) = args
        .positional
        .first()
        .and_then(|arg| string_literal(*arg, source))
    {
        return route;
    }
    ["path", "url"]
        .iter()
        .filter_map(|key| args.keyword(key))
        .find_map(|value| string_literal(value, source))
        .unwrap_or_else(|| UNKNOWN_ROUTE.to_string())
}

fn build_record(
    file: &ParsedFile,
    prefix: &str,
    ordinal: usize,
    found: RouteMatch<'_>,
) -> EndpointRecord {
    let source = &file.source;
    let function_name = found
        .definition
        .child_by_field_name("name")
        .map(|name| node_text(name, source))
        .unwrap_or_default();
    let (start_line, _) = line_span(found.first_decorator);
    let (_, end_line) = line_span(found.definition);
    let indent = found.first_decorator.start_position().column;
    let code = dedent(&util::slice_lines(source, start_line, end_line), indent);
    let lines = if code.is_empty() {
        0
    } else {
        code.split('\n').count()
    };
    EndpointRecord {
        id: format!("{prefix}_{function_name}_{ordinal}"),
        source: file.rel_path.clone(),
        method: found.verb.as_str().to_string(),
        route: found.route,
        function_name,
        code,
        metadata: EndpointMetadata {
            has_async: is_async(found.definition),
            lines,
        },
    }
}

fn is_async(definition: Node<'_>) -> bool {
    definition
        .child(0)
        .is_some_and(|first| first.kind() == "async")
}

fn id_prefix(repo_name: &str, rel_path: &str) -> String {
    let stem = rel_path.strip_suffix(".py").unwrap_or(rel_path);
    format!(
        "{}_{}",
        util::sanitize_id_part(repo_name),
        util::sanitize_id_part(stem)
    )
}

/// Strip the decorator's own indentation so nested handlers stand alone.
fn dedent(snippet: &str, indent: usize) -> String {
    let trimmed = snippet.trim_end();
    if indent == 0 {
        return trimmed.to_string();
    }
    trimmed
        .split('\n')
        .map(|line| {
            let strip = line
                .char_indices()
                .take(indent)
                .take_while(|(_, ch)| *ch == ' ' || *ch == '\t')
                .count();
            &line[strip..]
        })
        .collect::<Vec<_>>()
        .join("\n")
}
