//! Small helpers over tree-sitter-python nodes.

use tree_sitter::Node;

pub fn node_text(node: Node<'_>, source: &str) -> String {
    let start = node.start_byte();
    let end = node.end_byte();
    source.get(start..end).unwrap_or("").trim().to_string()
}

/// `a`, `a.b.c` for identifier/attribute chains; `None` for anything dynamic.
pub fn dotted_name(node: Node<'_>, source: &str) -> Option<String> {
    let mut segments = Vec::new();
    let mut current = node;
    loop {
        match current.kind() {
            "identifier" => {
                segments.push(node_text(current, source));
                break;
            }
            "attribute" => {
                segments.push(node_text(current.child_by_field_name("attribute")?, source));
                current = current.child_by_field_name("object")?;
            }
            "parenthesized_expression" => current = current.named_child(0)?,
            _ => return None,
        }
    }
    segments.reverse();
    Some(segments.join("."))
}

/// Pre-order walk over named nodes, children in source order.
///
/// `descend` decides whether a node's children are visited. The pending nodes
/// live on the heap, so deeply nested expressions cannot exhaust the stack.
pub fn preorder<'tree, F>(root: Node<'tree>, descend: F) -> Preorder<'tree, F>
where
    F: FnMut(Node<'tree>) -> bool,
{
    Preorder {
        stack: vec![root],
        descend,
    }
}

pub struct Preorder<'tree, F> {
    stack: Vec<Node<'tree>>,
    descend: F,
}

impl<'tree, F> Iterator for Preorder<'tree, F>
where
    F: FnMut(Node<'tree>) -> bool,
{
    type Item = Node<'tree>;

    fn next(&mut self) -> Option<Node<'tree>> {
        let node = self.stack.pop()?;
        if (self.descend)(node) {
            let start = self.stack.len();
            let mut cursor = node.walk();
            self.stack.extend(node.named_children(&mut cursor));
            self.stack[start..].reverse();
        }
        Some(node)
    }
}

/// First segment of a dotted chain plus the remaining segments.
pub fn split_dotted(name: &str) -> (&str, Vec<&str>) {
    let mut parts = name.split('.');
    let base = parts.next().unwrap_or(name);
    (base, parts.filter(|part| !part.is_empty()).collect())
}

/// 1-based inclusive line span.
pub fn line_span(node: Node<'_>) -> (usize, usize) {
    let start = node.start_position();
    let end = node.end_position();
    // A node ending at column 0 stops at the previous line's newline.
    let end_row = if end.column == 0 && end.row > start.row {
        end.row - 1
    } else {
        end.row
    };
    (start.row + 1, end_row + 1)
}

pub struct CallArgs<'a> {
    pub positional: Vec<Node<'a>>,
    pub keywords: Vec<(String, Node<'a>)>,
}

impl<'a> CallArgs<'a> {
    pub fn keyword(&self, name: &str) -> Option<Node<'a>> {
        self.keywords
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| *value)
    }
}

pub fn call_arguments<'a>(call: Node<'a>, source: &str) -> CallArgs<'a> {
    let mut positional = Vec::new();
    let mut keywords = Vec::new();
    let Some(args) = call.child_by_field_name("arguments") else {
        return CallArgs {
            positional,
            keywords,
        };
    };
    let mut cursor = args.walk();
    for child in args.named_children(&mut cursor) {
        match child.kind() {
            "keyword_argument" => {
                if let (Some(name_node), Some(value_node)) = (
                    child.child_by_field_name("name"),
                    child.child_by_field_name("value"),
                ) {
                    keywords.push((node_text(name_node, source), value_node));
                }
            }
            "comment" | "list_splat" | "dictionary_splat" => {}
            _ => positional.push(child),
        }
    }
    CallArgs {
        positional,
        keywords,
    }
}

/// `(receiver, method)` for a call of the shape `receiver.method(...)`.
pub fn method_call<'a>(call: Node<'a>, source: &str) -> Option<(Node<'a>, String)> {
    if call.kind() != "call" {
        return None;
    }
    let function = call.child_by_field_name("function")?;
    if function.kind() != "attribute" {
        return None;
    }
    let receiver = function.child_by_field_name("object")?;
    let method = node_text(function.child_by_field_name("attribute")?, source);
    Some((receiver, method))
}

/// Value of a plain `str` literal; f-strings and bytes are not literals.
pub fn string_literal(node: Node<'_>, source: &str) -> Option<String> {
    let mut node = node;
    while node.kind() == "parenthesized_expression" {
        node = node.named_child(0)?;
    }
    match node.kind() {
        "string" => plain_string(node, source),
        "concatenated_string" => {
            let mut out = String::new();
            let mut cursor = node.walk();
            for part in node.named_children(&mut cursor) {
                if part.kind() == "comment" {
                    continue;
                }
                if part.kind() != "string" {
                    return None;
                }
                out.push_str(&plain_string(part, source)?);
            }
            Some(out)
        }
        _ => None,
    }
}

fn plain_string(node: Node<'_>, source: &str) -> Option<String> {
    let mut cursor = node.walk();
    if node
        .named_children(&mut cursor)
        .any(|child| child.kind() == "interpolation")
    {
        return None;
    }
    unquote(&node_text(node, source))
}

fn unquote(raw: &str) -> Option<String> {
    let prefix_len = raw
        .char_indices()
        .find(|(_, ch)| *ch == '"' || *ch == '\'')
        .map(|(idx, _)| idx)?;
    let prefix = raw[..prefix_len].to_ascii_lowercase();
    if prefix.contains('b') || prefix.contains('f') || prefix.contains('t') {
        return None;
    }
    let body = &raw[prefix_len..];
    let inner = ["\"\"\"", "'''", "\"", "'"].iter().find_map(|quote| {
        if body.len() >= quote.len() * 2 && body.starts_with(quote) && body.ends_with(quote) {
            Some(&body[quote.len()..body.len() - quote.len()])
        } else {
            None
        }
    })?;
    if prefix.contains('r') {
        Some(inner.to_string())
    } else {
        Some(unescape(inner))
    }
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some('\n') => {}
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tree_sitter::Parser;

    fn parse(source: &str) -> tree_sitter::Tree {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .unwrap();
        parser.parse(source, None).unwrap()
    }

    fn first_call_arg(source: &str) -> Option<String> {
        let tree = parse(source);
        let stmt = tree.root_node().named_child(0).unwrap();
        let call = stmt.named_child(0).unwrap();
        let args = call_arguments(call, source);
        string_literal(args.positional[0], source)
    }

    #[test]
    fn plain_and_prefixed_literals() {
        assert_eq!(first_call_arg("f('/users')").as_deref(), Some("/users"));
        assert_eq!(first_call_arg("f(r'/a\\d')").as_deref(), Some("/a\\d"));
        assert_eq!(first_call_arg("f(\"\"\"/x\"\"\")").as_deref(), Some("/x"));
        assert_eq!(first_call_arg("f('/a' '/b')").as_deref(), Some("/a/b"));
        assert_eq!(first_call_arg("f('it\\'s')").as_deref(), Some("it's"));
    }

    #[test]
    fn non_literals_are_rejected() {
        assert_eq!(first_call_arg("f(PATH)"), None);
        assert_eq!(first_call_arg("f(f'/{x}')"), None);
        assert_eq!(first_call_arg("f(b'/x')"), None);
        assert_eq!(first_call_arg("f(f'/static')"), None);
    }

    #[test]
    fn splits_dotted_names() {
        assert_eq!(split_dotted("api"), ("api", vec![]));
        assert_eq!(split_dotted("api.v1.router"), ("api", vec!["v1", "router"]));
    }

    #[test]
    fn preorder_keeps_source_order_and_prunes() {
        let source = "a = 1\ndef f():\n    b = 2\nc = 3\n";
        let tree = parse(source);
        let names: Vec<_> = preorder(tree.root_node(), |node| node.kind() != "function_definition")
            .filter(|node| node.kind() == "identifier")
            .map(|node| node_text(node, source))
            .collect();
        assert_eq!(names, vec!["a", "c"]);
    }

    #[test]
    fn long_attribute_chains_resolve() {
        let source = format!("x = root{}\n", ".part".repeat(5_000));
        let tree = parse(&source);
        let assignment = tree.root_node().named_child(0).unwrap().named_child(0).unwrap();
        let right = assignment.child_by_field_name("right").unwrap();
        let name = dotted_name(right, &source).unwrap();
        assert!(name.starts_with("root.part.part"));
        assert_eq!(name.split('.').count(), 5_001);
    }
}
