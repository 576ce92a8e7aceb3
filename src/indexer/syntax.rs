//! Grammar-based extraction with Tree-sitter.
//!
//! Chunk boundaries come straight from parse-tree node spans, so unlike the
//! pattern strategy braces inside strings or comments cannot mis-bound a unit.
use tree_sitter::{Node, Parser, Tree};

use super::chunk::{Chunk, FileInfo, kind};
use super::extractor::{ChunkExtractor, ExtractError};
use super::languages::LanguageConfig;

const FUNCTION_KINDS: &[&str] = &[
    "function_declaration",
    "generator_function_declaration",
    "function_expression",
    "arrow_function",
    "method_definition",
];

/// Grammar-based extractor for TypeScript, TSX and JavaScript.
#[derive(Debug, Default, Clone, Copy)]
pub struct SyntaxExtractor;

impl SyntaxExtractor {
    fn parse(&self, content: &str, file_path: &str) -> Result<Tree, ExtractError> {
        let config = LanguageConfig::get_by_path(file_path)
            .ok_or_else(|| ExtractError::UnsupportedLanguage(file_path.to_string()))?;

        let mut parser = Parser::new();
        parser
            .set_language(&config.language)
            .map_err(|e| ExtractError::Grammar(e.to_string()))?;

        parser
            .parse(content, None)
            .ok_or_else(|| ExtractError::Parse(file_path.to_string()))
    }
}

impl ChunkExtractor for SyntaxExtractor {
    fn name(&self) -> &'static str {
        "syntax"
    }

    fn extract(&self, content: &str, file_path: &str) -> Result<Vec<Chunk>, ExtractError> {
        let tree = self.parse(content, file_path)?;
        let root = tree.root_node();
        if root.has_error() {
            tracing::debug!("{file_path}: syntax errors present, extracting what parsed");
        }

        let file = FileInfo::new(file_path, content);
        let mut chunks = extract_functions(root, content, &file);
        chunks.extend(extract_components(root, content, &file));
        chunks.extend(extract_imports(root, content, &file));
        Ok(chunks)
    }
}

/// Pre-order traversal driven by an explicit stack. Returns the nodes for
/// which `keep` holds, in document order.
fn collect_nodes<'t>(root: Node<'t>, mut keep: impl FnMut(&Node<'t>) -> bool) -> Vec<Node<'t>> {
    let mut stack = vec![root];
    let mut found = Vec::new();

    while let Some(node) = stack.pop() {
        if keep(&node) {
            found.push(node);
        }
        let mut cursor = node.walk();
        let children: Vec<Node<'t>> = node.children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }

    found
}

fn node_text<'s>(node: &Node<'_>, source: &'s str) -> &'s str {
    source.get(node.byte_range()).unwrap_or_default()
}

fn field_text<'s>(node: &Node<'_>, field: &str, source: &'s str) -> Option<&'s str> {
    node.child_by_field_name(field).map(|n| node_text(&n, source))
}

fn to_chunk(
    node: &Node<'_>,
    chunk_type: &str,
    name: Option<&str>,
    source: &str,
    file: &FileInfo,
) -> Chunk {
    Chunk::new(
        chunk_type,
        name,
        node_text(node, source),
        (node.start_position().row, node.end_position().row),
        node.kind(),
        file,
    )
}

/// Name of a function node: its own `name` field, else the variable it is
/// assigned to.
fn function_name<'s>(node: &Node<'_>, source: &'s str) -> Option<&'s str> {
    if let Some(name) = field_text(node, "name", source) {
        return Some(name);
    }
    let parent = node.parent()?;
    if parent.kind() == "variable_declarator" {
        return field_text(&parent, "name", source);
    }
    None
}

fn is_capitalized(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_ascii_uppercase())
}

fn extract_functions(root: Node<'_>, source: &str, file: &FileInfo) -> Vec<Chunk> {
    collect_nodes(root, |n| FUNCTION_KINDS.contains(&n.kind()))
        .iter()
        .map(|n| to_chunk(n, kind::FUNCTION, function_name(n, source), source, file))
        .collect()
}

fn extract_components(root: Node<'_>, source: &str, file: &FileInfo) -> Vec<Chunk> {
    let mut chunks = Vec::new();

    for node in collect_nodes(root, |n| {
        matches!(
            n.kind(),
            "variable_declarator" | "function_declaration" | "class_declaration"
        )
    }) {
        let Some(name) = field_text(&node, "name", source) else {
            continue;
        };
        if !is_capitalized(name) {
            continue;
        }

        match node.kind() {
            "variable_declarator" => {
                let Some(value) = node.child_by_field_name("value") else {
                    continue;
                };
                let is_component = match value.kind() {
                    "arrow_function" | "function_expression" => true,
                    // React.memo(...), forwardRef(...)
                    "call_expression" => {
                        let text = node_text(&value, source);
                        text.contains("React")
                            || text.contains("memo")
                            || text.contains("forwardRef")
                    }
                    _ => false,
                };
                if is_component {
                    chunks.push(to_chunk(&value, kind::COMPONENT, Some(name), source, file));
                }
            }
            "class_declaration" => {
                let extends_component = collect_nodes(node, |n| n.kind() == "class_heritage")
                    .first()
                    .is_some_and(|h| node_text(h, source).contains("Component"));
                if extends_component {
                    chunks.push(to_chunk(&node, kind::COMPONENT, Some(name), source, file));
                }
            }
            _ => chunks.push(to_chunk(&node, kind::COMPONENT, Some(name), source, file)),
        }
    }

    chunks
}

fn extract_imports(root: Node<'_>, source: &str, file: &FileInfo) -> Vec<Chunk> {
    collect_nodes(root, |n| n.kind() == "import_statement")
        .iter()
        .map(|n| to_chunk(n, kind::IMPORT, None, source, file))
        .collect()
}
