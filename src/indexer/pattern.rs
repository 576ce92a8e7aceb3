//! Line-oriented extraction using regular expressions.
//!
//! Each line is tested against an ordered pattern list per category; the first
//! pattern that matches decides the chunk name and node type for that line.
//! Bodies are bounded with [`find_block_end`].
use std::sync::LazyLock;

use regex::Regex;

use super::chunk::{Chunk, FileInfo, kind};
use super::extractor::{ChunkExtractor, ExtractError};

struct LinePattern {
    regex: Regex,
    node_type: &'static str,
}

fn compile(specs: &[(&str, &'static str)]) -> Vec<LinePattern> {
    specs
        .iter()
        .map(|(re, node_type)| LinePattern {
            regex: Regex::new(re).expect("static pattern must compile"),
            node_type,
        })
        .collect()
}

static FUNCTION_PATTERNS: LazyLock<Vec<LinePattern>> = LazyLock::new(|| {
    compile(&[
        (r"function\s+(\w+)\s*\([^)]*\)\s*\{", "function_declaration"),
        (
            r"const\s+(\w+)\s*(?::[^=]*)?=\s*(?:async\s+)?\([^)]*\)\s*=>\s*\{",
            "arrow_function",
        ),
        (
            r"const\s+(\w+)\s*(?::[^=]*)?=\s*(?:async\s+)?\([^)]*\)\s*=>\s*\(",
            "arrow_function",
        ),
        (r"(\w+)\s*\([^)]*\)\s*\{", "method_definition"),
    ])
});

// Components are the capitalized subset of the function forms.
static COMPONENT_PATTERNS: LazyLock<Vec<LinePattern>> = LazyLock::new(|| {
    compile(&[
        (
            r"const\s+([A-Z]\w*)\s*(?::[^=]*)?=\s*(?:async\s+)?\([^)]*\)\s*=>\s*\{",
            "arrow_component",
        ),
        (
            r"const\s+([A-Z]\w*)\s*(?::[^=]*)?=\s*(?:async\s+)?\([^)]*\)\s*=>\s*\(",
            "arrow_component",
        ),
        (
            r"export\s+default\s+function\s+([A-Z]\w*)\s*\([^)]*\)\s*\{",
            "default_export_component",
        ),
        (r"function\s+([A-Z]\w*)\s*\([^)]*\)\s*\{", "function_component"),
    ])
});

static IMPORT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^import\s+.*$").expect("static pattern must compile"));

/// Keywords the generic `name(...) {` pattern would otherwise report as methods.
const CONTROL_KEYWORDS: &[&str] = &["if", "for", "while", "switch", "catch", "with", "function"];

/// Best-effort end-of-block finder for brace-delimited bodies.
///
/// Scans from `start` and counts `{` and `}` per line, beginning with the first
/// line that contains `{`. Returns the line where the running count drops back
/// to zero, or the last line when it never does.
///
/// Braces inside string literals, template literals, regex literals and
/// comments are counted like any other, so such content can end a block early
/// or push its end to the end of the file. A declaration whose body carries no
/// braces (e.g. `=> (` returning markup) extends to the next balanced brace
/// group found below it.
pub fn find_block_end(lines: &[&str], start: usize) -> usize {
    let last = lines.len().saturating_sub(1);
    let mut depth: i64 = 0;
    let mut opened = false;

    for (i, line) in lines.iter().enumerate().skip(start) {
        if !opened && line.contains('{') {
            opened = true;
        }
        if opened {
            let opens = line.matches('{').count() as i64;
            let closes = line.matches('}').count() as i64;
            depth += opens - closes;
            if depth <= 0 {
                return i;
            }
        }
    }

    last
}

/// Pattern-based extractor. Needs no grammar and accepts any file type.
#[derive(Debug, Default, Clone, Copy)]
pub struct PatternExtractor;

impl PatternExtractor {
    pub fn new() -> Self {
        Self
    }

    fn extract_blocks(
        &self,
        lines: &[&str],
        patterns: &[LinePattern],
        chunk_type: &str,
        file: &FileInfo,
    ) -> Vec<Chunk> {
        let mut chunks = Vec::new();

        for (i, line) in lines.iter().enumerate() {
            let Some((name, node_type)) = patterns.iter().find_map(|p| {
                p.regex
                    .captures(line)
                    .and_then(|caps| caps.get(1))
                    .map(|m| (m.as_str(), p.node_type))
            }) else {
                continue;
            };

            if node_type == "method_definition" && CONTROL_KEYWORDS.contains(&name) {
                continue;
            }

            let end = find_block_end(lines, i);
            chunks.push(Chunk::new(
                chunk_type,
                Some(name),
                lines[i..=end].join("\n"),
                (i, end),
                node_type,
                file,
            ));
        }

        chunks
    }

    fn extract_imports(&self, lines: &[&str], file: &FileInfo) -> Vec<Chunk> {
        lines
            .iter()
            .enumerate()
            .filter(|(_, line)| IMPORT_PATTERN.is_match(line.trim()))
            .map(|(i, line)| {
                Chunk::new(
                    kind::IMPORT,
                    None,
                    line.trim(),
                    (i, i),
                    "import_statement",
                    file,
                )
            })
            .collect()
    }
}

impl ChunkExtractor for PatternExtractor {
    fn name(&self) -> &'static str {
        "pattern"
    }

    fn extract(&self, content: &str, file_path: &str) -> Result<Vec<Chunk>, ExtractError> {
        let file = FileInfo::new(file_path, content);
        let lines: Vec<&str> = content.split('\n').collect();

        let mut chunks = self.extract_blocks(&lines, &FUNCTION_PATTERNS, kind::FUNCTION, &file);
        chunks.extend(self.extract_blocks(&lines, &COMPONENT_PATTERNS, kind::COMPONENT, &file));
        chunks.extend(self.extract_imports(&lines, &file));
        Ok(chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(src: &str) -> Vec<Chunk> {
        PatternExtractor::new().extract(src, "src/sample.tsx").unwrap()
    }

    #[test]
    fn test_single_line_function() {
        let chunks = extract("function add(a, b) { return a + b; }\n");
        assert_eq!(chunks.len(), 1);
        let c = &chunks[0];
        assert_eq!(c.chunk_type, kind::FUNCTION);
        assert_eq!(c.name, "add");
        assert_eq!((c.start_line, c.end_line), (0, 0));
        assert_eq!(c.code, "function add(a, b) { return a + b; }");
        assert_eq!(c.file.total_lines, 2);
    }

    #[test]
    fn test_block_end_counts_nested_braces() {
        let lines = vec![
            "function outer() {",
            "  if (x) {",
            "    y();",
            "  }",
            "}",
            "const after = 1;",
        ];
        assert_eq!(find_block_end(&lines, 0), 4);
        assert_eq!(find_block_end(&lines, 1), 3);
    }

    #[test]
    fn test_block_end_waits_for_first_brace() {
        let lines = vec!["export const List = (", "  props", ") => {", "  return 1;", "}"];
        assert_eq!(find_block_end(&lines, 0), 4);
    }

    #[test]
    fn test_unbalanced_block_runs_to_last_line() {
        let lines = vec!["function broken() {", "  const s = '{';", "}", ""];
        assert_eq!(find_block_end(&lines, 0), 3);
    }

    #[test]
    fn test_component_also_reported_as_function() {
        let src = "const Card = (props) => {\n  return <div>{props.title}</div>;\n};\n";
        let chunks = extract(src);

        let func = chunks.iter().find(|c| c.chunk_type == kind::FUNCTION).unwrap();
        let comp = chunks.iter().find(|c| c.chunk_type == kind::COMPONENT).unwrap();
        assert_eq!(func.name, "Card");
        assert_eq!(comp.name, "Card");
        assert_eq!(comp.node_type, "arrow_component");
        assert_eq!((comp.start_line, comp.end_line), (0, 2));
        assert_eq!(func.code, comp.code);
    }

    #[test]
    fn test_lowercase_function_is_not_component() {
        let chunks = extract("function helper() {\n}\n");
        assert!(chunks.iter().all(|c| c.chunk_type != kind::COMPONENT));
    }

    #[test]
    fn test_control_flow_is_not_a_method() {
        let src = "function run() {\n  if (ok) {\n    go();\n  }\n}\n";
        let chunks = extract(src);
        let names: Vec<&str> = chunks.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["run"]);
    }

    #[test]
    fn test_method_definition() {
        let src = "class Store {\n  save(item) {\n    this.items.push(item);\n  }\n}\n";
        let chunks = extract(src);
        let save = chunks.iter().find(|c| c.name == "save").unwrap();
        assert_eq!(save.node_type, "method_definition");
        assert_eq!((save.start_line, save.end_line), (1, 3));
    }

    #[test]
    fn test_imports_one_per_line() {
        let src = "'use client'\n\nimport { useState } from 'react';\n  import Button from './Button';\nconst x = 1;\n";
        let imports: Vec<Chunk> = extract(src)
            .into_iter()
            .filter(|c| c.chunk_type == kind::IMPORT)
            .collect();
        assert_eq!(imports.len(), 2);
        assert_eq!(imports[0].start_line, 2);
        assert_eq!(imports[1].code, "import Button from './Button';");
        assert_eq!(imports[1].name, "unnamed");
    }

    #[test]
    fn test_passes_are_ordered_by_category() {
        let src = "import a from 'a';\nexport default function Page() {\n  return null;\n}\n";
        let chunks = extract(src);
        let types: Vec<&str> = chunks.iter().map(|c| c.chunk_type.as_str()).collect();
        assert_eq!(types, vec![kind::FUNCTION, kind::COMPONENT, kind::IMPORT]);
    }

    #[test]
    fn test_typed_arrow_component() {
        let src = "const Header: React.FC<Props> = ({ title }) => (\n  <h1>{title}</h1>\n);\n";
        let comp = extract(src)
            .into_iter()
            .find(|c| c.chunk_type == kind::COMPONENT)
            .unwrap();
        assert_eq!(comp.name, "Header");
    }
}
