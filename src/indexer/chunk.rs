use std::path::Path;

/// Chunk type tags emitted by the built-in extractors. The set is open: a
/// custom [`ChunkExtractor`](super::extractor::ChunkExtractor) may emit any tag.
pub mod kind {
    pub const FUNCTION: &str = "function";
    pub const COMPONENT: &str = "component";
    pub const IMPORT: &str = "import";
}

/// Name used when an extractor cannot determine one.
pub const UNNAMED: &str = "unnamed";

/// File-level attributes copied onto every chunk extracted from a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub file_path: String,
    pub file_name: String,
    pub total_lines: usize,
    pub file_size: usize,
}

impl FileInfo {
    /// Describe `content` as read from `file_path`.
    ///
    /// Line count follows `split('\n')`, so a trailing newline counts as one
    /// more (empty) line. Size is the UTF-8 byte length.
    pub fn new(file_path: &str, content: &str) -> Self {
        let file_path = file_path.replace('\\', "/");
        let file_name = Path::new(&file_path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| file_path.clone());

        Self {
            file_path,
            file_name,
            total_lines: content.split('\n').count(),
            file_size: content.len(),
        }
    }
}

/// A structural unit found in one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub chunk_type: String,
    pub name: String,
    pub code: String,
    /// 0-based, inclusive.
    pub start_line: usize,
    /// 0-based, inclusive.
    pub end_line: usize,
    pub node_type: String,
    pub file: FileInfo,
}

impl Chunk {
    pub fn new(
        chunk_type: &str,
        name: Option<&str>,
        code: impl Into<String>,
        lines: (usize, usize),
        node_type: &str,
        file: &FileInfo,
    ) -> Self {
        let name = match name {
            Some(n) if !n.trim().is_empty() => n.to_string(),
            _ => UNNAMED.to_string(),
        };
        Self {
            chunk_type: chunk_type.to_string(),
            name,
            code: code.into(),
            start_line: lines.0,
            end_line: lines.1,
            node_type: node_type.to_string(),
            file: file.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_info() {
        let info = FileInfo::new("src\\components\\Button.tsx", "a\nb\n");
        assert_eq!(info.file_path, "src/components/Button.tsx");
        assert_eq!(info.file_name, "Button.tsx");
        assert_eq!(info.total_lines, 3);
        assert_eq!(info.file_size, 4);
    }

    #[test]
    fn test_file_name_from_unix_path() {
        let info = FileInfo::new("src/atoms/Text/index.tsx", "");
        assert_eq!(info.file_name, "index.tsx");
        assert_eq!(info.total_lines, 1);
    }

    #[test]
    fn test_missing_name_becomes_unnamed() {
        let info = FileInfo::new("a.ts", "import x from 'y';");
        let code = "import x from 'y';";
        let chunk = Chunk::new(kind::IMPORT, None, code, (0, 0), "import_statement", &info);
        assert_eq!(chunk.name, UNNAMED);

        let blank = Chunk::new(
            kind::FUNCTION,
            Some("  "),
            "",
            (0, 0),
            "function_declaration",
            &info,
        );
        assert_eq!(blank.name, UNNAMED);
    }
}
