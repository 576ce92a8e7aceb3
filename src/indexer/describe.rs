//! Choice of the text that gets embedded for each chunk part.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::chunk::Chunk;

pub const NO_PURPOSE_FOUND: &str =
    "No explicit docstring or comment found. This chunk may define a function, class, or code block.";

/// Text-to-embed policy. Fixed per index: mixing policies in one index would
/// compare embeddings of different kinds of text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbedText {
    /// A generated summary: location, name, type and a purpose line taken
    /// from the first comment in the part.
    #[default]
    Description,
    /// The code part itself.
    RawCode,
}

impl EmbedText {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmbedText::Description => "description",
            EmbedText::RawCode => "raw_code",
        }
    }

    /// Text to embed for `code_part` of `chunk`.
    pub fn render(&self, chunk: &Chunk, code_part: &str) -> String {
        match self {
            EmbedText::Description => describe(chunk, code_part),
            EmbedText::RawCode => code_part.to_string(),
        }
    }

    /// The value stored in the record's `description` column.
    pub fn stored_description(&self, rendered: &str) -> Option<String> {
        match self {
            EmbedText::Description => Some(rendered.to_string()),
            EmbedText::RawCode => None,
        }
    }
}

impl fmt::Display for EmbedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmbedText {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "description" => Ok(EmbedText::Description),
            "raw_code" => Ok(EmbedText::RawCode),
            other => Err(format!("unknown embed text policy: {other}")),
        }
    }
}

/// Structured natural-language description of a chunk part.
pub fn describe(chunk: &Chunk, code_part: &str) -> String {
    let purpose = purpose_line(code_part).unwrap_or_else(|| NO_PURPOSE_FOUND.to_string());
    format!(
        "File: {}\nChunk Name: {}\nChunk Type: {}\nStart Line: {}, End Line: {}\nTotal Lines: {}\nPurpose: {}",
        chunk.file.file_path,
        chunk.name,
        chunk.chunk_type,
        chunk.start_line,
        chunk.end_line,
        chunk.file.total_lines,
        purpose
    )
}

/// First comment or docstring text in `code`, with its marker stripped.
///
/// Recognizes `"""`/`'''` docstrings, `//` and `#` line comments, and `/* */`
/// blocks including JSDoc `*` continuation lines. Markers with no text after
/// them are skipped.
pub fn purpose_line(code: &str) -> Option<String> {
    let mut in_block = false;

    for line in code.trim().lines() {
        let s = line.trim();

        let text = if s.starts_with("\"\"\"") || s.starts_with("'''") {
            s.trim_matches(['"', '\''])
        } else if let Some(rest) = s.strip_prefix("/*") {
            let (body, closed) = until_block_end(rest);
            in_block = !closed;
            body.trim_start_matches('*')
        } else if in_block && s.starts_with('*') {
            let (body, closed) = until_block_end(s);
            in_block = !closed;
            body.trim_start_matches('*')
        } else if let Some(rest) = s.strip_prefix("//") {
            rest.trim_start_matches('/')
        } else if let Some(rest) = hash_comment(s) {
            rest
        } else {
            continue;
        };

        let text = text.trim();
        if !text.is_empty() {
            return Some(text.to_string());
        }
    }

    None
}

/// Body of a `#` comment line. `#!` shebangs and `#field` private members
/// are code, not comments.
fn hash_comment(s: &str) -> Option<&str> {
    let rest = s.strip_prefix('#')?.trim_start_matches('#');
    (rest.is_empty() || rest.starts_with(char::is_whitespace)).then_some(rest)
}

/// Text before a closing `*/`, and whether one was found.
fn until_block_end(s: &str) -> (&str, bool) {
    match s.find("*/") {
        Some(end) => (&s[..end], true),
        None => (s, false),
    }
}
