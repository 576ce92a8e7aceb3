//! Splits oversized chunk code into overlapping, length-bounded windows.
//!
//! Text is first broken into pieces using the coarsest separator that occurs
//! (blank line, newline, space, then single characters), recursing into any
//! piece still over the bound. Pieces keep their trailing separator, so they
//! tile the input exactly. Consecutive pieces are then packed greedily into
//! windows, and each new window starts with the tail of the previous one, up
//! to the overlap size.
//!
//! Sizes are measured in characters; windows are returned as byte ranges or
//! owned strings.
use std::ops::Range;

pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

const SEPARATORS: &[&str] = &["\n\n", "\n", " "];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSplitter {
    chunk_size: usize,
    overlap: usize,
}

impl Default for ChunkSplitter {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_OVERLAP)
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

impl ChunkSplitter {
    /// `overlap` is clamped below `chunk_size`, and `chunk_size` to at least 1.
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            overlap: overlap.min(chunk_size - 1),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split `code` into windows. Code within the bound comes back unchanged
    /// as a single window.
    pub fn split(&self, code: &str) -> Vec<String> {
        if char_len(code) <= self.chunk_size {
            return vec![code.to_string()];
        }
        self.split_ranges(code)
            .into_iter()
            .map(|r| code[r].to_string())
            .collect()
    }

    /// Byte ranges of the windows [`split`](Self::split) returns.
    ///
    /// The first range starts at 0, the last ends at `code.len()`, and each
    /// range starts no later than the previous one ends.
    pub fn split_ranges(&self, code: &str) -> Vec<Range<usize>> {
        if char_len(code) <= self.chunk_size {
            return vec![0..code.len()];
        }
        let mut pieces = Vec::new();
        self.cut(code, 0, SEPARATORS, &mut pieces);
        self.merge(code, &pieces)
    }

    /// Break `text` (located at `base` in the input) into pieces no longer
    /// than the chunk size, preferring the earliest separator that occurs.
    fn cut(&self, text: &str, base: usize, separators: &[&str], out: &mut Vec<Range<usize>>) {
        let Some(pos) = separators.iter().position(|s| text.contains(*s)) else {
            // No separator left: fall back to single characters.
            out.extend(
                text.char_indices()
                    .map(|(i, c)| base + i..base + i + c.len_utf8()),
            );
            return;
        };

        let mut offset = base;
        for piece in text.split_inclusive(separators[pos]) {
            if char_len(piece) <= self.chunk_size {
                out.push(offset..offset + piece.len());
            } else {
                self.cut(piece, offset, &separators[pos + 1..], out);
            }
            offset += piece.len();
        }
    }

    /// Pack contiguous pieces into windows of at most `chunk_size` chars,
    /// carrying up to `overlap` chars of trailing pieces into the next window.
    fn merge(&self, code: &str, pieces: &[Range<usize>]) -> Vec<Range<usize>> {
        let lens: Vec<usize> = pieces.iter().map(|r| char_len(&code[r.clone()])).collect();

        let mut windows = Vec::new();
        // The open window is pieces[first..i].
        let mut first = 0;
        let mut total = 0;

        for (i, &len) in lens.iter().enumerate() {
            if total + len > self.chunk_size && i > first {
                windows.push(pieces[first].start..pieces[i - 1].end);
                while first < i
                    && (total > self.overlap || total + len > self.chunk_size)
                {
                    total -= lens[first];
                    first += 1;
                }
            }
            total += len;
        }

        if first < pieces.len() {
            windows.push(pieces[first].start..pieces[pieces.len() - 1].end);
        }
        windows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Rebuild the input from windows by dropping each window's overlap with
    /// its predecessor.
    fn reconstruct(code: &str, ranges: &[Range<usize>]) -> String {
        let mut out = String::new();
        let mut covered = 0;
        for r in ranges {
            assert!(r.start <= covered, "gap before {r:?}");
            if r.end > covered {
                out.push_str(&code[covered..r.end]);
                covered = r.end;
            }
        }
        out
    }

    fn long_code(functions: usize) -> String {
        (0..functions)
            .map(|i| {
                format!(
                    "function handler{i}(event) {{\n  const value = event.target.value;\n  setState(value + {i});\n}}\n\n"
                )
            })
            .collect()
    }

    #[test]
    fn test_short_code_is_returned_unchanged() {
        let splitter = ChunkSplitter::default();
        let code = "function add(a, b) { return a + b; }\n";
        assert_eq!(splitter.split(code), vec![code.to_string()]);

        let exact = "x".repeat(1000);
        assert_eq!(splitter.split(&exact), vec![exact.clone()]);
        assert_eq!(splitter.split(""), vec![String::new()]);
    }

    #[test]
    fn test_long_code_windows_are_bounded() {
        let splitter = ChunkSplitter::default();
        let code = long_code(60);
        assert!(code.len() > 1000);

        let windows = splitter.split(&code);
        assert!(windows.len() > 1);
        for w in &windows {
            assert!(w.chars().count() <= 1000, "window of {} chars", w.chars().count());
        }
    }

    #[test]
    fn test_windows_reconstruct_input() {
        let splitter = ChunkSplitter::default();
        let code = long_code(45);
        let ranges = splitter.split_ranges(&code);

        assert_eq!(ranges.first().unwrap().start, 0);
        assert_eq!(ranges.last().unwrap().end, code.len());
        assert_eq!(reconstruct(&code, &ranges), code);
    }

    #[test]
    fn test_overlap_is_bounded() {
        let splitter = ChunkSplitter::default();
        let code = long_code(45);
        let ranges = splitter.split_ranges(&code);
        for pair in ranges.windows(2) {
            let shared = pair[0].end.saturating_sub(pair[1].start);
            assert!(pair[1].start >= pair[0].start);
            assert!(pair[1].end > pair[0].end);
            assert!(code[pair[1].start..pair[1].start + shared].chars().count() <= 200);
        }
    }

    #[test]
    fn test_prefers_paragraph_boundaries() {
        let splitter = ChunkSplitter::default();
        let code = long_code(45);
        for w in splitter.split(&code) {
            assert!(w.starts_with("function handler"), "window starts mid-function: {w:?}");
        }
    }

    #[test]
    fn test_unbroken_token_falls_back_to_characters() {
        let splitter = ChunkSplitter::new(100, 20);
        let code = "é".repeat(350);
        let ranges = splitter.split_ranges(&code);
        for r in &ranges {
            assert!(code[r.clone()].chars().count() <= 100);
        }
        assert_eq!(reconstruct(&code, &ranges), code);
    }

    #[test]
    fn test_single_long_line_splits_on_spaces() {
        let splitter = ChunkSplitter::new(50, 10);
        let code = "word ".repeat(40);
        let windows = splitter.split(&code);
        assert!(windows.len() > 1);
        for w in &windows {
            assert!(w.chars().count() <= 50);
            assert!(w.starts_with("word"));
        }
    }

    #[test]
    fn test_overlap_clamped_below_size() {
        let splitter = ChunkSplitter::new(10, 50);
        assert_eq!(splitter.overlap(), 9);
        assert_eq!(ChunkSplitter::new(0, 0).chunk_size(), 1);
    }
}
