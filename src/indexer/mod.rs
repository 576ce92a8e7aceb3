//! Chunk extraction, splitting, identity and description, plus the pipeline
//! that turns chunks into stored records.
pub mod chunk;
pub mod core;
pub mod describe;
pub mod extractor;
pub mod identity;
pub mod languages;
pub mod pattern;
pub mod splitter;
pub mod syntax;

pub use chunk::{Chunk, FileInfo};
pub use self::core::Indexer;
pub use extractor::{ChunkExtractor, ExtractError, ExtractorKind};
