pub mod builder;
pub mod chunker;
pub mod composer;
pub mod extractor;
pub mod utils;
pub mod wikidata;

pub use builder::{GraphBuilder, IngestStats};
pub use chunker::{ChunkConfig, Chunker, SentenceChunker};
pub use composer::AnswerComposer;
pub use extractor::{EntityExtractor, ExtractionOutcome, LlmEntityExtractor};
pub use utils::{TiktokenTokenizer, Tokenizer, compute_hash_id};
pub use wikidata::WikidataMatcher;
