use std::sync::Arc;

use anyhow::{Result, anyhow};

use crate::pipeline::utils::Tokenizer;

#[derive(Debug, Clone)]
pub struct ChunkConfig {
    pub target_tokens: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self { target_tokens: 500 }
    }
}

pub trait Chunker: Send + Sync {
    fn chunk(&self, content: &str, config: &ChunkConfig) -> Result<Vec<String>>;
}

/// Splits text at sentence boundaries and greedily packs sentences until
/// the token budget is reached. A single sentence longer than the budget
/// becomes its own chunk rather than being split mid-sentence.
pub struct SentenceChunker {
    tokenizer: Arc<dyn Tokenizer>,
}

impl SentenceChunker {
    pub fn new(tokenizer: Arc<dyn Tokenizer>) -> Self {
        Self { tokenizer }
    }
}

impl Chunker for SentenceChunker {
    fn chunk(&self, content: &str, config: &ChunkConfig) -> Result<Vec<String>> {
        if config.target_tokens == 0 {
            return Err(anyhow!("target_tokens must be at least 1"));
        }

        let text = normalize_whitespace(content);
        let mut chunks = Vec::new();
        let mut current = String::new();
        let mut tokens = 0usize;

        for sentence in split_sentences(&text) {
            let sentence_tokens = self.tokenizer.encode(&sentence).len();
            if tokens + sentence_tokens > config.target_tokens && !current.is_empty() {
                chunks.push(current.trim().to_string());
                current.clear();
                tokens = 0;
            }
            current.push_str(&sentence);
            current.push(' ');
            tokens += sentence_tokens;
        }

        let tail = current.trim();
        if !tail.is_empty() {
            chunks.push(tail.to_string());
        }
        Ok(chunks)
    }
}

/// Unify CRLF, collapse newline runs, collapse horizontal whitespace.
fn normalize_whitespace(text: &str) -> String {
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");
    let mut out = String::with_capacity(unified.len());
    let mut last: Option<char> = None;
    for raw in unified.chars() {
        let c = if raw == '\t' { ' ' } else { raw };
        match c {
            '\n' if last == Some('\n') => continue,
            ' ' if last == Some(' ') => continue,
            _ => {}
        }
        out.push(c);
        last = Some(c);
    }
    out
}

/// Split after `.`, `!` or `?` followed by whitespace.
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut after_terminal = false;
    for c in text.chars() {
        if after_terminal && c.is_whitespace() {
            let sentence = current.trim();
            if !sentence.is_empty() {
                sentences.push(sentence.to_string());
            }
            current.clear();
            after_terminal = false;
            continue;
        }
        after_terminal = matches!(c, '.' | '!' | '?');
        current.push(c);
    }
    let sentence = current.trim();
    if !sentence.is_empty() {
        sentences.push(sentence.to_string());
    }
    sentences
}
