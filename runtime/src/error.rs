use thiserror::Error;

/// Errors surfaced by the retrieval core.
///
/// An empty hit list is never an error; callers get `Ok(vec![])` for fresh
/// corpora and queries with no semantic overlap. Only internally
/// inconsistent data aborts a retrieve call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RetrievalError {
    /// Two vectors from different embedding spaces were compared. The
    /// corpus and the query must be embedded with the same model.
    #[error("embedding dimension mismatch: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },
}
