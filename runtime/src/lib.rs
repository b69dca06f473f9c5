pub mod ai;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod graph;
pub mod pipeline;
pub mod retrieval;
pub mod routes;
pub mod vector;

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::{
    config::AppConfig,
    graph::EntityGraph,
    pipeline::{AnswerComposer, Chunker, GraphBuilder},
    retrieval::Retriever,
};

/// Shared application state. Everything is injected at startup; there is
/// no process-global configuration or client.
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub graph: Arc<RwLock<EntityGraph>>,
    pub retriever: Retriever,
    pub builder: GraphBuilder,
    pub chunker: Arc<dyn Chunker>,
    pub composer: AnswerComposer,
}
