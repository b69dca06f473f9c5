use std::sync::Arc;

use anyhow::Result;
use tokio::sync::RwLock;

use graphrag_runtime::{
    embeddings::{EmbeddingProvider, TfIdfEmbedder},
    graph::EntityGraph,
    retrieval::Retriever,
};

/// Network-free retrieval demo: tf-idf embeddings over a tiny corpus and
/// a hand-built entity graph.
#[tokio::main]
async fn main() -> Result<()> {
    let corpus = vec![
        "GraphRAG augments retrieval with a knowledge graph.".to_string(),
        "Neo4j is a popular graph database used to store connected data.".to_string(),
        "Embeddings map text into vectors for similarity search.".to_string(),
    ];

    let mut embedder = TfIdfEmbedder::new();
    embedder.fit(&corpus);

    let mut graph = EntityGraph::new();
    for (index, text) in corpus.iter().enumerate() {
        let id = format!("doc:{index}");
        graph.add_chunk(&id, text, embedder.embed(text).await);
    }
    graph.add_entity("GraphRAG", "Thing");
    graph.add_entity("Neo4j", "Organization");
    graph.add_mention("doc:0", "GraphRAG", 1.0);
    graph.add_mention("doc:2", "GraphRAG", 1.0);
    graph.add_mention("doc:1", "Neo4j", 1.0);
    graph.add_relation("GraphRAG", "Neo4j", "uses", false);

    let retriever = Retriever::new(Arc::new(RwLock::new(graph)), Arc::new(embedder));
    let hits = retriever
        .retrieve("What is a knowledge graph?", 2, 1)
        .await?;

    for hit in hits {
        println!("{} -> score={:.4}", hit.chunk_id, hit.score);
        println!("  {}", hit.text);
    }
    Ok(())
}
