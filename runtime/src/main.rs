use std::{net::SocketAddr, sync::Arc};

use anyhow::{Context, Result};
use axum::{Router, routing::get};
use dotenvy::dotenv;
use tokio::{net::TcpListener, signal, sync::RwLock, time::Duration};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use graphrag_runtime::{
    AppState,
    ai::OllamaClient,
    config,
    embeddings::{EmbeddingProvider, OllamaEmbedder},
    graph::EntityGraph,
    pipeline::{
        AnswerComposer, Chunker, EntityExtractor, GraphBuilder, LlmEntityExtractor,
        SentenceChunker, TiktokenTokenizer, Tokenizer, WikidataMatcher,
    },
    retrieval::Retriever,
    routes,
};

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        error!(error = %err, "Runtime crashed");
        eprintln!("Runtime crashed: {err}");
    }
}

async fn run() -> Result<()> {
    init_tracing();
    if let Err(err) = dotenv() {
        warn!(error = %err, "No .env file loaded");
    }

    let config = config::load_config()
        .await
        .context("Failed to load application configuration")?;

    let client = Arc::new(OllamaClient::new(
        config.ollama.base_url.clone(),
        Duration::from_secs(config.ollama.request_timeout_secs),
    ));
    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(OllamaEmbedder::new(
        client.clone(),
        config.ollama.embed_model.clone(),
    ));
    let extractor: Arc<dyn EntityExtractor> = Arc::new(LlmEntityExtractor::new(
        client.clone(),
        config.ollama.chat_model.clone(),
    ));
    let tokenizer: Arc<dyn Tokenizer> =
        Arc::new(TiktokenTokenizer::new().context("Failed to initialize tokenizer")?);
    let chunker: Arc<dyn Chunker> = Arc::new(SentenceChunker::new(tokenizer));

    let graph = Arc::new(RwLock::new(EntityGraph::new()));
    let retriever = Retriever::new(graph.clone(), embedder.clone());
    let mut builder = GraphBuilder::new(embedder, extractor);
    if config.enrich_entities {
        builder = builder.with_enrichment(Arc::new(WikidataMatcher::new()));
    }
    let composer = AnswerComposer::new(client, config.ollama.chat_model.clone());

    let state = Arc::new(AppState {
        config: Arc::new(config.clone()),
        graph,
        retriever,
        builder,
        chunker,
        composer,
    });

    let addr_string = format!("{}:{}", config.server.host, config.server.port);
    let addr = addr_string
        .parse::<SocketAddr>()
        .with_context(|| format!("Invalid server address: {addr_string}"))?;
    info!(host = %config.server.host, port = config.server.port, "Loaded configuration");

    let app = Router::new()
        .route("/health", get(health))
        .merge(routes::document_routes())
        .merge(routes::query_routes())
        .merge(routes::graph_routes())
        .with_state(state);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind TCP listener on {addr}"))?;
    info!(%addr, "Runtime server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server encountered a fatal error")?;
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

#[inline]
async fn health() -> &'static str {
    "ok"
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "Failed to listen for Ctrl+C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                if stream.recv().await.is_some() {
                    info!("Received SIGTERM");
                }
            }
            Err(err) => warn!(error = %err, "Failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received termination signal (Ctrl+C)");
        }
        _ = terminate => {
            info!("Received termination signal (SIGTERM)");
        }
    }
}
