use std::sync::Arc;

use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::{
    AppState,
    pipeline::{ChunkConfig, compute_hash_id},
};

#[derive(Debug, Deserialize)]
pub struct InsertTextRequest {
    pub text: String,
    pub doc_id: Option<String>,
}

#[derive(Serialize)]
pub struct InsertResponse {
    pub status: String,
    pub track_id: String,
    pub doc_id: String,
    pub chunks: usize,
    pub embedded_chunks: usize,
    pub entities: usize,
    pub relations: usize,
}

pub fn document_routes() -> Router<Arc<AppState>> {
    Router::new().route("/documents", post(insert_text))
}

async fn insert_text(
    State(state): State<Arc<AppState>>,
    Json(request): Json<InsertTextRequest>,
) -> Result<Json<InsertResponse>, (StatusCode, String)> {
    let text = request.text.trim();
    if text.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "document text is empty".into()));
    }

    let doc_id = request
        .doc_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| compute_hash_id(text, "doc-"));
    let track_id = format!("upload-{}", Uuid::new_v4());

    let pieces = state
        .chunker
        .chunk(
            text,
            &ChunkConfig {
                target_tokens: state.config.chunking.target_tokens,
            },
        )
        .map_err(|err| (StatusCode::BAD_REQUEST, format!("chunking failed: {err}")))?;

    let stats = state
        .builder
        .ingest(&state.graph, &doc_id, pieces)
        .await
        .map_err(|err| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("ingestion failed: {err}"),
            )
        })?;

    info!(
        doc_id = %stats.doc_id,
        chunks = stats.chunks,
        entities = stats.entities,
        relations = stats.relations,
        "document ingested"
    );

    Ok(Json(InsertResponse {
        status: "success".to_string(),
        track_id,
        doc_id: stats.doc_id.clone(),
        chunks: stats.chunks,
        embedded_chunks: stats.embedded_chunks,
        entities: stats.entities,
        relations: stats.relations,
    }))
}
