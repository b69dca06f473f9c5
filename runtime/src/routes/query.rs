use std::sync::Arc;

use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{AppState, retrieval::Hit};

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    pub k: Option<usize>,
    pub expand_per_entity: Option<usize>,
    #[serde(default)]
    pub compose: bool,
}

#[derive(Serialize)]
pub struct QueryResponse {
    pub hits: Vec<Hit>,
    pub answer: Option<String>,
}

pub fn query_routes() -> Router<Arc<AppState>> {
    Router::new().route("/query", post(run_query))
}

async fn run_query(
    State(state): State<Arc<AppState>>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, (StatusCode, String)> {
    let k = request
        .k
        .unwrap_or(state.config.retrieval.default_k)
        .max(1);
    let expand_per_entity = request
        .expand_per_entity
        .unwrap_or(state.config.retrieval.default_expand_per_entity);

    let hits = state
        .retriever
        .retrieve(&request.query, k, expand_per_entity)
        .await
        .map_err(|err| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("retrieval failed: {err}"),
            )
        })?;
    info!(hits = hits.len(), k, expand_per_entity, "query served");

    let answer = if request.compose {
        Some(state.composer.compose(&request.query, &hits).await)
    } else {
        None
    };

    Ok(Json(QueryResponse { hits, answer }))
}
