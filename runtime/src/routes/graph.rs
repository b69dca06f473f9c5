use std::sync::Arc;

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct EntityResponse {
    pub name: String,
    pub entity_type: String,
    pub wikidata_id: Option<String>,
}

#[derive(Serialize)]
pub struct RelationResponse {
    pub source: String,
    pub target: String,
    pub relation_type: String,
    pub inferred: bool,
}

#[derive(Serialize)]
pub struct GraphResponse {
    pub entities: Vec<EntityResponse>,
    pub relations: Vec<RelationResponse>,
}

#[derive(Serialize)]
pub struct GraphStatsResponse {
    pub chunks: usize,
    pub entities: usize,
    pub mentions: usize,
    pub relations: usize,
}

pub fn graph_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/graph", get(get_graph))
        .route("/graph/stats", get(get_graph_stats))
}

async fn get_graph(State(state): State<Arc<AppState>>) -> Json<GraphResponse> {
    let graph = state.graph.read().await;

    let entities = graph
        .entities()
        .into_iter()
        .map(|entity| EntityResponse {
            name: entity.name.clone(),
            entity_type: entity.entity_type.clone(),
            wikidata_id: entity.wikidata_id.clone(),
        })
        .collect();

    let relations = graph
        .relations()
        .into_iter()
        .map(|(source, target, edge)| RelationResponse {
            source: source.name.clone(),
            target: target.name.clone(),
            relation_type: edge.relation_type.clone(),
            inferred: edge.inferred,
        })
        .collect();

    Json(GraphResponse {
        entities,
        relations,
    })
}

async fn get_graph_stats(State(state): State<Arc<AppState>>) -> Json<GraphStatsResponse> {
    let graph = state.graph.read().await;
    Json(GraphStatsResponse {
        chunks: graph.chunk_count(),
        entities: graph.entity_count(),
        mentions: graph.mention_count(),
        relations: graph.relation_count(),
    })
}
