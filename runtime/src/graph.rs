use std::collections::HashMap;

use petgraph::{
    Direction,
    stable_graph::{NodeIndex, StableDiGraph},
    visit::{EdgeRef, IntoEdgeReferences},
};

/// One unit of ingested text. Chunks without an embedding are excluded
/// from vector search but stay reachable through entity co-mention.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub id: String,
    pub text: String,
    pub embedding: Option<Vec<f32>>,
}

/// A named concept extracted from one or more chunks. Entities are
/// deduplicated by exact name across the whole ingestion run.
#[derive(Debug, Clone)]
pub struct Entity {
    pub name: String,
    pub entity_type: String,
    pub wikidata_id: Option<String>,
}

/// Chunk -> Entity edge recording that the chunk refers to the entity.
#[derive(Debug, Clone)]
pub struct MentionsEdge {
    pub weight: f64,
}

/// Entity -> Entity edge. Not consumed by ranking; kept for graph-path
/// expansion and for the graph inspection routes.
#[derive(Debug, Clone)]
pub struct RelationEdge {
    pub relation_type: String,
    pub inferred: bool,
}

#[derive(Debug, Clone)]
enum GraphNode {
    Chunk(Chunk),
    Entity(Entity),
}

#[derive(Debug, Clone)]
enum GraphEdge {
    Mentions(MentionsEdge),
    Relation(RelationEdge),
}

/// Directed graph of chunk and entity nodes with secondary indexes for
/// id/name lookup. Ingestion mutates it under a write lock; retrieval
/// only ever reads.
///
/// Neighborhood queries return sorted results (entities by name, chunks
/// by id) so that ranking stays deterministic regardless of insertion
/// order.
#[derive(Default)]
pub struct EntityGraph {
    graph: StableDiGraph<GraphNode, GraphEdge>,
    chunks_by_id: HashMap<String, NodeIndex>,
    entities_by_name: HashMap<String, NodeIndex>,
}

impl EntityGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a chunk node. An empty embedding is normalized to `None`.
    /// Chunk ids are globally unique; re-adding an existing id is a no-op.
    /// Returns whether the chunk was newly created.
    pub fn add_chunk(&mut self, id: &str, text: &str, embedding: Vec<f32>) -> bool {
        if self.chunks_by_id.contains_key(id) {
            return false;
        }
        let chunk = Chunk {
            id: id.to_string(),
            text: text.to_string(),
            embedding: if embedding.is_empty() {
                None
            } else {
                Some(embedding)
            },
        };
        let index = self.graph.add_node(GraphNode::Chunk(chunk));
        self.chunks_by_id.insert(id.to_string(), index);
        true
    }

    /// Insert an entity node, deduplicated by exact name. The first
    /// writer fixes the entity type. Returns whether the entity was
    /// newly created.
    pub fn add_entity(&mut self, name: &str, entity_type: &str) -> bool {
        if self.entities_by_name.contains_key(name) {
            return false;
        }
        let entity = Entity {
            name: name.to_string(),
            entity_type: entity_type.to_string(),
            wikidata_id: None,
        };
        let index = self.graph.add_node(GraphNode::Entity(entity));
        self.entities_by_name.insert(name.to_string(), index);
        true
    }

    /// Attach a knowledge-base id to an existing entity. Ingestion
    /// enrichment only; ranking never reads it.
    pub fn set_entity_external_id(&mut self, name: &str, external_id: &str) -> bool {
        let Some(&index) = self.entities_by_name.get(name) else {
            return false;
        };
        if let Some(GraphNode::Entity(entity)) = self.graph.node_weight_mut(index) {
            entity.wikidata_id = Some(external_id.to_string());
            return true;
        }
        false
    }

    /// Record that a chunk mentions an entity. Duplicate (chunk, entity)
    /// pairs are collapsed into one edge.
    pub fn add_mention(&mut self, chunk_id: &str, entity_name: &str, weight: f64) -> bool {
        let (Some(&chunk_index), Some(&entity_index)) = (
            self.chunks_by_id.get(chunk_id),
            self.entities_by_name.get(entity_name),
        ) else {
            return false;
        };
        let already_linked = self
            .graph
            .edges_connecting(chunk_index, entity_index)
            .any(|edge| matches!(edge.weight(), GraphEdge::Mentions(_)));
        if already_linked {
            return false;
        }
        self.graph.add_edge(
            chunk_index,
            entity_index,
            GraphEdge::Mentions(MentionsEdge { weight }),
        );
        true
    }

    /// Record a typed relation between two entities. Relations that
    /// reference unknown entities are dropped.
    pub fn add_relation(
        &mut self,
        source_name: &str,
        target_name: &str,
        relation_type: &str,
        inferred: bool,
    ) -> bool {
        let (Some(&source_index), Some(&target_index)) = (
            self.entities_by_name.get(source_name),
            self.entities_by_name.get(target_name),
        ) else {
            return false;
        };
        self.graph.add_edge(
            source_index,
            target_index,
            GraphEdge::Relation(RelationEdge {
                relation_type: relation_type.to_string(),
                inferred,
            }),
        );
        true
    }

    /// All chunk nodes in insertion order.
    pub fn chunks(&self) -> Vec<&Chunk> {
        self.graph
            .node_indices()
            .filter_map(|index| self.chunk_at(index))
            .collect()
    }

    /// All entity nodes in insertion order.
    pub fn entities(&self) -> Vec<&Entity> {
        self.graph
            .node_indices()
            .filter_map(|index| self.entity_at(index))
            .collect()
    }

    pub fn chunk_by_id(&self, id: &str) -> Option<&Chunk> {
        self.chunks_by_id
            .get(id)
            .and_then(|&index| self.chunk_at(index))
    }

    pub fn entity_by_name(&self, name: &str) -> Option<&Entity> {
        self.entities_by_name
            .get(name)
            .and_then(|&index| self.entity_at(index))
    }

    /// Entities linked from this chunk via mentions edges, sorted by name.
    pub fn entities_mentioned_in(&self, chunk_id: &str) -> Vec<&Entity> {
        let Some(&chunk_index) = self.chunks_by_id.get(chunk_id) else {
            return Vec::new();
        };
        let mut entities: Vec<&Entity> = self
            .graph
            .edges_directed(chunk_index, Direction::Outgoing)
            .filter(|edge| matches!(edge.weight(), GraphEdge::Mentions(_)))
            .filter_map(|edge| self.entity_at(edge.target()))
            .collect();
        entities.sort_by(|a, b| a.name.cmp(&b.name));
        entities
    }

    /// Inverse lookup: all chunks linked to this entity, sorted by id.
    pub fn chunks_mentioning(&self, entity_name: &str) -> Vec<&Chunk> {
        let Some(&entity_index) = self.entities_by_name.get(entity_name) else {
            return Vec::new();
        };
        let mut chunks: Vec<&Chunk> = self
            .graph
            .edges_directed(entity_index, Direction::Incoming)
            .filter(|edge| matches!(edge.weight(), GraphEdge::Mentions(_)))
            .filter_map(|edge| self.chunk_at(edge.source()))
            .collect();
        chunks.sort_by(|a, b| a.id.cmp(&b.id));
        chunks
    }

    /// All relation edges with their endpoint entities.
    pub fn relations(&self) -> Vec<(&Entity, &Entity, &RelationEdge)> {
        self.graph
            .edge_references()
            .filter_map(|edge| match edge.weight() {
                GraphEdge::Relation(relation) => {
                    let source = self.entity_at(edge.source())?;
                    let target = self.entity_at(edge.target())?;
                    Some((source, target, relation))
                }
                GraphEdge::Mentions(_) => None,
            })
            .collect()
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks_by_id.len()
    }

    pub fn entity_count(&self) -> usize {
        self.entities_by_name.len()
    }

    pub fn mention_count(&self) -> usize {
        self.graph
            .edge_references()
            .filter(|edge| matches!(edge.weight(), GraphEdge::Mentions(_)))
            .count()
    }

    pub fn relation_count(&self) -> usize {
        self.graph
            .edge_references()
            .filter(|edge| matches!(edge.weight(), GraphEdge::Relation(_)))
            .count()
    }

    fn chunk_at(&self, index: NodeIndex) -> Option<&Chunk> {
        match self.graph.node_weight(index)? {
            GraphNode::Chunk(chunk) => Some(chunk),
            GraphNode::Entity(_) => None,
        }
    }

    fn entity_at(&self, index: NodeIndex) -> Option<&Entity> {
        match self.graph.node_weight(index)? {
            GraphNode::Entity(entity) => Some(entity),
            GraphNode::Chunk(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_graph() -> EntityGraph {
        let mut graph = EntityGraph::new();
        graph.add_chunk("chunk-a", "Alice works at Acme.", vec![1.0, 0.0]);
        graph.add_chunk("chunk-b", "Acme is based in Berlin.", vec![0.0, 1.0]);
        graph.add_entity("Alice", "Person");
        graph.add_entity("Acme", "Organization");
        graph.add_mention("chunk-a", "Alice", 1.0);
        graph.add_mention("chunk-a", "Acme", 1.0);
        graph.add_mention("chunk-b", "Acme", 1.0);
        graph
    }

    #[test]
    fn entities_are_deduplicated_by_name() {
        let mut graph = EntityGraph::new();
        assert!(graph.add_entity("Acme", "Organization"));
        assert!(!graph.add_entity("Acme", "Location"));
        assert_eq!(graph.entity_count(), 1);
        // first writer fixes the type
        assert_eq!(graph.entity_by_name("Acme").unwrap().entity_type, "Organization");
    }

    #[test]
    fn duplicate_chunk_ids_are_ignored() {
        let mut graph = EntityGraph::new();
        assert!(graph.add_chunk("chunk-a", "first", vec![1.0]));
        assert!(!graph.add_chunk("chunk-a", "second", vec![2.0]));
        assert_eq!(graph.chunk_by_id("chunk-a").unwrap().text, "first");
    }

    #[test]
    fn empty_embedding_normalizes_to_none() {
        let mut graph = EntityGraph::new();
        graph.add_chunk("chunk-a", "no vector", Vec::new());
        assert!(graph.chunk_by_id("chunk-a").unwrap().embedding.is_none());
    }

    #[test]
    fn mention_queries_work_in_both_directions() {
        let graph = sample_graph();

        let entities: Vec<&str> = graph
            .entities_mentioned_in("chunk-a")
            .iter()
            .map(|entity| entity.name.as_str())
            .collect();
        assert_eq!(entities, vec!["Acme", "Alice"]);

        let chunks: Vec<&str> = graph
            .chunks_mentioning("Acme")
            .iter()
            .map(|chunk| chunk.id.as_str())
            .collect();
        assert_eq!(chunks, vec!["chunk-a", "chunk-b"]);
    }

    #[test]
    fn duplicate_mentions_collapse_into_one_edge() {
        let mut graph = sample_graph();
        assert!(!graph.add_mention("chunk-a", "Alice", 1.0));
        assert_eq!(graph.mention_count(), 3);
    }

    #[test]
    fn relations_require_known_endpoints() {
        let mut graph = sample_graph();
        assert!(graph.add_relation("Alice", "Acme", "works_for", false));
        assert!(!graph.add_relation("Alice", "Nowhere", "visited", false));
        assert_eq!(graph.relation_count(), 1);

        let relations = graph.relations();
        assert_eq!(relations.len(), 1);
        let (source, target, edge) = &relations[0];
        assert_eq!(source.name, "Alice");
        assert_eq!(target.name, "Acme");
        assert_eq!(edge.relation_type, "works_for");
    }

    #[test]
    fn external_id_enrichment_is_optional() {
        let mut graph = sample_graph();
        assert!(graph.set_entity_external_id("Acme", "Q42"));
        assert!(!graph.set_entity_external_id("Nowhere", "Q0"));
        assert_eq!(
            graph.entity_by_name("Acme").unwrap().wikidata_id.as_deref(),
            Some("Q42")
        );
        assert!(graph.entity_by_name("Alice").unwrap().wikidata_id.is_none());
    }
}
