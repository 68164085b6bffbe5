//! Types for the content graph.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Unique identifier for a knowledge node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub Uuid);

impl NodeId {
    /// Generate a new random node ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse from string.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A stored unit of user content plus its vector representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeNode {
    pub id: NodeId,
    pub title: String,
    pub content: String,
    /// Free-form type tag ("note", "page", "document", ...)
    #[serde(rename = "type")]
    pub node_type: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub owner_id: String,
    /// Neighbors in link order, without duplicates
    pub connections: Vec<NodeId>,
    /// L2-normalized hashed bag-of-words vector
    pub embedding: Vec<f32>,
}

impl KnowledgeNode {
    /// Title and content joined for matching.
    pub fn searchable_text(&self) -> String {
        format!("{} {}", self.title, self.content)
    }

    /// Append a neighbor if not already listed. Returns true if added.
    pub(crate) fn push_connection(&mut self, neighbor: NodeId, now: DateTime<Utc>) -> bool {
        if self.connections.contains(&neighbor) {
            return false;
        }
        self.connections.push(neighbor);
        self.updated_at = now;
        true
    }
}

/// One ranked search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub node: KnowledgeNode,
    /// Query match in [0, 1]
    pub similarity: f64,
    /// Recency and connectivity blend in [0, 1]
    pub relevance_score: f64,
    /// Short excerpt around the first matching term
    pub context: String,
}

impl SearchResult {
    /// Ranking key.
    pub fn score(&self) -> f64 {
        self.similarity + self.relevance_score
    }
}

/// Summary counts for a graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphStats {
    pub total_nodes: usize,
    /// Sum of adjacency-set sizes; a bidirectional link counts twice
    pub total_connections: usize,
    pub type_distribution: HashMap<String, usize>,
    pub average_connections: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_node() -> KnowledgeNode {
        let now = Utc::now();
        KnowledgeNode {
            id: NodeId::new(),
            title: "GPU".into(),
            content: "acceleration".into(),
            node_type: "note".into(),
            created_at: now,
            updated_at: now,
            owner_id: "user-1".into(),
            connections: Vec::new(),
            embedding: Vec::new(),
        }
    }

    #[test]
    fn test_node_id_roundtrip() {
        let id = NodeId::new();
        assert_eq!(NodeId::parse(&id.to_string()).unwrap(), id);
        assert!(NodeId::parse("not-a-uuid").is_err());
    }

    #[test]
    fn test_push_connection_dedupes() {
        let mut node = sample_node();
        let other = NodeId::new();
        let now = Utc::now();

        assert!(node.push_connection(other, now));
        assert!(!node.push_connection(other, now));
        assert_eq!(node.connections, vec![other]);
    }

    #[test]
    fn test_type_field_name() {
        let json = serde_json::to_value(sample_node()).unwrap();
        assert_eq!(json["type"], "note");
        assert!(json["id"].is_string());
    }
}
