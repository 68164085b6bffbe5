//! Per-owner content graph.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info, instrument, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};
use crate::knowledge::config::{GraphConfig, SearchMode};
use crate::knowledge::embedding::{cosine_similarity, simple_text_to_vector};
use crate::knowledge::search::{
    connectivity_factor, extract_snippet, lexical_similarity, query_terms, recency_factor,
    relevance_score,
};
use crate::knowledge::store::{GraphSnapshot, GraphStore};
use crate::knowledge::types::{GraphStats, KnowledgeNode, NodeId, SearchResult};
use crate::knowledge::writer::{apply, SnapshotWriter, WriteRequest};

#[derive(Debug, Default)]
struct GraphState {
    nodes: HashMap<NodeId, KnowledgeNode>,
    /// Neighbors in link order; membership matches each node's `connections`
    adjacency: HashMap<NodeId, Vec<NodeId>>,
    embeddings: HashMap<NodeId, Vec<f32>>,
}

impl GraphState {
    fn to_snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self
                .nodes
                .iter()
                .map(|(id, node)| (id.to_string(), node.clone()))
                .collect(),
            connections: self
                .adjacency
                .iter()
                .map(|(id, set)| (id.to_string(), set.iter().map(NodeId::to_string).collect()))
                .collect(),
            embeddings: self
                .embeddings
                .iter()
                .map(|(id, v)| (id.to_string(), v.clone()))
                .collect(),
        }
    }

    fn from_snapshot(snapshot: GraphSnapshot) -> Self {
        let mut state = Self::default();

        for (_, node) in snapshot.nodes {
            state.nodes.insert(node.id, node);
        }

        for (key, neighbors) in snapshot.connections {
            let Ok(id) = NodeId::parse(&key) else {
                warn!(key = %key, "skipping adjacency entry with invalid id");
                continue;
            };
            let mut linked: Vec<NodeId> = Vec::with_capacity(neighbors.len());
            for neighbor in neighbors.iter().filter_map(|n| NodeId::parse(n).ok()) {
                if !linked.contains(&neighbor) {
                    linked.push(neighbor);
                }
            }
            state.adjacency.insert(id, linked);
        }

        for (key, vector) in snapshot.embeddings {
            if let Ok(id) = NodeId::parse(&key) {
                state.embeddings.insert(id, vector);
            }
        }

        for (id, node) in &state.nodes {
            state.adjacency.entry(*id).or_default();
            state
                .embeddings
                .entry(*id)
                .or_insert_with(|| node.embedding.clone());
        }

        state
    }

    fn require(&self, id: &NodeId) -> Result<()> {
        if self.nodes.contains_key(id) {
            Ok(())
        } else {
            Err(Error::node_not_found(id))
        }
    }
}

/// Content graph for a single owner.
///
/// Holds the node store, an adjacency structure and an embedding cache.
/// Every mutation writes the whole graph to the [`GraphStore`]; a failed
/// write is logged and the in-memory graph stays authoritative.
///
/// Opened inside a tokio runtime, writes are handed to a background task
/// and [`flush`](Self::flush) waits for them. Otherwise they are applied
/// before the mutating call returns.
pub struct ContentGraph {
    owner_id: String,
    config: GraphConfig,
    state: RwLock<GraphState>,
    store: Arc<dyn GraphStore>,
    writer: Option<SnapshotWriter>,
    clock: Arc<dyn Clock>,
}

impl ContentGraph {
    /// Open the graph for `owner_id` with default configuration.
    pub fn new(owner_id: impl Into<String>, store: Arc<dyn GraphStore>) -> Result<Self> {
        Self::open(owner_id, store, GraphConfig::default(), Arc::new(SystemClock))
    }

    /// Open the graph for `owner_id`, restoring any persisted state.
    ///
    /// A snapshot that cannot be loaded is logged and replaced by an
    /// empty graph.
    pub fn open(
        owner_id: impl Into<String>,
        store: Arc<dyn GraphStore>,
        config: GraphConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        let owner_id = owner_id.into();

        let state = match store.load(&owner_id) {
            Ok(Some(snapshot)) => {
                let state = GraphState::from_snapshot(snapshot);
                info!(owner = %owner_id, nodes = state.nodes.len(), "content graph restored");
                state
            }
            Ok(None) => GraphState::default(),
            Err(e) => {
                warn!(owner = %owner_id, error = %e, "failed to load content graph, starting empty");
                GraphState::default()
            }
        };

        let writer = SnapshotWriter::spawn(&owner_id, store.clone());

        Ok(Self {
            owner_id,
            config,
            state: RwLock::new(state),
            store,
            writer,
            clock,
        })
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, GraphState>> {
        self.state
            .read()
            .map_err(|e| Error::Internal(format!("Failed to lock graph: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, GraphState>> {
        self.state
            .write()
            .map_err(|e| Error::Internal(format!("Failed to lock graph: {}", e)))
    }

    #[instrument(skip_all, fields(owner = %self.owner_id))]
    fn persist(&self, state: &GraphState) {
        self.submit(WriteRequest::Save(state.to_snapshot()));
    }

    fn submit(&self, request: WriteRequest) {
        // Fall back to writing inline once the background task is gone
        let request = match &self.writer {
            Some(writer) => match writer.submit(request) {
                Ok(()) => return,
                Err(request) => request,
            },
            None => request,
        };

        if let Err(e) = apply(self.store.as_ref(), &self.owner_id, request) {
            warn!(error = %e, "failed to persist content graph");
        }
    }

    /// Wait until every write queued by earlier mutations has reached the
    /// store. Returns immediately when writes are applied inline.
    pub async fn flush(&self) {
        if let Some(writer) = &self.writer {
            writer.flush().await;
        }
    }

    // ==================== Mutations ====================

    /// Add a node and return its id.
    pub fn add_node(
        &self,
        title: impl Into<String>,
        content: impl Into<String>,
        node_type: impl Into<String>,
    ) -> Result<NodeId> {
        let now = self.clock.now();
        let title = title.into();
        let content = content.into();
        let embedding = simple_text_to_vector(&format!("{} {}", title, content));

        let node = KnowledgeNode {
            id: NodeId::new(),
            title,
            content,
            node_type: node_type.into(),
            created_at: now,
            updated_at: now,
            owner_id: self.owner_id.clone(),
            connections: Vec::new(),
            embedding: embedding.clone(),
        };
        let id = node.id;

        let mut state = self.write()?;
        state.nodes.insert(id, node);
        state.adjacency.insert(id, Vec::new());
        state.embeddings.insert(id, embedding);
        self.persist(&state);

        debug!(node = %id, "node added");
        Ok(id)
    }

    /// Link `a` to `b`, and `b` back to `a` when `bidirectional`.
    ///
    /// Linking an already linked pair leaves both nodes untouched. Fails
    /// with `NodeNotFound` if either id is unknown.
    pub fn connect_nodes(&self, a: &NodeId, b: &NodeId, bidirectional: bool) -> Result<()> {
        if a == b {
            return Err(Error::InvalidInput(format!("cannot link node {} to itself", a)));
        }

        let now = self.clock.now();
        let mut state = self.write()?;
        state.require(a)?;
        state.require(b)?;

        let mut pairs = vec![(*a, *b)];
        if bidirectional {
            pairs.push((*b, *a));
        }

        for (from, to) in pairs {
            let neighbors = state.adjacency.entry(from).or_default();
            if !neighbors.contains(&to) {
                neighbors.push(to);
            }
            if let Some(node) = state.nodes.get_mut(&from) {
                node.push_connection(to, now);
            }
        }
        self.persist(&state);

        debug!(from = %a, to = %b, bidirectional, "nodes connected");
        Ok(())
    }

    /// Bidirectional [`connect_nodes`](Self::connect_nodes).
    pub fn connect(&self, a: &NodeId, b: &NodeId) -> Result<()> {
        self.connect_nodes(a, b, true)
    }

    /// Remove a node, its embedding and every link to it.
    pub fn remove_node(&self, id: &NodeId) -> Result<KnowledgeNode> {
        let now = self.clock.now();
        let mut state = self.write()?;

        let removed = state
            .nodes
            .remove(id)
            .ok_or_else(|| Error::node_not_found(id))?;
        state.adjacency.remove(id);
        state.embeddings.remove(id);

        // Unlink from every remaining node
        for neighbors in state.adjacency.values_mut() {
            neighbors.retain(|n| n != id);
        }
        for node in state.nodes.values_mut() {
            let before = node.connections.len();
            node.connections.retain(|n| n != id);
            if node.connections.len() != before {
                node.updated_at = now;
            }
        }
        self.persist(&state);

        debug!(node = %id, "node removed");
        Ok(removed)
    }

    /// Drop every node and delete the owner's stored snapshot.
    pub fn clear(&self) -> Result<usize> {
        let mut state = self.write()?;
        let removed = state.nodes.len();
        *state = GraphState::default();
        self.submit(WriteRequest::Remove);

        info!(owner = %self.owner_id, removed, "content graph cleared");
        Ok(removed)
    }

    // ==================== Queries ====================

    pub fn get_node(&self, id: &NodeId) -> Result<Option<KnowledgeNode>> {
        Ok(self.read()?.nodes.get(id).cloned())
    }

    /// Nodes carrying the given type tag, oldest first.
    pub fn nodes_by_type(&self, node_type: &str) -> Result<Vec<KnowledgeNode>> {
        let state = self.read()?;
        let mut nodes: Vec<KnowledgeNode> = state
            .nodes
            .values()
            .filter(|n| n.node_type == node_type)
            .cloned()
            .collect();
        nodes.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(nodes)
    }

    /// Cached embedding for a node.
    pub fn embedding(&self, id: &NodeId) -> Result<Option<Vec<f32>>> {
        Ok(self.read()?.embeddings.get(id).cloned())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.nodes.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Serializable copy of the full graph state.
    pub fn snapshot(&self) -> Result<GraphSnapshot> {
        Ok(self.read()?.to_snapshot())
    }

    /// Every node within `max_depth` hops of `id`, in discovery order.
    ///
    /// Neighbors are visited in the order they were linked. Each node is
    /// returned at most once and the start node never is.
    pub fn find_related_nodes(&self, id: &NodeId, max_depth: usize) -> Result<Vec<KnowledgeNode>> {
        let state = self.read()?;
        state.require(id)?;

        let mut visited: HashSet<NodeId> = HashSet::from([*id]);
        let mut queue: VecDeque<(NodeId, usize)> = VecDeque::from([(*id, 0)]);
        let mut related = Vec::new();

        while let Some((current, depth)) = queue.pop_front() {
            if depth >= max_depth {
                continue;
            }
            let Some(neighbors) = state.adjacency.get(&current) else {
                continue;
            };
            for neighbor in neighbors {
                if !visited.insert(*neighbor) {
                    continue;
                }
                if let Some(node) = state.nodes.get(neighbor) {
                    related.push(node.clone());
                }
                queue.push_back((*neighbor, depth + 1));
            }
        }

        Ok(related)
    }

    /// [`find_related_nodes`](Self::find_related_nodes) with the configured default depth.
    pub fn find_related(&self, id: &NodeId) -> Result<Vec<KnowledgeNode>> {
        self.find_related_nodes(id, self.config.default_max_depth)
    }

    /// Rank every node against `query` and return the best `limit`.
    ///
    /// Score is similarity plus relevance. Similarity depends on the
    /// configured [`SearchMode`]; relevance averages recency and
    /// connectivity.
    pub fn semantic_search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        let now = self.clock.now();
        let terms = query_terms(query);
        let query_vector = match self.config.search_mode {
            SearchMode::Lexical => None,
            SearchMode::Embedding | SearchMode::Hybrid => Some(simple_text_to_vector(query)),
        };

        let state = self.read()?;
        let mut results: Vec<SearchResult> = state
            .nodes
            .values()
            .map(|node| {
                let lexical = lexical_similarity(&terms, &node.searchable_text().to_lowercase());
                let vector_similarity = || {
                    let stored = state.embeddings.get(&node.id).unwrap_or(&node.embedding);
                    query_vector
                        .as_deref()
                        .map(|q| cosine_similarity(q, stored).max(0.0))
                        .unwrap_or(0.0)
                };
                let similarity = match self.config.search_mode {
                    SearchMode::Lexical => lexical,
                    SearchMode::Embedding => vector_similarity(),
                    SearchMode::Hybrid => (lexical + vector_similarity()) / 2.0,
                };

                let recency =
                    recency_factor(node.updated_at, now, self.config.recency_window_days);
                let connectivity =
                    connectivity_factor(node.connections.len(), self.config.connectivity_saturation);

                SearchResult {
                    node: node.clone(),
                    similarity,
                    relevance_score: relevance_score(recency, connectivity),
                    context: extract_snippet(
                        &node.content,
                        &terms,
                        self.config.snippet_before,
                        self.config.snippet_after,
                        self.config.snippet_fallback,
                    ),
                }
            })
            .collect();

        results.sort_by(|a, b| {
            b.score()
                .total_cmp(&a.score())
                .then_with(|| a.node.created_at.cmp(&b.node.created_at))
                .then_with(|| a.node.id.cmp(&b.node.id))
        });
        results.truncate(limit);
        Ok(results)
    }

    /// [`semantic_search`](Self::semantic_search) with the configured default limit.
    pub fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        self.semantic_search(query, self.config.default_search_limit)
    }

    pub fn get_stats(&self) -> Result<GraphStats> {
        let state = self.read()?;

        let total_nodes = state.nodes.len();
        let total_connections: usize = state.adjacency.values().map(Vec::len).sum();

        let mut type_distribution: HashMap<String, usize> = HashMap::new();
        for node in state.nodes.values() {
            *type_distribution.entry(node.node_type.clone()).or_default() += 1;
        }

        let average_connections = if total_nodes == 0 {
            0.0
        } else {
            total_connections as f64 / total_nodes as f64
        };

        Ok(GraphStats {
            total_nodes,
            total_connections,
            type_distribution,
            average_connections,
        })
    }
}

impl std::fmt::Debug for ContentGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentGraph")
            .field("owner_id", &self.owner_id)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
