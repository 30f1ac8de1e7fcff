//! Token relationship graph derived from an entity set.

use crate::filter::FilterEngine;
use crate::model::{Core, EntitySet, Token};
use execmon_types::{ReactorName, Tick, TokenKey};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Undirected edge between two token keys, stored in key order
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Edge {
    pub a: TokenKey,
    pub b: TokenKey,
}

impl Edge {
    pub fn new(x: TokenKey, y: TokenKey) -> Self {
        if x <= y {
            Self { a: x, b: y }
        } else {
            Self { a: y, b: x }
        }
    }

    pub fn touches(&self, key: &TokenKey) -> bool {
        &self.a == key || &self.b == key
    }
}

/// Notifications for the network view's update listeners
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkEvent {
    Rebuilt {
        nodes: usize,
        edges: usize,
        active: Option<ReactorName>,
    },
    FilterChanged {
        visible: usize,
    },
}

/// Graph of tokens (nodes) and their declared relationships (edges)
///
/// The graph is rebuilt from scratch on every new entity set.
#[derive(Debug, Default)]
pub struct TokenNetwork {
    entity_set: Arc<EntitySet>,
    active: Option<ReactorName>,
    /// Node key to the reactor whose assembly supplied it
    owners: BTreeMap<TokenKey, ReactorName>,
    edges: BTreeSet<Edge>,
    adjacency: BTreeMap<TokenKey, BTreeSet<TokenKey>>,
}

impl TokenNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the cores the graph is built from and rebuild it. Returns the
    /// event describing the new graph.
    pub fn set_entity_sets(
        &mut self,
        entity_set: Arc<EntitySet>,
        active: Option<ReactorName>,
    ) -> NetworkEvent {
        self.entity_set = entity_set;
        self.active = active;
        self.rebuild();

        tracing::debug!(
            nodes = self.owners.len(),
            edges = self.edges.len(),
            active = ?self.active,
            "token network rebuilt"
        );
        NetworkEvent::Rebuilt {
            nodes: self.owners.len(),
            edges: self.edges.len(),
            active: self.active.clone(),
        }
    }

    fn rebuild(&mut self) {
        self.owners.clear();
        self.edges.clear();
        self.adjacency.clear();

        // First core in reactor order owns a key present in several assemblies
        for (reactor, core) in self.entity_set.cores() {
            for token in core.assembly.tokens() {
                self.owners
                    .entry(token.key.clone())
                    .or_insert_with(|| reactor.clone());
            }
        }

        for (_, core) in self.entity_set.cores() {
            for token in core.assembly.tokens() {
                for related in &token.relations {
                    // Relations to absent tokens are expected with partial views
                    if related == &token.key || !self.owners.contains_key(related) {
                        continue;
                    }
                    let edge = Edge::new(token.key.clone(), related.clone());
                    if self.edges.insert(edge) {
                        self.adjacency
                            .entry(token.key.clone())
                            .or_default()
                            .insert(related.clone());
                        self.adjacency
                            .entry(related.clone())
                            .or_default()
                            .insert(token.key.clone());
                    }
                }
            }
        }
    }

    pub fn entity_sets(&self) -> &Arc<EntitySet> {
        &self.entity_set
    }

    pub fn active_reactor(&self) -> Option<&ReactorName> {
        self.active.as_ref()
    }

    pub fn tick(&self) -> Tick {
        self.entity_set.tick()
    }

    pub fn core_for(&self, reactor: &ReactorName) -> Option<&Arc<Core>> {
        self.entity_set.get(reactor)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &TokenKey> {
        self.owners.keys()
    }

    pub fn node_count(&self) -> usize {
        self.owners.len()
    }

    pub fn contains(&self, key: &TokenKey) -> bool {
        self.owners.contains_key(key)
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn neighbors(&self, key: &TokenKey) -> impl Iterator<Item = &TokenKey> {
        self.adjacency.get(key).into_iter().flatten()
    }

    /// The core and token behind a node, for graph-view callbacks
    pub fn locate(&self, key: &TokenKey) -> Option<(Arc<Core>, &Token)> {
        let reactor = self.owners.get(key)?;
        let core = self.entity_set.get(reactor)?;
        let token = core.assembly.get(key)?;
        Some((Arc::clone(core), token))
    }

    /// Nodes whose key matches the filter, without neighbors
    pub fn matching_nodes(&self, filter: &FilterEngine) -> BTreeSet<TokenKey> {
        self.owners
            .keys()
            .filter(|key| filter.matches(key.as_str()))
            .cloned()
            .collect()
    }

    /// Nodes visible under `filter`: every match plus the nodes directly
    /// connected to a match. Evaluated on demand, never cached.
    pub fn apply_filter(&self, filter: &FilterEngine) -> BTreeSet<TokenKey> {
        if !filter.is_restricting() {
            return self.owners.keys().cloned().collect();
        }
        let matched = self.matching_nodes(filter);
        let mut visible = matched.clone();
        for key in &matched {
            visible.extend(self.neighbors(key).cloned());
        }
        visible
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Assembly;

    fn core(reactor: &str, tokens: Vec<Token>) -> Arc<Core> {
        Arc::new(Core::new(Tick(1), Assembly::with_tokens(reactor, tokens)))
    }

    fn keys(set: &BTreeSet<TokenKey>) -> Vec<&str> {
        set.iter().map(|k| k.as_str()).collect()
    }

    #[test]
    fn test_empty_mapping_gives_empty_graph() {
        let mut network = TokenNetwork::new();
        network
            .set_entity_sets(Arc::new(EntitySet::new(Tick(0))), None);
        assert_eq!(network.node_count(), 0);
        assert_eq!(network.edge_count(), 0);
    }

    #[test]
    fn test_single_relation_gives_one_edge() {
        let r1 = core("R1", vec![Token::new("A").related_to("B"), Token::new("B")]);
        let mut network = TokenNetwork::new();
        network
            .set_entity_sets(
                Arc::new(EntitySet::single(r1)),
                Some(ReactorName::new("R1")),
            );

        let nodes: Vec<_> = network.nodes().map(|k| k.as_str()).collect();
        assert_eq!(nodes, vec!["A", "B"]);
        let edges: Vec<_> = network.edges().cloned().collect();
        assert_eq!(edges, vec![Edge::new("A".into(), "B".into())]);
    }

    #[test]
    fn test_dangling_relation_is_dropped() {
        let r1 = core(
            "R1",
            vec![Token::new("A").related_to("B").related_to("GHOST"), Token::new("B")],
        );
        let mut network = TokenNetwork::new();
        network
            .set_entity_sets(Arc::new(EntitySet::single(r1)), None);
        assert_eq!(network.node_count(), 2);
        assert_eq!(network.edge_count(), 1);
        assert!(!network.contains(&TokenKey::new("GHOST")));
    }

    #[test]
    fn test_mutual_relations_collapse_to_one_edge() {
        let r1 = core(
            "R1",
            vec![
                Token::new("A").related_to("B"),
                Token::new("B").related_to("A").related_to("B"),
            ],
        );
        let mut network = TokenNetwork::new();
        network
            .set_entity_sets(Arc::new(EntitySet::single(r1)), None);
        assert_eq!(network.edge_count(), 1);
    }

    #[test]
    fn test_edges_span_cores() {
        let r1 = core("R1", vec![Token::new("A").related_to("X")]);
        let r2 = core("R2", vec![Token::new("X")]);
        let mut network = TokenNetwork::new();
        network
            .set_entity_sets(Arc::new(EntitySet::from_cores(Tick(1), [r1, r2])), None);
        assert_eq!(network.edge_count(), 1);

        let (owner, token) = network.locate(&TokenKey::new("X")).unwrap();
        assert_eq!(owner.reactor_name.as_str(), "R2");
        assert_eq!(token.key.as_str(), "X");
    }

    #[test]
    fn test_filter_shows_matches_and_direct_neighbors() {
        let r1 = core(
            "R1",
            vec![
                Token::new("T7").related_to("T8"),
                Token::new("T8").related_to("T9"),
                Token::new("T9"),
                Token::new("T70"),
            ],
        );
        let mut network = TokenNetwork::new();
        network
            .set_entity_sets(Arc::new(EntitySet::single(r1)), None);

        let mut filter = FilterEngine::new();
        assert_eq!(network.apply_filter(&filter).len(), 4);

        filter.set_pattern("^T7$", true).unwrap();
        assert_eq!(keys(&network.matching_nodes(&filter)), vec!["T7"]);
        assert_eq!(keys(&network.apply_filter(&filter)), vec!["T7", "T8"]);
    }

    #[test]
    fn test_rebuild_describes_graph() {
        let r1 = core("R1", vec![Token::new("A").related_to("B"), Token::new("B")]);
        let mut network = TokenNetwork::new();
        let event = network.set_entity_sets(Arc::new(EntitySet::single(r1)), Some("R1".into()));
        assert_eq!(
            event,
            NetworkEvent::Rebuilt {
                nodes: 2,
                edges: 1,
                active: Some(ReactorName::new("R1")),
            }
        );
    }
}
