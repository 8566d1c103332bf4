//! Static civic knowledge graph.
//!
//! A hand-shaped directed graph over the knowledge store: the city
//! contains zones, zones contain wards, departments administer the
//! city, departments provide services and carry escalation positions.
//! Built once at startup and never mutated; the reasoner walks it for
//! escalation chains, related entities, and area cross-references.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::HashMap;

use crate::knowledge::CivicKnowledge;

/// What a graph node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    City,
    Zone,
    Ward,
    Area,
    Department,
    Service,
    Position,
}

/// A graph node: its kind, display label, and (for escalation
/// positions) the 1-based level within its department's chain.
#[derive(Debug, Clone)]
pub struct CivicNode {
    pub kind: NodeKind,
    pub label: String,
    pub level: Option<usize>,
}

/// Relationship carried on an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Contains,
    AdministeredBy,
    Provides,
    HasPosition,
    EscalatesTo,
}

/// The built graph plus a label index for lookups.
pub struct CivicGraph {
    graph: DiGraph<CivicNode, Relation>,
    index: HashMap<String, NodeIndex>,
}

impl CivicGraph {
    /// Build the graph from a knowledge-store snapshot.
    pub fn build(knowledge: &CivicKnowledge) -> Self {
        let mut builder = Self {
            graph: DiGraph::new(),
            index: HashMap::new(),
        };

        let city = builder.add_node(NodeKind::City, "Chennai", None);

        for zone in knowledge.zones() {
            let zone_idx = builder.add_node(NodeKind::Zone, &zone.name, None);
            builder.graph.add_edge(city, zone_idx, Relation::Contains);

            for ward in &zone.wards {
                let ward_idx = builder.add_node(NodeKind::Ward, &format!("Ward {ward}"), None);
                builder.graph.add_edge(zone_idx, ward_idx, Relation::Contains);
            }
        }

        for area in knowledge.pincodes().values() {
            // An area may share its name with a zone; keep the zone node.
            if !builder.index.contains_key(area.as_str()) {
                let area_idx = builder.add_node(NodeKind::Area, area, None);
                builder.graph.add_edge(city, area_idx, Relation::Contains);
            }
        }

        for (name, record) in knowledge.departments() {
            let dept_idx = builder.add_node(NodeKind::Department, name, None);
            builder.graph.add_edge(city, dept_idx, Relation::AdministeredBy);

            for service in &record.services {
                let service_idx = builder.add_node(NodeKind::Service, service, None);
                builder.graph.add_edge(dept_idx, service_idx, Relation::Provides);
            }

            let mut previous: Option<NodeIndex> = None;
            for (level, role) in record.escalation.iter().enumerate() {
                let label = format!("{name}: {role}");
                let pos_idx = builder.add_node(NodeKind::Position, &label, Some(level + 1));
                builder.graph.add_edge(dept_idx, pos_idx, Relation::HasPosition);
                if let Some(prev) = previous {
                    builder.graph.add_edge(prev, pos_idx, Relation::EscalatesTo);
                }
                previous = Some(pos_idx);
            }
        }

        builder
    }

    fn add_node(&mut self, kind: NodeKind, label: &str, level: Option<usize>) -> NodeIndex {
        if let Some(idx) = self.index.get(label) {
            return *idx;
        }
        let idx = self.graph.add_node(CivicNode {
            kind,
            label: label.to_string(),
            level,
        });
        self.index.insert(label.to_string(), idx);
        idx
    }

    /// Escalation roles for a department, lowest level first. Empty
    /// when the department carries no positions.
    pub fn escalation_chain(&self, department: &str) -> Vec<String> {
        let dept_idx = match self.index.get(department) {
            Some(idx) => *idx,
            None => return Vec::new(),
        };

        let mut positions: Vec<(usize, String)> = self
            .graph
            .neighbors_directed(dept_idx, Direction::Outgoing)
            .filter_map(|n| {
                let node = &self.graph[n];
                if node.kind != NodeKind::Position {
                    return None;
                }
                let role = node
                    .label
                    .rsplit_once(": ")
                    .map(|(_, role)| role.to_string())
                    .unwrap_or_else(|| node.label.clone());
                Some((node.level.unwrap_or(0), role))
            })
            .collect();

        positions.sort_by_key(|(level, _)| *level);
        positions.into_iter().map(|(_, role)| role).collect()
    }

    /// Direct non-position neighbors of a node, outgoing then incoming,
    /// deduplicated. Used to surface entities related to a department.
    pub fn related_entities(&self, label: &str, limit: usize) -> Vec<String> {
        let idx = match self.index.get(label) {
            Some(idx) => *idx,
            None => return Vec::new(),
        };

        let mut related = Vec::new();
        for direction in [Direction::Outgoing, Direction::Incoming] {
            for neighbor in self.graph.neighbors_directed(idx, direction) {
                let node = &self.graph[neighbor];
                if node.kind == NodeKind::Position || node.kind == NodeKind::Ward {
                    continue;
                }
                if !related.contains(&node.label) {
                    related.push(node.label.clone());
                }
                if related.len() >= limit {
                    return related;
                }
            }
        }
        related
    }

    /// Shortest label path between two nodes, if both exist and are
    /// connected (edges followed in either direction).
    pub fn shortest_path(&self, from: &str, to: &str) -> Option<Vec<String>> {
        let (start, goal) = (*self.index.get(from)?, *self.index.get(to)?);

        // BFS over the underlying undirected structure.
        let mut predecessors: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        let mut queue = std::collections::VecDeque::from([start]);
        let mut seen = std::collections::HashSet::from([start]);

        while let Some(current) = queue.pop_front() {
            if current == goal {
                let mut path = vec![self.graph[current].label.clone()];
                let mut cursor = current;
                while let Some(prev) = predecessors.get(&cursor) {
                    path.push(self.graph[*prev].label.clone());
                    cursor = *prev;
                }
                path.reverse();
                return Some(path);
            }
            for direction in [Direction::Outgoing, Direction::Incoming] {
                for neighbor in self.graph.neighbors_directed(current, direction) {
                    if seen.insert(neighbor) {
                        predecessors.insert(neighbor, current);
                        queue.push_back(neighbor);
                    }
                }
            }
        }
        None
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_from_fallback_store() {
        let store = CivicKnowledge::fallback();
        let graph = CivicGraph::build(&store);
        assert!(graph.node_count() > 4);
        assert!(graph.edge_count() > 4);
    }

    #[test]
    fn escalation_chain_is_ordered_lowest_first() {
        let store = CivicKnowledge::fallback();
        let graph = CivicGraph::build(&store);
        let chain = graph.escalation_chain("Chennai Metro Water");
        assert_eq!(
            chain,
            vec![
                "Area Engineer",
                "Executive Engineer",
                "Superintending Engineer",
                "Chief Engineer"
            ]
        );
    }

    #[test]
    fn unknown_department_has_empty_chain() {
        let store = CivicKnowledge::fallback();
        let graph = CivicGraph::build(&store);
        assert!(graph.escalation_chain("Department of Nothing").is_empty());
    }

    #[test]
    fn related_entities_skip_positions() {
        let store = CivicKnowledge::fallback();
        let graph = CivicGraph::build(&store);
        let related = graph.related_entities("TANGEDCO", 10);
        assert!(related.iter().any(|r| r == "Chennai"));
        assert!(related.iter().all(|r| !r.contains(':')));
    }

    #[test]
    fn shortest_path_connects_city_to_service() {
        let store = CivicKnowledge::fallback();
        let graph = CivicGraph::build(&store);
        let path = graph
            .shortest_path("Chennai", "Water supply")
            .expect("path exists");
        assert_eq!(path.first().map(String::as_str), Some("Chennai"));
        assert_eq!(path.last().map(String::as_str), Some("Water supply"));
        assert!(path.len() <= 3);
    }
}
