//! Agreement graph over the units of several sortings.

use crate::data::UnitId;
use crate::error::{CompareError, Result};
use crate::multi::agreement::{agreement_sets, AgreementSet};
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A unit of one of the compared sortings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitNode {
    /// Name of the sorting the unit belongs to.
    pub sorting: String,
    /// Position of that sorting in the comparison.
    pub sorting_index: usize,
    /// Unit id within its sorting.
    pub unit_id: UnitId,
}

/// Weight of an agreement edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgreementEdge {
    /// Agreement fraction of the two units.
    pub score: f64,
    /// Matched spike count of the two units.
    pub match_count: usize,
}

/// Flat edge record used for serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    /// First endpoint.
    pub a: UnitNode,
    /// Second endpoint.
    pub b: UnitNode,
    /// Edge weight.
    pub weight: AgreementEdge,
}

/// Serializable form of an agreement graph: plain node and edge lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgreementGraphSnapshot {
    /// Sorting names in comparison order.
    pub sortings: Vec<String>,
    /// All units, in insertion order.
    pub nodes: Vec<UnitNode>,
    /// All edges, in insertion order.
    pub edges: Vec<EdgeRecord>,
}

/// Undirected graph whose nodes are `(sorting, unit)` pairs and whose edges
/// join units judged to be the same neuron, weighted by agreement.
///
/// Edges only ever join units of different sortings.
#[derive(Debug, Clone)]
pub struct AgreementGraph {
    sorting_names: Vec<String>,
    graph: UnGraph<UnitNode, AgreementEdge>,
    node_index: HashMap<(usize, UnitId), NodeIndex>,
}

impl AgreementGraph {
    /// Create an empty graph over the named sortings. Names must be unique.
    pub fn new(sorting_names: Vec<String>) -> Result<Self> {
        for (i, name) in sorting_names.iter().enumerate() {
            if sorting_names[..i].contains(name) {
                return Err(CompareError::Configuration(format!(
                    "duplicate sorting name '{}'",
                    name
                )));
            }
        }
        Ok(Self {
            sorting_names,
            graph: UnGraph::new_undirected(),
            node_index: HashMap::new(),
        })
    }

    /// Sorting names in comparison order.
    pub fn sorting_names(&self) -> &[String] {
        &self.sorting_names
    }

    /// Position of a sorting.
    pub fn sorting_index(&self, sorting: &str) -> Option<usize> {
        self.sorting_names.iter().position(|n| n == sorting)
    }

    fn require_sorting(&self, sorting: &str) -> Result<usize> {
        self.sorting_index(sorting)
            .ok_or_else(|| CompareError::UnknownSorting(sorting.to_string()))
    }

    /// Add a unit node if it is not present yet.
    pub fn add_unit(&mut self, sorting: &str, unit_id: UnitId) -> Result<()> {
        self.ensure_node(sorting, unit_id).map(|_| ())
    }

    fn ensure_node(&mut self, sorting: &str, unit_id: UnitId) -> Result<NodeIndex> {
        let sorting_index = self.require_sorting(sorting)?;
        let key = (sorting_index, unit_id);
        if let Some(&idx) = self.node_index.get(&key) {
            return Ok(idx);
        }
        let idx = self.graph.add_node(UnitNode {
            sorting: sorting.to_string(),
            sorting_index,
            unit_id: key.1.clone(),
        });
        self.node_index.insert(key, idx);
        Ok(idx)
    }

    /// Join two units of different sortings, adding missing nodes.
    ///
    /// Re-adding an existing edge replaces its weight.
    pub fn add_edge(
        &mut self,
        (sorting_a, unit_a): (&str, UnitId),
        (sorting_b, unit_b): (&str, UnitId),
        weight: AgreementEdge,
    ) -> Result<()> {
        if sorting_a == sorting_b {
            return Err(CompareError::Configuration(format!(
                "cannot join two units of the same sorting '{}'",
                sorting_a
            )));
        }
        let a = self.ensure_node(sorting_a, unit_a)?;
        let b = self.ensure_node(sorting_b, unit_b)?;
        self.graph.update_edge(a, b, weight);
        Ok(())
    }

    /// Number of unit nodes.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of agreement edges.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// All units, in insertion order.
    pub fn units(&self) -> impl Iterator<Item = &UnitNode> + '_ {
        self.graph.node_weights()
    }

    /// Whether a unit is present.
    pub fn contains_unit(&self, sorting: &str, unit_id: &UnitId) -> bool {
        self.lookup(sorting, unit_id).is_some()
    }

    fn lookup(&self, sorting: &str, unit_id: &UnitId) -> Option<NodeIndex> {
        let sorting_index = self.sorting_index(sorting)?;
        self.node_index
            .get(&(sorting_index, unit_id.clone()))
            .copied()
    }

    /// Weight of the edge between two units, if they are joined.
    pub fn edge(
        &self,
        (sorting_a, unit_a): (&str, &UnitId),
        (sorting_b, unit_b): (&str, &UnitId),
    ) -> Option<&AgreementEdge> {
        let a = self.lookup(sorting_a, unit_a)?;
        let b = self.lookup(sorting_b, unit_b)?;
        let e = self.graph.find_edge(a, b)?;
        self.graph.edge_weight(e)
    }

    /// Units joined to a unit, with the edge weights.
    pub fn neighbors(&self, sorting: &str, unit_id: &UnitId) -> Vec<(&UnitNode, &AgreementEdge)> {
        let Some(idx) = self.lookup(sorting, unit_id) else {
            return Vec::new();
        };
        let mut out: Vec<(&UnitNode, &AgreementEdge)> = self
            .graph
            .edges(idx)
            .map(|e| {
                let other = if e.source() == idx { e.target() } else { e.source() };
                (&self.graph[other], e.weight())
            })
            .collect();
        out.sort_by(|x, y| {
            (x.0.sorting_index, &x.0.unit_id).cmp(&(y.0.sorting_index, &y.0.unit_id))
        });
        out
    }

    /// For every unit of `reference` (ascending id), the unit it is joined
    /// to in `other`, or `None` when unmatched.
    ///
    /// If a unit is joined to several units of `other`, the highest-scoring
    /// one is reported (lowest id on tie).
    pub fn mapped_unit_ids(
        &self,
        reference: &str,
        other: &str,
    ) -> Result<Vec<(UnitId, Option<UnitId>)>> {
        let ref_index = self.require_sorting(reference)?;
        let other_index = self.require_sorting(other)?;

        let mut ref_units: Vec<&UnitId> = self
            .graph
            .node_weights()
            .filter(|n| n.sorting_index == ref_index)
            .map(|n| &n.unit_id)
            .collect();
        ref_units.sort();

        Ok(ref_units
            .into_iter()
            .map(|unit_id| {
                let mut best: Option<(&UnitId, f64)> = None;
                for (node, edge) in self.neighbors(reference, unit_id) {
                    if node.sorting_index != other_index {
                        continue;
                    }
                    match best {
                        Some((_, s)) if edge.score <= s => {}
                        _ => best = Some((&node.unit_id, edge.score)),
                    }
                }
                (unit_id.clone(), best.map(|(u, _)| u.clone()))
            })
            .collect())
    }

    /// Agreement sets spanning at least `minimum_matching` sortings.
    pub fn agreement_sets(&self, minimum_matching: usize) -> Result<Vec<AgreementSet>> {
        agreement_sets(self, minimum_matching)
    }

    /// Plain node and edge lists.
    pub fn snapshot(&self) -> AgreementGraphSnapshot {
        AgreementGraphSnapshot {
            sortings: self.sorting_names.clone(),
            nodes: self.graph.node_weights().cloned().collect(),
            edges: self
                .graph
                .edge_references()
                .map(|e| EdgeRecord {
                    a: self.graph[e.source()].clone(),
                    b: self.graph[e.target()].clone(),
                    weight: *e.weight(),
                })
                .collect(),
        }
    }

    pub(crate) fn inner(&self) -> &UnGraph<UnitNode, AgreementEdge> {
        &self.graph
    }
}

impl Serialize for AgreementGraph {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.snapshot().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(score: f64) -> AgreementEdge {
        AgreementEdge {
            score,
            match_count: 10,
        }
    }

    fn names(n: &[&str]) -> Vec<String> {
        n.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_duplicate_names_rejected() {
        assert!(AgreementGraph::new(names(&["a", "a"])).is_err());
    }

    #[test]
    fn test_add_units_and_edges() {
        let mut g = AgreementGraph::new(names(&["a", "b"])).unwrap();
        g.add_unit("a", 1.into()).unwrap();
        g.add_unit("a", 1.into()).unwrap();
        g.add_edge(("a", 1.into()), ("b", 7.into()), edge(0.9)).unwrap();
        g.add_edge(("b", 7.into()), ("a", 1.into()), edge(0.8)).unwrap();

        assert_eq!(g.node_count(), 2);
        assert_eq!(g.edge_count(), 1);
        assert_eq!(
            g.edge(("a", &1.into()), ("b", &7.into())).map(|e| e.score),
            Some(0.8)
        );
        assert!(g.contains_unit("b", &7.into()));
    }

    #[test]
    fn test_same_sorting_edge_rejected() {
        let mut g = AgreementGraph::new(names(&["a", "b"])).unwrap();
        assert!(g.add_edge(("a", 1.into()), ("a", 2.into()), edge(0.9)).is_err());
        assert!(matches!(
            g.add_unit("zzz", 1.into()),
            Err(CompareError::UnknownSorting(_))
        ));
    }

    #[test]
    fn test_mapped_unit_ids() {
        let mut g = AgreementGraph::new(names(&["a", "b", "c"])).unwrap();
        for u in 0..3 {
            g.add_unit("a", u.into()).unwrap();
        }
        g.add_edge(("a", 0.into()), ("b", 5.into()), edge(0.9)).unwrap();
        g.add_edge(("a", 2.into()), ("b", 6.into()), edge(0.7)).unwrap();
        g.add_edge(("a", 2.into()), ("c", 1.into()), edge(0.7)).unwrap();

        let mapped = g.mapped_unit_ids("a", "b").unwrap();
        assert_eq!(
            mapped,
            vec![
                (UnitId::from(0), Some(UnitId::from(5))),
                (UnitId::from(1), None),
                (UnitId::from(2), Some(UnitId::from(6))),
            ]
        );
        assert!(g.mapped_unit_ids("a", "missing").is_err());
    }

    #[test]
    fn test_snapshot_serializes() {
        let mut g = AgreementGraph::new(names(&["a", "b"])).unwrap();
        g.add_edge(("a", 0.into()), ("b", "x".into()), edge(0.75)).unwrap();
        let json = serde_json::to_value(&g).unwrap();
        assert_eq!(json["sortings"][1], "b");
        assert_eq!(json["nodes"].as_array().unwrap().len(), 2);
        assert_eq!(json["edges"][0]["weight"]["score"], 0.75);
        assert_eq!(json["edges"][0]["b"]["unit_id"], "x");
    }
}
