//! Agreement sets: consensus units extracted from an agreement graph.

use crate::data::{Sorting, SpikeTrain, UnitId};
use crate::error::{CompareError, Result};
use crate::multi::graph::{AgreementGraph, UnitNode};
use petgraph::graph::NodeIndex;
use petgraph::unionfind::UnionFind;
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use tracing::debug;

/// One unit of an agreement set.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgreementMember {
    /// Sorting name.
    pub sorting: String,
    /// Unit id within that sorting.
    pub unit_id: UnitId,
}

impl From<&UnitNode> for AgreementMember {
    fn from(node: &UnitNode) -> Self {
        Self {
            sorting: node.sorting.clone(),
            unit_id: node.unit_id.clone(),
        }
    }
}

impl fmt::Display for AgreementMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.sorting, self.unit_id)
    }
}

/// Units of different sortings judged to be the same neuron, at most one per
/// sorting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgreementSet {
    /// Kept members, ordered by sorting position then unit id.
    pub members: Vec<AgreementMember>,
    /// Mean score of the edges among kept members (0 without edges).
    pub mean_score: f64,
    /// Units of the component removed by conflict resolution.
    pub dropped: Vec<AgreementMember>,
}

impl AgreementSet {
    /// Number of sortings represented.
    pub fn n_sortings(&self) -> usize {
        self.members.len()
    }

    /// The member unit of a sorting, if any.
    pub fn unit_in(&self, sorting: &str) -> Option<&UnitId> {
        self.members
            .iter()
            .find(|m| m.sorting == sorting)
            .map(|m| &m.unit_id)
    }

    /// Whether a unit is a kept member.
    pub fn contains(&self, sorting: &str, unit_id: &UnitId) -> bool {
        self.unit_in(sorting) == Some(unit_id)
    }
}

impl fmt::Display for AgreementSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let members: Vec<String> = self.members.iter().map(|m| m.to_string()).collect();
        write!(f, "{{{}}} score={:.3}", members.join(", "), self.mean_score)?;
        if !self.dropped.is_empty() {
            let dropped: Vec<String> = self.dropped.iter().map(|m| m.to_string()).collect();
            write!(f, " dropped={{{}}}", dropped.join(", "))?;
        }
        Ok(())
    }
}

/// Extract agreement sets from the graph.
///
/// Sets are the connected components spanning at least `minimum_matching`
/// distinct sortings. With `minimum_matching == 1` unmatched units form
/// singleton sets. When a component holds several units of one sorting, the
/// unit with the highest mean incident-edge score (over the full component)
/// is kept and the others are dropped; ties go to the lowest unit id. Kept
/// units left without an edge to each other are split into separate sets,
/// each filtered by `minimum_matching` again.
pub fn agreement_sets(
    graph: &AgreementGraph,
    minimum_matching: usize,
) -> Result<Vec<AgreementSet>> {
    if minimum_matching < 1 {
        return Err(CompareError::Configuration(
            "minimum_matching must be at least 1".to_string(),
        ));
    }

    let g = graph.inner();
    let mut uf = UnionFind::<usize>::new(g.node_count());
    for e in g.edge_references() {
        uf.union(e.source().index(), e.target().index());
    }

    let mut components: BTreeMap<usize, Vec<NodeIndex>> = BTreeMap::new();
    for (node, root) in uf.into_labeling().into_iter().enumerate() {
        components.entry(root).or_default().push(NodeIndex::new(node));
    }

    let mean_incident = |idx: NodeIndex| -> f64 {
        let scores: Vec<f64> = g.edges(idx).map(|e| e.weight().score).collect();
        if scores.is_empty() {
            0.0
        } else {
            scores.iter().sum::<f64>() / scores.len() as f64
        }
    };

    let mut sets = Vec::new();
    for nodes in components.into_values() {
        let n_sortings = nodes
            .iter()
            .map(|&n| g[n].sorting_index)
            .collect::<BTreeSet<_>>()
            .len();
        if n_sortings < minimum_matching {
            continue;
        }

        // sorting index -> (kept node, its mean score)
        let mut kept: BTreeMap<usize, (NodeIndex, f64)> = BTreeMap::new();
        let mut dropped = Vec::new();
        let mut ordered = nodes;
        ordered.sort_by(|&x, &y| {
            (g[x].sorting_index, &g[x].unit_id).cmp(&(g[y].sorting_index, &g[y].unit_id))
        });
        for idx in ordered {
            let score = mean_incident(idx);
            match kept.get(&g[idx].sorting_index).copied() {
                None => {
                    kept.insert(g[idx].sorting_index, (idx, score));
                }
                // Ascending id order, so an equal score never displaces.
                Some((current, current_score)) if score > current_score => {
                    dropped.push(AgreementMember::from(&g[current]));
                    kept.insert(g[idx].sorting_index, (idx, score));
                }
                Some(_) => dropped.push(AgreementMember::from(&g[idx])),
            }
        }

        dropped.sort_by(|a, b| {
            let ia = graph.sorting_index(&a.sorting);
            let ib = graph.sorting_index(&b.sorting);
            (ia, &a.unit_id).cmp(&(ib, &b.unit_id))
        });

        // Dropping units can disconnect the rest, so split the kept units
        // again over the edges among them.
        let kept_nodes: Vec<NodeIndex> = kept.values().map(|&(n, _)| n).collect();
        let position: HashMap<NodeIndex, usize> =
            kept_nodes.iter().enumerate().map(|(i, &n)| (n, i)).collect();
        let internal: Vec<(usize, usize, f64)> = g
            .edge_references()
            .filter_map(|e| {
                let s = position.get(&e.source())?;
                let t = position.get(&e.target())?;
                Some((*s, *t, e.weight().score))
            })
            .collect();
        let mut kept_uf = UnionFind::<usize>::new(kept_nodes.len());
        for &(s, t, _) in &internal {
            kept_uf.union(s, t);
        }
        let labels = kept_uf.into_labeling();
        let mut parts: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (i, &root) in labels.iter().enumerate() {
            parts.entry(root).or_default().push(i);
        }
        let mut parts: Vec<Vec<usize>> = parts.into_values().collect();
        parts.sort_by_key(|p| p.first().copied());

        // The largest part carries the dropped units; ties go to the earliest.
        let main = parts
            .iter()
            .enumerate()
            .max_by(|(i, x), (j, y)| x.len().cmp(&y.len()).then(j.cmp(i)))
            .map(|(i, _)| i);

        for (k, part) in parts.into_iter().enumerate() {
            let part_dropped = if Some(k) == main {
                std::mem::take(&mut dropped)
            } else {
                Vec::new()
            };
            // One kept unit per sorting, so the part size is its sorting count.
            if part.len() < minimum_matching {
                continue;
            }
            let root = labels[part[0]];
            let scores: Vec<f64> = internal
                .iter()
                .filter(|&&(s, _, _)| labels[s] == root)
                .map(|&(_, _, score)| score)
                .collect();
            let mean_score = if scores.is_empty() {
                0.0
            } else {
                scores.iter().sum::<f64>() / scores.len() as f64
            };

            let part_nodes: Vec<NodeIndex> = part.iter().map(|&i| kept_nodes[i]).collect();
            let members = part_nodes
                .iter()
                .map(|&n| AgreementMember::from(&g[n]))
                .collect();
            sets.push((
                part_nodes,
                AgreementSet {
                    members,
                    mean_score,
                    dropped: part_dropped,
                },
            ));
        }
    }

    sets.sort_by(|(a, _), (b, _)| {
        let first =
            |v: &Vec<NodeIndex>| v.first().map(|&n| (g[n].sorting_index, g[n].unit_id.clone()));
        first(a).cmp(&first(b))
    });

    debug!(n_sets = sets.len(), minimum_matching, "extracted agreement sets");
    Ok(sets.into_iter().map(|(_, s)| s).collect())
}

/// Build a sorting whose units are the agreement sets.
///
/// Unit ids are `0..n` in set order. Each unit's train is taken from the
/// member belonging to the earliest sorting of `sortings`.
pub fn agreement_sorting(
    sets: &[AgreementSet],
    sortings: &[(&str, &Sorting)],
) -> Result<Sorting> {
    let (_, first) = sortings
        .first()
        .ok_or_else(|| CompareError::Configuration("no sortings given".to_string()))?;
    let time_base = *first.time_base();

    let mut units: Vec<(UnitId, SpikeTrain)> = Vec::with_capacity(sets.len());
    for (k, set) in sets.iter().enumerate() {
        let mut source = None;
        for (name, sorting) in sortings {
            if let Some(unit_id) = set.unit_in(name) {
                source = Some((*name, *sorting, unit_id));
                break;
            }
        }
        let (name, sorting, unit_id) = match source {
            Some(s) => s,
            None => {
                let member = set
                    .members
                    .first()
                    .map(|m| m.sorting.clone())
                    .unwrap_or_default();
                return Err(CompareError::UnknownSorting(member));
            }
        };
        time_base.ensure_compatible(sorting.time_base())?;
        let train = sorting.spike_train(unit_id).ok_or_else(|| {
            CompareError::SortingMismatch(format!(
                "unit {} not found in sorting '{}'",
                unit_id, name
            ))
        })?;
        units.push((UnitId::Int(k as i64), train.clone()));
    }

    Sorting::new(time_base, units)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::multi::graph::AgreementEdge;

    fn w(score: f64) -> AgreementEdge {
        AgreementEdge {
            score,
            match_count: 1,
        }
    }

    fn graph(names: &[&str]) -> AgreementGraph {
        AgreementGraph::new(names.iter().map(|s| s.to_string()).collect()).unwrap()
    }

    #[test]
    fn test_components_filtered_by_sorting_count() {
        let mut g = graph(&["a", "b", "c"]);
        g.add_edge(("a", 1.into()), ("b", 1.into()), w(0.9)).unwrap();
        g.add_edge(("b", 1.into()), ("c", 4.into()), w(0.7)).unwrap();
        g.add_edge(("a", 2.into()), ("b", 3.into()), w(0.6)).unwrap();
        g.add_unit("c", 9.into()).unwrap();

        let sets = agreement_sets(&g, 3).unwrap();
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].n_sortings(), 3);
        assert!((sets[0].mean_score - 0.8).abs() < 1e-12);

        let sets = agreement_sets(&g, 2).unwrap();
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[1].unit_in("a"), Some(&UnitId::from(2)));

        // Singletons appear once a single sorting suffices.
        assert_eq!(agreement_sets(&g, 1).unwrap().len(), 3);
    }

    #[test]
    fn test_conflict_keeps_highest_mean_score() {
        // A1-B1 0.9, B1-C1 0.8, C1-A2 0.6: A1 (0.9) beats A2 (0.6).
        let mut g = graph(&["A", "B", "C"]);
        g.add_edge(("A", 1.into()), ("B", 1.into()), w(0.9)).unwrap();
        g.add_edge(("B", 1.into()), ("C", 1.into()), w(0.8)).unwrap();
        g.add_edge(("C", 1.into()), ("A", 2.into()), w(0.6)).unwrap();

        let sets = agreement_sets(&g, 2).unwrap();
        assert_eq!(sets.len(), 1);
        let set = &sets[0];
        assert_eq!(set.n_sortings(), 3);
        assert_eq!(set.unit_in("A"), Some(&UnitId::from(1)));
        assert_eq!(
            set.dropped,
            vec![AgreementMember {
                sorting: "A".to_string(),
                unit_id: 2.into()
            }]
        );
        // Only A1-B1 and B1-C1 remain among kept members.
        assert!((set.mean_score - 0.85).abs() < 1e-12);
    }

    #[test]
    fn test_unit_linked_only_to_dropped_unit_is_split_off() {
        // A2 loses to A1, which leaves D1 with no edge to a kept unit.
        let mut g = graph(&["A", "B", "C", "D"]);
        g.add_edge(("A", 1.into()), ("B", 1.into()), w(0.9)).unwrap();
        g.add_edge(("B", 1.into()), ("C", 1.into()), w(0.9)).unwrap();
        g.add_edge(("C", 1.into()), ("A", 2.into()), w(0.6)).unwrap();
        g.add_edge(("A", 2.into()), ("D", 1.into()), w(0.6)).unwrap();

        let sets = agreement_sets(&g, 2).unwrap();
        assert_eq!(sets.len(), 1);
        let set = &sets[0];
        assert_eq!(set.n_sortings(), 3);
        assert_eq!(set.unit_in("D"), None);
        assert_eq!(set.dropped.len(), 1);
        assert!(set.dropped.iter().all(|m| m.sorting == "A" && m.unit_id == 2.into()));
        assert!((set.mean_score - 0.9).abs() < 1e-12);

        // With singletons allowed, D1 becomes a set of its own.
        let sets = agreement_sets(&g, 1).unwrap();
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[1].members.len(), 1);
        assert!(sets[1].contains("D", &1.into()));
        assert!(sets[1].dropped.is_empty());
        assert_eq!(sets[1].mean_score, 0.0);
    }

    #[test]
    fn test_conflict_tie_keeps_lowest_id() {
        let mut g = graph(&["A", "B"]);
        g.add_edge(("A", 7.into()), ("B", 1.into()), w(0.7)).unwrap();
        g.add_edge(("B", 1.into()), ("A", 3.into()), w(0.7)).unwrap();

        let sets = agreement_sets(&g, 2).unwrap();
        assert_eq!(sets[0].unit_in("A"), Some(&UnitId::from(3)));
        assert_eq!(sets[0].dropped.len(), 1);
        assert_eq!(sets[0].dropped[0].unit_id, UnitId::from(7));
    }

    #[test]
    fn test_zero_minimum_matching_rejected() {
        let g = graph(&["a", "b"]);
        assert!(matches!(
            agreement_sets(&g, 0),
            Err(CompareError::Configuration(_))
        ));
    }

    #[test]
    fn test_agreement_sorting_uses_earliest_sorting() {
        let a = Sorting::from_frames(1000.0, [(1, vec![10, 20]), (2, vec![500])]).unwrap();
        let b = Sorting::from_frames(1000.0, [(8, vec![11, 21])]).unwrap();

        let mut g = graph(&["a", "b"]);
        g.add_edge(("a", 1.into()), ("b", 8.into()), w(1.0)).unwrap();
        let sets = agreement_sets(&g, 2).unwrap();

        let consensus = agreement_sorting(&sets, &[("a", &a), ("b", &b)]).unwrap();
        assert_eq!(consensus.unit_ids(), vec![UnitId::from(0)]);
        assert_eq!(consensus.spike_train(&0.into()).unwrap().frames(), &[10, 20]);

        let consensus = agreement_sorting(&sets, &[("b", &b), ("a", &a)]).unwrap();
        assert_eq!(consensus.spike_train(&0.into()).unwrap().frames(), &[11, 21]);
    }
}
