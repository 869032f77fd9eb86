use log::debug;
use rust_asm_utils::{get_overlap_range, PosRange, PosRangeSet};

use crate::kmer_node::{KmerPathNode, NodeIndex};

/// A directed edge in the positional de Bruijn graph
///
/// `sub_range` is the closed interval of entry-k-mer positions of the target node over which the
/// edge is traversable. It is always contained in the target node's validity interval.
///
#[derive(Clone, Debug)]
pub struct KmerGraphEdge {
    pub to: NodeIndex,
    pub sub_range: PosRange,
}

/// Fault reported for an ill-formed graph delivered by the node producer
///
#[derive(Debug)]
pub struct GraphError {
    pub kind: GraphErrorKind,

    /// Identity of the node owning the offending edge
    pub node_index: NodeIndex,

    pub msg: String,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum GraphErrorKind {
    /// Edge sub-interval is not contained in the successor node's validity interval
    EdgeOutsideNode,

    /// Edge admits successor positions no greater than the source node's own positions, which
    /// would allow a cycle in position space
    ImpliedCycle,
}

impl std::error::Error for GraphError {}

impl std::fmt::Display for GraphError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "GraphError{{kind: {:?}, node: {}, msg: {}}}",
            self.kind, self.node_index, self.msg
        )
    }
}

/// Owning storage for a positional de Bruijn graph
///
/// Nodes are immutable once added. Successor and predecessor edge lists are index-based so that
/// path traversal can restart edge iteration at any time.
///
#[derive(Default, Debug)]
pub struct KmerGraph {
    nodes: Vec<KmerPathNode>,
    successors: Vec<Vec<KmerGraphEdge>>,
    predecessors: Vec<Vec<KmerGraphEdge>>,
}

impl KmerGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, index: NodeIndex) -> &KmerPathNode {
        &self.nodes[index]
    }

    pub fn successors(&self, index: NodeIndex) -> &[KmerGraphEdge] {
        &self.successors[index]
    }

    pub fn predecessors(&self, index: NodeIndex) -> &[KmerGraphEdge] {
        &self.predecessors[index]
    }

    pub fn add_node(&mut self, node: KmerPathNode) -> NodeIndex {
        let index = self.nodes.len();
        self.nodes.push(node);
        self.successors.push(Vec::new());
        self.predecessors.push(Vec::new());
        index
    }

    /// Add an edge from `from` to `to`, traversable over `sub_range` entry positions of `to`
    ///
    /// The reverse edge is derived here so that predecessor traversal shares the same edge
    /// geometry as successor traversal.
    ///
    pub fn add_edge(
        &mut self,
        from: NodeIndex,
        to: NodeIndex,
        sub_range: PosRange,
    ) -> Result<(), GraphError> {
        let from_node = &self.nodes[from];
        let to_node = &self.nodes[to];

        if !to_node.range().contains_range(&sub_range) {
            return Err(GraphError {
                kind: GraphErrorKind::EdgeOutsideNode,
                node_index: from,
                msg: format!(
                    "edge interval {sub_range:?} outside successor node {to} interval {:?}",
                    to_node.range()
                ),
            });
        }

        // Any successor position must be strictly downstream of the earliest source position it
        // could be reached from
        let min_child_pos = from_node.start_position() + from_node.length as i64;
        if sub_range.start < min_child_pos {
            return Err(GraphError {
                kind: GraphErrorKind::ImpliedCycle,
                node_index: from,
                msg: format!(
                    "edge interval {sub_range:?} to node {to} admits positions before {min_child_pos}"
                ),
            });
        }

        // The reverse edge stores the source-node entry positions from which the edge is
        // traversable
        let reverse_sub_range = match get_overlap_range(
            &sub_range.shifted(-(from_node.length as i64)),
            &from_node.range(),
        ) {
            Some(x) => x,
            None => {
                return Err(GraphError {
                    kind: GraphErrorKind::EdgeOutsideNode,
                    node_index: from,
                    msg: format!(
                        "edge interval {sub_range:?} to node {to} is unreachable from source interval {:?}",
                        from_node.range()
                    ),
                });
            }
        };

        self.successors[from].push(KmerGraphEdge { to, sub_range });
        self.predecessors[to].push(KmerGraphEdge {
            to: from,
            sub_range: reverse_sub_range,
        });
        Ok(())
    }

    /// Positions of the target node reachable through `edge` from a source node restricted to
    /// `source_range`, or None if the edge is not traversable from there
    ///
    pub fn child_range(
        &self,
        source: NodeIndex,
        source_range: &PosRange,
        edge: &KmerGraphEdge,
    ) -> Option<PosRange> {
        let shift = self.nodes[source].length as i64;
        get_overlap_range(&source_range.shifted(shift), &edge.sub_range)
    }

    /// Positions of the predecessor node from which `edge` can reach a target node restricted to
    /// `target_range`, or None if the edge is not traversable into there
    ///
    pub fn parent_range(
        &self,
        target_range: &PosRange,
        edge: &KmerGraphEdge,
    ) -> Option<PosRange> {
        let shift = self.nodes[edge.to].length as i64;
        get_overlap_range(&target_range.shifted(-shift), &edge.sub_range)
    }

    /// Positions within `range` of `node` at which a path cannot be extended by any successor
    ///
    /// With `non_reference_only` set, only non-reference successors block termination: the
    /// resulting ranges are positions where a path either stops outright or steps only into
    /// reference sequence.
    ///
    pub fn terminal_ranges(
        &self,
        node: NodeIndex,
        range: &PosRange,
        non_reference_only: bool,
    ) -> PosRangeSet {
        let mut ranges = PosRangeSet::from_range(*range);
        let length = self.nodes[node].length as i64;
        for edge in self.successors[node].iter() {
            if non_reference_only && self.nodes[edge.to].is_reference {
                continue;
            }
            // Source positions from which the edge is traversable
            let covered = edge.sub_range.shifted(-length);
            ranges.subtract_range(&covered);
            if ranges.is_empty() {
                break;
            }
        }
        ranges
    }

    /// Node indices sorted by non-decreasing start position
    ///
    /// This is the required delivery order for memoization seeding.
    ///
    pub fn nodes_by_start_position(&self) -> Vec<NodeIndex> {
        let mut indices = (0..self.nodes.len()).collect::<Vec<_>>();
        indices.sort_by_key(|&i| (self.nodes[i].start_position(), i));
        indices
    }

    /// Split the graph nodes into independently assemblable subgraphs
    ///
    /// Nodes are grouped by position: a gap larger than `margin` between the furthest position
    /// reached so far and the next node start closes the current subgraph, as does exceeding
    /// `max_width` of total positional extent.
    ///
    pub fn partition_subgraphs(&self, margin: i64, max_width: i64) -> Vec<Vec<NodeIndex>> {
        assert!(margin >= 0);
        assert!(max_width > 0);

        let mut subgraphs = Vec::new();
        let mut current: Vec<NodeIndex> = Vec::new();
        let mut current_start = 0;
        let mut current_reach = 0;

        for index in self.nodes_by_start_position() {
            let node = &self.nodes[index];
            let node_reach = node.end_position() + node.length as i64;
            if !current.is_empty() {
                let gap_split = node.start_position() - current_reach > margin;
                let width_split = node_reach - current_start > max_width;
                if gap_split || width_split {
                    subgraphs.push(std::mem::take(&mut current));
                }
            }
            if current.is_empty() {
                current_start = node.start_position();
                current_reach = node_reach;
            }
            current_reach = std::cmp::max(current_reach, node_reach);
            current.push(index);
        }
        if !current.is_empty() {
            subgraphs.push(current);
        }

        debug!(
            "Partitioned {} graph nodes into {} subgraphs",
            self.nodes.len(),
            subgraphs.len()
        );
        subgraphs
    }

    /// Check all edges of the graph and surface the first provider fault found
    ///
    pub fn validate(&self) -> Result<(), GraphError> {
        for (from, edges) in self.successors.iter().enumerate() {
            let from_node = &self.nodes[from];
            let min_child_pos = from_node.start_position() + from_node.length as i64;
            for edge in edges.iter() {
                let to_node = &self.nodes[edge.to];
                if !to_node.range().contains_range(&edge.sub_range) {
                    return Err(GraphError {
                        kind: GraphErrorKind::EdgeOutsideNode,
                        node_index: from,
                        msg: format!(
                            "edge interval {:?} outside successor node {} interval {:?}",
                            edge.sub_range,
                            edge.to,
                            to_node.range()
                        ),
                    });
                }
                if edge.sub_range.start < min_child_pos {
                    return Err(GraphError {
                        kind: GraphErrorKind::ImpliedCycle,
                        node_index: from,
                        msg: format!(
                            "edge interval {:?} to node {} admits positions before {}",
                            edge.sub_range, edge.to, min_child_pos
                        ),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simple_node(start: i64, end: i64, length: u32) -> KmerPathNode {
        KmerPathNode::new(0, start, end, length, 1, false)
    }

    #[test]
    fn test_add_edge_geometry() {
        let mut graph = KmerGraph::new();
        let a = graph.add_node(simple_node(10, 20, 2));
        let b = graph.add_node(simple_node(12, 30, 1));

        graph.add_edge(a, b, PosRange::from_pair(12, 22)).unwrap();

        // Forward traversal from a restricted to [10,12] reaches b at [12,14]
        let edge = &graph.successors(a)[0];
        let child = graph
            .child_range(a, &PosRange::from_pair(10, 12), edge)
            .unwrap();
        assert_eq!(child, PosRange::from_pair(12, 14));

        // Reverse edge covers the reachable source positions
        let redge = &graph.predecessors(b)[0];
        assert_eq!(redge.to, a);
        assert_eq!(redge.sub_range, PosRange::from_pair(10, 20));
    }

    #[test]
    fn test_edge_outside_node() {
        let mut graph = KmerGraph::new();
        let a = graph.add_node(simple_node(10, 20, 2));
        let b = graph.add_node(simple_node(12, 30, 1));

        let err = graph
            .add_edge(a, b, PosRange::from_pair(12, 31))
            .unwrap_err();
        assert_eq!(err.kind, GraphErrorKind::EdgeOutsideNode);
        assert_eq!(err.node_index, a);
    }

    #[test]
    fn test_implied_cycle() {
        let mut graph = KmerGraph::new();
        let a = graph.add_node(simple_node(10, 20, 2));
        let b = graph.add_node(simple_node(5, 30, 1));

        let err = graph
            .add_edge(a, b, PosRange::from_pair(5, 22))
            .unwrap_err();
        assert_eq!(err.kind, GraphErrorKind::ImpliedCycle);
    }

    #[test]
    fn test_partition_subgraphs() {
        let mut graph = KmerGraph::new();
        graph.add_node(simple_node(10, 20, 1));
        graph.add_node(simple_node(15, 25, 1));
        graph.add_node(simple_node(500, 510, 1));

        let subgraphs = graph.partition_subgraphs(100, 10_000);
        assert_eq!(subgraphs.len(), 2);
        assert_eq!(subgraphs[0], vec![0, 1]);
        assert_eq!(subgraphs[1], vec![2]);
    }

    #[test]
    fn test_width_split() {
        let mut graph = KmerGraph::new();
        graph.add_node(simple_node(0, 10, 1));
        graph.add_node(simple_node(50, 60, 1));
        graph.add_node(simple_node(100, 110, 1));

        let subgraphs = graph.partition_subgraphs(1000, 100);
        assert_eq!(subgraphs.len(), 2);
    }
}
