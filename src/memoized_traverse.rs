//! Memoized best-path traversal over the positional de Bruijn graph
//!
//! Since the positional graph is a directed acyclic graph, maximal weighted paths can be found by
//! a positional traverse (BFS in position space), caching the best predecessor of each
//! (k-mer, position sub-interval) cell.
//!

use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap};
use std::fmt;
use std::ops::Bound;

use rust_asm_utils::{PosRange, PosRangeSet};

use crate::graph::KmerGraph;
use crate::kmer_node::NodeIndex;

/// Index of a traversal entry within the memoizer arena
pub type TraversalNodeId = usize;

/// The best known path reaching one graph node over one sub-interval of its validity positions
///
#[derive(Clone, Debug)]
pub struct TraversalNode {
    pub node: NodeIndex,

    /// Entry k-mer of `node`, copied here so that index ordering does not require graph access
    pub first_kmer: u64,

    /// Sub-interval of the node validity interval covered by this traversal
    pub sub_start: i64,
    pub sub_end: i64,

    /// Total weight of the path terminating at this node
    pub score: i64,

    /// Number of graph nodes on the path terminating at this node
    pub path_length: u32,

    /// Best predecessor on the path, or None for a traversal seed
    pub predecessor: Option<TraversalNodeId>,
}

impl TraversalNode {
    /// A traversal seed covering the node's full validity interval
    ///
    pub fn seed(graph: &KmerGraph, node: NodeIndex) -> Self {
        let n = graph.node(node);
        Self {
            node,
            first_kmer: n.first_kmer,
            sub_start: n.start_position(),
            sub_end: n.end_position(),
            score: n.weight as i64,
            path_length: 1,
            predecessor: None,
        }
    }

    /// Extend the path ending at `parent` into `node` over `sub_range`
    ///
    pub fn child(
        graph: &KmerGraph,
        parent_id: TraversalNodeId,
        parent: &TraversalNode,
        node: NodeIndex,
        sub_range: PosRange,
    ) -> Self {
        let n = graph.node(node);
        assert!(
            n.range().contains_range(&sub_range),
            "Traversal child interval {sub_range:?} outside node {node} interval {:?}",
            n.range()
        );
        Self {
            node,
            first_kmer: n.first_kmer,
            sub_start: sub_range.start,
            sub_end: sub_range.end,
            score: parent.score + n.weight as i64,
            path_length: parent.path_length + 1,
            predecessor: Some(parent_id),
        }
    }

    /// Copy this traversal restricted to a narrower sub-interval
    ///
    /// Predecessor and score are preserved. Used by the memoizer to carve surviving regions
    /// after overlap resolution.
    ///
    pub fn sliced(&self, sub_start: i64, sub_end: i64) -> Self {
        assert!(
            sub_start >= self.sub_start && sub_end <= self.sub_end && sub_start <= sub_end,
            "Invalid traversal slice [{sub_start},{sub_end}] of {:?}",
            self.sub_range()
        );
        Self {
            sub_start,
            sub_end,
            ..self.clone()
        }
    }

    pub fn sub_range(&self) -> PosRange {
        PosRange::from_pair(self.sub_start, self.sub_end)
    }

    /// Positions within the sub-interval at which the path cannot be extended by any successor
    ///
    pub fn terminal_ranges(&self, graph: &KmerGraph) -> PosRangeSet {
        graph.terminal_ranges(self.node, &self.sub_range(), false)
    }

    /// Positions within the sub-interval at which the path cannot be extended by any
    /// non-reference successor
    ///
    /// This is a superset of `terminal_ranges`: a path ending here either stops outright or
    /// steps only into reference sequence, so it can terminate as an anchored leaf.
    ///
    pub fn terminal_leaf_anchor_ranges(&self, graph: &KmerGraph) -> PosRangeSet {
        graph.terminal_ranges(self.node, &self.sub_range(), true)
    }
}

/// Ordered index key for memoized traversal entries
///
/// The derived ordering is the lexicographic (k-mer, sub_start, sub_end, score, id) chain; the
/// arena id tiebreak makes the ordering total.
///
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd)]
struct MemoKey {
    first_kmer: u64,
    sub_start: i64,
    sub_end: i64,
    score: i64,
    id: TraversalNodeId,
}

impl MemoKey {
    fn new(data: &TraversalNode, id: TraversalNodeId) -> Self {
        Self {
            first_kmer: data.first_kmer,
            sub_start: data.sub_start,
            sub_end: data.sub_end,
            score: data.score,
            id,
        }
    }
}

/// Frontier ordering key: the earliest position at which downstream work becomes unblocked
///
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd)]
struct FrontierKey {
    ready_pos: i64,
    id: TraversalNodeId,
}

struct TraversalEntry {
    data: TraversalNode,
    alive: bool,
    in_frontier: bool,
}

/// Tracks memoization of traversal entries during positional graph traversal
///
/// For every (k-mer, position sub-interval) cell only the best-scoring traversal is retained.
/// Entries for the same k-mer never overlap in position space; `memoize` maintains this by
/// slicing and replacing overlapped entries atomically.
///
pub struct MemoizedTraverse {
    arena: Vec<TraversalEntry>,
    memoized: BTreeSet<MemoKey>,
    frontier: BinaryHeap<Reverse<FrontierKey>>,
}

impl Default for MemoizedTraverse {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoizedTraverse {
    pub fn new() -> Self {
        Self {
            arena: Vec::new(),
            memoized: BTreeSet::new(),
            frontier: BinaryHeap::with_capacity(1024),
        }
    }

    pub fn get(&self, id: TraversalNodeId) -> &TraversalNode {
        &self.arena[id].data
    }

    /// True if the entry is still the best known path over its sub-interval
    ///
    pub fn is_alive(&self, id: TraversalNodeId) -> bool {
        self.arena[id].alive
    }

    #[allow(dead_code)]
    pub fn memoized_count(&self) -> usize {
        self.memoized.len()
    }

    /// Memoize the given traversal
    ///
    /// Any stored entry for the same k-mer overlapping the candidate's sub-interval is compared
    /// by score position-by-position: the better path survives in the overlap (ties keep the
    /// existing entry), and the loser is sliced down to whatever positions the winner does not
    /// cover. All index mutations are applied after overlap resolution completes, so no partial
    /// state is observable through the frontier.
    ///
    pub fn memoize(&mut self, graph: &KmerGraph, candidate: TraversalNode) {
        let node = graph.node(candidate.node);
        assert_eq!(node.first_kmer, candidate.first_kmer);
        assert!(
            node.range().contains_range(&candidate.sub_range()),
            "Candidate sub-interval {:?} outside node interval {:?}",
            candidate.sub_range(),
            node.range()
        );

        let mut cand = candidate;
        let scan_end = cand.sub_end;
        let mut abandoned = false;
        let mut to_add: Vec<TraversalNode> = Vec::with_capacity(4);
        let mut to_remove: Vec<MemoKey> = Vec::with_capacity(4);

        // Collect stored entries with matching k-mer that could intersect the candidate
        // interval. The scan starts from the last entry sorting before the candidate start, the
        // only earlier-starting entry that could still overlap it.
        let could_overlap: Vec<MemoKey> = {
            let probe = MemoKey {
                first_kmer: cand.first_kmer,
                sub_start: cand.sub_start,
                sub_end: i64::MIN,
                score: i64::MIN,
                id: 0,
            };
            let scan_from = match self.memoized.range(..probe).next_back() {
                Some(floor) => Bound::Included(*floor),
                None => Bound::Unbounded,
            };
            self.memoized
                .range((scan_from, Bound::Unbounded))
                .take_while(|k| {
                    k.first_kmer < cand.first_kmer
                        || (k.first_kmer == cand.first_kmer && k.sub_start <= scan_end)
                })
                .filter(|k| k.first_kmer == cand.first_kmer && k.sub_end >= cand.sub_start)
                .copied()
                .collect()
        };

        for existing in could_overlap {
            if existing.sub_end < cand.sub_start {
                continue;
            }
            // The collected entries overlap the candidate closed interval
            assert!(
                existing.sub_start <= cand.sub_end && existing.sub_end >= cand.sub_start,
                "Memoized overlap scan invariant violated for kmer {:x}",
                cand.first_kmer
            );

            if cand.score > existing.score {
                // Remove the existing entry over the overlapping interval
                to_remove.push(existing);
                let existing_data = self.arena[existing.id].data.clone();
                if existing.sub_start < cand.sub_start {
                    // Existing entry is still the best path in its earlier interval
                    to_add.push(existing_data.sliced(existing.sub_start, cand.sub_start - 1));
                }
                if existing.sub_end > cand.sub_end {
                    // Existing entry is still the best path in its later interval
                    to_add.push(existing_data.sliced(cand.sub_end + 1, existing.sub_end));
                }
            } else {
                // Existing entry scores at least as well as the candidate
                let advanced_start = existing.sub_end + 1;
                if cand.sub_start < existing.sub_start {
                    // The candidate starts before the existing entry
                    to_add.push(cand.sliced(cand.sub_start, existing.sub_start - 1));
                }
                if advanced_start > cand.sub_end {
                    // Existing entry is better over all remaining candidate positions
                    abandoned = true;
                    break;
                }
                cand = cand.sliced(advanced_start, cand.sub_end);
            }
        }
        if !abandoned {
            to_add.push(cand);
        }

        // Update now that overlap iteration has finished
        for key in to_remove {
            let removed = self.memoized.remove(&key);
            assert!(removed);
            self.arena[key.id].alive = false;
        }
        for data in to_add {
            self.add_entry(graph, data);
        }
    }

    fn add_entry(&mut self, graph: &KmerGraph, data: TraversalNode) {
        let id = self.arena.len();
        let ready_pos = data.sub_end + graph.node(data.node).length as i64;
        let key = MemoKey::new(&data, id);
        self.arena.push(TraversalEntry {
            data,
            alive: true,
            in_frontier: true,
        });
        let inserted = self.memoized.insert(key);
        assert!(inserted);
        self.frontier.push(Reverse(FrontierKey { ready_pos, id }));
    }

    /// Remove and return the next entry for visitation
    ///
    pub fn poll_frontier(&mut self) -> Option<TraversalNodeId> {
        self.flush_invalid_frontier_head();
        let Reverse(key) = self.frontier.pop()?;
        self.arena[key.id].in_frontier = false;
        Some(key.id)
    }

    /// Return the next entry for visitation without removing it
    ///
    #[allow(dead_code)]
    pub fn peek_frontier(&mut self) -> Option<TraversalNodeId> {
        self.flush_invalid_frontier_head();
        self.frontier.peek().map(|Reverse(key)| key.id)
    }

    /// Discard frontier entries supplanted by better paths since they were queued
    ///
    fn flush_invalid_frontier_head(&mut self) {
        self.compact_frontier();
        while let Some(Reverse(key)) = self.frontier.peek() {
            if self.arena[key.id].alive {
                break;
            }
            let Reverse(key) = self.frontier.pop().unwrap();
            self.arena[key.id].in_frontier = false;
        }
    }

    /// Rebuild the frontier heap from live entries once dead entries dominate it
    ///
    /// Lazy invalidation leaves supplanted entries queued; rebuilding once the heap exceeds
    /// twice the memoized size bounds the bloat.
    ///
    fn compact_frontier(&mut self) {
        if self.frontier.len() <= 2 * self.memoized.len() {
            return;
        }
        let old = std::mem::take(&mut self.frontier);
        self.frontier = old
            .into_iter()
            .filter(|Reverse(key)| {
                let entry = &self.arena[key.id];
                entry.alive && entry.in_frontier
            })
            .collect();
    }

    /// Verify the memoized disjointness invariant: entries for the same k-mer never overlap
    ///
    pub fn sanity_check(&self) -> bool {
        let mut last: Option<&MemoKey> = None;
        for key in self.memoized.iter() {
            if let Some(prev) = last {
                assert!(
                    !(prev.first_kmer == key.first_kmer
                        && prev.sub_start <= key.sub_end
                        && prev.sub_end >= key.sub_start),
                    "Memoized entries overlap for kmer {:x}: [{},{}] and [{},{}]",
                    key.first_kmer,
                    prev.sub_start,
                    prev.sub_end,
                    key.sub_start,
                    key.sub_end
                );
            }
            last = Some(key);
        }
        true
    }
}

impl fmt::Debug for MemoizedTraverse {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} nodes memoized, {} in frontier",
            self.memoized.len(),
            self.frontier.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kmer_node::KmerPathNode;

    /// Graph with a single node per distinct kmer, wide validity intervals
    fn single_node_graph() -> KmerGraph {
        let mut graph = KmerGraph::new();
        graph.add_node(KmerPathNode::new(7, 0, 1000, 1, 1, false));
        graph
    }

    fn traversal(
        graph: &KmerGraph,
        node: NodeIndex,
        sub_start: i64,
        sub_end: i64,
        score: i64,
    ) -> TraversalNode {
        let mut t = TraversalNode::seed(graph, node);
        t.sub_start = sub_start;
        t.sub_end = sub_end;
        t.score = score;
        t
    }

    fn alive_intervals(memo: &MemoizedTraverse) -> Vec<(i64, i64, i64)> {
        memo.memoized
            .iter()
            .map(|k| (k.sub_start, k.sub_end, k.score))
            .collect()
    }

    #[test]
    fn test_overlap_slicing() {
        let graph = single_node_graph();
        let mut memo = MemoizedTraverse::new();

        memo.memoize(&graph, traversal(&graph, 0, 100, 110, 5));
        memo.memoize(&graph, traversal(&graph, 0, 105, 115, 8));

        assert_eq!(alive_intervals(&memo), vec![(100, 104, 5), (105, 115, 8)]);
        assert!(memo.sanity_check());
    }

    #[test]
    fn test_dominated_candidate_dropped() {
        let graph = single_node_graph();
        let mut memo = MemoizedTraverse::new();

        memo.memoize(&graph, traversal(&graph, 0, 100, 120, 10));
        memo.memoize(&graph, traversal(&graph, 0, 105, 115, 10));

        assert_eq!(alive_intervals(&memo), vec![(100, 120, 10)]);
    }

    #[test]
    fn test_exact_match_tie_keeps_existing() {
        let graph = single_node_graph();
        let mut memo = MemoizedTraverse::new();

        memo.memoize(&graph, traversal(&graph, 0, 100, 120, 10));
        let first_id = memo.peek_frontier().unwrap();
        memo.memoize(&graph, traversal(&graph, 0, 100, 120, 10));

        assert_eq!(memo.memoized_count(), 1);
        assert!(memo.is_alive(first_id));
    }

    #[test]
    fn test_better_candidate_replaces_interior() {
        let graph = single_node_graph();
        let mut memo = MemoizedTraverse::new();

        memo.memoize(&graph, traversal(&graph, 0, 100, 120, 5));
        memo.memoize(&graph, traversal(&graph, 0, 105, 110, 9));

        assert_eq!(
            alive_intervals(&memo),
            vec![(100, 104, 5), (105, 110, 9), (111, 120, 5)]
        );
        assert!(memo.sanity_check());
    }

    #[test]
    fn test_candidate_spanning_multiple_existing() {
        let graph = single_node_graph();
        let mut memo = MemoizedTraverse::new();

        memo.memoize(&graph, traversal(&graph, 0, 100, 104, 3));
        memo.memoize(&graph, traversal(&graph, 0, 110, 114, 9));
        // Beats the first entry, loses to the second, and survives in the gaps
        memo.memoize(&graph, traversal(&graph, 0, 98, 120, 6));

        assert_eq!(
            alive_intervals(&memo),
            vec![(98, 109, 6), (110, 114, 9), (115, 120, 6)]
        );
        assert!(memo.sanity_check());
    }

    #[test]
    fn test_frontier_order_and_freshness() {
        let mut graph = KmerGraph::new();
        let a = graph.add_node(KmerPathNode::new(1, 50, 50, 1, 1, false));
        let b = graph.add_node(KmerPathNode::new(2, 10, 10, 1, 1, false));
        let mut memo = MemoizedTraverse::new();

        memo.memoize(&graph, TraversalNode::seed(&graph, a));
        memo.memoize(&graph, TraversalNode::seed(&graph, b));

        // The earlier-completing entry comes out first
        let first = memo.poll_frontier().unwrap();
        assert_eq!(memo.get(first).node, b);
        assert!(memo.is_alive(first));
        let second = memo.poll_frontier().unwrap();
        assert_eq!(memo.get(second).node, a);
        assert!(memo.poll_frontier().is_none());
    }

    #[test]
    fn test_lazy_invalidation() {
        let graph = single_node_graph();
        let mut memo = MemoizedTraverse::new();

        memo.memoize(&graph, traversal(&graph, 0, 100, 110, 5));
        // Fully supplant the first entry
        memo.memoize(&graph, traversal(&graph, 0, 100, 110, 8));

        // The dead entry is skipped, the polled entry is alive
        let id = memo.poll_frontier().unwrap();
        assert!(memo.is_alive(id));
        assert_eq!(memo.get(id).score, 8);
        assert!(memo.poll_frontier().is_none());
    }

    #[test]
    fn test_slice_preserves_path() {
        let graph = single_node_graph();
        let t = traversal(&graph, 0, 100, 120, 6);
        let sliced = t.sliced(105, 110);
        assert_eq!(sliced.score, t.score);
        assert_eq!(sliced.path_length, t.path_length);
        assert_eq!(sliced.predecessor, t.predecessor);
    }

    #[test]
    #[should_panic]
    fn test_invalid_slice() {
        let graph = single_node_graph();
        let t = traversal(&graph, 0, 100, 120, 6);
        t.sliced(95, 110);
    }

    #[test]
    fn test_terminal_ranges() {
        let mut graph = KmerGraph::new();
        let a = graph.add_node(KmerPathNode::new(1, 10, 30, 2, 1, false));
        let b = graph.add_node(KmerPathNode::new(2, 12, 20, 1, 1, false));
        let c = graph.add_node(KmerPathNode::new(3, 25, 40, 1, 1, true));
        graph.add_edge(a, b, PosRange::from_pair(12, 20)).unwrap();
        graph.add_edge(a, c, PosRange::from_pair(25, 32)).unwrap();

        let t = TraversalNode::seed(&graph, a);
        // Successor b covers source positions [10,18], reference successor c covers [23,30]
        let terminal = t.terminal_ranges(&graph);
        assert_eq!(terminal.ranges(), &[PosRange::from_pair(19, 22)]);

        let leaf_anchor = t.terminal_leaf_anchor_ranges(&graph);
        assert_eq!(leaf_anchor.ranges(), &[PosRange::from_pair(19, 30)]);
    }
}
