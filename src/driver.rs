//! Assembly driver: turns the memoized traversal frontier into an ordered stream of contigs
//!

use std::collections::HashSet;
use std::fmt;

use log::debug;
use strum::EnumCount;

use crate::acceptance_filter::FilterReason;
use crate::config::AssemblyConfig;
use crate::contig::AssemblyContig;
use crate::graph::KmerGraph;
use crate::kmer_node::NodeIndex;
use crate::memoized_traverse::{MemoizedTraverse, TraversalNode, TraversalNodeId};
use crate::path_builder::{KmerPathBuilder, PathStep, TraversalDirection};

#[derive(Clone, Copy, Debug, Eq, PartialEq, strum::Display)]
pub enum DriverState {
    Idle,
    Polling,
    Building,
    Emitting,

    /// The frontier is exhausted
    Drained,

    /// The per-iteration contig cap was reached
    Capped,
}

/// Counters for one driver run
///
#[derive(Clone, Debug)]
pub struct DriverStats {
    pub polled_entries: usize,
    pub candidate_contigs: usize,
    pub emitted_contigs: usize,
    pub filtered_contigs: usize,
    pub budget_aborts: usize,
    pub filter_reason_counts: [usize; FilterReason::COUNT],
}

impl Default for DriverStats {
    fn default() -> Self {
        Self {
            polled_entries: 0,
            candidate_contigs: 0,
            emitted_contigs: 0,
            filtered_contigs: 0,
            budget_aborts: 0,
            filter_reason_counts: [0; FilterReason::COUNT],
        }
    }
}

/// Drives contig assembly over one subgraph of the positional de Bruijn graph
///
/// The driver owns its memoizer, so independent genomic regions can run on independent drivers.
/// Contigs come out in frontier-priority order; identical inputs and successor iteration order
/// produce an identical contig sequence.
///
pub struct AssemblyDriver<'a> {
    graph: &'a KmerGraph,
    config: &'a AssemblyConfig,
    memo: MemoizedTraverse,

    /// Read evidence already counted toward an emitted contig
    consumed_evidence: HashSet<u64>,

    /// Nodes whose support was consumed by an emitted contig
    spent_nodes: Vec<bool>,

    state: DriverState,
    pub stats: DriverStats,
}

impl<'a> AssemblyDriver<'a> {
    /// Seed a driver with the given subgraph nodes, which must arrive in non-decreasing start
    /// position order
    ///
    pub fn new(
        graph: &'a KmerGraph,
        config: &'a AssemblyConfig,
        subgraph_nodes: &[NodeIndex],
    ) -> Self {
        let mut last_start = i64::MIN;
        let mut x = Self {
            graph,
            config,
            memo: MemoizedTraverse::new(),
            consumed_evidence: HashSet::new(),
            spent_nodes: vec![false; graph.node_count()],
            state: DriverState::Idle,
            stats: DriverStats::default(),
        };
        for &node in subgraph_nodes {
            let start = graph.node(node).start_position();
            assert!(
                start >= last_start,
                "Subgraph nodes delivered out of start position order"
            );
            last_start = start;
            x.memo.memoize(graph, TraversalNode::seed(graph, node));
        }
        x
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Run the assembly iteration protocol to completion
    ///
    /// Each emitted contig is passed to the callback as it is produced. The run ends when the
    /// frontier drains or the per-iteration contig cap is reached.
    ///
    pub fn run<F: FnMut(&AssemblyContig)>(&mut self, emit: &mut F) {
        loop {
            self.state = DriverState::Polling;
            let id = match self.memo.poll_frontier() {
                Some(x) => x,
                None => {
                    self.state = DriverState::Drained;
                    return;
                }
            };
            self.stats.polled_entries += 1;
            let entry = self.memo.get(id).clone();

            // Newly reachable successors are memoized as the frontier advances, maintaining the
            // best-path cache ahead of any emission that could use them
            self.expand(id, &entry);

            // Only paths with a valid terminus can emit an assembly
            if entry.terminal_ranges(self.graph).is_empty()
                && entry.terminal_leaf_anchor_ranges(self.graph).is_empty()
            {
                continue;
            }
            if self.spent_nodes[entry.node] {
                continue;
            }

            self.state = DriverState::Building;
            let contig = match self.build_contig(&entry) {
                Some(x) => x,
                None => continue,
            };

            self.state = DriverState::Emitting;
            self.stats.candidate_contigs += 1;
            for reason in contig.filter.reasons() {
                self.stats.filter_reason_counts[*reason as usize] += 1;
            }
            if contig.filter.is_pass() {
                self.consume_contig_support(&contig);
                self.stats.emitted_contigs += 1;
                emit(&contig);
            } else {
                self.stats.filtered_contigs += 1;
                if self.config.emit_filtered_contigs {
                    emit(&contig);
                }
            }

            if self.stats.emitted_contigs >= self.config.max_contigs_per_iteration {
                self.state = DriverState::Capped;
                return;
            }
        }
    }

    /// Memoize all successors reachable from the polled entry
    ///
    fn expand(&mut self, id: TraversalNodeId, entry: &TraversalNode) {
        let sub_range = entry.sub_range();
        for edge in self.graph.successors(entry.node) {
            if let Some(range) = self.graph.child_range(entry.node, &sub_range, edge) {
                let child = TraversalNode::child(self.graph, id, entry, edge.to, range);
                self.memo.memoize(self.graph, child);
            }
        }
    }

    /// Reconstruct the best path reaching `entry` and extend it greedily into reference anchor
    /// sequence, or None if the traversal-node budget was exhausted
    ///
    fn build_contig(&mut self, entry: &TraversalNode) -> Option<AssemblyContig> {
        if entry.path_length as usize > self.config.max_path_traversal_nodes {
            self.abandon_attempt(entry);
            return None;
        }

        // Walk predecessor links back to the seed, recovering genomic order
        let mut rev_steps = Vec::with_capacity(entry.path_length as usize);
        let mut current = entry.clone();
        loop {
            rev_steps.push(PathStep {
                node: current.node,
                range: current.sub_range(),
            });
            match current.predecessor {
                Some(pred_id) => current = self.memo.get(pred_id).clone(),
                None => break,
            }
        }

        let mut steps = rev_steps.into_iter().rev();
        let root = steps.next().unwrap();
        let mut path = KmerPathBuilder::new(
            self.graph,
            root,
            TraversalDirection::Forward,
            self.config.branching_factor,
            self.config.max_path_traversal_nodes,
        );
        for step in steps {
            path.push(step);
        }

        // The non-reference portion of the path is already optimal from memoization; the greedy
        // pass extends the terminus through reference sequence to anchor the contig
        path.greedy_traverse(true, false);

        if path.budget_exceeded() {
            self.abandon_attempt(entry);
            return None;
        }

        // Anchor the other side of the contig by extending the path start backward through
        // reference predecessors
        let back_root = path.steps().next().unwrap().clone();
        let mut back_path = KmerPathBuilder::new(
            self.graph,
            back_root,
            TraversalDirection::Reverse,
            self.config.branching_factor,
            self.config.max_path_traversal_nodes,
        );
        back_path.greedy_traverse(true, false);

        if back_path.budget_exceeded() {
            self.abandon_attempt(entry);
            return None;
        }

        let anchor_count = back_path.path_node_count() - 1;
        let steps = back_path
            .steps()
            .take(anchor_count)
            .chain(path.steps())
            .cloned()
            .collect::<Vec<_>>();

        Some(AssemblyContig::from_path(
            self.graph,
            steps.iter(),
            entry.score,
            self.config,
            &self.consumed_evidence,
        ))
    }

    fn abandon_attempt(&mut self, entry: &TraversalNode) {
        self.stats.budget_aborts += 1;
        debug!(
            "Abandoned assembly at node {} after exceeding traversal budget of {} nodes",
            entry.node, self.config.max_path_traversal_nodes
        );
    }

    /// Mark the contig's k-mer support as consumed so later iterations do not double-count it
    ///
    /// Reference nodes are exempt when reference k-mer reuse is allowed.
    ///
    fn consume_contig_support(&mut self, contig: &AssemblyContig) {
        for &node_index in contig.nodes.iter() {
            let node = self.graph.node(node_index);
            if node.is_reference && self.config.allow_reference_kmer_reuse {
                continue;
            }
            self.spent_nodes[node_index] = true;
            for fingerprint in node.evidence.iter() {
                self.consumed_evidence.insert(fingerprint.id);
            }
        }
    }
}

impl fmt::Debug for AssemblyDriver<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "AssemblyDriver: state: {} memo: {:?}",
            self.state, self.memo
        )
    }
}
