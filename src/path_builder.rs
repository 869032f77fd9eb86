//! Depth-first construction of concrete assembly paths
//!

use std::collections::VecDeque;
use std::fmt;

use rust_asm_utils::{PosRange, PosRangeSet};

use crate::graph::{KmerGraph, KmerGraphEdge};
use crate::kmer_node::NodeIndex;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TraversalDirection {
    Forward,
    Reverse,
}

/// One element of a concrete assembly path: a node restricted to the entry positions consistent
/// with its neighbors on the path
///
#[derive(Clone)]
pub struct PathStep {
    pub node: NodeIndex,
    pub range: PosRange,
}

impl fmt::Debug for PathStep {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "PathStep: node: {} {:?}", self.node, self.range)
    }
}

/// Restartable cursor over the unvisited child edges of one path element
///
/// Modeled as a position into the node's edge list rather than a consumed stream, so child
/// traversal can be reset to an untraversed state at any time.
///
#[derive(Clone, Default)]
struct ChildCursor {
    edge_index: usize,
    visited: usize,
}

/// A depth-first traversal path through the positional graph
///
/// The path is a deque of steps plus a parallel deque of child cursors. The traversal direction
/// determines which end of the deque is the growing head: forward paths grow at the back toward
/// larger positions, reverse paths grow at the front through predecessors.
///
pub struct KmerPathBuilder<'a> {
    graph: &'a KmerGraph,
    direction: TraversalDirection,
    steps: VecDeque<PathStep>,
    next_child: VecDeque<ChildCursor>,

    /// Per-node cap on the number of child branches visited
    branching_factor: usize,

    /// Total node-visit budget for this path construction
    node_budget: usize,
    nodes_visited: usize,
    budget_exceeded: bool,
}

impl<'a> KmerPathBuilder<'a> {
    pub fn new(
        graph: &'a KmerGraph,
        root: PathStep,
        direction: TraversalDirection,
        branching_factor: usize,
        node_budget: usize,
    ) -> Self {
        assert!(branching_factor >= 1);
        let mut x = Self {
            graph,
            direction,
            steps: VecDeque::new(),
            next_child: VecDeque::new(),
            branching_factor,
            node_budget,
            nodes_visited: 0,
            budget_exceeded: false,
        };
        x.push(root);
        x
    }

    pub fn head(&self) -> &PathStep {
        match self.direction {
            TraversalDirection::Forward => self.steps.back().unwrap(),
            TraversalDirection::Reverse => self.steps.front().unwrap(),
        }
    }

    /// Path steps in genomic order
    pub fn steps(&self) -> impl Iterator<Item = &PathStep> {
        self.steps.iter()
    }

    pub fn path_node_count(&self) -> usize {
        self.steps.len()
    }

    /// True if the node-visit budget was exhausted during construction
    ///
    pub fn budget_exceeded(&self) -> bool {
        self.budget_exceeded
    }

    /// Append a step at the path head
    ///
    pub fn push(&mut self, step: PathStep) {
        self.nodes_visited += 1;
        if self.nodes_visited > self.node_budget {
            self.budget_exceeded = true;
        }
        match self.direction {
            TraversalDirection::Forward => {
                self.steps.push_back(step);
                self.next_child.push_back(ChildCursor::default());
            }
            TraversalDirection::Reverse => {
                self.steps.push_front(step);
                self.next_child.push_front(ChildCursor::default());
            }
        }
    }

    /// Stop any further child traversal of the head node and remove it from the path
    ///
    #[allow(dead_code)]
    pub fn pop(&mut self) {
        assert!(
            self.steps.len() > 1,
            "Cannot remove root node from traversal path"
        );
        self.pop_unchecked();
    }

    fn pop_unchecked(&mut self) {
        match self.direction {
            TraversalDirection::Forward => {
                self.steps.pop_back();
                self.next_child.pop_back();
            }
            TraversalDirection::Reverse => {
                self.steps.pop_front();
                self.next_child.pop_front();
            }
        }
    }

    fn head_cursor_mut(&mut self) -> &mut ChildCursor {
        match self.direction {
            TraversalDirection::Forward => self.next_child.back_mut().unwrap(),
            TraversalDirection::Reverse => self.next_child.front_mut().unwrap(),
        }
    }

    fn head_edges(&self) -> &[KmerGraphEdge] {
        let head = self.head();
        match self.direction {
            TraversalDirection::Forward => self.graph.successors(head.node),
            TraversalDirection::Reverse => self.graph.predecessors(head.node),
        }
    }

    /// Path positions admissible for the child node reached through `edge`, or None if the edge
    /// is not traversable from the head step
    ///
    fn admissible_child_range(&self, edge: &KmerGraphEdge) -> Option<PosRange> {
        let head = self.head();
        match self.direction {
            TraversalDirection::Forward => self.graph.child_range(head.node, &head.range, edge),
            TraversalDirection::Reverse => self.graph.parent_range(&head.range, edge),
        }
    }

    /// Traverse to the next unvisited child of the head node
    ///
    /// Returns true if a child was pushed onto the path.
    ///
    #[allow(dead_code)]
    pub fn next_child(&mut self) -> bool {
        loop {
            let cursor = match self.direction {
                TraversalDirection::Forward => self.next_child.back().unwrap(),
                TraversalDirection::Reverse => self.next_child.front().unwrap(),
            };
            if cursor.visited >= self.branching_factor {
                return false;
            }
            let edge_index = cursor.edge_index;
            let edges = self.head_edges();
            if edge_index >= edges.len() {
                return false;
            }
            let edge = edges[edge_index].clone();
            let admissible = self.admissible_child_range(&edge);
            let cursor = self.head_cursor_mut();
            cursor.edge_index += 1;
            match admissible {
                Some(range) => {
                    cursor.visited += 1;
                    self.push(PathStep {
                        node: edge.to,
                        range,
                    });
                    return true;
                }
                None => continue,
            }
        }
    }

    /// Reset traversal of the head node's children to an untraversed state
    ///
    #[allow(dead_code)]
    pub fn reset_children(&mut self) {
        *self.head_cursor_mut() = ChildCursor::default();
    }

    /// Repeatedly push the highest-weight admissible child until none exists
    ///
    /// The reference flag of each child node must be admitted by the corresponding argument.
    /// Ties are broken by the first child encountered in edge iteration order. Unvisited
    /// children of the head are consumed by the scan, matching depth-first iteration state.
    ///
    pub fn greedy_traverse(&mut self, allow_reference: bool, allow_non_reference: bool) {
        loop {
            if self.budget_exceeded {
                return;
            }
            let mut best: Option<(PathStep, u32)> = None;
            let edges = self.head_edges();
            let start = match self.direction {
                TraversalDirection::Forward => self.next_child.back().unwrap().edge_index,
                TraversalDirection::Reverse => self.next_child.front().unwrap().edge_index,
            };
            for edge in edges[std::cmp::min(start, edges.len())..].iter() {
                let is_ref = self.graph.node(edge.to).is_reference;
                if (is_ref && allow_reference) || (!is_ref && allow_non_reference) {
                    if let Some(range) = self.admissible_child_range(edge) {
                        let weight = self.graph.node(edge.to).weight;
                        let better = match &best {
                            Some((_, best_weight)) => weight > *best_weight,
                            None => true,
                        };
                        if better {
                            best = Some((
                                PathStep {
                                    node: edge.to,
                                    range,
                                },
                                weight,
                            ));
                        }
                    }
                }
            }
            // The scan consumes all remaining children of the head
            let total = self.head_edges().len();
            self.head_cursor_mut().edge_index = total;
            match best {
                Some((step, _)) => self.push(step),
                None => return,
            }
        }
    }

    /// Sum of node weights over the path
    ///
    #[allow(dead_code)]
    pub fn current_weight(&self) -> i64 {
        self.steps
            .iter()
            .map(|s| self.graph.node(s.node).weight as i64)
            .sum()
    }

    /// Position intervals at which the path head is a valid assembly terminus
    ///
    #[allow(dead_code)]
    pub fn terminal_ranges(&self) -> PosRangeSet {
        let head = self.head();
        self.graph.terminal_ranges(head.node, &head.range, false)
    }

    /// Position intervals at which the path head terminates as an anchored leaf
    ///
    #[allow(dead_code)]
    pub fn terminal_leaf_ranges(&self) -> PosRangeSet {
        let head = self.head();
        self.graph.terminal_ranges(head.node, &head.range, true)
    }
}
