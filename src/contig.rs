use std::collections::{BTreeSet, HashSet};
use std::fmt;

use rust_asm_utils::PosRange;

use crate::acceptance_filter::{apply_assembly_filters, FilterResult, SupportObservables};
use crate::config::AssemblyConfig;
use crate::graph::KmerGraph;
use crate::kmer_node::{EvidenceFingerprint, NodeIndex, SupportCategory};
use crate::path_builder::PathStep;

/// One assembled candidate contig
///
#[derive(Clone)]
pub struct AssemblyContig {
    /// Graph nodes of the assembled path, in genomic order
    pub nodes: Vec<NodeIndex>,

    /// Genomic positions spanned by the path k-mer chain
    pub span: PosRange,

    /// Memoized path score at the emitting traversal head
    pub score: i64,

    pub path_node_count: usize,

    /// Total number of k-mers over the path
    pub kmer_length: usize,

    /// Distinct unconsumed read evidence supporting the contig
    pub evidence: Vec<EvidenceFingerprint>,

    pub observables: SupportObservables,

    pub filter: FilterResult,
}

impl AssemblyContig {
    /// Summarize a completed builder path into a reportable contig
    ///
    /// Evidence already consumed by previously emitted contigs is excluded from the support
    /// observables, so repeated assemblies over shared nodes do not double-count reads.
    ///
    pub fn from_path<'a>(
        graph: &KmerGraph,
        steps: impl Iterator<Item = &'a PathStep>,
        score: i64,
        config: &AssemblyConfig,
        consumed_evidence: &HashSet<u64>,
    ) -> Self {
        let mut nodes = Vec::new();
        let mut span = PosRange::new();
        let mut kmer_length = 0usize;
        let mut anchor_kmers = 0usize;
        let mut breakend_kmers = 0usize;
        let mut evidence = BTreeSet::new();

        for step in steps {
            let node = graph.node(step.node);
            if nodes.is_empty() {
                span = step.range;
            }
            span.merge(&step.range.shifted(node.length as i64 - 1));
            nodes.push(step.node);
            kmer_length += node.length as usize;
            if node.is_reference {
                anchor_kmers += node.length as usize;
            } else {
                breakend_kmers += node.length as usize;
            }
            for fingerprint in node.evidence.iter() {
                if !consumed_evidence.contains(&fingerprint.id) {
                    evidence.insert(*fingerprint);
                }
            }
        }
        assert!(!nodes.is_empty(), "Contig built from an empty path");

        let mut observables = SupportObservables {
            // The breakend sequence spans its k-mers plus the k-1 base overlap into the contig
            breakend_length: if breakend_kmers > 0 {
                breakend_kmers + config.k as usize - 1
            } else {
                0
            },
            anchor_length: anchor_kmers,
            ..Default::default()
        };
        for fingerprint in evidence.iter() {
            match fingerprint.category {
                SupportCategory::ReadPair => {
                    observables.read_pair_support += 1;
                    observables.max_read_pair_length = std::cmp::max(
                        observables.max_read_pair_length,
                        fingerprint.read_length as usize,
                    );
                }
                SupportCategory::SoftClip => observables.soft_clip_support += 1,
                SupportCategory::Remote => observables.remote_support += 1,
            }
        }

        let filter = apply_assembly_filters(&observables, config.min_reads);
        let path_node_count = nodes.len();

        Self {
            nodes,
            span,
            score,
            path_node_count,
            kmer_length,
            evidence: evidence.into_iter().collect(),
            observables,
            filter,
        }
    }

    pub fn supporting_read_count(&self) -> usize {
        self.evidence.len()
    }
}

impl fmt::Debug for AssemblyContig {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "AssemblyContig: {:?} score: {} nodes: {} kmers: {} reads: {}",
            self.span,
            self.score,
            self.path_node_count,
            self.kmer_length,
            self.supporting_read_count(),
        )
    }
}
