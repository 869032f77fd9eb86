/// Engine configuration for one assembly run
///
/// This is a flat set of enumerated options passed by borrow into the assembly driver; there is
/// no process-wide mutable state.
///
#[derive(Clone, Debug)]
pub struct AssemblyConfig {
    /// De Bruijn graph k-mer size
    pub k: u32,

    /// Maximum number of contigs per assembly iteration
    pub max_contigs_per_iteration: usize,

    /// Maximum nodes visited when building the best path for one contig
    pub max_path_traversal_nodes: usize,

    /// Allow reuse of reference k-mers when assembling subsequent contigs in an assembly
    /// iteration
    pub allow_reference_kmer_reuse: bool,

    /// Maximum number of branches considered at k-mer branches. A value of 1 indicates a greedy
    /// traversal.
    pub branching_factor: usize,

    /// Subgraph assembly margin in multiples of max fragment size
    ///
    /// This determines how long to wait before assembling a subgraph. Too short and a subgraph
    /// is assembled before all evidence has been added to it. Too long and the misassembly rate
    /// increases in repetitive regions.
    ///
    pub subgraph_assembly_margin: f64,

    /// Maximum width of a subgraph, in multiples of max fragment size
    pub max_subgraph_width: f64,

    /// Maximum expected size of a read fragment, the base quantity scaled by the subgraph margin
    /// and width multipliers
    pub max_expected_fragment_size: usize,

    /// Minimum number of reads contributing to an assembly
    pub min_reads: usize,

    /// Report contigs rejected by the acceptance rules alongside passing contigs
    pub emit_filtered_contigs: bool,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            k: 25,
            max_contigs_per_iteration: 1024,
            max_path_traversal_nodes: 100_000,
            allow_reference_kmer_reuse: true,
            branching_factor: usize::MAX,
            subgraph_assembly_margin: 2.5,
            max_subgraph_width: 100.0,
            max_expected_fragment_size: 1000,
            min_reads: 3,
            emit_filtered_contigs: false,
        }
    }
}

impl AssemblyConfig {
    /// Positional gap beyond which adjacent evidence is assembled separately
    pub fn subgraph_margin_positions(&self) -> i64 {
        (self.subgraph_assembly_margin * self.max_expected_fragment_size as f64).ceil() as i64
    }

    /// Hard cap on the positional extent of any single assembly subgraph
    pub fn max_subgraph_width_positions(&self) -> i64 {
        std::cmp::max(
            (self.max_subgraph_width * self.max_expected_fragment_size as f64).ceil() as i64,
            1,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_positions() {
        let config = AssemblyConfig {
            subgraph_assembly_margin: 2.5,
            max_subgraph_width: 10.0,
            max_expected_fragment_size: 1000,
            ..Default::default()
        };
        assert_eq!(config.subgraph_margin_positions(), 2500);
        assert_eq!(config.max_subgraph_width_positions(), 10_000);
    }
}
