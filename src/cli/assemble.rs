use camino::{Utf8Path, Utf8PathBuf};
use clap::Args;
use const_format::concatcp;
use serde::{Deserialize, Serialize};
use simple_error::{bail, SimpleResult};
use unwrap::unwrap;

use crate::assemble::SETTINGS_FILENAME;
use crate::config::AssemblyConfig;

/// Largest k-mer size representable in the packed 2-bit node encoding
const MAX_KMER_SIZE: u32 = 32;

#[derive(Args, Deserialize, Serialize)]
pub struct AssembleSettings {
    /// Directory for all assemble command output (must not already exist)
    #[arg(long, value_name = "DIR", default_value = concatcp!(env!("CARGO_PKG_NAME"), "_assemble_output"))]
    pub output_dir: Utf8PathBuf,

    /// Positional de Bruijn evidence graph in node/edge table format, optionally gzip
    /// compressed.
    #[arg(long = "graph", value_name = "FILE")]
    pub graph_filename: String,

    /// De Bruijn graph k-mer size used to build the input evidence graph
    #[arg(long, default_value_t = 25)]
    pub kmer_size: u32,

    /// Minimum number of reads contributing to an assembly
    ///
    /// Contigs with fewer locally-mapped supporting reads are marked as filtered.
    ///
    #[arg(long, default_value_t = 3)]
    pub min_reads: usize,

    /// Maximum expected size of a sequenced read fragment
    ///
    /// This scales the subgraph margin and width multipliers into genomic positions.
    ///
    #[arg(long, default_value_t = 1000)]
    pub max_fragment_size: usize,

    /// Maximum number of contigs reported per assembly iteration
    #[arg(hide = true, long, default_value_t = 1024)]
    pub max_contigs_per_iteration: usize,

    /// Maximum nodes visited while building the path for one contig, before the contig attempt
    /// is abandoned
    #[arg(hide = true, long, default_value_t = 100_000)]
    pub max_path_traversal_nodes: usize,

    /// Maximum number of branches considered at k-mer branches during path construction.
    /// A value of 1 indicates a greedy traversal. Unlimited when unset.
    ///
    #[arg(hide = true, long)]
    pub branching_factor: Option<usize>,

    /// Subgraph assembly margin in multiples of max fragment size
    ///
    /// Evidence separated by a positional gap larger than this margin is assembled as separate
    /// subgraphs. Too short and a subgraph is assembled before all of its evidence is seen; too
    /// long and the misassembly rate increases in repetitive regions.
    ///
    #[arg(hide = true, long, default_value_t = 2.5)]
    pub subgraph_assembly_margin: f64,

    /// Maximum width of any assembly subgraph, in multiples of max fragment size
    #[arg(hide = true, long, default_value_t = 100.0)]
    pub max_subgraph_width: f64,

    /// Disallow reuse of reference k-mers between contigs assembled in one iteration
    #[arg(long)]
    pub no_reference_kmer_reuse: bool,

    /// Report contigs rejected by the acceptance rules alongside passing contigs
    #[arg(long)]
    pub emit_filtered_contigs: bool,
}

impl AssembleSettings {
    pub fn to_assembly_config(&self) -> AssemblyConfig {
        AssemblyConfig {
            k: self.kmer_size,
            max_contigs_per_iteration: self.max_contigs_per_iteration,
            max_path_traversal_nodes: self.max_path_traversal_nodes,
            allow_reference_kmer_reuse: !self.no_reference_kmer_reuse,
            branching_factor: self.branching_factor.unwrap_or(usize::MAX),
            subgraph_assembly_margin: self.subgraph_assembly_margin,
            max_subgraph_width: self.max_subgraph_width,
            max_expected_fragment_size: self.max_fragment_size,
            min_reads: self.min_reads,
            emit_filtered_contigs: self.emit_filtered_contigs,
        }
    }
}

/// Validate settings and update to parameters that can't be processed automatically by clap.
///
/// Assumes that the logger is not setup
///
pub fn validate_and_fix_assemble_settings(
    settings: AssembleSettings,
) -> SimpleResult<AssembleSettings> {
    fn check_required_filename(filename: &str, label: &str) -> SimpleResult<()> {
        if filename.is_empty() {
            bail!("Must specify {label} file");
        }
        if !std::path::Path::new(&filename).exists() {
            bail!("Can't find specified {label} file: '{filename}'");
        }
        Ok(())
    }

    check_required_filename(&settings.graph_filename, "evidence graph")?;

    if settings.kmer_size == 0 || settings.kmer_size > MAX_KMER_SIZE {
        bail!(
            "--kmer-size argument must be between 1 and {}",
            MAX_KMER_SIZE
        );
    }

    if settings.min_reads == 0 {
        bail!("--min-reads argument must be greater than 0");
    }

    if settings.max_contigs_per_iteration == 0 {
        bail!("--max-contigs-per-iteration argument must be greater than 0");
    }

    if settings.max_path_traversal_nodes == 0 {
        bail!("--max-path-traversal-nodes argument must be greater than 0");
    }

    if let Some(branching_factor) = settings.branching_factor {
        if branching_factor == 0 {
            bail!("--branching-factor argument must be greater than 0");
        }
    }

    if settings.subgraph_assembly_margin < 0.0 {
        bail!("--subgraph-assembly-margin argument must not be negative");
    }

    if settings.max_subgraph_width <= 0.0 {
        bail!("--max-subgraph-width argument must be greater than 0");
    }

    if settings.max_fragment_size == 0 {
        bail!("--max-fragment-size argument must be greater than 0");
    }

    Ok(settings)
}

/// Write assemble settings out in json format
pub fn write_assemble_settings(output_dir: &Utf8Path, settings: &AssembleSettings) {
    use log::info;

    let filename = output_dir.join(SETTINGS_FILENAME);

    info!("Writing assemble settings to file: '{filename}'");

    let f = unwrap!(
        std::fs::File::create(&filename),
        "Unable to create assemble settings json file: '{filename}'"
    );

    serde_json::to_writer_pretty(&f, &settings).unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_test_settings() -> AssembleSettings {
        AssembleSettings {
            output_dir: Utf8PathBuf::default(),
            graph_filename: "Cargo.toml".to_string(),
            kmer_size: 25,
            min_reads: 3,
            max_fragment_size: 1000,
            max_contigs_per_iteration: 1024,
            max_path_traversal_nodes: 100_000,
            branching_factor: None,
            subgraph_assembly_margin: 2.5,
            max_subgraph_width: 100.0,
            no_reference_kmer_reuse: false,
            emit_filtered_contigs: false,
        }
    }

    #[test]
    fn test_valid_settings() {
        let settings = get_test_settings();
        assert!(validate_and_fix_assemble_settings(settings).is_ok());
    }

    #[test]
    fn test_missing_graph_file() {
        let mut settings = get_test_settings();
        settings.graph_filename = "./test_data/not_there.graph".to_string();
        assert!(validate_and_fix_assemble_settings(settings).is_err());
    }

    #[test]
    fn test_invalid_kmer_size() {
        let mut settings = get_test_settings();
        settings.kmer_size = 33;
        assert!(validate_and_fix_assemble_settings(settings).is_err());

        let mut settings = get_test_settings();
        settings.kmer_size = 0;
        assert!(validate_and_fix_assemble_settings(settings).is_err());
    }

    #[test]
    fn test_invalid_margin() {
        let mut settings = get_test_settings();
        settings.subgraph_assembly_margin = -1.0;
        assert!(validate_and_fix_assemble_settings(settings).is_err());
    }

    #[test]
    fn test_config_conversion() {
        let mut settings = get_test_settings();
        settings.no_reference_kmer_reuse = true;
        settings.branching_factor = Some(1);
        let config = settings.to_assembly_config();
        assert!(!config.allow_reference_kmer_reuse);
        assert_eq!(config.branching_factor, 1);
        assert_eq!(config.k, 25);
    }
}
