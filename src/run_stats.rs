//! Track stats for the whole assembly run
//!

use std::collections::BTreeMap;
use std::fs::File;

use camino::Utf8Path;
use log::info;
use serde::{Deserialize, Serialize};
use strum::EnumCount;
use unwrap::unwrap;

use crate::acceptance_filter::FilterReason;
use crate::assemble::RUN_STATS_FILENAME;
use crate::driver::DriverStats;

#[derive(Deserialize, Serialize)]
pub struct RunStep {
    pub name: String,
    pub version: String,
}

#[derive(Default, Deserialize, Serialize)]
pub struct AssemblyRunStats {
    pub graph_node_count: usize,
    pub subgraph_count: usize,

    pub polled_traversal_entries: usize,
    pub candidate_contig_count: usize,
    pub emitted_contig_count: usize,
    pub filtered_contig_count: usize,

    /// Count of assembly attempts abandoned after exceeding the traversal-node budget
    pub budget_abort_count: usize,

    /// Per-reason tallies over all contigs hitting each acceptance rule
    pub filter_reason_counts: BTreeMap<String, usize>,

    pub total_assembly_time_secs: f64,
}

impl AssemblyRunStats {
    pub fn add_driver_stats(&mut self, driver_stats: &DriverStats) {
        self.polled_traversal_entries += driver_stats.polled_entries;
        self.candidate_contig_count += driver_stats.candidate_contigs;
        self.emitted_contig_count += driver_stats.emitted_contigs;
        self.filtered_contig_count += driver_stats.filtered_contigs;
        self.budget_abort_count += driver_stats.budget_aborts;
        for reason_index in 0..FilterReason::COUNT {
            let count = driver_stats.filter_reason_counts[reason_index];
            if count == 0 {
                continue;
            }
            let reason = FilterReason::from_repr(reason_index).unwrap();
            *self.filter_reason_counts.entry(reason.to_string()).or_insert(0) += count;
        }
    }
}

#[derive(Deserialize, Serialize)]
pub struct AssembleRunStats {
    pub run_step: RunStep,
    pub assembly_stats: AssemblyRunStats,
}

/// Remove any older run stats file present in the output directory
///
/// The run stats file is used as a marker of a successfully finished run, so removing it at run
/// start allows completion to be determined from whether a new file was written.
///
pub fn delete_run_stats(output_dir: &Utf8Path) {
    let filename = output_dir.join(RUN_STATS_FILENAME);
    if filename.exists() {
        unwrap!(
            std::fs::remove_file(&filename),
            "Unable to remove older run statistics json file: '{filename}'"
        );
    }
}

/// Write run_stats structure out in json format
pub fn write_assemble_run_stats(output_dir: &Utf8Path, run_stats: &AssembleRunStats) {
    let filename = output_dir.join(RUN_STATS_FILENAME);

    info!("Writing run statistics to file: '{filename}'");

    let f = unwrap!(
        File::create(&filename),
        "Unable to create run statistics json file: '{filename}'"
    );

    serde_json::to_writer_pretty(&f, &run_stats).unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_driver_stats() {
        let mut driver_stats = DriverStats::default();
        driver_stats.candidate_contigs = 3;
        driver_stats.emitted_contigs = 2;
        driver_stats.filtered_contigs = 1;
        driver_stats.filter_reason_counts[FilterReason::TooFewReads as usize] = 1;

        let mut stats = AssemblyRunStats::default();
        stats.add_driver_stats(&driver_stats);
        stats.add_driver_stats(&driver_stats);

        assert_eq!(stats.candidate_contig_count, 6);
        assert_eq!(stats.emitted_contig_count, 4);
        assert_eq!(stats.filter_reason_counts.get("TooFewReads"), Some(&2));
    }
}
