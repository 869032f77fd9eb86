use std::fs::File;
use std::io::{BufWriter, Write};

use camino::Utf8Path;
use itertools::Itertools;
use log::info;
use unwrap::unwrap;

use crate::assemble::CONTIG_TABLE_FILENAME;
use crate::contig::AssemblyContig;

/// Write assembled contigs to a tab-delimited report table
///
/// Contigs are sorted by genomic span. The filter column holds `PASS` or the comma-joined
/// rejection reasons, so filtered contigs admitted by the emit-filtered setting remain
/// distinguishable downstream.
///
pub fn write_contig_table(output_dir: &Utf8Path, mut contigs: Vec<AssemblyContig>) {
    contigs.sort_by_key(|x| (x.span.start, x.span.end));

    let filename = output_dir.join(CONTIG_TABLE_FILENAME);

    info!("Writing assembled contigs to file: '{filename}'");

    let f = unwrap!(
        File::create(&filename),
        "Unable to create contig table file: '{filename}'"
    );
    let mut f = BufWriter::new(f);

    writeln!(
        f,
        "#contig_id\tstart\tend\tscore\tnode_count\tkmer_length\tsupporting_reads\tread_pair\tsoft_clip\tremote\tfilter\tnodes"
    )
    .unwrap();

    for (contig_id, contig) in contigs.iter().enumerate() {
        let filter_label = if contig.filter.is_pass() {
            "PASS".to_string()
        } else {
            contig.filter.reasons().iter().join(",")
        };
        let node_chain = contig.nodes.iter().join(",");
        writeln!(
            f,
            "{contig_id}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{filter_label}\t{node_chain}",
            contig.span.start,
            contig.span.end,
            contig.score,
            contig.path_node_count,
            contig.kmer_length,
            contig.supporting_read_count(),
            contig.observables.read_pair_support,
            contig.observables.soft_clip_support,
            contig.observables.remote_support,
        )
        .unwrap();
    }
}
