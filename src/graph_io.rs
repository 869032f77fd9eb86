//! Reader for the positional de Bruijn evidence graph table
//!
//! The table is the process-boundary stand-in for the upstream evidence graph producer. It is a
//! tab-delimited text format with one record per line:
//!
//! ```text
//! N  <first_kmer>  <start>  <end>  <length>  <weight>  <is_ref>  <evidence|.>
//! E  <from_node>  <to_node>  <sub_start>  <sub_end>
//! ```
//!
//! Node records are indexed by their order of appearance and must precede the edge records that
//! reference them. The evidence field is a comma-separated list of `id:category:read_length`
//! entries with category one of `rp`, `sc` or `rm`.
//!

use std::io::Read;

use log::info;
use rust_asm_utils::PosRange;
use unwrap::unwrap;

use crate::graph::{GraphError, KmerGraph};
use crate::kmer_node::{EvidenceFingerprint, KmerPathNode, SupportCategory};

fn parse_support_category(label: &str) -> SupportCategory {
    match label {
        "rp" => SupportCategory::ReadPair,
        "sc" => SupportCategory::SoftClip,
        "rm" => SupportCategory::Remote,
        _ => {
            panic!("Unknown evidence category `{label}` in graph file");
        }
    }
}

fn parse_evidence(field: &str) -> Vec<EvidenceFingerprint> {
    if field == "." {
        return Vec::new();
    }
    field
        .split(',')
        .map(|entry| {
            let words = entry.split(':').collect::<Vec<_>>();
            assert_eq!(
                words.len(),
                3,
                "Malformed evidence entry `{entry}` in graph file"
            );
            EvidenceFingerprint {
                id: words[0].parse::<u64>().unwrap(),
                category: parse_support_category(words[1]),
                read_length: words[2].parse::<u32>().unwrap(),
            }
        })
        .collect()
}

/// Parse graph table content into graph storage
///
/// Provider faults found while linking edges are surfaced to the caller; malformed text is a
/// contract violation and panics.
///
pub fn parse_graph_content(content: &str) -> Result<KmerGraph, GraphError> {
    let mut graph = KmerGraph::new();

    for line in content.split('\n') {
        // The last line is expected to be empty
        if line.is_empty() {
            continue;
        }
        if line.starts_with('#') {
            continue;
        }

        let words = line.split('\t').collect::<Vec<_>>();
        match words[0] {
            "N" => {
                assert!(words.len() >= 8, "Short node record in graph file: {line}");
                let mut node = KmerPathNode::new(
                    words[1].parse::<u64>().unwrap(),
                    words[2].parse::<i64>().unwrap(),
                    words[3].parse::<i64>().unwrap(),
                    words[4].parse::<u32>().unwrap(),
                    words[5].parse::<u32>().unwrap(),
                    words[6].parse::<u8>().unwrap() != 0,
                );
                node.evidence = parse_evidence(words[7]);
                graph.add_node(node);
            }
            "E" => {
                assert!(words.len() >= 5, "Short edge record in graph file: {line}");
                let from = words[1].parse::<usize>().unwrap();
                let to = words[2].parse::<usize>().unwrap();
                assert!(
                    from < graph.node_count() && to < graph.node_count(),
                    "Edge record references undefined node in graph file: {line}"
                );
                let sub_range = PosRange::from_pair(
                    words[3].parse::<i64>().unwrap(),
                    words[4].parse::<i64>().unwrap(),
                );
                graph.add_edge(from, to, sub_range)?;
            }
            _ => {
                panic!("Unknown record type `{}` in graph file: {line}", words[0]);
            }
        }
    }

    Ok(graph)
}

/// Read the evidence graph from a node/edge table file
///
pub fn read_kmer_graph(filename: &str) -> Result<KmerGraph, GraphError> {
    info!("Reading evidence graph from file '{filename}'");

    let mut content = String::new();
    if filename.ends_with(".gz") {
        let f = unwrap!(
            std::fs::File::open(filename),
            "Unable to open evidence graph file: '{filename}'"
        );
        let mut reader = flate2::read::GzDecoder::new(f);
        unwrap!(
            reader.read_to_string(&mut content),
            "Can't parse text from evidence graph file: '{filename}'"
        );
    } else {
        let mut reader = unwrap!(
            std::fs::File::open(filename),
            "Unable to open evidence graph file: '{filename}'"
        );
        unwrap!(
            reader.read_to_string(&mut content),
            "Can't parse text from evidence graph file: '{filename}'"
        );
    }

    let graph = parse_graph_content(&content)?;
    info!("Read evidence graph with {} nodes", graph.node_count());
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphErrorKind;
    use crate::kmer_node::SupportCategory;

    #[test]
    fn test_parse_graph_content() {
        let content = "\
# evidence graph
N\t101\t10\t20\t2\t5\t0\t7:rp:150,9:sc:100
N\t102\t12\t22\t1\t3\t1\t.
E\t0\t1\t12\t22
";
        let graph = parse_graph_content(content).unwrap();

        assert_eq!(graph.node_count(), 2);
        let node = graph.node(0);
        assert_eq!(node.first_kmer, 101);
        assert_eq!(node.start_position(), 10);
        assert_eq!(node.end_position(), 20);
        assert_eq!(node.length, 2);
        assert_eq!(node.weight, 5);
        assert!(!node.is_reference);
        assert_eq!(node.evidence.len(), 2);
        assert_eq!(node.evidence[0].id, 7);
        assert_eq!(node.evidence[0].category, SupportCategory::ReadPair);
        assert_eq!(node.evidence[0].read_length, 150);

        assert!(graph.node(1).is_reference);
        assert!(graph.node(1).evidence.is_empty());

        assert_eq!(graph.successors(0).len(), 1);
        assert_eq!(graph.successors(0)[0].to, 1);
    }

    #[test]
    fn test_provider_fault_surfaced() {
        // The edge admits positions outside the successor node interval
        let content = "\
N\t101\t10\t20\t2\t5\t0\t.
N\t102\t12\t22\t1\t3\t0\t.
E\t0\t1\t12\t30
";
        let err = parse_graph_content(content).unwrap_err();
        assert_eq!(err.kind, GraphErrorKind::EdgeOutsideNode);
        assert_eq!(err.node_index, 0);
    }

    #[test]
    #[should_panic]
    fn test_malformed_record() {
        parse_graph_content("N\t101\t10\n").unwrap();
    }
}
