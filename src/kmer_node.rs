use std::fmt;

use rust_asm_utils::PosRange;
use strum::EnumCount;

/// Index of a node within `KmerGraph` storage
pub type NodeIndex = usize;

/// Category of read evidence backing a k-mer path node
///
/// 'Remote' support comes from reads mapped elsewhere whose mate or soft-clipped tail implicates
/// this locus.
///
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord, Hash, EnumCount)]
pub enum SupportCategory {
    ReadPair,
    SoftClip,
    Remote,
}

/// Identity of one piece of read evidence contributing to a node
///
/// The id is a stable fingerprint of the source read, so the same read contributing to multiple
/// nodes of an assembled path is counted once per contig.
///
#[derive(Clone, Copy, Eq, PartialEq, PartialOrd, Ord, Hash)]
pub struct EvidenceFingerprint {
    pub id: u64,
    pub category: SupportCategory,

    /// Read length of the source read, used by the contig acceptance rules
    pub read_length: u32,
}

impl fmt::Debug for EvidenceFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}:{:x}", self.category, self.id)
    }
}

/// A k-mer path node in the positional de Bruijn graph
///
/// The node aggregates a non-branching chain of `length` k-mers. The stored position range is the
/// closed interval of genomic positions at which the entry k-mer of the chain is valid; the k-mer
/// at offset i within the chain is correspondingly valid over the same range shifted by i.
///
#[derive(Clone)]
pub struct KmerPathNode {
    /// Packed 2-bit encoding of the node's entry k-mer
    pub first_kmer: u64,

    /// Closed interval of valid genomic positions for the entry k-mer
    range: PosRange,

    /// Number of k-mers aggregated into this node
    pub length: u32,

    /// Total evidence weight over all k-mers of the node
    pub weight: u32,

    /// True if the node k-mers are supported by the reference sequence
    pub is_reference: bool,

    /// Read evidence contributing weight to this node
    pub evidence: Vec<EvidenceFingerprint>,
}

impl KmerPathNode {
    pub fn new(
        first_kmer: u64,
        start_position: i64,
        end_position: i64,
        length: u32,
        weight: u32,
        is_reference: bool,
    ) -> Self {
        assert!(
            start_position <= end_position,
            "Invalid kmer node position interval [{start_position},{end_position}]"
        );
        assert!(length >= 1, "Invalid kmer node length {length}");
        Self {
            first_kmer,
            range: PosRange::from_pair(start_position, end_position),
            length,
            weight,
            is_reference,
            evidence: Vec::new(),
        }
    }

    pub fn start_position(&self) -> i64 {
        self.range.start
    }

    pub fn end_position(&self) -> i64 {
        self.range.end
    }

    /// Validity interval of the node's entry k-mer
    pub fn range(&self) -> PosRange {
        self.range
    }

    /// Validity interval of the node's final k-mer
    #[allow(dead_code)]
    pub fn last_kmer_range(&self) -> PosRange {
        self.range.shifted(self.length as i64 - 1)
    }
}

impl fmt::Debug for KmerPathNode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "KmerPathNode: {:x} {:?} len: {} weight: {}{}",
            self.first_kmer,
            self.range,
            self.length,
            self.weight,
            if self.is_reference { " ref" } else { "" },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kmer_ranges() {
        let node = KmerPathNode::new(0xACAC, 10, 20, 5, 7, false);
        assert_eq!(node.range(), PosRange::from_pair(10, 20));
        assert_eq!(node.last_kmer_range(), PosRange::from_pair(14, 24));
    }

    #[test]
    #[should_panic]
    fn test_invalid_interval() {
        KmerPathNode::new(0, 21, 20, 1, 1, false);
    }

    #[test]
    #[should_panic]
    fn test_invalid_length() {
        KmerPathNode::new(0, 10, 20, 0, 1, false);
    }
}
