use std::fmt;

use strum::EnumCount;

/// Reason an assembled contig was rejected by the acceptance rules
///
#[derive(Clone, Copy, Eq, PartialEq, PartialOrd, Ord, strum::Display, strum::EnumCount, strum::FromRepr)]
pub enum FilterReason {
    /// The contig contains no breakend sequence, so it only reproduces the reference allele
    ReferenceAllele,

    /// Fewer locally-mapped reads support the contig than the configured minimum
    TooFewReads,

    /// No anchor and a breakend no longer than a single read could produce
    SingleRead,

    /// All support comes from remotely-mapped evidence, with no reads mapping to this locus
    RemoteOnly,
}

impl fmt::Debug for FilterReason {
    // Set Debug trait to copy Display
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Support observables of one completed assembly candidate
///
#[derive(Clone, Debug, Default)]
pub struct SupportObservables {
    /// Length of the assembled breakend sequence, zero if the contig is all-reference
    pub breakend_length: usize,

    /// Length of the contig portion anchored to the reference
    pub anchor_length: usize,

    pub read_pair_support: usize,
    pub soft_clip_support: usize,
    pub remote_support: usize,

    /// Longest read among the contributing read pairs
    pub max_read_pair_length: usize,
}

/// Outcome of the acceptance rules for one contig
///
/// An empty reason set means the contig passed.
///
#[derive(Clone, Debug, Default)]
pub struct FilterResult {
    reasons: Vec<FilterReason>,
}

impl FilterResult {
    pub fn is_pass(&self) -> bool {
        self.reasons.is_empty()
    }

    pub fn reasons(&self) -> &[FilterReason] {
        &self.reasons
    }
}

/// Apply the contig acceptance rules
///
/// Each rule triggers independently, so a candidate can accumulate multiple rejection reasons.
/// The rules are pure functions of the observables, so reapplication yields the same reason set.
///
pub fn apply_assembly_filters(obs: &SupportObservables, min_reads: usize) -> FilterResult {
    let mut reasons = Vec::with_capacity(FilterReason::COUNT);
    let local_support = obs.read_pair_support + obs.soft_clip_support;

    if obs.breakend_length == 0 {
        reasons.push(FilterReason::ReferenceAllele);
    }
    if local_support < min_reads {
        reasons.push(FilterReason::TooFewReads);
    }
    if obs.anchor_length == 0 && obs.breakend_length <= obs.max_read_pair_length {
        // just assembled a single read - not very exciting
        reasons.push(FilterReason::SingleRead);
    }
    if obs.remote_support > 0 && obs.remote_support == local_support {
        // assembly is entirely made of remote support with no reads mapping to this location
        reasons.push(FilterReason::RemoteOnly);
    }

    FilterResult { reasons }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passing_observables() -> SupportObservables {
        SupportObservables {
            breakend_length: 500,
            anchor_length: 100,
            read_pair_support: 2,
            soft_clip_support: 2,
            remote_support: 1,
            max_read_pair_length: 150,
        }
    }

    #[test]
    fn test_pass() {
        let result = apply_assembly_filters(&passing_observables(), 3);
        assert!(result.is_pass());
    }

    #[test]
    fn test_reference_allele() {
        let mut obs = passing_observables();
        obs.breakend_length = 0;
        let result = apply_assembly_filters(&obs, 3);
        assert_eq!(result.reasons(), &[FilterReason::ReferenceAllele]);
    }

    #[test]
    fn test_too_few_reads() {
        let mut obs = passing_observables();
        obs.read_pair_support = 1;
        obs.soft_clip_support = 1;
        obs.remote_support = 0;
        let result = apply_assembly_filters(&obs, 3);
        assert_eq!(result.reasons(), &[FilterReason::TooFewReads]);
    }

    #[test]
    fn test_single_read() {
        let mut obs = passing_observables();
        obs.anchor_length = 0;
        obs.breakend_length = 150;
        let result = apply_assembly_filters(&obs, 3);
        assert_eq!(result.reasons(), &[FilterReason::SingleRead]);

        // A breakend longer than any single read is kept
        obs.breakend_length = 151;
        let result = apply_assembly_filters(&obs, 3);
        assert!(result.is_pass());
    }

    #[test]
    fn test_remote_only() {
        let mut obs = passing_observables();
        obs.soft_clip_support = 2;
        obs.read_pair_support = 1;
        obs.remote_support = 3;
        let result = apply_assembly_filters(&obs, 3);
        assert_eq!(result.reasons(), &[FilterReason::RemoteOnly]);
    }

    #[test]
    fn test_multiple_reasons() {
        let obs = SupportObservables {
            breakend_length: 0,
            anchor_length: 0,
            read_pair_support: 1,
            soft_clip_support: 0,
            remote_support: 1,
            max_read_pair_length: 150,
        };
        let result = apply_assembly_filters(&obs, 3);
        assert_eq!(
            result.reasons(),
            &[
                FilterReason::ReferenceAllele,
                FilterReason::TooFewReads,
                FilterReason::SingleRead,
                FilterReason::RemoteOnly,
            ]
        );
    }

    #[test]
    fn test_idempotence() {
        let mut obs = passing_observables();
        obs.read_pair_support = 0;
        obs.soft_clip_support = 1;
        let first = apply_assembly_filters(&obs, 3);
        let second = apply_assembly_filters(&obs, 3);
        assert_eq!(first.reasons(), second.reasons());
    }
}
