use std::fmt;

use crate::pos_range::PosRange;

/// A set of disjoint closed position ranges which can be efficiently queried
///
/// Ranges added to the set are merged with any ranges they intersect or adjoin, so the stored
/// ranges are always disjoint, non-adjacent and sorted.
///
#[derive(Clone, Default, Eq, PartialEq)]
pub struct PosRangeSet {
    ranges: Vec<PosRange>,
}

impl PosRangeSet {
    pub fn new() -> Self {
        Self { ranges: Vec::new() }
    }

    pub fn from_range(range: PosRange) -> Self {
        let mut x = Self::new();
        x.add_range(range);
        x
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn range_count(&self) -> usize {
        self.ranges.len()
    }

    pub fn ranges(&self) -> &[PosRange] {
        &self.ranges
    }

    /// Total number of positions covered by the set
    ///
    pub fn position_count(&self) -> i64 {
        self.ranges.iter().map(|r| r.size()).sum()
    }

    pub fn first_pos(&self) -> Option<i64> {
        self.ranges.first().map(|r| r.start)
    }

    /// Return true if pos intersects any range stored in this object
    ///
    pub fn intersect_pos(&self, pos: i64) -> bool {
        let probe = self.ranges.partition_point(|r| r.end < pos);
        probe < self.ranges.len() && self.ranges[probe].intersect_pos(pos)
    }

    /// Return true if the given range intersects any range stored in this object
    ///
    pub fn intersect_range(&self, range: &PosRange) -> bool {
        let probe = self.ranges.partition_point(|r| r.end < range.start);
        probe < self.ranges.len() && self.ranges[probe].intersect_range(range)
    }

    /// Add a range, merging it with any stored ranges it intersects or adjoins
    ///
    pub fn add_range(&mut self, range: PosRange) {
        assert!(
            !range.is_empty(),
            "Attempt to add empty range {range:?} to PosRangeSet"
        );

        // Find the span of stored ranges mergeable with the new range. Adjacency counts for
        // merging, so the probe window is widened by one position on each side.
        let lower = self.ranges.partition_point(|r| r.end < range.start - 1);
        let upper = self.ranges.partition_point(|r| r.start <= range.end + 1);

        if lower == upper {
            self.ranges.insert(lower, range);
            return;
        }

        let mut merged = range;
        for r in &self.ranges[lower..upper] {
            merged.merge(r);
        }
        self.ranges.splice(lower..upper, std::iter::once(merged));
    }

    /// Remove all positions in the given range from the set
    ///
    /// Stored ranges partially covered by the removed range are trimmed, so up to two partial
    /// ranges can survive at the edges of the removal.
    ///
    pub fn subtract_range(&mut self, range: &PosRange) {
        if range.is_empty() {
            return;
        }
        let lower = self.ranges.partition_point(|r| r.end < range.start);
        let upper = self.ranges.partition_point(|r| r.start <= range.end);
        if lower == upper {
            return;
        }

        let mut survivors = Vec::new();
        {
            let first = &self.ranges[lower];
            if first.start < range.start {
                survivors.push(PosRange::from_pair(first.start, range.start - 1));
            }
        }
        {
            let last = &self.ranges[upper - 1];
            if last.end > range.end {
                survivors.push(PosRange::from_pair(range.end + 1, last.end));
            }
        }
        self.ranges.splice(lower..upper, survivors);
    }

    /// Restrict the set to positions covered by the given range
    ///
    pub fn intersect_with_range(&mut self, range: &PosRange) {
        self.ranges.retain(|r| r.intersect_range(range));
        for r in self.ranges.iter_mut() {
            r.start = std::cmp::max(r.start, range.start);
            r.end = std::cmp::min(r.end, range.end);
        }
    }
}

impl fmt::Debug for PosRangeSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{{")?;
        for (i, r) in self.ranges.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{r:?}")?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_range_merging() {
        let mut rs = PosRangeSet::new();
        rs.add_range(PosRange::from_pair(10, 20));
        rs.add_range(PosRange::from_pair(30, 40));
        assert_eq!(rs.range_count(), 2);

        // Adjacent ranges merge
        rs.add_range(PosRange::from_pair(21, 25));
        assert_eq!(rs.range_count(), 2);
        assert_eq!(rs.ranges()[0], PosRange::from_pair(10, 25));

        // Bridging range collapses everything
        rs.add_range(PosRange::from_pair(26, 29));
        assert_eq!(rs.range_count(), 1);
        assert_eq!(rs.ranges()[0], PosRange::from_pair(10, 40));
    }

    #[test]
    fn test_intersect_pos() {
        let mut rs = PosRangeSet::new();
        rs.add_range(PosRange::from_pair(10, 20));
        rs.add_range(PosRange::from_pair(30, 40));

        assert!(rs.intersect_pos(10));
        assert!(rs.intersect_pos(20));
        assert!(!rs.intersect_pos(25));
        assert!(rs.intersect_pos(30));
        assert!(!rs.intersect_pos(41));
    }

    #[test]
    fn test_subtract_range() {
        let mut rs = PosRangeSet::new();
        rs.add_range(PosRange::from_pair(10, 40));

        // Interior removal splits the range
        rs.subtract_range(&PosRange::from_pair(20, 30));
        assert_eq!(rs.ranges(), &[PosRange::from_pair(10, 19), PosRange::from_pair(31, 40)]);

        // Edge removal trims
        rs.subtract_range(&PosRange::from_pair(0, 12));
        assert_eq!(rs.ranges()[0], PosRange::from_pair(13, 19));

        // Full removal empties
        rs.subtract_range(&PosRange::from_pair(0, 100));
        assert!(rs.is_empty());
    }

    #[test]
    fn test_intersect_with_range() {
        let mut rs = PosRangeSet::new();
        rs.add_range(PosRange::from_pair(10, 20));
        rs.add_range(PosRange::from_pair(30, 40));

        rs.intersect_with_range(&PosRange::from_pair(15, 35));
        assert_eq!(rs.ranges(), &[PosRange::from_pair(15, 20), PosRange::from_pair(30, 35)]);
    }
}
