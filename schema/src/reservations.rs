use serde::{Serialize, Serializer};
use std::fmt;

/// An inclusive range of field ids, `[low, high]`. A single id is a range
/// with `low == high`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdRange {
    pub low:  i64,
    pub high: i64,
}

impl IdRange {
    pub fn new(low: i64, high: i64) -> Self {
        IdRange { low, high }
    }

    pub fn single(id: i64) -> Self {
        IdRange { low: id, high: id }
    }

    pub fn contains(&self, id: i64) -> bool {
        self.low <= id && id <= self.high
    }

    /// The ids both ranges cover, if any.
    pub fn intersection(&self, other: IdRange) -> Option<IdRange> {
        let low = self.low.max(other.low);
        let high = self.high.min(other.high);
        (low <= high).then_some(IdRange { low, high })
    }

    /// Number of ids in the range.
    pub fn width(&self) -> u64 {
        self.high.abs_diff(self.low).saturating_add(1)
    }
}

impl fmt::Display for IdRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.low == self.high {
            write!(f, "{}", self.low)
        } else {
            write!(f, "[{}, {}]", self.low, self.high)
        }
    }
}

/// Serialized as `[low, high]`.
impl Serialize for IdRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (self.low, self.high).serialize(serializer)
    }
}

/// A set of reserved ids kept as sorted, disjoint, non-adjacent ranges.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Reservations {
    ranges: Vec<IdRange>,
}

impl Reservations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ranges(&self) -> &[IdRange] {
        &self.ranges
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Number of reserved ids, saturating at `u64::MAX`.
    pub fn len(&self) -> u64 {
        self.ranges
            .iter()
            .fold(0u64, |total, range| total.saturating_add(range.width()))
    }

    pub fn contains(&self, id: i64) -> bool {
        let index = self.ranges.partition_point(|range| range.high < id);
        self.ranges.get(index).map_or(false, |range| range.contains(id))
    }

    /// The parts of `range` that are already reserved, ascending.
    pub fn overlaps(&self, range: IdRange) -> Vec<IdRange> {
        let start = self.ranges.partition_point(|existing| existing.high < range.low);
        self.ranges[start..]
            .iter()
            .take_while(|existing| existing.low <= range.high)
            .filter_map(|existing| existing.intersection(range))
            .collect()
    }

    /// Adds `range`, merging it with any range it overlaps or touches.
    pub fn insert(&mut self, range: IdRange) {
        let start = self
            .ranges
            .partition_point(|existing| existing.high.saturating_add(1) < range.low);
        let mut merged = range;
        let mut end = start;
        while let Some(existing) = self.ranges.get(end) {
            if existing.low > merged.high.saturating_add(1) {
                break;
            }
            merged.low = merged.low.min(existing.low);
            merged.high = merged.high.max(existing.high);
            end += 1;
        }
        self.ranges.splice(start..end, [merged]);
    }
}

impl FromIterator<IdRange> for Reservations {
    fn from_iter<I: IntoIterator<Item = IdRange>>(iter: I) -> Self {
        let mut reservations = Reservations::new();
        for range in iter {
            reservations.insert(range);
        }
        reservations
    }
}
