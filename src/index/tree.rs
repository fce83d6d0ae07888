//! Energy Index - year → month → day → bucket hierarchy
//!
//! Every level is an ordered map owning the next level, so walking the maps
//! in key order visits readings chronologically. Nodes are created lazily on
//! the first insert that needs them and are only released by [`EnergyIndex::clear`].
//!
//! ```text
//! EnergyIndex
//!   └─ 2021 (YearNode)
//!        └─ 2 (MonthNode)
//!             └─ 1 (DayNode)
//!                  ├─ 0: Bucket [00:00, 00:15, ...]   hours 0-5
//!                  └─ 3: Bucket [18:00, ...]          hours 18-23
//! ```

use crate::index::bucket::Bucket;
use crate::index::cursor::Cursor;
use crate::storage::{Measurement, Timestamp};
use serde::Serialize;
use std::collections::BTreeMap;

/// Buckets of one day, keyed by bucket index (hour / 6)
#[derive(Debug, Default)]
pub struct DayNode {
    pub(crate) buckets: BTreeMap<u32, Bucket>,
}

impl DayNode {
    pub fn buckets(&self) -> &BTreeMap<u32, Bucket> {
        &self.buckets
    }
}

/// Days of one month, keyed by day of month
#[derive(Debug, Default)]
pub struct MonthNode {
    pub(crate) days: BTreeMap<u32, DayNode>,
}

impl MonthNode {
    pub fn days(&self) -> &BTreeMap<u32, DayNode> {
        &self.days
    }
}

/// Months of one year, keyed by month number
#[derive(Debug, Default)]
pub struct YearNode {
    pub(crate) months: BTreeMap<u32, MonthNode>,
}

impl YearNode {
    pub fn months(&self) -> &BTreeMap<u32, MonthNode> {
        &self.months
    }
}

/// Time-hierarchical store of energy readings
///
/// `insert` is the only write path besides `clear`. Readers take a
/// [`Cursor`], which borrows the index, so the borrow checker rules out
/// mutation while a traversal is alive.
#[derive(Debug, Default)]
pub struct EnergyIndex {
    years: BTreeMap<i32, YearNode>,
    len: usize,
}

/// Shape of the index, for status reporting
#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexStats {
    pub measurements: usize,
    pub years: usize,
    pub months: usize,
    pub days: usize,
    pub buckets: usize,
    pub first: Option<Timestamp>,
    pub last: Option<Timestamp>,
}

impl std::fmt::Display for IndexStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "measurements={}, years={}, months={}, days={}, buckets={}",
            self.measurements, self.years, self.months, self.days, self.buckets
        )
    }
}

impl EnergyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a reading, creating any missing node on its path
    ///
    /// Returns `false` if a reading with the same linear time already sits
    /// in the target bucket; the new reading is dropped. Calendar fields are
    /// not validated.
    pub fn insert(&mut self, measurement: Measurement) -> bool {
        let ts = measurement.timestamp;

        let bucket = self
            .years
            .entry(ts.year)
            .or_default()
            .months
            .entry(ts.month)
            .or_default()
            .days
            .entry(ts.day)
            .or_default()
            .buckets
            .entry(ts.bucket())
            .or_default();

        let inserted = bucket.add(measurement);
        if inserted {
            self.len += 1;
        }
        inserted
    }

    /// Drop every node and reading
    pub fn clear(&mut self) {
        self.years.clear();
        self.len = 0;
    }

    /// Number of readings stored
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Cursor at the earliest reading, or at the end if the index is empty
    pub fn begin(&self) -> Cursor<'_> {
        Cursor::begin(&self.years)
    }

    /// Cursor in the end state
    pub fn end(&self) -> Cursor<'_> {
        Cursor::end()
    }

    /// Readings in chronological order
    pub fn iter(&self) -> Cursor<'_> {
        self.begin()
    }

    pub fn years(&self) -> &BTreeMap<i32, YearNode> {
        &self.years
    }

    pub fn stats(&self) -> IndexStats {
        let mut stats = IndexStats {
            measurements: self.len,
            years: self.years.len(),
            ..IndexStats::default()
        };

        for year in self.years.values() {
            stats.months += year.months.len();
            for month in year.months.values() {
                stats.days += month.days.len();
                for day in month.days.values() {
                    stats.buckets += day.buckets.len();
                }
            }
        }

        stats.first = self.begin().get().map(|m| m.timestamp);
        stats.last = self.iter().last().map(|m| m.timestamp);
        stats
    }
}

impl<'a> IntoIterator for &'a EnergyIndex {
    type Item = &'a Measurement;
    type IntoIter = Cursor<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.begin()
    }
}

impl Extend<Measurement> for EnergyIndex {
    fn extend<T: IntoIterator<Item = Measurement>>(&mut self, iter: T) {
        for measurement in iter {
            self.insert(measurement);
        }
    }
}

impl FromIterator<Measurement> for EnergyIndex {
    fn from_iter<T: IntoIterator<Item = Measurement>>(iter: T) -> Self {
        let mut index = Self::new();
        index.extend(iter);
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> Measurement {
        Measurement::at(Timestamp::new(year, month, day, hour, minute, 0))
    }

    #[test]
    fn test_duplicate_prevention() {
        let mut index = EnergyIndex::new();
        let ts = Timestamp::new(2021, 6, 10, 12, 0, 0);

        assert!(index.insert(Measurement::at(ts).production(1.0)));
        assert!(!index.insert(Measurement::at(ts).production(2.0)));
        assert_eq!(index.len(), 1);
        assert_eq!(index.begin().get().unwrap().production, 1.0);
    }

    #[test]
    fn test_lazy_node_creation() {
        let mut index = EnergyIndex::new();
        assert!(index.years().is_empty());

        index.insert(reading(2021, 2, 1, 3, 0));
        index.insert(reading(2021, 2, 1, 19, 0));

        let day = &index.years()[&2021].months()[&2].days()[&1];
        let keys: Vec<u32> = day.buckets().keys().copied().collect();
        assert_eq!(keys, vec![0, 3]);
    }

    #[test]
    fn test_clear() {
        let mut index = EnergyIndex::new();
        index.insert(Measurement::default());
        index.insert(reading(2021, 1, 1, 0, 0));
        assert!(index.begin() != index.end());

        index.clear();

        assert!(index.is_empty());
        assert!(!(index.begin() != index.end()));
        assert!(index.years().is_empty());
    }

    #[test]
    fn test_unset_timestamp_lands_in_1900() {
        let mut index = EnergyIndex::new();
        assert!(index.insert(Measurement::default()));

        let year = &index.years()[&1900];
        assert!(year.months()[&1].days().contains_key(&0));
    }

    #[test]
    fn test_iteration_is_chronological() {
        let inputs = [
            reading(2022, 1, 1, 0, 0),
            reading(2021, 12, 31, 23, 45),
            reading(2021, 2, 1, 0, 15),
            reading(2021, 2, 1, 0, 0),
            reading(2021, 2, 1, 18, 0),
            reading(2021, 2, 1, 6, 0),
            reading(2020, 7, 4, 12, 30),
        ];

        let index: EnergyIndex = inputs.iter().copied().collect();
        assert_eq!(index.len(), inputs.len());

        let times: Vec<i64> = index.iter().map(Measurement::linear_time).collect();
        let mut expected: Vec<i64> = inputs.iter().map(Measurement::linear_time).collect();
        expected.sort_unstable();
        assert_eq!(times, expected);
    }

    #[test]
    fn test_stats() {
        let mut index = EnergyIndex::new();
        assert!(index.stats().first.is_none());

        index.insert(reading(2021, 2, 1, 0, 0));
        index.insert(reading(2021, 2, 1, 7, 0));
        index.insert(reading(2021, 3, 5, 7, 0));
        index.insert(reading(2022, 1, 1, 0, 0));

        let stats = index.stats();
        assert_eq!(stats.measurements, 4);
        assert_eq!(stats.years, 2);
        assert_eq!(stats.months, 3);
        assert_eq!(stats.days, 3);
        assert_eq!(stats.buckets, 4);
        assert_eq!(stats.first, Some(Timestamp::new(2021, 2, 1, 0, 0, 0)));
        assert_eq!(stats.last, Some(Timestamp::new(2022, 1, 1, 0, 0, 0)));
    }
}
