//! Sequential cursor over the energy index
//!
//! Flattens the four map levels into one chronological sequence. The cursor
//! keeps one position per level and, when the current bucket runs out,
//! carries upward until it finds the next non-empty bucket:
//!
//! ```text
//! next reading in bucket → next bucket in day → next day in month
//!   → next month in year → next year → end
//! ```
//!
//! Two cursors compare equal only when both are at the end. That is enough
//! for `while cursor != index.end()` scans and says nothing about position.

use crate::index::bucket::Bucket;
use crate::index::tree::{DayNode, MonthNode, YearNode};
use crate::storage::Measurement;
use std::collections::btree_map::Values;
use std::collections::BTreeMap;

/// Forward-only traversal handle borrowing an [`EnergyIndex`](crate::index::EnergyIndex)
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    years: Option<Values<'a, i32, YearNode>>,
    months: Option<Values<'a, u32, MonthNode>>,
    days: Option<Values<'a, u32, DayNode>>,
    buckets: Option<Values<'a, u32, Bucket>>,
    /// Readings of the current bucket; `None` once the cursor is at the end
    current: Option<&'a [Measurement]>,
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub(crate) fn begin(years: &'a BTreeMap<i32, YearNode>) -> Self {
        let mut cursor = Self {
            years: Some(years.values()),
            ..Self::end()
        };
        cursor.seek_next_bucket();
        cursor
    }

    pub(crate) fn end() -> Self {
        Self {
            years: None,
            months: None,
            days: None,
            buckets: None,
            current: None,
            pos: 0,
        }
    }

    pub fn is_end(&self) -> bool {
        self.current.is_none()
    }

    /// Reading under the cursor, `None` at the end
    pub fn get(&self) -> Option<&'a Measurement> {
        self.current.and_then(|readings| readings.get(self.pos))
    }

    /// Step to the next reading; a no-op at the end
    pub fn advance(&mut self) {
        let Some(readings) = self.current else {
            return;
        };

        self.pos += 1;
        if self.pos < readings.len() {
            return;
        }

        self.seek_next_bucket();
    }

    /// Move to the first reading of the next non-empty bucket, or to the end
    fn seek_next_bucket(&mut self) {
        loop {
            if let Some(bucket) = self.buckets.as_mut().and_then(Iterator::next) {
                if !bucket.is_empty() {
                    self.current = Some(bucket.measurements());
                    self.pos = 0;
                    return;
                }
                continue;
            }

            if let Some(day) = self.days.as_mut().and_then(Iterator::next) {
                self.buckets = Some(day.buckets.values());
                continue;
            }

            if let Some(month) = self.months.as_mut().and_then(Iterator::next) {
                self.days = Some(month.days.values());
                continue;
            }

            if let Some(year) = self.years.as_mut().and_then(Iterator::next) {
                self.months = Some(year.months.values());
                continue;
            }

            *self = Self::end();
            return;
        }
    }
}

impl PartialEq for Cursor<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.is_end() && other.is_end()
    }
}

impl<'a> Iterator for Cursor<'a> {
    type Item = &'a Measurement;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.get()?;
        self.advance();
        Some(current)
    }
}

impl std::iter::FusedIterator for Cursor<'_> {}
