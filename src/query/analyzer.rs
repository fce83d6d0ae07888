//! Analyzer
//!
//! Range-bounded aggregates over an [`EnergyIndex`]. Every operation is a
//! full chronological scan through a [`Cursor`](crate::index::Cursor),
//! filtered by an inclusive [`TimeRange`] and reduced over one [`Field`].
//!
//! # Execution Pipeline
//!
//! ```text
//! begin() → filter by range → select(field) → reduce (sum / count / match)
//! ```

use crate::index::EnergyIndex;
use crate::query::selector::{select, Field};
use crate::storage::{Measurement, TimeRange, Timestamp};
use serde::Serialize;

/// A reading whose selected value fell within the search tolerance
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SearchHit {
    pub value: f64,
    pub timestamp: Timestamp,
}

impl std::fmt::Display for SearchHit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Found {:.2} on {:02}.{:02}",
            self.value, self.timestamp.day, self.timestamp.month
        )
    }
}

/// Sums of one field over two periods
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Comparison {
    pub field: Field,
    pub first: f64,
    pub second: f64,
    /// `first - second`
    pub difference: f64,
}

impl std::fmt::Display for Comparison {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Period 1 {}: {:.2}", self.field, self.first)?;
        writeln!(f, "Period 2 {}: {:.2}", self.field, self.second)?;
        write!(f, "Difference: {:.2}", self.difference)
    }
}

/// Read-only query front end over an index
///
/// Holds a shared borrow, so any number of analyzers may query the same
/// index while nothing can insert into it.
#[derive(Debug, Clone, Copy)]
pub struct Analyzer<'a> {
    index: &'a EnergyIndex,
}

impl<'a> Analyzer<'a> {
    pub fn new(index: &'a EnergyIndex) -> Self {
        Self { index }
    }

    /// Readings inside the range, oldest first
    fn in_range(&self, range: TimeRange) -> impl Iterator<Item = &'a Measurement> + 'a {
        self.index
            .iter()
            .filter(move |m| range.contains_measurement(m))
    }

    /// Sum of the field over the range; 0.0 when nothing matches
    pub fn sum(&self, range: TimeRange, field: Field) -> f64 {
        self.in_range(range).map(|m| select(field, m)).sum()
    }

    /// Number of readings inside the range
    pub fn count(&self, range: TimeRange) -> usize {
        self.in_range(range).count()
    }

    /// Mean of the field over the range; exactly 0.0 when nothing matches
    pub fn average(&self, range: TimeRange, field: Field) -> f64 {
        let (sum, count) = self
            .in_range(range)
            .fold((0.0, 0usize), |(sum, count), m| (sum + select(field, m), count + 1));

        if count > 0 {
            sum / count as f64
        } else {
            0.0
        }
    }

    /// Report every in-range reading whose field lies in
    /// `[target - tolerance, target + tolerance]`
    ///
    /// Hits go to `report` in chronological order; the return value is the
    /// number of hits. A negative tolerance matches nothing.
    pub fn search<F>(
        &self,
        field: Field,
        target: f64,
        tolerance: f64,
        range: TimeRange,
        mut report: F,
    ) -> usize
    where
        F: FnMut(&SearchHit),
    {
        if tolerance < 0.0 {
            return 0;
        }

        let low = target - tolerance;
        let high = target + tolerance;
        let mut hits = 0;

        for m in self.in_range(range) {
            let value = select(field, m);
            if value >= low && value <= high {
                hits += 1;
                report(&SearchHit {
                    value,
                    timestamp: m.timestamp,
                });
            }
        }

        hits
    }

    /// Sum the field over two independent periods
    ///
    /// The periods may overlap; neither is validated against the other.
    pub fn compare(&self, first: TimeRange, second: TimeRange, field: Field) -> Comparison {
        let first_sum = self.sum(first, field);
        let second_sum = self.sum(second, field);

        Comparison {
            field,
            first: first_sum,
            second: second_sum,
            difference: first_sum - second_sum,
        }
    }
}
