//! Bucket - the leaf of the energy index
//!
//! Holds the readings of one 6-hour window, kept sorted by linear time and
//! free of duplicates after every insertion.

use crate::storage::Measurement;

/// Sorted, duplicate-free readings sharing a 6-hour window
#[derive(Debug, Clone, Default)]
pub struct Bucket {
    measurements: Vec<Measurement>,
}

impl Bucket {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a reading at its sorted position
    ///
    /// Returns `false` and drops the reading if one with the same linear
    /// time is already present.
    pub fn add(&mut self, measurement: Measurement) -> bool {
        match self.measurements.binary_search(&measurement) {
            Ok(_) => false,
            Err(pos) => {
                self.measurements.insert(pos, measurement);
                true
            }
        }
    }

    pub fn measurements(&self) -> &[Measurement] {
        &self.measurements
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Measurement> {
        self.measurements.iter()
    }

    pub fn len(&self) -> usize {
        self.measurements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.measurements.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Timestamp;

    fn reading(minute: u32, production: f64) -> Measurement {
        Measurement::at(Timestamp::new(2021, 3, 14, 7, minute, 0)).production(production)
    }

    #[test]
    fn test_add_keeps_order() {
        let mut bucket = Bucket::new();

        for minute in [45, 0, 30, 15, 50, 5] {
            assert!(bucket.add(reading(minute, 1.0)));
        }

        let minutes: Vec<u32> = bucket.iter().map(|m| m.timestamp.minute).collect();
        assert_eq!(minutes, vec![0, 5, 15, 30, 45, 50]);
        assert!(bucket
            .measurements()
            .windows(2)
            .all(|w| w[0].linear_time() < w[1].linear_time()));
    }

    #[test]
    fn test_duplicate_rejected_without_mutation() {
        let mut bucket = Bucket::new();
        assert!(bucket.add(reading(15, 10.0)));
        assert!(!bucket.add(reading(15, 99.0)));

        assert_eq!(bucket.len(), 1);
        assert_eq!(bucket.measurements()[0].production, 10.0);
    }

    #[test]
    fn test_empty_bucket() {
        let bucket = Bucket::new();
        assert!(bucket.is_empty());
        assert_eq!(bucket.iter().count(), 0);
    }
}
