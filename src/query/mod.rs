//! Energy Query Engine
//!
//! Range-bounded aggregates over the energy index:
//!
//! - **Selector**: which counter of a reading to aggregate
//! - **Analyzer**: sum, average, count, tolerance search, period comparison
//!
//! All bounds are inclusive on both ends and compared in linear time.
//!
//! # Example
//!
//! ```rust
//! use energy_index::index::EnergyIndex;
//! use energy_index::query::{Analyzer, Field};
//! use energy_index::storage::{Measurement, TimeRange, Timestamp};
//!
//! let mut index = EnergyIndex::new();
//! index.insert(Measurement::at(Timestamp::new(2021, 2, 1, 0, 0, 0)).production(100.0));
//! index.insert(Measurement::at(Timestamp::new(2021, 2, 1, 0, 15, 0)).production(250.5));
//!
//! let range = TimeRange::between(
//!     &Timestamp::new(2021, 2, 1, 0, 0, 0),
//!     &Timestamp::new(2021, 2, 1, 0, 15, 0),
//! );
//! let analyzer = Analyzer::new(&index);
//! assert_eq!(analyzer.sum(range, Field::Production), 350.5);
//! assert_eq!(analyzer.average(range, Field::Production), 175.25);
//! ```

mod analyzer;
mod selector;

pub use analyzer::{Analyzer, Comparison, SearchHit};
pub use selector::{select, Field};
