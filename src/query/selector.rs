//! Field selection
//!
//! Picks which counter of a reading an aggregate works on.

use crate::storage::Measurement;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Counter of a [`Measurement`] to aggregate
///
/// `Zero` stands in for any selector that names no counter; it reads as
/// 0.0 for every record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Autoconsumption,
    Export,
    Import,
    Consumption,
    Production,
    Zero,
}

impl Field {
    /// The five real counters, in menu order
    pub fn all() -> &'static [Field] {
        &[
            Field::Autoconsumption,
            Field::Export,
            Field::Import,
            Field::Consumption,
            Field::Production,
        ]
    }

    /// Map a menu code (1-5) to a field; anything else selects `Zero`
    pub fn from_code(code: i64) -> Field {
        match code {
            1 => Field::Autoconsumption,
            2 => Field::Export,
            3 => Field::Import,
            4 => Field::Consumption,
            5 => Field::Production,
            _ => Field::Zero,
        }
    }

    /// Read this field from a reading
    pub fn select(&self, measurement: &Measurement) -> f64 {
        select(*self, measurement)
    }
}

/// Read one counter from a reading
pub fn select(field: Field, measurement: &Measurement) -> f64 {
    match field {
        Field::Autoconsumption => measurement.autoconsumption,
        Field::Export => measurement.export,
        Field::Import => measurement.import,
        Field::Consumption => measurement.consumption,
        Field::Production => measurement.production,
        Field::Zero => 0.0,
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Field::Autoconsumption => write!(f, "autoconsumption"),
            Field::Export => write!(f, "export"),
            Field::Import => write!(f, "import"),
            Field::Consumption => write!(f, "consumption"),
            Field::Production => write!(f, "production"),
            Field::Zero => write!(f, "zero"),
        }
    }
}

impl FromStr for Field {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" | "autoconsumption" => Ok(Field::Autoconsumption),
            "export" => Ok(Field::Export),
            "import" => Ok(Field::Import),
            "cons" | "consumption" => Ok(Field::Consumption),
            "prod" | "production" => Ok(Field::Production),
            other => Err(format!(
                "Unknown field: {}. Use: auto, export, import, consumption, production",
                other
            )),
        }
    }
}
