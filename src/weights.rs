//! Endpoint weights
//!
//! The weight table is the fixed set of load-generating endpoints. Each entry
//! maps a name (served at `/<name>`) to a signed weight that decides how a hit
//! moves the shared load gauge:
//!
//! - `0` resets the gauge to exactly zero
//! - a positive weight is added to the gauge
//! - a negative weight leaves the gauge alone (used by the help page at `/`)

use crate::error::{AppError, AppResult};
use std::collections::BTreeMap;
use std::fmt;

/// Paths served by the server itself; table entries may not shadow them.
const RESERVED_NAMES: &[&str] = &["metrics", "ready"];

const HELP_HEADER: &str = "Following endpoints are available (zero will reset the counter):\n\
endpoint\tweight\n";

/// What a weight does to the load gauge
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GaugeEffect {
    /// Set the gauge to 0
    Reset,
    /// Add the amount to the gauge
    Add(f64),
    /// Leave the gauge untouched
    Unchanged,
}

/// Signed load weight attached to an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Weight(i64);

impl Weight {
    /// Sentinel for endpoints that are counted but never move the gauge.
    pub const NO_OP: Weight = Weight(-1);

    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    /// Map the three-way weight overload onto a gauge operation.
    pub fn effect(&self) -> GaugeEffect {
        match self.0 {
            0 => GaugeEffect::Reset,
            w if w > 0 => GaugeEffect::Add(w as f64),
            _ => GaugeEffect::Unchanged,
        }
    }
}

impl fmt::Display for Weight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validated endpoint name
///
/// Surrounding whitespace is stripped on construction, so names padded for
/// display alignment (`"zero\t"`) still produce clean paths.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EndpointName(String);

impl EndpointName {
    /// Create an endpoint name
    ///
    /// # Errors
    /// Returns an error if the trimmed name is empty, contains `/` or
    /// whitespace, or is one of the reserved names (`metrics`, `ready`).
    pub fn new(name: &str) -> AppResult<Self> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(AppError::WeightTable(
                "endpoint name must not be empty".to_string(),
            ));
        }
        if trimmed.contains('/') || trimmed.chars().any(char::is_whitespace) {
            return Err(AppError::WeightTable(format!(
                "endpoint name '{}' must not contain '/' or whitespace",
                trimmed
            )));
        }
        if RESERVED_NAMES.contains(&trimmed) {
            return Err(AppError::WeightTable(format!(
                "endpoint name '{}' is reserved",
                trimmed
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// URL path served for this endpoint (`/<name>`)
    pub fn path(&self) -> String {
        format!("/{}", self.0)
    }
}

impl fmt::Display for EndpointName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Immutable mapping from endpoint name to weight
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightTable {
    entries: BTreeMap<EndpointName, Weight>,
}

impl WeightTable {
    /// Build a table from (name, weight) pairs
    ///
    /// # Errors
    /// Returns an error on an invalid name or when two entries share a name
    /// after trimming.
    pub fn new<'a, I>(pairs: I) -> AppResult<Self>
    where
        I: IntoIterator<Item = (&'a str, i64)>,
    {
        let mut entries = BTreeMap::new();
        for (name, weight) in pairs {
            let name = EndpointName::new(name)?;
            if entries.contains_key(&name) {
                return Err(AppError::WeightTable(format!(
                    "duplicate endpoint '{}'",
                    name
                )));
            }
            entries.insert(name, Weight::new(weight));
        }
        Ok(Self { entries })
    }

    /// The endpoints this server ships with
    pub fn builtin() -> Self {
        let entries = [
            ("zero", 0),
            ("one", 1),
            ("ten", 10),
            ("hundred", 100),
            ("thousand", 1_000),
            ("million", 1_000_000),
            ("billion", 1_000_000_000),
        ]
        .into_iter()
        .map(|(name, weight)| (EndpointName(name.to_string()), Weight::new(weight)))
        .collect();

        Self { entries }
    }

    pub fn weight_of(&self, name: &str) -> Option<Weight> {
        self.entries
            .iter()
            .find(|(n, _)| n.as_str() == name.trim())
            .map(|(_, w)| *w)
    }

    /// Iterate over all entries in name order
    pub fn entries(&self) -> impl Iterator<Item = (&EndpointName, Weight)> {
        self.entries.iter().map(|(n, w)| (n, *w))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render the help page listing every endpoint by ascending weight
    ///
    /// Ties are broken by name so the output never depends on map order.
    /// The last line always advertises `/metrics` with weight 0.
    pub fn help_text(&self) -> String {
        let mut sorted: Vec<_> = self.entries().collect();
        sorted.sort_by(|(a_name, a_weight), (b_name, b_weight)| {
            a_weight.cmp(b_weight).then_with(|| a_name.cmp(b_name))
        });

        let mut help = String::from(HELP_HEADER);
        for (name, weight) in sorted {
            help.push_str(&format!("{}\t{}\n", name.path(), weight));
        }
        help.push_str("/metrics\t0\n");
        help
    }
}
