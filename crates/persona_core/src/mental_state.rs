//! Bounded psychological attribute vector of a persona.
//!
//! Every attribute is an integer clamped to `[STATE_MIN, STATE_MAX]`. The
//! attribute set is fixed when the persona is loaded; updates that name an
//! attribute the persona does not have are skipped.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const STATE_MIN: i32 = 0;
pub const STATE_MAX: i32 = 10;

/// Attributes every persona starts with, all at zero.
pub const DEFAULT_ATTRIBUTES: [&str; 6] = [
    "confidence",
    "guilt",
    "calm",
    "anxiety",
    "stability",
    "neuroticism",
];

/// Attribute name → signed delta, as authored in trigger `changes`.
pub type Changes = BTreeMap<String, i32>;

#[inline]
fn clamp_value(v: i64) -> i32 {
    v.clamp(STATE_MIN as i64, STATE_MAX as i64) as i32
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MentalState {
    values: BTreeMap<String, i32>,
}

impl Default for MentalState {
    fn default() -> Self {
        Self::with_attributes(DEFAULT_ATTRIBUTES)
    }
}

impl MentalState {
    /// Create a state with the given attributes, all at `STATE_MIN`.
    pub fn with_attributes<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            values: names.into_iter().map(|n| (n.into(), STATE_MIN)).collect(),
        }
    }

    /// Set an attribute outright, adding it if missing. The value is clamped.
    pub fn set(&mut self, name: impl Into<String>, value: i32) {
        self.values.insert(name.into(), clamp_value(value as i64));
    }

    pub fn get(&self, name: &str) -> Option<i32> {
        self.values.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i32)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn as_map(&self) -> &BTreeMap<String, i32> {
        &self.values
    }

    /// Apply `changes` in place and return the full resulting state.
    ///
    /// Each known attribute becomes `clamp(current + delta)`. Unknown names
    /// are skipped. An empty map is a no-op.
    pub fn update(&mut self, changes: &Changes) -> MentalState {
        for (name, delta) in changes {
            match self.values.get_mut(name) {
                Some(value) => {
                    *value = clamp_value(*value as i64 + *delta as i64);
                }
                None => {
                    tracing::debug!("Skipping unknown mental state attribute '{}'", name);
                }
            }
        }
        self.clone()
    }
}
