//! Scalar values and the key-ordered parameter mapping that forms an input deck.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// One input-deck value.
///
/// Logical flags are carried as the strings `"T"` / `"F"`, the way the solver
/// reads them from its namelist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Int(i64),
    Float(f64),
    Str(String),
}

impl Scalar {
    pub fn is_finite(&self) -> bool {
        match self {
            Scalar::Float(value) => value.is_finite(),
            Scalar::Int(_) | Scalar::Str(_) => true,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Int(value) => write!(f, "{value}"),
            Scalar::Float(value) => write!(f, "{value:?}"),
            Scalar::Str(value) => f.write_str(value),
        }
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Scalar::Int(value.into())
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Str(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Str(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Str(if value { "T" } else { "F" }.to_string())
    }
}

/// Case-sensitive key → scalar mapping, iterated in key order.
///
/// Merging follows a single rule: a later source always wins on collision.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSet(BTreeMap<String, Scalar>);

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Scalar> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Scalar>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Scalar)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Overlay `overrides` onto `self`; keys present in both take the override.
    pub fn apply(&mut self, overrides: &ParameterSet) {
        for (key, value) in &overrides.0 {
            self.0.insert(key.clone(), value.clone());
        }
    }

    /// Owned variant of [`apply`](Self::apply) for fold-style composition.
    pub fn merged(mut self, overrides: &ParameterSet) -> Self {
        self.apply(overrides);
        self
    }
}

impl<K, V> FromIterator<(K, V)> for ParameterSet
where
    K: Into<String>,
    V: Into<Scalar>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = ParameterSet::new();
        for (key, value) in iter {
            set.insert(key, value);
        }
        set
    }
}

/// Build a [`ParameterSet`] from `key => value` pairs.
#[macro_export]
macro_rules! params {
    () => {
        $crate::core::params::ParameterSet::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut set = $crate::core::params::ParameterSet::new();
        $(set.insert($key, $value);)+
        set
    }};
}
