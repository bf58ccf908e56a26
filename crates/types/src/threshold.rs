//! Threshold mappings: pick a style value from a numeric measurement.

use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Errors from building a threshold mapping
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ThresholdError {
    #[error("threshold boundary '{0}' is not a number")]
    NotANumber(String),
    #[error("threshold boundary {0} is not finite")]
    NotFinite(f64),
    #[error("threshold boundary {0} appears more than once")]
    Duplicate(f64),
}

/// Value of the greatest boundary that is `<= value`.
///
/// `items` must be sorted ascending by boundary; iteration stops at the
/// first boundary above `value`. Returns `None` when `value` is below every
/// boundary.
pub fn resolve<T>(items: &[(f64, T)], value: f64) -> Option<&T> {
    let mut selected = None;

    for (boundary, item) in items {
        if value >= *boundary {
            selected = Some(item);
        } else {
            break;
        }
    }

    selected
}

/// Validated, ascending boundary -> value table
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdMap<T> {
    entries: Vec<(f64, T)>,
}

impl<T> ThresholdMap<T> {
    /// Build a mapping from pairs in any order. Boundaries must be finite
    /// and distinct.
    pub fn new(mut entries: Vec<(f64, T)>) -> Result<Self, ThresholdError> {
        if let Some((boundary, _)) = entries.iter().find(|(b, _)| !b.is_finite()) {
            return Err(ThresholdError::NotFinite(*boundary));
        }

        entries.sort_by(|a, b| a.0.total_cmp(&b.0));

        if let Some(pair) = entries.windows(2).find(|w| w[0].0 == w[1].0) {
            return Err(ThresholdError::Duplicate(pair[0].0));
        }

        Ok(Self { entries })
    }

    pub fn empty() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn resolve(&self, value: f64) -> Option<&T> {
        resolve(&self.entries, value)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[(f64, T)] {
        &self.entries
    }
}

impl<T> ThresholdMap<Option<T>> {
    /// Resolve a mapping whose values may themselves be "no style"
    pub fn resolve_flat(&self, value: f64) -> Option<&T> {
        self.resolve(value).and_then(Option::as_ref)
    }
}

impl<T> Default for ThresholdMap<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: Serialize> Serialize for ThresholdMap<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (boundary, value) in &self.entries {
            map.serialize_entry(&boundary.to_string(), value)?;
        }
        map.end()
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for ThresholdMap<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = HashMap::<String, T>::deserialize(deserializer)?;

        let mut entries = Vec::with_capacity(raw.len());
        for (key, value) in raw {
            let boundary = key
                .trim()
                .parse::<f64>()
                .map_err(|_| de::Error::custom(ThresholdError::NotANumber(key.clone())))?;
            entries.push((boundary, value));
        }

        ThresholdMap::new(entries).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiers() -> ThresholdMap<&'static str> {
        ThresholdMap::new(vec![(75.0, "high"), (0.0, "low"), (50.0, "mid")]).unwrap()
    }

    #[test]
    fn test_greatest_boundary_at_or_below() {
        let map = tiers();
        assert_eq!(map.resolve(-0.5), None);
        assert_eq!(map.resolve(0.0), Some(&"low"));
        assert_eq!(map.resolve(49.9), Some(&"low"));
        assert_eq!(map.resolve(50.0), Some(&"mid"));
        assert_eq!(map.resolve(1000.0), Some(&"high"));
    }

    #[test]
    fn test_resolve_is_monotonic() {
        let map = tiers();
        let rank = |v: f64| match map.resolve(v) {
            None => 0,
            Some(&"low") => 1,
            Some(&"mid") => 2,
            Some(_) => 3,
        };

        let mut previous = rank(-10.0);
        let mut v = -10.0;
        while v < 120.0 {
            let current = rank(v);
            assert!(current >= previous, "tier dropped at {}", v);
            previous = current;
            v += 0.25;
        }
    }

    #[test]
    fn test_free_function_stops_at_first_larger_boundary() {
        let items = [(1.0, 'a'), (10.0, 'b'), (5.0, 'c')];
        // Unsorted input is a caller error; iteration halts at 10.0.
        assert_eq!(resolve(&items, 7.0), Some(&'a'));
        assert_eq!(resolve::<char>(&[], 7.0), None);
    }

    #[test]
    fn test_rejects_malformed_mappings() {
        assert_eq!(
            ThresholdMap::new(vec![(1.0, 'a'), (1.0, 'b')]).unwrap_err(),
            ThresholdError::Duplicate(1.0)
        );
        assert!(matches!(
            ThresholdMap::new(vec![(f64::NAN, 'a')]),
            Err(ThresholdError::NotFinite(_))
        ));
        assert!(serde_json::from_str::<ThresholdMap<String>>(r#"{"high": "x"}"#).is_err());
    }

    #[test]
    fn test_json_keys_sort_numerically() {
        let map: ThresholdMap<Option<String>> =
            serde_json::from_str(r#"{"100": "warn", "20": null, "5": "ok"}"#).unwrap();

        let boundaries: Vec<f64> = map.entries().iter().map(|(b, _)| *b).collect();
        assert_eq!(boundaries, vec![5.0, 20.0, 100.0]);
        assert_eq!(map.resolve_flat(10.0).map(String::as_str), Some("ok"));
        assert_eq!(map.resolve_flat(50.0), None);
        assert_eq!(map.resolve_flat(150.0).map(String::as_str), Some("warn"));

        let json = serde_json::to_value(&map).unwrap();
        assert_eq!(json["100"], "warn");
    }
}
