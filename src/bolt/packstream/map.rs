//! Insertion-ordered PackStream map.
//!
//! Keys are unique and looked up through a hash index. Entries encode in
//! the order they were first inserted, so the same map always produces the
//! same bytes. Equality ignores order.

use std::collections::HashMap;
use std::fmt;

use serde::ser::{Serialize, SerializeMap, Serializer};

use super::types::PackStreamValue;

/// Ordered map of string keys to PackStream values.
#[derive(Clone, Default)]
pub struct PackStreamMap {
    entries: Vec<(String, PackStreamValue)>,
    // key -> position in `entries`
    index: HashMap<String, usize>,
}

impl PackStreamMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty map with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
        }
    }

    /// Insert a value, replacing (in place) any previous value for the key.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<PackStreamValue>,
    ) -> Option<PackStreamValue> {
        let key = key.into();
        let value = value.into();
        match self.index.get(&key) {
            Some(&i) => Some(std::mem::replace(&mut self.entries[i].1, value)),
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Get the value for a key.
    pub fn get(&self, key: &str) -> Option<&PackStreamValue> {
        self.index.get(key).map(|&i| &self.entries[i].1)
    }

    /// Remove a key, returning its value. Later entries keep their order.
    pub fn remove(&mut self, key: &str) -> Option<PackStreamValue> {
        let removed = self.index.remove(key)?;
        for slot in self.index.values_mut() {
            if *slot > removed {
                *slot -= 1;
            }
        }
        Some(self.entries.remove(removed).1)
    }

    /// Check if a key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &PackStreamValue)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    /// Iterate keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.iter().map(|(k, _)| k)
    }

    /// Iterate values in insertion order.
    pub fn values(&self) -> impl Iterator<Item = &PackStreamValue> {
        self.entries.iter().map(|(_, v)| v)
    }
}

impl PartialEq for PackStreamMap {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

impl fmt::Debug for PackStreamMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: Into<String>, V: Into<PackStreamValue>> FromIterator<(K, V)> for PackStreamMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

impl<K: Into<String>, V: Into<PackStreamValue>> Extend<(K, V)> for PackStreamMap {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl IntoIterator for PackStreamMap {
    type Item = (String, PackStreamValue);
    type IntoIter = std::vec::IntoIter<(String, PackStreamValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl From<HashMap<String, PackStreamValue>> for PackStreamMap {
    fn from(map: HashMap<String, PackStreamValue>) -> Self {
        map.into_iter().collect()
    }
}

impl From<PackStreamMap> for HashMap<String, PackStreamValue> {
    fn from(map: PackStreamMap) -> Self {
        map.into_iter().collect()
    }
}

impl Serialize for PackStreamMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut out = serializer.serialize_map(Some(self.len()))?;
        for (k, v) in self.iter() {
            out.serialize_entry(k, v)?;
        }
        out.end()
    }
}
