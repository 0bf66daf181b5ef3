//! Raw query-string parameters.
//!
//! # Responsibilities
//! - Decode `application/x-www-form-urlencoded` pairs
//! - Group repeated keys into arrays
//! - Fold bracketed keys (`price[gte]=500`) into nested maps
//!
//! # Design Decisions
//! - One level of nesting only; deeper brackets stay part of the inner key
//! - `field[]=value` is an explicit array, same as repeating `field`
//! - Parsing never fails: malformed pairs are kept as literal keys

use std::collections::BTreeMap;

/// A single parameter value as it arrived on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Single(String),
    Multi(Vec<String>),
    Nested(BTreeMap<String, ParamValue>),
}

impl ParamValue {
    /// The last scalar carried by this value, if any.
    pub fn last(&self) -> Option<&str> {
        match self {
            ParamValue::Single(v) => Some(v),
            ParamValue::Multi(values) => values.last().map(String::as_str),
            ParamValue::Nested(_) => None,
        }
    }

    fn push(&mut self, value: String) {
        match self {
            ParamValue::Single(existing) => {
                let first = std::mem::take(existing);
                *self = ParamValue::Multi(vec![first, value]);
            }
            ParamValue::Multi(values) => values.push(value),
            // A scalar arriving after a nested map for the same key is dropped,
            // the nested form wins.
            ParamValue::Nested(_) => {}
        }
    }

    /// Keep only the last occurrence of every repeated scalar.
    pub(crate) fn collapse_to_last(&mut self) {
        match self {
            ParamValue::Single(_) => {}
            ParamValue::Multi(values) => {
                if let Some(last) = values.pop() {
                    *self = ParamValue::Single(last);
                }
            }
            ParamValue::Nested(inner) => inner.values_mut().for_each(ParamValue::collapse_to_last),
        }
    }

    fn append_pairs(&self, key: &str, out: &mut Vec<(String, String)>) {
        match self {
            ParamValue::Single(v) => out.push((key.to_string(), v.clone())),
            ParamValue::Multi(values) => {
                out.extend(values.iter().map(|v| (key.to_string(), v.clone())));
            }
            ParamValue::Nested(inner) => {
                for (inner_key, value) in inner {
                    value.append_pairs(&format!("{key}[{inner_key}]"), out);
                }
            }
        }
    }
}

/// Query parameters keyed by top-level name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawQueryParams {
    entries: BTreeMap<String, ParamValue>,
}

impl RawQueryParams {
    /// Parse a raw query string (without the leading `?`).
    pub fn parse(query: &str) -> Self {
        let mut params = Self::default();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            params.insert_pair(&key, value.into_owned());
        }
        params
    }

    /// Parse the query component of a request URI.
    pub fn from_uri(uri: &axum::http::Uri) -> Self {
        uri.query().map(Self::parse).unwrap_or_default()
    }

    fn insert_pair(&mut self, key: &str, value: String) {
        if key.is_empty() {
            return;
        }

        match split_bracket(key) {
            Some((outer, "")) => match self.entries.get_mut(outer) {
                Some(existing) => existing.push(value),
                None => {
                    self.entries
                        .insert(outer.to_string(), ParamValue::Multi(vec![value]));
                }
            },
            Some((outer, inner)) => {
                let slot = self
                    .entries
                    .entry(outer.to_string())
                    .or_insert_with(|| ParamValue::Nested(BTreeMap::new()));
                if let ParamValue::Nested(map) = slot {
                    match map.get_mut(inner) {
                        Some(existing) => existing.push(value),
                        None => {
                            map.insert(inner.to_string(), ParamValue::Single(value));
                        }
                    }
                }
            }
            None => match self.entries.get_mut(key) {
                Some(existing) => existing.push(value),
                None => {
                    self.entries.insert(key.to_string(), ParamValue::Single(value));
                }
            },
        }
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&String, &mut ParamValue)> {
        self.entries.iter_mut()
    }

    /// Re-encode into a query string, bracketing nested keys again.
    pub fn to_query_string(&self) -> String {
        let mut pairs = Vec::new();
        for (key, value) in &self.entries {
            value.append_pairs(key, &mut pairs);
        }
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish()
    }
}

impl IntoIterator for RawQueryParams {
    type Item = (String, ParamValue);
    type IntoIter = std::collections::btree_map::IntoIter<String, ParamValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Split `outer[inner]` into its parts. `outer[]` yields an empty inner key.
fn split_bracket(key: &str) -> Option<(&str, &str)> {
    let open = key.find('[')?;
    if open == 0 || !key.ends_with(']') {
        return None;
    }
    Some((&key[..open], &key[open + 1..key.len() - 1]))
}
