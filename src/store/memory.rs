//! In-memory development store.
//!
//! Evaluates structured queries over JSON documents kept in process. Meant for
//! local development and tests, not as a persistence engine.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{Map, Value};

use super::{DocumentStore, StoreError};
use crate::query::{
    FieldCondition, FilterSpecification, FilterValue, Operator, ProjectionSpecification,
    SortDirection, SortSpecification, StructuredQuery,
};

/// Collections of JSON documents keyed by collection name.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: DashMap<String, Vec<Value>>,
}

impl MemoryStore {
    /// Create a store with the given empty collections.
    pub fn with_collections<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let store = Self::default();
        for name in names {
            store.collections.insert(name.into(), Vec::new());
        }
        store
    }

    /// Load collections from a JSON file shaped as `{"tours": [{...}, ...]}`.
    pub fn load_seed(&self, path: &Path) -> Result<usize, StoreError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Backend(format!("reading seed {}: {e}", path.display())))?;
        let seed: HashMap<String, Vec<Value>> = serde_json::from_str(&content)
            .map_err(|e| StoreError::Backend(format!("parsing seed {}: {e}", path.display())))?;

        let mut loaded = 0;
        for (collection, docs) in seed {
            let mut entry = self.collections.entry(collection).or_default();
            for doc in docs {
                entry.push(stamp(doc)?);
                loaded += 1;
            }
        }
        tracing::info!(documents = loaded, path = %path.display(), "Seed data loaded");
        Ok(loaded)
    }

    pub fn count(&self, collection: &str) -> usize {
        self.collections.get(collection).map(|c| c.len()).unwrap_or(0)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find(&self, collection: &str, query: &StructuredQuery) -> Result<Vec<Value>, StoreError> {
        let docs = self
            .collections
            .get(collection)
            .ok_or_else(|| StoreError::UnknownCollection(collection.to_string()))?;

        let mut matched: Vec<&Value> = docs.iter().filter(|d| matches(d, &query.filter)).collect();

        if let Some(sort) = &query.sort {
            matched.sort_by(|a, b| sort_order(a, b, sort));
        }

        let (skip, limit) = query
            .window
            .map(|w| (w.skip as usize, w.limit as usize))
            .unwrap_or((0, usize::MAX));

        Ok(matched
            .into_iter()
            .skip(skip)
            .take(limit)
            .map(|d| project(d, query.projection.as_ref()))
            .collect())
    }

    async fn create(&self, collection: &str, document: Value) -> Result<Value, StoreError> {
        let mut docs = self
            .collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::UnknownCollection(collection.to_string()))?;
        let doc = stamp(document)?;
        docs.push(doc.clone());
        Ok(doc)
    }
}

/// Assign `_id`, `createdAt` and the version marker when missing.
fn stamp(document: Value) -> Result<Value, StoreError> {
    let Value::Object(mut fields) = document else {
        return Err(StoreError::InvalidDocument);
    };
    fields
        .entry("_id")
        .or_insert_with(|| Value::from(uuid::Uuid::new_v4().to_string()));
    fields.entry("createdAt").or_insert_with(|| {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        Value::from(millis)
    });
    fields.entry("__v").or_insert(Value::from(0));
    Ok(Value::Object(fields))
}

/// Resolve a dotted path such as `startLocation.address`.
fn lookup<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(doc, |current, segment| current.get(segment))
}

fn matches(doc: &Value, filter: &FilterSpecification) -> bool {
    filter.iter().all(|(field, condition)| {
        let value = lookup(doc, field);
        match condition {
            FieldCondition::Equals(expected) => satisfies(value, Operator::Eq, expected),
            FieldCondition::Compare(ops) => ops.iter().all(|(op, expected)| satisfies(value, *op, expected)),
        }
    })
}

fn satisfies(value: Option<&Value>, op: Operator, expected: &FilterValue) -> bool {
    // Array fields match when any element does.
    if let Some(Value::Array(items)) = value {
        if !matches!(op, Operator::Ne) {
            return items.iter().any(|item| satisfies(Some(item), op, expected));
        }
    }

    match op {
        Operator::Eq => compare(value, expected) == Some(Ordering::Equal),
        Operator::Ne => compare(value, expected) != Some(Ordering::Equal),
        Operator::Gt => compare(value, expected) == Some(Ordering::Greater),
        Operator::Gte => matches!(compare(value, expected), Some(Ordering::Greater | Ordering::Equal)),
        Operator::Lt => compare(value, expected) == Some(Ordering::Less),
        Operator::Lte => matches!(compare(value, expected), Some(Ordering::Less | Ordering::Equal)),
        Operator::In => match expected {
            FilterValue::List(options) => options
                .iter()
                .any(|option| compare(value, option) == Some(Ordering::Equal)),
            single => compare(value, single) == Some(Ordering::Equal),
        },
    }
}

fn compare(value: Option<&Value>, expected: &FilterValue) -> Option<Ordering> {
    match (value?, expected) {
        (Value::Number(n), FilterValue::Number(e)) => n.as_f64()?.partial_cmp(e),
        (Value::String(s), FilterValue::Text(e)) => Some(s.as_str().cmp(e.as_str())),
        (Value::String(s), FilterValue::Number(e)) => s.parse::<f64>().ok()?.partial_cmp(e),
        (Value::Bool(b), FilterValue::Text(e)) => Some(b.to_string().as_str().cmp(e.as_str())),
        _ => None,
    }
}

fn sort_order(a: &Value, b: &Value, sort: &SortSpecification) -> Ordering {
    for key in sort.keys() {
        let ord = json_order(lookup(a, &key.field), lookup(b, &key.field));
        let ord = match key.direction {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// Missing and null sort first, then numbers, then strings, then the rest.
fn json_order(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None | Some(Value::Null) => 0,
            Some(Value::Number(_)) => 1,
            Some(Value::String(_)) => 2,
            Some(_) => 3,
        }
    }

    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

fn project(doc: &Value, projection: Option<&ProjectionSpecification>) -> Value {
    let (Some(projection), Value::Object(fields)) = (projection, doc) else {
        return doc.clone();
    };
    let kept: Map<String, Value> = fields
        .iter()
        .filter(|(name, _)| name.as_str() == "_id" || projection.keeps(name))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();
    Value::Object(kept)
}
