//! Filter specification and comparison operators.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde_json::{json, Map, Value};

use super::params::{ParamValue, RawQueryParams};
use super::QueryError;

/// Parameter names that steer the query itself and never become filters.
pub const RESERVED_PARAMS: [&str; 4] = ["page", "sort", "limit", "fields"];

/// Closed set of comparison operators understood by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Ne => "ne",
            Operator::Gt => "gt",
            Operator::Gte => "gte",
            Operator::Lt => "lt",
            Operator::Lte => "lte",
            Operator::In => "in",
        }
    }
}

impl FromStr for Operator {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "eq" => Ok(Operator::Eq),
            "ne" => Ok(Operator::Ne),
            "gt" => Ok(Operator::Gt),
            "gte" => Ok(Operator::Gte),
            "lt" => Ok(Operator::Lt),
            "lte" => Ok(Operator::Lte),
            "in" => Ok(Operator::In),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A literal compared against a document field.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Number(f64),
    Text(String),
    List(Vec<FilterValue>),
}

impl FilterValue {
    /// Numbers are recognised syntactically; everything else stays text.
    pub fn from_literal(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() && !trimmed.is_empty() && looks_numeric(trimmed) => {
                FilterValue::Number(n)
            }
            _ => FilterValue::Text(raw.to_string()),
        }
    }

    fn list<'a>(items: impl IntoIterator<Item = &'a str>) -> Self {
        FilterValue::List(items.into_iter().map(FilterValue::from_literal).collect())
    }

    pub fn to_json(&self) -> Value {
        match self {
            FilterValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
                    json!(*n as i64)
                } else {
                    json!(n)
                }
            }
            FilterValue::Text(s) => Value::String(s.clone()),
            FilterValue::List(items) => Value::Array(items.iter().map(FilterValue::to_json).collect()),
        }
    }
}

/// `f64::from_str` accepts `inf`, `NaN` and friends; only plain decimal literals count.
fn looks_numeric(s: &str) -> bool {
    s.chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
}

/// Condition placed on a single field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldCondition {
    Equals(FilterValue),
    Compare(Vec<(Operator, FilterValue)>),
}

/// Field name to condition. Never contains a reserved parameter name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSpecification {
    conditions: BTreeMap<String, FieldCondition>,
}

impl FilterSpecification {
    /// Build a filter from raw parameters, dropping reserved names.
    pub fn from_params(params: &RawQueryParams) -> Result<Self, QueryError> {
        let mut conditions = BTreeMap::new();

        for (field, value) in params.iter() {
            if RESERVED_PARAMS.contains(&field.as_str()) {
                continue;
            }
            if is_operator_like(field) {
                return Err(QueryError::InvalidField(field.clone()));
            }

            let condition = match value {
                ParamValue::Single(raw) => FieldCondition::Equals(FilterValue::from_literal(raw)),
                ParamValue::Multi(values) => FieldCondition::Compare(vec![(
                    Operator::In,
                    FilterValue::list(values.iter().map(String::as_str)),
                )]),
                ParamValue::Nested(ops) => {
                    let mut comparisons = Vec::with_capacity(ops.len());
                    for (op_key, op_value) in ops {
                        let op: Operator = op_key.parse().map_err(|_| QueryError::UnknownOperator {
                            field: field.clone(),
                            operator: op_key.clone(),
                        })?;
                        comparisons.push((op, operand(field, op, op_value)?));
                    }
                    FieldCondition::Compare(comparisons)
                }
            };

            conditions.insert(field.clone(), condition);
        }

        Ok(Self { conditions })
    }

    pub fn get(&self, field: &str) -> Option<&FieldCondition> {
        self.conditions.get(field)
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldCondition)> {
        self.conditions.iter()
    }

    /// Render in the store's operator form: `{"price": {"$gte": 500}}`.
    pub fn to_document(&self) -> Value {
        let mut doc = Map::new();
        for (field, condition) in &self.conditions {
            let rendered = match condition {
                FieldCondition::Equals(v) => v.to_json(),
                FieldCondition::Compare(ops) => {
                    let mut inner = Map::new();
                    for (op, v) in ops {
                        inner.insert(format!("${}", op.as_str()), v.to_json());
                    }
                    Value::Object(inner)
                }
            };
            doc.insert(field.clone(), rendered);
        }
        Value::Object(doc)
    }
}

/// A field name the store could read as an operator: `$where`, `a.$ne`.
fn is_operator_like(field: &str) -> bool {
    field.split('.').any(|segment| segment.starts_with('$'))
}

fn operand(field: &str, op: Operator, value: &ParamValue) -> Result<FilterValue, QueryError> {
    match (op, value) {
        (Operator::In, ParamValue::Single(raw)) => Ok(FilterValue::list(raw.split(','))),
        (Operator::In, ParamValue::Multi(values)) => {
            Ok(FilterValue::list(values.iter().map(String::as_str)))
        }
        (_, ParamValue::Single(raw)) => Ok(FilterValue::from_literal(raw)),
        // Repeated scalar operators keep the last value, like any other scalar.
        (_, ParamValue::Multi(values)) => values
            .last()
            .map(|raw| FilterValue::from_literal(raw))
            .ok_or_else(|| QueryError::MalformedOperand { field: field.to_string(), operator: op }),
        (_, ParamValue::Nested(_)) => Err(QueryError::MalformedOperand {
            field: field.to_string(),
            operator: op,
        }),
    }
}
