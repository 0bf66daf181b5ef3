//! Field projection.

use std::collections::BTreeSet;

use serde_json::{Map, Value};

use super::params::{ParamValue, RawQueryParams};
use super::QueryError;

/// Internal schema-version marker hidden from clients by default.
pub const VERSION_MARKER_FIELD: &str = "__v";

/// Either an inclusion set or an exclusion set, never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectionSpecification {
    Include(BTreeSet<String>),
    Exclude(BTreeSet<String>),
}

impl ProjectionSpecification {
    pub fn from_params(params: &RawQueryParams) -> Result<Self, QueryError> {
        let Some(raw) = params.get("fields").and_then(ParamValue::last) else {
            return Ok(Self::default());
        };

        let entries: Vec<&str> = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty() && *s != "-")
            .collect();
        if entries.is_empty() {
            return Ok(Self::default());
        }

        let excluded = entries.iter().filter(|f| f.starts_with('-')).count();
        if excluded == entries.len() {
            Ok(Self::Exclude(
                entries.iter().map(|f| f[1..].to_string()).collect(),
            ))
        } else if excluded == 0 {
            Ok(Self::Include(entries.iter().map(|f| f.to_string()).collect()))
        } else {
            Err(QueryError::MixedProjection)
        }
    }

    /// Whether a top-level document field survives the projection.
    pub fn keeps(&self, field: &str) -> bool {
        match self {
            Self::Include(fields) => fields.contains(field),
            Self::Exclude(fields) => !fields.contains(field),
        }
    }

    /// `{"name": 1}` for inclusion, `{"__v": 0}` for exclusion.
    pub fn to_document(&self) -> Value {
        let (fields, flag) = match self {
            Self::Include(fields) => (fields, 1),
            Self::Exclude(fields) => (fields, 0),
        };
        let doc: Map<String, Value> = fields
            .iter()
            .map(|f| (f.clone(), Value::from(flag)))
            .collect();
        Value::Object(doc)
    }
}

impl Default for ProjectionSpecification {
    fn default() -> Self {
        Self::Exclude(BTreeSet::from([VERSION_MARKER_FIELD.to_string()]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_inclusion() {
        let params = RawQueryParams::parse("fields=name,duration,price");
        let projection = ProjectionSpecification::from_params(&params).unwrap();
        assert_eq!(projection.to_document(), json!({ "duration": 1, "name": 1, "price": 1 }));
        assert!(projection.keeps("name"));
        assert!(!projection.keeps("__v"));
    }

    #[test]
    fn test_default_hides_version_marker() {
        let projection = ProjectionSpecification::from_params(&RawQueryParams::default()).unwrap();
        assert_eq!(projection, ProjectionSpecification::default());
        assert!(!projection.keeps("__v"));
        assert!(projection.keeps("name"));
    }

    #[test]
    fn test_exclusion() {
        let params = RawQueryParams::parse("fields=-summary,-description");
        let projection = ProjectionSpecification::from_params(&params).unwrap();
        assert_eq!(projection.to_document(), json!({ "description": 0, "summary": 0 }));
    }

    #[test]
    fn test_mixed_projection_rejected() {
        let params = RawQueryParams::parse("fields=name,-summary");
        assert_eq!(
            ProjectionSpecification::from_params(&params),
            Err(QueryError::MixedProjection)
        );
    }
}
