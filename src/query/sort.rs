//! Sort specification.

use serde_json::{json, Value};

use super::params::{ParamValue, RawQueryParams};

/// Field used when the client does not ask for an order.
pub const DEFAULT_SORT_FIELD: &str = "createdAt";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn asc(field: impl Into<String>) -> Self {
        Self { field: field.into(), direction: SortDirection::Ascending }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self { field: field.into(), direction: SortDirection::Descending }
    }
}

/// Ordered sort keys; the first entry is the primary key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpecification(Vec<SortKey>);

impl SortSpecification {
    pub fn from_params(params: &RawQueryParams) -> Self {
        let keys: Vec<SortKey> = params
            .get("sort")
            .and_then(ParamValue::last)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty() && *s != "-")
                    .map(|s| match s.strip_prefix('-') {
                        Some(field) => SortKey::desc(field),
                        None => SortKey::asc(s),
                    })
                    .collect()
            })
            .unwrap_or_default();

        if keys.is_empty() {
            Self::default()
        } else {
            Self(keys)
        }
    }

    pub fn keys(&self) -> &[SortKey] {
        &self.0
    }

    /// `[["price", 1], ["ratingsAverage", -1]]`. An array keeps key priority,
    /// a JSON object would not.
    pub fn to_document(&self) -> Value {
        self.0
            .iter()
            .map(|key| {
                let dir = match key.direction {
                    SortDirection::Ascending => 1,
                    SortDirection::Descending => -1,
                };
                json!([key.field, dir])
            })
            .collect()
    }
}

impl Default for SortSpecification {
    fn default() -> Self {
        Self(vec![SortKey::desc(DEFAULT_SORT_FIELD)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_keys_in_order() {
        let params = RawQueryParams::parse("sort=price,-ratingsAverage");
        let sort = SortSpecification::from_params(&params);
        assert_eq!(
            sort.keys(),
            &[SortKey::asc("price"), SortKey::desc("ratingsAverage")]
        );
    }

    #[test]
    fn test_default_sort() {
        let sort = SortSpecification::from_params(&RawQueryParams::default());
        assert_eq!(sort.keys(), &[SortKey::desc("createdAt")]);
    }

    #[test]
    fn test_empty_sort_falls_back_to_default() {
        let params = RawQueryParams::parse("sort=");
        assert_eq!(SortSpecification::from_params(&params), SortSpecification::default());

        let params = RawQueryParams::parse("sort=,,");
        assert_eq!(SortSpecification::from_params(&params), SortSpecification::default());
    }

    #[test]
    fn test_repeated_sort_uses_last() {
        let params = RawQueryParams::parse("sort=name&sort=-price");
        let sort = SortSpecification::from_params(&params);
        assert_eq!(sort.keys(), &[SortKey::desc("price")]);
    }

    #[test]
    fn test_document_keeps_priority() {
        let params = RawQueryParams::parse("sort=price,-ratingsAverage");
        assert_eq!(
            SortSpecification::from_params(&params).to_document(),
            json!([["price", 1], ["ratingsAverage", -1]])
        );
    }
}
