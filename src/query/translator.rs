//! Chainable query translator.

use serde_json::{json, Value};

use super::filter::FilterSpecification;
use super::pagination::PaginationWindow;
use super::params::RawQueryParams;
use super::projection::ProjectionSpecification;
use super::sort::SortSpecification;
use super::QueryError;

/// Structured query descriptor handed to a store for execution.
///
/// Parts the caller never asked for stay `None` and the store applies its
/// own behaviour (no ordering, full documents, no paging).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructuredQuery {
    pub filter: FilterSpecification,
    pub sort: Option<SortSpecification>,
    pub projection: Option<ProjectionSpecification>,
    pub window: Option<PaginationWindow>,
}

impl StructuredQuery {
    /// Store-facing JSON rendering of the whole descriptor.
    pub fn to_document(&self) -> Value {
        json!({
            "filter": self.filter.to_document(),
            "sort": self.sort.as_ref().map(SortSpecification::to_document),
            "projection": self.projection.as_ref().map(ProjectionSpecification::to_document),
            "skip": self.window.map(|w| w.skip),
            "limit": self.window.map(|w| w.limit),
        })
    }
}

/// Turns untrusted query parameters into a [`StructuredQuery`].
///
/// Every step consumes and returns the translator so the steps compose in any
/// order:
///
/// ```
/// use resource_gateway::query::{QueryTranslator, RawQueryParams};
///
/// let params = RawQueryParams::parse("price[gte]=500&sort=-price&page=2&limit=10");
/// let query = QueryTranslator::new(params)
///     .filter()
///     .sort()
///     .limit_fields()
///     .paginate()
///     .into_query()
///     .unwrap();
///
/// assert_eq!(query.window.unwrap().skip, 10);
/// ```
///
/// The first malformed step is remembered and reported by
/// [`QueryTranslator::into_query`]; later steps still run.
#[derive(Debug)]
pub struct QueryTranslator {
    params: RawQueryParams,
    query: StructuredQuery,
    error: Option<QueryError>,
}

impl QueryTranslator {
    pub fn new(params: RawQueryParams) -> Self {
        Self {
            params,
            query: StructuredQuery::default(),
            error: None,
        }
    }

    pub fn filter(mut self) -> Self {
        match FilterSpecification::from_params(&self.params) {
            Ok(filter) => self.query.filter = filter,
            Err(e) => self.record(e),
        }
        self
    }

    pub fn sort(mut self) -> Self {
        self.query.sort = Some(SortSpecification::from_params(&self.params));
        self
    }

    pub fn limit_fields(mut self) -> Self {
        match ProjectionSpecification::from_params(&self.params) {
            Ok(projection) => self.query.projection = Some(projection),
            Err(e) => self.record(e),
        }
        self
    }

    pub fn paginate(mut self) -> Self {
        self.query.window = Some(PaginationWindow::from_params(&self.params));
        self
    }

    /// Finish the chain without executing anything.
    pub fn into_query(self) -> Result<StructuredQuery, QueryError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.query),
        }
    }

    pub fn params(&self) -> &RawQueryParams {
        &self.params
    }

    fn record(&mut self, error: QueryError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::sort::SortKey;

    #[test]
    fn test_full_chain() {
        let params = RawQueryParams::parse(
            "price[gte]=500&difficulty=easy&sort=price,-ratingsAverage&fields=name,price&page=3&limit=10",
        );
        let query = QueryTranslator::new(params)
            .filter()
            .sort()
            .limit_fields()
            .paginate()
            .into_query()
            .unwrap();

        assert_eq!(query.filter.len(), 2);
        assert_eq!(
            query.sort.unwrap().keys(),
            &[SortKey::asc("price"), SortKey::desc("ratingsAverage")]
        );
        assert!(query.projection.unwrap().keeps("price"));
        assert_eq!(query.window, Some(PaginationWindow { page: 3, limit: 10, skip: 20 }));
    }

    #[test]
    fn test_order_independent() {
        let raw = "duration[lt]=10&sort=-price&page=2";
        let a = QueryTranslator::new(RawQueryParams::parse(raw))
            .filter()
            .sort()
            .paginate()
            .into_query()
            .unwrap();
        let b = QueryTranslator::new(RawQueryParams::parse(raw))
            .paginate()
            .sort()
            .filter()
            .into_query()
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_skipped_steps_stay_unset() {
        let query = QueryTranslator::new(RawQueryParams::parse("difficulty=easy"))
            .filter()
            .into_query()
            .unwrap();
        assert!(query.sort.is_none());
        assert!(query.projection.is_none());
        assert!(query.window.is_none());
    }

    #[test]
    fn test_first_error_is_reported() {
        let result = QueryTranslator::new(RawQueryParams::parse("name[where]=x&fields=a,-b"))
            .filter()
            .limit_fields()
            .into_query();
        assert!(matches!(result, Err(QueryError::UnknownOperator { .. })));
    }

    #[test]
    fn test_descriptor_document() {
        let query = QueryTranslator::new(RawQueryParams::parse("price[lte]=900&page=2&limit=5"))
            .filter()
            .sort()
            .limit_fields()
            .paginate()
            .into_query()
            .unwrap();
        assert_eq!(
            query.to_document(),
            json!({
                "filter": { "price": { "$lte": 900 } },
                "sort": [["createdAt", -1]],
                "projection": { "__v": 0 },
                "skip": 5,
                "limit": 5,
            })
        );
    }
}
