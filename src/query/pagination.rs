//! Pagination window.
//!
//! # Design Decisions
//! - Values that do not coerce to a positive integer fall back to the defaults,
//!   the same as an absent parameter
//! - Negative pages are clamped to the first page so `skip` is never negative
//! - No upper bound on `limit`; the store is the backstop

use super::params::{ParamValue, RawQueryParams};

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 100;

/// Resolved page/limit with the derived number of documents to skip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationWindow {
    pub page: u64,
    pub limit: u64,
    pub skip: u64,
}

impl PaginationWindow {
    pub fn new(page: u64, limit: u64) -> Self {
        let page = page.max(1);
        let limit = limit.max(1);
        Self {
            page,
            limit,
            skip: (page - 1).saturating_mul(limit),
        }
    }

    pub fn from_params(params: &RawQueryParams) -> Self {
        let page = match coerce(params.get("page")) {
            Coerced::Positive(n) => n,
            Coerced::Negative => {
                tracing::debug!("Negative page requested, clamping to first page");
                DEFAULT_PAGE
            }
            Coerced::Falsy => DEFAULT_PAGE,
        };
        let limit = match coerce(params.get("limit")) {
            Coerced::Positive(n) => n,
            Coerced::Negative | Coerced::Falsy => DEFAULT_LIMIT,
        };
        Self::new(page, limit)
    }
}

impl Default for PaginationWindow {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE, DEFAULT_LIMIT)
    }
}

enum Coerced {
    Positive(u64),
    Negative,
    Falsy,
}

/// Numeric coercion: blanks, non-numbers and zero are all "falsy".
fn coerce(value: Option<&ParamValue>) -> Coerced {
    let Some(raw) = value.and_then(ParamValue::last) else {
        return Coerced::Falsy;
    };

    match raw.trim().parse::<f64>() {
        Ok(n) if n.is_finite() => {
            let n = n.trunc();
            if n >= 1.0 {
                Coerced::Positive(if n >= u64::MAX as f64 { u64::MAX } else { n as u64 })
            } else if n <= -1.0 {
                Coerced::Negative
            } else {
                Coerced::Falsy
            }
        }
        _ => Coerced::Falsy,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(query: &str) -> PaginationWindow {
        PaginationWindow::from_params(&RawQueryParams::parse(query))
    }

    #[test]
    fn test_page_and_limit() {
        assert_eq!(window("page=3&limit=10"), PaginationWindow { page: 3, limit: 10, skip: 20 });
    }

    #[test]
    fn test_non_numeric_falls_back() {
        assert_eq!(window("page=abc"), PaginationWindow { page: 1, limit: 100, skip: 0 });
        assert_eq!(window("limit=lots"), PaginationWindow { page: 1, limit: 100, skip: 0 });
    }

    #[test]
    fn test_absent_uses_defaults() {
        assert_eq!(window(""), PaginationWindow::default());
        assert_eq!(PaginationWindow::default().skip, 0);
    }

    #[test]
    fn test_zero_is_falsy() {
        assert_eq!(window("page=0&limit=0"), PaginationWindow { page: 1, limit: 100, skip: 0 });
    }

    #[test]
    fn test_negative_page_clamped() {
        assert_eq!(window("page=-2&limit=10"), PaginationWindow { page: 1, limit: 10, skip: 0 });
    }

    #[test]
    fn test_negative_limit_uses_default() {
        assert_eq!(window("page=2&limit=-5").limit, 100);
    }

    #[test]
    fn test_fractional_and_padded_values() {
        assert_eq!(window("page=2.9&limit= 10 "), PaginationWindow { page: 2, limit: 10, skip: 10 });
    }

    #[test]
    fn test_no_upper_bound_on_limit() {
        assert_eq!(window("limit=5000").limit, 5000);
    }
}
