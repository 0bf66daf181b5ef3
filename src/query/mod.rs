//! Query translation subsystem.
//!
//! # Data Flow
//! ```text
//! URI query string
//!     → params.rs (decode, bracket keys, repeated keys)
//!     → [pollution defense collapses repeats]
//!     → translator.rs
//!         → filter.rs (operators, reserved names dropped)
//!         → sort.rs
//!         → projection.rs
//!         → pagination.rs
//!     → StructuredQuery → store (external)
//! ```
//!
//! # Design Decisions
//! - Operators are parsed into a closed enum; unknown operators are rejected
//! - The translator only reshapes syntax, it never checks that fields exist
//! - Nothing here executes a query

pub mod filter;
pub mod pagination;
pub mod params;
pub mod projection;
pub mod sort;
pub mod translator;

pub use filter::{FieldCondition, FilterSpecification, FilterValue, Operator, RESERVED_PARAMS};
pub use pagination::PaginationWindow;
pub use params::{ParamValue, RawQueryParams};
pub use projection::ProjectionSpecification;
pub use sort::{SortDirection, SortKey, SortSpecification};
pub use translator::{QueryTranslator, StructuredQuery};

/// Query input that cannot be reshaped into a structured query.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("Invalid operator '{operator}' on field '{field}'")]
    UnknownOperator { field: String, operator: String },

    #[error("Invalid value for operator '{operator}' on field '{field}'")]
    MalformedOperand { field: String, operator: Operator },

    #[error("Invalid field name '{0}'")]
    InvalidField(String),

    #[error("Projection cannot mix included and excluded fields")]
    MixedProjection,
}
