//! # Filtering & Sorting
//!
//! Translation of the `filter` and `sort` query parameters into constraints
//! on a [`QueryCollection`](crate::core::collection::QueryCollection).
//!
//! ## Main Components
//!
//! - **[`parse_filter_param`]**: validates the raw filter against the allowed fields
//! - **[`normalize_custom_filters`]**: completes custom filter shorthands
//! - **[`apply_filters`]**: resolves every field, then applies equality, inclusion or
//!   custom predicates
//! - **[`parse_sort_param`]** / **[`apply_sort`]**: ordered sort fields
//!
//! ## Query Parameter Examples
//!
//! ```rust,ignore
//! // Equality
//! GET /users?filter[login]=andre
//!
//! // Inclusion (IN query)
//! GET /users?filter[login]=andre,fred
//!
//! // The same, JSON encoded
//! GET /users?filter={"login":"andre,fred"}
//!
//! // Custom filter
//! GET /users?filter[has_comments]=true
//!
//! // Sorting, descending with a leading '-'
//! GET /users?sort=-id,login
//! ```

pub mod apply;
pub mod custom;
pub mod parser;
pub mod sort;

pub use apply::{Constraint, apply_constraints, apply_filters, resolve_constraints};
pub use custom::{
    AllowedValues, CustomFilter, CustomFilterInput, CustomFilters, Predicate, ValuesFn,
    normalize_custom_filters,
};
pub use parser::{FilterMapping, FilterValue, VALUE_DELIMITER, parse_filter_param, split_values};
pub use sort::{DefaultSort, SortField, SortSpec, apply_sort, parse_sort_param};
