pub mod core;
pub mod errors;
pub mod filtering;
pub mod params;
pub mod registry;
pub mod resource;
pub mod routes;

#[cfg(test)]
mod fixtures;

pub use crate::core::{AllowedFields, FieldSet, QueryCollection};
pub use errors::{ApiError, ConfigError, QueryError};
pub use filtering::{
    AllowedValues, CustomFilter, CustomFilterInput, DefaultSort, FilterMapping, SortSpec,
};
pub use params::{IndexParams, IndexQuery, RawFilter};
pub use registry::QueryRegistry;
pub use resource::{QueryDescription, ResourceQuery, ResourceQueryBuilder};
pub use routes::{AppState, router};
