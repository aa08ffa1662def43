use std::fmt;

use sea_orm::Value;

use super::custom::{CustomFilter, CustomFilters, Predicate};
use super::parser::{FilterMapping, FilterValue};
use crate::core::collection::{QueryCollection, coerce_value};
use crate::core::fields::AllowedFields;
use crate::errors::QueryError;

/// One resolved filter, ready to be applied to a collection.
pub enum Constraint<Q: QueryCollection> {
    /// `column = value`
    Equality {
        field: String,
        column: Q::Column,
        value: Value,
    },
    /// `column IN (values)`
    Inclusion {
        field: String,
        column: Q::Column,
        values: Vec<Value>,
    },
    /// Whatever the custom predicate does with the values.
    Custom {
        field: String,
        predicate: Predicate<Q>,
        values: FilterValue,
    },
}

impl<Q: QueryCollection> Constraint<Q> {
    #[must_use]
    pub fn field(&self) -> &str {
        match self {
            Self::Equality { field, .. }
            | Self::Inclusion { field, .. }
            | Self::Custom { field, .. } => field,
        }
    }

    /// Apply this constraint, returning the new collection.
    pub fn apply(self, collection: Q) -> Q {
        match self {
            Self::Equality {
                field,
                column,
                value,
            } => {
                tracing::debug!(field = %field, value = ?value, "applying equality filter");
                collection.where_equals(column, value)
            }
            Self::Inclusion {
                field,
                column,
                values,
            } => {
                tracing::debug!(field = %field, values = ?values, "applying inclusion filter");
                collection.where_in(column, values)
            }
            Self::Custom {
                field,
                predicate,
                values,
            } => {
                tracing::debug!(field = %field, values = ?values, "applying custom filter");
                predicate(collection, values.as_slice())
            }
        }
    }
}

impl<Q: QueryCollection> fmt::Debug for Constraint<Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equality {
                field,
                column,
                value,
            } => f
                .debug_struct("Equality")
                .field("field", field)
                .field("column", column)
                .field("value", value)
                .finish(),
            Self::Inclusion {
                field,
                column,
                values,
            } => f
                .debug_struct("Inclusion")
                .field("field", field)
                .field("column", column)
                .field("values", values)
                .finish(),
            Self::Custom { field, values, .. } => f
                .debug_struct("Custom")
                .field("field", field)
                .field("values", values)
                .finish_non_exhaustive(),
        }
    }
}

/// Turn a filter mapping into constraints, validating every field and every
/// custom filter value before anything is applied.
///
/// Custom filters take precedence over a column of the same name.
///
/// # Errors
///
/// - [`QueryError::InvalidFilterField`] for a field that is neither a custom
///   filter nor an allowed column.
/// - [`QueryError::InvalidFilterValue`] for a value outside of a custom
///   filter's allowed values.
pub fn resolve_constraints<Q: QueryCollection>(
    filters: &FilterMapping,
    allowed: &AllowedFields<Q::Column>,
    custom_filters: &CustomFilters<Q>,
) -> Result<Vec<Constraint<Q>>, QueryError> {
    filters
        .iter()
        .map(|(field, values)| {
            if let Some(custom) = custom_filters.get(field) {
                check_allowed_values(field, custom, values)?;
                return Ok(Constraint::Custom {
                    field: field.to_owned(),
                    predicate: custom.predicate.clone(),
                    values: values.to_vec(),
                });
            }

            let column = allowed
                .column(field)
                .ok_or_else(|| QueryError::InvalidFilterField(field.to_owned()))?;

            Ok(match values {
                [single] => Constraint::Equality {
                    field: field.to_owned(),
                    column,
                    value: coerce_value(&column, single),
                },
                _ => Constraint::Inclusion {
                    field: field.to_owned(),
                    column,
                    values: values.iter().map(|value| coerce_value(&column, value)).collect(),
                },
            })
        })
        .collect()
}

fn check_allowed_values<Q>(
    field: &str,
    filter: &CustomFilter<Q>,
    values: &[String],
) -> Result<(), QueryError> {
    let allowed = filter.allowed_values.resolve(values);
    if allowed.is_empty() {
        return Ok(());
    }

    match values.iter().find(|value| !allowed.contains(value)) {
        Some(value) => {
            tracing::debug!(field, value = %value, allowed = ?allowed, "rejecting filter value");
            Err(QueryError::InvalidFilterValue {
                field: field.to_owned(),
                value: value.clone(),
            })
        }
        None => Ok(()),
    }
}

/// Apply already-resolved constraints in order. Each one narrows the result
/// of the previous one, so they combine with AND.
pub fn apply_constraints<Q: QueryCollection>(collection: Q, constraints: Vec<Constraint<Q>>) -> Q {
    constraints
        .into_iter()
        .fold(collection, |collection, constraint| constraint.apply(collection))
}

/// Resolve and apply a filter mapping to `collection`.
///
/// # Errors
///
/// See [`resolve_constraints`]. On error nothing is applied.
pub fn apply_filters<Q: QueryCollection>(
    collection: Q,
    filters: &FilterMapping,
    allowed: &AllowedFields<Q::Column>,
    custom_filters: &CustomFilters<Q>,
) -> Result<Q, QueryError> {
    let constraints = resolve_constraints(filters, allowed, custom_filters)?;
    Ok(apply_constraints(collection, constraints))
}
