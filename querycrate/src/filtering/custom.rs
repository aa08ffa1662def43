//! Custom filters: named, predicate-backed filters that can't be expressed as
//! plain equality or inclusion on a column.
//!
//! A custom filter can be declared in three shorthand forms, all of which
//! [`normalize_custom_filters`] turns into a complete [`CustomFilter`]:
//!
//! ```rust,ignore
//! use querycrate::{CustomFilterInput, QueryCollection};
//!
//! // 1. bare predicate
//! let with_letter = CustomFilterInput::predicate(|q: Select<user::Entity>, values: &[String]| {
//!     q.where_condition(values.iter().fold(Condition::any(), |c, v| {
//!         c.add(user::Column::Login.contains(v))
//!     }))
//! });
//!
//! // 2. predicate and allowed values
//! let sorted = CustomFilterInput::with_values(by_sorted, ["true", "false"]);
//!
//! // 3. partial record
//! let active = CustomFilterInput::record(by_active).description("Only active users");
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::core::fields::FieldSet;

/// Predicate of a custom filter: receives the collection and the requested
/// values, returns the constrained collection.
pub type Predicate<Q> = Arc<dyn Fn(Q, &[String]) -> Q + Send + Sync>;

/// Computes the allowed values from the requested ones.
pub type ValuesFn = Arc<dyn Fn(&[String]) -> Vec<String> + Send + Sync>;

/// Value domain of a custom filter.
#[derive(Clone, Default)]
pub enum AllowedValues {
    /// Unrestricted.
    #[default]
    Any,
    /// A fixed list; an empty list is unrestricted too.
    List(Vec<String>),
    /// A list computed from the requested values on every request.
    Dynamic(ValuesFn),
}

impl AllowedValues {
    pub fn dynamic<F>(values: F) -> Self
    where
        F: Fn(&[String]) -> Vec<String> + Send + Sync + 'static,
    {
        Self::Dynamic(Arc::new(values))
    }

    /// The concrete allowed values for this request. Empty means unrestricted.
    #[must_use]
    pub fn resolve(&self, requested: &[String]) -> Vec<String> {
        match self {
            Self::Any => Vec::new(),
            Self::List(values) => values.clone(),
            Self::Dynamic(values) => values(requested),
        }
    }

    /// The values known without a request, if the domain is a fixed list.
    #[must_use]
    pub fn listed(&self) -> Option<&[String]> {
        match self {
            Self::List(values) if !values.is_empty() => Some(values.as_slice()),
            _ => None,
        }
    }
}

impl PartialEq for AllowedValues {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Any, Self::Any) => true,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Dynamic(a), Self::Dynamic(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for AllowedValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("Any"),
            Self::List(values) => f.debug_tuple("List").field(values).finish(),
            Self::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

impl<S: Into<String>> From<Vec<S>> for AllowedValues {
    fn from(values: Vec<S>) -> Self {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}

impl<S: Into<String>, const N: usize> From<[S; N]> for AllowedValues {
    fn from(values: [S; N]) -> Self {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}

/// A fully populated custom filter.
pub struct CustomFilter<Q> {
    pub predicate: Predicate<Q>,
    pub allowed_values: AllowedValues,
    pub description: String,
}

impl<Q> CustomFilter<Q> {
    /// Run the predicate.
    pub fn apply(&self, collection: Q, values: &[String]) -> Q {
        (self.predicate)(collection, values)
    }
}

impl<Q> Clone for CustomFilter<Q> {
    fn clone(&self) -> Self {
        Self {
            predicate: Arc::clone(&self.predicate),
            allowed_values: self.allowed_values.clone(),
            description: self.description.clone(),
        }
    }
}

/// Two filters are equal when they share the same predicate (by identity),
/// the same allowed values and the same description.
impl<Q> PartialEq for CustomFilter<Q> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.predicate, &other.predicate)
            && self.allowed_values == other.allowed_values
            && self.description == other.description
    }
}

impl<Q> fmt::Debug for CustomFilter<Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomFilter")
            .field("predicate", &"<fn>")
            .field("allowed_values", &self.allowed_values)
            .field("description", &self.description)
            .finish()
    }
}

/// Custom filters of one resource, by name.
pub type CustomFilters<Q> = HashMap<String, CustomFilter<Q>>;

impl<Q> FieldSet for CustomFilters<Q> {
    fn contains_field(&self, name: &str) -> bool {
        self.contains_key(name)
    }
}

/// A custom filter as declared, in any of the accepted shorthand forms.
pub enum CustomFilterInput<Q> {
    /// Only a predicate.
    Predicate(Predicate<Q>),
    /// A predicate and its allowed values.
    WithValues(Predicate<Q>, AllowedValues),
    /// A predicate with optional allowed values and description.
    Record {
        predicate: Predicate<Q>,
        allowed_values: Option<AllowedValues>,
        description: Option<String>,
    },
}

impl<Q> CustomFilterInput<Q> {
    pub fn predicate<F>(predicate: F) -> Self
    where
        F: Fn(Q, &[String]) -> Q + Send + Sync + 'static,
    {
        Self::Predicate(Arc::new(predicate))
    }

    pub fn with_values<F>(predicate: F, allowed_values: impl Into<AllowedValues>) -> Self
    where
        F: Fn(Q, &[String]) -> Q + Send + Sync + 'static,
    {
        Self::WithValues(Arc::new(predicate), allowed_values.into())
    }

    pub fn record<F>(predicate: F) -> Self
    where
        F: Fn(Q, &[String]) -> Q + Send + Sync + 'static,
    {
        Self::Record {
            predicate: Arc::new(predicate),
            allowed_values: None,
            description: None,
        }
    }

    /// Set the allowed values, turning the input into the record form.
    #[must_use]
    pub fn allowed_values(self, values: impl Into<AllowedValues>) -> Self {
        let (predicate, _, description) = self.into_parts();
        Self::Record {
            predicate,
            allowed_values: Some(values.into()),
            description,
        }
    }

    /// Set the description, turning the input into the record form.
    #[must_use]
    pub fn description(self, description: impl Into<String>) -> Self {
        let (predicate, allowed_values, _) = self.into_parts();
        Self::Record {
            predicate,
            allowed_values,
            description: Some(description.into()),
        }
    }

    fn into_parts(self) -> (Predicate<Q>, Option<AllowedValues>, Option<String>) {
        match self {
            Self::Predicate(predicate) => (predicate, None, None),
            Self::WithValues(predicate, values) => (predicate, Some(values), None),
            Self::Record {
                predicate,
                allowed_values,
                description,
            } => (predicate, allowed_values, description),
        }
    }

    /// Fill in whatever the shorthand left out.
    #[must_use]
    pub fn normalize(self) -> CustomFilter<Q> {
        let (predicate, allowed_values, description) = self.into_parts();
        CustomFilter {
            predicate,
            allowed_values: allowed_values.unwrap_or_default(),
            description: description.unwrap_or_default(),
        }
    }
}

impl<Q> From<CustomFilter<Q>> for CustomFilterInput<Q> {
    fn from(filter: CustomFilter<Q>) -> Self {
        Self::Record {
            predicate: filter.predicate,
            allowed_values: Some(filter.allowed_values),
            description: Some(filter.description),
        }
    }
}

impl<Q> Clone for CustomFilterInput<Q> {
    fn clone(&self) -> Self {
        match self {
            Self::Predicate(predicate) => Self::Predicate(Arc::clone(predicate)),
            Self::WithValues(predicate, values) => {
                Self::WithValues(Arc::clone(predicate), values.clone())
            }
            Self::Record {
                predicate,
                allowed_values,
                description,
            } => Self::Record {
                predicate: Arc::clone(predicate),
                allowed_values: allowed_values.clone(),
                description: description.clone(),
            },
        }
    }
}

/// Normalize every declared custom filter.
#[must_use]
pub fn normalize_custom_filters<Q>(
    filters: HashMap<String, CustomFilterInput<Q>>,
) -> CustomFilters<Q> {
    filters
        .into_iter()
        .map(|(name, input)| (name, input.normalize()))
        .collect()
}
