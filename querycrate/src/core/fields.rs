//! Allowed-field sets: which fields of a resource may appear in a filter or
//! sort parameter, and which column each of them maps to.

use sea_orm::{ColumnTrait, EntityName};

use crate::errors::ConfigError;

/// Anything that can answer "is this field name accepted?".
///
/// Implemented for [`AllowedFields`], for custom filter maps and for pairs, so
/// a parser can validate against columns and custom filters at once.
pub trait FieldSet {
    fn contains_field(&self, name: &str) -> bool;
}

impl<T: FieldSet + ?Sized> FieldSet for &T {
    fn contains_field(&self, name: &str) -> bool {
        (**self).contains_field(name)
    }
}

impl<A: FieldSet, B: FieldSet> FieldSet for (A, B) {
    fn contains_field(&self, name: &str) -> bool {
        self.0.contains_field(name) || self.1.contains_field(name)
    }
}

/// Ordered set of field names bound to the columns of one entity.
#[derive(Debug, Clone)]
pub struct AllowedFields<C> {
    columns: Vec<(String, C)>,
}

impl<C: ColumnTrait> AllowedFields<C> {
    /// Every column of the entity, in declaration order.
    #[must_use]
    pub fn all() -> Self {
        C::iter()
            .map(|column| (column.as_str().to_owned(), column))
            .collect()
    }

    /// No fields at all.
    #[must_use]
    pub fn none() -> Self {
        Self {
            columns: Vec::new(),
        }
    }

    /// Only the named columns, in the given order.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownField`] if a name isn't a column of the entity.
    pub fn only(names: &[&str]) -> Result<Self, ConfigError> {
        let all = Self::all();
        names
            .iter()
            .map(|name| {
                all.column(name)
                    .map(|column| ((*name).to_owned(), column))
                    .ok_or_else(|| ConfigError::UnknownField {
                        resource: resource_name::<C::EntityName>(),
                        field: (*name).to_owned(),
                    })
            })
            .collect()
    }

    /// Every column except the named ones.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownField`] if a name isn't a column of the entity.
    pub fn except(names: &[&str]) -> Result<Self, ConfigError> {
        let all = Self::all();
        if let Some(unknown) = names.iter().find(|name| !all.contains(name)) {
            return Err(ConfigError::UnknownField {
                resource: resource_name::<C::EntityName>(),
                field: (*unknown).to_owned(),
            });
        }
        Ok(all
            .columns
            .into_iter()
            .filter(|(name, _)| !names.contains(&name.as_str()))
            .collect())
    }

    #[must_use]
    pub fn column(&self, name: &str) -> Option<C> {
        self.columns
            .iter()
            .find(|(field, _)| field == name)
            .map(|&(_, column)| column)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.columns.iter().any(|(field, _)| field == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(field, _)| field.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl<C: ColumnTrait> FieldSet for AllowedFields<C> {
    fn contains_field(&self, name: &str) -> bool {
        self.contains(name)
    }
}

impl<C> FromIterator<(String, C)> for AllowedFields<C> {
    fn from_iter<I: IntoIterator<Item = (String, C)>>(iter: I) -> Self {
        Self {
            columns: iter.into_iter().collect(),
        }
    }
}

pub(crate) fn resource_name<E: EntityName>() -> String {
    E::default().table_name().to_owned()
}
