//! Per-resource query configuration.
//!
//! A [`ResourceQuery`] bundles everything needed to answer index requests for
//! one entity: which fields may be filtered and sorted, the custom filters and
//! the default ordering. It is built once at startup and never mutated.
//!
//! ```rust,ignore
//! let users = ResourceQuery::<user::Entity>::builder()
//!     .filterable(AllowedFields::except(&["password"])?)
//!     .sortable(AllowedFields::only(&["id", "login"])?)
//!     .default_sort(("login", Order::Asc))
//!     .custom_filter("has_comments", has_comments_filter())
//!     .build()?;
//!
//! let select = users.handle_index_request(&params, user::Entity::find())?;
//! ```

use std::collections::HashMap;

use sea_orm::{EntityTrait, Order, Select};
use serde::Serialize;
use utoipa::ToSchema;

use crate::core::fields::{AllowedFields, resource_name};
use crate::errors::{ConfigError, QueryError};
use crate::filtering::custom::{CustomFilterInput, CustomFilters, normalize_custom_filters};
use crate::filtering::sort::{DefaultSort, SortSpec, apply_sort, parse_sort_param};
use crate::filtering::{apply_filters, parse_filter_param};
use crate::params::IndexParams;

/// Filter and sort configuration of one entity.
pub struct ResourceQuery<E: EntityTrait> {
    resource: String,
    filterable: AllowedFields<E::Column>,
    sortable: AllowedFields<E::Column>,
    default_sort: SortSpec<E::Column>,
    custom_filters: CustomFilters<Select<E>>,
}

impl<E: EntityTrait> ResourceQuery<E> {
    #[must_use]
    pub fn builder() -> ResourceQueryBuilder<E> {
        ResourceQueryBuilder::new()
    }

    /// Table name of the entity.
    #[must_use]
    pub fn resource(&self) -> &str {
        &self.resource
    }

    #[must_use]
    pub fn filterable(&self) -> &AllowedFields<E::Column> {
        &self.filterable
    }

    #[must_use]
    pub fn sortable(&self) -> &AllowedFields<E::Column> {
        &self.sortable
    }

    #[must_use]
    pub fn default_sort(&self) -> &SortSpec<E::Column> {
        &self.default_sort
    }

    #[must_use]
    pub fn custom_filters(&self) -> &CustomFilters<Select<E>> {
        &self.custom_filters
    }

    /// Apply the request's filter parameter.
    ///
    /// # Errors
    ///
    /// Any [`QueryError`] raised while parsing or applying the filter. Nothing
    /// is applied when an error is returned.
    pub fn filter(&self, select: Select<E>, params: &IndexParams) -> Result<Select<E>, QueryError> {
        let mapping =
            parse_filter_param(&params.filter, &(&self.filterable, &self.custom_filters))?;
        if mapping.is_empty() {
            return Ok(select);
        }
        tracing::debug!(resource = %self.resource, fields = mapping.len(), "filtering");
        apply_filters(select, &mapping, &self.filterable, &self.custom_filters)
    }

    /// Apply the request's sort parameter, or the default ordering when there
    /// is none.
    ///
    /// # Errors
    ///
    /// [`QueryError::InvalidSortField`] or [`QueryError::MalformedParameter`].
    pub fn sort(&self, select: Select<E>, params: &IndexParams) -> Result<Select<E>, QueryError> {
        match params.sort_param() {
            Some(raw) => {
                let spec = parse_sort_param(raw, &self.sortable)?;
                Ok(apply_sort(select, &spec))
            }
            None => Ok(apply_sort(select, &self.default_sort)),
        }
    }

    /// Filter, then sort.
    ///
    /// # Errors
    ///
    /// See [`Self::filter`] and [`Self::sort`]. The sort parameter is
    /// validated even when filtering succeeds, so a request fails as a whole.
    pub fn handle_index_request(
        &self,
        params: &IndexParams,
        select: Select<E>,
    ) -> Result<Select<E>, QueryError> {
        let filtered = self.filter(select, params)?;
        self.sort(filtered, params)
    }

    /// What clients may send to this resource.
    #[must_use]
    pub fn describe(&self) -> QueryDescription {
        let mut custom_filters: Vec<CustomFilterDescription> = self
            .custom_filters
            .iter()
            .map(|(name, filter)| CustomFilterDescription {
                name: name.clone(),
                description: filter.description.clone(),
                allowed_values: filter.allowed_values.listed().map(<[String]>::to_vec),
            })
            .collect();
        custom_filters.sort_by(|a, b| a.name.cmp(&b.name));

        QueryDescription {
            resource: self.resource.clone(),
            filterable: self.filterable.names().map(str::to_owned).collect(),
            sortable: self.sortable.names().map(str::to_owned).collect(),
            custom_filters,
            default_sort: self
                .default_sort
                .iter()
                .map(|field| SortDescription {
                    field: field.field.clone(),
                    direction: match field.direction {
                        Order::Desc => SortDirection::Desc,
                        _ => SortDirection::Asc,
                    },
                })
                .collect(),
        }
    }
}

/// Builder for [`ResourceQuery`]; every setting has a default.
pub struct ResourceQueryBuilder<E: EntityTrait> {
    filterable: Option<AllowedFields<E::Column>>,
    sortable: Option<AllowedFields<E::Column>>,
    default_sort: DefaultSort,
    custom_filters: Vec<(String, CustomFilterInput<Select<E>>)>,
}

impl<E: EntityTrait> ResourceQueryBuilder<E> {
    fn new() -> Self {
        Self {
            filterable: None,
            sortable: None,
            default_sort: DefaultSort::default(),
            custom_filters: Vec::new(),
        }
    }

    /// Fields accepted by the filter parameter. Defaults to every column.
    #[must_use]
    pub fn filterable(mut self, fields: AllowedFields<E::Column>) -> Self {
        self.filterable = Some(fields);
        self
    }

    /// Fields accepted by the sort parameter. Defaults to every column.
    #[must_use]
    pub fn sortable(mut self, fields: AllowedFields<E::Column>) -> Self {
        self.sortable = Some(fields);
        self
    }

    /// Ordering used when a request has no sort parameter. Defaults to `id`
    /// descending when the entity has an `id` column.
    #[must_use]
    pub fn default_sort(mut self, default_sort: impl Into<DefaultSort>) -> Self {
        self.default_sort = default_sort.into();
        self
    }

    #[must_use]
    pub fn custom_filter(
        mut self,
        name: impl Into<String>,
        filter: impl Into<CustomFilterInput<Select<E>>>,
    ) -> Self {
        self.custom_filters.push((name.into(), filter.into()));
        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::EmptyFilterName`] for a custom filter with a blank name.
    /// - [`ConfigError::DuplicateCustomFilter`] for a name declared twice.
    /// - [`ConfigError::UnknownDefaultSortField`] when the default sort uses a
    ///   field that isn't sortable.
    pub fn build(self) -> Result<ResourceQuery<E>, ConfigError> {
        let resource = resource_name::<E>();
        let filterable = self.filterable.unwrap_or_else(AllowedFields::all);
        let sortable = self.sortable.unwrap_or_else(AllowedFields::all);
        let default_sort = self.default_sort.resolve(&sortable)?;

        let mut inputs = HashMap::with_capacity(self.custom_filters.len());
        for (name, input) in self.custom_filters {
            if name.trim().is_empty() {
                return Err(ConfigError::EmptyFilterName { resource });
            }
            if inputs.contains_key(&name) {
                return Err(ConfigError::DuplicateCustomFilter { resource, name });
            }
            inputs.insert(name, input);
        }
        let custom_filters = normalize_custom_filters(inputs);

        tracing::debug!(
            resource = %resource,
            filterable = filterable.len(),
            sortable = sortable.len(),
            custom_filters = custom_filters.len(),
            "configured resource query"
        );

        Ok(ResourceQuery {
            resource,
            filterable,
            sortable,
            default_sort,
            custom_filters,
        })
    }
}

/// Sort direction as shown to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct SortDescription {
    pub field: String,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct CustomFilterDescription {
    pub name: String,
    pub description: String,
    /// Accepted values, when they are a fixed list. Absent when any value is
    /// accepted or the list is computed per request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_values: Option<Vec<String>>,
}

/// Filter and sort capabilities of a resource, served at `GET <resource>/filters`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct QueryDescription {
    pub resource: String,
    pub filterable: Vec<String>,
    pub sortable: Vec<String>,
    pub custom_filters: Vec<CustomFilterDescription>,
    pub default_sort: Vec<SortDescription>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::QueryCollection;
    use crate::fixtures::{tags, users};
    use sea_orm::{ColumnTrait, Condition, DbBackend, QueryTrait};

    fn sql(select: Select<users::Entity>) -> String {
        select.build(DbBackend::Sqlite).to_string()
    }

    fn users_query() -> ResourceQuery<users::Entity> {
        ResourceQuery::builder()
            .filterable(AllowedFields::except(&["email"]).unwrap())
            .custom_filter(
                "with_the_letter",
                CustomFilterInput::predicate(|q: Select<users::Entity>, values: &[String]| {
                    values.iter().fold(q, |q, value| {
                        let contains = users::Column::Login.contains(value);
                        q.where_condition(Condition::all().add(contains))
                    })
                })
                .description("Logins containing every given letter"),
            )
            .custom_filter(
                "status",
                CustomFilterInput::with_values(
                    |q: Select<users::Entity>, values: &[String]| {
                        q.where_equals(users::Column::Active, (values[0] == "active").into())
                    },
                    ["active", "inactive"],
                ),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_defaults() {
        let query = ResourceQuery::<users::Entity>::builder().build().unwrap();
        assert_eq!(query.resource(), "users");
        assert_eq!(
            query.filterable().names().collect::<Vec<_>>(),
            vec!["id", "login", "email", "active"]
        );
        assert_eq!(query.sortable().len(), 4);
        assert_eq!(query.default_sort().directions(), vec![("id", Order::Desc)]);
        assert!(query.custom_filters().is_empty());
    }

    #[test]
    fn test_entity_without_id_has_no_default_sort() {
        let query = ResourceQuery::<tags::Entity>::builder().build().unwrap();
        assert!(query.default_sort().is_empty());
        let sql = query
            .handle_index_request(&IndexParams::default(), tags::Entity::find())
            .unwrap()
            .build(DbBackend::Sqlite)
            .to_string();
        assert!(!sql.contains("ORDER BY"), "{sql}");
    }

    #[test]
    fn test_unknown_default_sort_field() {
        let err = ResourceQuery::<users::Entity>::builder()
            .sortable(AllowedFields::only(&["login"]).unwrap())
            .default_sort(("id", Order::Desc))
            .build()
            .err()
            .unwrap();
        assert_eq!(
            err,
            ConfigError::UnknownDefaultSortField {
                resource: "users".into(),
                field: "id".into()
            }
        );
    }

    #[test]
    fn test_implicit_default_sort_needs_sortable_id() {
        let query = ResourceQuery::<users::Entity>::builder()
            .sortable(AllowedFields::only(&["login"]).unwrap())
            .build()
            .unwrap();
        assert!(query.default_sort().is_empty());
    }

    #[test]
    fn test_custom_filter_name_errors() {
        let identity = |q: Select<users::Entity>, _: &[String]| q;

        let err = ResourceQuery::<users::Entity>::builder()
            .custom_filter(" ", CustomFilterInput::predicate(identity))
            .build()
            .err()
            .unwrap();
        assert_eq!(err, ConfigError::EmptyFilterName { resource: "users".into() });

        let err = ResourceQuery::<users::Entity>::builder()
            .custom_filter("dup", CustomFilterInput::predicate(identity))
            .custom_filter("dup", CustomFilterInput::predicate(identity))
            .build()
            .err()
            .unwrap();
        assert_eq!(
            err,
            ConfigError::DuplicateCustomFilter {
                resource: "users".into(),
                name: "dup".into()
            }
        );
    }

    #[test]
    fn test_no_params_applies_default_sort_only() {
        let sql = sql(users_query()
            .handle_index_request(&IndexParams::default(), users::Entity::find())
            .unwrap());
        assert!(!sql.contains("WHERE"), "{sql}");
        assert!(sql.ends_with(r#"ORDER BY "users"."id" DESC"#), "{sql}");
    }

    #[test]
    fn test_filter_then_sort() {
        let params = IndexParams::default()
            .with_filter_field("login", "andre,fred")
            .with_sort("-login,id");
        let sql = sql(users_query()
            .handle_index_request(&params, users::Entity::find())
            .unwrap());
        assert!(
            sql.ends_with(concat!(
                r#"WHERE "users"."login" IN ('andre', 'fred') "#,
                r#"ORDER BY "users"."login" DESC, "users"."id" ASC"#
            )),
            "{sql}"
        );
    }

    #[test]
    fn test_explicit_sort_replaces_default() {
        let params = IndexParams::default().with_sort("login");
        let sql = sql(users_query().sort(users::Entity::find(), &params).unwrap());
        assert!(sql.ends_with(r#"ORDER BY "users"."login" ASC"#), "{sql}");
        assert!(!sql.contains(r#""users"."id" DESC"#));
    }

    #[test]
    fn test_filter_field_outside_filterable_set() {
        let params = IndexParams::default().with_filter_field("email", "x");
        let err = users_query()
            .handle_index_request(&params, users::Entity::find())
            .unwrap_err();
        assert_eq!(err, QueryError::InvalidFilterField("email".into()));
    }

    #[test]
    fn test_invalid_sort_fails_whole_request() {
        let params = IndexParams::default()
            .with_filter_field("login", "andre")
            .with_sort("password");
        let err = users_query()
            .handle_index_request(&params, users::Entity::find())
            .unwrap_err();
        assert_eq!(err, QueryError::InvalidSortField("password".into()));
    }

    #[test]
    fn test_custom_filters_through_params() {
        let params = IndexParams::default().with_filter_json(r#"{"with_the_letter":"a,n"}"#);
        let sql = sql(users_query()
            .filter(users::Entity::find(), &params)
            .unwrap());
        assert!(
            sql.contains(r#""users"."login" LIKE '%a%' AND "users"."login" LIKE '%n%'"#),
            "{sql}"
        );

        let params = IndexParams::default().with_filter_field("status", "asleep");
        assert_eq!(
            users_query()
                .filter(users::Entity::find(), &params)
                .unwrap_err(),
            QueryError::InvalidFilterValue {
                field: "status".into(),
                value: "asleep".into()
            }
        );
    }

    #[test]
    fn test_describe() {
        let description = users_query().describe();
        assert_eq!(description.resource, "users");
        assert_eq!(description.filterable, vec!["id", "login", "active"]);
        assert_eq!(description.sortable, vec!["id", "login", "email", "active"]);
        assert_eq!(
            description.default_sort,
            vec![SortDescription {
                field: "id".into(),
                direction: SortDirection::Desc
            }]
        );
        assert_eq!(
            description.custom_filters,
            vec![
                CustomFilterDescription {
                    name: "status".into(),
                    description: String::new(),
                    allowed_values: Some(vec!["active".into(), "inactive".into()]),
                },
                CustomFilterDescription {
                    name: "with_the_letter".into(),
                    description: "Logins containing every given letter".into(),
                    allowed_values: None,
                },
            ]
        );
    }

    #[test]
    fn test_describe_serializes() {
        let json = serde_json::to_value(users_query().describe()).unwrap();
        assert_eq!(json["default_sort"][0]["direction"], "desc");
        assert!(json["custom_filters"][1].get("allowed_values").is_none());
    }
}
