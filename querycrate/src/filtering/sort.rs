use sea_orm::{ColumnTrait, Order};

use crate::core::collection::QueryCollection;
use crate::core::fields::{AllowedFields, resource_name};
use crate::errors::{ConfigError, QueryError};
use crate::params::SORT_PARAM;

const FIELD_DELIMITER: char = ',';
const DESCENDING_PREFIX: char = '-';
const ASCENDING_PREFIX: char = '+';

/// One field of a sort specification.
#[derive(Debug, Clone)]
pub struct SortField<C> {
    pub field: String,
    pub column: C,
    pub direction: Order,
}

/// Ordered list of sort fields; later fields break ties of earlier ones.
#[derive(Debug, Clone)]
pub struct SortSpec<C> {
    fields: Vec<SortField<C>>,
}

impl<C> Default for SortSpec<C> {
    fn default() -> Self {
        Self { fields: Vec::new() }
    }
}

impl<C: ColumnTrait> SortSpec<C> {
    /// Add a field. A field that is already present keeps its position and
    /// takes the new direction.
    pub fn push(&mut self, field: impl Into<String>, column: C, direction: Order) {
        let field = field.into();
        match self.fields.iter_mut().find(|existing| existing.field == field) {
            Some(existing) => existing.direction = direction,
            None => self.fields.push(SortField {
                field,
                column,
                direction,
            }),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &SortField<C>> {
        self.fields.iter()
    }

    /// Field names and directions, mostly for assertions and logging.
    #[must_use]
    pub fn directions(&self) -> Vec<(&str, Order)> {
        self.fields
            .iter()
            .map(|field| (field.field.as_str(), field.direction.clone()))
            .collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Default ordering of a resource, applied when a request has no sort
/// parameter.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum DefaultSort {
    /// `id` descending when the entity has an `id` column, nothing otherwise.
    #[default]
    Implicit,
    /// No ordering at all.
    Unsorted,
    /// Explicit fields in priority order.
    Fields(Vec<(String, Order)>),
}

impl DefaultSort {
    /// Resolve against the sortable fields of the resource.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownDefaultSortField`] if an explicit field is
    /// not sortable.
    pub fn resolve<C: ColumnTrait>(
        &self,
        sortable: &AllowedFields<C>,
    ) -> Result<SortSpec<C>, ConfigError> {
        let mut spec = SortSpec::default();
        match self {
            Self::Unsorted => {}
            Self::Implicit => {
                if let Some(column) = sortable.column("id") {
                    spec.push("id", column, Order::Desc);
                }
            }
            Self::Fields(fields) => {
                for (field, direction) in fields {
                    let column = sortable.column(field).ok_or_else(|| {
                        ConfigError::UnknownDefaultSortField {
                            resource: resource_name::<C::EntityName>(),
                            field: field.clone(),
                        }
                    })?;
                    spec.push(field.as_str(), column, direction.clone());
                }
            }
        }
        Ok(spec)
    }
}

/// A single field sorts ascending.
impl From<&str> for DefaultSort {
    fn from(field: &str) -> Self {
        Self::Fields(vec![(field.to_owned(), Order::Asc)])
    }
}

impl From<(&str, Order)> for DefaultSort {
    fn from((field, direction): (&str, Order)) -> Self {
        Self::Fields(vec![(field.to_owned(), direction)])
    }
}

impl<const N: usize> From<[(&str, Order); N]> for DefaultSort {
    fn from(fields: [(&str, Order); N]) -> Self {
        Self::Fields(
            fields
                .into_iter()
                .map(|(field, direction)| (field.to_owned(), direction))
                .collect(),
        )
    }
}

/// Convert a sort order string to [`Order`], case-insensitively.
fn parse_order(sort_order: &str) -> Option<Order> {
    match sort_order.to_uppercase().as_str() {
        "ASC" => Some(Order::Asc),
        "DESC" => Some(Order::Desc),
        _ => None,
    }
}

/// Split a `-field` / `+field` / `field` token into name and direction.
fn parse_sort_token(token: &str) -> (&str, Order) {
    if let Some(field) = token.strip_prefix(DESCENDING_PREFIX) {
        (field, Order::Desc)
    } else if let Some(field) = token.strip_prefix(ASCENDING_PREFIX) {
        (field, Order::Asc)
    } else {
        (token, Order::Asc)
    }
}

/// Parse `["column", "ASC"]`, the format React Admin sends.
fn parse_json_sort(json: &str) -> Result<Vec<(String, Order)>, QueryError> {
    let sort_vec: Vec<String> = serde_json::from_str(json)
        .map_err(|e| QueryError::malformed(SORT_PARAM, format!("invalid JSON: {e}")))?;

    match sort_vec.as_slice() {
        [field] => Ok(vec![(field.clone(), Order::Asc)]),
        [field, order] => parse_order(order)
            .map(|direction| vec![(field.clone(), direction)])
            .ok_or_else(|| {
                QueryError::malformed(SORT_PARAM, format!("unknown sort order '{order}'"))
            }),
        _ => Err(QueryError::malformed(
            SORT_PARAM,
            "expected [\"column\"] or [\"column\", \"ASC|DESC\"]",
        )),
    }
}

/// Parse a sort parameter like `-id,login` against the sortable fields.
///
/// Whitespace around fields is ignored, as are empty segments.
///
/// # Errors
///
/// - [`QueryError::InvalidSortField`] for the first field that isn't sortable.
/// - [`QueryError::MalformedParameter`] for a bad JSON array sort.
pub fn parse_sort_param<C: ColumnTrait>(
    raw: &str,
    allowed: &AllowedFields<C>,
) -> Result<SortSpec<C>, QueryError> {
    let raw = raw.trim();
    let fields: Vec<(String, Order)> = if raw.starts_with('[') {
        parse_json_sort(raw)?
    } else {
        raw.split(FIELD_DELIMITER)
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(|token| {
                let (field, direction) = parse_sort_token(token);
                (field.to_owned(), direction)
            })
            .collect()
    };

    let mut spec = SortSpec::default();
    for (field, direction) in fields {
        let Some(column) = allowed.column(&field) else {
            tracing::debug!(field = %field, "rejecting unknown sort field");
            return Err(QueryError::InvalidSortField(field));
        };
        spec.push(field, column, direction);
    }

    Ok(spec)
}

/// Apply the sort fields in order.
pub fn apply_sort<Q: QueryCollection>(collection: Q, spec: &SortSpec<Q::Column>) -> Q {
    spec.iter().fold(collection, |collection, field| {
        tracing::debug!(field = %field.field, direction = ?field.direction, "applying sort");
        collection.order_by_column(field.column, field.direction.clone())
    })
}
