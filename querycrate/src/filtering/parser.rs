use serde_json::Value as JsonValue;

use crate::core::fields::FieldSet;
use crate::errors::QueryError;
use crate::params::{FILTER_PARAM, RawFilter};

/// Separator between the values of one filter field.
pub const VALUE_DELIMITER: char = ',';

/// The values of one filter field, in the order they appeared.
pub type FilterValue = Vec<String>;

/// Validated filter parameter: field name → values.
///
/// Keys are unique and iterate in order of first appearance. Inserting an
/// existing key replaces its values in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterMapping {
    entries: Vec<(String, FilterValue)>,
}

impl FilterMapping {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, values: FilterValue) {
        let field = field.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == field) {
            Some((_, existing_values)) => *existing_values = values,
            None => self.entries.push((field, values)),
        }
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == field)
            .map(|(_, values)| values.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(field, values)| (field.as_str(), values.as_slice()))
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(field, _)| field.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for FilterMapping
where
    K: Into<String>,
    V: IntoIterator,
    V::Item: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut mapping = Self::new();
        for (field, values) in iter {
            mapping.insert(field, values.into_iter().map(Into::into).collect());
        }
        mapping
    }
}

/// Split a raw value on [`VALUE_DELIMITER`]. Empty segments and duplicates
/// are kept as they are.
#[must_use]
pub fn split_values(raw: &str) -> FilterValue {
    raw.split(VALUE_DELIMITER).map(str::to_owned).collect()
}

/// Parse the raw filter parameter into a [`FilterMapping`], rejecting any
/// field the `allowed` set doesn't know.
///
/// # Errors
///
/// - [`QueryError::InvalidFilterField`] for the first unknown field.
/// - [`QueryError::MalformedParameter`] when a JSON filter isn't an object of
///   scalar (or non-empty scalar array) values.
pub fn parse_filter_param(
    raw: &RawFilter,
    allowed: &impl FieldSet,
) -> Result<FilterMapping, QueryError> {
    if raw.is_empty() {
        return Ok(FilterMapping::new());
    }

    let mut mapping = FilterMapping::new();
    for (field, value) in raw_entries(raw)? {
        if !allowed.contains_field(&field) {
            tracing::debug!(field = %field, "rejecting unknown filter field");
            return Err(QueryError::InvalidFilterField(field));
        }
        mapping.insert(field, split_values(&value));
    }

    Ok(mapping)
}

fn raw_entries(raw: &RawFilter) -> Result<Vec<(String, String)>, QueryError> {
    match raw {
        RawFilter::Absent => Ok(Vec::new()),
        RawFilter::Fields(fields) => Ok(fields.clone()),
        RawFilter::Json(text) => parse_filter_json(text),
    }
}

fn parse_filter_json(text: &str) -> Result<Vec<(String, String)>, QueryError> {
    let parsed: JsonValue = serde_json::from_str(text)
        .map_err(|e| QueryError::malformed(FILTER_PARAM, format!("invalid JSON: {e}")))?;

    let JsonValue::Object(object) = parsed else {
        return Err(QueryError::malformed(FILTER_PARAM, "expected a JSON object"));
    };

    object
        .into_iter()
        .map(|(field, value)| {
            let text = json_value_text(&value).ok_or_else(|| {
                QueryError::malformed(
                    FILTER_PARAM,
                    format!("unsupported value for '{field}'"),
                )
            })?;
            Ok((field, text))
        })
        .collect()
}

/// Render a JSON value the way it would have appeared in the query string.
fn json_value_text(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(text) => Some(text.clone()),
        JsonValue::Number(number) => Some(number.to_string()),
        JsonValue::Bool(flag) => Some(flag.to_string()),
        JsonValue::Array(items) if items.is_empty() => None,
        JsonValue::Array(items) => {
            let parts = items
                .iter()
                .map(|item| match item {
                    JsonValue::Array(_) | JsonValue::Object(_) | JsonValue::Null => None,
                    scalar => json_value_text(scalar),
                })
                .collect::<Option<Vec<_>>>()?;
            Some(parts.join(VALUE_DELIMITER.to_string().as_str()))
        }
        JsonValue::Null | JsonValue::Object(_) => None,
    }
}
