//! Raw request parameters for index endpoints.
//!
//! # Filtering
//! Two equivalent encodings of the `filter` parameter are accepted:
//! - **Bracketed fields:** `filter[login]=aaubin,qbollach&filter[id]=74`
//! - **JSON object:** `filter={"login":"aaubin,qbollach","id":"74"}`
//!
//! Values are comma-separated lists; a single value means equality, several
//! mean inclusion. An empty `filter=` is the same as no filter at all.
//!
//! # Sorting
//! The `sort` parameter is a comma-separated list of fields, each optionally
//! prefixed with `-` for descending order: `sort=-id,login`. Fields apply in
//! the order given.

use utoipa::IntoParams;

use crate::errors::QueryError;

pub const FILTER_PARAM: &str = "filter";
pub const SORT_PARAM: &str = "sort";

/// The filter parameter exactly as it arrived, before any validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RawFilter {
    /// No filter parameter was sent.
    #[default]
    Absent,
    /// `filter=<text>`; either empty or a JSON object whose values are
    /// scalars or non-empty arrays of scalars.
    Json(String),
    /// `filter[field]=value` pairs, in query-string order.
    Fields(Vec<(String, String)>),
}

impl RawFilter {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Absent => true,
            Self::Json(text) => text.trim().is_empty(),
            Self::Fields(fields) => fields.is_empty(),
        }
    }
}

/// Wire shape of the index query string, for the OpenAPI document.
///
/// Requests are read into [`IndexParams`] instead, which also understands the
/// `filter[field]=value` form.
#[derive(Debug, Clone, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct IndexQuery {
    /// JSON object of field to comma-separated values, e.g. `{"login":"andre,fred"}`.
    /// `filter[login]=andre,fred` is accepted too.
    pub filter: Option<String>,
    /// Comma-separated fields, `-` prefix for descending, e.g. `-id,login`.
    pub sort: Option<String>,
}

/// Filter and sort parameters of one index request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexParams {
    pub filter: RawFilter,
    pub sort: Option<String>,
}

impl IndexParams {
    /// Collect the filter and sort parameters out of decoded query pairs.
    ///
    /// Unrelated parameters (`format`, `page`, ...) are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::MalformedParameter`] for a bracketed key that isn't
    /// of the form `filter[field]`, or when the JSON and bracketed forms are
    /// mixed in one request.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, QueryError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut params = Self::default();

        for (key, value) in pairs {
            let key = key.as_ref();
            if key == FILTER_PARAM {
                if matches!(params.filter, RawFilter::Fields(_)) {
                    return Err(mixed_forms());
                }
                params.filter = RawFilter::Json(value.into());
            } else if let Some(rest) = key
                .strip_prefix(FILTER_PARAM)
                .filter(|rest| rest.starts_with('['))
            {
                let field = bracketed_field(rest)?;
                match &mut params.filter {
                    RawFilter::Absent => {
                        params.filter = RawFilter::Fields(vec![(field.to_owned(), value.into())]);
                    }
                    RawFilter::Fields(fields) => fields.push((field.to_owned(), value.into())),
                    RawFilter::Json(_) => return Err(mixed_forms()),
                }
            } else if key == SORT_PARAM {
                params.sort = Some(value.into());
            } else {
                tracing::trace!(param = key, "ignoring unrelated query parameter");
            }
        }

        Ok(params)
    }

    /// Add one `filter[field]=value` entry.
    #[must_use]
    pub fn with_filter_field(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        let entry = (field.into(), value.into());
        match &mut self.filter {
            RawFilter::Fields(fields) => fields.push(entry),
            _ => self.filter = RawFilter::Fields(vec![entry]),
        }
        self
    }

    /// Replace the filter with a JSON-encoded object.
    #[must_use]
    pub fn with_filter_json(mut self, json: impl Into<String>) -> Self {
        self.filter = RawFilter::Json(json.into());
        self
    }

    #[must_use]
    pub fn with_sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    /// The sort parameter, unless it is absent or blank.
    #[must_use]
    pub fn sort_param(&self) -> Option<&str> {
        self.sort.as_deref().filter(|sort| !sort.trim().is_empty())
    }
}

fn bracketed_field(rest: &str) -> Result<&str, QueryError> {
    rest.strip_prefix('[')
        .and_then(|inner| inner.strip_suffix(']'))
        .filter(|field| !field.is_empty() && !field.contains(['[', ']']))
        .ok_or_else(|| {
            QueryError::malformed(
                FILTER_PARAM,
                format!("expected 'filter[field]', got 'filter{rest}'"),
            )
        })
}

fn mixed_forms() -> QueryError {
    QueryError::malformed(
        FILTER_PARAM,
        "use either filter=<json> or filter[field]=<value>, not both",
    )
}
