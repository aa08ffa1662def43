use sea_orm::{
    ColumnTrait, ColumnType, Condition, EntityTrait, Order, QueryFilter, QueryOrder, Select, Value,
};
use uuid::Uuid;

/// The query capability the filter and sort engines build on.
///
/// Every method consumes the collection and returns a new handle, so
/// constraints compose by sequential application and nothing is mutated in
/// place. Custom filter predicates receive a collection and are expected to
/// return one built from these methods (or the underlying query API).
pub trait QueryCollection: Sized {
    type Column: ColumnTrait;

    /// Constrain `column = value`
    #[must_use]
    fn where_equals(self, column: Self::Column, value: Value) -> Self;

    /// Constrain `column IN (values)`
    #[must_use]
    fn where_in(self, column: Self::Column, values: Vec<Value>) -> Self;

    /// Constrain `NOT (condition)`
    #[must_use]
    fn where_not(self, condition: Condition) -> Self;

    /// Constrain by an arbitrary condition
    #[must_use]
    fn where_condition(self, condition: Condition) -> Self;

    /// Append an ordering; earlier calls take precedence over later ones.
    #[must_use]
    fn order_by_column(self, column: Self::Column, direction: Order) -> Self;
}

impl<E: EntityTrait> QueryCollection for Select<E> {
    type Column = E::Column;

    fn where_equals(self, column: Self::Column, value: Value) -> Self {
        self.filter(column.eq(value))
    }

    fn where_in(self, column: Self::Column, values: Vec<Value>) -> Self {
        self.filter(column.is_in(values))
    }

    fn where_not(self, condition: Condition) -> Self {
        self.filter(condition.not())
    }

    fn where_condition(self, condition: Condition) -> Self {
        self.filter(condition)
    }

    fn order_by_column(self, column: Self::Column, direction: Order) -> Self {
        self.order_by(column, direction)
    }
}

/// Convert a raw string parameter into a value matching the column type.
///
/// Values that don't parse as the column type are bound as text, leaving the
/// comparison to the database.
#[must_use]
pub fn coerce_value<C: ColumnTrait>(column: &C, raw: &str) -> Value {
    let column_def = column.def();
    match column_def.get_column_type() {
        ColumnType::TinyInteger
        | ColumnType::SmallInteger
        | ColumnType::Integer
        | ColumnType::BigInteger => raw
            .parse::<i64>()
            .map_or_else(|_| text_value(raw), Value::from),
        ColumnType::TinyUnsigned
        | ColumnType::SmallUnsigned
        | ColumnType::Unsigned
        | ColumnType::BigUnsigned => raw
            .parse::<u64>()
            .map_or_else(|_| text_value(raw), Value::from),
        ColumnType::Float | ColumnType::Double => raw
            .parse::<f64>()
            .map_or_else(|_| text_value(raw), Value::from),
        ColumnType::Boolean => parse_bool(raw).map_or_else(|| text_value(raw), Value::from),
        ColumnType::Uuid => Uuid::parse_str(raw).map_or_else(|_| text_value(raw), Value::from),
        _ => text_value(raw),
    }
}

fn text_value(raw: &str) -> Value {
    Value::from(raw.to_owned())
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}
