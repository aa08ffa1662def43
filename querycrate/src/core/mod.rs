// Collection capability and allowed-field sets

pub mod collection;
pub mod fields;

pub use collection::{QueryCollection, coerce_value};
pub use fields::{AllowedFields, FieldSet};
