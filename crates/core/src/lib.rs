pub mod error;
pub mod severity;
pub mod validation;
pub mod value;
pub mod wrapped;

pub use error::TypeError;
pub use severity::Severity;
pub use validation::{FieldFailure, FieldIssue, Validation, ValidationFailure, collect_failures};
pub use value::{Value, ValueMap, lookup_path};
pub use wrapped::{FieldType, Primitive, TypeRef, WrappedType};
