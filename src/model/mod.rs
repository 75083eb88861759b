//! Cube data model: typed cube definitions (dimensions, measures, joins)
//! with security-context-bound row filters.

pub mod cube;
pub mod dimension;
pub mod join;
pub mod measure;
pub mod security;
pub mod types;

pub use cube::{BaseQuery, Cube, SqlSource, StaticJoin};
pub use dimension::Dimension;
pub use join::{JoinKey, JoinSpec, Relationship};
pub use measure::{Measure, MeasureKind, RowFilter};
pub use security::SecurityContext;
pub use types::{FieldType, MeasureFormat};
