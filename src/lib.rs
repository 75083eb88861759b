//! # semlayer
//!
//! A semantic layer compiler: accepts declarative JSON-shaped analytics
//! queries against named cubes, plans execution across cubes by resolving
//! joins, generates dialect-specific SQL, executes it through an injected
//! executor, and returns Cube.js-compatible annotated results.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                  Query (input JSON shape)                │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [registry resolves fields]
//! ┌─────────────────────────────────────────────────────────┐
//! │              CubeRegistry (cubes, joins, security)       │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [planner]
//! ┌─────────────────────────────────────────────────────────┐
//! │     Plan (primary cube, join path, pre-agg CTEs)         │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [sql builder + dialect adapter]
//! ┌─────────────────────────────────────────────────────────┐
//! │                    sql::Query (AST)                      │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [executor]
//! ┌─────────────────────────────────────────────────────────┐
//! │         RowSet -> ResultAnnotator -> ResponseEnvelope    │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod analyses;
pub mod annotate;
pub mod builder;
pub mod config;
pub mod envelope;
pub mod error;
pub mod executor;
pub mod filter;
pub mod input;
pub mod model;
pub mod planner;
pub mod query_context;
pub mod registry;
pub mod sql;

/// Re-exports for convenient usage, mirroring the shape of the `sql` module's
/// own prelude but widened to the whole compiler.
pub mod prelude {
    pub use crate::analyses::{
        FlowCompiler, FlowPlan, FlowQuery, FunnelCompiler, FunnelQuery, FunnelStep, JoinStrategy,
        RetentionCompiler, RetentionQuery, RetentionType,
    };
    pub use crate::annotate::ResultAnnotator;
    pub use crate::builder::SqlBuilder;
    pub use crate::envelope::{AnnotationEntry, ResponseEnvelope};
    pub use crate::error::SemLayerError;
    pub use crate::executor::{Executor, MockExecutor, RowSet};
    pub use crate::filter::FilterCompiler;
    pub use crate::input::{FilterTree, Query as InputQuery};
    pub use crate::model::{Cube, Dimension, JoinSpec, Measure, MeasureKind, Relationship};
    pub use crate::planner::{Plan, Planner};
    pub use crate::query_context::QueryContext;
    pub use crate::registry::CubeRegistry;
    pub use crate::sql::{Dialect, SqlDialect};
}
