//! The per-request context threaded through planning and SQL generation.

use crate::model::SecurityContext;
use crate::sql::Dialect;

/// Carries the caller's security scope and the target dialect through one
/// request. Built once per incoming query and passed by reference into
/// every `sqlSource` closure, the filter compiler, and the builder.
#[derive(Debug, Clone)]
pub struct QueryContext {
    pub security: SecurityContext,
    pub dialect: Dialect,
}

impl QueryContext {
    pub fn new(security: SecurityContext, dialect: Dialect) -> Self {
        QueryContext { security, dialect }
    }
}
