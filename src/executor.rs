//! Executor boundary: the core never opens a database connection itself.
//! A host hands it an `Executor` implementation wrapping whatever
//! connection pool/driver it uses; this mirrors the teacher's
//! `MetadataProvider` trait as the RPC/IO seam for an otherwise
//! side-effect-free core.

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::SemLayerError;

/// A single result row, column-name keyed. Column order is preserved via
/// `columns` since `serde_json::Map` iteration order matches insertion
/// order under the `preserve_order` feature only — we don't rely on it.
#[derive(Debug, Clone, Default)]
pub struct RowSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl RowSet {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        RowSet { columns, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Executes generated SQL against a database and returns a rowset. The
/// core builds parameterized queries; a real implementation binds
/// `params` positionally.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(
        &self,
        sql: &str,
        params: &[Value],
        cancel: CancellationToken,
    ) -> Result<RowSet, SemLayerError>;
}

/// In-memory executor for tests: returns a fixed rowset regardless of the
/// query, optionally recording the SQL/params it was called with.
#[derive(Debug, Default)]
pub struct MockExecutor {
    fixture: RowSet,
}

impl MockExecutor {
    pub fn new(fixture: RowSet) -> Self {
        MockExecutor { fixture }
    }

    pub fn empty() -> Self {
        MockExecutor::default()
    }
}

#[async_trait]
impl Executor for MockExecutor {
    async fn execute(
        &self,
        _sql: &str,
        _params: &[Value],
        cancel: CancellationToken,
    ) -> Result<RowSet, SemLayerError> {
        if cancel.is_cancelled() {
            return Err(SemLayerError::ExecutionFailed(
                "query cancelled".into(),
            ));
        }
        Ok(self.fixture.clone())
    }
}
