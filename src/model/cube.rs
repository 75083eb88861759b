use crate::model::{Dimension, JoinSpec, Measure};
use crate::query_context::QueryContext;
use crate::sql::Expr;
use std::collections::HashMap;
use std::sync::Arc;

/// A static join baked into a cube's `sqlSource`, distinct from the
/// declarative `JoinSpec`s the planner reasons about — these exist purely
/// to shape the root table the cube's own columns are read from (e.g. a
/// cube backed by a view joining two physical tables).
#[derive(Debug, Clone)]
pub struct StaticJoin {
    pub table: String,
    pub on: Expr,
}

/// The root table, any static joins, and the security-bound `WHERE`
/// predicate a cube's columns are read through. Every `Cube::sql_source`
/// invocation must produce a predicate derived from the caller's
/// `SecurityContext` — building SQL that bypasses this path is a
/// programming error in the cube definition, not something the compiler
/// can detect structurally, so cube authors are expected to thread the
/// context through.
#[derive(Debug, Clone)]
pub struct BaseQuery {
    pub table: String,
    pub joins: Vec<StaticJoin>,
    pub security_predicate: Expr,
}

impl BaseQuery {
    pub fn table(table: impl Into<String>, security_predicate: Expr) -> Self {
        BaseQuery {
            table: table.into(),
            joins: Vec::new(),
            security_predicate,
        }
    }
}

pub type SqlSource = Arc<dyn Fn(&QueryContext) -> BaseQuery + Send + Sync>;

/// A named logical table: typed dimensions and measures over a
/// tenant-scoped row source.
#[derive(Clone)]
pub struct Cube {
    pub name: String,
    pub title: String,
    pub description: Option<String>,
    pub sql_source: SqlSource,
    pub dimensions: HashMap<String, Dimension>,
    pub measures: HashMap<String, Measure>,
    pub joins: HashMap<String, JoinSpec>,
}

impl std::fmt::Debug for Cube {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cube")
            .field("name", &self.name)
            .field("title", &self.title)
            .field("dimensions", &self.dimensions.keys().collect::<Vec<_>>())
            .field("measures", &self.measures.keys().collect::<Vec<_>>())
            .field("joins", &self.joins.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Cube {
    pub fn new(name: impl Into<String>, sql_source: SqlSource) -> Self {
        let name = name.into();
        let title = name.clone();
        Cube {
            name,
            title,
            description: None,
            sql_source,
            dimensions: HashMap::new(),
            measures: HashMap::new(),
            joins: HashMap::new(),
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_dimension(mut self, dimension: Dimension) -> Self {
        self.dimensions.insert(dimension.name.clone(), dimension);
        self
    }

    pub fn with_measure(mut self, measure: Measure) -> Self {
        self.measures.insert(measure.name.clone(), measure);
        self
    }

    pub fn with_join(mut self, join: JoinSpec) -> Self {
        self.joins.insert(join.target_cube.clone(), join);
        self
    }

    pub fn primary_key(&self) -> Option<&Dimension> {
        self.dimensions.values().find(|d| d.primary_key)
    }
}
