use crate::model::types::MeasureFormat;
use crate::query_context::QueryContext;
use crate::sql::Expr;
use std::sync::Arc;

/// A row-level predicate applied before aggregation, expressed as a
/// function of the query context so it can incorporate the caller's
/// security scope (e.g. "only count orders placed by this tenant's own
/// staff").
pub type RowFilter = Arc<dyn Fn(&QueryContext) -> Expr + Send + Sync>;

/// The aggregation a measure performs. `Calculated` carries a template
/// string with `{Cube.member}` placeholders rather than a column
/// reference.
#[derive(Clone)]
pub enum MeasureKind {
    Count,
    CountDistinct,
    Sum,
    Avg,
    Min,
    Max,
    Stddev,
    Variance,
    Percentile(f64),
    Calculated(String),
}

impl std::fmt::Debug for MeasureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MeasureKind::Count => write!(f, "Count"),
            MeasureKind::CountDistinct => write!(f, "CountDistinct"),
            MeasureKind::Sum => write!(f, "Sum"),
            MeasureKind::Avg => write!(f, "Avg"),
            MeasureKind::Min => write!(f, "Min"),
            MeasureKind::Max => write!(f, "Max"),
            MeasureKind::Stddev => write!(f, "Stddev"),
            MeasureKind::Variance => write!(f, "Variance"),
            MeasureKind::Percentile(p) => write!(f, "Percentile({p})"),
            MeasureKind::Calculated(t) => write!(f, "Calculated({t:?})"),
        }
    }
}

/// An aggregating expression over rows of (possibly joined) cubes.
#[derive(Clone)]
pub struct Measure {
    pub name: String,
    pub title: String,
    pub short_title: String,
    pub kind: MeasureKind,
    /// Column reference or expression. Ignored for `Calculated` measures,
    /// which instead resolve their template against sibling members.
    pub sql: Option<String>,
    pub format: Option<MeasureFormat>,
    pub filters: Vec<RowFilter>,
}

impl std::fmt::Debug for Measure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Measure")
            .field("name", &self.name)
            .field("title", &self.title)
            .field("kind", &self.kind)
            .field("sql", &self.sql)
            .field("format", &self.format.map(|f| f.as_str()))
            .field("filters", &self.filters.len())
            .finish()
    }
}

impl Measure {
    pub fn new(name: impl Into<String>, kind: MeasureKind, sql: Option<String>) -> Self {
        let name = name.into();
        let title = name.clone();
        Measure {
            short_title: title.clone(),
            name,
            title,
            kind,
            sql,
            format: None,
            filters: Vec::new(),
        }
    }

    pub fn count(name: impl Into<String>) -> Self {
        Measure::new(name, MeasureKind::Count, None)
    }

    pub fn sum(name: impl Into<String>, sql: impl Into<String>) -> Self {
        Measure::new(name, MeasureKind::Sum, Some(sql.into()))
    }

    pub fn calculated(name: impl Into<String>, template: impl Into<String>) -> Self {
        Measure::new(name, MeasureKind::Calculated(template.into()), None)
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn short_title(mut self, short_title: impl Into<String>) -> Self {
        self.short_title = short_title.into();
        self
    }

    pub fn format(mut self, format: MeasureFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn filter(mut self, filter: RowFilter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn is_calculated(&self) -> bool {
        matches!(self.kind, MeasureKind::Calculated(_))
    }

    /// `count(*)` is the only aggregation that accepts an absent expression.
    pub fn requires_sql(&self) -> bool {
        !matches!(self.kind, MeasureKind::Count | MeasureKind::Calculated(_))
    }
}
