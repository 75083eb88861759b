//! Funnel analysis: one CTE per step, each narrowing to entities that
//! reached the previous step within its `timeToConvert` window, followed
//! by a single-row conditional-aggregation summary.

use chrono::{DateTime, Utc};

use super::column_expr;
use crate::error::SemLayerError;
use crate::filter::FilterCompiler;
use crate::input::FilterTree;
use crate::query_context::QueryContext;
use crate::registry::{CubeRegistry, MemberKind};
use crate::sql::{lit_int, lit_null, table_col, Cte, Expr, ExprExt, JoinType, Query, SelectExpr, TableRef};

/// One step of a funnel: an optional filter narrowing the events that
/// count as having reached this step, and an optional conversion window
/// measured against the *previous* step's instant.
#[derive(Debug, Clone)]
pub struct FunnelStep {
    pub name: String,
    pub cube: Option<String>,
    pub filter: Option<FilterTree>,
    pub time_to_convert: Option<String>,
}

impl FunnelStep {
    pub fn new(name: impl Into<String>) -> Self {
        FunnelStep {
            name: name.into(),
            cube: None,
            filter: None,
            time_to_convert: None,
        }
    }

    pub fn with_filter(mut self, filter: FilterTree) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_time_to_convert(mut self, duration: impl Into<String>) -> Self {
        self.time_to_convert = Some(duration.into());
        self
    }

    pub fn with_cube(mut self, cube: impl Into<String>) -> Self {
        self.cube = Some(cube.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct FunnelQuery {
    pub steps: Vec<FunnelStep>,
    pub binding_key: String,
    pub time_dimension: String,
    pub include_time_metrics: bool,
}

impl From<crate::input::FunnelStep> for FunnelStep {
    fn from(step: crate::input::FunnelStep) -> Self {
        FunnelStep {
            name: step.name,
            cube: step.cube,
            filter: step.filter,
            time_to_convert: step.time_to_convert,
        }
    }
}

/// Converts the wire-level funnel request into the compiler's own query
/// shape. The wire spec's `timeToConvert` is a funnel-wide default; a step
/// that doesn't set its own window inherits it here rather than at
/// compile time, so `FunnelCompiler` only ever sees a fully-resolved
/// per-step value.
impl From<crate::input::ServerFunnelQuery> for FunnelQuery {
    fn from(wire: crate::input::ServerFunnelQuery) -> Self {
        let spec = wire.funnel;
        let default_ttc = spec.time_to_convert;
        let steps = spec
            .steps
            .into_iter()
            .map(|step| {
                let mut step: FunnelStep = step.into();
                if step.time_to_convert.is_none() {
                    step.time_to_convert = default_ttc.clone();
                }
                step
            })
            .collect();
        FunnelQuery {
            steps,
            binding_key: spec.binding_key,
            time_dimension: spec.time_dimension,
            include_time_metrics: spec.include_time_metrics,
        }
    }
}

pub struct FunnelCompiler<'a> {
    registry: &'a CubeRegistry,
    ctx: &'a QueryContext,
}

impl<'a> FunnelCompiler<'a> {
    pub fn new(registry: &'a CubeRegistry, ctx: &'a QueryContext) -> Self {
        FunnelCompiler { registry, ctx }
    }

    pub fn compile(&self, query: &FunnelQuery, now: DateTime<Utc>) -> Result<Query, SemLayerError> {
        if query.steps.len() < 2 {
            return Err(SemLayerError::InvalidFilter(
                "a funnel needs at least two steps".to_string(),
            ));
        }

        let binding = self.registry.resolve_member(&query.binding_key)?;
        if binding.kind != MemberKind::Dimension {
            return Err(SemLayerError::InvalidFilter(format!(
                "{} is not a dimension",
                query.binding_key
            )));
        }
        let time_dim = self.registry.resolve_member(&query.time_dimension)?;
        if time_dim.kind != MemberKind::Dimension {
            return Err(SemLayerError::InvalidFilter(format!(
                "{} is not a dimension",
                query.time_dimension
            )));
        }

        let filter_compiler = FilterCompiler::new(self.registry, self.ctx);
        let dialect = self.ctx.dialect.dialect();

        let mut ctes = Vec::with_capacity(query.steps.len());
        let mut step_names: Vec<String> = Vec::with_capacity(query.steps.len());
        let mut time_aliases: Vec<String> = Vec::with_capacity(query.steps.len());

        for (i, step) in query.steps.iter().enumerate() {
            let cube_name = step.cube.as_deref().unwrap_or(binding.cube);
            let cube = self.registry.lookup(cube_name)?;
            let binding_dim = cube.dimensions.get(binding.member).ok_or_else(|| {
                SemLayerError::UnknownField(format!("{}.{}", cube_name, binding.member))
            })?;
            let time_dim_def = cube.dimensions.get(time_dim.member).ok_or_else(|| {
                SemLayerError::UnknownField(format!(
                    "{} does not carry a {} column for the funnel time dimension",
                    cube_name, time_dim.member
                ))
            })?;

            let base = (cube.sql_source)(self.ctx);
            let binding_expr = column_expr(&binding_dim.sql);
            let time_expr = column_expr(&time_dim_def.sql);

            let step_name = format!("step_{}", i);
            let time_alias = format!("{}_time", step_name);

            let mut inner = Query::new()
                .select(vec![
                    SelectExpr::new(binding_expr.clone()).with_alias("binding_key"),
                    SelectExpr::new(crate::sql::min(time_expr.clone())).with_alias(&time_alias),
                ])
                .from(TableRef::new(&base.table));

            let mut where_expr = base.security_predicate.clone();
            if let Some(filter) = &step.filter {
                let compiled = filter_compiler.compile(filter, now)?;
                where_expr = where_expr.and(compiled.predicate);
            }

            if i > 0 {
                let prev_name = step_names[i - 1].clone();
                let prev_time_alias = time_aliases[i - 1].clone();
                let prev_binding = table_col(&prev_name, "binding_key");
                let prev_time = table_col(&prev_name, &prev_time_alias);

                let mut join_on = binding_expr.clone().eq(prev_binding);
                join_on = join_on.and(time_expr.clone().gt(prev_time.clone()));
                if let Some(ttc) = &step.time_to_convert {
                    let bound = dialect.date_add_interval(prev_time, ttc);
                    join_on = join_on.and(time_expr.clone().lte(bound));
                }
                inner = inner.join(JoinType::Inner, TableRef::new(&prev_name), join_on);
            }

            inner = inner.filter(where_expr).group_by(vec![binding_expr]);

            ctes.push(Cte::new(&step_name, inner));
            step_names.push(step_name);
            time_aliases.push(time_alias);
        }

        let mut outer = Query::new();
        for cte in ctes {
            outer = outer.with_cte(cte);
        }
        outer = outer.from(TableRef::new(&step_names[0]));
        for name in &step_names[1..] {
            let on = table_col(name, "binding_key").eq(table_col(&step_names[0], "binding_key"));
            outer = outer.left_join(TableRef::new(name), on);
        }

        let mut select = Vec::new();
        let entered = |name: &str| -> Expr {
            dialect.conditional_aggregation(
                "COUNT",
                lit_int(1),
                table_col(name, "binding_key").is_not_null(),
            )
        };
        let entered_0 = entered(&step_names[0]);
        for (i, step) in query.steps.iter().enumerate() {
            let entered_i = entered(&step_names[i]);
            select.push(SelectExpr::new(entered_i.clone()).with_alias(&format!("{}.entered", step.name)));
            if i == 0 {
                continue;
            }
            let rate = dialect.case_when(
                vec![(entered_0.clone().eq(lit_int(0)), lit_null())],
                Some(entered_i.clone().div(entered_0.clone())),
            );
            select.push(SelectExpr::new(rate).with_alias(&format!("{}.conversionRate", step.name)));

            if query.include_time_metrics {
                let diff = dialect.time_difference_seconds(
                    table_col(&step_names[i], &time_aliases[i]),
                    table_col(&step_names[i - 1], &time_aliases[i - 1]),
                );
                select.push(
                    SelectExpr::new(crate::sql::avg(diff))
                        .with_alias(&format!("{}.avgTimeToConvert", step.name)),
                );
            }
        }

        Ok(outer.select(select))
    }
}
