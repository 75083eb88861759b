//! Flow analysis: traces a path of events around an anchor ("starting
//! step") per entity and aggregates transitions into `(fromEvent, toEvent,
//! position, count)` rows suitable for a Sankey view.
//!
//! Two join-strategy families exist because not every target dialect can
//! express a correlated `LATERAL` subquery: [`FlowPlan::Window`] builds a
//! CTE chain entirely through the typed [`Query`]/[`Expr`] AST using
//! `ROW_NUMBER`/`LAG`; [`FlowPlan::Lateral`] renders a hand-assembled SQL
//! string for dialects that support it, since the AST has no derived-table
//! `FROM` source to hang a `LATERAL` subquery off of. Every fragment
//! embedded in the lateral template still goes through dialect-aware
//! identifier quoting and the filter compiler — nothing user-supplied is
//! concatenated raw.

use chrono::{DateTime, Utc};

use super::column_expr;
use crate::error::SemLayerError;
use crate::filter::FilterCompiler;
use crate::input::FilterTree;
use crate::query_context::QueryContext;
use crate::registry::{CubeRegistry, MemberKind};
use crate::sql::{
    col, lag, lit_int, min, row_number, Cte, Dialect, Expr, ExprExt, Query, SelectExpr, SqlDialect,
    TableRef, WindowOrderBy,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinStrategy {
    Lateral,
    Window,
    Auto,
}

#[derive(Debug, Clone)]
pub struct FlowQuery {
    pub binding_key: String,
    pub time_dimension: String,
    pub event_dimension: String,
    pub starting_step: FilterTree,
    pub steps_before: u8,
    pub steps_after: u8,
    pub join_strategy: JoinStrategy,
}

/// Either family's output: a typed `Query` for the window path, or a
/// rendered SQL string for the lateral path.
pub enum FlowPlan {
    Window(Query),
    Lateral(String),
}

impl From<crate::input::JoinStrategy> for JoinStrategy {
    fn from(wire: crate::input::JoinStrategy) -> Self {
        match wire {
            crate::input::JoinStrategy::Auto => JoinStrategy::Auto,
            crate::input::JoinStrategy::Lateral => JoinStrategy::Lateral,
            crate::input::JoinStrategy::Window => JoinStrategy::Window,
        }
    }
}

impl From<crate::input::ServerFlowQuery> for FlowQuery {
    fn from(wire: crate::input::ServerFlowQuery) -> Self {
        let spec = wire.flow;
        FlowQuery {
            binding_key: spec.binding_key,
            time_dimension: spec.time_dimension,
            event_dimension: spec.event_dimension,
            starting_step: spec.starting_step,
            steps_before: spec.steps_before,
            steps_after: spec.steps_after,
            join_strategy: spec.join_strategy.0.into(),
        }
    }
}

pub struct FlowCompiler<'a> {
    registry: &'a CubeRegistry,
    ctx: &'a QueryContext,
}

impl<'a> FlowCompiler<'a> {
    pub fn new(registry: &'a CubeRegistry, ctx: &'a QueryContext) -> Self {
        FlowCompiler { registry, ctx }
    }

    pub fn compile(&self, query: &FlowQuery, now: DateTime<Utc>) -> Result<FlowPlan, SemLayerError> {
        if query.steps_before > 5 || query.steps_after > 5 {
            return Err(SemLayerError::InvalidFilter(
                "stepsBefore/stepsAfter must each be between 0 and 5".to_string(),
            ));
        }

        let binding = self.registry.resolve_member(&query.binding_key)?;
        let time_dim = self.registry.resolve_member(&query.time_dimension)?;
        let event_dim = self.registry.resolve_member(&query.event_dimension)?;
        if binding.kind != MemberKind::Dimension
            || time_dim.kind != MemberKind::Dimension
            || event_dim.kind != MemberKind::Dimension
        {
            return Err(SemLayerError::InvalidFilter(
                "bindingKey, timeDimension, and eventDimension must all be dimensions".to_string(),
            ));
        }
        if binding.cube != time_dim.cube || binding.cube != event_dim.cube {
            return Err(SemLayerError::InvalidFilter(
                "flow requires bindingKey, timeDimension, and eventDimension on the same cube".to_string(),
            ));
        }

        let cube = self.registry.lookup(binding.cube)?;
        let dialect = self.ctx.dialect.dialect();
        let caps = dialect.capabilities();

        let use_lateral = match query.join_strategy {
            JoinStrategy::Lateral => {
                if !caps.supports_lateral_joins {
                    return Err(SemLayerError::UnsupportedDialectFeature {
                        dialect: dialect.name().to_string(),
                        feature: "lateral_joins".to_string(),
                    });
                }
                true
            }
            JoinStrategy::Window => false,
            JoinStrategy::Auto => caps.supports_lateral_joins,
        };

        if use_lateral {
            self.compile_lateral(query, cube, now)
        } else {
            self.compile_window(query, cube, now).map(FlowPlan::Window)
        }
    }

    fn compile_window(
        &self,
        query: &FlowQuery,
        cube: &crate::model::Cube,
        now: DateTime<Utc>,
    ) -> Result<Query, SemLayerError> {
        let binding = self.registry.resolve_member(&query.binding_key)?;
        let time_dim = self.registry.resolve_member(&query.time_dimension)?;
        let event_dim = self.registry.resolve_member(&query.event_dimension)?;

        let binding_expr = column_expr(&cube.dimensions[binding.member].sql);
        let time_expr = column_expr(&cube.dimensions[time_dim.member].sql);
        let event_expr = column_expr(&cube.dimensions[event_dim.member].sql);

        let base = (cube.sql_source)(self.ctx);
        let filter_compiler = FilterCompiler::new(self.registry, self.ctx);
        let anchor = filter_compiler.compile(&query.starting_step, now)?;
        let dialect = self.ctx.dialect;

        let rn = dialect.window(
            row_number(),
            vec![binding_expr.clone()],
            vec![WindowOrderBy::asc(time_expr.clone())],
            None,
        );
        let is_anchor = dialect.case_when(
            vec![(anchor.predicate.clone(), lit_int(1))],
            Some(lit_int(0)),
        );

        let events = Query::new()
            .select(vec![
                SelectExpr::new(binding_expr.clone()).with_alias("binding_key"),
                SelectExpr::new(event_expr).with_alias("event_name"),
                SelectExpr::new(rn).with_alias("rn"),
                SelectExpr::new(is_anchor).with_alias("is_anchor"),
            ])
            .from(TableRef::new(&base.table))
            .filter(base.security_predicate.clone());

        let anchor_rn = dialect.window(
            min(dialect.case_when(
                vec![(col("is_anchor").eq(lit_int(1)), col("rn"))],
                None,
            )),
            vec![col("binding_key")],
            vec![],
            None,
        );
        let positioned = Query::new()
            .select(vec![
                SelectExpr::new(col("binding_key")),
                SelectExpr::new(col("event_name")),
                SelectExpr::new(col("rn").sub(anchor_rn)).with_alias("position"),
            ])
            .from(TableRef::new("fl_events"));

        let from_event = dialect.window(
            lag(col("event_name")),
            vec![col("binding_key")],
            vec![WindowOrderBy::asc(col("position"))],
            None,
        );
        let bounded = col("position")
            .gte(lit_int(-(query.steps_before as i64)))
            .and(col("position").lte(lit_int(query.steps_after as i64)));
        let rows = Query::new()
            .select(vec![
                SelectExpr::new(from_event).with_alias("from_event"),
                SelectExpr::new(col("event_name")).with_alias("to_event"),
                SelectExpr::new(col("position")),
            ])
            .from(TableRef::new("fl_positioned"))
            .filter(bounded);

        let final_query = Query::new()
            .with_cte(Cte::new("fl_events", events))
            .with_cte(Cte::new("fl_positioned", positioned))
            .with_cte(Cte::new("fl_rows", rows))
            .select(vec![
                SelectExpr::new(col("from_event")),
                SelectExpr::new(col("to_event")),
                SelectExpr::new(col("position")),
                SelectExpr::new(crate::sql::count_star()).with_alias("count"),
            ])
            .from(TableRef::new("fl_rows"))
            .group_by(vec![col("from_event"), col("to_event"), col("position")]);

        Ok(final_query)
    }

    fn compile_lateral(
        &self,
        query: &FlowQuery,
        cube: &crate::model::Cube,
        now: DateTime<Utc>,
    ) -> Result<FlowPlan, SemLayerError> {
        let binding = self.registry.resolve_member(&query.binding_key)?;
        let time_dim = self.registry.resolve_member(&query.time_dimension)?;
        let event_dim = self.registry.resolve_member(&query.event_dimension)?;

        let dialect: Dialect = self.ctx.dialect;
        let render = |e: &Expr| e.to_tokens_for_dialect(dialect).serialize(dialect);

        let binding_sql = render(&column_expr(&cube.dimensions[binding.member].sql));
        let time_sql = render(&column_expr(&cube.dimensions[time_dim.member].sql));
        let event_sql = render(&column_expr(&cube.dimensions[event_dim.member].sql));

        let base = (cube.sql_source)(self.ctx);
        let filter_compiler = FilterCompiler::new(self.registry, self.ctx);
        let anchor = filter_compiler.compile(&query.starting_step, now)?;
        let anchor_sql = render(&anchor.predicate);
        let security_sql = render(&base.security_predicate);

        let limit = query.steps_before as i64 + query.steps_after as i64 + 1;

        let sql = format!(
            "WITH fl_anchors AS (\n  SELECT {binding} AS binding_key, {time} AS anchor_ts\n  FROM {table}\n  WHERE {security} AND {anchor}\n),\nfl_positions AS (\n  SELECT a.binding_key AS binding_key,\n         pos.rn - {before} - 1 AS position,\n         pos.event_name AS to_event,\n         LAG(pos.event_name) OVER (PARTITION BY a.binding_key ORDER BY pos.rn) AS from_event\n  FROM fl_anchors a,\n  LATERAL (\n    SELECT {event} AS event_name, ROW_NUMBER() OVER (ORDER BY {time}) AS rn\n    FROM {table} e\n    WHERE {binding} = a.binding_key\n    ORDER BY {time}\n    LIMIT {fetch}\n  ) pos\n)\nSELECT from_event, to_event, position, COUNT(*) AS count\nFROM fl_positions\nWHERE position BETWEEN {neg_before} AND {after}\nGROUP BY from_event, to_event, position",
            binding = binding_sql,
            time = time_sql,
            table = base.table,
            security = security_sql,
            anchor = anchor_sql,
            before = query.steps_before as i64,
            event = event_sql,
            fetch = limit,
            neg_before = -(query.steps_before as i64),
            after = query.steps_after as i64,
        );
        Ok(FlowPlan::Lateral(sql))
    }
}
