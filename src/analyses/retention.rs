//! Retention analysis: a cohort CTE (first qualifying event per entity,
//! truncated to `granularity`), an activity CTE (every qualifying event,
//! truncated the same way), and a join that buckets each entity into a
//! `periodIndex` relative to its cohort entry.
//!
//! Periods with no activity anywhere in the cohort are omitted from the
//! output rather than synthesized as explicit zero rows — doing that
//! properly needs a dialect-specific `generate_series`/recursive spine,
//! which is out of scope here.

use chrono::{DateTime, Utc};

use super::column_expr;
use crate::error::SemLayerError;
use crate::filter::{time_range, FilterCompiler};
use crate::input::{DateRangeInput, FilterTree};
use crate::model::Cube;
use crate::query_context::QueryContext;
use crate::registry::{CubeRegistry, MemberKind};
use crate::sql::{
    count_distinct, lit_float, lit_int, lit_str, table_col, Cte, Expr, ExprExt, JoinType, Query,
    SelectExpr, TableRef, TimeGranularity,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetentionType {
    Classic,
    Rolling,
}

#[derive(Debug, Clone)]
pub struct RetentionQuery {
    pub cube: String,
    pub time_dimension: String,
    pub date_range: DateRangeInput,
    pub granularity: TimeGranularity,
    pub periods: u32,
    pub retention_type: RetentionType,
    pub cohort_filters: Vec<FilterTree>,
    pub activity_filters: Vec<FilterTree>,
    pub breakdown_dimensions: Vec<String>,
}

impl From<crate::input::RetentionType> for RetentionType {
    fn from(wire: crate::input::RetentionType) -> Self {
        match wire {
            crate::input::RetentionType::Classic => RetentionType::Classic,
            crate::input::RetentionType::Rolling => RetentionType::Rolling,
        }
    }
}

/// Converts the wire-level retention request into the compiler's own query
/// shape. The wire spec names its entity via `bindingKey` (a `Cube.member`
/// reference, matching Funnel and Flow); the compiler only needs the cube
/// half of that reference, since it reads the entity's primary key off the
/// cube itself (`Cube::primary_key`) rather than a separate field.
impl TryFrom<crate::input::ServerRetentionQuery> for RetentionQuery {
    type Error = SemLayerError;

    fn try_from(wire: crate::input::ServerRetentionQuery) -> Result<Self, SemLayerError> {
        let spec = wire.retention;
        let (cube, _) = spec.binding_key.split_once('.').ok_or_else(|| {
            SemLayerError::InvalidFilter(format!(
                "{} is not a Cube.member reference",
                spec.binding_key
            ))
        })?;
        Ok(RetentionQuery {
            cube: cube.to_string(),
            time_dimension: spec.time_dimension,
            date_range: spec.date_range,
            granularity: spec.granularity,
            periods: spec.periods,
            retention_type: spec.retention_type.into(),
            cohort_filters: spec.cohort_filters.into_iter().collect(),
            activity_filters: spec.activity_filters.into_iter().collect(),
            breakdown_dimensions: spec.breakdown_dimensions,
        })
    }
}

pub struct RetentionCompiler<'a> {
    registry: &'a CubeRegistry,
    ctx: &'a QueryContext,
}

impl<'a> RetentionCompiler<'a> {
    pub fn new(registry: &'a CubeRegistry, ctx: &'a QueryContext) -> Self {
        RetentionCompiler { registry, ctx }
    }

    pub fn compile(&self, query: &RetentionQuery, now: DateTime<Utc>) -> Result<Query, SemLayerError> {
        if query.periods == 0 || query.periods > 52 {
            return Err(SemLayerError::InvalidFilter(
                "periods must be between 1 and 52".to_string(),
            ));
        }
        if !matches!(
            query.granularity,
            TimeGranularity::Day | TimeGranularity::Week | TimeGranularity::Month
        ) {
            return Err(SemLayerError::InvalidFilter(
                "retention granularity must be day, week, or month".to_string(),
            ));
        }

        let cube = self.registry.lookup(&query.cube)?;
        let entity = cube.primary_key().ok_or_else(|| {
            SemLayerError::InvalidFilter(format!("{} has no primary key dimension", query.cube))
        })?;
        let time_dim = self.registry.resolve_member(&query.time_dimension)?;
        if time_dim.kind != MemberKind::Dimension || time_dim.cube != query.cube {
            return Err(SemLayerError::InvalidFilter(format!(
                "{} must be a time dimension on {}",
                query.time_dimension, query.cube
            )));
        }

        let breakdowns = self.resolve_breakdowns(query, cube)?;
        let (start, end) = time_range::resolve_date_range(&query.date_range, now)?;

        let base = (cube.sql_source)(self.ctx);
        let dialect = self.ctx.dialect.dialect();
        let filter_compiler = FilterCompiler::new(self.registry, self.ctx);

        let entity_expr = column_expr(&entity.sql);
        let time_expr = column_expr(&cube.dimensions[time_dim.member].sql);

        let cohort_period = crate::sql::min(dialect.truncate_time(query.granularity, time_expr.clone()));
        let mut cohort_select = vec![SelectExpr::new(entity_expr.clone()).with_alias("entity_key")];
        for (alias, expr) in &breakdowns {
            cohort_select.push(SelectExpr::new(expr.clone()).with_alias(alias));
        }
        cohort_select.push(SelectExpr::new(cohort_period.clone()).with_alias("cohort_period"));

        let mut cohort_where = base.security_predicate.clone();
        for filter in &query.cohort_filters {
            cohort_where = cohort_where.and(filter_compiler.compile(filter, now)?.predicate);
        }
        let mut cohort_group_by = vec![entity_expr.clone()];
        cohort_group_by.extend(breakdowns.iter().map(|(_, e)| e.clone()));

        let cohort_query = Query::new()
            .select(cohort_select)
            .from(TableRef::new(&base.table))
            .filter(cohort_where)
            .group_by(cohort_group_by)
            .having(
                cohort_period
                    .clone()
                    .gte(iso_literal(&start))
                    .and(cohort_period.lt(iso_literal(&end))),
            );

        let mut activity_where = base.security_predicate.clone();
        for filter in &query.activity_filters {
            activity_where = activity_where.and(filter_compiler.compile(filter, now)?.predicate);
        }
        let activity_query = Query::new()
            .select(vec![
                SelectExpr::new(entity_expr.clone()).with_alias("entity_key"),
                SelectExpr::new(dialect.truncate_time(query.granularity, time_expr))
                    .with_alias("activity_period"),
            ])
            .from(TableRef::new(&base.table))
            .filter(activity_where);

        let period_index = period_index_expr(
            query.granularity,
            table_col("rt_activity", "activity_period"),
            table_col("rt_cohort", "cohort_period"),
            dialect,
        );

        let mut joined_select = vec![SelectExpr::new(table_col("rt_cohort", "entity_key")).with_alias("entity_key")];
        for (alias, _) in &breakdowns {
            joined_select.push(SelectExpr::new(table_col("rt_cohort", alias)).with_alias(alias));
        }
        joined_select.push(SelectExpr::new(period_index.clone()).with_alias("period_index"));

        let joined_query = Query::new()
            .select(joined_select)
            .from(TableRef::new("rt_cohort"))
            .join(
                JoinType::Inner,
                TableRef::new("rt_activity"),
                table_col("rt_activity", "entity_key").eq(table_col("rt_cohort", "entity_key")),
            )
            .filter(
                period_index
                    .clone()
                    .gte(lit_int(0))
                    .and(period_index.lte(lit_int(query.periods as i64))),
            );

        let breakdown_aliases: Vec<&str> = breakdowns.iter().map(|(a, _)| a.as_str()).collect();

        let retained_query = match query.retention_type {
            RetentionType::Classic => {
                let mut select = vec![SelectExpr::new(crate::sql::col("period_index"))];
                for alias in &breakdown_aliases {
                    select.push(SelectExpr::new(crate::sql::col(alias)));
                }
                select.push(
                    SelectExpr::new(count_distinct(crate::sql::col("entity_key")))
                        .with_alias("retained_users"),
                );
                let mut group_by = vec![crate::sql::col("period_index")];
                group_by.extend(breakdown_aliases.iter().map(|a| crate::sql::col(a)));
                Query::new()
                    .select(select)
                    .from(TableRef::new("rt_joined"))
                    .group_by(group_by)
            }
            RetentionType::Rolling => {
                let periods_cte = Cte::new(
                    "rt_periods",
                    Query::new()
                        .select(vec![SelectExpr::new(crate::sql::col("period_index"))])
                        .from(TableRef::new("rt_joined"))
                        .distinct(),
                );
                let mut select = vec![SelectExpr::new(table_col("rt_periods", "period_index"))
                    .with_alias("period_index")];
                for alias in &breakdown_aliases {
                    select.push(SelectExpr::new(table_col("rt_joined", alias)).with_alias(alias));
                }
                select.push(
                    SelectExpr::new(count_distinct(table_col("rt_joined", "entity_key")))
                        .with_alias("retained_users"),
                );
                let mut group_by = vec![table_col("rt_periods", "period_index")];
                group_by.extend(
                    breakdown_aliases
                        .iter()
                        .map(|a| table_col("rt_joined", a)),
                );
                let rolling = Query::new()
                    .with_cte(periods_cte)
                    .select(select)
                    .from(TableRef::new("rt_periods"))
                    .join(
                        JoinType::Inner,
                        TableRef::new("rt_joined"),
                        table_col("rt_joined", "period_index")
                            .gte(table_col("rt_periods", "period_index")),
                    )
                    .group_by(group_by);
                rolling
            }
        };

        let mut cohort_size_select = vec![SelectExpr::new(count_distinct(crate::sql::col("entity_key")))
            .with_alias("cohort_size")];
        for alias in &breakdown_aliases {
            cohort_size_select.push(SelectExpr::new(crate::sql::col(alias)));
        }
        let cohort_size_query = Query::new()
            .select(cohort_size_select)
            .from(TableRef::new("rt_cohort"))
            .group_by(breakdown_aliases.iter().map(|a| crate::sql::col(a)).collect());

        let join_condition = breakdown_aliases
            .iter()
            .fold(None, |acc: Option<Expr>, alias| {
                let cond = table_col("rt_retained", alias).eq(table_col("rt_cohort_size", alias));
                Some(match acc {
                    Some(existing) => existing.and(cond),
                    None => cond,
                })
            })
            .unwrap_or_else(|| crate::sql::lit_bool(true));

        let retained_count = table_col("rt_retained", "retained_users");
        let cohort_count = table_col("rt_cohort_size", "cohort_size");
        let rate = dialect.case_when(
            vec![(cohort_count.clone().eq(lit_int(0)), crate::sql::lit_null())],
            Some(retained_count.clone().div(cohort_count.clone())),
        );

        let mut final_select = vec![
            SelectExpr::new(table_col("rt_retained", "period_index")).with_alias("periodIndex"),
            SelectExpr::new(cohort_count).with_alias("cohortSize"),
            SelectExpr::new(retained_count).with_alias("retainedUsers"),
            SelectExpr::new(rate).with_alias("retentionRate"),
            SelectExpr::new(lit_str(query.granularity.as_str())).with_alias("granularity"),
        ];
        for (i, reference) in query.breakdown_dimensions.iter().enumerate() {
            final_select.push(
                SelectExpr::new(table_col("rt_retained", &breakdown_aliases[i])).with_alias(reference),
            );
        }

        let final_query = Query::new()
            .with_cte(Cte::new("rt_cohort", cohort_query))
            .with_cte(Cte::new("rt_activity", activity_query))
            .with_cte(Cte::new("rt_joined", joined_query))
            .with_cte(Cte::new("rt_retained", retained_query))
            .with_cte(Cte::new("rt_cohort_size", cohort_size_query))
            .select(final_select)
            .from(TableRef::new("rt_retained"))
            .join(JoinType::Inner, TableRef::new("rt_cohort_size"), join_condition);

        Ok(final_query)
    }

    fn resolve_breakdowns(
        &self,
        query: &RetentionQuery,
        cube: &Cube,
    ) -> Result<Vec<(String, Expr)>, SemLayerError> {
        let mut out = Vec::with_capacity(query.breakdown_dimensions.len());
        for (i, reference) in query.breakdown_dimensions.iter().enumerate() {
            let resolved = self.registry.resolve_member(reference)?;
            if resolved.kind != MemberKind::Dimension || resolved.cube != query.cube {
                return Err(SemLayerError::InvalidFilter(format!(
                    "{} must be a dimension on {}",
                    reference, query.cube
                )));
            }
            let dim = &cube.dimensions[resolved.member];
            out.push((format!("bd_{}", i), column_expr(&dim.sql)));
        }
        Ok(out)
    }
}

fn iso_literal(instant: &DateTime<Utc>) -> Expr {
    crate::sql::raw_sql(&format!("'{}'", instant.to_rfc3339()))
}

/// `(activity - cohort)` in whole `granularity` units. Day/week divide the
/// exact second difference by a fixed period length; month uses the
/// average Gregorian month length, which is accurate enough for bucketing
/// entities into a small number of periods but not for calendar-exact
/// month arithmetic across leap years.
fn period_index_expr(
    granularity: TimeGranularity,
    activity: Expr,
    cohort: Expr,
    dialect: &dyn crate::sql::SqlDialect,
) -> Expr {
    let seconds = dialect.time_difference_seconds(activity, cohort);
    let period_seconds = match granularity {
        TimeGranularity::Day => 86_400.0,
        TimeGranularity::Week => 604_800.0,
        TimeGranularity::Month => 2_629_800.0,
        _ => unreachable!("validated to day/week/month before planning"),
    };
    dialect.cast(seconds.div(lit_float(period_seconds)), "BIGINT")
}
