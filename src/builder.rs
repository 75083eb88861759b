//! SQL Builder: assembles a [`Plan`] into a single dialect-agnostic
//! [`crate::sql::Query`] AST, delegating every dialect-sensitive fragment
//! to the active [`SqlDialect`].

use crate::error::SemLayerError;
use crate::model::{Cube, MeasureKind};
use crate::planner::{Plan, PlannedJoin, PreAggCte, SelectItem};
use crate::query_context::QueryContext;
use crate::registry::CubeRegistry;
use crate::sql::{
    col, count_distinct, count_star, lit_int, max, min, sum, table_col, Cte, Expr, ExprExt,
    OrderByExpr, Query, SqlDialect, TableRef,
};

pub struct SqlBuilder<'a> {
    registry: &'a CubeRegistry,
    ctx: &'a QueryContext,
}

impl<'a> SqlBuilder<'a> {
    pub fn new(registry: &'a CubeRegistry, ctx: &'a QueryContext) -> Self {
        SqlBuilder { registry, ctx }
    }

    pub fn build(&self, plan: &Plan, filter_predicate: Option<Expr>) -> Result<Query, SemLayerError> {
        let dialect = self.ctx.dialect.dialect();
        let primary = self.registry.lookup(&plan.primary_cube)?;
        let primary_base = (primary.sql_source)(self.ctx);

        let mut query = Query::new().from(TableRef::new(&primary_base.table).with_alias(&primary.name));

        for join in &primary_base.joins {
            query = query.left_join(TableRef::new(&join.table), join.on.clone());
        }

        let mut ctes = Vec::new();
        let mut joined_cubes = Vec::new();

        for planned in &plan.joins {
            let target = self.registry.lookup(&planned.to_cube)?;
            if let Some(preagg) = &planned.pre_aggregated {
                let cte = self.build_preagg_cte(target, preagg, dialect)?;
                let join_on = self.preagg_join_condition(planned, preagg);
                ctes.push(cte);
                query = query.left_join(
                    TableRef::new(&preagg.cte_name).with_alias(&preagg.cte_name),
                    join_on,
                );
            } else {
                let target_base = (target.sql_source)(self.ctx);
                let join_on = self.direct_join_condition(planned);
                query = query.left_join(
                    TableRef::new(&target_base.table).with_alias(&target.name),
                    join_on,
                );
                for static_join in &target_base.joins {
                    query = query.left_join(TableRef::new(&static_join.table), static_join.on.clone());
                }
            }
            joined_cubes.push(target);
        }

        for cte in ctes {
            query = query.with_cte(cte);
        }

        let mut select_exprs = Vec::new();
        let mut group_by = Vec::new();

        for item in &plan.select {
            if item.is_measure {
                let expr = self.build_measure_select(plan, item, dialect)?;
                select_exprs.push(expr.with_alias_q(&item.alias));
            } else {
                let is_preagg = plan
                    .joins
                    .iter()
                    .any(|j| j.to_cube == item.cube && j.pre_aggregated.is_some());
                let dim_expr = if is_preagg {
                    let preagg = plan
                        .joins
                        .iter()
                        .find(|j| j.to_cube == item.cube)
                        .and_then(|j| j.pre_aggregated.as_ref())
                        .expect("checked above");
                    if !preagg.dimensions.iter().any(|d| d.alias == item.alias) {
                        return Err(SemLayerError::UnknownField(format!(
                            "{} is grouped inside the {} pre-aggregation CTE but was not \
                             carried into it",
                            item.alias, preagg.cte_name
                        )));
                    }
                    table_col(&preagg.cte_name, &item.alias)
                } else {
                    let cube = self.registry.lookup(&item.cube)?;
                    let dim = cube.dimensions.get(&item.member).ok_or_else(|| {
                        SemLayerError::UnknownField(format!("{}.{}", item.cube, item.member))
                    })?;
                    let raw = qualified_column(&item.cube, &dim.sql);
                    match item.granularity {
                        Some(g) => dialect.truncate_time(g, raw),
                        None => raw,
                    }
                };
                group_by.push(dim_expr.clone());
                select_exprs.push(dim_expr.with_alias_q(&item.alias));
            }
        }

        query = query.select(select_exprs);
        if !group_by.is_empty() {
            query = query.group_by(group_by);
        }

        let mut where_clause: Option<Expr> = Some(primary_base.security_predicate.clone());
        for cube in &joined_cubes {
            // Pre-aggregated cubes apply their own security predicate
            // inside the CTE, not in the outer WHERE.
            if plan
                .joins
                .iter()
                .any(|j| j.to_cube == cube.name && j.pre_aggregated.is_some())
            {
                continue;
            }
            let base = (cube.sql_source)(self.ctx);
            where_clause = Some(and_opt(where_clause, base.security_predicate));
        }
        if let Some(predicate) = filter_predicate {
            where_clause = Some(and_opt(where_clause, predicate));
        }
        if let Some(w) = where_clause {
            query = query.filter(w);
        }

        let order_by: Vec<OrderByExpr> = plan
            .order_by
            .iter()
            .map(|o| {
                let expr = col(&o.alias);
                if o.descending {
                    OrderByExpr::desc(expr)
                } else {
                    OrderByExpr::asc(expr)
                }
            })
            .collect();
        if !order_by.is_empty() {
            query = query.order_by(order_by);
        }

        if let Some(limit) = plan.limit {
            query = query.limit(limit);
        }
        if let Some(offset) = plan.offset {
            query = query.offset(offset);
        }

        Ok(query)
    }

    fn build_preagg_cte(
        &self,
        cube: &Cube,
        preagg: &PreAggCte,
        dialect: &dyn SqlDialect,
    ) -> Result<Cte, SemLayerError> {
        let base = (cube.sql_source)(self.ctx);
        let mut inner = Query::new().from(TableRef::new(&base.table).with_alias(&cube.name));
        inner = inner.filter(base.security_predicate.clone());

        let mut select_exprs = Vec::new();
        let mut group_by = Vec::new();
        for fk_column in &preagg.group_by_columns {
            let expr = qualified_column(&cube.name, fk_column);
            group_by.push(expr.clone());
            select_exprs.push(expr.with_alias_q(fk_column));
        }
        for dim in &preagg.dimensions {
            let dim_def = cube.dimensions.get(dim.member.as_str()).ok_or_else(|| {
                SemLayerError::UnknownField(format!("{}.{}", cube.name, dim.member))
            })?;
            let raw = qualified_column(&cube.name, &dim_def.sql);
            let expr = match dim.granularity {
                Some(g) => dialect.truncate_time(g, raw),
                None => raw,
            };
            group_by.push(expr.clone());
            select_exprs.push(expr.with_alias_q(&dim.alias));
        }
        for measure_ref in &preagg.measures {
            let (_, member) = measure_ref
                .split_once('.')
                .ok_or_else(|| SemLayerError::UnknownField(measure_ref.clone()))?;
            let measure = cube.measures.get(member).ok_or_else(|| {
                SemLayerError::UnknownField(measure_ref.clone())
            })?;
            let agg = self.aggregate_expr(&cube.name, measure, dialect)?;
            select_exprs.push(agg.with_alias_q(member));
        }

        inner = inner.select(select_exprs).group_by(group_by);
        Ok(Cte::new(&preagg.cte_name, inner))
    }

    fn build_measure_select(
        &self,
        plan: &Plan,
        item: &SelectItem,
        dialect: &dyn SqlDialect,
    ) -> Result<Expr, SemLayerError> {
        let cube = self.registry.lookup(&item.cube)?;
        let is_preagg = plan
            .joins
            .iter()
            .any(|j| j.to_cube == item.cube && j.pre_aggregated.is_some());
        let measure = cube.measures.get(&item.member).ok_or_else(|| {
            SemLayerError::UnknownField(format!("{}.{}", item.cube, item.member))
        })?;

        if is_preagg {
            let preagg = plan
                .joins
                .iter()
                .find(|j| j.to_cube == item.cube)
                .and_then(|j| j.pre_aggregated.as_ref())
                .expect("checked above");
            return Ok(table_col(&preagg.cte_name, &item.member));
        }

        if let MeasureKind::Calculated(template) = &measure.kind {
            return self.expand_calculated(&item.cube, template, dialect);
        }

        self.aggregate_expr(&item.cube, measure, dialect)
    }

    fn aggregate_expr(
        &self,
        cube_name: &str,
        measure: &crate::model::Measure,
        dialect: &dyn SqlDialect,
    ) -> Result<Expr, SemLayerError> {
        let column = || {
            qualified_column(
                cube_name,
                measure
                    .sql
                    .as_deref()
                    .unwrap_or_else(|| panic!("measure {} requires sql", measure.name)),
            )
        };
        // `measure.filters` narrows which rows feed the aggregate without
        // narrowing the query's own WHERE clause, so every other measure in
        // the same SELECT still sees the full row set. A COUNT-DISTINCT over
        // a CASE-narrowed column still works, since the excluded rows become
        // NULL and DISTINCT aggregates already ignore NULLs.
        let predicate = measure
            .filters
            .iter()
            .map(|f| f(self.ctx))
            .reduce(|acc, next| acc.and(next));
        let filtered_column = || match &predicate {
            Some(p) => dialect.case_when(vec![(p.clone(), column())], None),
            None => column(),
        };
        match &measure.kind {
            MeasureKind::Count => match &predicate {
                Some(p) => Ok(dialect.conditional_aggregation("COUNT", lit_int(1), p.clone())),
                None => Ok(count_star()),
            },
            MeasureKind::CountDistinct => Ok(count_distinct(filtered_column())),
            MeasureKind::Sum => Ok(sum(filtered_column())),
            MeasureKind::Avg => Ok(dialect.avg(filtered_column())),
            MeasureKind::Min => Ok(min(filtered_column())),
            MeasureKind::Max => Ok(max(filtered_column())),
            MeasureKind::Stddev => dialect.stddev(filtered_column()).ok_or_else(|| {
                SemLayerError::UnsupportedDialectFeature {
                    dialect: dialect.name().to_string(),
                    feature: "stddev".to_string(),
                }
            }),
            MeasureKind::Variance => dialect.variance(filtered_column()).ok_or_else(|| {
                SemLayerError::UnsupportedDialectFeature {
                    dialect: dialect.name().to_string(),
                    feature: "variance".to_string(),
                }
            }),
            MeasureKind::Percentile(p) => dialect.percentile(filtered_column(), *p).ok_or_else(|| {
                SemLayerError::UnsupportedDialectFeature {
                    dialect: dialect.name().to_string(),
                    feature: "percentile".to_string(),
                }
            }),
            MeasureKind::Calculated(_) => unreachable!("handled by expand_calculated"),
        }
    }

    /// Substitutes every `{Cube.member}` placeholder in a calculated
    /// template with the rendered SQL fragment of that sibling member,
    /// then wraps the fully-expanded string as raw SQL.
    fn expand_calculated(
        &self,
        owning_cube: &str,
        template: &str,
        dialect: &dyn SqlDialect,
    ) -> Result<Expr, SemLayerError> {
        let template = dialect.preprocess_calculated_template(template);
        let mut expanded = String::with_capacity(template.len());
        let mut chars = template.char_indices().peekable();
        let mut last = 0;
        while let Some((i, c)) = chars.next() {
            if c == '{' {
                if let Some(end) = template[i + 1..].find('}') {
                    expanded.push_str(&template[last..i]);
                    let reference = &template[i + 1..i + 1 + end];
                    let cube = self.registry.lookup(owning_cube)?;
                    let (_, member) = reference
                        .split_once('.')
                        .ok_or_else(|| SemLayerError::UnknownField(reference.to_string()))?;
                    let sibling = cube.measures.get(member).ok_or_else(|| {
                        SemLayerError::UnknownField(reference.to_string())
                    })?;
                    let sibling_expr = self.aggregate_expr(owning_cube, sibling, dialect)?;
                    let fragment = sibling_expr
                        .to_tokens_for_dialect(self.ctx.dialect)
                        .serialize(self.ctx.dialect);
                    expanded.push('(');
                    expanded.push_str(&fragment);
                    expanded.push(')');
                    while let Some(&(j, cc)) = chars.peek() {
                        chars.next();
                        if cc == '}' {
                            last = j + 1;
                            break;
                        }
                    }
                }
            }
        }
        expanded.push_str(&template[last..]);
        Ok(crate::sql::raw_sql(&expanded))
    }

    fn direct_join_condition(&self, planned: &PlannedJoin) -> Expr {
        let mut condition: Option<Expr> = None;
        for key in &planned.spec.on {
            let (left_cube, left_col, right_cube, right_col) = if planned.reversed {
                (
                    &planned.to_cube,
                    &key.target_column,
                    &planned.from_cube,
                    &key.source_column,
                )
            } else {
                (
                    &planned.from_cube,
                    &key.source_column,
                    &planned.to_cube,
                    &key.target_column,
                )
            };
            let eq = table_col(left_cube, left_col).eq(table_col(right_cube, right_col));
            condition = Some(and_opt(condition, eq));
        }
        condition.unwrap_or_else(|| crate::sql::lit_bool(true))
    }

    fn preagg_join_condition(&self, planned: &PlannedJoin, preagg: &PreAggCte) -> Expr {
        let mut condition: Option<Expr> = None;
        for (key, fk_column) in planned.spec.on.iter().zip(preagg.group_by_columns.iter()) {
            let primary_col = if planned.reversed {
                &key.target_column
            } else {
                &key.source_column
            };
            let eq = table_col(&planned.from_cube, primary_col).eq(table_col(&preagg.cte_name, fk_column));
            condition = Some(and_opt(condition, eq));
        }
        condition.unwrap_or_else(|| crate::sql::lit_bool(true))
    }
}

fn qualified_column(cube: &str, sql: &str) -> Expr {
    if sql.contains('(') || sql.contains(' ') {
        crate::sql::raw_sql(sql)
    } else {
        table_col(cube, sql)
    }
}

fn and_opt(existing: Option<Expr>, next: Expr) -> Expr {
    match existing {
        Some(e) => e.and(next),
        None => next,
    }
}

trait SelectExprAlias {
    fn with_alias_q(self, alias: &str) -> crate::sql::SelectExpr;
}

impl SelectExprAlias for Expr {
    fn with_alias_q(self, alias: &str) -> crate::sql::SelectExpr {
        crate::sql::SelectExpr::new(self).with_alias(alias)
    }
}
