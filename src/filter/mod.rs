//! Filter & Time-Range Compiler: translates a `FilterTree` plus relative
//! date ranges into SQL predicates.

pub mod time_range;

use chrono::{DateTime, Utc};

use crate::error::SemLayerError;
use crate::input::{DateRangeInput, FilterOperator, FilterTree};
use crate::model::FieldType;
use crate::query_context::QueryContext;
use crate::registry::{CubeRegistry, MemberKind};
use crate::sql::dialect::StringMatchOp;
use crate::sql::{col, lit_null, raw_sql, Expr, ExprExt};

/// Set of time dimensions a filter touched via `inDateRange`/`notInDateRange`
/// that the caller did *not* also name in `timeDimensions`. Per the
/// testable "DateRange scoping" property, these must never leak into
/// `SELECT`/`GROUP BY`.
#[derive(Debug)]
pub struct CompiledFilter {
    pub predicate: Expr,
    /// Every `Cube.member` a filter leaf touched, in declared order
    /// (duplicates included), for callers that need to know which
    /// dimensions were *only* referenced by a filter.
    pub touched_members: Vec<String>,
}

pub struct FilterCompiler<'a> {
    registry: &'a CubeRegistry,
    ctx: &'a QueryContext,
}

impl<'a> FilterCompiler<'a> {
    pub fn new(registry: &'a CubeRegistry, ctx: &'a QueryContext) -> Self {
        FilterCompiler { registry, ctx }
    }

    pub fn compile(&self, tree: &FilterTree, now: DateTime<Utc>) -> Result<CompiledFilter, SemLayerError> {
        let mut touched = Vec::new();
        let predicate = self.compile_node(tree, now, &mut touched)?;
        Ok(CompiledFilter {
            predicate,
            touched_members: touched,
        })
    }

    fn compile_node(
        &self,
        tree: &FilterTree,
        now: DateTime<Utc>,
        touched: &mut Vec<String>,
    ) -> Result<Expr, SemLayerError> {
        match tree {
            FilterTree::Leaf {
                member,
                operator,
                values,
                date_range,
            } => {
                touched.push(member.clone());
                self.compile_leaf(member, *operator, values.as_deref(), date_range.as_ref(), now)
            }
            FilterTree::And { and } => {
                let mut exprs = Vec::with_capacity(and.len());
                for child in and {
                    exprs.push(self.compile_node(child, now, touched)?);
                }
                Ok(conjoin(exprs, true))
            }
            FilterTree::Or { or } => {
                let mut exprs = Vec::with_capacity(or.len());
                for child in or {
                    exprs.push(self.compile_node(child, now, touched)?);
                }
                Ok(conjoin(exprs, false))
            }
        }
    }

    fn compile_leaf(
        &self,
        member: &str,
        operator: FilterOperator,
        values: Option<&[serde_json::Value]>,
        date_range: Option<&DateRangeInput>,
        now: DateTime<Utc>,
    ) -> Result<Expr, SemLayerError> {
        let resolved = self.registry.resolve_member(member)?;
        let cube = self.registry.lookup(resolved.cube)?;

        let (field_type, sql) = match resolved.kind {
            MemberKind::Dimension => {
                let dim = &cube.dimensions[resolved.member];
                (dim.field_type, dim.sql.clone())
            }
            MemberKind::Measure => {
                let measure = &cube.measures[resolved.member];
                (
                    FieldType::Number,
                    measure.sql.clone().unwrap_or_else(|| "1".to_string()),
                )
            }
        };

        if date_range.is_some() && !matches!(operator, FilterOperator::InDateRange | FilterOperator::NotInDateRange)
        {
            return Err(SemLayerError::InvalidFilter(format!(
                "dateRange is only valid on inDateRange/notInDateRange filters, not {:?} on {}",
                operator, member
            )));
        }
        if matches!(operator, FilterOperator::InDateRange | FilterOperator::NotInDateRange)
            && field_type != FieldType::Time
        {
            return Err(SemLayerError::InvalidFilter(format!(
                "{} is not a time dimension, dateRange filters require one",
                member
            )));
        }

        let expr = raw_sql(&sql);
        let dialect = self.ctx.dialect.dialect();

        let coerced_values: Vec<Expr> = values
            .unwrap_or(&[])
            .iter()
            .map(|v| dialect.coerce_filter_value(v))
            .collect();
        let first_value = coerced_values.first().cloned().unwrap_or_else(lit_null);
        let any_null = values
            .unwrap_or(&[])
            .iter()
            .any(|v| v.is_null());

        match operator {
            FilterOperator::Equals => Ok(if any_null {
                expr.is_null()
            } else {
                expr.eq(first_value)
            }),
            FilterOperator::NotEquals => Ok(if any_null {
                expr.is_not_null()
            } else {
                expr.ne(first_value)
            }),
            FilterOperator::Contains => Ok(dialect.string_match(expr, StringMatchOp::Contains, first_value)),
            FilterOperator::NotContains => {
                Ok(dialect.string_match(expr, StringMatchOp::NotContains, first_value))
            }
            FilterOperator::StartsWith => {
                Ok(dialect.string_match(expr, StringMatchOp::StartsWith, first_value))
            }
            FilterOperator::EndsWith => Ok(dialect.string_match(expr, StringMatchOp::EndsWith, first_value)),
            FilterOperator::Like => Ok(expr.like(first_value)),
            FilterOperator::NotLike => Ok(expr.like(first_value).not()),
            FilterOperator::Ilike => Ok(dialect.string_match(expr, StringMatchOp::Ilike, first_value)),
            FilterOperator::Regex => dialect.regex_match(expr, first_value, false).ok_or_else(|| {
                SemLayerError::UnsupportedDialectFeature {
                    dialect: dialect.name().to_string(),
                    feature: "regex".to_string(),
                }
            }),
            FilterOperator::NotRegex => dialect.regex_match(expr, first_value, true).ok_or_else(|| {
                SemLayerError::UnsupportedDialectFeature {
                    dialect: dialect.name().to_string(),
                    feature: "regex".to_string(),
                }
            }),
            FilterOperator::Gt => Ok(expr.gt(first_value)),
            FilterOperator::Gte => Ok(expr.gte(first_value)),
            FilterOperator::Lt => Ok(expr.lt(first_value)),
            FilterOperator::Lte => Ok(expr.lte(first_value)),
            FilterOperator::Set => Ok(expr.is_not_null()),
            FilterOperator::NotSet => Ok(expr.is_null()),
            FilterOperator::BeforeDate => Ok(expr.lt(first_value)),
            FilterOperator::AfterDate => Ok(expr.gt(first_value)),
            FilterOperator::InDateRange | FilterOperator::NotInDateRange => {
                let range_input = date_range.ok_or_else(|| {
                    SemLayerError::InvalidFilter(format!("{} requires a dateRange", member))
                })?;
                let (start, end) = time_range::resolve_date_range(range_input, now)?;
                let in_range = col_expr_raw(&sql)
                    .gte(raw_sql(&format!("'{}'", start.to_rfc3339())))
                    .and(col_expr_raw(&sql).lt(raw_sql(&format!("'{}'", end.to_rfc3339()))));
                Ok(if operator == FilterOperator::InDateRange {
                    in_range
                } else {
                    in_range.not()
                })
            }
        }
    }
}

fn col_expr_raw(sql: &str) -> Expr {
    if sql.contains('(') || sql.contains(' ') {
        raw_sql(sql)
    } else {
        col(sql)
    }
}

fn conjoin(exprs: Vec<Expr>, is_and: bool) -> Expr {
    let mut iter = exprs.into_iter();
    let first = match iter.next() {
        Some(e) => e,
        None => return crate::sql::lit_bool(true),
    };
    iter.fold(first, |acc, e| if is_and { acc.and(e) } else { acc.or(e) })
}
