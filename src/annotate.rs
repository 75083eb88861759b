//! Result Annotator: reshapes a raw [`RowSet`] into the Cube.js-compatible
//! [`ResponseEnvelope`], attaching per-column metadata and applying the
//! numeric/time-canonicalization contract. Stateless — every call is
//! independent of any prior one.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::envelope::{Annotation, AnnotationEntry, ResponseEnvelope};
use crate::error::SemLayerError;
use crate::executor::RowSet;
use crate::model::{FieldType, MeasureKind};
use crate::planner::Plan;
use crate::query_context::QueryContext;
use crate::registry::CubeRegistry;

pub struct ResultAnnotator<'a> {
    registry: &'a CubeRegistry,
    ctx: &'a QueryContext,
}

impl<'a> ResultAnnotator<'a> {
    pub fn new(registry: &'a CubeRegistry, ctx: &'a QueryContext) -> Self {
        ResultAnnotator { registry, ctx }
    }

    pub fn annotate(&self, plan: &Plan, rows: RowSet, total: Option<i64>) -> Result<ResponseEnvelope, SemLayerError> {
        if rows.columns.len()
            != rows
                .rows
                .first()
                .map(|r| r.len())
                .unwrap_or(rows.columns.len())
        {
            return Err(SemLayerError::ResultDecodeError(
                "row width does not match column count".to_string(),
            ));
        }

        let annotation = self.build_annotation(plan)?;
        let count_columns: Vec<&str> = plan
            .measure_items()
            .filter(|item| self.is_count_measure(item))
            .map(|item| item.alias.as_str())
            .collect();
        let time_storage_integer = self.ctx.dialect.dialect().timestamp_storage_is_integer();

        let mut data = Vec::with_capacity(rows.rows.len());
        for row in rows.rows {
            if row.len() != rows.columns.len() {
                return Err(SemLayerError::ResultDecodeError(
                    "row width does not match column count".to_string(),
                ));
            }
            let mut record = BTreeMap::new();
            for (column, value) in rows.columns.iter().zip(row.into_iter()) {
                let annotated = self.annotate_value(
                    column,
                    value,
                    &annotation,
                    &count_columns,
                    time_storage_integer,
                )?;
                record.insert(column.clone(), annotated);
            }
            data.push(record);
        }

        Ok(ResponseEnvelope {
            data,
            annotation,
            total,
        })
    }

    fn is_count_measure(&self, item: &crate::planner::SelectItem) -> bool {
        self.registry
            .lookup(&item.cube)
            .ok()
            .and_then(|cube| cube.measures.get(item.member.as_str()))
            .map(|m| matches!(m.kind, MeasureKind::Count | MeasureKind::CountDistinct))
            .unwrap_or(false)
    }

    fn annotate_value(
        &self,
        column: &str,
        value: Value,
        annotation: &Annotation,
        count_columns: &[&str],
        time_storage_integer: bool,
    ) -> Result<Value, SemLayerError> {
        if value.is_null() {
            if count_columns.contains(&column) {
                return Ok(Value::from(0));
            }
            return Ok(Value::Null);
        }

        let entry = annotation
            .dimensions
            .get(column)
            .or_else(|| annotation.time_dimensions.get(column))
            .or_else(|| annotation.measures.get(column));

        if let Some(entry) = entry {
            if entry.field_type == FieldType::Time {
                return canonicalize_time(value, time_storage_integer);
            }
        }

        Ok(value)
    }

    fn build_annotation(&self, plan: &Plan) -> Result<Annotation, SemLayerError> {
        let mut annotation = Annotation::default();
        for item in &plan.select {
            let cube = self.registry.lookup(&item.cube)?;
            if item.is_measure {
                let measure = cube.measures.get(item.member.as_str()).ok_or_else(|| {
                    SemLayerError::UnknownField(format!("{}.{}", item.cube, item.member))
                })?;
                let mut entry = AnnotationEntry::new(&measure.title, &measure.short_title, FieldType::Number);
                entry.format = measure.format;
                annotation.measures.insert(item.alias.clone(), entry);
            } else {
                let dim = cube.dimensions.get(item.member.as_str()).ok_or_else(|| {
                    SemLayerError::UnknownField(format!("{}.{}", item.cube, item.member))
                })?;
                let mut entry = AnnotationEntry::new(&dim.title, &dim.short_title, dim.field_type);
                if let Some(granularity) = item.granularity {
                    entry.granularity = Some(granularity);
                    annotation.time_dimensions.insert(item.alias.clone(), entry);
                } else {
                    annotation.dimensions.insert(item.alias.clone(), entry);
                }
            }
        }
        Ok(annotation)
    }
}

/// Canonicalizes a raw time value to an RFC3339 UTC instant string,
/// regardless of whether the driver returned epoch seconds (SQLite),
/// epoch millis, or a native timestamp string.
fn canonicalize_time(value: Value, storage_is_integer: bool) -> Result<Value, SemLayerError> {
    let instant = match &value {
        Value::Number(n) if storage_is_integer => n
            .as_i64()
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
            .ok_or_else(|| SemLayerError::ResultDecodeError(format!("bad epoch seconds: {n}")))?,
        Value::Number(n) => n
            .as_i64()
            .and_then(|millis| DateTime::<Utc>::from_timestamp_millis(millis))
            .ok_or_else(|| SemLayerError::ResultDecodeError(format!("bad epoch millis: {n}")))?,
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| SemLayerError::ResultDecodeError(format!("{s}: {e}")))?,
        other => {
            return Err(SemLayerError::ResultDecodeError(format!(
                "unsupported time representation: {other}"
            )))
        }
    };
    Ok(Value::String(instant.to_rfc3339()))
}
