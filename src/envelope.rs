//! Cube.js-compatible response envelope: the wire shape the Result
//! Annotator emits.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::types::{FieldType, MeasureFormat};
use crate::sql::TimeGranularity;

/// Per-column metadata attached to the envelope's `annotation` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotationEntry {
    pub title: String,
    #[serde(rename = "shortTitle")]
    pub short_title: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<MeasureFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub granularity: Option<TimeGranularity>,
}

impl AnnotationEntry {
    pub fn new(title: impl Into<String>, short_title: impl Into<String>, field_type: FieldType) -> Self {
        AnnotationEntry {
            title: title.into(),
            short_title: short_title.into(),
            field_type,
            format: None,
            granularity: None,
        }
    }
}

/// The three annotation maps, keyed by output column alias
/// (`Cube.member` or `Cube.member.granularity`). `BTreeMap` keeps the
/// rendered JSON deterministic, which the `insta` SQL/envelope snapshots
/// rely on.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Annotation {
    pub measures: BTreeMap<String, AnnotationEntry>,
    pub dimensions: BTreeMap<String, AnnotationEntry>,
    #[serde(rename = "timeDimensions")]
    pub time_dimensions: BTreeMap<String, AnnotationEntry>,
}

/// The bit-exact Cube.js-compatible response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub data: Vec<BTreeMap<String, Value>>,
    pub annotation: Annotation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<i64>,
}

/// The error-response body shape (`400`/`422`/`500` per `SemLayerError::http_status`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl From<&crate::error::SemLayerError> for ErrorEnvelope {
    fn from(err: &crate::error::SemLayerError) -> Self {
        ErrorEnvelope {
            error: err.kind().to_string(),
            message: err.to_string(),
            details: None,
        }
    }
}
