//! Shared scalar types used across the cube data model.

use serde::{Deserialize, Serialize};

/// The declared type of a dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Time,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Time => "time",
        }
    }
}

/// Display formatting hint carried on a measure for the `/meta` envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MeasureFormat {
    Currency,
    Percent,
    Number,
}

impl MeasureFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeasureFormat::Currency => "currency",
            MeasureFormat::Percent => "percent",
            MeasureFormat::Number => "number",
        }
    }
}
