//! Typed field extraction over `serde_json` values.
//!
//! Every Tiled parser reads its document through these helpers. A missing or
//! out-of-range field records a [`ParseError`] into a [`ParseReport`] instead of
//! returning early, so one pass over a document collects every problem in it.
//!
//! # Example
//!
//! ```rust
//! use bevy_tiledimport_assets::json::{ParseReport, required_int};
//! use serde_json::json;
//!
//! let value = json!({ "width": 0 });
//! let object = value.as_object().unwrap();
//!
//! let mut report = ParseReport::new();
//! let width = required_int(object, "width", 1, "level.tmj", &mut report);
//! let height = required_int(object, "height", 1, "level.tmj", &mut report);
//!
//! // Clamped to the minimum, the missing field reads as zero, both are recorded
//! assert_eq!((width, height), (1, 0));
//! assert_eq!(report.errors().len(), 2);
//! ```

use std::fmt::Display;
use std::path::{Path, PathBuf};

use bevy::prelude::*;
use serde_json::{Map, Value};
use thiserror::Error;

/// A JSON object as exposed by `serde_json`.
pub type JsonObject = Map<String, Value>;

/// File extensions accepted by [`load_json_file`].
pub const JSON_EXTENSIONS: [&str; 3] = ["json", "tmj", "tsj"];

/// A single problem found while reading a Tiled document.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("Failed to parse '{context}'. Missing '{field}' property")]
    MissingField { context: String, field: String },

    #[error("Failed to parse '{context}'. Invalid value for '{field}' ({value} but must be at least {min})")]
    BelowMinimum {
        context: String,
        field: String,
        value: String,
        min: String,
    },

    #[error("Failed to parse '{context}'. Invalid value for '{field}' ('{value}' but expected {expected})")]
    UnexpectedLiteral {
        context: String,
        field: String,
        value: String,
        expected: &'static str,
    },

    #[error("Failed to parse '{context}'. {message}")]
    Invalid { context: String, message: String },
}

impl ParseError {
    pub fn invalid(context: &str, message: impl Into<String>) -> Self {
        Self::Invalid {
            context: context.to_owned(),
            message: message.into(),
        }
    }

    fn missing(context: &str, field: &str) -> Self {
        Self::MissingField {
            context: context.to_owned(),
            field: field.to_owned(),
        }
    }
}

/// Accumulates parse errors across one document.
///
/// Parsers never abort on a bad field. They record the error here and keep going,
/// then report success as "no new errors since I started" via [`ParseReport::mark`]
/// and [`ParseReport::clean_since`].
#[derive(Debug, Default, Clone)]
pub struct ParseReport {
    errors: Vec<ParseError>,
}

impl ParseReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log and store an error.
    pub fn record(&mut self, error: ParseError) {
        error!("{error}");
        self.errors.push(error);
    }

    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    /// Current position in the error list, for use with [`ParseReport::clean_since`].
    pub fn mark(&self) -> usize {
        self.errors.len()
    }

    /// `true` if nothing was recorded after `mark` was taken.
    pub fn clean_since(&self, mark: usize) -> bool {
        self.errors.len() == mark
    }
}

/// A string enum that Tiled writes as one of a fixed set of literals.
///
/// Matching is exact and case-sensitive.
pub trait TiledLiteral: Sized + Copy {
    /// Accepted literals, used in error messages (e.g. `"'x' or 'y'"`).
    const EXPECTED: &'static str;

    fn from_literal(literal: &str) -> Option<Self>;
}

/// Read a JSON number, accepting numeric strings.
///
/// Tiled writes the map `version` as a string (`"1.10"`) in recent releases.
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn at_least<T: PartialOrd + Copy + Display>(
    value: T,
    min: T,
    field: &str,
    context: &str,
    report: &mut ParseReport,
) -> T {
    if value < min {
        report.record(ParseError::BelowMinimum {
            context: context.to_owned(),
            field: field.to_owned(),
            value: value.to_string(),
            min: min.to_string(),
        });
        min
    } else {
        value
    }
}

/// Read a required integer with a lower bound.
///
/// Missing fields read as `0`, values below `min` are clamped to `min`. Both cases
/// record an error.
pub fn required_int(
    object: &JsonObject,
    field: &str,
    min: i64,
    context: &str,
    report: &mut ParseReport,
) -> i64 {
    let Some(value) = object.get(field).and_then(as_number) else {
        report.record(ParseError::missing(context, field));
        return 0;
    };
    at_least(value as i64, min, field, context, report)
}

/// Read an optional integer with a lower bound, falling back to `default` silently.
pub fn optional_int(
    object: &JsonObject,
    field: &str,
    min: i64,
    default: i64,
    context: &str,
    report: &mut ParseReport,
) -> i64 {
    match object.get(field).and_then(as_number) {
        Some(value) => at_least(value as i64, min, field, context, report),
        None => default,
    }
}

/// Read an optional floating point field with a lower bound.
///
/// Pass `f64::NEG_INFINITY` as `min` for unbounded fields.
pub fn optional_number(
    object: &JsonObject,
    field: &str,
    min: f64,
    default: f64,
    context: &str,
    report: &mut ParseReport,
) -> f64 {
    match object.get(field).and_then(as_number) {
        Some(value) => at_least(value, min, field, context, report),
        None => default,
    }
}

/// Read a required string. Missing fields read as `""` and record an error.
pub fn required_str<'a>(
    object: &'a JsonObject,
    field: &str,
    context: &str,
    report: &mut ParseReport,
) -> &'a str {
    match optional_str(object, field) {
        Some(value) => value,
        None => {
            report.record(ParseError::missing(context, field));
            ""
        }
    }
}

pub fn optional_str<'a>(object: &'a JsonObject, field: &str) -> Option<&'a str> {
    object.get(field).and_then(Value::as_str)
}

pub fn optional_bool(object: &JsonObject, field: &str, default: bool) -> bool {
    object.get(field).and_then(Value::as_bool).unwrap_or(default)
}

pub fn array<'a>(object: &'a JsonObject, field: &str) -> Option<&'a [Value]> {
    object.get(field).and_then(Value::as_array).map(Vec::as_slice)
}

pub fn object<'a>(object: &'a JsonObject, field: &str) -> Option<&'a JsonObject> {
    object.get(field).and_then(Value::as_object)
}

/// Read an optional enum literal. An absent or empty string yields `None` without
/// error, an unknown literal yields `None` and records an error.
pub fn optional_literal<T: TiledLiteral>(
    object: &JsonObject,
    field: &str,
    context: &str,
    report: &mut ParseReport,
) -> Option<T> {
    let literal = optional_str(object, field).unwrap_or_default();
    if literal.is_empty() {
        return None;
    }
    let parsed = T::from_literal(literal);
    if parsed.is_none() {
        report.record(ParseError::UnexpectedLiteral {
            context: context.to_owned(),
            field: field.to_owned(),
            value: literal.to_owned(),
            expected: T::EXPECTED,
        });
    }
    parsed
}

/// Like [`optional_literal`], but absence is an error too.
pub fn required_literal<T: TiledLiteral>(
    object: &JsonObject,
    field: &str,
    context: &str,
    report: &mut ParseReport,
) -> Option<T> {
    let mark = report.mark();
    let parsed = optional_literal(object, field, context, report);
    if parsed.is_none() && report.clean_since(mark) {
        report.record(ParseError::UnexpectedLiteral {
            context: context.to_owned(),
            field: field.to_owned(),
            value: String::new(),
            expected: T::EXPECTED,
        });
    }
    parsed
}

/// Errors from [`load_json_file`].
#[derive(Debug, Error)]
pub enum JsonFileError {
    #[error("Unsupported file extension for '{}' (expected .json, .tmj or .tsj)", .0.display())]
    UnsupportedExtension(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Expected a JSON object at the root of '{}'", .0.display())]
    NotAnObject(PathBuf),
}

/// Load a Tiled JSON export from disk.
///
/// Only `.json`, `.tmj` and `.tsj` files are accepted, and the root must be an object.
pub fn load_json_file(path: &Path) -> Result<Value, JsonFileError> {
    let supported = path
        .extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| JSON_EXTENSIONS.contains(&extension.to_ascii_lowercase().as_str()));
    if !supported {
        return Err(JsonFileError::UnsupportedExtension(path.to_path_buf()));
    }

    let text = std::fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&text)?;
    if !value.is_object() {
        return Err(JsonFileError::NotAnObject(path.to_path_buf()));
    }
    Ok(value)
}

/// The top-level `type` discriminator of a Tiled document (`"map"` or `"tileset"`).
pub fn document_type(document: &Value) -> Option<&str> {
    document.get("type").and_then(Value::as_str)
}
