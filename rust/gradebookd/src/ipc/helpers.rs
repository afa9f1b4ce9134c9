//! Request parameter parsing shared by the handlers.
//!
//! Ids and grades are accepted as JSON numbers or numeric strings, since the
//! presentation layer reads them straight from `<select>` values.

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{GradebookError, Result};
use crate::model::Grade;

fn int_value(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn is_blank(v: Option<&Value>) -> bool {
    match v {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        _ => false,
    }
}

pub fn required_id(params: &Value, key: &'static str) -> Result<i64> {
    let Some(raw) = params.get(key).filter(|v| !v.is_null()) else {
        return Err(GradebookError::validation(key, format!("missing {key}")));
    };
    match int_value(raw) {
        Some(v) if v > 0 => Ok(v),
        _ => Err(GradebookError::validation(
            key,
            format!("{key} must be a positive integer"),
        )),
    }
}

pub fn required_str<'a>(params: &'a Value, key: &'static str) -> Result<&'a str> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| GradebookError::validation(key, format!("missing {key}")))
}

pub fn optional_str<'a>(params: &'a Value, key: &'static str) -> Result<Option<&'a str>> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(GradebookError::validation(
            key,
            format!("{key} must be a string"),
        )),
    }
}

pub fn required_f64(params: &Value, key: &'static str) -> Result<f64> {
    let Some(raw) = params.get(key).filter(|v| !is_blank(Some(*v))) else {
        return Err(GradebookError::validation(key, format!("missing {key}")));
    };
    let parsed = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .filter(|v| v.is_finite())
        .ok_or_else(|| GradebookError::validation(key, format!("{key} must be a number")))
}

pub fn required_grade(params: &Value, key: &'static str) -> Result<Grade> {
    optional_grade(params, key)?
        .ok_or_else(|| GradebookError::validation(key, format!("missing {key}")))
}

pub fn optional_grade(params: &Value, key: &'static str) -> Result<Option<Grade>> {
    let raw = params.get(key);
    if is_blank(raw) {
        return Ok(None);
    }
    let v = raw
        .and_then(int_value)
        .ok_or_else(|| GradebookError::validation(key, format!("{key} must be an integer")))?;
    Grade::try_from(v)
        .map(Some)
        .map_err(|m| GradebookError::validation(key, m))
}

pub fn optional_date(params: &Value, key: &'static str) -> Result<Option<NaiveDate>> {
    let raw = params.get(key);
    if is_blank(raw) {
        return Ok(None);
    }
    let s = raw
        .and_then(|v| v.as_str())
        .ok_or_else(|| GradebookError::validation(key, format!("{key} must be a string")))?;
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map(Some)
        .map_err(|_| GradebookError::validation(key, format!("{key} must be YYYY-MM-DD, got {s:?}")))
}

/// A score cell: number, numeric string, or `""`/null for "cleared".
pub fn score_value(raw: Option<&Value>) -> Result<Option<f64>> {
    if is_blank(raw) {
        return Ok(None);
    }
    let parsed = match raw {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(GradebookError::validation(
            "score",
            format!("unparseable score: {}", raw.map(Value::to_string).unwrap_or_default()),
        )),
    }
}

/// Deserializes a nested object param (patches, filters). Missing means default.
pub fn object_param<T>(params: &Value, key: &'static str) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    match params.get(key) {
        None | Some(Value::Null) => Ok(T::default()),
        Some(v @ Value::Object(_)) => serde_json::from_value(v.clone())
            .map_err(|e| GradebookError::validation(key, format!("invalid {key}: {e}"))),
        Some(_) => Err(GradebookError::validation(
            key,
            format!("{key} must be an object"),
        )),
    }
}
