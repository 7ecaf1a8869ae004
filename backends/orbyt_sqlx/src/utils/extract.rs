use axum::extract::{FromRequest, FromRequestParts};
use serde_json::Value;

use crate::error::AppError;

// Extractor wrappers whose rejections render as `{message}` like every other error.

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct AppQuery<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct AppPath<T>(pub T);

/// Database ids are positive integers; anything else is malformed.
pub fn parse_id(raw: &str) -> Option<i64> {
    raw.trim().parse::<i64>().ok().filter(|id| *id > 0)
}

/// Ids arrive in JSON bodies either as numbers or as strings.
pub fn id_from_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64().filter(|id| *id > 0),
        Value::String(raw) => parse_id(raw),
        _ => None,
    }
}
