//! Happy-path response envelope helpers.

use axum::{Json, http::StatusCode};
use serde::Serialize;
use serde_json::{Value, json};

/// `200 {"success": true, "data": ...}`
pub fn ok<T: Serialize>(data: T) -> Json<Value> {
  Json(json!({ "success": true, "data": data }))
}

/// `201 {"success": true, "data": ...}`
pub fn created<T: Serialize>(data: T) -> (StatusCode, Json<Value>) {
  (StatusCode::CREATED, ok(data))
}

/// `200 {"success": true, "message": ...}` — for operations with no body.
pub fn message(text: &str) -> Json<Value> {
  Json(json!({ "success": true, "message": text }))
}
