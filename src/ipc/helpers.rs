use crate::calendar::HalfYear;
use crate::error::HourError;
use crate::ipc::response::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::store::DATE_FORMAT;
use chrono::NaiveDate;
use rusqlite::Connection;
use serde_json::json;
use tracing::{error, warn};

pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl HandlerErr {
    pub fn bad_params(message: impl Into<String>) -> Self {
        Self {
            code: "bad_params",
            message: message.into(),
            details: None,
        }
    }

    pub fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }
}

impl From<HourError> for HandlerErr {
    fn from(e: HourError) -> Self {
        match &e {
            HourError::Storage(inner) => error!(error = %inner, "storage operation failed"),
            other => warn!(code = other.code(), error = %other, "request rejected"),
        }
        Self {
            code: e.code(),
            message: e.to_string(),
            details: None,
        }
    }
}

/// Runs `f` against the open workspace database and wraps the outcome.
pub fn with_db<F>(state: &mut AppState, req: &Request, f: F) -> serde_json::Value
where
    F: FnOnce(&Connection, &serde_json::Value) -> Result<serde_json::Value, HandlerErr>,
{
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match f(conn, &req.params) {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    }
}

pub fn get_required_str(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

pub fn get_optional_str(params: &serde_json::Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

pub fn get_required_i64(params: &serde_json::Value, key: &str) -> Result<i64, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_i64())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing integer {}", key)))
}

pub fn get_optional_i64(params: &serde_json::Value, key: &str) -> Result<Option<i64>, HandlerErr> {
    match params.get(key) {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(None),
        Some(v) => v
            .as_i64()
            .map(Some)
            .ok_or_else(|| HandlerErr::bad_params(format!("{} must be integer", key))),
    }
}

/// Missing or null means an empty list.
pub fn get_string_list(params: &serde_json::Value, key: &str) -> Result<Vec<String>, HandlerErr> {
    let Some(v) = params.get(key) else {
        return Ok(Vec::new());
    };
    if v.is_null() {
        return Ok(Vec::new());
    }
    let Some(items) = v.as_array() else {
        return Err(HandlerErr::bad_params(format!("{} must be an array", key)));
    };
    items
        .iter()
        .map(|item| {
            item.as_str().map(|s| s.to_string()).ok_or_else(|| HandlerErr {
                code: "bad_params",
                message: format!("{} must contain only strings", key),
                details: Some(json!({ "value": item })),
            })
        })
        .collect()
}

pub fn get_date(params: &serde_json::Value, key: &str) -> Result<NaiveDate, HandlerErr> {
    let raw = get_required_str(params, key)?;
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|_| HandlerErr::bad_params(format!("{} must be YYYY-MM-DD", key)))
}

/// Accepts `half: "first"|"second"` or `semester: 1|2`.
pub fn get_optional_half(params: &serde_json::Value) -> Result<Option<HalfYear>, HandlerErr> {
    if let Some(h) = params.get("half").and_then(|v| v.as_str()) {
        return Ok(Some(HalfYear::parse(h)?));
    }
    match get_optional_i64(params, "semester")? {
        Some(s) => Ok(Some(HalfYear::from_semester(s)?)),
        None => Ok(None),
    }
}

pub fn get_half(params: &serde_json::Value) -> Result<HalfYear, HandlerErr> {
    get_optional_half(params)?
        .ok_or_else(|| HandlerErr::bad_params("missing half or semester"))
}

pub fn to_json<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, HandlerErr> {
    serde_json::to_value(value).map_err(|e| HandlerErr {
        code: "internal",
        message: e.to_string(),
        details: None,
    })
}
