use rusqlite::Connection;
use serde_json::json;

use crate::ipc::error::err;
use crate::ipc::types::{AppState, Request};

pub fn required_str(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.to_string())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

pub fn required_trimmed(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    let raw = required_str(req, key)?;
    let trimmed = raw.trim().to_string();
    if trimmed.is_empty() {
        return Err(err(
            &req.id,
            "bad_params",
            format!("{} must not be empty", key),
            None,
        ));
    }
    Ok(trimmed)
}

pub fn optional_str(req: &Request, key: &str) -> Result<Option<String>, serde_json::Value> {
    match req.params.get(key) {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(None),
        Some(v) => match v.as_str() {
            Some(s) if !s.trim().is_empty() => Ok(Some(s.trim().to_string())),
            Some(_) => Ok(None),
            None => Err(err(
                &req.id,
                "bad_params",
                format!("{} must be a string or null", key),
                Some(json!({ "key": key })),
            )),
        },
    }
}

pub fn required_f64(req: &Request, key: &str) -> Result<f64, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_f64())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

pub fn optional_usize(
    req: &Request,
    key: &str,
    default: usize,
) -> Result<usize, serde_json::Value> {
    match req.params.get(key) {
        None => Ok(default),
        Some(v) if v.is_null() => Ok(default),
        Some(v) => v
            .as_u64()
            .map(|n| n as usize)
            .ok_or_else(|| {
                err(
                    &req.id,
                    "bad_params",
                    format!("{} must be a non-negative integer", key),
                    None,
                )
            }),
    }
}

pub fn db_conn<'a>(state: &'a AppState, req: &Request) -> Result<&'a Connection, serde_json::Value> {
    state
        .db
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}
