use crate::calc;
use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::required_f64;
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::PathBuf;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string())
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    match db::open_db(&path) {
        Ok(conn) => {
            state.workspace = Some(path.clone());
            state.db = Some(conn);
            tracing::info!(workspace = %path.display(), "workspace opened");
            ok(&req.id, json!({ "workspacePath": path.to_string_lossy() }))
        }
        Err(e) => err(&req.id, "db_open_failed", format!("{e:?}"), None),
    }
}

fn handle_grading_classify(req: &Request) -> serde_json::Value {
    let marks = match required_f64(req, "marks") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let classified = calc::classify(marks);
    ok(
        &req.id,
        json!({
            "grade": classified.grade,
            "gpa": classified.gpa,
            "remarks": classified.remark
        }),
    )
}

fn handle_grading_scale(req: &Request) -> serde_json::Value {
    let bands: Vec<serde_json::Value> = calc::GRADE_SCALE
        .iter()
        .map(|b| {
            json!({
                "low": b.low,
                "high": b.high,
                "grade": b.grade,
                "gpa": b.gpa,
                "remarks": b.remark
            })
        })
        .collect();
    ok(&req.id, json!({ "bands": bands }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        "grading.classify" => Some(handle_grading_classify(req)),
        "grading.scale" => Some(handle_grading_scale(req)),
        _ => None,
    }
}
