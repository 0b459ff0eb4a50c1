#![allow(dead_code)]

use resultsd::ipc::{handle_request, AppState, Request};
use serde_json::json;
use std::path::Path;
use tempfile::TempDir;

pub fn new_state() -> AppState {
    AppState {
        workspace: None,
        db: None,
    }
}

pub fn temp_workspace() -> TempDir {
    tempfile::Builder::new()
        .prefix("resultsd-test")
        .tempdir()
        .expect("create temp workspace")
}

pub fn request(
    state: &mut AppState,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    handle_request(
        state,
        Request {
            id: id.to_string(),
            method: method.to_string(),
            params,
        },
    )
}

pub fn request_ok(
    state: &mut AppState,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let resp = request(state, id, method, params);
    assert_eq!(resp["ok"], json!(true), "expected ok response, got {resp}");
    resp["result"].clone()
}

pub fn request_err(
    state: &mut AppState,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> String {
    let resp = request(state, id, method, params);
    assert_eq!(
        resp["ok"],
        json!(false),
        "expected error response, got {resp}"
    );
    resp["error"]["code"]
        .as_str()
        .expect("error code")
        .to_string()
}

pub fn open_workspace(state: &mut AppState, path: &Path) {
    let result = request_ok(
        state,
        "ws",
        "workspace.select",
        json!({ "path": path.to_string_lossy() }),
    );
    assert!(result["workspacePath"].is_string());
}

pub fn open_state(workspace: &TempDir) -> AppState {
    let mut state = new_state();
    open_workspace(&mut state, workspace.path());
    state
}

pub fn create_class(state: &mut AppState, name: &str, academic_year: &str) -> String {
    let result = request_ok(
        state,
        "cc",
        "classes.create",
        json!({ "name": name, "academicYear": academic_year }),
    );
    result["classId"].as_str().expect("classId").to_string()
}

pub fn create_student(
    state: &mut AppState,
    admission_no: &str,
    first_name: &str,
    last_name: &str,
    class_id: Option<&str>,
) -> String {
    let result = request_ok(
        state,
        "cs",
        "students.create",
        json!({
            "admissionNo": admission_no,
            "firstName": first_name,
            "lastName": last_name,
            "gender": "F",
            "classId": class_id
        }),
    );
    result["studentId"].as_str().expect("studentId").to_string()
}

pub fn create_subject(state: &mut AppState, name: &str, class_id: Option<&str>) -> String {
    let result = request_ok(
        state,
        "cj",
        "subjects.create",
        json!({ "name": name, "classId": class_id }),
    );
    result["subjectId"].as_str().expect("subjectId").to_string()
}

pub fn add_result(
    state: &mut AppState,
    student_id: &str,
    subject_id: &str,
    marks: f64,
) -> serde_json::Value {
    let result = request_ok(
        state,
        "cr",
        "results.add",
        json!({ "studentId": student_id, "subjectId": subject_id, "marks": marks }),
    );
    result["result"].clone()
}
