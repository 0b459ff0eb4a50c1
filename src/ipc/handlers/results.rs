use crate::db;
use crate::calc;
use crate::error::DomainError;
use crate::ipc::error::{domain_err, err, ok};
use crate::ipc::helpers::{db_conn, optional_str, required_f64, required_str};
use crate::ipc::types::{AppState, Request};
use rusqlite::{params_from_iter, types::Value, Connection, ErrorCode, OptionalExtension};
use serde_json::json;
use uuid::Uuid;

fn marks_in_range(marks: f64) -> bool {
    (0.0..=100.0).contains(&marks)
}

fn load_result(conn: &Connection, result_id: &str) -> rusqlite::Result<Option<serde_json::Value>> {
    conn.query_row(
        "SELECT id, student_id, subject_id, marks, grade, gpa, remarks, created_at, updated_at
         FROM results WHERE id = ?",
        [result_id],
        |row| {
            let id: String = row.get(0)?;
            let student_id: String = row.get(1)?;
            let subject_id: String = row.get(2)?;
            let marks: f64 = row.get(3)?;
            let grade: String = row.get(4)?;
            let gpa: f64 = row.get(5)?;
            let remarks: String = row.get(6)?;
            let created_at: String = row.get(7)?;
            let updated_at: String = row.get(8)?;
            Ok(json!({
                "id": id,
                "studentId": student_id,
                "subjectId": subject_id,
                "marks": marks,
                "grade": grade,
                "gpa": gpa,
                "remarks": remarks,
                "createdAt": created_at,
                "updatedAt": updated_at
            }))
        },
    )
    .optional()
}

fn row_exists(conn: &Connection, table: &str, id: &str) -> rusqlite::Result<bool> {
    let sql = format!("SELECT 1 FROM {} WHERE id = ?", table);
    let found: Option<i64> = conn.query_row(&sql, [id], |r| r.get(0)).optional()?;
    Ok(found.is_some())
}

fn handle_results_add(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let subject_id = match required_str(req, "subjectId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let marks = match required_f64(req, "marks") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if !marks_in_range(marks) {
        return domain_err(&req.id, &DomainError::OutOfRange { marks });
    }

    match row_exists(conn, "students", &student_id) {
        Ok(true) => {}
        Ok(false) => return domain_err(&req.id, &DomainError::NotFound("student")),
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    }
    match row_exists(conn, "subjects", &subject_id) {
        Ok(true) => {}
        Ok(false) => return domain_err(&req.id, &DomainError::NotFound("subject")),
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    }

    let classified = calc::classify(marks);
    let result_id = Uuid::new_v4().to_string();
    let now = db::now_utc();

    // One INSERT carries the mark and all three derived fields; the UNIQUE
    // (student_id, subject_id) constraint makes the duplicate check and the
    // write a single atomic unit even across concurrent connections.
    match conn.execute(
        "INSERT INTO results(id, student_id, subject_id, marks, grade, gpa, remarks, created_at, updated_at)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?)",
        (
            &result_id,
            &student_id,
            &subject_id,
            marks,
            classified.grade,
            classified.gpa,
            classified.remark,
            &now,
            &now,
        ),
    ) {
        Ok(_) => {}
        Err(rusqlite::Error::SqliteFailure(f, _)) if f.code == ErrorCode::ConstraintViolation => {
            return domain_err(
                &req.id,
                &DomainError::DuplicateResult {
                    student_id,
                    subject_id,
                },
            );
        }
        Err(e) => {
            return err(
                &req.id,
                "db_insert_failed",
                e.to_string(),
                Some(json!({ "table": "results" })),
            )
        }
    }

    tracing::info!(
        result_id = %result_id,
        student_id = %student_id,
        subject_id = %subject_id,
        marks,
        grade = classified.grade,
        "result added"
    );
    ok(
        &req.id,
        json!({
            "result": {
                "id": result_id,
                "studentId": student_id,
                "subjectId": subject_id,
                "marks": marks,
                "grade": classified.grade,
                "gpa": classified.gpa,
                "remarks": classified.remark,
                "createdAt": now,
                "updatedAt": now
            }
        }),
    )
}

fn handle_results_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let result_id = match required_str(req, "resultId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let marks = match required_f64(req, "marks") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if !marks_in_range(marks) {
        return domain_err(&req.id, &DomainError::OutOfRange { marks });
    }

    let classified = calc::classify(marks);

    // Mark and derived fields move in one UPDATE so a reader can never see
    // a fresh mark with a stale grade, or the reverse.
    match conn.execute(
        "UPDATE results SET marks = ?, grade = ?, gpa = ?, remarks = ?, updated_at = ?
         WHERE id = ?",
        (
            marks,
            classified.grade,
            classified.gpa,
            classified.remark,
            &db::now_utc(),
            &result_id,
        ),
    ) {
        Ok(0) => return domain_err(&req.id, &DomainError::NotFound("result")),
        Ok(_) => {}
        Err(e) => return err(&req.id, "db_update_failed", e.to_string(), None),
    }

    tracing::info!(result_id = %result_id, marks, grade = classified.grade, "result updated");
    match load_result(conn, &result_id) {
        Ok(Some(result)) => ok(&req.id, json!({ "result": result })),
        Ok(None) => domain_err(&req.id, &DomainError::NotFound("result")),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_results_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let result_id = match required_str(req, "resultId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match conn.execute("DELETE FROM results WHERE id = ?", [&result_id]) {
        Ok(0) => domain_err(&req.id, &DomainError::NotFound("result")),
        Ok(_) => {
            tracing::info!(result_id = %result_id, "result deleted");
            ok(&req.id, json!({ "deleted": true }))
        }
        Err(e) => err(&req.id, "db_delete_failed", e.to_string(), None),
    }
}

fn handle_results_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "results": [] }));
    };
    let student_id = match optional_str(req, "studentId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let subject_id = match optional_str(req, "subjectId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let class_id = match optional_str(req, "classId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let mut clauses: Vec<&str> = Vec::new();
    let mut values: Vec<Value> = Vec::new();
    if let Some(sid) = &student_id {
        clauses.push("r.student_id = ?");
        values.push(Value::Text(sid.clone()));
    }
    if let Some(jid) = &subject_id {
        clauses.push("r.subject_id = ?");
        values.push(Value::Text(jid.clone()));
    }
    if let Some(cid) = &class_id {
        // A result belongs to a class through the student enrolled in it,
        // never through the subject's class; the two may differ.
        clauses.push("s.class_id = ?");
        values.push(Value::Text(cid.clone()));
    }
    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    };

    let sql = format!(
        "SELECT r.id, r.student_id, s.first_name || ' ' || s.last_name,
                r.subject_id, j.name, r.marks, r.grade, r.gpa, r.remarks,
                r.created_at, r.updated_at
         FROM results r
         JOIN students s ON s.id = r.student_id
         JOIN subjects j ON j.id = r.subject_id{}
         ORDER BY r.created_at, r.id",
        where_sql
    );

    let mut stmt = match conn.prepare(&sql) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let rows = stmt
        .query_map(params_from_iter(values), |row| {
            let id: String = row.get(0)?;
            let student_id: String = row.get(1)?;
            let student_name: String = row.get(2)?;
            let subject_id: String = row.get(3)?;
            let subject_name: String = row.get(4)?;
            let marks: f64 = row.get(5)?;
            let grade: String = row.get(6)?;
            let gpa: f64 = row.get(7)?;
            let remarks: String = row.get(8)?;
            let created_at: String = row.get(9)?;
            let updated_at: String = row.get(10)?;
            Ok(json!({
                "id": id,
                "studentId": student_id,
                "studentName": student_name,
                "subjectId": subject_id,
                "subjectName": subject_name,
                "marks": marks,
                "grade": grade,
                "gpa": gpa,
                "remarks": remarks,
                "createdAt": created_at,
                "updatedAt": updated_at
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());

    match rows {
        Ok(results) => ok(&req.id, json!({ "results": results })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "results.add" => Some(handle_results_add(state, req)),
        "results.update" => Some(handle_results_update(state, req)),
        "results.delete" => Some(handle_results_delete(state, req)),
        "results.list" => Some(handle_results_list(state, req)),
        _ => None,
    }
}
