use crate::calc;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{optional_str, optional_usize};
use crate::ipc::types::{AppState, Request};
use rusqlite::{params_from_iter, types::Value, Connection};
use serde_json::json;

/// Load one consistent snapshot of results joined to student, class and
/// subject metadata, optionally scoped by the student's class or by
/// subject. Every aggregate reduces over a single such read.
pub(super) fn load_result_rows(
    conn: &Connection,
    class_id: Option<&str>,
    subject_id: Option<&str>,
) -> rusqlite::Result<Vec<calc::ResultRow>> {
    let mut clauses: Vec<&str> = Vec::new();
    let mut values: Vec<Value> = Vec::new();
    if let Some(cid) = class_id {
        clauses.push("s.class_id = ?");
        values.push(Value::Text(cid.to_string()));
    }
    if let Some(jid) = subject_id {
        clauses.push("r.subject_id = ?");
        values.push(Value::Text(jid.to_string()));
    }
    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    };

    let sql = format!(
        "SELECT r.id, r.student_id, s.first_name || ' ' || s.last_name,
                s.class_id, c.name, r.subject_id, j.name, r.marks, r.grade, r.gpa
         FROM results r
         JOIN students s ON s.id = r.student_id
         LEFT JOIN classes c ON c.id = s.class_id
         JOIN subjects j ON j.id = r.subject_id{}",
        where_sql
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(values), |row| {
            Ok(calc::ResultRow {
                result_id: row.get(0)?,
                student_id: row.get(1)?,
                student_name: row.get(2)?,
                class_id: row.get(3)?,
                class_name: row.get(4)?,
                subject_id: row.get(5)?,
                subject_name: row.get(6)?,
                marks: row.get(7)?,
                grade: row.get(8)?,
                gpa: row.get(9)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

struct Scope {
    class_id: Option<String>,
    subject_id: Option<String>,
}

fn parse_scope(req: &Request) -> Result<Scope, serde_json::Value> {
    Ok(Scope {
        class_id: optional_str(req, "classId")?,
        subject_id: optional_str(req, "subjectId")?,
    })
}

fn snapshot(
    state: &AppState,
    req: &Request,
) -> Result<Vec<calc::ResultRow>, serde_json::Value> {
    let Some(conn) = state.db.as_ref() else {
        return Ok(Vec::new());
    };
    let scope = parse_scope(req)?;
    load_result_rows(conn, scope.class_id.as_deref(), scope.subject_id.as_deref())
        .map_err(|e| err(&req.id, "db_query_failed", e.to_string(), None))
}

fn handle_class_averages(state: &mut AppState, req: &Request) -> serde_json::Value {
    match snapshot(state, req) {
        Ok(rows) => ok(&req.id, json!({ "classes": calc::class_averages(&rows) })),
        Err(resp) => resp,
    }
}

fn handle_subject_averages(state: &mut AppState, req: &Request) -> serde_json::Value {
    match snapshot(state, req) {
        Ok(rows) => ok(&req.id, json!({ "subjects": calc::subject_averages(&rows) })),
        Err(resp) => resp,
    }
}

fn handle_top_students(state: &mut AppState, req: &Request) -> serde_json::Value {
    let limit = match optional_usize(req, "limit", 5) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match snapshot(state, req) {
        Ok(rows) => ok(
            &req.id,
            json!({ "students": calc::top_students(&rows, limit) }),
        ),
        Err(resp) => resp,
    }
}

fn handle_pass_fail(state: &mut AppState, req: &Request) -> serde_json::Value {
    match snapshot(state, req) {
        Ok(rows) => ok(&req.id, json!(calc::pass_fail(&rows))),
        Err(resp) => resp,
    }
}

fn handle_grade_distribution(state: &mut AppState, req: &Request) -> serde_json::Value {
    match snapshot(state, req) {
        Ok(rows) => ok(
            &req.id,
            json!({ "distribution": calc::grade_distribution(&rows) }),
        ),
        Err(resp) => resp,
    }
}

fn handle_totals(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(
            &req.id,
            json!(calc::total_stats(&[], 0)),
        );
    };
    let scope = match parse_scope(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let total_students: i64 = {
        let query = match &scope.class_id {
            Some(cid) => conn.query_row(
                "SELECT COUNT(*) FROM students WHERE class_id = ?",
                [cid],
                |r| r.get(0),
            ),
            None => conn.query_row("SELECT COUNT(*) FROM students", [], |r| r.get(0)),
        };
        match query {
            Ok(v) => v,
            Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
        }
    };

    let rows = match load_result_rows(
        conn,
        scope.class_id.as_deref(),
        scope.subject_id.as_deref(),
    ) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    ok(&req.id, json!(calc::total_stats(&rows, total_students)))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "analytics.classAverages" => Some(handle_class_averages(state, req)),
        "analytics.subjectAverages" => Some(handle_subject_averages(state, req)),
        "analytics.topStudents" => Some(handle_top_students(state, req)),
        "analytics.passFail" => Some(handle_pass_fail(state, req)),
        "analytics.gradeDistribution" => Some(handle_grade_distribution(state, req)),
        "analytics.totals" => Some(handle_totals(state, req)),
        _ => None,
    }
}
