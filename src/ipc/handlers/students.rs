use crate::db;
use crate::error::DomainError;
use crate::ipc::error::{domain_err, err, ok};
use crate::ipc::helpers::{db_conn, optional_str, optional_usize, required_str, required_trimmed};
use crate::ipc::types::{AppState, Request};
use rusqlite::{params_from_iter, types::Value, Connection, OptionalExtension};
use serde_json::json;
use uuid::Uuid;

fn student_json(row: &rusqlite::Row<'_>) -> rusqlite::Result<serde_json::Value> {
    let id: String = row.get(0)?;
    let admission_no: String = row.get(1)?;
    let first_name: String = row.get(2)?;
    let last_name: String = row.get(3)?;
    let gender: String = row.get(4)?;
    let birth_date: Option<String> = row.get(5)?;
    let class_id: Option<String> = row.get(6)?;
    Ok(json!({
        "id": id,
        "admissionNo": admission_no,
        "firstName": first_name,
        "lastName": last_name,
        "fullName": format!("{} {}", first_name, last_name),
        "gender": gender,
        "birthDate": birth_date,
        "classId": class_id
    }))
}

fn handle_students_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "students": [], "total": 0 }));
    };

    let class_id = match optional_str(req, "classId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let search = match optional_str(req, "search") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let page = match optional_usize(req, "page", 1) {
        Ok(v) => v.max(1),
        Err(resp) => return resp,
    };
    let page_size = match optional_usize(req, "pageSize", 20) {
        Ok(v) => v.clamp(1, 500),
        Err(resp) => return resp,
    };

    let mut where_clauses: Vec<&str> = Vec::new();
    let mut values: Vec<Value> = Vec::new();
    if let Some(q) = &search {
        where_clauses
            .push("(first_name LIKE ? OR last_name LIKE ? OR admission_no LIKE ?)");
        let pattern = format!("%{}%", q);
        values.push(Value::Text(pattern.clone()));
        values.push(Value::Text(pattern.clone()));
        values.push(Value::Text(pattern));
    }
    if let Some(cid) = &class_id {
        where_clauses.push("class_id = ?");
        values.push(Value::Text(cid.clone()));
    }
    let where_sql = if where_clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", where_clauses.join(" AND "))
    };

    let total: i64 = match conn.query_row(
        &format!("SELECT COUNT(*) FROM students{}", where_sql),
        params_from_iter(values.iter()),
        |r| r.get(0),
    ) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let sql = format!(
        "SELECT id, admission_no, first_name, last_name, gender, birth_date, class_id
         FROM students{}
         ORDER BY first_name, last_name
         LIMIT ? OFFSET ?",
        where_sql
    );
    values.push(Value::Integer(page_size as i64));
    values.push(Value::Integer(((page - 1) * page_size) as i64));

    let mut stmt = match conn.prepare(&sql) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let rows = stmt
        .query_map(params_from_iter(values), student_json)
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());

    match rows {
        Ok(students) => ok(
            &req.id,
            json!({ "students": students, "total": total, "page": page, "pageSize": page_size }),
        ),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn admission_taken(
    conn: &Connection,
    admission_no: &str,
    exclude_id: Option<&str>,
) -> rusqlite::Result<bool> {
    let existing: Option<String> = conn
        .query_row(
            "SELECT id FROM students WHERE admission_no = ?",
            [admission_no],
            |r| r.get(0),
        )
        .optional()?;
    Ok(match existing {
        Some(id) => exclude_id != Some(id.as_str()),
        None => false,
    })
}

fn class_exists(conn: &Connection, class_id: &str) -> rusqlite::Result<bool> {
    let found: Option<i64> = conn
        .query_row("SELECT 1 FROM classes WHERE id = ?", [class_id], |r| {
            r.get(0)
        })
        .optional()?;
    Ok(found.is_some())
}

fn handle_students_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let admission_no = match required_trimmed(req, "admissionNo") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let first_name = match required_trimmed(req, "firstName") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let last_name = match required_trimmed(req, "lastName") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let gender = match required_trimmed(req, "gender") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let birth_date = match optional_str(req, "birthDate") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let class_id = match optional_str(req, "classId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match admission_taken(conn, &admission_no, None) {
        Ok(true) => {
            return domain_err(&req.id, &DomainError::Duplicate("admission number"));
        }
        Ok(false) => {}
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    }
    if let Some(cid) = &class_id {
        match class_exists(conn, cid) {
            Ok(true) => {}
            Ok(false) => return domain_err(&req.id, &DomainError::NotFound("class")),
            Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
        }
    }

    let student_id = Uuid::new_v4().to_string();
    if let Err(e) = conn.execute(
        "INSERT INTO students(id, admission_no, first_name, last_name, gender, birth_date, class_id, created_at)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?)",
        (
            &student_id,
            &admission_no,
            &first_name,
            &last_name,
            &gender,
            &birth_date,
            &class_id,
            &db::now_utc(),
        ),
    ) {
        return err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": "students" })),
        );
    }

    tracing::info!(student_id = %student_id, admission_no = %admission_no, "student created");
    ok(
        &req.id,
        json!({
            "studentId": student_id,
            "admissionNo": admission_no,
            "fullName": format!("{} {}", first_name, last_name)
        }),
    )
}

fn handle_students_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let admission_no = match required_trimmed(req, "admissionNo") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let first_name = match required_trimmed(req, "firstName") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let last_name = match required_trimmed(req, "lastName") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let gender = match required_trimmed(req, "gender") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let birth_date = match optional_str(req, "birthDate") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let class_id = match optional_str(req, "classId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match admission_taken(conn, &admission_no, Some(student_id.as_str())) {
        Ok(true) => {
            return domain_err(&req.id, &DomainError::Duplicate("admission number"));
        }
        Ok(false) => {}
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    }
    if let Some(cid) = &class_id {
        match class_exists(conn, cid) {
            Ok(true) => {}
            Ok(false) => return domain_err(&req.id, &DomainError::NotFound("class")),
            Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
        }
    }

    match conn.execute(
        "UPDATE students
         SET admission_no = ?, first_name = ?, last_name = ?, gender = ?, birth_date = ?, class_id = ?
         WHERE id = ?",
        (
            &admission_no,
            &first_name,
            &last_name,
            &gender,
            &birth_date,
            &class_id,
            &student_id,
        ),
    ) {
        Ok(0) => domain_err(&req.id, &DomainError::NotFound("student")),
        Ok(_) => ok(
            &req.id,
            json!({ "studentId": student_id, "admissionNo": admission_no }),
        ),
        Err(e) => err(&req.id, "db_update_failed", e.to_string(), None),
    }
}

fn handle_students_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let exists: Option<i64> = match conn
        .query_row("SELECT 1 FROM students WHERE id = ?", [&student_id], |r| {
            r.get(0)
        })
        .optional()
    {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    if exists.is_none() {
        return domain_err(&req.id, &DomainError::NotFound("student"));
    }

    let tx = match conn.unchecked_transaction() {
        Ok(t) => t,
        Err(e) => return err(&req.id, "db_tx_failed", e.to_string(), None),
    };

    // A student owns their results; removing the student removes them all.
    if let Err(e) = tx.execute("DELETE FROM results WHERE student_id = ?", [&student_id]) {
        let _ = tx.rollback();
        return err(&req.id, "db_delete_failed", e.to_string(), None);
    }
    if let Err(e) = tx.execute("DELETE FROM students WHERE id = ?", [&student_id]) {
        let _ = tx.rollback();
        return err(&req.id, "db_delete_failed", e.to_string(), None);
    }
    if let Err(e) = tx.commit() {
        return err(&req.id, "db_tx_failed", e.to_string(), None);
    }

    tracing::info!(student_id = %student_id, "student deleted");
    ok(&req.id, json!({ "deleted": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(handle_students_list(state, req)),
        "students.create" => Some(handle_students_create(state, req)),
        "students.update" => Some(handle_students_update(state, req)),
        "students.delete" => Some(handle_students_delete(state, req)),
        _ => None,
    }
}
