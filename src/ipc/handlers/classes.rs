use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_conn, required_str, required_trimmed};
use crate::ipc::types::{AppState, Request};
use rusqlite::OptionalExtension;
use serde_json::json;
use uuid::Uuid;

fn handle_classes_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "classes": [] }));
    };

    // Include basic counts so the UI can show a useful dashboard.
    // Use correlated subqueries to avoid double-counting from joins.
    let mut stmt = match conn.prepare(
        "SELECT
           c.id,
           c.name,
           c.academic_year,
           (SELECT COUNT(*) FROM students s WHERE s.class_id = c.id) AS student_count,
           (SELECT COUNT(*) FROM subjects j WHERE j.class_id = c.id) AS subject_count
         FROM classes c
         ORDER BY c.name",
    ) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let rows = stmt
        .query_map([], |row| {
            let id: String = row.get(0)?;
            let name: String = row.get(1)?;
            let academic_year: String = row.get(2)?;
            let student_count: i64 = row.get(3)?;
            let subject_count: i64 = row.get(4)?;
            Ok(json!({
                "id": id,
                "name": name,
                "academicYear": academic_year,
                "studentCount": student_count,
                "subjectCount": subject_count
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());

    match rows {
        Ok(classes) => ok(&req.id, json!({ "classes": classes })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_classes_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let name = match required_trimmed(req, "name") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let academic_year = match required_trimmed(req, "academicYear") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let class_id = Uuid::new_v4().to_string();
    if let Err(e) = conn.execute(
        "INSERT INTO classes(id, name, academic_year, created_at) VALUES(?, ?, ?, ?)",
        (&class_id, &name, &academic_year, &db::now_utc()),
    ) {
        return err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": "classes" })),
        );
    }

    tracing::info!(class_id = %class_id, name = %name, "class created");
    ok(
        &req.id,
        json!({ "classId": class_id, "name": name, "academicYear": academic_year }),
    )
}

fn handle_classes_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let class_id = match required_str(req, "classId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let name = match required_trimmed(req, "name") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let academic_year = match required_trimmed(req, "academicYear") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match conn.execute(
        "UPDATE classes SET name = ?, academic_year = ? WHERE id = ?",
        (&name, &academic_year, &class_id),
    ) {
        Ok(0) => err(&req.id, "not_found", "class not found", None),
        Ok(_) => ok(
            &req.id,
            json!({ "classId": class_id, "name": name, "academicYear": academic_year }),
        ),
        Err(e) => err(&req.id, "db_update_failed", e.to_string(), None),
    }
}

fn handle_classes_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let class_id = match required_str(req, "classId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let exists: Option<i64> = match conn
        .query_row("SELECT 1 FROM classes WHERE id = ?", [&class_id], |r| {
            r.get(0)
        })
        .optional()
    {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    if exists.is_none() {
        return err(&req.id, "not_found", "class not found", None);
    }

    let tx = match conn.unchecked_transaction() {
        Ok(t) => t,
        Err(e) => return err(&req.id, "db_tx_failed", e.to_string(), None),
    };

    // Deleting a class detaches its members; results survive with the
    // student. Only student/subject deletion cascades to results.
    if let Err(e) = tx.execute(
        "UPDATE students SET class_id = NULL WHERE class_id = ?",
        [&class_id],
    ) {
        let _ = tx.rollback();
        return err(&req.id, "db_update_failed", e.to_string(), None);
    }
    if let Err(e) = tx.execute(
        "UPDATE subjects SET class_id = NULL WHERE class_id = ?",
        [&class_id],
    ) {
        let _ = tx.rollback();
        return err(&req.id, "db_update_failed", e.to_string(), None);
    }
    if let Err(e) = tx.execute("DELETE FROM classes WHERE id = ?", [&class_id]) {
        let _ = tx.rollback();
        return err(&req.id, "db_delete_failed", e.to_string(), None);
    }

    if let Err(e) = tx.commit() {
        return err(&req.id, "db_tx_failed", e.to_string(), None);
    }

    tracing::info!(class_id = %class_id, "class deleted");
    ok(&req.id, json!({ "deleted": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "classes.list" => Some(handle_classes_list(state, req)),
        "classes.create" => Some(handle_classes_create(state, req)),
        "classes.update" => Some(handle_classes_update(state, req)),
        "classes.delete" => Some(handle_classes_delete(state, req)),
        _ => None,
    }
}
