use crate::db;
use crate::error::DomainError;
use crate::ipc::error::{domain_err, err, ok};
use crate::ipc::helpers::{db_conn, optional_str, required_str, required_trimmed};
use crate::ipc::types::{AppState, Request};
use rusqlite::{OptionalExtension, ToSql};
use serde_json::json;
use uuid::Uuid;

fn handle_subjects_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "subjects": [] }));
    };
    let class_id = match optional_str(req, "classId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let (sql, params): (&str, Vec<&dyn ToSql>) = match &class_id {
        Some(cid) => (
            "SELECT j.id, j.name, j.class_id, c.name,
               (SELECT COUNT(*) FROM results r WHERE r.subject_id = j.id) AS result_count
             FROM subjects j
             LEFT JOIN classes c ON c.id = j.class_id
             WHERE j.class_id = ?
             ORDER BY j.name",
            vec![cid as &dyn ToSql],
        ),
        None => (
            "SELECT j.id, j.name, j.class_id, c.name,
               (SELECT COUNT(*) FROM results r WHERE r.subject_id = j.id) AS result_count
             FROM subjects j
             LEFT JOIN classes c ON c.id = j.class_id
             ORDER BY j.name",
            vec![],
        ),
    };

    let mut stmt = match conn.prepare(sql) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let rows = stmt
        .query_map(params.as_slice(), |row| {
            let id: String = row.get(0)?;
            let name: String = row.get(1)?;
            let class_id: Option<String> = row.get(2)?;
            let class_name: Option<String> = row.get(3)?;
            let result_count: i64 = row.get(4)?;
            Ok(json!({
                "id": id,
                "name": name,
                "classId": class_id,
                "className": class_name,
                "resultCount": result_count
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());

    match rows {
        Ok(subjects) => ok(&req.id, json!({ "subjects": subjects })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_subjects_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let name = match required_trimmed(req, "name") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let class_id = match optional_str(req, "classId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    if let Some(cid) = &class_id {
        let found: Option<i64> = match conn
            .query_row("SELECT 1 FROM classes WHERE id = ?", [cid], |r| r.get(0))
            .optional()
        {
            Ok(v) => v,
            Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
        };
        if found.is_none() {
            return domain_err(&req.id, &DomainError::NotFound("class"));
        }
    }

    let subject_id = Uuid::new_v4().to_string();
    if let Err(e) = conn.execute(
        "INSERT INTO subjects(id, name, class_id, created_at) VALUES(?, ?, ?, ?)",
        (&subject_id, &name, &class_id, &db::now_utc()),
    ) {
        return err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": "subjects" })),
        );
    }

    tracing::info!(subject_id = %subject_id, name = %name, "subject created");
    ok(&req.id, json!({ "subjectId": subject_id, "name": name }))
}

fn handle_subjects_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let subject_id = match required_str(req, "subjectId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let name = match required_trimmed(req, "name") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let class_id = match optional_str(req, "classId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    if let Some(cid) = &class_id {
        let found: Option<i64> = match conn
            .query_row("SELECT 1 FROM classes WHERE id = ?", [cid], |r| r.get(0))
            .optional()
        {
            Ok(v) => v,
            Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
        };
        if found.is_none() {
            return domain_err(&req.id, &DomainError::NotFound("class"));
        }
    }

    match conn.execute(
        "UPDATE subjects SET name = ?, class_id = ? WHERE id = ?",
        (&name, &class_id, &subject_id),
    ) {
        Ok(0) => domain_err(&req.id, &DomainError::NotFound("subject")),
        Ok(_) => ok(&req.id, json!({ "subjectId": subject_id, "name": name })),
        Err(e) => err(&req.id, "db_update_failed", e.to_string(), None),
    }
}

fn handle_subjects_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let subject_id = match required_str(req, "subjectId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let exists: Option<i64> = match conn
        .query_row("SELECT 1 FROM subjects WHERE id = ?", [&subject_id], |r| {
            r.get(0)
        })
        .optional()
    {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    if exists.is_none() {
        return domain_err(&req.id, &DomainError::NotFound("subject"));
    }

    let tx = match conn.unchecked_transaction() {
        Ok(t) => t,
        Err(e) => return err(&req.id, "db_tx_failed", e.to_string(), None),
    };

    // A subject owns its results; removing the subject removes them all.
    if let Err(e) = tx.execute("DELETE FROM results WHERE subject_id = ?", [&subject_id]) {
        let _ = tx.rollback();
        return err(&req.id, "db_delete_failed", e.to_string(), None);
    }
    if let Err(e) = tx.execute("DELETE FROM subjects WHERE id = ?", [&subject_id]) {
        let _ = tx.rollback();
        return err(&req.id, "db_delete_failed", e.to_string(), None);
    }
    if let Err(e) = tx.commit() {
        return err(&req.id, "db_tx_failed", e.to_string(), None);
    }

    tracing::info!(subject_id = %subject_id, "subject deleted");
    ok(&req.id, json!({ "deleted": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "subjects.list" => Some(handle_subjects_list(state, req)),
        "subjects.create" => Some(handle_subjects_create(state, req)),
        "subjects.update" => Some(handle_subjects_update(state, req)),
        "subjects.delete" => Some(handle_subjects_delete(state, req)),
        _ => None,
    }
}
