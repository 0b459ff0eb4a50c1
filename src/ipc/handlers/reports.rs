use crate::calc;
use crate::error::DomainError;
use crate::ipc::error::{domain_err, err, ok};
use crate::ipc::helpers::{db_conn, required_str};
use crate::ipc::types::{AppState, Request};
use rusqlite::{Connection, OptionalExtension};
use serde_json::json;

use super::analytics;

fn load_roster(conn: &Connection, class_id: &str) -> rusqlite::Result<Vec<calc::RosterStudent>> {
    let mut stmt = conn.prepare(
        "SELECT id, admission_no, first_name || ' ' || last_name
         FROM students
         WHERE class_id = ?
         ORDER BY first_name, last_name",
    )?;
    let rows = stmt
        .query_map([class_id], |row| {
            Ok(calc::RosterStudent {
                id: row.get(0)?,
                admission_no: row.get(1)?,
                name: row.get(2)?,
            })
        })?
        .collect();
    rows
}

fn handle_class_summary(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let class_id = match required_str(req, "classId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let meta: Option<(String, String)> = match conn
        .query_row(
            "SELECT name, academic_year FROM classes WHERE id = ?",
            [&class_id],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()
    {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let Some((name, academic_year)) = meta else {
        return domain_err(&req.id, &DomainError::NotFound("class"));
    };

    let roster = match load_roster(conn, &class_id) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let rows = match analytics::load_result_rows(conn, Some(&class_id), None) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    ok(
        &req.id,
        json!({
            "class": { "id": class_id, "name": name, "academicYear": academic_year },
            "rows": calc::class_summary(&roster, &rows)
        }),
    )
}

fn handle_student_card(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let student: Option<serde_json::Value> = match conn
        .query_row(
            "SELECT s.admission_no, s.first_name || ' ' || s.last_name, s.gender,
                    s.birth_date, c.name
             FROM students s
             LEFT JOIN classes c ON c.id = s.class_id
             WHERE s.id = ?",
            [&student_id],
            |row| {
                let admission_no: String = row.get(0)?;
                let full_name: String = row.get(1)?;
                let gender: String = row.get(2)?;
                let birth_date: Option<String> = row.get(3)?;
                let class_name: Option<String> = row.get(4)?;
                Ok(json!({
                    "id": student_id,
                    "admissionNo": admission_no,
                    "fullName": full_name,
                    "gender": gender,
                    "birthDate": birth_date,
                    "className": class_name
                }))
            },
        )
        .optional()
    {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let Some(student) = student else {
        return domain_err(&req.id, &DomainError::NotFound("student"));
    };

    let mut stmt = match conn.prepare(
        "SELECT j.name, r.marks, r.grade, r.gpa, r.remarks
         FROM results r
         JOIN subjects j ON j.id = r.subject_id
         WHERE r.student_id = ?
         ORDER BY j.name",
    ) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let lines = stmt
        .query_map([&student_id], |row| {
            let subject_name: String = row.get(0)?;
            let marks: f64 = row.get(1)?;
            let grade: String = row.get(2)?;
            let gpa: f64 = row.get(3)?;
            let remarks: String = row.get(4)?;
            Ok((subject_name, marks, gpa, grade, remarks))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());
    let lines = match lines {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let count = lines.len();
    let (avg_marks, avg_gpa) = if count > 0 {
        (
            calc::round2(lines.iter().map(|l| l.1).sum::<f64>() / count as f64),
            calc::round2(lines.iter().map(|l| l.2).sum::<f64>() / count as f64),
        )
    } else {
        (0.0, 0.0)
    };

    let line_json: Vec<serde_json::Value> = lines
        .into_iter()
        .map(|(subject_name, marks, gpa, grade, remarks)| {
            json!({
                "subjectName": subject_name,
                "marks": marks,
                "grade": grade,
                "gpa": gpa,
                "remarks": remarks
            })
        })
        .collect();

    ok(
        &req.id,
        json!({
            "student": student,
            "lines": line_json,
            "summary": { "resultCount": count, "avgMarks": avg_marks, "avgGpa": avg_gpa }
        }),
    )
}

fn handle_export_csv(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let path = match required_str(req, "path") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let mut stmt = match conn.prepare(
        "SELECT s.admission_no, s.first_name || ' ' || s.last_name, c.name, j.name,
                r.marks, r.grade, r.gpa, r.remarks
         FROM results r
         JOIN students s ON s.id = r.student_id
         LEFT JOIN classes c ON c.id = s.class_id
         JOIN subjects j ON j.id = r.subject_id
         ORDER BY s.admission_no, j.name",
    ) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let rows = stmt
        .query_map([], |row| {
            let admission_no: String = row.get(0)?;
            let student_name: String = row.get(1)?;
            let class_name: Option<String> = row.get(2)?;
            let subject_name: String = row.get(3)?;
            let marks: f64 = row.get(4)?;
            let grade: String = row.get(5)?;
            let gpa: f64 = row.get(6)?;
            let remarks: String = row.get(7)?;
            Ok((
                admission_no,
                student_name,
                class_name,
                subject_name,
                marks,
                grade,
                gpa,
                remarks,
            ))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());
    let rows = match rows {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let mut writer = match csv::Writer::from_path(&path) {
        Ok(w) => w,
        Err(e) => return err(&req.id, "export_failed", e.to_string(), None),
    };
    let header = [
        "Admission No",
        "Student Name",
        "Class",
        "Subject",
        "Marks",
        "Grade",
        "GPA",
        "Remarks",
    ];
    if let Err(e) = writer.write_record(header) {
        return err(&req.id, "export_failed", e.to_string(), None);
    }
    let row_count = rows.len();
    for (admission_no, student_name, class_name, subject_name, marks, grade, gpa, remarks) in rows
    {
        let record = [
            admission_no,
            student_name,
            class_name.unwrap_or_default(),
            subject_name,
            format!("{:.1}", marks),
            grade,
            format!("{:.1}", gpa),
            remarks,
        ];
        if let Err(e) = writer.write_record(&record) {
            return err(&req.id, "export_failed", e.to_string(), None);
        }
    }
    if let Err(e) = writer.flush() {
        return err(&req.id, "export_failed", e.to_string(), None);
    }

    tracing::info!(path = %path, rows = row_count as u64, "results exported");
    ok(&req.id, json!({ "path": path, "rowCount": row_count }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "reports.classSummary" => Some(handle_class_summary(state, req)),
        "reports.studentCard" => Some(handle_student_card(state, req)),
        "reports.exportCsv" => Some(handle_export_csv(state, req)),
        _ => None,
    }
}
