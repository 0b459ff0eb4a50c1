mod test_support;

use serde_json::json;
use test_support::*;

#[test]
fn class_scope_follows_student_membership_not_subject() {
    let workspace = temp_workspace();
    let mut state = open_state(&workspace);
    let class_a = create_class(&mut state, "Form 1A", "2025/2026");
    let class_b = create_class(&mut state, "Form 1B", "2025/2026");

    // The student sits in class A but takes a subject attached to class B.
    let student_id = create_student(&mut state, "ADM010", "Rehema", "Saidi", Some(&class_a));
    let subject_id = create_subject(&mut state, "Biology", Some(&class_b));
    add_result(&mut state, &student_id, &subject_id, 64.0);

    let in_a = request_ok(
        &mut state,
        "la",
        "results.list",
        json!({ "classId": class_a }),
    );
    assert_eq!(in_a["results"].as_array().expect("results").len(), 1);

    let in_b = request_ok(
        &mut state,
        "lb",
        "results.list",
        json!({ "classId": class_b }),
    );
    assert_eq!(in_b["results"].as_array().expect("results").len(), 0);
}

#[test]
fn filters_by_student_and_subject() {
    let workspace = temp_workspace();
    let mut state = open_state(&workspace);
    let s1 = create_student(&mut state, "ADM011", "Upendo", "Joseph", None);
    let s2 = create_student(&mut state, "ADM012", "Daudi", "Peter", None);
    let math = create_subject(&mut state, "Mathematics", None);
    let eng = create_subject(&mut state, "English", None);

    add_result(&mut state, &s1, &math, 80.0);
    add_result(&mut state, &s1, &eng, 70.0);
    add_result(&mut state, &s2, &math, 60.0);

    let by_student = request_ok(&mut state, "ls", "results.list", json!({ "studentId": s1 }));
    assert_eq!(by_student["results"].as_array().expect("results").len(), 2);

    let by_subject = request_ok(&mut state, "lj", "results.list", json!({ "subjectId": math }));
    let rows = by_subject["results"].as_array().expect("results");
    assert_eq!(rows.len(), 2);
    for row in rows {
        assert_eq!(row["subjectName"], json!("Mathematics"));
        assert!(row["studentName"].as_str().expect("name").len() > 0);
    }

    let everything = request_ok(&mut state, "all", "results.list", json!({}));
    assert_eq!(everything["results"].as_array().expect("results").len(), 3);
}
