mod test_support;

use serde_json::json;
use test_support::*;

#[test]
fn deleting_a_student_removes_their_results() {
    let workspace = temp_workspace();
    let mut state = open_state(&workspace);
    let s1 = create_student(&mut state, "ADM040", "Imani", "George", None);
    let s2 = create_student(&mut state, "ADM041", "Jabari", "Paulo", None);
    let math = create_subject(&mut state, "Mathematics", None);
    add_result(&mut state, &s1, &math, 75.0);
    add_result(&mut state, &s2, &math, 55.0);

    request_ok(
        &mut state,
        "del",
        "students.delete",
        json!({ "studentId": s1 }),
    );

    let all = request_ok(&mut state, "list", "results.list", json!({}));
    let results = all["results"].as_array().expect("results");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["studentId"], json!(s2));
}

#[test]
fn deleting_a_subject_removes_its_results() {
    let workspace = temp_workspace();
    let mut state = open_state(&workspace);
    let student_id = create_student(&mut state, "ADM042", "Kesi", "Lusekelo", None);
    let math = create_subject(&mut state, "Mathematics", None);
    let eng = create_subject(&mut state, "English", None);
    add_result(&mut state, &student_id, &math, 88.0);
    add_result(&mut state, &student_id, &eng, 62.0);

    request_ok(
        &mut state,
        "del",
        "subjects.delete",
        json!({ "subjectId": math }),
    );

    let listed = request_ok(
        &mut state,
        "list",
        "results.list",
        json!({ "studentId": student_id }),
    );
    let results = listed["results"].as_array().expect("results");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["subjectId"], json!(eng));

    // The pair is free again after the cascade.
    let new_math = create_subject(&mut state, "Mathematics", None);
    add_result(&mut state, &student_id, &new_math, 90.0);
}

#[test]
fn deleting_a_class_detaches_students_and_keeps_results() {
    let workspace = temp_workspace();
    let mut state = open_state(&workspace);
    let class_id = create_class(&mut state, "Form 5A", "2025/2026");
    let student_id = create_student(&mut state, "ADM043", "Lulu", "Abdala", Some(&class_id));
    let subject_id = create_subject(&mut state, "Physics", Some(&class_id));
    add_result(&mut state, &student_id, &subject_id, 71.0);

    request_ok(
        &mut state,
        "del",
        "classes.delete",
        json!({ "classId": class_id }),
    );

    let students = request_ok(&mut state, "sl", "students.list", json!({}));
    let students = students["students"].as_array().expect("students");
    assert_eq!(students.len(), 1);
    assert_eq!(students[0]["classId"], json!(null));

    let results = request_ok(
        &mut state,
        "rl",
        "results.list",
        json!({ "studentId": student_id }),
    );
    assert_eq!(results["results"].as_array().expect("results").len(), 1);

    // The deleted class no longer contributes a scope.
    let scoped = request_ok(
        &mut state,
        "sc",
        "results.list",
        json!({ "classId": class_id }),
    );
    assert_eq!(scoped["results"].as_array().expect("results").len(), 0);
}

#[test]
fn admission_number_must_be_unique() {
    let workspace = temp_workspace();
    let mut state = open_state(&workspace);
    create_student(&mut state, "ADM044", "Neema", "Samson", None);

    let code = request_err(
        &mut state,
        "dup",
        "students.create",
        json!({
            "admissionNo": "ADM044",
            "firstName": "Other",
            "lastName": "Student",
            "gender": "M"
        }),
    );
    assert_eq!(code, "duplicate");
}
