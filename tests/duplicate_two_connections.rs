mod test_support;

use serde_json::json;
use test_support::*;

// Two sidecars sharing one workspace race to record the same
// (student, subject) pair. The UNIQUE constraint makes the duplicate
// check part of the insert, so exactly one wins.
#[test]
fn second_connection_gets_duplicate_result() {
    let workspace = temp_workspace();
    let mut first = open_state(&workspace);
    let student_id = create_student(&mut first, "ADM050", "Tumaini", "Moses", None);
    let subject_id = create_subject(&mut first, "Mathematics", None);

    let mut second = open_state(&workspace);

    add_result(&mut first, &student_id, &subject_id, 80.0);
    let code = request_err(
        &mut second,
        "race",
        "results.add",
        json!({ "studentId": student_id, "subjectId": subject_id, "marks": 40.0 }),
    );
    assert_eq!(code, "duplicate_result");

    // The surviving record is the winner's, on both connections.
    for state in [&mut first, &mut second] {
        let listed = request_ok(
            state,
            "list",
            "results.list",
            json!({ "studentId": student_id }),
        );
        let results = listed["results"].as_array().expect("results");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["marks"], json!(80.0));
        assert_eq!(results[0]["grade"], json!("A"));
    }
}
