mod test_support;

use serde_json::json;
use test_support::*;

#[test]
fn class_summary_remark_classifies_student_average() {
    let workspace = temp_workspace();
    let mut state = open_state(&workspace);
    let class_id = create_class(&mut state, "Form 3A", "2025/2026");
    let amani = create_student(&mut state, "ADM030", "Amani", "Otieno", Some(&class_id));
    let bakari = create_student(&mut state, "ADM031", "Bakari", "Juma", Some(&class_id));

    let math = create_subject(&mut state, "Mathematics", Some(&class_id));
    let eng = create_subject(&mut state, "English", Some(&class_id));
    let sci = create_subject(&mut state, "Science", Some(&class_id));

    // Individually F, C and A; the average of 65 classifies as Merit.
    add_result(&mut state, &amani, &math, 45.0);
    add_result(&mut state, &amani, &eng, 65.0);
    add_result(&mut state, &amani, &sci, 85.0);

    let summary = request_ok(
        &mut state,
        "cs",
        "reports.classSummary",
        json!({ "classId": class_id }),
    );
    assert_eq!(summary["class"]["name"], json!("Form 3A"));
    assert_eq!(summary["class"]["academicYear"], json!("2025/2026"));

    let rows = summary["rows"].as_array().expect("rows");
    assert_eq!(rows.len(), 2);

    assert_eq!(rows[0]["studentId"], json!(amani));
    assert_eq!(rows[0]["resultCount"], json!(3));
    assert_eq!(rows[0]["avgMarks"], json!(65.0));
    assert_eq!(rows[0]["avgGpa"], json!(2.0));
    assert_eq!(rows[0]["remark"], json!("Merit"));

    assert_eq!(rows[1]["studentId"], json!(bakari));
    assert_eq!(rows[1]["resultCount"], json!(0));
    assert_eq!(rows[1]["avgMarks"], json!(0.0));
    assert_eq!(rows[1]["remark"], json!("N/A"));
}

#[test]
fn class_summary_unknown_class() {
    let workspace = temp_workspace();
    let mut state = open_state(&workspace);
    let code = request_err(
        &mut state,
        "cs",
        "reports.classSummary",
        json!({ "classId": "missing" }),
    );
    assert_eq!(code, "not_found");
}

#[test]
fn student_card_model() {
    let workspace = temp_workspace();
    let mut state = open_state(&workspace);
    let class_id = create_class(&mut state, "Form 4B", "2025/2026");
    let student_id = create_student(&mut state, "ADM032", "Halima", "Bakari", Some(&class_id));
    let math = create_subject(&mut state, "Mathematics", Some(&class_id));
    let eng = create_subject(&mut state, "English", Some(&class_id));

    add_result(&mut state, &student_id, &math, 85.0);
    add_result(&mut state, &student_id, &eng, 70.0);

    let card = request_ok(
        &mut state,
        "card",
        "reports.studentCard",
        json!({ "studentId": student_id }),
    );
    assert_eq!(card["student"]["admissionNo"], json!("ADM032"));
    assert_eq!(card["student"]["fullName"], json!("Halima Bakari"));
    assert_eq!(card["student"]["className"], json!("Form 4B"));

    let lines = card["lines"].as_array().expect("lines");
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["subjectName"], json!("English"));
    assert_eq!(lines[0]["grade"], json!("B"));
    assert_eq!(lines[1]["subjectName"], json!("Mathematics"));
    assert_eq!(lines[1]["remarks"], json!("Distinction"));

    assert_eq!(card["summary"]["resultCount"], json!(2));
    assert_eq!(card["summary"]["avgMarks"], json!(77.5));
    assert_eq!(card["summary"]["avgGpa"], json!(3.5));
}

#[test]
fn student_card_without_results() {
    let workspace = temp_workspace();
    let mut state = open_state(&workspace);
    let student_id = create_student(&mut state, "ADM033", "Omari", "Shabani", None);

    let card = request_ok(
        &mut state,
        "card",
        "reports.studentCard",
        json!({ "studentId": student_id }),
    );
    assert_eq!(card["lines"].as_array().expect("lines").len(), 0);
    assert_eq!(card["summary"]["resultCount"], json!(0));
    assert_eq!(card["summary"]["avgMarks"], json!(0.0));
    assert_eq!(card["student"]["className"], json!(null));
}

#[test]
fn export_csv_writes_all_result_rows() {
    let workspace = temp_workspace();
    let mut state = open_state(&workspace);
    let class_id = create_class(&mut state, "Form 2C", "2025/2026");
    let student_id = create_student(&mut state, "ADM034", "Pendo", "Mrisho", Some(&class_id));
    let math = create_subject(&mut state, "Mathematics", Some(&class_id));
    let eng = create_subject(&mut state, "English", Some(&class_id));
    add_result(&mut state, &student_id, &math, 85.5);
    add_result(&mut state, &student_id, &eng, 49.0);

    let out_path = workspace.path().join("results_export.csv");
    let exported = request_ok(
        &mut state,
        "csv",
        "reports.exportCsv",
        json!({ "path": out_path.to_string_lossy() }),
    );
    assert_eq!(exported["rowCount"], json!(2));

    let contents = std::fs::read_to_string(&out_path).expect("read export");
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(
        lines[0],
        "Admission No,Student Name,Class,Subject,Marks,Grade,GPA,Remarks"
    );
    assert_eq!(lines[1], "ADM034,Pendo Mrisho,Form 2C,English,49.0,F,0.0,Fail");
    assert_eq!(
        lines[2],
        "ADM034,Pendo Mrisho,Form 2C,Mathematics,85.5,A,4.0,Distinction"
    );
}
