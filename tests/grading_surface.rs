mod test_support;

use serde_json::json;
use test_support::*;

// The grading scale is fixed at process start; classification needs no
// workspace and is pure.
#[test]
fn classify_works_without_a_workspace() {
    let mut state = new_state();

    let result = request_ok(
        &mut state,
        "c",
        "grading.classify",
        json!({ "marks": 85.0 }),
    );
    assert_eq!(result["grade"], json!("A"));
    assert_eq!(result["gpa"], json!(4.0));
    assert_eq!(result["remarks"], json!("Distinction"));
}

#[test]
fn classify_band_boundaries() {
    let mut state = new_state();
    let cases = [
        (100.0, "A", "Distinction"),
        (80.0, "A", "Distinction"),
        (79.0, "B", "Credit"),
        (70.0, "B", "Credit"),
        (69.0, "C", "Merit"),
        (60.0, "C", "Merit"),
        (59.0, "D", "Pass"),
        (50.0, "D", "Pass"),
        (49.0, "F", "Fail"),
        (0.0, "F", "Fail"),
    ];
    for (marks, grade, remarks) in cases {
        let result = request_ok(
            &mut state,
            "c",
            "grading.classify",
            json!({ "marks": marks }),
        );
        assert_eq!(result["grade"], json!(grade), "marks={marks}");
        assert_eq!(result["remarks"], json!(remarks), "marks={marks}");
    }
}

#[test]
fn scale_lists_all_bands_in_order() {
    let mut state = new_state();
    let result = request_ok(&mut state, "s", "grading.scale", json!({}));
    let bands = result["bands"].as_array().expect("bands");
    assert_eq!(bands.len(), 5);
    assert_eq!(bands[0]["grade"], json!("A"));
    assert_eq!(bands[0]["high"], json!(100.0));
    assert_eq!(bands[4]["grade"], json!("F"));
    assert_eq!(bands[4]["low"], json!(0.0));
}
