use serde::Serialize;
use std::collections::BTreeMap;

/// Marks at or above this threshold count as a pass.
pub const PASS_MARK: f64 = 50.0;

#[derive(Debug, Clone, Copy)]
pub struct GradeBand {
    pub low: f64,
    pub high: f64,
    pub grade: &'static str,
    pub gpa: f64,
    pub remark: &'static str,
}

/// Fixed grading scale. Bands are checked in order; first match wins.
pub const GRADE_SCALE: [GradeBand; 5] = [
    GradeBand { low: 80.0, high: 100.0, grade: "A", gpa: 4.0, remark: "Distinction" },
    GradeBand { low: 70.0, high: 79.0, grade: "B", gpa: 3.0, remark: "Credit" },
    GradeBand { low: 60.0, high: 69.0, grade: "C", gpa: 2.0, remark: "Merit" },
    GradeBand { low: 50.0, high: 59.0, grade: "D", gpa: 1.0, remark: "Pass" },
    GradeBand { low: 0.0, high: 49.0, grade: "F", gpa: 0.0, remark: "Fail" },
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Classification {
    pub grade: &'static str,
    pub gpa: f64,
    pub remark: &'static str,
}

/// Map marks to (grade, gpa, remark) via the fixed scale.
///
/// Unmatched input falls back to the bottom band instead of failing. This
/// mirrors the legacy scale, where band edges are whole numbers and a mark
/// in one of the cracks (e.g. 79.5) lands on "F". Range validation at the
/// results boundary is the authoritative guard; keep this fallback as is.
pub fn classify(marks: f64) -> Classification {
    for band in &GRADE_SCALE {
        if band.low <= marks && marks <= band.high {
            return Classification {
                grade: band.grade,
                gpa: band.gpa,
                remark: band.remark,
            };
        }
    }
    let bottom = &GRADE_SCALE[GRADE_SCALE.len() - 1];
    Classification {
        grade: bottom.grade,
        gpa: bottom.gpa,
        remark: bottom.remark,
    }
}

/// Round to 2 decimal places for reporting.
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// One result joined to its student, class and subject metadata.
/// Analytics handlers load a full snapshot of these in a single query and
/// reduce it with the pure functions below.
#[derive(Debug, Clone)]
pub struct ResultRow {
    pub result_id: String,
    pub student_id: String,
    pub student_name: String,
    pub class_id: Option<String>,
    pub class_name: Option<String>,
    pub subject_id: String,
    pub subject_name: String,
    pub marks: f64,
    pub grade: String,
    pub gpa: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupAverage {
    pub name: String,
    pub avg_marks: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedStudent {
    pub student_id: String,
    pub name: String,
    pub avg_marks: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PassFail {
    pub passed: i64,
    pub failed: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalStats {
    pub total_students: i64,
    pub total_results: i64,
    pub avg_marks: f64,
}

/// A student on a class roster, before joining to results.
#[derive(Debug, Clone)]
pub struct RosterStudent {
    pub id: String,
    pub admission_no: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassSummaryRow {
    pub student_id: String,
    pub admission_no: String,
    pub name: String,
    pub result_count: i64,
    pub avg_marks: f64,
    pub avg_gpa: f64,
    pub remark: String,
}

fn grouped_averages<F>(rows: &[ResultRow], key_of: F) -> Vec<GroupAverage>
where
    F: Fn(&ResultRow) -> Option<(String, String)>,
{
    let mut sums: BTreeMap<String, (String, f64, usize)> = BTreeMap::new();
    for row in rows {
        let Some((key, name)) = key_of(row) else {
            continue;
        };
        let entry = sums.entry(key).or_insert((name, 0.0, 0));
        entry.1 += row.marks;
        entry.2 += 1;
    }

    let mut out: Vec<GroupAverage> = sums
        .into_values()
        .map(|(name, sum, count)| GroupAverage {
            name,
            avg_marks: round2(sum / count as f64),
        })
        .collect();
    out.sort_by(|a, b| a.name.cmp(&b.name));
    out
}

/// Mean marks per class, joined through the student's class membership.
/// Classes with no results are omitted, not reported as zero.
pub fn class_averages(rows: &[ResultRow]) -> Vec<GroupAverage> {
    grouped_averages(rows, |r| match (&r.class_id, &r.class_name) {
        (Some(id), Some(name)) => Some((id.clone(), name.clone())),
        _ => None,
    })
}

/// Mean marks per subject. Subjects with no results are omitted.
pub fn subject_averages(rows: &[ResultRow]) -> Vec<GroupAverage> {
    grouped_averages(rows, |r| Some((r.subject_id.clone(), r.subject_name.clone())))
}

/// Top performers ranked by the mean of all their own results, descending.
/// Ties are broken by ascending student id so truncation is stable.
pub fn top_students(rows: &[ResultRow], limit: usize) -> Vec<RankedStudent> {
    let mut sums: BTreeMap<&str, (&str, f64, usize)> = BTreeMap::new();
    for row in rows {
        let entry = sums
            .entry(row.student_id.as_str())
            .or_insert((row.student_name.as_str(), 0.0, 0));
        entry.1 += row.marks;
        entry.2 += 1;
    }

    let mut ranked: Vec<(&str, &str, f64)> = sums
        .into_iter()
        .map(|(id, (name, sum, count))| (id, name, sum / count as f64))
        .collect();
    ranked.sort_by(|a, b| {
        b.2.partial_cmp(&a.2)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.0.cmp(b.0))
    });
    ranked.truncate(limit);

    ranked
        .into_iter()
        .map(|(id, name, avg)| RankedStudent {
            student_id: id.to_string(),
            name: name.to_string(),
            avg_marks: round2(avg),
        })
        .collect()
}

/// Pass/fail counts over every result in scope. passed + failed == rows.len().
pub fn pass_fail(rows: &[ResultRow]) -> PassFail {
    let passed = rows.iter().filter(|r| r.marks >= PASS_MARK).count() as i64;
    PassFail {
        passed,
        failed: rows.len() as i64 - passed,
    }
}

/// Count results by their stored grade field. The stored grade is trusted,
/// not re-derived from marks.
pub fn grade_distribution(rows: &[ResultRow]) -> BTreeMap<String, i64> {
    let mut counts = BTreeMap::new();
    for row in rows {
        *counts.entry(row.grade.clone()).or_insert(0) += 1;
    }
    counts
}

/// School-wide headline numbers. avg_marks is 0 when there are no results.
pub fn total_stats(rows: &[ResultRow], total_students: i64) -> TotalStats {
    let avg_marks = if rows.is_empty() {
        0.0
    } else {
        round2(rows.iter().map(|r| r.marks).sum::<f64>() / rows.len() as f64)
    };
    TotalStats {
        total_students,
        total_results: rows.len() as i64,
        avg_marks,
    }
}

/// Per-student rows for the class report. The remark classifies the
/// student's average mark, which is a different quantity from the stored
/// per-result remarks; students with no results read "N/A".
pub fn class_summary(roster: &[RosterStudent], rows: &[ResultRow]) -> Vec<ClassSummaryRow> {
    roster
        .iter()
        .map(|student| {
            let mut sum_marks = 0.0;
            let mut sum_gpa = 0.0;
            let mut count = 0usize;
            for row in rows.iter().filter(|r| r.student_id == student.id) {
                sum_marks += row.marks;
                sum_gpa += row.gpa;
                count += 1;
            }
            let (avg_marks, avg_gpa, remark) = if count > 0 {
                let avg = sum_marks / count as f64;
                (
                    round2(avg),
                    round2(sum_gpa / count as f64),
                    classify(avg).remark.to_string(),
                )
            } else {
                (0.0, 0.0, "N/A".to_string())
            };
            ClassSummaryRow {
                student_id: student.id.clone(),
                admission_no: student.admission_no.clone(),
                name: student.name.clone(),
                result_count: count as i64,
                avg_marks,
                avg_gpa,
                remark,
            }
        })
        .collect()
}
