use thiserror::Error;

/// Domain failures surfaced to IPC callers as typed error codes.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("marks must be between 0 and 100")]
    OutOfRange { marks: f64 },

    #[error("result for this student and subject already exists; use update instead")]
    DuplicateResult {
        student_id: String,
        subject_id: String,
    },

    #[error("{0} already exists")]
    Duplicate(&'static str),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error(transparent)]
    Db(#[from] rusqlite::Error),
}

impl DomainError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::OutOfRange { .. } => "out_of_range",
            Self::DuplicateResult { .. } => "duplicate_result",
            Self::Duplicate(_) => "duplicate",
            Self::NotFound(_) => "not_found",
            Self::Db(_) => "db_failed",
        }
    }

    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::OutOfRange { marks } => Some(serde_json::json!({ "marks": marks })),
            Self::DuplicateResult {
                student_id,
                subject_id,
            } => Some(serde_json::json!({
                "studentId": student_id,
                "subjectId": subject_id
            })),
            _ => None,
        }
    }
}
