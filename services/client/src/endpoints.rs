//! services/client/src/endpoints.rs
//!
//! Paths of the portal's student API, relative to the configured base URL.

use biro_core::{AssignmentId, EvaluationId, ExerciseId, SubjectInstanceId, SubmissionId};

pub const LOGIN: &str = "/api/v1/auth/login/student";
pub const REFRESH_TOKEN: &str = "/api/v1/auth/refresh-token";
pub const SUBJECT_INSTANCES: &str = "/api/v1/students/subject-instances";

pub fn assignments(subject_instance_id: SubjectInstanceId) -> String {
    format!("{SUBJECT_INSTANCES}/{subject_instance_id}/assignments")
}

pub fn assignment(assignment_id: AssignmentId) -> String {
    format!("/api/v1/students/assignments/{assignment_id}")
}

pub fn exercise(exercise_id: ExerciseId) -> String {
    format!("/api/v1/students/exercises/{exercise_id}")
}

pub fn submissions(exercise_id: ExerciseId) -> String {
    format!("/api/v1/students/exercises/{exercise_id}/submissions")
}

pub fn submission_status(submission_id: SubmissionId) -> String {
    format!("/api/v1/students/submissions/{submission_id}/status")
}

pub fn reports(evaluation_id: EvaluationId) -> String {
    format!("/api/v1/students/evaluations/{evaluation_id}/reports")
}

pub fn uploaded_files(submission_id: SubmissionId) -> String {
    format!("/api/v1/students/submissions/{submission_id}/uploaded-files")
}
