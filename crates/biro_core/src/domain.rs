//! crates/biro_core/src/domain.rs
//!
//! Defines the snapshots fetched from the coursework portal.
//! Every entity is an immutable value: the client only ever replaces a cached
//! entry with a freshly fetched one, it never mutates fields in place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type SubjectInstanceId = i64;
pub type AssignmentId = i64;
pub type ExerciseId = i64;
pub type SubmissionId = i64;
pub type EvaluationId = i64;

//=========================================================================================
// Credentials and Authentication State
//=========================================================================================

/// Username and password, held in memory only and used to re-derive tokens.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// A prompt that returned an empty username or password counts as no answer.
    pub fn is_empty(&self) -> bool {
        self.username.trim().is_empty() || self.password.is_empty()
    }
}

// Keeps the password out of logs.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Where the session currently stands in the authentication lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    /// No credentials are known.
    Anonymous,
    /// Username and password are known but no access token is held.
    CredentialedNoToken,
    /// An access token is held and assumed valid.
    Authenticated,
    /// The last wrapped call was answered with HTTP 401.
    TokenRejected,
}

//=========================================================================================
// Courses and Assignments
//=========================================================================================

/// A course offering the student is enrolled in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectInstance {
    pub subject_instance_id: SubjectInstanceId,
    #[serde(default)]
    pub subject_code: Option<String>,
    #[serde(default)]
    pub subject_name: String,
    #[serde(default)]
    pub semester: Option<String>,
}

/// What the portal allows once an assignment's end time has passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PostDeadlineHandling {
    ViewOnly,
    Locked,
    SubmitWithNoPoints,
}

/// A unit of coursework assigned to the student within a subject instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub assignment_assigned_student_id: AssignmentId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub post_deadline_handling: PostDeadlineHandling,
    #[serde(default)]
    pub points: Option<f64>,
    #[serde(default)]
    pub max_points: Option<f64>,
}

impl Assignment {
    /// True while `now` lies inside the `[start_time, end_time]` window.
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        self.start_time <= now && now <= self.end_time
    }

    pub fn is_past_deadline(&self, now: DateTime<Utc>) -> bool {
        now > self.end_time
    }

    /// Locked assignments expose no exercises at all.
    pub fn is_locked(&self) -> bool {
        self.post_deadline_handling == PostDeadlineHandling::Locked
    }
}

/// Per-exercise progress entry listed inside an assignment detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseStatus {
    pub assigned_exercise_id: ExerciseId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub points: Option<f64>,
    #[serde(default)]
    pub max_points: Option<f64>,
    #[serde(default)]
    pub submission_count: Option<u32>,
}

/// An assignment together with the status of each of its exercises.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentDetail {
    pub assignment_details: Assignment,
    #[serde(default)]
    pub exercise_statuses: Vec<ExerciseStatus>,
}

//=========================================================================================
// Exercises, Submissions and Evaluations
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    pub evaluation_id: EvaluationId,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// One upload attempt for an exercise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub submission_id: SubmissionId,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub evaluations: Vec<Evaluation>,
}

/// A gradable task, embedding every submission made for it so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    pub assigned_exercise_id: ExerciseId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub max_points: Option<f64>,
    #[serde(default)]
    pub submissions: Vec<Submission>,
}

/// Result of polling a submission's evaluation progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionStatus {
    pub finished: bool,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub evaluation_id: Option<EvaluationId>,
}

/// Response of the submission upload endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSubmission {
    pub id: SubmissionId,
}

/// A file as the portal ships it: base64 content under a filename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedFile {
    pub filename: String,
    pub content: String,
}

/// A previously uploaded file, decoded to text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionFile {
    pub filename: String,
    pub content: String,
}
