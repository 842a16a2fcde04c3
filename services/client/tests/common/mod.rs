//! In-process mock of the coursework portal used by the integration tests.
//!
//! Tokens are real from the client's point of view: login and refresh mint
//! `access-N` / `refresh-N`, protected routes accept only currently valid
//! access tokens, and tests revoke tokens to provoke 401s.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::{prelude::BASE64_STANDARD, Engine};
use biro_core::{CredentialPrompt, Credentials, ErrorPrompt, PortResult, RetryChoice};
use client_lib::{BiroClient, Config};
use serde_json::{json, Value};

pub const USERNAME: &str = "student";
pub const PASSWORD: &str = "secret";

pub const LOCKED_ASSIGNMENT: i64 = 11;
pub const OPEN_ASSIGNMENT: i64 = 10;
pub const EXERCISE: i64 = 100;
pub const EVALUATION: i64 = 900;
pub const NEW_SUBMISSION: i64 = 502;

#[derive(Default)]
pub struct MockPortal {
    hits: Mutex<HashMap<&'static str, usize>>,
    valid_tokens: Mutex<HashSet<String>>,
    issued: AtomicUsize,
    /// Reject every protected call regardless of token.
    pub reject_all: AtomicBool,
    pub refresh_fails: AtomicBool,
    /// Rotate the refresh-token cookie on the 401 responses of protected routes.
    pub rotate_on_rejection: AtomicBool,
    /// Status code the exercise route answers with instead of the exercise.
    pub exercise_failure: Mutex<Option<StatusCode>>,
    /// Number of status polls answered as still pending.
    pub pending_polls: AtomicUsize,
    pub refresh_cookies: Mutex<Vec<Option<String>>>,
    pub bearer_tokens: Mutex<Vec<Option<String>>>,
    pub last_upload: Mutex<Option<(String, Vec<u8>)>>,
}

impl MockPortal {
    pub fn hits(&self, route: &str) -> usize {
        self.hits.lock().unwrap().get(route).copied().unwrap_or(0)
    }

    fn hit(&self, route: &'static str) {
        *self.hits.lock().unwrap().entry(route).or_insert(0) += 1;
    }

    /// Invalidates every access token issued so far.
    pub fn revoke_tokens(&self) {
        self.valid_tokens.lock().unwrap().clear();
    }

    fn issue_tokens(&self) -> Response {
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let access = format!("access-{n}");
        self.valid_tokens.lock().unwrap().insert(access.clone());
        (
            StatusCode::OK,
            [(
                header::SET_COOKIE,
                format!("refresh-token=refresh-{n}; Path=/; HttpOnly"),
            )],
            Json(json!({ "accessToken": access })),
        )
            .into_response()
    }

    fn authorize(&self, headers: &HeaderMap) -> Result<(), Response> {
        let bearer = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::to_string);
        self.bearer_tokens.lock().unwrap().push(bearer.clone());

        let valid = !self.reject_all.load(Ordering::SeqCst)
            && bearer.is_some_and(|token| self.valid_tokens.lock().unwrap().contains(&token));
        if valid {
            return Ok(());
        }
        let mut rejection = unauthorized("Token expired");
        if self.rotate_on_rejection.load(Ordering::SeqCst) {
            rejection.headers_mut().insert(
                header::SET_COOKIE,
                header::HeaderValue::from_static("refresh-token=rotated-on-401; Path=/; HttpOnly"),
            );
        }
        Err(rejection)
    }
}

fn unauthorized(message: &str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "message": message }))).into_response()
}

pub fn encode(text: &str) -> String {
    BASE64_STANDARD.encode(text)
}

fn assignment_json(id: i64, handling: &str) -> Value {
    json!({
        "assignmentAssignedStudentId": id,
        "title": format!("Assignment {id}"),
        "startTime": "2026-03-01T08:00:00Z",
        "endTime": "2026-03-15T23:59:00Z",
        "postDeadlineHandling": handling,
        "maxPoints": 10.0
    })
}

//=========================================================================================
// Route Handlers
//=========================================================================================

async fn login(State(portal): State<Arc<MockPortal>>, Json(body): Json<Value>) -> Response {
    portal.hit("login");
    if body["username"] == USERNAME && body["password"] == PASSWORD {
        portal.issue_tokens()
    } else {
        unauthorized("Invalid username or password")
    }
}

async fn refresh(State(portal): State<Arc<MockPortal>>, headers: HeaderMap) -> Response {
    portal.hit("refresh");
    let cookie = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let has_refresh_token = cookie
        .as_deref()
        .is_some_and(|c| c.split(';').any(|part| part.trim().starts_with("refresh-token=")));
    portal.refresh_cookies.lock().unwrap().push(cookie);

    if portal.refresh_fails.load(Ordering::SeqCst) || !has_refresh_token {
        return unauthorized("Refresh token expired");
    }
    portal.issue_tokens()
}

async fn subject_instances(State(portal): State<Arc<MockPortal>>, headers: HeaderMap) -> Response {
    portal.hit("subject_instances");
    if let Err(rejection) = portal.authorize(&headers) {
        return rejection;
    }
    Json(json!([
        {"subjectInstanceId": 1, "subjectCode": "BI-PA1", "subjectName": "Programming 1", "semester": "B251"},
        {"subjectInstanceId": 2, "subjectCode": "BI-PA2", "subjectName": "Programming 2"}
    ]))
    .into_response()
}

async fn assignments(
    State(portal): State<Arc<MockPortal>>,
    headers: HeaderMap,
    Path(_subject_instance_id): Path<i64>,
) -> Response {
    portal.hit("assignments");
    if let Err(rejection) = portal.authorize(&headers) {
        return rejection;
    }
    Json(json!([
        assignment_json(OPEN_ASSIGNMENT, "VIEW_ONLY"),
        assignment_json(LOCKED_ASSIGNMENT, "LOCKED")
    ]))
    .into_response()
}

async fn assignment_detail(
    State(portal): State<Arc<MockPortal>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    portal.hit("assignment_detail");
    if let Err(rejection) = portal.authorize(&headers) {
        return rejection;
    }
    Json(json!({
        "assignmentDetails": assignment_json(id, "VIEW_ONLY"),
        "exerciseStatuses": [
            {"assignedExerciseId": EXERCISE, "title": "Hello world", "points": 1.5, "maxPoints": 2.0},
            {"assignedExerciseId": 101, "title": "Fizz buzz"}
        ]
    }))
    .into_response()
}

async fn exercise(
    State(portal): State<Arc<MockPortal>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    portal.hit("exercise");
    if let Err(rejection) = portal.authorize(&headers) {
        return rejection;
    }
    if let Some(status) = *portal.exercise_failure.lock().unwrap() {
        return (status, "evaluation backend unavailable").into_response();
    }
    Json(json!({
        "assignedExerciseId": id,
        "title": "Hello world",
        "maxPoints": 2.0,
        "submissions": [
            {"submissionId": 500, "submittedAt": "2026-03-02T10:00:00Z",
             "evaluations": [{"evaluationId": EVALUATION, "score": 1.5}]},
            {"submissionId": 501, "evaluations": []}
        ]
    }))
    .into_response()
}

async fn submit(
    State(portal): State<Arc<MockPortal>>,
    headers: HeaderMap,
    Path(_id): Path<i64>,
    body: Bytes,
) -> Response {
    portal.hit("submit");
    if let Err(rejection) = portal.authorize(&headers) {
        return rejection;
    }
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    *portal.last_upload.lock().unwrap() = Some((content_type, body.to_vec()));
    Json(json!({ "id": NEW_SUBMISSION })).into_response()
}

async fn submission_status(
    State(portal): State<Arc<MockPortal>>,
    headers: HeaderMap,
    Path(_id): Path<i64>,
) -> Response {
    portal.hit("status");
    if let Err(rejection) = portal.authorize(&headers) {
        return rejection;
    }
    let pending = portal
        .pending_polls
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok();
    if pending {
        Json(json!({ "finished": false, "score": null, "evaluationId": null })).into_response()
    } else {
        Json(json!({ "finished": true, "score": 1.5, "evaluationId": EVALUATION })).into_response()
    }
}

async fn reports(
    State(portal): State<Arc<MockPortal>>,
    headers: HeaderMap,
    Path(_id): Path<i64>,
) -> Response {
    portal.hit("reports");
    if let Err(rejection) = portal.authorize(&headers) {
        return rejection;
    }
    let tree = r#"{"report_type":"unit","tests":[{"name":"add","score":1.5,"max_score":2.0}]}"#;
    Json(json!([
        {"filename": "report.json", "content": encode(tree)},
        {"filename": "stdout.txt", "content": encode("hello")}
    ]))
    .into_response()
}

async fn uploaded_files(
    State(portal): State<Arc<MockPortal>>,
    headers: HeaderMap,
    Path(_id): Path<i64>,
) -> Response {
    portal.hit("files");
    if let Err(rejection) = portal.authorize(&headers) {
        return rejection;
    }
    Json(json!([
        {"filename": "main.c", "content": encode("int main(void) { return 0; }\n")}
    ]))
    .into_response()
}

//=========================================================================================
// Server and Client Helpers
//=========================================================================================

fn router(portal: Arc<MockPortal>) -> Router {
    Router::new()
        .route("/api/v1/auth/login/student", post(login))
        .route("/api/v1/auth/refresh-token", post(refresh))
        .route("/api/v1/students/subject-instances", get(subject_instances))
        .route(
            "/api/v1/students/subject-instances/{id}/assignments",
            get(assignments),
        )
        .route("/api/v1/students/assignments/{id}", get(assignment_detail))
        .route("/api/v1/students/exercises/{id}", get(exercise))
        .route("/api/v1/students/exercises/{id}/submissions", post(submit))
        .route(
            "/api/v1/students/submissions/{id}/status",
            get(submission_status),
        )
        .route("/api/v1/students/evaluations/{id}/reports", get(reports))
        .route(
            "/api/v1/students/submissions/{id}/uploaded-files",
            get(uploaded_files),
        )
        .with_state(portal)
}

/// Serves a fresh mock portal on an ephemeral port and returns it with its base URL.
pub async fn spawn_portal() -> (Arc<MockPortal>, String) {
    let portal = Arc::new(MockPortal::default());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to get local addr");

    let app = router(portal.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });

    (portal, format!("http://{addr}"))
}

pub fn test_config(base_url: &str) -> Config {
    let mut config = Config::new(base_url);
    config.poll_interval = Duration::from_millis(10);
    config.poll_max_attempts = 5;
    config
}

/// A client that has already logged in as the mock student.
pub async fn logged_in_client(base_url: &str) -> BiroClient {
    let client = BiroClient::new(test_config(base_url)).expect("client");
    client
        .login_with(Credentials::new(USERNAME, PASSWORD))
        .await
        .expect("login");
    client
}

//=========================================================================================
// Scripted Prompts
//=========================================================================================

/// Prompts that replay canned answers and record what they were shown.
#[derive(Default)]
pub struct ScriptedPrompt {
    answers: Mutex<VecDeque<Option<Credentials>>>,
    choices: Mutex<VecDeque<RetryChoice>>,
    pub shown: Mutex<Vec<String>>,
    pub asked: AtomicUsize,
}

impl ScriptedPrompt {
    pub fn new(answers: Vec<Option<Credentials>>, choices: Vec<RetryChoice>) -> Arc<Self> {
        Arc::new(Self {
            answers: Mutex::new(answers.into()),
            choices: Mutex::new(choices.into()),
            ..Self::default()
        })
    }
}

#[async_trait]
impl CredentialPrompt for ScriptedPrompt {
    async fn request_credentials(&self) -> PortResult<Option<Credentials>> {
        self.asked.fetch_add(1, Ordering::SeqCst);
        Ok(self.answers.lock().unwrap().pop_front().flatten())
    }
}

#[async_trait]
impl ErrorPrompt for ScriptedPrompt {
    async fn acknowledge(&self, message: &str) -> PortResult<RetryChoice> {
        self.shown.lock().unwrap().push(message.to_string());
        Ok(self
            .choices
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(RetryChoice::Cancel))
    }
}
