//! services/client/src/client.rs
//!
//! `BiroClient`, the session client the host UI talks to.
//!
//! For every entity kind the client offers `get_*` (cache first, fetch on a
//! miss), `fetch_*` (always hits the network and overwrites the cache) and
//! `invalidate_*`. Every network call runs inside the re-authentication wrapper.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use biro_core::{
    Assignment, AssignmentDetail, AssignmentId, AuthState, CredentialPrompt, Credentials,
    EncodedFile, ErrorPrompt, EvaluationId, Exercise, ExerciseId, ExerciseStatus, NamedReport,
    NewSubmission, SubjectInstance, SubjectInstanceId, SubmissionFile, SubmissionId,
    SubmissionStatus,
};
use futures::future::join_all;
use tracing::{debug, info};

use crate::cache::Caches;
use crate::config::Config;
use crate::endpoints;
use crate::error::{ClientError, ClientResult};
use crate::poll::SubmissionPoller;
use crate::session::{multipart, Authenticator, Pipeline, SessionStore};

//=========================================================================================
// Exercise View Types
//=========================================================================================

/// Everything the exercise detail view shows, refreshed in one fan-out.
///
/// Each item keeps its own outcome; one failed status or report fetch does
/// not hide the rest.
#[derive(Debug)]
pub struct ExerciseView {
    pub exercise: Arc<Exercise>,
    pub submissions: Vec<SubmissionView>,
}

#[derive(Debug)]
pub struct SubmissionView {
    pub submission_id: SubmissionId,
    pub status: ClientResult<Arc<SubmissionStatus>>,
    pub files: ClientResult<Arc<Vec<SubmissionFile>>>,
    pub reports: Vec<(EvaluationId, ClientResult<Arc<Vec<NamedReport>>>)>,
}

//=========================================================================================
// The Client
//=========================================================================================

pub struct BiroClient {
    auth: Authenticator,
    caches: Caches,
    config: Config,
}

impl BiroClient {
    /// Creates a client without UI prompts. Credentials from `config` are seeded.
    pub fn new(config: Config) -> ClientResult<Self> {
        let session = Arc::new(SessionStore::new());
        if let Some(credentials) = &config.credentials {
            session.set_credentials(credentials.clone());
        }
        let pipeline = Pipeline::new(&config, session)?;
        Ok(Self {
            auth: Authenticator::new(pipeline, config.max_reauth_attempts),
            caches: Caches::default(),
            config,
        })
    }

    /// Attaches the host's credential and error-acknowledgement prompts.
    pub fn with_prompts(
        mut self,
        credential_prompt: Arc<dyn CredentialPrompt>,
        error_prompt: Arc<dyn ErrorPrompt>,
    ) -> Self {
        self.auth = self.auth.with_prompts(credential_prompt, error_prompt);
        self
    }

    fn pipeline(&self) -> &Pipeline {
        self.auth.pipeline()
    }

    //=====================================================================================
    // Authentication
    //=====================================================================================

    pub fn auth_state(&self) -> AuthState {
        self.auth.session().auth_state()
    }

    pub fn set_credentials(&self, credentials: Credentials) {
        self.auth.session().set_credentials(credentials);
    }

    /// Interactive login hook for the UI.
    pub async fn login(&self) -> ClientResult<()> {
        self.auth.login().await
    }

    /// Logs in with explicit credentials, without prompting.
    pub async fn login_with(&self, credentials: Credentials) -> ClientResult<()> {
        self.auth.login_with(credentials).await.map(|_| ())
    }

    /// Forgets credentials and tokens. Cached snapshots are left alone.
    pub fn logout(&self) {
        self.auth.session().clear();
        info!("Logged out");
    }

    /// Runs `operation` with transparent recovery from a rejected access token.
    pub async fn with_reauth<T, F, Fut>(&self, operation: F) -> ClientResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = ClientResult<T>>,
    {
        self.auth.with_reauth(operation).await
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        self.with_reauth(|| self.pipeline().get_json(path)).await
    }

    //=====================================================================================
    // Subject Instances
    //=====================================================================================

    pub async fn get_subject_instances(&self) -> ClientResult<Arc<Vec<SubjectInstance>>> {
        match self.caches.subject_instance_list.get(&()) {
            Some(list) => Ok(list),
            None => self.fetch_subject_instances().await,
        }
    }

    pub async fn fetch_subject_instances(&self) -> ClientResult<Arc<Vec<SubjectInstance>>> {
        let list: Vec<SubjectInstance> = self.get_json(endpoints::SUBJECT_INSTANCES).await?;
        for instance in &list {
            self.caches
                .subject_instances
                .insert(instance.subject_instance_id, instance.clone());
        }
        debug!("Fetched {} subject instances", list.len());
        Ok(self.caches.subject_instance_list.insert((), list))
    }

    pub async fn get_subject_instance(
        &self,
        id: SubjectInstanceId,
    ) -> ClientResult<Arc<SubjectInstance>> {
        match self.caches.subject_instances.get(&id) {
            Some(instance) => Ok(instance),
            None => self.fetch_subject_instance(id).await,
        }
    }

    /// Refetches the enrolment listing and picks `id` out of it.
    pub async fn fetch_subject_instance(
        &self,
        id: SubjectInstanceId,
    ) -> ClientResult<Arc<SubjectInstance>> {
        self.fetch_subject_instances().await?;
        self.caches
            .subject_instances
            .get(&id)
            .ok_or_else(|| ClientError::NotFound(format!("subject instance {id}")))
    }

    pub fn invalidate_subject_instances(&self) {
        self.caches.subject_instance_list.invalidate(&());
        self.caches.subject_instances.clear();
    }

    //=====================================================================================
    // Assignments
    //=====================================================================================

    pub async fn get_assignments(
        &self,
        subject_instance_id: SubjectInstanceId,
    ) -> ClientResult<Arc<Vec<Assignment>>> {
        match self.caches.assignments.get(&subject_instance_id) {
            Some(list) => Ok(list),
            None => self.fetch_assignments(subject_instance_id).await,
        }
    }

    pub async fn fetch_assignments(
        &self,
        subject_instance_id: SubjectInstanceId,
    ) -> ClientResult<Arc<Vec<Assignment>>> {
        let list: Vec<Assignment> = self
            .get_json(&endpoints::assignments(subject_instance_id))
            .await?;
        Ok(self.caches.assignments.insert(subject_instance_id, list))
    }

    pub fn invalidate_assignments(&self, subject_instance_id: SubjectInstanceId) -> bool {
        self.caches.assignments.invalidate(&subject_instance_id)
    }

    pub async fn get_assignment(&self, id: AssignmentId) -> ClientResult<Arc<AssignmentDetail>> {
        match self.caches.assignment_details.get(&id) {
            Some(detail) => Ok(detail),
            None => self.fetch_assignment(id).await,
        }
    }

    pub async fn fetch_assignment(&self, id: AssignmentId) -> ClientResult<Arc<AssignmentDetail>> {
        let detail: AssignmentDetail = self.get_json(&endpoints::assignment(id)).await?;
        Ok(self.caches.assignment_details.insert(id, detail))
    }

    pub fn invalidate_assignment(&self, id: AssignmentId) -> bool {
        self.caches.assignment_details.invalidate(&id)
    }

    /// The exercises shown under an assignment. Locked assignments have none,
    /// and no request is made for them.
    pub async fn expand_assignment(
        &self,
        assignment: &Assignment,
    ) -> ClientResult<Vec<ExerciseStatus>> {
        if assignment.is_locked() {
            debug!(
                "Assignment {} is locked, skipping its exercises",
                assignment.assignment_assigned_student_id
            );
            return Ok(Vec::new());
        }
        let detail = self
            .get_assignment(assignment.assignment_assigned_student_id)
            .await?;
        Ok(detail.exercise_statuses.clone())
    }

    //=====================================================================================
    // Exercises and Submissions
    //=====================================================================================

    pub async fn get_exercise(&self, id: ExerciseId) -> ClientResult<Arc<Exercise>> {
        match self.caches.exercises.get(&id) {
            Some(exercise) => Ok(exercise),
            None => self.fetch_exercise(id).await,
        }
    }

    pub async fn fetch_exercise(&self, id: ExerciseId) -> ClientResult<Arc<Exercise>> {
        let exercise: Exercise = self.get_json(&endpoints::exercise(id)).await?;
        Ok(self.caches.exercises.insert(id, exercise))
    }

    pub fn invalidate_exercise(&self, id: ExerciseId) -> bool {
        self.caches.exercises.invalidate(&id)
    }

    /// Uploads `content` as a new submission for the exercise.
    ///
    /// The cached exercise is dropped afterwards so its submission list is
    /// refetched on next access.
    pub async fn submit_file(
        &self,
        exercise_id: ExerciseId,
        filename: &str,
        content: &[u8],
    ) -> ClientResult<NewSubmission> {
        let path = endpoints::submissions(exercise_id);
        let content_type = multipart::content_type();
        let body = multipart::submission_body(filename, content);

        let submission: NewSubmission = self
            .with_reauth(|| {
                self.pipeline()
                    .post_raw(&path, &content_type, body.clone())
            })
            .await?;

        info!(
            "Submitted {} to exercise {} as submission {}",
            filename, exercise_id, submission.id
        );
        self.invalidate_exercise(exercise_id);
        Ok(submission)
    }

    /// Reads the file at `path` and submits it under its file name.
    pub async fn submit_file_path(
        &self,
        exercise_id: ExerciseId,
        path: impl AsRef<Path>,
    ) -> ClientResult<NewSubmission> {
        let path = path.as_ref();
        let content = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "submission".to_string());
        self.submit_file(exercise_id, &filename, &content).await
    }

    pub async fn get_submission_status(
        &self,
        id: SubmissionId,
    ) -> ClientResult<Arc<SubmissionStatus>> {
        match self.caches.submission_statuses.get(&id) {
            Some(status) => Ok(status),
            None => self.fetch_submission_status(id).await,
        }
    }

    pub async fn fetch_submission_status(
        &self,
        id: SubmissionId,
    ) -> ClientResult<Arc<SubmissionStatus>> {
        let status: SubmissionStatus = self.get_json(&endpoints::submission_status(id)).await?;
        Ok(self.caches.submission_statuses.insert(id, status))
    }

    pub fn invalidate_submission_status(&self, id: SubmissionId) -> bool {
        self.caches.submission_statuses.invalidate(&id)
    }

    pub async fn get_submission_files(
        &self,
        id: SubmissionId,
    ) -> ClientResult<Arc<Vec<SubmissionFile>>> {
        match self.caches.submission_files.get(&id) {
            Some(files) => Ok(files),
            None => self.fetch_submission_files(id).await,
        }
    }

    pub async fn fetch_submission_files(
        &self,
        id: SubmissionId,
    ) -> ClientResult<Arc<Vec<SubmissionFile>>> {
        let encoded: Vec<EncodedFile> = self.get_json(&endpoints::uploaded_files(id)).await?;
        let files = encoded.into_iter().map(SubmissionFile::from).collect();
        Ok(self.caches.submission_files.insert(id, files))
    }

    pub fn invalidate_submission_files(&self, id: SubmissionId) -> bool {
        self.caches.submission_files.invalidate(&id)
    }

    //=====================================================================================
    // Reports
    //=====================================================================================

    pub async fn get_reports(&self, id: EvaluationId) -> ClientResult<Arc<Vec<NamedReport>>> {
        match self.caches.reports.get(&id) {
            Some(reports) => Ok(reports),
            None => self.fetch_reports(id).await,
        }
    }

    pub async fn fetch_reports(&self, id: EvaluationId) -> ClientResult<Arc<Vec<NamedReport>>> {
        let encoded: Vec<EncodedFile> = self.get_json(&endpoints::reports(id)).await?;
        let reports = encoded.into_iter().map(NamedReport::from).collect();
        Ok(self.caches.reports.insert(id, reports))
    }

    pub fn invalidate_reports(&self, id: EvaluationId) -> bool {
        self.caches.reports.invalidate(&id)
    }

    pub fn clear_caches(&self) {
        self.caches.clear();
    }

    //=====================================================================================
    // Composite Operations
    //=====================================================================================

    /// Force-refreshes an exercise, then fetches every submission's status and
    /// files and every evaluation's reports concurrently.
    pub async fn refresh_exercise_view(&self, exercise_id: ExerciseId) -> ClientResult<ExerciseView> {
        let exercise = self.fetch_exercise(exercise_id).await?;

        let submissions = join_all(exercise.submissions.iter().map(|submission| async move {
            let reports = join_all(submission.evaluations.iter().map(|evaluation| async move {
                (
                    evaluation.evaluation_id,
                    self.fetch_reports(evaluation.evaluation_id).await,
                )
            }));
            let (status, files, reports) = tokio::join!(
                self.fetch_submission_status(submission.submission_id),
                self.fetch_submission_files(submission.submission_id),
                reports,
            );
            SubmissionView {
                submission_id: submission.submission_id,
                status,
                files,
                reports,
            }
        }))
        .await;

        Ok(ExerciseView {
            exercise,
            submissions,
        })
    }

    /// A poller using the configured interval and attempt bound.
    pub fn poller(&self) -> SubmissionPoller<'_> {
        SubmissionPoller::new(self)
            .with_interval(self.config.poll_interval)
            .with_max_attempts(self.config.poll_max_attempts)
    }
}
