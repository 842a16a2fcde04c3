pub mod domain;
pub mod ports;
pub mod report;

pub use domain::{
    Assignment, AssignmentDetail, AssignmentId, AuthState, Credentials, EncodedFile, Evaluation,
    EvaluationId, Exercise, ExerciseId, ExerciseStatus, NewSubmission, PostDeadlineHandling,
    SubjectInstance, SubjectInstanceId, Submission, SubmissionFile, SubmissionId,
    SubmissionStatus,
};
pub use ports::{CredentialPrompt, ErrorPrompt, PortError, PortResult, RetryChoice};
pub use report::{NamedReport, Report, ReportContent, ReportTest};
