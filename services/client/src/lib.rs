pub mod cache;
pub mod client;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod poll;
pub mod prompt;
pub mod session;

pub use client::{BiroClient, ExerciseView, SubmissionView};
pub use config::{Config, ConfigError};
pub use error::{ApiError, ApiErrorBody, ClientError, ClientResult};
pub use poll::{PollOutcome, SubmissionPoller};
