//! crates/biro_core/src/ports.rs
//!
//! Defines the contracts (traits) the session client expects from its host UI.
//! The client never owns a UI: it asks for credentials and for acknowledgement
//! of login failures through these ports, and the host decides how to render them.

use async_trait::async_trait;

use crate::domain::Credentials;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Cancelled by the user")]
    Cancelled,
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Collaborator Ports (Traits)
//=========================================================================================

/// The user's answer to a failed login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryChoice {
    Retry,
    Cancel,
}

#[async_trait]
pub trait CredentialPrompt: Send + Sync {
    /// Asks the user for a username and password.
    ///
    /// `None` (or empty strings) means the user dismissed the prompt.
    async fn request_credentials(&self) -> PortResult<Option<Credentials>>;
}

#[async_trait]
pub trait ErrorPrompt: Send + Sync {
    /// Shows `message` and asks whether to try again.
    async fn acknowledge(&self, message: &str) -> PortResult<RetryChoice>;
}
