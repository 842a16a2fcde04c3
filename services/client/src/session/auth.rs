//! services/client/src/session/auth.rs
//!
//! Login, token refresh and the re-authentication wrapper.
//!
//! Recovery from a rejected access token is single-flight: every recovery step
//! runs under one async lock, and a caller that waited on that lock while
//! another caller minted a new token simply retries with it.

use std::future::Future;
use std::sync::Arc;

use biro_core::{AuthState, CredentialPrompt, Credentials, ErrorPrompt, RetryChoice};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::endpoints;
use crate::error::{ClientError, ClientResult};
use crate::session::pipeline::Pipeline;
use crate::session::tokens::SessionStore;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    access_token: String,
}

/// Owns the authentication lifecycle of one portal session.
pub struct Authenticator {
    pipeline: Pipeline,
    credential_prompt: Option<Arc<dyn CredentialPrompt>>,
    error_prompt: Option<Arc<dyn ErrorPrompt>>,
    max_reauth_attempts: u32,
    /// Serialises logins and refreshes across concurrent callers.
    reauth_lock: Mutex<()>,
}

impl Authenticator {
    pub fn new(pipeline: Pipeline, max_reauth_attempts: u32) -> Self {
        Self {
            pipeline,
            credential_prompt: None,
            error_prompt: None,
            max_reauth_attempts,
            reauth_lock: Mutex::new(()),
        }
    }

    pub fn with_prompts(
        mut self,
        credential_prompt: Arc<dyn CredentialPrompt>,
        error_prompt: Arc<dyn ErrorPrompt>,
    ) -> Self {
        self.credential_prompt = Some(credential_prompt);
        self.error_prompt = Some(error_prompt);
        self
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn session(&self) -> &SessionStore {
        self.pipeline.session()
    }

    //=====================================================================================
    // Login and Refresh Calls
    //=====================================================================================

    /// Logs in with `credentials` and keeps them for later re-authentication.
    pub async fn login_with(&self, credentials: Credentials) -> ClientResult<u64> {
        let response: TokenResponse = self
            .pipeline
            .post_json(endpoints::LOGIN, &credentials)
            .await?;
        info!("Logged in as {}", credentials.username);
        self.session().set_credentials(credentials);
        Ok(self.session().store_access_token(response.access_token))
    }

    /// Mints a new access token from the refresh-token cookie.
    pub async fn refresh(&self) -> ClientResult<u64> {
        let response: TokenResponse = self.pipeline.post_empty(endpoints::REFRESH_TOKEN).await?;
        info!("Access token refreshed");
        Ok(self.session().store_access_token(response.access_token))
    }

    /// Interactive login: prompts until the portal accepts the credentials or
    /// the user cancels. Without a credential prompt, stored credentials are used.
    pub async fn login(&self) -> ClientResult<()> {
        let _guard = self.reauth_lock.lock().await;
        self.login_locked().await
    }

    async fn login_locked(&self) -> ClientResult<()> {
        let Some(prompt) = &self.credential_prompt else {
            let credentials = self
                .session()
                .credentials()
                .ok_or(ClientError::MissingCredentials)?;
            return self.login_with(credentials).await.map(|_| ());
        };

        loop {
            let credentials = match prompt.request_credentials().await? {
                Some(credentials) if !credentials.is_empty() => credentials,
                _ => return Err(ClientError::Cancelled),
            };

            match self.login_with(credentials).await {
                Ok(_) => return Ok(()),
                Err(ClientError::Api(err)) => {
                    warn!("Login failed: {}", err);
                    let choice = match &self.error_prompt {
                        Some(error_prompt) => error_prompt.acknowledge(&err.to_string()).await?,
                        None => RetryChoice::Retry,
                    };
                    if choice == RetryChoice::Cancel {
                        return Err(ClientError::Cancelled);
                    }
                }
                Err(other) => return Err(other),
            }
        }
    }

    /// Makes sure an access token is held before a wrapped call goes out.
    pub async fn ensure_authenticated(&self) -> ClientResult<()> {
        if matches!(
            self.session().auth_state(),
            AuthState::Authenticated | AuthState::TokenRejected
        ) {
            return Ok(());
        }

        let _guard = self.reauth_lock.lock().await;
        match self.session().auth_state() {
            AuthState::Authenticated | AuthState::TokenRejected => Ok(()),
            AuthState::CredentialedNoToken => {
                let credentials = self
                    .session()
                    .credentials()
                    .ok_or(ClientError::MissingCredentials)?;
                self.login_with(credentials).await.map(|_| ())
            }
            AuthState::Anonymous if self.credential_prompt.is_some() => self.login_locked().await,
            AuthState::Anonymous => Err(ClientError::MissingCredentials),
        }
    }

    //=====================================================================================
    // Re-authentication Wrapper
    //=====================================================================================

    /// Runs `operation`, recovering from HTTP 401 at most `max_reauth_attempts` times.
    ///
    /// The first recovery uses the refresh token, later ones log in again with
    /// the stored credentials. Non-401 errors are returned immediately. When
    /// every recovery fails the error of the first call is returned.
    pub async fn with_reauth<T, F, Fut>(&self, operation: F) -> ClientResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = ClientResult<T>>,
    {
        self.ensure_authenticated().await?;

        let mut seen_generation = self.session().generation();
        let original = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_unauthorized() => err,
            Err(err) => {
                error!("Portal call failed: {}", err);
                return Err(err);
            }
        };
        warn!("Access token rejected: {}", original);
        self.session().mark_rejected(seen_generation);

        for attempt in 1..=self.max_reauth_attempts {
            match self.recover(attempt, seen_generation).await {
                Ok(generation) => seen_generation = generation,
                Err(ClientError::MissingCredentials) => {
                    warn!("No stored credentials to log in again with");
                    break;
                }
                Err(err) => {
                    warn!("Recovery attempt {} failed: {}", attempt, err);
                    continue;
                }
            }

            match operation().await {
                Ok(value) => {
                    info!("Call succeeded after {} recovery attempt(s)", attempt);
                    return Ok(value);
                }
                Err(err) if err.is_unauthorized() => {
                    warn!("Access token rejected again after attempt {}", attempt);
                    self.session().mark_rejected(seen_generation);
                }
                Err(err) => {
                    error!("Portal call failed: {}", err);
                    return Err(err);
                }
            }
        }

        error!("Giving up on re-authentication: {}", original);
        Err(original)
    }

    /// One recovery step. Returns the token generation to retry with.
    async fn recover(&self, attempt: u32, seen_generation: u64) -> ClientResult<u64> {
        let _guard = self.reauth_lock.lock().await;

        let current = self.session().generation();
        if current != seen_generation {
            // Another caller already replaced the token we were rejected with.
            return Ok(current);
        }

        if attempt == 1 {
            self.refresh().await
        } else {
            let credentials = self
                .session()
                .credentials()
                .ok_or(ClientError::MissingCredentials)?;
            self.login_with(credentials).await
        }
    }
}
