//! services/client/src/session/tokens.rs
//!
//! The in-memory token and credential store shared by every request.
//!
//! Nothing here is ever written to disk. The access token travels as a bearer
//! header, the refresh token as a cookie that is re-read from every response.

use std::sync::{Mutex, MutexGuard, PoisonError};

use biro_core::{AuthState, Credentials};
use reqwest::header::{HeaderMap, SET_COOKIE};

pub const REFRESH_TOKEN_COOKIE: &str = "refresh-token";

#[derive(Debug, Default)]
struct TokenState {
    credentials: Option<Credentials>,
    access_token: Option<String>,
    refresh_token: Option<String>,
    rejected: bool,
    /// Bumped every time a new access token is stored.
    generation: u64,
}

/// Credentials and tokens of one portal session.
#[derive(Debug, Default)]
pub struct SessionStore {
    state: Mutex<TokenState>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, TokenState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn auth_state(&self) -> AuthState {
        let state = self.lock();
        match (&state.credentials, &state.access_token) {
            (_, Some(_)) if state.rejected => AuthState::TokenRejected,
            (_, Some(_)) => AuthState::Authenticated,
            (Some(_), None) => AuthState::CredentialedNoToken,
            (None, None) => AuthState::Anonymous,
        }
    }

    pub fn credentials(&self) -> Option<Credentials> {
        self.lock().credentials.clone()
    }

    pub fn set_credentials(&self, credentials: Credentials) {
        self.lock().credentials = Some(credentials);
    }

    pub fn access_token(&self) -> Option<String> {
        self.lock().access_token.clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.lock().refresh_token.clone()
    }

    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// Stores a freshly minted access token and returns the new generation.
    pub fn store_access_token(&self, token: String) -> u64 {
        let mut state = self.lock();
        state.access_token = Some(token);
        state.rejected = false;
        state.generation += 1;
        state.generation
    }

    pub fn store_refresh_token(&self, token: String) {
        self.lock().refresh_token = Some(token);
    }

    /// Flags the token of `generation` as rejected. A rejection of an older
    /// token is ignored once a newer one has been stored.
    pub fn mark_rejected(&self, generation: u64) {
        let mut state = self.lock();
        if state.access_token.is_some() && state.generation == generation {
            state.rejected = true;
        }
    }

    /// Scans a response's `Set-Cookie` headers and keeps a rotated refresh token.
    pub fn absorb_cookies(&self, headers: &HeaderMap) -> bool {
        match refresh_token_from_headers(headers) {
            Some(token) => {
                self.store_refresh_token(token);
                true
            }
            None => false,
        }
    }

    /// Forgets credentials and both tokens.
    pub fn clear(&self) {
        let mut state = self.lock();
        let generation = state.generation;
        *state = TokenState {
            generation,
            ..TokenState::default()
        };
    }
}

/// Extracts the `refresh-token` value from the `Set-Cookie` headers, if any.
pub fn refresh_token_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(refresh_token_from_set_cookie)
        .last()
}

/// Parses one `Set-Cookie` line, e.g. `refresh-token=abc123; Path=/; HttpOnly`.
pub fn refresh_token_from_set_cookie(line: &str) -> Option<String> {
    let pair = line.split(';').next()?.trim();
    let (name, value) = pair.split_once('=')?;
    if name.trim() != REFRESH_TOKEN_COOKIE {
        return None;
    }
    let value = value.trim().trim_matches('"');
    (!value.is_empty()).then(|| value.to_string())
}
