//! services/client/src/session/pipeline.rs
//!
//! The request pipeline every portal call goes through.
//!
//! Each request carries the API negotiation headers, the bearer token and the
//! refresh-token cookie when they are held. Each response is scanned for a
//! rotated refresh token before its status is looked at.

use std::sync::Arc;

use bytes::Bytes;
use reqwest::{
    header::{HeaderValue, ACCEPT, CONTENT_TYPE, COOKIE, USER_AGENT},
    Method, RequestBuilder, Response,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::config::Config;
use crate::error::{ApiError, ApiErrorBody, ClientResult};
use crate::session::tokens::{SessionStore, REFRESH_TOKEN_COOKIE};

const API_ACCEPT: &str = "application/json, text/plain, */*";
const API_USER_AGENT: &str = concat!("biro-client/", env!("CARGO_PKG_VERSION"));

/// Sends requests against the portal host on behalf of one session.
#[derive(Debug, Clone)]
pub struct Pipeline {
    http: reqwest::Client,
    base_url: String,
    session: Arc<SessionStore>,
}

impl Pipeline {
    pub fn new(config: &Config, session: Arc<SessionStore>) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            session,
        })
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let response = self.send(self.request(Method::GET, path)).await?;
        read_json(response).await
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.send(self.request(Method::POST, path).json(body)).await?;
        read_json(response).await
    }

    /// POST without a body, relying on headers and cookies alone.
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let response = self.send(self.request(Method::POST, path)).await?;
        read_json(response).await
    }

    pub async fn post_raw<T: DeserializeOwned>(
        &self,
        path: &str,
        content_type: &str,
        body: Bytes,
    ) -> ClientResult<T> {
        let request = self
            .request(Method::POST, path)
            .header(CONTENT_TYPE, content_type)
            .body(body);
        let response = self.send(request).await?;
        read_json(response).await
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        debug!("{} {}", method, path);
        let mut request = self
            .http
            .request(method, self.url(path))
            .header(ACCEPT, API_ACCEPT)
            .header(USER_AGENT, API_USER_AGENT);

        if let Some(token) = self.session.access_token() {
            request = request.bearer_auth(token);
        }
        if let Some(token) = self.session.refresh_token() {
            if let Ok(cookie) = HeaderValue::from_str(&format!("{REFRESH_TOKEN_COOKIE}={token}")) {
                request = request.header(COOKIE, cookie);
            }
        }
        request
    }

    /// Sends the request, keeps any rotated refresh token and converts non-2xx
    /// responses into `ClientError::Api`.
    async fn send(&self, request: RequestBuilder) -> ClientResult<Response> {
        let response = request.send().await?;

        if self.session.absorb_cookies(response.headers()) {
            debug!("Refresh token updated from Set-Cookie");
        }

        if response.status().is_success() {
            return Ok(response);
        }
        Err(api_error(response).await.into())
    }
}

/// Reads an error response body as JSON or text, chosen by its content type.
async fn api_error(response: Response) -> ApiError {
    let status = response.status();
    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("json"));
    let text = response.text().await.unwrap_or_default();
    ApiError::new(status, ApiErrorBody::parse(text, is_json))
}

async fn read_json<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
    let text = response.text().await?;
    Ok(serde_json::from_str(&text)?)
}
