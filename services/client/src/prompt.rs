//! services/client/src/prompt.rs
//!
//! Line-based terminal implementations of the credential and error prompts.

use async_trait::async_trait;
use biro_core::{CredentialPrompt, Credentials, ErrorPrompt, PortError, PortResult, RetryChoice};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout};
use tokio::sync::Mutex;

/// Asks for credentials and retry decisions on a line-based stream.
///
/// Input is read as plain lines, so the password is echoed like any other
/// answer. Hosts that need hidden input implement `CredentialPrompt` themselves.
pub struct TerminalPrompt<R, W> {
    input: Mutex<R>,
    output: Mutex<W>,
}

impl TerminalPrompt<BufReader<Stdin>, Stdout> {
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl<R, W> TerminalPrompt<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(input: R, output: W) -> Self {
        Self {
            input: Mutex::new(input),
            output: Mutex::new(output),
        }
    }

    /// Writes `label` and reads one line. `None` at end of input.
    async fn ask(&self, label: &str) -> PortResult<Option<String>> {
        {
            let mut output = self.output.lock().await;
            output.write_all(label.as_bytes()).await.map_err(unexpected)?;
            output.flush().await.map_err(unexpected)?;
        }
        let mut line = String::new();
        let read = self
            .input
            .lock()
            .await
            .read_line(&mut line)
            .await
            .map_err(unexpected)?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    pub fn into_output(self) -> W {
        self.output.into_inner()
    }
}

fn unexpected(err: std::io::Error) -> PortError {
    PortError::Unexpected(err.to_string())
}

#[async_trait]
impl<R, W> CredentialPrompt for TerminalPrompt<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn request_credentials(&self) -> PortResult<Option<Credentials>> {
        let Some(username) = self.ask("Username: ").await? else {
            return Ok(None);
        };
        let Some(password) = self.ask("Password: ").await? else {
            return Ok(None);
        };
        let credentials = Credentials::new(username.trim(), password);
        Ok((!credentials.is_empty()).then_some(credentials))
    }
}

#[async_trait]
impl<R, W> ErrorPrompt for TerminalPrompt<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn acknowledge(&self, message: &str) -> PortResult<RetryChoice> {
        let answer = self.ask(&format!("{message}\nTry again? [Y/n] ")).await?;
        Ok(match answer.as_deref().map(str::trim) {
            None => RetryChoice::Cancel,
            Some(a) if a.eq_ignore_ascii_case("n") || a.eq_ignore_ascii_case("no") => {
                RetryChoice::Cancel
            }
            Some(_) => RetryChoice::Retry,
        })
    }
}
