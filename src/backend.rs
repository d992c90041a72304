//! Generative backend client
//!
//! Defines the `generate(prompt) -> text` capability the extractor, merger and
//! planner depend on, plus the policy that bounds every call. Two
//! implementations:
//! - `CommandBackend`: spawns a configured command (e.g. `ollama run llama3.1`),
//!   writes the prompt to stdin and returns stdout (production)
//! - `MockBackend`: returns scripted responses (testing)
//!
//! Successful output is never assumed to be well-formed; that is the parser
//! chain's problem.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::process::Stdio;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

/// Errors from a single backend call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BackendError {
    #[error("backend not available: {0}")]
    Unavailable(String),
    #[error("backend rejected credentials: {0}")]
    Auth(String),
    #[error("backend call timed out after {0:?}")]
    Timeout(Duration),
    #[error("backend invocation failed: {0}")]
    InvocationFailed(String),
}

impl BackendError {
    /// Transient failures get one retry; auth failures never do.
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::Auth(_))
    }
}

/// A fallible, non-deterministic text-completion capability.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Short label used in logs
    fn name(&self) -> &str;

    async fn generate(&self, prompt: &str) -> Result<String, BackendError>;
}

/// Bounds applied to every backend call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CallPolicy {
    pub timeout: Duration,
}

impl CallPolicy {
    /// Retries allowed after a timeout or transient failure
    pub const RETRIES: u32 = 1;

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
        }
    }
}

/// Call the backend under `policy`: each attempt is bounded by the timeout,
/// and a timeout or transient error is retried exactly once.
pub async fn generate_bounded(
    backend: &dyn GenerativeBackend,
    prompt: &str,
    policy: &CallPolicy,
) -> Result<String, BackendError> {
    let mut attempt = 0;
    loop {
        let result = match tokio::time::timeout(policy.timeout, backend.generate(prompt)).await {
            Ok(result) => result,
            Err(_) => Err(BackendError::Timeout(policy.timeout)),
        };

        match result {
            Ok(text) => {
                debug!(backend = backend.name(), attempt, bytes = text.len(), "backend call succeeded");
                return Ok(text);
            }
            Err(e) if e.is_transient() && attempt < CallPolicy::RETRIES => {
                warn!(backend = backend.name(), attempt, error = %e, "backend call failed, retrying");
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

// ---------------------------------------------------------------------------
// CommandBackend
// ---------------------------------------------------------------------------

/// Runs a local command per call: prompt on stdin, completion on stdout.
#[derive(Debug, Clone)]
pub struct CommandBackend {
    program: String,
    args: Vec<String>,
}

impl CommandBackend {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Build from a full argv (`["ollama", "run", "llama3.1"]`).
    pub fn from_argv(argv: &[String]) -> Result<Self, BackendError> {
        match argv.split_first() {
            Some((program, args)) if !program.trim().is_empty() => {
                Ok(Self::new(program.clone(), args.to_vec()))
            }
            _ => Err(BackendError::Unavailable(
                "no backend command configured".to_string(),
            )),
        }
    }
}

fn classify_failure(stderr: &str) -> BackendError {
    let lower = stderr.to_lowercase();
    let snippet: String = stderr.trim().chars().take(200).collect();
    if ["unauthorized", "forbidden", "api key", "401", "403"]
        .iter()
        .any(|needle| lower.contains(needle))
    {
        BackendError::Auth(snippet)
    } else {
        BackendError::InvocationFailed(snippet)
    }
}

#[async_trait]
impl GenerativeBackend for CommandBackend {
    fn name(&self) -> &str {
        &self.program
    }

    async fn generate(&self, prompt: &str) -> Result<String, BackendError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| BackendError::Unavailable(format!("{}: {}", self.program, e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(prompt.as_bytes())
                .await
                .map_err(|e| BackendError::InvocationFailed(format!("writing prompt: {}", e)))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| BackendError::InvocationFailed(format!("waiting for output: {}", e)))?;

        if !output.status.success() {
            return Err(classify_failure(&String::from_utf8_lossy(&output.stderr)));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

// ---------------------------------------------------------------------------
// MockBackend
// ---------------------------------------------------------------------------

/// Mock backend for testing: returns scripted responses.
///
/// Resolution order per call: the next queued response (if any), then the
/// first rule whose marker appears in the prompt, then the fallback.
pub struct MockBackend {
    available: bool,
    queued: Mutex<VecDeque<Result<String, BackendError>>>,
    rules: Vec<(String, String)>,
    fallback: Option<String>,
    delay: Option<Duration>,
    prompts: Mutex<Vec<String>>,
}

impl MockBackend {
    /// A mock that answers (once scripted).
    pub fn available() -> Self {
        Self {
            available: true,
            queued: Mutex::new(VecDeque::new()),
            rules: Vec::new(),
            fallback: None,
            delay: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// A mock whose every call fails with `Unavailable`.
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::available()
        }
    }

    /// Queue a one-shot response.
    pub fn then(self, response: impl Into<String>) -> Self {
        self.push(Ok(response.into()));
        self
    }

    /// Queue a one-shot failure.
    pub fn then_fail(self, error: BackendError) -> Self {
        self.push(Err(error));
        self
    }

    /// Answer `response` whenever the prompt contains `marker`.
    pub fn on(mut self, marker: impl Into<String>, response: impl Into<String>) -> Self {
        self.rules.push((marker.into(), response.into()));
        self
    }

    /// Answer `response` when nothing else matches.
    pub fn otherwise(mut self, response: impl Into<String>) -> Self {
        self.fallback = Some(response.into());
        self
    }

    /// Sleep before answering (for timeout and concurrency tests).
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every prompt received so far, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn push(&self, response: Result<String, BackendError>) {
        self.queued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(response);
    }
}

#[async_trait]
impl GenerativeBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(&self, prompt: &str) -> Result<String, BackendError> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(prompt.to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if !self.available {
            return Err(BackendError::Unavailable(
                "mock backend configured as unavailable".to_string(),
            ));
        }

        let queued = self
            .queued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        if let Some(response) = queued {
            return response;
        }

        if let Some((_, response)) = self.rules.iter().find(|(marker, _)| prompt.contains(marker.as_str())) {
            return Ok(response.clone());
        }

        self.fallback.clone().ok_or_else(|| {
            BackendError::InvocationFailed("no scripted response for prompt".to_string())
        })
    }
}
