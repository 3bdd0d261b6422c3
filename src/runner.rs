//! Abstraction over external command execution for testability.
//!
//! Every buildah invocation goes through the [`CommandRunner`] trait, so the
//! whole client can be exercised in-process without spawning subprocesses.
//!
//! [`RealCommandRunner`] delegates to [`std::process::Command`] and is the
//! default stored in [`Buildah`](crate::client::Buildah). Tests swap in
//! [`MockCommandRunner`], which records every call and replays canned
//! responses.

use std::collections::VecDeque;
use std::process::{Command, Stdio};
use std::sync::Mutex;

use crate::error::Result;

/// Captured result of one external command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Whether the process exited with status zero.
    pub success: bool,
    /// Captured stdout; empty when capture was not requested.
    pub stdout: String,
    /// Captured stderr (always captured).
    pub stderr: String,
}

/// Trait for abstracting external command execution.
///
/// stderr is always captured so failures can carry the diagnostic stream.
/// stdout is captured only on request; otherwise the child inherits it.
pub trait CommandRunner: Send + Sync {
    fn run(&self, program: &str, args: &[String], capture_stdout: bool) -> Result<CommandOutput>;
}

/// Production implementation that spawns a blocking child process.
pub struct RealCommandRunner;

impl CommandRunner for RealCommandRunner {
    fn run(&self, program: &str, args: &[String], capture_stdout: bool) -> Result<CommandOutput> {
        let mut cmd = Command::new(program);
        cmd.args(args);
        cmd.stdin(Stdio::inherit());
        if !capture_stdout {
            cmd.stdout(Stdio::inherit());
        }
        let output = cmd.output()?;
        Ok(CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// A canned response for [`MockCommandRunner`].
pub struct MockResponse {
    output: CommandOutput,
    side_effect: Option<Box<dyn Fn(&[String]) + Send + Sync>>,
}

impl MockResponse {
    /// A zero-exit response with the given stdout.
    pub fn success(stdout: impl Into<String>) -> Self {
        MockResponse {
            output: CommandOutput {
                success: true,
                stdout: stdout.into(),
                stderr: String::new(),
            },
            side_effect: None,
        }
    }

    /// A non-zero-exit response with the given stderr.
    pub fn failure(stderr: impl Into<String>) -> Self {
        MockResponse {
            output: CommandOutput {
                success: false,
                stdout: String::new(),
                stderr: stderr.into(),
            },
            side_effect: None,
        }
    }

    /// Run `effect` with the argv when this response is consumed.
    ///
    /// Used to emulate commands that communicate through the filesystem,
    /// e.g. `buildah from --cidfile`.
    pub fn with_side_effect(mut self, effect: impl Fn(&[String]) + Send + Sync + 'static) -> Self {
        self.side_effect = Some(Box::new(effect));
        self
    }
}

/// Records all calls and replays queued responses.
///
/// When the queue is empty, a successful empty response is returned, so
/// tests only need to stage the invocations they care about.
#[derive(Default)]
pub struct MockCommandRunner {
    responses: Mutex<VecDeque<MockResponse>>,
    calls: Mutex<Vec<Vec<String>>>,
}

impl MockCommandRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the response for the next unanswered call.
    pub fn expect(&self, response: MockResponse) {
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(response);
    }

    /// All argv vectors seen so far (program first).
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl CommandRunner for MockCommandRunner {
    fn run(&self, program: &str, args: &[String], _capture_stdout: bool) -> Result<CommandOutput> {
        let mut call = Vec::with_capacity(args.len() + 1);
        call.push(program.to_string());
        call.extend(args.iter().cloned());
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(call);

        let response = self
            .responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or_else(|| MockResponse::success(""));
        if let Some(effect) = &response.side_effect {
            effect(args);
        }
        Ok(response.output)
    }
}
