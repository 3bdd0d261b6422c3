//! The buildah client and its command invoker.
//!
//! [`Buildah`] owns everything one invocation needs: the program name, the
//! global options rendered before every subcommand, the [`CommandRunner`]
//! seam, and an optional timing log. All of it is fixed at construction via
//! [`BuildahBuilder`]; there is no mutable process-wide state.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{BuildahError, Result};
use crate::options::Options;
use crate::runner::{CommandRunner, RealCommandRunner};
use crate::timings::TimingRecord;

/// Handle to the buildah CLI.
///
/// Cheap to clone; every [`Image`](crate::Image) and
/// [`Container`](crate::Container) view holds one.
#[derive(Clone)]
pub struct Buildah {
    inner: Arc<Inner>,
}

struct Inner {
    program: String,
    global: Options,
    runner: Arc<dyn CommandRunner>,
    timing_log: Option<Mutex<File>>,
}

impl fmt::Debug for Buildah {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buildah")
            .field("program", &self.inner.program)
            .field("global", &self.inner.global)
            .finish_non_exhaustive()
    }
}

/// Single initialization point for [`Buildah`].
pub struct BuildahBuilder {
    program: String,
    global: Options,
    runner: Arc<dyn CommandRunner>,
    timing_log: Option<PathBuf>,
}

impl Default for BuildahBuilder {
    fn default() -> Self {
        BuildahBuilder {
            program: "buildah".to_string(),
            global: Options::new(),
            runner: Arc::new(RealCommandRunner),
            timing_log: None,
        }
    }
}

impl BuildahBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Executable to invoke instead of `buildah` on `$PATH`.
    pub fn program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Options rendered before the subcommand on every invocation,
    /// e.g. `--root`/`--runroot` for a private store.
    pub fn global_options(mut self, global: Options) -> Self {
        self.global = global;
        self
    }

    /// Replace the command runner; tests inject
    /// [`MockCommandRunner`](crate::runner::MockCommandRunner) here.
    pub fn runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Append one NDJSON [`TimingRecord`] per invocation to `path`.
    ///
    /// The resulting file is what `buildah-agg` consumes.
    pub fn timing_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.timing_log = Some(path.into());
        self
    }

    pub fn build(self) -> Result<Buildah> {
        let timing_log = match self.timing_log {
            Some(path) => Some(Mutex::new(
                OpenOptions::new().create(true).append(true).open(path)?,
            )),
            None => None,
        };
        Ok(Buildah {
            inner: Arc::new(Inner {
                program: self.program,
                global: self.global,
                runner: self.runner,
                timing_log,
            }),
        })
    }
}

impl Default for Buildah {
    fn default() -> Self {
        Self::new()
    }
}

impl Buildah {
    /// Client with default settings: `buildah` on `$PATH`, no global
    /// options, no timing log.
    pub fn new() -> Self {
        Buildah {
            inner: Arc::new(Inner {
                program: "buildah".to_string(),
                global: Options::new(),
                runner: Arc::new(RealCommandRunner),
                timing_log: None,
            }),
        }
    }

    pub fn builder() -> BuildahBuilder {
        BuildahBuilder::new()
    }

    pub(crate) fn program(&self) -> &str {
        &self.inner.program
    }

    pub(crate) fn global_options(&self) -> &Options {
        &self.inner.global
    }

    /// Run a subcommand, discarding stdout.
    pub(crate) fn invoke(&self, subcommand: &str, options: &Options, args: &[&str]) -> Result<()> {
        self.exec(subcommand, options, args, false).map(|_| ())
    }

    /// Run a subcommand and return its captured stdout.
    pub(crate) fn invoke_captured(
        &self,
        subcommand: &str,
        options: &Options,
        args: &[&str],
    ) -> Result<String> {
        self.exec(subcommand, options, args, true)
    }

    /// Run a subcommand and parse its stdout as JSON.
    ///
    /// Most subcommands need `--json` to emit JSON; `info` emits it
    /// unconditionally, so the flag can be suppressed.
    pub(crate) fn invoke_json(
        &self,
        subcommand: &str,
        options: &Options,
        args: &[&str],
        emit_json_flag: bool,
    ) -> Result<Value> {
        let options = if emit_json_flag {
            options.clone().flag("json")
        } else {
            options.clone()
        };
        let stdout = self.exec(subcommand, &options, args, true)?;
        Ok(serde_json::from_str(&stdout)?)
    }

    /// Run a JSON list subcommand and wrap every element, in output order.
    ///
    /// buildah prints `null` instead of `[]` when the store is empty; that
    /// is normalized to an empty sequence here.
    pub(crate) fn invoke_list<T>(
        &self,
        subcommand: &str,
        options: &Options,
        args: &[&str],
        wrap: impl Fn(&Value) -> Result<T>,
    ) -> Result<Vec<T>> {
        let value = self.invoke_json(subcommand, options, args, true)?;
        let items = match value {
            Value::Null => Vec::new(),
            Value::Array(items) => items,
            other => {
                return Err(BuildahError::UnexpectedOutput {
                    subcommand: subcommand.to_string(),
                    detail: format!("expected a JSON list, got {other}"),
                });
            }
        };
        items.iter().map(|item| wrap(item)).collect()
    }

    fn exec(
        &self,
        subcommand: &str,
        options: &Options,
        args: &[&str],
        capture_stdout: bool,
    ) -> Result<String> {
        let inner = &self.inner;
        let mut argv = inner.global.to_args();
        argv.push(subcommand.to_string());
        argv.extend(options.to_args());
        argv.extend(args.iter().map(|a| a.to_string()));
        debug!(program = %inner.program, subcommand, argv = ?argv, "invoking buildah");

        let start = Instant::now();
        let output = inner.runner.run(&inner.program, &argv, capture_stdout)?;
        self.record_timing(subcommand, start.elapsed());

        if !output.success {
            return Err(BuildahError::CommandFailed {
                stderr: output.stderr,
            });
        }
        Ok(output.stdout)
    }

    /// A timing write failure never fails the operation that produced it.
    fn record_timing(&self, subcommand: &str, duration: Duration) {
        debug!(
            subcommand,
            duration_ms = duration.as_millis() as u64,
            "buildah call finished"
        );
        let Some(log) = &self.inner.timing_log else {
            return;
        };
        let record = TimingRecord {
            subcommand: subcommand.to_string(),
            duration: duration.as_secs_f64(),
        };
        match serde_json::to_string(&record) {
            Ok(line) => {
                let mut file = log.lock().unwrap_or_else(|e| e.into_inner());
                if let Err(err) = writeln!(file, "{line}") {
                    warn!(%err, "failed to append timing record");
                }
            }
            Err(err) => warn!(%err, "failed to encode timing record"),
        }
    }
}
