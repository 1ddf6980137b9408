//! External command execution.
//!
//! Every tool the pipeline drives (the bootstrap script, `b2`, `git apply`)
//! goes through [`CommandRunner`], so tests can script exit codes without
//! spawning anything.

use crate::error::{HeadersError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs::File;
use std::io::Read;
use std::process::{Child, Command, Output, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use wait_timeout::ChildExt;

/// A fully described command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program to run. A bare name is looked up on `PATH`; a relative path
    /// such as `./b2` is resolved against `working_dir`.
    pub program: String,
    /// Arguments passed to the program.
    pub args: Vec<String>,
    /// Working directory for the child process.
    pub working_dir: Utf8PathBuf,
    /// When set, stdout and stderr are both written to this file instead of
    /// being captured.
    pub log_file: Option<Utf8PathBuf>,
    /// When set, the child is killed if it runs longer than this.
    pub timeout: Option<Duration>,
}

impl Invocation {
    /// Create an invocation of `program` in `working_dir` with no arguments.
    #[must_use]
    pub fn new(program: impl Into<String>, working_dir: &Utf8Path) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: working_dir.to_owned(),
            log_file: None,
            timeout: None,
        }
    }

    /// Append one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Redirect stdout and stderr to `path`, truncating it.
    #[must_use]
    pub fn log_to(mut self, path: Utf8PathBuf) -> Self {
        self.log_file = Some(path);
        self
    }

    /// Kill the child if it has not exited after `timeout`.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Return the value of the first `--{name}=VALUE` argument.
    ///
    /// # Examples
    ///
    /// ```
    /// use boost_headers::command::Invocation;
    /// use camino::Utf8Path;
    ///
    /// let invocation = Invocation::new("./b2", Utf8Path::new("."))
    ///     .arg("install")
    ///     .arg("--prefix=/tmp/out");
    /// assert_eq!(invocation.option_value("prefix"), Some("/tmp/out"));
    /// assert_eq!(invocation.option_value("libdir"), None);
    /// ```
    #[must_use]
    pub fn option_value(&self, name: &str) -> Option<&str> {
        let flag = format!("--{name}=");
        self.args.iter().find_map(|arg| arg.strip_prefix(&flag))
    }

    /// Render the invocation as a shell-like command line for diagnostics.
    #[must_use]
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Abstraction for running external commands.
#[cfg_attr(test, mockall::automock)]
pub trait CommandRunner {
    /// Runs the invocation to completion and returns its output.
    ///
    /// When the invocation logs to a file, the returned `stdout` and `stderr`
    /// are empty.
    ///
    /// # Errors
    ///
    /// Returns [`HeadersError::Io`] when the program cannot be spawned or the
    /// log file cannot be created, and [`HeadersError::CommandTimedOut`] when
    /// the timeout elapses.
    fn run(&self, invocation: &Invocation) -> Result<Output>;
}

/// Executes commands on the host system.
///
/// # Examples
///
/// ```no_run
/// use boost_headers::command::{CommandRunner, Invocation, SystemCommandRunner};
/// use camino::Utf8Path;
///
/// let output = SystemCommandRunner.run(&Invocation::new("git", Utf8Path::new(".")).arg("--version"))?;
/// assert!(output.status.success());
/// # Ok::<(), boost_headers::error::HeadersError>(())
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run(&self, invocation: &Invocation) -> Result<Output> {
        log::debug!(
            "running `{}` in {}",
            invocation.command_line(),
            invocation.working_dir
        );

        let mut cmd = Command::new(resolve_program(invocation));
        cmd.args(&invocation.args)
            .current_dir(invocation.working_dir.as_std_path())
            .stdin(Stdio::null());

        match &invocation.log_file {
            Some(path) => {
                let log = File::create(path)?;
                cmd.stdout(Stdio::from(log.try_clone()?))
                    .stderr(Stdio::from(log));
            }
            None => {
                cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
            }
        }

        let child = cmd.spawn()?;
        match invocation.timeout {
            Some(timeout) => wait_with_timeout(child, &invocation.program, timeout),
            None => child.wait_with_output().map_err(HeadersError::from),
        }
    }
}

/// Resolve a relative program path against the invocation's working
/// directory, leaving bare names for `PATH` lookup.
fn resolve_program(invocation: &Invocation) -> Utf8PathBuf {
    let program = Utf8Path::new(&invocation.program);
    if program.is_relative() && program.components().count() > 1 {
        invocation.working_dir.join(program)
    } else {
        program.to_owned()
    }
}

/// Waits for `child`, killing it if `timeout` elapses first.
///
/// Piped output is drained on reader threads while waiting so a chatty child
/// cannot block on a full pipe.
fn wait_with_timeout(mut child: Child, program: &str, timeout: Duration) -> Result<Output> {
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    match child.wait_timeout(timeout)? {
        Some(status) => Ok(Output {
            status,
            stdout: collect(stdout)?,
            stderr: collect(stderr)?,
        }),
        None => {
            if let Err(err) = child.kill() {
                log::debug!("failed to kill timed-out {program}: {err}");
            }
            if let Err(err) = child.wait() {
                log::debug!("failed to reap timed-out {program}: {err}");
            }
            Err(HeadersError::CommandTimedOut {
                program: program.to_owned(),
                seconds: timeout.as_secs(),
            })
        }
    }
}

type Drain = JoinHandle<std::io::Result<Vec<u8>>>;

fn drain(mut stream: impl Read + Send + 'static) -> Drain {
    thread::spawn(move || {
        let mut buffer = Vec::new();
        stream.read_to_end(&mut buffer)?;
        Ok(buffer)
    })
}

fn collect(reader: Option<Drain>) -> Result<Vec<u8>> {
    reader.map_or_else(
        || Ok(Vec::new()),
        |handle| {
            let bytes = handle
                .join()
                .map_err(|_| std::io::Error::other("output reader panicked"))??;
            Ok(bytes)
        },
    )
}
