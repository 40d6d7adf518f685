//! Platform command adapter.
//!
//! Runs OS-native introspection commands and hands back their raw output.
//! Every invocation is bounded by a timeout; a timed out child is killed and
//! reported as a failure of that source only.

use log::{debug, warn};
use std::io::Read;
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::constants::COMMAND_POLL_INTERVAL_MS;
use crate::error::{Result, TriageError};

/// Captured result of one command
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandOutput {
    /// Exit code, `None` when killed by a signal
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Successful output with the given stdout
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            status: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }
}

/// Executes external commands
#[cfg_attr(test, mockall::automock)]
pub trait CommandRunner: Send + Sync {
    fn run<'a>(&self, program: &str, args: &[&'a str]) -> Result<CommandOutput>;
}

/// Runs commands as child processes with a bounded timeout
#[derive(Debug, Clone)]
pub struct SystemCommandRunner {
    timeout: Duration,
}

impl SystemCommandRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl CommandRunner for SystemCommandRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        debug!("Running {} {}", program, args.join(" "));

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| TriageError::from_io(format!("command `{}`", program), e))?;

        let stdout = child.stdout.take().map(spawn_reader);
        let stderr = child.stderr.take().map(spawn_reader);

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            match child.try_wait()? {
                Some(status) => break status,
                None if Instant::now() >= deadline => {
                    let _ = child.kill();
                    let _ = child.wait();
                    warn!("Command `{}` exceeded {:?}, killed", program, self.timeout);
                    return Err(TriageError::Timeout {
                        command: program.to_string(),
                        secs: self.timeout.as_secs(),
                    });
                }
                None => thread::sleep(Duration::from_millis(COMMAND_POLL_INTERVAL_MS)),
            }
        };

        Ok(CommandOutput {
            status: status.code(),
            stdout: join_reader(stdout),
            stderr: join_reader(stderr),
        })
    }
}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

fn join_reader(handle: Option<JoinHandle<Vec<u8>>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .map(|buf| String::from_utf8_lossy(&buf).into_owned())
        .unwrap_or_default()
}

/// Run a command and return its stdout, turning a failed exit into an error
pub fn run_checked(runner: &dyn CommandRunner, program: &str, args: &[&str]) -> Result<String> {
    let output = runner.run(program, args)?;
    if output.success() {
        return Ok(output.stdout);
    }

    let stderr = output.stderr.trim().to_string();
    let lowered = stderr.to_lowercase();
    if crate::collectors::source_tracker::SourceTracker::is_permission_error(&stderr)
        || lowered.contains("operation not permitted")
    {
        return Err(TriageError::Permission(format!("{}: {}", program, stderr)));
    }
    if lowered.contains("no crontab") || lowered.contains("no such file") || lowered.contains("not found") {
        return Err(TriageError::NotFound(format!("{}: {}", program, stderr)));
    }
    Err(TriageError::Command {
        command: program.to_string(),
        code: output
            .status
            .map(|c| c.to_string())
            .unwrap_or_else(|| "signal".to_string()),
        stderr,
    })
}
