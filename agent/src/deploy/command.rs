//! Subprocess execution for pipeline stages

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, warn};

/// Default deadline when an invocation does not set one
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// A single external command to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    /// Working directory of the child. The agent's own working directory is never changed.
    pub current_dir: Option<PathBuf>,
    pub timeout: Duration,
}

impl Invocation {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            current_dir: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The command line as it would be typed in a shell
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// How a child process ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitInfo {
    /// Exited with a status code
    Code(i32),

    /// Killed by a signal
    Terminated,

    /// Killed after exceeding its deadline
    TimedOut(Duration),

    /// Never started, or could not be waited on
    SpawnFailed(String),
}

impl ExitInfo {
    pub fn success(&self) -> bool {
        matches!(self, ExitInfo::Code(0))
    }
}

impl fmt::Display for ExitInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitInfo::Code(code) => write!(f, "exit status {}", code),
            ExitInfo::Terminated => write!(f, "terminated by signal"),
            ExitInfo::TimedOut(after) => write!(f, "timed out after {}s", after.as_secs()),
            ExitInfo::SpawnFailed(reason) => write!(f, "failed to start: {}", reason),
        }
    }
}

/// Exit information and captured output of a finished command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit: ExitInfo,
    /// Stdout followed by stderr
    pub output: String,
}

impl CommandOutput {
    pub fn new(exit: ExitInfo, output: impl Into<String>) -> Self {
        Self {
            exit,
            output: output.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.exit.success()
    }
}

/// Runs external commands on behalf of the pipeline stages
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, invocation: &Invocation) -> CommandOutput;
}

/// Runs commands as child processes of the agent.
///
/// Children are killed when their future is dropped, so an abandoned HTTP
/// request or an expired deadline terminates the subprocess.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, invocation: &Invocation) -> CommandOutput {
        debug!("Running: {}", invocation.command_line());

        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &invocation.current_dir {
            command.current_dir(dir);
        }

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                return CommandOutput::new(ExitInfo::SpawnFailed(e.to_string()), String::new());
            }
        };

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let mut out = Vec::new();
        let mut err = Vec::new();

        // Output read before the deadline is kept
        let waited = tokio::time::timeout(invocation.timeout, async {
            let (status, _, _) = tokio::join!(
                child.wait(),
                drain(stdout, &mut out),
                drain(stderr, &mut err)
            );
            status
        })
        .await;

        let exit = match waited {
            Ok(Ok(status)) => match status.code() {
                Some(code) => ExitInfo::Code(code),
                None => ExitInfo::Terminated,
            },
            Ok(Err(e)) => ExitInfo::SpawnFailed(e.to_string()),
            Err(_) => {
                warn!(
                    "Command exceeded {}s deadline and was killed: {}",
                    invocation.timeout.as_secs(),
                    invocation.command_line()
                );
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill {}: {}", invocation.program, e);
                }
                ExitInfo::TimedOut(invocation.timeout)
            }
        };

        let mut combined = String::from_utf8_lossy(&out).into_owned();
        combined.push_str(&String::from_utf8_lossy(&err));
        CommandOutput::new(exit, combined)
    }
}

/// Read `pipe` to its end, appending each chunk to `buf` as it arrives
async fn drain<R: AsyncRead + Unpin>(pipe: Option<R>, buf: &mut Vec<u8>) {
    let Some(mut pipe) = pipe else {
        return;
    };
    let mut chunk = [0u8; 4096];
    loop {
        match pipe.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
            Err(e) => {
                debug!("Stopped reading child output: {}", e);
                break;
            }
        }
    }
}
