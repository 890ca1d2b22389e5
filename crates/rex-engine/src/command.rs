//! Subprocess-backed union engine.

use std::io::{self, Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::{EngineError, UnionEngine};

/// Default engine binary, resolved through `PATH`.
pub const DEFAULT_PROGRAM: &str = "rassemble";

/// Default wait budget for one engine invocation.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Union engine backed by an external command.
///
/// One invocation spawns the command with piped standard streams, writes all
/// input expressions newline-terminated, and reads the first output line as
/// the result. A hung engine is killed once the wait budget is exceeded.
///
/// # Example
///
/// ```ignore
/// use rex_engine::{CommandEngine, UnionEngine};
///
/// let engine = CommandEngine::default();
/// let union = engine.union(&["a".to_owned(), "b".to_owned()])?;
/// ```
pub struct CommandEngine {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandEngine {
    /// Create an engine invoking `program`.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set extra arguments passed to the engine program.
    #[must_use]
    pub fn args(mut self, args: &[String]) -> Self {
        self.args = args.to_vec();
        self
    }

    /// Set the wait budget for one invocation.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for CommandEngine {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRAM)
    }
}

impl UnionEngine for CommandEngine {
    fn union(&self, inputs: &[String]) -> Result<String, EngineError> {
        tracing::debug!(
            program = %self.program,
            lines = inputs.len(),
            "invoking union engine"
        );

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| EngineError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let mut stdin = take_pipe(child.stdin.take(), "stdin")?;
        let mut stdout = take_pipe(child.stdout.take(), "stdout")?;
        let mut stderr = take_pipe(child.stderr.take(), "stderr")?;

        let mut payload = Vec::new();
        for line in inputs {
            payload.extend_from_slice(line.as_bytes());
            payload.push(b'\n');
        }

        // The engine may exit before draining stdin; a broken pipe here is
        // reported through the stderr check below, not as an I/O fault.
        let writer = thread::spawn(move || -> io::Result<()> {
            stdin.write_all(&payload)?;
            stdin.flush()
        });
        let stdout_reader = thread::spawn(move || -> io::Result<Vec<u8>> {
            let mut buf = Vec::new();
            stdout.read_to_end(&mut buf)?;
            Ok(buf)
        });
        let stderr_reader = thread::spawn(move || -> io::Result<Vec<u8>> {
            let mut buf = Vec::new();
            stderr.read_to_end(&mut buf)?;
            Ok(buf)
        });

        let (status, timed_out) = wait_with_deadline(&mut child, self.timeout)?;
        let _ = writer.join();
        let stdout_bytes = stdout_reader
            .join()
            .unwrap_or_else(|_| Ok(Vec::new()))?;
        let stderr_bytes = stderr_reader
            .join()
            .unwrap_or_else(|_| Ok(Vec::new()))?;

        if timed_out {
            tracing::error!(program = %self.program, "union engine timed out, killed");
            return Err(EngineError::Timeout(self.timeout));
        }

        if !stderr_bytes.is_empty() {
            return Err(EngineError::Failed {
                stderr: String::from_utf8_lossy(&stderr_bytes).trim_end().to_owned(),
            });
        }

        tracing::debug!(?status, "union engine finished");
        let text = String::from_utf8(stdout_bytes)?;
        Ok(text.lines().next().unwrap_or_default().to_owned())
    }
}

fn take_pipe<T>(pipe: Option<T>, name: &str) -> Result<T, EngineError> {
    pipe.ok_or_else(|| EngineError::Io(io::Error::other(format!("engine {name} not captured"))))
}

/// Poll the child until it exits or the deadline passes, killing it in the
/// latter case. Returns the exit status and whether the deadline was hit.
fn wait_with_deadline(child: &mut Child, timeout: Duration) -> io::Result<(ExitStatus, bool)> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok((status, false));
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let status = child.wait()?;
            return Ok((status, true));
        }
        thread::sleep(Duration::from_millis(5));
    }
}
