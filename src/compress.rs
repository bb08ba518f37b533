//! Optional external code compressor with a hard time ceiling.
//!
//! The compressor is any command that reads code on stdin and writes the
//! compressed code on stdout, configured as `compressor_command`. Arguments
//! may carry `{rate}`, `{query}` and `{instruction}` placeholders; absent
//! values substitute as empty strings.
use anyhow::{anyhow, Result};
use std::io::{Read, Write};
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompressError {
    #[error("compressor unavailable: {0}")]
    Unavailable(String),
    #[error("compression timed out after {}s", .0.as_secs())]
    TimedOut(Duration),
    #[error("compression failed: {0}")]
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompressRequest {
    pub rate: f64,
    pub query: Option<String>,
    pub instruction: Option<String>,
}

impl CompressRequest {
    /// Rejects a keep-rate outside `0.0..=1.0`.
    pub fn new(rate: f64, query: Option<String>, instruction: Option<String>) -> Result<Self> {
        if !(0.0..=1.0).contains(&rate) {
            return Err(anyhow!("rate must be between 0 and 1, got {rate}"));
        }
        Ok(Self {
            rate,
            query,
            instruction,
        })
    }
}

pub trait CodeCompressor: Send + Sync {
    fn name(&self) -> &str;
    fn compress(&self, code: &str, request: &CompressRequest) -> Result<String, CompressError>;
}

/// Runs a configured command, feeding code on stdin.
#[derive(Debug, Clone)]
pub struct CommandCompressor {
    argv: Vec<String>,
    deadline: Duration,
}

impl CommandCompressor {
    pub fn from_command(command: &str, deadline: Duration) -> Result<Self, CompressError> {
        let argv = shell_words::split(command)
            .map_err(|err| CompressError::Unavailable(format!("parse {command:?}: {err}")))?;
        if argv.is_empty() {
            return Err(CompressError::Unavailable(
                "compressor command is empty".to_string(),
            ));
        }
        Ok(Self { argv, deadline })
    }

    fn resolved_argv(&self, request: &CompressRequest) -> Vec<String> {
        let rate = request.rate.to_string();
        let query = request.query.as_deref().unwrap_or("");
        let instruction = request.instruction.as_deref().unwrap_or("");
        self.argv
            .iter()
            .map(|arg| {
                arg.replace("{rate}", &rate)
                    .replace("{query}", query)
                    .replace("{instruction}", instruction)
            })
            .collect()
    }
}

impl CodeCompressor for CommandCompressor {
    fn name(&self) -> &str {
        &self.argv[0]
    }

    fn compress(&self, code: &str, request: &CompressRequest) -> Result<String, CompressError> {
        let argv = self.resolved_argv(request);
        let program = which::which(&argv[0])
            .map_err(|err| CompressError::Unavailable(format!("{}: {err}", argv[0])))?;

        let start = Instant::now();
        let mut child = Command::new(&program)
            .args(&argv[1..])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| CompressError::Failed(format!("spawn {}: {err}", argv[0])))?;

        let stdin = child.stdin.take();
        let input = code.to_string();
        let writer = thread::spawn(move || match stdin {
            Some(mut pipe) => pipe.write_all(input.as_bytes()),
            None => Ok(()),
        });
        let stdout = spawn_reader(child.stdout.take());
        let stderr = spawn_reader(child.stderr.take());

        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(err) => return Err(CompressError::Failed(format!("wait: {err}"))),
            }
            if start.elapsed() > self.deadline {
                let _ = child.kill();
                let _ = child.wait();
                tracing::warn!(program = %argv[0], "compressor killed at deadline");
                return Err(CompressError::TimedOut(self.deadline));
            }
            thread::sleep(POLL_INTERVAL);
        };

        // A compressor may exit without draining stdin; that is not an error.
        let _ = writer.join();
        let stdout = stdout.join().unwrap_or_default();
        let stderr = stderr.join().unwrap_or_default();
        tracing::info!(
            elapsed_ms = start.elapsed().as_millis(),
            input_bytes = code.len(),
            output_bytes = stdout.len(),
            "compressor invoke complete"
        );

        if !status.success() {
            return Err(CompressError::Failed(format!(
                "{} exited with {status}: {}",
                argv[0],
                stderr.trim()
            )));
        }
        if stdout.trim().is_empty() {
            return Err(CompressError::Failed(format!(
                "{} produced no output",
                argv[0]
            )));
        }
        Ok(stdout)
    }
}

fn spawn_reader<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}

/// Run `work` on a worker thread and wait at most `timeout` for it.
///
/// On expiry the worker is left running detached and the caller gets
/// `TimedOut`; nothing the worker produces afterwards is observed.
pub fn run_with_timeout<T, F>(timeout: Duration, work: F) -> Result<T, CompressError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, CompressError> + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(work());
    });
    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => Err(CompressError::TimedOut(timeout)),
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(CompressError::Failed(
            "compression worker exited without a result".to_string(),
        )),
    }
}

/// Compress one file's code under the time ceiling.
pub fn compress_with_timeout(
    compressor: Arc<dyn CodeCompressor>,
    code: String,
    request: CompressRequest,
    timeout: Duration,
) -> Result<String, CompressError> {
    run_with_timeout(timeout, move || compressor.compress(&code, &request))
}
