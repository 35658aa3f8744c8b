use super::error::EngineError;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(25);
const STDERR_TAIL_BYTES: usize = 2048;

/// Which engine entry point an invocation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationKind {
    /// Extract covariate values at sample locations.
    Getval,
    /// Train a model.
    Fit,
}

/// A cloneable flag that asks running invocations to stop.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// One call into the engine.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub kind: InvocationKind,
    pub argv: Vec<String>,
    pub timeout: Option<Duration>,
    pub cancel: CancellationToken,
}

impl Invocation {
    pub fn new(kind: InvocationKind, argv: Vec<String>) -> Self {
        Self {
            kind,
            argv,
            timeout: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Runs the external modeling engine.
///
/// Implementations write whatever the engine prints on its standard output to `stdout` and
/// return once the engine has finished. Each call owns its own output file, so concurrent
/// invocations never share a stream.
pub trait EngineRunner: Send + Sync {
    fn run(&self, invocation: &Invocation, stdout: File) -> Result<(), EngineError>;
}

/// Runs the engine as a child process.
#[derive(Debug, Clone)]
pub struct ProcessEngine {
    program: PathBuf,
    getval_args: Vec<String>,
    fit_args: Vec<String>,
    poll_interval: Duration,
}

impl ProcessEngine {
    /// A runner that passes the invocation's arguments straight to `program`.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            getval_args: Vec::new(),
            fit_args: Vec::new(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// The standard Java distribution: `density.Getval` for extraction and `density.MaxEnt`
    /// for fitting, both loaded from `jar`.
    pub fn maxent_jar(java: impl Into<PathBuf>, jar: &Path) -> Self {
        let jar = jar.to_string_lossy().to_string();
        Self::new(java)
            .with_prefix(
                InvocationKind::Getval,
                ["-cp".to_string(), jar.clone(), "density.Getval".to_string()],
            )
            .with_prefix(
                InvocationKind::Fit,
                [
                    "-mx512m".to_string(),
                    "-cp".to_string(),
                    jar,
                    "density.MaxEnt".to_string(),
                ],
            )
    }

    /// Arguments placed before the invocation's own arguments for `kind`.
    pub fn with_prefix(
        mut self,
        kind: InvocationKind,
        args: impl IntoIterator<Item = String>,
    ) -> Self {
        let args = args.into_iter().collect();
        match kind {
            InvocationKind::Getval => self.getval_args = args,
            InvocationKind::Fit => self.fit_args = args,
        }
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn prefix(&self, kind: InvocationKind) -> &[String] {
        match kind {
            InvocationKind::Getval => &self.getval_args,
            InvocationKind::Fit => &self.fit_args,
        }
    }

    fn wait(&self, child: &mut Child, invocation: &Invocation) -> Result<ExitStatus, EngineError> {
        let started = Instant::now();
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(status);
            }
            if invocation.cancel.is_cancelled() {
                terminate(child);
                return Err(EngineError::Cancelled);
            }
            if let Some(limit) = invocation.timeout {
                if started.elapsed() >= limit {
                    terminate(child);
                    return Err(EngineError::TimedOut { after: limit });
                }
            }
            thread::sleep(self.poll_interval);
        }
    }
}

impl EngineRunner for ProcessEngine {
    fn run(&self, invocation: &Invocation, stdout: File) -> Result<(), EngineError> {
        let mut command = Command::new(&self.program);
        command
            .args(self.prefix(invocation.kind))
            .args(&invocation.argv)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::piped());
        debug!("Spawning engine: {:?}", command);

        let mut child = command.spawn().map_err(|source| EngineError::Spawn {
            program: self.program.to_string_lossy().to_string(),
            source,
        })?;

        let stderr_reader = child.stderr.take().map(|mut pipe| {
            thread::spawn(move || {
                let mut buffer = Vec::new();
                let _ = pipe.read_to_end(&mut buffer);
                buffer
            })
        });

        // Timeout and cancellation return early and leave the stderr reader detached.
        let status = self.wait(&mut child, invocation)?;

        let stderr = stderr_reader
            .and_then(|handle| handle.join().ok())
            .map(|bytes| tail(&bytes))
            .unwrap_or_default();

        if status.success() {
            if !stderr.is_empty() {
                debug!("Engine stderr: {}", stderr);
            }
            Ok(())
        } else {
            Err(EngineError::Exit { status, stderr })
        }
    }
}

fn terminate(child: &mut Child) {
    if let Err(e) = child.kill() {
        warn!("Failed to kill engine process {}: {}", child.id(), e);
    }
    if let Err(e) = child.wait() {
        warn!("Failed to reap engine process {}: {}", child.id(), e);
    }
}

fn tail(bytes: &[u8]) -> String {
    let start = bytes.len().saturating_sub(STDERR_TAIL_BYTES);
    String::from_utf8_lossy(&bytes[start..]).trim().to_string()
}
