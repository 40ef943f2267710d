//! Camera-driven QR scanning.
//!
//! [`ScannerController`] owns the one camera stream the process may hold
//! and walks it through `Idle -> Starting -> Active -> Stopping -> Idle`.
//! Decoding itself is delegated to whatever sits behind the [`Camera`]
//! seam: an external scanner process, a line source, or a test double.

use std::fmt;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStdout, Command};
use tokio::sync::Mutex;

use crate::error::{Result, ShareError};
use crate::model::ScanPayload;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScannerState {
    Idle,
    Starting,
    Active,
    Stopping,
}

impl fmt::Display for ScannerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Starting => write!(f, "starting"),
            Self::Active => write!(f, "active"),
            Self::Stopping => write!(f, "stopping"),
        }
    }
}

/// Source of environment-facing video that can be decoded into QR payloads.
#[async_trait]
pub trait Camera: Send {
    /// Acquire the camera and start decoding. Permission or device failures
    /// are reported as [`ShareError::Camera`].
    async fn open(&mut self) -> Result<Box<dyn DecodeStream>>;
}

#[async_trait]
impl<C: Camera + ?Sized> Camera for Box<C> {
    async fn open(&mut self) -> Result<Box<dyn DecodeStream>> {
        (**self).open().await
    }
}

/// An acquired camera stream with a running decoder.
#[async_trait]
pub trait DecodeStream: Send {
    /// Next decoded payload, `Ok(None)` once the stream has ended.
    async fn next_decoded(&mut self) -> Result<Option<ScanPayload>>;

    /// Release the camera and decoder. Called exactly once per stream by
    /// the controller, but must tolerate repeated calls.
    fn release(&mut self);
}

/// Owned scanner handle held by the composition root.
pub struct ScannerController<C: Camera> {
    camera: C,
    state: ScannerState,
    stream: Option<Box<dyn DecodeStream>>,
}

impl<C: Camera> ScannerController<C> {
    pub fn new(camera: C) -> Self {
        Self {
            camera,
            state: ScannerState::Idle,
            stream: None,
        }
    }

    pub fn state(&self) -> ScannerState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == ScannerState::Active
    }

    /// Start scanning. Only acts from `Idle`; otherwise returns the current
    /// state untouched.
    pub async fn start(&mut self) -> Result<ScannerState> {
        if self.state != ScannerState::Idle {
            tracing::debug!(state = %self.state, "scanner already running");
            return Ok(self.state);
        }

        self.transition(ScannerState::Starting);
        match self.camera.open().await {
            Ok(stream) => {
                self.stream = Some(stream);
                self.transition(ScannerState::Active);
                Ok(self.state)
            }
            Err(e) => {
                tracing::warn!(error = %e, "camera unavailable");
                self.teardown();
                if matches!(e, ShareError::Camera(_)) {
                    Err(e)
                } else {
                    Err(ShareError::camera(e.to_string()))
                }
            }
        }
    }

    /// Wait for the first decoded payload of the current Active session.
    ///
    /// The scanner stops as soon as a payload arrives, so each session
    /// yields at most one. Outside `Active` this returns `Ok(None)`.
    pub async fn next_payload(&mut self) -> Result<Option<ScanPayload>> {
        if self.state != ScannerState::Active {
            return Ok(None);
        }
        let Some(stream) = self.stream.as_mut() else {
            self.teardown();
            return Ok(None);
        };

        let decoded = loop {
            match stream.next_decoded().await {
                Ok(Some(payload)) if payload.is_blank() => continue,
                other => break other,
            }
        };

        self.teardown();
        if let Ok(Some(_)) = &decoded {
            tracing::info!("QR code decoded, scanner stopped");
        }
        decoded
    }

    /// Explicit user stop. Safe to call in any state.
    pub fn stop(&mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if matches!(self.state, ScannerState::Starting | ScannerState::Active) {
            self.transition(ScannerState::Stopping);
        }
        if let Some(mut stream) = self.stream.take() {
            stream.release();
        }
        if self.state != ScannerState::Idle {
            self.transition(ScannerState::Idle);
        }
    }

    fn transition(&mut self, next: ScannerState) {
        tracing::debug!(from = %self.state, to = %next, "scanner state");
        self.state = next;
    }
}

impl<C: Camera> Drop for ScannerController<C> {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Runs an external scanner (for example `zbarcam --raw --nodisplay`) and
/// treats every stdout line as one decoded payload.
pub struct CommandCamera {
    program: String,
    args: Vec<String>,
}

impl CommandCamera {
    pub fn new(program: impl Into<String>, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Build from a command line split on whitespace.
    pub fn from_command_line(command: &str) -> Result<Self> {
        let mut parts = command.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| ShareError::camera("scanner command is empty"))?;
        Ok(Self::new(program, parts))
    }
}

#[async_trait]
impl Camera for CommandCamera {
    async fn open(&mut self) -> Result<Box<dyn DecodeStream>> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ShareError::camera(format!("failed to start `{}`: {e}", self.program)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ShareError::camera("scanner stdout unavailable"))?;
        tracing::debug!(program = %self.program, pid = ?child.id(), "scanner process started");

        Ok(Box::new(CommandStream {
            child,
            lines: BufReader::new(stdout).lines(),
        }))
    }
}

struct CommandStream {
    child: Child,
    lines: Lines<BufReader<ChildStdout>>,
}

#[async_trait]
impl DecodeStream for CommandStream {
    async fn next_decoded(&mut self) -> Result<Option<ScanPayload>> {
        match self.lines.next_line().await {
            Ok(Some(line)) => Ok(Some(ScanPayload::new(line.trim_end()))),
            Ok(None) => {
                let status = self
                    .child
                    .wait()
                    .await
                    .map_err(|e| ShareError::camera(e.to_string()))?;
                if status.success() {
                    Ok(None)
                } else {
                    Err(ShareError::camera(format!("scanner exited with {status}")))
                }
            }
            Err(e) => Err(ShareError::camera(format!("reading scanner output: {e}"))),
        }
    }

    fn release(&mut self) {
        if let Err(e) = self.child.start_kill() {
            tracing::debug!(error = %e, "scanner process already gone");
        }
    }
}

/// Payloads from any async line source, one per line (stdin by default).
pub struct LineCamera<R> {
    lines: Arc<Mutex<Lines<R>>>,
}

impl<R: AsyncBufRead + Unpin + Send + 'static> LineCamera<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: Arc::new(Mutex::new(reader.lines())),
        }
    }
}

impl LineCamera<BufReader<tokio::io::Stdin>> {
    pub fn stdin() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()))
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send + 'static> Camera for LineCamera<R> {
    async fn open(&mut self) -> Result<Box<dyn DecodeStream>> {
        Ok(Box::new(LineStream {
            lines: Some(Arc::clone(&self.lines)),
        }))
    }
}

struct LineStream<R> {
    lines: Option<Arc<Mutex<Lines<R>>>>,
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send + 'static> DecodeStream for LineStream<R> {
    async fn next_decoded(&mut self) -> Result<Option<ScanPayload>> {
        let Some(lines) = &self.lines else {
            return Ok(None);
        };
        let mut lines = lines.lock().await;
        lines
            .next_line()
            .await
            .map(|line| line.map(|l| ScanPayload::new(l.trim_end())))
            .map_err(|e| ShareError::camera(format!("reading payload source: {e}")))
    }

    fn release(&mut self) {
        self.lines = None;
    }
}
