//! Affine backends.
//!
//! The normalize pipeline hands a purely affine set, in the textual
//! grammar, to an `AffineBackend` and parses the canonical text it
//! returns. `NativeBackend` is the built-in pure-Rust canonicalizer and
//! the default; `IsccBackend` shells out to `iscc` (the ISL calculator)
//! when exact polyhedral simplification is wanted.
//!
//! `iscc` install hints: `brew install isl` (macOS),
//! `apt install isl-utils` (Debian/Ubuntu), `dnf install isl-devel`
//! (Fedora).

mod native;
mod omega;

pub use native::NativeBackend;
pub use omega::OmegaRewriter;

use crate::utils::errors::BackendError;
use std::io::Write;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

/// A canonicalizer for affine sets. Input and output are both in the
/// crate's textual grammar; the backend may split a conjunction into
/// unioned cases but must preserve the tuple arity.
pub trait AffineBackend {
    /// Human-readable backend name, for logs and CLI output.
    fn name(&self) -> &'static str;

    /// Whether the backend can be used right now.
    fn is_available(&self) -> bool;

    /// Simplify a set: remove redundant constraints, substitute
    /// equalities, and detect infeasibility.
    fn canonicalize(&self, input: &str) -> Result<String, BackendError>;
}

/// Whether `iscc` is installed and runnable.
pub fn is_iscc_available() -> bool {
    Command::new("iscc")
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Backend shelling out to the `iscc` calculator.
pub struct IsccBackend {
    timeout: Duration,
}

impl IsccBackend {
    /// Default 10-second timeout per invocation.
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(10),
        }
    }

    /// Override the per-invocation timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Pipe a script through `iscc`, polling for completion so a hung
    /// solver is killed instead of blocking the analysis.
    fn run(&self, script: &str) -> Result<String, BackendError> {
        let mut child = Command::new("iscc")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| BackendError::Unavailable(format!("cannot spawn iscc: {}", e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(script.as_bytes())?;
        }

        let start = Instant::now();
        loop {
            match child.try_wait()? {
                Some(status) => {
                    let output = child.wait_with_output()?;
                    if !status.success() {
                        return Err(BackendError::CommandFailed(
                            String::from_utf8_lossy(&output.stderr).trim().to_string(),
                        ));
                    }
                    return Ok(String::from_utf8_lossy(&output.stdout).trim().to_string());
                }
                None => {
                    if start.elapsed() >= self.timeout {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(BackendError::Timeout(self.timeout));
                    }
                    std::thread::sleep(Duration::from_millis(10));
                }
            }
        }
    }
}

impl Default for IsccBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AffineBackend for IsccBackend {
    fn name(&self) -> &'static str {
        "iscc"
    }

    fn is_available(&self) -> bool {
        is_iscc_available()
    }

    fn canonicalize(&self, input: &str) -> Result<String, BackendError> {
        if !self.is_available() {
            return Err(BackendError::Unavailable("iscc not found on PATH".into()));
        }
        let result = self.run(&format!("coalesce({});\n", input))?;
        // iscc echoes nothing but the value of the last expression
        let line = result
            .lines()
            .rev()
            .find(|l| !l.trim().is_empty())
            .ok_or_else(|| BackendError::Malformed("empty iscc output".into()))?;
        // iscc writes "and"; the grammar accepts both spellings
        Ok(line.trim().to_string())
    }
}
