//! Effect execution through the SoX command-line tool
//!
//! One `apply` call is one `sox <in> <out> <effect args>` process. Calls are
//! synchronous; callers run them on the blocking pool.

use super::Effect;
use crate::error::{Result, VaporError};
use std::path::Path;
use std::process::Command;

/// Applies one effect to one file
pub trait EffectExecutor: Send + Sync {
    /// Read `input`, write the processed audio to `output`
    ///
    /// `input` is never modified.
    fn apply(&self, effect: &Effect, input: &Path, output: &Path) -> Result<()>;
}

/// SoX-backed executor
#[derive(Debug, Clone)]
pub struct SoxExecutor {
    binary: String,
}

impl SoxExecutor {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Check the binary can be started (`sox --version`)
    pub fn probe(&self) -> Result<()> {
        match Command::new(&self.binary).arg("--version").output() {
            Ok(_) => Ok(()),
            Err(e) => Err(VaporError::ToolUnavailable(format!("{}: {}", self.binary, e))),
        }
    }
}

impl EffectExecutor for SoxExecutor {
    fn apply(&self, effect: &Effect, input: &Path, output: &Path) -> Result<()> {
        // Surface unreadable input as Io, not as a tool failure
        std::fs::File::open(input)?;

        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() && !parent.is_dir() {
                return Err(VaporError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("Output directory missing: {}", parent.display()),
                )));
            }
        }

        let args = effect.sox_args();
        tracing::debug!(
            effect = effect.name(),
            input = %input.display(),
            output = %output.display(),
            args = ?args,
            "Running sox"
        );

        let result = Command::new(&self.binary)
            .arg(input)
            .arg(output)
            .args(&args)
            .output()
            .map_err(|e| VaporError::ToolUnavailable(format!("{}: {}", self.binary, e)))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            // Drop whatever partial output the tool left behind
            let _ = std::fs::remove_file(output);
            return Err(VaporError::ToolExecution(format!(
                "{} exited with {:?}: {}",
                effect.name(),
                result.status.code(),
                stderr.trim()
            )));
        }

        Ok(())
    }
}
