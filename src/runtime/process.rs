//! Subprocess execution.
//!
//! Programs always receive an explicit working directory; the tool itself
//! never changes the process-wide current directory.

use anyhow::{Context, Result};
use log::debug;
use std::path::Path;
use std::process::{Command, Stdio};

use super::RealRuntime;

/// Captured result of a finished subprocess.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandOutput {
    /// Exit code, or None when the process was terminated by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl RealRuntime {
    #[tracing::instrument(skip(self))]
    pub(crate) fn run_impl(
        &self,
        program: &Path,
        args: &[String],
        cwd: &Path,
    ) -> Result<CommandOutput> {
        debug!("Running {:?} {:?} in {:?}", program, args, cwd);
        let output = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("Failed to run {:?}", program))?;

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn run_inherited_impl(
        &self,
        program: &Path,
        args: &[String],
        cwd: &Path,
    ) -> Result<Option<i32>> {
        debug!("Running {:?} {:?} in {:?}", program, args, cwd);
        let status = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .status()
            .with_context(|| format!("Failed to run {:?}", program))?;
        Ok(status.code())
    }
}
