//! Execution of the external command-line tools (`az`, `docker`, `kubectl`).
//!
//! Every interaction with Azure and with the container toolchain goes through
//! the [`CommandRunner`] trait so the deployment pipeline can be driven
//! without touching real cloud resources.

mod error;
mod invocation;

use std::{path::PathBuf, process::Stdio};

use snafu::ResultExt;
use tokio::process::Command;

pub use self::{
    error::Error,
    invocation::{CommandOutput, Invocation, OutputMode, Tool},
};

pub trait CommandRunner {
    /// Returns the resolved path of `tool`, or `None` when it is not installed.
    fn locate(&self, tool: Tool) -> Option<PathBuf>;

    /// Runs `invocation` to completion.
    ///
    /// A non-zero exit status is not an error at this level; callers decide
    /// whether a failure is fatal, tolerated or an "already exists" conflict.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Execute`] when the process cannot be spawned or
    /// awaited.
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput, Error>;
}

/// Runs the tools found in `PATH` as child processes.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn locate(&self, tool: Tool) -> Option<PathBuf> {
        match which::which(tool.program()) {
            Ok(path) => Some(path),
            Err(err) => {
                tracing::debug!("`{}` not found: {err}", tool.program());
                None
            }
        }
    }

    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput, Error> {
        tracing::debug!("+ {invocation}");

        let mut command = Command::new(invocation.tool().program());
        let output = match invocation.output_mode() {
            OutputMode::Captured => command
                .args(invocation.args())
                .stdin(Stdio::null())
                .kill_on_drop(true)
                .output()
                .await
                .map(CommandOutput::from),
            OutputMode::Inherited => command
                .args(invocation.args())
                .kill_on_drop(true)
                .status()
                .await
                .map(CommandOutput::from),
        }
        .with_context(|_| error::ExecuteSnafu { command: invocation.to_string() })?;

        tracing::debug!("`{invocation}` finished with {}", output.status_text());
        Ok(output)
    }
}
