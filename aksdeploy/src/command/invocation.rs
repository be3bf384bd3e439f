use std::{borrow::Cow, fmt};

/// External programs the deployment drives.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Tool {
    Azure,
    Docker,
    Kubectl,
}

impl Tool {
    pub const ALL: [Self; 3] = [Self::Azure, Self::Docker, Self::Kubectl];

    /// Executable name looked up in `PATH`.
    pub const fn program(self) -> &'static str {
        match self {
            Self::Azure => "az",
            Self::Docker => "docker",
            Self::Kubectl => "kubectl",
        }
    }

    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Azure => "Azure CLI",
            Self::Docker => "Docker",
            Self::Kubectl => "kubectl",
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.display_name()) }
}

/// Whether the child's output is collected or streamed to the terminal.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum OutputMode {
    #[default]
    Captured,

    /// The child shares stdin, stdout and stderr with this process, which is
    /// needed for interactive prompts and long-running builds.
    Inherited,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Invocation {
    tool: Tool,
    args: Vec<String>,
    output_mode: OutputMode,
}

impl Invocation {
    pub fn new<I, S>(tool: Tool, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { tool, args: args.into_iter().map(Into::into).collect(), output_mode: OutputMode::Captured }
    }

    pub fn azure<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Tool::Azure, args)
    }

    pub fn docker<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Tool::Docker, args)
    }

    pub fn kubectl<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Tool::Kubectl, args)
    }

    #[must_use]
    pub fn inherited(mut self) -> Self {
        self.output_mode = OutputMode::Inherited;
        self
    }

    pub const fn tool(&self) -> Tool { self.tool }

    pub fn args(&self) -> &[String] { &self.args }

    pub const fn output_mode(&self) -> OutputMode { self.output_mode }
}

impl fmt::Display for Invocation {
    /// Renders the invocation as a shell-escaped command line.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tool.program())?;
        for arg in &self.args {
            write!(f, " {}", shell_escape::escape(Cow::Borrowed(arg.as_str())))?;
        }
        Ok(())
    }
}

/// Result of a finished child process.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CommandOutput {
    /// Exit code, `None` when the process was terminated by a signal.
    pub code: Option<i32>,

    pub stdout: String,

    pub stderr: String,
}

impl CommandOutput {
    pub const fn success(&self) -> bool { matches!(self.code, Some(0)) }

    pub fn stdout_trimmed(&self) -> &str { self.stdout.trim() }

    /// The text a user needs to see when the command failed: stderr, or
    /// stdout for tools that report errors there.
    pub fn diagnostics(&self) -> &str {
        let stderr = self.stderr.trim();
        if stderr.is_empty() { self.stdout.trim() } else { stderr }
    }

    pub fn status_text(&self) -> String {
        self.code.map_or_else(|| "termination by signal".to_string(), |code| format!("exit code {code}"))
    }
}

impl From<std::process::Output> for CommandOutput {
    fn from(output: std::process::Output) -> Self {
        Self {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

impl From<std::process::ExitStatus> for CommandOutput {
    fn from(status: std::process::ExitStatus) -> Self {
        Self { code: status.code(), ..Self::default() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_escapes_arguments() {
        let invocation = Invocation::azure(["group", "create", "--name", "my group"]);
        assert_eq!(invocation.to_string(), "az group create --name 'my group'");
    }

    #[test]
    fn test_inherited_output_mode() {
        let invocation = Invocation::docker(["push", "acr.io/mern/backend:latest"]);
        assert_eq!(invocation.output_mode(), OutputMode::Captured);
        assert_eq!(invocation.inherited().output_mode(), OutputMode::Inherited);
    }

    #[test]
    fn test_diagnostics_prefers_stderr() {
        let output = CommandOutput {
            code: Some(1),
            stdout: "partial".to_string(),
            stderr: "ERROR: boom\n".to_string(),
        };
        assert!(!output.success());
        assert_eq!(output.diagnostics(), "ERROR: boom");
        assert_eq!(output.status_text(), "exit code 1");
    }

    #[test]
    fn test_diagnostics_falls_back_to_stdout() {
        let output =
            CommandOutput { code: None, stdout: " oops \n".to_string(), stderr: String::new() };
        assert_eq!(output.diagnostics(), "oops");
        assert_eq!(output.status_text(), "termination by signal");
    }
}
