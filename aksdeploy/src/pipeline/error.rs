use std::path::PathBuf;

use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("Missing required argument(s): {}", missing.join(", ")))]
    Usage { missing: Vec<&'static str> },

    #[snafu(display(
        "Required tool(s) not installed or not found in PATH: {}",
        tools.iter().map(|(name, program)| format!("{name} (`{program}`)")).collect::<Vec<_>>().join(", ")
    ))]
    MissingDependency { tools: Vec<(&'static str, &'static str)> },

    #[snafu(display("Azure login failed with {status}"))]
    Authentication { status: String },

    #[snafu(display("`{command}` failed with {status}{}", diagnostics_suffix(diagnostics)))]
    FatalStep { command: String, status: String, diagnostics: String },

    #[snafu(display("Unexpected output from `{command}`, error: {source}"))]
    UnexpectedOutput { command: String, source: serde_json::Error },

    #[snafu(display("Unexpected output from `{command}`: {output:?}"))]
    UnrecognizedOutput { command: String, output: String },

    #[snafu(display("Failed to register resource provider(s): {}", namespaces.join(", ")))]
    ProviderRegistration { namespaces: Vec<String> },

    #[snafu(display(
        "Secrets manifest {} not found. Create it from the template and re-run:\n    cp {} {}\n    \
         # then fill in the real values",
        path.display(),
        template.display(),
        path.display()
    ))]
    PreconditionMissing { path: PathBuf, template: PathBuf },

    #[snafu(display("Deployment {deployment} did not become ready within {timeout_secs}s"))]
    RolloutTimeout { deployment: String, timeout_secs: u64 },

    #[snafu(display(
        "Service {service} was not assigned an external address within {timeout_secs}s"
    ))]
    ExternalIpTimeout { service: String, timeout_secs: u64 },

    #[snafu(display("Registry login server is unknown; the registry step did not run"))]
    LoginServerUnknown,

    #[snafu(display("Deployment manifest has not been rendered"))]
    ManifestNotRendered,

    #[snafu(display("Not connected to the cluster; credentials have not been fetched"))]
    ClusterNotConnected,

    #[snafu(display("Deployment interrupted"))]
    Cancelled,

    #[snafu(display("{source}"))]
    Command { source: crate::command::Error },

    #[snafu(display("{source}"))]
    Manifest { source: crate::manifest::Error },

    #[snafu(display("{source}"))]
    Cluster { source: crate::cluster::Error },
}

fn diagnostics_suffix(diagnostics: &str) -> String {
    if diagnostics.is_empty() { String::new() } else { format!(":\n{diagnostics}") }
}

impl From<crate::command::Error> for Error {
    fn from(source: crate::command::Error) -> Self { Self::Command { source } }
}

impl From<crate::manifest::Error> for Error {
    fn from(source: crate::manifest::Error) -> Self { Self::Manifest { source } }
}

impl From<crate::cluster::Error> for Error {
    fn from(source: crate::cluster::Error) -> Self { Self::Cluster { source } }
}
