//! Command line interface of `aksdeploy`.
//!
//! Provisions an Azure resource group, container registry and AKS cluster
//! when they are missing, builds and pushes the application images, applies
//! the Kubernetes manifests and waits until the public service has an
//! external IP.
//!
//! # Examples
//!
//! ```bash
//! # Deploy, creating whatever does not exist yet
//! aksdeploy mern-rg mern-aks mernacr
//!
//! # Redeploy the images already in the registry, in another region
//! aksdeploy --skip-build --location westeurope mern-rg mern-aks mernacr
//!
//! # Print the default configuration
//! aksdeploy default-config > ~/.config/aksdeploy/config.yaml
//! ```

mod deploy;
pub mod error;

use std::{io::Write, path::PathBuf};

use aksdeploy_base::{CLI_PROGRAM_NAME, PROJECT_NAME_WITH_INITIAL_CAPITAL, PROJECT_SEMVER};
use clap::{CommandFactory, Parser, Subcommand};
use snafu::ResultExt;
use tokio::runtime::Runtime;

pub use self::error::Error;
use self::deploy::DeployCommand;
use crate::{config::Config, shadow};

#[derive(Parser)]
#[command(
    name = CLI_PROGRAM_NAME,
    author,
    version,
    long_version = shadow::CLAP_LONG_VERSION,
    about = "Deploy a containerized web application to Azure Kubernetes Service.",
    long_about = "aksdeploy provisions the Azure resource group, container registry and AKS \
                  cluster when they do not exist yet, builds and pushes the application \
                  images, applies the Kubernetes manifests, waits for the rollouts and \
                  reports the external IP of the public service. Running it again \
                  against existing resources is safe.",
    args_conflicts_with_subcommands = true,
    color = clap::ColorChoice::Always
)]
pub struct Cli {
    #[clap(subcommand)]
    commands: Option<Commands>,

    #[clap(flatten)]
    deploy: DeployCommand,

    /// Defaults to `~/.config/aksdeploy/config.yaml` or the path specified by
    /// the `AKSDEPLOY_CONFIG_FILE_PATH` environment variable.
    #[clap(
        long = "config",
        short = 'c',
        env = "AKSDEPLOY_CONFIG_FILE_PATH",
        help = "Specify a configuration file. Defaults to ~/.config/aksdeploy/config.yaml or \
                AKSDEPLOY_CONFIG_FILE_PATH env var."
    )]
    config_file: Option<PathBuf>,

    #[clap(
        long = "log-level",
        env = "AKSDEPLOY_LOG_LEVEL",
        help = "Set the logging level (e.g., info, debug, trace)."
    )]
    log_level: Option<tracing::Level>,
}

/// Commands that do not deploy anything.
#[derive(Clone, Subcommand)]
pub enum Commands {
    #[command(about = "Display version information")]
    Version,

    #[command(about = "Generate shell completion script for the specified shell (bash, zsh, fish)")]
    Completions { shell: clap_complete::Shell },

    #[command(about = "Output the default configuration in YAML format")]
    DefaultConfig,
}

impl Default for Cli {
    fn default() -> Self { Self::parse() }
}

impl Cli {
    /// An explicit `--config` must exist; the searched default path may be
    /// absent, in which case the built-in defaults apply.
    fn load_config(&self) -> Result<Config, Error> {
        let mut config = match &self.config_file {
            Some(path) => Config::load(path)?,
            None => Config::load_or_default(Config::search_config_file_path())?,
        };

        if let Some(log_level) = self.log_level {
            config.log.level = log_level;
        }
        self.deploy.apply_overrides(&mut config);

        Ok(config)
    }

    /// A banner line with the release, followed by the build details.
    fn version_text() -> String {
        format!(
            "{PROJECT_NAME_WITH_INITIAL_CAPITAL} {}\n\n{}",
            *PROJECT_SEMVER,
            Self::command().render_long_version()
        )
    }

    /// Runs the parsed command and returns the process exit code.
    ///
    /// # Errors
    ///
    /// Returns an `Error` when the configuration cannot be loaded, the tokio
    /// runtime cannot be created or a deployment step fails.
    pub fn run(self) -> Result<i32, Error> {
        let mut stdout = std::io::stdout();
        match self.commands {
            Some(Commands::Version) => {
                stdout.write_all(Self::version_text().as_bytes()).context(error::WriteStdoutSnafu)?;
                return Ok(0);
            }
            Some(Commands::Completions { shell }) => {
                let mut app = Self::command();
                let bin_name = app.get_name().to_string();
                clap_complete::generate(shell, &mut app, bin_name, &mut stdout);
                return Ok(0);
            }
            Some(Commands::DefaultConfig) => {
                stdout
                    .write_all(Config::template_basic().as_slice())
                    .context(error::WriteStdoutSnafu)?;
                return Ok(0);
            }
            None => {}
        }

        // Checked before anything else so that bad arguments never reach a tool.
        let target = match self.deploy.target() {
            Ok(target) => target,
            Err(err) => {
                let usage = Self::command().render_usage().ansi().to_string();
                eprintln!("Error: {err}\n\n{usage}\n\nFor more information, try '--help'.");
                return Ok(1);
            }
        };

        let config = self.load_config()?;
        config.log.registry();

        let fut = self.deploy.run(target, config);
        Runtime::new().context(error::InitializeTokioRuntimeSnafu)?.block_on(fut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("aksdeploy").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_command_is_well_formed() { Cli::command().debug_assert(); }

    #[test]
    fn test_positional_arguments() {
        let cli = parse(&["mern-rg", "mern-aks", "mernacr"]);
        assert!(cli.commands.is_none());
        let target = cli.deploy.target().unwrap();
        assert_eq!(target.resource_group, "mern-rg");
        assert_eq!(target.cluster_name, "mern-aks");
        assert_eq!(target.registry_name, "mernacr");
    }

    #[test]
    fn test_missing_positional_arguments_are_a_usage_error() {
        let cli = parse(&["mern-rg"]);
        assert!(matches!(
            cli.deploy.target(),
            Err(pipeline::Error::Usage { ref missing }) if missing == &["CLUSTER_NAME", "REGISTRY_NAME"]
        ));

        let cli = parse(&[]);
        assert!(matches!(cli.deploy.target(), Err(pipeline::Error::Usage { ref missing }) if missing.len() == 3));
    }

    #[test]
    fn test_version_text_starts_with_the_release() {
        let text = Cli::version_text();
        assert!(text.starts_with(&format!("Aksdeploy {}\n", aksdeploy_base::PROJECT_VERSION)));
        assert!(text.ends_with(&Cli::command().render_long_version()));
    }

    #[test]
    fn test_missing_arguments_exit_before_loading_anything() {
        let cli = parse(&["--config", "/nonexistent/aksdeploy.yaml", "mern-rg", ""]);
        assert_eq!(cli.run().unwrap(), 1);
    }

    #[test]
    fn test_overrides() {
        let cli = parse(&[
            "--location",
            "westeurope",
            "--external-ip-timeout-seconds",
            "0",
            "--skip-build",
            "rg",
            "aks",
            "acr",
        ]);
        assert!(cli.deploy.skip_build);

        let mut config = Config::default();
        cli.deploy.apply_overrides(&mut config);
        assert_eq!(config.location, "westeurope");
        assert_eq!(config.external_ip_timeout(), None);
    }

    #[test]
    fn test_subcommands() {
        assert!(matches!(parse(&["version"]).commands, Some(Commands::Version)));
        assert!(matches!(parse(&["default-config"]).commands, Some(Commands::DefaultConfig)));
        assert!(matches!(
            parse(&["completions", "bash"]).commands,
            Some(Commands::Completions { shell: clap_complete::Shell::Bash })
        ));
    }

    #[test]
    fn test_load_explicit_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "location: northeurope\nrolloutTimeoutSeconds: 120\n").unwrap();

        let cli = parse(&["--config", path.to_str().unwrap(), "--log-level", "debug", "rg", "aks", "acr"]);
        let config = cli.load_config().unwrap();
        assert_eq!(config.location, "northeurope");
        assert_eq!(config.rollout_timeout_seconds, 120);
        assert_eq!(config.log.level, tracing::Level::DEBUG);
    }

    #[test]
    fn test_explicit_config_must_exist() {
        let cli = parse(&["--config", "/nonexistent/aksdeploy.yaml", "rg", "aks", "acr"]);
        assert!(matches!(cli.load_config(), Err(Error::Configuration { .. })));
    }
}
