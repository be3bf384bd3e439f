//! The ordered provisioning and deployment run.
//!
//! [`Orchestrator::run`] walks [`PLAN`] strictly in order. Every step has a
//! [`Policy`] deciding what a failure means: fatal steps abort the run, ensure
//! steps treat an existing resource as success, and tolerant steps only warn.

mod error;
#[cfg(test)]
mod fake;
mod poll;
mod step;
mod target;

use serde::de::DeserializeOwned;
use snafu::OptionExt;
use tokio_util::sync::CancellationToken;

pub use self::{
    error::Error,
    poll::await_external_address,
    step::{PLAN, Policy, Step, StepKind, StepOutcome},
    target::DeployTarget,
};
use crate::{
    azure::{self, AzureError, ErrorKind},
    cluster::{ClusterConnector, ClusterOps},
    command::{CommandOutput, CommandRunner, Invocation, Tool},
    config::{Config, ServiceSpec},
    manifest::RenderedManifest,
    ui::{StepReporter, table::TableExt},
};

/// How one step of the run ended.
#[derive(Clone, Debug)]
pub struct StepRecord {
    /// The step as listed in [`PLAN`].
    pub step: Step,

    /// `Err` holds the message of a tolerated failure.
    pub result: Result<StepOutcome, String>,
}

/// The result of a completed run.
#[derive(Clone, Debug)]
pub struct Summary {
    /// Login server of the registry, as reported by `az acr show`.
    pub login_server: String,

    /// External IP of the public service.
    pub external_address: String,

    /// One record per step, in run order.
    pub steps: Vec<StepRecord>,
}

impl Summary {
    /// Steps whose failure was tolerated, with the failure message.
    pub fn tolerated(&self) -> impl Iterator<Item = (&Step, &str)> {
        self.steps
            .iter()
            .filter_map(|record| record.result.as_ref().err().map(|err| (&record.step, err.as_str())))
    }
}

/// Values produced by one step and consumed by a later one.
struct RunState<C> {
    login_server: Option<String>,
    rendered: Option<RenderedManifest>,
    cluster: Option<C>,
    external_address: Option<String>,
}

impl<C> RunState<C> {
    const fn new() -> Self {
        Self { login_server: None, rendered: None, cluster: None, external_address: None }
    }

    fn login_server(&self) -> Result<&str, Error> {
        self.login_server.as_deref().context(error::LoginServerUnknownSnafu)
    }

    fn cluster(&self) -> Result<&C, Error> {
        self.cluster.as_ref().context(error::ClusterNotConnectedSnafu)
    }
}

/// Drives a deployment through [`PLAN`].
///
/// `R` runs the command line tools and `K` connects to the cluster once its
/// credentials have been fetched. Output goes through a [`StepReporter`].
pub struct Orchestrator<R, K> {
    runner: R,
    connector: K,
    config: Config,
    skip_build: bool,
    reporter: StepReporter,
}

impl<R, K> Orchestrator<R, K>
where
    R: CommandRunner,
    K: ClusterConnector,
{
    pub fn new(runner: R, connector: K, config: Config) -> Self {
        Self { runner, connector, config, skip_build: false, reporter: StepReporter::new(PLAN.len()) }
    }

    /// Reuse the images already in the registry instead of building and
    /// pushing new ones.
    #[must_use]
    pub fn skip_build(mut self, skip_build: bool) -> Self {
        self.skip_build = skip_build;
        self
    }

    /// Runs every step of [`PLAN`] against `target`.
    ///
    /// The rendered deployment manifest is removed even when the run aborts
    /// or `cancel` fires.
    ///
    /// # Errors
    ///
    /// Returns the error of the first fatal or ensure step that failed, or
    /// [`Error::Cancelled`].
    pub async fn run(
        &self,
        target: &DeployTarget,
        cancel: &CancellationToken,
    ) -> Result<Summary, Error> {
        tracing::info!(
            "Deploying to cluster {} in resource group {} with registry {}",
            target.cluster_name,
            target.resource_group,
            target.registry_name
        );

        let mut state = RunState::new();
        let mut steps = Vec::with_capacity(PLAN.len());

        for (index, step) in PLAN.iter().enumerate() {
            self.reporter.begin(index + 1, step.name);

            let result = tokio::select! {
                biased;
                () = cancel.cancelled() => Err(Error::Cancelled),
                result = self.execute(step.kind, target, &mut state) => result,
            };

            match result {
                Ok(outcome) => {
                    tracing::info!("{}: {outcome}", step.name);
                    match outcome {
                        StepOutcome::Skipped(_) | StepOutcome::AlreadyExists => {
                            self.reporter.skipped(&outcome);
                        }
                        StepOutcome::Completed
                        | StepOutcome::CompletedWith(_)
                        | StepOutcome::Created => self.reporter.success(&outcome),
                    }
                    steps.push(StepRecord { step: *step, result: Ok(outcome) });
                }
                Err(err) if step.policy == Policy::Tolerant && !matches!(err, Error::Cancelled) => {
                    tracing::warn!("{}: {err}", step.name);
                    self.reporter.warning(&err);
                    steps.push(StepRecord { step: *step, result: Err(err.to_string()) });
                }
                Err(err) => {
                    tracing::error!("{}: {err}", step.name);
                    self.reporter.failure(step.name);
                    return Err(err);
                }
            }
        }

        Ok(Summary {
            login_server: state.login_server.unwrap_or_default(),
            external_address: state.external_address.unwrap_or_default(),
            steps,
        })
    }

    async fn execute(
        &self,
        kind: StepKind,
        target: &DeployTarget,
        state: &mut RunState<K::Cluster>,
    ) -> Result<StepOutcome, Error> {
        match kind {
            StepKind::Preflight => self.preflight(),
            StepKind::Authenticate => self.authenticate().await,
            StepKind::EnsureResourceGroup => self.ensure_resource_group(target).await,
            StepKind::EnsureRegistry => self.ensure_registry(target, state).await,
            StepKind::RegistryLogin => self.registry_login(target).await,
            StepKind::BuildImages => self.build_images(state).await,
            StepKind::PushImages => self.push_images(state).await,
            StepKind::RegisterProviders => self.register_providers().await,
            StepKind::EnsureCluster => self.ensure_cluster(target).await,
            StepKind::FetchCredentials => self.fetch_credentials(target, state).await,
            StepKind::RenderManifest => self.render_manifest(target, state),
            StepKind::CheckSecrets => self.check_secrets(),
            StepKind::ApplyManifests => self.apply_manifests(state).await,
            StepKind::AwaitRollout => self.await_rollouts(state).await,
            StepKind::ReportStatus => self.report_status(state).await,
            StepKind::DiscoverExternalIp => self.discover_external_ip(state).await,
            StepKind::Cleanup => Self::cleanup(state),
        }
    }

    fn preflight(&self) -> Result<StepOutcome, Error> {
        let mut found = Vec::with_capacity(Tool::ALL.len());
        let mut missing = Vec::new();
        for tool in Tool::ALL {
            match self.runner.locate(tool) {
                Some(path) => found.push(format!("{tool}: {}", path.display())),
                None => missing.push((tool.display_name(), tool.program())),
            }
        }

        if !missing.is_empty() {
            return error::MissingDependencySnafu { tools: missing }.fail();
        }
        self.reporter.detail(found.join("\n"));
        Ok(StepOutcome::Completed)
    }

    async fn authenticate(&self) -> Result<StepOutcome, Error> {
        let show = Invocation::azure(["account", "show", "--output", "json"]);
        let mut output = self.runner.run(&show).await?;

        if !output.success() {
            tracing::info!("No active Azure session: {}", output.diagnostics());
            self.reporter.detail("Not logged in to Azure, starting interactive login");
            let login = self.runner.run(&Invocation::azure(["login"]).inherited()).await?;
            if !login.success() {
                return error::AuthenticationSnafu { status: login.status_text() }.fail();
            }
            output = self.run_checked(&show).await?;
        }

        let account: azure::Account = parse_json(&show, &output)?;
        Ok(StepOutcome::CompletedWith(match account.user {
            Some(user) => format!("logged in as {} (subscription {})", user.name, account.name),
            None => format!("subscription {}", account.name),
        }))
    }

    async fn ensure_resource_group(&self, target: &DeployTarget) -> Result<StepOutcome, Error> {
        let rg = target.resource_group.as_str();
        let probe = Invocation::azure(["group", "exists", "--name", rg]);
        let output = self.run_checked(&probe).await?;
        let exists = azure::parse_bool(output.stdout_trimmed()).with_context(|| {
            error::UnrecognizedOutputSnafu {
                command: probe.to_string(),
                output: output.stdout_trimmed().to_string(),
            }
        })?;

        let location = self.config.location.as_str();
        let create =
            Invocation::azure(["group", "create", "--name", rg, "--location", location, "--output", "none"]);
        self.ensure(exists, &create, format!("Creating resource group {rg} in {location}")).await
    }

    async fn ensure_registry(
        &self,
        target: &DeployTarget,
        state: &mut RunState<K::Cluster>,
    ) -> Result<StepOutcome, Error> {
        let DeployTarget { resource_group, registry_name, .. } = target;
        let probe = Invocation::azure([
            "acr",
            "show",
            "--name",
            registry_name.as_str(),
            "--resource-group",
            resource_group.as_str(),
            "--output",
            "json",
        ]);
        let existing = self.probe(&probe).await?;

        let create = Invocation::azure([
            "acr",
            "create",
            "--resource-group",
            resource_group.as_str(),
            "--name",
            registry_name.as_str(),
            "--sku",
            self.config.registry_sku.as_str(),
            "--output",
            "none",
        ]);
        let outcome = self
            .ensure(existing.is_some(), &create, format!("Creating container registry {registry_name}"))
            .await?;

        let (show, output) = match existing {
            Some(output) => (probe, output),
            None => {
                let show = Invocation::azure([
                    "acr",
                    "show",
                    "--name",
                    registry_name.as_str(),
                    "--output",
                    "json",
                ]);
                let output = self.run_checked(&show).await?;
                (show, output)
            }
        };
        let registry: azure::Registry = parse_json(&show, &output)?;
        self.reporter.detail(format!("login server: {}", registry.login_server));
        state.login_server = Some(registry.login_server);
        Ok(outcome)
    }

    async fn registry_login(&self, target: &DeployTarget) -> Result<StepOutcome, Error> {
        let login = Invocation::azure(["acr", "login", "--name", target.registry_name.as_str()]);
        let _output = self.run_checked(&login).await?;
        Ok(StepOutcome::Completed)
    }

    async fn build_images(&self, state: &RunState<K::Cluster>) -> Result<StepOutcome, Error> {
        if self.skip_build {
            return Ok(StepOutcome::Skipped("--skip-build given".to_string()));
        }
        let login_server = state.login_server()?;
        for service in &self.config.services {
            let image = self.image_reference(service, login_server);
            self.reporter.detail(format!("{} <- {}", image, service.build_context));
            let build = Invocation::docker(["build", "--tag", image.as_str(), service.build_context.as_str()])
                .inherited();
            let _output = self.run_checked(&build).await?;
        }
        Ok(StepOutcome::CompletedWith(format!("built {} image(s)", self.config.services.len())))
    }

    async fn push_images(&self, state: &RunState<K::Cluster>) -> Result<StepOutcome, Error> {
        if self.skip_build {
            return Ok(StepOutcome::Skipped("--skip-build given".to_string()));
        }
        let login_server = state.login_server()?;
        for service in &self.config.services {
            let image = self.image_reference(service, login_server);
            self.reporter.detail(&image);
            let push = Invocation::docker(["push", image.as_str()]).inherited();
            let _output = self.run_checked(&push).await?;
        }
        Ok(StepOutcome::CompletedWith(format!("pushed {} image(s)", self.config.services.len())))
    }

    async fn register_providers(&self) -> Result<StepOutcome, Error> {
        let mut failed = Vec::new();
        for namespace in &self.config.providers {
            let register = Invocation::azure(["provider", "register", "--namespace", namespace.as_str()]);
            let output = self.runner.run(&register).await?;
            if output.success() {
                self.reporter.detail(namespace);
            } else {
                tracing::warn!(
                    "Failed to register provider {namespace}: {}",
                    AzureError::parse(output.diagnostics()).message
                );
                failed.push(namespace.clone());
            }
        }

        if failed.is_empty() {
            Ok(StepOutcome::CompletedWith(format!(
                "registered {} provider(s)",
                self.config.providers.len()
            )))
        } else {
            error::ProviderRegistrationSnafu { namespaces: failed }.fail()
        }
    }

    async fn ensure_cluster(&self, target: &DeployTarget) -> Result<StepOutcome, Error> {
        let DeployTarget { resource_group, cluster_name, registry_name } = target;
        let probe = Invocation::azure([
            "aks",
            "show",
            "--resource-group",
            resource_group.as_str(),
            "--name",
            cluster_name.as_str(),
            "--output",
            "none",
        ]);
        let exists = self.probe(&probe).await?.is_some();

        let create =
            Invocation::azure(self.config.cluster.create_args(resource_group, cluster_name, registry_name));
        self.ensure(
            exists,
            &create,
            format!("Creating AKS cluster {cluster_name}, this usually takes several minutes"),
        )
        .await
    }

    async fn fetch_credentials(
        &self,
        target: &DeployTarget,
        state: &mut RunState<K::Cluster>,
    ) -> Result<StepOutcome, Error> {
        let credentials = Invocation::azure([
            "aks",
            "get-credentials",
            "--resource-group",
            target.resource_group.as_str(),
            "--name",
            target.cluster_name.as_str(),
            "--overwrite-existing",
        ]);
        let output = self.run_checked(&credentials).await?;
        self.reporter.detail(output.stdout_trimmed());

        state.cluster = Some(self.connector.connect().await?);
        Ok(StepOutcome::Completed)
    }

    fn render_manifest(
        &self,
        target: &DeployTarget,
        state: &mut RunState<K::Cluster>,
    ) -> Result<StepOutcome, Error> {
        let manifests = &self.config.manifests;
        let rendered = RenderedManifest::render(
            &manifests.deployment_path(),
            &manifests.placeholder,
            &target.registry_name,
        )?;

        let replacements = rendered.replacements();
        if replacements == 0 {
            tracing::warn!(
                "Placeholder {} not found in {}",
                manifests.placeholder,
                manifests.deployment_path().display()
            );
            self.reporter.detail(format!(
                "placeholder {} not found, manifest applied unchanged",
                manifests.placeholder
            ));
        }
        tracing::debug!("Rendered deployment manifest to {}", rendered.path().display());
        state.rendered = Some(rendered);

        Ok(StepOutcome::CompletedWith(format!("{replacements} placeholder(s) replaced")))
    }

    fn check_secrets(&self) -> Result<StepOutcome, Error> {
        let path = self.config.manifests.secrets_path();
        if path.is_file() {
            Ok(StepOutcome::CompletedWith(format!("found {}", path.display())))
        } else {
            error::PreconditionMissingSnafu {
                path,
                template: self.config.manifests.secrets_template_path(),
            }
            .fail()
        }
    }

    async fn apply_manifests(&self, state: &RunState<K::Cluster>) -> Result<StepOutcome, Error> {
        let rendered = state.rendered.as_ref().context(error::ManifestNotRenderedSnafu)?;
        let manifests = &self.config.manifests;
        let files = [
            manifests.secrets_path(),
            manifests.config_path(),
            rendered.path().to_path_buf(),
            manifests.service_path(),
        ];

        for file in &files {
            let path = file.to_string_lossy().into_owned();
            let apply = Invocation::kubectl(["apply", "-f", path.as_str()]);
            let output = self.run_checked(&apply).await?;
            self.reporter.detail(output.stdout_trimmed());
        }
        Ok(StepOutcome::CompletedWith(format!("applied {} manifest(s)", files.len())))
    }

    async fn await_rollouts(&self, state: &RunState<K::Cluster>) -> Result<StepOutcome, Error> {
        let cluster = state.cluster()?;
        let timeout = self.config.rollout_timeout();

        for service in &self.config.services {
            let deployment = service.deployment.as_str();
            let spinner = self.reporter.spinner(format!("deployment/{deployment}"));
            let result = tokio::time::timeout(timeout, cluster.await_rollout(deployment)).await;
            spinner.finish_and_clear();

            match result {
                Ok(result) => result?,
                Err(_) => {
                    return error::RolloutTimeoutSnafu {
                        deployment: deployment.to_string(),
                        timeout_secs: timeout.as_secs(),
                    }
                    .fail();
                }
            }
            self.reporter.detail(format!("deployment/{deployment} rolled out"));
        }
        Ok(StepOutcome::Completed)
    }

    async fn report_status(&self, state: &RunState<K::Cluster>) -> Result<StepOutcome, Error> {
        let snapshot = state.cluster()?.snapshot().await?;
        self.reporter.detail(format!("Nodes:\n{}", snapshot.nodes.render_table()));
        self.reporter.detail(format!("Pods:\n{}", snapshot.pods.render_table()));
        self.reporter.detail(format!("Services:\n{}", snapshot.services.render_table()));
        Ok(StepOutcome::Completed)
    }

    async fn discover_external_ip(
        &self,
        state: &mut RunState<K::Cluster>,
    ) -> Result<StepOutcome, Error> {
        let service = self.config.public_service.as_str();
        let spinner = self.reporter.spinner(format!("service/{service}: waiting for external IP"));
        let result = await_external_address(
            state.cluster()?,
            service,
            self.config.external_ip_poll_interval(),
            self.config.external_ip_timeout(),
            |attempt| {
                spinner.set_message(format!("service/{service}: no external IP yet (check {attempt})"));
            },
        )
        .await;
        spinner.finish_and_clear();

        let address = result?;
        let outcome = StepOutcome::CompletedWith(format!("http://{address}"));
        state.external_address = Some(address);
        Ok(outcome)
    }

    fn cleanup(state: &mut RunState<K::Cluster>) -> Result<StepOutcome, Error> {
        match state.rendered.take() {
            Some(rendered) => {
                let path = rendered.remove()?;
                Ok(StepOutcome::CompletedWith(format!("removed {}", path.display())))
            }
            None => Ok(StepOutcome::Skipped("nothing to remove".to_string())),
        }
    }

    fn image_reference(&self, service: &ServiceSpec, login_server: &str) -> String {
        service.image_reference(login_server, &self.config.image_namespace, &self.config.image_tag)
    }

    /// Runs `invocation` and treats a non-zero exit status as fatal.
    async fn run_checked(&self, invocation: &Invocation) -> Result<CommandOutput, Error> {
        let output = self.runner.run(invocation).await?;
        if output.success() { Ok(output) } else { Err(fatal(invocation, &output)) }
    }

    /// Runs a `show`-style query. `None` means the resource does not exist.
    async fn probe(&self, invocation: &Invocation) -> Result<Option<CommandOutput>, Error> {
        let output = self.runner.run(invocation).await?;
        if output.success() {
            return Ok(Some(output));
        }
        match AzureError::parse(output.diagnostics()).kind() {
            ErrorKind::NotFound => Ok(None),
            ErrorKind::AlreadyExists | ErrorKind::Other => Err(fatal(invocation, &output)),
        }
    }

    /// Runs `create` unless the resource `exists`. A create rejected because
    /// the resource already exists counts as success.
    async fn ensure(
        &self,
        exists: bool,
        create: &Invocation,
        progress: String,
    ) -> Result<StepOutcome, Error> {
        if exists {
            return Ok(StepOutcome::AlreadyExists);
        }

        let spinner = self.reporter.spinner(progress);
        let result = self.runner.run(create).await;
        spinner.finish_and_clear();

        let output = result?;
        if output.success() {
            return Ok(StepOutcome::Created);
        }
        let azure_error = AzureError::parse(output.diagnostics());
        match azure_error.kind() {
            ErrorKind::AlreadyExists => {
                tracing::info!("`{create}` reported an existing resource: {}", azure_error.message);
                Ok(StepOutcome::AlreadyExists)
            }
            ErrorKind::NotFound | ErrorKind::Other => Err(fatal(create, &output)),
        }
    }
}

fn fatal(invocation: &Invocation, output: &CommandOutput) -> Error {
    Error::FatalStep {
        command: invocation.to_string(),
        status: output.status_text(),
        diagnostics: output.diagnostics().to_string(),
    }
}

fn parse_json<T: DeserializeOwned>(invocation: &Invocation, output: &CommandOutput) -> Result<T, Error> {
    serde_json::from_str(output.stdout_trimmed())
        .map_err(|source| Error::UnexpectedOutput { command: invocation.to_string(), source })
}
