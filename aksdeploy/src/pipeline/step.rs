use std::fmt;

/// What the driver does when a step fails.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Policy {
    /// Any failure aborts the run.
    Fatal,

    /// Create-if-absent. An existing resource is reported as
    /// [`StepOutcome::AlreadyExists`]; every other failure aborts the run.
    Ensure,

    /// Failures are reported as warnings and the run continues.
    Tolerant,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum StepKind {
    Preflight,
    Authenticate,
    EnsureResourceGroup,
    EnsureRegistry,
    RegistryLogin,
    BuildImages,
    PushImages,
    RegisterProviders,
    EnsureCluster,
    FetchCredentials,
    RenderManifest,
    CheckSecrets,
    ApplyManifests,
    AwaitRollout,
    ReportStatus,
    DiscoverExternalIp,
    Cleanup,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Step {
    pub kind: StepKind,
    pub name: &'static str,
    pub policy: Policy,
}

impl Step {
    const fn new(kind: StepKind, name: &'static str, policy: Policy) -> Self {
        Self { kind, name, policy }
    }
}

/// The ordered deployment. Argument validation happens before the pipeline
/// starts and is not part of it.
pub const PLAN: [Step; 17] = [
    Step::new(StepKind::Preflight, "Checking required tools", Policy::Fatal),
    Step::new(StepKind::Authenticate, "Checking Azure login", Policy::Fatal),
    Step::new(StepKind::EnsureResourceGroup, "Ensuring resource group", Policy::Ensure),
    Step::new(StepKind::EnsureRegistry, "Ensuring container registry", Policy::Ensure),
    Step::new(StepKind::RegistryLogin, "Logging in to container registry", Policy::Fatal),
    Step::new(StepKind::BuildImages, "Building images", Policy::Fatal),
    Step::new(StepKind::PushImages, "Pushing images", Policy::Fatal),
    Step::new(StepKind::RegisterProviders, "Registering resource providers", Policy::Tolerant),
    Step::new(StepKind::EnsureCluster, "Ensuring AKS cluster", Policy::Ensure),
    Step::new(StepKind::FetchCredentials, "Fetching cluster credentials", Policy::Fatal),
    Step::new(StepKind::RenderManifest, "Rendering deployment manifest", Policy::Fatal),
    Step::new(StepKind::CheckSecrets, "Checking secrets manifest", Policy::Fatal),
    Step::new(StepKind::ApplyManifests, "Applying manifests", Policy::Fatal),
    Step::new(StepKind::AwaitRollout, "Waiting for rollouts", Policy::Fatal),
    Step::new(StepKind::ReportStatus, "Cluster status", Policy::Tolerant),
    Step::new(StepKind::DiscoverExternalIp, "Waiting for external IP", Policy::Fatal),
    Step::new(StepKind::Cleanup, "Cleaning up", Policy::Tolerant),
];

/// How a step that did not fail ended.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum StepOutcome {
    Completed,
    CompletedWith(String),
    Created,
    AlreadyExists,
    Skipped(String),
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => f.write_str("done"),
            Self::CompletedWith(detail) => f.write_str(detail),
            Self::Created => f.write_str("created"),
            Self::AlreadyExists => f.write_str("already exists, skipped"),
            Self::Skipped(reason) => write!(f, "skipped: {reason}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_plan_has_every_step_once() {
        let kinds = PLAN.iter().map(|step| step.kind).collect::<HashSet<_>>();
        assert_eq!(kinds.len(), PLAN.len());
    }

    #[test]
    fn test_plan_order() {
        let position = |kind| PLAN.iter().position(|step| step.kind == kind).unwrap();
        assert!(position(StepKind::RegistryLogin) < position(StepKind::PushImages));
        assert!(position(StepKind::BuildImages) < position(StepKind::PushImages));
        assert!(position(StepKind::FetchCredentials) < position(StepKind::ApplyManifests));
        assert!(position(StepKind::RenderManifest) < position(StepKind::CheckSecrets));
        assert!(position(StepKind::CheckSecrets) < position(StepKind::ApplyManifests));
        assert!(position(StepKind::ApplyManifests) < position(StepKind::AwaitRollout));
        assert_eq!(PLAN.last().map(|step| step.kind), Some(StepKind::Cleanup));
    }

    #[test]
    fn test_ensure_steps() {
        let ensure = PLAN
            .iter()
            .filter(|step| step.policy == Policy::Ensure)
            .map(|step| step.kind)
            .collect::<Vec<_>>();
        assert_eq!(ensure, [
            StepKind::EnsureResourceGroup,
            StepKind::EnsureRegistry,
            StepKind::EnsureCluster
        ]);
    }
}
