//! Built-in defaults for every value the deployment pipeline would otherwise
//! hard-code.

pub mod azure {
    pub const DEFAULT_LOCATION: &str = "eastus";

    pub const DEFAULT_REGISTRY_SKU: &str = "Basic";

    /// Resource providers that must be registered on the subscription before a
    /// managed cluster can be created.
    pub const DEFAULT_PROVIDERS: [&str; 2] =
        ["Microsoft.ContainerService", "Microsoft.ContainerRegistry"];

    pub const DEFAULT_NODE_COUNT: u32 = 1;

    pub const DEFAULT_NODE_VM_SIZE: &str = "Standard_B2s";

    pub const DEFAULT_NETWORK_PLUGIN: &str = "kubenet";
}

pub mod image {
    pub const DEFAULT_NAMESPACE: &str = "mern";

    pub const DEFAULT_TAG: &str = "latest";
}

pub mod manifests {
    pub const DEFAULT_DIRECTORY: &str = "k8s";

    pub const DEFAULT_CONFIG: &str = "configmap.yaml";

    pub const DEFAULT_SECRETS: &str = "secrets.yaml";

    pub const DEFAULT_SECRETS_TEMPLATE: &str = "secrets.yaml.template";

    pub const DEFAULT_DEPLOYMENT: &str = "deployment.yaml";

    pub const DEFAULT_SERVICE: &str = "service.yaml";

    /// Literal token in the deployment manifest that is replaced by the
    /// registry name on every run.
    pub const DEFAULT_PLACEHOLDER: &str = "ACR_NAME_PLACEHOLDER";
}

pub mod k8s {
    pub const DEFAULT_NAMESPACE: &str = "default";

    pub const DEFAULT_PUBLIC_SERVICE: &str = "frontend-service";

    pub const DEFAULT_ROLLOUT_TIMEOUT_SECS: u64 = 300;

    pub const DEFAULT_EXTERNAL_IP_POLL_INTERVAL_SECS: u64 = 10;

    pub const DEFAULT_EXTERNAL_IP_TIMEOUT_SECS: u64 = 1800;
}

/// The application tiers that are built, pushed and rolled out. Each entry is
/// `(name, build context, deployment name)`.
pub const DEFAULT_SERVICES: [(&str, &str, &str); 2] = [
    ("backend", "./backend", "backend-deployment"),
    ("frontend", "./frontend", "frontend-deployment"),
];
