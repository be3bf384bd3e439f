mod cluster;
mod error;
mod log;
mod manifests;
mod service;

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use aksdeploy_base::consts::{self, azure, image, k8s};
use resolve_path::PathResolveExt;
use serde::{Deserialize, Serialize};
use snafu::ResultExt;

pub use self::{
    cluster::ClusterConfig, error::Error, log::LogConfig, manifests::ManifestsConfig,
    service::ServiceSpec,
};

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Azure region for the resource group.
    #[serde(default = "default_location")]
    pub location: String,

    #[serde(default = "default_registry_sku")]
    pub registry_sku: String,

    /// Repository namespace inside the registry, e.g. `mern` in
    /// `myacr.azurecr.io/mern/backend:latest`.
    #[serde(default = "default_image_namespace")]
    pub image_namespace: String,

    #[serde(default = "default_image_tag")]
    pub image_tag: String,

    #[serde(default = "default_services")]
    pub services: Vec<ServiceSpec>,

    /// Resource providers registered before the cluster is created.
    #[serde(default = "default_providers")]
    pub providers: Vec<String>,

    #[serde(default)]
    pub cluster: ClusterConfig,

    #[serde(default)]
    pub manifests: ManifestsConfig,

    /// Kubernetes namespace the manifests deploy into.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// The `LoadBalancer` service whose ingress address is reported at the end.
    #[serde(default = "default_public_service")]
    pub public_service: String,

    #[serde(default = "default_rollout_timeout_seconds")]
    pub rollout_timeout_seconds: u64,

    #[serde(default = "default_external_ip_poll_interval_seconds")]
    pub external_ip_poll_interval_seconds: u64,

    /// `0` waits for the external address without a deadline.
    #[serde(default = "default_external_ip_timeout_seconds")]
    pub external_ip_timeout_seconds: u64,

    #[serde(default = "LogConfig::default")]
    pub log: LogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            location: default_location(),
            registry_sku: default_registry_sku(),
            image_namespace: default_image_namespace(),
            image_tag: default_image_tag(),
            services: default_services(),
            providers: default_providers(),
            cluster: ClusterConfig::default(),
            manifests: ManifestsConfig::default(),
            namespace: default_namespace(),
            public_service: default_public_service(),
            rollout_timeout_seconds: default_rollout_timeout_seconds(),
            external_ip_poll_interval_seconds: default_external_ip_poll_interval_seconds(),
            external_ip_timeout_seconds: default_external_ip_timeout_seconds(),
            log: LogConfig::default(),
        }
    }
}

impl Config {
    pub fn search_config_file_path() -> PathBuf {
        let paths = vec![Self::default_path()]
            .into_iter()
            .chain(aksdeploy_base::fallback_project_config_directories().into_iter().map(
                |mut path| {
                    path.push(aksdeploy_base::CLI_CONFIG_NAME);
                    path
                },
            ))
            .collect::<Vec<_>>();
        for path in paths {
            let Ok(exists) = path.try_exists() else {
                continue;
            };
            if exists {
                return path;
            }
        }
        Self::default_path()
    }

    #[inline]
    pub fn default_path() -> PathBuf {
        [aksdeploy_base::PROJECT_CONFIG_DIR.to_path_buf(), PathBuf::from(aksdeploy_base::CLI_CONFIG_NAME)]
            .into_iter()
            .collect()
    }

    /// Loads the configuration from `path`.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or parsed, or when it describes an
    /// unusable deployment (see [`Config::validate`]).
    #[inline]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let mut config: Self = {
            let path =
                path.as_ref().try_resolve().map(|path| path.to_path_buf()).with_context(|_| {
                    error::ResolveFilePathSnafu { file_path: path.as_ref().to_path_buf() }
                })?;
            let data =
                std::fs::read(&path).context(error::OpenConfigSnafu { filename: path.clone() })?;
            serde_yaml::from_slice(&data).context(error::ParseConfigSnafu { filename: path })?
        };

        config.log.file_path = match config.log.file_path.map(|path| {
            path.try_resolve()
                .map(|path| path.to_path_buf())
                .with_context(|_| error::ResolveFilePathSnafu { file_path: path.clone() })
        }) {
            Some(Ok(path)) => Some(path),
            Some(Err(err)) => return Err(err),
            None => None,
        };

        config.validate()?;
        Ok(config)
    }

    /// Loads `path` if it exists and falls back to the built-in defaults
    /// otherwise.
    ///
    /// # Errors
    ///
    /// Same as [`Config::load`] for an existing file.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        if path.as_ref().try_exists().unwrap_or(false) {
            Self::load(path)
        } else {
            tracing::debug!(
                "Config file {} not found, using built-in defaults",
                path.as_ref().display()
            );
            Ok(Self::default())
        }
    }

    /// Rejects settings the deployment cannot work with.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] describing the first problem found.
    pub fn validate(&self) -> Result<(), Error> {
        let reason = if self.services.is_empty() {
            Some("at least one service must be configured".to_string())
        } else if let Some(service) = self
            .services
            .iter()
            .find(|s| s.name.is_empty() || s.build_context.is_empty() || s.deployment.is_empty())
        {
            Some(format!("service '{}' needs a name, a build context and a deployment", service.name))
        } else if self.manifests.placeholder.is_empty() {
            Some("manifests.placeholder must not be empty".to_string())
        } else if self.external_ip_poll_interval_seconds == 0 {
            Some("externalIpPollIntervalSeconds must be greater than zero".to_string())
        } else if self.rollout_timeout_seconds == 0 {
            Some("rolloutTimeoutSeconds must be greater than zero".to_string())
        } else {
            None
        };

        reason.map_or(Ok(()), |reason| error::InvalidConfigSnafu { reason }.fail())
    }

    /// Renders the default configuration as YAML.
    pub fn template_basic() -> Vec<u8> {
        serde_yaml::to_string(&Self::default()).unwrap_or_default().into_bytes()
    }

    #[inline]
    pub const fn rollout_timeout(&self) -> Duration {
        Duration::from_secs(self.rollout_timeout_seconds)
    }

    #[inline]
    pub const fn external_ip_poll_interval(&self) -> Duration {
        Duration::from_secs(self.external_ip_poll_interval_seconds)
    }

    /// `None` when the external address should be awaited without a deadline.
    #[inline]
    pub const fn external_ip_timeout(&self) -> Option<Duration> {
        if self.external_ip_timeout_seconds == 0 {
            None
        } else {
            Some(Duration::from_secs(self.external_ip_timeout_seconds))
        }
    }
}

fn default_location() -> String { azure::DEFAULT_LOCATION.to_string() }

fn default_registry_sku() -> String { azure::DEFAULT_REGISTRY_SKU.to_string() }

fn default_image_namespace() -> String { image::DEFAULT_NAMESPACE.to_string() }

fn default_image_tag() -> String { image::DEFAULT_TAG.to_string() }

fn default_services() -> Vec<ServiceSpec> {
    consts::DEFAULT_SERVICES
        .iter()
        .map(|(name, build_context, deployment)| ServiceSpec {
            name: (*name).to_string(),
            build_context: (*build_context).to_string(),
            deployment: (*deployment).to_string(),
        })
        .collect()
}

fn default_providers() -> Vec<String> {
    azure::DEFAULT_PROVIDERS.iter().map(ToString::to_string).collect()
}

fn default_namespace() -> String { k8s::DEFAULT_NAMESPACE.to_string() }

fn default_public_service() -> String { k8s::DEFAULT_PUBLIC_SERVICE.to_string() }

const fn default_rollout_timeout_seconds() -> u64 { k8s::DEFAULT_ROLLOUT_TIMEOUT_SECS }

const fn default_external_ip_poll_interval_seconds() -> u64 {
    k8s::DEFAULT_EXTERNAL_IP_POLL_INTERVAL_SECS
}

const fn default_external_ip_timeout_seconds() -> u64 { k8s::DEFAULT_EXTERNAL_IP_TIMEOUT_SECS }

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.location, "eastus");
        assert_eq!(config.services.len(), 2);
        assert_eq!(config.services[0].name, "backend");
        assert_eq!(config.services[1].name, "frontend");
        assert_eq!(config.rollout_timeout(), Duration::from_secs(300));
        assert_eq!(config.external_ip_poll_interval(), Duration::from_secs(10));
        assert_eq!(config.external_ip_timeout(), Some(Duration::from_secs(1800)));
        assert_eq!(config.cluster.node_count, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_external_ip_timeout_means_unbounded() {
        let config = Config { external_ip_timeout_seconds: 0, ..Config::default() };
        assert_eq!(config.external_ip_timeout(), None);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = "location: westeurope\ncluster:\n  nodeVmSize: Standard_D2s_v3\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.location, "westeurope");
        assert_eq!(config.cluster.node_vm_size, "Standard_D2s_v3");
        assert_eq!(config.cluster.node_count, 1);
        assert_eq!(config.manifests.placeholder, "ACR_NAME_PLACEHOLDER");
        assert_eq!(config.public_service, "frontend-service");
    }

    #[test]
    fn test_template_round_trips() {
        let template = Config::template_basic();
        let config: Config = serde_yaml::from_slice(&template).unwrap();
        assert_eq!(config.services, Config::default().services);
        assert_eq!(config.cluster, ClusterConfig::default());
    }

    #[test]
    fn test_validate_rejects_empty_placeholder() {
        let mut config = Config::default();
        config.manifests.placeholder = String::new();
        assert!(matches!(config.validate(), Err(Error::InvalidConfig { .. })));
    }

    #[test]
    fn test_validate_rejects_zero_poll_interval() {
        let config = Config { external_ip_poll_interval_seconds: 0, ..Config::default() };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig { .. })));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"imageNamespace: shop\nexternalIpTimeoutSeconds: 60\n").unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.image_namespace, "shop");
        assert_eq!(config.external_ip_timeout(), Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_load_or_default_with_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(dir.path().join("missing.yaml")).unwrap();
        assert_eq!(config.location, Config::default().location);
    }

    #[test]
    fn test_load_invalid_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"services: 42\n").unwrap();
        assert!(matches!(Config::load(file.path()), Err(Error::ParseConfig { .. })));
    }
}
