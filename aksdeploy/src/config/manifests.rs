use std::path::{Path, PathBuf};

use aksdeploy_base::consts::manifests;
use serde::{Deserialize, Serialize};

/// Locations of the Kubernetes manifests applied by the deployment.
///
/// File names are relative to `directory`, which itself is relative to the
/// working directory of the process unless absolute.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestsConfig {
    #[serde(default = "ManifestsConfig::default_directory")]
    pub directory: PathBuf,

    #[serde(default = "ManifestsConfig::default_config")]
    pub config: PathBuf,

    #[serde(default = "ManifestsConfig::default_secrets")]
    pub secrets: PathBuf,

    #[serde(default = "ManifestsConfig::default_secrets_template")]
    pub secrets_template: PathBuf,

    #[serde(default = "ManifestsConfig::default_deployment")]
    pub deployment: PathBuf,

    #[serde(default = "ManifestsConfig::default_service")]
    pub service: PathBuf,

    /// Token in the deployment manifest replaced by the registry name.
    #[serde(default = "ManifestsConfig::default_placeholder")]
    pub placeholder: String,
}

impl Default for ManifestsConfig {
    fn default() -> Self {
        Self {
            directory: Self::default_directory(),
            config: Self::default_config(),
            secrets: Self::default_secrets(),
            secrets_template: Self::default_secrets_template(),
            deployment: Self::default_deployment(),
            service: Self::default_service(),
            placeholder: Self::default_placeholder(),
        }
    }
}

impl ManifestsConfig {
    fn default_directory() -> PathBuf { PathBuf::from(manifests::DEFAULT_DIRECTORY) }

    fn default_config() -> PathBuf { PathBuf::from(manifests::DEFAULT_CONFIG) }

    fn default_secrets() -> PathBuf { PathBuf::from(manifests::DEFAULT_SECRETS) }

    fn default_secrets_template() -> PathBuf { PathBuf::from(manifests::DEFAULT_SECRETS_TEMPLATE) }

    fn default_deployment() -> PathBuf { PathBuf::from(manifests::DEFAULT_DEPLOYMENT) }

    fn default_service() -> PathBuf { PathBuf::from(manifests::DEFAULT_SERVICE) }

    fn default_placeholder() -> String { manifests::DEFAULT_PLACEHOLDER.to_string() }

    fn resolve(&self, file: &Path) -> PathBuf { self.directory.join(file) }

    pub fn config_path(&self) -> PathBuf { self.resolve(&self.config) }

    pub fn secrets_path(&self) -> PathBuf { self.resolve(&self.secrets) }

    pub fn secrets_template_path(&self) -> PathBuf { self.resolve(&self.secrets_template) }

    pub fn deployment_path(&self) -> PathBuf { self.resolve(&self.deployment) }

    pub fn service_path(&self) -> PathBuf { self.resolve(&self.service) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths() {
        let manifests = ManifestsConfig::default();
        assert_eq!(manifests.config_path(), Path::new("k8s/configmap.yaml"));
        assert_eq!(manifests.secrets_path(), Path::new("k8s/secrets.yaml"));
        assert_eq!(manifests.secrets_template_path(), Path::new("k8s/secrets.yaml.template"));
        assert_eq!(manifests.deployment_path(), Path::new("k8s/deployment.yaml"));
        assert_eq!(manifests.service_path(), Path::new("k8s/service.yaml"));
    }

    #[test]
    fn test_absolute_file_overrides_directory() {
        let manifests =
            ManifestsConfig { service: PathBuf::from("/srv/svc.yaml"), ..ManifestsConfig::default() };
        assert_eq!(manifests.service_path(), Path::new("/srv/svc.yaml"));
    }
}
