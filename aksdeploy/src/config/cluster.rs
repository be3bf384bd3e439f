use aksdeploy_base::consts::azure;
use serde::{Deserialize, Serialize};

/// Shape of the managed cluster created when none exists yet.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterConfig {
    #[serde(default = "ClusterConfig::default_node_count")]
    pub node_count: u32,

    #[serde(default = "ClusterConfig::default_node_vm_size")]
    pub node_vm_size: String,

    #[serde(default = "ClusterConfig::default_network_plugin")]
    pub network_plugin: String,

    #[serde(default = "ClusterConfig::default_true")]
    pub enable_managed_identity: bool,

    #[serde(default = "ClusterConfig::default_true")]
    pub generate_ssh_keys: bool,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            node_count: Self::default_node_count(),
            node_vm_size: Self::default_node_vm_size(),
            network_plugin: Self::default_network_plugin(),
            enable_managed_identity: true,
            generate_ssh_keys: true,
        }
    }
}

impl ClusterConfig {
    #[inline]
    #[must_use]
    pub const fn default_node_count() -> u32 { azure::DEFAULT_NODE_COUNT }

    #[inline]
    #[must_use]
    pub fn default_node_vm_size() -> String { azure::DEFAULT_NODE_VM_SIZE.to_string() }

    #[inline]
    #[must_use]
    pub fn default_network_plugin() -> String { azure::DEFAULT_NETWORK_PLUGIN.to_string() }

    const fn default_true() -> bool { true }

    /// Arguments for `az aks create`, as a single well-formed list.
    pub fn create_args(
        &self,
        resource_group: &str,
        cluster_name: &str,
        registry_name: &str,
    ) -> Vec<String> {
        let Self {
            node_count,
            node_vm_size,
            network_plugin,
            enable_managed_identity,
            generate_ssh_keys,
        } = self;

        let node_count = node_count.to_string();
        let mut args = [
            "aks",
            "create",
            "--resource-group",
            resource_group,
            "--name",
            cluster_name,
            "--node-count",
            node_count.as_str(),
            "--node-vm-size",
            node_vm_size.as_str(),
            "--network-plugin",
            network_plugin.as_str(),
            "--attach-acr",
            registry_name,
        ]
        .into_iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>();

        if *enable_managed_identity {
            args.push("--enable-managed-identity".to_string());
        }
        if *generate_ssh_keys {
            args.push("--generate-ssh-keys".to_string());
        }
        args.extend(["--output".to_string(), "none".to_string()]);
        args
    }
}
