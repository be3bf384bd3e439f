use crate::pipeline::Error;

/// The three names a deployment is addressed by.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DeployTarget {
    pub resource_group: String,
    pub cluster_name: String,
    pub registry_name: String,
}

impl DeployTarget {
    /// Accepts the raw positional arguments. Absent and blank values are both
    /// reported, all at once.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Usage`] listing every missing argument.
    pub fn try_new(
        resource_group: Option<String>,
        cluster_name: Option<String>,
        registry_name: Option<String>,
    ) -> Result<Self, Error> {
        let present = |value: Option<String>| {
            value.map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
        };
        let (resource_group, cluster_name, registry_name) =
            (present(resource_group), present(cluster_name), present(registry_name));

        match (resource_group, cluster_name, registry_name) {
            (Some(resource_group), Some(cluster_name), Some(registry_name)) => {
                Ok(Self { resource_group, cluster_name, registry_name })
            }
            (resource_group, cluster_name, registry_name) => {
                let missing = [
                    (resource_group.is_none(), "RESOURCE_GROUP"),
                    (cluster_name.is_none(), "CLUSTER_NAME"),
                    (registry_name.is_none(), "REGISTRY_NAME"),
                ]
                .into_iter()
                .filter_map(|(missing, name)| missing.then_some(name))
                .collect();
                Err(Error::Usage { missing })
            }
        }
    }
}
