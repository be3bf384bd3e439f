use k8s_openapi::api::{
    apps::v1::Deployment,
    core::v1::{Node, Pod, Service},
};
use kube::{
    Api,
    api::ListParams,
    runtime::wait::await_condition,
};
use snafu::ResultExt;

use crate::cluster::{
    ClusterConnector, ClusterOps, ClusterSnapshot, Error, NodeRow, PodRow, ServiceRow, error,
    snapshot::load_balancer_ingress,
};

/// Connects through the current kube-context, i.e. the context written by
/// `az aks get-credentials`.
#[derive(Clone, Debug)]
pub struct KubeConnector {
    namespace: String,
}

impl KubeConnector {
    /// `namespace` is where the application's deployments and services live.
    pub fn new(namespace: impl Into<String>) -> Self { Self { namespace: namespace.into() } }
}

impl ClusterConnector for KubeConnector {
    type Cluster = KubeCluster;

    async fn connect(&self) -> Result<Self::Cluster, Error> {
        let client = kube::Client::try_default().await.context(error::KubeConfigSnafu)?;
        Ok(KubeCluster { client, namespace: self.namespace.clone() })
    }
}

/// A client bound to the application namespace.
#[derive(Clone)]
pub struct KubeCluster {
    client: kube::Client,
    namespace: String,
}

impl ClusterOps for KubeCluster {
    async fn await_rollout(&self, deployment: &str) -> Result<(), Error> {
        let api = Api::<Deployment>::namespaced(self.client.clone(), &self.namespace);
        let _deployment = await_condition(api, deployment, is_rollout_complete)
            .await
            .with_context(|_| error::WaitForRolloutSnafu {
                namespace: self.namespace.clone(),
                deployment: deployment.to_string(),
            })?;
        Ok(())
    }

    async fn load_balancer_address(&self, service: &str) -> Result<Option<String>, Error> {
        let api = Api::<Service>::namespaced(self.client.clone(), &self.namespace);
        let found = api.get_opt(service).await.with_context(|_| error::GetServiceSnafu {
            namespace: self.namespace.clone(),
            service: service.to_string(),
        })?;
        Ok(found.as_ref().and_then(load_balancer_ingress))
    }

    async fn snapshot(&self) -> Result<ClusterSnapshot, Error> {
        let list_params = ListParams::default();

        let nodes = Api::<Node>::all(self.client.clone())
            .list(&list_params)
            .await
            .context(error::ListNodesSnafu)?;
        let pods = Api::<Pod>::namespaced(self.client.clone(), &self.namespace)
            .list(&list_params)
            .await
            .with_context(|_| error::ListPodsSnafu { namespace: self.namespace.clone() })?;
        let services = Api::<Service>::namespaced(self.client.clone(), &self.namespace)
            .list(&list_params)
            .await
            .with_context(|_| error::ListServicesSnafu { namespace: self.namespace.clone() })?;

        Ok(ClusterSnapshot {
            nodes: nodes.items.iter().map(NodeRow::from).collect(),
            pods: pods.items.iter().map(PodRow::from).collect(),
            services: services.items.iter().map(ServiceRow::from).collect(),
        })
    }
}

/// Mirrors `kubectl rollout status`: the controller has observed the latest
/// spec, every replica runs the new template and all of them are available.
fn is_rollout_complete(deployment: Option<&Deployment>) -> bool {
    let Some(deployment) = deployment else {
        return false;
    };
    let Some(status) = deployment.status.as_ref() else {
        return false;
    };

    let generation = deployment.metadata.generation.unwrap_or_default();
    if status.observed_generation.unwrap_or_default() < generation {
        return false;
    }

    let desired = deployment.spec.as_ref().and_then(|spec| spec.replicas).unwrap_or(1);
    let updated = status.updated_replicas.unwrap_or_default();
    let current = status.replicas.unwrap_or_default();
    let available = status.available_replicas.unwrap_or_default();

    updated >= desired && current <= updated && available >= updated
}

#[cfg(test)]
mod tests {
    use k8s_openapi::{
        api::apps::v1::{DeploymentSpec, DeploymentStatus},
        apimachinery::pkg::apis::meta::v1::ObjectMeta,
    };

    use super::*;

    fn deployment(generation: i64, replicas: i32, status: DeploymentStatus) -> Deployment {
        Deployment {
            metadata: ObjectMeta {
                name: Some("backend-deployment".to_string()),
                generation: Some(generation),
                ..ObjectMeta::default()
            },
            spec: Some(DeploymentSpec { replicas: Some(replicas), ..DeploymentSpec::default() }),
            status: Some(status),
        }
    }

    #[test]
    fn test_missing_deployment_is_not_complete() {
        assert!(!is_rollout_complete(None));
        assert!(!is_rollout_complete(Some(&Deployment::default())));
    }

    #[test]
    fn test_stale_observed_generation() {
        let deployment = deployment(3, 1, DeploymentStatus {
            observed_generation: Some(2),
            replicas: Some(1),
            updated_replicas: Some(1),
            available_replicas: Some(1),
            ..DeploymentStatus::default()
        });
        assert!(!is_rollout_complete(Some(&deployment)));
    }

    #[test]
    fn test_old_replicas_pending_termination() {
        let deployment = deployment(2, 2, DeploymentStatus {
            observed_generation: Some(2),
            replicas: Some(3),
            updated_replicas: Some(2),
            available_replicas: Some(2),
            ..DeploymentStatus::default()
        });
        assert!(!is_rollout_complete(Some(&deployment)));
    }

    #[test]
    fn test_updated_but_unavailable() {
        let deployment = deployment(2, 2, DeploymentStatus {
            observed_generation: Some(2),
            replicas: Some(2),
            updated_replicas: Some(2),
            available_replicas: Some(1),
            ..DeploymentStatus::default()
        });
        assert!(!is_rollout_complete(Some(&deployment)));
    }

    #[test]
    fn test_complete() {
        let deployment = deployment(2, 2, DeploymentStatus {
            observed_generation: Some(2),
            replicas: Some(2),
            updated_replicas: Some(2),
            available_replicas: Some(2),
            ready_replicas: Some(2),
            ..DeploymentStatus::default()
        });
        assert!(is_rollout_complete(Some(&deployment)));
    }
}
