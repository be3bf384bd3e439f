//! Access to the cluster once its credentials are merged into the local
//! kubeconfig.

mod error;
mod kube_cluster;
mod snapshot;

pub use self::{
    error::Error,
    kube_cluster::KubeConnector,
    snapshot::{ClusterSnapshot, NodeRow, PodRow, ServiceRow},
};

/// Opens a connection to the cluster selected by the current kube-context.
pub trait ClusterConnector {
    type Cluster: ClusterOps;

    /// # Errors
    ///
    /// Returns [`Error::KubeConfig`] when no usable kubeconfig is found.
    async fn connect(&self) -> Result<Self::Cluster, Error>;
}

pub trait ClusterOps {
    /// Resolves once `deployment` has rolled out completely.
    ///
    /// Waits for as long as it takes; callers bound the wait.
    ///
    /// # Errors
    ///
    /// Returns an error when watching the deployment fails.
    async fn await_rollout(&self, deployment: &str) -> Result<(), Error>;

    /// The first load-balancer ingress address of `service`, if one has been
    /// assigned yet.
    ///
    /// # Errors
    ///
    /// Returns an error when the service cannot be queried.
    async fn load_balancer_address(&self, service: &str) -> Result<Option<String>, Error>;

    /// Node, pod and service listings for the status report.
    ///
    /// # Errors
    ///
    /// Returns an error when any of the listings fails.
    async fn snapshot(&self) -> Result<ClusterSnapshot, Error>;
}
