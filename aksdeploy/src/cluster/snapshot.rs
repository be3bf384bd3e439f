use k8s_openapi::api::core::v1::{Node, Pod, Service};

/// Listings shown in the status report, flattened to display strings.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ClusterSnapshot {
    pub nodes: Vec<NodeRow>,
    pub pods: Vec<PodRow>,
    pub services: Vec<ServiceRow>,
}

/// One node, as `kubectl get nodes` would show it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NodeRow {
    pub name: String,

    /// `Ready`, `NotReady`, or `Unknown` when the node reports no condition.
    pub status: String,

    /// Kubelet version.
    pub version: String,
}

/// One pod of the application namespace.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PodRow {
    pub name: String,

    /// Ready containers over all containers, e.g. `1/2`.
    pub ready: String,

    /// The pod phase.
    pub status: String,

    /// Restarts summed over every container.
    pub restarts: i32,

    pub node: String,
}

/// One service of the application namespace.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ServiceRow {
    pub name: String,

    /// `ClusterIP`, `NodePort` or `LoadBalancer`.
    pub type_: String,

    pub cluster_ip: String,

    /// `<pending>` for a load balancer without an ingress address yet, and
    /// `<none>` for the other service types.
    pub external_ip: String,

    /// `port[:nodePort]/protocol` entries joined with commas.
    pub ports: String,
}

impl From<&Node> for NodeRow {
    fn from(node: &Node) -> Self {
        let ready = node
            .status
            .as_ref()
            .and_then(|status| status.conditions.as_ref())
            .and_then(|conditions| conditions.iter().find(|c| c.type_ == "Ready"))
            .map(|condition| condition.status == "True");
        let status = match ready {
            Some(true) => "Ready",
            Some(false) => "NotReady",
            None => "Unknown",
        };
        Self {
            name: node.metadata.name.clone().unwrap_or_default(),
            status: status.to_string(),
            version: node
                .status
                .as_ref()
                .and_then(|status| status.node_info.as_ref())
                .map(|info| info.kubelet_version.clone())
                .unwrap_or_default(),
        }
    }
}

impl From<&Pod> for PodRow {
    fn from(pod: &Pod) -> Self {
        let statuses = pod
            .status
            .as_ref()
            .and_then(|status| status.container_statuses.clone())
            .unwrap_or_default();
        let total = pod.spec.as_ref().map_or(statuses.len(), |spec| spec.containers.len());
        let ready = statuses.iter().filter(|status| status.ready).count();
        Self {
            name: pod.metadata.name.clone().unwrap_or_default(),
            ready: format!("{ready}/{total}"),
            status: pod
                .status
                .as_ref()
                .and_then(|status| status.phase.clone())
                .unwrap_or_else(|| "Unknown".to_string()),
            restarts: statuses.iter().map(|status| status.restart_count).sum(),
            node: pod.spec.as_ref().and_then(|spec| spec.node_name.clone()).unwrap_or_default(),
        }
    }
}

impl From<&Service> for ServiceRow {
    fn from(service: &Service) -> Self {
        let spec = service.spec.as_ref();
        let type_ = spec.and_then(|spec| spec.type_.clone()).unwrap_or_else(|| "ClusterIP".to_string());
        let external_ip = load_balancer_ingress(service).unwrap_or_else(|| {
            if type_ == "LoadBalancer" { "<pending>".to_string() } else { "<none>".to_string() }
        });
        let ports = spec
            .and_then(|spec| spec.ports.as_ref())
            .map(|ports| {
                ports
                    .iter()
                    .map(|port| {
                        let protocol = port.protocol.as_deref().unwrap_or("TCP");
                        port.node_port.map_or_else(
                            || format!("{}/{protocol}", port.port),
                            |node_port| format!("{}:{node_port}/{protocol}", port.port),
                        )
                    })
                    .collect::<Vec<_>>()
                    .join(",")
            })
            .unwrap_or_default();

        Self {
            name: service.metadata.name.clone().unwrap_or_default(),
            type_,
            cluster_ip: spec.and_then(|spec| spec.cluster_ip.clone()).unwrap_or_default(),
            external_ip,
            ports,
        }
    }
}

/// The first non-empty ingress IP (or hostname) of a `LoadBalancer` service.
pub fn load_balancer_ingress(service: &Service) -> Option<String> {
    service
        .status
        .as_ref()
        .and_then(|status| status.load_balancer.as_ref())
        .and_then(|load_balancer| load_balancer.ingress.as_ref())
        .into_iter()
        .flatten()
        .find_map(|ingress| {
            ingress
                .ip
                .clone()
                .filter(|ip| !ip.is_empty())
                .or_else(|| ingress.hostname.clone().filter(|hostname| !hostname.is_empty()))
        })
}

#[cfg(test)]
mod tests {
    use k8s_openapi::{
        api::core::v1::{
            Container, ContainerStatus, LoadBalancerIngress, LoadBalancerStatus, NodeCondition,
            NodeStatus, PodSpec, PodStatus, ServicePort, ServiceSpec, ServiceStatus,
        },
        apimachinery::pkg::apis::meta::v1::ObjectMeta,
    };

    use super::*;

    fn load_balancer(ingress: Option<Vec<LoadBalancerIngress>>) -> Service {
        Service {
            metadata: ObjectMeta { name: Some("frontend-service".to_string()), ..ObjectMeta::default() },
            spec: Some(ServiceSpec {
                type_: Some("LoadBalancer".to_string()),
                cluster_ip: Some("10.0.12.7".to_string()),
                ports: Some(vec![ServicePort {
                    port: 80,
                    node_port: Some(31_080),
                    protocol: Some("TCP".to_string()),
                    ..ServicePort::default()
                }]),
                ..ServiceSpec::default()
            }),
            status: Some(ServiceStatus {
                load_balancer: Some(LoadBalancerStatus { ingress }),
                ..ServiceStatus::default()
            }),
            ..Service::default()
        }
    }

    #[test]
    fn test_ingress_absent() {
        assert_eq!(load_balancer_ingress(&load_balancer(None)), None);
        assert_eq!(load_balancer_ingress(&load_balancer(Some(Vec::new()))), None);
        assert_eq!(load_balancer_ingress(&Service::default()), None);
    }

    #[test]
    fn test_ingress_empty_ip_is_pending() {
        let service = load_balancer(Some(vec![LoadBalancerIngress {
            ip: Some(String::new()),
            ..LoadBalancerIngress::default()
        }]));
        assert_eq!(load_balancer_ingress(&service), None);
    }

    #[test]
    fn test_ingress_ip() {
        let service = load_balancer(Some(vec![LoadBalancerIngress {
            ip: Some("20.42.1.9".to_string()),
            ..LoadBalancerIngress::default()
        }]));
        assert_eq!(load_balancer_ingress(&service).as_deref(), Some("20.42.1.9"));
    }

    #[test]
    fn test_ingress_hostname_fallback() {
        let service = load_balancer(Some(vec![LoadBalancerIngress {
            hostname: Some("app.example.com".to_string()),
            ..LoadBalancerIngress::default()
        }]));
        assert_eq!(load_balancer_ingress(&service).as_deref(), Some("app.example.com"));
    }

    #[test]
    fn test_service_row() {
        let row = ServiceRow::from(&load_balancer(None));
        assert_eq!(row.name, "frontend-service");
        assert_eq!(row.type_, "LoadBalancer");
        assert_eq!(row.external_ip, "<pending>");
        assert_eq!(row.ports, "80:31080/TCP");
    }

    #[test]
    fn test_node_row() {
        let node = Node {
            metadata: ObjectMeta { name: Some("aks-nodepool1-0".to_string()), ..ObjectMeta::default() },
            status: Some(NodeStatus {
                conditions: Some(vec![NodeCondition {
                    type_: "Ready".to_string(),
                    status: "True".to_string(),
                    ..NodeCondition::default()
                }]),
                ..NodeStatus::default()
            }),
            ..Node::default()
        };
        let row = NodeRow::from(&node);
        assert_eq!(row.status, "Ready");
        assert_eq!(row.version, "");
    }

    #[test]
    fn test_pod_row() {
        let pod = Pod {
            metadata: ObjectMeta { name: Some("backend-abc".to_string()), ..ObjectMeta::default() },
            spec: Some(PodSpec {
                containers: vec![Container { name: "backend".to_string(), ..Container::default() }],
                node_name: Some("aks-nodepool1-0".to_string()),
                ..PodSpec::default()
            }),
            status: Some(PodStatus {
                phase: Some("Running".to_string()),
                container_statuses: Some(vec![ContainerStatus {
                    name: "backend".to_string(),
                    ready: true,
                    restart_count: 2,
                    ..ContainerStatus::default()
                }]),
                ..PodStatus::default()
            }),
            ..Pod::default()
        };
        let row = PodRow::from(&pod);
        assert_eq!(row.ready, "1/1");
        assert_eq!(row.status, "Running");
        assert_eq!(row.restarts, 2);
        assert_eq!(row.node, "aks-nodepool1-0");
    }
}
