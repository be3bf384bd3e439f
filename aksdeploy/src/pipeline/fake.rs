//! In-memory stand-ins for the command line tools and the cluster.

use std::{
    collections::VecDeque,
    fs,
    path::PathBuf,
    sync::{
        Arc, Mutex,
        atomic::{AtomicU32, Ordering},
    },
};

use crate::{
    cluster::{self, ClusterConnector, ClusterOps, ClusterSnapshot},
    command::{self, CommandOutput, CommandRunner, Invocation, Tool},
};

const ACCOUNT: &str =
    r#"{"name": "Dev Subscription", "user": {"name": "dev@example.com", "type": "user"}}"#;

const REGISTRY: &str = r#"{"loginServer": "mernacr.azurecr.io", "name": "mernacr", "sku": {"name": "Basic"}}"#;

const NOT_FOUND: &str = "ERROR: (ResourceNotFound) The Resource was not found.\nCode: ResourceNotFound\n";

pub fn success(stdout: &str) -> CommandOutput {
    CommandOutput { code: Some(0), stdout: stdout.to_string(), stderr: String::new() }
}

pub fn failure(stderr: &str) -> CommandOutput {
    CommandOutput { code: Some(1), stdout: String::new(), stderr: stderr.to_string() }
}

#[derive(Default)]
struct Inner {
    rules: Vec<(String, CommandOutput)>,
    once: Mutex<Vec<(String, CommandOutput)>>,
    missing: Vec<Tool>,
    calls: Mutex<Vec<String>>,
    applied: Mutex<Vec<(PathBuf, String)>>,
}

/// Answers invocations by command-line prefix. The most recently added rule
/// wins; anything unmatched succeeds with empty output.
#[derive(Clone, Default)]
pub struct FakeRunner {
    inner: Arc<Inner>,
}

impl FakeRunner {
    /// Signed in, with none of the resources created yet.
    pub fn fresh_subscription() -> Self {
        Self::default()
            .respond("az account show", success(ACCOUNT))
            .respond("az group exists", success("false\n"))
            .respond("az acr show --name mernacr --resource-group", failure(NOT_FOUND))
            .respond("az acr show --name mernacr --output json", success(REGISTRY))
            .respond("az aks show", failure(NOT_FOUND))
    }

    /// Signed in, with every resource left over from an earlier run.
    pub fn existing_resources() -> Self {
        Self::default()
            .respond("az account show", success(ACCOUNT))
            .respond("az group exists", success("true\n"))
            .respond("az acr show", success(REGISTRY))
            .respond("az aks show", success(""))
    }

    pub fn respond(mut self, prefix: &str, output: CommandOutput) -> Self {
        self.inner_mut().rules.push((prefix.to_string(), output));
        self
    }

    /// Answers the first matching invocation only.
    pub fn respond_once(self, prefix: &str, output: CommandOutput) -> Self {
        self.inner.once.lock().unwrap().push((prefix.to_string(), output));
        self
    }

    pub fn without(mut self, tool: Tool) -> Self {
        self.inner_mut().missing.push(tool);
        self
    }

    /// Every invocation in order, as `program arg...` without shell quoting.
    pub fn calls(&self) -> Vec<String> { self.inner.calls.lock().unwrap().clone() }

    /// Path and content of every file passed to `kubectl apply -f`, read at
    /// the time it was applied.
    pub fn applied(&self) -> Vec<(PathBuf, String)> { self.inner.applied.lock().unwrap().clone() }

    fn inner_mut(&mut self) -> &mut Inner {
        Arc::get_mut(&mut self.inner).expect("rules are added before the runner is shared")
    }
}

impl CommandRunner for FakeRunner {
    fn locate(&self, tool: Tool) -> Option<PathBuf> {
        (!self.inner.missing.contains(&tool)).then(|| PathBuf::from("/usr/bin").join(tool.program()))
    }

    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput, command::Error> {
        let line = std::iter::once(invocation.tool().program())
            .chain(invocation.args().iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ");
        self.inner.calls.lock().unwrap().push(line.clone());

        if let (Tool::Kubectl, [apply, flag, path]) = (invocation.tool(), invocation.args())
            && apply == "apply"
            && flag == "-f"
        {
            let path = PathBuf::from(path);
            let content = fs::read_to_string(&path).unwrap();
            self.inner.applied.lock().unwrap().push((path, content));
        }

        {
            let mut once = self.inner.once.lock().unwrap();
            if let Some(index) = once.iter().position(|(prefix, _)| line.starts_with(prefix.as_str())) {
                return Ok(once.remove(index).1);
            }
        }

        Ok(self
            .inner
            .rules
            .iter()
            .rev()
            .find(|(prefix, _)| line.starts_with(prefix.as_str()))
            .map_or_else(|| success(""), |(_, output)| output.clone()))
    }
}

/// A cluster whose load balancer hands out the queued addresses one query at
/// a time, then keeps answering `None`.
pub struct FakeCluster {
    rollout_completes: bool,
    snapshot_fails: bool,
    addresses: Mutex<VecDeque<Option<String>>>,
    address_queries: AtomicU32,
}

impl FakeCluster {
    pub fn new(
        rollout_completes: bool,
        addresses: impl IntoIterator<Item = Option<String>>,
    ) -> Self {
        Self {
            rollout_completes,
            snapshot_fails: false,
            addresses: Mutex::new(addresses.into_iter().collect()),
            address_queries: AtomicU32::new(0),
        }
    }

    /// Makes every status listing fail as if the API server rejected it.
    pub fn with_failing_snapshot(mut self) -> Self {
        self.snapshot_fails = true;
        self
    }

    pub fn address_queries(&self) -> u32 { self.address_queries.load(Ordering::SeqCst) }
}

impl ClusterOps for Arc<FakeCluster> {
    async fn await_rollout(&self, _deployment: &str) -> Result<(), cluster::Error> {
        if self.rollout_completes {
            Ok(())
        } else {
            std::future::pending::<Result<(), cluster::Error>>().await
        }
    }

    async fn load_balancer_address(&self, _service: &str) -> Result<Option<String>, cluster::Error> {
        let _previous = self.address_queries.fetch_add(1, Ordering::SeqCst);
        Ok(self.addresses.lock().unwrap().pop_front().flatten())
    }

    async fn snapshot(&self) -> Result<ClusterSnapshot, cluster::Error> {
        if self.snapshot_fails {
            let source = serde_json::from_str::<serde_json::Value>("<html>").unwrap_err();
            return Err(cluster::Error::ListNodes { source: Box::new(kube::Error::SerdeError(source)) });
        }
        Ok(ClusterSnapshot::default())
    }
}

pub struct FakeConnector(pub Arc<FakeCluster>);

impl ClusterConnector for FakeConnector {
    type Cluster = Arc<FakeCluster>;

    async fn connect(&self) -> Result<Self::Cluster, cluster::Error> { Ok(Arc::clone(&self.0)) }
}
