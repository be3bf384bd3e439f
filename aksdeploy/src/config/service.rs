use serde::{Deserialize, Serialize};

/// One application tier: built from `build_context`, pushed to the registry
/// and rolled out as the Kubernetes deployment named `deployment`.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSpec {
    pub name: String,

    pub build_context: String,

    pub deployment: String,
}

impl ServiceSpec {
    /// `<login-server>/<namespace>/<name>:<tag>`
    pub fn image_reference(&self, login_server: &str, namespace: &str, tag: &str) -> String {
        let login_server = login_server.trim_end_matches('/');
        let namespace = namespace.trim_matches('/');
        if namespace.is_empty() {
            format!("{login_server}/{}:{tag}", self.name)
        } else {
            format!("{login_server}/{namespace}/{}:{tag}", self.name)
        }
    }
}
