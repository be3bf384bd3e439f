//! Renders the rows of a [`ClusterSnapshot`](crate::cluster::ClusterSnapshot)
//! the way `kubectl get` prints them.

use comfy_table::ContentArrangement;

use crate::cluster::{NodeRow, PodRow, ServiceRow};

/// Extension trait rendering a slice of listing rows into a human-readable
/// table string.
pub trait TableExt {
    fn render_table(&self) -> String;
}

fn render<const N: usize>(header: [&str; N], rows: Vec<[String; N]>) -> String {
    comfy_table::Table::new()
        .load_preset(comfy_table::presets::NOTHING)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.to_vec())
        .add_rows(rows)
        .to_string()
}

impl TableExt for [NodeRow] {
    fn render_table(&self) -> String {
        let rows = self
            .iter()
            .map(|node| [node.name.clone(), node.status.clone(), node.version.clone()])
            .collect();
        render(["NAME", "STATUS", "VERSION"], rows)
    }
}

impl TableExt for [PodRow] {
    fn render_table(&self) -> String {
        let rows = self
            .iter()
            .map(|pod| {
                [
                    pod.name.clone(),
                    pod.ready.clone(),
                    pod.status.clone(),
                    pod.restarts.to_string(),
                    pod.node.clone(),
                ]
            })
            .collect();
        render(["NAME", "READY", "STATUS", "RESTARTS", "NODE"], rows)
    }
}

impl TableExt for [ServiceRow] {
    fn render_table(&self) -> String {
        let rows = self
            .iter()
            .map(|service| {
                [
                    service.name.clone(),
                    service.type_.clone(),
                    service.cluster_ip.clone(),
                    service.external_ip.clone(),
                    service.ports.clone(),
                ]
            })
            .collect();
        render(["NAME", "TYPE", "CLUSTER-IP", "EXTERNAL-IP", "PORT(S)"], rows)
    }
}
