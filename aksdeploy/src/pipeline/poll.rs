use std::time::Duration;

use crate::{
    cluster::ClusterOps,
    pipeline::{Error, error},
};

/// Polls `service` every `interval` until it has a load-balancer ingress
/// address.
///
/// Query failures are logged and polled again. Without a `deadline` the loop
/// only ends once an address shows up or the future is dropped.
///
/// # Errors
///
/// Returns [`Error::ExternalIpTimeout`] when `deadline` elapses first.
pub async fn await_external_address<C, F>(
    cluster: &C,
    service: &str,
    interval: Duration,
    deadline: Option<Duration>,
    mut on_pending: F,
) -> Result<String, Error>
where
    C: ClusterOps,
    F: FnMut(u32),
{
    let poll = async {
        let mut attempt = 0_u32;
        loop {
            attempt = attempt.saturating_add(1);
            match cluster.load_balancer_address(service).await {
                Ok(Some(address)) if !address.is_empty() => return address,
                Ok(_) => tracing::debug!("Service {service} has no external address yet"),
                Err(err) => tracing::warn!("Failed to query service {service}: {err}"),
            }
            on_pending(attempt);
            tokio::time::sleep(interval).await;
        }
    };

    match deadline {
        Some(deadline) => tokio::time::timeout(deadline, poll).await.map_err(|_| {
            error::ExternalIpTimeoutSnafu {
                service: service.to_string(),
                timeout_secs: deadline.as_secs(),
            }
            .build()
        }),
        None => Ok(poll.await),
    }
}
