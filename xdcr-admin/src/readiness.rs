// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Precondition gates: block until a cluster and its buckets are usable.
//!
//! These are the only operations in this crate that retry, and only because
//! they are read-only probes. A cluster that never becomes ready fails the
//! whole run before any mutation is attempted.

use slog::info;
use slog::Logger;
use slog_error_chain::SlogInlineError;
use std::future::Future;
use std::time::Duration;

use crate::admin::XdcrAdmin;
use crate::admin::XdcrAdminError;
use crate::poll;

/// How often to re-probe a target that is not ready yet.
pub const READY_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// How long to wait for a cluster or bucket before giving up.
pub const READY_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, thiserror::Error, SlogInlineError)]
pub enum ReadinessError {
    #[error("{target} was not ready within {elapsed:?}")]
    Timeout { target: String, elapsed: Duration },
    #[error("readiness check for {target} failed")]
    Admin {
        target: String,
        #[source]
        err: XdcrAdminError,
    },
}

/// Block until the cluster behind `admin` reports itself operational.
/// `hostname` is only used to label log and error messages.
pub async fn wait_for_cluster_ready(
    admin: &dyn XdcrAdmin,
    hostname: &str,
    log: &Logger,
) -> Result<(), ReadinessError> {
    let target = format!("cluster {hostname}");
    info!(log, "waiting for cluster"; "cluster" => hostname);
    wait_until_ready(&target, &READY_POLL_INTERVAL, &READY_TIMEOUT, || {
        admin.cluster_ready()
    })
    .await?;
    info!(log, "cluster is ready"; "cluster" => hostname);
    Ok(())
}

/// Block until `bucket` exists and is queryable on the cluster behind
/// `admin`.
pub async fn wait_for_bucket_ready(
    admin: &dyn XdcrAdmin,
    hostname: &str,
    bucket: &str,
    log: &Logger,
) -> Result<(), ReadinessError> {
    let target = format!("bucket {bucket} on {hostname}");
    info!(log, "waiting for bucket"; "cluster" => hostname, "bucket" => bucket);
    wait_until_ready(&target, &READY_POLL_INTERVAL, &READY_TIMEOUT, || {
        admin.bucket_ready(bucket)
    })
    .await?;
    info!(log, "bucket is ready"; "cluster" => hostname, "bucket" => bucket);
    Ok(())
}

async fn wait_until_ready<Func, Fut>(
    target: &str,
    poll_interval: &Duration,
    poll_max: &Duration,
    mut probe: Func,
) -> Result<(), ReadinessError>
where
    Func: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, XdcrAdminError>>,
{
    poll::wait_for_condition(
        || {
            let check = probe();
            async move {
                match check.await {
                    Ok(true) => Ok(()),
                    Ok(false) => Err(poll::CondCheckError::NotYet),
                    Err(err) => Err(poll::CondCheckError::from(err)),
                }
            }
        },
        poll_interval,
        poll_max,
    )
    .await
    .map_err(|err| match err {
        poll::Error::TimedOut(elapsed) => ReadinessError::Timeout {
            target: target.to_string(),
            elapsed,
        },
        poll::Error::PermanentError(err) => ReadinessError::Admin {
            target: target.to_string(),
            err,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::FakeXdcr;

    const SHORT_INTERVAL: Duration = Duration::from_millis(1);
    const SHORT_MAX: Duration = Duration::from_millis(20);

    #[tokio::test]
    async fn gate_times_out_when_cluster_never_ready() {
        let fake = FakeXdcr::new().not_ready();
        let err = wait_until_ready(
            "cluster 10.1.1.2:8091",
            &SHORT_INTERVAL,
            &SHORT_MAX,
            || fake.cluster_ready(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ReadinessError::Timeout { .. }));
    }

    #[tokio::test]
    async fn gate_passes_when_bucket_exists() {
        let fake = FakeXdcr::new().with_bucket("default");
        wait_until_ready(
            "bucket default on 10.1.1.2:8091",
            &SHORT_INTERVAL,
            &SHORT_MAX,
            || fake.bucket_ready("default"),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn gate_times_out_on_missing_bucket() {
        let fake = FakeXdcr::new().with_bucket("default");
        let err = wait_until_ready(
            "bucket other on 10.1.1.2:8091",
            &SHORT_INTERVAL,
            &SHORT_MAX,
            || fake.bucket_ready("other"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ReadinessError::Timeout { .. }));
    }
}
