// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The full setup sequence: readiness gates, then reconciliation.

use slog::Logger;
use slog_error_chain::SlogInlineError;
use xdcr_admin_types::RemoteCluster;

use crate::admin::XdcrAdmin;
use crate::readiness;
use crate::readiness::ReadinessError;
use crate::reconcile;
use crate::reconcile::ReconcileError;

/// Everything one invocation needs, built once from the command line and
/// never mutated.
#[derive(Debug, Clone)]
pub struct SetupParams {
    /// Hostname of the source cluster. Used to label log and error
    /// messages; the admin handles carry the credentials.
    pub src_hostname: String,
    /// Bucket on the source cluster to replicate from.
    pub src_bucket: String,
    /// Identity under which the destination is registered on the source.
    pub dest: RemoteCluster,
    /// Bucket on the destination cluster to replicate into.
    pub dest_bucket: String,
    /// Flags forwarded verbatim to `xdcr-setup --create`.
    pub setup_args: Vec<String>,
    /// Flags forwarded verbatim to `xdcr-replicate --create`.
    pub replicate_args: Vec<String>,
}

#[derive(Debug, thiserror::Error, SlogInlineError)]
pub enum SetupError {
    #[error(transparent)]
    Readiness(#[from] ReadinessError),
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}

/// Configure XDCR from the cluster behind `src` into the cluster behind
/// `dest`.
///
/// Both clusters and both buckets must be ready before anything is created;
/// then the cluster reference is ensured, then the replication stream. Each
/// phase either succeeds or aborts the run, so a readiness failure happens
/// before any mutation and a reconcile failure leaves at most
/// already-verified resources behind. Re-running after a failure is safe.
pub async fn run_xdcr_setup(
    src: &dyn XdcrAdmin,
    dest: &dyn XdcrAdmin,
    params: &SetupParams,
    log: &Logger,
) -> Result<(), SetupError> {
    readiness::wait_for_cluster_ready(src, &params.src_hostname, log).await?;
    readiness::wait_for_bucket_ready(
        src,
        &params.src_hostname,
        &params.src_bucket,
        log,
    )
    .await?;
    readiness::wait_for_cluster_ready(
        dest,
        &params.dest.endpoint.hostname,
        log,
    )
    .await?;
    readiness::wait_for_bucket_ready(
        dest,
        &params.dest.endpoint.hostname,
        &params.dest_bucket,
        log,
    )
    .await?;

    reconcile::ensure_cluster_reference(
        src,
        &params.dest,
        &params.setup_args,
        log,
    )
    .await?;
    reconcile::ensure_replication(
        src,
        &params.src_bucket,
        &params.dest.name,
        &params.dest_bucket,
        &params.replicate_args,
        log,
    )
    .await?;
    Ok(())
}
