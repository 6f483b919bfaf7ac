// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The seam between reconciliation logic and the external tool.

use async_trait::async_trait;
use slog_error_chain::SlogInlineError;
use std::io;
use xdcr_admin_types::ClusterRef;
use xdcr_admin_types::ParseError;
use xdcr_admin_types::RemoteCluster;
use xdcr_admin_types::ReplicationStream;

use crate::exec::ExecutionError;

#[derive(Debug, thiserror::Error, SlogInlineError)]
pub enum XdcrAdminError {
    #[error("failed to invoke `couchbase-cli {subcommand}`")]
    Invoke {
        subcommand: &'static str,
        #[source]
        err: io::Error,
    },
    #[error(transparent)]
    Execution(#[from] ExecutionError),
    #[error("failed to parse stdout {stdout:?}, stderr {stderr:?}")]
    ParseOutput {
        stdout: String,
        stderr: String,
        #[source]
        err: ParseError,
    },
}

/// Administrative operations against one cluster endpoint.
///
/// The real implementation ([`crate::couchbase_cli::CouchbaseCli`]) shells
/// out to `couchbase-cli`; [`crate::fakes::FakeXdcr`] backs the same surface
/// with in-memory state so the reconciliation logic can be tested without an
/// external process.
#[async_trait]
pub trait XdcrAdmin: Send + Sync {
    /// Whether the cluster behind this endpoint is up and answering
    /// administrative queries. Read-only; safe to poll.
    async fn cluster_ready(&self) -> Result<bool, XdcrAdminError>;

    /// Whether `bucket` exists and is queryable on this cluster. Read-only;
    /// safe to poll.
    async fn bucket_ready(&self, bucket: &str) -> Result<bool, XdcrAdminError>;

    /// List the remote cluster references registered on this cluster.
    async fn list_references(&self)
        -> Result<Vec<ClusterRef>, XdcrAdminError>;

    /// Register `dest` as a remote cluster reference, forwarding
    /// `extra_args` verbatim to the create call.
    ///
    /// Returns the raw output text. The external tool may exit zero on a
    /// logically-failed create, so callers must judge success by the output,
    /// not by this returning `Ok`.
    async fn create_reference(
        &self,
        dest: &RemoteCluster,
        extra_args: &[String],
    ) -> Result<String, XdcrAdminError>;

    /// List the replication streams configured on this cluster.
    async fn list_replications(
        &self,
    ) -> Result<Vec<ReplicationStream>, XdcrAdminError>;

    /// Start replicating `source_bucket` into `dest_bucket` through the
    /// reference named `dest_ref_name`. Same raw-output contract as
    /// [`Self::create_reference`].
    async fn create_replication(
        &self,
        source_bucket: &str,
        dest_ref_name: &str,
        dest_bucket: &str,
        extra_args: &[String],
    ) -> Result<String, XdcrAdminError>;
}
