// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Create-if-absent reconciliation of XDCR resources.
//!
//! Both resource kinds follow the same shape: list what exists, match it
//! textually, create only if absent, and verify the create by the tool's
//! literal success marker. The marker is authoritative and the exit status
//! is not: the external tool has been observed to exit zero on
//! logically-failed operations.
//!
//! Neither operation retries a failed create. Re-invoking the whole tool is
//! the recovery path, and is safe because an ensure that finds its resource
//! already present is a no-op.

use slog::info;
use slog::Logger;
use slog_error_chain::SlogInlineError;
use xdcr_admin_types::RemoteCluster;

use crate::admin::XdcrAdmin;
use crate::admin::XdcrAdminError;

/// Marker printed by `xdcr-setup --create` on success.
pub const REFERENCE_CREATED_MARKER: &str =
    "SUCCESS: Cluster reference created";

/// Marker printed by `xdcr-replicate --create` on success.
pub const REPLICATION_CREATED_MARKER: &str =
    "SUCCESS: XDCR replication created";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureOutcome {
    /// The resource was already present; no create call was made.
    AlreadyExists,
    /// The resource was created and the success marker verified.
    Created,
}

#[derive(Debug, thiserror::Error, SlogInlineError)]
pub enum ReconcileError {
    #[error(transparent)]
    Admin(#[from] XdcrAdminError),
    #[error(
        "{resource} create did not report success; full output:\n{output}"
    )]
    VerificationFailed { resource: &'static str, output: String },
}

/// Register `dest` as a remote cluster reference on the cluster behind
/// `admin`, unless a reference with that exact name already exists.
pub async fn ensure_cluster_reference(
    admin: &dyn XdcrAdmin,
    dest: &RemoteCluster,
    extra_args: &[String],
    log: &Logger,
) -> Result<EnsureOutcome, ReconcileError> {
    let references = admin.list_references().await?;
    if references.iter().any(|r| r.name == dest.name) {
        info!(log, "cluster reference already exists"; "name" => &dest.name);
        return Ok(EnsureOutcome::AlreadyExists);
    }
    let output = admin.create_reference(dest, extra_args).await?;
    if !output.contains(REFERENCE_CREATED_MARKER) {
        return Err(ReconcileError::VerificationFailed {
            resource: "cluster reference",
            output,
        });
    }
    info!(log, "created cluster reference"; "name" => &dest.name);
    Ok(EnsureOutcome::Created)
}

/// Start replicating `source_bucket` into `dest_bucket` through the
/// reference `dest_ref_name`, unless a stream for that (source, destination)
/// bucket pair already exists.
pub async fn ensure_replication(
    admin: &dyn XdcrAdmin,
    source_bucket: &str,
    dest_ref_name: &str,
    dest_bucket: &str,
    extra_args: &[String],
    log: &Logger,
) -> Result<EnsureOutcome, ReconcileError> {
    let streams = admin.list_replications().await?;
    if streams
        .iter()
        .any(|s| s.source == source_bucket && s.replicates_into(dest_bucket))
    {
        info!(
            log, "replication already exists";
            "source_bucket" => source_bucket,
            "dest_bucket" => dest_bucket
        );
        return Ok(EnsureOutcome::AlreadyExists);
    }
    let output = admin
        .create_replication(source_bucket, dest_ref_name, dest_bucket, extra_args)
        .await?;
    if !output.contains(REPLICATION_CREATED_MARKER) {
        return Err(ReconcileError::VerificationFailed {
            resource: "XDCR replication",
            output,
        });
    }
    info!(
        log, "created replication";
        "source_bucket" => source_bucket,
        "dest_bucket" => dest_bucket
    );
    Ok(EnsureOutcome::Created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::FakeXdcr;
    use xdcr_admin_types::ClusterEndpoint;

    fn test_logger() -> Logger {
        Logger::root(slog::Discard, slog::o!())
    }

    fn dest() -> RemoteCluster {
        RemoteCluster {
            name: "west".to_string(),
            endpoint: ClusterEndpoint {
                hostname: "10.2.1.2:8091".to_string(),
                username: "Administrator".to_string(),
                password: "password".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn creates_reference_when_absent() {
        let fake = FakeXdcr::new();
        let outcome =
            ensure_cluster_reference(&fake, &dest(), &[], &test_logger())
                .await
                .unwrap();
        assert_eq!(outcome, EnsureOutcome::Created);
        let creates = fake.reference_creates();
        assert_eq!(creates.len(), 1);
        assert_eq!(creates[0].name, "west");
        assert_eq!(creates[0].hostname, "10.2.1.2:8091");
    }

    #[tokio::test]
    async fn second_ensure_is_a_no_op() {
        let fake = FakeXdcr::new();
        let log = test_logger();
        ensure_cluster_reference(&fake, &dest(), &[], &log).await.unwrap();
        let outcome = ensure_cluster_reference(&fake, &dest(), &[], &log)
            .await
            .unwrap();
        assert_eq!(outcome, EnsureOutcome::AlreadyExists);
        assert_eq!(fake.reference_creates().len(), 1);
    }

    #[tokio::test]
    async fn reference_name_match_is_exact() {
        // An existing `west-2` must not satisfy a check for `west`.
        let fake = FakeXdcr::new().with_reference("west-2", "10.3.1.2:8091");
        let outcome =
            ensure_cluster_reference(&fake, &dest(), &[], &test_logger())
                .await
                .unwrap();
        assert_eq!(outcome, EnsureOutcome::Created);
        assert_eq!(fake.reference_creates().len(), 1);
    }

    #[tokio::test]
    async fn reference_create_forwards_extra_args_in_order() {
        let fake = FakeXdcr::new();
        let extra = vec![
            "--xdcr-encryption-type=half".to_string(),
            "--xdcr-demand-encryption=1".to_string(),
        ];
        ensure_cluster_reference(&fake, &dest(), &extra, &test_logger())
            .await
            .unwrap();
        assert_eq!(fake.reference_creates()[0].extra_args, extra);
    }

    #[tokio::test]
    async fn reference_create_without_marker_fails() {
        let fake = FakeXdcr::new().with_reference_create_output(
            "ERROR: unable to set up xdcr remote site west \
             (400) Bad Request",
        );
        let err =
            ensure_cluster_reference(&fake, &dest(), &[], &test_logger())
                .await
                .unwrap_err();
        match err {
            ReconcileError::VerificationFailed { resource, output } => {
                assert_eq!(resource, "cluster reference");
                assert!(output.contains("Bad Request"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn creates_replication_when_absent() {
        let fake = FakeXdcr::new();
        let outcome = ensure_replication(
            &fake,
            "default",
            "west",
            "default-replica",
            &[],
            &test_logger(),
        )
        .await
        .unwrap();
        assert_eq!(outcome, EnsureOutcome::Created);
        let creates = fake.replication_creates();
        assert_eq!(creates.len(), 1);
        assert_eq!(creates[0].source_bucket, "default");
        assert_eq!(creates[0].dest_ref_name, "west");
        assert_eq!(creates[0].dest_bucket, "default-replica");
    }

    #[tokio::test]
    async fn second_replication_ensure_is_a_no_op() {
        let fake = FakeXdcr::new();
        let log = test_logger();
        ensure_replication(&fake, "default", "west", "default-replica", &[], &log)
            .await
            .unwrap();
        let outcome = ensure_replication(
            &fake,
            "default",
            "west",
            "default-replica",
            &[],
            &log,
        )
        .await
        .unwrap();
        assert_eq!(outcome, EnsureOutcome::AlreadyExists);
        assert_eq!(fake.replication_creates().len(), 1);
    }

    #[tokio::test]
    async fn replication_match_requires_both_source_and_target() {
        // A stream from the same source bucket into a different destination
        // bucket does not suppress creation.
        let fake = FakeXdcr::new().with_stream(
            "default",
            "/remoteClusters/07eca/buckets/other-replica",
        );
        let outcome = ensure_replication(
            &fake,
            "default",
            "west",
            "default-replica",
            &[],
            &test_logger(),
        )
        .await
        .unwrap();
        assert_eq!(outcome, EnsureOutcome::Created);
        assert_eq!(fake.replication_creates().len(), 1);
    }

    #[tokio::test]
    async fn replication_target_match_is_per_path_segment() {
        let fake = FakeXdcr::new().with_stream(
            "default",
            "/remoteClusters/07eca/buckets/bucket-replica-old",
        );
        // `bucket-replica-old` does not match `bucket-replica` ...
        let outcome = ensure_replication(
            &fake,
            "default",
            "west",
            "bucket-replica",
            &[],
            &test_logger(),
        )
        .await
        .unwrap();
        assert_eq!(outcome, EnsureOutcome::Created);

        // ... while an exact final segment does.
        let fake = FakeXdcr::new().with_stream(
            "default",
            "/remoteClusters/07eca/buckets/bucket-replica",
        );
        let outcome = ensure_replication(
            &fake,
            "default",
            "west",
            "bucket-replica",
            &[],
            &test_logger(),
        )
        .await
        .unwrap();
        assert_eq!(outcome, EnsureOutcome::AlreadyExists);
        assert!(fake.replication_creates().is_empty());
    }

    #[tokio::test]
    async fn replication_create_without_marker_fails() {
        let fake = FakeXdcr::new().with_replication_create_output(
            "ERROR: unable to create replication",
        );
        let err = ensure_replication(
            &fake,
            "default",
            "west",
            "default-replica",
            &[],
            &test_logger(),
        )
        .await
        .unwrap_err();
        match err {
            ReconcileError::VerificationFailed { resource, output } => {
                assert_eq!(resource, "XDCR replication");
                assert!(output.contains("unable to create replication"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
