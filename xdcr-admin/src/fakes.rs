// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory [`XdcrAdmin`] implementation for tests.

use async_trait::async_trait;
use std::sync::Mutex;
use xdcr_admin_types::ClusterRef;
use xdcr_admin_types::RemoteCluster;
use xdcr_admin_types::ReplicationStream;

use crate::admin::XdcrAdmin;
use crate::admin::XdcrAdminError;
use crate::reconcile::REFERENCE_CREATED_MARKER;
use crate::reconcile::REPLICATION_CREATED_MARKER;

const FAKE_UUID: &str = "07eca2b0974b6c8f674b213d1f44c95c";

/// Arguments of one recorded `create_reference` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceCreate {
    pub name: String,
    pub hostname: String,
    pub extra_args: Vec<String>,
}

/// Arguments of one recorded `create_replication` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicationCreate {
    pub source_bucket: String,
    pub dest_ref_name: String,
    pub dest_bucket: String,
    pub extra_args: Vec<String>,
}

#[derive(Default)]
struct FakeState {
    references: Vec<ClusterRef>,
    streams: Vec<ReplicationStream>,
    reference_creates: Vec<ReferenceCreate>,
    replication_creates: Vec<ReplicationCreate>,
}

/// Fake administrative surface backed by in-memory state.
///
/// Create calls append records exactly as a subsequent list call will
/// report them, and every create is recorded so tests can assert whether
/// (and with what arguments) the create path was taken. The output text of
/// the create calls can be overridden to exercise the verification gate.
pub struct FakeXdcr {
    ready: bool,
    buckets: Vec<String>,
    reference_create_output: Option<String>,
    replication_create_output: Option<String>,
    state: Mutex<FakeState>,
}

impl FakeXdcr {
    pub fn new() -> Self {
        Self {
            ready: true,
            buckets: Vec::new(),
            reference_create_output: None,
            replication_create_output: None,
            state: Mutex::new(FakeState::default()),
        }
    }

    /// The cluster never reports ready.
    pub fn not_ready(mut self) -> Self {
        self.ready = false;
        self
    }

    pub fn with_bucket(mut self, bucket: &str) -> Self {
        self.buckets.push(bucket.to_string());
        self
    }

    /// Seed an existing cluster reference.
    pub fn with_reference(self, name: &str, hostname: &str) -> Self {
        self.state.lock().unwrap().references.push(ClusterRef {
            name: name.to_string(),
            uuid: Some(FAKE_UUID.to_string()),
            hostname: Some(hostname.to_string()),
        });
        self
    }

    /// Seed an existing replication stream.
    pub fn with_stream(self, source: &str, target: &str) -> Self {
        self.state.lock().unwrap().streams.push(ReplicationStream {
            stream_id: format!("{FAKE_UUID}/{source}"),
            status: Some("running".to_string()),
            source: source.to_string(),
            target: target.to_string(),
        });
        self
    }

    /// Override the text returned by `create_reference`, e.g. to omit the
    /// success marker.
    pub fn with_reference_create_output(mut self, output: &str) -> Self {
        self.reference_create_output = Some(output.to_string());
        self
    }

    /// Override the text returned by `create_replication`.
    pub fn with_replication_create_output(mut self, output: &str) -> Self {
        self.replication_create_output = Some(output.to_string());
        self
    }

    pub fn reference_creates(&self) -> Vec<ReferenceCreate> {
        self.state.lock().unwrap().reference_creates.clone()
    }

    pub fn replication_creates(&self) -> Vec<ReplicationCreate> {
        self.state.lock().unwrap().replication_creates.clone()
    }
}

impl Default for FakeXdcr {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl XdcrAdmin for FakeXdcr {
    async fn cluster_ready(&self) -> Result<bool, XdcrAdminError> {
        Ok(self.ready)
    }

    async fn bucket_ready(
        &self,
        bucket: &str,
    ) -> Result<bool, XdcrAdminError> {
        Ok(self.ready && self.buckets.iter().any(|b| b == bucket))
    }

    async fn list_references(
        &self,
    ) -> Result<Vec<ClusterRef>, XdcrAdminError> {
        Ok(self.state.lock().unwrap().references.clone())
    }

    async fn create_reference(
        &self,
        dest: &RemoteCluster,
        extra_args: &[String],
    ) -> Result<String, XdcrAdminError> {
        let mut state = self.state.lock().unwrap();
        state.reference_creates.push(ReferenceCreate {
            name: dest.name.clone(),
            hostname: dest.endpoint.hostname.clone(),
            extra_args: extra_args.to_vec(),
        });
        state.references.push(ClusterRef {
            name: dest.name.clone(),
            uuid: Some(FAKE_UUID.to_string()),
            hostname: Some(dest.endpoint.hostname.clone()),
        });
        Ok(self
            .reference_create_output
            .clone()
            .unwrap_or_else(|| format!("{REFERENCE_CREATED_MARKER}\n")))
    }

    async fn list_replications(
        &self,
    ) -> Result<Vec<ReplicationStream>, XdcrAdminError> {
        Ok(self.state.lock().unwrap().streams.clone())
    }

    async fn create_replication(
        &self,
        source_bucket: &str,
        dest_ref_name: &str,
        dest_bucket: &str,
        extra_args: &[String],
    ) -> Result<String, XdcrAdminError> {
        let mut state = self.state.lock().unwrap();
        state.replication_creates.push(ReplicationCreate {
            source_bucket: source_bucket.to_string(),
            dest_ref_name: dest_ref_name.to_string(),
            dest_bucket: dest_bucket.to_string(),
            extra_args: extra_args.to_vec(),
        });
        state.streams.push(ReplicationStream {
            stream_id: format!(
                "{FAKE_UUID}/{source_bucket}/{dest_bucket}"
            ),
            status: Some("running".to_string()),
            source: source_bucket.to_string(),
            target: format!(
                "/remoteClusters/{FAKE_UUID}/buckets/{dest_bucket}"
            ),
        });
        Ok(self
            .replication_create_output
            .clone()
            .unwrap_or_else(|| format!("{REPLICATION_CREATED_MARKER}\n")))
    }
}
