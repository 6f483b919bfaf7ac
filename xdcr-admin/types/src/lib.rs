// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Types describing the administrative surface of a Couchbase cluster.
//!
//! `couchbase-cli` emits human-readable, line-oriented text rather than
//! anything machine-parseable, so the record types here come with parsers
//! over that text. The parsers are deliberately defensive: the output format
//! is documented but informally specified, and lines we don't recognize are
//! ignored rather than rejected.

use serde::{Deserialize, Serialize};

/// Administrative endpoint of a single cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterEndpoint {
    /// `host:port` of the cluster's administration port.
    pub hostname: String,
    pub username: String,
    pub password: String,
}

/// Identity of the remote (destination) cluster as registered on the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCluster {
    /// Display name of the cluster reference. Unique per source cluster.
    pub name: String,
    pub endpoint: ClusterEndpoint,
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("record {record:?} is missing expected field `{field}`")]
    MissingField { record: String, field: &'static str },
}

/// One record of `xdcr-setup --list` output.
///
/// The CLI prints one block per registered reference:
///
/// ```text
/// cluster name: west
///         uuid: 07eca2b0974b6c8f674b213d1f44c95c
///    host name: 10.2.1.2:8091
///    user name: Administrator
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterRef {
    pub name: String,
    pub uuid: Option<String>,
    pub hostname: Option<String>,
}

impl ClusterRef {
    /// Parse the output of `xdcr-setup --list`.
    ///
    /// A record starts at a `cluster name:` line at column zero, and the name
    /// is everything after the literal prefix, so a reference named `west-2`
    /// can never satisfy a lookup for `west`. The indented metadata lines
    /// that follow fill in the optional fields.
    pub fn parse_list(stdout: &[u8]) -> Result<Vec<ClusterRef>, ParseError> {
        let text = String::from_utf8_lossy(stdout);
        let mut refs = Vec::new();
        for line in text.lines() {
            if let Some(name) = line.strip_prefix("cluster name: ") {
                refs.push(ClusterRef {
                    name: name.to_string(),
                    uuid: None,
                    hostname: None,
                });
                continue;
            }
            let Some(current) = refs.last_mut() else {
                continue;
            };
            let trimmed = line.trim_start();
            if let Some(uuid) = trimmed.strip_prefix("uuid: ") {
                current.uuid = Some(uuid.to_string());
            } else if let Some(hostname) = trimmed.strip_prefix("host name: ") {
                current.hostname = Some(hostname.to_string());
            }
        }
        Ok(refs)
    }
}

/// One record of `xdcr-replicate --list` output.
///
/// ```text
/// stream id: 07eca2b0974b6c8f674b213d1f44c95c/default/default-replica
///    status: running
///    source: default
///    target: /remoteClusters/07eca2b0974b6c8f674b213d1f44c95c/buckets/default-replica
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationStream {
    pub stream_id: String,
    pub status: Option<String>,
    /// Name of the bucket being replicated from.
    pub source: String,
    /// Path to the remote bucket; the final path segment is the destination
    /// bucket name.
    pub target: String,
}

impl ReplicationStream {
    /// Parse the output of `xdcr-replicate --list`.
    ///
    /// A record starts at a `stream id:` line; `source` and `target` are
    /// required for a record to be usable, `status` is carried along when
    /// present.
    pub fn parse_list(
        stdout: &[u8],
    ) -> Result<Vec<ReplicationStream>, ParseError> {
        let text = String::from_utf8_lossy(stdout);
        let mut streams = Vec::new();
        let mut current: Option<PartialStream> = None;
        for line in text.lines() {
            let trimmed = line.trim_start();
            if let Some(id) = trimmed.strip_prefix("stream id: ") {
                if let Some(partial) = current.take() {
                    streams.push(partial.finish()?);
                }
                current = Some(PartialStream::new(id));
                continue;
            }
            let Some(partial) = current.as_mut() else {
                continue;
            };
            if let Some(status) = trimmed.strip_prefix("status: ") {
                partial.status = Some(status.to_string());
            } else if let Some(source) = trimmed.strip_prefix("source: ") {
                partial.source = Some(source.to_string());
            } else if let Some(target) = trimmed.strip_prefix("target: ") {
                partial.target = Some(target.to_string());
            }
        }
        if let Some(partial) = current.take() {
            streams.push(partial.finish()?);
        }
        Ok(streams)
    }

    /// Whether this stream replicates into `bucket` on the remote cluster.
    ///
    /// The target is a path like `/remoteClusters/<uuid>/buckets/<bucket>`.
    /// The leading segments include a reference UUID that is not known before
    /// the reference is created, so only the final path segment is compared;
    /// `…/buckets/default-replica-old` does not match `default-replica`.
    pub fn replicates_into(&self, bucket: &str) -> bool {
        self.target
            .rsplit_once('/')
            .is_some_and(|(_, last)| last == bucket)
    }
}

struct PartialStream {
    stream_id: String,
    status: Option<String>,
    source: Option<String>,
    target: Option<String>,
}

impl PartialStream {
    fn new(id: &str) -> Self {
        PartialStream {
            stream_id: id.to_string(),
            status: None,
            source: None,
            target: None,
        }
    }

    fn finish(self) -> Result<ReplicationStream, ParseError> {
        let PartialStream { stream_id, status, source, target } = self;
        let source = source.ok_or_else(|| ParseError::MissingField {
            record: stream_id.clone(),
            field: "source",
        })?;
        let target = target.ok_or_else(|| ParseError::MissingField {
            record: stream_id.clone(),
            field: "target",
        })?;
        Ok(ReplicationStream { stream_id, status, source, target })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REFERENCE_LIST: &str = "\
cluster name: west
     uuid: 07eca2b0974b6c8f674b213d1f44c95c
     host name: 10.2.1.2:8091
     user name: Administrator
cluster name: west-2
     uuid: 332fd2b0974b6c8f674b213d1f44adfe
     host name: 10.3.1.2:8091
     user name: Administrator
";

    const REPLICATION_LIST: &str = "\
stream id: 07eca2b0974b6c8f674b213d1f44c95c/default/default-replica
   status: running
   source: default
   target: /remoteClusters/07eca2b0974b6c8f674b213d1f44c95c/buckets/default-replica
stream id: 07eca2b0974b6c8f674b213d1f44c95c/beer-sample/beer-sample
   status: running
   source: beer-sample
   target: /remoteClusters/07eca2b0974b6c8f674b213d1f44c95c/buckets/beer-sample
";

    #[test]
    fn parses_reference_list() {
        let refs = ClusterRef::parse_list(REFERENCE_LIST.as_bytes()).unwrap();
        assert_eq!(
            refs,
            vec![
                ClusterRef {
                    name: "west".to_string(),
                    uuid: Some(
                        "07eca2b0974b6c8f674b213d1f44c95c".to_string()
                    ),
                    hostname: Some("10.2.1.2:8091".to_string()),
                },
                ClusterRef {
                    name: "west-2".to_string(),
                    uuid: Some(
                        "332fd2b0974b6c8f674b213d1f44adfe".to_string()
                    ),
                    hostname: Some("10.3.1.2:8091".to_string()),
                },
            ]
        );
    }

    #[test]
    fn reference_names_are_exact() {
        let only_west2 = "cluster name: west-2\n     uuid: 332f\n";
        let refs = ClusterRef::parse_list(only_west2.as_bytes()).unwrap();
        assert_eq!(refs.len(), 1);
        assert!(!refs.iter().any(|r| r.name == "west"));
        assert!(refs.iter().any(|r| r.name == "west-2"));
    }

    #[test]
    fn empty_output_has_no_records() {
        assert!(ClusterRef::parse_list(b"").unwrap().is_empty());
        assert!(ReplicationStream::parse_list(b"").unwrap().is_empty());
    }

    #[test]
    fn unrecognized_lines_are_ignored() {
        let noisy = "\
some banner the tool prints
cluster name: east
     uuid: aaaa
     certificate: -----BEGIN CERTIFICATE-----
";
        let refs = ClusterRef::parse_list(noisy.as_bytes()).unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].name, "east");
        assert_eq!(refs[0].uuid.as_deref(), Some("aaaa"));
        assert_eq!(refs[0].hostname, None);
    }

    #[test]
    fn parses_replication_list() {
        let streams =
            ReplicationStream::parse_list(REPLICATION_LIST.as_bytes())
                .unwrap();
        assert_eq!(streams.len(), 2);
        assert_eq!(streams[0].source, "default");
        assert_eq!(streams[0].status.as_deref(), Some("running"));
        assert_eq!(
            streams[0].target,
            "/remoteClusters/07eca2b0974b6c8f674b213d1f44c95c\
/buckets/default-replica"
        );
        assert_eq!(streams[1].source, "beer-sample");
    }

    #[test]
    fn stream_missing_target_is_an_error() {
        let truncated = "\
stream id: abc/default/default-replica
   status: running
   source: default
";
        let err = ReplicationStream::parse_list(truncated.as_bytes())
            .unwrap_err();
        let ParseError::MissingField { record, field } = err;
        assert_eq!(record, "abc/default/default-replica");
        assert_eq!(field, "target");
    }

    #[test]
    fn target_suffix_match_is_per_path_segment() {
        let stream = ReplicationStream {
            stream_id: "abc".to_string(),
            status: None,
            source: "bucket".to_string(),
            target: "/remoteClusters/abc/buckets/bucket-replica-old"
                .to_string(),
        };
        assert!(stream.replicates_into("bucket-replica-old"));
        assert!(!stream.replicates_into("bucket-replica"));
        assert!(!stream.replicates_into("replica-old"));
    }
}
