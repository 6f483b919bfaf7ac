// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! [`XdcrAdmin`] implemented by shelling out to `couchbase-cli`.

use async_trait::async_trait;
use camino::Utf8PathBuf;
use slog::debug;
use slog::Logger;
use std::process::Output;
use tokio::process::Command;
use xdcr_admin_types::ClusterEndpoint;
use xdcr_admin_types::ClusterRef;
use xdcr_admin_types::ParseError;
use xdcr_admin_types::RemoteCluster;
use xdcr_admin_types::ReplicationStream;

use crate::admin::XdcrAdmin;
use crate::admin::XdcrAdminError;
use crate::exec::output_to_exec_error;

#[derive(Debug)]
pub struct CouchbaseCli {
    path_to_couchbase_cli: Utf8PathBuf,
    endpoint: ClusterEndpoint,
    log: Logger,
}

impl CouchbaseCli {
    pub fn new(
        path_to_couchbase_cli: Utf8PathBuf,
        endpoint: ClusterEndpoint,
        log: Logger,
    ) -> Self {
        Self { path_to_couchbase_cli, endpoint, log }
    }

    /// Hostname of the cluster this adapter administers.
    pub fn hostname(&self) -> &str {
        &self.endpoint.hostname
    }

    async fn invoke_cli_raw<'a, F, I, T>(
        &self,
        subcommand: &'static str,
        subcommand_args: I,
        parse_output: F,
    ) -> Result<T, XdcrAdminError>
    where
        F: FnOnce(&std::process::Command, &Output) -> Result<T, XdcrAdminError>,
        I: IntoIterator<Item = &'a str>,
    {
        let mut command = Command::new(&self.path_to_couchbase_cli);
        command.arg(subcommand);
        for arg in subcommand_args {
            command.arg(arg);
        }
        command
            .arg("--cluster")
            .arg(&self.endpoint.hostname)
            .arg("--username")
            .arg(&self.endpoint.username)
            .arg("--password")
            .arg(&self.endpoint.password);
        let output = command.output().await.map_err(|err| {
            XdcrAdminError::Invoke { subcommand, err }
        })?;
        parse_output(command.as_std(), &output)
    }

    async fn invoke_cli_checking_status<'a, F, I, T>(
        &self,
        subcommand: &'static str,
        subcommand_args: I,
        parse_output: F,
    ) -> Result<T, XdcrAdminError>
    where
        F: FnOnce(&Output) -> Result<T, XdcrAdminError>,
        I: IntoIterator<Item = &'a str>,
    {
        self.invoke_cli_raw(subcommand, subcommand_args, |command, output| {
            if !output.status.success() {
                return Err(output_to_exec_error(command, output).into());
            }
            parse_output(output)
        })
        .await
    }

    async fn invoke_cli_parsing<'a, F, I, T>(
        &self,
        subcommand: &'static str,
        subcommand_args: I,
        parse_output: F,
    ) -> Result<T, XdcrAdminError>
    where
        F: FnOnce(&[u8]) -> Result<T, ParseError>,
        I: IntoIterator<Item = &'a str>,
    {
        self.invoke_cli_checking_status(
            subcommand,
            subcommand_args,
            |output| {
                parse_output(&output.stdout).map_err(|err| {
                    XdcrAdminError::ParseOutput {
                        stdout: String::from_utf8_lossy(&output.stdout)
                            .to_string(),
                        stderr: String::from_utf8_lossy(&output.stderr)
                            .to_string(),
                        err,
                    }
                })
            },
        )
        .await
    }

    // Create calls are verified by their textual output rather than their
    // exit status (the tool can exit zero on a logically-failed create), so
    // capture stdout and stderr as text no matter how the process exited.
    async fn invoke_cli_capturing_text<'a, I>(
        &self,
        subcommand: &'static str,
        subcommand_args: I,
    ) -> Result<String, XdcrAdminError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.invoke_cli_raw(subcommand, subcommand_args, |_command, output| {
            let mut text =
                String::from_utf8_lossy(&output.stdout).into_owned();
            if !output.stderr.is_empty() {
                text.push_str(&String::from_utf8_lossy(&output.stderr));
            }
            Ok(text)
        })
        .await
    }
}

#[async_trait]
impl XdcrAdmin for CouchbaseCli {
    async fn cluster_ready(&self) -> Result<bool, XdcrAdminError> {
        // A cluster that answers `server-list` is operational; a nonzero
        // exit means "not ready yet", not a hard failure.
        self.invoke_cli_raw("server-list", std::iter::empty(), |_, output| {
            Ok(output.status.success())
        })
        .await
    }

    async fn bucket_ready(
        &self,
        bucket: &str,
    ) -> Result<bool, XdcrAdminError> {
        self.invoke_cli_raw("bucket-list", std::iter::empty(), |_, output| {
            if !output.status.success() {
                return Ok(false);
            }
            // `bucket-list` prints each bucket name at column zero with
            // indented metadata below it.
            let stdout = String::from_utf8_lossy(&output.stdout);
            Ok(stdout.lines().any(|line| line == bucket))
        })
        .await
    }

    async fn list_references(
        &self,
    ) -> Result<Vec<ClusterRef>, XdcrAdminError> {
        debug!(self.log, "listing cluster references");
        self.invoke_cli_parsing("xdcr-setup", ["--list"], ClusterRef::parse_list)
            .await
    }

    async fn create_reference(
        &self,
        dest: &RemoteCluster,
        extra_args: &[String],
    ) -> Result<String, XdcrAdminError> {
        debug!(
            self.log, "creating cluster reference";
            "name" => &dest.name,
            "hostname" => &dest.endpoint.hostname
        );
        let mut args = vec![
            "--create",
            "--xdcr-cluster-name",
            dest.name.as_str(),
            "--xdcr-hostname",
            dest.endpoint.hostname.as_str(),
            "--xdcr-username",
            dest.endpoint.username.as_str(),
            "--xdcr-password",
            dest.endpoint.password.as_str(),
        ];
        args.extend(extra_args.iter().map(String::as_str));
        self.invoke_cli_capturing_text("xdcr-setup", args).await
    }

    async fn list_replications(
        &self,
    ) -> Result<Vec<ReplicationStream>, XdcrAdminError> {
        debug!(self.log, "listing replication streams");
        self.invoke_cli_parsing(
            "xdcr-replicate",
            ["--list"],
            ReplicationStream::parse_list,
        )
        .await
    }

    async fn create_replication(
        &self,
        source_bucket: &str,
        dest_ref_name: &str,
        dest_bucket: &str,
        extra_args: &[String],
    ) -> Result<String, XdcrAdminError> {
        debug!(
            self.log, "creating replication";
            "source_bucket" => source_bucket,
            "dest_ref_name" => dest_ref_name,
            "dest_bucket" => dest_bucket
        );
        let mut args = vec![
            "--create",
            "--xdcr-cluster-name",
            dest_ref_name,
            "--xdcr-from-bucket",
            source_bucket,
            "--xdcr-to-bucket",
            dest_bucket,
        ];
        args.extend(extra_args.iter().map(String::as_str));
        self.invoke_cli_capturing_text("xdcr-replicate", args).await
    }
}
