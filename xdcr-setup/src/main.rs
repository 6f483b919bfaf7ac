// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! CLI for configuring XDCR between two Couchbase clusters.

use anyhow::Context;
use camino::Utf8PathBuf;
use clap::Parser;
use dropshot::ConfigLoggingLevel;
use slog::o;
use slog::Logger;
use xdcr_admin::couchbase_cli::CouchbaseCli;
use xdcr_admin::setup::run_xdcr_setup;
use xdcr_admin::setup::SetupParams;
use xdcr_admin_types::ClusterEndpoint;
use xdcr_admin_types::RemoteCluster;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let args = XdcrSetupApp::parse();

    let log = dropshot::ConfigLogging::StderrTerminal {
        level: args.log_level.clone(),
    }
    .to_logger("xdcr-setup")
    .context("failed to create logger")?;

    args.exec(&log).await
}

/// Configure cross-datacenter replication (XDCR) between two Couchbase
/// clusters: register the destination as a remote cluster reference on the
/// source, then start bucket-level replication. Both steps are idempotent;
/// resources that already exist are detected and left alone, so re-running
/// after a failure is safe.
#[derive(Debug, Parser)]
#[clap(version)]
struct XdcrSetupApp {
    /// Hostname (host:port) of the source cluster
    #[clap(long)]
    src_cluster_hostname: String,

    /// Administrator username for the source cluster
    #[clap(long)]
    src_cluster_username: String,

    /// Administrator password for the source cluster
    #[clap(long)]
    src_cluster_password: String,

    /// Bucket on the source cluster to replicate from
    #[clap(long)]
    src_cluster_bucket_name: String,

    /// Hostname (host:port) of the destination cluster
    #[clap(long)]
    dest_cluster_hostname: String,

    /// Administrator username for the destination cluster
    #[clap(long)]
    dest_cluster_username: String,

    /// Administrator password for the destination cluster
    #[clap(long)]
    dest_cluster_password: String,

    /// Bucket on the destination cluster to replicate into
    #[clap(long)]
    dest_cluster_bucket_name: String,

    /// Name under which the destination cluster is registered on the source
    #[clap(long)]
    dest_cluster_name: String,

    /// Extra KEY=VALUE option forwarded to `xdcr-setup --create` as
    /// `--KEY=VALUE` (repeatable, forwarded in order, not validated here)
    #[clap(long = "setup-arg", value_name = "KEY=VALUE")]
    setup_args: Vec<String>,

    /// Extra KEY=VALUE option forwarded to `xdcr-replicate --create` as
    /// `--KEY=VALUE` (repeatable, forwarded in order, not validated here)
    #[clap(long = "replicate-arg", value_name = "KEY=VALUE")]
    replicate_args: Vec<String>,

    /// Path to the `couchbase-cli` executable
    #[clap(long, default_value = "couchbase-cli")]
    couchbase_cli: Utf8PathBuf,

    /// Log level filter, e.g. debug
    #[clap(long, default_value = "info", value_parser = parse_log_level)]
    log_level: ConfigLoggingLevel,
}

impl XdcrSetupApp {
    async fn exec(self, log: &Logger) -> Result<(), anyhow::Error> {
        let src = CouchbaseCli::new(
            self.couchbase_cli.clone(),
            ClusterEndpoint {
                hostname: self.src_cluster_hostname.clone(),
                username: self.src_cluster_username,
                password: self.src_cluster_password,
            },
            log.new(o!("cluster" => "source")),
        );
        let dest_endpoint = ClusterEndpoint {
            hostname: self.dest_cluster_hostname,
            username: self.dest_cluster_username,
            password: self.dest_cluster_password,
        };
        let dest = CouchbaseCli::new(
            self.couchbase_cli,
            dest_endpoint.clone(),
            log.new(o!("cluster" => "destination")),
        );

        let params = SetupParams {
            src_hostname: self.src_cluster_hostname,
            src_bucket: self.src_cluster_bucket_name,
            dest: RemoteCluster {
                name: self.dest_cluster_name,
                endpoint: dest_endpoint,
            },
            dest_bucket: self.dest_cluster_bucket_name,
            setup_args: passthrough_flags(&self.setup_args),
            replicate_args: passthrough_flags(&self.replicate_args),
        };

        run_xdcr_setup(&src, &dest, &params, log)
            .await
            .context("XDCR setup failed")?;
        Ok(())
    }
}

/// `--setup-arg key=value` becomes the flag `--key=value` on the create
/// call.
fn passthrough_flags(args: &[String]) -> Vec<String> {
    args.iter().map(|arg| format!("--{arg}")).collect()
}

fn parse_log_level(s: &str) -> Result<ConfigLoggingLevel, anyhow::Error> {
    serde_json::from_str(&format!("{s:?}")).context("unsupported log level")
}
