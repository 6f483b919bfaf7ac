// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Idempotent XDCR configuration driven through the Couchbase
//! administrative CLI.
//!
//! The external tool offers neither a create-if-absent primitive nor
//! machine-parseable output, so idempotency is synthesized here: list the
//! existing resources, match them textually, create only what is missing,
//! and verify each create by the tool's literal success marker rather than
//! by its exit status (the tool can exit zero on a logically-failed
//! operation).

pub mod admin;
pub mod couchbase_cli;
pub mod exec;
pub mod fakes;
pub mod poll;
pub mod readiness;
pub mod reconcile;
pub mod setup;

pub use admin::{XdcrAdmin, XdcrAdminError};
pub use couchbase_cli::CouchbaseCli;
