// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Turning a failed external command into an error worth reading.

use std::process::Output;

#[derive(Debug)]
pub struct CommandFailureInfo {
    command: String,
    status: std::process::ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl std::fmt::Display for CommandFailureInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "Command [{}] executed and failed with status: {}",
            self.command, self.status
        )?;
        write!(f, "  stdout: {}", self.stdout)?;
        write!(f, "  stderr: {}", self.stderr)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    #[error("{0}")]
    CommandFailure(Box<CommandFailureInfo>),
}

pub fn output_to_exec_error(
    command: &std::process::Command,
    output: &Output,
) -> ExecutionError {
    ExecutionError::CommandFailure(Box::new(CommandFailureInfo {
        command: command_to_string(command),
        status: output.status,
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    }))
}

fn command_to_string(command: &std::process::Command) -> String {
    std::iter::once(command.get_program())
        .chain(command.get_args())
        .map(|s| s.to_string_lossy().into())
        .collect::<Vec<String>>()
        .join(" ")
}
