// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Execution of external tools.

use {
    crate::AppleResignError,
    log::{debug, warn},
    once_cell::sync::Lazy,
};

static SECRET_ARGUMENT: Lazy<regex::Regex> =
    Lazy::new(|| regex::Regex::new(r"(-P |pass:|(?:^| )/p |-pass )([^ ]+)").unwrap());

/// Replace secret values in a rendered command line with `***`.
///
/// Values following `-P `, `pass:`, `-pass ` and a standalone `/p` argument
/// are considered secret.
pub fn redact_arguments(command_line: &str) -> String {
    SECRET_ARGUMENT
        .replace_all(command_line, "${1}***")
        .to_string()
}

/// Captured result of running a program.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CommandOutput {
    pub success: bool,
    /// Human readable exit status.
    pub status: String,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Construct the output of a successful invocation.
    pub fn success(stdout: impl ToString) -> Self {
        Self {
            success: true,
            status: "exit status: 0".into(),
            stdout: stdout.to_string(),
            stderr: String::new(),
        }
    }

    /// Construct the output of a failed invocation.
    pub fn failure(stderr: impl ToString) -> Self {
        Self {
            success: false,
            status: "exit status: 1".into(),
            stdout: String::new(),
            stderr: stderr.to_string(),
        }
    }
}

/// Something that runs external programs.
///
/// A non-zero exit is not an error at this layer: callers decide what a
/// failure means. Only the inability to run the program at all is an error.
pub trait CommandRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, AppleResignError>;
}

/// Runs programs as child processes.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, AppleResignError> {
        debug!(
            "executing {} {}",
            program,
            redact_arguments(&args.join(" "))
        );

        let output = duct::cmd(program, args)
            .stdout_capture()
            .stderr_capture()
            .unchecked()
            .run()
            .map_err(|source| AppleResignError::ProcessSpawn {
                program: program.to_string(),
                source,
            })?;

        let res = CommandOutput {
            success: output.status.success(),
            status: output.status.to_string(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };

        if !res.success {
            debug!("{} stdout> {}", program, res.stdout.trim_end());
            debug!("{} stderr> {}", program, res.stderr.trim_end());
        }

        Ok(res)
    }
}

/// Run a program and require it to succeed, returning its stdout.
pub fn run_checked(
    runner: &dyn CommandRunner,
    program: &str,
    args: &[String],
) -> Result<String, AppleResignError> {
    let output = runner.run(program, args)?;

    if output.success {
        Ok(output.stdout)
    } else {
        warn!("{} failed: {}", program, output.stderr.trim_end());

        Err(AppleResignError::ProcessFailed {
            program: program.to_string(),
            status: output.status,
            stderr: output.stderr.trim_end().to_string(),
        })
    }
}

/// Convert a list of string-like values to owned argument strings.
pub fn arguments<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<std::ffi::OsStr>,
{
    values
        .into_iter()
        .map(|v| v.as_ref().to_string_lossy().to_string())
        .collect()
}
