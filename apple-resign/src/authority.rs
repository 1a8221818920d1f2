// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The external code signing authority.

use {
    crate::{process::CommandRunner, AppleResignError},
    log::{debug, info},
    std::path::Path,
};

/// Something that attaches and checks code signatures.
///
/// Signing is invoked once per path. Errors distinguish a missing target
/// ([AppleResignError::SigningPathNotFound]) from a rejected signature
/// ([AppleResignError::SigningRejected]).
pub trait SigningAuthority {
    /// Sign a path using fully rendered arguments.
    ///
    /// `args` ends with the path itself.
    fn sign(&self, path: &Path, args: &[String]) -> Result<(), AppleResignError>;

    /// Verify the signature of an application.
    fn verify(&self, app: &Path, args: &[String]) -> Result<(), AppleResignError>;

    /// Render the entitlements an application is signed with.
    fn display_entitlements(&self, app: &Path) -> Result<String, AppleResignError>;
}

/// [SigningAuthority] backed by the `codesign` tool.
pub struct Codesign<'a> {
    runner: &'a dyn CommandRunner,
}

impl<'a> Codesign<'a> {
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        Self { runner }
    }
}

impl<'a> SigningAuthority for Codesign<'a> {
    fn sign(&self, path: &Path, args: &[String]) -> Result<(), AppleResignError> {
        if !path.exists() {
            return Err(AppleResignError::SigningPathNotFound(path.to_path_buf()));
        }

        let output = self.runner.run("codesign", args)?;

        if output.success {
            debug!("signed {}", path.display());
            Ok(())
        } else if output.stderr.contains("No such file") {
            Err(AppleResignError::SigningPathNotFound(path.to_path_buf()))
        } else {
            Err(AppleResignError::SigningRejected {
                path: path.to_path_buf(),
                stderr: output.stderr.trim_end().to_string(),
            })
        }
    }

    fn verify(&self, app: &Path, args: &[String]) -> Result<(), AppleResignError> {
        let output = self.runner.run("codesign", args)?;

        if output.success {
            // codesign reports verification results on stderr.
            for line in output.stderr.lines() {
                info!("{}", line);
            }
            Ok(())
        } else {
            Err(AppleResignError::VerificationFailed {
                path: app.to_path_buf(),
                stderr: output.stderr.trim_end().to_string(),
            })
        }
    }

    fn display_entitlements(&self, app: &Path) -> Result<String, AppleResignError> {
        let args = vec![
            "--display".to_string(),
            "--entitlements".to_string(),
            ":-".to_string(),
            app.to_string_lossy().to_string(),
        ];

        crate::process::run_checked(self.runner, "codesign", &args)
    }
}
