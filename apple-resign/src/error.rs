// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {std::path::PathBuf, thiserror::Error};

/// Unified error type for application re-signing and packaging.
#[derive(Debug, Error)]
pub enum AppleResignError {
    #[error("unknown command")]
    CliUnknownCommand,

    #[error("bad argument: {0}")]
    CliBadArgument(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("plist error: {0}")]
    Plist(#[from] plist::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("regular expression error: {0}")]
    Regex(#[from] regex::Error),

    #[error("glob pattern error: {0}")]
    GlobPattern(#[from] glob::PatternError),

    #[error("bundle error: {0:#}")]
    DirectoryBundle(#[from] anyhow::Error),

    #[error("flat package error: {0}")]
    FlatPackage(#[from] apple_flat_package::Error),

    #[error("path to application must have the .app extension: {}", .0.display())]
    AppExtension(PathBuf),

    #[error("application at path {} could not be found", .0.display())]
    AppNotFound(PathBuf),

    #[error("additional binary at path {} could not be found", .0.display())]
    BinaryNotFound(PathBuf),

    #[error("output package must have the .pkg extension: {}", .0.display())]
    PkgExtension(PathBuf),

    #[error("no identity found for signing matching {0:?}")]
    NoIdentityFound(String),

    #[error("unable to run {program}: {source}")]
    ProcessSpawn {
        program: String,
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    ProcessFailed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("signing target does not exist: {}", .0.display())]
    SigningPathNotFound(PathBuf),

    #[error("signing rejected for {}: {stderr}", .path.display())]
    SigningRejected { path: PathBuf, stderr: String },

    #[error("signature verification failed for {}: {stderr}", .path.display())]
    VerificationFailed { path: PathBuf, stderr: String },

    #[error("provisioning profile {} is not a dictionary", .0.display())]
    ProvisioningProfileMalformed(PathBuf),

    #[error("entitlements {} is not a dictionary", .0.display())]
    EntitlementsMalformed(PathBuf),

    #[error("unable to determine team identifier from identity {0:?}")]
    TeamIdUnavailable(String),

    #[error("CFBundleIdentifier missing from {}", .0.display())]
    BundleIdentifierMissing(PathBuf),
}
