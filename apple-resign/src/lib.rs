// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Re-signing and packaging of macOS applications.
//!
//! This crate prepares an existing `.app` bundle for distribution using
//! Apple's own tools. It drives `codesign` over every nested component of an
//! application and wraps signed applications in installer packages with
//! `pkgbuild` and `productbuild`.
//!
//! Cryptography is left entirely to Apple's tools. This crate decides *what*
//! gets signed, in *which order* and with *which options*.
//!
//! # Signing
//!
//! [AppSigner] signs an application described by [SignOptions]:
//!
//! 1. A signing identity is resolved from the keychain (see [identities]).
//! 2. A provisioning profile is embedded, if one is given or discovered
//!    (see [provisioning]).
//! 3. The content of the application is walked for anything carrying code
//!    (see [apple_bundles::BundleWalker]) and ordered deepest first, with the
//!    application itself last.
//! 4. Every path gets its own [SigningOptionSet]: defaults chosen by the role
//!    of the path (main application, GPU/renderer/plugin helper, Mac App Store
//!    child), overlaid with global and per-file overrides (see [options]).
//!    Sandboxed entitlements are completed with team and application
//!    identifiers (see [entitlements]).
//! 5. Each path is handed to the [SigningAuthority]. The first failure aborts.
//! 6. The application is verified and its entitlements are displayed.
//!
//! # Installer Packages
//!
//! [build_pkg] builds a signed product package from an application. With
//! [FlatOptions::open_permissions], the installed files are made writable by
//! the `admin` group by rewriting the component's bill of materials and
//! payload (see the `apple-flat-package` crate).
//!
//! # External Programs
//!
//! All external programs run through a [CommandRunner]. Tests substitute
//! implementations recording invocations so no Apple tooling is needed to
//! exercise this crate.

pub mod authority;
pub use authority::{Codesign, SigningAuthority};
pub mod entitlements;
mod error;
pub use error::*;
pub mod flat;
pub use flat::{build_pkg, FlatOptions, ValidatedFlatOptions};
pub mod identities;
pub use identities::Identity;
pub mod options;
pub use options::{
    DistributionType, Entitlements, NoOptionsForFile, OptionsForFile, OptionsRules,
    PerFileSignOptions, SignatureFlags, SigningOptionSet,
};
pub mod process;
pub use process::{CommandOutput, CommandRunner, SystemCommandRunner};
pub mod provisioning;
pub use provisioning::ProvisioningProfile;
pub mod sign;
pub use sign::{AppSigner, Ignore, SignOptions, StrictVerify, ValidatedSignOptions};
