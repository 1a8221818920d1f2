// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Interface with Apple bundle primitives.
//!
//! This crate knows how to open directory bundles and read/update their
//! `Info.plist`, how to tell which distribution platform an application was
//! built for, and how to enumerate the content of a bundle that needs a code
//! signature, in an order where children come before their containers.

mod directory_bundle;
pub use directory_bundle::*;
mod walk;
pub use walk::*;

use std::{fmt::Display, path::Path, str::FromStr};

/// Denotes the type of a bundle.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BundlePackageType {
    /// Application bundle.
    App,
    /// Framework bundle.
    Framework,
    /// Generic bundle.
    Bundle,
}

impl BundlePackageType {
    /// The 4 character code for this type, as stored in `CFBundlePackageType`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::App => "APPL",
            Self::Framework => "FMWK",
            Self::Bundle => "BNDL",
        }
    }
}

impl Display for BundlePackageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The distribution platform an application bundle targets.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Platform {
    /// Distributed directly (outside the Mac App Store).
    Darwin,
    /// Distributed through the Mac App Store.
    Mas,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Darwin => "darwin",
            Self::Mas => "mas",
        }
    }
}

impl Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "darwin" => Ok(Self::Darwin),
            "mas" => Ok(Self::Mas),
            _ => Err(anyhow::anyhow!(
                "unsupported platform {}; expected darwin or mas",
                s
            )),
        }
    }
}

/// Detect the platform an application bundle was built for.
///
/// Builds that update themselves outside the Mac App Store ship
/// `Contents/Frameworks/Squirrel.framework`. Anything else is assumed to be a
/// Mac App Store build.
pub fn detect_platform(app: &Path) -> Platform {
    if app
        .join("Contents")
        .join("Frameworks")
        .join("Squirrel.framework")
        .exists()
    {
        Platform::Darwin
    } else {
        Platform::Mas
    }
}
