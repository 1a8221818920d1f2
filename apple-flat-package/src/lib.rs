// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Apple flat packages.
//!
//! Apple flat packages - often existing as `.pkg` files - are an installer
//! file format used by macOS. Using Apple tooling, *component* packages are
//! built with `pkgbuild` and *product* packages with `productbuild`.
//!
//! ## Components
//!
//! A *component* defines an installable unit. Once expanded (e.g. via
//! `pkgutil --expand`), a *component* is comprised of a set of well-known
//! files:
//!
//! `Bom`
//!    A *bill of materials* describing the contents of the component,
//!    including the mode and ownership every installed file will receive.
//!    `lsbom` dumps it to a text listing and `mkbom -i` rebuilds it from one.
//! `PackageInfo`
//!    An XML file describing the component.
//! `Payload`
//!    A gzip compressed cpio archive containing files comprising the
//!    component. See the `cpio-archive` crate for more on this file format.
//! `Scripts`
//!    A cpio archive containing *scripts* files that run as part of component
//!    processing.
//!
//! # Permission Repair
//!
//! `pkgbuild` captures the mode and ownership of files as they exist on the
//! build machine. Applications that update themselves in place need their
//! installed files to be writable by the `admin` group instead. Both the
//! `Bom` and the `Payload` record this metadata and both must be patched
//! consistently:
//!
//! * [bom] rewrites an `lsbom` listing.
//! * [payload] rewrites the `Payload` cpio archive in place.
//!
//! In both, `755` permissions become `775`, `644` permissions become `664`
//! and `root:wheel` ownership becomes `root:admin`.

pub mod bom;
pub use bom::{rewrite_bom_listing, BomLine};
pub mod payload;
pub use payload::{repair_payload, repair_payload_data};

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cpio archive error: {0}")]
    Cpio(#[from] cpio_archive::Error),

    #[error("payload file does not exist: {}", .0.display())]
    PayloadMissing(PathBuf),

    #[error("failed to decompress payload: {0}")]
    PayloadDecompress(String),

    #[error("payload cpio archive is incomplete: no trailer entry after {0} entries")]
    PayloadTruncated(usize),

    #[error("failed to parse Bom listing line {line_number}: {line:?}")]
    BomLine { line_number: usize, line: String },

    #[error("invalid ownership {uid}/{gid} for {path} in Bom listing; expected 0/0")]
    BomOwnership {
        path: String,
        uid: String,
        gid: String,
    },
}

/// Result type for this crate.
pub type PkgResult<T> = std::result::Result<T, Error>;
