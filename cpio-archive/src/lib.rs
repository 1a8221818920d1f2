// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! cpio archive handling for installer payloads.
//!
//! Installer payloads are cpio archives in the *portable ASCII* (odc) format.
//! This crate parses such archives entirely into memory, allows the
//! permission and ownership fields of members to be rewritten, and serializes
//! the archive back out. Fields that are not rewritten are reproduced
//! byte-for-byte.

pub mod odc;
pub use odc::{OdcArchive, OdcEntry, OdcHeader};

use {
    chrono::{DateTime, TimeZone, Utc},
    std::{borrow::Cow, fmt::Debug},
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bad magic value encountered")]
    BadMagic,

    #[error("value in header is not an ASCII string")]
    BadHeaderString,

    #[error("string value in header is not in octal: {0}")]
    BadHeaderOctal(String),

    #[error("header is truncated: {0} bytes available")]
    TruncatedHeader(usize),

}

/// Result type for this crate.
pub type CpioResult<T> = Result<T, Error>;

/// Mask selecting the file type bits of a mode.
pub const MODE_TYPE_MASK: u32 = 0o170000;

/// Mask selecting the permission bits of a mode.
pub const MODE_PERMISSIONS_MASK: u32 = 0o777;

/// The type of filesystem entry an archive member describes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FileType {
    Socket,
    Symlink,
    Regular,
    Block,
    Directory,
    Character,
    Fifo,
    Unknown,
}

impl FileType {
    /// Resolve the file type from a full mode value.
    pub fn from_mode(mode: u32) -> Self {
        match (mode & MODE_TYPE_MASK) >> 12 {
            0o14 => Self::Socket,
            0o12 => Self::Symlink,
            0o10 => Self::Regular,
            0o06 => Self::Block,
            0o04 => Self::Directory,
            0o02 => Self::Character,
            0o01 => Self::Fifo,
            _ => Self::Unknown,
        }
    }

    /// Short name used when rendering modes.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Socket => "socket",
            Self::Symlink => "symlink",
            Self::Regular => "file",
            Self::Block => "block",
            Self::Directory => "dir",
            Self::Character => "char",
            Self::Fifo => "fifo",
            Self::Unknown => "unknown",
        }
    }
}

/// Render a mode as `<type>:<permissions>`, e.g. `file:755`.
pub fn describe_mode(mode: u32) -> String {
    format!(
        "{}:{:03o}",
        FileType::from_mode(mode).as_str(),
        mode & MODE_PERMISSIONS_MASK
    )
}

/// Common behavior for a header/entry in a cpio archive.
pub trait CpioHeader: Debug {
    /// Device number.
    fn device(&self) -> u32;

    /// Inode number.
    fn inode(&self) -> u32;

    /// File mode.
    fn mode(&self) -> u32;

    /// User ID.
    fn uid(&self) -> u32;

    /// Group ID.
    fn gid(&self) -> u32;

    /// Number of links.
    fn nlink(&self) -> u32;

    /// Associated device number.
    fn rdev(&self) -> u32;

    /// Modified time as seconds since UNIX epoch.
    fn mtime(&self) -> u64;

    /// Modified time as a [DateTime].
    ///
    /// `None` if the stored value is not representable.
    fn modified_time(&self) -> Option<DateTime<Utc>> {
        i64::try_from(self.mtime())
            .ok()
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
    }

    /// File size in bytes.
    fn file_size(&self) -> u64;

    /// File name, with undecodable bytes replaced.
    fn name(&self) -> Cow<'_, str>;

    /// The type of entry, derived from the mode.
    fn file_type(&self) -> FileType {
        FileType::from_mode(self.mode())
    }
}
