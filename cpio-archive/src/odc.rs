// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Portable ASCII format / old character / odc archive support.
//!
//! This module implements support for the *Portable ASCII format* as
//! standardized in version 2 of the Single UNIX Specification (SUSv2).
//! It is also commonly referred to as *old character* or *odc*. It is the
//! format used by the `Payload` and `Scripts` files of installer packages.
//!
//! Every member starts with a 76 byte header of fixed-width, zero padded
//! octal ASCII fields:
//!
//! | Field    | Width |
//! |----------|-------|
//! | magic    | 6     |
//! | dev      | 6     |
//! | ino      | 6     |
//! | mode     | 6     |
//! | uid      | 6     |
//! | gid      | 6     |
//! | nlink    | 6     |
//! | rdev     | 6     |
//! | mtime    | 11    |
//! | namesize | 6     |
//! | filesize | 11    |
//!
//! The header is followed by `namesize` bytes of NUL terminated filename and
//! `filesize` bytes of data. The archive ends with a member named
//! `TRAILER!!!`.

use {
    crate::{describe_mode, CpioHeader, CpioResult, Error, FileType, MODE_PERMISSIONS_MASK},
    log::{debug, warn},
    std::{borrow::Cow, io::Write},
};

/// Header magic for odc entries.
pub const MAGIC: &[u8] = b"070707";

/// Size in bytes of an odc header, including the magic.
pub const HEADER_SIZE: usize = 76;

/// Filename of the member terminating an archive.
pub const TRAILER_NAME: &str = "TRAILER!!!";

/// Group ID of the `admin` group on macOS.
pub const ADMIN_GID: u32 = 80;

fn field(data: &[u8], offset: usize, width: usize) -> CpioResult<&str> {
    std::str::from_utf8(&data[offset..offset + width]).map_err(|_| Error::BadHeaderString)
}

fn u32_from_octal(data: &[u8], offset: usize, width: usize) -> CpioResult<u32> {
    let s = field(data, offset, width)?;
    u32::from_str_radix(s, 8).map_err(|_| Error::BadHeaderOctal(s.to_string()))
}

fn u64_from_octal(data: &[u8], offset: usize, width: usize) -> CpioResult<u64> {
    let s = field(data, offset, width)?;
    u64::from_str_radix(s, 8).map_err(|_| Error::BadHeaderOctal(s.to_string()))
}

fn write_octal(writer: &mut impl Write, value: u64, width: usize) -> CpioResult<()> {
    let s = format!("{:0width$o}", value, width = width);

    if s.len() > width {
        return Err(Error::BadHeaderOctal(s));
    }

    writer.write_all(s.as_bytes())?;

    Ok(())
}

/// Compute the group writable equivalent of a mode.
///
/// `755` permissions become `775` and `644` permissions become `664`. All
/// other permissions are returned unchanged. Bits outside the permission
/// bits (file type, setuid, etc) are always preserved.
pub fn group_writable_mode(mode: u32) -> u32 {
    let retained = mode & !MODE_PERMISSIONS_MASK;

    match mode & MODE_PERMISSIONS_MASK {
        0o755 => retained | 0o775,
        0o644 => retained | 0o664,
        _ => mode,
    }
}

/// Parsed portable ASCII format header.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OdcHeader {
    pub dev: u32,
    pub inode: u32,
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    pub nlink: u32,
    pub rdev: u32,
    pub mtime: u64,
    pub name_size: u32,
    pub file_size: u64,
}

impl OdcHeader {
    /// Parse a header from the start of a buffer.
    ///
    /// The buffer must begin with the magic and contain at least
    /// [HEADER_SIZE] bytes.
    pub fn from_bytes(data: &[u8]) -> CpioResult<Self> {
        if data.len() < HEADER_SIZE {
            return Err(Error::TruncatedHeader(data.len()));
        }

        if &data[0..6] != MAGIC {
            return Err(Error::BadMagic);
        }

        Ok(Self {
            dev: u32_from_octal(data, 6, 6)?,
            inode: u32_from_octal(data, 12, 6)?,
            mode: u32_from_octal(data, 18, 6)?,
            uid: u32_from_octal(data, 24, 6)?,
            gid: u32_from_octal(data, 30, 6)?,
            nlink: u32_from_octal(data, 36, 6)?,
            rdev: u32_from_octal(data, 42, 6)?,
            mtime: u64_from_octal(data, 48, 11)?,
            name_size: u32_from_octal(data, 59, 6)?,
            file_size: u64_from_octal(data, 65, 11)?,
        })
    }

    /// Write the header, including the magic, to a writer.
    pub fn write(&self, writer: &mut impl Write) -> CpioResult<()> {
        writer.write_all(MAGIC)?;
        write_octal(writer, self.dev as _, 6)?;
        write_octal(writer, self.inode as _, 6)?;
        write_octal(writer, self.mode as _, 6)?;
        write_octal(writer, self.uid as _, 6)?;
        write_octal(writer, self.gid as _, 6)?;
        write_octal(writer, self.nlink as _, 6)?;
        write_octal(writer, self.rdev as _, 6)?;
        write_octal(writer, self.mtime, 11)?;
        write_octal(writer, self.name_size as _, 6)?;
        write_octal(writer, self.file_size, 11)?;

        Ok(())
    }
}

/// A single member of an odc archive, held in memory.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OdcEntry {
    /// Offset of the header within the buffer this entry was parsed from.
    pub offset: usize,

    /// The parsed header.
    pub header: OdcHeader,

    /// Filename bytes, without the NUL terminator.
    ///
    /// Names are stored undecoded so they are written back verbatim.
    pub name: Vec<u8>,

    /// Raw member data.
    pub data: Vec<u8>,
}

impl OdcEntry {
    /// Parse an entry from the start of `data`.
    ///
    /// `offset` is recorded as the position of `data` in its archive. Returns
    /// the entry and the number of bytes it consumed.
    ///
    /// A data section extending past the end of the buffer retains only the
    /// bytes that are available.
    pub fn from_bytes(data: &[u8], offset: usize) -> CpioResult<(Self, usize)> {
        let header = OdcHeader::from_bytes(data)?;

        let name_end = HEADER_SIZE + header.name_size as usize;
        if data.len() < name_end {
            return Err(Error::TruncatedHeader(data.len()));
        }

        let name = data[HEADER_SIZE..name_end]
            .split(|b| *b == 0)
            .next()
            .unwrap_or_default()
            .to_vec();

        if name == TRAILER_NAME.as_bytes() {
            return Ok((
                Self {
                    offset,
                    header,
                    name,
                    data: vec![],
                },
                name_end,
            ));
        }

        let data_len = usize::try_from(header.file_size).unwrap_or(usize::MAX);
        let data_end = name_end.saturating_add(data_len).min(data.len());

        Ok((
            Self {
                offset,
                header,
                name,
                data: data[name_end..data_end].to_vec(),
            },
            data_end,
        ))
    }

    /// Whether this is the entry terminating the archive.
    pub fn is_trailer(&self) -> bool {
        self.name == TRAILER_NAME.as_bytes()
    }

    /// Rewrite mode and ownership so the installed entry is group writable.
    ///
    /// Only regular files, directories and symlinks are touched. The mode
    /// is mapped via [group_writable_mode]. Entries owned by `root:root`
    /// (uid 0, gid 0) are moved to group [ADMIN_GID]; other ownership is left
    /// alone.
    ///
    /// Returns whether anything changed. Applying this more than once has no
    /// further effect.
    pub fn rewrite_permissions(&mut self) -> bool {
        if !matches!(
            self.file_type(),
            FileType::Regular | FileType::Directory | FileType::Symlink
        ) {
            return false;
        }

        let before = (self.header.mode, self.header.gid);

        self.header.mode = group_writable_mode(self.header.mode);

        if self.header.uid == 0 && self.header.gid == 0 {
            self.header.gid = ADMIN_GID;
        }

        before != (self.header.mode, self.header.gid)
    }

    /// Write this entry to a writer.
    ///
    /// The filename is NUL padded to the header's `name_size`. No header field
    /// is recomputed.
    pub fn write(&self, writer: &mut impl Write) -> CpioResult<()> {
        self.header.write(writer)?;

        let name_size = self.header.name_size as usize;
        let mut name_data = vec![0u8; name_size];
        let name_len = self.name.len().min(name_size);
        name_data[..name_len].copy_from_slice(&self.name[..name_len]);
        writer.write_all(&name_data)?;

        if !self.is_trailer() {
            writer.write_all(&self.data)?;
        }

        Ok(())
    }
}

impl CpioHeader for OdcEntry {
    fn device(&self) -> u32 {
        self.header.dev
    }

    fn inode(&self) -> u32 {
        self.header.inode
    }

    fn mode(&self) -> u32 {
        self.header.mode
    }

    fn uid(&self) -> u32 {
        self.header.uid
    }

    fn gid(&self) -> u32 {
        self.header.gid
    }

    fn nlink(&self) -> u32 {
        self.header.nlink
    }

    fn rdev(&self) -> u32 {
        self.header.rdev
    }

    fn mtime(&self) -> u64 {
        self.header.mtime
    }

    fn file_size(&self) -> u64 {
        self.header.file_size
    }

    fn name(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.name)
    }
}

/// An odc archive parsed entirely into memory.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct OdcArchive {
    entries: Vec<OdcEntry>,

    /// Bytes following the trailer entry (typically block padding).
    trailing: Vec<u8>,
}

impl OdcArchive {
    /// Parse an archive from a buffer.
    ///
    /// Parsing is tolerant: it stops at the first position where a complete
    /// header cannot be read (too few bytes, bad magic, malformed fields) and
    /// returns everything parsed up to that point. Callers must consult
    /// [Self::has_trailer] to know whether the archive was complete.
    pub fn parse(data: &[u8]) -> Self {
        let mut entries = vec![];
        let mut trailing = vec![];
        let mut offset = 0;

        while offset < data.len() {
            match OdcEntry::from_bytes(&data[offset..], offset) {
                Ok((entry, consumed)) => {
                    offset += consumed;

                    if entry.is_trailer() {
                        entries.push(entry);
                        trailing = data[offset..].to_vec();
                        break;
                    }

                    debug!(
                        "cpio found {} (mode: {:06o} = {}, uid = {}, gid = {})",
                        entry.name(),
                        entry.header.mode,
                        describe_mode(entry.header.mode),
                        entry.header.uid,
                        entry.header.gid
                    );
                    entries.push(entry);
                }
                Err(e) => {
                    warn!("stopped reading cpio archive at offset {}: {}", offset, e);
                    break;
                }
            }
        }

        Self { entries, trailing }
    }

    /// The parsed entries, in archive order.
    pub fn entries(&self) -> &[OdcEntry] {
        &self.entries
    }

    /// Mutable access to the parsed entries.
    pub fn entries_mut(&mut self) -> &mut [OdcEntry] {
        &mut self.entries
    }

    /// Whether the archive ended with a trailer entry.
    pub fn has_trailer(&self) -> bool {
        self.entries.last().map(|e| e.is_trailer()).unwrap_or(false)
    }

    /// Apply [OdcEntry::rewrite_permissions] to every entry.
    ///
    /// Returns the number of entries that changed.
    pub fn modify_permissions(&mut self) -> usize {
        let mut changed = 0;

        for entry in self.entries.iter_mut() {
            let old_mode = entry.header.mode;

            if entry.rewrite_permissions() {
                debug!(
                    "cpio rewriting permissions for {} from {} to {} (gid {})",
                    entry.name(),
                    describe_mode(old_mode),
                    describe_mode(entry.header.mode),
                    entry.header.gid
                );
                changed += 1;
            }
        }

        changed
    }

    /// Serialize all entries, in order, to a writer.
    pub fn write(&self, writer: &mut impl Write) -> CpioResult<()> {
        for entry in &self.entries {
            entry.write(writer)?;
        }

        writer.write_all(&self.trailing)?;

        Ok(())
    }

    /// Serialize the archive to a new buffer.
    pub fn rebuild(&self) -> CpioResult<Vec<u8>> {
        let mut buffer = Vec::with_capacity(
            self.entries
                .iter()
                .map(|e| HEADER_SIZE + e.header.name_size as usize + e.data.len())
                .sum::<usize>()
                + self.trailing.len(),
        );
        self.write(&mut buffer)?;

        Ok(buffer)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn member(name: &str, mode: u32, uid: u32, gid: u32, data: &[u8]) -> Vec<u8> {
        let mut res = format!(
            "070707{:06o}{:06o}{:06o}{:06o}{:06o}{:06o}{:06o}{:011o}{:06o}{:011o}",
            0o1000,
            1,
            mode,
            uid,
            gid,
            1,
            0,
            1_600_000_000u64,
            name.len() + 1,
            data.len()
        )
        .into_bytes();
        res.extend_from_slice(name.as_bytes());
        res.push(0);
        res.extend_from_slice(data);

        res
    }

    fn archive_bytes(members: &[Vec<u8>]) -> Vec<u8> {
        let mut res = members.concat();
        res.extend(member(TRAILER_NAME, 0, 0, 0, b""));

        res
    }

    #[test]
    fn parse_single_file() {
        let data = archive_bytes(&[member("test.txt", 0o100644, 0, 0, b"Hello World")]);

        let archive = OdcArchive::parse(&data);
        assert_eq!(archive.entries().len(), 2);
        assert!(archive.has_trailer());

        let entry = &archive.entries()[0];
        assert_eq!(entry.offset, 0);
        assert_eq!(entry.name(), "test.txt");
        assert_eq!(entry.data, b"Hello World");
        assert_eq!(entry.file_size(), 11);
        assert_eq!(entry.file_type(), FileType::Regular);

        let trailer = &archive.entries()[1];
        assert!(trailer.is_trailer());
        assert_eq!(trailer.offset, HEADER_SIZE + 9 + 11);
        assert!(trailer.data.is_empty());
    }

    #[test]
    fn parse_header_fields() {
        let data = archive_bytes(&[member("bin/tool", 0o100755, 501, 20, b"\x00\x01\x02")]);

        let archive = OdcArchive::parse(&data);
        let entry = &archive.entries()[0];

        assert_eq!(entry.device(), 0o1000);
        assert_eq!(entry.inode(), 1);
        assert_eq!(entry.mode(), 0o100755);
        assert_eq!(entry.uid(), 501);
        assert_eq!(entry.gid(), 20);
        assert_eq!(entry.nlink(), 1);
        assert_eq!(entry.rdev(), 0);
        assert_eq!(entry.mtime(), 1_600_000_000);
        assert_eq!(entry.header.name_size, 9);
        assert_eq!(
            entry.modified_time().map(|t| t.timestamp()),
            Some(1_600_000_000)
        );
    }

    #[test]
    fn parse_empty_file() {
        let data = archive_bytes(&[
            member("empty", 0o100644, 0, 0, b""),
            member("next", 0o100644, 0, 0, b"x"),
        ]);

        let archive = OdcArchive::parse(&data);
        assert_eq!(archive.entries().len(), 3);
        assert!(archive.entries()[0].data.is_empty());
        assert_eq!(archive.entries()[1].data, b"x");
    }

    #[test]
    fn invalid_magic() {
        let mut data = archive_bytes(&[member("test.txt", 0o100644, 0, 0, b"Hello")]);
        data[0..6].copy_from_slice(b"123456");

        let archive = OdcArchive::parse(&data);
        assert!(archive.entries().is_empty());
        assert!(!archive.has_trailer());
    }

    #[test]
    fn invalid_magic_mid_archive() {
        let mut data = archive_bytes(&[
            member("a", 0o100644, 0, 0, b"aaa"),
            member("b", 0o100644, 0, 0, b"bbb"),
        ]);
        let second = HEADER_SIZE + 2 + 3;
        data[second..second + 6].copy_from_slice(b"070701");

        let archive = OdcArchive::parse(&data);
        assert_eq!(archive.entries().len(), 1);
        assert_eq!(archive.entries()[0].name(), "a");
        assert!(!archive.has_trailer());
    }

    #[test]
    fn truncated_header() {
        let data = archive_bytes(&[
            member("file1.txt", 0o100644, 0, 0, b"Content 1"),
            member("file2.txt", 0o100644, 0, 0, b"Content 2"),
        ]);

        let archive = OdcArchive::parse(&data[0..40]);
        assert!(archive.entries().is_empty());

        let first_len = HEADER_SIZE + 10 + 9;
        let archive = OdcArchive::parse(&data[0..first_len + 30]);
        assert_eq!(archive.entries().len(), 1);
        assert_eq!(archive.entries()[0].name(), "file1.txt");
        assert!(!archive.has_trailer());
    }

    #[test]
    fn truncated_name() {
        let data = archive_bytes(&[member("a-rather-long-name", 0o100644, 0, 0, b"x")]);

        let archive = OdcArchive::parse(&data[0..HEADER_SIZE + 4]);
        assert!(archive.entries().is_empty());
    }

    #[test]
    fn truncated_data_keeps_available_bytes() {
        let data = archive_bytes(&[member("file", 0o100644, 0, 0, b"0123456789")]);

        let archive = OdcArchive::parse(&data[0..HEADER_SIZE + 5 + 4]);
        assert_eq!(archive.entries().len(), 1);
        assert_eq!(archive.entries()[0].data, b"0123");
        assert_eq!(archive.entries()[0].file_size(), 10);
    }

    #[test]
    fn non_octal_field_stops_parsing() {
        let mut data = archive_bytes(&[member("file", 0o100644, 0, 0, b"x")]);
        data[18..24].copy_from_slice(b"10064x");

        assert!(OdcArchive::parse(&data).entries().is_empty());
    }

    #[test]
    fn special_characters_in_names() {
        let data = archive_bytes(&[member(
            "dir with space/ünïcødé (1).txt",
            0o100644,
            0,
            0,
            b"hi",
        )]);

        let archive = OdcArchive::parse(&data);
        assert_eq!(archive.entries()[0].name(), "dir with space/ünïcødé (1).txt");
        assert_eq!(archive.rebuild().unwrap(), data);
    }

    #[test]
    fn undecodable_names() {
        let mut latin1 = b"./caf".to_vec();
        latin1.push(0xe9);
        latin1.extend_from_slice(b".txt");

        let mut first = format!(
            "070707{:06o}{:06o}{:06o}{:06o}{:06o}{:06o}{:06o}{:011o}{:06o}{:011o}",
            0o1000,
            1,
            0o100644,
            0,
            0,
            1,
            0,
            1_600_000_000u64,
            latin1.len() + 1,
            2
        )
        .into_bytes();
        first.extend_from_slice(&latin1);
        first.push(0);
        first.extend_from_slice(b"hi");

        let data = archive_bytes(&[first, member("./b", 0o100755, 0, 0, b"#!")]);

        let mut archive = OdcArchive::parse(&data);
        assert_eq!(archive.entries().len(), 3);
        assert!(archive.has_trailer());
        assert_eq!(archive.entries()[0].name, latin1);
        assert_eq!(archive.entries()[0].name(), "./caf\u{fffd}.txt");
        assert_eq!(archive.rebuild().unwrap(), data);

        assert_eq!(archive.modify_permissions(), 2);
        let reparsed = OdcArchive::parse(&archive.rebuild().unwrap());
        assert_eq!(reparsed.entries()[0].name, latin1);
        assert_eq!(reparsed.entries()[0].mode(), 0o100664);
        assert_eq!(reparsed.entries()[0].gid(), ADMIN_GID);
    }

    #[test]
    fn rebuild_reproduces_input() {
        let data = archive_bytes(&[
            member(".", 0o040755, 0, 0, b""),
            member("./bin", 0o040755, 0, 0, b""),
            member("./bin/tool", 0o100755, 0, 0, &[0u8, 0xff, 0x7f, 0x80, 0x00]),
            member("./README", 0o100644, 501, 20, b"read me"),
            member("./link", 0o120755, 0, 0, b"bin/tool"),
        ]);

        let archive = OdcArchive::parse(&data);
        assert!(archive.has_trailer());
        assert_eq!(archive.rebuild().unwrap(), data);
    }

    #[test]
    fn rebuild_preserves_block_padding() {
        let mut data = archive_bytes(&[member("file", 0o100644, 0, 0, b"content")]);
        data.resize(512, 0);

        let archive = OdcArchive::parse(&data);
        assert!(archive.has_trailer());
        assert_eq!(archive.rebuild().unwrap(), data);
    }

    #[test]
    fn rebuild_round_trip_after_modification() {
        let data = archive_bytes(&[
            member("a", 0o100755, 0, 0, b"#!/bin/sh\n"),
            member("b", 0o100644, 0, 0, b"text"),
            member("c", 0o100600, 501, 20, b"secret"),
        ]);

        let mut archive = OdcArchive::parse(&data);
        archive.modify_permissions();

        let rebuilt = archive.rebuild().unwrap();
        let reparsed = OdcArchive::parse(&rebuilt);

        assert_eq!(reparsed, archive);
        assert_eq!(reparsed.rebuild().unwrap(), rebuilt);
    }

    #[test]
    fn empty_archive() {
        let archive = OdcArchive::parse(b"");
        assert!(archive.entries().is_empty());
        assert!(archive.rebuild().unwrap().is_empty());

        let data = archive_bytes(&[]);
        let archive = OdcArchive::parse(&data);
        assert_eq!(archive.entries().len(), 1);
        assert!(archive.has_trailer());
        assert_eq!(archive.rebuild().unwrap(), data);
    }

    #[test]
    fn mode_mapping() {
        assert_eq!(group_writable_mode(0o100755), 0o100775);
        assert_eq!(group_writable_mode(0o100644), 0o100664);
        assert_eq!(group_writable_mode(0o100600), 0o100600);
        assert_eq!(group_writable_mode(0o040755), 0o040775);
        assert_eq!(group_writable_mode(0o120644), 0o120664);
        assert_eq!(group_writable_mode(0o104755), 0o104775);
        assert_eq!(group_writable_mode(0o100775), 0o100775);
    }

    #[test]
    fn modify_permissions() {
        let data = archive_bytes(&[
            member("exe", 0o100755, 0, 0, b""),
            member("doc", 0o100644, 0, 0, b""),
            member("private", 0o100600, 0, 0, b""),
            member("dir", 0o040755, 0, 0, b""),
            member("user", 0o100644, 501, 20, b""),
            member("staff", 0o100644, 0, 20, b""),
            member("tty", 0o020644, 0, 0, b""),
        ]);

        let mut archive = OdcArchive::parse(&data);
        assert_eq!(archive.modify_permissions(), 6);

        let modes = archive
            .entries()
            .iter()
            .map(|e| {
                (
                    std::str::from_utf8(&e.name).unwrap(),
                    e.header.mode,
                    e.header.uid,
                    e.header.gid,
                )
            })
            .collect::<Vec<_>>();

        assert_eq!(
            modes,
            vec![
                ("exe", 0o100775, 0, ADMIN_GID),
                ("doc", 0o100664, 0, ADMIN_GID),
                ("private", 0o100600, 0, ADMIN_GID),
                ("dir", 0o040775, 0, ADMIN_GID),
                ("user", 0o100664, 501, 20),
                ("staff", 0o100664, 0, 20),
                ("tty", 0o020644, 0, 0),
                (TRAILER_NAME, 0, 0, 0),
            ]
        );
    }

    #[test]
    fn modify_permissions_idempotent() {
        let data = archive_bytes(&[
            member("exe", 0o100755, 0, 0, b"abc"),
            member("doc", 0o100644, 0, 0, b"def"),
        ]);

        let mut once = OdcArchive::parse(&data);
        once.modify_permissions();

        let mut twice = once.clone();
        assert_eq!(twice.modify_permissions(), 0);
        assert_eq!(twice, once);
        assert_eq!(twice.rebuild().unwrap(), once.rebuild().unwrap());
    }

    #[test]
    fn rewritten_header_bytes() {
        let data = archive_bytes(&[member("exe", 0o100755, 0, 0, b"abc")]);

        let mut archive = OdcArchive::parse(&data);
        archive.modify_permissions();
        let rebuilt = archive.rebuild().unwrap();

        assert_eq!(rebuilt.len(), data.len());
        assert_eq!(&rebuilt[18..24], b"100775");
        assert_eq!(&rebuilt[30..36], b"000120");
        assert_eq!(&rebuilt[0..18], &data[0..18]);
        assert_eq!(&rebuilt[36..], &data[36..]);
    }

    #[test]
    fn oversized_field_rejected_on_write() {
        let data = archive_bytes(&[member("exe", 0o100755, 0, 0, b"abc")]);

        let mut archive = OdcArchive::parse(&data);
        archive.entries_mut()[0].header.uid = 0o7777777;

        assert!(matches!(archive.rebuild(), Err(Error::BadHeaderOctal(_))));
    }
}
