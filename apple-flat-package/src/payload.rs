// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Rewriting of component `Payload` archives.

use {
    crate::{Error, PkgResult},
    cpio_archive::OdcArchive,
    flate2::{read::MultiGzDecoder, write::GzEncoder, Compression},
    log::{info, warn},
    std::{
        io::{Read, Write},
        path::Path,
    },
};

const GZIP_HEADER: [u8; 3] = [0x1f, 0x8b, 0x08];

/// Decompress gzip compressed payload data.
///
/// Data consisting of several concatenated gzip members decompresses to the
/// concatenation of their content.
fn decompress(data: &[u8]) -> PkgResult<Vec<u8>> {
    if data.len() < GZIP_HEADER.len() || data[0..3] != GZIP_HEADER {
        return Err(Error::PayloadDecompress("data is not gzip compressed".into()));
    }

    let mut res = vec![];
    MultiGzDecoder::new(data)
        .read_to_end(&mut res)
        .map_err(|e| Error::PayloadDecompress(e.to_string()))?;

    Ok(res)
}

/// Compress data with gzip at the maximum compression level.
fn compress(data: &[u8]) -> PkgResult<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(data)?;

    Ok(encoder.finish()?)
}

/// Rewrite the permissions in gzip compressed cpio payload data.
///
/// The data is decompressed, every archive member is passed through
/// [cpio_archive::OdcEntry::rewrite_permissions], and the archive is
/// reserialized and recompressed at maximum compression.
///
/// The archive must be complete (end in a trailer entry).
pub fn repair_payload_data(data: &[u8]) -> PkgResult<Vec<u8>> {
    let cpio_data = decompress(data)?;
    info!("uncompressed payload size: {} bytes", cpio_data.len());

    let mut archive = OdcArchive::parse(&cpio_data);
    if !archive.has_trailer() {
        return Err(Error::PayloadTruncated(archive.entries().len()));
    }

    let changed = archive.modify_permissions();
    info!(
        "rewrote permissions of {} of {} payload entries",
        changed,
        archive.entries().len()
    );

    compress(&archive.rebuild()?)
}

/// Rewrite the permissions of a `Payload` file in place.
///
/// The file is read entirely into memory and only replaced once the new
/// content has been fully produced. The replacement is written to a temporary
/// file in the same directory and renamed over the original, so failures
/// never leave a partially written payload behind.
pub fn repair_payload(path: &Path) -> PkgResult<()> {
    info!("reading payload {}", path.display());
    let data = match std::fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::PayloadMissing(path.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };

    let new_data = repair_payload_data(&data)?;

    if new_data == data {
        warn!("payload {} already has the expected permissions", path.display());
    }

    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let permissions = std::fs::metadata(path)?.permissions();

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(&new_data)?;
    temp.as_file().set_permissions(permissions)?;
    temp.persist(path).map_err(|e| Error::Io(e.error))?;

    info!("wrote payload {}", path.display());

    Ok(())
}
