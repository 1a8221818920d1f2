// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Discovery of bundle content needing a code signature.
//!
//! Code signatures are nested: the signature of a container (an `.app` or
//! `.framework`) seals the signatures of everything inside it. So content
//! must be signed strictly before the container holding it. [BundleWalker]
//! finds everything that needs signing and [sort_for_signing] puts it in an
//! order honoring this containment.

use {
    anyhow::{Context, Result},
    log::{debug, info},
    rayon::prelude::*,
    std::{
        cmp::Reverse,
        ffi::OsStr,
        io::Read,
        path::{Path, PathBuf},
    },
};

/// Extension of temporary files `codesign` leaves behind when interrupted.
pub const STALE_SIGNATURE_EXTENSION: &str = "cstemp";

/// Directory extensions denoting nested containers that are signed themselves.
pub const CONTAINER_EXTENSIONS: &[&str] = &["app", "framework"];

/// Number of leading bytes inspected when deciding whether a file is binary.
pub const SNIFF_LENGTH: usize = 512;

/// Default number of files sniffed concurrently.
pub const DEFAULT_SNIFF_CONCURRENCY: usize = 4;

/// Whether a path names a nested container.
pub fn is_container(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .map(|ext| CONTAINER_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

/// Whether the final component of a path starts with a `.`.
pub fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}

/// Heuristically determine whether the leading bytes of a file are binary.
///
/// Text with a byte order mark is never binary. Otherwise any NUL byte makes
/// the data binary, as does more than 10% of the data being control
/// characters or invalid UTF-8.
pub fn is_binary_data(data: &[u8]) -> bool {
    if data.is_empty() {
        return false;
    }

    const TEXT_BOMS: &[&[u8]] = &[
        &[0xef, 0xbb, 0xbf],
        &[0x00, 0x00, 0xfe, 0xff],
        &[0xff, 0xfe, 0x00, 0x00],
        &[0xfe, 0xff],
        &[0xff, 0xfe],
    ];
    if TEXT_BOMS.iter().any(|bom| data.starts_with(bom)) {
        return false;
    }

    if data.starts_with(b"%PDF-") || data.contains(&0) {
        return true;
    }

    let mut suspicious = data
        .iter()
        .filter(|b| (**b < 7 || **b > 13) && **b < 32)
        .count();

    let mut remaining = data;
    while let Err(e) = std::str::from_utf8(remaining) {
        match e.error_len() {
            Some(len) => {
                suspicious += len;
                remaining = &remaining[e.valid_up_to() + len..];
            }
            // Sequence cut off by the end of the sniffed prefix.
            None => break,
        }
    }

    suspicious * 100 / data.len() > 10
}

/// Determine whether a file is binary by sniffing its first [SNIFF_LENGTH] bytes.
pub fn is_binary_file(path: &Path) -> Result<bool> {
    let mut data = Vec::with_capacity(SNIFF_LENGTH);
    std::fs::File::open(path)
        .with_context(|| format!("opening {}", path.display()))?
        .take(SNIFF_LENGTH as u64)
        .read_to_end(&mut data)
        .with_context(|| format!("reading {}", path.display()))?;

    Ok(is_binary_data(&data))
}

/// Number of components in a path.
pub fn path_depth(path: &Path) -> usize {
    path.components().count()
}

/// Sort paths so deeper paths come first.
///
/// The sort is stable: paths of equal depth keep their relative order.
pub fn sort_for_signing(paths: &mut [PathBuf]) {
    paths.sort_by_key(|path| Reverse(path_depth(path)));
}

enum Candidate {
    Container(PathBuf),
    File(PathBuf),
}

/// Finds the content of a directory tree that needs a code signature.
///
/// Traversal is depth-first in file name order and a container is emitted
/// after its content. Emitted are:
///
/// * Regular files whose content is binary, except hidden files.
/// * Directories whose name has one of the [CONTAINER_EXTENSIONS].
///
/// Symlinks are never emitted nor followed. Files with the
/// [STALE_SIGNATURE_EXTENSION] are deleted as they are encountered.
///
/// Files are sniffed for binary content on a bounded thread pool. The output
/// order does not depend on the order in which sniffing completes.
#[derive(Clone, Debug)]
pub struct BundleWalker {
    root: PathBuf,
    concurrency: usize,
}

impl BundleWalker {
    /// Construct a walker rooted at the given directory.
    ///
    /// The root itself is never emitted.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            concurrency: DEFAULT_SNIFF_CONCURRENCY,
        }
    }

    /// Set the maximum number of files sniffed concurrently.
    #[must_use]
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Walk the tree, returning paths in traversal order.
    ///
    /// Feed the result through [sort_for_signing] to obtain a signing order.
    pub fn walk(&self) -> Result<Vec<PathBuf>> {
        info!("walking {}", self.root.display());

        let mut candidates = vec![];

        for entry in walkdir::WalkDir::new(&self.root)
            .min_depth(1)
            .follow_links(false)
            .contents_first(true)
            .sort_by_file_name()
        {
            let entry = entry?;
            let path = entry.path();
            let file_type = entry.file_type();

            if file_type.is_symlink() {
                debug!("ignoring symlink {}", path.display());
            } else if file_type.is_dir() {
                if is_container(path) {
                    candidates.push(Candidate::Container(path.to_path_buf()));
                }
            } else if file_type.is_file() {
                if path.extension() == Some(OsStr::new(STALE_SIGNATURE_EXTENSION)) {
                    info!("removing {}", path.display());
                    std::fs::remove_file(path)
                        .with_context(|| format!("removing {}", path.display()))?;
                } else if is_hidden(path) {
                    debug!("ignoring hidden file {}", path.display());
                } else {
                    candidates.push(Candidate::File(path.to_path_buf()));
                }
            }
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.concurrency)
            .build()?;

        let paths = pool.install(|| {
            candidates
                .into_par_iter()
                .map(|candidate| match candidate {
                    Candidate::Container(path) => Ok(Some(path)),
                    Candidate::File(path) => {
                        if is_binary_file(&path)? {
                            Ok(Some(path))
                        } else {
                            debug!("ignoring non-binary file {}", path.display());
                            Ok(None)
                        }
                    }
                })
                .collect::<Result<Vec<_>>>()
        })?;

        Ok(paths.into_iter().flatten().collect())
    }
}

/// Resolve a relative path against the current directory.
///
/// Symlinks are not resolved.
pub fn absolute_path(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        let cwd = std::env::current_dir().context("resolving current directory")?;

        Ok(cwd.join(path.strip_prefix(".").unwrap_or(path)))
    }
}

/// Walk a directory tree and return the content needing a signature, in
/// signing order.
///
/// Returned paths are absolute, even if `root` is not.
pub fn walk_for_signing(root: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = BundleWalker::new(absolute_path(root)?).walk()?;
    sort_for_signing(&mut paths);

    Ok(paths)
}
