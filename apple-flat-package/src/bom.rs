// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bill of materials listings.
//!
//! `lsbom` emits one line per filesystem entry of the form
//!
//! ```text
//! <path>\t<mode>\t<uid>/<gid>[\t<size>\t<checksum>]
//! ```
//!
//! and `mkbom -i` accepts the same format back. Only the mode and ownership
//! fields are interpreted here. Everything else, including the exact
//! whitespace between fields, is preserved.

use {
    crate::{Error, PkgResult},
    log::debug,
    once_cell::sync::Lazy,
    std::fmt::{Display, Formatter},
};

static BOM_LINE: Lazy<regex::Regex> =
    Lazy::new(|| regex::Regex::new(r"^([^\t]+)(\t+)(\d+)(\s+)(\d+)/(\d+)(.*)$").unwrap());

/// Mode given to the root directory entry of a listing.
pub const ROOT_DIRECTORY_MODE: &str = "40775";

/// Group ID of the `admin` group on macOS.
pub const ADMIN_GID: &str = "80";

/// A single parsed line of an `lsbom` listing.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BomLine {
    pub path: String,
    /// Whitespace between the path and the mode.
    pub path_separator: String,
    /// Octal mode digits, as written.
    pub mode: String,
    /// Whitespace between the mode and the ownership.
    pub mode_separator: String,
    pub uid: String,
    pub gid: String,
    /// Everything following the ownership, verbatim.
    pub trailing: String,
}

impl BomLine {
    /// Parse a listing line.
    ///
    /// Returns `None` if the line doesn't have the expected structure.
    pub fn parse(line: &str) -> Option<Self> {
        let caps = BOM_LINE.captures(line)?;

        Some(Self {
            path: caps[1].to_string(),
            path_separator: caps[2].to_string(),
            mode: caps[3].to_string(),
            mode_separator: caps[4].to_string(),
            uid: caps[5].to_string(),
            gid: caps[6].to_string(),
            trailing: caps[7].to_string(),
        })
    }

    /// Whether the entry is owned by `root:wheel` (`0/0`).
    pub fn is_root_owned(&self) -> bool {
        self.uid == "0" && self.gid == "0"
    }
}

impl Display for BomLine {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{}{}{}{}/{}{}",
            self.path,
            self.path_separator,
            self.mode,
            self.mode_separator,
            self.uid,
            self.gid,
            self.trailing
        )
    }
}

/// Compute the group writable equivalent of a listing mode string.
///
/// Modes ending in `755` become `...775` and modes ending in `644` become
/// `...664`. Other modes are returned unchanged.
pub fn group_writable_mode(mode: &str) -> String {
    if let Some(prefix) = mode.strip_suffix("755") {
        format!("{}775", prefix)
    } else if let Some(prefix) = mode.strip_suffix("644") {
        format!("{}664", prefix)
    } else {
        mode.to_string()
    }
}

fn rewrite_line(index: usize, line: &str) -> PkgResult<String> {
    if line.trim().is_empty() {
        return Ok(line.to_string());
    }

    let mut entry = BomLine::parse(line).ok_or_else(|| Error::BomLine {
        line_number: index + 1,
        line: line.to_string(),
    })?;

    // Listings are generated by mkbom/lsbom immediately before we see them, so
    // anything other than root:wheel means something upstream went wrong.
    if !entry.is_root_owned() {
        return Err(Error::BomOwnership {
            path: entry.path,
            uid: entry.uid,
            gid: entry.gid,
        });
    }

    // The first entry is the root of the installed hierarchy.
    let mode = if index == 0 {
        ROOT_DIRECTORY_MODE.to_string()
    } else {
        group_writable_mode(&entry.mode)
    };

    if mode != entry.mode {
        debug!("Bom permission rewrite {} {} -> {}", entry.path, entry.mode, mode);
    }

    entry.mode = mode;
    entry.gid = ADMIN_GID.to_string();

    Ok(entry.to_string())
}

/// Rewrite an `lsbom` listing so installed files are group writable.
///
/// Every non-blank line must parse and must be owned by `0/0`; violations are
/// errors. Lines are rewritten to `0/80` ownership and their modes mapped via
/// [group_writable_mode], except the first line, which always receives
/// [ROOT_DIRECTORY_MODE]. Blank lines and line separators are preserved.
pub fn rewrite_bom_listing(listing: &str) -> PkgResult<String> {
    Ok(listing
        .split('\n')
        .enumerate()
        .map(|(index, line)| rewrite_line(index, line))
        .collect::<PkgResult<Vec<_>>>()?
        .join("\n"))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_line() {
        let line = BomLine::parse("./MyApp.app/Contents/MacOS/MyApp\t100755\t0/0\t51344\t3340296437")
            .unwrap();

        assert_eq!(line.path, "./MyApp.app/Contents/MacOS/MyApp");
        assert_eq!(line.mode, "100755");
        assert_eq!(line.uid, "0");
        assert_eq!(line.gid, "0");
        assert_eq!(line.trailing, "\t51344\t3340296437");
        assert_eq!(
            line.to_string(),
            "./MyApp.app/Contents/MacOS/MyApp\t100755\t0/0\t51344\t3340296437"
        );

        assert!(BomLine::parse("no tabs here 100644 0/0").is_none());
        assert!(BomLine::parse("./file\tmode\t0/0").is_none());
    }

    #[test]
    fn modes() {
        assert_eq!(group_writable_mode("100755"), "100775");
        assert_eq!(group_writable_mode("100644"), "100664");
        assert_eq!(group_writable_mode("40755"), "40775");
        assert_eq!(group_writable_mode("100600"), "100600");
        assert_eq!(group_writable_mode("120755"), "120775");
    }

    #[test]
    fn rewrite_listing() -> PkgResult<()> {
        let listing = [
            ".\t40755\t0/0",
            "./MyApp.app\t40755\t0/0",
            "./MyApp.app/Contents/Info.plist\t100644\t0/0\t1024\t12345",
            "./MyApp.app/Contents/MacOS/MyApp\t100755\t0/0\t2048\t67890",
            "./MyApp.app/Contents/Resources/secret\t100600\t0/0\t16\t1",
            "",
        ]
        .join("\n");

        let rewritten = rewrite_bom_listing(&listing)?;

        assert_eq!(
            rewritten,
            [
                ".\t40775\t0/80",
                "./MyApp.app\t40775\t0/80",
                "./MyApp.app/Contents/Info.plist\t100664\t0/80\t1024\t12345",
                "./MyApp.app/Contents/MacOS/MyApp\t100775\t0/80\t2048\t67890",
                "./MyApp.app/Contents/Resources/secret\t100600\t0/80\t16\t1",
                "",
            ]
            .join("\n")
        );

        Ok(())
    }

    #[test]
    fn root_always_directory_mode() -> PkgResult<()> {
        assert_eq!(rewrite_bom_listing("./\t40755\t0/0")?, "./\t40775\t0/80");
        assert_eq!(rewrite_bom_listing("./\t40700\t0/0")?, "./\t40775\t0/80");

        Ok(())
    }

    #[test]
    fn whitespace_preserved() -> PkgResult<()> {
        assert_eq!(
            rewrite_bom_listing(".\t40755\t0/0\n./a b\t\t100644   0/0 \t 12\n\n")?,
            ".\t40775\t0/80\n./a b\t\t100664   0/80 \t 12\n\n"
        );

        Ok(())
    }

    #[test]
    fn non_root_ownership_rejected() {
        let res = rewrite_bom_listing(".\t40755\t0/0\n./file\t100644\t501/20");

        match res {
            Err(Error::BomOwnership { path, uid, gid }) => {
                assert_eq!(path, "./file");
                assert_eq!(uid, "501");
                assert_eq!(gid, "20");
            }
            other => panic!("unexpected result: {:?}", other),
        }

        assert!(matches!(
            rewrite_bom_listing("./\t40755\t0/80"),
            Err(Error::BomOwnership { .. })
        ));
    }

    #[test]
    fn malformed_line_rejected() {
        let res = rewrite_bom_listing(".\t40755\t0/0\ngarbage");

        match res {
            Err(Error::BomLine { line_number, line }) => {
                assert_eq!(line_number, 2);
                assert_eq!(line, "garbage");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn idempotent_modes() -> PkgResult<()> {
        let once = rewrite_bom_listing(".\t40755\t0/0\n./f\t100755\t0/0")?;
        let again = rewrite_bom_listing(&once.replace("0/80", "0/0"))?;
        assert_eq!(once, again);

        Ok(())
    }
}
