// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bundles backed by a directory.

use {
    crate::BundlePackageType,
    anyhow::{anyhow, Context, Result},
    log::debug,
    std::path::{Path, PathBuf},
};

/// `Info.plist` key recording the team identifier of the signing identity.
pub const TEAM_ID_KEY: &str = "ElectronTeamID";

/// An Apple bundle backed by a filesystem directory.
///
/// Both deep bundles (content under `Contents/`, as macOS applications are laid
/// out) and shallow bundles are supported. The `Info.plist` is parsed on open
/// and held in memory. Mutations are only persisted by
/// [DirectoryBundle::write_info_plist].
#[derive(Clone, Debug)]
pub struct DirectoryBundle {
    root_name: String,
    package_type: BundlePackageType,
    info_plist_path: PathBuf,
    info_plist: plist::Dictionary,
}

impl DirectoryBundle {
    /// Open an existing bundle from a filesystem path.
    ///
    /// The path must be the root directory of the bundle and contain a
    /// parseable `Info.plist` dictionary, either at `Contents/Info.plist`,
    /// `Info.plist` or (for frameworks) `Resources/Info.plist`.
    pub fn new_from_path(directory: &Path) -> Result<Self> {
        if !directory.is_dir() {
            return Err(anyhow!("{} is not a directory", directory.display()));
        }

        let root_name = directory
            .file_name()
            .ok_or_else(|| anyhow!("unable to resolve root directory name"))?
            .to_string_lossy()
            .to_string();

        let shallow = !directory.join("Contents").is_dir();
        let app_plist = if shallow {
            directory.join("Info.plist")
        } else {
            directory.join("Contents").join("Info.plist")
        };
        let framework_plist = directory.join("Resources").join("Info.plist");

        // A `Resources/Info.plist` is only conclusive for frameworks. Checked
        // first because `Foo.framework/Resources` would otherwise look like a
        // shallow bundle.
        let (package_type, info_plist_path) = if framework_plist.is_file() {
            (BundlePackageType::Framework, framework_plist)
        } else if app_plist.is_file() {
            if root_name.ends_with(".app") {
                (BundlePackageType::App, app_plist)
            } else {
                (BundlePackageType::Bundle, app_plist)
            }
        } else {
            return Err(anyhow!(
                "Info.plist not found in {}; not a valid bundle",
                directory.display()
            ));
        };

        let info_plist = plist::Value::from_file(&info_plist_path)
            .with_context(|| format!("parsing {}", info_plist_path.display()))?
            .into_dictionary()
            .ok_or_else(|| anyhow!("{} is not a dictionary", info_plist_path.display()))?;

        debug!(
            "opened {} bundle {}",
            package_type.as_str(),
            directory.display()
        );

        Ok(Self {
            root_name,
            package_type,
            info_plist_path,
            info_plist,
        })
    }

    /// The on-disk name of this bundle, including its `.app`, `.framework`,
    /// etc suffix.
    pub fn name(&self) -> &str {
        &self.root_name
    }

    /// The type of bundle.
    pub fn package_type(&self) -> BundlePackageType {
        self.package_type
    }

    /// Path to the `Info.plist` file.
    pub fn info_plist_path(&self) -> &Path {
        &self.info_plist_path
    }

    /// Obtain an `Info.plist` key as a `String`.
    ///
    /// Returns `None` if the key doesn't exist. Errors if the value is not a
    /// string.
    pub fn info_plist_key_string(&self, key: &str) -> Result<Option<String>> {
        match self.info_plist.get(key) {
            Some(value) => Ok(Some(
                value
                    .as_string()
                    .ok_or_else(|| anyhow!("key {} is not a string", key))?
                    .to_string(),
            )),
            None => Ok(None),
        }
    }

    /// Set a string value in the in-memory `Info.plist`.
    pub fn set_info_plist_key_string(&mut self, key: &str, value: impl ToString) {
        self.info_plist
            .insert(key.to_string(), plist::Value::String(value.to_string()));
    }

    /// Write the in-memory `Info.plist` back to disk as an XML plist.
    pub fn write_info_plist(&self) -> Result<()> {
        plist::Value::Dictionary(self.info_plist.clone())
            .to_file_xml(&self.info_plist_path)
            .with_context(|| format!("writing {}", self.info_plist_path.display()))
    }

    /// The bundle identifier (`CFBundleIdentifier`).
    pub fn identifier(&self) -> Result<Option<String>> {
        self.info_plist_key_string("CFBundleIdentifier")
    }

    /// The team identifier recorded under [TEAM_ID_KEY].
    pub fn team_id(&self) -> Result<Option<String>> {
        self.info_plist_key_string(TEAM_ID_KEY)
    }
}
