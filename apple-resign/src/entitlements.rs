// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Entitlements handling. */

use {
    crate::{identities::Identity, provisioning::ProvisioningProfile, AppleResignError},
    apple_bundles::{DirectoryBundle, Platform, TEAM_ID_KEY},
    log::{debug, info, warn},
    plist::Value,
    std::{
        collections::HashMap,
        path::{Path, PathBuf},
    },
};

pub const APP_SANDBOX: &str = "com.apple.security.app-sandbox";
pub const APPLICATION_IDENTIFIER: &str = "com.apple.application-identifier";
pub const TEAM_IDENTIFIER: &str = "com.apple.developer.team-identifier";
pub const APPLICATION_GROUPS: &str = "com.apple.security.application-groups";

/// The built-in entitlements profiles.
///
/// Each nested component is signed with the profile matching its role. The
/// helper profiles follow the entitlements Chromium ships for its helpers.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EntitlementsProfile {
    /// Main application, distributed directly.
    Darwin,
    /// Plugin helper, distributed directly.
    DarwinPlugin,
    /// GPU helper, distributed directly.
    DarwinGpu,
    /// Renderer helper, distributed directly.
    DarwinRenderer,
    /// Main application in the Mac App Store.
    Mas,
    /// Anything nested in an application in the Mac App Store.
    MasChild,
}

impl EntitlementsProfile {
    pub const ALL: [Self; 6] = [
        Self::Darwin,
        Self::DarwinPlugin,
        Self::DarwinGpu,
        Self::DarwinRenderer,
        Self::Mas,
        Self::MasChild,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Darwin => "default.darwin.plist",
            Self::DarwinPlugin => "default.darwin.plugin.plist",
            Self::DarwinGpu => "default.darwin.gpu.plist",
            Self::DarwinRenderer => "default.darwin.renderer.plist",
            Self::Mas => "default.mas.plist",
            Self::MasChild => "default.mas.child.plist",
        }
    }

    fn data(&self) -> &'static [u8] {
        match self {
            Self::Darwin => include_bytes!("entitlements/default.darwin.plist"),
            Self::DarwinPlugin => include_bytes!("entitlements/default.darwin.plugin.plist"),
            Self::DarwinGpu => include_bytes!("entitlements/default.darwin.gpu.plist"),
            Self::DarwinRenderer => include_bytes!("entitlements/default.darwin.renderer.plist"),
            Self::Mas => include_bytes!("entitlements/default.mas.plist"),
            Self::MasChild => include_bytes!("entitlements/default.mas.child.plist"),
        }
    }

    /// Select the profile for a path from the role its path implies.
    ///
    /// Helpers are recognized by the `(Plugin).app`, `(GPU).app` and
    /// `(Renderer).app` markers in their bundle names. For the Mac App Store,
    /// everything inside an `.app`, login item helpers included, inherits
    /// the sandbox of its parent.
    pub fn for_path(path: &Path, platform: Platform) -> Self {
        let path = path.to_string_lossy();

        match platform {
            Platform::Darwin => {
                if path.contains("(Plugin).app") {
                    Self::DarwinPlugin
                } else if path.contains("(GPU).app") {
                    Self::DarwinGpu
                } else if path.contains("(Renderer).app") {
                    Self::DarwinRenderer
                } else {
                    Self::Darwin
                }
            }
            Platform::Mas => {
                if path.contains(".app/") {
                    Self::MasChild
                } else {
                    Self::Mas
                }
            }
        }
    }
}

/// The built-in entitlements profiles materialized to a temporary directory.
///
/// The directory also holds entitlements generated while signing and is
/// deleted on drop.
pub struct DefaultEntitlements {
    dir: tempfile::TempDir,
}

impl DefaultEntitlements {
    pub fn new() -> Result<Self, AppleResignError> {
        let dir = tempfile::Builder::new()
            .prefix("apple-resign-entitlements-")
            .tempdir()?;

        for profile in EntitlementsProfile::ALL {
            std::fs::write(dir.path().join(profile.file_name()), profile.data())?;
        }

        Ok(Self { dir })
    }

    /// Directory holding entitlements files.
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Path of a built-in profile.
    pub fn path(&self, profile: EntitlementsProfile) -> PathBuf {
        self.dir.path().join(profile.file_name())
    }
}

/// Read an entitlements plist.
pub fn read_entitlements(path: &Path) -> Result<plist::Dictionary, AppleResignError> {
    Value::from_file(path)?
        .into_dictionary()
        .ok_or_else(|| AppleResignError::EntitlementsMalformed(path.to_path_buf()))
}

/// Write entitlements to a new XML plist in `dir`, returning its path.
pub fn write_entitlements(
    entitlements: &plist::Dictionary,
    dir: &Path,
) -> Result<PathBuf, AppleResignError> {
    let (file, path) = tempfile::Builder::new()
        .prefix("entitlements-")
        .suffix(".plist")
        .tempfile_in(dir)?
        .keep()
        .map_err(|e| e.error)?;

    Value::Dictionary(entitlements.clone()).to_writer_xml(file)?;
    debug!("wrote entitlements {}", path.display());

    Ok(path)
}

/// Write an entitlements plist enabling each of the given keys.
pub fn write_entitlement_keys(keys: &[String], dir: &Path) -> Result<PathBuf, AppleResignError> {
    let entitlements = keys
        .iter()
        .map(|key| (key.clone(), Value::Boolean(true)))
        .collect::<plist::Dictionary>();

    write_entitlements(&entitlements, dir)
}

/// Completes the entitlements of sandboxed applications.
///
/// Sandboxed applications need their team and application identifiers in
/// their entitlements and the application identifier in their application
/// groups. The team identifier is recorded in the application `Info.plist`
/// (see [TEAM_ID_KEY]) if not already there.
///
/// Results are memoized per entitlements file for the lifetime of the
/// instance.
#[derive(Debug, Default)]
pub struct EntitlementsAutomation {
    memo: HashMap<PathBuf, Option<PathBuf>>,
}

impl EntitlementsAutomation {
    /// Complete the given entitlements for signing `app`.
    ///
    /// Returns the path of the completed entitlements, written to
    /// `scratch_dir`, or `None` if the entitlements don't enable the app
    /// sandbox and are used as is.
    pub fn prepare(
        &mut self,
        app: &Path,
        entitlements: &Path,
        identity: &Identity,
        profile: Option<&ProvisioningProfile>,
        scratch_dir: &Path,
    ) -> Result<Option<PathBuf>, AppleResignError> {
        if let Some(res) = self.memo.get(entitlements) {
            return Ok(res.clone());
        }

        let res = complete_entitlements(app, entitlements, identity, profile, scratch_dir)?;
        self.memo.insert(entitlements.to_path_buf(), res.clone());

        Ok(res)
    }
}

fn complete_entitlements(
    app: &Path,
    entitlements_path: &Path,
    identity: &Identity,
    profile: Option<&ProvisioningProfile>,
    scratch_dir: &Path,
) -> Result<Option<PathBuf>, AppleResignError> {
    let mut entitlements = read_entitlements(entitlements_path)?;

    if !matches!(entitlements.get(APP_SANDBOX), Some(Value::Boolean(true))) {
        debug!(
            "{} does not enable the app sandbox; leaving as is",
            entitlements_path.display()
        );
        return Ok(None);
    }

    info!("completing sandbox entitlements {}", entitlements_path.display());

    let mut bundle = DirectoryBundle::new_from_path(app)?;

    let team_id = match bundle.team_id()? {
        Some(team_id) => {
            debug!("{} found in {}: {}", TEAM_ID_KEY, bundle.name(), team_id);
            team_id
        }
        None => {
            let team_id = match profile.and_then(|p| p.team_identifier()) {
                Some(team_id) => {
                    info!("using team identifier {} from provisioning profile", team_id);
                    team_id
                }
                None => {
                    let team_id = identity
                        .team_id()
                        .ok_or_else(|| AppleResignError::TeamIdUnavailable(identity.name.clone()))?;
                    info!("using team identifier {} from signing identity", team_id);
                    team_id.to_string()
                }
            };

            bundle.set_info_plist_key_string(TEAM_ID_KEY, &team_id);
            bundle.write_info_plist()?;
            info!("updated {}", bundle.info_plist_path().display());

            team_id
        }
    };

    let bundle_identifier = bundle
        .identifier()?
        .ok_or_else(|| AppleResignError::BundleIdentifierMissing(bundle.info_plist_path().to_path_buf()))?;
    let app_identifier = format!("{}.{}", team_id, bundle_identifier);

    if !entitlements.contains_key(APPLICATION_IDENTIFIER) {
        debug!("adding {}: {}", APPLICATION_IDENTIFIER, app_identifier);
        entitlements.insert(
            APPLICATION_IDENTIFIER.to_string(),
            Value::String(app_identifier.clone()),
        );
    }

    if !entitlements.contains_key(TEAM_IDENTIFIER) {
        debug!("adding {}: {}", TEAM_IDENTIFIER, team_id);
        entitlements.insert(TEAM_IDENTIFIER.to_string(), Value::String(team_id.clone()));
    }

    match entitlements.get_mut(APPLICATION_GROUPS) {
        Some(Value::Array(groups)) => {
            if !groups
                .iter()
                .any(|group| group.as_string() == Some(app_identifier.as_str()))
            {
                debug!("adding {} to {}", app_identifier, APPLICATION_GROUPS);
                groups.push(Value::String(app_identifier));
            }
        }
        Some(_) => {
            warn!("{} is not an array; leaving as is", APPLICATION_GROUPS);
        }
        None => {
            entitlements.insert(
                APPLICATION_GROUPS.to_string(),
                Value::Array(vec![Value::String(app_identifier)]),
            );
        }
    }

    Ok(Some(write_entitlements(&entitlements, scratch_dir)?))
}
