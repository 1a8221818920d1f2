// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Provisioning profiles.

use {
    crate::{
        entitlements::TEAM_IDENTIFIER,
        process::{run_checked, CommandRunner},
        AppleResignError, DistributionType,
    },
    apple_bundles::Platform,
    log::{debug, info, warn},
    std::path::{Path, PathBuf},
};

/// File extension of provisioning profiles.
pub const PROVISIONING_PROFILE_EXTENSION: &str = "provisionprofile";

/// A decoded provisioning profile.
#[derive(Clone, Debug)]
pub struct ProvisioningProfile {
    /// Where the profile was read from.
    pub path: PathBuf,
    /// The decoded profile content.
    pub message: plist::Dictionary,
}

impl ProvisioningProfile {
    /// Construct an instance from decoded plist data.
    pub fn from_plist_data(path: &Path, data: &[u8]) -> Result<Self, AppleResignError> {
        let message = plist::Value::from_reader(std::io::Cursor::new(data))?
            .into_dictionary()
            .ok_or_else(|| AppleResignError::ProvisioningProfileMalformed(path.to_path_buf()))?;

        Ok(Self {
            path: path.to_path_buf(),
            message,
        })
    }

    /// The profile name.
    pub fn name(&self) -> Option<&str> {
        self.message.get("Name").and_then(|v| v.as_string())
    }

    /// Profiles listing devices are for development.
    pub fn profile_type(&self) -> DistributionType {
        if self.message.contains_key("ProvisionedDevices") {
            DistributionType::Development
        } else {
            DistributionType::Distribution
        }
    }

    /// Platforms the profile can be used for.
    pub fn platforms(&self) -> Vec<Platform> {
        if self.message.contains_key("ProvisionsAllDevices") {
            vec![Platform::Darwin]
        } else if self.profile_type() == DistributionType::Distribution {
            vec![Platform::Mas]
        } else {
            vec![Platform::Darwin, Platform::Mas]
        }
    }

    /// Whether the profile is usable for a platform and distribution type.
    pub fn is_suitable(&self, platform: Platform, distribution_type: DistributionType) -> bool {
        self.platforms().contains(&platform) && self.profile_type() == distribution_type
    }

    /// The team identifier from the profile entitlements.
    pub fn team_identifier(&self) -> Option<String> {
        self.message
            .get("Entitlements")
            .and_then(|v| v.as_dictionary())
            .and_then(|d| d.get(TEAM_IDENTIFIER))
            .and_then(|v| v.as_string())
            .map(|s| s.to_string())
    }
}

/// Decode a provisioning profile with `security cms`.
pub fn decode_provisioning_profile(
    runner: &dyn CommandRunner,
    path: &Path,
    keychain: Option<&str>,
) -> Result<ProvisioningProfile, AppleResignError> {
    let mut args = vec![
        "cms".to_string(),
        "-D".to_string(),
        "-i".to_string(),
        path.to_string_lossy().to_string(),
    ];
    if let Some(keychain) = keychain {
        args.push("-k".to_string());
        args.push(keychain.to_string());
    }

    let decoded = run_checked(runner, "security", &args)?;
    let profile = ProvisioningProfile::from_plist_data(path, decoded.as_bytes())?;

    debug!(
        "provisioning profile {}: name={} type={} platforms={:?}",
        path.display(),
        profile.name().unwrap_or("<none>"),
        profile.profile_type(),
        profile.platforms()
    );

    Ok(profile)
}

/// Find provisioning profiles in a directory suitable for a platform and type.
///
/// Profiles are returned in file name order.
pub fn find_provisioning_profiles(
    runner: &dyn CommandRunner,
    dir: &Path,
    platform: Platform,
    distribution_type: DistributionType,
) -> Result<Vec<ProvisioningProfile>, AppleResignError> {
    let mut candidates = vec![];
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();

        if path.is_file()
            && path.extension().and_then(|e| e.to_str()) == Some(PROVISIONING_PROFILE_EXTENSION)
        {
            candidates.push(path);
        }
    }
    candidates.sort();

    let mut res = vec![];
    for path in candidates {
        let profile = decode_provisioning_profile(runner, &path, None)?;

        if profile.is_suitable(platform, distribution_type) {
            res.push(profile);
        } else {
            warn!(
                "ignoring provisioning profile {}; not for {} {}",
                path.display(),
                platform,
                distribution_type
            );
        }
    }

    Ok(res)
}

/// Copy a provisioning profile into an application.
///
/// An existing embedded profile is never replaced. Returns whether the
/// profile was copied.
pub fn embed_provisioning_profile(
    app: &Path,
    profile: &ProvisioningProfile,
) -> Result<bool, AppleResignError> {
    let dest = app.join("Contents").join("embedded.provisionprofile");

    if dest.exists() {
        warn!(
            "{} already exists; remove it manually if it should be replaced",
            dest.display()
        );
        Ok(false)
    } else {
        info!(
            "embedding provisioning profile {} in {}",
            profile.path.display(),
            app.display()
        );
        std::fs::copy(&profile.path, &dest)?;
        Ok(true)
    }
}
