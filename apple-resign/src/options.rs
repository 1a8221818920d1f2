// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-file signing options.
//!
//! The options used to sign each path are layered. Every path starts from
//! defaults selected by its container role (see [EntitlementsProfile]). On
//! top of that, [PerFileSignOptions] overrides are applied field by field: a
//! field set in an override replaces the value beneath it and a field left
//! unset keeps it.

use {
    crate::{
        entitlements::{write_entitlement_keys, DefaultEntitlements, EntitlementsProfile},
        AppleResignError,
    },
    apple_bundles::Platform,
    log::debug,
    serde::Deserialize,
    std::{
        fmt::Display,
        path::{Path, PathBuf},
        str::FromStr,
    },
};

/// Whether signing targets development or distribution.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DistributionType {
    Development,
    Distribution,
}

impl Default for DistributionType {
    fn default() -> Self {
        Self::Distribution
    }
}

impl DistributionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Distribution => "distribution",
        }
    }
}

impl Display for DistributionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DistributionType {
    type Err = AppleResignError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "development" => Ok(Self::Development),
            "distribution" => Ok(Self::Distribution),
            _ => Err(AppleResignError::CliBadArgument(format!(
                "type must be either development or distribution; got {}",
                s
            ))),
        }
    }
}

/// Entitlements to sign with.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(untagged)]
pub enum Entitlements {
    /// Entitlement keys, each enabled with a `true` value.
    Keys(Vec<String>),
    /// Path to an entitlements plist.
    Path(PathBuf),
}

/// `codesign --options` flags.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(untagged)]
pub enum SignatureFlags {
    List(Vec<String>),
    /// Comma separated flags, e.g. `kill,library`.
    Comma(String),
}

impl SignatureFlags {
    /// The individual, whitespace trimmed flags.
    pub fn flags(&self) -> Vec<String> {
        let flags: Vec<&str> = match self {
            Self::List(values) => values.iter().map(|s| s.as_str()).collect(),
            Self::Comma(value) => value.split(',').collect(),
        };

        flags
            .into_iter()
            .map(|flag| flag.trim())
            .filter(|flag| !flag.is_empty())
            .map(|flag| flag.to_string())
            .collect()
    }
}

/// Overrides for the options used to sign a path.
///
/// Unset fields leave the underlying value alone.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(default, rename_all = "kebab-case")]
pub struct PerFileSignOptions {
    pub entitlements: Option<Entitlements>,
    pub hardened_runtime: Option<bool>,
    pub requirements: Option<String>,
    pub signature_flags: Option<SignatureFlags>,
    pub timestamp: Option<String>,
    pub additional_arguments: Option<Vec<String>>,
}

impl PerFileSignOptions {
    /// Whether no field is set.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Overlay another set of overrides on this one. Fields set in `other` win.
    pub fn merge(&mut self, other: PerFileSignOptions) {
        if other.entitlements.is_some() {
            self.entitlements = other.entitlements;
        }
        if other.hardened_runtime.is_some() {
            self.hardened_runtime = other.hardened_runtime;
        }
        if other.requirements.is_some() {
            self.requirements = other.requirements;
        }
        if other.signature_flags.is_some() {
            self.signature_flags = other.signature_flags;
        }
        if other.timestamp.is_some() {
            self.timestamp = other.timestamp;
        }
        if other.additional_arguments.is_some() {
            self.additional_arguments = other.additional_arguments;
        }
    }
}

/// The effective options used to sign a single path.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SigningOptionSet {
    pub entitlements: Option<PathBuf>,
    pub hardened_runtime: bool,
    pub requirements: Option<String>,
    pub signature_flags: Vec<String>,
    /// Time-stamp authority. `None` uses the default authority.
    pub timestamp: Option<String>,
    pub additional_arguments: Vec<String>,
}

impl SigningOptionSet {
    /// The defaults for a path given the platform being signed for.
    pub fn defaults_for_path(path: &Path, platform: Platform, defaults: &DefaultEntitlements) -> Self {
        let profile = EntitlementsProfile::for_path(path, platform);
        debug!("{} uses {} entitlements", path.display(), profile.file_name());

        Self {
            entitlements: Some(defaults.path(profile)),
            hardened_runtime: true,
            ..Default::default()
        }
    }

    /// Apply overrides to this option set.
    ///
    /// Entitlements given as keys are written to a new plist in `scratch_dir`.
    pub fn apply(
        &mut self,
        overrides: PerFileSignOptions,
        scratch_dir: &Path,
    ) -> Result<(), AppleResignError> {
        match overrides.entitlements {
            Some(Entitlements::Path(path)) => {
                self.entitlements = Some(path);
            }
            Some(Entitlements::Keys(keys)) => {
                self.entitlements = Some(write_entitlement_keys(&keys, scratch_dir)?);
            }
            None => {}
        }

        if let Some(value) = overrides.hardened_runtime {
            self.hardened_runtime = value;
        }
        if let Some(value) = overrides.requirements {
            self.requirements = Some(value);
        }
        if let Some(value) = overrides.signature_flags {
            self.signature_flags = value.flags();
        }
        if let Some(value) = overrides.timestamp {
            self.timestamp = Some(value);
        }
        if let Some(value) = overrides.additional_arguments {
            self.additional_arguments = value;
        }

        Ok(())
    }
}

/// Strategy providing per-file option overrides.
pub trait OptionsForFile {
    /// Overrides for a path about to be signed.
    fn options_for_file(&self, _path: &Path) -> PerFileSignOptions {
        PerFileSignOptions::default()
    }
}

/// Provides no overrides.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOptionsForFile;

impl OptionsForFile for NoOptionsForFile {}

impl<F> OptionsForFile for F
where
    F: Fn(&Path) -> PerFileSignOptions,
{
    fn options_for_file(&self, path: &Path) -> PerFileSignOptions {
        self(path)
    }
}

/// Compute the effective options for signing a path.
///
/// The role defaults for the path are overlaid with `overrides`, then with
/// what `strategy` returns for the path. Generated entitlements are written
/// to the directory of `defaults`.
pub fn resolve_options(
    path: &Path,
    platform: Platform,
    defaults: &DefaultEntitlements,
    overrides: &PerFileSignOptions,
    strategy: &dyn OptionsForFile,
) -> Result<SigningOptionSet, AppleResignError> {
    let mut res = SigningOptionSet::defaults_for_path(path, platform, defaults);
    res.apply(overrides.clone(), defaults.dir())?;
    res.apply(strategy.options_for_file(path), defaults.dir())?;

    Ok(res)
}

/// A rule in an options file.
#[derive(Clone, Debug, Deserialize)]
pub struct OptionsRule {
    /// Glob pattern matched against paths.
    pub glob: String,
    #[serde(flatten)]
    pub options: PerFileSignOptions,
}

/// Per-file overrides driven by glob rules, usually loaded from YAML.
///
/// ```yaml
/// - glob: "MyApp.app/**/*(GPU).app"
///   hardened-runtime: false
/// - glob: "**/*.dylib"
///   signature-flags: "library"
///   entitlements: [com.apple.security.cs.allow-jit]
/// ```
///
/// Every rule matching a path is applied in file order, so later rules win
/// for the fields they set.
#[derive(Clone, Debug, Default)]
pub struct OptionsRules {
    base: Option<PathBuf>,
    rules: Vec<(glob::Pattern, PerFileSignOptions)>,
}

impl OptionsRules {
    /// Parse rules from YAML.
    pub fn from_yaml(data: &str) -> Result<Self, AppleResignError> {
        let rules: Vec<OptionsRule> = serde_yaml::from_str(data)?;

        Ok(Self {
            base: None,
            rules: rules
                .into_iter()
                .map(|rule| Ok((glob::Pattern::new(&rule.glob)?, rule.options)))
                .collect::<Result<Vec<_>, AppleResignError>>()?,
        })
    }

    /// Load rules from a YAML file.
    pub fn from_path(path: &Path) -> Result<Self, AppleResignError> {
        Self::from_yaml(&std::fs::read_to_string(path)?)
    }

    /// Match patterns against paths relative to a base directory.
    ///
    /// Paths outside the base are matched as given.
    #[must_use]
    pub fn relative_to(mut self, base: impl AsRef<Path>) -> Self {
        self.base = Some(base.as_ref().to_path_buf());
        self
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl OptionsForFile for OptionsRules {
    fn options_for_file(&self, path: &Path) -> PerFileSignOptions {
        let candidate = self
            .base
            .as_ref()
            .and_then(|base| path.strip_prefix(base).ok())
            .unwrap_or(path);

        let mut res = PerFileSignOptions::default();

        for (pattern, options) in &self.rules {
            if pattern.matches_path(candidate) {
                debug!("{} matches options rule {}", candidate.display(), pattern);
                res.merge(options.clone());
            }
        }

        res
    }
}
