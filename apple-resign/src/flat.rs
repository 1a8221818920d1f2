// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Building installer packages from signed applications.
//!
//! An application is first packaged as a *component* package with
//! `pkgbuild`, which `productbuild` then wraps in a signed *product*
//! package.
//!
//! With [FlatOptions::open_permissions], the component is rewritten between
//! the two steps so installed files are writable by the `admin` group. See
//! the `apple-flat-package` crate.

use {
    crate::{
        identities::{default_installer_identity_search, resolve_identity},
        process::{arguments, run_checked, CommandRunner},
        AppleResignError,
    },
    apple_bundles::{detect_platform, Platform},
    apple_flat_package::{repair_payload, rewrite_bom_listing},
    log::{debug, info, warn},
    std::{
        ffi::OsStr,
        path::{Path, PathBuf},
    },
};

/// Default install location of the application.
pub const DEFAULT_INSTALL_LOCATION: &str = "/Applications";

/// Options controlling the building of an installer package.
#[derive(Clone, Debug)]
pub struct FlatOptions {
    /// The `.app` to package.
    pub app: PathBuf,
    /// Output package. Defaults to `<name>.pkg` next to the application.
    pub pkg: Option<PathBuf>,
    /// Where the application is installed. Defaults to [DEFAULT_INSTALL_LOCATION].
    pub install: Option<PathBuf>,
    pub identity: Option<String>,
    /// Whether `identity` must be found in the keychain.
    pub identity_validation: bool,
    pub keychain: Option<String>,
    /// Detected from the application content when not set.
    pub platform: Option<Platform>,
    /// Directory of installer scripts.
    pub scripts: Option<PathBuf>,
    /// Make installed files writable by the `admin` group.
    pub open_permissions: bool,
}

impl FlatOptions {
    pub fn new(app: impl AsRef<Path>) -> Self {
        Self {
            app: app.as_ref().to_path_buf(),
            pkg: None,
            install: None,
            identity: None,
            identity_validation: true,
            keychain: None,
            platform: None,
            scripts: None,
            open_permissions: false,
        }
    }

    /// Check the options and fill in defaults.
    pub fn validate(self) -> Result<ValidatedFlatOptions, AppleResignError> {
        if self.app.extension().and_then(|e| e.to_str()) != Some("app") {
            return Err(AppleResignError::AppExtension(self.app));
        }
        if !self.app.exists() {
            return Err(AppleResignError::AppNotFound(self.app));
        }

        let name = self
            .app
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .ok_or_else(|| AppleResignError::AppExtension(self.app.clone()))?;
        let dir = self
            .app
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_default();

        let pkg = match self.pkg {
            Some(pkg) => {
                if pkg.extension().and_then(|e| e.to_str()) != Some("pkg") {
                    return Err(AppleResignError::PkgExtension(pkg));
                }
                pkg
            }
            None => {
                let pkg = dir.join(format!("{}.pkg", name));
                warn!("no package path specified; using {}", pkg.display());
                pkg
            }
        };

        let install = match self.install {
            Some(install) => install,
            None => {
                warn!(
                    "no install location specified; using {}",
                    DEFAULT_INSTALL_LOCATION
                );
                PathBuf::from(DEFAULT_INSTALL_LOCATION)
            }
        };

        let platform = match self.platform {
            Some(platform) => platform,
            None => {
                let platform = detect_platform(&self.app);
                info!("no platform specified; detected {}", platform);
                platform
            }
        };

        Ok(ValidatedFlatOptions {
            component: dir.join(format!("{}-component.pkg", name)),
            app: self.app,
            pkg,
            install,
            identity: self.identity,
            identity_validation: self.identity_validation,
            keychain: self.keychain,
            platform,
            scripts: self.scripts,
            open_permissions: self.open_permissions,
        })
    }
}

/// [FlatOptions] that passed validation, with defaults filled in.
#[derive(Clone, Debug)]
pub struct ValidatedFlatOptions {
    pub app: PathBuf,
    pub pkg: PathBuf,
    /// Intermediate component package, next to the application.
    pub component: PathBuf,
    pub install: PathBuf,
    pub identity: Option<String>,
    pub identity_validation: bool,
    pub keychain: Option<String>,
    pub platform: Platform,
    pub scripts: Option<PathBuf>,
    pub open_permissions: bool,
}

/// Build a signed installer package for an application.
///
/// Returns the path of the package.
pub fn build_pkg(
    runner: &dyn CommandRunner,
    options: &ValidatedFlatOptions,
) -> Result<PathBuf, AppleResignError> {
    let identity = resolve_identity(
        runner,
        options.keychain.as_deref(),
        options.identity.as_deref(),
        options.identity_validation,
        default_installer_identity_search(options.platform),
    )?;

    info!(
        "building {} from {} (install location {})",
        options.pkg.display(),
        options.app.display(),
        options.install.display()
    );

    let built = build_component_and_product(runner, options, &identity.name);

    if options.component.exists() {
        debug!("removing {}", options.component.display());
        let removed = std::fs::remove_file(&options.component);

        match (&built, removed) {
            (Ok(()), removed) => removed?,
            (Err(_), Err(e)) => warn!(
                "unable to remove {}: {}",
                options.component.display(),
                e
            ),
            (Err(_), Ok(())) => {}
        }
    }

    built?;

    info!("built {}", options.pkg.display());

    Ok(options.pkg.clone())
}

fn build_component_and_product(
    runner: &dyn CommandRunner,
    options: &ValidatedFlatOptions,
    identity: &str,
) -> Result<(), AppleResignError> {
    let mut args = vec![];
    if let Some(scripts) = &options.scripts {
        args.push("--scripts".to_string());
        args.push(scripts.to_string_lossy().to_string());
    }
    args.extend(arguments([
        OsStr::new("--install-location"),
        options.install.as_os_str(),
        OsStr::new("--component"),
        options.app.as_os_str(),
        options.component.as_os_str(),
    ]));

    info!("building component package {}", options.component.display());
    run_checked(runner, "pkgbuild", &args)?;

    if options.open_permissions {
        open_component_permissions(runner, &options.component)?;
    }

    let mut args = vec![];
    if let Some(keychain) = &options.keychain {
        args.push("--keychain".to_string());
        args.push(keychain.clone());
    }
    args.extend(arguments([
        OsStr::new("--package"),
        options.component.as_os_str(),
        options.install.as_os_str(),
        OsStr::new("--sign"),
        OsStr::new(identity),
        options.pkg.as_os_str(),
    ]));

    info!("building product package {}", options.pkg.display());
    run_checked(runner, "productbuild", &args)?;

    Ok(())
}

/// Rewrite a component package so its content installs group writable.
///
/// The component is expanded and its `Bom` listing and `Payload` archive are
/// rewritten. The result is flattened next to the component and then renamed
/// over it, so the component is untouched if any step fails.
pub fn open_component_permissions(
    runner: &dyn CommandRunner,
    component: &Path,
) -> Result<(), AppleResignError> {
    let work = tempfile::Builder::new()
        .prefix("apple-resign-flat-")
        .tempdir()?;
    let expanded = work.path().join("expanded");
    let bom = expanded.join("Bom");
    let listing_path = work.path().join("bom.txt");

    info!("opening permissions of {}", component.display());

    run_checked(
        runner,
        "pkgutil",
        &arguments([OsStr::new("--expand"), component.as_os_str(), expanded.as_os_str()]),
    )?;

    let listing = run_checked(runner, "lsbom", &arguments([&bom]))?;
    let listing = rewrite_bom_listing(&listing)?;
    debug!("rewritten bill of materials:\n{}", listing.trim_end());

    std::fs::write(&listing_path, listing)?;
    std::fs::remove_file(&bom)?;
    run_checked(
        runner,
        "mkbom",
        &arguments([OsStr::new("-i"), listing_path.as_os_str(), bom.as_os_str()]),
    )?;

    repair_payload(&expanded.join("Payload"))?;

    let flattened = flattened_path(component);
    if let Err(e) = run_checked(
        runner,
        "pkgutil",
        &arguments([OsStr::new("--flatten"), expanded.as_os_str(), flattened.as_os_str()]),
    ) {
        if flattened.exists() {
            std::fs::remove_file(&flattened)?;
        }
        return Err(e);
    }

    std::fs::rename(&flattened, component)?;

    Ok(())
}

/// Where a rewritten component is flattened before replacing the original.
fn flattened_path(component: &Path) -> PathBuf {
    let stem = component
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();

    component.with_file_name(format!("{}-flattened.pkg", stem))
}
