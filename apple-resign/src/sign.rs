// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Signing of application bundles.
//!
//! Signing an application means signing everything nested in it that can
//! carry a code signature before signing the application itself. Apple's
//! tooling rejects a container whose content isn't signed yet, so paths are
//! signed deepest first and the application root always comes last.
//!
//! Every path is signed with its own [SigningOptionSet], computed by
//! [resolve_options]. Signing stops at the first failure. Signatures already
//! applied are left in place: signing again simply replaces them.

use {
    crate::{
        authority::SigningAuthority,
        entitlements::{DefaultEntitlements, EntitlementsAutomation},
        identities::{default_application_identity_search, resolve_identity, Identity},
        options::{
            resolve_options, NoOptionsForFile, OptionsForFile, PerFileSignOptions,
            SigningOptionSet,
        },
        process::{run_checked, CommandRunner},
        provisioning::{
            decode_provisioning_profile, embed_provisioning_profile, find_provisioning_profiles,
            ProvisioningProfile,
        },
        AppleResignError, DistributionType,
    },
    apple_bundles::{
        absolute_path, detect_platform, sort_for_signing, walk_for_signing, Platform,
    },
    log::{debug, info, warn},
    regex::Regex,
    semver::Version,
    std::{
        collections::HashSet,
        path::{Path, PathBuf},
    },
};

/// Host release from which the hardened runtime is available (macOS 10.13.6).
pub const HARDENED_RUNTIME_HOST_RELEASE: Version = Version::new(17, 7, 0);

/// Host release from which `codesign --verify --strict` is available (OS X 10.11).
pub const STRICT_VERIFY_HOST_RELEASE: Version = Version::new(15, 0, 0);

/// Framework version from which entitlements automation applies.
pub const PRE_AUTO_ENTITLEMENTS_VERSION: Version = Version::new(1, 1, 1);

/// A rule excluding paths from signing.
pub enum Ignore {
    /// Paths whose string form matches the expression are ignored.
    Pattern(Regex),
    /// Paths for which the function returns true are ignored.
    Predicate(Box<dyn Fn(&Path) -> bool>),
}

impl std::fmt::Debug for Ignore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pattern(re) => f.debug_tuple("Pattern").field(&re.as_str()).finish(),
            Self::Predicate(_) => f.write_str("Predicate"),
        }
    }
}

impl Ignore {
    /// Construct an instance from a regular expression.
    pub fn pattern(expression: &str) -> Result<Self, AppleResignError> {
        Ok(Self::Pattern(Regex::new(expression)?))
    }

    pub fn matches(&self, path: &Path) -> bool {
        match self {
            Self::Pattern(re) => re.is_match(&path.to_string_lossy()),
            Self::Predicate(f) => f(path),
        }
    }
}

/// How strictly the signed application is verified.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum StrictVerify {
    Disabled,
    /// `--strict`.
    Enabled,
    /// `--strict=<list>`, e.g. `symlinks,sideband`.
    Requirements(Vec<String>),
}

impl Default for StrictVerify {
    fn default() -> Self {
        Self::Enabled
    }
}

/// Options controlling the signing of an application.
pub struct SignOptions {
    /// The `.app` to sign.
    pub app: PathBuf,
    /// Additional paths signed along with the content of the application.
    pub binaries: Vec<PathBuf>,
    pub keychain: Option<String>,
    /// Identity to sign with. Searched for in the keychain by substring.
    pub identity: Option<String>,
    /// Whether `identity` must be found in the keychain.
    pub identity_validation: bool,
    /// Detected from the application content when not set.
    pub platform: Option<Platform>,
    pub distribution_type: DistributionType,
    pub ignore: Vec<Ignore>,
    pub strict_verify: StrictVerify,
    pub pre_auto_entitlements: bool,
    pub pre_embed_provisioning_profile: bool,
    pub provisioning_profile: Option<PathBuf>,
    /// Directory searched for provisioning profiles when none is given.
    ///
    /// Defaults to the current directory.
    pub provisioning_profile_search_dir: Option<PathBuf>,
    /// Version of the framework the application is built on.
    pub version: Option<Version>,
    /// Overrides applied to the options of every path.
    pub overrides: PerFileSignOptions,
    /// Overrides applied per path, on top of `overrides`.
    pub options_for_file: Box<dyn OptionsForFile>,
}

impl SignOptions {
    /// Default options for signing an application.
    pub fn new(app: impl AsRef<Path>) -> Self {
        Self {
            app: app.as_ref().to_path_buf(),
            binaries: vec![],
            keychain: None,
            identity: None,
            identity_validation: true,
            platform: None,
            distribution_type: DistributionType::default(),
            ignore: vec![],
            strict_verify: StrictVerify::default(),
            pre_auto_entitlements: true,
            pre_embed_provisioning_profile: true,
            provisioning_profile: None,
            provisioning_profile_search_dir: None,
            version: None,
            overrides: PerFileSignOptions::default(),
            options_for_file: Box::new(NoOptionsForFile),
        }
    }

    /// Check the options and resolve the platform.
    ///
    /// The application and binary paths are made absolute.
    pub fn validate(mut self) -> Result<ValidatedSignOptions, AppleResignError> {
        if self.app.extension().and_then(|e| e.to_str()) != Some("app") {
            return Err(AppleResignError::AppExtension(self.app));
        }
        if !self.app.exists() {
            return Err(AppleResignError::AppNotFound(self.app));
        }
        if let Some(binary) = self.binaries.iter().find(|binary| !binary.exists()) {
            return Err(AppleResignError::BinaryNotFound(binary.clone()));
        }

        self.app = absolute_path(&self.app)?;
        self.binaries = self
            .binaries
            .iter()
            .map(|binary| absolute_path(binary))
            .collect::<anyhow::Result<Vec<_>>>()?;

        let platform = match self.platform {
            Some(platform) => platform,
            None => {
                let platform = detect_platform(&self.app);
                info!("no platform specified; detected {}", platform);
                platform
            }
        };

        Ok(ValidatedSignOptions {
            options: self,
            platform,
        })
    }
}

/// [SignOptions] that passed validation.
pub struct ValidatedSignOptions {
    options: SignOptions,
    platform: Platform,
}

impl ValidatedSignOptions {
    pub fn app(&self) -> &Path {
        &self.options.app
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn options(&self) -> &SignOptions {
        &self.options
    }

    fn is_ignored(&self, path: &Path) -> bool {
        self.options.ignore.iter().any(|ignore| ignore.matches(path))
    }
}

/// Release of the host operating system kernel.
///
/// `None` if it can't be determined, which callers treat as a recent host.
pub fn host_os_release(runner: &dyn CommandRunner) -> Option<Version> {
    let release = match run_checked(runner, "uname", &["-r".to_string()]) {
        Ok(release) => release,
        Err(e) => {
            warn!("unable to determine host OS release: {}", e);
            return None;
        }
    };

    match Version::parse(release.trim()) {
        Ok(version) => {
            debug!("host OS release {}", version);
            Some(version)
        }
        Err(e) => {
            warn!("unable to parse host OS release {:?}: {}", release.trim(), e);
            None
        }
    }
}

fn host_at_least(host: Option<&Version>, minimum: &Version) -> bool {
    host.map(|host| host >= minimum).unwrap_or(true)
}

/// The paths to sign in signing order.
///
/// The content of the application and the additional binaries come deepest
/// first and the application itself comes last.
pub fn signing_order(app: &Path, binaries: &[PathBuf]) -> Result<Vec<PathBuf>, AppleResignError> {
    let mut paths = walk_for_signing(&app.join("Contents"))?;
    paths.extend(binaries.iter().cloned());
    sort_for_signing(&mut paths);
    paths.push(app.to_path_buf());

    Ok(paths)
}

/// Render the arguments to sign a path.
pub fn codesign_arguments(
    identity: &Identity,
    keychain: Option<&str>,
    options: &SigningOptionSet,
    host: Option<&Version>,
    path: &Path,
) -> Vec<String> {
    let mut args = vec![
        "--sign".to_string(),
        identity.signing_reference().to_string(),
        "--force".to_string(),
        "--deep".to_string(),
    ];

    if let Some(keychain) = keychain {
        args.push("--keychain".to_string());
        args.push(keychain.to_string());
    }

    if let Some(requirements) = &options.requirements {
        args.push("--requirements".to_string());
        args.push(requirements.clone());
    }

    match &options.timestamp {
        Some(timestamp) => args.push(format!("--timestamp={}", timestamp)),
        None => args.push("--timestamp".to_string()),
    }

    let mut flags = options.signature_flags.clone();

    if options.hardened_runtime || flags.iter().any(|flag| flag == "runtime") {
        if host_at_least(host, &HARDENED_RUNTIME_HOST_RELEASE) {
            flags.push("runtime".to_string());
        } else {
            debug!(
                "not enabling hardened runtime for {}; host release too old",
                path.display()
            );
            flags.retain(|flag| flag != "runtime");
        }
    }

    let mut seen = HashSet::new();
    flags.retain(|flag| seen.insert(flag.clone()));

    if !flags.is_empty() {
        args.push("--options".to_string());
        args.push(flags.join(","));
    }

    args.extend(options.additional_arguments.iter().cloned());

    if let Some(entitlements) = &options.entitlements {
        args.push("--entitlements".to_string());
        args.push(entitlements.to_string_lossy().to_string());
    }

    args.push(path.to_string_lossy().to_string());

    args
}

/// Render the arguments to verify a signed application.
pub fn verify_arguments(strict: &StrictVerify, host: Option<&Version>, app: &Path) -> Vec<String> {
    let mut args = vec!["--verify".to_string(), "--deep".to_string()];

    if !host_at_least(host, &STRICT_VERIFY_HOST_RELEASE) {
        debug!("strict verification unavailable on this host");
    } else {
        match strict {
            StrictVerify::Disabled => {}
            StrictVerify::Requirements(requirements) if !requirements.is_empty() => {
                args.push(format!("--strict={}", requirements.join(",")));
            }
            StrictVerify::Enabled | StrictVerify::Requirements(_) => {
                args.push("--strict".to_string());
            }
        }
    }

    args.push("--verbose=2".to_string());
    args.push(app.to_string_lossy().to_string());

    args
}

/// Signs applications.
pub struct AppSigner<'a> {
    runner: &'a dyn CommandRunner,
    authority: &'a dyn SigningAuthority,
}

impl<'a> AppSigner<'a> {
    /// Construct an instance.
    ///
    /// `runner` runs the keychain and host queries. `authority` signs.
    pub fn new(runner: &'a dyn CommandRunner, authority: &'a dyn SigningAuthority) -> Self {
        Self { runner, authority }
    }

    /// Sign an application and verify the result.
    pub fn sign(&self, options: &ValidatedSignOptions) -> Result<(), AppleResignError> {
        let app = options.app();
        let platform = options.platform();
        let opts = options.options();
        let keychain = opts.keychain.as_deref();

        info!(
            "signing {} for {} {}",
            app.display(),
            platform,
            opts.distribution_type
        );

        let identity = resolve_identity(
            self.runner,
            keychain,
            opts.identity.as_deref(),
            opts.identity_validation,
            default_application_identity_search(platform, opts.distribution_type),
        )?;

        let profile = match &opts.provisioning_profile {
            Some(path) => Some(decode_provisioning_profile(self.runner, path, keychain)?),
            None => None,
        };

        if opts.pre_embed_provisioning_profile {
            self.embed_profile(options, profile.as_ref())?;
        } else {
            warn!("provisioning profile embedding disabled");
        }

        let automate_entitlements = if !opts.pre_auto_entitlements {
            warn!("entitlements automation disabled");
            false
        } else if let Some(version) = &opts.version {
            let enabled = version >= &PRE_AUTO_ENTITLEMENTS_VERSION;
            if !enabled {
                info!(
                    "entitlements automation requires version {} or newer; have {}",
                    PRE_AUTO_ENTITLEMENTS_VERSION, version
                );
            }
            enabled
        } else {
            true
        };

        let host = host_os_release(self.runner);
        let defaults = DefaultEntitlements::new()?;
        let mut automation = EntitlementsAutomation::default();
        let mut root_entitlements = false;

        for path in signing_order(app, &opts.binaries)? {
            if options.is_ignored(&path) {
                info!("skipping {}", path.display());
                continue;
            }

            let mut set = resolve_options(
                &path,
                platform,
                &defaults,
                &opts.overrides,
                opts.options_for_file.as_ref(),
            )?;

            if automate_entitlements {
                if let Some(entitlements) = &set.entitlements {
                    if let Some(completed) = automation.prepare(
                        app,
                        entitlements,
                        &identity,
                        profile.as_ref(),
                        defaults.dir(),
                    )? {
                        set.entitlements = Some(completed);
                    }
                }
            }

            let args = codesign_arguments(&identity, keychain, &set, host.as_ref(), &path);

            info!("signing {}", path.display());
            self.authority.sign(&path, &args)?;

            if path == app {
                root_entitlements = set.entitlements.is_some();
            }
        }

        info!("verifying {}", app.display());
        self.authority
            .verify(app, &verify_arguments(&opts.strict_verify, host.as_ref(), app))?;

        if root_entitlements {
            let entitlements = self.authority.display_entitlements(app)?;
            info!("entitlements of {}:\n{}", app.display(), entitlements.trim_end());
        }

        info!("signed {}", app.display());

        Ok(())
    }

    fn embed_profile(
        &self,
        options: &ValidatedSignOptions,
        profile: Option<&ProvisioningProfile>,
    ) -> Result<(), AppleResignError> {
        if let Some(profile) = profile {
            embed_provisioning_profile(options.app(), profile)?;
            return Ok(());
        }

        let dir = match &options.options().provisioning_profile_search_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()?,
        };
        debug!("searching {} for provisioning profiles", dir.display());

        let profiles = find_provisioning_profiles(
            self.runner,
            &dir,
            options.platform(),
            options.options().distribution_type,
        )?;

        match profiles.first() {
            Some(profile) => {
                if profiles.len() > 1 {
                    warn!(
                        "{} provisioning profiles found; using {}",
                        profiles.len(),
                        profile.path.display()
                    );
                }
                embed_provisioning_profile(options.app(), profile)?;
            }
            None => {
                info!("no provisioning profile found; not embedding one");
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use {
        super::*,
        crate::{
            authority::testutil::RecordingAuthority,
            process::{testutil::RecordingRunner, CommandOutput},
        },
        std::fs::{create_dir_all, write},
    };

    const MACHO_HEADER: &[u8] = &[0xcf, 0xfa, 0xed, 0xfe, 0x07, 0x00, 0x00, 0x01];

    const LISTING: &str = r#"  1) 0123456789ABCDEF0123456789ABCDEF01234567 "Developer ID Application: Example Corp (ABCDE12345)"
  2) 89ABCDEF0123456789ABCDEF0123456789ABCDEF "3rd Party Mac Developer Application: Example Corp (ABCDE12345)"
     2 valid identities found
"#;

    const INFO_PLIST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<plist version="1.0">
<dict>
<key>CFBundleIdentifier</key><string>com.example.myapp</string>
<key>CFBundleExecutable</key><string>MyApp</string>
</dict>
</plist>
"#;

    struct Fixture {
        _td: tempfile::TempDir,
        app: PathBuf,
        gpu: PathBuf,
        gpu_binary: PathBuf,
        main_binary: PathBuf,
        profiles: PathBuf,
    }

    fn fixture() -> Result<Fixture, AppleResignError> {
        let td = tempfile::Builder::new().prefix("apple-resign-").tempdir()?;
        let app = td.path().join("MyApp.app");
        let contents = app.join("Contents");

        let gpu = contents.join("Frameworks").join("MyApp Helper (GPU).app");
        let gpu_binary = gpu.join("Contents").join("MacOS").join("MyApp Helper (GPU)");
        let main_binary = contents.join("MacOS").join("MyApp");

        create_dir_all(gpu_binary.parent().unwrap())?;
        create_dir_all(main_binary.parent().unwrap())?;
        create_dir_all(contents.join("Resources"))?;
        write(contents.join("Info.plist"), INFO_PLIST)?;
        write(gpu.join("Contents").join("Info.plist"), INFO_PLIST)?;
        write(&gpu_binary, MACHO_HEADER)?;
        write(&main_binary, MACHO_HEADER)?;
        write(contents.join("Resources").join("app.asar.txt"), b"plain text")?;

        let profiles = td.path().join("profiles");
        create_dir_all(&profiles)?;

        Ok(Fixture {
            app,
            gpu,
            gpu_binary,
            main_binary,
            profiles,
            _td: td,
        })
    }

    fn runner(release: &'static str) -> RecordingRunner {
        RecordingRunner::new(move |program, _| match program {
            "security" => CommandOutput::success(LISTING),
            "uname" => CommandOutput::success(format!("{}\n", release)),
            _ => CommandOutput::failure("unexpected program"),
        })
    }

    fn options(fixture: &Fixture, platform: Platform) -> SignOptions {
        let mut options = SignOptions::new(&fixture.app);
        options.platform = Some(platform);
        options.provisioning_profile_search_dir = Some(fixture.profiles.clone());
        options
    }

    #[test]
    fn arguments() {
        let identity = Identity {
            name: "Developer ID Application: Example Corp (ABCDE12345)".into(),
            hash: Some("ABCDEF".into()),
        };
        let options = SigningOptionSet {
            entitlements: Some(PathBuf::from("/tmp/e.plist")),
            hardened_runtime: true,
            requirements: Some("=designated => anchor apple".into()),
            signature_flags: vec!["kill".into(), "runtime".into(), "kill".into()],
            timestamp: Some("none".into()),
            additional_arguments: vec!["--generate-entitlement-der".into()],
        };

        assert_eq!(
            codesign_arguments(
                &identity,
                Some("ci.keychain"),
                &options,
                None,
                Path::new("/tmp/MyApp.app")
            ),
            vec![
                "--sign",
                "ABCDEF",
                "--force",
                "--deep",
                "--keychain",
                "ci.keychain",
                "--requirements",
                "=designated => anchor apple",
                "--timestamp=none",
                "--options",
                "kill,runtime",
                "--generate-entitlement-der",
                "--entitlements",
                "/tmp/e.plist",
                "/tmp/MyApp.app",
            ]
        );

        let old_host = Version::new(16, 7, 0);
        let minimal = SigningOptionSet {
            hardened_runtime: true,
            signature_flags: vec!["runtime".into()],
            ..Default::default()
        };
        assert_eq!(
            codesign_arguments(
                &Identity::new("Some Name"),
                None,
                &minimal,
                Some(&old_host),
                Path::new("/tmp/x")
            ),
            vec!["--sign", "Some Name", "--force", "--deep", "--timestamp", "/tmp/x"]
        );
    }

    #[test]
    fn verification_arguments() {
        let app = Path::new("/tmp/MyApp.app");
        let modern = Version::new(21, 6, 0);
        let old = Version::new(14, 5, 0);

        assert_eq!(
            verify_arguments(&StrictVerify::Enabled, Some(&modern), app),
            vec!["--verify", "--deep", "--strict", "--verbose=2", "/tmp/MyApp.app"]
        );
        assert_eq!(
            verify_arguments(
                &StrictVerify::Requirements(vec!["symlinks".into(), "sideband".into()]),
                None,
                app
            ),
            vec![
                "--verify",
                "--deep",
                "--strict=symlinks,sideband",
                "--verbose=2",
                "/tmp/MyApp.app"
            ]
        );
        assert_eq!(
            verify_arguments(&StrictVerify::Enabled, Some(&old), app),
            vec!["--verify", "--deep", "--verbose=2", "/tmp/MyApp.app"]
        );
        assert_eq!(
            verify_arguments(&StrictVerify::Disabled, Some(&modern), app),
            vec!["--verify", "--deep", "--verbose=2", "/tmp/MyApp.app"]
        );
    }

    #[test]
    fn validation() -> Result<(), AppleResignError> {
        let fixture = fixture()?;

        assert!(matches!(
            SignOptions::new(fixture.app.join("Contents")).validate(),
            Err(AppleResignError::AppExtension(_))
        ));
        assert!(matches!(
            SignOptions::new(fixture.profiles.join("Missing.app")).validate(),
            Err(AppleResignError::AppNotFound(_))
        ));

        let mut options = SignOptions::new(&fixture.app);
        options.binaries.push(fixture.profiles.join("missing"));
        assert!(matches!(
            options.validate(),
            Err(AppleResignError::BinaryNotFound(_))
        ));

        // No Squirrel.framework.
        let validated = SignOptions::new(&fixture.app).validate()?;
        assert_eq!(validated.platform(), Platform::Mas);

        Ok(())
    }

    #[test]
    fn sign_order_and_options() -> Result<(), AppleResignError> {
        let fixture = fixture()?;
        let runner = runner("21.6.0");
        let authority = RecordingAuthority::default();

        let validated = options(&fixture, Platform::Darwin).validate()?;
        AppSigner::new(&runner, &authority).sign(&validated)?;

        assert_eq!(
            authority.signed_paths(),
            vec![
                fixture.gpu_binary.clone(),
                fixture.gpu.clone(),
                fixture.main_binary.clone(),
                fixture.app.clone(),
            ]
        );

        let signed = authority.signed.borrow();
        let gpu_args = &signed[1].1;
        assert_eq!(
            gpu_args[..4],
            [
                "--sign",
                "0123456789ABCDEF0123456789ABCDEF01234567",
                "--force",
                "--deep"
            ]
        );
        assert!(gpu_args.contains(&"runtime".to_string()));
        let entitlements = &gpu_args[gpu_args.len() - 2];
        assert!(entitlements.ends_with("default.darwin.gpu.plist"));
        assert!(signed[3].1[signed[3].1.len() - 2].ends_with("default.darwin.plist"));

        assert_eq!(authority.verified.borrow().len(), 1);
        assert!(authority.verified.borrow()[0].contains(&"--strict".to_string()));
        assert_eq!(*authority.displayed.borrow(), 1);

        assert_eq!(runner.programs(), vec!["security", "uname"]);

        Ok(())
    }

    #[test]
    fn ignore_and_old_host() -> Result<(), AppleResignError> {
        let fixture = fixture()?;
        let runner = runner("14.5.0");
        let authority = RecordingAuthority::default();

        let mut options = options(&fixture, Platform::Darwin);
        options.ignore.push(Ignore::pattern("MacOS/MyApp$")?);
        options.ignore.push(Ignore::Predicate(Box::new(|path: &Path| {
            path.to_string_lossy().ends_with("(GPU)")
        })));
        options.strict_verify = StrictVerify::Enabled;

        AppSigner::new(&runner, &authority).sign(&options.validate()?)?;

        assert_eq!(
            authority.signed_paths(),
            vec![fixture.gpu.clone(), fixture.app.clone()]
        );
        for (_, args) in authority.signed.borrow().iter() {
            assert!(!args.contains(&"--options".to_string()));
        }
        assert!(!authority.verified.borrow()[0].contains(&"--strict".to_string()));

        Ok(())
    }

    #[test]
    fn rejection_aborts() -> Result<(), AppleResignError> {
        let fixture = fixture()?;
        let runner = runner("21.6.0");
        let authority = RecordingAuthority {
            reject: Some(fixture.gpu.clone()),
            ..Default::default()
        };

        let validated = options(&fixture, Platform::Darwin).validate()?;
        let res = AppSigner::new(&runner, &authority).sign(&validated);

        assert!(matches!(
            res,
            Err(AppleResignError::SigningRejected { path, .. }) if path == fixture.gpu
        ));
        assert_eq!(authority.signed_paths(), vec![fixture.gpu_binary.clone()]);
        assert!(authority.verified.borrow().is_empty());

        Ok(())
    }

    #[test]
    fn mas_entitlements_automation() -> Result<(), AppleResignError> {
        let fixture = fixture()?;
        let runner = runner("21.6.0");
        let authority = RecordingAuthority::default();

        let mut options = options(&fixture, Platform::Mas);
        options.overrides.hardened_runtime = Some(false);
        AppSigner::new(&runner, &authority).sign(&options.validate()?)?;

        let signed = authority.signed.borrow();
        assert_eq!(
            signed[0].1[1],
            "89ABCDEF0123456789ABCDEF0123456789ABCDEF"
        );

        let root_args = &signed[3].1;
        assert!(!root_args.contains(&"--options".to_string()));
        let entitlements = PathBuf::from(&root_args[root_args.len() - 2]);
        assert!(entitlements
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("entitlements-"));

        let info = plist::Value::from_file(fixture.app.join("Contents").join("Info.plist"))?;
        assert_eq!(
            info.as_dictionary()
                .and_then(|d| d.get("ElectronTeamID"))
                .and_then(|v| v.as_string()),
            Some("ABCDE12345")
        );

        Ok(())
    }

    #[test]
    fn old_framework_skips_automation() -> Result<(), AppleResignError> {
        let fixture = fixture()?;
        let runner = runner("21.6.0");
        let authority = RecordingAuthority::default();

        let mut options = options(&fixture, Platform::Mas);
        options.version = Some(Version::new(1, 0, 0));
        AppSigner::new(&runner, &authority).sign(&options.validate()?)?;

        let signed = authority.signed.borrow();
        let root_args = &signed[3].1;
        assert!(root_args[root_args.len() - 2].ends_with("default.mas.plist"));

        let info = plist::Value::from_file(fixture.app.join("Contents").join("Info.plist"))?;
        assert!(info
            .as_dictionary()
            .map(|d| !d.contains_key("ElectronTeamID"))
            .unwrap_or(false));

        Ok(())
    }

    #[test]
    fn explicit_profile_embedded() -> Result<(), AppleResignError> {
        let fixture = fixture()?;
        let profile_path = fixture.profiles.join("explicit.provisionprofile");
        write(&profile_path, b"signed profile")?;

        let runner = RecordingRunner::new(|program, args| match program {
            "security" if args[0] == "cms" => CommandOutput::success(
                r#"<?xml version="1.0"?><plist version="1.0"><dict>
<key>Entitlements</key><dict><key>com.apple.developer.team-identifier</key><string>PROFILETEAM</string></dict>
</dict></plist>"#,
            ),
            "security" => CommandOutput::success(LISTING),
            "uname" => CommandOutput::success("21.6.0"),
            _ => CommandOutput::failure("unexpected program"),
        });
        let authority = RecordingAuthority::default();

        let mut options = options(&fixture, Platform::Mas);
        options.provisioning_profile = Some(profile_path);
        options.keychain = Some("ci.keychain".into());
        AppSigner::new(&runner, &authority).sign(&options.validate()?)?;

        assert_eq!(
            std::fs::read(
                fixture
                    .app
                    .join("Contents")
                    .join("embedded.provisionprofile")
            )?,
            b"signed profile"
        );
        assert!(runner.calls.borrow()[1]
            .1
            .ends_with(&["-k".to_string(), "ci.keychain".to_string()]));

        let info = plist::Value::from_file(fixture.app.join("Contents").join("Info.plist"))?;
        assert_eq!(
            info.as_dictionary()
                .and_then(|d| d.get("ElectronTeamID"))
                .and_then(|v| v.as_string()),
            Some("PROFILETEAM")
        );

        Ok(())
    }
}
