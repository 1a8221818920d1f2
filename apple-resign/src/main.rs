// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {
    apple_bundles::Platform,
    apple_flat_package::{repair_payload, rewrite_bom_listing},
    apple_resign::{
        build_pkg, AppSigner, AppleResignError, Codesign, DistributionType, Entitlements,
        FlatOptions, Ignore, OptionsRules, SignOptions, SignatureFlags, StrictVerify,
        SystemCommandRunner,
    },
    clap::{Arg, ArgMatches, Command},
    log::{info, LevelFilter},
    std::{
        io::Write,
        path::{Path, PathBuf},
        str::FromStr,
    },
};

const SIGN_ABOUT: &str = "\
Sign a macOS application bundle and everything nested in it.

The content of the application is walked for binaries and nested bundles
(`.app`, `.framework`). These are signed with `codesign`, deepest first, and
the application itself is signed last. The result is verified with
`codesign --verify --deep --strict`.

Every path is signed with entitlements chosen by its role: the main
application, GPU, renderer and plugin helpers get dedicated entitlements when
distributing outside the Mac App Store. For the Mac App Store, nested content
inherits the sandbox of the application.

Options given on the command line apply to every path. Per-path options can
be given in a YAML file with `--options-file`:

    - glob: \"MyApp.app/**/*(GPU).app\"
      hardened-runtime: false
    - glob: \"**/*.dylib\"
      signature-flags: library
      entitlements: [com.apple.security.cs.allow-jit]

Globs are matched against paths relative to the directory holding the
application. Every matching rule is applied in order.

When no identity is given, the keychain is searched for a suitable one:
`Developer ID Application:` outside the Mac App Store, `3rd Party Mac
Developer Application:` (distribution) or `Mac Developer:` (development)
for it.
";

const FLAT_ABOUT: &str = "\
Build a signed installer package (.pkg) from an application.

The application is packaged as a component package with `pkgbuild` and then
wrapped in a product package signed by `productbuild`.

When no identity is given, the keychain is searched for a
`Developer ID Installer:` or, for the Mac App Store, a `3rd Party Mac
Developer Installer:` identity.

With `--open-permissions`, the component package is rewritten so installed
files are writable by the admin group. This is required by applications
updating themselves in place.
";

const REPAIR_PAYLOAD_ABOUT: &str = "\
Make the content of a component package Payload group writable.

The gzip compressed cpio archive is rewritten in place: 755 permissions
become 775, 644 permissions become 664 and root:wheel ownership becomes
root:admin. File content is untouched.
";

const REWRITE_BOM_LISTING_ABOUT: &str = "\
Rewrite an lsbom listing so the files it describes are group writable.

The rewritten listing is printed to stdout and can be fed to `mkbom -i`.
Every entry must be owned by 0/0.
";

fn parse_platform(value: Option<&str>) -> Result<Option<Platform>, AppleResignError> {
    value
        .map(|v| {
            Platform::from_str(v).map_err(|e| AppleResignError::CliBadArgument(format!("{}", e)))
        })
        .transpose()
}

fn command_sign(args: &ArgMatches) -> Result<(), AppleResignError> {
    let app = PathBuf::from(
        args.value_of("app")
            .ok_or(AppleResignError::CliBadArgument("app is required".into()))?,
    );

    let mut options = SignOptions::new(&app);

    if let Some(values) = args.values_of("binaries") {
        options.binaries = values.map(PathBuf::from).collect();
    }
    options.keychain = args.value_of("keychain").map(|s| s.to_string());
    options.identity = args.value_of("identity").map(|s| s.to_string());
    options.identity_validation = !args.is_present("no_identity_validation");
    options.platform = parse_platform(args.value_of("platform"))?;
    if let Some(value) = args.value_of("type") {
        options.distribution_type = DistributionType::from_str(value)?;
    }
    options.provisioning_profile = args.value_of("provisioning_profile").map(PathBuf::from);
    options.pre_auto_entitlements = !args.is_present("no_pre_auto_entitlements");
    options.pre_embed_provisioning_profile =
        !args.is_present("no_pre_embed_provisioning_profile");

    options.strict_verify = if args.is_present("no_strict_verify") {
        StrictVerify::Disabled
    } else if let Some(value) = args.value_of("strict_verify") {
        StrictVerify::Requirements(
            SignatureFlags::Comma(value.to_string()).flags(),
        )
    } else {
        StrictVerify::Enabled
    };

    if let Some(values) = args.values_of("ignore") {
        options.ignore = values.map(Ignore::pattern).collect::<Result<Vec<_>, _>>()?;
    }

    if let Some(value) = args.value_of("signature_flags") {
        options.overrides.signature_flags = Some(SignatureFlags::Comma(value.to_string()));
    }
    if let Some(value) = args.value_of("hardened_runtime") {
        options.overrides.hardened_runtime = Some(value == "true");
    }
    if let Some(value) = args.value_of("entitlements") {
        options.overrides.entitlements = Some(Entitlements::Path(PathBuf::from(value)));
    }
    options.overrides.timestamp = args.value_of("timestamp").map(|s| s.to_string());
    options.overrides.requirements = args.value_of("requirements").map(|s| s.to_string());

    if let Some(path) = args.value_of("options_file") {
        let rules = OptionsRules::from_path(Path::new(path))?
            .relative_to(app.parent().unwrap_or_else(|| Path::new("")));
        info!("loaded {} options rules from {}", rules.len(), path);
        options.options_for_file = Box::new(rules);
    }

    let options = options.validate()?;

    let runner = SystemCommandRunner;
    let authority = Codesign::new(&runner);

    AppSigner::new(&runner, &authority).sign(&options)
}

fn command_flat(args: &ArgMatches) -> Result<(), AppleResignError> {
    let app = args
        .value_of("app")
        .ok_or(AppleResignError::CliBadArgument("app is required".into()))?;

    let mut options = FlatOptions::new(app);
    options.pkg = args.value_of("pkg").map(PathBuf::from);
    options.install = args.value_of("install").map(PathBuf::from);
    options.identity = args.value_of("identity").map(|s| s.to_string());
    options.identity_validation = !args.is_present("no_identity_validation");
    options.keychain = args.value_of("keychain").map(|s| s.to_string());
    options.platform = parse_platform(args.value_of("platform"))?;
    options.scripts = args.value_of("scripts").map(PathBuf::from);
    options.open_permissions = args.is_present("open_permissions");

    let pkg = build_pkg(&SystemCommandRunner, &options.validate()?)?;
    println!("{}", pkg.display());

    Ok(())
}

fn command_repair_payload(args: &ArgMatches) -> Result<(), AppleResignError> {
    let path = args
        .value_of("payload")
        .ok_or(AppleResignError::CliBadArgument("payload is required".into()))?;

    repair_payload(Path::new(path))?;

    Ok(())
}

fn command_rewrite_bom_listing(args: &ArgMatches) -> Result<(), AppleResignError> {
    let path = args
        .value_of("listing")
        .ok_or(AppleResignError::CliBadArgument("listing is required".into()))?;

    let listing = rewrite_bom_listing(&std::fs::read_to_string(path)?)?;
    std::io::stdout().write_all(listing.as_bytes())?;

    Ok(())
}

fn add_identity_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("identity")
                .long("identity")
                .takes_value(true)
                .help("Name (or part of the name) of the identity to sign with"),
        )
        .arg(
            Arg::new("no_identity_validation")
                .long("no-identity-validation")
                .help("Use --identity as given instead of looking it up in the keychain"),
        )
        .arg(
            Arg::new("keychain")
                .long("keychain")
                .takes_value(true)
                .help("Keychain to search for identities"),
        )
        .arg(
            Arg::new("platform")
                .long("platform")
                .takes_value(true)
                .possible_values(["darwin", "mas"])
                .help("Platform to sign for. Detected from the application by default"),
        )
}

fn main_impl() -> Result<(), AppleResignError> {
    let app = Command::new("Re-sign and package macOS applications")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Sign macOS applications and build installer packages with Apple's tools")
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .multiple_occurrences(true)
                .help("Increase logging verbosity. Can be specified multiple times."),
        );

    let app = app.subcommand(add_identity_args(
        Command::new("sign")
            .about("Sign an application bundle")
            .long_about(SIGN_ABOUT)
            .arg(
                Arg::new("type")
                    .long("type")
                    .takes_value(true)
                    .possible_values(["development", "distribution"])
                    .help("Whether signing for development or distribution"),
            )
            .arg(
                Arg::new("provisioning_profile")
                    .long("provisioning-profile")
                    .takes_value(true)
                    .help("Provisioning profile to embed"),
            )
            .arg(
                Arg::new("no_pre_auto_entitlements")
                    .long("no-pre-auto-entitlements")
                    .help("Do not complete the entitlements of sandboxed applications"),
            )
            .arg(
                Arg::new("no_pre_embed_provisioning_profile")
                    .long("no-pre-embed-provisioning-profile")
                    .help("Do not embed a provisioning profile"),
            )
            .arg(
                Arg::new("no_strict_verify")
                    .long("no-strict-verify")
                    .conflicts_with("strict_verify")
                    .help("Verify the signed application without --strict"),
            )
            .arg(
                Arg::new("strict_verify")
                    .long("strict-verify")
                    .takes_value(true)
                    .help("Comma separated requirements for --strict verification"),
            )
            .arg(
                Arg::new("ignore")
                    .long("ignore")
                    .takes_value(true)
                    .multiple_occurrences(true)
                    .multiple_values(true)
                    .number_of_values(1)
                    .help("Regular expression of paths not to sign"),
            )
            .arg(
                Arg::new("signature_flags")
                    .long("signature-flags")
                    .takes_value(true)
                    .help("Comma separated codesign --options flags, e.g. kill,library"),
            )
            .arg(
                Arg::new("hardened_runtime")
                    .long("hardened-runtime")
                    .takes_value(true)
                    .possible_values(["true", "false"])
                    .help("Whether to enable the hardened runtime"),
            )
            .arg(
                Arg::new("entitlements")
                    .long("entitlements")
                    .takes_value(true)
                    .help("Entitlements plist to sign every path with"),
            )
            .arg(
                Arg::new("requirements")
                    .long("requirements")
                    .takes_value(true)
                    .help("Internal requirements to sign with"),
            )
            .arg(
                Arg::new("timestamp")
                    .long("timestamp")
                    .takes_value(true)
                    .help("Time-stamp authority URL, or `none` to disable time-stamping"),
            )
            .arg(
                Arg::new("options_file")
                    .long("options-file")
                    .takes_value(true)
                    .help("YAML file with per-path signing options"),
            )
            .arg(
                Arg::new("app")
                    .required(true)
                    .help("Path of the .app to sign"),
            )
            .arg(
                Arg::new("binaries")
                    .multiple_values(true)
                    .help("Additional binaries to sign along with the application content"),
            ),
    ));

    let app = app.subcommand(add_identity_args(
        Command::new("flat")
            .about("Build a signed installer package from an application")
            .long_about(FLAT_ABOUT)
            .arg(
                Arg::new("pkg")
                    .long("pkg")
                    .takes_value(true)
                    .help("Path of the package to write. Defaults to <name>.pkg next to the application"),
            )
            .arg(
                Arg::new("install")
                    .long("install")
                    .takes_value(true)
                    .help("Install location. Defaults to /Applications"),
            )
            .arg(
                Arg::new("scripts")
                    .long("scripts")
                    .takes_value(true)
                    .help("Directory of installer scripts"),
            )
            .arg(
                Arg::new("open_permissions")
                    .long("open-permissions")
                    .help("Install files writable by the admin group"),
            )
            .arg(
                Arg::new("app")
                    .required(true)
                    .help("Path of the .app to package"),
            ),
    ));

    let app = app.subcommand(
        Command::new("repair-payload")
            .about("Make the content of a Payload file group writable")
            .long_about(REPAIR_PAYLOAD_ABOUT)
            .arg(
                Arg::new("payload")
                    .required(true)
                    .help("Path of the Payload file to rewrite in place"),
            ),
    );

    let app = app.subcommand(
        Command::new("rewrite-bom-listing")
            .about("Rewrite an lsbom listing so its files are group writable")
            .long_about(REWRITE_BOM_LISTING_ABOUT)
            .arg(
                Arg::new("listing")
                    .required(true)
                    .help("Path of the listing to rewrite"),
            ),
    );

    let matches = app.get_matches();

    let log_level = match matches.occurrences_of("verbose") {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(log_level.as_str()),
    );

    // Disable log context except at higher log levels.
    if log_level <= LevelFilter::Info {
        builder
            .format_timestamp(None)
            .format_level(false)
            .format_target(false);
    }

    builder.init();

    match matches.subcommand() {
        Some(("flat", args)) => command_flat(args),
        Some(("repair-payload", args)) => command_repair_payload(args),
        Some(("rewrite-bom-listing", args)) => command_rewrite_bom_listing(args),
        Some(("sign", args)) => command_sign(args),
        _ => Err(AppleResignError::CliUnknownCommand),
    }
}

fn main() {
    let exit_code = match main_impl() {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("Error: {}", err);
            1
        }
    };

    std::process::exit(exit_code)
}
