// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Code signing identity discovery.

use {
    crate::{
        process::{run_checked, CommandRunner},
        AppleResignError, DistributionType,
    },
    apple_bundles::Platform,
    log::{debug, info, warn},
};

/// A signing identity as reported by the keychain.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Identity {
    /// Full certificate name, e.g. `Developer ID Application: Foo (ABCDE12345)`.
    pub name: String,
    /// SHA-1 fingerprint of the certificate.
    pub hash: Option<String>,
}

impl Identity {
    /// An identity known only by name.
    pub fn new(name: impl ToString) -> Self {
        Self {
            name: name.to_string(),
            hash: None,
        }
    }

    /// Value passed to `codesign --sign`. The hash when known, otherwise the name.
    pub fn signing_reference(&self) -> &str {
        self.hash.as_deref().unwrap_or(&self.name)
    }

    /// The team identifier embedded in the identity name.
    ///
    /// This is the text between the first `(` and the last `)`.
    pub fn team_id(&self) -> Option<&str> {
        let start = self.name.find('(')? + 1;
        let end = self.name.rfind(')')?;

        if start < end {
            Some(&self.name[start..end])
        } else {
            None
        }
    }
}

/// Identity search string used for signing application content.
pub fn default_application_identity_search(
    platform: Platform,
    distribution_type: DistributionType,
) -> &'static str {
    match (platform, distribution_type) {
        (Platform::Mas, DistributionType::Distribution) => "3rd Party Mac Developer Application:",
        (Platform::Mas, DistributionType::Development) => "Mac Developer:",
        (Platform::Darwin, _) => "Developer ID Application:",
    }
}

/// Identity search string used for signing installer packages.
pub fn default_installer_identity_search(platform: Platform) -> &'static str {
    match platform {
        Platform::Mas => "3rd Party Mac Developer Installer:",
        Platform::Darwin => "Developer ID Installer:",
    }
}

/// Extract identities matching a search string from `security find-identity` output.
///
/// Lines have the form `  1) <HASH> "<name>"`. Any line containing `search`
/// and a quoted name yields an identity.
pub fn parse_identities(listing: &str, search: &str) -> Vec<Identity> {
    listing
        .lines()
        .filter(|line| line.contains(search))
        .filter_map(|line| {
            let name_start = line.find('"')? + 1;
            let name_end = line.rfind('"')?;
            if name_start > name_end {
                return None;
            }
            let name = line[name_start..name_end].to_string();

            let hash = line
                .find(") ")
                .filter(|paren| paren + 2 < name_start)
                .map(|paren| line[paren + 2..name_start - 1].trim())
                .filter(|hash| !hash.is_empty())
                .map(|hash| hash.to_string());

            debug!("identity {} ({})", name, hash.as_deref().unwrap_or("no hash"));

            Some(Identity { name, hash })
        })
        .collect()
}

/// Find valid signing identities matching a search string.
pub fn find_identities(
    runner: &dyn CommandRunner,
    keychain: Option<&str>,
    search: &str,
) -> Result<Vec<Identity>, AppleResignError> {
    let mut args = vec!["find-identity".to_string(), "-v".to_string()];
    if let Some(keychain) = keychain {
        args.push(keychain.to_string());
    }

    let listing = run_checked(runner, "security", &args)?;

    Ok(parse_identities(&listing, search))
}

/// Resolve the identity to sign with.
///
/// An explicit identity is looked up in the keychain unless `validate` is
/// false, in which case it is used verbatim. Without an explicit identity,
/// `default_search` is looked up. The first match wins.
pub fn resolve_identity(
    runner: &dyn CommandRunner,
    keychain: Option<&str>,
    explicit: Option<&str>,
    validate: bool,
    default_search: &str,
) -> Result<Identity, AppleResignError> {
    let search = match explicit {
        Some(identity) if !validate => {
            info!("using identity {} without validation", identity);
            return Ok(Identity::new(identity));
        }
        Some(identity) => identity,
        None => {
            info!("no identity specified; searching for {}", default_search);
            default_search
        }
    };

    let mut identities = find_identities(runner, keychain, search)?;

    if identities.len() > 1 {
        warn!(
            "{} identities match {:?}; using the first",
            identities.len(),
            search
        );
    }

    if identities.is_empty() {
        Err(AppleResignError::NoIdentityFound(search.to_string()))
    } else {
        let identity = identities.remove(0);
        info!("signing identity: {}", identity.name);
        Ok(identity)
    }
}

#[cfg(test)]
mod test {
    use {
        super::*,
        crate::process::{testutil::RecordingRunner, CommandOutput},
    };

    const LISTING: &str = r#"  1) 0123456789ABCDEF0123456789ABCDEF01234567 "Developer ID Application: Example Corp (ABCDE12345)"
  2) 89ABCDEF0123456789ABCDEF0123456789ABCDEF "3rd Party Mac Developer Application: Example Corp (ABCDE12345)"
  3) FEDCBA9876543210FEDCBA9876543210FEDCBA98 "Developer ID Installer: Example Corp (ABCDE12345)"
     3 valid identities found
"#;

    #[test]
    fn parse_listing() {
        let found = parse_identities(LISTING, "Developer ID Application:");
        assert_eq!(
            found,
            vec![Identity {
                name: "Developer ID Application: Example Corp (ABCDE12345)".into(),
                hash: Some("0123456789ABCDEF0123456789ABCDEF01234567".into()),
            }]
        );
        assert_eq!(
            found[0].signing_reference(),
            "0123456789ABCDEF0123456789ABCDEF01234567"
        );
        assert_eq!(found[0].team_id(), Some("ABCDE12345"));

        assert_eq!(parse_identities(LISTING, "Example Corp").len(), 3);
        assert!(parse_identities(LISTING, "Mac Developer:").is_empty());
        assert!(parse_identities(LISTING, "valid identities").is_empty());
    }

    #[test]
    fn identity_without_hash() {
        let identity = Identity::new("Some Name");
        assert_eq!(identity.signing_reference(), "Some Name");
        assert_eq!(identity.team_id(), None);
    }

    #[test]
    fn default_searches() {
        assert_eq!(
            default_application_identity_search(Platform::Mas, DistributionType::Distribution),
            "3rd Party Mac Developer Application:"
        );
        assert_eq!(
            default_application_identity_search(Platform::Mas, DistributionType::Development),
            "Mac Developer:"
        );
        assert_eq!(
            default_application_identity_search(Platform::Darwin, DistributionType::Development),
            "Developer ID Application:"
        );
        assert_eq!(
            default_installer_identity_search(Platform::Darwin),
            "Developer ID Installer:"
        );
    }

    #[test]
    fn resolution() -> Result<(), AppleResignError> {
        let runner = RecordingRunner::new(|_, _| CommandOutput::success(LISTING));

        let identity = resolve_identity(
            &runner,
            Some("build.keychain"),
            None,
            true,
            "Developer ID Application:",
        )?;
        assert_eq!(identity.team_id(), Some("ABCDE12345"));
        assert_eq!(
            runner.calls.borrow()[0].1,
            vec!["find-identity", "-v", "build.keychain"]
        );

        let identity = resolve_identity(&runner, None, Some("Example Corp"), true, "unused")?;
        assert_eq!(
            identity.name,
            "Developer ID Application: Example Corp (ABCDE12345)"
        );

        let identity = resolve_identity(&runner, None, Some("Not Real"), false, "unused")?;
        assert_eq!(identity, Identity::new("Not Real"));
        assert_eq!(runner.calls.borrow().len(), 2);

        assert!(matches!(
            resolve_identity(&runner, None, Some("Not Real"), true, "unused"),
            Err(AppleResignError::NoIdentityFound(search)) if search == "Not Real"
        ));

        Ok(())
    }
}
