//! Repository locator tests

use deploy_agent::deploy::error::ErrorKind;
use deploy_agent::deploy::locator::{RepoCoordinates, RepoLocator};

#[test]
fn test_canonical_addresses_yield_owner_and_name() {
    let locator = RepoLocator::default();
    let cases = [
        ("acme", "widget"),
        ("rust-lang", "cargo"),
        ("a", "b.c"),
        ("Org_1", "repo-with-dashes"),
    ];

    for (owner, name) in cases {
        for suffix in ["", ".git"] {
            let address = format!("https://github.com/{}/{}{}", owner, name, suffix);
            assert_eq!(
                locator.locate(&address).unwrap(),
                RepoCoordinates {
                    owner: owner.to_string(),
                    name: name.to_string(),
                },
                "{}",
                address
            );
        }
    }
}

#[test]
fn test_other_shapes_are_invalid() {
    let locator = RepoLocator::default();
    for address in [
        "widget",
        "https://github.com",
        "https://github.com/acme/widget/extra.git",
        "ssh://git@github.com/acme/widget.git",
        "file:///srv/git/widget",
    ] {
        let err = locator.locate(address).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRepoAddress, "{}", address);
        assert!(err.to_string().contains(address));
    }
}
