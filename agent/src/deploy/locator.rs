//! Repository address parsing

use crate::deploy::error::DeployError;

/// Hosts accepted when no list is configured
pub const DEFAULT_KNOWN_HOSTS: &[&str] = &["github.com"];

const SCHEME: &str = "https:";

/// Owner and name of a hosted repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoCoordinates {
    pub owner: String,
    pub name: String,
}

/// Parses `https://<host>/<owner>/<name>[.git]` addresses.
///
/// Only this one shape is accepted. SSH remotes, nested groups and unknown
/// hosts are rejected instead of guessed at.
#[derive(Debug, Clone)]
pub struct RepoLocator {
    known_hosts: Vec<String>,
}

impl RepoLocator {
    pub fn new<I, S>(known_hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            known_hosts: known_hosts
                .into_iter()
                .map(|h| h.into().to_ascii_lowercase())
                .collect(),
        }
    }

    /// Parse a repository address into its coordinates
    pub fn locate(&self, address: &str) -> Result<RepoCoordinates, DeployError> {
        let invalid = |reason: &str| DeployError::InvalidRepoAddress {
            address: address.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = address.trim_end_matches('/');
        let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);
        let segments: Vec<&str> = trimmed.split('/').filter(|s| !s.is_empty()).collect();

        let [scheme, host, owner, name] = segments.as_slice() else {
            return Err(invalid("expected https://<host>/<owner>/<name>"));
        };
        if *scheme != SCHEME {
            return Err(invalid("only https addresses are supported"));
        }
        if !self.known_hosts.iter().any(|h| h.eq_ignore_ascii_case(host)) {
            return Err(invalid("unknown host"));
        }
        for segment in [owner, name] {
            if matches!(*segment, "." | "..") {
                return Err(invalid("owner and name must be plain path segments"));
            }
        }

        Ok(RepoCoordinates {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }
}

impl Default for RepoLocator {
    fn default() -> Self {
        Self::new(DEFAULT_KNOWN_HOSTS.iter().copied())
    }
}
