// Host-only script classification

use std::collections::BTreeSet;

/// Scripts that talk to the container engine's control socket on the host.
pub const DEFAULT_HOST_ONLY_SCRIPTS: &[&str] = &[
    "init-host-env.sh",
    "sync-compose-secrets.sh",
    "copy-credentials.sh",
    "import-credentials.sh",
];

/// Decides which scripts may only run with direct host privileges.
///
/// The set is fixed at construction; membership is by exact file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostOnlyPolicy {
    names: BTreeSet<String>,
}

impl HostOnlyPolicy {
    /// Policy containing exactly `names`.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Policy with nothing host-only.
    pub fn empty() -> Self {
        Self::new(Vec::<String>::new())
    }

    /// Add names on top of the current set.
    pub fn with_additional<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.names.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn is_host_only(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl Default for HostOnlyPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_HOST_ONLY_SCRIPTS.iter().copied())
    }
}
