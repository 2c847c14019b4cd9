//! Build-time override values.
//!
//! Each override can come from a user property (`-D key=value`) or an
//! environment variable; the property wins when both are set.

use std::collections::HashMap;
use std::fmt;

/// A property key and its environment variable fallback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverrideKey {
    pub property: &'static str,
    pub env: &'static str,
}

/// Toggles the whole extension
pub const ENABLE: OverrideKey = OverrideKey {
    property: "gitVersioning",
    env: "GIT_VERSIONING",
};

/// Forces the branch name (empty means tag mode)
pub const PROVIDED_BRANCH: OverrideKey = OverrideKey {
    property: "project.branch",
    env: "GIT_VERSIONING_BRANCH",
};

/// Forces the tag name
pub const PROVIDED_TAG: OverrideKey = OverrideKey {
    property: "project.tag",
    env: "GIT_VERSIONING_TAG",
};

/// Forces the commit id
pub const PROVIDED_COMMIT: OverrideKey = OverrideKey {
    property: "project.commit",
    env: "GIT_VERSIONING_COMMIT",
};

type EnvLookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// User properties plus an environment to fall back on
pub struct OverrideSource {
    user_properties: HashMap<String, String>,
    env: EnvLookup,
}

impl OverrideSource {
    /// Look up overrides in `user_properties`, then the process environment
    pub fn from_env(user_properties: HashMap<String, String>) -> Self {
        OverrideSource {
            user_properties,
            env: Box::new(|name| std::env::var(name).ok()),
        }
    }

    /// Use a custom environment, e.g. a fixed map in tests
    pub fn with_env<F>(user_properties: HashMap<String, String>, env: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        OverrideSource {
            user_properties,
            env: Box::new(env),
        }
    }

    /// Raw value for a key: property first, then environment
    ///
    /// An empty value is returned as-is; normalizing it is up to the caller.
    pub fn get(&self, key: OverrideKey) -> Option<String> {
        self.user_properties
            .get(key.property)
            .cloned()
            .or_else(|| (self.env)(key.env))
    }
}

impl fmt::Debug for OverrideSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverrideSource")
            .field("user_properties", &self.user_properties)
            .finish_non_exhaustive()
    }
}

/// Parses a `key=value` user property definition
///
/// A definition without `=` sets the key to `true`.
pub fn parse_definition(definition: &str) -> (String, String) {
    match definition.split_once('=') {
        Some((key, value)) => (key.to_string(), value.to_string()),
        None => (definition.to_string(), "true".to_string()),
    }
}
