use crate::domain::format::{VersionFormatDescription, MATCH_ALL};
use std::collections::BTreeMap;

/// Template of the built-in branch rule
pub const DEFAULT_BRANCH_FORMAT: &str = "${branch}-SNAPSHOT";

/// Template of the built-in commit rule
pub const DEFAULT_COMMIT_FORMAT: &str = "${commit}";

/// An externally provided branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchOverride {
    /// Treat HEAD as being on this branch
    Name(String),
    /// Explicitly no branch: version from the provided tag or the commit
    TagMode,
}

/// Effective versioning rules and overrides for one build
#[derive(Debug, Clone)]
pub struct VersioningConfiguration {
    /// When false, version resolution must not run at all
    pub enabled: bool,
    /// Checked in order; the first full match wins
    pub branch_rules: Vec<VersionFormatDescription>,
    /// Checked in order; may be empty
    pub tag_rules: Vec<VersionFormatDescription>,
    /// Fallback rule, matches any commit id
    pub commit_rule: VersionFormatDescription,
    pub provided_branch: Option<BranchOverride>,
    /// Never empty when present
    pub provided_tag: Option<String>,
    /// Never empty when present
    pub provided_commit: Option<String>,
    /// Auxiliary key/value pairs from the properties file
    pub properties: BTreeMap<String, String>,
    /// Whether derived values are handed back to the build tool as properties
    pub include_properties: bool,
}

impl VersioningConfiguration {
    /// Configuration with only the built-in rules and no overrides
    pub fn with_defaults() -> Self {
        VersioningConfiguration {
            enabled: true,
            branch_rules: vec![default_branch_rule()],
            tag_rules: Vec::new(),
            commit_rule: default_commit_rule(),
            provided_branch: None,
            provided_tag: None,
            provided_commit: None,
            properties: BTreeMap::new(),
            include_properties: false,
        }
    }
}

impl Default for VersioningConfiguration {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Built-in branch rule: any branch becomes `<branch>-SNAPSHOT`
pub fn default_branch_rule() -> VersionFormatDescription {
    match_all_rule(DEFAULT_BRANCH_FORMAT)
}

/// Built-in commit rule: the raw commit id
pub fn default_commit_rule() -> VersionFormatDescription {
    match_all_rule(DEFAULT_COMMIT_FORMAT)
}

/// A rule matching every ref name with the given template
pub fn match_all_rule(template: impl Into<String>) -> VersionFormatDescription {
    VersionFormatDescription::new(MATCH_ALL, "", template)
        .unwrap_or_else(|_| unreachable!("'{}' is a valid pattern", MATCH_ALL))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = VersioningConfiguration::default();
        assert!(config.enabled);
        assert_eq!(config.branch_rules.len(), 1);
        assert_eq!(config.branch_rules[0].template, DEFAULT_BRANCH_FORMAT);
        assert!(config.tag_rules.is_empty());
        assert_eq!(config.commit_rule.template, DEFAULT_COMMIT_FORMAT);
        assert!(!config.include_properties);
    }

    #[test]
    fn test_match_all_rule_matches_anything() {
        let rule = match_all_rule("${commit.short}");
        assert!(rule.matches("feature/x"));
        assert!(rule.matches(""));
    }
}
