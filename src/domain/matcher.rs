//! Selects the version format rule for the current git situation.
//!
//! Tags are tried first, then branches, then the commit rule. Within each
//! list the first rule whose pattern fully matches wins.

use crate::domain::configuration::{BranchOverride, VersioningConfiguration};
use crate::domain::format::VersionFormatDescription;
use crate::domain::situation::GitSituation;
use crate::error::{GitVersioningError, Result};
use std::collections::BTreeMap;

/// Which kind of ref a rule was matched against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    Tag,
    Branch,
    Commit,
}

/// The selected rule together with what it matched
#[derive(Debug, Clone)]
pub struct FormatMatch<'a> {
    pub rule: &'a VersionFormatDescription,
    pub kind: RefKind,
    /// The tag name, branch name or commit id the rule matched
    pub ref_name: String,
    /// Named capture groups of the rule's pattern
    pub groups: BTreeMap<String, String>,
}

/// Tag used for matching: the provided tag, else the first tag at HEAD.
///
/// Only that one HEAD tag (lexicographically smallest) is tried against the
/// tag rules; further tags on the same commit are never considered.
///
/// A provided branch name pins branch mode, so HEAD tags are ignored then.
pub fn effective_tag<'a>(
    situation: &'a GitSituation,
    config: &'a VersioningConfiguration,
) -> Option<&'a str> {
    if let Some(tag) = config.provided_tag.as_deref() {
        return Some(tag);
    }

    match config.provided_branch {
        Some(BranchOverride::Name(_)) => None,
        _ => situation.head_tags.first().map(String::as_str),
    }
}

/// Branch used for matching: the provided branch, else the HEAD branch.
///
/// Tag mode yields no branch.
pub fn effective_branch<'a>(
    situation: &'a GitSituation,
    config: &'a VersioningConfiguration,
) -> Option<&'a str> {
    match &config.provided_branch {
        Some(BranchOverride::Name(name)) => Some(name.as_str()),
        Some(BranchOverride::TagMode) => None,
        None => situation.head_branch.as_deref(),
    }
}

/// Commit id used for rendering: the provided commit, else HEAD
pub fn effective_commit<'a>(
    situation: &'a GitSituation,
    config: &'a VersioningConfiguration,
) -> &'a str {
    config
        .provided_commit
        .as_deref()
        .unwrap_or(&situation.head_commit)
}

/// Returns the first rule fully matching `ref_name`, with its capture groups.
pub fn first_match<'a>(
    rules: &'a [VersionFormatDescription],
    ref_name: &str,
) -> Option<(&'a VersionFormatDescription, BTreeMap<String, String>)> {
    rules
        .iter()
        .find_map(|rule| rule.capture_groups(ref_name).map(|groups| (rule, groups)))
}

/// Selects exactly one format rule for the situation.
///
/// # Returns
/// * `Ok(FormatMatch)` - The selected rule
/// * `Err` - If even the commit rule does not match, which means the
///   configuration is broken
pub fn select_format<'a>(
    situation: &GitSituation,
    config: &'a VersioningConfiguration,
) -> Result<FormatMatch<'a>> {
    if let Some(tag) = effective_tag(situation, config).filter(|tag| !tag.is_empty()) {
        if let Some((rule, groups)) = first_match(&config.tag_rules, tag) {
            return Ok(FormatMatch {
                rule,
                kind: RefKind::Tag,
                ref_name: tag.to_string(),
                groups,
            });
        }
    }

    if let Some(branch) = effective_branch(situation, config).filter(|branch| !branch.is_empty()) {
        if let Some((rule, groups)) = first_match(&config.branch_rules, branch) {
            return Ok(FormatMatch {
                rule,
                kind: RefKind::Branch,
                ref_name: branch.to_string(),
                groups,
            });
        }
    }

    let commit = effective_commit(situation, config);
    let groups = config.commit_rule.capture_groups(commit).ok_or_else(|| {
        GitVersioningError::resolution(
            config.commit_rule.pattern(),
            commit,
            "commit version format must match every commit id",
        )
    })?;

    Ok(FormatMatch {
        rule: &config.commit_rule,
        kind: RefKind::Commit,
        ref_name: commit.to_string(),
        groups,
    })
}
