//! `${...}` placeholder expansion for version templates.

use crate::domain::configuration::VersioningConfiguration;
use crate::domain::matcher::{effective_branch, effective_commit, effective_tag, FormatMatch, RefKind};
use crate::domain::situation::{short_commit, GitSituation};
use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Value of `${dirty}` for a modified working tree
pub const DIRTY_MARKER: &str = "-DIRTY";

const SNAPSHOT_SUFFIX: &str = "-SNAPSHOT";

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\$\{([^{}]*)\}").unwrap_or_else(|e| unreachable!("placeholder regex: {}", e))
    })
}

/// Expands every `${key}` in `template` from `values`.
///
/// Unknown keys expand to an empty string. Substituted values are never
/// scanned again, so ref names cannot inject placeholders.
pub fn expand(template: &str, values: &BTreeMap<String, String>) -> String {
    placeholder_regex()
        .replace_all(template, |caps: &Captures| {
            values.get(&caps[1]).cloned().unwrap_or_default()
        })
        .into_owned()
}

/// Collects the placeholder values available to a matched rule.
///
/// Named capture groups shadow built-in keys, which shadow auxiliary
/// properties.
///
/// # Arguments
/// * `selected` - The matched rule
/// * `situation` - Repository state
/// * `config` - Overrides and auxiliary properties
/// * `declared_version` - The version the build tool declared, for `${version}`
pub fn placeholder_values(
    selected: &FormatMatch<'_>,
    situation: &GitSituation,
    config: &VersioningConfiguration,
    declared_version: Option<&str>,
) -> BTreeMap<String, String> {
    let mut values = config.properties.clone();

    let rendered = |kind: RefKind, name: &str| -> String {
        if selected.kind == kind {
            selected.rule.strip_prefix(name).to_string()
        } else {
            name.to_string()
        }
    };

    let branch = effective_branch(situation, config)
        .map(|name| rendered(RefKind::Branch, name))
        .unwrap_or_default();
    let tag = effective_tag(situation, config)
        .map(|name| rendered(RefKind::Tag, name))
        .unwrap_or_default();
    let commit = effective_commit(situation, config);

    values.insert("branch".to_string(), branch);
    values.insert("tag".to_string(), tag);
    values.insert(
        "ref".to_string(),
        selected.rule.strip_prefix(&selected.ref_name).to_string(),
    );
    values.insert("commit".to_string(), commit.to_string());
    values.insert("commit.short".to_string(), short_commit(commit).to_string());
    values.insert(
        "dirty".to_string(),
        if situation.dirty { DIRTY_MARKER } else { "" }.to_string(),
    );

    if let Some(describe) = &situation.describe {
        values.insert("describe".to_string(), describe.to_string());
        values.insert("describe.tag".to_string(), describe.tag.clone());
        values.insert("describe.distance".to_string(), describe.distance.to_string());
        values.insert("describe.commit".to_string(), describe.commit.clone());
    }

    if let Some(version) = declared_version {
        values.insert("version".to_string(), version.to_string());
        values.insert(
            "version.release".to_string(),
            version
                .strip_suffix(SNAPSHOT_SUFFIX)
                .unwrap_or(version)
                .to_string(),
        );
    }

    values.extend(selected.groups.clone());
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::format::VersionFormatDescription;
    use crate::domain::matcher::select_format;
    use crate::domain::situation::Describe;

    fn values(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn situation() -> GitSituation {
        GitSituation {
            head_commit: "abc1234567890abcdef1234567890abcdef12345".to_string(),
            head_branch: Some("release/1.4".to_string()),
            head_tags: Vec::new(),
            last_tag: Some("v1.3.0".to_string()),
            describe: Describe::parse("v1.3.0-5-gabc1234"),
            dirty: false,
        }
    }

    #[test]
    fn test_expand_known_placeholders() {
        let vals = values(&[("branch", "main"), ("commit.short", "abc1234")]);
        assert_eq!(expand("${branch}+${commit.short}", &vals), "main+abc1234");
    }

    #[test]
    fn test_expand_unknown_placeholder_is_empty() {
        let vals = values(&[("branch", "main")]);
        assert_eq!(expand("${branch}${nope}-SNAPSHOT", &vals), "main-SNAPSHOT");
    }

    #[test]
    fn test_expand_is_single_pass() {
        let vals = values(&[("branch", "${tag}"), ("tag", "v1")]);
        assert_eq!(expand("${branch}", &vals), "${tag}");
    }

    #[test]
    fn test_expand_leaves_unterminated_placeholder() {
        let vals = values(&[("branch", "main")]);
        assert_eq!(expand("${branch}-${oops", &vals), "main-${oops");
    }

    #[test]
    fn test_expand_is_deterministic() {
        let vals = values(&[("tag", "v1.2.3")]);
        assert_eq!(expand("${tag}", &vals), expand("${tag}", &vals));
    }

    #[test]
    fn test_placeholder_values() {
        let mut config = VersioningConfiguration::default();
        config.branch_rules.insert(
            0,
            VersionFormatDescription::new("release/(?<release>.+)", "release/", "x").unwrap(),
        );
        config
            .properties
            .insert("build.number".to_string(), "42".to_string());
        config
            .properties
            .insert("branch".to_string(), "shadowed".to_string());
        let git = situation();

        let selected = select_format(&git, &config).unwrap();
        let vals = placeholder_values(&selected, &git, &config, Some("1.0.0-SNAPSHOT"));

        assert_eq!(vals["branch"], "1.4");
        assert_eq!(vals["ref"], "1.4");
        assert_eq!(vals["release"], "1.4");
        assert_eq!(vals["tag"], "");
        assert_eq!(vals["commit.short"], "abc1234");
        assert_eq!(vals["describe"], "v1.3.0-5-gabc1234");
        assert_eq!(vals["describe.tag"], "v1.3.0");
        assert_eq!(vals["describe.distance"], "5");
        assert_eq!(vals["dirty"], "");
        assert_eq!(vals["version"], "1.0.0-SNAPSHOT");
        assert_eq!(vals["version.release"], "1.0.0");
        assert_eq!(vals["build.number"], "42");
    }

    #[test]
    fn test_dirty_placeholder() {
        let config = VersioningConfiguration::default();
        let mut git = situation();
        git.dirty = true;

        let selected = select_format(&git, &config).unwrap();
        let vals = placeholder_values(&selected, &git, &config, None);
        assert_eq!(vals["dirty"], DIRTY_MARKER);
        assert!(!vals.contains_key("version"));
    }
}
