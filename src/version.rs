use crate::domain::matcher::select_format;
use crate::domain::situation::GitSituation;
use crate::domain::template::{expand, placeholder_values};
use crate::domain::VersioningConfiguration;
use crate::error::{GitVersioningError, Result};
use crate::resolver::exposed_properties;
use std::collections::BTreeMap;

/// A version derived from git, with properties for the build tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVersion {
    pub version: String,
    /// Empty unless the configuration includes properties
    pub properties: BTreeMap<String, String>,
}

impl ResolvedVersion {
    /// The declared version, used when versioning is disabled
    pub fn unchanged(declared_version: impl Into<String>) -> Self {
        ResolvedVersion {
            version: declared_version.into(),
            properties: BTreeMap::new(),
        }
    }
}

/// Derives the project version from the git situation.
///
/// Does not look at [VersioningConfiguration::enabled]; callers skip this
/// entirely when versioning is disabled.
///
/// # Arguments
/// * `situation` - Repository state
/// * `configuration` - Rules, overrides and auxiliary properties
/// * `declared_version` - The build tool's own version, for `${version}`
///
/// # Returns
/// * `Ok(ResolvedVersion)` - The version and exposed properties
/// * `Err` - If the selected template expands to an empty version
pub fn resolve_version(
    situation: &GitSituation,
    configuration: &VersioningConfiguration,
    declared_version: Option<&str>,
) -> Result<ResolvedVersion> {
    let selected = select_format(situation, configuration)?;
    tracing::debug!(
        "{:?} '{}' matched version format pattern '{}'",
        selected.kind,
        selected.ref_name,
        selected.rule.pattern()
    );

    let values = placeholder_values(&selected, situation, configuration, declared_version);
    let version = expand(&selected.rule.template, &values);

    if version.trim().is_empty() {
        return Err(GitVersioningError::resolution(
            selected.rule.pattern(),
            &selected.ref_name,
            format!("version format '{}' produced an empty version", selected.rule.template),
        ));
    }

    let mut derived = BTreeMap::new();
    derived.insert("git.commit".to_string(), values["commit"].clone());
    derived.insert("git.commit.short".to_string(), values["commit.short"].clone());
    derived.insert("git.ref".to_string(), selected.ref_name.clone());
    derived.insert("git.dirty".to_string(), situation.dirty.to_string());
    for key in ["branch", "tag", "describe"] {
        if let Some(value) = values.get(key).filter(|v| !v.is_empty()) {
            derived.insert(format!("git.{}", key), value.clone());
        }
    }

    Ok(ResolvedVersion {
        version,
        properties: exposed_properties(configuration, derived),
    })
}
