//! Builds the [VersioningConfiguration] for a build from built-in defaults,
//! the configuration file and override values.

use crate::config::{self, ConfigLocation, FileConfiguration, FormatRule};
use crate::domain::configuration::{
    default_branch_rule, default_commit_rule, match_all_rule, BranchOverride,
    VersioningConfiguration,
};
use crate::domain::format::VersionFormatDescription;
use crate::error::{GitVersioningError, Result};
use crate::overrides::{OverrideSource, ENABLE, PROVIDED_BRANCH, PROVIDED_COMMIT, PROVIDED_TAG};
use std::collections::BTreeMap;
use std::path::Path;

/// Resolves configuration from files below a build root
#[derive(Debug)]
pub struct ConfigurationResolver {
    location: ConfigLocation,
    overrides: OverrideSource,
}

impl ConfigurationResolver {
    pub fn new(location: ConfigLocation, overrides: OverrideSource) -> Self {
        ConfigurationResolver {
            location,
            overrides,
        }
    }

    /// Reads the configuration and properties files and applies overrides.
    ///
    /// # Returns
    /// * `Ok(VersioningConfiguration)` - The effective configuration
    /// * `Err` - If the configuration file is malformed or a file cannot be read
    pub fn resolve(&self) -> Result<VersioningConfiguration> {
        let config_file = &self.location.config_file;
        let file_config = config::load_config(config_file)?;
        if file_config.is_none() {
            tracing::info!("No configuration file found. Apply default configuration.");
        }

        let mut configuration =
            build_configuration(file_config.as_ref(), config_file, &self.overrides)?;

        let properties_file = self.location.properties_file(
            file_config
                .as_ref()
                .and_then(|c| c.properties_file_name.as_deref()),
        );
        configuration.properties = config::load_properties(&properties_file)?;

        Ok(configuration)
    }
}

/// Merges file rules, built-in rules and overrides.
///
/// Properties are left empty; [ConfigurationResolver::resolve] fills them in.
///
/// # Arguments
/// * `file_config` - Parsed configuration file, `None` when absent
/// * `config_file` - Path reported in errors
/// * `overrides` - User properties and environment
pub fn build_configuration(
    file_config: Option<&FileConfiguration>,
    config_file: &Path,
    overrides: &OverrideSource,
) -> Result<VersioningConfiguration> {
    let mut configuration = VersioningConfiguration::with_defaults();

    if let Some(file_config) = file_config {
        let mut branch_rules = compile_rules(&file_config.branches, config_file)?;
        branch_rules.push(default_branch_rule());
        configuration.branch_rules = branch_rules;

        configuration.tag_rules = compile_rules(&file_config.tags, config_file)?;

        configuration.commit_rule = match &file_config.commit_version_format {
            Some(format) => match_all_rule(format.clone()),
            None => default_commit_rule(),
        };

        configuration.include_properties = file_config.include_properties;
    }

    configuration.enabled = is_enabled(overrides.get(ENABLE).as_deref());

    let (provided_branch, provided_tag) =
        reconcile_ref_overrides(overrides.get(PROVIDED_BRANCH), overrides.get(PROVIDED_TAG));
    configuration.provided_branch = provided_branch;
    configuration.provided_tag = provided_tag;

    configuration.provided_commit = overrides.get(PROVIDED_COMMIT).filter(|c| !c.is_empty());

    Ok(configuration)
}

/// Unset or empty means enabled; otherwise only `true` enables.
pub fn is_enabled(toggle: Option<&str>) -> bool {
    match toggle.map(str::trim) {
        None | Some("") => true,
        Some(value) => value.eq_ignore_ascii_case("true"),
    }
}

/// Applies the branch/tag override rules.
///
/// An empty tag is absent. A tag without a branch forces tag mode. A
/// branch and a tag together drop the tag.
pub fn reconcile_ref_overrides(
    branch: Option<String>,
    tag: Option<String>,
) -> (Option<BranchOverride>, Option<String>) {
    let tag = tag.filter(|t| !t.is_empty());

    match (branch, tag) {
        (None, Some(tag)) => (Some(BranchOverride::TagMode), Some(tag)),
        (None, None) => (None, None),
        (Some(branch), tag) if branch.is_empty() => (Some(BranchOverride::TagMode), tag),
        (Some(branch), Some(tag)) => {
            tracing::warn!(
                "provided tag [{}] is ignored due to provided branch [{}] !",
                tag,
                branch
            );
            (Some(BranchOverride::Name(branch)), None)
        }
        (Some(branch), None) => (Some(BranchOverride::Name(branch)), None),
    }
}

fn compile_rules(rules: &[FormatRule], config_file: &Path) -> Result<Vec<VersionFormatDescription>> {
    rules
        .iter()
        .map(|rule| {
            VersionFormatDescription::new(&rule.pattern, &rule.prefix, &rule.version_format)
                .map_err(|e| {
                    GitVersioningError::configuration(
                        config_file,
                        format!("invalid pattern '{}': {}", rule.pattern, e),
                    )
                })
        })
        .collect()
}

/// Properties declared for the host tool, only when enabled in configuration
pub fn exposed_properties(
    configuration: &VersioningConfiguration,
    derived: BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    if !configuration.include_properties {
        return BTreeMap::new();
    }

    let mut properties = configuration.properties.clone();
    properties.extend(derived);
    properties
}
