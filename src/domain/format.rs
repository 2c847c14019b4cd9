use regex::Regex;
use std::collections::BTreeMap;

/// Pattern matching everything, used by the built-in rules
pub const MATCH_ALL: &str = ".*";

/// A version format rule: which ref names it applies to and how to render them.
///
/// The pattern is compiled once, anchored at both ends, so it only matches
/// whole ref names.
#[derive(Debug, Clone)]
pub struct VersionFormatDescription {
    pattern: String,
    regex: Regex,
    pub prefix: String,
    pub template: String,
}

impl VersionFormatDescription {
    /// Compile a new format rule
    ///
    /// # Arguments
    /// * `pattern` - Regular expression a full ref name must match
    /// * `prefix` - Stripped from the ref name when rendering
    /// * `template` - Version template with `${...}` placeholders
    ///
    /// # Returns
    /// * `Err` - If the pattern is not a valid regular expression
    pub fn new(
        pattern: impl Into<String>,
        prefix: impl Into<String>,
        template: impl Into<String>,
    ) -> Result<Self, regex::Error> {
        let pattern = pattern.into();
        let regex = Regex::new(&format!("^(?:{})$", pattern))?;

        Ok(VersionFormatDescription {
            pattern,
            regex,
            prefix: prefix.into(),
            template: template.into(),
        })
    }

    /// The pattern as written in configuration
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Whether the full ref name matches this rule
    pub fn matches(&self, ref_name: &str) -> bool {
        self.regex.is_match(ref_name)
    }

    /// Match a ref name and collect its named capture groups
    ///
    /// # Returns
    /// * `Some(groups)` - If the full ref name matches; unmatched optional groups are omitted
    /// * `None` - If it does not match
    pub fn capture_groups(&self, ref_name: &str) -> Option<BTreeMap<String, String>> {
        let captures = self.regex.captures(ref_name)?;

        Some(
            self.regex
                .capture_names()
                .flatten()
                .filter_map(|name| {
                    captures
                        .name(name)
                        .map(|value| (name.to_string(), value.as_str().to_string()))
                })
                .collect(),
        )
    }

    /// Remove this rule's prefix from a ref name, if present
    pub fn strip_prefix<'a>(&self, ref_name: &'a str) -> &'a str {
        ref_name
            .strip_prefix(self.prefix.as_str())
            .unwrap_or(ref_name)
    }
}
