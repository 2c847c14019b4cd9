use crate::error::{GitVersioningError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Directory below the build root holding versioning files
pub const CONFIG_DIR_NAME: &str = ".git-versioning";

/// Configuration file name inside [CONFIG_DIR_NAME]
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Properties file name used when the configuration names none
pub const DEFAULT_PROPERTIES_FILE_NAME: &str = "git-versioning.properties";

/// Represents the versioning configuration file.
///
/// Rule lists keep file order, which is their priority order.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct FileConfiguration {
    #[serde(default)]
    pub branches: Vec<FormatRule>,

    #[serde(default)]
    pub tags: Vec<FormatRule>,

    #[serde(default)]
    pub commit_version_format: Option<String>,

    #[serde(default)]
    pub properties_file_name: Option<String>,

    #[serde(default)]
    pub include_properties: bool,
}

/// One `[[branches]]` or `[[tags]]` entry
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FormatRule {
    pub pattern: String,

    #[serde(default)]
    pub prefix: String,

    pub version_format: String,
}

/// Where versioning files live for a build root
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigLocation {
    pub config_dir: PathBuf,
    pub config_file: PathBuf,
}

impl ConfigLocation {
    /// Conventional locations below `root`
    pub fn for_root(root: impl AsRef<Path>) -> Self {
        let config_dir = root.as_ref().join(CONFIG_DIR_NAME);
        let config_file = config_dir.join(CONFIG_FILE_NAME);
        ConfigLocation {
            config_dir,
            config_file,
        }
    }

    /// Use an explicit configuration file; properties are looked up next to it
    pub fn for_file(config_file: impl Into<PathBuf>) -> Self {
        let config_file = config_file.into();
        let config_dir = config_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        ConfigLocation {
            config_dir,
            config_file,
        }
    }

    /// Properties file for the given (optional) configured name
    pub fn properties_file(&self, name: Option<&str>) -> PathBuf {
        self.config_dir
            .join(name.unwrap_or(DEFAULT_PROPERTIES_FILE_NAME))
    }
}

/// Loads the configuration file, if there is one.
///
/// # Arguments
/// * `path` - Configuration file path
///
/// # Returns
/// * `Ok(Some(FileConfiguration))` - Parsed configuration
/// * `Ok(None)` - If the file does not exist
/// * `Err` - If the file exists but cannot be read or parsed
pub fn load_config(path: &Path) -> Result<Option<FileConfiguration>> {
    let config_str = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(GitVersioningError::configuration(path, e.to_string())),
    };

    tracing::debug!("load config from {}", path.display());
    let config: FileConfiguration = toml::from_str(&config_str)
        .map_err(|e| GitVersioningError::configuration(path, e.to_string()))?;

    Ok(Some(config))
}

/// Loads a Java-properties style file.
///
/// # Returns
/// * `Ok(map)` - Parsed entries, empty if the file does not exist
/// * `Err` - If the file exists but cannot be read
pub fn load_properties(path: &Path) -> Result<BTreeMap<String, String>> {
    match fs::read_to_string(path) {
        Ok(content) => {
            tracing::debug!("load properties from {}", path.display());
            Ok(parse_properties(&content))
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
        Err(e) => Err(GitVersioningError::configuration(path, e.to_string())),
    }
}

/// Parses the `java.util.Properties` text format.
///
/// Supported: `key=value`, `key: value` and `key value` entries, `#`/`!`
/// comment lines, `\` line continuations, and the `\t`, `\n`, `\r`, `\f`,
/// `\uXXXX` escapes (any other escaped char stands for itself, so `\=`,
/// `\:` and `\ ` may appear in keys). Leading whitespace is dropped, trailing
/// whitespace of a value is kept. A malformed `\u` escape is kept literally.
pub fn parse_properties(content: &str) -> BTreeMap<String, String> {
    let mut props = BTreeMap::new();
    let mut lines = content.lines();

    while let Some(line) = lines.next() {
        let line = line.trim_start_matches(is_blank);
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }

        let mut logical = line.to_string();
        while ends_with_continuation(&logical) {
            logical.pop();
            match lines.next() {
                Some(next) => logical.push_str(next.trim_start_matches(is_blank)),
                None => break,
            }
        }

        let (key, value) = split_entry(&logical);
        props.insert(unescape(key), unescape(value));
    }

    props
}

fn is_blank(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\x0c')
}

/// An odd run of trailing backslashes joins the next line
fn ends_with_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|c| *c == '\\').count() % 2 == 1
}

/// Splits at the first unescaped `=`, `:` or blank.
fn split_entry(line: &str) -> (&str, &str) {
    let mut escaped = false;
    for (idx, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' => return (&line[..idx], line[idx + 1..].trim_start_matches(is_blank)),
            c if is_blank(c) => {
                let rest = line[idx..].trim_start_matches(is_blank);
                let rest = rest.strip_prefix(&['=', ':'][..]).unwrap_or(rest);
                return (&line[..idx], rest.trim_start_matches(is_blank));
            }
            _ => {}
        }
    }
    (line, "")
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\x0c'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                let decoded = u32::from_str_radix(&hex, 16)
                    .ok()
                    .and_then(char::from_u32)
                    .filter(|_| hex.len() == 4);
                match decoded {
                    Some(decoded) => out.push(decoded),
                    None => {
                        out.push_str("\\u");
                        out.push_str(&hex);
                    }
                }
            }
            Some(other) => out.push(other),
            None => {}
        }
    }

    out
}
