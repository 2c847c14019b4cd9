//! Terminal output for the command line tool.
//!
//! Status and errors go to stderr so stdout carries only the version.

use console::style;
use std::collections::BTreeMap;

/// Format and print an error message in red.
pub fn display_error(message: &str) {
    eprintln!("{} {}", style("ERROR:").red().bold(), message);
}

/// Format and print a status message with yellow arrow.
pub fn display_status(message: &str) {
    eprintln!("{} {}", style("→").yellow(), message);
}

/// Print the resolved version.
pub fn display_version(version: &str) {
    println!("{}", version);
}

/// Print properties as `key=value` lines, sorted by key.
pub fn display_properties(properties: &BTreeMap<String, String>) {
    for line in format_properties(properties) {
        println!("{}", line);
    }
}

/// Render properties as `key=value` lines, sorted by key.
pub fn format_properties(properties: &BTreeMap<String, String>) -> Vec<String> {
    properties
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_properties_sorted() {
        let mut properties = BTreeMap::new();
        properties.insert("git.tag".to_string(), "v1.0.0".to_string());
        properties.insert("git.commit".to_string(), "abc".to_string());

        assert_eq!(
            format_properties(&properties),
            vec!["git.commit=abc".to_string(), "git.tag=v1.0.0".to_string()]
        );
    }
}
