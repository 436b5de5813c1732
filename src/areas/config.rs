//! Repository configuration reader.
//!
//! A deliberately small parser for the INI-style `config` file inside the
//! repository directory: `[section]` headers, `key = value` pairs, `#`/`;`
//! comments. Only boolean lookups are exposed; the single consumer today is
//! `core.filemode`.

use std::collections::HashMap;
use std::path::Path;

/// Parsed repository configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    sections: HashMap<String, HashMap<String, String>>,
}

impl Config {
    /// Load the configuration file at `path`; a missing file is an empty
    /// configuration.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(path)?;
        Ok(Self::parse(&text))
    }

    fn parse(text: &str) -> Self {
        let mut sections: HashMap<String, HashMap<String, String>> = HashMap::new();
        let mut current = String::new();

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if let Some(header) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                // subsection names ([branch "main"]) keep only the section part
                current = header
                    .split_whitespace()
                    .next()
                    .unwrap_or_default()
                    .to_ascii_lowercase();
                sections.entry(current.clone()).or_default();
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                // a bare key is shorthand for "true"
                sections
                    .entry(current.clone())
                    .or_default()
                    .insert(line.to_ascii_lowercase(), String::from("true"));
                continue;
            };

            sections
                .entry(current.clone())
                .or_default()
                .insert(key.trim().to_ascii_lowercase(), value.trim().to_string());
        }

        Config { sections }
    }

    /// Boolean lookup with a default for missing keys or undecipherable
    /// values.
    pub fn get_boolean(&self, section: &str, key: &str, default: bool) -> bool {
        let value = self
            .sections
            .get(&section.to_ascii_lowercase())
            .and_then(|keys| keys.get(&key.to_ascii_lowercase()));

        match value.map(|v| v.to_ascii_lowercase()) {
            Some(value) => match value.as_str() {
                "true" | "yes" | "on" | "1" => true,
                "false" | "no" | "off" | "0" => false,
                _ => default,
            },
            None => default,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("[core]\n\tfilemode = true\n", true)]
    #[case("[core]\n\tfilemode = false\n", false)]
    #[case("[core]\n\tfilemode = off\n", false)]
    #[case("[core]\n\tfilemode = 1\n", true)]
    #[case("[CORE]\n\tFileMode = FALSE\n", false)]
    fn reads_core_filemode(#[case] text: &str, #[case] expected: bool) {
        let config = Config::parse(text);
        assert_eq!(config.get_boolean("core", "filemode", true), expected);
    }

    #[test]
    fn missing_key_falls_back_to_default() {
        let config = Config::parse("[core]\n\tbare = false\n");
        assert!(config.get_boolean("core", "filemode", true));
        assert!(!config.get_boolean("core", "filemode", false));
    }

    #[test]
    fn bare_key_means_true() {
        let config = Config::parse("[core]\n\tfilemode\n");
        assert!(config.get_boolean("core", "filemode", false));
    }

    #[test]
    fn comments_and_subsections_are_tolerated() {
        let text = "# a comment\n[branch \"main\"]\n\tremote = origin\n; another\n[core]\n\tfilemode = false\n";
        let config = Config::parse(text);
        assert!(!config.get_boolean("core", "filemode", true));
    }

    #[test]
    fn missing_file_is_empty() {
        let config = Config::load(Path::new("/nonexistent/definitely/config")).unwrap();
        assert!(config.get_boolean("core", "filemode", true));
    }
}
