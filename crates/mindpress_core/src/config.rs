//! Site configuration from `mindpress.yaml`
//!
//! Every key is optional. A missing file yields the defaults; a file that
//! exists but does not parse is an error.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteConfig {
    pub title: String,
    /// One-line description used as the book preamble.
    pub subtitle: String,
    /// Always `/`-terminated.
    pub base_url: String,
    pub language: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "the-mind".to_string(),
            subtitle: "A book-length synthesis of the manuscript.".to_string(),
            base_url: "https://the-mind.xyz/".to_string(),
            language: "en".to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SiteConfigRaw {
    site: Option<SiteMetaRaw>,
}

#[derive(Debug, Default, Deserialize)]
struct SiteMetaRaw {
    title: Option<String>,
    subtitle: Option<String>,
    base_url: Option<String>,
    language: Option<String>,
}

pub fn load_site_config(path: &Path) -> Result<SiteConfig> {
    if !path.exists() {
        return Ok(SiteConfig::default());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let parsed: SiteConfigRaw = serde_yaml::from_str(&raw)
        .with_context(|| format!("failed to parse YAML config {}", path.display()))?;

    let defaults = SiteConfig::default();
    let site = parsed.site.unwrap_or_default();
    Ok(SiteConfig {
        title: non_empty_or(site.title, &defaults.title),
        subtitle: non_empty_or(site.subtitle, &defaults.subtitle),
        base_url: terminate_base_url(&non_empty_or(site.base_url, &defaults.base_url)),
        language: non_empty_or(site.language, &defaults.language),
    })
}

fn non_empty_or(value: Option<String>, default: &str) -> String {
    match value {
        Some(text) if !text.trim().is_empty() => text.trim().to_string(),
        _ => default.to_string(),
    }
}

fn terminate_base_url(url: &str) -> String {
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{url}/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let temp = TempDir::new().expect("tempdir");
        let config = load_site_config(&temp.path().join("mindpress.yaml")).expect("config");
        assert_eq!(config, SiteConfig::default());
    }

    #[test]
    fn values_override_defaults_and_base_url_is_terminated() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("mindpress.yaml");
        fs::write(
            &path,
            "site:\n  title: \"My Manuscript\"\n  base_url: \"https://mind.example\"\n",
        )
        .expect("write config");
        let config = load_site_config(&path).expect("config");
        assert_eq!(config.title, "My Manuscript");
        assert_eq!(config.base_url, "https://mind.example/");
        assert_eq!(config.language, "en");
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("mindpress.yaml");
        fs::write(&path, "site: [unbalanced\n").expect("write config");
        assert!(load_site_config(&path).is_err());
    }

    #[test]
    fn empty_values_fall_back() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("mindpress.yaml");
        fs::write(&path, "site:\n  title: \"  \"\n").expect("write config");
        let config = load_site_config(&path).expect("config");
        assert_eq!(config.title, SiteConfig::default().title);
    }
}
