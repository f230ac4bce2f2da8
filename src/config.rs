use crate::bind9::formatter::DEFAULT_INDENT;
use crate::bind9::{Filter, FilterTag};
use crate::kea::Universe;
use anyhow::Context;
use serde::Deserialize;
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "appcfg.toml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub bind9: Bind9Config,
    #[serde(default)]
    pub kea: KeaSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Bind9Config {
    #[serde(default = "default_indent")]
    pub indent: String,
    /// Filter tags applied to output; empty means everything is written.
    #[serde(default)]
    pub filter: Vec<String>,
}

impl Default for Bind9Config {
    fn default() -> Self {
        Self {
            indent: default_indent(),
            filter: Vec::new(),
        }
    }
}

fn default_indent() -> String {
    DEFAULT_INDENT.to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct KeaSettings {
    #[serde(default)]
    pub universe: Universe,
    #[serde(default)]
    pub option_defs_dir: Option<String>,
}

impl Bind9Config {
    pub fn filter(&self) -> anyhow::Result<Option<Filter>> {
        if self.filter.is_empty() {
            return Ok(None);
        }
        let mut tags = Vec::new();
        for t in &self.filter {
            tags.push(t.parse::<FilterTag>().with_context(|| format!("invalid filter tag: {t}"))?);
        }
        Ok(Some(Filter::new(tags)))
    }
}

impl AppConfig {
    /// Reads the TOML file at `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let s = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&s)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_sections() -> anyhow::Result<()> {
        let cfg: AppConfig = toml::from_str(
            r#"
[bind9]
indent = "  "
filter = ["config", "zone"]

[kea]
universe = "v6"
option_defs_dir = "defs"
"#,
        )?;
        assert_eq!(cfg.bind9.indent, "  ");
        let filter = cfg.bind9.filter()?.expect("filter configured");
        assert!(filter.is_enabled(FilterTag::Zone));
        assert!(!filter.is_enabled(FilterTag::View));
        assert_eq!(cfg.kea.universe, Universe::V6);
        assert_eq!(cfg.kea.option_defs_dir.as_deref(), Some("defs"));
        Ok(())
    }

    #[test]
    fn missing_sections_use_defaults() -> anyhow::Result<()> {
        let cfg: AppConfig = toml::from_str("")?;
        assert_eq!(cfg.bind9.indent, "\t");
        assert!(cfg.bind9.filter()?.is_none());
        assert_eq!(cfg.kea.universe, Universe::V4);

        let dir = tempfile::TempDir::new()?;
        let cfg = AppConfig::load(&dir.path().join("absent.toml"))?;
        assert_eq!(cfg.bind9.indent, "\t");
        Ok(())
    }

    #[test]
    fn invalid_filter_tag_is_an_error() {
        let cfg = Bind9Config {
            filter: vec!["views".into()],
            ..Bind9Config::default()
        };
        assert!(cfg.filter().is_err());
    }
}
