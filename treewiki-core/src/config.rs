//! Configuration parsing and management.
//!
//! Every site is described by an explicit [`SiteConfig`] record. Paths are
//! resolved against the configuration file's directory once, when the file
//! is loaded, so the rest of the crate only sees concrete paths.

use crate::tree::MAX_LEAF_LEVEL;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Site '{site}' has leaf_level {level}; the maximum is {max}", max = MAX_LEAF_LEVEL)]
    InvalidLeafLevel { site: String, level: usize },

    #[error("Unknown site: {0}")]
    UnknownSite(String),
}

/// Main configuration struct matching the treewiki.yml schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sites: Vec<SiteConfig>,

    #[serde(default)]
    pub server: ServerConfig,

    // Internal: path to config file (for relative path resolution)
    #[serde(skip)]
    config_path: Option<PathBuf>,
}

/// Resolved resources for a single site
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    pub name: String,

    /// Flat source file
    pub source: PathBuf,

    /// Page template with `{placeholder}` slots
    pub template: PathBuf,

    /// Markup replacement table; an empty codec is used when absent
    #[serde(default)]
    pub replacements: Option<PathBuf>,

    /// Output directory for rendered pages
    pub output: PathBuf,

    /// Generation at which pages become leaf files
    pub leaf_level: usize,

    /// Stylesheet path relative to the output directory
    #[serde(default = "default_stylesheet")]
    pub stylesheet: String,

    /// Tags whose contents are dropped before indexing
    #[serde(default = "default_dropped_spans")]
    pub dropped_spans: Vec<String>,

    /// File name of the search index inside the output directory
    #[serde(default = "default_search_index")]
    pub search_index: String,

    /// Static files copied into the output directory
    #[serde(default)]
    pub assets: Option<PathBuf>,
}

fn default_stylesheet() -> String {
    String::from("style.css")
}

fn default_dropped_spans() -> Vec<String> {
    vec![String::from("ipa")]
}

fn default_search_index() -> String {
    String::from("search-index.json")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        let mut config = Self::from_yaml(&contents, base)?;

        // Store config file path for reference
        config.config_path = Some(path.to_path_buf());

        Ok(config)
    }

    /// Parse configuration text, resolving relative paths against `base`
    pub fn from_yaml(contents: &str, base: &Path) -> Result<Self, ConfigError> {
        let mut config: Config = serde_yaml::from_str(contents)?;

        if config.sites.is_empty() {
            return Err(ConfigError::MissingField("sites".to_string()));
        }

        for site in &mut config.sites {
            if site.leaf_level > MAX_LEAF_LEVEL {
                return Err(ConfigError::InvalidLeafLevel {
                    site: site.name.clone(),
                    level: site.leaf_level,
                });
            }
            site.resolve_paths(base);
        }

        Ok(config)
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Look up a site by name
    pub fn site(&self, name: &str) -> Result<&SiteConfig, ConfigError> {
        self.sites
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| ConfigError::UnknownSite(name.to_string()))
    }

    /// The named site, or every site when `name` is `None`
    pub fn select(&self, name: Option<&str>) -> Result<Vec<&SiteConfig>, ConfigError> {
        match name {
            Some(name) => Ok(vec![self.site(name)?]),
            None => Ok(self.sites.iter().collect()),
        }
    }
}

impl SiteConfig {
    fn resolve_paths(&mut self, base: &Path) {
        self.source = resolve_path(base, &self.source);
        self.template = resolve_path(base, &self.template);
        self.output = resolve_path(base, &self.output);
        self.replacements = self.replacements.as_ref().map(|p| resolve_path(base, p));
        self.assets = self.assets.as_ref().map(|p| resolve_path(base, p));
    }

    /// Path of the search index file
    pub fn search_index_path(&self) -> PathBuf {
        self.output.join(&self.search_index)
    }
}

/// Resolve a path relative to the config file location
fn resolve_path(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
sites:
  - name: dictionary
    source: dictionary.txt
    template: templates/dictionary.html
    replacements: replacements.txt
    output: public/dictionary
    leaf_level: 2
  - name: story
    source: /abs/story.txt
    template: templates/story.html
    output: public/story
    leaf_level: 3
    stylesheet: ../style.css
    dropped_spans: []
server:
  port: 9000
"#;

    #[test]
    fn test_paths_resolved_against_base() {
        let config = Config::from_yaml(CONFIG, Path::new("/project")).unwrap();
        let dictionary = config.site("dictionary").unwrap();
        assert_eq!(dictionary.source, PathBuf::from("/project/dictionary.txt"));
        assert_eq!(
            dictionary.replacements,
            Some(PathBuf::from("/project/replacements.txt"))
        );
        assert_eq!(
            dictionary.search_index_path(),
            PathBuf::from("/project/public/dictionary/search-index.json")
        );

        let story = config.site("story").unwrap();
        assert_eq!(story.source, PathBuf::from("/abs/story.txt"));
        assert_eq!(story.replacements, None);
    }

    #[test]
    fn test_default_values() {
        let config = Config::from_yaml(CONFIG, Path::new("/project")).unwrap();
        let dictionary = config.site("dictionary").unwrap();
        assert_eq!(dictionary.stylesheet, "style.css");
        assert_eq!(dictionary.dropped_spans, vec!["ipa".to_string()]);
        assert_eq!(dictionary.search_index, "search-index.json");
        assert!(config.site("story").unwrap().dropped_spans.is_empty());
        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn test_select_sites() {
        let config = Config::from_yaml(CONFIG, Path::new("/project")).unwrap();
        assert_eq!(config.select(None).unwrap().len(), 2);
        assert_eq!(config.select(Some("story")).unwrap()[0].name, "story");
        assert!(matches!(
            config.select(Some("grammar")),
            Err(ConfigError::UnknownSite(_))
        ));
    }

    #[test]
    fn test_validation() {
        assert!(matches!(
            Config::from_yaml("sites: []\n", Path::new(".")),
            Err(ConfigError::MissingField(_))
        ));

        let too_deep = CONFIG.replace("leaf_level: 3", "leaf_level: 12");
        assert!(matches!(
            Config::from_yaml(&too_deep, Path::new(".")),
            Err(ConfigError::InvalidLeafLevel { level: 12, .. })
        ));
    }
}
