use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

/// Example configuration shipped with the binary. Also the source of the
/// built-in defaults.
pub const EXAMPLE_CONFIG: &str = include_str!("../../docs/example_config.yaml");

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Category {
    pub name: String,
    pub symbols: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SourceConfig {
    pub base_url: String,
    /// Path and query appended to `base_url`; `{symbol}` is replaced by the ticker.
    pub path: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl SourceConfig {
    pub fn url_for(&self, symbol: &str) -> String {
        format!("{}{}", self.base_url, self.path.replace("{symbol}", symbol))
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig {
            base_url: "http://ichart.finance.yahoo.com".to_string(),
            path: "/table.csv?s={symbol}".to_string(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ComparisonConfig {
    pub first: String,
    pub second: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Record the failing symbol and continue with the rest.
    #[default]
    Isolate,
    /// Stop the run at the first failing symbol.
    Abort,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub data_dir: Option<String>,
    pub anchor_date: NaiveDate,
    #[serde(default = "default_alpha")]
    pub alpha: f64,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    #[serde(default)]
    pub source: SourceConfig,
    pub comparison: ComparisonConfig,
    pub categories: Vec<Category>,
}

fn default_alpha() -> f64 {
    0.05
}

/// Names end up as a single path component and in the request URL.
fn is_path_safe(name: &str) -> bool {
    !name.contains("..")
        && !name
            .chars()
            .any(|c| c == '/' || c == '\\' || c.is_whitespace())
}

impl AppConfig {
    /// Loads the config from the default location, falling back to the
    /// built-in defaults when no file exists there.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!(
                "No config at {}, using built-in defaults",
                config_path.display()
            );
            return Self::builtin();
        }
        Self::load_from_path(&config_path)
    }

    pub fn builtin() -> Result<Self> {
        Self::from_yaml(EXAMPLE_CONFIG).context("Failed to parse built-in config")
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("org", "fundtrend", "fundtrend")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_dir {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("org", "fundtrend", "fundtrend")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config = Self::from_yaml(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn category(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.name == name)
    }

    /// Returns the two categories named in `comparison`, in order.
    pub fn compared_categories(&self) -> Result<(&Category, &Category)> {
        let first = self
            .category(&self.comparison.first)
            .with_context(|| format!("Unknown category: {}", self.comparison.first))?;
        let second = self
            .category(&self.comparison.second)
            .with_context(|| format!("Unknown category: {}", self.comparison.second))?;
        Ok((first, second))
    }

    fn validate(&self) -> Result<()> {
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            bail!("alpha must be between 0 and 1, got {}", self.alpha);
        }
        if !self.source.path.contains("{symbol}") {
            bail!("source.path must contain {{symbol}}: {}", self.source.path);
        }
        for category in &self.categories {
            if category.name.trim().is_empty() {
                bail!("Category name must not be empty");
            }
            if !is_path_safe(&category.name) {
                bail!("Category name {:?} is not a valid directory name", category.name);
            }
            if category.symbols.iter().any(|s| s.trim().is_empty()) {
                bail!("Category {} contains an empty symbol", category.name);
            }
            if let Some(bad) = category.symbols.iter().find(|s| !is_path_safe(s)) {
                bail!("Category {} contains an invalid symbol {:?}", category.name, bad);
            }
        }
        if self.comparison.first == self.comparison.second {
            bail!(
                "comparison needs two different categories, got {} twice",
                self.comparison.first
            );
        }
        self.compared_categories()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
data_dir: "/tmp/funds"
anchor_date: "2015-06-01"
alpha: 0.01
failure_policy: abort
source:
  base_url: "http://example.com"
  path: "/csv/{symbol}"
comparison:
  first: bonds
  second: emerging
categories:
  - name: bonds
    symbols: [TBT, LBND, LBND]
  - name: emerging
    symbols: [EMB]
"#;

        let config = AppConfig::from_yaml(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.data_dir.as_deref(), Some("/tmp/funds"));
        assert_eq!(
            config.anchor_date,
            NaiveDate::from_ymd_opt(2015, 6, 1).unwrap()
        );
        assert_eq!(config.alpha, 0.01);
        assert_eq!(config.failure_policy, FailurePolicy::Abort);
        assert_eq!(config.source.timeout_secs, 30);
        assert_eq!(config.source.url_for("EMB"), "http://example.com/csv/EMB");

        let (first, second) = config.compared_categories().unwrap();
        assert_eq!(first.name, "bonds");
        assert_eq!(first.symbols, vec!["TBT", "LBND", "LBND"]);
        assert_eq!(second.symbols, vec!["EMB"]);
        assert_eq!(config.data_dir().unwrap(), PathBuf::from("/tmp/funds"));
    }

    #[test]
    fn test_defaults_applied() {
        let yaml_str = r#"
anchor_date: "2011-02-09"
comparison: { first: a, second: b }
categories:
  - { name: a, symbols: [X] }
  - { name: b, symbols: [Y] }
"#;
        let config = AppConfig::from_yaml(yaml_str).unwrap();
        assert_eq!(config.alpha, 0.05);
        assert_eq!(config.failure_policy, FailurePolicy::Isolate);
        assert_eq!(
            config.source.url_for("TBT"),
            "http://ichart.finance.yahoo.com/table.csv?s=TBT"
        );
    }

    #[test]
    fn test_builtin_config_matches_original_lists() {
        let config = AppConfig::builtin().unwrap();
        let (bonds, emerging) = config.compared_categories().unwrap();
        assert_eq!(bonds.name, "US_bond");
        assert_eq!(bonds.symbols.len(), 12);
        assert_eq!(
            bonds.symbols.iter().filter(|s| s.as_str() == "LBND").count(),
            2
        );
        assert_eq!(emerging.name, "emerging_market");
        assert_eq!(emerging.symbols.len(), 19);
        assert_eq!(
            config.anchor_date,
            NaiveDate::from_ymd_opt(2011, 2, 9).unwrap()
        );
    }

    #[test]
    fn test_validation_errors() {
        let unknown = r#"
anchor_date: "2011-02-09"
comparison: { first: a, second: missing }
categories:
  - { name: a, symbols: [X] }
"#;
        let err = AppConfig::from_yaml(unknown).unwrap_err();
        assert!(err.to_string().contains("Unknown category: missing"));

        let bad_alpha = r#"
anchor_date: "2011-02-09"
alpha: 1.5
comparison: { first: a, second: b }
categories:
  - { name: a, symbols: [X] }
  - { name: b, symbols: [Y] }
"#;
        let err = AppConfig::from_yaml(bad_alpha).unwrap_err();
        assert!(err.to_string().contains("alpha"));

        let bad_path = r#"
anchor_date: "2011-02-09"
source: { base_url: "http://x", path: "/fixed.csv" }
comparison: { first: a, second: b }
categories:
  - { name: a, symbols: [X] }
  - { name: b, symbols: [Y] }
"#;
        let err = AppConfig::from_yaml(bad_path).unwrap_err();
        assert!(err.to_string().contains("{symbol}"));

        let empty_symbol = r#"
anchor_date: "2011-02-09"
comparison: { first: a, second: b }
categories:
  - { name: a, symbols: ["", X] }
  - { name: b, symbols: [Y] }
"#;
        assert!(AppConfig::from_yaml(empty_symbol).is_err());

        for symbol in ["../US_bond/TBT", "a\\\\b", "TB T", ".."] {
            let escaping = format!(
                r#"
anchor_date: "2011-02-09"
comparison: {{ first: a, second: b }}
categories:
  - {{ name: a, symbols: [X] }}
  - {{ name: b, symbols: ["{symbol}"] }}
"#
            );
            let err = AppConfig::from_yaml(&escaping).unwrap_err();
            assert!(err.to_string().contains("invalid symbol"), "{symbol}: {err}");
        }

        let bad_name = r#"
anchor_date: "2011-02-09"
comparison: { first: a, second: "../b" }
categories:
  - { name: a, symbols: [X] }
  - { name: "../b", symbols: [Y] }
"#;
        let err = AppConfig::from_yaml(bad_name).unwrap_err();
        assert!(err.to_string().contains("not a valid directory name"));
    }
}
