use crate::core::config::{AppConfig, EXAMPLE_CONFIG};
use crate::store::SeriesStore;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Creates a default configuration file, plus the category directories it
/// names. The file goes to `path`, else the global `--config` path, else the
/// default location.
pub fn setup(path: Option<PathBuf>, config_path: Option<&str>) -> Result<()> {
    setup_at_path(setup_target(path, config_path)?)
}

pub fn setup_target(path: Option<PathBuf>, config_path: Option<&str>) -> Result<PathBuf> {
    match (path, config_path) {
        (Some(p), _) => Ok(p),
        (None, Some(c)) => Ok(PathBuf::from(c)),
        (None, None) => AppConfig::default_config_path(),
    }
}

/// Creates a default configuration file at the specified path, plus the
/// category directories it names.
pub fn setup_at_path<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();
    let config = write_default_config(path)?;
    let created = create_data_dirs(&config)?;
    for dir in &created {
        tracing::info!("Created data directory {}", dir.display());
    }
    println!("Configuration written to {}", path.display());
    Ok(())
}

/// Writes the example configuration to `path` and returns it parsed.
pub fn write_default_config(path: &Path) -> Result<AppConfig> {
    if path.exists() {
        anyhow::bail!("Configuration file already exists at {}", path.display());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    std::fs::write(path, EXAMPLE_CONFIG)
        .with_context(|| format!("Failed to write config file to {}", path.display()))?;
    tracing::info!("Created default configuration at {}", path.display());

    AppConfig::load_from_path(path)
}

/// Creates `<data_dir>/<category>` for every configured category.
pub fn create_data_dirs(config: &AppConfig) -> Result<Vec<PathBuf>> {
    let store = SeriesStore::new(config.data_dir()?);
    let created =
        store.create_category_dirs(config.categories.iter().map(|c| c.name.as_str()))?;
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_setup_creates_config_file() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("nested").join("config.yaml");

        let config = write_default_config(&config_path)?;

        assert!(config_path.exists());
        assert_eq!(config.categories.len(), 2);
        let content = fs::read_to_string(&config_path)?;
        assert!(content.contains("# Example configuration file for fundtrend"));
        assert!(content.contains("categories:"));
        assert!(content.contains("anchor_date:"));

        Ok(())
    }

    #[test]
    fn test_setup_fails_if_config_exists() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("config.yaml");

        std::fs::write(&config_path, "test")?;

        let result = write_default_config(&config_path);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("already exists"));

        Ok(())
    }

    #[test]
    fn test_setup_target_prefers_explicit_path() -> Result<()> {
        let explicit = PathBuf::from("/tmp/explicit.yaml");
        assert_eq!(
            setup_target(Some(explicit.clone()), Some("/tmp/global.yaml"))?,
            explicit
        );
        assert_eq!(
            setup_target(None, Some("/tmp/global.yaml"))?,
            PathBuf::from("/tmp/global.yaml")
        );
        Ok(())
    }

    #[test]
    fn test_create_data_dirs() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let mut config = AppConfig::builtin()?;
        config.data_dir = Some(temp_dir.path().join("data").display().to_string());

        let created = create_data_dirs(&config)?;
        assert_eq!(created.len(), 2);
        assert!(temp_dir.path().join("data").join("US_bond").is_dir());
        assert!(temp_dir.path().join("data").join("emerging_market").is_dir());

        Ok(())
    }
}
