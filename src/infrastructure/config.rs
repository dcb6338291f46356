use crate::domain::{config::ShellConfig, error::{ShellError, ShellResult}};
use std::fs;
use std::path::{Path, PathBuf};
use toml::Table;
use tracing::debug;

/// Configuration manager
pub struct ConfigManager {
    global_config_path: Option<PathBuf>,
    project_config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Create new configuration manager
    pub fn new() -> Self {
        Self {
            global_config_path: Self::get_global_config_path(),
            project_config_path: Self::find_project_config_path(),
        }
    }

    /// Manager reading from explicit locations
    pub fn with_paths(global: Option<PathBuf>, project: Option<PathBuf>) -> Self {
        Self {
            global_config_path: global,
            project_config_path: project,
        }
    }

    /// Load configuration, layering the project file over the global one
    pub fn load_config(&self) -> ShellResult<ShellConfig> {
        let mut merged = Table::new();

        for path in [&self.global_config_path, &self.project_config_path]
            .into_iter()
            .flatten()
        {
            if path.exists() {
                debug!("Loading configuration from {}", path.display());
                merge_tables(&mut merged, self.read_table(path)?);
            }
        }

        toml::Value::Table(merged).try_into().map_err(|e| ShellError::Config {
            message: format!("Invalid configuration: {}", e),
        })
    }

    /// Load configuration from specific path
    pub fn load_config_from_path(&self, path: &Path) -> ShellResult<ShellConfig> {
        let content = fs::read_to_string(path).map_err(|e| ShellError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        toml::from_str(&content).map_err(|e| ShellError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })
    }

    fn read_table(&self, path: &Path) -> ShellResult<Table> {
        let content = fs::read_to_string(path).map_err(|e| ShellError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        content.parse::<Table>().map_err(|e| ShellError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })
    }

    /// Get global configuration path
    fn get_global_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".config").join("mavshell").join("config.toml"))
    }

    /// Find project configuration path by walking up directory tree
    fn find_project_config_path() -> Option<PathBuf> {
        let current_dir = std::env::current_dir().ok()?;
        let mut path = current_dir.as_path();

        loop {
            let config_path = path.join(".mavshell").join("config.toml");
            if config_path.exists() {
                return Some(config_path);
            }

            path = path.parent()?;
        }
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Recursively overlay `overlay` onto `base`; scalar values in `overlay` win
fn merge_tables(base: &mut Table, overlay: Table) {
    for (key, value) in overlay {
        if let toml::Value::Table(incoming) = value {
            if let Some(toml::Value::Table(existing)) = base.get_mut(&key) {
                merge_tables(existing, incoming);
                continue;
            }
            base.insert(key, toml::Value::Table(incoming));
        } else {
            base.insert(key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_missing_files_give_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let manager = ConfigManager::with_paths(
            Some(temp_dir.path().join("absent.toml")),
            None,
        );
        let config = manager.load_config().unwrap();

        assert_eq!(config.link.baud_rate, 115200);
        assert_eq!(config.link.channel, 10);
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_project_overrides_global() {
        let temp_dir = TempDir::new().unwrap();
        let global = write(
            &temp_dir,
            "global.toml",
            "log_level = \"info\"\n[link]\nbaud_rate = 57600\nchannel = 3\n",
        );
        let project = write(&temp_dir, "project.toml", "[link]\nchannel = 10\n");

        let manager = ConfigManager::with_paths(Some(global), Some(project));
        let config = manager.load_config().unwrap();

        assert_eq!(config.log_level, "info");
        assert_eq!(config.link.baud_rate, 57600);
        assert_eq!(config.link.channel, 10);
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let broken = write(&temp_dir, "broken.toml", "[link\nbaud_rate = ");
        let manager = ConfigManager::with_paths(Some(broken.clone()), None);

        assert!(matches!(manager.load_config(), Err(ShellError::Config { .. })));
        assert!(manager.load_config_from_path(&broken).is_err());
    }

    #[test]
    fn test_wrong_type_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = write(&temp_dir, "typed.toml", "[link]\nchannel = \"shell\"\n");
        let manager = ConfigManager::with_paths(Some(path), None);
        assert!(matches!(manager.load_config(), Err(ShellError::Config { .. })));
    }

    #[test]
    fn test_explicit_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = write(&temp_dir, "explicit.toml", "[terminal]\nprompt_offset = 7\n");
        let config = ConfigManager::with_paths(None, None)
            .load_config_from_path(&path)
            .unwrap();
        assert_eq!(config.terminal.prompt_offset, 7);
    }
}
