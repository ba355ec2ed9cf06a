//! Config file discovery and loading for `.protoc-gen-template.toml`.
//!
//! An explicit path (`--config` or `PROTOC_GEN_TEMPLATE_CONFIG`) wins and must
//! load. Otherwise two locations are checked in precedence order:
//! 1. `./.protoc-gen-template.toml` (project-local)
//! 2. `~/.config/protoc-gen-template.toml` (user-global)
//!
//! Loading happens before logging is installed (the config carries the log
//! filter), so fallbacks are recorded on [`LoadedConfig`] and reported later.

use std::path::{Path, PathBuf};

use anyhow::anyhow;

use super::PluginConfig;

const CONFIG_FILENAME: &str = ".protoc-gen-template.toml";
const GLOBAL_CONFIG_DIR: &str = ".config";
const GLOBAL_CONFIG_FILENAME: &str = "protoc-gen-template.toml";

/// A loaded config plus where it came from.
#[derive(Debug, Default)]
pub(crate) struct LoadedConfig {
    pub config: PluginConfig,
    pub path: Option<PathBuf>,
    /// Set when a discovered file existed but could not be used.
    pub fallback: Option<String>,
}

impl LoadedConfig {
    /// Emit the load outcome through `tracing`. Call after the subscriber is up.
    pub(crate) fn report(&self) {
        match (&self.path, &self.fallback) {
            (Some(path), Some(error)) => {
                tracing::warn!(?path, %error, "Failed to load plugin config, using defaults");
            }
            (Some(path), None) => tracing::debug!(?path, "Loaded plugin config"),
            (None, _) => tracing::debug!("No plugin config found, using defaults"),
        }
    }
}

/// Load the plugin config.
///
/// An explicitly requested file that cannot be read or parsed is an error. A
/// discovered file with the same problem falls back to defaults.
pub(crate) fn load_config(explicit: Option<&Path>) -> anyhow::Result<LoadedConfig> {
    if let Some(path) = explicit {
        let config = read_config(path)
            .map_err(|e| anyhow!("failed to load config {}: {e}", path.display()))?;
        return Ok(LoadedConfig {
            config,
            path: Some(path.to_path_buf()),
            fallback: None,
        });
    }

    let Some(path) = find_config_file(Path::new("."), home_dir().as_deref()) else {
        return Ok(LoadedConfig::default());
    };
    Ok(match read_config(&path) {
        Ok(config) => LoadedConfig {
            config,
            path: Some(path),
            fallback: None,
        },
        Err(e) => LoadedConfig {
            config: PluginConfig::default(),
            path: Some(path),
            fallback: Some(e),
        },
    })
}

fn read_config(path: &Path) -> Result<PluginConfig, String> {
    let contents = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    toml::from_str(&contents).map_err(|e| e.to_string())
}

/// Search for a config file in precedence order.
fn find_config_file(work_dir: &Path, home: Option<&Path>) -> Option<PathBuf> {
    let local = work_dir.join(CONFIG_FILENAME);
    if local.is_file() {
        return Some(local);
    }

    if let Some(home) = home {
        let global = home.join(GLOBAL_CONFIG_DIR).join(GLOBAL_CONFIG_FILENAME);
        if global.is_file() {
            return Some(global);
        }
    }

    None
}

/// Expand a configured template path, resolving `~` to the home directory.
pub(crate) fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    #[serial]
    fn test_expand_path_tilde() {
        let home = TempDir::new().unwrap();
        let previous = std::env::var_os("HOME");
        std::env::set_var("HOME", home.path());

        let expanded = expand_path("~/proto-templates");

        match previous {
            Some(value) => std::env::set_var("HOME", value),
            None => std::env::remove_var("HOME"),
        }
        assert_eq!(expanded, home.path().join("proto-templates"));
    }

    #[test]
    fn test_expand_path_absolute_and_relative() {
        assert_eq!(expand_path("/usr/share/tmpl"), PathBuf::from("/usr/share/tmpl"));
        assert_eq!(expand_path("./templates"), PathBuf::from("./templates"));
        assert_eq!(expand_path("~user/x"), PathBuf::from("~user/x"));
    }

    #[test]
    fn test_parse_config_toml() {
        let toml_str = r#"
template-paths = ["./templates", "~/proto-templates"]
log-filter = "protoc_gen_template=debug"
"#;
        let config: PluginConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.template_paths, vec!["./templates", "~/proto-templates"]);
        assert_eq!(config.log_filter.as_deref(), Some("protoc_gen_template=debug"));
    }

    #[test]
    fn test_parse_empty_config() {
        let config: PluginConfig = toml::from_str("").unwrap();
        assert_eq!(config, PluginConfig::default());
    }

    #[test]
    fn test_rejects_unknown_keys() {
        assert!(toml::from_str::<PluginConfig>("template_paths = []").is_err());
    }

    #[test]
    fn test_local_config_wins_over_global() {
        let work = TempDir::new().unwrap();
        let home = TempDir::new().unwrap();
        fs::create_dir_all(home.path().join(GLOBAL_CONFIG_DIR)).unwrap();
        let global = home.path().join(GLOBAL_CONFIG_DIR).join(GLOBAL_CONFIG_FILENAME);
        fs::write(&global, "").unwrap();

        assert_eq!(find_config_file(work.path(), Some(home.path())), Some(global));

        let local = work.path().join(CONFIG_FILENAME);
        fs::write(&local, "").unwrap();
        assert_eq!(find_config_file(work.path(), Some(home.path())), Some(local));
    }

    #[test]
    fn test_no_config_found() {
        let work = TempDir::new().unwrap();
        assert_eq!(find_config_file(work.path(), None), None);
    }

    #[test]
    fn test_explicit_config_loads() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        fs::write(&path, "template-paths = [\"tmpl\"]\n").unwrap();

        let loaded = load_config(Some(&path)).unwrap();
        assert_eq!(loaded.config.template_paths, vec!["tmpl"]);
        assert_eq!(loaded.path, Some(path));
        assert!(loaded.fallback.is_none());
    }

    #[test]
    fn test_explicit_config_errors_are_fatal() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.toml");
        let err = load_config(Some(&missing)).unwrap_err();
        assert!(err.to_string().contains("missing.toml"));

        let broken = dir.path().join("broken.toml");
        fs::write(&broken, "template-paths = [").unwrap();
        assert!(load_config(Some(&broken)).is_err());
    }

    #[test]
    #[serial]
    fn test_broken_discovered_config_falls_back() {
        let work = TempDir::new().unwrap();
        fs::write(work.path().join(CONFIG_FILENAME), "log-filter = 3").unwrap();
        let previous = std::env::current_dir().unwrap();
        std::env::set_current_dir(work.path()).unwrap();

        let loaded = load_config(None);

        std::env::set_current_dir(previous).unwrap();
        let loaded = loaded.unwrap();
        assert_eq!(loaded.config, PluginConfig::default());
        assert!(loaded.path.is_some());
        assert!(loaded.fallback.is_some());
    }
}
