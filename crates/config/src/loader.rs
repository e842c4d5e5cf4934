use std::{
    path::{Path, PathBuf},
    sync::Mutex,
};

use {anyhow::Context, tracing::debug};

use crate::{env_subst::substitute_env, schema::PineappleConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "pineapple.toml",
    "pineapple.yaml",
    "pineapple.yml",
    "pineapple.json",
];

const APP_NAME: &str = "pineapple";

/// Override for the config directory, set by `--config-dir`.
static CONFIG_DIR_OVERRIDE: Mutex<Option<PathBuf>> = Mutex::new(None);

/// Override for the data directory, set by `--data-dir`.
static DATA_DIR_OVERRIDE: Mutex<Option<PathBuf>> = Mutex::new(None);

/// Use `dir` instead of the platform config directory for discovery.
pub fn set_config_dir(dir: PathBuf) {
    if let Ok(mut guard) = CONFIG_DIR_OVERRIDE.lock() {
        *guard = Some(dir);
    }
}

pub fn clear_config_dir() {
    if let Ok(mut guard) = CONFIG_DIR_OVERRIDE.lock() {
        *guard = None;
    }
}

/// Use `dir` for room logs regardless of `data.dir` in the config file.
pub fn set_data_dir(dir: PathBuf) {
    if let Ok(mut guard) = DATA_DIR_OVERRIDE.lock() {
        *guard = Some(dir);
    }
}

pub fn clear_data_dir() {
    if let Ok(mut guard) = DATA_DIR_OVERRIDE.lock() {
        *guard = None;
    }
}

fn config_dir_override() -> Option<PathBuf> {
    CONFIG_DIR_OVERRIDE.lock().ok().and_then(|g| g.clone())
}

fn data_dir_override() -> Option<PathBuf> {
    DATA_DIR_OVERRIDE.lock().ok().and_then(|g| g.clone())
}

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<PineappleConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Load the config file as an untyped JSON value, with env substitution.
pub fn load_config_value(path: &Path) -> anyhow::Result<serde_json::Value> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config_value(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./pineapple.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/pineapple/pineapple.{toml,yaml,yml,json}` (user-global, or the
///    `--config-dir` override)
///
/// Returns `PineappleConfig::default()` if no config file is found. A file
/// that exists but cannot be read or parsed is an error.
pub fn discover_and_load() -> anyhow::Result<PineappleConfig> {
    let Some(path) = find_config_file() else {
        debug!("no config file found, using defaults");
        return Ok(PineappleConfig::default());
    };
    debug!(path = %path.display(), "loading config");
    load_config(&path).with_context(|| format!("loading config from {}", path.display()))
}

/// Find the first config file in standard locations.
pub fn find_config_file() -> Option<PathBuf> {
    if let Some(dir) = config_dir_override() {
        return find_in(&dir);
    }

    // Project-local
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    // User-global: ~/.config/pineapple/
    config_dir().and_then(|dir| find_in(&dir))
}

fn find_in(dir: &Path) -> Option<PathBuf> {
    CONFIG_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.exists())
}

/// Returns the config directory: the override if set, else `~/.config/pineapple/`.
pub fn config_dir() -> Option<PathBuf> {
    config_dir_override().or_else(|| {
        directories::ProjectDirs::from("", "", APP_NAME).map(|d| d.config_dir().to_path_buf())
    })
}

/// Resolve the room log directory.
///
/// Precedence: `--data-dir` override, then `data.dir` from the config, then
/// the platform data directory (`~/.local/share/pineapple/`), then `./data`.
pub fn data_dir(config: &PineappleConfig) -> PathBuf {
    if let Some(dir) = data_dir_override() {
        return dir;
    }
    if let Some(dir) = &config.data.dir {
        return dir.clone();
    }
    directories::ProjectDirs::from("", "", APP_NAME)
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("data"))
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<PineappleConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}

pub(crate) fn parse_config_value(raw: &str, path: &Path) -> anyhow::Result<serde_json::Value> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => {
            let v: toml::Value = toml::from_str(raw)?;
            Ok(serde_json::to_value(v)?)
        },
        "yaml" | "yml" => {
            let v: serde_yaml::Value = serde_yaml::from_str(raw)?;
            Ok(serde_json::to_value(v)?)
        },
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    /// The overrides are process-wide; tests touching them run under this lock.
    static OVERRIDE_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn load_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pineapple.toml");
        std::fs::write(&path, "[data]\nsecret_marker = \"MARK\"\n").unwrap();
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.data.secret_marker, "MARK");
    }

    #[test]
    fn load_yaml_and_json_files() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = dir.path().join("pineapple.yaml");
        std::fs::write(&yaml, "data:\n  secret_marker: Y\nreply:\n  mark_read: false\n").unwrap();
        let cfg = load_config(&yaml).unwrap();
        assert_eq!(cfg.data.secret_marker, "Y");
        assert!(!cfg.reply.mark_read);

        let json = dir.path().join("pineapple.json");
        std::fs::write(&json, r#"{"reply": {"policy": "never"}}"#).unwrap();
        let cfg = load_config(&json).unwrap();
        assert_eq!(cfg.reply.policy, pineapple_channels::gating::ReplyPolicy::Never);
    }

    #[test]
    fn unsupported_extension_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pineapple.ini");
        std::fs::write(&path, "x=1").unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("unsupported config format"));
    }

    #[test]
    fn missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(&dir.path().join("nope.toml")).is_err());
    }

    #[test]
    fn value_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pineapple.toml");
        std::fs::write(&path, "[channels.matrix.main]\nusername = \"bot\"\n").unwrap();
        let value = load_config_value(&path).unwrap();
        assert_eq!(value["channels"]["matrix"]["main"]["username"], "bot");
    }

    #[test]
    fn config_dir_override_is_searched() {
        let _guard = OVERRIDE_LOCK.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("pineapple.yml"),
            "data:\n  secret_marker: FROM_OVERRIDE\n",
        )
        .unwrap();

        set_config_dir(dir.path().to_path_buf());
        let found = find_config_file();
        let cfg = discover_and_load().unwrap();
        clear_config_dir();

        assert_eq!(found, Some(dir.path().join("pineapple.yml")));
        assert_eq!(cfg.data.secret_marker, "FROM_OVERRIDE");
    }

    #[test]
    fn empty_override_dir_gives_defaults() {
        let _guard = OVERRIDE_LOCK.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        set_config_dir(dir.path().to_path_buf());
        let found = find_config_file();
        let cfg = discover_and_load().unwrap();
        clear_config_dir();

        assert!(found.is_none());
        assert!(cfg.data.secret_marker.is_empty());
    }

    #[test]
    fn unparsable_config_is_an_error() {
        let _guard = OVERRIDE_LOCK.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("pineapple.toml"),
            "[data]\nsecret_marker = \"MARK\"\n[reply\n",
        )
        .unwrap();

        set_config_dir(dir.path().to_path_buf());
        let result = discover_and_load();
        clear_config_dir();

        let err = result.unwrap_err();
        assert!(err.to_string().contains("pineapple.toml"), "{err}");
    }

    #[test]
    fn data_dir_precedence() {
        let _guard = OVERRIDE_LOCK.lock().unwrap();
        let mut cfg = PineappleConfig::default();
        cfg.data.dir = Some(PathBuf::from("/srv/pineapple"));
        assert_eq!(data_dir(&cfg), PathBuf::from("/srv/pineapple"));

        set_data_dir(PathBuf::from("/tmp/override"));
        let resolved = data_dir(&cfg);
        clear_data_dir();
        assert_eq!(resolved, PathBuf::from("/tmp/override"));
    }
}
