//! Bridge configuration – reads/writes `~/.daqbridge/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use daqbridge_sdk::reference::ReferenceConfig;
use daqbridge_types::{DaqError, DaqResult};
use serde::{Deserialize, Serialize};

/// Persisted configuration stored in `~/.daqbridge/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Simulated devices offered by the reference module.
    #[serde(default = "default_reference_devices")]
    pub reference_devices: usize,

    /// Channels on each reference device.
    #[serde(default = "default_reference_channels")]
    pub reference_channels: usize,

    /// Initial sample rate of reference devices, in Hz.
    #[serde(default = "default_sample_rate")]
    pub sample_rate: f64,

    /// Timeout used by the shell's `/read` when none is given.
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    #[serde(default = "default_prompt")]
    pub prompt: String,

    /// Shell history file; relative paths are resolved against the
    /// config directory.
    #[serde(default = "default_history_file")]
    pub history_file: String,

    /// Connection string the shell adds on start-up.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_connect: Option<String>,
}

fn default_reference_devices() -> usize {
    2
}
fn default_reference_channels() -> usize {
    2
}
fn default_sample_rate() -> f64 {
    1000.0
}
fn default_read_timeout_ms() -> u64 {
    1000
}
fn default_prompt() -> String {
    "daq".to_string()
}
fn default_history_file() -> String {
    "history.txt".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            reference_devices: default_reference_devices(),
            reference_channels: default_reference_channels(),
            sample_rate: default_sample_rate(),
            read_timeout_ms: default_read_timeout_ms(),
            prompt: default_prompt(),
            history_file: default_history_file(),
            auto_connect: None,
        }
    }
}

impl Config {
    pub fn reference(&self) -> ReferenceConfig {
        ReferenceConfig {
            device_count: self.reference_devices,
            channel_count: self.reference_channels,
            sample_rate: self.sample_rate,
        }
    }

    /// History file path; relative names live next to the config file.
    pub fn history_path(&self) -> PathBuf {
        let history = PathBuf::from(&self.history_file);
        if history.is_absolute() {
            return history;
        }
        match config_path().parent() {
            Some(dir) => dir.join(history),
            None => history,
        }
    }
}

/// Path of the config file: `DAQBRIDGE_CONFIG` if set, otherwise
/// `~/.daqbridge/config.toml`.
pub fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var("DAQBRIDGE_CONFIG") {
        return PathBuf::from(path);
    }
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".daqbridge").join("config.toml")
}

/// Load the config from disk. `Ok(None)` if the file does not exist.
pub fn load() -> DaqResult<Option<Config>> {
    load_from(&config_path())
}

pub fn load_from(path: &Path) -> DaqResult<Option<Config>> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)?;
    let mut cfg: Config = toml::from_str(&raw)
        .map_err(|e| DaqError::generic(format!("Failed to parse config at {}: {e}", path.display())))?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Apply `DAQBRIDGE_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `DAQBRIDGE_REF_DEVICES` | `reference_devices` |
/// | `DAQBRIDGE_REF_CHANNELS` | `reference_channels` |
/// | `DAQBRIDGE_SAMPLE_RATE` | `sample_rate` |
/// | `DAQBRIDGE_AUTO_CONNECT` | `auto_connect` |
///
/// Values that do not parse are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    apply_overrides(cfg, |name| std::env::var(name).ok());
}

fn apply_overrides(cfg: &mut Config, var: impl Fn(&str) -> Option<String>) {
    if let Some(n) = var("DAQBRIDGE_REF_DEVICES").and_then(|v| v.parse().ok()) {
        cfg.reference_devices = n;
    }
    if let Some(n) = var("DAQBRIDGE_REF_CHANNELS").and_then(|v| v.parse().ok()) {
        cfg.reference_channels = n;
    }
    if let Some(rate) = var("DAQBRIDGE_SAMPLE_RATE").and_then(|v| v.parse::<f64>().ok())
        && rate > 0.0
    {
        cfg.sample_rate = rate;
    }
    if let Some(conn) = var("DAQBRIDGE_AUTO_CONNECT") {
        cfg.auto_connect = Some(conn).filter(|c| !c.is_empty());
    }
}

/// Save the config, creating `~/.daqbridge/` if necessary.
pub fn save(cfg: &Config) -> DaqResult<()> {
    save_to(cfg, &config_path())
}

pub fn save_to(cfg: &Config, path: &Path) -> DaqResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700))?;
        }
    }
    let raw = toml::to_string_pretty(cfg).map_err(|e| DaqError::generic(format!("Failed to serialize config: {e}")))?;
    #[cfg(unix)]
    {
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)?;
        file.write_all(raw.as_bytes())?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        assert!(load_from(&dir.path().join("none.toml")).unwrap().is_none());
    }

    #[test]
    fn partial_files_use_defaults() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "reference_devices = 4\nprompt = \"lab\"\n").unwrap();
        let cfg = load_from(&path).unwrap().unwrap();
        assert_eq!(cfg.reference_devices, 4);
        assert_eq!(cfg.prompt, "lab");
        assert_eq!(cfg.reference_channels, 2);
        assert_eq!(cfg.reference().device_count, 4);
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        let cfg = Config {
            auto_connect: Some("daqref://device1".to_string()),
            sample_rate: 250.0,
            ..Config::default()
        };
        save_to(&cfg, &path).expect("save");
        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("auto_connect = \"daqref://device1\""));
        let mut loaded: Config = toml::from_str(&raw).unwrap();
        apply_overrides(&mut loaded, |_| None);
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn garbage_is_reported() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "reference_devices = \"many\"").unwrap();
        let err = load_from(&path).unwrap_err();
        assert_eq!(err.code(), daqbridge_types::ErrorCode::Generic);
    }

    #[test]
    fn overrides_replace_fields_and_skip_bad_values() {
        let vars: HashMap<&str, &str> = [
            ("DAQBRIDGE_REF_DEVICES", "3"),
            ("DAQBRIDGE_REF_CHANNELS", "lots"),
            ("DAQBRIDGE_SAMPLE_RATE", "-5"),
            ("DAQBRIDGE_AUTO_CONNECT", "daqref://device0"),
        ]
        .into_iter()
        .collect();
        let mut cfg = Config::default();
        apply_overrides(&mut cfg, |name| vars.get(name).map(|v| v.to_string()));
        assert_eq!(cfg.reference_devices, 3);
        assert_eq!(cfg.reference_channels, 2);
        assert_eq!(cfg.sample_rate, 1000.0);
        assert_eq!(cfg.auto_connect.as_deref(), Some("daqref://device0"));
    }

    #[cfg(unix)]
    #[test]
    fn config_file_has_restrictive_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        save_to(&Config::default(), &path).expect("save");

        let file_mode = fs::metadata(&path).expect("file metadata").permissions().mode() & 0o777;
        assert_eq!(file_mode, 0o600);
        let dir_mode = fs::metadata(path.parent().unwrap()).expect("dir metadata").permissions().mode() & 0o777;
        assert_eq!(dir_mode, 0o700);
    }
}
