//! Configuration – reads/writes `~/.pointsman/config.toml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use pointsman_motion::waypoints::{TOOL_OFFSET, TOOL_SETTLE};
use pointsman_runtime::SessionConfig;
use pointsman_runtime::session::{
    DEFAULT_CONTROLLER_ADDRESS, DEFAULT_CONTROLLER_PORT, DEFAULT_PROBE_TIMEOUT,
    DEFAULT_REFERENCE_FRAME, DEFAULT_SIMULATION_SPEED,
};
use pointsman_types::Pose;

/// Persisted operator configuration stored in `~/.pointsman/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Address of the arm controller.
    #[serde(default = "default_controller_address")]
    pub controller_address: String,

    /// Script port of the arm controller.
    #[serde(default = "default_controller_port")]
    pub controller_port: u16,

    /// Bound on the one-shot reachability probe.
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,

    /// Wait after `set_tcp` before the first move of a routine.
    #[serde(default = "default_tool_settle_ms")]
    pub tool_settle_ms: u64,

    /// Simulated linear speed in mm/s.
    #[serde(default = "default_simulation_speed")]
    pub simulation_speed: f64,

    /// Reference frame the simulated pose targets are expressed in.
    #[serde(default = "default_reference_frame")]
    pub reference_frame: String,

    /// Tool-center-point offset `[x, y, z, rx, ry, rz]`.
    #[serde(default = "default_tool_offset")]
    pub tool_offset: Pose,
}

fn default_controller_address() -> String {
    DEFAULT_CONTROLLER_ADDRESS.to_string()
}
fn default_controller_port() -> u16 {
    DEFAULT_CONTROLLER_PORT
}
fn default_probe_timeout_ms() -> u64 {
    DEFAULT_PROBE_TIMEOUT.as_millis() as u64
}
fn default_tool_settle_ms() -> u64 {
    TOOL_SETTLE.as_millis() as u64
}
fn default_simulation_speed() -> f64 {
    DEFAULT_SIMULATION_SPEED
}
fn default_reference_frame() -> String {
    DEFAULT_REFERENCE_FRAME.to_string()
}
fn default_tool_offset() -> Pose {
    TOOL_OFFSET
}

impl Default for Config {
    fn default() -> Self {
        Self {
            controller_address: default_controller_address(),
            controller_port: default_controller_port(),
            probe_timeout_ms: default_probe_timeout_ms(),
            tool_settle_ms: default_tool_settle_ms(),
            simulation_speed: default_simulation_speed(),
            reference_frame: default_reference_frame(),
            tool_offset: default_tool_offset(),
        }
    }
}

impl Config {
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            controller_address: self.controller_address.clone(),
            controller_port: self.controller_port,
            probe_timeout: Duration::from_millis(self.probe_timeout_ms),
            reference_frame: self.reference_frame.clone(),
            tool_offset: self.tool_offset,
            tool_settle: Duration::from_millis(self.tool_settle_ms),
            simulation_speed: self.simulation_speed,
        }
    }
}

/// Return the path to `~/.pointsman/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".pointsman").join("config.toml")
}

/// Load the config from disk.  Returns `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, String> {
    load_from(&config_path())
}

pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let mut cfg: Config =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Apply `POINTSMAN_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `POINTSMAN_CONTROLLER_ADDRESS` | `controller_address` |
/// | `POINTSMAN_CONTROLLER_PORT` | `controller_port` |
/// | `POINTSMAN_PROBE_TIMEOUT_MS` | `probe_timeout_ms` |
///
/// Values that do not parse are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("POINTSMAN_CONTROLLER_ADDRESS")
        && !v.trim().is_empty()
    {
        cfg.controller_address = v.trim().to_string();
    }
    if let Ok(v) = std::env::var("POINTSMAN_CONTROLLER_PORT")
        && let Ok(port) = v.trim().parse::<u16>()
    {
        cfg.controller_port = port;
    }
    if let Ok(v) = std::env::var("POINTSMAN_PROBE_TIMEOUT_MS")
        && let Ok(ms) = v.trim().parse::<u64>()
    {
        cfg.probe_timeout_ms = ms;
    }
}

/// Save the config to disk, creating `~/.pointsman/` if necessary.
pub fn save(cfg: &Config) -> Result<(), String> {
    save_to(cfg, &config_path())
}

pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700))
                .map_err(|e| format!("Failed to set config directory permissions: {}", e))?;
        }
    }
    let raw =
        toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| {
                use std::io::Write;
                f.write_all(raw.as_bytes())
            })
            .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn config_file_has_restrictive_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        save_to(&Config::default(), &path).expect("save");

        let file_mode = std::fs::metadata(&path).expect("file metadata").permissions().mode() & 0o777;
        assert_eq!(file_mode, 0o600);

        let dir_meta = std::fs::metadata(path.parent().unwrap()).expect("dir metadata");
        assert_eq!(dir_meta.permissions().mode() & 0o777, 0o700);
    }

    #[test]
    fn roundtrip_default_config() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        save_to(&Config::default(), &path).expect("save");

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded.reference_frame, "UR5e Base");
        assert_eq!(loaded.tool_offset, Pose::new(0.0, 0.0, 0.05, 0.0, 0.0, 0.0));
        assert_eq!(loaded.tool_settle_ms, 1000);
        assert_eq!(loaded.simulation_speed, 60.0);
    }

    #[test]
    fn tool_offset_is_written_as_flat_array() {
        let raw = toml::to_string_pretty(&Config::default()).unwrap();
        assert!(raw.contains("tool_offset = ["), "{raw}");
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "simulation_speed = 120.0\n").unwrap();

        let cfg = load_from(&path).unwrap().unwrap();
        assert_eq!(cfg.simulation_speed, 120.0);
        assert_eq!(cfg.tool_settle_ms, 1000);
        assert_eq!(cfg.tool_offset, TOOL_OFFSET);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "controller_port = \"not a port\"\n").unwrap();
        assert!(load_from(&path).is_err());
    }

    #[test]
    fn session_config_converts_milliseconds() {
        let cfg = Config {
            probe_timeout_ms: 250,
            tool_settle_ms: 1500,
            ..Config::default()
        };
        let session = cfg.session_config();
        assert_eq!(session.probe_timeout, Duration::from_millis(250));
        assert_eq!(session.tool_settle, Duration::from_millis(1500));
        assert_eq!(session.controller_address, "192.168.1.5");
    }

    #[test]
    fn config_path_points_to_pointsman_dir() {
        let p = config_path_for_home("/home/operator");
        assert!(p.to_string_lossy().contains(".pointsman"));
        assert!(p.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        assert!(load_from(&path).expect("no error").is_none());
    }

    #[test]
    fn apply_env_overrides_changes_controller_address() {
        // SAFETY: single-threaded test; no data races on env vars.
        unsafe { std::env::set_var("POINTSMAN_CONTROLLER_ADDRESS", "10.0.0.7") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.controller_address, "10.0.0.7");
        unsafe { std::env::remove_var("POINTSMAN_CONTROLLER_ADDRESS") };
    }

    #[test]
    fn apply_env_overrides_port_accepts_valid_and_ignores_invalid() {
        // SAFETY: single-threaded test; no data races on env vars.
        unsafe { std::env::set_var("POINTSMAN_CONTROLLER_PORT", "30003") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.controller_port, 30003);

        unsafe { std::env::set_var("POINTSMAN_CONTROLLER_PORT", "not-a-port") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.controller_port, 30002);
        unsafe { std::env::remove_var("POINTSMAN_CONTROLLER_PORT") };
    }

    #[test]
    fn apply_env_overrides_changes_probe_timeout() {
        // SAFETY: single-threaded test; no data races on env vars.
        unsafe { std::env::set_var("POINTSMAN_PROBE_TIMEOUT_MS", "200") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.probe_timeout_ms, 200);
        unsafe { std::env::remove_var("POINTSMAN_PROBE_TIMEOUT_MS") };
    }
}
