use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Environment variable that overrides the settings file location
pub const SETTINGS_PATH_ENV: &str = "LED_MATRIX_SETTINGS";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    Minutely,
    Hourly,
    Daily,
    Never,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSettings {
    #[serde(default = "default_level")]
    pub level: String, // "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_false")]
    pub file_logging_enabled: bool,
    #[serde(default = "default_true")]
    pub console_logging_enabled: bool,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    #[serde(default = "default_prefix")]
    pub file_name_prefix: String,
    #[serde(default = "default_false")]
    pub show_file_line: bool,
    #[serde(default = "default_false")]
    pub show_thread_ids: bool,
    #[serde(default = "default_true")]
    pub show_target: bool,
    #[serde(default = "default_true")]
    pub ansi_colors: bool,
    #[serde(default = "default_rotation")]
    pub rotation: LogRotation,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            file_logging_enabled: default_false(),
            console_logging_enabled: default_true(),
            log_dir: default_log_dir(),
            file_name_prefix: default_prefix(),
            show_file_line: default_false(),
            show_thread_ids: default_false(),
            show_target: default_true(),
            ansi_colors: default_true(),
            rotation: default_rotation(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayBackend {
    /// Adafruit bicolor backpack on an I2C bus
    Ht16k33,
    /// Log frames instead of driving hardware
    Console,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplaySettings {
    #[serde(default = "default_backend")]
    pub backend: DisplayBackend,
    #[serde(default = "default_i2c_bus")]
    pub i2c_bus: String,
    #[serde(default = "default_i2c_address")]
    pub i2c_address: u8,
    #[serde(default = "default_brightness")]
    pub brightness: u8, // 0-15
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            i2c_bus: default_i2c_bus(),
            i2c_address: default_i2c_address(),
            brightness: default_brightness(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub log_settings: LogSettings,

    #[serde(default)]
    pub display: DisplaySettings,

    // BLE Settings
    /// BlueZ adapter, e.g. "hci0"; the default adapter when unset
    #[serde(default)]
    pub adapter_name: Option<String>,
    /// Local name included in the advertisement
    #[serde(default)]
    pub local_name: Option<String>,
}

fn default_level() -> String {
    "info".to_string()
}
fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_log_dir() -> String {
    "logs".to_string()
}
fn default_prefix() -> String {
    "led_matrix_peripheral".to_string()
}
fn default_rotation() -> LogRotation {
    LogRotation::Daily
}
fn default_backend() -> DisplayBackend {
    DisplayBackend::Ht16k33
}
fn default_i2c_bus() -> String {
    "/dev/i2c-1".to_string()
}
fn default_i2c_address() -> u8 {
    0x70
}
fn default_brightness() -> u8 {
    15
}

pub struct SettingsService {
    settings: Settings,
    settings_path: PathBuf,
}

impl SettingsService {
    pub fn new() -> anyhow::Result<Self> {
        let settings_path = match std::env::var_os(SETTINGS_PATH_ENV) {
            Some(path) => PathBuf::from(path),
            None => Self::get_settings_path()?,
        };
        Ok(Self::from_path(settings_path))
    }

    /// Load settings from `path`, falling back to defaults if it is missing or invalid
    pub fn from_path(settings_path: impl Into<PathBuf>) -> Self {
        let settings_path = settings_path.into();
        let settings = match Self::load_from_file(&settings_path) {
            Ok(settings) => settings,
            Err(e) => {
                if settings_path.exists() {
                    warn!(
                        "Ignoring unreadable settings at {}: {}",
                        settings_path.display(),
                        e
                    );
                }
                Settings::default()
            }
        };

        Self {
            settings,
            settings_path,
        }
    }

    fn get_settings_path() -> anyhow::Result<PathBuf> {
        let mut path = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        path.push("led-matrix-peripheral");
        path.push("settings.json");
        Ok(path)
    }

    fn load_from_file(path: &Path) -> anyhow::Result<Settings> {
        let contents = fs::read_to_string(path)?;
        let settings = serde_json::from_str(&contents)?;
        Ok(settings)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        if let Some(dir) = self.settings_path.parent() {
            fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(&self.settings)?;
        fs::write(&self.settings_path, json)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.settings_path
    }

    pub fn get(&self) -> &Settings {
        &self.settings
    }

    pub fn get_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_settings_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("led-matrix-settings-{}-{}", std::process::id(), name))
            .join("settings.json")
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.display.backend, DisplayBackend::Ht16k33);
        assert_eq!(settings.display.i2c_bus, "/dev/i2c-1");
        assert_eq!(settings.display.i2c_address, 0x70);
        assert_eq!(settings.display.brightness, 15);
        assert_eq!(settings.log_settings.rotation, LogRotation::Daily);
        assert!(settings.adapter_name.is_none());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "display": { "backend": "console" }, "local_name": "Matrix" }"#;
        let settings: Settings = serde_json::from_str(json).unwrap();

        assert_eq!(settings.display.backend, DisplayBackend::Console);
        assert_eq!(settings.display.i2c_address, 0x70);
        assert_eq!(settings.local_name.as_deref(), Some("Matrix"));
        assert_eq!(settings.log_settings.level, "info");
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let service = SettingsService::from_path(temp_settings_path("missing"));
        assert_eq!(service.get().display.brightness, 15);
    }

    #[test]
    fn test_save_and_reload() {
        let path = temp_settings_path("roundtrip");
        let mut service = SettingsService::from_path(&path);
        service.get_mut().adapter_name = Some("hci1".to_string());
        service.get_mut().display.brightness = 4;
        service.save().unwrap();

        let reloaded = SettingsService::from_path(&path);
        assert_eq!(reloaded.get().adapter_name.as_deref(), Some("hci1"));
        assert_eq!(reloaded.get().display.brightness, 4);

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_invalid_file_falls_back_to_defaults() {
        let path = temp_settings_path("invalid");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "not json").unwrap();

        let service = SettingsService::from_path(&path);
        assert_eq!(service.get().display.backend, DisplayBackend::Ht16k33);

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }
}
