use crate::command::parser::ParseMode;
use crate::defaults;
use crate::error::{Result, TimerVoiceError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub recognition: RecognitionConfig,
    pub parser: ParserConfig,
    pub logging: LoggingConfig,
}

/// Speech session configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RecognitionConfig {
    pub restart_on_end: bool,
    pub max_alternatives: usize,
}

/// Command parser configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ParserConfig {
    pub mode: ParseMode,
}

/// Log output configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            restart_on_end: defaults::RESTART_ON_END,
            max_alternatives: defaults::MAX_ALTERNATIVES,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
        }
    }
}

const TEMPLATE: &str = r#"# kitchen-timer configuration

[recognition]
# Restart the speech session when the engine ends it on its own.
restart_on_end = true
# Ranked alternatives kept per phrase (0 = all).
max_alternatives = 5

[parser]
# "simple": only the best alternative is parsed.
# "robust": alternatives are tried in rank order, the first match wins.
mode = "robust"

[logging]
# Log filter used when RUST_LOG is not set (error, warn, info, debug, trace).
level = "warn"
"#;

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Missing fields use default values.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if the file doesn't exist
    ///
    /// Invalid TOML is still an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Err(TimerVoiceError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - KITCHEN_TIMER_PARSE_MODE → parser.mode
    /// - KITCHEN_TIMER_LOG_LEVEL → logging.level
    /// - KITCHEN_TIMER_RESTART_ON_END → recognition.restart_on_end
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(mode) = std::env::var("KITCHEN_TIMER_PARSE_MODE")
            && !mode.is_empty()
        {
            match mode.parse() {
                Ok(mode) => self.parser.mode = mode,
                Err(e) => warn!("ignoring KITCHEN_TIMER_PARSE_MODE: {e}"),
            }
        }

        if let Ok(level) = std::env::var("KITCHEN_TIMER_LOG_LEVEL")
            && !level.is_empty()
        {
            self.logging.level = level;
        }

        if let Ok(restart) = std::env::var("KITCHEN_TIMER_RESTART_ON_END")
            && !restart.is_empty()
        {
            match parse_bool(&restart) {
                Some(restart) => self.recognition.restart_on_end = restart,
                None => warn!("ignoring KITCHEN_TIMER_RESTART_ON_END: not a boolean: {restart}"),
            }
        }

        self
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/kitchen-timer/config.toml on Linux
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("kitchen-timer")
            .join("config.toml")
    }

    /// Commented configuration template with default values.
    pub fn dump_template() -> &'static str {
        TEMPLATE
    }

    /// Effective configuration rendered as TOML.
    pub fn to_display_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| TimerVoiceError::ConfigParse {
            message: e.to_string(),
        })
    }

    /// One top-level section rendered as TOML, e.g. `parser`.
    pub fn display_section(&self, section: &str) -> Result<String> {
        let mut table = self.to_table()?;
        let value = table.remove(section).ok_or_else(|| unknown_key(section))?;
        let mut wrapped = toml::Table::new();
        wrapped.insert(section.to_string(), value);
        toml::to_string_pretty(&wrapped).map_err(|e| TimerVoiceError::ConfigParse {
            message: e.to_string(),
        })
    }

    /// Look up a value by dotted key (e.g. `parser.mode`).
    pub fn get_value_by_path(&self, key: &str) -> Result<String> {
        let table = self.to_table()?;
        let mut current = toml::Value::Table(table);
        for part in key.split('.') {
            current = match current {
                toml::Value::Table(mut table) => {
                    table.remove(part).ok_or_else(|| unknown_key(key))?
                }
                _ => return Err(unknown_key(key)),
            };
        }
        Ok(match current {
            toml::Value::String(s) => s,
            other => other.to_string(),
        })
    }

    /// Set a value by dotted key in the config file at `path`.
    ///
    /// The file is created if missing. Unknown keys and values that do not
    /// deserialize are rejected without touching the file.
    pub fn set_value_by_path(path: &Path, key: &str, value: &str) -> Result<()> {
        Config::default().get_value_by_path(key)?;

        let mut table = match fs::read_to_string(path) {
            Ok(contents) => toml::from_str::<toml::Table>(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => toml::Table::new(),
            Err(e) => return Err(e.into()),
        };

        let parts: Vec<&str> = key.split('.').collect();
        let Some((leaf, sections)) = parts.split_last() else {
            return Err(unknown_key(key));
        };
        let mut current = &mut table;
        for section in sections {
            let entry = current
                .entry(section.to_string())
                .or_insert(toml::Value::Table(toml::Table::new()));
            current = match entry {
                toml::Value::Table(table) => table,
                _ => return Err(unknown_key(key)),
            };
        }
        current.insert(leaf.to_string(), parse_value(value));

        let contents = toml::to_string_pretty(&table).map_err(|e| TimerVoiceError::ConfigParse {
            message: e.to_string(),
        })?;
        toml::from_str::<Config>(&contents).map_err(|e| TimerVoiceError::ConfigInvalidValue {
            key: key.to_string(),
            message: e.message().to_string(),
        })?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, contents)?;
        Ok(())
    }

    fn to_table(&self) -> Result<toml::Table> {
        let contents = toml::to_string(self).map_err(|e| TimerVoiceError::ConfigParse {
            message: e.to_string(),
        })?;
        Ok(toml::from_str(&contents)?)
    }
}

fn unknown_key(key: &str) -> TimerVoiceError {
    TimerVoiceError::ConfigInvalidValue {
        key: key.to_string(),
        message: "unknown configuration key".to_string(),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Interpret a command-line value as a TOML scalar.
fn parse_value(value: &str) -> toml::Value {
    if let Ok(b) = value.parse::<bool>() {
        toml::Value::Boolean(b)
    } else if let Ok(n) = value.parse::<i64>() {
        toml::Value::Integer(n)
    } else {
        toml::Value::String(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::{NamedTempFile, TempDir};

    // Mutex to serialize tests that modify environment variables
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    // SAFETY: These helpers are only used in tests with ENV_LOCK held,
    // ensuring no concurrent access to environment variables.
    fn set_env(key: &str, value: &str) {
        unsafe { std::env::set_var(key, value) }
    }

    fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) }
    }

    fn clear_env() {
        remove_env("KITCHEN_TIMER_PARSE_MODE");
        remove_env("KITCHEN_TIMER_LOG_LEVEL");
        remove_env("KITCHEN_TIMER_RESTART_ON_END");
    }

    fn write_temp(contents: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(contents.as_bytes()).unwrap();
        temp_file
    }

    #[test]
    fn test_default_config_has_correct_values() {
        let config = Config::default();

        assert!(config.recognition.restart_on_end);
        assert_eq!(config.recognition.max_alternatives, 5);
        assert_eq!(config.parser.mode, ParseMode::Robust);
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_load_from_toml_file() {
        let temp_file = write_temp(
            r#"
            [recognition]
            restart_on_end = false
            max_alternatives = 1

            [parser]
            mode = "simple"

            [logging]
            level = "debug"
        "#,
        );

        let config = Config::load(temp_file.path()).unwrap();

        assert!(!config.recognition.restart_on_end);
        assert_eq!(config.recognition.max_alternatives, 1);
        assert_eq!(config.parser.mode, ParseMode::Simple);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let temp_file = write_temp(
            r#"
            [parser]
            mode = "simple"
        "#,
        );

        let config = Config::load(temp_file.path()).unwrap();

        assert_eq!(config.parser.mode, ParseMode::Simple);
        assert_eq!(config.recognition, RecognitionConfig::default());
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let temp_file = write_temp(
            r#"
            [parser
            mode = "broken
        "#,
        );

        assert!(Config::load(temp_file.path()).is_err());
    }

    #[test]
    fn test_invalid_parse_mode_returns_error() {
        let temp_file = write_temp("[parser]\nmode = \"fuzzy\"\n");
        assert!(matches!(
            Config::load(temp_file.path()),
            Err(TimerVoiceError::Config(_))
        ));
    }

    #[test]
    fn test_load_or_default_returns_default_for_missing_file() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_or_default(&dir.path().join("missing.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_or_default_rejects_invalid_toml() {
        let temp_file = write_temp("[recognition\n");
        assert!(Config::load_or_default(temp_file.path()).is_err());
    }

    #[test]
    fn test_env_override_parse_mode() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env();

        set_env("KITCHEN_TIMER_PARSE_MODE", "simple");
        let config = Config::default().with_env_overrides();

        assert_eq!(config.parser.mode, ParseMode::Simple);
        assert_eq!(config.logging.level, "warn"); // Not overridden

        clear_env();
    }

    #[test]
    fn test_env_override_all() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env();

        set_env("KITCHEN_TIMER_PARSE_MODE", "simple");
        set_env("KITCHEN_TIMER_LOG_LEVEL", "trace");
        set_env("KITCHEN_TIMER_RESTART_ON_END", "off");

        let config = Config::default().with_env_overrides();

        assert_eq!(config.parser.mode, ParseMode::Simple);
        assert_eq!(config.logging.level, "trace");
        assert!(!config.recognition.restart_on_end);

        clear_env();
    }

    #[test]
    fn test_env_override_invalid_values_ignored() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env();

        set_env("KITCHEN_TIMER_PARSE_MODE", "fuzzy");
        set_env("KITCHEN_TIMER_RESTART_ON_END", "maybe");
        set_env("KITCHEN_TIMER_LOG_LEVEL", "");
        let config = Config::default().with_env_overrides();

        assert_eq!(config, Config::default());

        clear_env();
    }

    #[test]
    fn test_default_path_is_xdg_compliant() {
        let path = Config::default_path();
        let path_str = path.to_string_lossy();

        assert!(path_str.contains("kitchen-timer"));
        assert!(path_str.ends_with("config.toml"));
    }

    #[test]
    fn test_template_parses_to_defaults() {
        let config: Config = toml::from_str(Config::dump_template()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_display_section() {
        let config = Config::default();
        let section = config.display_section("parser").unwrap();
        assert!(section.contains("[parser]"));
        assert!(section.contains("mode = \"robust\""));
        assert!(!section.contains("[logging]"));
        assert!(config.display_section("audio").is_err());
    }

    #[test]
    fn test_display_toml_round_trips() {
        let mut config = Config::default();
        config.parser.mode = ParseMode::Simple;
        let toml = config.to_display_toml().unwrap();
        assert_eq!(toml::from_str::<Config>(&toml).unwrap(), config);
    }

    #[test]
    fn test_get_value_by_path() {
        let config = Config::default();
        assert_eq!(config.get_value_by_path("parser.mode").unwrap(), "robust");
        assert_eq!(
            config
                .get_value_by_path("recognition.max_alternatives")
                .unwrap(),
            "5"
        );
        assert_eq!(
            config
                .get_value_by_path("recognition.restart_on_end")
                .unwrap(),
            "true"
        );
        assert!(config.get_value_by_path("parser.nope").is_err());
        assert!(config.get_value_by_path("parser.mode.deeper").is_err());
    }

    #[test]
    fn test_set_value_by_path_creates_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        Config::set_value_by_path(&path, "parser.mode", "simple").unwrap();
        Config::set_value_by_path(&path, "recognition.max_alternatives", "2").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.parser.mode, ParseMode::Simple);
        assert_eq!(config.recognition.max_alternatives, 2);
        assert!(config.recognition.restart_on_end);
    }

    #[test]
    fn test_set_value_by_path_rejects_bad_input() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        assert!(Config::set_value_by_path(&path, "parser.colour", "red").is_err());
        assert!(Config::set_value_by_path(&path, "parser.mode", "fuzzy").is_err());
        assert!(!path.exists());
    }
}
