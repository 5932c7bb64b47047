use anyhow::Result;
use isalens_correlation::VisibleColumns;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Log level enumeration for configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Error => write!(f, "error"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Trace => write!(f, "trace"),
        }
    }
}

impl LogLevel {
    /// Convert to tracing level filter
    pub fn to_tracing_level_filter(self) -> tracing::level_filters::LevelFilter {
        match self {
            LogLevel::Error => tracing::level_filters::LevelFilter::ERROR,
            LogLevel::Warn => tracing::level_filters::LevelFilter::WARN,
            LogLevel::Info => tracing::level_filters::LevelFilter::INFO,
            LogLevel::Debug => tracing::level_filters::LevelFilter::DEBUG,
            LogLevel::Trace => tracing::level_filters::LevelFilter::TRACE,
        }
    }

    /// Parse from string
    pub fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(anyhow::anyhow!(
                "Invalid log level: {}. Valid options: error, warn, info, debug, trace",
                s
            )),
        }
    }
}

/// Main configuration structure loaded from TOML files
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub disassembly: DisassemblyConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GeneralConfig {
    #[serde(default = "default_log_file")]
    pub log_file: String,
    #[serde(default = "default_enable_logging")]
    pub enable_logging: bool,
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Rendering of disassembly rows
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DisassemblyConfig {
    /// Columns included when rows are copied as text
    #[serde(default = "default_visible_columns")]
    pub visible_columns: VisibleColumns,
}

fn default_log_file() -> String {
    "isa-tool.log".to_string()
}

fn default_enable_logging() -> bool {
    false
}

fn default_visible_columns() -> VisibleColumns {
    VisibleColumns::all()
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_file: default_log_file(),
            enable_logging: default_enable_logging(),
            log_level: LogLevel::default(),
        }
    }
}

impl Default for DisassemblyConfig {
    fn default() -> Self {
        Self {
            visible_columns: default_visible_columns(),
        }
    }
}

impl Config {
    /// Load configuration from files with fallback search
    pub fn load() -> Result<Self> {
        let config_paths = Self::get_config_search_paths();

        for path in &config_paths {
            if path.exists() {
                info!("Loading configuration from: {}", path.display());
                return Self::load_from_file(path);
            } else {
                debug!("Configuration file not found: {}", path.display());
            }
        }

        info!("No configuration file found, using default settings");
        Ok(Self::default())
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!(
                "Failed to read configuration file '{}': {}",
                path.display(),
                e
            )
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| {
            Self::create_friendly_toml_error(&path.display().to_string(), &content, e)
        })?;

        if config.disassembly.visible_columns.is_empty() {
            return Err(anyhow::anyhow!(
                "Invalid disassembly configuration in '{}': visible_columns is empty, \
                 copied rows would contain nothing but labels",
                path.display()
            ));
        }

        Ok(config)
    }

    /// Create a user-friendly error message for TOML parsing errors
    fn create_friendly_toml_error(
        file_path: &str,
        content: &str,
        error: toml::de::Error,
    ) -> anyhow::Error {
        let error_msg = format!("Configuration file parsing error in '{}'", file_path);

        if let Some(span) = error.span() {
            let lines: Vec<&str> = content.lines().collect();
            let mut current_pos = 0;
            let mut line_num: usize = 1;
            let mut col_num: usize = 1;

            for line in &lines {
                let line_len = line.len() + 1; // +1 for newline
                if current_pos + line_len > span.start {
                    col_num = span.start - current_pos + 1;
                    break;
                }
                current_pos += line_len;
                line_num += 1;
            }

            let context_line = lines.get(line_num.saturating_sub(1)).unwrap_or(&"");

            anyhow::anyhow!(
                "{}\n\nError at line {}, column {}:\n{}\n\n{}\n{}^\n\nSuggestion: {}",
                error_msg,
                line_num,
                col_num,
                error,
                context_line,
                " ".repeat(col_num.saturating_sub(1)),
                Self::get_error_suggestion(&error.to_string())
            )
        } else {
            anyhow::anyhow!(
                "{}\n\n{}\n\nSuggestion: {}",
                error_msg,
                error,
                Self::get_error_suggestion(&error.to_string())
            )
        }
    }

    /// Provide helpful suggestions based on common configuration errors
    fn get_error_suggestion(error_msg: &str) -> &'static str {
        if error_msg.contains("log_level") {
            "Valid log levels are: 'error', 'warn', 'info', 'debug', 'trace'"
        } else if error_msg.contains("unknown variant") {
            "Valid columns are: 'address', 'opcode', 'operands', 'functional_unit', \
             'cycles', 'binary_encoding', 'live_vgprs'"
        } else if error_msg.contains("unknown field") {
            "Check the field name spelling and ensure it's in the correct section"
        } else if error_msg.contains("invalid type") {
            "Check the value type - strings should be in quotes, lists in brackets"
        } else {
            "Please check the configuration file syntax"
        }
    }

    /// Get configuration file search paths in priority order
    fn get_config_search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        // User-level config
        if let Some(home_dir) = dirs::home_dir() {
            paths.push(home_dir.join(".isalens").join("config.toml"));
        }

        // Project-level config
        if let Ok(current_dir) = std::env::current_dir() {
            paths.push(current_dir.join("isalens.toml"));
        }

        paths
    }

    /// Load configuration with explicit config file path (for --config flag)
    pub fn load_with_explicit_path<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let path = config_path.as_ref();
        if !path.exists() {
            return Err(anyhow::anyhow!(
                "Specified configuration file does not exist: {}",
                path.display()
            ));
        }
        Self::load_from_file(path)
    }
}
