//! Configuration for the gemspec rewriting engine
//!
//! The configuration controls which constructor call marks the manifest block and how
//! newly synthesized statements are formatted. Everything has a default, so a missing
//! config file is never an error unless the caller asked for a specific path.
//!
//! Lookup order used by [`RewriteConfig::load`]:
//! - an explicit path (e.g. `--config`)
//! - the `GEMSPEC_REWRITE_CONFIG` environment variable
//! - `<config dir>/gemspec-rewrite/config.toml`
//! - built-in defaults

use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable pointing at a config file
pub const CONFIG_ENV_VAR: &str = "GEMSPEC_REWRITE_CONFIG";

/// Directory name used under the platform config dir
pub const CONFIG_DIR_NAME: &str = "gemspec-rewrite";

/// Constructor whose block is treated as the manifest block
pub const DEFAULT_CONSTRUCTOR: &str = "Gem::Specification";

/// Error type for configuration loading
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// The requested config file does not exist
    NotFound(PathBuf),
    /// The file exists but could not be read
    Read { path: PathBuf, message: String },
    /// The file is not valid TOML or has unknown keys
    Parse { path: Option<PathBuf>, message: String },
    /// A value is syntactically fine but unusable
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NotFound(path) => {
                write!(f, "Config file not found: {}", path.display())
            }
            ConfigError::Read { path, message } => {
                write!(f, "Failed to read config {}: {}", path.display(), message)
            }
            ConfigError::Parse {
                path: Some(path),
                message,
            } => write!(f, "Failed to parse config {}: {}", path.display(), message),
            ConfigError::Parse {
                path: None,
                message,
            } => write!(f, "Failed to parse config: {}", message),
            ConfigError::Invalid(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Quote character used for string literals the engine writes from scratch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteStyle {
    #[default]
    Single,
    Double,
}

impl QuoteStyle {
    pub fn as_char(self) -> char {
        match self {
            QuoteStyle::Single => '\'',
            QuoteStyle::Double => '"',
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RewriteConfig {
    /// Constant path of the constructor, e.g. `Gem::Specification`
    pub constructor: String,
    /// Quote style for brand-new literals
    pub quote: QuoteStyle,
    /// Spaces added per nesting level when a block body has to be synthesized
    pub indent_width: usize,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        RewriteConfig {
            constructor: DEFAULT_CONSTRUCTOR.to_string(),
            quote: QuoteStyle::Single,
            indent_width: 2,
        }
    }
}

impl RewriteConfig {
    /// Use a different constructor path
    pub fn with_constructor(mut self, constructor: impl Into<String>) -> Self {
        self.constructor = constructor.into();
        self
    }

    pub fn with_quote(mut self, quote: QuoteStyle) -> Self {
        self.quote = quote;
        self
    }

    pub fn with_indent_width(mut self, indent_width: usize) -> Self {
        self.indent_width = indent_width;
        self
    }

    /// Constructor path split on `::`, ignoring a leading root qualifier
    pub fn constructor_segments(&self) -> Vec<&str> {
        self.constructor
            .trim()
            .trim_start_matches("::")
            .split("::")
            .map(str::trim)
            .collect()
    }

    /// Check that every constructor segment is a Ruby constant name
    pub fn validate(&self) -> Result<(), ConfigError> {
        for segment in self.constructor_segments() {
            let mut chars = segment.chars();
            let starts_upper = chars.next().is_some_and(|c| c.is_ascii_uppercase());
            if !starts_upper || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(ConfigError::Invalid(format!(
                    "constructor '{}' is not a constant path",
                    self.constructor
                )));
            }
        }
        if self.indent_width == 0 || self.indent_width > 16 {
            return Err(ConfigError::Invalid(format!(
                "indent_width must be between 1 and 16, got {}",
                self.indent_width
            )));
        }
        Ok(())
    }

    /// Parse a config from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: RewriteConfig = toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: None,
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read a config file that must exist
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            ConfigError::Parse { message, .. } => ConfigError::Parse {
                path: Some(path.to_path_buf()),
                message,
            },
            other => other,
        })
    }

    /// Resolve and load the effective config
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(
            explicit,
            std::env::var_os(CONFIG_ENV_VAR),
            default_config_path(),
        )
    }

    fn load_with(
        explicit: Option<&Path>,
        env_path: Option<OsString>,
        default_path: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_path(path);
        }
        if let Some(path) = env_path.filter(|p| !p.is_empty()) {
            return Self::from_path(Path::new(&path));
        }
        match default_path {
            Some(path) if path.is_file() => Self::from_path(&path),
            _ => Ok(Self::default()),
        }
    }
}

/// `<config dir>/gemspec-rewrite/config.toml`, if the platform has a config dir
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join("config.toml"))
}
