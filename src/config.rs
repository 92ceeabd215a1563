//! Rule definitions and the rule store.
//!
//! Rules live in a per-user file, by default `~/.config/dothething/rules.yaml`
//! (the platform config directory as reported by `dirs`). The file is a
//! sequence of mappings; `file` is the pattern and `move` the destination:
//!
//! ```yaml
//! - file: (?i)\.pdf$
//!   move: /home/me/Documents
//! - file: ^IMG_\d+
//!   move: /home/me/Pictures
//!   note: keys other than file and move are kept but ignored
//! ```
//!
//! The same rules may also be written as TOML (`[[rule]]` tables) or JSON (an
//! array of objects); the format is picked from the file extension.

use crate::filesystem::FileSystem;
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Directory under the user's config directory that belongs to this tool.
pub const CONFIG_DIR_NAME: &str = "dothething";

/// File name of the default rule resource.
pub const RULES_FILE_NAME: &str = "rules.yaml";

/// Errors raised while loading the rule resource.
///
/// The `Display` text is the diagnostic shown after the `Error:` prefix.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform has no notion of a per-user config directory.
    #[error("Could not locate configuration directory")]
    NoConfigDir,

    #[error("Could not open rules file {} {source}", .path.display())]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Could not read rules file {} {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Could not parse rules file {} {reason}", .path.display())]
    Parse { path: PathBuf, reason: String },
}

/// Errors in a single rule's definition.
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("Empty regexp.")]
    EmptyPattern,

    #[error("Could not compile regexp {}", single_line(.0))]
    InvalidPattern(#[from] regex::Error),
}

/// Flattens a regex error onto one line, dropping the caret diagram.
fn single_line(error: &regex::Error) -> String {
    error
        .to_string()
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.chars().all(|c| matches!(c, '^' | '~')))
        .collect::<Vec<_>>()
        .join(" ")
}

/// The value of a rule key the engine does not know about.
///
/// Any scalar, list or mapping is accepted so that newer rule files still
/// load; the engine never looks at these.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Attribute {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    List(Vec<Attribute>),
    Map(BTreeMap<String, Attribute>),
    Null,
}

/// A pattern-to-destination binding.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Rule {
    /// Regular expression searched for in the bare file name.
    #[serde(rename = "file", default)]
    pub pattern: String,

    /// Directory matching files are moved into.
    #[serde(rename = "move", default)]
    pub destination: PathBuf,

    /// Any other keys. Kept for forward compatibility, unused by the engine.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Attribute>,
}

impl Rule {
    pub fn new(pattern: impl Into<String>, destination: impl Into<PathBuf>) -> Self {
        Self {
            pattern: pattern.into(),
            destination: destination.into(),
            extra: BTreeMap::new(),
        }
    }

    /// Compiles the rule's pattern.
    ///
    /// # Errors
    ///
    /// Returns `RuleError::EmptyPattern` for an empty pattern and
    /// `RuleError::InvalidPattern` if it is not a valid regular expression.
    pub fn compile(&self) -> Result<Regex, RuleError> {
        if self.pattern.is_empty() {
            return Err(RuleError::EmptyPattern);
        }
        Ok(Regex::new(&self.pattern)?)
    }
}

/// Serialization formats accepted for the rule resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleFormat {
    Yaml,
    Toml,
    Json,
}

impl RuleFormat {
    /// Picks the format from the file extension, defaulting to YAML.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .as_deref()
        {
            Some("toml") => RuleFormat::Toml,
            Some("json") => RuleFormat::Json,
            _ => RuleFormat::Yaml,
        }
    }
}

/// TOML has no top-level arrays, so rules sit under `[[rule]]`.
#[derive(Debug, Default, Deserialize)]
struct TomlRules {
    #[serde(default)]
    rule: Vec<Rule>,
}

/// The ordered list of rules for one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
        self.rules.iter()
    }

    /// Returns the default rule resource location.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NoConfigDir` if the platform config directory
    /// cannot be determined.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join(CONFIG_DIR_NAME).join(RULES_FILE_NAME))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Reads and parses the rule resource at `path`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Open`, `ConfigError::Read` or `ConfigError::Parse`
    /// depending on which step failed.
    pub fn load(fs: &dyn FileSystem, path: &Path) -> Result<Self, ConfigError> {
        let mut reader = fs.open(path).map_err(|source| ConfigError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        let mut content = String::new();
        reader
            .read_to_string(&mut content)
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let rules = Self::parse(&content, RuleFormat::from_path(path)).map_err(|reason| {
            ConfigError::Parse {
                path: path.to_path_buf(),
                reason,
            }
        })?;

        debug!(path = %path.display(), count = rules.len(), "loaded rules");
        Ok(rules)
    }

    /// Loads the rules, falling back to an empty set on any failure.
    ///
    /// The failure is handed to `report` so the caller can surface it.
    pub fn load_or_empty(
        fs: &dyn FileSystem,
        path: &Path,
        report: impl FnOnce(&ConfigError),
    ) -> Self {
        match Self::load(fs, path) {
            Ok(rules) => rules,
            Err(e) => {
                report(&e);
                Self::default()
            }
        }
    }

    /// Parses rule text in the given format. Blank text is an empty set.
    pub fn parse(content: &str, format: RuleFormat) -> Result<Self, String> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let rules = match format {
            RuleFormat::Yaml => {
                serde_yaml::from_str::<Vec<Rule>>(content).map_err(|e| e.to_string())?
            }
            RuleFormat::Toml => {
                toml::from_str::<TomlRules>(content)
                    .map_err(|e| e.to_string())?
                    .rule
            }
            RuleFormat::Json => {
                serde_json::from_str::<Vec<Rule>>(content).map_err(|e| e.to_string())?
            }
        };

        Ok(Self::new(rules))
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}

impl From<Vec<Rule>> for RuleSet {
    fn from(rules: Vec<Rule>) -> Self {
        Self::new(rules)
    }
}
