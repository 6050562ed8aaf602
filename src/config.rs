//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/cntree/cntree.toml`
//! 3. Local config: `<input_dir>/.cntree.toml` (next to the inference output)
//! 4. Environment variables: `CNTREE_*` prefix

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;

/// Names of the files read and written in the inference directories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FileNames {
    /// Edge list, candidate space on input and genomic labels on output
    pub tree: String,
    /// Cell attachment
    pub attachment: String,
    /// Reconstructed copy-number grid
    pub counts: String,
    /// Labelled tree and attachment as JSON
    pub json: String,
}

impl Default for FileNames {
    fn default() -> Self {
        Self {
            tree: "inferred_tree".into(),
            attachment: "inferred_attachment".into(),
            counts: "inferred_counts".into(),
            json: "inferred_tree.json".into(),
        }
    }
}

/// Raw file names for intermediate parsing (None means "not specified").
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawFileNames {
    pub tree: Option<String>,
    pub attachment: Option<String>,
    pub counts: Option<String>,
    pub json: Option<String>,
}

impl FileNames {
    fn merge(&self, overlay: &RawFileNames) -> Self {
        Self {
            tree: overlay.tree.clone().unwrap_or_else(|| self.tree.clone()),
            attachment: overlay
                .attachment
                .clone()
                .unwrap_or_else(|| self.attachment.clone()),
            counts: overlay.counts.clone().unwrap_or_else(|| self.counts.clone()),
            json: overlay.json.clone().unwrap_or_else(|| self.json.clone()),
        }
    }
}

/// Raw settings for intermediate parsing.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub neutral_cn: Option<i64>,
    pub add_chr_ends: Option<bool>,
    pub end_bin_length: Option<u64>,
    pub output_dir: Option<PathBuf>,
    #[serde(default)]
    pub files: RawFileNames,
}

/// Unified configuration for cntree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Copy number of bins no event resolves (default: 2)
    pub neutral_cn: i64,
    /// Append a synthetic locus at every chromosome end before loading the tree
    pub add_chr_ends: bool,
    /// Width of synthetic chromosome-end bins
    pub end_bin_length: u64,
    /// Where results are dumped when no output directory is given
    pub output_dir: PathBuf,
    /// Input and output file names
    pub files: FileNames,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            neutral_cn: 2,
            add_chr_ends: false,
            end_bin_length: 150_000,
            output_dir: PathBuf::from("."),
            files: FileNames::default(),
        }
    }
}

/// Get the XDG config directory for cntree.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "cntree").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("cntree.toml"))
}

/// Get the path to the local config file in an inference directory.
pub fn local_config_path(input_dir: &Path) -> PathBuf {
    input_dir.join(".cntree.toml")
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Expand shell variables and tilde in `output_dir`.
    fn expand_paths(&mut self) {
        let raw = self.output_dir.to_string_lossy().to_string();
        if let Ok(expanded) = shellexpand::full(&raw) {
            self.output_dir = PathBuf::from(expanded.into_owned());
        }
    }

    /// Overlay wins for every field it specifies.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            neutral_cn: overlay.neutral_cn.unwrap_or(self.neutral_cn),
            add_chr_ends: overlay.add_chr_ends.unwrap_or(self.add_chr_ends),
            end_bin_length: overlay.end_bin_length.unwrap_or(self.end_bin_length),
            output_dir: overlay
                .output_dir
                .clone()
                .unwrap_or_else(|| self.output_dir.clone()),
            files: self.files.merge(&overlay.files),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `input_dir` - Optional inference directory holding a local `.cntree.toml`
    pub fn load(input_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        Self::load_from(global_config_path().as_deref(), input_dir)
    }

    /// Same as [`Settings::load`] with an explicit global config location.
    pub fn load_from(
        global_path: Option<&Path>,
        input_dir: Option<&Path>,
    ) -> Result<Self, ApplicationError> {
        // 1. Start with defaults
        let mut current = Self::default();

        // 2. Global config
        if let Some(global_path) = global_path {
            if global_path.exists() {
                let raw = load_raw_settings(global_path)?;
                current = current.merge_with(&raw);
            }
        }

        // 3. Local config next to the inference output
        if let Some(dir) = input_dir {
            let local_path = local_config_path(dir);
            if local_path.exists() {
                let raw = load_raw_settings(&local_path)?;
                current = current.merge_with(&raw);
            }
        }

        // 4. Environment variables (explicit override)
        current = Self::apply_env_overrides(current)?;

        current.expand_paths();
        current.validate()?;
        Ok(current)
    }

    /// Reject values no layer may set.
    fn validate(&self) -> Result<(), ApplicationError> {
        if self.neutral_cn < 0 {
            return Err(ApplicationError::Config {
                message: format!(
                    "neutral_cn must be non-negative, got {}",
                    self.neutral_cn
                ),
            });
        }
        Ok(())
    }

    /// Apply CNTREE_* environment variables as explicit overrides.
    ///
    /// Nested keys use `__`, e.g. `CNTREE_FILES__COUNTS`.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("CNTREE")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_int("neutral_cn") {
            settings.neutral_cn = val;
        }
        if let Ok(val) = config.get_bool("add_chr_ends") {
            settings.add_chr_ends = val;
        }
        if let Ok(val) = config.get::<u64>("end_bin_length") {
            settings.end_bin_length = val;
        }
        if let Ok(val) = config.get_string("output_dir") {
            settings.output_dir = PathBuf::from(val);
        }
        if let Ok(val) = config.get_string("files.tree") {
            settings.files.tree = val;
        }
        if let Ok(val) = config.get_string("files.attachment") {
            settings.files.attachment = val;
        }
        if let Ok(val) = config.get_string("files.counts") {
            settings.files.counts = val;
        }
        if let Ok(val) = config.get_string("files.json") {
            settings.files.json = val;
        }

        Ok(settings)
    }

    /// Render as TOML for `config show`.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: e.to_string(),
        })
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
