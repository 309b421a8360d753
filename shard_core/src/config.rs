use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;

use crate::ExpandOptions;
use crate::ShardError;
use crate::ShardResult;

/// Supported config file locations in discovery order (highest precedence
/// first).
pub const CONFIG_FILE_CANDIDATES: [&str; 3] = ["shard.toml", ".shard.toml", ".config/shard.toml"];

/// File extension of shard and template files when none is configured.
pub const DEFAULT_EXTENSION: &str = "html";

/// Configuration loaded from a `shard.toml` file.
///
/// ```toml
/// extension = "html"
///
/// [paths]
/// shards = "templates/shards"
/// templates = "templates/templates"
/// output = "templates/rendered"
///
/// [expansion]
/// substitution = "span"
/// mode = "single-pass"
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ShardConfig {
	/// Extension (without the dot) of the files read from the shard and
	/// template directories.
	#[serde(default = "default_extension")]
	pub extension: String,
	/// Directory locations, relative to the project root.
	#[serde(default)]
	pub paths: PathsConfig,
	/// Expansion behavior.
	#[serde(default)]
	pub expansion: ExpandOptions,
}

impl Default for ShardConfig {
	fn default() -> Self {
		Self {
			extension: default_extension(),
			paths: PathsConfig::default(),
			expansion: ExpandOptions::default(),
		}
	}
}

/// The three directories a build works with.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
	/// Directory holding shard definition files.
	pub shards: PathBuf,
	/// Directory holding template files that use shards.
	pub templates: PathBuf,
	/// Directory the expanded templates are written to.
	pub output: PathBuf,
}

impl Default for PathsConfig {
	fn default() -> Self {
		Self {
			shards: PathBuf::from("templates/shards"),
			templates: PathBuf::from("templates/templates"),
			output: PathBuf::from("templates/rendered"),
		}
	}
}

impl PathsConfig {
	/// Resolve every path against `root`. Absolute paths are kept as they are.
	pub fn resolve(&self, root: &Path) -> Self {
		Self {
			shards: root.join(&self.shards),
			templates: root.join(&self.templates),
			output: root.join(&self.output),
		}
	}
}

fn default_extension() -> String {
	DEFAULT_EXTENSION.to_string()
}

impl ShardConfig {
	/// Return the first existing config file path for the given root.
	pub fn resolve_path(root: &Path) -> Option<PathBuf> {
		CONFIG_FILE_CANDIDATES
			.iter()
			.map(|candidate| root.join(candidate))
			.find(|path| path.is_file())
	}

	/// Load the project config, if one exists.
	pub fn load(root: &Path) -> ShardResult<Option<ShardConfig>> {
		let Some(config_path) = Self::resolve_path(root) else {
			return Ok(None);
		};

		let content = std::fs::read_to_string(&config_path)?;
		Self::parse(&content).map(Some)
	}

	/// Load the project config, falling back to defaults when there is none.
	pub fn load_or_default(root: &Path) -> ShardResult<ShardConfig> {
		Ok(Self::load(root)?.unwrap_or_default())
	}

	pub fn parse(content: &str) -> ShardResult<ShardConfig> {
		toml::from_str(content).map_err(|e| ShardError::ConfigParse(e.to_string()))
	}
}
