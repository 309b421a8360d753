use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::path::PathBuf;

use crate::ShardError;
use crate::ShardResult;
use crate::attributes::extract_attributes;
use crate::placeholder;
use crate::placeholder::RenderFailure;

/// Literal prefix of a shard definition's opening tag.
pub const DEFINITION_OPEN: &str = "<shard ";
/// Literal closing tag of a shard definition.
pub const DEFINITION_CLOSE: &str = "</shard>";

/// A named, reusable fragment loaded from a shard source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shard {
	/// The value of the definition's `name` attribute.
	pub name: String,
	/// The trimmed text between the definition's tags.
	pub content: String,
	/// File name of the source file the shard was defined in.
	pub origin: String,
}

impl Shard {
	pub fn new(name: impl Into<String>, content: impl Into<String>, origin: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			content: content.into(),
			origin: origin.into(),
		}
	}

	/// Placeholder names referenced by this shard's content.
	pub fn placeholders(&self) -> BTreeSet<String> {
		placeholder::placeholders(&self.content)
	}

	/// Render the content with the given bindings. Every named placeholder
	/// must be bound.
	pub fn render(&self, bindings: &BTreeMap<String, String>) -> ShardResult<String> {
		placeholder::render(&self.content, bindings).map_err(|failure| {
			match failure {
				RenderFailure::Unbound(placeholder) => {
					ShardError::UnboundPlaceholder {
						shard: self.name.clone(),
						placeholder,
					}
				}
				RenderFailure::Invalid { field, reason } => {
					ShardError::InvalidPlaceholder {
						shard: self.name.clone(),
						field,
						reason: reason.to_string(),
					}
				}
			}
		})
	}
}

impl fmt::Display for Shard {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let placeholders: Vec<String> = self.placeholders().into_iter().collect();
		write!(
			f,
			"{} ({}) -> {}",
			self.name,
			placeholders.join(", "),
			self.origin
		)
	}
}

/// The ordered collection of shards loaded from a directory.
///
/// Order is significant: the expander processes shards in load order, and
/// [`Catalog::get`] returns the first shard with a given name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
	shards: Vec<Shard>,
}

impl Catalog {
	pub fn new(shards: Vec<Shard>) -> Self {
		Self { shards }
	}

	/// Load every shard definition from the files directly inside `dir` whose
	/// extension is `extension`. Files are read in file name order.
	pub fn load(dir: &Path, extension: &str) -> ShardResult<Self> {
		let mut shards = Vec::new();

		for file in list_files(dir, extension)? {
			let source = std::fs::read_to_string(&file)?;
			let origin = file_name(&file);
			shards.extend(Self::parse(&source, &origin)?);
		}

		tracing::info!(count = shards.len(), dir = %dir.display(), "loaded shard catalog");
		Ok(Self { shards })
	}

	/// Parse all shard definitions in `source`.
	///
	/// The closing tag search is not nesting-aware: a definition ends at the
	/// first `</shard>` after its opening tag. An opening tag without any
	/// closing tag after it ends the scan; nothing after it is loaded.
	pub fn parse(source: &str, origin: &str) -> ShardResult<Vec<Shard>> {
		let mut shards = Vec::new();
		let mut cursor = 0;

		while let Some(open) = find_from(source, DEFINITION_OPEN, cursor) {
			let Some(close) = find_from(source, DEFINITION_CLOSE, open) else {
				tracing::debug!(origin, offset = open, "unterminated shard definition");
				break;
			};

			let attributes_start = open + DEFINITION_OPEN.len();
			// The closing tag contains a `>`, so the search always succeeds
			// within the definition.
			let tag_end = find_from(source, ">", attributes_start).unwrap_or(close);
			let mut attributes = extract_attributes(&source[attributes_start..tag_end]);

			let Some(name) = attributes.remove("name") else {
				return Err(ShardError::MalformedDefinition {
					file: origin.to_string(),
					line: line_of(source, open),
				});
			};

			let content = if tag_end < close {
				source[tag_end + 1..close].trim()
			} else {
				""
			};

			shards.push(Shard::new(name, content, origin));
			cursor = close + DEFINITION_CLOSE.len();
		}

		Ok(shards)
	}

	/// The first shard with the given name.
	pub fn get(&self, name: &str) -> Option<&Shard> {
		self.shards.iter().find(|shard| shard.name == name)
	}

	pub fn iter(&self) -> std::slice::Iter<'_, Shard> {
		self.shards.iter()
	}

	pub fn len(&self) -> usize {
		self.shards.len()
	}

	pub fn is_empty(&self) -> bool {
		self.shards.is_empty()
	}

	/// Names defined more than once, each with the origins of every
	/// definition in load order. Only the first definition is reachable
	/// through [`Catalog::get`].
	pub fn duplicates(&self) -> BTreeMap<String, Vec<String>> {
		let mut origins: BTreeMap<String, Vec<String>> = BTreeMap::new();
		for shard in &self.shards {
			origins
				.entry(shard.name.clone())
				.or_default()
				.push(shard.origin.clone());
		}
		origins.retain(|_, files| files.len() > 1);
		origins
	}
}

impl<'a> IntoIterator for &'a Catalog {
	type Item = &'a Shard;
	type IntoIter = std::slice::Iter<'a, Shard>;

	fn into_iter(self) -> Self::IntoIter {
		self.shards.iter()
	}
}

/// List the regular files directly inside `dir` with the given extension,
/// sorted for deterministic ordering. Hidden files are skipped.
pub fn list_files(dir: &Path, extension: &str) -> ShardResult<Vec<PathBuf>> {
	let mut files = Vec::new();

	for entry in std::fs::read_dir(dir)? {
		let path = entry?.path();
		let is_hidden = path
			.file_name()
			.and_then(|name| name.to_str())
			.is_some_and(|name| name.starts_with('.'));
		let has_extension = path
			.extension()
			.and_then(|ext| ext.to_str())
			.is_some_and(|ext| ext == extension);

		if !is_hidden && has_extension && path.is_file() {
			files.push(path);
		}
	}

	files.sort();
	Ok(files)
}

pub(crate) fn file_name(path: &Path) -> String {
	path.file_name()
		.map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned())
}

/// Byte offset of `needle` at or after `from`.
pub(crate) fn find_from(haystack: &str, needle: &str, from: usize) -> Option<usize> {
	haystack
		.get(from..)
		.and_then(|rest| rest.find(needle))
		.map(|index| from + index)
}

/// 1-indexed line number of a byte offset.
fn line_of(source: &str, offset: usize) -> usize {
	source[..offset].matches('\n').count() + 1
}
