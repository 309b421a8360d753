use std::ops::Range;

use serde::Deserialize;

use crate::Catalog;
use crate::ShardError;
use crate::ShardResult;
use crate::catalog::Shard;
use crate::matcher::find_use;

/// Default cap on full catalog passes in [`ExpansionMode::FixedPoint`].
pub const DEFAULT_MAX_PASSES: usize = 16;
/// Default cap on substitutions of a single shard within one pass.
pub const DEFAULT_MAX_SUBSTITUTIONS: usize = 10_000;

/// How a matched use is written back into the template.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Substitution {
	/// Replace exactly the span of the matched use.
	#[default]
	Span,
	/// Replace every literal occurrence of the matched text. Uses that are
	/// byte-for-byte identical are all rewritten by one substitution.
	AllOccurrences,
}

/// How many times the catalog is applied to a template.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExpansionMode {
	/// One pass over the catalog in load order. A use produced by expanding
	/// another shard is only expanded when its shard comes later in the
	/// catalog.
	#[default]
	SinglePass,
	/// Repeat full passes until a pass makes no substitution.
	FixedPoint,
}

/// The `[expansion]` section of `shard.toml`.
///
/// ```toml
/// [expansion]
/// substitution = "span"
/// mode = "single-pass"
/// max_passes = 16
/// max_substitutions = 10000
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ExpandOptions {
	pub substitution: Substitution,
	pub mode: ExpansionMode,
	/// Only used by [`ExpansionMode::FixedPoint`].
	pub max_passes: usize,
	pub max_substitutions: usize,
}

impl Default for ExpandOptions {
	fn default() -> Self {
		Self {
			substitution: Substitution::default(),
			mode: ExpansionMode::default(),
			max_passes: DEFAULT_MAX_PASSES,
			max_substitutions: DEFAULT_MAX_SUBSTITUTIONS,
		}
	}
}

/// Expand every shard use in `template` with default options.
pub fn expand(template: &str, catalog: &Catalog) -> ShardResult<String> {
	Expander::default().expand(template, catalog, "")
}

/// Applies a catalog to template text.
#[derive(Debug, Clone, Default)]
pub struct Expander {
	options: ExpandOptions,
}

impl Expander {
	pub fn new(options: ExpandOptions) -> Self {
		Self { options }
	}

	pub fn options(&self) -> &ExpandOptions {
		&self.options
	}

	/// Expand `template` against `catalog`. `origin` names the template in
	/// logs and in the uses that are found.
	pub fn expand(&self, template: &str, catalog: &Catalog, origin: &str) -> ShardResult<String> {
		match self.options.mode {
			ExpansionMode::SinglePass => {
				let (text, _) = self.pass(template.to_string(), catalog, origin)?;
				Ok(text)
			}
			ExpansionMode::FixedPoint => {
				let mut text = template.to_string();
				for pass in 1..=self.options.max_passes {
					let (next, substitutions) = self.pass(text, catalog, origin)?;
					text = next;
					if substitutions == 0 {
						tracing::trace!(origin, pass, "expansion settled");
						return Ok(text);
					}
				}

				if has_uses(&text, catalog) {
					return Err(ShardError::NotConverged {
						passes: self.options.max_passes,
					});
				}
				Ok(text)
			}
		}
	}

	/// Apply each shard in catalog order until it has no uses left. Returns the
	/// new text and the number of substitutions made.
	fn pass(&self, mut text: String, catalog: &Catalog, origin: &str) -> ShardResult<(String, usize)> {
		let mut total = 0;

		for shard in catalog {
			let mut count = 0;
			while let Some(next) = self.step(&text, shard, origin)? {
				count += 1;
				if count > self.options.max_substitutions {
					return Err(ShardError::SubstitutionLimit {
						shard: shard.name.clone(),
						limit: self.options.max_substitutions,
					});
				}
				text = next;
			}
			total += count;
		}

		Ok((text, total))
	}

	/// Perform one substitution step: find the first use of `shard` from the
	/// start of `text` and write its rendered form back. Returns `None` when
	/// the shard has no use in `text`.
	pub fn step(&self, text: &str, shard: &Shard, origin: &str) -> ShardResult<Option<String>> {
		let Some(found) = find_use(text, shard, 0, origin) else {
			return Ok(None);
		};
		let rendered = found.render()?;
		tracing::trace!(shard = %shard.name, origin, span = ?found.span, "substituting use");

		let next = match self.options.substitution {
			Substitution::Span => splice(text, found.span, &rendered),
			Substitution::AllOccurrences => text.replace(&found.matched, &rendered),
		};
		Ok(Some(next))
	}
}

fn has_uses(text: &str, catalog: &Catalog) -> bool {
	catalog
		.iter()
		.any(|shard| find_use(text, shard, 0, "").is_some())
}

fn splice(text: &str, span: Range<usize>, replacement: &str) -> String {
	let mut result = String::with_capacity(text.len() - span.len() + replacement.len());
	result.push_str(&text[..span.start]);
	result.push_str(replacement);
	result.push_str(&text[span.end..]);
	result
}
