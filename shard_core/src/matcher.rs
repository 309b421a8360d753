//! Locating shard uses inside template text.
//!
//! A use is written either as `<name>body</name>` or as
//! `<name key="value" ...>body</name>`. The body may contain further uses of
//! the same shard, so the closing tag is found with a depth counter rather
//! than by taking the first `</name>`.

use std::collections::BTreeMap;
use std::ops::Range;

use crate::ShardResult;
use crate::attributes::extract_attributes;
use crate::catalog::Shard;
use crate::catalog::find_from;

/// The binding that always holds the text between a use's tags.
pub const CONTENT_BINDING: &str = "content";

/// One invocation of a shard found in a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardUse<'a> {
	/// The shard being invoked.
	pub shard: &'a Shard,
	/// The exact matched text, opening tag through closing tag.
	pub matched: String,
	/// Byte range of `matched` in the template it was found in.
	pub span: Range<usize>,
	/// Attribute values plus the `content` binding.
	pub bindings: BTreeMap<String, String>,
	/// Name of the template the use was found in.
	pub origin: String,
}

impl ShardUse<'_> {
	/// Offset immediately past the closing tag, where a forward scan can
	/// resume without finding this use again.
	pub fn end(&self) -> usize {
		self.span.end
	}

	pub fn render(&self) -> ShardResult<String> {
		self.shard.render(&self.bindings)
	}
}

/// The two literal forms a use can open with.
struct OpenTags {
	with_attributes: String,
	bare: String,
	close: String,
}

impl OpenTags {
	fn new(name: &str) -> Self {
		Self {
			with_attributes: format!("<{name} "),
			bare: format!("<{name}>"),
			close: format!("</{name}>"),
		}
	}

	/// The earliest opening tag at or after `from`, with the length of the
	/// matched prefix and whether it is the attribute form.
	fn find(&self, template: &str, from: usize) -> Option<(usize, usize, bool)> {
		let with_attributes = find_from(template, &self.with_attributes, from);
		let bare = find_from(template, &self.bare, from);

		match (with_attributes, bare) {
			(Some(a), Some(b)) if a < b => Some((a, self.with_attributes.len(), true)),
			(_, Some(b)) => Some((b, self.bare.len(), false)),
			(Some(a), None) => Some((a, self.with_attributes.len(), true)),
			(None, None) => None,
		}
	}
}

/// Find the first use of `shard` in `template` at or after `start`.
///
/// Returns `None` when there is no opening tag, or when no closing tag
/// balances it.
pub fn find_use<'a>(
	template: &str,
	shard: &'a Shard,
	start: usize,
	origin: &str,
) -> Option<ShardUse<'a>> {
	let tags = OpenTags::new(&shard.name);
	let (open, prefix_len, has_attributes) = tags.find(template, start)?;
	let after_prefix = open + prefix_len;

	let Some(close) = find_matching_close(template, &tags, after_prefix) else {
		tracing::debug!(shard = %shard.name, origin, offset = open, "unterminated shard use");
		return None;
	};

	let mut bindings = BTreeMap::new();
	let body_start = if has_attributes {
		// `</name>` ends in `>`, so a `>` always exists before the close ends.
		let tag_end = find_from(template, ">", after_prefix).unwrap_or(close);
		bindings = extract_attributes(&template[after_prefix..tag_end]);
		tag_end + 1
	} else {
		after_prefix
	};

	let content = if body_start <= close {
		&template[body_start..close]
	} else {
		""
	};
	bindings.insert(CONTENT_BINDING.to_string(), content.to_string());

	let end = close + tags.close.len();
	Some(ShardUse {
		shard,
		matched: template[open..end].to_string(),
		span: open..end,
		bindings,
		origin: origin.to_string(),
	})
}

/// Find the closing tag that balances an opening tag whose prefix ends at
/// `from`.
///
/// Invariants: depth is 1 on entry, since the caller has consumed one opening
/// tag. Each opening tag (either form) that occurs before the next closing
/// tag raises depth by one; each closing tag lowers it by one. The closing
/// tag that lowers depth to 0 is returned. Running out of closing tags while
/// depth is still positive means the use is unterminated.
fn find_matching_close(template: &str, tags: &OpenTags, from: usize) -> Option<usize> {
	let mut depth = 1usize;
	let mut cursor = from;

	loop {
		let close = find_from(template, &tags.close, cursor)?;
		let next_open = tags.find(template, cursor).map(|(offset, ..)| offset);

		match next_open {
			Some(open) if open < close => {
				depth += 1;
				cursor = open + 1;
			}
			_ => {
				depth -= 1;
				if depth == 0 {
					return Some(close);
				}
				cursor = close + 1;
			}
		}
	}
}
