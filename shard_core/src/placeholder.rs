use std::collections::BTreeMap;
use std::collections::BTreeSet;

use logos::Logos;

/// Raw tokens for brace-delimited substitution fields.
///
/// `{{` and `}}` are escapes and always win over a field starting at the same
/// position, because a field body may not contain braces.
#[derive(Logos, Debug, PartialEq)]
enum RawToken {
	#[token("{{")]
	EscapedOpen,
	#[token("}}")]
	EscapedClose,
	#[regex(r"\{[^{}]*\}")]
	Field,
	#[token("{")]
	StrayOpen,
	#[token("}")]
	StrayClose,
	#[regex(r"[^{}]+")]
	Text,
}

/// A piece of shard content after tokenization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
	/// Literal text, with escapes already collapsed (`{{` becomes `{`).
	Literal(&'a str),
	/// A `{...}` substitution field.
	Field(Field<'a>),
	/// A single `{` or `}` that is neither an escape nor part of a field.
	Stray(&'a str),
}

/// A substitution field such as `{title}` or `{title!r:>8}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field<'a> {
	/// The field exactly as written, braces included.
	pub raw: &'a str,
	/// The field name: everything before the first `!` or `:`.
	pub name: &'a str,
	/// The conversion and format spec, starting with `!` or `:` (empty when
	/// absent).
	pub spec: &'a str,
}

impl<'a> Field<'a> {
	fn new(raw: &'a str) -> Self {
		let inner = &raw[1..raw.len() - 1];
		let split = inner.find(['!', ':']).unwrap_or(inner.len());

		Self {
			raw,
			name: &inner[..split],
			spec: &inner[split..],
		}
	}

	/// Positional fields (`{}`, `{0}`) carry no name that a binding could
	/// satisfy.
	pub fn is_positional(&self) -> bool {
		self.name.is_empty() || self.name.starts_with(|c: char| c.is_ascii_digit())
	}

	/// Whether the name uses attribute or index access (`{a.b}`, `{a[0]}`).
	pub fn has_accessor(&self) -> bool {
		self.name.contains(['.', '['])
	}
}

/// Split text into literal runs, fields and stray braces.
pub fn segments(text: &str) -> Vec<Segment<'_>> {
	let mut lexer = RawToken::lexer(text);
	let mut segments = Vec::new();

	while let Some(token) = lexer.next() {
		let slice = lexer.slice();
		let segment = match token {
			Ok(RawToken::EscapedOpen) => Segment::Literal("{"),
			Ok(RawToken::EscapedClose) => Segment::Literal("}"),
			Ok(RawToken::Field) => Segment::Field(Field::new(slice)),
			Ok(RawToken::StrayOpen | RawToken::StrayClose) => Segment::Stray(slice),
			Ok(RawToken::Text) | Err(()) => Segment::Literal(slice),
		};
		segments.push(segment);
	}

	segments
}

/// Collect the unique placeholder names referenced in `text`.
///
/// Positional fields and stray braces are ignored.
pub fn placeholders(text: &str) -> BTreeSet<String> {
	segments(text)
		.into_iter()
		.filter_map(|segment| {
			match segment {
				Segment::Field(field) if !field.is_positional() => Some(field.name.to_string()),
				_ => None,
			}
		})
		.collect()
}

/// Why a field could not be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderFailure {
	/// A named field has no binding.
	Unbound(String),
	/// The field uses syntax this renderer does not support.
	Invalid { field: String, reason: &'static str },
}

/// Substitute every named field in `text` with its binding.
pub fn render(text: &str, bindings: &BTreeMap<String, String>) -> Result<String, RenderFailure> {
	let mut output = String::with_capacity(text.len());

	for segment in segments(text) {
		match segment {
			Segment::Literal(literal) => output.push_str(literal),
			Segment::Stray(brace) => {
				let reason = if brace == "{" {
					"single `{` encountered"
				} else {
					"single `}` encountered"
				};
				return Err(RenderFailure::Invalid {
					field: brace.to_string(),
					reason,
				});
			}
			Segment::Field(field) => {
				let reason = if field.is_positional() {
					Some("positional fields are not supported")
				} else if field.has_accessor() {
					Some("attribute and index access are not supported")
				} else if !field.spec.is_empty() {
					Some("conversions and format specs are not supported")
				} else {
					None
				};

				if let Some(reason) = reason {
					return Err(RenderFailure::Invalid {
						field: field.raw.to_string(),
						reason,
					});
				}

				let Some(value) = bindings.get(field.name) else {
					return Err(RenderFailure::Unbound(field.name.to_string()));
				};
				output.push_str(value);
			}
		}
	}

	Ok(output)
}
