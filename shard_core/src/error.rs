use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum ShardError {
	#[error(transparent)]
	#[diagnostic(code(shard::io_error))]
	Io(#[from] std::io::Error),

	#[error("shard definition in `{file}` at line {line} has no `name` attribute")]
	#[diagnostic(
		code(shard::malformed_definition),
		help("every definition needs a name: `<shard name=\"card\">...</shard>`")
	)]
	MalformedDefinition { file: String, line: usize },

	#[error("shard `{shard}` references `{{{placeholder}}}` but no value is bound for it")]
	#[diagnostic(
		code(shard::unbound_placeholder),
		help("pass it as an attribute on the use: `<{shard} {placeholder}=\"...\">`")
	)]
	UnboundPlaceholder { shard: String, placeholder: String },

	#[error("shard `{shard}` contains an unsupported field `{field}`: {reason}")]
	#[diagnostic(
		code(shard::invalid_placeholder),
		help("use `{{name}}` for substitutions and `{{{{` / `}}}}` for literal braces")
	)]
	InvalidPlaceholder {
		shard: String,
		field: String,
		reason: String,
	},

	#[error("shard `{shard}` was substituted more than {limit} times")]
	#[diagnostic(
		code(shard::substitution_limit),
		help("the rendered shard probably contains its own use; check its content")
	)]
	SubstitutionLimit { shard: String, limit: usize },

	#[error("expansion did not settle after {passes} passes")]
	#[diagnostic(
		code(shard::not_converged),
		help("two or more shards expand into each other; raise `max_passes` or break the cycle")
	)]
	NotConverged { passes: usize },

	#[error("failed to expand template `{file}`")]
	#[diagnostic(code(shard::template))]
	Template {
		file: String,
		#[source]
		source: Box<ShardError>,
	},

	#[error("failed to parse config file: {0}")]
	#[diagnostic(
		code(shard::config_parse),
		help("check that shard.toml is valid TOML with [paths] and/or [expansion] sections")
	)]
	ConfigParse(String),
}

impl ShardError {
	/// Attach the template file name to an error raised while expanding it.
	pub fn in_template(self, file: impl Into<String>) -> Self {
		Self::Template {
			file: file.into(),
			source: Box::new(self),
		}
	}

	/// The innermost error, skipping any template context wrappers.
	pub fn root_cause(&self) -> &ShardError {
		match self {
			Self::Template { source, .. } => source.root_cause(),
			other => other,
		}
	}
}

pub type ShardResult<T> = Result<T, ShardError>;
pub type AnyError = Box<dyn std::error::Error>;
pub type AnyEmptyResult = Result<(), AnyError>;
pub type AnyResult<T> = Result<T, AnyError>;
