use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;

#[derive(Parser)]
#[command(
	author,
	version,
	about = "Expand reusable shard tags in HTML templates.",
	long_about = "shard is a small template preprocessor. Shard files define named fragments \
	              with `{placeholder}` fields; templates use them as custom tags and shard \
	              writes the expanded result to an output directory.\n\nQuick start:\n  shard \
	              init   Create shard.toml and a sample project\n  shard build  Expand every \
	              stale template\n  shard check  Verify every output is up to date\n  shard \
	              list   Show the loaded shards"
)]
pub struct ShardCli {
	#[command(subcommand)]
	pub command: Option<Commands>,

	/// Path to the project root directory.
	#[arg(long, short, global = true)]
	pub path: Option<PathBuf>,

	/// Enable verbose output.
	#[arg(long, short, global = true, default_value_t = false)]
	pub verbose: bool,

	/// Disable colored output.
	#[arg(long, global = true, default_value_t = false)]
	pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
	/// Expand templates whose output is missing or older than the template.
	///
	/// This is the default when no command is given.
	Build {
		/// Rebuild every template regardless of timestamps.
		#[arg(long, default_value_t = false)]
		force: bool,

		/// Show which templates would be rendered without writing anything.
		#[arg(long, default_value_t = false)]
		dry_run: bool,

		/// Watch the shard and template directories and rebuild on change.
		/// Editing a shard file reloads the catalog and rebuilds everything.
		#[arg(long, default_value_t = false)]
		watch: bool,
	},
	/// Check that every rendered output is up to date.
	///
	/// Nothing is written. Exits with status 1 when any template is stale,
	/// which makes it suitable for CI.
	Check {
		/// Show a diff between each stale output and its fresh expansion.
		#[arg(long, default_value_t = false)]
		diff: bool,
	},
	/// List the shards in the catalog, in load order.
	List {
		/// Output format for the listing.
		#[arg(long, value_enum, default_value_t = ListFormat::Text)]
		format: ListFormat,
	},
	/// Create `shard.toml`, the project directories and a sample shard.
	///
	/// Existing files are left untouched.
	Init,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ListFormat {
	/// Human-readable text output.
	Text,
	/// JSON output for programmatic consumption.
	Json,
}
