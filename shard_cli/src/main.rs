use std::path::Path;
use std::path::PathBuf;
use std::process;
use std::sync::mpsc;
use std::time::Duration;

use clap::Parser;
use owo_colors::OwoColorize;
use serde::Serialize;
use shard_cli::Commands;
use shard_cli::ListFormat;
use shard_cli::ShardCli;
use shard_core::CONFIG_FILE_CANDIDATES;
use shard_core::Orchestrator;
use shard_core::ShardConfig;
use shard_core::UpdateOptions;
use similar::ChangeTag;
use similar::TextDiff;
use tracing_subscriber::EnvFilter;

static USE_COLOR: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(true);

fn color_enabled() -> bool {
	USE_COLOR.load(std::sync::atomic::Ordering::Relaxed)
}

/// Apply ANSI color codes only when color is enabled.
macro_rules! colored {
	($text:expr,red) => {
		if color_enabled() {
			format!("{}", $text.red())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,green) => {
		if color_enabled() {
			format!("{}", $text.green())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,yellow) => {
		if color_enabled() {
			format!("{}", $text.yellow())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,bold) => {
		if color_enabled() {
			format!("{}", $text.bold())
		} else {
			format!("{}", $text)
		}
	};
}

const SAMPLE_CONFIG: &str = "# shard configuration\n\n# Extension of shard and template \
                             files.\nextension = \"html\"\n\n[paths]\nshards = \
                             \"templates/shards\"\ntemplates = \"templates/templates\"\noutput = \
                             \"templates/rendered\"\n\n# How uses are written back and how often \
                             the catalog is applied.\n# [expansion]\n# substitution = \"span\"    \
                             # or \"all-occurrences\"\n# mode = \"single-pass\"   # or \
                             \"fixed-point\"\n";

const SAMPLE_SHARD: &str = "<shard name=\"card\">\n<div class=\"card\">\n  <h2>{title}</h2>\n  \
                            {content}\n</div>\n</shard>\n";

const SAMPLE_TEMPLATE: &str = "<!doctype html>\n<html>\n<body>\n  <card title=\"Welcome\">Hello \
                               from shard!</card>\n</body>\n</html>\n";

fn main() {
	let args = ShardCli::parse();

	// Respect NO_COLOR env var, --no-color flag and terminal support.
	let use_color = !args.no_color
		&& std::env::var_os("NO_COLOR").is_none()
		&& supports_color::on(supports_color::Stream::Stdout).is_some();
	if !use_color {
		USE_COLOR.store(false, std::sync::atomic::Ordering::Relaxed);
	}

	// Install miette's fancy handler for rich error diagnostics.
	miette::set_hook(Box::new(move |_| {
		Box::new(
			miette::MietteHandlerOpts::new()
				.color(use_color)
				.unicode(use_color)
				.build(),
		)
	}))
	.ok();

	init_tracing(args.verbose, use_color);

	let result = match args.command {
		Some(Commands::Init) => run_init(&args),
		Some(Commands::Check { diff }) => run_check(&args, diff),
		Some(Commands::List { format }) => run_list(&args, format),
		Some(Commands::Build {
			force,
			dry_run,
			watch,
		}) => run_build(&args, UpdateOptions { force, dry_run }, watch),
		None => run_build(&args, UpdateOptions::default(), false),
	};

	if let Err(e) = result {
		// Try to render through miette for rich diagnostics with help text
		// and error codes.
		match e.downcast::<shard_core::ShardError>() {
			Ok(shard_err) => {
				let report: miette::Report = (*shard_err).into();
				eprintln!("{report:?}");
			}
			Err(e) => {
				eprintln!("{} {e}", colored!("error:", red));
			}
		}
		process::exit(2);
	}
}

/// Log to stderr. `RUST_LOG` wins unless `--verbose` is given.
fn init_tracing(verbose: bool, use_color: bool) {
	let filter = if verbose {
		EnvFilter::new("shard=debug,shard_core=debug")
	} else {
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
	};

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_ansi(use_color)
		.without_time()
		.init();
}

fn resolve_root(args: &ShardCli) -> PathBuf {
	args.path
		.clone()
		.unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

fn open_project(args: &ShardCli) -> Result<Orchestrator, Box<dyn std::error::Error>> {
	let root = resolve_root(args);
	Ok(Orchestrator::from_root(&root)?)
}

fn run_init(args: &ShardCli) -> Result<(), Box<dyn std::error::Error>> {
	let root = resolve_root(args);

	if let Some(existing) = ShardConfig::resolve_path(&root) {
		println!("Config file already exists: {}", existing.display());
	} else {
		std::fs::write(root.join(CONFIG_FILE_CANDIDATES[0]), SAMPLE_CONFIG)?;
		println!("Created {}", CONFIG_FILE_CANDIDATES[0]);
	}

	let config = ShardConfig::load_or_default(&root)?;
	let paths = config.paths.resolve(&root);
	for dir in [&paths.shards, &paths.templates, &paths.output] {
		std::fs::create_dir_all(dir)?;
	}

	let shard_path = paths.shards.join(format!("card.{}", config.extension));
	let template_path = paths.templates.join(format!("index.{}", config.extension));
	let mut created_samples = false;

	for (path, content) in [(&shard_path, SAMPLE_SHARD), (&template_path, SAMPLE_TEMPLATE)] {
		if path.exists() {
			println!("File already exists: {}", make_relative(path, &root));
		} else {
			std::fs::write(path, content)?;
			println!("Created {}", make_relative(path, &root));
			created_samples = true;
		}
	}

	if created_samples {
		println!();
		println!("Next steps:");
		println!(
			"  1. Define shards in {}/ with <shard name=\"...\">...</shard>",
			make_relative(&paths.shards, &root)
		);
		println!(
			"  2. Use them as tags in {}/",
			make_relative(&paths.templates, &root)
		);
		println!("  3. Run `shard build` to render them");
	}

	Ok(())
}

fn run_build(
	args: &ShardCli,
	options: UpdateOptions,
	watch: bool,
) -> Result<(), Box<dyn std::error::Error>> {
	let orchestrator = open_project(args)?;
	let root = resolve_root(args);

	// Run the initial build.
	run_build_once(&orchestrator, &root, options)?;

	if !watch || options.dry_run {
		return Ok(());
	}

	// Watch mode
	println!("\nWatching for file changes... (press Ctrl+C to stop)");

	let paths = orchestrator.paths();
	let shard_dir = std::fs::canonicalize(&paths.shards).unwrap_or_else(|_| paths.shards.clone());
	let template_dir =
		std::fs::canonicalize(&paths.templates).unwrap_or_else(|_| paths.templates.clone());
	let (tx, rx) = mpsc::channel::<Vec<PathBuf>>();

	let mut watcher =
		notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
			if let Ok(event) = res {
				if matches!(
					event.kind,
					notify::EventKind::Modify(_)
						| notify::EventKind::Create(_)
						| notify::EventKind::Remove(_)
				) {
					let _ = tx.send(event.paths);
				}
			}
		})?;

	use notify::Watcher;
	watcher.watch(&shard_dir, notify::RecursiveMode::NonRecursive)?;
	watcher.watch(&template_dir, notify::RecursiveMode::NonRecursive)?;

	loop {
		let mut changed = rx.recv()?;
		// Debounce: collect additional events within 200ms.
		while let Ok(more) = rx.recv_timeout(Duration::from_millis(200)) {
			changed.extend(more);
		}

		tracing::debug!(paths = ?changed, "file change detected");
		let shards_changed = changed.iter().any(|path| path.starts_with(&shard_dir));
		let result = if shards_changed {
			println!("\nShard change detected, reloading and rebuilding...");
			reload_and_rebuild(&orchestrator, &root, options)
		} else {
			println!("\nTemplate change detected, updating...");
			run_build_once(&orchestrator, &root, options)
		};

		if let Err(e) = result {
			eprintln!("{} {e}", colored!("error:", red));
		}
	}
}

/// Shard edits never make a template look stale, so everything is rebuilt
/// against the fresh catalog.
fn reload_and_rebuild(
	orchestrator: &Orchestrator,
	root: &Path,
	options: UpdateOptions,
) -> Result<(), Box<dyn std::error::Error>> {
	orchestrator.reload()?;
	run_build_once(
		orchestrator,
		root,
		UpdateOptions {
			force: true,
			..options
		},
	)
}

fn run_build_once(
	orchestrator: &Orchestrator,
	root: &Path,
	options: UpdateOptions,
) -> Result<(), Box<dyn std::error::Error>> {
	let report = orchestrator.update_with(options)?;

	if report.is_noop() {
		println!("All templates are already up to date.");
		return Ok(());
	}

	if options.dry_run {
		println!("Dry run: would render {} template(s):", report.rebuilt.len());
		for template in &report.rebuilt {
			println!("  {}", make_relative(template, root));
		}
		return Ok(());
	}

	for template in &report.rebuilt {
		println!("Render {}", file_label(template));
	}
	println!("{}", colored!("Templates updated", green));

	Ok(())
}

fn run_check(args: &ShardCli, show_diff: bool) -> Result<(), Box<dyn std::error::Error>> {
	let orchestrator = open_project(args)?;
	let root = resolve_root(args);
	let stale = orchestrator.stale_templates()?;

	if stale.is_empty() {
		println!("Check passed: all templates are up to date.");
		return Ok(());
	}

	eprintln!(
		"{} {} template(s) out of date:",
		colored!("Check failed.", red),
		stale.len()
	);
	for template in &stale {
		let output = orchestrator.output_path(template);
		let state = if output.exists() { "stale" } else { "missing" };
		eprintln!(
			"  {} -> {} [{state}]",
			make_relative(template, &root),
			make_relative(&output, &root)
		);

		if show_diff {
			let current = std::fs::read_to_string(&output).unwrap_or_default();
			let expected = orchestrator.expand_template(template)?;
			print_diff(&current, &expected);
		}
	}
	eprintln!();
	eprintln!("Run `shard build` to update them.");

	process::exit(1);
}

#[derive(Serialize)]
struct ShardEntry<'a> {
	name: &'a str,
	placeholders: Vec<String>,
	origin: &'a str,
}

fn run_list(args: &ShardCli, format: ListFormat) -> Result<(), Box<dyn std::error::Error>> {
	let orchestrator = open_project(args)?;
	let root = resolve_root(args);
	let catalog = orchestrator.catalog();

	for (name, origins) in catalog.duplicates() {
		eprintln!(
			"{} shard `{name}` is defined more than once ({}); the first definition is used",
			colored!("warning:", yellow),
			origins.join(", ")
		);
	}

	if format == ListFormat::Json {
		let entries: Vec<ShardEntry<'_>> = catalog
			.iter()
			.map(|shard| {
				ShardEntry {
					name: &shard.name,
					placeholders: shard.placeholders().into_iter().collect(),
					origin: &shard.origin,
				}
			})
			.collect();
		println!("{}", serde_json::to_string_pretty(&entries)?);
		return Ok(());
	}

	if catalog.is_empty() {
		println!(
			"No shards found in {}",
			make_relative(&orchestrator.paths().shards, &root)
		);
		return Ok(());
	}

	println!("{}", colored!("Shards:", bold));
	for shard in &*catalog {
		println!("  {shard}");
	}
	println!("\n{} shard(s)", catalog.len());

	Ok(())
}

/// Print a unified diff between two strings, colorized.
fn print_diff(current: &str, expected: &str) {
	let diff = TextDiff::from_lines(current, expected);
	for change in diff.iter_all_changes() {
		match change.tag() {
			ChangeTag::Delete => {
				eprint!("    {}", colored!(format!("-{change}"), red));
			}
			ChangeTag::Insert => {
				eprint!("    {}", colored!(format!("+{change}"), green));
			}
			ChangeTag::Equal => {
				eprint!("     {change}");
			}
		}
	}
}

/// Make a path relative to root for display purposes.
fn make_relative(path: &Path, root: &Path) -> String {
	path.strip_prefix(root)
		.unwrap_or(path)
		.display()
		.to_string()
}

fn file_label(path: &Path) -> String {
	path.file_name()
		.map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned())
}
