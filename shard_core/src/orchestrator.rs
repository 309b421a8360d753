use std::io::ErrorKind;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::PoisonError;
use std::sync::RwLock;

use crate::Catalog;
use crate::Expander;
use crate::ShardConfig;
use crate::ShardResult;
use crate::catalog::file_name;
use crate::catalog::list_files;
use crate::config::PathsConfig;

/// Options for a single [`Orchestrator::update_with`] run.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateOptions {
	/// Rebuild every template regardless of timestamps.
	pub force: bool,
	/// Decide and expand, but do not write any output file.
	pub dry_run: bool,
}

/// What an update pass did.
#[derive(Debug, Default)]
pub struct UpdateReport {
	/// Templates that were expanded (or would have been, in a dry run).
	pub rebuilt: Vec<PathBuf>,
	/// Templates whose output was already fresh.
	pub skipped: Vec<PathBuf>,
}

impl UpdateReport {
	pub fn is_noop(&self) -> bool {
		self.rebuilt.is_empty()
	}
}

/// Keeps a directory of expanded templates in sync with its sources.
///
/// The orchestrator owns the catalog. [`Orchestrator::reload`] builds a new
/// catalog and swaps it in; an update already running keeps expanding
/// against the catalog it started with.
#[derive(Debug)]
pub struct Orchestrator {
	paths: PathsConfig,
	extension: String,
	expander: Expander,
	catalog: RwLock<Arc<Catalog>>,
}

impl Orchestrator {
	/// Create an orchestrator for the project at `root` and load its catalog.
	pub fn new(root: &Path, config: &ShardConfig) -> ShardResult<Self> {
		let paths = config.paths.resolve(root);
		let catalog = Catalog::load(&paths.shards, &config.extension)?;

		Ok(Self {
			paths,
			extension: config.extension.clone(),
			expander: Expander::new(config.expansion.clone()),
			catalog: RwLock::new(Arc::new(catalog)),
		})
	}

	/// Discover `shard.toml` in `root` (defaults when absent) and create an
	/// orchestrator from it.
	pub fn from_root(root: &Path) -> ShardResult<Self> {
		let config = ShardConfig::load_or_default(root)?;
		Self::new(root, &config)
	}

	/// The resolved shard, template and output directories.
	pub fn paths(&self) -> &PathsConfig {
		&self.paths
	}

	/// A snapshot of the current catalog.
	pub fn catalog(&self) -> Arc<Catalog> {
		Arc::clone(&self.catalog.read().unwrap_or_else(PoisonError::into_inner))
	}

	/// Re-read every shard file and replace the catalog wholesale.
	pub fn reload(&self) -> ShardResult<()> {
		let fresh = Catalog::load(&self.paths.shards, &self.extension)?;
		*self.catalog.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(fresh);
		Ok(())
	}

	/// Template source files, sorted by path.
	pub fn templates(&self) -> ShardResult<Vec<PathBuf>> {
		list_files(&self.paths.templates, &self.extension)
	}

	/// The output file a template expands into.
	pub fn output_path(&self, template: &Path) -> PathBuf {
		self.paths.output.join(file_name(template))
	}

	/// Whether `template` needs to be expanded again. Only the template's own
	/// modification time is compared with its output; edits to shard files
	/// are not taken into account.
	pub fn is_stale(&self, template: &Path) -> ShardResult<bool> {
		let output = match std::fs::metadata(self.output_path(template)) {
			Ok(metadata) => metadata,
			Err(e) if e.kind() == ErrorKind::NotFound => return Ok(true),
			Err(e) => return Err(e.into()),
		};
		let template = std::fs::metadata(template)?;

		Ok(template.modified()? > output.modified()?)
	}

	/// Templates whose output is missing or older than the template.
	pub fn stale_templates(&self) -> ShardResult<Vec<PathBuf>> {
		let mut stale = Vec::new();
		for template in self.templates()? {
			if self.is_stale(&template)? {
				stale.push(template);
			}
		}
		Ok(stale)
	}

	/// Expand one template file against the current catalog without writing
	/// it.
	pub fn expand_template(&self, template: &Path) -> ShardResult<String> {
		let catalog = self.catalog();
		self.expand_with(&catalog, template)
	}

	/// Expand the named template and overwrite its output, regardless of
	/// timestamps.
	pub fn render_template_file(&self, name: &str) -> ShardResult<PathBuf> {
		let catalog = self.catalog();
		let template = self.paths.templates.join(name);
		let expanded = self.expand_with(&catalog, &template)?;
		self.write_output(&template, &expanded)
	}

	/// Expand every stale template and write its output.
	pub fn update(&self) -> ShardResult<UpdateReport> {
		self.update_with(UpdateOptions::default())
	}

	pub fn update_with(&self, options: UpdateOptions) -> ShardResult<UpdateReport> {
		let catalog = self.catalog();
		let mut report = UpdateReport::default();

		for template in self.templates()? {
			if !options.force && !self.is_stale(&template)? {
				tracing::debug!(file = %file_name(&template), "output is fresh, skipping");
				report.skipped.push(template);
				continue;
			}

			let expanded = self.expand_with(&catalog, &template)?;
			if options.dry_run {
				tracing::info!(file = %file_name(&template), "would render template");
			} else {
				self.write_output(&template, &expanded)?;
				tracing::info!(file = %file_name(&template), "rendered template");
			}
			report.rebuilt.push(template);
		}

		tracing::info!(
			rebuilt = report.rebuilt.len(),
			skipped = report.skipped.len(),
			"templates updated"
		);
		Ok(report)
	}

	fn expand_with(&self, catalog: &Catalog, template: &Path) -> ShardResult<String> {
		let name = file_name(template);
		let source = std::fs::read_to_string(template)?;
		self.expander
			.expand(&source, catalog, &name)
			.map_err(|e| e.in_template(name))
	}

	fn write_output(&self, template: &Path, expanded: &str) -> ShardResult<PathBuf> {
		std::fs::create_dir_all(&self.paths.output)?;
		let output = self.output_path(template);
		std::fs::write(&output, expanded)?;
		Ok(output)
	}
}
