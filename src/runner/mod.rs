//! Run orchestration: discovery, parallel per-file analysis, aggregation.
//!
//! One task per discovered file, scheduled on the rayon pool. Every task is
//! independent end-to-end (read, parse, extract, check) with its own parser;
//! the compiled queries and the resolver are shared read-only. The first
//! task failure cancels the run: a cancellation flag stops tasks that have
//! not started real work yet, and completed sibling results are discarded so
//! output is never silently incomplete.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use thiserror::Error;
use tracing::debug;
use tree_sitter::Parser;
use walkdir::WalkDir;

use crate::analysis::{ExtractionError, ModuleNode, ModuleQueries};
use crate::owners;
use crate::report::ModuleReport;
use crate::resolver::{ResolutionError, ResolverConfigError, TsPathResolver};

/// Errors that abort a run. Every variant names the offending file so the
/// fix (file or config) is actionable.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to access {}: {source}", path.display())]
    Access {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not parse {}: is it valid TypeScript?", path.display())]
    Parse { path: PathBuf },

    #[error("fact extraction failed for {}: {source}", path.display())]
    Extraction {
        path: PathBuf,
        #[source]
        source: ExtractionError,
    },

    #[error("query setup failed: {0}")]
    QuerySetup(ExtractionError),

    #[error(transparent)]
    ResolverConfig(#[from] ResolverConfigError),

    #[error("import resolution failed for {}: {source}", path.display())]
    Resolution {
        path: PathBuf,
        #[source]
        source: ResolutionError,
    },
}

/// Result type for run operations.
pub type RunResult<T> = Result<T, RunError>;

/// Immutable run configuration, built once at the CLI boundary and passed by
/// reference into everything that needs it.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// File or directory to analyze.
    pub target: PathBuf,
    /// Project root: anchors tsconfig.json discovery and the OWNERS search.
    pub project_root: PathBuf,
    /// When set, keep only reports whose owner matches.
    pub owner_filter: Option<String>,
    /// Keep reports for modules with nothing flagged.
    pub include_clean: bool,
}

impl RunConfig {
    /// Configuration with defaults: analyze `target` rooted at
    /// `project_root`, report offenders for any owner.
    pub fn new(target: impl Into<PathBuf>, project_root: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
            project_root: project_root.into(),
            owner_filter: None,
            include_clean: false,
        }
    }
}

/// Runs the analysis over the configured target and returns the aggregated
/// reports, sorted by module name.
pub fn run(config: &RunConfig) -> RunResult<Vec<ModuleReport>> {
    let target = fs::canonicalize(&config.target).map_err(|source| RunError::Access {
        path: config.target.clone(),
        source,
    })?;
    let project_root =
        fs::canonicalize(&config.project_root).map_err(|source| RunError::Access {
            path: config.project_root.clone(),
            source,
        })?;

    let resolver = TsPathResolver::from_root(&project_root)?;
    let queries = ModuleQueries::new().map_err(RunError::QuerySetup)?;

    let files = if target.is_dir() {
        discover_source_files(&target)?
    } else {
        vec![target]
    };
    debug!(files = files.len(), "discovered candidate files");

    let cancelled = AtomicBool::new(false);
    let collected: RunResult<Vec<Vec<ModuleReport>>> = files
        .par_iter()
        .map(|file| {
            // A sibling already failed; the run's output is discarded, so
            // stop before doing any work.
            if cancelled.load(Ordering::Relaxed) {
                return Ok(Vec::new());
            }
            analyze_file(file, &queries, &resolver, &project_root).map_err(|e| {
                cancelled.store(true, Ordering::Relaxed);
                e
            })
        })
        .collect();

    let mut reports: Vec<ModuleReport> = collected?.into_iter().flatten().collect();

    if let Some(owner) = &config.owner_filter {
        reports.retain(|r| r.owner.as_deref() == Some(owner.as_str()));
    }
    if !config.include_clean {
        reports.retain(ModuleReport::has_unnecessary_imports);
    }
    reports.sort_by(|a, b| a.module_name.cmp(&b.module_name));
    Ok(reports)
}

/// Analyzes one file: parse, extract facts, check every declared module.
fn analyze_file(
    path: &Path,
    queries: &ModuleQueries,
    resolver: &TsPathResolver,
    project_root: &Path,
) -> RunResult<Vec<ModuleReport>> {
    let source = fs::read(path).map_err(|source| RunError::Access {
        path: path.to_path_buf(),
        source,
    })?;

    let mut parser = Parser::new();
    parser
        .set_language(queries.language())
        .map_err(|e| RunError::Extraction {
            path: path.to_path_buf(),
            source: ExtractionError::Language(e),
        })?;
    let tree = parser.parse(&source, None).ok_or_else(|| RunError::Parse {
        path: path.to_path_buf(),
    })?;
    if tree.root_node().has_error() {
        return Err(RunError::Parse {
            path: path.to_path_buf(),
        });
    }

    let facts = queries
        .extract(&tree, &source)
        .map_err(|source| RunError::Extraction {
            path: path.to_path_buf(),
            source,
        })?;
    if facts.modules.is_empty() {
        return Ok(Vec::new());
    }

    let owner_dir = path.parent().unwrap_or(project_root);
    let owner = owners::find_owner(owner_dir, project_root).map_err(|source| RunError::Access {
        path: path.to_path_buf(),
        source,
    })?;

    let mut reports = Vec::with_capacity(facts.modules.len());
    for declaration in facts.modules {
        let members = facts
            .members
            .get(&declaration.name)
            .cloned()
            .unwrap_or_default();
        let node = ModuleNode::new(declaration, members, &facts.file_imports, resolver, path);
        let unnecessary = node.check().map_err(|source| RunError::Resolution {
            path: path.to_path_buf(),
            source,
        })?;
        reports.push(
            ModuleReport::new(node.name(), path.display().to_string(), unnecessary)
                .with_owner(owner.clone()),
        );
    }
    debug!(path = %path.display(), modules = reports.len(), "checked file");
    Ok(reports)
}

/// Walks the target directory for candidate TypeScript module files.
fn discover_source_files(root: &Path) -> RunResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| !is_ignored_dir(e))
    {
        let entry = entry.map_err(|e| {
            let path = e
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| root.to_path_buf());
            RunError::Access {
                path,
                source: e.into_io_error().unwrap_or_else(|| {
                    io::Error::new(io::ErrorKind::Other, "directory walk failed")
                }),
            }
        })?;
        if entry.file_type().is_file() && is_candidate_file(entry.path()) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// `.ts` sources only; declaration files never declare modules.
fn is_candidate_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    name.ends_with(".ts") && !name.ends_with(".d.ts")
}

/// Check if a directory should be ignored during traversal.
fn is_ignored_dir(entry: &walkdir::DirEntry) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }

    let name = entry.file_name().to_string_lossy();
    matches!(
        name.as_ref(),
        "node_modules" | ".git" | "dist" | "build" | "coverage" | ".turbo"
    )
}
