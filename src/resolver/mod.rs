//! Specifier resolution for relative and tsconfig-aliased imports.
//!
//! The resolver maps an import specifier string, as written in a file, to
//! the canonical path of the file it denotes inside the analyzed tree.
//! Resolution mirrors the TypeScript compiler's search order: the literal
//! path first, then appended source extensions, then an `index` file inside
//! a matched directory. Bare package specifiers resolve to `None` — they
//! live outside the tree and are out of scope for the check.
//!
//! One resolver is built per run root from `<root>/tsconfig.json` and shared
//! read-only across all file tasks; resolved specifiers are cached in a
//! concurrent map keyed by (importing directory, specifier).

use std::io;
use std::path::{Path, PathBuf};

use dashmap::DashMap;
use thiserror::Error;
use tracing::debug;

use crate::parser::tsconfig;

/// Extensions probed, in order, after the literal path misses.
///
/// Appended to the specifier rather than substituted: `./user.module` has to
/// probe `user.module.ts`, not `user.ts`.
const SOURCE_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx"];

/// Errors constructing a resolver; fatal for the whole run, since nothing
/// can be resolved safely without the alias configuration.
#[derive(Debug, Error)]
pub enum ResolverConfigError {
    #[error("could not read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Unexpected failure during resolution, distinct from the normal `None`
/// ("external or unresolvable") outcome.
#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("I/O error probing {}: {source}", path.display())]
    Probe {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not canonicalize {}: {source}", path.display())]
    Canonicalize {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// One `paths` pattern, pre-split at its `*` wildcard.
#[derive(Debug, Clone)]
struct AliasRule {
    /// Pattern text up to the wildcard (the whole pattern if exact).
    prefix: String,
    /// Pattern text after the wildcard; empty for trailing-`*` patterns.
    suffix: String,
    /// False for exact patterns like `"@config"`.
    wildcard: bool,
    /// Candidate substitutions, tried in configured order.
    targets: Vec<String>,
}

impl AliasRule {
    fn parse(pattern: &str, targets: Vec<String>) -> Self {
        match pattern.split_once('*') {
            Some((prefix, suffix)) => Self {
                prefix: prefix.to_string(),
                suffix: suffix.to_string(),
                wildcard: true,
                targets,
            },
            None => Self {
                prefix: pattern.to_string(),
                suffix: String::new(),
                wildcard: false,
                targets,
            },
        }
    }

    /// Returns the text matched by `*` when this rule applies to the
    /// specifier, `Some("")` for an exact match.
    fn matched_star<'a>(&self, specifier: &'a str) -> Option<&'a str> {
        if !self.wildcard {
            return (specifier == self.prefix).then_some("");
        }
        let rest = specifier.strip_prefix(self.prefix.as_str())?;
        rest.strip_suffix(self.suffix.as_str())
    }
}

/// Resolves import specifiers against one project root.
///
/// Construction loads `<root>/tsconfig.json`; a missing or malformed config
/// aborts the run. All methods take `&self` and are safe for concurrent use.
pub struct TsPathResolver {
    base_dir: PathBuf,
    rules: Vec<AliasRule>,
    cache: DashMap<(PathBuf, String), Option<PathBuf>>,
}

impl TsPathResolver {
    /// Builds a resolver from the tsconfig.json at `root`.
    pub fn from_root(root: &Path) -> Result<Self, ResolverConfigError> {
        let root = std::fs::canonicalize(root).map_err(|source| ResolverConfigError::Read {
            path: root.to_path_buf(),
            source,
        })?;
        let config_path = root.join("tsconfig.json");
        let config = tsconfig::parse_file(&config_path).map_err(|e| match e {
            tsconfig::ParseError::IoError(source) => ResolverConfigError::Read {
                path: config_path.clone(),
                source,
            },
            tsconfig::ParseError::JsonError(source) => ResolverConfigError::Parse {
                path: config_path.clone(),
                source,
            },
        })?;

        let options = tsconfig::effective_options(&config);
        let base_dir = match &options.base_url {
            Some(base) => root.join(base),
            None => root.clone(),
        };

        let mut rules: Vec<AliasRule> = options
            .paths
            .unwrap_or_default()
            .into_iter()
            .map(|(pattern, targets)| AliasRule::parse(&pattern, targets))
            .collect();
        // Longest configured prefix wins; ties broken lexicographically so
        // rule order never depends on map iteration.
        rules.sort_by(|a, b| {
            b.prefix
                .len()
                .cmp(&a.prefix.len())
                .then_with(|| a.prefix.cmp(&b.prefix))
        });

        debug!(
            base_dir = %base_dir.display(),
            rules = rules.len(),
            "loaded path-alias configuration"
        );

        Ok(Self {
            base_dir,
            rules,
            cache: DashMap::new(),
        })
    }

    /// Resolves `specifier` as written in `from_file`.
    ///
    /// `Ok(None)` means external or unresolvable — a defined outcome the
    /// checker treats as "necessary by default", never an error.
    pub fn resolve(
        &self,
        specifier: &str,
        from_file: &Path,
    ) -> Result<Option<PathBuf>, ResolutionError> {
        let from_dir = from_file.parent().unwrap_or(Path::new("")).to_path_buf();
        let key = (from_dir, specifier.to_string());
        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit.value().clone());
        }
        let resolved = self.resolve_uncached(specifier, &key.0)?;
        self.cache.insert(key, resolved.clone());
        Ok(resolved)
    }

    fn resolve_uncached(
        &self,
        specifier: &str,
        from_dir: &Path,
    ) -> Result<Option<PathBuf>, ResolutionError> {
        if specifier.starts_with("./") || specifier.starts_with("../") {
            return probe_candidate(&from_dir.join(specifier));
        }

        // Most specific alias prefix wins; rules are pre-sorted.
        for rule in &self.rules {
            let Some(star) = rule.matched_star(specifier) else {
                continue;
            };
            for target in &rule.targets {
                let substituted = if rule.wildcard {
                    target.replacen('*', star, 1)
                } else {
                    target.clone()
                };
                if let Some(hit) = probe_candidate(&self.base_dir.join(substituted))? {
                    return Ok(Some(hit));
                }
            }
            return Ok(None);
        }

        // Bare package specifier: outside the analyzed tree.
        Ok(None)
    }
}

/// Standard module-resolution search: exact file, appended extensions,
/// directory index.
fn probe_candidate(candidate: &Path) -> Result<Option<PathBuf>, ResolutionError> {
    if is_file(candidate)? {
        return canonical(candidate).map(Some);
    }
    for ext in SOURCE_EXTENSIONS {
        let with_ext = append_extension(candidate, ext);
        if is_file(&with_ext)? {
            return canonical(&with_ext).map(Some);
        }
    }
    if is_dir(candidate)? {
        for ext in SOURCE_EXTENSIONS {
            let index = candidate.join(format!("index.{ext}"));
            if is_file(&index)? {
                return canonical(&index).map(Some);
            }
        }
    }
    Ok(None)
}

/// Appends `.ext` to the full path instead of replacing the part after the
/// last dot, which would mangle dotted names like `user.module`.
fn append_extension(path: &Path, ext: &str) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(".");
    os.push(ext);
    PathBuf::from(os)
}

fn is_file(path: &Path) -> Result<bool, ResolutionError> {
    stat(path).map(|m| m.is_some_and(|m| m.is_file()))
}

fn is_dir(path: &Path) -> Result<bool, ResolutionError> {
    stat(path).map(|m| m.is_some_and(|m| m.is_dir()))
}

fn stat(path: &Path) -> Result<Option<std::fs::Metadata>, ResolutionError> {
    match std::fs::metadata(path) {
        Ok(meta) => Ok(Some(meta)),
        Err(e) if matches!(
            e.kind(),
            io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
        ) =>
        {
            Ok(None)
        }
        Err(source) => Err(ResolutionError::Probe {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn canonical(path: &Path) -> Result<PathBuf, ResolutionError> {
    std::fs::canonicalize(path).map_err(|source| ResolutionError::Canonicalize {
        path: path.to_path_buf(),
        source,
    })
}
