//! Shared types for module fact extraction.
//!
//! These are the raw, purely syntactic facts pulled out of a single source
//! file. Nothing here touches the filesystem: import specifiers stay as
//! written until the decision logic asks the resolver for their targets.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;

use crate::resolver::{ResolutionError, TsPathResolver};

/// A single `@Module(...)` declaration found in a file.
///
/// `declared_imports` preserves the order the entries appear in the
/// decorator's `imports:` array so reports stay deterministic. Entries are
/// raw source text: identifiers for the common case, or the full text of a
/// dynamic entry (`ConfigModule.forRoot(...)`, a spread, ...) which acts as
/// an opaque marker the check cannot verify.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDeclaration {
    /// Identifier the module class is declared under.
    pub name: String,
    /// Raw `imports:` array entries, in declared order.
    pub declared_imports: Vec<String>,
}

impl ModuleDeclaration {
    /// Creates a declaration with no imports.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declared_imports: Vec::new(),
        }
    }
}

/// One file-level import statement.
///
/// `imported_names` are the local binding names the statement introduces
/// (the alias for `import { a as b }`, the namespace name for
/// `import * as ns`). A side-effect import (`import './polyfills'`) has no
/// bindings and can never make a declared module import necessary.
#[derive(Debug, Clone)]
pub struct FileImportNode {
    /// The literal specifier string, quotes stripped.
    pub specifier: String,
    /// Local binding names introduced by this statement, in source order.
    pub imported_names: Vec<String>,
    /// Lazily resolved target; `None` once resolved means the specifier is
    /// external or unresolvable, which is a terminal classification rather
    /// than an error.
    resolved: OnceCell<Option<PathBuf>>,
}

impl FileImportNode {
    /// Creates an import node for the given specifier with no bindings yet.
    pub fn new(specifier: impl Into<String>) -> Self {
        Self {
            specifier: specifier.into(),
            imported_names: Vec::new(),
            resolved: OnceCell::new(),
        }
    }

    /// Returns true if this statement introduces no bindings.
    pub fn is_side_effect_only(&self) -> bool {
        self.imported_names.is_empty()
    }

    /// Returns true if this statement binds `name` locally.
    pub fn binds(&self, name: &str) -> bool {
        self.imported_names.iter().any(|n| n == name)
    }

    /// Resolves this import's specifier relative to `from_file`, caching the
    /// outcome. Repeated calls are cheap and safe from concurrent readers.
    pub fn resolved_path(
        &self,
        resolver: &TsPathResolver,
        from_file: &Path,
    ) -> Result<Option<&Path>, ResolutionError> {
        self.resolved
            .get_or_try_init(|| resolver.resolve(&self.specifier, from_file))
            .map(|p| p.as_deref())
    }
}

/// Everything the query engine extracts from one file in a single pass.
#[derive(Debug, Clone, Default)]
pub struct FileFacts {
    /// Module declarations that carry at least one `imports:` entry, in
    /// declaration order.
    pub modules: Vec<ModuleDeclaration>,
    /// Union of `providers:` and `controllers:` member names per module.
    pub members: HashMap<String, HashSet<String>>,
    /// Every import statement in the file, in source order.
    pub file_imports: Vec<FileImportNode>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_effect_only() {
        let node = FileImportNode::new("./polyfills");
        assert!(node.is_side_effect_only());
        assert!(!node.binds("anything"));
    }

    #[test]
    fn test_binds() {
        let mut node = FileImportNode::new("./user.module");
        node.imported_names.push("UserModule".to_string());
        assert!(node.binds("UserModule"));
        assert!(!node.binds("OtherModule"));
        assert!(!node.is_side_effect_only());
    }

    #[test]
    fn test_module_declaration_new() {
        let decl = ModuleDeclaration::new("AppModule");
        assert_eq!(decl.name, "AppModule");
        assert!(decl.declared_imports.is_empty());
    }
}
