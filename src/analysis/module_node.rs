//! The per-module necessity check.
//!
//! A declared import is *necessary* when the module's own file imports, by
//! name, at least one of this module's providers or controllers from the
//! file the declared import resolves to. Anything the resolver cannot pin
//! down — external packages, unresolvable aliases, dynamic decorator
//! entries — is treated as necessary by default: the check never flags what
//! it cannot verify.

use std::collections::HashSet;
use std::path::Path;

use crate::resolver::{ResolutionError, TsPathResolver};

use super::types::{FileImportNode, ModuleDeclaration};

/// Decision unit for one module declaration.
///
/// Owns the declaration and its member-name set, and borrows the containing
/// file's import statements plus the shared resolver. `check` is read-only
/// and idempotent; the node performs no writes beyond the import nodes'
/// internal resolution caches.
pub struct ModuleNode<'a> {
    declaration: ModuleDeclaration,
    members: HashSet<String>,
    file_imports: &'a [FileImportNode],
    resolver: &'a TsPathResolver,
    file_path: &'a Path,
}

impl<'a> ModuleNode<'a> {
    pub fn new(
        declaration: ModuleDeclaration,
        members: HashSet<String>,
        file_imports: &'a [FileImportNode],
        resolver: &'a TsPathResolver,
        file_path: &'a Path,
    ) -> Self {
        Self {
            declaration,
            members,
            file_imports,
            resolver,
            file_path,
        }
    }

    /// The module's declared name.
    pub fn name(&self) -> &str {
        &self.declaration.name
    }

    /// Returns the declared imports classified unnecessary, preserving their
    /// declared order.
    ///
    /// A module with no provider/controller facts short-circuits: nothing
    /// could consume its imports, so every declared import is unnecessary.
    pub fn check(&self) -> Result<Vec<String>, ResolutionError> {
        if self.members.is_empty() {
            return Ok(self.declaration.declared_imports.clone());
        }

        let mut unnecessary = Vec::new();
        for import_name in &self.declaration.declared_imports {
            let Some(target) = self.import_target(import_name)? else {
                // Unresolvable: necessary by default.
                continue;
            };
            if !self.member_imported_from(target)? {
                unnecessary.push(import_name.clone());
            }
        }
        Ok(unnecessary)
    }

    /// Resolves a declared import name to the file it is imported from, via
    /// the file import statement that binds it. `None` when no statement
    /// binds the name or its specifier is external/unresolvable.
    fn import_target(&self, name: &str) -> Result<Option<&Path>, ResolutionError> {
        for node in self.file_imports {
            if node.binds(name) {
                return node.resolved_path(self.resolver, self.file_path);
            }
        }
        Ok(None)
    }

    /// Returns true if any import statement resolving to `target` binds one
    /// of this module's member names.
    fn member_imported_from(&self, target: &Path) -> Result<bool, ResolutionError> {
        for node in self.file_imports {
            if node.is_side_effect_only() {
                continue;
            }
            let Some(resolved) = node.resolved_path(self.resolver, self.file_path)? else {
                continue;
            };
            if resolved == target && node.imported_names.iter().any(|n| self.members.contains(n)) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    /// Lays out a scratch project: a tsconfig.json plus the given files.
    fn project(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("tsconfig.json"), "{}").unwrap();
        for (name, contents) in files {
            let path = dir.path().join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(path, contents).unwrap();
        }
        dir
    }

    fn import(specifier: &str, names: &[&str]) -> FileImportNode {
        let mut node = FileImportNode::new(specifier);
        node.imported_names = names.iter().map(|n| n.to_string()).collect();
        node
    }

    fn declaration(name: &str, imports: &[&str]) -> ModuleDeclaration {
        ModuleDeclaration {
            name: name.to_string(),
            declared_imports: imports.iter().map(|i| i.to_string()).collect(),
        }
    }

    fn members(names: &[&str]) -> HashSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_no_members_flags_all_imports() {
        let dir = project(&[]);
        let resolver = TsPathResolver::from_root(dir.path()).unwrap();
        let file = dir.path().join("app.module.ts");
        let imports: Vec<FileImportNode> = Vec::new();

        let node = ModuleNode::new(
            declaration("AppModule", &["ModuleA", "ModuleB"]),
            HashSet::new(),
            &imports,
            &resolver,
            &file,
        );

        assert_eq!(node.check().unwrap(), vec!["ModuleA", "ModuleB"]);
    }

    #[test]
    fn test_unresolvable_import_is_necessary_by_default() {
        let dir = project(&[]);
        let resolver = TsPathResolver::from_root(dir.path()).unwrap();
        let file = dir.path().join("app.module.ts");
        // TypeOrmModule comes from a bare package specifier: never flagged,
        // whatever the provider set looks like.
        let imports = vec![import("@nestjs/typeorm", &["TypeOrmModule"])];

        let node = ModuleNode::new(
            declaration("AppModule", &["TypeOrmModule"]),
            members(&["AppService"]),
            &imports,
            &resolver,
            &file,
        );

        assert_eq!(node.check().unwrap(), Vec::<String>::new());
    }

    #[test]
    fn test_unbound_import_is_necessary_by_default() {
        let dir = project(&[]);
        let resolver = TsPathResolver::from_root(dir.path()).unwrap();
        let file = dir.path().join("app.module.ts");
        let imports: Vec<FileImportNode> = Vec::new();

        // Nothing in the file binds the declared name (e.g. an opaque
        // marker from a dynamic entry): cannot verify, so not flagged.
        let node = ModuleNode::new(
            declaration("AppModule", &["ConfigModule.forRoot()"]),
            members(&["AppService"]),
            &imports,
            &resolver,
            &file,
        );

        assert_eq!(node.check().unwrap(), Vec::<String>::new());
    }

    #[test]
    fn test_necessity_by_member_match() {
        let dir = project(&[("user.module.ts", "export class UserModule {}")]);
        let resolver = TsPathResolver::from_root(dir.path()).unwrap();
        let file = dir.path().join("app.module.ts");
        let imports = vec![import("./user.module", &["UserModule", "UserService"])];

        let node = ModuleNode::new(
            declaration("AppModule", &["UserModule"]),
            members(&["UserService"]),
            &imports,
            &resolver,
            &file,
        );

        assert_eq!(node.check().unwrap(), Vec::<String>::new());
    }

    #[test]
    fn test_member_from_different_file_does_not_satisfy() {
        let dir = project(&[
            ("user.module.ts", "export class UserModule {}"),
            ("user.service.ts", "export class UserService {}"),
        ]);
        let resolver = TsPathResolver::from_root(dir.path()).unwrap();
        let file = dir.path().join("app.module.ts");
        // The provider is imported, but from a file other than the one the
        // declared module import resolves to.
        let imports = vec![
            import("./user.module", &["UserModule"]),
            import("./user.service", &["UserService"]),
        ];

        let node = ModuleNode::new(
            declaration("AppModule", &["UserModule"]),
            members(&["UserService"]),
            &imports,
            &resolver,
            &file,
        );

        assert_eq!(node.check().unwrap(), vec!["UserModule"]);
    }

    #[test]
    fn test_side_effect_import_never_satisfies() {
        let dir = project(&[("user.module.ts", "export class UserModule {}")]);
        let resolver = TsPathResolver::from_root(dir.path()).unwrap();
        let file = dir.path().join("app.module.ts");
        let imports = vec![
            import("./user.module", &["UserModule"]),
            // Same target, but introduces no bindings.
            import("./user.module", &[]),
        ];

        let node = ModuleNode::new(
            declaration("AppModule", &["UserModule"]),
            members(&["UserService"]),
            &imports,
            &resolver,
            &file,
        );

        assert_eq!(node.check().unwrap(), vec!["UserModule"]);
    }

    #[test]
    fn test_order_preserved_among_unnecessary() {
        let dir = project(&[
            ("a.ts", "export class ModuleA {}"),
            ("b.ts", "export class ModuleB {}"),
            ("c.ts", "export class ModuleC {}"),
        ]);
        let resolver = TsPathResolver::from_root(dir.path()).unwrap();
        let file = dir.path().join("app.module.ts");
        let imports = vec![
            import("./a", &["ModuleA"]),
            import("./b", &["ModuleB", "SharedService"]),
            import("./c", &["ModuleC"]),
        ];

        let node = ModuleNode::new(
            declaration("AppModule", &["ModuleA", "ModuleB", "ModuleC"]),
            members(&["SharedService"]),
            &imports,
            &resolver,
            &file,
        );

        // ModuleB is satisfied; the rest keep their declared order.
        assert_eq!(node.check().unwrap(), vec!["ModuleA", "ModuleC"]);
    }

    #[test]
    fn test_check_is_idempotent() {
        let dir = project(&[("user.module.ts", "export class UserModule {}")]);
        let resolver = TsPathResolver::from_root(dir.path()).unwrap();
        let file = dir.path().join("app.module.ts");
        let imports = vec![import("./user.module", &["UserModule"])];

        let node = ModuleNode::new(
            declaration("AppModule", &["UserModule"]),
            members(&["UserService"]),
            &imports,
            &resolver,
            &file,
        );

        let first = node.check().unwrap();
        let second = node.check().unwrap();
        assert_eq!(first, second);
        assert_eq!(first, vec!["UserModule"]);
    }

    #[test]
    fn test_relative_target_comparison_uses_canonical_paths() {
        let dir = project(&[("shared/service.ts", "export class SharedService {}")]);
        let resolver = TsPathResolver::from_root(dir.path()).unwrap();
        let file = dir.path().join("feature/feature.module.ts");
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        // Two spellings of the same target file.
        let imports = vec![
            import("../shared/service", &["SharedModule"]),
            import("./../shared/service", &["SharedService"]),
        ];

        let node = ModuleNode::new(
            declaration("FeatureModule", &["SharedModule"]),
            members(&["SharedService"]),
            &imports,
            &resolver,
            &file,
        );

        assert_eq!(node.check().unwrap(), Vec::<String>::new());
    }

    #[test]
    fn test_report_paths_are_not_mutated() {
        // check() must not alter its inputs.
        let dir = project(&[]);
        let resolver = TsPathResolver::from_root(dir.path()).unwrap();
        let file: PathBuf = dir.path().join("app.module.ts");
        let imports: Vec<FileImportNode> = Vec::new();
        let decl = declaration("AppModule", &["ModuleA"]);

        let node = ModuleNode::new(decl, HashSet::new(), &imports, &resolver, &file);
        node.check().unwrap();
        assert_eq!(node.name(), "AppModule");
    }
}
