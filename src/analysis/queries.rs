//! Declarative syntax-tree queries for NestJS module facts.
//!
//! All extraction is done with tree-sitter query patterns compiled once per
//! run against the TypeScript grammar. Three query programs cover the facts
//! the checker needs: the `imports:` array of every `@Module` decorator, the
//! union of its `providers:`/`controllers:` arrays, and the file's import
//! statements. Captures are looked up by name at compile time, so a grammar
//! upgrade that renames a node or field surfaces as an [`ExtractionError`]
//! instead of silently matching nothing.

use std::collections::{HashMap, HashSet};

use streaming_iterator::StreamingIterator;
use thiserror::Error;
use tree_sitter::{Language, Node, Query, QueryCursor, Tree};

use super::types::{FileFacts, FileImportNode, ModuleDeclaration};

/// Errors raised while compiling or running the fact-extraction queries.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// A query did not compile against the loaded grammar version.
    #[error("query does not match the loaded TypeScript grammar: {0}")]
    QueryCompile(#[from] tree_sitter::QueryError),

    /// A capture name this engine relies on is missing from its query.
    #[error("query is missing the '{0}' capture")]
    MissingCapture(&'static str),

    /// The parser rejected the grammar (version mismatch).
    #[error("grammar version mismatch: {0}")]
    Language(#[from] tree_sitter::LanguageError),

    /// Two module declarations in one file share a name.
    #[error("duplicate module declaration '{0}' in the same file")]
    DuplicateModule(String),

    /// A captured node's byte range was not valid UTF-8.
    #[error("source text is not valid UTF-8: {0}")]
    SourceText(#[from] std::str::Utf8Error),
}

/// Result type for extraction operations.
pub type ExtractionResult<T> = Result<T, ExtractionError>;

/// `@Module({ imports: [...] })` entries, one match per array element.
///
/// The decorator sits on the `export_statement` for `@Module() export class`
/// and on the `class_declaration` itself when the class is not exported, so
/// both shapes are alternated. Array elements are matched with a wildcard:
/// identifiers give the module name, anything else (spread, `X.forRoot()`)
/// is carried as its raw text so the checker can surface it as unverifiable.
const MODULE_IMPORTS_QUERY: &str = r#"
([
  (export_statement
    decorator: (decorator
      (call_expression
        function: (identifier) @decorator.name
        arguments: (arguments
          (object
            (pair
              key: (property_identifier) @decorator.key
              value: (array (_) @module.entry))))))
    declaration: (class_declaration
      name: (type_identifier) @module.name))
  (class_declaration
    decorator: (decorator
      (call_expression
        function: (identifier) @decorator.name
        arguments: (arguments
          (object
            (pair
              key: (property_identifier) @decorator.key
              value: (array (_) @module.entry))))))
    name: (type_identifier) @module.name)
 ]
 (#eq? @decorator.name "Module")
 (#eq? @decorator.key "imports"))
"#;

/// Same shape as [`MODULE_IMPORTS_QUERY`] over `providers:`/`controllers:`.
const MODULE_MEMBERS_QUERY: &str = r#"
([
  (export_statement
    decorator: (decorator
      (call_expression
        function: (identifier) @decorator.name
        arguments: (arguments
          (object
            (pair
              key: (property_identifier) @decorator.key
              value: (array (_) @module.entry))))))
    declaration: (class_declaration
      name: (type_identifier) @module.name))
  (class_declaration
    decorator: (decorator
      (call_expression
        function: (identifier) @decorator.name
        arguments: (arguments
          (object
            (pair
              key: (property_identifier) @decorator.key
              value: (array (_) @module.entry))))))
    name: (type_identifier) @module.name)
 ]
 (#eq? @decorator.name "Module")
 (#any-of? @decorator.key "providers" "controllers"))
"#;

/// File-level import statements.
///
/// The first pattern records every statement and its specifier, including
/// side-effect imports that bind nothing. The remaining patterns yield one
/// match per local binding: default imports, named specifiers (the alias
/// wins over the exported name when present), and namespace imports.
/// Matches are grouped by statement node afterwards.
const FILE_IMPORTS_QUERY: &str = r#"
(import_statement
  source: (string (string_fragment) @import.source)) @import.statement

(import_statement
  (import_clause (identifier) @import.binding)) @import.statement

(import_statement
  (import_clause
    (named_imports
      (import_specifier
        !alias
        name: (identifier) @import.binding)))) @import.statement

(import_statement
  (import_clause
    (named_imports
      (import_specifier
        alias: (identifier) @import.binding)))) @import.statement

(import_statement
  (import_clause
    (namespace_import (identifier) @import.binding))) @import.statement
"#;

/// Capture indices for the two decorator-array queries.
struct DecoratorCaptures {
    module_name: u32,
    entry: u32,
}

/// Capture indices for the file-imports query.
struct ImportCaptures {
    statement: u32,
    source: u32,
    binding: u32,
}

/// Compiled query programs, built once per run and shared read-only across
/// all file tasks.
pub struct ModuleQueries {
    language: Language,
    module_imports: Query,
    module_members: Query,
    file_imports: Query,
    import_captures: DecoratorCaptures,
    member_captures: DecoratorCaptures,
    file_import_captures: ImportCaptures,
}

fn capture_index(query: &Query, name: &'static str) -> ExtractionResult<u32> {
    query
        .capture_index_for_name(name)
        .ok_or(ExtractionError::MissingCapture(name))
}

impl ModuleQueries {
    /// Compiles the query programs against the TypeScript grammar.
    pub fn new() -> ExtractionResult<Self> {
        let language: Language = tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into();

        let module_imports = Query::new(&language, MODULE_IMPORTS_QUERY)?;
        let module_members = Query::new(&language, MODULE_MEMBERS_QUERY)?;
        let file_imports = Query::new(&language, FILE_IMPORTS_QUERY)?;

        let import_captures = DecoratorCaptures {
            module_name: capture_index(&module_imports, "module.name")?,
            entry: capture_index(&module_imports, "module.entry")?,
        };
        let member_captures = DecoratorCaptures {
            module_name: capture_index(&module_members, "module.name")?,
            entry: capture_index(&module_members, "module.entry")?,
        };
        let file_import_captures = ImportCaptures {
            statement: capture_index(&file_imports, "import.statement")?,
            source: capture_index(&file_imports, "import.source")?,
            binding: capture_index(&file_imports, "import.binding")?,
        };

        Ok(Self {
            language,
            module_imports,
            module_members,
            file_imports,
            import_captures,
            member_captures,
            file_import_captures,
        })
    }

    /// The grammar the queries were compiled for; parsers must use the same.
    pub fn language(&self) -> &Language {
        &self.language
    }

    /// Extracts all module facts from one parsed file.
    pub fn extract(&self, tree: &Tree, source: &[u8]) -> ExtractionResult<FileFacts> {
        let root = tree.root_node();
        let modules = self.extract_module_imports(root, source)?;
        let members = self.extract_module_members(root, source)?;
        let file_imports = self.extract_file_imports(root, source)?;
        Ok(FileFacts {
            modules,
            members,
            file_imports,
        })
    }

    /// Builds the module -> declared imports mapping, in declaration order.
    fn extract_module_imports(
        &self,
        root: Node,
        source: &[u8],
    ) -> ExtractionResult<Vec<ModuleDeclaration>> {
        let mut declarations: Vec<ModuleDeclaration> = Vec::new();
        let mut index_by_name: HashMap<String, usize> = HashMap::new();
        let mut seen = DeclarationTracker::default();

        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&self.module_imports, root, source);
        while let Some(m) = matches.next() {
            let Some(pair) =
                decorator_pair(m.captures, &self.import_captures, source)?
            else {
                continue;
            };
            seen.observe(pair.module, pair.module_node_id)?;

            let index = match index_by_name.get(pair.module) {
                Some(&i) => i,
                None => {
                    declarations.push(ModuleDeclaration::new(pair.module));
                    index_by_name.insert(pair.module.to_string(), declarations.len() - 1);
                    declarations.len() - 1
                }
            };
            declarations[index]
                .declared_imports
                .push(pair.entry.to_string());
        }

        Ok(declarations)
    }

    /// Builds the module -> provider/controller member-name union.
    fn extract_module_members(
        &self,
        root: Node,
        source: &[u8],
    ) -> ExtractionResult<HashMap<String, HashSet<String>>> {
        let mut members: HashMap<String, HashSet<String>> = HashMap::new();
        let mut seen = DeclarationTracker::default();

        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&self.module_members, root, source);
        while let Some(m) = matches.next() {
            let Some(pair) =
                decorator_pair(m.captures, &self.member_captures, source)?
            else {
                continue;
            };
            seen.observe(pair.module, pair.module_node_id)?;
            members
                .entry(pair.module.to_string())
                .or_default()
                .insert(pair.entry.to_string());
        }

        Ok(members)
    }

    /// Collects the file's import statements, grouping binding matches by
    /// their statement node so each statement yields exactly one
    /// [`FileImportNode`].
    fn extract_file_imports(
        &self,
        root: Node,
        source: &[u8],
    ) -> ExtractionResult<Vec<FileImportNode>> {
        let caps = &self.file_import_captures;
        // Statement node id -> position in `nodes`, insertion-ordered.
        let mut order: HashMap<usize, usize> = HashMap::new();
        let mut nodes: Vec<FileImportNode> = Vec::new();

        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&self.file_imports, root, source);
        while let Some(m) = matches.next() {
            let mut statement: Option<Node> = None;
            let mut specifier: Option<&str> = None;
            let mut binding: Option<&str> = None;
            for capture in m.captures {
                if capture.index == caps.statement {
                    statement = Some(capture.node);
                } else if capture.index == caps.source {
                    specifier = Some(capture.node.utf8_text(source)?);
                } else if capture.index == caps.binding {
                    binding = Some(capture.node.utf8_text(source)?);
                }
            }
            let Some(statement) = statement else { continue };

            let index = match order.get(&statement.id()) {
                Some(&i) => i,
                None => {
                    nodes.push(FileImportNode::new(""));
                    order.insert(statement.id(), nodes.len() - 1);
                    nodes.len() - 1
                }
            };
            if let Some(specifier) = specifier {
                nodes[index].specifier = specifier.to_string();
            }
            if let Some(binding) = binding {
                nodes[index].imported_names.push(binding.to_string());
            }
        }

        Ok(nodes)
    }
}

/// One (module name, array entry) pair pulled out of a decorator match.
struct DecoratorPair<'a> {
    module: &'a str,
    module_node_id: usize,
    entry: &'a str,
}

/// Reads the captures of one decorator-array match, applying the node-kind
/// filter: comment nodes inside the array are not entries.
fn decorator_pair<'a>(
    captures: &[tree_sitter::QueryCapture<'_>],
    indices: &DecoratorCaptures,
    source: &'a [u8],
) -> ExtractionResult<Option<DecoratorPair<'a>>> {
    let mut module: Option<(&str, usize)> = None;
    let mut entry: Option<&str> = None;
    for capture in captures {
        if capture.index == indices.module_name {
            module = Some((capture.node.utf8_text(source)?, capture.node.id()));
        } else if capture.index == indices.entry && capture.node.kind() != "comment" {
            entry = Some(capture.node.utf8_text(source)?);
        }
    }
    Ok(match (module, entry) {
        (Some((module, module_node_id)), Some(entry)) => Some(DecoratorPair {
            module,
            module_node_id,
            entry,
        }),
        _ => None,
    })
}

/// Tracks which syntax node each module name was first declared by, failing
/// fast when a second declaration reuses the name.
#[derive(Default)]
struct DeclarationTracker {
    by_name: HashMap<String, usize>,
}

impl DeclarationTracker {
    fn observe(&mut self, name: &str, node_id: usize) -> ExtractionResult<()> {
        match self.by_name.get(name) {
            Some(&seen) if seen != node_id => {
                Err(ExtractionError::DuplicateModule(name.to_string()))
            }
            Some(_) => Ok(()),
            None => {
                self.by_name.insert(name.to_string(), node_id);
                Ok(())
            }
        }
    }
}
