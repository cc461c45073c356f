//! Module fact extraction and the necessity check.
//!
//! This module is the analytical core: declarative tree-sitter queries pull
//! structured facts out of a parsed TypeScript file (module declarations,
//! their decorator arrays, the file's import statements), and a
//! [`ModuleNode`] decides per module which declared imports nothing in the
//! module's own file actually consumes.
//!
//! # Example
//!
//! ```ignore
//! use nestscope::analysis::{ModuleQueries, ModuleNode};
//!
//! let queries = ModuleQueries::new()?;
//! let facts = queries.extract(&tree, &source)?;
//!
//! for declaration in facts.modules {
//!     let members = facts.members.get(&declaration.name).cloned().unwrap_or_default();
//!     let node = ModuleNode::new(declaration, members, &facts.file_imports, &resolver, &path);
//!     println!("{}: {:?}", node.name(), node.check()?);
//! }
//! ```

pub mod module_node;
pub mod queries;
pub mod types;

// Re-export main types for convenience
pub use module_node::ModuleNode;
pub use queries::{ExtractionError, ExtractionResult, ModuleQueries};
pub use types::{FileFacts, FileImportNode, ModuleDeclaration};
