//! Parser for TypeScript tsconfig.json files.
//!
//! Only the fields the specifier resolver cares about are modeled:
//! `compilerOptions.baseUrl` and `compilerOptions.paths`. Everything else in
//! the config is ignored.

use std::fs;
use std::path::Path;

use super::types::{CompilerOptions, TsConfig};

/// Errors that can occur during tsconfig.json parsing.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// Failed to read the file from disk.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse JSON content.
    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Result type alias for parser operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Parses a tsconfig.json file from a file path.
///
/// # Example
///
/// ```ignore
/// use std::path::Path;
/// use nestscope::parser::tsconfig::parse_file;
///
/// let config = parse_file(Path::new("tsconfig.json")).unwrap();
/// println!("baseUrl: {:?}", config.compiler_options.and_then(|o| o.base_url));
/// ```
pub fn parse_file(path: &Path) -> ParseResult<TsConfig> {
    let content = fs::read_to_string(path)?;
    parse_str(&content)
}

/// Parses a tsconfig.json from a string.
///
/// # Example
///
/// ```
/// use nestscope::parser::tsconfig::parse_str;
///
/// let json = r#"{"compilerOptions": {"baseUrl": "."}}"#;
/// let config = parse_str(json).unwrap();
/// assert_eq!(config.compiler_options.unwrap().base_url.unwrap(), ".");
/// ```
pub fn parse_str(content: &str) -> ParseResult<TsConfig> {
    let config: TsConfig = serde_json::from_str(content)?;
    Ok(config)
}

/// Returns the effective compiler options, defaulting when the section is
/// absent (a config without `compilerOptions` is valid and simply has no
/// alias rules).
pub fn effective_options(config: &TsConfig) -> CompilerOptions {
    config.compiler_options.clone().unwrap_or_default()
}
