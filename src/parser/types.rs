//! Shared types for configuration parsing.

use serde::Deserialize;
use std::collections::HashMap;

/// Represents the structure of a tsconfig.json file.
///
/// Mirrors the subset of the TypeScript compiler configuration the resolver
/// relies on.
///
/// # Example
///
/// ```
/// use nestscope::parser::types::TsConfig;
///
/// let json = r#"{"compilerOptions": {"baseUrl": "."}}"#;
/// let config: TsConfig = serde_json::from_str(json).unwrap();
/// assert!(config.compiler_options.is_some());
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TsConfig {
    /// The `compilerOptions` section, absent in minimal configs.
    #[serde(rename = "compilerOptions")]
    pub compiler_options: Option<CompilerOptions>,
}

/// The `compilerOptions` fields relevant to path-alias resolution.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct CompilerOptions {
    /// Base directory for non-relative specifiers; alias targets are
    /// resolved against it.
    #[serde(rename = "baseUrl")]
    pub base_url: Option<String>,

    /// Path-alias rules: specifier pattern -> candidate target patterns.
    pub paths: Option<HashMap<String, Vec<String>>>,
}

impl TsConfig {
    /// Returns true if the config declares any path-alias rules.
    pub fn has_alias_rules(&self) -> bool {
        self.compiler_options
            .as_ref()
            .and_then(|o| o.paths.as_ref())
            .is_some_and(|p| !p.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_has_no_rules() {
        let config = TsConfig::default();
        assert!(!config.has_alias_rules());
    }

    #[test]
    fn test_has_alias_rules() {
        let json = r#"{"compilerOptions": {"paths": {"@app/*": ["src/*"]}}}"#;
        let config: TsConfig = serde_json::from_str(json).unwrap();
        assert!(config.has_alias_rules());
    }

    #[test]
    fn test_empty_paths_is_no_rules() {
        let json = r#"{"compilerOptions": {"paths": {}}}"#;
        let config: TsConfig = serde_json::from_str(json).unwrap();
        assert!(!config.has_alias_rules());
    }
}
