//! Engine configuration.
//!
//! Every field has a default, so an empty TOML table (or no file at all)
//! yields the standard behavior:
//!
//! ```toml
//! rebuild = "on-change"
//! keywords = true
//! sandbox = true
//!
//! [limits]
//! max_walk_steps = 100000
//! max_shape_depth = 8
//! max_literal_depth = 32
//! max_prototype_depth = 32
//! ```

use serde::{Deserialize, Serialize};

/// When a [`crate::Session`] rebuilds its type store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RebuildPolicy {
    /// Rebuild whenever the source text or caret differs from the last
    /// analysis.
    #[default]
    OnChange,
    /// Rebuild only before the first analysis and after
    /// `invalidate_cache`; the host decides which edits are meaningful.
    OnInvalidate,
}

/// Bounds on work done for pathological inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisLimits {
    /// Nodes visited by one scope walk (nested function-shape walks
    /// included) before it stops and keeps what it has.
    pub max_walk_steps: usize,
    /// How deeply function-shape sub-analyses may nest, and how many
    /// levels of type indirection a lookup follows.
    pub max_shape_depth: usize,
    /// Nesting of object literals and `||`/`?:` alternatives followed
    /// when shaping one value.
    pub max_literal_depth: usize,
    /// Prototype links followed during sandbox lookups.
    pub max_prototype_depth: usize,
}

impl Default for AnalysisLimits {
    fn default() -> Self {
        AnalysisLimits {
            max_walk_steps: 100_000,
            max_shape_depth: 8,
            max_literal_depth: 32,
            max_prototype_depth: 32,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub rebuild: RebuildPolicy,
    /// Offer keyword candidates for single-segment identifiers.
    pub keywords: bool,
    /// Consult the sandbox object graph when one is attached.
    pub sandbox: bool,
    pub limits: AnalysisLimits,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            rebuild: RebuildPolicy::default(),
            keywords: true,
            sandbox: true,
            limits: AnalysisLimits::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_table_uses_defaults() {
        let config: EngineConfig = toml::from_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn partial_limits_keep_remaining_defaults() {
        let config: EngineConfig = toml::from_str(
            r#"
            rebuild = "on-invalidate"
            keywords = false

            [limits]
            max_walk_steps = 50
            "#,
        )
        .unwrap();
        assert_eq!(config.rebuild, RebuildPolicy::OnInvalidate);
        assert!(!config.keywords);
        assert!(config.sandbox);
        assert_eq!(config.limits.max_walk_steps, 50);
        assert_eq!(config.limits.max_shape_depth, 8);
        assert_eq!(config.limits.max_literal_depth, 32);
    }
}
