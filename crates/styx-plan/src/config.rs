//! Compilation settings.

use serde::{Deserialize, Serialize};

/// How the probed variables are ordered for evaluation.
///
/// `DescendingCount` puts the variable with the largest aggregate candidate
/// volume first. `AscendingCount` is the selectivity-first alternative and is
/// never the default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableOrder {
    #[default]
    DescendingCount,
    AscendingCount,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileConfig {
    pub order: VariableOrder,
    /// Reject patterns with more distinct variables than this.
    pub max_variables: Option<usize>,
    /// Fail variables that have no single-unknown reference instead of
    /// leaving their value root unconstrained.
    pub require_value_root: bool,
}

impl CompileConfig {
    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
