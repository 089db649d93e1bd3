//! Lowering configuration, loadable from TOML.

use serde::{Deserialize, Serialize};

/// Knobs for [`crate::Lowerer`].
///
/// ```toml
/// max_depth = 1024
/// fold_constant_arrays = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LowerOptions {
    /// Deepest expression nesting the lowerer will descend into.
    pub max_depth: usize,
    /// Lower an array initializer whose elements are all constants to a single
    /// `ConstArray` instead of a block of element stores.
    pub fold_constant_arrays: bool,
}

impl Default for LowerOptions {
    fn default() -> Self {
        Self {
            max_depth: 512,
            fold_constant_arrays: false,
        }
    }
}

impl LowerOptions {
    /// Parse options from a TOML document; absent keys keep their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }
}
