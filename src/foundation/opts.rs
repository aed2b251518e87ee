use serde::{Deserialize, Serialize};

use crate::observation::dispatch::ThreadExecutionMode;

/// Engine-wide configuration.
///
/// Every field has a default, so a config file only lists what it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineOpts {
    /// Default unary tokens consume a single primary expression instead of a postfix chain.
    pub unary_single_expression: bool,
    /// Method names path observers may subscribe to as change hooks.
    pub observable_methods: Vec<String>,
    /// Path observers created by [`watch`](crate::BindingEngine::watch) treat null
    /// intermediates as "no value".
    pub optional_by_default: bool,
    /// Path observers created by [`watch`](crate::BindingEngine::watch) hold their target weakly.
    pub weak_by_default: bool,
    /// Thread that listener notifications of dispatched registries are delivered on.
    pub dispatch_mode: ThreadExecutionMode,
    /// Maximum number of idle parser contexts kept for reuse.
    pub context_pool_size: usize,
}

impl Default for EngineOpts {
    fn default() -> Self {
        Self {
            unary_single_expression: false,
            observable_methods: vec!["GetErrors".to_string(), "HasErrors".to_string()],
            optional_by_default: false,
            weak_by_default: true,
            dispatch_mode: ThreadExecutionMode::Current,
            context_pool_size: 4,
        }
    }
}

impl EngineOpts {
    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    pub fn is_observable_method(&self, name: &str) -> bool {
        self.observable_methods.iter().any(|m| m == name)
    }
}
