//! # Lifecycle Configuration
//!
//! Per-provider settings passed to [`Lifecycle::new`](crate::Lifecycle::new).
//! The struct is serde-friendly so applications can embed it in their own config files;
//! missing fields fall back to the defaults.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Fail the provider with [`Teardown::NoRemainingUsers`](crate::Teardown::NoRemainingUsers)
    /// when its last usage handle is released.
    pub dispose_when_unused: bool,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            dispose_when_unused: true,
        }
    }
}

impl LifecycleConfig {
    pub fn dispose_when_unused(mut self, value: bool) -> Self {
        self.dispose_when_unused = value;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_disposing_when_unused() {
        assert!(LifecycleConfig::default().dispose_when_unused);
        assert!(!LifecycleConfig::default().dispose_when_unused(false).dispose_when_unused);
    }
}
