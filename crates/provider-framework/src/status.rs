//! Status trees for presenting provider state to people.
//!
//! This is a debugging aid, not something code should branch on. Use
//! [`Lifecycle::state`](crate::Lifecycle::state) for that.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderStatus {
    pub name: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ProviderStatus>,
}

impl ProviderStatus {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            children: Vec::new(),
        }
    }

    pub fn with_child(mut self, child: ProviderStatus) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = ProviderStatus>) -> Self {
        self.children.extend(children);
        self
    }
}
