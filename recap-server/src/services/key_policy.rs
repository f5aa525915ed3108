//! Server LLM key usage policy.
//!
//! When a request carries its own bearer key the policy is never
//! consulted; it only gates access to the server-configured key.

use std::collections::HashSet;
use std::sync::RwLock;

/// Who may use the server-configured LLM key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyMode {
    /// Every authenticated user.
    All,
    /// Only users on the designated list.
    Designated,
}

impl PolicyMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyMode::All => "all",
            PolicyMode::Designated => "designated",
        }
    }
}

struct PolicyState {
    mode: PolicyMode,
    designated: HashSet<String>,
}

/// Runtime-updatable key policy.
pub struct KeyPolicy {
    state: RwLock<PolicyState>,
}

impl KeyPolicy {
    pub fn new(mode: PolicyMode, designated: impl IntoIterator<Item = String>) -> Self {
        Self {
            state: RwLock::new(PolicyState {
                mode,
                designated: designated
                    .into_iter()
                    .map(|id| id.trim().to_string())
                    .filter(|id| !id.is_empty())
                    .collect(),
            }),
        }
    }

    /// True iff `user_id` may use the server key under the current policy.
    pub fn can_use_server_key(&self, user_id: &str) -> bool {
        let state = self.state.read().expect("key policy lock poisoned");
        match state.mode {
            PolicyMode::All => true,
            PolicyMode::Designated => state.designated.contains(user_id),
        }
    }

    pub fn mode(&self) -> PolicyMode {
        self.state.read().expect("key policy lock poisoned").mode
    }

    /// Replace the designated-user list.
    pub fn set_designated_users(&self, users: impl IntoIterator<Item = String>) {
        let mut state = self.state.write().expect("key policy lock poisoned");
        state.designated = users
            .into_iter()
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .collect();
    }
}
