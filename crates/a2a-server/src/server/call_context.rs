//! Caller identity and per-call server state.

use std::collections::HashMap;

/// The authenticated (or anonymous) caller of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub name: String,
    pub authenticated: bool,
}

impl User {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            authenticated: true,
        }
    }

    /// The default caller when no authentication layer is wired in.
    pub fn unauthenticated() -> Self {
        Self {
            name: "anonymous".to_string(),
            authenticated: false,
        }
    }
}

impl Default for User {
    fn default() -> Self {
        Self::unauthenticated()
    }
}

/// Per-call server context: caller identity plus transport-provided state.
///
/// Built fresh for each inbound call by the embedding transport; the
/// substrate only carries it through to the executor.
#[derive(Debug, Clone, Default)]
pub struct ServerCallContext {
    pub user: User,
    pub state: HashMap<String, serde_json::Value>,
    pub requested_extensions: Vec<String>,
}

impl ServerCallContext {
    pub fn new(user: User) -> Self {
        Self {
            user,
            state: HashMap::new(),
            requested_extensions: Vec::new(),
        }
    }
}
