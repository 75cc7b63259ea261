//! Resolver configuration

use serde::{Deserialize, Serialize};

/// Operator-supplied settings, read once and injected at construction.
///
/// Resolvers never read the environment themselves; the binary (or test)
/// decides where these values come from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Session cookie sent with RedBook page fetches. Some notes only
    /// expose their detail record to authenticated sessions.
    pub redbook_cookie: Option<String>,
}

impl ResolverConfig {
    /// Build from process environment variables.
    pub fn from_env() -> Self {
        Self {
            redbook_cookie: std::env::var("REDBOOK_COOKIE")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
        }
    }
}
