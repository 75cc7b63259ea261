//! Outbound identity provider
//!
//! Supplies User-Agent strings per device-class hint. A pluggable
//! generator can be registered once per process; its first successful
//! answer per hint is cached for the process lifetime. Generator failures
//! are not cached, and every path falls back to a hard-coded table, so
//! `user_agent()` never fails and never touches the network.

use once_cell::sync::{Lazy, OnceCell};
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::warn;

/// Device class a request should present as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceHint {
    Ios,
    Android,
    Windows,
}

impl DeviceHint {
    /// Parse a caller-supplied hint. Unrecognized values normalize to iOS.
    pub fn parse(hint: &str) -> Self {
        match hint.to_ascii_lowercase().as_str() {
            "android" => DeviceHint::Android,
            "windows" => DeviceHint::Windows,
            "ios" => DeviceHint::Ios,
            _ => DeviceHint::Ios,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceHint::Ios => "ios",
            DeviceHint::Android => "android",
            DeviceHint::Windows => "windows",
        }
    }

    fn fallback(&self) -> &'static str {
        match self {
            DeviceHint::Ios => {
                "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) \
                 AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1"
            }
            DeviceHint::Android => {
                "Mozilla/5.0 (Linux; Android 14; Pixel 7) \
                 AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Mobile Safari/537.36"
            }
            DeviceHint::Windows => {
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
                 AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
            }
        }
    }
}

/// Optional source of fresh/randomized User-Agent strings.
///
/// Returning `None` (or an empty string) makes the caller fall back to
/// the built-in table. Implementations must not block on the network.
pub trait UserAgentGenerator: Send + Sync {
    fn generate(&self, hint: DeviceHint) -> Option<String>;
}

static GENERATOR: OnceCell<Box<dyn UserAgentGenerator>> = OnceCell::new();

// First successful generator answer per hint, kept for the process
// lifetime. First-writer-wins on a populate race.
static CACHE: Lazy<RwLock<HashMap<DeviceHint, String>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Register a generator. Only the first registration takes effect.
pub fn set_generator(generator: Box<dyn UserAgentGenerator>) {
    if GENERATOR.set(generator).is_err() {
        warn!("user-agent generator already registered, ignoring");
    }
}

/// Return a User-Agent string for the given device hint.
pub fn user_agent(hint: &str) -> String {
    user_agent_for(DeviceHint::parse(hint))
}

/// Typed-hint variant of [`user_agent`].
pub fn user_agent_for(hint: DeviceHint) -> String {
    if let Ok(cache) = CACHE.read() {
        if let Some(ua) = cache.get(&hint) {
            return ua.clone();
        }
    }

    if let Some(generator) = GENERATOR.get() {
        match generator.generate(hint) {
            Some(ua) if !ua.is_empty() => {
                if let Ok(mut cache) = CACHE.write() {
                    cache.entry(hint).or_insert_with(|| ua.clone());
                }
                return ua;
            }
            _ => {
                // Not cached: the next call gets another shot at generating.
                warn!(hint = hint.as_str(), "user-agent generator failed, using fallback");
            }
        }
    }

    hint.fallback().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_hints_normalize_to_ios() {
        assert_eq!(DeviceHint::parse("ios"), DeviceHint::Ios);
        assert_eq!(DeviceHint::parse("Windows"), DeviceHint::Windows);
        assert_eq!(DeviceHint::parse("blackberry"), DeviceHint::Ios);
        assert_eq!(DeviceHint::parse(""), DeviceHint::Ios);
    }

    #[test]
    fn fallback_table_is_always_available() {
        let ua = user_agent("windows");
        assert!(ua.contains("Windows NT"));
        let ua = user_agent("nonsense");
        assert!(ua.contains("iPhone"));
    }

    #[test]
    fn android_fallback_is_mobile() {
        assert!(user_agent("android").contains("Android"));
    }
}
