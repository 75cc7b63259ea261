//! Platform selector

use crate::utils::error::ResolveError;

/// Closed set of supported platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    RedBook,
    DouYin,
    KuaiShou,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::RedBook, Platform::DouYin, Platform::KuaiShou];

    /// Canonical URL-safe slug.
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::RedBook => "redbook",
            Platform::DouYin => "douyin",
            Platform::KuaiShou => "kuaishou",
        }
    }

    /// Symbolic name, as it appears in caller-facing enums.
    pub fn name(&self) -> &'static str {
        match self {
            Platform::RedBook => "RedBook",
            Platform::DouYin => "DouYin",
            Platform::KuaiShou => "KuaiShou",
        }
    }

    /// Look a selector up by canonical slug first, then by symbolic name
    /// (case-insensitive). Callers supply either form.
    pub fn from_selector(selector: &str) -> Result<Self, ResolveError> {
        let trimmed = selector.trim();
        for platform in Self::ALL {
            if trimmed == platform.as_str() {
                return Ok(platform);
            }
        }
        for platform in Self::ALL {
            if trimmed.eq_ignore_ascii_case(platform.name()) {
                return Ok(platform);
            }
        }
        Err(ResolveError::UnknownPlatform(selector.to_string()))
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_slug() {
        assert_eq!(Platform::from_selector("redbook").unwrap(), Platform::RedBook);
        assert_eq!(Platform::from_selector("douyin").unwrap(), Platform::DouYin);
    }

    #[test]
    fn lookup_by_symbolic_name() {
        assert_eq!(Platform::from_selector("RedBook").unwrap(), Platform::RedBook);
        assert_eq!(Platform::from_selector("kuaiShou").unwrap(), Platform::KuaiShou);
    }

    #[test]
    fn unknown_selector_is_rejected() {
        let err = Platform::from_selector("myspace").unwrap_err();
        assert!(matches!(err, ResolveError::UnknownPlatform(_)));
    }
}
