//! Client configuration.
//!
//! Values come from the environment with logged defaults, mirroring how the
//! server binaries read their settings.

use std::path::PathBuf;
use std::time::Duration;

/// Storage key the identity is persisted under.
pub const SESSION_KEY: &str = "cardkey.session";

const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000";
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_APP_TITLE: &str = "Card Key Console";

/// Well-known navigation destinations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationPaths {
    pub login: String,
    pub forbidden: String,
    /// Default authenticated landing page.
    pub landing: String,
}

impl Default for NavigationPaths {
    fn default() -> Self {
        Self {
            login: "/login".to_string(),
            forbidden: "/forbidden".to_string(),
            landing: "/dashboard".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleConfig {
    /// Base URL every API path is joined to, without trailing slash.
    pub api_base_url: String,
    pub timeout: Duration,
    /// Directory holding the persisted session. `None` keeps the session in
    /// memory only.
    pub session_dir: Option<PathBuf>,
    /// Suffix of every page title.
    pub app_title: String,
    pub paths: NavigationPaths,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            session_dir: default_session_dir(),
            app_title: DEFAULT_APP_TITLE.to_string(),
            paths: NavigationPaths::default(),
        }
    }
}

impl ConsoleConfig {
    /// Read configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary variable lookup.
    ///
    /// Recognized keys: `CARDKEY_API_BASE_URL`, `CARDKEY_API_TIMEOUT_SECS`,
    /// `CARDKEY_SESSION_DIR` (empty string disables persistence),
    /// `CARDKEY_APP_TITLE`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        match lookup("CARDKEY_API_BASE_URL") {
            Some(url) if !url.trim().is_empty() => {
                config.api_base_url = url.trim().trim_end_matches('/').to_string();
            }
            _ => tracing::warn!(
                default = DEFAULT_API_BASE_URL,
                "CARDKEY_API_BASE_URL not set; using default"
            ),
        }

        if let Some(raw) = lookup("CARDKEY_API_TIMEOUT_SECS") {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.timeout = Duration::from_secs(secs),
                _ => tracing::warn!(
                    value = %raw,
                    default = DEFAULT_TIMEOUT_SECS,
                    "invalid CARDKEY_API_TIMEOUT_SECS; using default"
                ),
            }
        }

        if let Some(dir) = lookup("CARDKEY_SESSION_DIR") {
            config.session_dir = if dir.trim().is_empty() {
                None
            } else {
                Some(PathBuf::from(dir))
            };
        }

        if let Some(title) = lookup("CARDKEY_APP_TITLE") {
            if !title.trim().is_empty() {
                config.app_title = title;
            }
        }

        config
    }
}

fn default_session_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("cardkey-console"))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = ConsoleConfig::from_lookup(lookup(&[]));
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.paths.login, "/login");
        assert_eq!(config.paths.forbidden, "/forbidden");
        assert_eq!(config.paths.landing, "/dashboard");
    }

    #[test]
    fn values_are_read_and_normalized() {
        let config = ConsoleConfig::from_lookup(lookup(&[
            ("CARDKEY_API_BASE_URL", "https://api.example.com/v1/"),
            ("CARDKEY_API_TIMEOUT_SECS", "3"),
            ("CARDKEY_SESSION_DIR", "/tmp/cardkey"),
            ("CARDKEY_APP_TITLE", "Licenses"),
        ]));
        assert_eq!(config.api_base_url, "https://api.example.com/v1");
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.session_dir, Some(PathBuf::from("/tmp/cardkey")));
        assert_eq!(config.app_title, "Licenses");
    }

    #[test]
    fn invalid_timeout_keeps_default() {
        let config = ConsoleConfig::from_lookup(lookup(&[("CARDKEY_API_TIMEOUT_SECS", "soon")]));
        assert_eq!(config.timeout, Duration::from_secs(10));
    }

    #[test]
    fn empty_session_dir_disables_persistence() {
        let config = ConsoleConfig::from_lookup(lookup(&[("CARDKEY_SESSION_DIR", "")]));
        assert_eq!(config.session_dir, None);
    }
}
