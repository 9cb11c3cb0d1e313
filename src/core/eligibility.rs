//! Decides whether a visit gets reported.
use crate::ports::config_store::Settings;

/// Internal route prefixes of the host platform that are never reported.
pub const DEFAULT_SYSTEM_PREFIXES: &[&str] = &[
    "/wp-admin",
    "/wp-login",
    "/wp-cron",
    "/wp-json",
    "/wp-includes",
    "/wp-content",
];

/// Why a visit was not reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ineligible {
    /// Reporting is switched off.
    Disabled,
    /// No access token is stored.
    MissingToken,
    /// Path or method could not be extracted.
    IncompleteRequest,
    /// The path belongs to an administrative, asset or internal-API route.
    SystemPath,
}

impl std::fmt::Display for Ineligible {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            Ineligible::Disabled => "reporting disabled",
            Ineligible::MissingToken => "no access token",
            Ineligible::IncompleteRequest => "incomplete request",
            Ineligible::SystemPath => "system path",
        };
        f.write_str(reason)
    }
}

#[derive(Debug, Clone)]
pub struct EligibilityFilter {
    /// Lowercased prefixes, matched against the lowercased path.
    system_prefixes: Vec<String>,
}

impl Default for EligibilityFilter {
    fn default() -> Self {
        Self::new(std::iter::empty::<String>())
    }
}

impl EligibilityFilter {
    /// Build a filter from the default system prefixes plus `extra_prefixes`.
    pub fn new<I, S>(extra_prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let system_prefixes = DEFAULT_SYSTEM_PREFIXES
            .iter()
            .map(|p| p.to_ascii_lowercase())
            .chain(
                extra_prefixes
                    .into_iter()
                    .map(|p| p.as_ref().to_ascii_lowercase()),
            )
            .filter(|p| !p.is_empty())
            .collect();
        Self { system_prefixes }
    }

    pub fn is_system_path(&self, path: &str) -> bool {
        let path = path.to_ascii_lowercase();
        self.system_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }

    /// Check every rule, returning the first one that fails.
    ///
    /// On success the checked path and method are handed back.
    pub fn evaluate<'a>(
        &self,
        settings: &Settings,
        path: Option<&'a str>,
        method: Option<&'a str>,
    ) -> Result<(&'a str, &'a str), Ineligible> {
        if !settings.enabled {
            return Err(Ineligible::Disabled);
        }
        if settings.access_token.is_empty() {
            return Err(Ineligible::MissingToken);
        }
        let (Some(path), Some(method)) = (path, method) else {
            return Err(Ineligible::IncompleteRequest);
        };
        if self.is_system_path(path) {
            return Err(Ineligible::SystemPath);
        }
        Ok((path, method))
    }

    pub fn is_eligible(&self, settings: &Settings, path: Option<&str>, method: Option<&str>) -> bool {
        self.evaluate(settings, path, method).is_ok()
    }
}
