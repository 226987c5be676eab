//! Flat application options with layered precedence.
//!
//! Values are applied lowest-precedence first: compiled defaults, then the
//! host configuration object, then URL hash parameters. The last applied
//! wins, so the hash fragment always has the final say.

use overmark_model::defaults;
use std::collections::BTreeMap;

pub const OPT_USERNAME: &str = "username";
pub const OPT_GET_URL: &str = "getUrl";
pub const OPT_POST_URL: &str = "postUrl";
pub const OPT_DEFAULT_EDITOR_ACTIVE: &str = "defaultEditorActive";
pub const OPT_DEFAULT_SIDEBAR_OPEN: &str = "defaultSidebarOpen";

const HASH_KEYS: [&str; 5] =
    [OPT_USERNAME, OPT_GET_URL, OPT_POST_URL, OPT_DEFAULT_EDITOR_ACTIVE, OPT_DEFAULT_SIDEBAR_OPEN];

#[derive(Debug, Clone)]
pub struct AppOptions {
    values: BTreeMap<String, String>,
}

impl Default for AppOptions {
    fn default() -> Self {
        let mut values = BTreeMap::new();
        values.insert(OPT_USERNAME.to_owned(), defaults::UNKNOWN_USER.to_owned());
        values.insert(OPT_GET_URL.to_owned(), String::new());
        values.insert(OPT_POST_URL.to_owned(), String::new());
        values.insert(OPT_DEFAULT_EDITOR_ACTIVE.to_owned(), String::new());
        values.insert(OPT_DEFAULT_SIDEBAR_OPEN.to_owned(), "true".to_owned());
        Self { values }
    }
}

impl AppOptions {
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.values.insert(name.to_owned(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn username(&self) -> &str {
        self.get(OPT_USERNAME).unwrap_or(defaults::UNKNOWN_USER)
    }

    /// Remote read endpoint; empty means "no remote data".
    pub fn get_url(&self) -> Option<&str> {
        self.get(OPT_GET_URL).filter(|url| !url.is_empty())
    }

    pub fn post_url(&self) -> Option<&str> {
        self.get(OPT_POST_URL).filter(|url| !url.is_empty())
    }

    /// Name of the tool to activate at startup, if any.
    pub fn default_tool_name(&self) -> Option<&str> {
        self.get(OPT_DEFAULT_EDITOR_ACTIVE).filter(|name| !name.is_empty())
    }

    /// `false` hides the sidebar at startup; any other value opens it.
    pub fn sidebar_open(&self) -> bool {
        self.get(OPT_DEFAULT_SIDEBAR_OPEN) != Some("false")
    }

    /// Apply URL hash parameters on top of the current values. Absent keys
    /// are logged and left untouched.
    pub fn apply_hash_fragment(&mut self, fragment: &str) {
        self.apply_fragment_inner(fragment, true);
    }

    /// Re-apply a previously parsed fragment (after a config merge) without
    /// repeating the missing-key warnings.
    pub fn reapply_hash_fragment(&mut self, fragment: &str) {
        self.apply_fragment_inner(fragment, false);
    }

    fn apply_fragment_inner(&mut self, fragment: &str, warn_missing: bool) {
        let pairs: BTreeMap<String, String> = url::form_urlencoded::parse(fragment.as_bytes())
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();

        for key in HASH_KEYS {
            let Some(value) = pairs.get(key) else {
                if warn_missing {
                    log::warn!("hash parameter `{key}` is not set");
                }
                continue;
            };
            match key {
                // `true` activates the default selection tool; anything
                // else leaves the startup tool alone.
                OPT_DEFAULT_EDITOR_ACTIVE => {
                    if value == "true" {
                        self.set(key, defaults::SELECT_TOOL);
                    }
                }
                OPT_DEFAULT_SIDEBAR_OPEN => {
                    self.set(key, if value == "false" { "false" } else { "true" });
                }
                _ => self.set(key, value.clone()),
            }
        }
    }

    /// Extract and apply the hash fragment of a full location URL.
    /// Returns the fragment so it can be re-applied after config merges.
    pub fn apply_location(&mut self, location: &str) -> Option<String> {
        let parsed = match url::Url::parse(location) {
            Ok(parsed) => parsed,
            Err(error) => {
                log::warn!("unparseable location `{location}`: {error}");
                return None;
            }
        };
        let fragment = parsed.fragment()?.to_owned();
        self.apply_hash_fragment(&fragment);
        Some(fragment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_have_no_endpoints_and_an_open_sidebar() {
        let options = AppOptions::default();
        assert_eq!(options.username(), defaults::UNKNOWN_USER);
        assert_eq!(options.get_url(), None);
        assert_eq!(options.post_url(), None);
        assert_eq!(options.default_tool_name(), None);
        assert!(options.sidebar_open());
    }

    #[test]
    fn hash_fragment_overrides_defaults() {
        let mut options = AppOptions::default();
        options.apply_hash_fragment(
            "username=ada&getUrl=http%3A%2F%2Fh%2Fget&postUrl=http%3A%2F%2Fh%2Fpost",
        );
        assert_eq!(options.username(), "ada");
        assert_eq!(options.get_url(), Some("http://h/get"));
        assert_eq!(options.post_url(), Some("http://h/post"));
    }

    #[test]
    fn editor_active_flag_maps_to_the_select_tool() {
        let mut options = AppOptions::default();
        options.apply_hash_fragment("defaultEditorActive=true");
        assert_eq!(options.default_tool_name(), Some(defaults::SELECT_TOOL));

        let mut options = AppOptions::default();
        options.apply_hash_fragment("defaultEditorActive=nope");
        assert_eq!(options.default_tool_name(), None);
    }

    #[test]
    fn sidebar_flag_only_false_hides() {
        let mut options = AppOptions::default();
        options.apply_hash_fragment("defaultSidebarOpen=false");
        assert!(!options.sidebar_open());

        let mut options = AppOptions::default();
        options.apply_hash_fragment("defaultSidebarOpen=anything");
        assert!(options.sidebar_open());
    }

    #[test]
    fn location_parsing_extracts_the_fragment() {
        let mut options = AppOptions::default();
        let fragment =
            options.apply_location("https://viewer.example.com/web/viewer.html#username=grace");
        assert_eq!(fragment.as_deref(), Some("username=grace"));
        assert_eq!(options.username(), "grace");

        let mut options = AppOptions::default();
        assert_eq!(options.apply_location("not a url"), None);
        assert_eq!(options.apply_location("https://viewer.example.com/plain"), None);
    }
}
