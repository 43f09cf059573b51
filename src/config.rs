use serde::Deserialize;
use std::collections::HashMap;

use crate::descriptor::DefType;
use crate::error::SyncError;
use crate::mode::Mode;

/// Process-wide settings every request context starts from.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContextConfig {
    /// Mode used when the client context does not name one.
    pub default_mode: Mode,
    /// Namespaces seeded into every context's preload set.
    pub default_preloads: Vec<String>,
    /// Per-type overrides of the built-in default prefixes.
    pub default_prefixes: HashMap<DefType, String>,
    /// First value handed out by `SyncContext::next_id`.
    pub next_id_base: u32,
    pub debug_tool: bool,
    pub context_path: String,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            default_mode: Mode::Prod,
            default_preloads: vec!["aura".to_string(), "os".to_string()],
            default_prefixes: HashMap::new(),
            next_id_base: 1,
            debug_tool: false,
            context_path: String::new(),
        }
    }
}

impl ContextConfig {
    pub fn from_json_str(json: &str) -> Result<Self, SyncError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn default_prefix(&self, def_type: DefType) -> &str {
        self.default_prefixes
            .get(&def_type)
            .map(String::as_str)
            .unwrap_or_else(|| def_type.default_prefix())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_is_default() {
        let config = ContextConfig::from_json_str("{}").unwrap();
        assert_eq!(config.default_mode, Mode::Prod);
        assert_eq!(config.default_preloads, vec!["aura", "os"]);
        assert_eq!(config.next_id_base, 1);
        assert!(!config.debug_tool);
    }

    #[test]
    fn test_overrides() {
        let config = ContextConfig::from_json_str(
            r#"{
                "defaultMode": "DEV",
                "defaultPreloads": ["ui"],
                "defaultPrefixes": { "MODEL": "apex" },
                "nextIdBase": 100,
                "debugTool": true,
                "contextPath": "/app"
            }"#,
        )
        .unwrap();
        assert_eq!(config.default_mode, Mode::Dev);
        assert_eq!(config.default_prefix(DefType::Model), "apex");
        assert_eq!(config.default_prefix(DefType::Component), "markup");
        assert_eq!(config.next_id_base, 100);
        assert_eq!(config.context_path, "/app");
    }

    #[test]
    fn test_bad_mode_is_an_error() {
        assert!(matches!(
            ContextConfig::from_json_str(r#"{"defaultMode": "FAST"}"#),
            Err(SyncError::Json(_))
        ));
    }
}
