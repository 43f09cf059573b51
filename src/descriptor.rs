//! Descriptors
//!
//! Immutable identifiers for definitions. A descriptor is a type tag plus a
//! qualified name `prefix://namespace:name` (markup types) or
//! `prefix://namespace.name` (everything else). On the wire a descriptor is
//! keyed as `DEFTYPE@qualified`, e.g. `COMPONENT@markup://ui:button`.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::SyncError;

lazy_static! {
    // A dotted namespace splits on the last `.`, so `org.example.TestModel`
    // has namespace `org.example`.
    static ref QUALIFIED_NAME: Regex =
        Regex::new(r"^(?:([A-Za-z]+)://)?(?:([\w$-]+):|([\w$.-]+)\.)?([\w$-]+)$").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DefType {
    Application,
    Component,
    Interface,
    Event,
    Controller,
    Helper,
    Renderer,
    Provider,
    Model,
    Library,
    Style,
}

impl DefType {
    pub const ALL: [DefType; 11] = [
        DefType::Application,
        DefType::Component,
        DefType::Interface,
        DefType::Event,
        DefType::Controller,
        DefType::Helper,
        DefType::Renderer,
        DefType::Provider,
        DefType::Model,
        DefType::Library,
        DefType::Style,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DefType::Application => "APPLICATION",
            DefType::Component => "COMPONENT",
            DefType::Interface => "INTERFACE",
            DefType::Event => "EVENT",
            DefType::Controller => "CONTROLLER",
            DefType::Helper => "HELPER",
            DefType::Renderer => "RENDERER",
            DefType::Provider => "PROVIDER",
            DefType::Model => "MODEL",
            DefType::Library => "LIBRARY",
            DefType::Style => "STYLE",
        }
    }

    /// Built-in prefix for names that carry none.
    pub fn default_prefix(self) -> &'static str {
        match self {
            DefType::Application
            | DefType::Component
            | DefType::Interface
            | DefType::Event
            | DefType::Library => "markup",
            DefType::Controller | DefType::Helper | DefType::Renderer | DefType::Provider => "js",
            DefType::Model => "java",
            DefType::Style => "css",
        }
    }

    fn is_markup(self) -> bool {
        matches!(
            self,
            DefType::Application
                | DefType::Component
                | DefType::Interface
                | DefType::Event
                | DefType::Library
        )
    }
}

impl fmt::Display for DefType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DefType {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DefType::ALL
            .iter()
            .copied()
            .find(|t| t.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| SyncError::InvalidDescriptor(format!("unknown definition type '{}'", s)))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DESCRIPTOR
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Descriptor {
    def_type: DefType,
    prefix: String,
    namespace: String,
    name: String,
}

impl Descriptor {
    pub fn new(def_type: DefType, prefix: &str, namespace: &str, name: &str) -> Self {
        Self {
            def_type,
            prefix: prefix.to_string(),
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }

    /// Parse a qualified name, filling a missing prefix from the type's
    /// built-in default. The namespace is required.
    pub fn parse(qualified: &str, def_type: DefType) -> Result<Self, SyncError> {
        Self::parse_with(qualified, def_type, def_type.default_prefix(), None)
    }

    /// Parse a qualified name with explicit fallbacks for the prefix and the
    /// namespace.
    pub fn parse_with(
        qualified: &str,
        def_type: DefType,
        default_prefix: &str,
        default_namespace: Option<&str>,
    ) -> Result<Self, SyncError> {
        let caps = QUALIFIED_NAME
            .captures(qualified.trim())
            .ok_or_else(|| SyncError::InvalidDescriptor(qualified.to_string()))?;

        let prefix = caps.get(1).map_or(default_prefix, |m| m.as_str());
        let namespace = caps
            .get(2)
            .or_else(|| caps.get(3))
            .map(|m| m.as_str())
            .or(default_namespace)
            .ok_or_else(|| {
                SyncError::InvalidDescriptor(format!("{} (no namespace)", qualified))
            })?;

        Ok(Self::new(def_type, prefix, namespace, &caps[4]))
    }

    /// Parse a wire key of the form `DEFTYPE@qualified`.
    pub fn from_key(key: &str) -> Result<Self, SyncError> {
        let (def_type, qualified) = key
            .split_once('@')
            .ok_or_else(|| SyncError::InvalidDescriptor(key.to_string()))?;
        Self::parse(qualified, def_type.parse()?)
    }

    /// Qualified name without its prefix, e.g. `ui:button`.
    pub fn descriptor_name(&self) -> String {
        let sep = if self.def_type.is_markup() { ':' } else { '.' };
        format!("{}{}{}", self.namespace, sep, self.name)
    }

    pub fn to_key(&self) -> String {
        format!("{}@{}", self.def_type, self)
    }

    pub fn def_type(&self) -> DefType {
        self.def_type
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.prefix, self.descriptor_name())
    }
}

impl Serialize for Descriptor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_key())
    }
}

impl<'de> Deserialize<'de> for Descriptor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let key = String::deserialize(deserializer)?;
        Descriptor::from_key(&key).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_markup_name() {
        let d = Descriptor::parse("markup://ui:button", DefType::Component).unwrap();
        assert_eq!(d.prefix(), "markup");
        assert_eq!(d.namespace(), "ui");
        assert_eq!(d.name(), "button");
        assert_eq!(d.to_string(), "markup://ui:button");
        assert_eq!(d.descriptor_name(), "ui:button");
    }

    #[test]
    fn test_parse_fills_default_prefix() {
        let d = Descriptor::parse("ui.buttonController", DefType::Controller).unwrap();
        assert_eq!(d.to_string(), "js://ui.buttonController");
    }

    #[test]
    fn test_parse_requires_namespace_without_fallback() {
        assert!(Descriptor::parse("button", DefType::Component).is_err());
        let d = Descriptor::parse_with("button", DefType::Component, "markup", Some("ui")).unwrap();
        assert_eq!(d, Descriptor::new(DefType::Component, "markup", "ui", "button"));
    }

    #[test]
    fn test_equality_includes_type() {
        let a = Descriptor::parse("markup://ui:thing", DefType::Component).unwrap();
        let b = Descriptor::parse("markup://ui:thing", DefType::Event).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_wire_key() {
        let d = Descriptor::parse("markup://aura:test", DefType::Application).unwrap();
        assert_eq!(d.to_key(), "APPLICATION@markup://aura:test");
        assert_eq!(Descriptor::from_key(&d.to_key()).unwrap(), d);
        assert!(Descriptor::from_key("markup://aura:test").is_err());
        assert!(Descriptor::from_key("WIDGET@markup://aura:test").is_err());
    }

    #[test]
    fn test_dotted_namespace_round_trips() {
        let d = Descriptor::new(DefType::Model, "java", "org.auraframework.impl", "TestModel");
        assert_eq!(d.to_key(), "MODEL@java://org.auraframework.impl.TestModel");

        let back = Descriptor::from_key(&d.to_key()).unwrap();
        assert_eq!(back.namespace(), "org.auraframework.impl");
        assert_eq!(back.name(), "TestModel");
        assert_eq!(back, d);

        assert!(Descriptor::parse("java://org..", DefType::Model).is_err());
        assert!(Descriptor::parse("markup://ui:a.b", DefType::Component).is_err());
    }
}
