//! Mode Registry
//!
//! Execution modes and the fixed policy table that drives formatting,
//! minification, and debug-tool exposure. The table is built at compile time
//! and never mutated.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SyncError;

// ═══════════════════════════════════════════════════════════════════════════════
// MODES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mode {
    Dev,
    Stats,
    UTest,
    FTest,
    JsTest,
    AutoJsTest,
    JsTestDebug,
    AutoJsTestDebug,
    PTest,
    Cadence,
    ProdDebug,
    #[default]
    Prod,
    Selenium,
    SeleniumDebug,
}

/// Sub-mode handed to the client-asset generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GeneratorMode {
    Development,
    Stats,
    Production,
    ProductionDebug,
    Testing,
    TestingDebug,
    AutoTesting,
    AutoTestingDebug,
    PTest,
}

/// Immutable policy record for one mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModePolicy {
    pub is_test_mode: bool,
    pub is_dev_mode: bool,
    /// Inverse of "should minify".
    pub pretty_print: bool,
    pub allow_local_rendering: bool,
    pub generator: GeneratorMode,
}

const fn policy(
    is_test_mode: bool,
    is_dev_mode: bool,
    pretty_print: bool,
    generator: GeneratorMode,
    allow_local_rendering: bool,
) -> ModePolicy {
    ModePolicy {
        is_test_mode,
        is_dev_mode,
        pretty_print,
        allow_local_rendering,
        generator,
    }
}

// Indexed by `Mode as usize`; order must follow the enum declaration.
static POLICIES: [ModePolicy; 14] = [
    policy(false, true, true, GeneratorMode::Development, true),
    policy(true, false, true, GeneratorMode::Stats, true),
    policy(true, false, true, GeneratorMode::Production, true),
    policy(true, false, true, GeneratorMode::Testing, true),
    policy(true, false, false, GeneratorMode::Testing, false),
    policy(true, false, false, GeneratorMode::AutoTesting, false),
    policy(true, false, true, GeneratorMode::TestingDebug, false),
    policy(true, false, true, GeneratorMode::AutoTestingDebug, false),
    policy(false, false, false, GeneratorMode::PTest, true),
    policy(false, false, false, GeneratorMode::PTest, true),
    policy(false, false, false, GeneratorMode::ProductionDebug, true),
    policy(false, false, false, GeneratorMode::Production, true),
    policy(true, false, true, GeneratorMode::AutoTesting, true),
    policy(true, false, true, GeneratorMode::AutoTestingDebug, true),
];

impl Mode {
    pub const ALL: [Mode; 14] = [
        Mode::Dev,
        Mode::Stats,
        Mode::UTest,
        Mode::FTest,
        Mode::JsTest,
        Mode::AutoJsTest,
        Mode::JsTestDebug,
        Mode::AutoJsTestDebug,
        Mode::PTest,
        Mode::Cadence,
        Mode::ProdDebug,
        Mode::Prod,
        Mode::Selenium,
        Mode::SeleniumDebug,
    ];

    pub fn policy(self) -> &'static ModePolicy {
        &POLICIES[self as usize]
    }

    pub fn is_test_mode(self) -> bool {
        self.policy().is_test_mode
    }

    pub fn is_dev_mode(self) -> bool {
        self.policy().is_dev_mode
    }

    pub fn pretty_print(self) -> bool {
        self.policy().pretty_print
    }

    pub fn allow_local_rendering(self) -> bool {
        self.policy().allow_local_rendering
    }

    pub fn generator_mode(self) -> GeneratorMode {
        self.policy().generator
    }

    pub fn name(self) -> &'static str {
        match self {
            Mode::Dev => "DEV",
            Mode::Stats => "STATS",
            Mode::UTest => "UTEST",
            Mode::FTest => "FTEST",
            Mode::JsTest => "JSTEST",
            Mode::AutoJsTest => "AUTOJSTEST",
            Mode::JsTestDebug => "JSTESTDEBUG",
            Mode::AutoJsTestDebug => "AUTOJSTESTDEBUG",
            Mode::PTest => "PTEST",
            Mode::Cadence => "CADENCE",
            Mode::ProdDebug => "PRODDEBUG",
            Mode::Prod => "PROD",
            Mode::Selenium => "SELENIUM",
            Mode::SeleniumDebug => "SELENIUMDEBUG",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Mode {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Mode::ALL
            .iter()
            .copied()
            .find(|m| m.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| SyncError::UnknownMode(s.to_string()))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// REQUEST FORMAT / ACCESS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Format {
    Manifest,
    Css,
    Js,
    #[default]
    Json,
    Html,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Access {
    #[default]
    Public,
    Authenticated,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_follows_declaration_order() {
        // Spot-check a row from each region of the table.
        assert!(Mode::Dev.is_dev_mode());
        assert_eq!(Mode::Dev.generator_mode(), GeneratorMode::Development);
        assert!(!Mode::JsTest.pretty_print());
        assert!(!Mode::JsTest.allow_local_rendering());
        assert_eq!(Mode::Cadence.generator_mode(), GeneratorMode::PTest);
        assert_eq!(Mode::SeleniumDebug.generator_mode(), GeneratorMode::AutoTestingDebug);
    }

    #[test]
    fn test_only_dev_is_dev_mode() {
        for mode in Mode::ALL {
            assert_eq!(mode.is_dev_mode(), mode == Mode::Dev, "{mode}");
        }
    }

    #[test]
    fn test_production_modes_minify() {
        for mode in [Mode::Prod, Mode::ProdDebug, Mode::PTest, Mode::Cadence] {
            assert!(!mode.pretty_print(), "{mode} should minify");
            assert!(!mode.is_test_mode());
        }
    }

    #[test]
    fn test_every_mode_round_trips_through_its_name() {
        for mode in Mode::ALL {
            assert_eq!(mode.name().parse::<Mode>().unwrap(), mode);
            assert_eq!(mode.name().to_lowercase().parse::<Mode>().unwrap(), mode);
            let json = serde_json::to_string(&mode).unwrap();
            assert_eq!(json, format!("\"{}\"", mode.name()));
        }
    }

    #[test]
    fn test_unknown_mode_is_rejected() {
        assert!(matches!(
            "TURBO".parse::<Mode>(),
            Err(SyncError::UnknownMode(m)) if m == "TURBO"
        ));
    }
}
