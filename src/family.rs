//! The closed, project-configurable set of language families this
//! cross-referencer understands lexically.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// A lexical family: the unit at which definition/reference extraction
/// rules are defined. Not a programming language in the semantic sense —
/// just "what lexer applies to this blob".
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Family {
    C,
    Kconfig,
    DeviceTree,
    Make,
}

impl Family {
    pub const ALL: [Family; 4] = [Family::C, Family::Kconfig, Family::DeviceTree, Family::Make];

    /// Short code matching the glossary (`C`, `K`, `D`, `M`).
    pub fn code(self) -> &'static str {
        match self {
            Family::C => "C",
            Family::Kconfig => "K",
            Family::DeviceTree => "D",
            Family::Make => "M",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Family::ALL.into_iter().find(|f| f.code().eq_ignore_ascii_case(code))
    }

    /// Classify a path into every family whose pattern matches it.
    ///
    /// Usually at most one match; a project can legitimately configure
    /// overlapping patterns (e.g. `*.h` under both C and a project-local
    /// family), in which case extraction runs once per match.
    pub fn classify_all(path: &Path) -> Vec<Family> {
        let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        let mut families = Vec::new();
        if matches!(ext, "c" | "h") {
            families.push(Family::C);
        }
        if file_name == "Kconfig" || file_name.starts_with("Kconfig.") {
            families.push(Family::Kconfig);
        }
        if matches!(ext, "dts" | "dtsi") {
            families.push(Family::DeviceTree);
        }
        if file_name == "Makefile" || file_name == "GNUmakefile" || ext == "mk" {
            families.push(Family::Make);
        }
        families
    }

    /// Single-family classification for callers that only care about the
    /// primary match (the common case — no project configures
    /// overlapping patterns).
    pub fn classify(path: &Path) -> Option<Family> {
        Family::classify_all(path).into_iter().next()
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
