//! Definition and Reference Extractors.
//!
//! Both extraction passes for a family are implemented by the same
//! [`FamilyExtractor`], since the lexical rule for "what counts as an
//! identifier token" (skip comments, strings, punctuation) is shared
//! between finding definitions and finding references.

mod c;
mod devicetree;
mod kconfig;
mod make;

use crate::error::ElixirResult;
use crate::family::Family;
use crate::types::DefKind;

/// One definition found while scanning a blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefRecord {
    pub name: String,
    pub kind: DefKind,
    pub line: u32,
}

/// One identifier token found while scanning a blob, independent of
/// whether it turns out to name a definition or a reference — that
/// distinction is made by the caller against the known-identifiers set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenOccurrence {
    pub name: String,
    pub line: u32,
}

/// Sort by `(ident, line)` and drop duplicates, per the extractor output
/// contract: a definition found twice by the same pass (e.g. a query
/// with overlapping patterns) must reach the coordinator only once.
pub(crate) fn sort_and_dedup_defs(mut defs: Vec<DefRecord>) -> Vec<DefRecord> {
    defs.sort_by(|a, b| a.name.cmp(&b.name).then(a.line.cmp(&b.line)));
    defs.dedup();
    defs
}

pub trait FamilyExtractor: Send + Sync {
    fn family(&self) -> Family;

    /// Scan a blob's decoded source text for definitions.
    fn extract_defs(&self, source: &str) -> ElixirResult<Vec<DefRecord>>;

    /// Scan a blob's decoded source text for every identifier-shaped
    /// token, with its line number. The coordinator filters this stream
    /// down to references during the second pass.
    fn tokenize(&self, source: &str) -> ElixirResult<Vec<TokenOccurrence>>;
}

/// Look up the extractor for a family. Families are a closed,
/// project-configurable set — this is the one place that set is
/// enumerated.
pub fn extractor_for(family: Family) -> Box<dyn FamilyExtractor> {
    match family {
        Family::C => Box::new(c::CExtractor::new()),
        Family::Kconfig => Box::new(kconfig::KconfigExtractor::new()),
        Family::DeviceTree => Box::new(devicetree::DeviceTreeExtractor::new()),
        Family::Make => Box::new(make::MakeExtractor::new()),
    }
}

/// Shared identifier grammar used by the regex-based lexers: a leading
/// letter or underscore, then letters, digits, or underscores. Matches
/// the conventional C-family identifier rule that Kconfig, Device Tree,
/// and Makefile symbol names also follow.
pub(crate) const IDENT_PATTERN: &str = r"[A-Za-z_][A-Za-z0-9_]*";
