//! Device Tree family extractor: node labels as definitions, `&label`
//! phandle references, via a line-oriented regex lexer.

use std::sync::OnceLock;

use regex::Regex;

use super::{sort_and_dedup_defs, DefRecord, FamilyExtractor, TokenOccurrence, IDENT_PATTERN};
use crate::error::ElixirResult;
use crate::family::Family;

fn label_def_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(&format!(r"({IDENT_PATTERN})\s*:\s*[A-Za-z0-9_@,./+-]+\s*\{{")).unwrap())
}

fn phandle_ref_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(&format!(r"&({IDENT_PATTERN})")).unwrap())
}

pub struct DeviceTreeExtractor;

impl DeviceTreeExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl FamilyExtractor for DeviceTreeExtractor {
    fn family(&self) -> Family {
        Family::DeviceTree
    }

    fn extract_defs(&self, source: &str) -> ElixirResult<Vec<DefRecord>> {
        let mut defs = Vec::new();
        for (idx, line) in source.lines().enumerate() {
            if let Some(caps) = label_def_regex().captures(line) {
                defs.push(DefRecord {
                    name: caps[1].to_string(),
                    kind: "label".into(),
                    line: idx as u32 + 1,
                });
            }
        }
        Ok(sort_and_dedup_defs(defs))
    }

    fn tokenize(&self, source: &str) -> ElixirResult<Vec<TokenOccurrence>> {
        let mut tokens = Vec::new();
        for (idx, line) in source.lines().enumerate() {
            for caps in phandle_ref_regex().captures_iter(line) {
                tokens.push(TokenOccurrence {
                    name: caps[1].to_string(),
                    line: idx as u32 + 1,
                });
            }
        }
        Ok(tokens)
    }
}
