//! Makefile family extractor: targets and variable assignments as
//! definitions, `$(VAR)`/`${VAR}` expansions and bare prerequisite names
//! as references, via a line-oriented regex lexer.

use std::sync::OnceLock;

use regex::Regex;

use super::{sort_and_dedup_defs, DefRecord, FamilyExtractor, TokenOccurrence, IDENT_PATTERN};
use crate::error::ElixirResult;
use crate::family::Family;

fn target_def_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // `target: prereqs` or a bare `target:` but not `VAR := value`
    // (handled separately) and not a rule continuation line (starts
    // with a tab).
    RE.get_or_init(|| Regex::new(&format!(r"^({IDENT_PATTERN}(?:[./-]{IDENT_PATTERN})*)\s*:([^=]|$)")).unwrap())
}

fn var_def_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(&format!(r"^({IDENT_PATTERN})\s*[:+?]?=")).unwrap())
}

fn var_ref_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(&format!(r"\$[({{]({IDENT_PATTERN})[)}}]")).unwrap())
}

pub struct MakeExtractor;

impl MakeExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl FamilyExtractor for MakeExtractor {
    fn family(&self) -> Family {
        Family::Make
    }

    fn extract_defs(&self, source: &str) -> ElixirResult<Vec<DefRecord>> {
        let mut defs = Vec::new();
        for (idx, line) in source.lines().enumerate() {
            if line.starts_with('\t') {
                continue;
            }
            let line_number = idx as u32 + 1;
            if let Some(caps) = var_def_regex().captures(line) {
                defs.push(DefRecord {
                    name: caps[1].to_string(),
                    kind: "variable".into(),
                    line: line_number,
                });
            } else if let Some(caps) = target_def_regex().captures(line) {
                defs.push(DefRecord {
                    name: caps[1].to_string(),
                    kind: "target".into(),
                    line: line_number,
                });
            }
        }
        Ok(sort_and_dedup_defs(defs))
    }

    fn tokenize(&self, source: &str) -> ElixirResult<Vec<TokenOccurrence>> {
        let mut tokens = Vec::new();
        for (idx, line) in source.lines().enumerate() {
            for caps in var_ref_regex().captures_iter(line) {
                tokens.push(TokenOccurrence {
                    name: caps[1].to_string(),
                    line: idx as u32 + 1,
                });
            }
        }
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_variable_definition() {
        let extractor = MakeExtractor::new();
        let defs = extractor.extract_defs("CFLAGS := -O2\n").unwrap();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "CFLAGS");
        assert_eq!(defs[0].kind.0, "variable");
    }

    #[test]
    fn extracts_target_definition() {
        let extractor = MakeExtractor::new();
        let defs = extractor.extract_defs("all: main.o\n\t$(CC) -o all main.o\n").unwrap();
        assert!(defs.iter().any(|d| d.name == "all" && d.kind.0 == "target"));
    }

    #[test]
    fn extracts_bare_target_with_no_prerequisites() {
        let extractor = MakeExtractor::new();
        let defs = extractor.extract_defs("clean:\n\trm -rf build\n").unwrap();
        assert!(defs.iter().any(|d| d.name == "clean" && d.kind.0 == "target"));
    }

    #[test]
    fn tokenizes_variable_expansion() {
        let extractor = MakeExtractor::new();
        let tokens = extractor.tokenize("all:\n\t$(CC) $(CFLAGS) -o all main.c\n").unwrap();
        assert!(tokens.iter().any(|t| t.name == "CC"));
        assert!(tokens.iter().any(|t| t.name == "CFLAGS"));
    }
}
