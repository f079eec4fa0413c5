//! Kconfig family extractor: `config`/`menuconfig` symbol definitions and
//! `CONFIG_*`/bare-symbol references, via a line-oriented regex lexer —
//! there is no mainstream tree-sitter grammar for Kconfig.

use std::sync::OnceLock;

use regex::Regex;

use super::{sort_and_dedup_defs, DefRecord, FamilyExtractor, TokenOccurrence, IDENT_PATTERN};
use crate::error::ElixirResult;
use crate::family::Family;

fn def_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(&format!(r"^\s*(config|menuconfig)\s+({IDENT_PATTERN})")).unwrap())
}

fn ident_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(IDENT_PATTERN).unwrap())
}

fn comment_start(line: &str) -> usize {
    line.find('#').unwrap_or(line.len())
}

pub struct KconfigExtractor;

impl KconfigExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl FamilyExtractor for KconfigExtractor {
    fn family(&self) -> Family {
        Family::Kconfig
    }

    fn extract_defs(&self, source: &str) -> ElixirResult<Vec<DefRecord>> {
        let mut defs = Vec::new();
        for (idx, line) in source.lines().enumerate() {
            let code = &line[..comment_start(line)];
            if let Some(caps) = def_regex().captures(code) {
                defs.push(DefRecord {
                    name: caps[2].to_string(),
                    kind: caps[1].to_string().into(),
                    line: idx as u32 + 1,
                });
            }
        }
        Ok(sort_and_dedup_defs(defs))
    }

    fn tokenize(&self, source: &str) -> ElixirResult<Vec<TokenOccurrence>> {
        let mut tokens = Vec::new();
        for (idx, line) in source.lines().enumerate() {
            let code = &line[..comment_start(line)];
            for m in ident_regex().find_iter(code) {
                let name = m.as_str();
                // `CONFIG_FOO` in a `depends on`/`select`/`default` line
                // references symbol `FOO`, the conventional Kconfig
                // prefix stripped so it resolves against `config FOO`.
                let name = name.strip_prefix("CONFIG_").unwrap_or(name);
                tokens.push(TokenOccurrence {
                    name: name.to_string(),
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
    fn extracts_config_definition() {
        let extractor = KconfigExtractor::new();
        let defs = extractor
            .extract_defs("config FOO\n\tbool \"Enable foo\"\n\tdefault y\n")
            .unwrap();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "FOO");
        assert_eq!(defs[0].kind.0, "config");
    }

    #[test]
    fn strips_config_prefix_from_references() {
        let extractor = KconfigExtractor::new();
        let tokens = extractor.tokenize("config BAR\n\tdepends on CONFIG_FOO\n").unwrap();
        assert!(tokens.iter().any(|t| t.name == "FOO"));
    }

    #[test]
    fn ignores_comment_text() {
        let extractor = KconfigExtractor::new();
        let defs = extractor.extract_defs("# config FOO is not real\nconfig BAR\n").unwrap();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "BAR");
    }
}
