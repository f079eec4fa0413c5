//! C family extractor: functions, structs, unions, enums, typedefs, and
//! top-level variable declarations, via `tree-sitter-c`.

use tree_sitter::{Parser, Query, QueryCursor, StreamingIterator};

use super::{sort_and_dedup_defs, DefRecord, FamilyExtractor, TokenOccurrence};
use crate::error::{ElixirError, ElixirResult};
use crate::family::Family;

const DEF_QUERY: &str = r#"
(function_definition
  declarator: (function_declarator
    declarator: (identifier) @name)) @def.function

(struct_specifier
  name: (type_identifier) @name
  body: (field_declaration_list)) @def.struct

(union_specifier
  name: (type_identifier) @name
  body: (field_declaration_list)) @def.union

(enum_specifier
  name: (type_identifier) @name
  body: (enumerator_list)) @def.enum

(type_definition
  declarator: (type_identifier) @name) @def.typedef

(declaration
  declarator: (init_declarator
    declarator: (identifier) @name)) @def.variable

(declaration
  declarator: (identifier) @name) @def.variable.bare
"#;

const IDENT_QUERY: &str = "(identifier) @ident (type_identifier) @ident";

/// True if `name_node` (an `identifier` declarator) sits directly under a
/// `declaration` carrying an `extern` storage-class specifier — a forward
/// reference to an existing definition, not a new one.
fn has_extern_storage_class(name_node: tree_sitter::Node, source: &[u8]) -> bool {
    let Some(declaration) = name_node.parent() else {
        return false;
    };
    let mut cursor = declaration.walk();
    declaration
        .children(&mut cursor)
        .any(|child| child.kind() == "storage_class_specifier" && child.utf8_text(source) == Ok("extern"))
}

pub struct CExtractor;

impl CExtractor {
    pub fn new() -> Self {
        Self
    }

    fn parser(&self) -> ElixirResult<Parser> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_c::LANGUAGE.into())
            .map_err(|e| ElixirError::Other(format!("failed to load C grammar: {e}")))?;
        Ok(parser)
    }
}

impl FamilyExtractor for CExtractor {
    fn family(&self) -> Family {
        Family::C
    }

    fn extract_defs(&self, source: &str) -> ElixirResult<Vec<DefRecord>> {
        let mut parser = self.parser()?;
        let tree = parser
            .parse(source, None)
            .ok_or_else(|| ElixirError::Other("C parser produced no tree".to_string()))?;

        let query = Query::new(&tree_sitter_c::LANGUAGE.into(), DEF_QUERY)
            .map_err(|e| ElixirError::Other(format!("invalid definition query: {e}")))?;

        let name_idx = query.capture_index_for_name("name").expect("query defines @name");
        let capture_names = query.capture_names();

        let mut cursor = QueryCursor::new();
        let mut defs = Vec::new();
        let mut matches = cursor.matches(&query, tree.root_node(), source.as_bytes());
        while let Some(m) = matches.next() {
            let def_capture_name = m
                .captures
                .iter()
                .map(|c| capture_names[c.index as usize])
                .find(|name| name.starts_with("def."))
                .expect("every pattern carries a def.* capture");
            let is_bare_declaration = def_capture_name == "def.variable.bare";
            let kind = def_capture_name
                .strip_prefix("def.")
                .unwrap_or(def_capture_name)
                .trim_end_matches(".bare")
                .to_string();
            for capture in m.captures.iter().filter(|c| c.index == name_idx) {
                if is_bare_declaration && has_extern_storage_class(capture.node, source.as_bytes()) {
                    // `extern int x;` merely forward-declares an existing
                    // definition; it must not mint a second one.
                    continue;
                }
                if let Ok(text) = capture.node.utf8_text(source.as_bytes()) {
                    defs.push(DefRecord {
                        name: text.to_string(),
                        kind: kind.clone().into(),
                        line: capture.node.start_position().row as u32 + 1,
                    });
                }
            }
        }
        Ok(sort_and_dedup_defs(defs))
    }

    fn tokenize(&self, source: &str) -> ElixirResult<Vec<TokenOccurrence>> {
        let mut parser = self.parser()?;
        let tree = parser
            .parse(source, None)
            .ok_or_else(|| ElixirError::Other("C parser produced no tree".to_string()))?;

        let query = Query::new(&tree_sitter_c::LANGUAGE.into(), IDENT_QUERY)
            .map_err(|e| ElixirError::Other(format!("invalid identifier query: {e}")))?;

        let mut cursor = QueryCursor::new();
        let mut tokens = Vec::new();
        let mut matches = cursor.matches(&query, tree.root_node(), source.as_bytes());
        while let Some(m) = matches.next() {
            for capture in m.captures {
                if let Ok(text) = capture.node.utf8_text(source.as_bytes()) {
                    tokens.push(TokenOccurrence {
                        name: text.to_string(),
                        line: capture.node.start_position().row as u32 + 1,
                    });
                }
            }
        }
        Ok(tokens)
    }
}
