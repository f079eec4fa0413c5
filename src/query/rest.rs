//! Serializable response shapes for the
//! `GET /ident/<project>/<name>?version=<tag>&family=<F>` contract. No
//! HTTP server lives in this crate — an outer web layer is expected to
//! serialize [`IdentQueryResponse`] directly with `serde_json`. The pinned
//! shape is `{definitions:[{path,line,type}], references:[{path,line,type}]}`,
//! with a reference's `line` carried as the comma-joined decimal string
//! already produced by the storage layer, verbatim.

use std::path::PathBuf;

use serde::Serialize;

use super::IdentQueryResult;
use crate::types::BlobNum;

#[derive(Debug, Serialize)]
pub struct DefEntry {
    pub path: String,
    pub line: u32,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Serialize)]
pub struct RefEntry {
    pub path: String,
    pub line: String,
    #[serde(rename = "type")]
    pub family: String,
}

#[derive(Debug, Serialize)]
pub struct IdentQueryResponse {
    pub identifier: String,
    pub definitions: Vec<DefEntry>,
    pub references: Vec<RefEntry>,
}

/// Render an [`IdentQueryResult`] into the REST contract shape, resolving
/// blob numbers back to the path they occupy in the queried tag's tree via
/// `path_for`. An entry whose blob has no resolvable path is dropped: it
/// cannot be addressed by the `{path,line,type}` contract.
pub fn render(result: &IdentQueryResult, path_for: impl Fn(BlobNum) -> Option<PathBuf>) -> IdentQueryResponse {
    let definitions = result
        .definitions
        .iter()
        .filter_map(|d| {
            Some(DefEntry {
                path: path_for(d.blob)?.display().to_string(),
                line: d.line,
                kind: d.kind.0.clone(),
            })
        })
        .collect();

    let references = result
        .references
        .iter()
        .filter_map(|r| {
            Some(RefEntry {
                path: path_for(r.blob)?.display().to_string(),
                line: r.lines.iter().map(|l| l.to_string()).collect::<Vec<_>>().join(","),
                family: r.family.code().to_string(),
            })
        })
        .collect();

    IdentQueryResponse {
        identifier: result.name.clone(),
        definitions,
        references,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::family::Family;
    use crate::storage::CrossRefDatabase;
    use crate::types::{BlobHash, DefKind, DefOccurrence, RefOccurrence};

    #[test]
    fn renders_definitions_with_resolved_paths() {
        let db = CrossRefDatabase::new();
        let (num, _) = db.blobs.intern(BlobHash::from_bytes([3; 20]));
        db.blobs.add_path(num, PathBuf::from("main.c"));
        db.append_def(
            "main",
            DefOccurrence {
                blob: num,
                line: 4,
                kind: DefKind::from("function"),
                family: Family::C,
            },
        );

        let result = IdentQueryResult {
            name: "main".to_string(),
            definitions: db.defs_for("main"),
            references: vec![],
        };

        let response = render(&result, |n| db.blobs.paths_for(n).into_iter().next());
        assert_eq!(response.definitions.len(), 1);
        assert_eq!(response.definitions[0].line, 4);
        assert_eq!(response.definitions[0].kind, "function");
        assert_eq!(response.definitions[0].path, "main.c");
    }

    #[test]
    fn renders_reference_lines_as_a_comma_joined_string() {
        let db = CrossRefDatabase::new();
        let (num, _) = db.blobs.intern(BlobHash::from_bytes([4; 20]));
        db.blobs.add_path(num, PathBuf::from("a.c"));

        let result = IdentQueryResult {
            name: "x".to_string(),
            definitions: vec![],
            references: vec![RefOccurrence {
                blob: num,
                family: Family::C,
                lines: vec![2, 5, 9],
            }],
        };

        let response = render(&result, |n| db.blobs.paths_for(n).into_iter().next());
        assert_eq!(response.references.len(), 1);
        assert_eq!(response.references[0].line, "2,5,9");
        assert_eq!(response.references[0].path, "a.c");
        assert_eq!(response.references[0].family, "C");
    }

    #[test]
    fn drops_entries_whose_blob_has_no_resolvable_path() {
        let db = CrossRefDatabase::new();
        let (num, _) = db.blobs.intern(BlobHash::from_bytes([5; 20]));
        // No path recorded for this blob.
        let result = IdentQueryResult {
            name: "orphan".to_string(),
            definitions: vec![DefOccurrence {
                blob: num,
                line: 1,
                kind: DefKind::from("variable"),
                family: Family::C,
            }],
            references: vec![],
        };

        let response = render(&result, |n| db.blobs.paths_for(n).into_iter().next());
        assert!(response.definitions.is_empty());
    }
}
