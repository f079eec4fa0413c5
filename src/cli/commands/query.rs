//! Query command - read-only lookups against an indexed tag.

use std::path::PathBuf;

use comfy_table::{presets::UTF8_FULL, Table};

use crate::cli::args::QueryCommand;
use crate::family::Family;
use crate::query::{rest, QueryInterface};
use crate::storage::CrossRefDatabase;
use crate::types::TagName;

pub fn run(tag: String, what: QueryCommand, db: &CrossRefDatabase) {
    let query = QueryInterface::new(db);
    let tag = TagName::from(tag);

    match what {
        QueryCommand::File { path } => run_file(&query, &tag, &path, db),
        QueryCommand::Ident { name, family, json } => run_ident(&query, &tag, &name, family, json, db),
        QueryCommand::Complete { prefix } => run_complete(&query, &prefix),
    }
}

fn run_file(query: &QueryInterface<'_>, tag: &TagName, path: &PathBuf, db: &CrossRefDatabase) {
    let Some(result) = query.file(tag, path) else {
        eprintln!("No definitions found for '{}' under tag '{tag}'", path.display());
        std::process::exit(1);
    };

    let Some(hash) = db.blobs.hash_for(result.blob) else {
        eprintln!("Internal error: blob {} has no recorded hash", result.blob);
        std::process::exit(1);
    };

    println!("{}  (blob {hash})", path.display());
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec!["line", "name", "kind"]);
    for (name, def) in &result.definitions {
        table.add_row(vec![def.line.to_string(), name.clone(), def.kind.to_string()]);
    }
    println!("{table}");
}

fn run_ident(query: &QueryInterface<'_>, tag: &TagName, name: &str, family: Option<String>, json: bool, db: &CrossRefDatabase) {
    let family = match family {
        Some(code) => match Family::from_code(&code) {
            Some(family) => Some(family),
            None => {
                eprintln!("Unknown family '{code}'; expected one of C, K, D, M");
                std::process::exit(1);
            }
        },
        None => None,
    };

    let Some(result) = query.ident(tag, name, family) else {
        eprintln!("Tag '{tag}' is not indexed");
        std::process::exit(1);
    };

    if json {
        let response = rest::render(&result, |n| db.blobs.paths_for(n).into_iter().next());
        match serde_json::to_string_pretty(&response) {
            Ok(text) => println!("{text}"),
            Err(e) => {
                eprintln!("Error serializing response: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    println!("Definitions of '{name}':");
    let mut defs_table = Table::new();
    defs_table.load_preset(UTF8_FULL).set_header(vec!["blob", "line", "kind", "family"]);
    for def in &result.definitions {
        let hash = db.blobs.hash_for(def.blob).map(|h| h.to_string()).unwrap_or_default();
        defs_table.add_row(vec![hash, def.line.to_string(), def.kind.to_string(), def.family.to_string()]);
    }
    println!("{defs_table}");

    println!("References of '{name}':");
    let mut refs_table = Table::new();
    refs_table.load_preset(UTF8_FULL).set_header(vec!["blob", "family", "lines"]);
    for occurrence in &result.references {
        let hash = db.blobs.hash_for(occurrence.blob).map(|h| h.to_string()).unwrap_or_default();
        let lines = occurrence.lines.iter().map(|l| l.to_string()).collect::<Vec<_>>().join(", ");
        refs_table.add_row(vec![hash, occurrence.family.to_string(), lines]);
    }
    println!("{refs_table}");
}

fn run_complete(query: &QueryInterface<'_>, prefix: &str) {
    for ident in query.complete(prefix) {
        println!("{ident}");
    }
}
