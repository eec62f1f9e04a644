//! `vellum-patch` — apply wire-format patches to a JSON document.
//!
//! Usage:
//!   vellum-patch '<wire-patch-json>'
//!
//! The document is read from stdin; `null` or empty input means the document
//! does not exist yet. The argument is a single wire patch object or an
//! array of them.

use std::io::{self, Read, Write};

use serde_json::Value;
use vellum::patch::{apply_all, Origin};
use vellum::wire::{from_wire, WirePatch};

fn run(document: &str, patch: &str) -> Result<String, String> {
    let doc: Option<Value> = if document.is_empty() || document == "null" {
        None
    } else {
        Some(serde_json::from_str(document).map_err(|e| e.to_string())?)
    };

    let patch_value: Value = serde_json::from_str(patch).map_err(|e| e.to_string())?;
    let raw_batches = match patch_value {
        Value::Array(items) => items,
        other => vec![other],
    };
    let batches = raw_batches
        .iter()
        .map(WirePatch::from_value)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| e.to_string())?;

    let patches = from_wire(Origin::Remote, &batches).map_err(|e| e.to_string())?;
    let next = apply_all(doc, &patches).map_err(|e| e.to_string())?;
    match next {
        Some(value) => serde_json::to_string(&value).map_err(|e| e.to_string()),
        None => Ok("null".to_string()),
    }
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let patch = match args.get(1) {
        Some(p) => p.clone(),
        None => {
            eprintln!("First argument must be a wire patch object or array.");
            std::process::exit(1);
        }
    };

    let mut buf = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut buf) {
        eprintln!("{e}");
        std::process::exit(1);
    }

    match run(buf.trim(), &patch) {
        Ok(result) => {
            io::stdout().write_all(result.as_bytes()).unwrap();
            io::stdout().write_all(b"\n").unwrap();
        }
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}
