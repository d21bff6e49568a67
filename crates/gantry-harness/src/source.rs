// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2026 Pegasus Heavy Industries, LLC

//! Line scanner for the miniature source format.
//!
//! Harness sources are scanned line by line; each non-empty, non-comment
//! line must be one of:
//!
//! - `import "specifier"`: an import request, optionally
//!   `import "specifier" with "attribute"` to attach an attributes value
//! - `export name = <literal>`: an export binding assigned at evaluation
//! - `throw <literal>`: evaluation fails with the literal's text
//! - a bare literal: becomes the completion value (last one wins)
//!
//! Literals are numbers, double-quoted strings, `true`, `false`, `null`,
//! and `undefined`. Anything else is a syntax error; import and export
//! lines are syntax errors in flat scripts.

use crate::value::Value;
use gantry_modules::{EngineError, EngineResult};
use regex::Regex;

/// Whether a source is compiled as a flat script or as a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SourceKind {
    Script,
    Module,
}

/// One import request scanned out of a module source.
#[derive(Debug, Clone)]
pub(crate) struct ImportRequest {
    pub specifier: String,
    pub attributes: Value,
}

/// A scanned source, ready to instantiate and evaluate.
#[derive(Debug, Clone)]
pub(crate) struct CompiledSource {
    pub requests: Vec<ImportRequest>,
    pub bindings: Vec<(String, Value)>,
    pub throws: Option<String>,
    pub completion: Value,
}

pub(crate) fn compile(
    kind: SourceKind,
    source: &str,
    line_offset: i32,
) -> EngineResult<CompiledSource> {
    let import_re = Regex::new(r#"^import\s+"([^"]+)"(?:\s+with\s+"([^"]+)")?$"#).unwrap();
    let export_re = Regex::new(r"^export\s+([A-Za-z_][A-Za-z0-9_]*)\s*=\s*(.+)$").unwrap();
    let throw_re = Regex::new(r"^throw\s+(.+)$").unwrap();

    let mut compiled = CompiledSource {
        requests: Vec::new(),
        bindings: Vec::new(),
        throws: None,
        completion: Value::Undefined,
    };

    for (index, raw) in source.lines().enumerate() {
        let line = raw.trim();
        let line_number = line_offset + index as i32 + 1;

        if line.is_empty() || line.starts_with("//") {
            continue;
        }

        if line.starts_with("import") {
            if kind == SourceKind::Script {
                return Err(EngineError::Syntax(format!(
                    "'import' is only valid in a module (line {})",
                    line_number
                )));
            }
            let captures = import_re.captures(line).ok_or_else(|| {
                EngineError::Syntax(format!("malformed import statement (line {})", line_number))
            })?;
            compiled.requests.push(ImportRequest {
                specifier: captures[1].to_string(),
                attributes: match captures.get(2) {
                    Some(attribute) => Value::String(attribute.as_str().to_string()),
                    None => Value::Undefined,
                },
            });
            continue;
        }

        if line.starts_with("export") {
            if kind == SourceKind::Script {
                return Err(EngineError::Syntax(format!(
                    "'export' is only valid in a module (line {})",
                    line_number
                )));
            }
            let captures = export_re.captures(line).ok_or_else(|| {
                EngineError::Syntax(format!("malformed export statement (line {})", line_number))
            })?;
            let value = parse_literal(&captures[2]).ok_or_else(|| {
                EngineError::Syntax(format!("malformed export value (line {})", line_number))
            })?;
            compiled.bindings.push((captures[1].to_string(), value));
            continue;
        }

        if let Some(captures) = throw_re.captures(line) {
            let value = parse_literal(&captures[1]).ok_or_else(|| {
                EngineError::Syntax(format!("malformed throw statement (line {})", line_number))
            })?;
            compiled.throws = Some(literal_text(&value));
            continue;
        }

        match parse_literal(line) {
            Some(value) => compiled.completion = value,
            None => {
                return Err(EngineError::Syntax(format!(
                    "unexpected token {:?} (line {})",
                    line, line_number
                )));
            }
        }
    }

    Ok(compiled)
}

fn parse_literal(text: &str) -> Option<Value> {
    let text = text.trim();

    match text {
        "true" => return Some(Value::Boolean(true)),
        "false" => return Some(Value::Boolean(false)),
        "null" => return Some(Value::Null),
        "undefined" => return Some(Value::Undefined),
        _ => {}
    }

    if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
        let inner = &text[1..text.len() - 1];
        if inner.contains('"') {
            return None;
        }
        return Some(Value::String(inner.to_string()));
    }

    text.parse::<f64>().ok().map(Value::Number)
}

/// The text a thrown literal surfaces as.
fn literal_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => format!("{:?}", other),
    }
}
