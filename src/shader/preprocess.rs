//! Textual shader preprocessing.
//!
//! Shader sources carry two directive kinds on top of plain WGSL:
//!
//! - `#include "unit";` — replaced by the named unit's text, resolved
//!   recursively. A visited stack turns mutual inclusion into a
//!   [`RenderError::CyclicInclude`] instead of unbounded recursion.
//! - `#define param_<NAME> <VALUE>` — a boolean compile-time switch whose
//!   default value can be overridden per model. The compiler later lowers
//!   these lines to WGSL constants.

use std::collections::BTreeSet;

use crate::error::RenderError;
use crate::shader::store::ShaderSourceStore;
use crate::shader::ShaderParams;

const PARAM_DEFINE: &str = "#define param_";
const RENDER_MODE_PREFIX: &str = "renderMode_";

/// Expands every `#include` directive in `source`, recursively.
///
/// Included text is substituted in place of the directive line and always
/// ends with a newline. A source without directives is returned unchanged.
pub fn resolve_includes(
    source: &str,
    store: &dyn ShaderSourceStore,
) -> Result<String, RenderError> {
    let mut visited = Vec::new();
    resolve_includes_inner(source, store, &mut visited)
}

fn resolve_includes_inner(
    source: &str,
    store: &dyn ShaderSourceStore,
    visited: &mut Vec<String>,
) -> Result<String, RenderError> {
    if !source.contains("#include") {
        return Ok(source.to_string());
    }

    let mut resolved = String::with_capacity(source.len());
    for line in source.split_inclusive('\n') {
        let Some(unit) = parse_include(line) else {
            resolved.push_str(line);
            continue;
        };
        if visited.iter().any(|seen| seen == unit) {
            return Err(RenderError::CyclicInclude(unit.to_string()));
        }
        let included = store.load(unit)?;
        visited.push(unit.to_string());
        let mut included = resolve_includes_inner(&included, store, visited)?;
        visited.pop();
        if !included.ends_with('\n') {
            included.push('\n');
        }
        resolved.push_str(&included);
    }
    Ok(resolved)
}

/// Parses an `#include "unit";` line, returning the unit name. Lines that do
/// not match the directive shape are left for the compiler to reject.
fn parse_include(line: &str) -> Option<&str> {
    let rest = line.trim().strip_prefix("#include")?.trim_start();
    let rest = rest.strip_prefix('"')?;
    let (unit, tail) = rest.split_once('"')?;
    let tail = tail.trim();
    if tail.is_empty() || tail == ";" {
        Some(unit)
    } else {
        None
    }
}

/// Rewrites the value of every `#define param_<NAME> <VALUE>` line whose
/// name appears in `params` to `1` or `0`. Names absent from `params` keep
/// their source-declared default.
pub fn apply_parameter_overrides(source: &str, params: &ShaderParams) -> String {
    let mut rewritten = String::with_capacity(source.len());
    for line in source.split_inclusive('\n') {
        let body = line.trim_end_matches(['\r', '\n']);
        match parse_define(body) {
            Some((name, _)) if params.contains_key(name) => {
                let value = if params[name] { "1" } else { "0" };
                rewritten.push_str(&format!("{PARAM_DEFINE}{name} {value}"));
                rewritten.push_str(&line[body.len()..]);
            }
            _ => rewritten.push_str(line),
        }
    }
    rewritten
}

/// Splits a `#define param_<NAME> <VALUE>` line into name and value tokens.
pub(crate) fn parse_define(line: &str) -> Option<(&str, &str)> {
    let rest = line.trim_start().strip_prefix(PARAM_DEFINE)?;
    let mut tokens = rest.split_whitespace();
    let name = tokens.next()?;
    let value = tokens.next()?;
    Some((name, value))
}

/// Every `NAME` declared by a `#define param_<NAME>` line, regardless of
/// whether it carries a value or was overridden.
pub fn find_parameters(source: &str) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    for line in source.lines() {
        if let Some(rest) = line.trim_start().strip_prefix(PARAM_DEFINE) {
            if let Some(name) = rest.split_whitespace().next() {
                names.insert(name.to_string());
            }
        }
    }
    names
}

/// The render-mode subset of a declared parameter set, prefix stripped.
pub fn render_modes(declared: &BTreeSet<String>) -> Vec<String> {
    declared
        .iter()
        .filter_map(|name| name.strip_prefix(RENDER_MODE_PREFIX))
        .map(str::to_string)
        .collect()
}
