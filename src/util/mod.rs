//! Basic utilities: errors, name mangling, relative paths.

pub mod error;

pub use error::{Error, Result};

use std::path::{Component, Path, PathBuf};

/// Sanitize a name into a legal prim identifier.
///
/// Every character outside `[A-Za-z0-9_]` becomes an underscore, and a
/// leading digit gets an underscore prepended. An empty input yields `"_"`.
pub fn sanitize_name(name: &str) -> String {
    if name.is_empty() {
        return "_".to_string();
    }

    let mut out = String::with_capacity(name.len() + 1);
    for (i, c) in name.chars().enumerate() {
        if c.is_ascii_alphanumeric() || c == '_' {
            if i == 0 && c.is_ascii_digit() {
                out.push('_');
            }
            out.push(c);
        } else {
            out.push('_');
        }
    }
    out
}

/// Strip any namespace prefix from a node name.
///
/// DCC node names may carry colon-separated namespaces ("ns:sub:name");
/// only the trailing segment is kept.
pub fn strip_namespace(name: &str) -> &str {
    match name.rfind(':') {
        Some(pos) => &name[pos + 1..],
        None => name,
    }
}

/// Best-effort lexical relative path from `base` to `target`.
///
/// Used when rewriting texture file paths relative to the exported stage.
/// Falls back to the target unchanged when the two paths share no common
/// ancestor (different roots, or a relative/absolute mismatch).
pub fn make_relative(target: &Path, base: &Path) -> PathBuf {
    let target_comps: Vec<Component> = target.components().collect();
    let base_comps: Vec<Component> = base.components().collect();

    if target_comps.is_empty() || base_comps.is_empty() {
        return target.to_path_buf();
    }
    if target_comps[0] != base_comps[0] {
        return target.to_path_buf();
    }

    let mut common = 0;
    while common < target_comps.len()
        && common < base_comps.len()
        && target_comps[common] == base_comps[common]
    {
        common += 1;
    }

    let mut out = PathBuf::new();
    for _ in common..base_comps.len() {
        out.push("..");
    }
    for comp in &target_comps[common..] {
        out.push(comp.as_os_str());
    }

    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}
