//! Final name assignment for local names.
//!
//! Two strategies: *stable* names derived from the declaring file's name
//! plus the original text, and *minified* names walked from a short
//! alphabet. Minified names must not collide with any global name observed
//! anywhere in the bundle, nor with a CSS-wide keyword.

use candela_core::{symbol_atom, CandelaAtom};
use fxhash::{FxHashMap, FxHashSet};

use crate::ModuleRecord;

const HEAD: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ_";
const TAIL: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ_0123456789-";

const CSS_WIDE_KEYWORDS: &[&str] = &["inherit", "initial", "unset", "revert", "revert-layer"];

/// Maps every reference atom in the bundle to its final text.
pub fn assign_names(
    modules: &[ModuleRecord],
    minify: bool,
    avoid: &FxHashSet<CandelaAtom>,
) -> FxHashMap<CandelaAtom, CandelaAtom> {
    let mut assignments = FxHashMap::default();
    let mut taken: FxHashSet<CandelaAtom> = FxHashSet::default();
    let mut next_minified = 0usize;

    for module in modules.iter() {
        let stem = sanitize_identifier(file_stem(&module.path));
        for local in module.scan.locals.iter() {
            let text = if minify {
                loop {
                    let candidate = CandelaAtom::from(minified_name(next_minified));
                    next_minified += 1;
                    let reserved = avoid.contains(&candidate)
                        || CSS_WIDE_KEYWORDS.contains(&&*candidate)
                        || taken.contains(&candidate);
                    if !reserved {
                        break candidate;
                    }
                }
            } else {
                let base = format!("{}_{}", stem, sanitize_identifier(&local.name));
                let mut candidate = CandelaAtom::from(base.as_str());
                let mut suffix = 2usize;
                while taken.contains(&candidate) {
                    candidate = CandelaAtom::from(format!("{}{}", base, suffix));
                    suffix += 1;
                }
                candidate
            };
            taken.insert(text.clone());
            assignments.insert(symbol_atom(local.file, &local.name), text);
        }
    }

    assignments
}

fn minified_name(mut index: usize) -> String {
    let mut name = String::new();
    name.push(HEAD[index % HEAD.len()] as char);
    index /= HEAD.len();
    while index > 0 {
        index -= 1;
        name.push(TAIL[index % TAIL.len()] as char);
        index /= TAIL.len();
    }
    name
}

fn file_stem(path: &str) -> &str {
    let base = match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    };
    match base.rfind('.') {
        Some(0) | None => base,
        Some(idx) => &base[..idx],
    }
}

fn sanitize_identifier(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for (idx, ch) in text.chars().enumerate() {
        if ch.is_ascii_alphanumeric() || ch == '_' || (ch == '-' && idx > 0) {
            out.push(ch);
        } else {
            out.push('_');
        }
    }
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    if out.is_empty() {
        out.push('_');
    }
    out
}
