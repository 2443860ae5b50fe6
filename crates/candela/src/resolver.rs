//! Path resolution at the bundler boundary.
//!
//! Covers what the import graph needs and nothing more: relative joins,
//! ancestor `node_modules` walks for package-style specs, the configured
//! extension order for extension-less `@import`s, and the pre-/post-resolve
//! external matchers. Query and fragment suffixes stay part of the path.

use candela_core::{BundleOptions, Loader, LoaderTable};

use crate::fs::FileProvider;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    File(String),
    /// Matched an external pattern before resolving; preserved verbatim.
    ExternalVerbatim,
    /// Matched an exact external path after resolving.
    ExternalPath(String),
    /// A file exists for this spec but no loader covers its extension.
    NoLoader { extension: String, path: String },
    Missing,
}

/// URLs with a scheme, protocol-relative URLs and fragment-only references
/// never join the module graph.
pub fn is_external_url(spec: &str) -> bool {
    if spec.starts_with("//") || spec.starts_with('#') {
        return true;
    }
    let mut chars = spec.char_indices();
    match chars.next() {
        Some((_, c)) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    for (idx, c) in chars {
        match c {
            ':' => return idx > 0,
            c if c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.' => {}
            _ => return false,
        }
    }
    false
}

pub fn dir_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) => "/",
        Some(idx) => &path[..idx],
        None => "/",
    }
}

pub fn base_name(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// Joins and normalizes, collapsing `.` and `..` segments.
pub fn join(base_dir: &str, spec: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    if !spec.starts_with('/') {
        segments.extend(base_dir.split('/').filter(|s| !s.is_empty()));
    }
    for segment in spec.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    let mut out = String::with_capacity(spec.len() + base_dir.len());
    for segment in segments {
        out.push('/');
        out.push_str(segment);
    }
    if out.is_empty() {
        out.push('/');
    }
    out
}

/// Relative path from `from_dir` to `to`, for rewriting post-resolve
/// external URLs against the output directory.
pub fn relative_path(from_dir: &str, to: &str) -> String {
    let from: Vec<&str> = from_dir.split('/').filter(|s| !s.is_empty()).collect();
    let to_segments: Vec<&str> = to.split('/').filter(|s| !s.is_empty()).collect();
    let mut common = 0;
    while common < from.len()
        && common + 1 < to_segments.len()
        && from[common] == to_segments[common]
    {
        common += 1;
    }
    let mut out = String::new();
    if common == from.len() {
        out.push_str("./");
    } else {
        for _ in common..from.len() {
            out.push_str("../");
        }
    }
    out.push_str(&to_segments[common..].join("/"));
    out
}

pub struct Resolver<'a> {
    pub fs: &'a dyn FileProvider,
    pub loaders: &'a LoaderTable,
    pub options: &'a BundleOptions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveKind {
    AtImport,
    Url,
    Js,
}

impl Resolver<'_> {
    pub fn resolve(&self, spec: &str, importer_dir: &str, kind: ResolveKind) -> Resolution {
        if self.options.external.matches_pre_resolve(spec) {
            return Resolution::ExternalVerbatim;
        }

        for candidate in self.candidates(spec, importer_dir) {
            match self.probe(&candidate, kind) {
                Resolution::Missing => continue,
                hit => return hit,
            }
        }
        Resolution::Missing
    }

    /// Relative specs resolve against the importer; package-style specs try
    /// the importer's directory first, then ancestor `node_modules`.
    fn candidates(&self, spec: &str, importer_dir: &str) -> Vec<String> {
        let relative = spec.starts_with("./") || spec.starts_with("../") || spec.starts_with('/');
        let mut candidates = vec![join(importer_dir, spec)];
        if !relative {
            let mut dir = importer_dir.to_string();
            loop {
                candidates.push(join(&dir, &format!("node_modules/{}", spec)));
                if dir == "/" {
                    break;
                }
                dir = dir_of(&dir).to_string();
            }
        }
        candidates
    }

    fn probe(&self, base: &str, kind: ResolveKind) -> Resolution {
        if self.fs.exists(base) {
            return self.finish(base.to_string());
        }

        match kind {
            ResolveKind::AtImport => {
                // An extension from the configured order is eligible only
                // when its loader is CSS-family; an existing file whose
                // extension has no loader at all is an error.
                let order: &[String] = if self.options.extension_order.is_empty() {
                    return Resolution::Missing;
                } else {
                    &self.options.extension_order
                };
                for extension in order {
                    let candidate = format!("{}{}", base, extension);
                    if !self.fs.exists(&candidate) {
                        continue;
                    }
                    match self.loaders.loader_for_extension(extension) {
                        Some(loader) if loader.is_css() => {
                            return self.finish(candidate);
                        }
                        Some(_) => continue,
                        None => {
                            return Resolution::NoLoader {
                                extension: extension.clone(),
                                path: candidate,
                            }
                        }
                    }
                }
                Resolution::Missing
            }
            ResolveKind::Js => {
                for candidate in [format!("{}.js", base), format!("{}/index.js", base)] {
                    if self.fs.exists(&candidate) {
                        return self.finish(candidate);
                    }
                }
                Resolution::Missing
            }
            ResolveKind::Url => Resolution::Missing,
        }
    }

    fn finish(&self, path: String) -> Resolution {
        if self.options.external.matches_post_resolve(&path) {
            return Resolution::ExternalPath(path);
        }
        Resolution::File(path)
    }
}
