//! Whole-bundle passes: once every file is scanned and every edge resolved,
//! the linker assigns final names, resolves composition, lowers nesting for
//! old targets, deduplicates rules and emits one stylesheet per entry plus
//! the JS-visible export tables.

mod compose;
mod graph;
mod names;
mod output;

pub use compose::{ComposeEntry, ComposeResolution};
pub use output::EmittedEntry;

use candela_core::{CandelaAtom, Diagnostic, FileId, NameKind};
use candela_transform::{lower_nesting, replace_names, replace_urls, CssScan};
use fxhash::{FxHashMap, FxHashSet};
use itertools::Itertools;

/// How one `@import` of a module resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportTarget {
    Internal(FileId),
    /// Preserved verbatim and hoisted to the top of the output.
    External,
    /// Resolution failed; the import is a no-op and was already reported.
    Missing,
}

/// One CSS file plus everything the bundler resolved about it.
pub struct ModuleRecord {
    pub path: String,
    pub scan: CssScan,
    /// Parallel to `scan.imports`, in document order.
    pub import_targets: Vec<ImportTarget>,
    /// Files pulled in by `composes: ... from "spec"`, keyed by spec.
    pub compose_files: FxHashMap<String, FileId>,
    /// URL text replacements computed by reference classification.
    pub url_replacements: FxHashMap<CandelaAtom, String>,
}

impl ModuleRecord {
    /// Internal dependencies in emission order: `@import` targets first,
    /// then composition sources.
    fn internal_targets(&self) -> Vec<FileId> {
        let mut targets: Vec<FileId> = self
            .import_targets
            .iter()
            .filter_map(|target| match target {
                ImportTarget::Internal(file) => Some(*file),
                _ => None,
            })
            .collect();
        for decl in self.scan.composes.iter() {
            if let candela_transform::ComposesSource::File { spec, .. } = &decl.source {
                if let Some(file) = self.compose_files.get(spec) {
                    targets.push(*file);
                }
            }
        }
        targets
    }
}

/// Maps bundle-wide file ids to positions in the module list. The id space
/// is shared with non-CSS files, so the mapping is sparse.
#[derive(Default)]
pub struct ModuleIndex {
    by_id: FxHashMap<FileId, usize>,
}

impl ModuleIndex {
    pub fn build(modules: &[ModuleRecord]) -> ModuleIndex {
        let mut by_id = FxHashMap::default();
        for (idx, module) in modules.iter().enumerate() {
            by_id.insert(module.scan.file, idx);
        }
        ModuleIndex { by_id }
    }

    pub fn get<'a>(&self, modules: &'a [ModuleRecord], file: FileId) -> Option<&'a ModuleRecord> {
        self.by_id.get(&file).map(|&idx| &modules[idx])
    }

    pub fn contains(&self, file: FileId) -> bool {
        self.by_id.contains_key(&file)
    }
}

pub struct LinkOptions {
    pub minify_identifiers: bool,
    pub minify_syntax: bool,
    /// Set when the target environment lacks native nesting.
    pub lower_nesting: bool,
    /// Whether the target environment supports `:is()`.
    pub is_pseudo_supported: bool,
    pub original_target_env: Option<String>,
}

pub struct LinkResult {
    /// Reference atom to final text, bundle-wide.
    pub final_names: FxHashMap<CandelaAtom, CandelaAtom>,
    /// Per CSS module: original local name to exported class list.
    pub exports: FxHashMap<FileId, Vec<(CandelaAtom, String)>>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Runs every whole-bundle pass, mutating the module stylesheets into their
/// final form. Call once per bundle, before [`emit_entry`].
pub fn link(
    modules: &mut [ModuleRecord],
    index: &ModuleIndex,
    options: &LinkOptions,
) -> LinkResult {
    let mut diagnostics = Vec::new();

    // The avoidance set spans the whole bundle and is built before any
    // minified assignment happens.
    let mut avoid: FxHashSet<CandelaAtom> = FxHashSet::default();
    for module in modules.iter() {
        for (name, _) in module.scan.globals.iter() {
            avoid.insert(name.clone());
        }
    }

    let final_names = names::assign_names(modules, options.minify_identifiers, &avoid);

    let resolution = compose::resolve_compositions(modules, index);
    diagnostics.extend(resolution.diagnostics);

    let mut exports: FxHashMap<FileId, Vec<(CandelaAtom, String)>> = FxHashMap::default();
    for module in modules.iter() {
        let mut table = Vec::with_capacity(module.scan.locals.len());
        for local in module.scan.locals.iter() {
            let key = (local.file, local.name.clone());
            let value = match resolution.closures.get(&key) {
                Some(closure) if local.kind == NameKind::Class => closure
                    .iter()
                    .map(|entry| entry_text(entry, &final_names))
                    .join(" "),
                _ => entry_text(
                    &ComposeEntry::Local(local.file, local.name.clone()),
                    &final_names,
                ),
            };
            table.push((local.name.clone(), value));
        }
        exports.insert(module.scan.file, table);
    }

    for module in modules.iter_mut() {
        replace_names(&mut module.scan.stylesheet, &final_names);
        replace_urls(&mut module.scan.stylesheet, &module.url_replacements);
        if options.lower_nesting {
            lower_nesting(
                module.scan.file,
                &mut module.scan.stylesheet,
                options.is_pseudo_supported,
                options.original_target_env.as_deref(),
                &mut diagnostics,
            );
        }
        if options.minify_syntax {
            output::dedupe_nested_rules(&mut module.scan.stylesheet);
        }
    }

    LinkResult {
        final_names,
        exports,
        diagnostics,
    }
}

fn entry_text(
    entry: &ComposeEntry,
    final_names: &FxHashMap<CandelaAtom, CandelaAtom>,
) -> String {
    match entry {
        ComposeEntry::Global(name) => name.to_string(),
        ComposeEntry::Local(file, name) => {
            let symbol = candela_core::symbol_atom(*file, name);
            match final_names.get(&symbol) {
                Some(text) => text.to_string(),
                // A composed name from a file that assigned nothing (should
                // not happen; keep the original text rather than a marker).
                None => name.to_string(),
            }
        }
    }
}

/// Import-post-order over the graph reachable from `roots`, each file once.
pub fn linearize_roots(
    roots: &[FileId],
    modules: &[ModuleRecord],
    index: &ModuleIndex,
) -> Vec<FileId> {
    graph::linearize_many(roots, &|file| {
        index
            .get(modules, file)
            .map(|module| module.internal_targets())
            .unwrap_or_default()
    })
}

/// Emits the stylesheet for an already-linearized file order. [`link`] must
/// have run.
pub fn emit_order(
    order: &[FileId],
    modules: &[ModuleRecord],
    index: &ModuleIndex,
    minify_syntax: bool,
) -> EmittedEntry {
    output::emit(order, modules, index, minify_syntax)
}

/// Emits the linked stylesheet for one entry. [`link`] must have run.
pub fn emit_entry(
    entry: FileId,
    modules: &[ModuleRecord],
    index: &ModuleIndex,
    minify_syntax: bool,
) -> Option<EmittedEntry> {
    if !index.contains(entry) {
        return None;
    }
    let order = linearize_roots(&[entry], modules, index);
    Some(output::emit(&order, modules, index, minify_syntax))
}
