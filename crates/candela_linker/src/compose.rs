//! Resolution of `composes:` declarations across the bundle.
//!
//! Produces, for every local class, the ordered list of names that must
//! appear on an element wearing it: dependencies first, the class itself
//! last, duplicates removed keeping the first occurrence. Cycles reach a
//! fixed point because a class already on the resolution stack contributes
//! nothing.

use candela_core::{CandelaAtom, Diagnostic, FileId, Loader, Note};
use candela_transform::ComposesSource;
use fxhash::{FxHashMap, FxHashSet};

use crate::{ModuleIndex, ModuleRecord};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ComposeEntry {
    Local(FileId, CandelaAtom),
    Global(CandelaAtom),
}

type ClassKey = (FileId, CandelaAtom);

pub struct ComposeResolution {
    /// Closure per class that composes something; classes without
    /// `composes:` have the implicit closure `[self]`.
    pub closures: FxHashMap<ClassKey, Vec<ComposeEntry>>,
    pub diagnostics: Vec<Diagnostic>,
}

pub fn resolve_compositions(
    modules: &[ModuleRecord],
    index: &ModuleIndex,
) -> ComposeResolution {
    let mut resolver = Resolver {
        modules,
        index,
        direct: FxHashMap::default(),
        closures: FxHashMap::default(),
        stack: FxHashSet::default(),
        diagnostics: Vec::new(),
    };

    resolver.collect_direct_targets();

    let roots: Vec<ClassKey> = resolver.direct.keys().cloned().collect();
    for root in roots.iter() {
        resolver.closure_of(root.clone());
    }
    for root in roots {
        resolver.check_cascade_ambiguity(&root);
    }

    ComposeResolution {
        closures: resolver.closures,
        diagnostics: resolver.diagnostics,
    }
}

struct Resolver<'a> {
    modules: &'a [ModuleRecord],
    index: &'a ModuleIndex,
    direct: FxHashMap<ClassKey, Vec<ComposeEntry>>,
    closures: FxHashMap<ClassKey, Vec<ComposeEntry>>,
    stack: FxHashSet<ClassKey>,
    diagnostics: Vec<Diagnostic>,
}

impl Resolver<'_> {
    /// Resolves every `composes:` target to a local name or a verbatim
    /// global, reporting targets that cannot be composed.
    fn collect_direct_targets(&mut self) {
        let modules = self.modules;
        let index = self.index;
        for module in modules.iter() {
            for decl in module.scan.composes.iter() {
                let key = (module.scan.file, decl.class.clone());
                let mut targets = Vec::new();

                for name in decl.names.iter() {
                    match &decl.source {
                        ComposesSource::Global => {
                            targets.push(ComposeEntry::Global(name.name.clone()));
                        }
                        ComposesSource::SameFile => {
                            if let Some(entry) =
                                self.resolve_target(module, module, &name.name, name.span)
                            {
                                targets.push(entry);
                            }
                        }
                        ComposesSource::File { spec, .. } => {
                            let Some(target_file) = module.compose_files.get(spec) else {
                                // Resolution already failed during scanning.
                                continue;
                            };
                            let Some(target_module) = index.get(modules, *target_file) else {
                                continue;
                            };
                            if let Some(entry) =
                                self.resolve_target(module, target_module, &name.name, name.span)
                            {
                                targets.push(entry);
                            }
                        }
                    }
                }

                self.direct.entry(key).or_default().extend(targets);
            }
        }
    }

    fn resolve_target(
        &mut self,
        from: &ModuleRecord,
        target: &ModuleRecord,
        name: &CandelaAtom,
        span: swc_core::common::Span,
    ) -> Option<ComposeEntry> {
        if target.scan.locals.contains(name) {
            return Some(ComposeEntry::Local(target.scan.file, name.clone()));
        }

        if let Some(global_span) = target.scan.globals.get(name) {
            let hint = if target.scan.loader == Loader::LocalCss {
                format!(
                    "Use the \":local\" selector to change \"{}\" into a local name.",
                    name
                )
            } else {
                format!(
                    "Use the \"local-css\" loader for \"{}\" to enable local names.",
                    display_path(&target.path)
                )
            };
            self.diagnostics.push(
                Diagnostic::error(
                    from.scan.file,
                    span,
                    format!("Cannot use global name \"{}\" with \"composes\"", name),
                )
                .with_note(Note::here(
                    target.scan.file,
                    global_span,
                    format!("The global name \"{}\" is defined here:", name),
                ))
                .with_note(Note::hint(hint)),
            );
            return None;
        }

        self.diagnostics.push(Diagnostic::error(
            from.scan.file,
            span,
            format!(
                "The name \"{}\" never appears in \"{}\"",
                name,
                display_path(&target.path)
            ),
        ));
        None
    }

    fn closure_of(&mut self, key: ClassKey) -> Vec<ComposeEntry> {
        if let Some(cached) = self.closures.get(&key) {
            return cached.clone();
        }
        if self.stack.contains(&key) {
            // A cycle contributes nothing beyond what is already being
            // collected; the closure is a fixed point.
            return Vec::new();
        }
        self.stack.insert(key.clone());

        let mut out: Vec<ComposeEntry> = Vec::new();
        let direct = self.direct.get(&key).cloned().unwrap_or_default();
        for entry in direct {
            match entry {
                ComposeEntry::Global(name) => out.push(ComposeEntry::Global(name)),
                ComposeEntry::Local(file, name) => {
                    let inner = self.closure_of((file, name));
                    out.extend(inner);
                }
            }
        }
        out.push(ComposeEntry::Local(key.0, key.1.clone()));

        let mut seen = FxHashSet::default();
        out.retain(|entry| seen.insert(entry.clone()));

        self.stack.remove(&key);
        self.closures.insert(key.clone(), out.clone());
        out
    }

    /// Warns when a property's final value depends on the concatenation
    /// order of independently-authored files. The pair reported is the two
    /// most recently discovered definitions along the closure walk.
    fn check_cascade_ambiguity(&mut self, root: &ClassKey) {
        let modules = self.modules;
        let index = self.index;
        let Some(closure) = self.closures.get(root).cloned() else {
            return;
        };
        let root_module = match index.get(modules, root.0) {
            Some(module) => module,
            None => return,
        };
        let root_span = root_module
            .scan
            .locals
            .get(&root.1)
            .map(|local| local.span)
            .unwrap_or_default();

        let mut last_definition: FxHashMap<CandelaAtom, (FileId, swc_core::common::Span)> =
            FxHashMap::default();
        let mut reported: FxHashSet<(CandelaAtom, FileId, FileId)> = FxHashSet::default();

        for entry in closure.iter() {
            let ComposeEntry::Local(file, name) = entry else {
                continue;
            };
            let Some(module) = index.get(modules, *file) else {
                continue;
            };
            let Some(props) = module.scan.class_props.get(name) else {
                continue;
            };
            for (property, span) in props.iter() {
                if let Some((prev_file, prev_span)) = last_definition.get(property) {
                    if prev_file != file && reported.insert((property.clone(), *prev_file, *file)) {
                        self.diagnostics.push(
                            Diagnostic::warning(
                                root.0,
                                root_span,
                                format!(
                                    "The value of \"{}\" in the \"{}\" class is undefined",
                                    property, root.1
                                ),
                            )
                            .with_note(Note::here(
                                *prev_file,
                                *prev_span,
                                format!("The first definition of \"{}\" is here:", property),
                            ))
                            .with_note(Note::here(
                                *file,
                                *span,
                                format!("The second definition of \"{}\" is here:", property),
                            ))
                            .with_note(Note::hint(format!(
                                "The specification of \"composes\" does not define an order when \
                                 class declarations from separate files are composed together. \
                                 The value of the \"{}\" property for \"{}\" may change \
                                 unpredictably as the code is edited. Make sure that all \
                                 definitions of \"{}\" for \"{}\" are in a single file.",
                                property, root.1, property, root.1
                            ))),
                        );
                    }
                }
                last_definition.insert(property.clone(), (*file, *span));
            }
        }
    }
}

fn display_path(path: &str) -> &str {
    path.strip_prefix('/').unwrap_or(path)
}
