//! Bundle orchestration: scanning waves, reference classification, and
//! per-entry emission.
//!
//! Scanning fans out per file (parsing and scope analysis are pure), then
//! joins to resolve the discovered edges on one thread; the link phase is
//! strictly single-threaded and deterministic.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use candela_core::{
    render_log, BundleOptions, CandelaAtom, Diagnostic, FileId, FileNames, Loader, LoaderTable,
    Mode, Note, OutputFormat, SeverityLevel,
};
use candela_linker::{
    emit_order, link, linearize_roots, ImportTarget, LinkOptions, LinkResult, ModuleIndex,
    ModuleRecord,
};
use candela_parser::file_span;
use candela_transform::codegen::stringify_stylesheet;
use candela_transform::{scan_css, ComposesSource, CssScan};
use fxhash::{FxHashMap, FxHashSet};
use itertools::Itertools;
use rayon::prelude::*;
use swc_core::common::{BytePos, Span};

use crate::fs::FileProvider;
use crate::js::{member_accesses, scan_imports, JsImport};
use crate::resolver::{
    base_name, dir_of, is_external_url, join, relative_path, Resolution, ResolveKind, Resolver,
};

/// Cooperative cancellation for the scan phase. Pending waves observe the
/// flag before spawning more work; partially scanned files are discarded.
#[derive(Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> CancellationToken {
        CancellationToken::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct OutputFile {
    pub path: String,
    pub contents: Vec<u8>,
}

pub struct BundleResult {
    pub outputs: Vec<OutputFile>,
    /// Export table per CSS module, keyed by display path: original local
    /// name to the space-joined class list.
    pub css_exports: FxHashMap<String, Vec<(String, String)>>,
    pub scan_log: String,
    pub compile_log: String,
    pub has_errors: bool,
    pub cancelled: bool,
}

pub fn bundle(options: &BundleOptions, fs: &dyn FileProvider) -> BundleResult {
    bundle_cancellable(options, fs, &CancellationToken::new())
}

pub fn bundle_cancellable(
    options: &BundleOptions,
    fs: &dyn FileProvider,
    token: &CancellationToken,
) -> BundleResult {
    Bundler::new(options, fs, token).run()
}

// --- internal state ---

struct FileTable {
    paths: Vec<String>,
    starts: Vec<BytePos>,
}

impl FileTable {
    fn register(&mut self, path: &str, len: usize, next_pos: &mut u32) -> (FileId, Span) {
        let id = FileId(self.paths.len() as u32);
        let start = BytePos(*next_pos);
        *next_pos += len as u32 + 1;
        self.paths.push(path.to_string());
        self.starts.push(start);
        (id, file_span(start, len))
    }
}

impl FileNames for FileTable {
    fn file_path(&self, file: FileId) -> &str {
        &self.paths[file.index()]
    }

    fn file_start(&self, file: FileId) -> BytePos {
        self.starts[file.index()]
    }
}

struct JsModule {
    file: FileId,
    path: String,
    source: String,
    imports: Vec<JsImport>,
    targets: Vec<JsTarget>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum JsTarget {
    Css(FileId),
    Js(FileId),
    Other,
    Missing,
}

enum Pending {
    Css {
        file: FileId,
        path: String,
        loader: Loader,
        source: String,
        span: Span,
    },
    Js {
        file: FileId,
        path: String,
        source: String,
        span: Span,
    },
}

enum Scanned {
    Css {
        path: String,
        scan: CssScan,
    },
    Js {
        file: FileId,
        path: String,
        source: String,
        span: Span,
        imports: Vec<JsImport>,
    },
}

struct Bundler<'a> {
    options: &'a BundleOptions,
    fs: &'a dyn FileProvider,
    token: &'a CancellationToken,
    loaders: LoaderTable,
    table: FileTable,
    by_path: FxHashMap<String, FileId>,
    css: Vec<ModuleRecord>,
    css_by_file: FxHashMap<FileId, usize>,
    js: Vec<JsModule>,
    js_by_file: FxHashMap<FileId, usize>,
    scan_diagnostics: Vec<Diagnostic>,
    compile_diagnostics: Vec<Diagnostic>,
    outputs: Vec<OutputFile>,
    copied_assets: FxHashMap<String, String>,
    css_export_tables: FxHashMap<String, Vec<(String, String)>>,
    next_pos: u32,
    entries: Vec<FileId>,
}

impl<'a> Bundler<'a> {
    fn new(
        options: &'a BundleOptions,
        fs: &'a dyn FileProvider,
        token: &'a CancellationToken,
    ) -> Bundler<'a> {
        Bundler {
            options,
            fs,
            token,
            loaders: LoaderTable::from_config(&options.extension_to_loader),
            table: FileTable {
                paths: Vec::new(),
                starts: Vec::new(),
            },
            by_path: FxHashMap::default(),
            css: Vec::new(),
            css_by_file: FxHashMap::default(),
            js: Vec::new(),
            js_by_file: FxHashMap::default(),
            scan_diagnostics: Vec::new(),
            compile_diagnostics: Vec::new(),
            outputs: Vec::new(),
            copied_assets: FxHashMap::default(),
            css_export_tables: FxHashMap::default(),
            next_pos: 1,
            entries: Vec::new(),
        }
    }

    fn resolver(&self) -> Resolver<'_> {
        Resolver {
            fs: self.fs,
            loaders: &self.loaders,
            options: self.options,
        }
    }

    fn run(mut self) -> BundleResult {
        let mut pending = Vec::new();
        self.seed_entries(&mut pending);
        let cancelled = self.scan_waves(pending);
        if !cancelled {
            self.compile();
        }

        let has_errors = self
            .scan_diagnostics
            .iter()
            .chain(self.compile_diagnostics.iter())
            .any(|d| d.severity != SeverityLevel::Warning);

        BundleResult {
            outputs: std::mem::take(&mut self.outputs),
            css_exports: std::mem::take(&mut self.css_export_tables),
            scan_log: render_log(&self.scan_diagnostics, &self.table),
            compile_log: render_log(&self.compile_diagnostics, &self.table),
            has_errors,
            cancelled,
        }
    }

    fn seed_entries(&mut self, pending: &mut Vec<Pending>) {
        for entry_path in self.options.entry_paths.clone() {
            let path = join("/", &entry_path);
            if !self.fs.exists(&path) {
                let (file, span) = self.table.register(&path, 0, &mut self.next_pos);
                self.scan_diagnostics.push(Diagnostic::error(
                    file,
                    span,
                    format!("Could not resolve \"{}\"", entry_path),
                ));
                continue;
            }
            match self.register_file(&path, pending) {
                Some(file) => self.entries.push(file),
                None => {
                    let extension = base_name(&path)
                        .rfind('.')
                        .map(|idx| base_name(&path)[idx..].to_string())
                        .unwrap_or_default();
                    let (file, span) = self.table.register(&path, 0, &mut self.next_pos);
                    self.scan_diagnostics.push(Diagnostic::error(
                        file,
                        span,
                        format!(
                            "No loader is configured for \"{}\" files: {}",
                            extension,
                            display(&path)
                        ),
                    ));
                }
            }
        }
    }

    /// Registers a resolved, existing file, queueing it for scanning when
    /// it is CSS or JS. Returns `None` when no loader covers it.
    fn register_file(&mut self, path: &str, pending: &mut Vec<Pending>) -> Option<FileId> {
        if let Some(&file) = self.by_path.get(path) {
            return Some(file);
        }
        let loader = self.loaders.classify(path)?;
        let file = match loader {
            loader if loader.is_css() => {
                let source = self.fs.read_to_string(path)?;
                let (file, span) = self.table.register(path, source.len(), &mut self.next_pos);
                pending.push(Pending::Css {
                    file,
                    path: path.to_string(),
                    loader,
                    source,
                    span,
                });
                file
            }
            loader if loader.is_js() => {
                let source = self.fs.read_to_string(path)?;
                let (file, span) = self.table.register(path, source.len(), &mut self.next_pos);
                pending.push(Pending::Js {
                    file,
                    path: path.to_string(),
                    source,
                    span,
                });
                file
            }
            _ => {
                let (file, _) = self.table.register(path, 0, &mut self.next_pos);
                file
            }
        };
        self.by_path.insert(path.to_string(), file);
        Some(file)
    }

    /// Breadth-first expansion: each wave scans in parallel, then resolves
    /// the discovered edges on one thread.
    fn scan_waves(&mut self, mut pending: Vec<Pending>) -> bool {
        let apply_scope = self.options.mode == Mode::Bundle;
        while !pending.is_empty() {
            if self.token.is_cancelled() {
                return true;
            }
            let scanned: Vec<Scanned> = pending
                .into_par_iter()
                .map(|item| match item {
                    Pending::Css {
                        file,
                        path,
                        loader,
                        source,
                        span,
                    } => Scanned::Css {
                        path,
                        scan: scan_css(file, loader, &source, span, apply_scope),
                    },
                    Pending::Js {
                        file,
                        path,
                        source,
                        span,
                    } => {
                        let imports = scan_imports(&source);
                        Scanned::Js {
                            file,
                            path,
                            source,
                            span,
                            imports,
                        }
                    }
                })
                .collect();

            pending = Vec::new();
            for item in scanned {
                match item {
                    Scanned::Css { path, scan } => self.finalize_css(path, scan, &mut pending),
                    Scanned::Js {
                        file,
                        path,
                        source,
                        span,
                        imports,
                    } => self.finalize_js(file, path, source, span, imports, &mut pending),
                }
            }
        }
        false
    }

    fn finalize_css(&mut self, path: String, mut scan: CssScan, pending: &mut Vec<Pending>) {
        self.scan_diagnostics.append(&mut scan.diagnostics);
        let importer_dir = dir_of(&path).to_string();

        let mut import_targets = Vec::with_capacity(scan.imports.len());
        if self.options.mode == Mode::Bundle {
            for record in scan.imports.iter() {
                import_targets.push(self.resolve_import(record, &importer_dir, pending));
            }
        }

        let mut compose_files = FxHashMap::default();
        for decl in scan.composes.iter() {
            let ComposesSource::File { spec, span } = &decl.source else {
                continue;
            };
            if compose_files.contains_key(spec) {
                continue;
            }
            if let Some(target) =
                self.resolve_compose_source(scan.file, spec, *span, &importer_dir, pending)
            {
                compose_files.insert(spec.clone(), target);
            }
        }

        let mut url_replacements = FxHashMap::default();
        if self.options.mode == Mode::Bundle {
            for url_ref in scan.urls.iter() {
                if let Some(replacement) =
                    self.classify_url(scan.file, &url_ref.url, url_ref.span, &importer_dir)
                {
                    url_replacements.insert(url_ref.url.clone(), replacement);
                }
            }
        }

        let index = self.css.len();
        self.css_by_file.insert(scan.file, index);
        self.css.push(ModuleRecord {
            path,
            scan,
            import_targets,
            compose_files,
            url_replacements,
        });
    }

    fn resolve_import(
        &mut self,
        record: &candela_transform::ImportRecord,
        importer_dir: &str,
        pending: &mut Vec<Pending>,
    ) -> ImportTarget {
        if record.spec.is_empty() {
            // Malformed prelude; the parser already warned.
            return ImportTarget::Missing;
        }
        if is_external_url(&record.spec) {
            return ImportTarget::External;
        }
        let resolution = self
            .resolver()
            .resolve(&record.spec, importer_dir, ResolveKind::AtImport);
        match resolution {
            Resolution::ExternalVerbatim | Resolution::ExternalPath(_) => ImportTarget::External,
            Resolution::NoLoader { extension, path } => {
                self.scan_diagnostics.push(Diagnostic::error(
                    record.file,
                    record.span,
                    format!(
                        "No loader is configured for \"{}\" files: {}",
                        extension,
                        display(&path)
                    ),
                ));
                ImportTarget::Missing
            }
            Resolution::Missing => {
                self.scan_diagnostics.push(Diagnostic::error(
                    record.file,
                    record.span,
                    format!("Could not resolve \"{}\"", record.spec),
                ));
                ImportTarget::Missing
            }
            Resolution::File(path) => {
                let loader = match self.loaders.classify(&path) {
                    Some(loader) => loader,
                    None => return ImportTarget::Missing,
                };
                if !loader.is_css() {
                    self.scan_diagnostics.push(
                        Diagnostic::error(
                            record.file,
                            record.span,
                            format!("Cannot import \"{}\" into a CSS file", display(&path)),
                        )
                        .with_note(Note::hint(format!(
                            "An \"@import\" rule can only be used to import another CSS file \
                             and \"{}\" is not a CSS file (it was loaded with the \"{}\" \
                             loader).",
                            display(&path),
                            loader.name()
                        ))),
                    );
                    return ImportTarget::Missing;
                }
                if !record.conditions.is_empty() {
                    self.scan_diagnostics.push(Diagnostic::error(
                        record.file,
                        record.span,
                        "Bundling with conditional \"@import\" rules is not currently supported",
                    ));
                    return ImportTarget::Missing;
                }
                match self.register_file(&path, pending) {
                    Some(target) => ImportTarget::Internal(target),
                    None => ImportTarget::Missing,
                }
            }
        }
    }

    fn resolve_compose_source(
        &mut self,
        from: FileId,
        spec: &str,
        span: Span,
        importer_dir: &str,
        pending: &mut Vec<Pending>,
    ) -> Option<FileId> {
        let resolution = self.resolver().resolve(spec, importer_dir, ResolveKind::AtImport);
        match resolution {
            Resolution::File(path) => {
                let loader = self.loaders.classify(&path)?;
                if !loader.is_css() {
                    self.scan_diagnostics.push(
                        Diagnostic::error(
                            from,
                            span,
                            format!("Cannot use \"composes\" with \"{}\"", display(&path)),
                        )
                        .with_note(Note::hint(format!(
                            "You can only use \"composes\" with CSS files and \"{}\" is not a \
                             CSS file (it was loaded with the \"{}\" loader).",
                            display(&path),
                            loader.name()
                        ))),
                    );
                    return None;
                }
                self.register_file(&path, pending)
            }
            Resolution::ExternalVerbatim | Resolution::ExternalPath(_) => None,
            Resolution::NoLoader { .. } | Resolution::Missing => {
                self.scan_diagnostics.push(Diagnostic::error(
                    from,
                    span,
                    format!("Could not resolve \"{}\"", spec),
                ));
                None
            }
        }
    }

    /// Classifies one `url(...)` reference, returning the replacement text
    /// when the URL resolves to something embeddable.
    fn classify_url(
        &mut self,
        from: FileId,
        url: &CandelaAtom,
        span: Span,
        importer_dir: &str,
    ) -> Option<String> {
        let text: &str = url;
        if is_external_url(text) {
            return None;
        }
        let resolution = self.resolver().resolve(text, importer_dir, ResolveKind::Url);
        match resolution {
            Resolution::ExternalVerbatim => None,
            Resolution::ExternalPath(abs_path) => {
                Some(relative_path(self.options.output_dir(), &abs_path))
            }
            Resolution::NoLoader { .. } => None,
            Resolution::Missing => {
                let mut diagnostic = Diagnostic::error(
                    from,
                    span,
                    format!("Could not resolve \"{}\"", text),
                );
                if text.contains('?') || text.contains('#') {
                    diagnostic = diagnostic.with_note(Note::hint(format!(
                        "You can mark the path \"{}\" as external to exclude it from the \
                         bundle, which will remove this error.",
                        text
                    )));
                }
                self.scan_diagnostics.push(diagnostic);
                None
            }
            Resolution::File(path) => {
                let Some(loader) = self.loaders.classify(&path) else {
                    let extension = base_name(&path)
                        .rfind('.')
                        .map(|idx| base_name(&path)[idx..].to_string())
                        .unwrap_or_default();
                    self.scan_diagnostics.push(Diagnostic::error(
                        from,
                        span,
                        format!(
                            "No loader is configured for \"{}\" files: {}",
                            extension,
                            display(&path)
                        ),
                    ));
                    return None;
                };
                self.embed_url_target(from, span, &path, loader)
            }
        }
    }

    fn embed_url_target(
        &mut self,
        from: FileId,
        span: Span,
        path: &str,
        loader: Loader,
    ) -> Option<String> {
        if loader.is_css() {
            self.scan_diagnostics.push(
                Diagnostic::error(
                    from,
                    span,
                    format!("Cannot use \"{}\" as a URL", display(path)),
                )
                .with_note(Note::hint(format!(
                    "You can't use a \"url()\" token to reference a CSS file, and \"{}\" is a \
                     CSS file (it was loaded with the \"{}\" loader).",
                    display(path),
                    loader.name()
                ))),
            );
            return None;
        }
        if !loader.provides_url() {
            self.scan_diagnostics.push(
                Diagnostic::error(
                    from,
                    span,
                    format!("Cannot use \"{}\" as a URL", display(path)),
                )
                .with_note(Note::hint(format!(
                    "You can't use a \"url()\" token to reference the file \"{}\" because it \
                     was loaded with the \"{}\" loader, which doesn't provide a URL to embed \
                     in the resulting CSS.",
                    display(path),
                    loader.name()
                ))),
            );
            return None;
        }

        let contents = self.fs.read(path)?;
        match loader {
            Loader::Text => Some(format!(
                "data:text/plain;charset=utf-8;base64,{}",
                STANDARD.encode(&contents)
            )),
            Loader::Base64 | Loader::DataUrl => Some(format!(
                "data:{};base64,{}",
                mime_for_path(path),
                STANDARD.encode(&contents)
            )),
            Loader::Binary => Some(format!(
                "data:application/octet-stream;base64,{}",
                STANDARD.encode(&contents)
            )),
            Loader::File => {
                if let Some(name) = self.copied_assets.get(path) {
                    return Some(format!("./{}", name));
                }
                let base = base_name(path);
                let (stem, extension) = match base.rfind('.') {
                    Some(idx) => (&base[..idx], &base[idx..]),
                    None => (base, ""),
                };
                let hash = fxhash::hash64(&contents);
                let name = format!("{}-{:08X}{}", stem, hash as u32, extension);
                self.outputs.push(OutputFile {
                    path: format!("{}/{}", self.options.output_dir(), name),
                    contents,
                });
                self.copied_assets.insert(path.to_string(), name.clone());
                Some(format!("./{}", name))
            }
            _ => None,
        }
    }

    fn finalize_js(
        &mut self,
        file: FileId,
        path: String,
        source: String,
        span: Span,
        imports: Vec<JsImport>,
        pending: &mut Vec<Pending>,
    ) {
        let importer_dir = dir_of(&path).to_string();
        let mut targets = Vec::with_capacity(imports.len());

        for import in imports.iter() {
            let resolution = self
                .resolver()
                .resolve(&import.spec, &importer_dir, ResolveKind::Js);
            let target = match resolution {
                Resolution::ExternalVerbatim | Resolution::ExternalPath(_) => JsTarget::Other,
                Resolution::NoLoader { .. } => JsTarget::Other,
                Resolution::Missing => {
                    self.scan_diagnostics.push(Diagnostic::error(
                        file,
                        import_span(span.lo, import.offset),
                        format!("Could not resolve \"{}\"", import.spec),
                    ));
                    JsTarget::Missing
                }
                Resolution::File(target_path) => match self.loaders.classify(&target_path) {
                    Some(loader) if loader.is_css() => {
                        if self.options.write_to_stdout && !self.options.has_output_path() {
                            self.scan_diagnostics.push(Diagnostic::error(
                                file,
                                import_span(span.lo, import.offset),
                                format!(
                                    "Cannot import \"{}\" into a JavaScript file without an \
                                     output path configured",
                                    display(&target_path)
                                ),
                            ));
                            JsTarget::Missing
                        } else {
                            match self.register_file(&target_path, pending) {
                                Some(target) => JsTarget::Css(target),
                                None => JsTarget::Missing,
                            }
                        }
                    }
                    Some(loader) if loader.is_js() => {
                        match self.register_file(&target_path, pending) {
                            Some(target) => JsTarget::Js(target),
                            None => JsTarget::Missing,
                        }
                    }
                    _ => JsTarget::Other,
                },
            };
            targets.push(target);
        }

        let index = self.js.len();
        self.js_by_file.insert(file, index);
        self.js.push(JsModule {
            file,
            path,
            source,
            imports,
            targets,
        });
    }

    // --- compile phase ---

    fn compile(&mut self) {
        if self.options.mode == Mode::PassThrough {
            self.emit_passthrough();
            return;
        }

        let index = ModuleIndex::build(&self.css);
        let link_options = LinkOptions {
            minify_identifiers: self.options.minify_identifiers,
            minify_syntax: self.options.minify_syntax,
            lower_nesting: self
                .options
                .unsupported_css_features
                .contains(candela_core::CssFeature::Nesting),
            is_pseudo_supported: !self
                .options
                .unsupported_css_features
                .contains(candela_core::CssFeature::IsPseudoClass),
            original_target_env: self.options.original_target_env.clone(),
        };
        let link_result = link(&mut self.css, &index, &link_options);
        self.compile_diagnostics.extend(link_result.diagnostics.iter().cloned());

        self.check_js_import_contract(&link_result);

        // A compile error aborts emission of the entries it affects; other
        // entries still get their output.
        let failed: FxHashSet<FileId> = self
            .compile_diagnostics
            .iter()
            .filter(|diagnostic| diagnostic.is_error())
            .map(|diagnostic| diagnostic.file)
            .collect();

        let mut entry_orders: Vec<(FileId, Vec<FileId>)> = Vec::new();
        for &entry in self.entries.iter() {
            if failed.contains(&entry) {
                continue;
            }
            let roots = self.css_roots_for_entry(entry);
            if roots.is_empty() {
                continue;
            }
            let order = linearize_roots(&roots, &self.css, &index);
            if order.iter().any(|file| failed.contains(file)) {
                continue;
            }
            entry_orders.push((entry, order));
        }

        let shared = if self.options.code_splitting && entry_orders.len() > 1 {
            let mut counts: FxHashMap<FileId, usize> = FxHashMap::default();
            for (_, order) in entry_orders.iter() {
                for file in order.iter() {
                    *counts.entry(*file).or_insert(0) += 1;
                }
            }
            let shared: FxHashSet<FileId> = counts
                .into_iter()
                .filter(|(_, count)| *count > 1)
                .map(|(file, _)| file)
                .collect();
            if !shared.is_empty() {
                let mut chunk_order = Vec::new();
                let mut seen = FxHashSet::default();
                for (_, order) in entry_orders.iter() {
                    for file in order.iter() {
                        if shared.contains(file) && seen.insert(*file) {
                            chunk_order.push(*file);
                        }
                    }
                }
                let emitted =
                    emit_order(&chunk_order, &self.css, &index, self.options.minify_syntax);
                self.outputs.push(OutputFile {
                    path: format!("{}/chunk.css", self.options.output_dir()),
                    contents: emitted.css.into_bytes(),
                });
            }
            shared
        } else {
            FxHashSet::default()
        };

        let single_entry = entry_orders.len() == 1;
        for (entry, order) in entry_orders {
            let full_len = order.len();
            let body: Vec<FileId> = order
                .into_iter()
                .filter(|file| !shared.contains(file))
                .collect();
            let emitted = emit_order(&body, &self.css, &index, self.options.minify_syntax);
            let mut css = String::new();
            if body.len() != full_len {
                css.push_str("@import \"./chunk.css\";\n");
            }
            css.push_str(&emitted.css);

            let path = self.output_path_for(entry, single_entry);
            self.outputs.push(OutputFile {
                path,
                contents: css.into_bytes(),
            });
        }

        self.emit_js_chunks(&link_result);
        self.export_tables(&link_result);
    }

    fn emit_passthrough(&mut self) {
        let single = self.entries.len() == 1;
        for &entry in self.entries.clone().iter() {
            let Some(&idx) = self.css_by_file.get(&entry) else {
                continue;
            };
            let css = stringify_stylesheet(&self.css[idx].scan.stylesheet, false);
            let path = self.output_path_for(entry, single);
            self.outputs.push(OutputFile {
                path,
                contents: css.into_bytes(),
            });
        }
    }

    /// The CSS bundle of a JS entry is the set of CSS files reachable
    /// through its import graph, in discovery order. A CSS entry is its own
    /// single root.
    fn css_roots_for_entry(&self, entry: FileId) -> Vec<FileId> {
        if self.css_by_file.contains_key(&entry) {
            return vec![entry];
        }
        let mut roots = Vec::new();
        let mut visited = FxHashSet::default();
        self.collect_js_css_roots(entry, &mut visited, &mut roots);
        roots
    }

    fn collect_js_css_roots(
        &self,
        file: FileId,
        visited: &mut FxHashSet<FileId>,
        roots: &mut Vec<FileId>,
    ) {
        if !visited.insert(file) {
            return;
        }
        let Some(&idx) = self.js_by_file.get(&file) else {
            return;
        };
        for target in self.js[idx].targets.iter() {
            match target {
                JsTarget::Css(css_file) => {
                    if !roots.contains(css_file) {
                        roots.push(*css_file);
                    }
                }
                JsTarget::Js(js_file) => self.collect_js_css_roots(*js_file, visited, roots),
                _ => {}
            }
        }
    }

    /// Named imports of a missing local name are errors; namespace member
    /// accesses of one are warnings (skipped under `node_modules`).
    fn check_js_import_contract(&mut self, link_result: &LinkResult) {
        let mut diagnostics = Vec::new();
        for module in self.js.iter() {
            let in_node_modules = module.path.contains("/node_modules/");
            for (import, target) in module.imports.iter().zip(module.targets.iter()) {
                let JsTarget::Css(css_file) = target else {
                    continue;
                };
                let Some(exports) = link_result.exports.get(css_file) else {
                    continue;
                };
                let css_path = display(self.table.file_path(*css_file)).to_string();
                let has = |name: &str| exports.iter().any(|(export, _)| &**export == name);

                for (exported, _) in import.named.iter() {
                    if !has(exported) {
                        diagnostics.push(Diagnostic::error(
                            module.file,
                            import_span(self.table.file_start(module.file), import.offset),
                            format!(
                                "No matching export in \"{}\" for import \"{}\"",
                                css_path, exported
                            ),
                        ));
                    }
                }

                if let Some(namespace) = &import.namespace {
                    if in_node_modules {
                        continue;
                    }
                    for (member, offset) in member_accesses(&module.source, namespace) {
                        if member == "default" || has(&member) {
                            continue;
                        }
                        diagnostics.push(Diagnostic::warning(
                            module.file,
                            import_span(self.table.file_start(module.file), offset),
                            format!(
                                "Import \"{}\" will always be undefined because there is no \
                                 matching export in \"{}\"",
                                member, css_path
                            ),
                        ));
                    }
                }
            }
        }
        self.compile_diagnostics.extend(diagnostics);
    }

    /// Materializes the export tables a JS entry sees, shaped by the
    /// output format: ESM gets one `export var` per JS-nameable local plus
    /// an `export default` map, CJS gets `module.exports` with the same
    /// map. Every import form counts, including bare named imports and
    /// side-effect imports.
    fn emit_js_chunks(&mut self, link_result: &LinkResult) {
        let single = self.entries.len() == 1;
        for &entry in self.entries.clone().iter() {
            let Some(&idx) = self.js_by_file.get(&entry) else {
                continue;
            };
            let module = &self.js[idx];

            let mut css_files: Vec<FileId> = Vec::new();
            for target in module.targets.iter() {
                if let JsTarget::Css(css_file) = target {
                    if !css_files.contains(css_file) {
                        css_files.push(*css_file);
                    }
                }
            }
            if css_files.is_empty() {
                continue;
            }

            // The default export map, merged across the imported modules in
            // import order; a later module wins a name clash.
            let mut merged: Vec<(String, String)> = Vec::new();
            let mut merged_index: FxHashMap<String, usize> = FxHashMap::default();
            let mut named_exported: FxHashSet<String> = FxHashSet::default();
            let mut out = String::new();

            for css_file in css_files {
                let Some(exports) = link_result.exports.get(&css_file) else {
                    continue;
                };
                out.push_str(&format!("// {}\n", display(self.table.file_path(css_file))));
                for (name, classes) in exports.iter() {
                    if self.options.output_format == OutputFormat::EsModule
                        && is_js_identifier(name)
                        && named_exported.insert(name.to_string())
                    {
                        out.push_str(&format!("export var {} = \"{}\";\n", name, classes));
                    }
                    let key: &str = name;
                    match merged_index.get(key) {
                        Some(&at) => merged[at].1 = classes.clone(),
                        None => {
                            merged_index.insert(name.to_string(), merged.len());
                            merged.push((name.to_string(), classes.clone()));
                        }
                    }
                }
            }

            let map = merged
                .iter()
                .map(|(name, classes)| format!("\n  \"{}\": \"{}\"", name, classes))
                .join(",");
            let (head, tail) = match self.options.output_format {
                OutputFormat::EsModule => ("export default {", "};\n"),
                OutputFormat::CommonJs => ("module.exports = {", "};\n"),
            };
            out.push_str(head);
            out.push_str(&map);
            if !merged.is_empty() {
                out.push('\n');
            }
            out.push_str(tail);

            let path = self.output_path_for(entry, single);
            let path = format!("{}.js", path.trim_end_matches(".css"));
            self.outputs.push(OutputFile {
                path,
                contents: out.into_bytes(),
            });
        }
    }

    fn export_tables(&mut self, link_result: &LinkResult) {
        let mut tables = FxHashMap::default();
        for module in self.css.iter() {
            let Some(exports) = link_result.exports.get(&module.scan.file) else {
                continue;
            };
            tables.insert(
                display(&module.path).to_string(),
                exports
                    .iter()
                    .map(|(name, classes)| (name.to_string(), classes.clone()))
                    .collect(),
            );
        }
        self.css_export_tables = tables;
    }

    fn output_path_for(&self, entry: FileId, single: bool) -> String {
        if single {
            if let Some(file) = self.options.abs_output_file.as_deref() {
                return file.to_string();
            }
        }
        let base = base_name(self.table.file_path(entry));
        let stem = match base.rfind('.') {
            Some(idx) => &base[..idx],
            None => base,
        };
        format!("{}/{}.css", self.options.output_dir(), stem)
    }
}

fn display(path: &str) -> &str {
    path.strip_prefix('/').unwrap_or(path)
}

fn import_span(file_start: BytePos, offset: usize) -> Span {
    let pos = BytePos(file_start.0 + offset as u32);
    Span::new(pos, pos, Default::default())
}

const JS_RESERVED_WORDS: &[&str] = &[
    "await", "break", "case", "catch", "class", "const", "continue", "debugger", "default",
    "delete", "do", "else", "enum", "export", "extends", "false", "finally", "for", "function",
    "if", "import", "in", "instanceof", "let", "new", "null", "return", "static", "super",
    "switch", "this", "throw", "true", "try", "typeof", "var", "void", "while", "with", "yield",
];

/// Local names that cannot be JS identifiers (`rename-this`, keywords) are
/// reachable through the default export only.
fn is_js_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let leading_ok = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$');
    leading_ok
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        && !JS_RESERVED_WORDS.contains(&name)
}

fn mime_for_path(path: &str) -> &'static str {
    let extension = base_name(path).rsplit('.').next().unwrap_or("");
    match extension.to_ascii_lowercase().as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        _ => "application/octet-stream",
    }
}
