//! Per-file passes of the bundler: scope analysis, reference collection and
//! nesting lowering. Each file is scanned independently; everything that
//! needs the whole module graph lives in `candela_linker`.

#[macro_use]
extern crate lazy_static;

mod atoms;
pub mod codegen;
mod compose;
mod imports;
mod nesting;
mod rename;
mod scope;
mod url;
mod util;
mod values;

pub use compose::{ComposesDecl, ComposesName, ComposesSource};
pub use imports::{at_rule_kind, AtRuleKind, ImportConditions, ImportRecord};
pub use nesting::lower_nesting;
pub use rename::replace_names;
pub use scope::{ClassPropertyTable, Mode, ScopeAnalyzer};
pub use url::{collect_urls, replace_urls, url_text, UrlRef};

use candela_core::{Diagnostic, FileId, GlobalNameTable, Loader, LocalNameTable};
use candela_parser::{adapt_parse_errors, parse_stylesheet};
use swc_core::common::Span;
use swc_css_ast::Stylesheet;

/// Everything the scan phase learns about one CSS file.
pub struct CssScan {
    pub file: FileId,
    pub loader: Loader,
    pub stylesheet: Stylesheet,
    pub imports: Vec<ImportRecord>,
    pub urls: Vec<UrlRef>,
    pub locals: LocalNameTable,
    pub globals: GlobalNameTable,
    pub composes: Vec<ComposesDecl>,
    pub class_props: ClassPropertyTable,
    pub has_charset: bool,
    pub diagnostics: Vec<Diagnostic>,
}

/// Parses and scans one CSS file.
///
/// `apply_scope` is off in passthrough mode, where markers and names are
/// emitted untouched.
pub fn scan_css(
    file: FileId,
    loader: Loader,
    source: &str,
    span: Span,
    apply_scope: bool,
) -> CssScan {
    let mut parse_errors = Vec::new();
    let parsed = parse_stylesheet(source, span, &mut parse_errors);
    let mut diagnostics = adapt_parse_errors(file, parse_errors);

    let mut stylesheet = match parsed {
        Ok(stylesheet) => stylesheet,
        Err(error) => {
            let error = candela_parser::ParseError::from_raw(error);
            diagnostics.push(Diagnostic::error(file, error.span, error.message));
            Stylesheet {
                span,
                rules: vec![],
            }
        }
    };

    let mut locals = LocalNameTable::default();
    let mut globals = GlobalNameTable::default();
    let mut composes = Vec::new();
    let mut class_props = ClassPropertyTable::default();

    if apply_scope {
        let mut analyzer = ScopeAnalyzer::new(file, loader);
        analyzer.analyze(&mut stylesheet);
        locals = analyzer.locals;
        globals = analyzer.globals;
        composes = analyzer.composes;
        class_props = analyzer.class_props;
        diagnostics.append(&mut analyzer.diagnostics);
    }

    let (imports, has_charset) = imports::collect_imports(file, &stylesheet);
    let urls = url::collect_urls(&mut stylesheet);

    CssScan {
        file,
        loader,
        stylesheet,
        imports,
        urls,
        locals,
        globals,
        composes,
        class_props,
        has_charset,
        diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use candela_core::{symbol_atom, CandelaAtom, NameKind};
    use candela_parser::file_span;
    use fxhash::FxHashMap;
    use swc_core::common::BytePos;

    use super::codegen::stringify_stylesheet;
    use super::*;

    fn scan(loader: Loader, source: &str) -> CssScan {
        scan_css(
            FileId(0),
            loader,
            source,
            file_span(BytePos(1), source.len()),
            true,
        )
    }

    /// Renames every local to `<original>_r` and prints the result, the way
    /// the linker does with real assignments.
    fn scan_to_css(loader: Loader, source: &str) -> (CssScan, String) {
        let mut scan = scan(loader, source);
        let mut map = FxHashMap::default();
        for local in scan.locals.iter() {
            map.insert(
                symbol_atom(local.file, &local.name),
                CandelaAtom::from(format!("{}_r", local.name)),
            );
        }
        replace_names(&mut scan.stylesheet, &map);
        let css = stringify_stylesheet(&scan.stylesheet, true);
        (scan, css)
    }

    #[test]
    fn local_css_collects_class_names() {
        let (scan, css) = scan_to_css(Loader::LocalCss, ".foo { color: red } .bar .foo { x: y }");
        let foo = scan.locals.get(&"foo".into()).unwrap();
        assert_eq!(foo.kind, NameKind::Class);
        assert!(scan.locals.contains(&"bar".into()));
        assert!(css.contains(".foo_r{color:red}"));
        assert!(css.contains(".bar_r .foo_r"));
    }

    #[test]
    fn plain_css_keeps_everything_global() {
        let (scan, css) = scan_to_css(Loader::Css, ".foo { color: red } :local(.bar) { x: y }");
        assert!(scan.locals.is_empty());
        assert!(scan.globals.get(&"foo".into()).is_some());
        // Markers are left untouched by the plain css loader.
        assert!(css.contains(":local("));
    }

    #[test]
    fn global_markers_in_local_file() {
        let (scan, css) = scan_to_css(
            Loader::LocalCss,
            ":global(.top) { color: red } div:global(.side).edge { color: blue }",
        );
        assert!(scan.globals.get(&"top".into()).is_some());
        assert!(scan.globals.get(&"side".into()).is_some());
        assert!(scan.locals.contains(&"edge".into()));
        assert!(css.contains(".top"));
        // The functional marker scopes its argument only.
        assert!(css.contains("div.side.edge_r"));
        assert!(!css.contains(":global"));
    }

    #[test]
    fn bare_shifters_persist_to_the_selector_end() {
        let (scan, css) = scan_to_css(
            Loader::LocalCss,
            ":global .a .b { color: red } .c :global .d :local .e { color: blue }",
        );
        assert!(scan.globals.get(&"a".into()).is_some());
        assert!(scan.globals.get(&"b".into()).is_some());
        assert!(scan.globals.get(&"d".into()).is_some());
        assert!(scan.locals.contains(&"c".into()));
        assert!(scan.locals.contains(&"e".into()));
        assert!(css.contains(".a .b"));
    }

    #[test]
    fn bare_block_wrappers_dissolve() {
        let (scan, css) = scan_to_css(
            Loader::LocalCss,
            ".before { a: b } :global { .button { color: red } } .after { c: d }",
        );
        assert!(scan.globals.get(&"button".into()).is_some());
        assert!(!scan.locals.contains(&"button".into()));
        assert!(css.contains(".button"));
        assert!(!css.contains(":global"));
    }

    #[test]
    fn nested_wrappers_innermost_wins() {
        let (scan, css) = scan_to_css(
            Loader::GlobalCss,
            ":global { .outer { :local { .inner { color: red } } } }",
        );
        assert!(scan.globals.get(&"outer".into()).is_some());
        assert!(scan.locals.contains(&"inner".into()));
        assert!(css.contains(".outer"));
        assert!(css.contains(".inner_r"));
    }

    #[test]
    fn keyframes_and_animation_names() {
        let (scan, css) = scan_to_css(
            Loader::LocalCss,
            "@keyframes spin { to { transform: rotate(1turn) } }
             div { animation-name: spin, none, INITIAL }
             div :global { animation-name: other }",
        );
        let spin = scan.locals.get(&"spin".into()).unwrap();
        assert_eq!(spin.kind, NameKind::Animation);
        assert!(scan.globals.get(&"other".into()).is_some());
        assert!(css.contains("@keyframes spin_r"));
        assert!(css.contains("spin_r,none,INITIAL"));
        assert!(css.contains("other"));
    }

    #[test]
    fn animation_shorthand_skips_reserved_words() {
        let (scan, css) = scan_to_css(Loader::LocalCss, "div { animation: 2s infinite wiggle }");
        assert!(scan.locals.contains(&"wiggle".into()));
        assert!(css.contains("infinite"));
        assert!(css.contains("wiggle_r"));
    }

    #[test]
    fn list_style_shorthand_type_slot() {
        // First non-reserved identifier is the type.
        let (scan, _) = scan_to_css(Loader::LocalCss, "div { list-style: fancy none }");
        assert!(scan.locals.contains(&"fancy".into()));

        // Predefined counter styles are reserved, case-insensitively.
        let (scan, _) = scan_to_css(Loader::LocalCss, "div { list-style: SQUARE }");
        assert!(scan.locals.is_empty());

        // An image plus `none` fills the type slot; nothing is rewritten.
        let (scan, _) = scan_to_css(
            Loader::LocalCss,
            "div { list-style: url(http://x/) none invalid }",
        );
        assert!(!scan.locals.contains(&"invalid".into()));

        // With an image and no `none`, the identifier is still the type.
        let (scan, _) = scan_to_css(Loader::LocalCss, "div { list-style: url(http://x/) fancy }");
        assert!(scan.locals.contains(&"fancy".into()));
    }

    #[test]
    fn container_names_rewrite() {
        let (scan, css) = scan_to_css(
            Loader::LocalCss,
            "@container sidebar (max-width: 100px) { div { color: red } }
             div { container: panel other / size }
             div { container-name: none INITIAL }",
        );
        assert!(scan.locals.contains(&"sidebar".into()));
        assert!(scan.locals.contains(&"panel".into()));
        assert!(scan.locals.contains(&"other".into()));
        assert!(!scan.locals.contains(&"size".into()));
        assert!(css.contains("sidebar_r"));
        assert!(css.contains("panel_r"));
    }

    #[test]
    fn nth_child_of_selector_lists_are_scoped() {
        let (scan, _) = scan_to_css(
            Loader::LocalCss,
            ":nth-child(2n of .local1 :global .g1) { color: red }",
        );
        assert!(scan.locals.contains(&"local1".into()));
        assert!(scan.globals.get(&"g1".into()).is_some());
    }

    #[test]
    fn composes_is_collected_and_removed() {
        let (scan, css) = scan_to_css(
            Loader::LocalCss,
            ".a { composes: b; color: red } .b { color: blue }
             .c { composes: x y from \"./other.css\" }
             .d { composes: g from global }
             .e { :global { composes: gg } }",
        );
        assert_eq!(scan.composes.len(), 4);
        assert!(!css.contains("composes"));

        assert_eq!(&*scan.composes[0].class, "a");
        assert_eq!(scan.composes[0].source, ComposesSource::SameFile);

        match &scan.composes[1].source {
            ComposesSource::File { spec, .. } => assert_eq!(spec, "./other.css"),
            other => panic!("unexpected source {:?}", other),
        }

        assert_eq!(scan.composes[2].source, ComposesSource::Global);
        // A `:global` block turns bare targets into global names.
        assert_eq!(scan.composes[3].source, ComposesSource::Global);
        assert_eq!(&*scan.composes[3].class, "e");
    }

    #[test]
    fn composes_outside_a_class_is_a_warning() {
        let scan = scan(Loader::LocalCss, "div { composes: a }");
        assert!(scan.composes.is_empty());
        assert_eq!(scan.diagnostics.len(), 1);
        assert!(scan.diagnostics[0].message.contains("composes"));
    }

    #[test]
    fn class_properties_are_attributed() {
        let scan = scan(
            Loader::LocalCss,
            ".z1 { zoom: 1; color: red } .z2 { zoom: 2 }",
        );
        let z1 = scan.class_props.get(&"z1".into()).unwrap();
        assert!(z1.iter().any(|(prop, _)| &**prop == "zoom"));
        assert!(z1.iter().any(|(prop, _)| &**prop == "color"));
    }

    #[test]
    fn imports_and_charset_are_collected() {
        let scan = scan(
            Loader::Css,
            "@charset \"UTF-8\";
             @import \"./a.css\";
             @import url(./b.css) print;
             .x { color: red }",
        );
        assert!(scan.has_charset);
        assert_eq!(scan.imports.len(), 2);
        assert_eq!(scan.imports[0].spec, "./a.css");
        assert!(scan.imports[0].conditions.is_empty());
        assert_eq!(scan.imports[1].spec, "./b.css");
        assert_eq!(scan.imports[1].conditions.media.as_deref(), Some("print"));
    }

    #[test]
    fn urls_in_preludes_are_ignored() {
        let scan = scan(
            Loader::Css,
            "@supports (background: url(ignored.png)) { a { color: red } }
             a { background: url(./used.png) }
             @font-face { src: url(./font.woff2) }",
        );
        let urls: Vec<_> = scan.urls.iter().map(|u| u.url.to_string()).collect();
        assert_eq!(urls, vec!["./used.png", "./font.woff2"]);
    }

    #[test]
    fn nesting_lowering_flattens_rules() {
        let mut scan = scan(Loader::Css, "a { color: red; .c { color: blue } }");
        let mut diagnostics = Vec::new();
        lower_nesting(
            FileId(0),
            &mut scan.stylesheet,
            true,
            Some("chrome10"),
            &mut diagnostics,
        );
        let css = stringify_stylesheet(&scan.stylesheet, true);
        assert!(css.contains("a{color:red}"));
        assert!(css.contains("a .c{color:blue}"));
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn nesting_lowering_complex_parent_warns_without_is() {
        let mut scan = scan(Loader::Css, "a b { .c & { color: red } }");
        let mut diagnostics = Vec::new();
        lower_nesting(
            FileId(0),
            &mut scan.stylesheet,
            false,
            Some("chrome10"),
            &mut diagnostics,
        );
        let css = stringify_stylesheet(&scan.stylesheet, true);
        assert!(css.contains(":is(a b)"));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0]
            .message
            .contains("Transforming this CSS nesting syntax is not supported"));
        assert!(diagnostics[0].message.contains("chrome10"));
    }

    #[test]
    fn nesting_lowering_lifts_conditional_at_rules() {
        let mut scan = scan(Loader::Css, "a { @media screen { color: red } }");
        let mut diagnostics = Vec::new();
        lower_nesting(FileId(0), &mut scan.stylesheet, true, None, &mut diagnostics);
        let css = stringify_stylesheet(&scan.stylesheet, true);
        assert!(css.contains("@media screen{a{color:red}}"));
    }

    #[test]
    fn page_margin_rules_are_not_nesting() {
        let mut scan = scan(Loader::Css, "@page { @top-left { background: red } }");
        let mut diagnostics = Vec::new();
        lower_nesting(FileId(0), &mut scan.stylesheet, false, None, &mut diagnostics);
        assert!(diagnostics.is_empty());
        let css = stringify_stylesheet(&scan.stylesheet, true);
        assert!(css.contains("@top-left"));
    }

    #[test]
    fn multi_parent_nesting_warns_once_per_rule() {
        let mut scan = scan(Loader::Css, ".a, .b .c, .d { & > & { color: red } }");
        let mut diagnostics = Vec::new();
        lower_nesting(
            FileId(0),
            &mut scan.stylesheet,
            false,
            Some("chrome10"),
            &mut diagnostics,
        );
        assert_eq!(diagnostics.len(), 1);
    }
}
