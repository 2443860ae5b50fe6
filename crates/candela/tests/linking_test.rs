//! End-to-end bundling: `@import` graphs, hoisting, deduplication and
//! passthrough.

use candela::{bundle, BundleOptions, BundleResult, Loader, MemoryFileSystem, Mode};
use fxhash::FxHashMap;

fn run(files: &[(&str, &str)], options: BundleOptions) -> BundleResult {
    let mut fs = MemoryFileSystem::new();
    for (path, contents) in files {
        fs.add(*path, contents.as_bytes().to_vec());
    }
    bundle(&options, &fs)
}

fn css_options(entry: &str) -> BundleOptions {
    BundleOptions {
        entry_paths: vec![entry.to_string()],
        abs_output_file: Some("/out.css".to_string()),
        ..Default::default()
    }
}

fn loader_map(pairs: &[(&str, Loader)]) -> FxHashMap<String, Loader> {
    pairs
        .iter()
        .map(|(ext, loader)| (ext.to_string(), *loader))
        .collect()
}

fn first_css(result: &BundleResult) -> String {
    let output = result
        .outputs
        .iter()
        .find(|o| o.path.ends_with(".css"))
        .expect("no css output");
    String::from_utf8(output.contents.clone()).unwrap()
}

fn ordered(haystack: &str, needles: &[&str]) {
    let mut last = 0;
    for needle in needles {
        let at = haystack[last..]
            .find(needle)
            .unwrap_or_else(|| panic!("{:?} missing (after byte {}) in:\n{}", needle, last, haystack));
        last += at + needle.len();
    }
}

#[test]
fn simple_import_graph_orders_shared_file_first() {
    let result = run(
        &[
            (
                "/entry.css",
                "@import \"./a.css\";\n@import \"./b.css\";\n.entry { color: red }",
            ),
            ("/a.css", "@import \"./shared.css\";\n.a { color: green }"),
            ("/b.css", "@import \"./shared.css\";\n.b { color: blue }"),
            ("/shared.css", ".shared { color: black }"),
        ],
        css_options("/entry.css"),
    );
    assert_eq!(result.scan_log, "");
    assert_eq!(result.compile_log, "");
    let css = first_css(&result);
    ordered(&css, &[".shared", ".a", ".b", ".entry"]);
    // The shared file shows up exactly once.
    assert_eq!(css.matches(".shared").count(), 1);
}

#[test]
fn external_imports_hoist_to_the_top() {
    let result = run(
        &[
            (
                "/entry.css",
                "@import \"./local.css\";\n@import \"https://x/y.css\";",
            ),
            ("/local.css", ".local { color: red }"),
        ],
        css_options("/entry.css"),
    );
    let css = first_css(&result);
    assert!(css.trim_start().starts_with("@import"));
    ordered(&css, &["https://x/y.css", ".local"]);
}

#[test]
fn external_imports_keep_conditions_and_dedupe() {
    let result = run(
        &[
            (
                "/entry.css",
                "@import \"./inner.css\";\n\
                 @import \"https://www.example.com/style1.css\";\n\
                 @import \"https://www.example.com/style2.css\" print;\n",
            ),
            (
                "/inner.css",
                "@import \"https://www.example.com/style1.css\";\n.inner { color: red }",
            ),
        ],
        css_options("/entry.css"),
    );
    assert_eq!(result.scan_log, "");
    let css = first_css(&result);
    assert_eq!(css.matches("style1.css").count(), 1);
    ordered(&css, &["style1.css", "style2.css", ".inner"]);
    assert!(css.contains("print"));
}

#[test]
fn charset_is_hoisted_above_external_imports() {
    let result = run(
        &[
            (
                "/entry.css",
                "@charset \"UTF-8\";\n@import \"https://x/y.css\";\n.a { color: red }",
            ),
        ],
        css_options("/entry.css"),
    );
    let css = first_css(&result);
    ordered(&css, &["@charset \"UTF-8\";", "@import", ".a"]);
    assert_eq!(css.matches("@charset").count(), 1);
}

#[test]
fn import_cycles_terminate_with_each_file_once() {
    let result = run(
        &[
            ("/entry.css", "@import \"./a.css\";\n.entry { color: red }"),
            ("/a.css", "@import \"./b.css\";\n.a { color: green }"),
            ("/b.css", "@import \"./a.css\";\n.b { color: blue }"),
        ],
        css_options("/entry.css"),
    );
    assert_eq!(result.scan_log, "");
    let css = first_css(&result);
    assert_eq!(css.matches(".a").count(), 1);
    assert_eq!(css.matches(".b").count(), 1);
    ordered(&css, &[".b", ".a", ".entry"]);
}

#[test]
fn missing_import_is_reported_and_skipped() {
    let result = run(
        &[("/entry.css", "@import \"./missing.css\";\n.a { color: red }")],
        css_options("/entry.css"),
    );
    assert_eq!(
        result.scan_log,
        "entry.css: ERROR: Could not resolve \"./missing.css\"\n"
    );
    assert!(first_css(&result).contains(".a"));
}

#[test]
fn importing_js_into_css_is_an_error() {
    let result = run(
        &[
            ("/entry.css", "@import \"./entry.js\";"),
            ("/entry.js", "export default 123"),
        ],
        css_options("/entry.css"),
    );
    assert_eq!(
        result.scan_log,
        "entry.css: ERROR: Cannot import \"entry.js\" into a CSS file\n\
         NOTE: An \"@import\" rule can only be used to import another CSS file and \
         \"entry.js\" is not a CSS file (it was loaded with the \"js\" loader).\n"
    );
}

#[test]
fn conditional_import_of_internal_file_is_an_error() {
    let result = run(
        &[
            ("/entry.css", "@import \"./print.css\" print;"),
            ("/print.css", "body { color: red }"),
        ],
        css_options("/entry.css"),
    );
    assert_eq!(
        result.scan_log,
        "entry.css: ERROR: Bundling with conditional \"@import\" rules is not currently \
         supported\n"
    );
}

#[test]
fn conditional_external_import_is_preserved() {
    let result = run(
        &[("/entry.css", "@import \"https://example.com/print.css\" print;")],
        css_options("/entry.css"),
    );
    assert_eq!(result.scan_log, "");
    let css = first_css(&result);
    assert!(css.contains("https://example.com/print.css"));
    assert!(css.contains("print"));
}

#[test]
fn passthrough_keeps_conditional_imports() {
    let result = run(
        &[("/entry.css", "@import \"./print.css\" print;")],
        BundleOptions {
            mode: Mode::PassThrough,
            entry_paths: vec!["/entry.css".to_string()],
            abs_output_file: Some("/out.css".to_string()),
            ..Default::default()
        },
    );
    assert_eq!(result.scan_log, "");
    let css = first_css(&result);
    assert!(css.contains("print.css"));
    assert!(css.contains("print"));
}

#[test]
fn passthrough_emits_rules_unchanged() {
    let result = run(
        &[(
            "/entry.css",
            ".a { color: red }\n:local(.b) { color: blue }",
        )],
        BundleOptions {
            mode: Mode::PassThrough,
            entry_paths: vec!["/entry.css".to_string()],
            abs_output_file: Some("/out.css".to_string()),
            ..Default::default()
        },
    );
    let css = first_css(&result);
    assert!(css.contains(".a"));
    assert!(css.contains(":local(.b)"));
}

#[test]
fn extension_order_skips_non_css_loaders() {
    let result = run(
        &[
            ("/entry.css", "@import \"./test\";"),
            ("/test.js", "console.log('js')"),
            ("/test.css", ".css { color: red }"),
        ],
        BundleOptions {
            entry_paths: vec!["/entry.css".to_string()],
            abs_output_file: Some("/out.css".to_string()),
            extension_order: vec![".js".to_string(), ".css".to_string()],
            extension_to_loader: loader_map(&[(".js", Loader::Js), (".css", Loader::Css)]),
            ..Default::default()
        },
    );
    assert_eq!(result.scan_log, "");
    assert!(first_css(&result).contains(".css"));
}

#[test]
fn extension_order_with_unconfigured_loader_is_an_error() {
    let result = run(
        &[
            ("/entry.css", "@import \"./test\";"),
            ("/test.js", "console.log('js')"),
            ("/test.sass", "// some code"),
        ],
        BundleOptions {
            entry_paths: vec!["/entry.css".to_string()],
            abs_output_file: Some("/out.css".to_string()),
            extension_order: vec![".js".to_string(), ".sass".to_string()],
            extension_to_loader: loader_map(&[(".js", Loader::Js), (".css", Loader::Css)]),
            ..Default::default()
        },
    );
    assert_eq!(
        result.scan_log,
        "entry.css: ERROR: No loader is configured for \".sass\" files: test.sass\n"
    );
}

#[test]
fn package_imports_walk_node_modules() {
    let result = run(
        &[
            (
                "/entry.css",
                "@import \"test.css\";\na { background: url(b/2.png); }",
            ),
            ("/test.css", ".pkg { color: red }"),
            ("/node_modules/b/2.png", "b-2-node_modules"),
        ],
        BundleOptions {
            entry_paths: vec!["/entry.css".to_string()],
            abs_output_file: Some("/out.css".to_string()),
            extension_to_loader: loader_map(&[(".css", Loader::Css), (".png", Loader::Base64)]),
            ..Default::default()
        },
    );
    assert_eq!(result.scan_log, "");
    let css = first_css(&result);
    assert!(css.contains(".pkg"));
    assert!(css.contains("data:image/png;base64,"));
}

#[test]
fn equal_rules_across_files_collapse_to_the_later_one() {
    let result = run(
        &[
            (
                "/entry.css",
                "@import \"./a.css\";\n@import \"./b.css\";\n@import \"./c.css\";",
            ),
            ("/a.css", "a { color: red }"),
            ("/b.css", "a { color: green }"),
            ("/c.css", "a { color: red }"),
        ],
        BundleOptions {
            entry_paths: vec!["/entry.css".to_string()],
            abs_output_file: Some("/out.css".to_string()),
            minify_syntax: true,
            ..Default::default()
        },
    );
    let css = first_css(&result);
    assert_eq!(css.matches("red").count(), 1);
    // The earlier duplicate was dropped, so green now comes first.
    ordered(&css, &["green", "red"]);
}

#[test]
fn rules_in_different_media_blocks_do_not_collapse() {
    let result = run(
        &[(
            "/entry.css",
            "@media screen { a { color: red } }\n@media print { a { color: red } }",
        )],
        BundleOptions {
            entry_paths: vec!["/entry.css".to_string()],
            abs_output_file: Some("/out.css".to_string()),
            minify_syntax: true,
            ..Default::default()
        },
    );
    let css = first_css(&result);
    assert_eq!(css.matches("color: red").count() + css.matches("color:red").count(), 2);
}

#[test]
fn equal_media_blocks_collapse_entirely() {
    let result = run(
        &[(
            "/entry.css",
            "@media screen { a { color: red } }\n@media screen { a { color: red } }",
        )],
        BundleOptions {
            entry_paths: vec!["/entry.css".to_string()],
            abs_output_file: Some("/out.css".to_string()),
            minify_syntax: true,
            ..Default::default()
        },
    );
    let css = first_css(&result);
    assert_eq!(css.matches("@media").count(), 1);
}

#[test]
fn equal_rules_within_one_media_block_collapse() {
    let result = run(
        &[(
            "/entry.css",
            "@media screen { a { color: red } b { color: blue } a { color: red } }",
        )],
        BundleOptions {
            entry_paths: vec!["/entry.css".to_string()],
            abs_output_file: Some("/out.css".to_string()),
            minify_syntax: true,
            ..Default::default()
        },
    );
    let css = first_css(&result);
    assert_eq!(css.matches("red").count(), 1);
}

#[test]
fn without_minify_syntax_duplicates_are_kept() {
    let result = run(
        &[(
            "/entry.css",
            "a { color: red }\nb { color: blue }\na { color: red }",
        )],
        css_options("/entry.css"),
    );
    let css = first_css(&result);
    assert_eq!(css.matches("red").count(), 2);
}

#[test]
fn code_splitting_shares_common_css() {
    let result = run(
        &[
            ("/a.css", "@import \"./shared.css\";\nbody { color: red }"),
            ("/b.css", "@import \"./shared.css\";\nbody { color: blue }"),
            ("/shared.css", "body { background: black }"),
        ],
        BundleOptions {
            entry_paths: vec!["/a.css".to_string(), "/b.css".to_string()],
            abs_output_dir: Some("/out".to_string()),
            code_splitting: true,
            ..Default::default()
        },
    );
    assert_eq!(result.scan_log, "");
    let chunk = result
        .outputs
        .iter()
        .find(|o| o.path == "/out/chunk.css")
        .expect("no shared chunk");
    let chunk_css = String::from_utf8(chunk.contents.clone()).unwrap();
    assert!(chunk_css.contains("background"));

    for name in ["/out/a.css", "/out/b.css"] {
        let out = result.outputs.iter().find(|o| o.path == name).unwrap();
        let css = String::from_utf8(out.contents.clone()).unwrap();
        assert!(css.starts_with("@import \"./chunk.css\";"));
        assert!(!css.contains("background"));
    }
}
