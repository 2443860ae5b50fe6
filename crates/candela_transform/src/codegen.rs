//! Stringification helpers on top of `swc_css_codegen`.

use swc_css_ast::{
    AtRule, ComplexSelector, ComponentValue, MediaQueryList, Rule, SelectorList, Stylesheet,
};
use swc_css_codegen::{
    writer::basic::{BasicCssWriter, BasicCssWriterConfig},
    CodeGenerator, CodegenConfig, Emit,
};

macro_rules! stringify_fn {
    ($name: ident, $ty: ty) => {
        pub fn $name(node: &$ty, minify: bool) -> String {
            let mut buf = String::new();
            let writer = BasicCssWriter::new(&mut buf, None, BasicCssWriterConfig::default());
            let mut codegen = CodeGenerator::new(writer, CodegenConfig { minify });
            let _ = codegen.emit(node);
            buf
        }
    };
}

stringify_fn!(stringify_stylesheet, Stylesheet);
stringify_fn!(stringify_rule, Rule);
stringify_fn!(stringify_at_rule, AtRule);
stringify_fn!(stringify_component_value, ComponentValue);
stringify_fn!(stringify_selector_list, SelectorList);
stringify_fn!(stringify_complex_selector, ComplexSelector);
stringify_fn!(stringify_media_query_list, MediaQueryList);
