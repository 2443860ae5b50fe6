mod error;

pub use error::{adapt_parse_errors, ParseError};

use swc_core::common::{input::StringInput, BytePos, Span};
use swc_css_ast::Stylesheet;
use swc_css_parser::{
    error::Error as RawParseError,
    parse_string_input,
    parser::{PResult, ParserConfig},
};

/// Parses `input` as a [`Stylesheet`].
///
/// `span` is the byte range the file occupies inside the bundle-wide
/// position space; every node in the result is spanned within it. Recovered
/// errors are pushed to `errors`, a hard failure is returned as `Err`.
pub fn parse_stylesheet(
    input: &str,
    span: Span,
    errors: &mut Vec<RawParseError>,
) -> PResult<Stylesheet> {
    let parser_input = StringInput::new(input, span.lo, span.hi);
    parse_string_input(parser_input, None, parser_config(), errors)
}

/// The parser runs with CSS Modules syntax enabled so that `:local(...)`
/// and `:global(...)` carry selector-list children instead of raw tokens.
fn parser_config() -> ParserConfig {
    ParserConfig {
        css_modules: true,
        ..Default::default()
    }
}

/// Allocates the position range for a file of `len` bytes starting at
/// `start`, leaving a one-byte gap so that ranges never touch.
pub fn file_span(start: BytePos, len: usize) -> Span {
    Span::new(start, BytePos(start.0 + len as u32), Default::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_parse(input: &str) -> (PResult<Stylesheet>, Vec<RawParseError>) {
        let mut errors = Vec::new();
        let parsed = parse_stylesheet(input, file_span(BytePos(1), input.len()), &mut errors);
        (parsed, errors)
    }

    fn assert_no_errors(input: &str) {
        let (parsed, errors) = test_parse(input);
        assert!(parsed.is_ok());
        assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
    }

    #[test]
    fn it_parses_regular() {
        assert_no_errors(".foo > #bar baz, .foo .bar { background: yellow }");
        assert_no_errors("@media screen { a { color: red } }");
        assert_no_errors("@import \"./a.css\";");
    }

    #[test]
    fn it_parses_scope_markers() {
        assert_no_errors(":local(.foo) { color: red }");
        assert_no_errors(":global(.foo .bar) { color: red }");
        assert_no_errors("div :global .a :local .b { color: red }");
        assert_no_errors(":global { .a { color: red } }");
    }

    #[test]
    fn it_reports_unbalanced_url() {
        let (parsed, errors) = test_parse("@import url(https://example.com/a.css");
        assert!(parsed.is_err() || !errors.is_empty());
    }
}
