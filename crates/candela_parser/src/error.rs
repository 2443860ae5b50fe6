use candela_core::{Diagnostic, FileId};
use swc_core::common::Span;
use swc_css_parser::error::{Error as RawParseError, ErrorKind as RawErrorKind};

/// A malformed-syntax report from the parsing boundary.
///
/// The parser recovers from these; they surface as scan-phase warnings and
/// never block the file from joining the module graph.
#[derive(Debug)]
pub struct ParseError {
    pub span: Span,
    pub message: String,
    pub kind: RawErrorKind,
}

impl ParseError {
    pub fn from_raw(raw: RawParseError) -> ParseError {
        let message = raw.message().into_owned();
        let (span, kind) = *raw.into_inner();
        ParseError { span, message, kind }
    }
}

/// Converts recovered parse errors into scan diagnostics for `file`.
pub fn adapt_parse_errors(file: FileId, raw: Vec<RawParseError>) -> Vec<Diagnostic> {
    raw.into_iter()
        .map(|error| {
            let error = ParseError::from_raw(error);
            Diagnostic::warning(file, error.span, error.message)
        })
        .collect()
}
