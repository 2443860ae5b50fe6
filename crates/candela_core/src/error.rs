use swc_core::common::{BytePos, Span};

use crate::FileId;

pub trait Severity {
    fn get_severity(&self) -> SeverityLevel;

    /// Returns `true` if the severity level is [`RecoverableError`].
    ///
    /// [`RecoverableError`]: SeverityLevel::RecoverableError
    #[must_use]
    fn is_recoverable_error(&self) -> bool {
        matches!(self.get_severity(), SeverityLevel::RecoverableError)
    }

    /// Returns `true` if the severity level is [`UnrecoverableError`].
    ///
    /// [`UnrecoverableError`]: SeverityLevel::UnrecoverableError
    #[must_use]
    fn is_unrecoverable_error(&self) -> bool {
        matches!(self.get_severity(), SeverityLevel::UnrecoverableError)
    }

    /// Returns `true` if the severity level is [`Warning`].
    ///
    /// [`Warning`]: SeverityLevel::Warning
    #[must_use]
    fn is_warning(&self) -> bool {
        matches!(self.get_severity(), SeverityLevel::Warning)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeverityLevel {
    UnrecoverableError,
    RecoverableError,
    Warning,
}

/// A user-facing message tied to a source location.
///
/// Rendered as `<source>: <SEVERITY>: <message>`, followed by the `NOTE:`
/// continuation lines. Notes may point into other files (cross-file hints)
/// or carry no location at all (plain hints).
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: SeverityLevel,
    pub file: FileId,
    pub span: Span,
    pub message: String,
    pub notes: Vec<Note>,
}

#[derive(Debug, Clone)]
pub struct Note {
    pub file: Option<FileId>,
    pub span: Option<Span>,
    pub message: String,
}

impl Note {
    pub fn here(file: FileId, span: Span, message: impl Into<String>) -> Note {
        Note {
            file: Some(file),
            span: Some(span),
            message: message.into(),
        }
    }

    pub fn hint(message: impl Into<String>) -> Note {
        Note {
            file: None,
            span: None,
            message: message.into(),
        }
    }
}

impl Diagnostic {
    pub fn error(file: FileId, span: Span, message: impl Into<String>) -> Diagnostic {
        Diagnostic {
            severity: SeverityLevel::RecoverableError,
            file,
            span,
            message: message.into(),
            notes: vec![],
        }
    }

    pub fn warning(file: FileId, span: Span, message: impl Into<String>) -> Diagnostic {
        Diagnostic {
            severity: SeverityLevel::Warning,
            file,
            span,
            message: message.into(),
            notes: vec![],
        }
    }

    pub fn with_note(mut self, note: Note) -> Diagnostic {
        self.notes.push(note);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity != SeverityLevel::Warning
    }
}

impl Severity for Diagnostic {
    fn get_severity(&self) -> SeverityLevel {
        self.severity
    }
}

/// Resolves file ids to paths and base positions for log rendering.
pub trait FileNames {
    fn file_path(&self, file: FileId) -> &str;
    fn file_start(&self, file: FileId) -> BytePos;
}

fn display_path(path: &str) -> &str {
    path.strip_prefix('/').unwrap_or(path)
}

/// Renders diagnostics the way the CLI prints them, ordered by
/// (file path, byte offset).
pub fn render_log(diagnostics: &[Diagnostic], names: &impl FileNames) -> String {
    let mut ordered: Vec<&Diagnostic> = diagnostics.iter().collect();
    ordered.sort_by_key(|d| {
        let offset = d.span.lo.0.saturating_sub(names.file_start(d.file).0);
        (names.file_path(d.file).to_string(), offset)
    });

    let mut out = String::new();
    for diagnostic in ordered {
        let severity = if diagnostic.is_error() { "ERROR" } else { "WARNING" };
        out.push_str(display_path(names.file_path(diagnostic.file)));
        out.push_str(": ");
        out.push_str(severity);
        out.push_str(": ");
        out.push_str(&diagnostic.message);
        out.push('\n');

        for note in diagnostic.notes.iter() {
            if let Some(file) = note.file {
                out.push_str(display_path(names.file_path(file)));
                out.push_str(": ");
            }
            out.push_str("NOTE: ");
            out.push_str(&note.message);
            out.push('\n');
        }
    }
    out
}
