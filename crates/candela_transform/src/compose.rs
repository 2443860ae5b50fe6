use candela_core::CandelaAtom;
use swc_core::common::{Span, Spanned};
use swc_css_ast::ComponentValue;

/// One `composes:` declaration, lifted out of its rule during scope analysis.
#[derive(Debug, Clone)]
pub struct ComposesDecl {
    pub span: Span,
    /// The local class being extended (the single local class of the rule's
    /// selector list).
    pub class: CandelaAtom,
    pub names: Vec<ComposesName>,
    pub source: ComposesSource,
}

#[derive(Debug, Clone)]
pub struct ComposesName {
    pub name: CandelaAtom,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ComposesSource {
    /// `composes: a b;` with targets in the same file.
    SameFile,
    /// `composes: a from global;` with targets emitted verbatim.
    Global,
    /// `composes: a b from "./path";`
    File { spec: String, span: Span },
}

/// Splits a `composes:` value into target names and their source.
///
/// Returns `None` when the value has none of the recognized shapes; the
/// caller reports it and drops the declaration.
pub fn parse_composes_value(values: &[ComponentValue]) -> Option<(Vec<ComposesName>, ComposesSource)> {
    enum Tok {
        Ident(CandelaAtom, Span),
        Str(CandelaAtom, Span),
    }

    let mut tokens = Vec::new();
    for value in values {
        match value {
            ComponentValue::Ident(ident) => {
                tokens.push(Tok::Ident(ident.value.clone(), ident.span));
            }
            ComponentValue::Str(s) => {
                tokens.push(Tok::Str(s.value.clone(), s.span));
            }
            ComponentValue::PreservedToken(token)
                if matches!(token.token, swc_css_ast::Token::WhiteSpace { .. }) => {}
            // Anything else makes the declaration malformed.
            _ => return None,
        }
    }

    if tokens.is_empty() {
        return None;
    }

    let mut source = ComposesSource::SameFile;
    if tokens.len() >= 2 {
        let from_at = tokens.len() - 2;
        let has_from = matches!(
            &tokens[from_at],
            Tok::Ident(name, _) if name.eq_ignore_ascii_case("from")
        );
        if has_from {
            match tokens.pop()? {
                Tok::Str(spec, span) => {
                    source = ComposesSource::File {
                        spec: spec.to_string(),
                        span,
                    };
                }
                Tok::Ident(name, _) if name.eq_ignore_ascii_case("global") => {
                    source = ComposesSource::Global;
                }
                _ => return None,
            }
            tokens.pop();
        }
    }

    let mut names = Vec::with_capacity(tokens.len());
    for token in tokens {
        match token {
            Tok::Ident(name, span) => names.push(ComposesName { name, span }),
            Tok::Str(..) => return None,
        }
    }
    if names.is_empty() {
        return None;
    }
    Some((names, source))
}

impl ComposesDecl {
    pub fn span_of(values: &[ComponentValue], fallback: Span) -> Span {
        match (values.first(), values.last()) {
            (Some(first), Some(last)) => Span::new(
                first.span_lo(),
                last.span_hi(),
                Default::default(),
            ),
            _ => fallback,
        }
    }
}

#[cfg(test)]
mod tests {
    use swc_core::common::DUMMY_SP;
    use swc_css_ast::{ComponentValue, Ident, Str};

    use super::*;

    fn ident(name: &str) -> ComponentValue {
        ComponentValue::Ident(Box::new(Ident {
            span: DUMMY_SP,
            value: name.into(),
            raw: None,
        }))
    }

    fn string(value: &str) -> ComponentValue {
        ComponentValue::Str(Box::new(Str {
            span: DUMMY_SP,
            value: value.into(),
            raw: None,
        }))
    }

    #[test]
    fn same_file_targets() {
        let (names, source) = parse_composes_value(&[ident("a"), ident("b")]).unwrap();
        assert_eq!(names.len(), 2);
        assert_eq!(&*names[0].name, "a");
        assert_eq!(source, ComposesSource::SameFile);
    }

    #[test]
    fn from_file_targets() {
        let (names, source) =
            parse_composes_value(&[ident("a"), ident("from"), string("./other.css")]).unwrap();
        assert_eq!(names.len(), 1);
        match source {
            ComposesSource::File { spec, .. } => assert_eq!(spec, "./other.css"),
            other => panic!("unexpected source: {:?}", other),
        }
    }

    #[test]
    fn from_global_targets() {
        let (names, source) =
            parse_composes_value(&[ident("x"), ident("y"), ident("from"), ident("global")]).unwrap();
        assert_eq!(names.len(), 2);
        assert_eq!(source, ComposesSource::Global);
    }

    #[test]
    fn a_name_called_from_composes_itself() {
        // `composes: from;` has no source clause, so "from" is a plain target.
        let (names, source) = parse_composes_value(&[ident("from")]).unwrap();
        assert_eq!(names.len(), 1);
        assert_eq!(source, ComposesSource::SameFile);
    }

    #[test]
    fn malformed_values_are_rejected() {
        assert!(parse_composes_value(&[]).is_none());
        assert!(parse_composes_value(&[string("a")]).is_none());
    }
}
