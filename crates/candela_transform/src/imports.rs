//! Collection of `@import` records from a parsed stylesheet.

use candela_core::FileId;
use smallvec::SmallVec;
use swc_core::common::Span;
use swc_css_ast::{
    AtRule, AtRuleName, AtRulePrelude, ImportHref, ImportLayerName, Rule, Stylesheet, UrlValue,
};

use crate::codegen::{stringify_component_value, stringify_media_query_list};

/// The optional condition tuple of one `@import`.
///
/// Conditions are kept in their printed form; they only need to be compared
/// and re-emitted, never interpreted.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct ImportConditions {
    pub layer: Option<String>,
    pub supports: Option<String>,
    pub media: Option<String>,
}

impl ImportConditions {
    /// The sorted condition tuple, as used in inclusion keys.
    pub fn sorted_tuple(&self) -> SmallVec<[&str; 3]> {
        let mut parts: SmallVec<[&str; 3]> = self
            .layer
            .as_deref()
            .into_iter()
            .chain(self.supports.as_deref())
            .chain(self.media.as_deref())
            .collect();
        parts.sort_unstable();
        parts
    }

    pub fn is_empty(&self) -> bool {
        self.sorted_tuple().is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct ImportRecord {
    pub file: FileId,
    pub span: Span,
    pub spec: String,
    pub conditions: ImportConditions,
}

/// Walks the top-level rules of `stylesheet`, returning the imports in
/// document order and whether a leading `@charset` was present.
pub fn collect_imports(file: FileId, stylesheet: &Stylesheet) -> (Vec<ImportRecord>, bool) {
    let mut imports = Vec::new();
    let mut has_charset = false;

    for (index, rule) in stylesheet.rules.iter().enumerate() {
        let Rule::AtRule(at_rule) = rule else {
            continue;
        };
        match at_rule_kind(at_rule) {
            Some(AtRuleKind::Charset) => {
                // Only the first rule of the file is a real @charset;
                // stragglers are ignored either way.
                if index == 0 {
                    has_charset = true;
                }
            }
            Some(AtRuleKind::Import) => {
                // Malformed imports keep a placeholder record so that
                // emission stays index-aligned with the at-rules.
                imports.push(import_record(file, at_rule).unwrap_or(ImportRecord {
                    file,
                    span: at_rule.span,
                    spec: String::new(),
                    conditions: ImportConditions::default(),
                }));
            }
            None => {}
        }
    }

    (imports, has_charset)
}

pub enum AtRuleKind {
    Import,
    Charset,
}

pub fn at_rule_kind(at_rule: &AtRule) -> Option<AtRuleKind> {
    let AtRuleName::Ident(ref name) = at_rule.name else {
        return None;
    };
    if name.value.eq_ignore_ascii_case("import") {
        Some(AtRuleKind::Import)
    } else if name.value.eq_ignore_ascii_case("charset") {
        Some(AtRuleKind::Charset)
    } else {
        None
    }
}

fn import_record(file: FileId, at_rule: &AtRule) -> Option<ImportRecord> {
    let prelude = at_rule.prelude.as_deref()?;
    let AtRulePrelude::ImportPrelude(prelude) = prelude else {
        return None;
    };

    let spec = match &*prelude.href {
        ImportHref::Url(url) => match url.value.as_deref() {
            Some(UrlValue::Str(s)) => s.value.to_string(),
            Some(UrlValue::Raw(raw)) => raw.value.to_string(),
            None => return None,
        },
        ImportHref::Str(s) => s.value.to_string(),
    };

    let mut conditions = ImportConditions::default();
    if let Some(layer_name) = prelude.layer_name.as_deref() {
        conditions.layer = Some(match layer_name {
            ImportLayerName::Ident(ident) => ident.value.to_string(),
            ImportLayerName::Function(function) => {
                stringify_component_value(
                    &swc_css_ast::ComponentValue::Function(Box::new(function.clone())),
                    true,
                )
            }
        });
    }
    if let Some(import_conditions) = prelude.import_conditions.as_deref() {
        if let Some(supports) = import_conditions.supports.as_deref() {
            conditions.supports = Some(stringify_component_value(
                &swc_css_ast::ComponentValue::Function(Box::new(supports.clone())),
                true,
            ));
        }
        if let Some(media) = import_conditions.media.as_deref() {
            let printed = stringify_media_query_list(media, true);
            if !printed.is_empty() {
                conditions.media = Some(printed);
            }
        }
    }

    Some(ImportRecord {
        file,
        span: at_rule.span,
        spec,
        conditions,
    })
}
