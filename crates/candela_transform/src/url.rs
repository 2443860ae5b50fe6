//! `url(...)` reference collection and rewriting.
//!
//! Only URLs in declaration positions count; tokens inside at-rule preludes
//! (`@supports (background: url(x))`, `@import ... (foo: url(x))`) are inert
//! for bundling purposes and are never visited.

use candela_core::CandelaAtom;
use swc_core::common::Span;
use swc_css_ast::{ComponentValue, Rule, Stylesheet, Url, UrlValue};

#[derive(Debug, Clone)]
pub struct UrlRef {
    pub span: Span,
    pub url: CandelaAtom,
}

/// Collects every `url(...)` in declaration position, in document order.
pub fn collect_urls(stylesheet: &mut Stylesheet) -> Vec<UrlRef> {
    let mut refs = Vec::new();
    for_each_url(stylesheet, &mut |url| {
        if let Some(text) = url_text(url) {
            refs.push(UrlRef {
                span: url.span,
                url: text,
            });
        }
    });
    refs
}

/// Rewrites URLs whose text appears in `replacements`.
pub fn replace_urls(
    stylesheet: &mut Stylesheet,
    replacements: &fxhash::FxHashMap<CandelaAtom, String>,
) {
    if replacements.is_empty() {
        return;
    }
    for_each_url(stylesheet, &mut |url| {
        let Some(text) = url_text(url) else { return };
        if let Some(new_text) = replacements.get(&text) {
            url.value = Some(Box::new(UrlValue::Str(swc_css_ast::Str {
                span: url.span,
                value: new_text.as_str().into(),
                raw: None,
            })));
        }
    });
}

pub fn url_text(url: &Url) -> Option<CandelaAtom> {
    match url.value.as_deref() {
        Some(UrlValue::Str(s)) => Some(s.value.clone()),
        Some(UrlValue::Raw(raw)) => Some(raw.value.clone()),
        None => None,
    }
}

fn for_each_url(stylesheet: &mut Stylesheet, visit: &mut impl FnMut(&mut Url)) {
    for rule in stylesheet.rules.iter_mut() {
        match rule {
            Rule::QualifiedRule(rule) => {
                visit_block_values(&mut rule.block.value, visit);
            }
            // At-rule preludes are skipped on purpose.
            Rule::AtRule(at_rule) => {
                if let Some(ref mut block) = at_rule.block {
                    visit_block_values(&mut block.value, visit);
                }
            }
            Rule::ListOfComponentValues(_) => {}
        }
    }
}

fn visit_block_values(values: &mut Vec<ComponentValue>, visit: &mut impl FnMut(&mut Url)) {
    for value in values.iter_mut() {
        visit_component_value(value, visit);
    }
}

fn visit_component_value(value: &mut ComponentValue, visit: &mut impl FnMut(&mut Url)) {
    match value {
        ComponentValue::Url(url) => visit(url),
        ComponentValue::Declaration(declaration) => {
            for value in declaration.value.iter_mut() {
                visit_component_value(value, visit);
            }
        }
        ComponentValue::Function(function) => {
            for value in function.value.iter_mut() {
                visit_component_value(value, visit);
            }
        }
        ComponentValue::SimpleBlock(block) => {
            visit_block_values(&mut block.value, visit);
        }
        ComponentValue::QualifiedRule(rule) => {
            visit_block_values(&mut rule.block.value, visit);
        }
        ComponentValue::AtRule(at_rule) => {
            if let Some(ref mut block) = at_rule.block {
                visit_block_values(&mut block.value, visit);
            }
        }
        ComponentValue::KeyframeBlock(keyframe_block) => {
            visit_block_values(&mut keyframe_block.block.value, visit);
        }
        _ => {}
    }
}
