//! Final stylesheet assembly: hoisting, rule-level deduplication and
//! printing.

use candela_core::FileId;
use candela_transform::codegen::{stringify_at_rule, stringify_rule};
use candela_transform::{at_rule_kind, AtRuleKind};
use fxhash::FxHashSet;
use swc_css_ast::{AtRule, ComponentValue, Rule, Stylesheet};

use crate::{ModuleIndex, ModuleRecord};

pub struct EmittedEntry {
    pub css: String,
}

/// Assembles the output for one linearized file order.
///
/// `@charset` (if any file carried one) and the external `@import`s are
/// hoisted to the top in that order; everything else follows in file order.
/// With `minify_syntax`, byte-equal top-level rules collapse to their last
/// occurrence.
pub fn emit(
    order: &[FileId],
    modules: &[ModuleRecord],
    index: &ModuleIndex,
    minify_syntax: bool,
) -> EmittedEntry {
    let mut has_charset = false;
    let mut external_imports: Vec<String> = Vec::new();
    let mut seen_imports: FxHashSet<String> = FxHashSet::default();
    let mut body: Vec<String> = Vec::new();

    for file in order.iter() {
        let Some(module) = index.get(modules, *file) else {
            continue;
        };
        has_charset |= module.scan.has_charset;

        let mut import_index = 0usize;
        for rule in module.scan.stylesheet.rules.iter() {
            match rule {
                Rule::AtRule(at_rule) => match at_rule_kind(at_rule) {
                    Some(AtRuleKind::Charset) => {}
                    Some(AtRuleKind::Import) => {
                        let target = module.import_targets.get(import_index);
                        import_index += 1;
                        if matches!(target, Some(&crate::ImportTarget::External)) {
                            let text = stringify_at_rule(at_rule, false);
                            if seen_imports.insert(text.clone()) {
                                external_imports.push(text);
                            }
                        }
                    }
                    None => body.push(stringify_rule(rule, false)),
                },
                _ => body.push(stringify_rule(rule, false)),
            }
        }
    }

    if minify_syntax {
        dedupe_keep_later(&mut body);
    }

    let mut css = String::new();
    if has_charset {
        css.push_str("@charset \"UTF-8\";\n");
    }
    for import in external_imports {
        css.push_str(&import);
        if !import.ends_with(';') {
            css.push(';');
        }
        css.push('\n');
    }
    for rule in body {
        css.push_str(&rule);
        css.push('\n');
    }

    EmittedEntry { css }
}

/// Collapses byte-equal rules, keeping the later occurrence.
fn dedupe_keep_later(rules: &mut Vec<String>) {
    let mut seen: FxHashSet<String> = FxHashSet::default();
    let mut keep = vec![false; rules.len()];
    for (idx, rule) in rules.iter().enumerate().rev() {
        if seen.insert(rule.clone()) {
            keep[idx] = true;
        }
    }
    let mut idx = 0;
    rules.retain(|_| {
        let kept = keep[idx];
        idx += 1;
        kept
    });
}

/// Deduplicates rules nested inside at-rule blocks (`@media`, `@supports`,
/// `@layer`, ...), innermost first so that equal wrappers become byte-equal
/// at the outer level. Rules in *different* blocks are never compared.
pub fn dedupe_nested_rules(stylesheet: &mut Stylesheet) {
    for rule in stylesheet.rules.iter_mut() {
        if let Rule::AtRule(at_rule) = rule {
            dedupe_at_rule_block(at_rule);
        }
    }
}

fn dedupe_at_rule_block(at_rule: &mut AtRule) {
    let Some(ref mut block) = at_rule.block else {
        return;
    };

    for value in block.value.iter_mut() {
        if let ComponentValue::AtRule(inner) = value {
            dedupe_at_rule_block(inner);
        }
    }

    let mut seen: FxHashSet<String> = FxHashSet::default();
    let mut keep = vec![true; block.value.len()];
    for (idx, value) in block.value.iter().enumerate().rev() {
        let text = match value {
            ComponentValue::QualifiedRule(_) | ComponentValue::AtRule(_) => {
                stringify_component_rule(value)
            }
            _ => continue,
        };
        if !seen.insert(text) {
            keep[idx] = false;
        }
    }
    let mut idx = 0;
    block.value.retain(|_| {
        let kept = keep[idx];
        idx += 1;
        kept
    });
}

fn stringify_component_rule(value: &ComponentValue) -> String {
    candela_transform::codegen::stringify_component_value(value, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedupe_keeps_the_later_occurrence() {
        let mut rules = vec![
            "a{color:red}".to_string(),
            "a{color:green}".to_string(),
            "a{color:red}".to_string(),
        ];
        dedupe_keep_later(&mut rules);
        assert_eq!(rules, vec!["a{color:green}".to_string(), "a{color:red}".to_string()]);
    }
}
