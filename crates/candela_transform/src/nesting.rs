//! Lowering of CSS nesting to flat, `:is()`-based selectors.
//!
//! Runs only when the target environment lacks native nesting. Nested
//! qualified rules are hoisted behind their parent with concatenated
//! selectors; nested conditional at-rules are lifted with the parent
//! selector re-applied inside. `@page` margin rules are not nesting and are
//! left alone.

use candela_core::{Diagnostic, FileId, Note};
use swc_core::common::DUMMY_SP;
use swc_css_ast::{
    AtRule, AtRuleName, CombinatorValue, ComplexSelector, ComplexSelectorChildren, ComponentValue,
    CompoundSelector, ListOfComponentValues, PseudoClassSelector, QualifiedRule,
    QualifiedRulePrelude, Rule, SelectorList, SimpleBlock, Stylesheet, SubclassSelector, Token,
    TokenAndSpan,
};

use crate::atoms::{IS, SCOPE};
use crate::util::{compound_is_empty, descendant_combinator, make_ident};

pub fn lower_nesting(
    file: FileId,
    stylesheet: &mut Stylesheet,
    is_pseudo_supported: bool,
    target_env: Option<&str>,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let mut lowerer = NestingLowerer {
        file,
        is_pseudo_supported,
        target_env: target_env.unwrap_or("unknown").to_string(),
        diagnostics,
    };
    lowerer.lower_stylesheet(stylesheet);
}

enum Lowered {
    Qualified(Box<QualifiedRule>),
    At(Box<AtRule>),
}

struct NestingLowerer<'a> {
    file: FileId,
    is_pseudo_supported: bool,
    target_env: String,
    diagnostics: &'a mut Vec<Diagnostic>,
}

impl NestingLowerer<'_> {
    fn lower_stylesheet(&mut self, stylesheet: &mut Stylesheet) {
        let rules = std::mem::take(&mut stylesheet.rules);
        let mut out = Vec::with_capacity(rules.len());
        for rule in rules {
            match rule {
                Rule::QualifiedRule(rule) => {
                    let mut items = Vec::new();
                    self.lower_rule(rule, None, &mut items);
                    out.extend(items.into_iter().map(|item| match item {
                        Lowered::Qualified(rule) => Rule::QualifiedRule(rule),
                        Lowered::At(at_rule) => Rule::AtRule(at_rule),
                    }));
                }
                Rule::AtRule(mut at_rule) => {
                    self.lower_top_at_rule(&mut at_rule);
                    out.push(Rule::AtRule(at_rule));
                }
                other => out.push(other),
            }
        }
        stylesheet.rules = out;
    }

    /// Conditional at-rules at the top level may hold qualified rules with
    /// their own nesting; everything else is left as found.
    fn lower_top_at_rule(&mut self, at_rule: &mut AtRule) {
        if !is_conditional_at_rule(at_rule) {
            return;
        }
        let Some(ref mut block) = at_rule.block else {
            return;
        };
        let values = std::mem::take(&mut block.value);
        let mut out = Vec::with_capacity(values.len());
        for value in values {
            match value {
                ComponentValue::QualifiedRule(rule) => {
                    let mut items = Vec::new();
                    self.lower_rule(rule, None, &mut items);
                    out.extend(items.into_iter().map(lowered_to_component_value));
                }
                ComponentValue::AtRule(mut inner) => {
                    self.lower_top_at_rule(&mut inner);
                    out.push(ComponentValue::AtRule(inner));
                }
                other => out.push(other),
            }
        }
        block.value = out;
    }

    fn lower_rule(
        &mut self,
        mut rule: Box<QualifiedRule>,
        parent: Option<&SelectorList>,
        out: &mut Vec<Lowered>,
    ) {
        let resolved = match std::mem::replace(
            &mut rule.prelude,
            QualifiedRulePrelude::SelectorList(SelectorList {
                span: DUMMY_SP,
                children: vec![],
            }),
        ) {
            QualifiedRulePrelude::SelectorList(list) => {
                let selectors = list.children.into_iter().map(|s| (None, s)).collect();
                self.resolve_selectors(selectors, list.span, parent, rule.span)
            }
            QualifiedRulePrelude::RelativeSelectorList(list) => {
                let selectors = list
                    .children
                    .into_iter()
                    .map(|relative| (relative.combinator, relative.selector))
                    .collect();
                self.resolve_selectors(selectors, list.span, parent, rule.span)
            }
            QualifiedRulePrelude::ListOfComponentValues(list) => {
                // The parser could not make a selector list out of this
                // prelude. If it contains a nesting selector there is
                // nothing we can do with it.
                if list_contains_nesting_token(&list) {
                    self.warn_unsupported(rule.span);
                }
                rule.prelude = QualifiedRulePrelude::ListOfComponentValues(list);
                out.push(Lowered::Qualified(rule));
                return;
            }
        };

        let values = std::mem::take(&mut rule.block.value);
        let mut kept = Vec::with_capacity(values.len());
        let mut nested = Vec::new();
        for value in values {
            match value {
                ComponentValue::QualifiedRule(inner) => nested.push(Lowered::Qualified(inner)),
                ComponentValue::AtRule(inner) if is_conditional_at_rule(&inner) => {
                    nested.push(Lowered::At(inner))
                }
                other => kept.push(other),
            }
        }

        rule.block.value = kept;
        rule.prelude = QualifiedRulePrelude::SelectorList(resolved.clone());
        if !rule.block.value.is_empty() || nested.is_empty() {
            out.push(Lowered::Qualified(rule));
        }

        for item in nested {
            match item {
                Lowered::Qualified(inner) => self.lower_rule(inner, Some(&resolved), out),
                Lowered::At(inner) => self.lower_nested_at_rule(inner, &resolved, out),
            }
        }
    }

    /// `a { @media screen { color: red } }` becomes
    /// `@media screen { a { color: red } }`.
    fn lower_nested_at_rule(
        &mut self,
        mut at_rule: Box<AtRule>,
        parent: &SelectorList,
        out: &mut Vec<Lowered>,
    ) {
        let Some(ref mut block) = at_rule.block else {
            out.push(Lowered::At(at_rule));
            return;
        };

        let values = std::mem::take(&mut block.value);
        let mut declarations = Vec::new();
        let mut lowered = Vec::new();
        for value in values {
            match value {
                ComponentValue::QualifiedRule(inner) => {
                    let mut items = Vec::new();
                    self.lower_rule(inner, Some(parent), &mut items);
                    lowered.extend(items.into_iter().map(lowered_to_component_value));
                }
                ComponentValue::AtRule(inner) if is_conditional_at_rule(&inner) => {
                    let mut items = Vec::new();
                    self.lower_nested_at_rule(inner, parent, &mut items);
                    lowered.extend(items.into_iter().map(lowered_to_component_value));
                }
                other => declarations.push(other),
            }
        }

        let mut inner = Vec::with_capacity(lowered.len() + 1);
        if declarations.iter().any(is_substantive_component_value) {
            inner.push(ComponentValue::QualifiedRule(Box::new(QualifiedRule {
                span: DUMMY_SP,
                prelude: QualifiedRulePrelude::SelectorList(parent.clone()),
                block: SimpleBlock {
                    span: DUMMY_SP,
                    name: TokenAndSpan {
                        span: DUMMY_SP,
                        token: Token::LBrace,
                    },
                    value: declarations,
                },
            })));
        }
        inner.extend(lowered);
        block.value = inner;

        out.push(Lowered::At(at_rule));
    }

    // --- selector resolution ---

    fn resolve_selectors(
        &mut self,
        selectors: Vec<(Option<swc_css_ast::Combinator>, ComplexSelector)>,
        span: swc_core::common::Span,
        parent: Option<&SelectorList>,
        rule_span: swc_core::common::Span,
    ) -> SelectorList {
        let mut needs_is = false;
        let children = selectors
            .into_iter()
            .map(|(combinator, selector)| match parent {
                Some(parent) => {
                    self.resolve_against_parent(combinator, selector, parent, &mut needs_is)
                }
                None => strip_top_level_nesting(selector),
            })
            .collect();

        if needs_is && !self.is_pseudo_supported {
            self.warn_unsupported(rule_span);
        }

        SelectorList { span, children }
    }

    fn resolve_against_parent(
        &mut self,
        leading_combinator: Option<swc_css_ast::Combinator>,
        mut selector: ComplexSelector,
        parent: &SelectorList,
        needs_is: &mut bool,
    ) -> ComplexSelector {
        let multi_parent = parent.children.len() > 1;
        let has_nesting = selector
            .children
            .iter()
            .any(|child| matches!(child, ComplexSelectorChildren::CompoundSelector(c) if c.nesting_selector.is_some()));

        // No `&` and no leading combinator: an implicit descendant of the
        // parent.
        if !has_nesting {
            let mut children = if multi_parent {
                *needs_is = true;
                vec![ComplexSelectorChildren::CompoundSelector(is_wrapper(parent))]
            } else {
                parent.children[0].children.clone()
            };
            children.push(ComplexSelectorChildren::Combinator(
                leading_combinator.unwrap_or_else(descendant_combinator),
            ));
            children.append(&mut selector.children);
            selector.children = children;
            return selector;
        }

        enum Repr {
            SpliceComplex,
            Compound,
            Is,
        }

        let repr = if multi_parent {
            Repr::Is
        } else if parent.children[0].children.len() == 1 {
            Repr::Compound
        } else {
            let nesting_count = selector
                .children
                .iter()
                .filter(|child| {
                    matches!(child, ComplexSelectorChildren::CompoundSelector(c) if c.nesting_selector.is_some())
                })
                .count();
            let leading_lone_nesting = matches!(
                selector.children.first(),
                Some(ComplexSelectorChildren::CompoundSelector(c))
                    if c.nesting_selector.is_some()
                        && c.type_selector.is_none()
                        && c.subclass_selectors.is_empty()
            );
            if nesting_count == 1 && leading_lone_nesting {
                Repr::SpliceComplex
            } else {
                Repr::Is
            }
        };
        if matches!(repr, Repr::Is) {
            *needs_is = true;
        }

        let old = std::mem::take(&mut selector.children);
        let mut children = Vec::with_capacity(old.len() + 2);
        for child in old {
            match child {
                ComplexSelectorChildren::Combinator(combinator) => {
                    children.push(ComplexSelectorChildren::Combinator(combinator));
                }
                ComplexSelectorChildren::CompoundSelector(mut compound) => {
                    if compound.nesting_selector.is_none() {
                        children.push(ComplexSelectorChildren::CompoundSelector(compound));
                        continue;
                    }
                    compound.nesting_selector = None;
                    let lone = compound_is_empty(&compound);
                    match repr {
                        Repr::SpliceComplex => {
                            children.extend(parent.children[0].children.iter().cloned());
                            if !lone {
                                // Trailing parts of the `&` compound attach
                                // to the last parent compound.
                                if let Some(ComplexSelectorChildren::CompoundSelector(last)) =
                                    children.last_mut()
                                {
                                    last.subclass_selectors
                                        .append(&mut compound.subclass_selectors);
                                }
                            }
                        }
                        Repr::Compound => {
                            let ComplexSelectorChildren::CompoundSelector(parent_compound) =
                                &parent.children[0].children[0]
                            else {
                                unreachable!()
                            };
                            let mut merged = parent_compound.clone();
                            merged.subclass_selectors.append(&mut compound.subclass_selectors);
                            children.push(ComplexSelectorChildren::CompoundSelector(merged));
                        }
                        Repr::Is => {
                            let mut merged = CompoundSelector {
                                span: compound.span,
                                nesting_selector: None,
                                type_selector: None,
                                subclass_selectors: vec![SubclassSelector::PseudoClass(
                                    is_pseudo(parent),
                                )],
                            };
                            merged.subclass_selectors.append(&mut compound.subclass_selectors);
                            children.push(ComplexSelectorChildren::CompoundSelector(merged));
                        }
                    }
                }
            }
        }
        if let Some(combinator) = leading_combinator {
            let mut with_parent = vec![
                ComplexSelectorChildren::CompoundSelector(is_wrapper(parent)),
                ComplexSelectorChildren::Combinator(combinator),
            ];
            with_parent.append(&mut children);
            children = with_parent;
            *needs_is = true;
        }
        selector.children = children;
        selector
    }

    fn warn_unsupported(&mut self, span: swc_core::common::Span) {
        self.diagnostics.push(
            Diagnostic::warning(
                self.file,
                span,
                format!(
                    "Transforming this CSS nesting syntax is not supported in the configured \
                     target environment ({})",
                    self.target_env
                ),
            )
            .with_note(Note::hint(
                "The nesting transform for this case must generate an \":is(...)\" but the \
                 configured target environment does not support the \":is\" pseudo-class.",
            )),
        );
    }
}

fn lowered_to_component_value(item: Lowered) -> ComponentValue {
    match item {
        Lowered::Qualified(rule) => ComponentValue::QualifiedRule(rule),
        Lowered::At(at_rule) => ComponentValue::AtRule(at_rule),
    }
}

fn is_conditional_at_rule(at_rule: &AtRule) -> bool {
    let AtRuleName::Ident(ref name) = at_rule.name else {
        return false;
    };
    let lower = name.value.to_ascii_lowercase();
    matches!(lower.as_str(), "media" | "supports" | "layer" | "container")
        && at_rule.block.is_some()
}

fn is_substantive_component_value(value: &ComponentValue) -> bool {
    !matches!(value, ComponentValue::PreservedToken(_))
}

fn is_pseudo(parent: &SelectorList) -> PseudoClassSelector {
    PseudoClassSelector {
        span: DUMMY_SP,
        name: make_ident(IS.clone()),
        children: Some(vec![
            swc_css_ast::PseudoClassSelectorChildren::SelectorList(parent.clone()),
        ]),
    }
}

fn is_wrapper(parent: &SelectorList) -> CompoundSelector {
    CompoundSelector {
        span: DUMMY_SP,
        nesting_selector: None,
        type_selector: None,
        subclass_selectors: vec![SubclassSelector::PseudoClass(is_pseudo(parent))],
    }
}

/// At the top level `&` has no parent; `& a` means `a` and a lone `&`
/// becomes `:scope`.
fn strip_top_level_nesting(mut selector: ComplexSelector) -> ComplexSelector {
    let old = std::mem::take(&mut selector.children);
    let mut out: Vec<ComplexSelectorChildren> = Vec::with_capacity(old.len());
    let mut skip_next_combinator = false;
    for child in old {
        match child {
            ComplexSelectorChildren::Combinator(combinator) => {
                if skip_next_combinator && combinator.value == CombinatorValue::Descendant {
                    skip_next_combinator = false;
                    continue;
                }
                skip_next_combinator = false;
                out.push(ComplexSelectorChildren::Combinator(combinator));
            }
            ComplexSelectorChildren::CompoundSelector(mut compound) => {
                compound.nesting_selector = None;
                if compound_is_empty(&compound) {
                    match out.last() {
                        Some(ComplexSelectorChildren::Combinator(c))
                            if c.value == CombinatorValue::Descendant =>
                        {
                            out.pop();
                        }
                        _ => skip_next_combinator = true,
                    }
                } else {
                    out.push(ComplexSelectorChildren::CompoundSelector(compound));
                }
            }
        }
    }
    if out.is_empty() {
        out.push(ComplexSelectorChildren::CompoundSelector(CompoundSelector {
            span: DUMMY_SP,
            nesting_selector: None,
            type_selector: None,
            subclass_selectors: vec![SubclassSelector::PseudoClass(PseudoClassSelector {
                span: DUMMY_SP,
                name: make_ident(SCOPE.clone()),
                children: None,
            })],
        }));
    }
    selector.children = out;
    selector
}

fn list_contains_nesting_token(list: &ListOfComponentValues) -> bool {
    list.children.iter().any(|value| {
        matches!(
            value,
            ComponentValue::PreservedToken(token)
                if matches!(token.token, Token::Delim { value: '&' })
        )
    })
}
