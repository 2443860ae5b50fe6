//! The scope analyzer.
//!
//! Walks a parsed stylesheet once, eliminating `:local`/`:global` markers,
//! interning local names, recording observed global names, lifting
//! `composes:` declarations out of rule blocks, and attributing declared
//! properties to the classes of the enclosing selector.
//!
//! Local occurrences are rewritten in place to reference atoms (see
//! `candela_core::symbol_atom`); the linker later maps every reference atom
//! to its final text.

use candela_core::{
    symbol_atom, CandelaAtom, Diagnostic, FileId, GlobalNameTable, Loader, LocalNameTable,
    NameKind,
};
use fxhash::FxHashMap;
use smallvec::SmallVec;
use swc_core::common::Span;
use swc_css_ast::{
    AtRule, AtRuleName, AtRulePrelude, ComplexSelector, ComplexSelectorChildren, ComponentValue,
    CompoundSelector, ContainerName, CustomIdent, DeclarationName, ForgivingComplexSelector,
    ForgivingRelativeSelector, Ident, KeyframesName, PseudoClassSelector,
    PseudoClassSelectorChildren, QualifiedRule, QualifiedRulePrelude, Rule, Str, Stylesheet,
    SubclassSelector,
};

use crate::atoms::is_css_wide_keyword;
use crate::compose::{parse_composes_value, ComposesDecl, ComposesSource};
use crate::util::{compound_is_empty, descendant_combinator, empty_compound};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Local,
    Global,
}

/// Properties declared for a class, used by the cascade-ambiguity check.
pub type ClassPropertyTable = FxHashMap<CandelaAtom, Vec<(CandelaAtom, Span)>>;

/// The local classes of one rule's selector list; rules rarely carry more
/// than a couple.
type LocalClassList = SmallVec<[CandelaAtom; 2]>;

/// Selector context a declaration block is analyzed under.
struct RuleCtx {
    /// Set when the selector list contains exactly one distinct local class.
    composing_class: Option<CandelaAtom>,
    /// Every distinct local class of the selector list, for property
    /// attribution.
    local_classes: LocalClassList,
}

pub struct ScopeAnalyzer {
    file: FileId,
    /// `false` for the plain `css` loader: markers are left untouched and no
    /// local names exist, but global names are still recorded.
    modes_enabled: bool,
    default_mode: Mode,
    pub locals: LocalNameTable,
    pub globals: GlobalNameTable,
    pub composes: Vec<ComposesDecl>,
    pub class_props: ClassPropertyTable,
    pub diagnostics: Vec<Diagnostic>,
}

impl ScopeAnalyzer {
    pub fn new(file: FileId, loader: Loader) -> ScopeAnalyzer {
        let (modes_enabled, default_mode) = match loader {
            Loader::LocalCss => (true, Mode::Local),
            Loader::GlobalCss => (true, Mode::Global),
            _ => (false, Mode::Global),
        };
        ScopeAnalyzer {
            file,
            modes_enabled,
            default_mode,
            locals: LocalNameTable::default(),
            globals: GlobalNameTable::default(),
            composes: Vec::new(),
            class_props: ClassPropertyTable::default(),
            diagnostics: Vec::new(),
        }
    }

    pub fn analyze(&mut self, stylesheet: &mut Stylesheet) {
        self.analyze_rule_list(&mut stylesheet.rules, self.default_mode);
    }

    fn analyze_rule_list(&mut self, rules: &mut Vec<Rule>, mode: Mode) {
        let mut idx = 0;
        while idx < rules.len() {
            let mut replacement = None;
            match &mut rules[idx] {
                Rule::QualifiedRule(rule) => {
                    if let Some(wrapper_mode) = self.wrapper_mode(&rule.prelude, mode) {
                        let mut inner = std::mem::take(&mut rule.block.value);
                        // Declarations directly inside a top-level scope
                        // wrapper have nothing to attach to and are dropped.
                        self.analyze_block_children(&mut inner, wrapper_mode, None);
                        replacement = Some(rules_from_block(inner));
                    } else {
                        self.analyze_qualified(rule, mode);
                    }
                }
                Rule::AtRule(at_rule) => self.analyze_at_rule(at_rule, mode, None),
                Rule::ListOfComponentValues(_) => {}
            }
            match replacement {
                Some(spliced) => {
                    let count = spliced.len();
                    rules.splice(idx..=idx, spliced);
                    idx += count;
                }
                None => idx += 1,
            }
        }
    }

    fn analyze_qualified(&mut self, rule: &mut QualifiedRule, mode: Mode) {
        let mut block_mode = mode;
        let mut local_classes = LocalClassList::new();

        match &mut rule.prelude {
            QualifiedRulePrelude::SelectorList(list) => {
                for selector in list.children.iter_mut() {
                    block_mode = self.rewrite_complex_selector(selector, mode, &mut local_classes);
                }
            }
            QualifiedRulePrelude::RelativeSelectorList(list) => {
                for relative in list.children.iter_mut() {
                    block_mode =
                        self.rewrite_complex_selector(&mut relative.selector, mode, &mut local_classes);
                }
            }
            QualifiedRulePrelude::ListOfComponentValues(_) => {}
        }

        local_classes.dedup();
        let composing_class = match local_classes.as_slice() {
            [single] => Some(single.clone()),
            _ => None,
        };
        let ctx = RuleCtx {
            composing_class,
            local_classes,
        };
        self.analyze_block_children(&mut rule.block.value, block_mode, Some(&ctx));
    }

    fn analyze_block_children(
        &mut self,
        values: &mut Vec<ComponentValue>,
        mode: Mode,
        ctx: Option<&RuleCtx>,
    ) {
        let mut idx = 0;
        while idx < values.len() {
            let mut remove = false;
            let mut replacement = None;
            match &mut values[idx] {
                ComponentValue::Declaration(declaration) => {
                    let is_composes = matches!(
                        &declaration.name,
                        DeclarationName::Ident(name) if name.value.eq_ignore_ascii_case("composes")
                    );
                    if is_composes {
                        self.collect_composes(declaration, mode, ctx);
                        remove = true;
                    } else {
                        self.rewrite_declaration_value(declaration, mode);
                        if let (Some(ctx), DeclarationName::Ident(name)) = (ctx, &declaration.name)
                        {
                            let property = CandelaAtom::from(name.value.to_ascii_lowercase());
                            for class in ctx.local_classes.iter() {
                                self.class_props
                                    .entry(class.clone())
                                    .or_default()
                                    .push((property.clone(), declaration.span));
                            }
                        }
                    }
                }
                ComponentValue::QualifiedRule(rule) => {
                    if let Some(wrapper_mode) = self.wrapper_mode(&rule.prelude, mode) {
                        let mut inner = std::mem::take(&mut rule.block.value);
                        // The wrapper's declarations and nested rules apply
                        // to the enclosing selector; splice them in place.
                        self.analyze_block_children(&mut inner, wrapper_mode, ctx);
                        replacement = Some(inner);
                    } else {
                        self.analyze_qualified(rule, mode);
                    }
                }
                ComponentValue::AtRule(at_rule) => self.analyze_at_rule(at_rule, mode, ctx),
                _ => {}
            }
            if remove {
                values.remove(idx);
            } else if let Some(spliced) = replacement {
                let count = spliced.len();
                values.splice(idx..=idx, spliced);
                idx += count;
            } else {
                idx += 1;
            }
        }
    }

    fn analyze_at_rule(&mut self, at_rule: &mut AtRule, mode: Mode, ctx: Option<&RuleCtx>) {
        let AtRuleName::Ident(ref name) = at_rule.name else {
            return;
        };
        let lower = name.value.to_ascii_lowercase();
        let base = lower
            .trim_start_matches("-webkit-")
            .trim_start_matches("-moz-")
            .trim_start_matches("-ms-")
            .trim_start_matches("-o-");

        let prelude = at_rule.prelude.as_deref_mut();
        match base {
            "keyframes" => {
                if let Some(AtRulePrelude::KeyframesPrelude(keyframes_name)) = prelude {
                    match keyframes_name {
                        KeyframesName::CustomIdent(custom_ident) => {
                            self.keyframes_name_occurrence_ident(&mut **custom_ident, mode);
                        }
                        KeyframesName::Str(name) => {
                            self.keyframes_name_occurrence_str(&mut **name, mode);
                        }
                        _ => {}
                    }
                }
                // Keyframe blocks contain plain declarations; names inside
                // them are not references.
            }
            "counter-style" => {
                if let Some(AtRulePrelude::CounterStylePrelude(custom_ident)) = prelude {
                    match mode {
                        Mode::Local if self.modes_enabled => {
                            self.rewrite_local_custom_ident(custom_ident, NameKind::CounterStyle);
                        }
                        _ => self.globals.record(&custom_ident.value, custom_ident.span),
                    }
                }
            }
            "container" => {
                if let Some(AtRulePrelude::ContainerPrelude(condition)) = prelude {
                    if let Some(ContainerName::CustomIdent(ref mut custom_ident)) = condition.name {
                        let reserved = custom_ident.value.eq_ignore_ascii_case("not")
                            || is_css_wide_keyword(&custom_ident.value);
                        if !reserved {
                            match mode {
                                Mode::Local if self.modes_enabled => self
                                    .rewrite_local_custom_ident(custom_ident, NameKind::Container),
                                _ => self.globals.record(&custom_ident.value, custom_ident.span),
                            }
                        }
                    }
                }
                if let Some(ref mut block) = at_rule.block {
                    self.analyze_block_children(&mut block.value, mode, ctx);
                }
            }
            "media" | "supports" | "layer" => {
                if let Some(ref mut block) = at_rule.block {
                    self.analyze_block_children(&mut block.value, mode, ctx);
                }
            }
            // `@page` margin boxes are not author-scoped content; unknown
            // at-rules keep their prelude and block verbatim.
            _ => {}
        }
    }

    // --- selectors ---

    /// Detects rules like `:global { ... }` or `:local(:global) { ... }`
    /// whose selector consists of scope markers only. Returns the scope the
    /// block contents run under.
    fn wrapper_mode(&self, prelude: &QualifiedRulePrelude, mode: Mode) -> Option<Mode> {
        if !self.modes_enabled {
            return None;
        }
        let QualifiedRulePrelude::SelectorList(list) = prelude else {
            return None;
        };
        let mut net = None;
        for selector in list.children.iter() {
            net = Some(selector_marker_mode(selector, mode)?);
        }
        net
    }

    fn rewrite_complex_selector(
        &mut self,
        selector: &mut ComplexSelector,
        start_mode: Mode,
        local_classes: &mut LocalClassList,
    ) -> Mode {
        let old = std::mem::take(&mut selector.children);
        let mut out: Vec<ComplexSelectorChildren> = Vec::with_capacity(old.len());
        let mut cur_mode = start_mode;
        let mut skip_next_combinator = false;

        for child in old {
            match child {
                ComplexSelectorChildren::Combinator(combinator) => {
                    if skip_next_combinator
                        && combinator.value == swc_css_ast::CombinatorValue::Descendant
                    {
                        skip_next_combinator = false;
                        continue;
                    }
                    skip_next_combinator = false;
                    out.push(ComplexSelectorChildren::Combinator(combinator));
                }
                ComplexSelectorChildren::CompoundSelector(compound) => {
                    let parts = self.process_compound(compound, &mut cur_mode, local_classes);
                    if parts.is_empty() {
                        // A dropped marker compound takes one adjacent
                        // descendant combinator with it.
                        match out.last() {
                            Some(ComplexSelectorChildren::Combinator(c))
                                if c.value == swc_css_ast::CombinatorValue::Descendant =>
                            {
                                out.pop();
                            }
                            _ => skip_next_combinator = true,
                        }
                    } else {
                        out.extend(parts);
                    }
                }
            }
        }

        selector.children = out;
        cur_mode
    }

    fn process_compound(
        &mut self,
        compound: CompoundSelector,
        cur_mode: &mut Mode,
        local_classes: &mut LocalClassList,
    ) -> Vec<ComplexSelectorChildren> {
        let CompoundSelector {
            span,
            nesting_selector,
            type_selector,
            subclass_selectors,
        } = compound;

        let mut flow: Vec<ComplexSelectorChildren> = Vec::new();
        let mut cur = CompoundSelector {
            span,
            nesting_selector,
            type_selector,
            subclass_selectors: Vec::new(),
        };

        for part in subclass_selectors {
            match part {
                SubclassSelector::Class(mut class) => {
                    match *cur_mode {
                        Mode::Local if self.modes_enabled => {
                            local_classes.push(class.text.value.clone());
                            self.rewrite_local_ident(&mut class.text, NameKind::Class);
                        }
                        _ => self.globals.record(&class.text.value, class.span),
                    }
                    cur.subclass_selectors.push(SubclassSelector::Class(class));
                }
                SubclassSelector::Id(mut id) => {
                    match *cur_mode {
                        Mode::Local if self.modes_enabled => {
                            self.rewrite_local_ident(&mut id.text, NameKind::Id);
                        }
                        _ => self.globals.record(&id.text.value, id.span),
                    }
                    cur.subclass_selectors.push(SubclassSelector::Id(id));
                }
                SubclassSelector::PseudoClass(mut pseudo) => {
                    let marker = if self.modes_enabled {
                        marker_mode(&pseudo)
                    } else {
                        None
                    };
                    match marker {
                        Some(mode) if pseudo.children.is_none() => {
                            // Bare shifter: scope the rest of the selector.
                            *cur_mode = mode;
                        }
                        Some(mode) => {
                            self.splice_marker_argument(
                                pseudo,
                                mode,
                                &mut cur,
                                &mut flow,
                                local_classes,
                            );
                        }
                        None => {
                            self.rewrite_pseudo_class_children(&mut pseudo, *cur_mode, local_classes);
                            cur.subclass_selectors
                                .push(SubclassSelector::PseudoClass(pseudo));
                        }
                    }
                }
                other => cur.subclass_selectors.push(other),
            }
        }

        if compound_is_empty(&cur) {
            return flow;
        }
        flow.push(ComplexSelectorChildren::CompoundSelector(cur));
        flow
    }

    /// Inlines the argument of `:local(...)` / `:global(...)` where the
    /// pseudo-class sat. The first compound of the argument merges into the
    /// host compound, later compounds follow it, and host parts written
    /// after the pseudo-class attach to the last argument compound.
    fn splice_marker_argument(
        &mut self,
        pseudo: PseudoClassSelector,
        mode: Mode,
        cur: &mut CompoundSelector,
        flow: &mut Vec<ComplexSelectorChildren>,
        local_classes: &mut LocalClassList,
    ) {
        let Some(children) = pseudo.children else {
            return;
        };

        let mut argument: Option<(Option<swc_css_ast::Combinator>, ComplexSelector)> = None;
        for child in children {
            match child {
                PseudoClassSelectorChildren::SelectorList(mut list) => {
                    if !list.children.is_empty() {
                        argument = Some((None, list.children.remove(0)));
                    }
                }
                PseudoClassSelectorChildren::ForgivingSelectorList(mut list) => {
                    for item in list.children.drain(..) {
                        if let ForgivingComplexSelector::ComplexSelector(selector) = item {
                            argument = Some((None, selector));
                            break;
                        }
                    }
                }
                PseudoClassSelectorChildren::RelativeSelectorList(mut list) => {
                    if !list.children.is_empty() {
                        let relative = list.children.remove(0);
                        argument = Some((relative.combinator, relative.selector));
                    }
                }
                PseudoClassSelectorChildren::CompoundSelector(compound) => {
                    argument = Some((
                        None,
                        ComplexSelector {
                            span: compound.span,
                            children: vec![ComplexSelectorChildren::CompoundSelector(compound)],
                        },
                    ));
                }
                _ => {}
            }
            if argument.is_some() {
                break;
            }
        }

        let Some((leading_combinator, mut selector)) = argument else {
            return;
        };
        self.rewrite_complex_selector(&mut selector, mode, local_classes);

        let mut pending_combinator = leading_combinator;
        for child in selector.children {
            match child {
                ComplexSelectorChildren::Combinator(combinator) => {
                    pending_combinator = Some(combinator);
                }
                ComplexSelectorChildren::CompoundSelector(compound) => {
                    if let Some(combinator) = pending_combinator.take() {
                        if !compound_is_empty(cur) || !flow.is_empty() {
                            flow.push(ComplexSelectorChildren::CompoundSelector(std::mem::replace(
                                cur,
                                empty_compound(),
                            )));
                            flow.push(ComplexSelectorChildren::Combinator(combinator));
                        }
                        *cur = compound;
                    } else {
                        merge_compound(cur, compound, flow);
                    }
                }
            }
        }
    }

    /// Re-analyzes selector lists nested inside functional pseudo-classes
    /// (`:is()`, `:not()`, `:nth-child(... of S)`, ...). Each inner selector
    /// starts from the scope active at the pseudo-class.
    fn rewrite_pseudo_class_children(
        &mut self,
        pseudo: &mut PseudoClassSelector,
        mode: Mode,
        local_classes: &mut LocalClassList,
    ) {
        let Some(ref mut children) = pseudo.children else {
            return;
        };
        for child in children.iter_mut() {
            match child {
                PseudoClassSelectorChildren::SelectorList(list) => {
                    for selector in list.children.iter_mut() {
                        self.rewrite_complex_selector(selector, mode, local_classes);
                    }
                }
                PseudoClassSelectorChildren::ForgivingSelectorList(list) => {
                    for item in list.children.iter_mut() {
                        if let ForgivingComplexSelector::ComplexSelector(selector) = item {
                            self.rewrite_complex_selector(selector, mode, local_classes);
                        }
                    }
                }
                PseudoClassSelectorChildren::RelativeSelectorList(list) => {
                    for relative in list.children.iter_mut() {
                        self.rewrite_complex_selector(&mut relative.selector, mode, local_classes);
                    }
                }
                PseudoClassSelectorChildren::ForgivingRelativeSelectorList(list) => {
                    for item in list.children.iter_mut() {
                        if let ForgivingRelativeSelector::RelativeSelector(relative) = item {
                            self.rewrite_complex_selector(
                                &mut relative.selector,
                                mode,
                                local_classes,
                            );
                        }
                    }
                }
                _ => {}
            }
        }
    }

    // --- declarations ---

    fn collect_composes(
        &mut self,
        declaration: &mut swc_css_ast::Declaration,
        mode: Mode,
        ctx: Option<&RuleCtx>,
    ) {
        let span = ComposesDecl::span_of(&declaration.value, declaration.span);

        let Some(class) = ctx.and_then(|ctx| ctx.composing_class.clone()) else {
            self.diagnostics.push(Diagnostic::warning(
                self.file,
                span,
                "\"composes\" is ignored here because it is not inside a single local class \
                 selector",
            ));
            return;
        };

        let Some((names, source)) = parse_composes_value(&declaration.value) else {
            self.diagnostics.push(Diagnostic::warning(
                self.file,
                span,
                "Invalid value for \"composes\"",
            ));
            return;
        };

        // Inside a `:global` context, bare targets are global names.
        let source = match source {
            ComposesSource::SameFile if mode == Mode::Global => ComposesSource::Global,
            other => other,
        };

        self.composes.push(ComposesDecl {
            span,
            class,
            names,
            source,
        });
    }

    // --- name bookkeeping ---

    pub(crate) fn rewrite_local_ident(&mut self, ident: &mut Ident, kind: NameKind) {
        self.locals.intern(self.file, &ident.value, kind, ident.span);
        ident.value = symbol_atom(self.file, &ident.value);
        ident.raw = None;
    }

    fn rewrite_local_custom_ident(&mut self, ident: &mut CustomIdent, kind: NameKind) {
        self.locals.intern(self.file, &ident.value, kind, ident.span);
        ident.value = symbol_atom(self.file, &ident.value);
        ident.raw = None;
    }

    fn keyframes_name_occurrence_ident(&mut self, name: &mut CustomIdent, mode: Mode) {
        match mode {
            Mode::Local if self.modes_enabled => {
                self.rewrite_local_custom_ident(name, NameKind::Animation)
            }
            _ => self.globals.record(&name.value, name.span),
        }
    }

    fn keyframes_name_occurrence_str(&mut self, name: &mut Str, mode: Mode) {
        match mode {
            Mode::Local if self.modes_enabled => {
                self.locals
                    .intern(self.file, &name.value, NameKind::Animation, name.span);
                name.value = symbol_atom(self.file, &name.value);
                name.raw = None;
            }
            _ => self.globals.record(&name.value, name.span),
        }
    }
}

/// Returns the resulting mode when `selector` consists of scope markers
/// only, recursing into functional markers (`:local(:global)`).
fn selector_marker_mode(selector: &ComplexSelector, base: Mode) -> Option<Mode> {
    let mut mode = base;
    for child in selector.children.iter() {
        let ComplexSelectorChildren::CompoundSelector(compound) = child else {
            return None;
        };
        if compound.nesting_selector.is_some() || compound.type_selector.is_some() {
            return None;
        }
        for part in compound.subclass_selectors.iter() {
            let SubclassSelector::PseudoClass(pseudo) = part else {
                return None;
            };
            let marker = marker_mode(pseudo)?;
            match pseudo.children {
                None => mode = marker,
                Some(ref children) => {
                    let mut inner = None;
                    for child in children.iter() {
                        match child {
                            PseudoClassSelectorChildren::SelectorList(list) => {
                                for selector in list.children.iter() {
                                    inner = Some(selector_marker_mode(selector, marker)?);
                                }
                            }
                            _ => return None,
                        }
                    }
                    mode = inner?;
                }
            }
        }
    }
    Some(mode)
}

fn marker_mode(pseudo: &PseudoClassSelector) -> Option<Mode> {
    if pseudo.name.value.eq_ignore_ascii_case("local") {
        Some(Mode::Local)
    } else if pseudo.name.value.eq_ignore_ascii_case("global") {
        Some(Mode::Global)
    } else {
        None
    }
}

/// Merges `incoming` into `cur`. A type selector cannot join a compound
/// that already has content; it starts a new descendant compound instead.
fn merge_compound(
    cur: &mut CompoundSelector,
    incoming: CompoundSelector,
    flow: &mut Vec<ComplexSelectorChildren>,
) {
    let cur_has_content = cur.nesting_selector.is_some()
        || cur.type_selector.is_some()
        || !cur.subclass_selectors.is_empty();

    if incoming.type_selector.is_some() && cur_has_content {
        flow.push(ComplexSelectorChildren::CompoundSelector(std::mem::replace(
            cur,
            empty_compound(),
        )));
        flow.push(ComplexSelectorChildren::Combinator(descendant_combinator()));
        *cur = incoming;
        return;
    }

    if cur.nesting_selector.is_none() {
        cur.nesting_selector = incoming.nesting_selector;
    }
    if cur.type_selector.is_none() {
        cur.type_selector = incoming.type_selector;
    }
    cur.subclass_selectors.extend(incoming.subclass_selectors);
}

fn rules_from_block(values: Vec<ComponentValue>) -> Vec<Rule> {
    values
        .into_iter()
        .filter_map(|value| match value {
            ComponentValue::QualifiedRule(rule) => Some(Rule::QualifiedRule(rule)),
            ComponentValue::AtRule(at_rule) => Some(Rule::AtRule(at_rule)),
            _ => None,
        })
        .collect()
}
