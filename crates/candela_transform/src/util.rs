use candela_core::CandelaAtom;
use swc_core::common::DUMMY_SP;
use swc_css_ast::{
    Combinator, CombinatorValue, CompoundSelector, Function, FunctionName, Ident,
};

pub fn function_name(function: &Function) -> Option<&CandelaAtom> {
    match &function.name {
        FunctionName::Ident(ident) => Some(&ident.value),
        _ => None,
    }
}

pub fn make_ident(value: impl Into<CandelaAtom>) -> Ident {
    Ident {
        span: DUMMY_SP,
        value: value.into(),
        raw: None,
    }
}

pub fn descendant_combinator() -> Combinator {
    Combinator {
        span: DUMMY_SP,
        value: CombinatorValue::Descendant,
    }
}

pub fn empty_compound() -> CompoundSelector {
    CompoundSelector {
        span: DUMMY_SP,
        nesting_selector: None,
        type_selector: None,
        subclass_selectors: vec![],
    }
}

pub fn compound_is_empty(compound: &CompoundSelector) -> bool {
    compound.nesting_selector.is_none()
        && compound.type_selector.is_none()
        && compound.subclass_selectors.is_empty()
}
