//! Application of final names to a scanned stylesheet.
//!
//! Scope analysis leaves reference atoms behind wherever a local name
//! occurred; the linker computes the final text for every reference and this
//! walk swaps them in. Reference atoms embed a control character, so an
//! exact-match walk over every identifier-shaped node is safe.

use candela_core::CandelaAtom;
use fxhash::FxHashMap;
use swc_css_ast::{CustomIdent, Ident, Str, Stylesheet};
use swc_css_visit::{VisitMut, VisitMutWith};

struct NameReplacer<'a> {
    map: &'a FxHashMap<CandelaAtom, CandelaAtom>,
}

impl VisitMut for NameReplacer<'_> {
    fn visit_mut_ident(&mut self, ident: &mut Ident) {
        ident.visit_mut_children_with(self);
        if let Some(new_text) = self.map.get(&ident.value) {
            ident.value = new_text.clone();
            ident.raw = None;
        }
    }

    fn visit_mut_custom_ident(&mut self, ident: &mut CustomIdent) {
        ident.visit_mut_children_with(self);
        if let Some(new_text) = self.map.get(&ident.value) {
            ident.value = new_text.clone();
            ident.raw = None;
        }
    }

    // Keyframes may be declared with a string name.
    fn visit_mut_str(&mut self, s: &mut Str) {
        s.visit_mut_children_with(self);
        if let Some(new_text) = self.map.get(&s.value) {
            s.value = new_text.clone();
            s.raw = None;
        }
    }
}

pub fn replace_names(stylesheet: &mut Stylesheet, map: &FxHashMap<CandelaAtom, CandelaAtom>) {
    if map.is_empty() {
        return;
    }
    stylesheet.visit_mut_with(&mut NameReplacer { map });
}
