//! Rewriting of identifiers inside declaration values.
//!
//! Only a handful of properties can reference scoped names: the animation
//! properties, the list-style properties, and the container properties.
//! Strings are never rewritten, and each property family carries its own
//! reserved-word table.

use candela_core::NameKind;
use swc_css_ast::{ComponentValue, Declaration, DeclarationName, DelimiterValue, Ident};

use crate::atoms::{
    is_css_wide_keyword, is_predefined_counter_style, ANIMATION_SHORTHAND_RESERVED,
    IMAGE_FUNCTIONS, LIST_STYLE_POSITIONS,
};
use crate::scope::{Mode, ScopeAnalyzer};
use crate::util::function_name;

impl ScopeAnalyzer {
    pub(crate) fn rewrite_declaration_value(&mut self, declaration: &mut Declaration, mode: Mode) {
        let DeclarationName::Ident(ref name) = declaration.name else {
            // Custom properties carry opaque values.
            return;
        };
        let property = name.value.to_ascii_lowercase();

        match property.as_str() {
            "animation-name" => self.rewrite_animation_name(&mut declaration.value, mode),
            "animation" => self.rewrite_animation_shorthand(&mut declaration.value, mode),
            "list-style-type" => self.rewrite_list_style_type(&mut declaration.value, mode),
            "list-style" => self.rewrite_list_style_shorthand(&mut declaration.value, mode),
            "container-name" => self.rewrite_container_names(&mut declaration.value, mode, false),
            "container" => self.rewrite_container_names(&mut declaration.value, mode, true),
            _ => {}
        }
    }

    fn rewrite_animation_name(&mut self, values: &mut [ComponentValue], mode: Mode) {
        for value in values.iter_mut() {
            if let ComponentValue::Ident(ident) = value {
                if !is_animation_name_reserved(&ident.value) {
                    self.name_occurrence(ident, NameKind::Animation, mode);
                }
            }
        }
    }

    fn rewrite_animation_shorthand(&mut self, values: &mut [ComponentValue], mode: Mode) {
        for value in values.iter_mut() {
            if let ComponentValue::Ident(ident) = value {
                let lower = ident.value.to_ascii_lowercase();
                if !ANIMATION_SHORTHAND_RESERVED.contains(lower.as_str())
                    && !is_css_wide_keyword(&ident.value)
                {
                    self.name_occurrence(ident, NameKind::Animation, mode);
                }
            }
        }
    }

    fn rewrite_list_style_type(&mut self, values: &mut [ComponentValue], mode: Mode) {
        for value in values.iter_mut() {
            if let ComponentValue::Ident(ident) = value {
                if !is_list_style_type_reserved(&ident.value) {
                    self.name_occurrence(ident, NameKind::ListStyle, mode);
                }
            }
        }
    }

    /// The `list-style` shorthand mixes the type, position and image slots.
    /// The first identifier that cannot be anything else is the type name;
    /// when an image is present, a `none` fills the type slot instead and
    /// later identifiers are left alone.
    fn rewrite_list_style_shorthand(&mut self, values: &mut [ComponentValue], mode: Mode) {
        let mut has_image = false;
        let mut has_none = false;
        let mut candidate: Option<usize> = None;

        for (idx, value) in values.iter().enumerate() {
            match value {
                ComponentValue::Url(_) => has_image = true,
                ComponentValue::Function(function) => {
                    if let Some(name) = function_name(function) {
                        if IMAGE_FUNCTIONS.contains(name.to_ascii_lowercase().as_str()) {
                            has_image = true;
                        }
                    }
                }
                ComponentValue::Ident(ident) => {
                    let lower = ident.value.to_ascii_lowercase();
                    if lower == "none" {
                        has_none = true;
                    } else if !is_list_style_type_reserved(&ident.value) && candidate.is_none() {
                        candidate = Some(idx);
                    }
                }
                _ => {}
            }
        }

        // With both an image and a `none` present, `none` is the type.
        if has_image && has_none {
            return;
        }
        if let Some(idx) = candidate {
            if let ComponentValue::Ident(ident) = &mut values[idx] {
                self.name_occurrence(ident, NameKind::ListStyle, mode);
            }
        }
    }

    fn rewrite_container_names(&mut self, values: &mut [ComponentValue], mode: Mode, shorthand: bool) {
        for value in values.iter_mut() {
            match value {
                // In the shorthand, everything after `/` is the size.
                ComponentValue::Delimiter(delimiter)
                    if shorthand && delimiter.value == DelimiterValue::Solidus =>
                {
                    break;
                }
                ComponentValue::PreservedToken(token)
                    if shorthand
                        && matches!(token.token, swc_css_ast::Token::Delim { value: '/' }) =>
                {
                    break;
                }
                ComponentValue::Ident(ident) => {
                    let lower = ident.value.to_ascii_lowercase();
                    if lower != "none" && !is_css_wide_keyword(&ident.value) {
                        self.name_occurrence(ident, NameKind::Container, mode);
                    }
                }
                _ => {}
            }
        }
    }

    /// Records one identifier occurrence: local occurrences are interned and
    /// rewritten to their reference atom, global ones only feed the
    /// avoidance set.
    pub(crate) fn name_occurrence(&mut self, ident: &mut Ident, kind: NameKind, mode: Mode) {
        match mode {
            Mode::Local => self.rewrite_local_ident(ident, kind),
            Mode::Global => self.globals.record(&ident.value, ident.span),
        }
    }
}

fn is_animation_name_reserved(ident: &str) -> bool {
    ident.eq_ignore_ascii_case("none") || is_css_wide_keyword(ident)
}

fn is_list_style_type_reserved(ident: &str) -> bool {
    ident.eq_ignore_ascii_case("none")
        || is_css_wide_keyword(ident)
        || is_predefined_counter_style(ident)
        || LIST_STYLE_POSITIONS.contains(ident.to_ascii_lowercase().as_str())
}
