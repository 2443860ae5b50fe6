//! Keyword tables used while deciding which identifiers may be rewritten,
//! plus the atoms injected into synthesized selector nodes.

use candela_core::CandelaAtom;

lazy_static! {
    /// `:is(...)`, synthesized by the nesting lowerer.
    pub static ref IS: CandelaAtom = CandelaAtom::from("is");
    /// `:scope`, what a top-level lone `&` lowers to.
    pub static ref SCOPE: CandelaAtom = CandelaAtom::from("scope");
}

/// CSS-wide keywords, never rewritten, matched case-insensitively.
pub static CSS_WIDE_KEYWORDS: phf::Set<&'static str> = phf::phf_set! {
    "inherit",
    "initial",
    "unset",
    "revert",
    "revert-layer",
};

/// Single-keyword values of the `animation` shorthand that can never be an
/// animation name.
pub static ANIMATION_SHORTHAND_RESERVED: phf::Set<&'static str> = phf::phf_set! {
    "none",
    "normal",
    "reverse",
    "alternate",
    "alternate-reverse",
    "forwards",
    "backwards",
    "both",
    "running",
    "paused",
    "infinite",
    "linear",
    "ease",
    "ease-in",
    "ease-out",
    "ease-in-out",
    "step-start",
    "step-end",
};

/// Predefined `<counter-style-name>` values; using one of these as a
/// `list-style-type` refers to the built-in style, not a local name.
pub static PREDEFINED_COUNTER_STYLES: phf::Set<&'static str> = phf::phf_set! {
    "arabic-indic",
    "armenian",
    "bengali",
    "cambodian",
    "circle",
    "cjk-decimal",
    "cjk-earthly-branch",
    "cjk-heavenly-stem",
    "cjk-ideographic",
    "decimal",
    "decimal-leading-zero",
    "devanagari",
    "disc",
    "disclosure-closed",
    "disclosure-open",
    "ethiopic-numeric",
    "georgian",
    "gujarati",
    "gurmukhi",
    "hebrew",
    "hiragana",
    "hiragana-iroha",
    "japanese-formal",
    "japanese-informal",
    "kannada",
    "katakana",
    "katakana-iroha",
    "khmer",
    "korean-hangul-formal",
    "korean-hanja-formal",
    "korean-hanja-informal",
    "lao",
    "lower-alpha",
    "lower-armenian",
    "lower-greek",
    "lower-latin",
    "lower-roman",
    "malayalam",
    "mongolian",
    "myanmar",
    "oriya",
    "persian",
    "simp-chinese-formal",
    "simp-chinese-informal",
    "square",
    "tamil",
    "telugu",
    "thai",
    "tibetan",
    "trad-chinese-formal",
    "trad-chinese-informal",
    "upper-alpha",
    "upper-armenian",
    "upper-latin",
    "upper-roman",
};

/// `list-style-position` keywords.
pub static LIST_STYLE_POSITIONS: phf::Set<&'static str> = phf::phf_set! {
    "inside",
    "outside",
};

/// Functions whose presence in a `list-style` shorthand fills the image slot.
pub static IMAGE_FUNCTIONS: phf::Set<&'static str> = phf::phf_set! {
    "url",
    "image-set",
    "linear-gradient",
    "radial-gradient",
    "conic-gradient",
    "repeating-linear-gradient",
    "repeating-radial-gradient",
    "repeating-conic-gradient",
};

pub fn is_css_wide_keyword(ident: &str) -> bool {
    CSS_WIDE_KEYWORDS.contains(ident.to_ascii_lowercase().as_str())
}

pub fn is_predefined_counter_style(ident: &str) -> bool {
    PREDEFINED_COUNTER_STYLES.contains(ident.to_ascii_lowercase().as_str())
}
