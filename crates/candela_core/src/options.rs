use flagset::{flags, FlagSet};
use fxhash::{FxHashMap, FxHashSet};

use crate::Loader;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Bundle,
    /// Disables `@import` inlining and emits each entry unchanged.
    PassThrough,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    EsModule,
    CommonJs,
}

flags! {
    /// CSS features the target environment is missing.
    pub enum CssFeature: u8 {
        Nesting,
        IsPseudoClass,
    }
}

pub type CssFeatureSet = FlagSet<CssFeature>;

/// A prefix/suffix wildcard, the only pattern shape external matchers use.
/// `*.png` is `{ prefix: "", suffix: ".png" }`.
#[derive(Debug, Clone, Default)]
pub struct WildcardPattern {
    pub prefix: String,
    pub suffix: String,
}

impl WildcardPattern {
    pub fn suffix(suffix: impl Into<String>) -> WildcardPattern {
        WildcardPattern {
            prefix: String::new(),
            suffix: suffix.into(),
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        path.len() >= self.prefix.len() + self.suffix.len()
            && path.starts_with(&self.prefix)
            && path.ends_with(&self.suffix)
    }
}

/// Paths to keep out of the bundle.
///
/// `pre_resolve` patterns run against the raw import spec; `post_resolve`
/// exact paths run after the spec has been normalized against the importing
/// file's directory.
#[derive(Debug, Clone, Default)]
pub struct ExternalSettings {
    pub pre_resolve: Vec<WildcardPattern>,
    pub post_resolve: FxHashSet<String>,
}

impl ExternalSettings {
    pub fn matches_pre_resolve(&self, spec: &str) -> bool {
        self.pre_resolve.iter().any(|pattern| pattern.matches(spec))
    }

    pub fn matches_post_resolve(&self, abs_path: &str) -> bool {
        self.post_resolve.contains(abs_path)
    }

    pub fn is_empty(&self) -> bool {
        self.pre_resolve.is_empty() && self.post_resolve.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct BundleOptions {
    pub mode: Mode,
    pub entry_paths: Vec<String>,
    pub abs_output_file: Option<String>,
    pub abs_output_dir: Option<String>,
    pub write_to_stdout: bool,
    /// Explicit extension-to-loader table; empty means the default table.
    pub extension_to_loader: FxHashMap<String, Loader>,
    /// Extensions tried, in order, when an `@import` has none.
    pub extension_order: Vec<String>,
    pub external: ExternalSettings,
    pub unsupported_css_features: CssFeatureSet,
    pub minify_identifiers: bool,
    pub minify_syntax: bool,
    pub code_splitting: bool,
    pub output_format: OutputFormat,
    /// Label included in capability warnings, e.g. `chrome10`.
    pub original_target_env: Option<String>,
}

impl BundleOptions {
    pub fn output_dir(&self) -> &str {
        if let Some(dir) = self.abs_output_dir.as_deref() {
            return dir;
        }
        match self.abs_output_file.as_deref() {
            Some(file) => match file.rfind('/') {
                Some(idx) if idx > 0 => &file[..idx],
                _ => "/",
            },
            None => "/",
        }
    }

    pub fn has_output_path(&self) -> bool {
        self.abs_output_file.is_some() || self.abs_output_dir.is_some()
    }
}
