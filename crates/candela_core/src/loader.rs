use fxhash::FxHashMap;

/// What a resolved file is loaded as.
///
/// The three CSS loaders differ only in the default scoping discipline of
/// the file: `Css` and `GlobalCss` default to global names, `LocalCss`
/// defaults to local names. `Css` additionally never creates local names,
/// even through `:local(...)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Loader {
    Css,
    GlobalCss,
    LocalCss,
    Js,
    Jsx,
    Ts,
    Tsx,
    Json,
    Text,
    File,
    Binary,
    Base64,
    DataUrl,
}

impl Loader {
    pub fn is_css(self) -> bool {
        matches!(self, Loader::Css | Loader::GlobalCss | Loader::LocalCss)
    }

    pub fn is_js(self) -> bool {
        matches!(self, Loader::Js | Loader::Jsx | Loader::Ts | Loader::Tsx)
    }

    /// Loaders that provide a URL (or inline data) to embed in CSS output.
    pub fn provides_url(self) -> bool {
        matches!(
            self,
            Loader::Text | Loader::File | Loader::Binary | Loader::Base64 | Loader::DataUrl
        )
    }

    /// The name used in diagnostics, matching the configuration syntax.
    pub fn name(self) -> &'static str {
        match self {
            Loader::Css => "css",
            Loader::GlobalCss => "global-css",
            Loader::LocalCss => "local-css",
            Loader::Js => "js",
            Loader::Jsx => "jsx",
            Loader::Ts => "ts",
            Loader::Tsx => "tsx",
            Loader::Json => "json",
            Loader::Text => "text",
            Loader::File => "file",
            Loader::Binary => "binary",
            Loader::Base64 => "base64",
            Loader::DataUrl => "dataurl",
        }
    }
}

/// Maps file paths to loaders through an extension table.
///
/// Extensions are matched against the file's base name; when several
/// configured extensions match (e.g. `.module.css` and `.css`), the longest
/// one wins.
#[derive(Debug, Clone)]
pub struct LoaderTable {
    by_extension: FxHashMap<String, Loader>,
}

impl Default for LoaderTable {
    fn default() -> Self {
        let mut by_extension = FxHashMap::default();
        for (ext, loader) in [
            (".css", Loader::Css),
            (".global-css", Loader::GlobalCss),
            (".local-css", Loader::LocalCss),
            (".module.css", Loader::LocalCss),
            (".js", Loader::Js),
            (".mjs", Loader::Js),
            (".cjs", Loader::Js),
            (".jsx", Loader::Jsx),
            (".ts", Loader::Ts),
            (".tsx", Loader::Tsx),
            (".json", Loader::Json),
            (".txt", Loader::Text),
        ] {
            by_extension.insert(ext.to_string(), loader);
        }
        LoaderTable { by_extension }
    }
}

impl LoaderTable {
    /// Builds a table from explicit configuration, replacing the defaults.
    pub fn from_config(config: &FxHashMap<String, Loader>) -> Self {
        if config.is_empty() {
            return LoaderTable::default();
        }
        LoaderTable {
            by_extension: config.clone(),
        }
    }

    /// Classifies `path`, returning the loader of the longest matching
    /// configured extension.
    pub fn classify(&self, path: &str) -> Option<Loader> {
        let base = match path.rfind('/') {
            Some(idx) => &path[idx + 1..],
            None => path,
        };

        let mut best: Option<(usize, Loader)> = None;
        for (ext, loader) in self.by_extension.iter() {
            if base.len() > ext.len() && base.ends_with(ext.as_str()) {
                match best {
                    Some((len, _)) if len >= ext.len() => {}
                    _ => best = Some((ext.len(), *loader)),
                }
            }
        }
        best.map(|(_, loader)| loader)
    }

    /// Whether `ext` (including the leading dot) maps to a CSS-family loader.
    pub fn is_css_extension(&self, ext: &str) -> bool {
        self.by_extension
            .get(ext)
            .map_or(false, |loader| loader.is_css())
    }

    pub fn loader_for_extension(&self, ext: &str) -> Option<Loader> {
        self.by_extension.get(ext).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn longest_extension_wins() {
        let table = LoaderTable::default();
        assert_eq!(table.classify("/a/styles.module.css"), Some(Loader::LocalCss));
        assert_eq!(table.classify("/a/styles.css"), Some(Loader::Css));
        assert_eq!(table.classify("/a/app.tsx"), Some(Loader::Tsx));
        assert_eq!(table.classify("/a/readme"), None);
    }

    #[test]
    fn explicit_config_replaces_defaults() {
        let mut config = FxHashMap::default();
        config.insert(".css".to_string(), Loader::LocalCss);
        let table = LoaderTable::from_config(&config);
        assert_eq!(table.classify("/dir1/style.css"), Some(Loader::LocalCss));
        assert_eq!(table.classify("/dir1/style.png"), None);
    }

    #[test]
    fn base_name_only_is_not_an_extension() {
        let table = LoaderTable::default();
        // A file literally named ".css" has no base left over to match.
        assert_eq!(table.classify("/dir/.css"), None);
    }
}
