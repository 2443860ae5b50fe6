use fxhash::FxHashMap;
use swc_core::common::Span;

use crate::{CandelaAtom, FileId};

/// The lexical category a local name was first seen as.
///
/// A name's kind is fixed by its first occurrence; later occurrences in a
/// different position reuse the same name and rewrite to the same text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    Class,
    Id,
    Animation,
    CounterStyle,
    Container,
    ListStyle,
}

/// A file-scoped name that will be rewritten before emission.
#[derive(Debug, Clone)]
pub struct LocalName {
    pub file: FileId,
    pub name: CandelaAtom,
    pub kind: NameKind,
    /// First occurrence, used for diagnostics.
    pub span: Span,
}

/// The local names of one file, in first-occurrence order.
#[derive(Debug, Default)]
pub struct LocalNameTable {
    names: Vec<LocalName>,
    by_name: FxHashMap<CandelaAtom, usize>,
}

impl LocalNameTable {
    /// Interns `name`, creating it with `kind` when first seen.
    pub fn intern(&mut self, file: FileId, name: &CandelaAtom, kind: NameKind, span: Span) -> usize {
        if let Some(&idx) = self.by_name.get(name) {
            return idx;
        }
        let idx = self.names.len();
        self.names.push(LocalName {
            file,
            name: name.clone(),
            kind,
            span,
        });
        self.by_name.insert(name.clone(), idx);
        idx
    }

    pub fn get(&self, name: &CandelaAtom) -> Option<&LocalName> {
        self.by_name.get(name).map(|&idx| &self.names[idx])
    }

    pub fn contains(&self, name: &CandelaAtom) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LocalName> {
        self.names.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }
}

/// Global names observed in a file, with their first occurrence.
///
/// These feed the composes diagnostics and the minifier's avoidance set.
#[derive(Debug, Default)]
pub struct GlobalNameTable {
    by_name: FxHashMap<CandelaAtom, Span>,
}

impl GlobalNameTable {
    pub fn record(&mut self, name: &CandelaAtom, span: Span) {
        self.by_name.entry(name.clone()).or_insert(span);
    }

    pub fn get(&self, name: &CandelaAtom) -> Option<Span> {
        self.by_name.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CandelaAtom, &Span)> {
        self.by_name.iter()
    }
}

// Local occurrences are marked in the AST by replacing the identifier text
// with a reference atom that cannot appear in real CSS (it embeds a control
// character). The linker maps every reference atom to its final rewritten
// text in one renaming walk.
const SYMBOL_MARK: char = '\u{1}';

pub fn symbol_atom(file: FileId, name: &str) -> CandelaAtom {
    CandelaAtom::from(format!("{}{}{}{}", SYMBOL_MARK, file.0, SYMBOL_MARK, name))
}

pub fn is_symbol_atom(text: &str) -> bool {
    text.starts_with(SYMBOL_MARK)
}

/// Splits a reference atom back into (declaring file, original text).
pub fn parse_symbol_atom(text: &str) -> Option<(FileId, &str)> {
    let rest = text.strip_prefix(SYMBOL_MARK)?;
    let sep = rest.find(SYMBOL_MARK)?;
    let file: u32 = rest[..sep].parse().ok()?;
    Some((FileId(file), &rest[sep + 1..]))
}
