mod error;
mod loader;
mod names;
mod options;

pub use error::*;
pub use loader::*;
pub use names::*;
pub use options::*;

use swc_core::ecma::atoms::Atom;

pub type CandelaAtom = Atom;

#[macro_export]
macro_rules! candela_atom {
    ($lit: literal) => {
        candela_core::CandelaAtom::from($lit)
    };
}

/// Identifies one source file inside a bundle.
///
/// Ids are dense indices into the bundle's file table and are assigned in
/// discovery order during scanning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(pub u32);

impl FileId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}
