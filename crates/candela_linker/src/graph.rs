//! Import graph linearization.
//!
//! The graph may be cyclic; linearization is a depth-first post-order walk
//! that skips files already on the walk stack, so each file lands in the
//! output exactly once, at its first encounter.

use candela_core::FileId;
use fxhash::FxHashSet;

pub fn linearize(entry: FileId, targets_of: &impl Fn(FileId) -> Vec<FileId>) -> Vec<FileId> {
    linearize_many(&[entry], targets_of)
}

/// Linearizes several roots into one stream with a shared visited set, the
/// way a JS entry's CSS imports form one bundle.
pub fn linearize_many(
    roots: &[FileId],
    targets_of: &impl Fn(FileId) -> Vec<FileId>,
) -> Vec<FileId> {
    let mut order = Vec::new();
    let mut visited = FxHashSet::default();
    let mut stack = FxHashSet::default();
    for &root in roots {
        visit(root, targets_of, &mut order, &mut visited, &mut stack);
    }
    order
}

fn visit(
    file: FileId,
    targets_of: &impl Fn(FileId) -> Vec<FileId>,
    order: &mut Vec<FileId>,
    visited: &mut FxHashSet<FileId>,
    stack: &mut FxHashSet<FileId>,
) {
    if visited.contains(&file) || stack.contains(&file) {
        return;
    }
    stack.insert(file);
    for target in targets_of(file) {
        visit(target, targets_of, order, visited, stack);
    }
    stack.remove(&file);
    visited.insert(file);
    order.push(file);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph<'a, 'b>(edges: &'a [(u32, &'b [u32])]) -> impl Fn(FileId) -> Vec<FileId> + 'a {
        move |file| {
            edges
                .iter()
                .find(|(from, _)| FileId(*from) == file)
                .map(|(_, to)| to.iter().map(|t| FileId(*t)).collect())
                .unwrap_or_default()
        }
    }

    #[test]
    fn diamond_includes_shared_file_once_and_first() {
        // entry(0) -> a(1), b(2); both -> shared(3)
        let targets = graph(&[(0, &[1, 2][..]), (1, &[3][..]), (2, &[3][..])]);
        let order = linearize(FileId(0), &targets);
        assert_eq!(order, vec![FileId(3), FileId(1), FileId(2), FileId(0)]);
    }

    #[test]
    fn cycles_terminate_and_emit_each_file_once() {
        let targets = graph(&[(0, &[1][..]), (1, &[2][..]), (2, &[0][..])]);
        let order = linearize(FileId(0), &targets);
        assert_eq!(order, vec![FileId(2), FileId(1), FileId(0)]);
    }

    #[test]
    fn self_import_is_a_no_op() {
        let targets = graph(&[(0, &[0][..])]);
        assert_eq!(linearize(FileId(0), &targets), vec![FileId(0)]);
    }
}
