//! The file system boundary.
//!
//! Real I/O lives outside this crate; the bundler only needs `read`. The
//! in-memory implementation backs the test suites and embedders that bring
//! their own virtual file tree.

use fxhash::FxHashMap;

pub trait FileProvider: Sync {
    fn read(&self, path: &str) -> Option<Vec<u8>>;

    fn exists(&self, path: &str) -> bool {
        self.read(path).is_some()
    }

    fn read_to_string(&self, path: &str) -> Option<String> {
        self.read(path)
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
    }
}

#[derive(Default)]
pub struct MemoryFileSystem {
    files: FxHashMap<String, Vec<u8>>,
}

impl MemoryFileSystem {
    pub fn new() -> MemoryFileSystem {
        MemoryFileSystem::default()
    }

    pub fn add(&mut self, path: impl Into<String>, contents: impl Into<Vec<u8>>) {
        self.files.insert(path.into(), contents.into());
    }
}

impl<const N: usize> From<[(&str, &str); N]> for MemoryFileSystem {
    fn from(files: [(&str, &str); N]) -> MemoryFileSystem {
        let mut fs = MemoryFileSystem::new();
        for (path, contents) in files {
            fs.add(path, contents.as_bytes().to_vec());
        }
        fs
    }
}

impl FileProvider for MemoryFileSystem {
    fn read(&self, path: &str) -> Option<Vec<u8>> {
        self.files.get(path).cloned()
    }

    fn exists(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }
}
