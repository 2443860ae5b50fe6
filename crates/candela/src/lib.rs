//! The main public crate of the `candela` project.
//!
//! candela links CSS the way a JS bundler does: it follows `@import` edges
//! into a module graph, applies CSS Modules scoping (`:local`/`:global`,
//! `composes:`), classifies `url(...)` references against a loader table,
//! lowers nesting for older targets, and emits one deduplicated stylesheet
//! per entry plus a JS-visible export table per CSS module.
//!
//! ```
//! use candela::{bundle, BundleOptions, MemoryFileSystem};
//!
//! let fs = MemoryFileSystem::from([
//!     ("/entry.css", "@import \"./a.css\"; .entry { color: red }"),
//!     ("/a.css", ".a { color: green }"),
//! ]);
//!
//! let options = BundleOptions {
//!     entry_paths: vec!["/entry.css".into()],
//!     abs_output_file: Some("/out.css".into()),
//!     ..Default::default()
//! };
//!
//! let result = bundle(&options, &fs);
//! assert!(!result.has_errors);
//! let out = String::from_utf8(result.outputs[0].contents.clone()).unwrap();
//! assert!(out.find(".a").unwrap() < out.find(".entry").unwrap());
//! ```

mod bundler;
mod fs;
mod js;
mod resolver;

pub use bundler::{bundle, bundle_cancellable, BundleResult, CancellationToken, OutputFile};
pub use candela_core::*;
pub use fs::{FileProvider, MemoryFileSystem};
