//! External collaborators consumed by the core. The builder has no direct dependency on a
//! parser implementation or the filesystem: callers supply these at the `import` call site.

use serde_json::Value;

use crate::error::ImportError;

/// Given file contents, returns a descriptor tree of the same shape as a JSON import. The
/// textual `.proto` grammar itself is out of scope for this crate.
pub trait TextParser {
    fn parse(&self, contents: &str) -> Result<Value, ImportError>;
}

/// `fetch(path) -> bytes | absent`. File I/O is out of scope; callers provide whatever resource
/// resolution strategy fits their environment (filesystem, in-memory fixture, network).
pub trait ResourceLoader {
    fn fetch(&self, path: &str) -> Option<Vec<u8>>;
}

/// Platform path canonicalization, invoked when available. Optional: `import` falls back to
/// using the path as given when no `PathTools` is supplied.
pub trait PathTools {
    fn canonicalize(&self, path: &str) -> Option<String>;
}
