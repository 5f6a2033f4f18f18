use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Provenance of one physical line: the file it was read from, its 1-based
/// line number and how many INCLUDE levels deep that file sits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceLocation {
    pub path: Arc<Path>,
    pub line: usize,
    pub depth: usize,
}

impl SourceLocation {
    pub fn new(path: Arc<Path>, line: usize, depth: usize) -> Self {
        Self { path, line, depth }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.path.display(), self.line)
    }
}
