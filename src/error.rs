use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::location::SourceLocation;
use crate::xref::DanglingReference;

/// Which structural rule a deck broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructuralKind {
    MalformedContinuation,
    UnterminatedInclude,
    IncludeCycle,
    UnterminatedSection,
}

impl fmt::Display for StructuralKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StructuralKind::MalformedContinuation => write!(f, "malformed continuation"),
            StructuralKind::UnterminatedInclude => write!(f, "unterminated include"),
            StructuralKind::IncludeCycle => write!(f, "include cycle"),
            StructuralKind::UnterminatedSection => write!(f, "unterminated section"),
        }
    }
}

#[derive(Debug, Error)]
pub enum DeckError {
    #[error("failed to access {}{}", .path.display(), include_chain(.chain))]
    Io {
        path: PathBuf,
        chain: Vec<SourceLocation>,
        #[source]
        source: io::Error,
    },

    #[error("{location}: {kind}: {message}")]
    Structural {
        kind: StructuralKind,
        location: SourceLocation,
        message: String,
    },

    #[error("{}{keyword} field {position} ({name}): {message}", at(.location))]
    InvalidField {
        location: Option<SourceLocation>,
        keyword: String,
        position: usize,
        name: &'static str,
        message: String,
    },

    #[error("{}duplicate {keyword} identifier {id}", at(.location))]
    DuplicateIdentifier {
        keyword: String,
        id: u32,
        location: Option<SourceLocation>,
    },

    #[error("unknown {keyword} identifier {id}")]
    UnknownIdentifier { keyword: String, id: u32 },

    #[error("dangling reference: {0}")]
    DanglingReference(Box<DanglingReference>),

    #[error("cannot write {keyword} {id} field {position}: {message}")]
    FieldFormat {
        keyword: String,
        id: u32,
        position: usize,
        message: String,
    },

    #[error("{keyword} has not been built")]
    NotBuilt { keyword: String },

    #[error("{keyword} is already built; no further cards may be added")]
    ContainerFinalized { keyword: String },

    #[error("no container registered for keyword '{keyword}'")]
    UnknownKeyword { keyword: String },

    #[error("a container for keyword '{keyword}' is already registered")]
    DuplicateKeyword { keyword: String },

    #[error("configuration error: {message}")]
    Config { message: String },

    #[error("reading cancelled after {entities} entities")]
    Cancelled { entities: usize },
}

pub type Result<T> = std::result::Result<T, DeckError>;

impl DeckError {
    /// Location in the source deck the error was raised for, when known.
    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            DeckError::Structural { location, .. } => Some(location),
            DeckError::InvalidField { location, .. }
            | DeckError::DuplicateIdentifier { location, .. } => location.as_ref(),
            DeckError::DanglingReference(dangling) => dangling.location.as_ref(),
            DeckError::Io { chain, .. } => chain.last(),
            _ => None,
        }
    }
}

fn at(location: &Option<SourceLocation>) -> String {
    match location {
        Some(loc) => format!("{loc}: "),
        None => String::new(),
    }
}

fn include_chain(chain: &[SourceLocation]) -> String {
    if chain.is_empty() {
        return String::new();
    }
    let links: Vec<String> = chain.iter().rev().map(|loc| loc.to_string()).collect();
    format!(" (included from {})", links.join(" <- "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::Arc;

    #[test]
    fn io_error_names_the_include_chain_innermost_first() {
        let root: Arc<Path> = Arc::from(Path::new("root.bdf"));
        let mid: Arc<Path> = Arc::from(Path::new("mid.bdf"));
        let err = DeckError::Io {
            path: PathBuf::from("leaf.bdf"),
            chain: vec![
                SourceLocation::new(root, 3, 0),
                SourceLocation::new(mid, 7, 1),
            ],
            source: io::Error::new(io::ErrorKind::NotFound, "missing"),
        };
        assert_eq!(
            err.to_string(),
            "failed to access leaf.bdf (included from mid.bdf:7 <- root.bdf:3)"
        );
    }

    #[test]
    fn field_errors_without_location_have_no_prefix() {
        let err = DeckError::InvalidField {
            location: None,
            keyword: "GRID".into(),
            position: 1,
            name: "nid",
            message: "expected an integer, found 'abc'".into(),
        };
        assert_eq!(
            err.to_string(),
            "GRID field 1 (nid): expected an integer, found 'abc'"
        );
    }
}
