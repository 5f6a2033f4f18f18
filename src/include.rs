//! Flattening a root deck and its INCLUDE tree into one ordered line stream.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::TextEncoding;
use crate::error::{DeckError, Result, StructuralKind};
use crate::location::SourceLocation;

/// One physical line of the flattened deck together with where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeckLine {
    pub text: String,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IncludeOptions {
    pub encoding: TextEncoding,
    pub case_sensitive_paths: bool,
}

impl Default for IncludeOptions {
    fn default() -> Self {
        Self {
            encoding: TextEncoding::default(),
            case_sensitive_paths: true,
        }
    }
}

/// An open file on the include stack.
struct Frame {
    path: Arc<Path>,
    canonical: PathBuf,
    lines: Vec<String>,
    cursor: usize,
    /// The INCLUDE line that opened this file.
    origin: Option<SourceLocation>,
}

impl Frame {
    fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }
}

enum Step {
    Emit(DeckLine),
    Include {
        target: String,
        location: SourceLocation,
    },
    Finished,
}

pub struct Includer {
    options: IncludeOptions,
}

impl Includer {
    pub fn new(options: IncludeOptions) -> Self {
        Self { options }
    }

    /// Read `root` and every file it transitively includes, depth first.
    pub fn flatten(&self, root: &Path) -> Result<Vec<DeckLine>> {
        let frame = self.open(root, None, &[])?;
        self.walk(frame)
    }

    /// Same as [`Includer::flatten`] for a root deck already in memory.
    /// Relative INCLUDE targets resolve against `path`'s directory.
    pub fn flatten_str(&self, text: &str, path: &Path) -> Result<Vec<DeckLine>> {
        let frame = Frame {
            path: Arc::from(path),
            canonical: canonical(path),
            lines: text.lines().map(str::to_string).collect(),
            cursor: 0,
            origin: None,
        };
        self.walk(frame)
    }

    fn walk(&self, root: Frame) -> Result<Vec<DeckLine>> {
        let mut stack = vec![root];
        let mut out = Vec::new();

        loop {
            let depth = stack.len().saturating_sub(1);
            let step = match stack.last_mut() {
                Some(frame) => next_step(frame, depth)?,
                None => break,
            };
            match step {
                Step::Emit(line) => out.push(line),
                Step::Finished => {
                    stack.pop();
                }
                Step::Include { target, location } => {
                    let chain = include_chain(&stack, &location);
                    let dir = stack.last().map(|f| f.dir().to_path_buf()).unwrap_or_default();
                    let path = self.resolve(&target, &dir, &chain)?;
                    let key = canonical(&path);
                    if stack.iter().any(|frame| frame.canonical == key) {
                        return Err(DeckError::Structural {
                            kind: StructuralKind::IncludeCycle,
                            location,
                            message: format!("{} includes itself", path.display()),
                        });
                    }
                    let frame = self.open(&path, Some(location), &chain)?;
                    stack.push(frame);
                }
            }
        }

        tracing::debug!(lines = out.len(), "flattened deck");
        Ok(out)
    }

    fn open(&self, path: &Path, origin: Option<SourceLocation>, chain: &[SourceLocation]) -> Result<Frame> {
        let io_error = |source: io::Error| DeckError::Io {
            path: path.to_path_buf(),
            chain: chain.to_vec(),
            source,
        };
        let bytes = fs::read(path).map_err(io_error)?;
        let text = self.options.encoding.decode(&bytes).map_err(io_error)?;
        tracing::debug!(path = %path.display(), depth = chain.len(), "opened deck file");
        Ok(Frame {
            path: Arc::from(path),
            canonical: canonical(path),
            lines: text.lines().map(str::to_string).collect(),
            cursor: 0,
            origin,
        })
    }

    /// Look for an INCLUDE target next to the including file, then relative
    /// to the working directory.
    fn resolve(&self, target: &str, dir: &Path, chain: &[SourceLocation]) -> Result<PathBuf> {
        let target = Path::new(target);
        let candidates: Vec<PathBuf> = if target.is_absolute() {
            vec![target.to_path_buf()]
        } else {
            vec![dir.join(target), target.to_path_buf()]
        };
        if let Some(found) = candidates.iter().find(|c| c.is_file()) {
            return Ok(found.clone());
        }
        if !self.options.case_sensitive_paths {
            if let Some(found) = candidates.iter().find_map(|c| find_ignoring_case(c)) {
                return Ok(found);
            }
        }
        Err(DeckError::Io {
            path: candidates[0].clone(),
            chain: chain.to_vec(),
            source: io::Error::new(io::ErrorKind::NotFound, "include file not found"),
        })
    }
}

fn next_step(frame: &mut Frame, depth: usize) -> Result<Step> {
    let Some(text) = frame.lines.get(frame.cursor) else {
        return Ok(Step::Finished);
    };
    let index = frame.cursor;
    frame.cursor += 1;
    let location = SourceLocation::new(frame.path.clone(), index + 1, depth);

    let Some(rest) = include_argument(text) else {
        return Ok(Step::Emit(DeckLine {
            text: text.clone(),
            location,
        }));
    };
    let rest = rest.to_string();
    let target = match rest.chars().next() {
        Some(quote @ ('\'' | '"')) => read_quoted(frame, &rest[1..], quote, &location)?,
        _ => rest,
    };
    if target.is_empty() {
        return Err(DeckError::Structural {
            kind: StructuralKind::UnterminatedInclude,
            location,
            message: "INCLUDE without a file name".into(),
        });
    }
    Ok(Step::Include { target, location })
}

/// Everything after the INCLUDE keyword, trimmed, if `line` is an INCLUDE directive.
fn include_argument(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    let keyword = trimmed.get(..7)?;
    if !keyword.eq_ignore_ascii_case("INCLUDE") {
        return None;
    }
    let rest = &trimmed[7..];
    match rest.chars().next() {
        Some(c) if c.is_whitespace() || c == '\'' || c == '"' => Some(rest.trim()),
        _ => None,
    }
}

/// Collect a quoted include path, which may continue over several lines.
fn read_quoted(frame: &mut Frame, first: &str, quote: char, location: &SourceLocation) -> Result<String> {
    if let Some(end) = first.find(quote) {
        return Ok(first[..end].trim().to_string());
    }
    let mut target = first.trim().to_string();
    while let Some(line) = frame.lines.get(frame.cursor) {
        frame.cursor += 1;
        let piece = line.trim();
        if let Some(end) = piece.find(quote) {
            target.push_str(piece[..end].trim());
            return Ok(target);
        }
        target.push_str(piece);
    }
    Err(DeckError::Structural {
        kind: StructuralKind::UnterminatedInclude,
        location: location.clone(),
        message: format!("missing closing {quote} in INCLUDE path"),
    })
}

fn include_chain(stack: &[Frame], location: &SourceLocation) -> Vec<SourceLocation> {
    let mut chain: Vec<SourceLocation> = stack.iter().filter_map(|f| f.origin.clone()).collect();
    chain.push(location.clone());
    chain
}

fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    })
}

fn find_ignoring_case(candidate: &Path) -> Option<PathBuf> {
    let name = candidate.file_name()?.to_str()?;
    let dir = match candidate.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::read_dir(&dir)
        .ok()?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .find(|p| {
            p.is_file()
                && p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.eq_ignore_ascii_case(name))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, body).unwrap();
        path
    }

    fn texts(lines: &[DeckLine]) -> Vec<&str> {
        lines.iter().map(|l| l.text.as_str()).collect()
    }

    #[test]
    fn nested_includes_flatten_depth_first() {
        let dir = TempDir::new().unwrap();
        let root = write(&dir, "root.bdf", "A\nINCLUDE 'b.bdf'\nD\n");
        write(&dir, "b.bdf", "B\nINCLUDE 'c.bdf'\nE\n");
        write(&dir, "c.bdf", "C\n");

        let lines = Includer::new(IncludeOptions::default()).flatten(&root).unwrap();
        assert_eq!(texts(&lines), vec!["A", "B", "C", "E", "D"]);

        let c = &lines[2];
        assert_eq!(c.location.line, 1);
        assert_eq!(c.location.depth, 2);
        assert!(c.location.path.ends_with("c.bdf"));
        assert_eq!(lines[4].location.line, 3);
        assert_eq!(lines[4].location.depth, 0);
    }

    #[test]
    fn include_resolves_relative_to_including_file() {
        let dir = TempDir::new().unwrap();
        let root = write(&dir, "root.bdf", "INCLUDE 'sub/mesh.bdf'\n");
        write(&dir, "sub/mesh.bdf", "X\nINCLUDE 'more.inc'\n");
        write(&dir, "sub/more.inc", "Y\n");

        let lines = Includer::new(IncludeOptions::default()).flatten(&root).unwrap();
        assert_eq!(texts(&lines), vec!["X", "Y"]);
    }

    #[test]
    fn include_path_may_span_lines() {
        let dir = TempDir::new().unwrap();
        let root = write(&dir, "root.bdf", "INCLUDE 'sub/\n  mesh.bdf'\nZ\n");
        write(&dir, "sub/mesh.bdf", "X\n");

        let lines = Includer::new(IncludeOptions::default()).flatten(&root).unwrap();
        assert_eq!(texts(&lines), vec!["X", "Z"]);
    }

    #[test]
    fn unterminated_include_path_is_structural() {
        let dir = TempDir::new().unwrap();
        let root = write(&dir, "root.bdf", "INCLUDE 'never/closed\n");
        let err = Includer::new(IncludeOptions::default()).flatten(&root).unwrap_err();
        assert!(matches!(
            err,
            DeckError::Structural {
                kind: StructuralKind::UnterminatedInclude,
                ..
            }
        ));
    }

    #[test]
    fn missing_include_names_file_and_includer() {
        let dir = TempDir::new().unwrap();
        let root = write(&dir, "root.bdf", "A\nINCLUDE 'gone.bdf'\n");
        let err = Includer::new(IncludeOptions::default()).flatten(&root).unwrap_err();
        match err {
            DeckError::Io { path, chain, .. } => {
                assert!(path.ends_with("gone.bdf"));
                assert_eq!(chain.len(), 1);
                assert_eq!(chain[0].line, 2);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn self_inclusion_is_a_cycle() {
        let dir = TempDir::new().unwrap();
        let root = write(&dir, "a.bdf", "INCLUDE 'b.bdf'\n");
        write(&dir, "b.bdf", "INCLUDE 'a.bdf'\n");
        let err = Includer::new(IncludeOptions::default()).flatten(&root).unwrap_err();
        match err {
            DeckError::Structural { kind, location, .. } => {
                assert_eq!(kind, StructuralKind::IncludeCycle);
                assert!(location.path.ends_with("b.bdf"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn case_insensitive_lookup_is_opt_in() {
        let dir = TempDir::new().unwrap();
        let root = write(&dir, "root.bdf", "INCLUDE 'MESH.BDF'\n");
        write(&dir, "mesh.bdf", "X\n");

        let options = IncludeOptions {
            case_sensitive_paths: false,
            ..IncludeOptions::default()
        };
        let lines = Includer::new(options).flatten(&root).unwrap();
        assert_eq!(texts(&lines), vec!["X"]);
    }

    #[test]
    fn include_keyword_needs_a_separator() {
        assert_eq!(include_argument("INCLUDE 'a.bdf'"), Some("'a.bdf'"));
        assert_eq!(include_argument("include'a.bdf'"), Some("'a.bdf'"));
        assert_eq!(include_argument("INCLUDES"), None);
        assert_eq!(include_argument("GRID"), None);
    }
}
