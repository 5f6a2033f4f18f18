//! Convenience helpers shared across command handlers.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use bulkdeck::{DeckConfig, Model, ReadOptions};

/// Load the configuration file, or the defaults when none is given.
pub fn load_config(path: Option<&Path>) -> Result<DeckConfig> {
    match path {
        Some(path) => DeckConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(DeckConfig::default()),
    }
}

/// Read a deck file, attaching path context to any error.
pub fn read_model(path: &Path, options: &ReadOptions) -> Result<Model> {
    Model::read(path, options).with_context(|| format!("failed to read deck {}", path.display()))
}

/// Persist bytes either to a file or stdout when `-` is provided.
pub fn write_output(path: &Path, content: &[u8]) -> Result<()> {
    if is_stdout(path) {
        io::stdout()
            .write_all(content)
            .context("failed to write to stdout")?;
        return Ok(());
    }
    fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
}

/// True when `path` names stdout.
pub fn is_stdout(path: &Path) -> bool {
    path.as_os_str() == "-"
}

#[cfg(test)]
mod tests {
    use super::*;
    use bulkdeck::TextEncoding;
    use pretty_assertions::assert_eq;

    #[test]
    fn write_output_keeps_encoded_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bdf");
        let bytes = TextEncoding::Latin1.encode("$ température\n").unwrap();
        write_output(&path, &bytes).unwrap();
        let written = fs::read(&path).unwrap();
        assert_eq!(written, bytes);
        assert_eq!(written.len(), "$ température\n".chars().count());
    }

    #[test]
    fn dash_names_stdout() {
        assert!(is_stdout(Path::new("-")));
        assert!(!is_stdout(Path::new("deck.bdf")));
    }
}
