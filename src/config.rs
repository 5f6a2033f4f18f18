//! Options for reading and writing decks, loadable from a TOML file.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::path::Path;

use crate::container::DuplicatePolicy;
use crate::error::{DeckError, Result};
use crate::field::FieldWidth;
use crate::format::{CardFormat, Precision};
use crate::include::IncludeOptions;
use crate::writer::{CardOrder, TerminatorPolicy};
use crate::xref::XrefMode;

/// Text encoding of deck files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextEncoding {
    Ascii,
    Latin1,
    #[default]
    Utf8,
}

impl TextEncoding {
    pub fn label(self) -> &'static str {
        match self {
            TextEncoding::Ascii => "ascii",
            TextEncoding::Latin1 => "latin-1",
            TextEncoding::Utf8 => "utf-8",
        }
    }

    pub fn decode(self, bytes: &[u8]) -> io::Result<String> {
        match self {
            TextEncoding::Utf8 => String::from_utf8(bytes.to_vec())
                .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err)),
            TextEncoding::Latin1 => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
            TextEncoding::Ascii => match bytes.iter().position(|b| !b.is_ascii()) {
                Some(offset) => Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("non-ascii byte 0x{:02x} at offset {offset}", bytes[offset]),
                )),
                None => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
            },
        }
    }

    pub fn encode(self, text: &str) -> io::Result<Vec<u8>> {
        let limit = match self {
            TextEncoding::Utf8 => return Ok(text.as_bytes().to_vec()),
            TextEncoding::Latin1 => 0xff,
            TextEncoding::Ascii => 0x7f,
        };
        text.chars()
            .map(|ch| {
                u8::try_from(u32::from(ch))
                    .ok()
                    .filter(|b| u32::from(*b) <= limit)
                    .ok_or_else(|| {
                        io::Error::new(
                            io::ErrorKind::InvalidData,
                            format!("'{ch}' cannot be written as {}", self.label()),
                        )
                    })
            })
            .collect()
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How a deck is read into a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadOptions {
    /// `None` detects punch decks (bulk data only) from their content.
    pub punch: Option<bool>,
    /// `None` detects the layout of every bulk line separately.
    pub field_width: Option<FieldWidth>,
    /// `None` skips cross-referencing.
    pub xref: Option<XrefMode>,
    pub duplicate_policy: DuplicatePolicy,
    /// Reject `add` calls on a container that has been built.
    pub strict_build: bool,
    pub encoding: TextEncoding,
    pub case_sensitive_paths: bool,
    /// Keywords skipped entirely while reading.
    pub disabled_cards: Vec<String>,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            punch: None,
            field_width: None,
            xref: Some(XrefMode::Strict),
            duplicate_policy: DuplicatePolicy::Reject,
            strict_build: true,
            encoding: TextEncoding::default(),
            case_sensitive_paths: true,
            disabled_cards: Vec::new(),
        }
    }
}

impl ReadOptions {
    pub fn with_xref(mut self, xref: Option<XrefMode>) -> Self {
        self.xref = xref;
        self
    }

    pub fn with_punch(mut self, punch: bool) -> Self {
        self.punch = Some(punch);
        self
    }

    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    pub fn include_options(&self) -> IncludeOptions {
        IncludeOptions {
            encoding: self.encoding,
            case_sensitive_paths: self.case_sensitive_paths,
        }
    }
}

/// How a model is serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WriteOptions {
    pub field_width: FieldWidth,
    pub order: CardOrder,
    pub precision: Precision,
    pub enddata: TerminatorPolicy,
    pub encoding: TextEncoding,
}

impl WriteOptions {
    pub fn with_field_width(mut self, field_width: FieldWidth) -> Self {
        self.field_width = field_width;
        self
    }

    pub fn with_order(mut self, order: CardOrder) -> Self {
        self.order = order;
        self
    }

    pub fn with_precision(mut self, precision: Precision) -> Self {
        self.precision = precision;
        self
    }

    pub fn with_enddata(mut self, enddata: TerminatorPolicy) -> Self {
        self.enddata = enddata;
        self
    }

    /// Field layout cards are printed in. Double precision needs 16-column fields.
    pub fn card_format(&self) -> CardFormat {
        let width = match self.precision {
            Precision::Double => FieldWidth::Large,
            Precision::Single => self.field_width,
        };
        CardFormat::new(width, self.precision)
    }
}

/// Read and write options bundled for a configuration file:
///
/// ```toml
/// [read]
/// duplicate_policy = "last-write-wins"
/// xref = "lenient"
///
/// [write]
/// field_width = "large"
/// enddata = "force-present"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeckConfig {
    pub read: ReadOptions,
    pub write: WriteOptions,
}

impl DeckConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|err| DeckError::Config {
            message: err.to_string(),
        })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| DeckError::Io {
            path: path.to_path_buf(),
            chain: Vec::new(),
            source,
        })?;
        Self::from_toml_str(&content)
    }
}
