//! Splitting physical deck lines into raw, untyped fields.
//!
//! A bulk-data line is laid out in one of three ways:
//!
//! - small fixed: ten 8-column fields (keyword, eight data fields, continuation tag)
//! - large fixed: an 8-column keyword ending in `*`, four 16-column data fields and
//!   an 8-column continuation tag
//! - free: comma separated values
//!
//! The tokenizer only splits and classifies. Fields stay strings until a
//! container coerces them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

pub const COMMENT_MARKER: char = '$';

/// Columns a fixed-format line is allowed to use; anything further right is ignored.
pub const MAX_COLS: usize = 80;

const SMALL_WIDTH: usize = 8;
const LARGE_WIDTH: usize = 16;
const TAB_STOP: usize = 8;

/// Physical layout of a line's fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldWidth {
    #[default]
    Small,
    Large,
    Free,
}

impl FieldWidth {
    /// Pick the layout a bulk line was written in: comma means free field,
    /// a `*` inside the keyword field means 16-column fields.
    pub fn detect(content: &str) -> Self {
        if content.contains(',') {
            return FieldWidth::Free;
        }
        let head: String = content.chars().take(SMALL_WIDTH).collect();
        if head.contains('*') {
            FieldWidth::Large
        } else {
            FieldWidth::Small
        }
    }

    /// Character width of one data field when written.
    pub fn width(self) -> usize {
        match self {
            FieldWidth::Small => SMALL_WIDTH,
            FieldWidth::Large | FieldWidth::Free => LARGE_WIDTH,
        }
    }
}

impl fmt::Display for FieldWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldWidth::Small => write!(f, "small"),
            FieldWidth::Large => write!(f, "large"),
            FieldWidth::Free => write!(f, "free"),
        }
    }
}

/// One field as it appeared on the line, with the character columns it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawField {
    pub text: String,
    pub columns: Range<usize>,
}

impl RawField {
    pub fn new<S: Into<String>>(text: S, columns: Range<usize>) -> Self {
        Self {
            text: text.into(),
            columns,
        }
    }

    /// The field with surrounding blanks removed.
    pub fn value(&self) -> &str {
        self.text.trim()
    }

    pub fn is_blank(&self) -> bool {
        self.value().is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Data,
    Comment,
    Continuation,
    Blank,
}

/// A physical line after splitting.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenizedLine {
    pub kind: LineKind,
    pub width: FieldWidth,
    /// Keyword (or continuation) field followed by the data fields; the
    /// trailing continuation tag is held separately in `tag`.
    pub fields: Vec<RawField>,
    pub tag: Option<String>,
    /// Comment text without the leading marker, for comment lines and for
    /// data lines carrying an inline comment.
    pub comment: Option<String>,
}

impl TokenizedLine {
    fn empty(kind: LineKind, comment: Option<String>) -> Self {
        Self {
            kind,
            width: FieldWidth::Small,
            fields: Vec::new(),
            tag: None,
            comment,
        }
    }

    pub fn head(&self) -> &str {
        self.fields.first().map(RawField::value).unwrap_or("")
    }

    pub fn data(&self) -> &[RawField] {
        self.fields.get(1..).unwrap_or(&[])
    }

    /// Number of data fields one physical line of this kind carries.
    pub fn fields_per_line(&self) -> usize {
        if self.width == FieldWidth::Large || self.head().contains('*') {
            4
        } else {
            8
        }
    }
}

/// Split and classify one physical line.
///
/// `width` forces a layout; `None` detects it from the line. `open_tag` is the
/// continuation tag of the card currently being assembled, if it declared one.
pub fn tokenize_line(line: &str, width: Option<FieldWidth>, open_tag: Option<&str>) -> TokenizedLine {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return TokenizedLine::empty(LineKind::Blank, None);
    }
    if let Some(comment) = trimmed.strip_prefix(COMMENT_MARKER) {
        return TokenizedLine::empty(LineKind::Comment, Some(comment.to_string()));
    }

    let (content, comment) = match line.find(COMMENT_MARKER) {
        Some(idx) => (&line[..idx], Some(line[idx + 1..].to_string())),
        None => (line, None),
    };
    let width = width.unwrap_or_else(|| FieldWidth::detect(content));
    let mut fields = split_line(content, width);

    let per_line = if width == FieldWidth::Large
        || fields.first().is_some_and(|f| f.value().contains('*'))
    {
        4
    } else {
        8
    };
    let tag = match width {
        FieldWidth::Small | FieldWidth::Large => fields.pop().map(|f| f.value().to_string()),
        FieldWidth::Free if fields.len() == per_line + 2 => {
            fields.pop().map(|f| f.value().to_string())
        }
        FieldWidth::Free => None,
    }
    .filter(|t| !t.is_empty());

    let head = fields.first().map(RawField::value).unwrap_or("");
    let kind = if head.is_empty() || head.starts_with('+') || head.starts_with('*') {
        LineKind::Continuation
    } else if open_tag.is_some_and(|t| t.eq_ignore_ascii_case(head)) {
        LineKind::Continuation
    } else {
        LineKind::Data
    };

    TokenizedLine {
        kind,
        width,
        fields,
        tag,
        comment: comment.filter(|c| !c.trim().is_empty()),
    }
}

/// Split a line into raw fields without classifying it.
///
/// Fixed layouts always produce every column slot, so trailing blank
/// columns come back as empty fields. Free layout keeps empty fields between
/// commas and drops only an empty element at the very end of the line.
pub fn split_line(content: &str, width: FieldWidth) -> Vec<RawField> {
    match width {
        FieldWidth::Small => split_fixed(content, &small_columns()),
        FieldWidth::Large => split_fixed(content, &large_columns()),
        FieldWidth::Free => split_free(content),
    }
}

fn small_columns() -> Vec<Range<usize>> {
    (0..10)
        .map(|i| i * SMALL_WIDTH..(i + 1) * SMALL_WIDTH)
        .collect()
}

fn large_columns() -> Vec<Range<usize>> {
    let mut cols = vec![0..SMALL_WIDTH];
    cols.extend((0..4).map(|i| SMALL_WIDTH + i * LARGE_WIDTH..SMALL_WIDTH + (i + 1) * LARGE_WIDTH));
    cols.push(72..MAX_COLS);
    cols
}

fn split_fixed(content: &str, columns: &[Range<usize>]) -> Vec<RawField> {
    let chars: Vec<char> = expand_tabs(content.trim_end()).chars().collect();
    if chars.len() > MAX_COLS {
        tracing::warn!(
            width = chars.len(),
            "line is wider than {MAX_COLS} columns; trailing columns ignored"
        );
    }
    columns
        .iter()
        .map(|range| {
            let start = range.start.min(chars.len());
            let end = range.end.min(chars.len());
            RawField::new(chars[start..end].iter().collect::<String>(), range.clone())
        })
        .collect()
}

fn split_free(content: &str) -> Vec<RawField> {
    let content = content.trim_end();
    let mut fields = Vec::new();
    let mut start = 0;
    for piece in content.split(',') {
        let len = piece.chars().count();
        fields.push(RawField::new(piece.trim(), start..start + len));
        start += len + 1;
    }
    if content.ends_with(',') && fields.last().is_some_and(RawField::is_blank) {
        fields.pop();
    }
    fields
}

fn expand_tabs(line: &str) -> String {
    if !line.contains('\t') {
        return line.to_string();
    }
    let mut out = String::with_capacity(line.len() + TAB_STOP);
    let mut col = 0;
    for ch in line.chars() {
        if ch == '\t' {
            let pad = TAB_STOP - col % TAB_STOP;
            out.extend(std::iter::repeat_n(' ', pad));
            col += pad;
        } else {
            out.push(ch);
            col += 1;
        }
    }
    out
}

/// Rewrite a real number into a form `f64::from_str` accepts.
///
/// Handles `D` exponents (`1.5D+3`) and implicit exponents where a sign
/// after the first character acts as the delimiter (`1.5-3`, `-.5+2`).
pub fn normalize_real(raw: &str) -> String {
    let s = raw.trim().to_ascii_uppercase().replace('D', "E");
    if s.contains('E') {
        return s;
    }
    match s.char_indices().skip(1).filter(|(_, c)| *c == '+' || *c == '-').last() {
        Some((idx, _)) => format!("{}E{}", &s[..idx], &s[idx..]),
        None => s,
    }
}

/// Parse a real field, accepting implicit-exponent notation. Returns `None`
/// for anything that is not a finite number.
pub fn parse_real(raw: &str) -> Option<f64> {
    normalize_real(raw)
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// True when the text looks like a real rather than an integer.
pub fn looks_real(raw: &str) -> bool {
    let s = raw.trim().to_ascii_uppercase();
    s.contains('.') || s.contains('E') || s.contains('D') || normalize_real(&s) != s
}
