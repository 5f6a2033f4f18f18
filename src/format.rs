//! Printing typed field values back into fixed or free field layouts.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::field::{FieldWidth, looks_real, parse_real};

/// Range token used by identifier lists.
pub const THRU: &str = "THRU";
/// Step token following a THRU range.
pub const BY: &str = "BY";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    #[default]
    Single,
    Double,
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Precision::Single => write!(f, "single"),
            Precision::Double => write!(f, "double"),
        }
    }
}

/// Layout and precision a card is printed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardFormat {
    pub width: FieldWidth,
    pub precision: Precision,
}

impl CardFormat {
    pub fn new(width: FieldWidth, precision: Precision) -> Self {
        Self { width, precision }
    }

    pub fn small() -> Self {
        Self::new(FieldWidth::Small, Precision::Single)
    }
}

/// One typed field of a card about to be printed.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Blank,
    Int(i64),
    Real(f64),
    Text(String),
}

impl FieldValue {
    /// Blank when `value` equals the default the reader would fill in.
    pub fn int_or_blank(value: u32, default: u32) -> Self {
        if value == default {
            FieldValue::Blank
        } else {
            FieldValue::Int(i64::from(value))
        }
    }

    pub fn real_or_blank(value: f64, default: f64) -> Self {
        if value == default {
            FieldValue::Blank
        } else {
            FieldValue::Real(value)
        }
    }

    /// Best-effort typing of a raw field: integer, real, or text.
    pub fn from_raw(raw: &str) -> Self {
        let value = raw.trim();
        if value.is_empty() {
            return FieldValue::Blank;
        }
        if let Ok(int) = value.parse::<i64>() {
            return FieldValue::Int(int);
        }
        if looks_real(value) {
            if let Some(real) = parse_real(value) {
                return FieldValue::Real(real);
            }
        }
        FieldValue::Text(value.to_string())
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, FieldValue::Blank)
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        FieldValue::Int(i64::from(value))
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Real(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(FieldValue::Blank, Into::into)
    }
}

/// Why a card could not be printed: the offending field and a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatFailure {
    pub position: usize,
    pub message: String,
}

/// Fit a real into `width` characters with as much precision as possible.
///
/// Candidates are fixed-point with the most decimals that fit and
/// implicit-exponent scientific (`1.2345-8`); the closer one wins, fixed on
/// ties. Leading zeros and trailing fractional zeros are dropped (`.5`, `-29.`).
/// Returns `None` only for non-finite values.
pub fn print_float(value: f64, width: usize) -> Option<String> {
    if !value.is_finite() {
        return None;
    }
    if value == 0.0 {
        return Some("0.".to_string());
    }
    let fixed = fixed_candidate(value, width);
    let scientific = scientific_candidate(value, width);
    match (fixed, scientific) {
        (Some(f), Some(s)) => {
            let error = |text: &str| parse_real(text).map_or(f64::INFINITY, |v| (v - value).abs());
            if error(&s) < error(&f) { Some(s) } else { Some(f) }
        }
        (f, s) => f.or(s),
    }
}

fn fixed_candidate(value: f64, width: usize) -> Option<String> {
    for decimals in (0..width).rev() {
        let text = trim_fixed(&format!("{value:.decimals$}"));
        if text.len() <= width {
            return match parse_real(&text) {
                Some(v) if v != 0.0 => Some(text),
                _ => None,
            };
        }
    }
    None
}

fn trim_fixed(text: &str) -> String {
    let mut out = if text.contains('.') {
        text.trim_end_matches('0').to_string()
    } else {
        format!("{text}.")
    };
    if let Some(rest) = out.strip_prefix("0.") {
        out = format!(".{rest}");
    } else if let Some(rest) = out.strip_prefix("-0.") {
        out = format!("-.{rest}");
    }
    out
}

fn scientific_candidate(value: f64, width: usize) -> Option<String> {
    for digits in (0..width).rev() {
        let text = format!("{value:.digits$e}");
        let (mantissa, exponent) = text.split_once('e')?;
        let exponent: i32 = exponent.parse().ok()?;
        let mantissa = if mantissa.contains('.') {
            mantissa.trim_end_matches('0').to_string()
        } else {
            format!("{mantissa}.")
        };
        let sign = if exponent < 0 { '-' } else { '+' };
        let candidate = format!("{mantissa}{sign}{}", exponent.abs());
        if candidate.len() <= width {
            return Some(candidate);
        }
    }
    None
}

/// Scientific notation with a `D` exponent for 16-column double precision fields.
pub fn print_double(value: f64) -> Option<String> {
    if !value.is_finite() {
        return None;
    }
    (0..=10).rev().find_map(|digits| {
        let text = format!("{value:.digits$e}");
        let (mantissa, exponent) = text.split_once('e')?;
        let exponent: i32 = exponent.parse().ok()?;
        let sign = if exponent < 0 { '-' } else { '+' };
        let candidate = format!("{mantissa}D{sign}{:02}", exponent.abs());
        (candidate.len() <= 16).then_some(candidate)
    })
}

fn print_field(value: &FieldValue, width: usize, precision: Precision) -> Result<String, String> {
    let text = match value {
        FieldValue::Blank => String::new(),
        FieldValue::Int(v) => v.to_string(),
        FieldValue::Real(v) => match precision {
            Precision::Single => print_float(*v, width),
            Precision::Double => print_double(*v),
        }
        .ok_or_else(|| format!("{v} is not a finite number"))?,
        FieldValue::Text(s) => s.clone(),
    };
    if text.len() > width {
        return Err(format!("'{text}' is wider than {width} columns"));
    }
    Ok(text)
}

/// Print a card whose first value is the keyword.
///
/// Trailing blank fields are dropped. Fixed layouts put eight (small) or
/// four (large) data fields on a line; free layout puts eight per line.
pub fn print_card(fields: &[FieldValue], format: CardFormat) -> Result<String, FormatFailure> {
    let keyword = match fields.first() {
        Some(FieldValue::Text(k)) => k.as_str(),
        _ => {
            return Err(FormatFailure {
                position: 0,
                message: "card has no keyword".into(),
            });
        }
    };
    let end = fields.iter().rposition(|f| !f.is_blank()).unwrap_or(0);
    let data = &fields[1..=end];

    let (per_line, width, first, next) = match format.width {
        FieldWidth::Small => (8, 8, format!("{keyword:<8}"), " ".repeat(8)),
        FieldWidth::Large => (4, 16, format!("{:<8}", format!("{keyword}*")), format!("{:<8}", "*")),
        FieldWidth::Free => return print_free(keyword, data, format.precision),
    };
    if first.len() > 8 {
        return Err(FormatFailure {
            position: 0,
            message: format!("keyword '{keyword}' is wider than 8 columns"),
        });
    }

    let mut out = String::new();
    if data.is_empty() {
        out.push_str(first.trim_end());
        out.push('\n');
        return Ok(out);
    }
    for (line_no, chunk) in data.chunks(per_line).enumerate() {
        let mut line = if line_no == 0 { first.clone() } else { next.clone() };
        for (offset, value) in chunk.iter().enumerate() {
            let position = 1 + line_no * per_line + offset;
            let text = print_field(value, width, format.precision)
                .map_err(|message| FormatFailure { position, message })?;
            line.push_str(&format!("{text:>width$}"));
        }
        let line = line.trim_end();
        out.push_str(if line.is_empty() { "+" } else { line });
        out.push('\n');
    }
    Ok(out)
}

fn print_free(keyword: &str, data: &[FieldValue], precision: Precision) -> Result<String, FormatFailure> {
    let mut out = String::new();
    if data.is_empty() {
        out.push_str(keyword);
        out.push('\n');
        return Ok(out);
    }
    for (line_no, chunk) in data.chunks(8).enumerate() {
        let mut parts = vec![if line_no == 0 { keyword.to_string() } else { String::new() }];
        for (offset, value) in chunk.iter().enumerate() {
            let position = 1 + line_no * 8 + offset;
            let text = print_field(value, 16, precision)
                .map_err(|message| FormatFailure { position, message })?;
            parts.push(text);
        }
        while parts.len() > 1 && parts.last().is_some_and(|p| p.is_empty()) {
            parts.pop();
        }
        if parts.len() == 1 && line_no > 0 {
            out.push(',');
        } else {
            out.push_str(&parts.join(","));
        }
        out.push('\n');
    }
    Ok(out)
}

/// Write increasing unit-step runs of at least `min_run` identifiers as
/// `first THRU last`; everything else is listed one by one.
pub fn collapse_thru(ids: &[u32], min_run: usize) -> Vec<FieldValue> {
    let min_run = min_run.max(2);
    let mut out = Vec::with_capacity(ids.len());
    let mut start = 0;
    while start < ids.len() {
        let mut end = start;
        while end + 1 < ids.len() && ids[end].checked_add(1) == Some(ids[end + 1]) {
            end += 1;
        }
        if end - start + 1 >= min_run {
            out.push(FieldValue::from(ids[start]));
            out.push(FieldValue::from(THRU));
            out.push(FieldValue::from(ids[end]));
        } else {
            out.extend(ids[start..=end].iter().copied().map(FieldValue::from));
        }
        start = end + 1;
    }
    out
}

/// Expand an identifier list that may contain `a THRU b` and `a THRU b BY step`.
/// Blank tokens are skipped. On failure returns the index of the bad token.
pub fn expand_thru<S: AsRef<str>>(tokens: &[S]) -> Result<Vec<u32>, (usize, String)> {
    let tokens: Vec<(usize, &str)> = tokens
        .iter()
        .enumerate()
        .map(|(i, t)| (i, t.as_ref().trim()))
        .filter(|(_, t)| !t.is_empty())
        .collect();
    let parse = |(i, t): (usize, &str)| {
        t.parse::<u32>()
            .map_err(|_| (i, format!("expected an identifier, found '{t}'")))
    };

    let mut ids = Vec::new();
    let mut k = 0;
    while k < tokens.len() {
        let (i, token) = tokens[k];
        if !token.eq_ignore_ascii_case(THRU) {
            ids.push(parse(tokens[k])?);
            k += 1;
            continue;
        }
        let start = *ids
            .last()
            .ok_or_else(|| (i, format!("{THRU} without a starting identifier")))?;
        let end_token = *tokens
            .get(k + 1)
            .ok_or_else(|| (i, format!("{THRU} without an ending identifier")))?;
        let end = parse(end_token)?;
        if end < start {
            return Err((end_token.0, format!("{THRU} range {start}..{end} is decreasing")));
        }
        k += 2;
        let mut step = 1;
        if let Some(&(j, t)) = tokens.get(k) {
            if t.eq_ignore_ascii_case(BY) {
                let step_token = *tokens
                    .get(k + 1)
                    .ok_or_else(|| (j, format!("{BY} without a step")))?;
                step = parse(step_token)?;
                if step == 0 {
                    return Err((step_token.0, format!("{BY} step must be positive")));
                }
                k += 2;
            }
        }
        let mut next = start.checked_add(step);
        while let Some(id) = next.filter(|id| *id <= end) {
            ids.push(id);
            next = id.checked_add(step);
        }
    }
    Ok(ids)
}
