//! Logical cards and the assembler that builds them from the flattened deck.

use std::mem;

use crate::error::{DeckError, Result, StructuralKind};
use crate::field::{FieldWidth, LineKind, RawField, TokenizedLine, looks_real, parse_real, tokenize_line};
use crate::format::{FieldValue, expand_thru};
use crate::include::DeckLine;
use crate::location::SourceLocation;
use crate::writer::{BANNER_PREFIX, is_generated_comment};

/// One logical record: keyword field, data fields from every physical line
/// it spans, the comments written above it and where it started.
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    keyword: String,
    fields: Vec<RawField>,
    comments: Vec<String>,
    location: Option<SourceLocation>,
}

impl Card {
    /// Build a card in code from already separated values, as if read from a
    /// free-field line. Such cards have no source location.
    pub fn new<S: AsRef<str>>(keyword: &str, values: &[S]) -> Self {
        let keyword = normalize_keyword(keyword);
        let mut fields = vec![RawField::new(keyword.clone(), 0..8)];
        fields.extend(values.iter().enumerate().map(|(i, v)| {
            let start = (i + 1) * 8;
            RawField::new(v.as_ref().trim(), start..start + 8)
        }));
        trim_trailing_blanks(&mut fields);
        Self {
            keyword,
            fields,
            comments: Vec::new(),
            location: None,
        }
    }

    pub fn with_comment<S: Into<String>>(mut self, comment: S) -> Self {
        self.comments.extend(comment.into().lines().map(str::to_string));
        self
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    /// All fields, keyword first.
    pub fn fields(&self) -> &[RawField] {
        &self.fields
    }

    pub fn nfields(&self) -> usize {
        self.fields.len()
    }

    /// Trimmed text of field `i`; blank past the end of the card.
    pub fn field(&self, i: usize) -> &str {
        self.fields.get(i).map(RawField::value).unwrap_or("")
    }

    pub fn comments(&self) -> &[String] {
        &self.comments
    }

    pub fn location(&self) -> Option<&SourceLocation> {
        self.location.as_ref()
    }

    /// The card re-typed field by field, for writing cards no container owns.
    pub fn to_values(&self) -> Vec<FieldValue> {
        let mut values = vec![FieldValue::Text(self.keyword.clone())];
        values.extend(self.fields[1..].iter().map(|f| FieldValue::from_raw(f.value())));
        values
    }

    fn invalid(&self, position: usize, name: &'static str, message: String) -> DeckError {
        DeckError::InvalidField {
            location: self.location.clone(),
            keyword: self.keyword.clone(),
            position,
            name,
            message,
        }
    }

    /// Fail when data is present beyond the last field a record type defines.
    pub fn expect_max_fields(&self, max: usize) -> Result<()> {
        match (max..self.fields.len()).find(|&i| !self.fields[i].is_blank()) {
            Some(i) => Err(self.invalid(
                i,
                "unused",
                format!("{} takes at most {} fields, found '{}'", self.keyword, max - 1, self.field(i)),
            )),
            None => Ok(()),
        }
    }

    pub fn integer(&self, i: usize, name: &'static str) -> Result<i64> {
        let text = self.field(i);
        if text.is_empty() {
            return Err(self.invalid(i, name, "expected an integer, found a blank".into()));
        }
        text.parse::<i64>()
            .map_err(|_| self.invalid(i, name, format!("expected an integer, found '{text}'")))
    }

    pub fn integer_or_blank(&self, i: usize, name: &'static str, default: i64) -> Result<i64> {
        if self.field(i).is_empty() {
            return Ok(default);
        }
        self.integer(i, name)
    }

    /// A positive identifier.
    pub fn id(&self, i: usize, name: &'static str) -> Result<u32> {
        let value = self.integer(i, name)?;
        u32::try_from(value)
            .ok()
            .filter(|v| *v > 0)
            .ok_or_else(|| self.invalid(i, name, format!("expected a positive identifier, found {value}")))
    }

    /// A positive identifier, or `None` when blank.
    pub fn optional_id(&self, i: usize, name: &'static str) -> Result<Option<u32>> {
        if self.field(i).is_empty() {
            return Ok(None);
        }
        self.id(i, name).map(Some)
    }

    /// A non-negative identifier where 0 (or blank) selects the default.
    pub fn id_or_blank(&self, i: usize, name: &'static str, default: u32) -> Result<u32> {
        let value = self.integer_or_blank(i, name, i64::from(default))?;
        u32::try_from(value)
            .map_err(|_| self.invalid(i, name, format!("expected a non-negative identifier, found {value}")))
    }

    pub fn double(&self, i: usize, name: &'static str) -> Result<f64> {
        let text = self.field(i);
        if text.is_empty() {
            return Err(self.invalid(i, name, "expected a real, found a blank".into()));
        }
        if !looks_real(text) {
            return Err(self.invalid(i, name, format!("expected a real, found '{text}'")));
        }
        parse_real(text).ok_or_else(|| self.invalid(i, name, format!("expected a real, found '{text}'")))
    }

    pub fn double_or_blank(&self, i: usize, name: &'static str, default: f64) -> Result<f64> {
        if self.field(i).is_empty() {
            return Ok(default);
        }
        self.double(i, name)
    }

    pub fn optional_double(&self, i: usize, name: &'static str) -> Result<Option<f64>> {
        if self.field(i).is_empty() {
            return Ok(None);
        }
        self.double(i, name).map(Some)
    }

    /// Fields such as THETA/MCID that hold either kind of number.
    pub fn integer_or_double(&self, i: usize, name: &'static str, default: FieldValue) -> Result<FieldValue> {
        let text = self.field(i);
        if text.is_empty() {
            return Ok(default);
        }
        if looks_real(text) {
            return self.double(i, name).map(FieldValue::Real);
        }
        self.integer(i, name).map(FieldValue::Int)
    }

    /// Constraint component digits (`123456`), or `None` when blank.
    pub fn components_or_blank(&self, i: usize, name: &'static str) -> Result<Option<String>> {
        let text = self.field(i);
        if text.is_empty() {
            return Ok(None);
        }
        let mut seen = [false; 7];
        for ch in text.chars() {
            let digit = ch
                .to_digit(10)
                .filter(|d| (1..=6).contains(d))
                .ok_or_else(|| self.invalid(i, name, format!("'{text}' is not a set of components 1-6")))?;
            if mem::replace(&mut seen[digit as usize], true) {
                return Err(self.invalid(i, name, format!("component {digit} repeated in '{text}'")));
            }
        }
        Ok(Some(text.to_string()))
    }

    /// Identifiers from field `start` to the end of the card, expanding THRU/BY ranges.
    pub fn id_list(&self, start: usize, name: &'static str) -> Result<Vec<u32>> {
        let tokens: Vec<&str> = (start..self.fields.len()).map(|i| self.field(i)).collect();
        let ids = expand_thru(&tokens).map_err(|(offset, message)| self.invalid(start + offset, name, message))?;
        if ids.is_empty() {
            return Err(self.invalid(start, name, "expected at least one identifier".into()));
        }
        if let Some(offset) = tokens.iter().position(|t| t.trim() == "0") {
            return Err(self.invalid(start + offset, name, "identifiers must be positive".into()));
        }
        Ok(ids)
    }
}

fn normalize_keyword(raw: &str) -> String {
    raw.trim().trim_end_matches('*').to_ascii_uppercase()
}

fn trim_trailing_blanks(fields: &mut Vec<RawField>) {
    while fields.len() > 1 && fields.last().is_some_and(RawField::is_blank) {
        fields.pop();
    }
}

/// The deck after section splitting and card assembly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssembledDeck {
    pub executive_control: Vec<String>,
    pub case_control: Vec<String>,
    pub cards: Vec<Card>,
    /// Comments after the last bulk card.
    pub trailing_comments: Vec<String>,
    pub punch: bool,
    pub has_enddata: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Executive,
    CaseControl,
    Bulk,
}

/// A card still accepting continuation lines.
struct OpenCard {
    keyword: String,
    fields: Vec<RawField>,
    comments: Vec<String>,
    location: SourceLocation,
    tag: Option<String>,
}

impl OpenCard {
    fn start(line: TokenizedLine, comments: Vec<String>, location: SourceLocation) -> Self {
        let keyword = normalize_keyword(line.head());
        let mut card = Self {
            keyword,
            fields: vec![line.fields[0].clone()],
            comments,
            location,
            tag: None,
        };
        card.push(line);
        card
    }

    fn push(&mut self, line: TokenizedLine) {
        let per_line = line.fields_per_line();
        let mut data = line.data().to_vec();
        let padded = data.len().div_ceil(per_line).max(1) * per_line;
        let end = data.last().map_or(0, |f| f.columns.end);
        data.resize(padded, RawField::new("", end..end));
        self.fields.extend(data);
        self.comments.extend(line.comment);
        self.tag = line.tag;
    }

    fn finish(mut self) -> Card {
        trim_trailing_blanks(&mut self.fields);
        Card {
            keyword: self.keyword,
            fields: self.fields,
            comments: self.comments,
            location: Some(self.location),
        }
    }
}

/// Groups flattened lines into sections and bulk lines into cards.
#[derive(Debug, Clone, Copy, Default)]
pub struct CardAssembler {
    field_width: Option<FieldWidth>,
    punch: Option<bool>,
}

impl CardAssembler {
    pub fn new(field_width: Option<FieldWidth>, punch: Option<bool>) -> Self {
        Self { field_width, punch }
    }

    pub fn assemble(&self, lines: Vec<DeckLine>) -> Result<AssembledDeck> {
        let punch = self.punch.unwrap_or_else(|| detect_punch(&lines));
        let mut deck = AssembledDeck {
            punch,
            ..AssembledDeck::default()
        };

        let mut section = if punch { Section::Bulk } else { Section::Executive };
        let mut last_marker: Option<SourceLocation> = None;
        let mut last_line: Option<SourceLocation> = None;
        let mut bulk = Vec::new();
        for line in lines {
            last_line = Some(line.location.clone());
            let upper = line.text.trim().to_ascii_uppercase();
            let is_comment = upper.starts_with('$');
            if is_comment && is_generated_comment(&upper) {
                continue;
            }
            if !is_comment && is_begin_bulk(&upper) {
                section = Section::Bulk;
                continue;
            }
            match section {
                Section::Executive if !is_comment && upper.starts_with("CEND") => {
                    section = Section::CaseControl;
                    last_marker = Some(line.location);
                }
                Section::Executive => deck.executive_control.push(line.text),
                Section::CaseControl => deck.case_control.push(line.text),
                Section::Bulk if !is_comment && upper.starts_with("ENDDATA") => {
                    deck.has_enddata = true;
                    break;
                }
                Section::Bulk => bulk.push(line),
            }
        }
        if section != Section::Bulk {
            return Err(match (last_marker, last_line) {
                (Some(location), _) => DeckError::Structural {
                    kind: StructuralKind::UnterminatedSection,
                    location,
                    message: "CEND is not followed by BEGIN BULK".into(),
                },
                (None, Some(location)) => DeckError::Structural {
                    kind: StructuralKind::UnterminatedSection,
                    location,
                    message: "deck ends without CEND or BEGIN BULK; read it in punch mode".into(),
                },
                (None, None) => DeckError::Config {
                    message: "deck is empty and has no bulk data section".into(),
                },
            });
        }

        let (cards, trailing) = self.assemble_cards(bulk)?;
        deck.cards = cards;
        deck.trailing_comments = trailing;
        Ok(deck)
    }

    fn assemble_cards(&self, lines: Vec<DeckLine>) -> Result<(Vec<Card>, Vec<String>)> {
        let mut cards = Vec::new();
        let mut open: Option<OpenCard> = None;
        let mut pending = Vec::new();

        for line in lines {
            let open_tag = open.as_ref().and_then(|c| c.tag.as_deref());
            let tokens = tokenize_line(&line.text, self.field_width, open_tag);
            match tokens.kind {
                LineKind::Blank => {}
                LineKind::Comment => pending.extend(tokens.comment),
                LineKind::Continuation => match open.as_mut() {
                    Some(card) => {
                        card.comments.append(&mut pending);
                        card.push(tokens);
                    }
                    None => {
                        return Err(DeckError::Structural {
                            kind: StructuralKind::MalformedContinuation,
                            location: line.location,
                            message: format!("continuation line '{}' has no card to continue", line.text.trim()),
                        });
                    }
                },
                LineKind::Data => {
                    if let Some(card) = open.take() {
                        cards.push(card.finish());
                    }
                    open = Some(OpenCard::start(tokens, mem::take(&mut pending), line.location));
                }
            }
        }
        if let Some(card) = open {
            cards.push(card.finish());
        }
        Ok((cards, pending))
    }
}

fn is_begin_bulk(upper: &str) -> bool {
    upper.starts_with("BEGIN") && upper.contains("BULK")
}

/// Punch decks carry no CEND or BEGIN BULK, or say so in a written banner.
fn detect_punch(lines: &[DeckLine]) -> bool {
    let banner = format!("{BANNER_PREFIX} PUNCH=TRUE").to_ascii_uppercase();
    let mut markers = false;
    for line in lines {
        let upper = line.text.trim().to_ascii_uppercase();
        if upper == banner {
            return true;
        }
        if !upper.starts_with('$') && (upper.starts_with("CEND") || is_begin_bulk(&upper)) {
            markers = true;
        }
    }
    !markers
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::Path;
    use std::sync::Arc;

    fn deck_lines(text: &str) -> Vec<DeckLine> {
        let path: Arc<Path> = Arc::from(Path::new("test.bdf"));
        text.lines()
            .enumerate()
            .map(|(i, l)| DeckLine {
                text: l.to_string(),
                location: SourceLocation::new(path.clone(), i + 1, 0),
            })
            .collect()
    }

    fn assemble(text: &str) -> Result<AssembledDeck> {
        CardAssembler::default().assemble(deck_lines(text))
    }

    fn values(card: &Card) -> Vec<&str> {
        (0..card.nfields()).map(|i| card.field(i)).collect()
    }

    #[test]
    fn splits_sections_and_stops_at_enddata() {
        let deck = assemble(
            "SOL 101\nCEND\nDISP = ALL\nBEGIN BULK\nGRID,1,,0.,0.,0.\nENDDATA\nGRID,2,,0.,0.,0.\n",
        )
        .unwrap();
        assert!(!deck.punch);
        assert!(deck.has_enddata);
        assert_eq!(deck.executive_control, vec!["SOL 101"]);
        assert_eq!(deck.case_control, vec!["DISP = ALL"]);
        assert_eq!(deck.cards.len(), 1);
        assert_eq!(deck.cards[0].location().unwrap().line, 5);
    }

    #[test]
    fn decks_without_markers_are_punch() {
        let deck = assemble("GRID,1,,0.,0.,0.\nGRID,2,,1.,0.,0.\n").unwrap();
        assert!(deck.punch);
        assert!(!deck.has_enddata);
        assert_eq!(deck.cards.len(), 2);
    }

    #[test]
    fn cend_without_begin_bulk_is_unterminated() {
        let err = assemble("SOL 101\nCEND\nDISP = ALL\n").unwrap_err();
        match err {
            DeckError::Structural { kind, location, .. } => {
                assert_eq!(kind, StructuralKind::UnterminatedSection);
                assert_eq!(location.line, 2);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn bulk_only_deck_outside_punch_mode_is_unterminated() {
        let lines = deck_lines("GRID,1,,0.,0.,0.\nGRID,2,,1.,0.,0.\n");
        let err = CardAssembler::new(None, Some(false)).assemble(lines).unwrap_err();
        match err {
            DeckError::Structural { kind, location, .. } => {
                assert_eq!(kind, StructuralKind::UnterminatedSection);
                assert_eq!(location.line, 2);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn continuation_lines_extend_the_open_card() {
        let deck = assemble(
            "BSURF          3       1       2       3       4       5       6       7\n\
             \x20              8       9      10\n",
        )
        .unwrap();
        let card = &deck.cards[0];
        assert_eq!(card.keyword(), "BSURF");
        assert_eq!(card.nfields(), 12);
        assert_eq!(card.id_list(2, "eids").unwrap(), (1..=10).collect::<Vec<u32>>());
    }

    #[test]
    fn free_continuation_pads_to_line_boundaries() {
        let deck = assemble("BSURF,1101,11,THRU,15,\n,1,2\n").unwrap();
        let card = &deck.cards[0];
        assert_eq!(card.field(5), "");
        assert_eq!(card.field(9), "1");
        assert_eq!(card.field(10), "2");
        assert_eq!(card.id_list(2, "eids").unwrap(), vec![11, 12, 13, 14, 15, 1, 2]);
    }

    #[test]
    fn explicit_tags_continue_cards() {
        let first = format!("{:<72}{}", "CORD2R         1       0      0.      0.      0.      0.      0.      1.", "+C1");
        let text = format!("{first}\n+C1          1.      0.      0.\n");
        let deck = assemble(&text).unwrap();
        assert_eq!(deck.cards.len(), 1);
        assert_eq!(deck.cards[0].field(9), "1.");
        assert_eq!(deck.cards[0].nfields(), 12);
    }

    #[test]
    fn large_cards_merge_star_continuations() {
        let deck = assemble(
            "GRID*                  1                             1.5            -2.5\n\
             *                     3.\n",
        )
        .unwrap();
        let card = &deck.cards[0];
        assert_eq!(card.keyword(), "GRID");
        assert_eq!(values(card), vec!["GRID*", "1", "", "1.5", "-2.5", "3."]);
    }

    #[test]
    fn comments_attach_to_the_following_card() {
        let deck = assemble("$ first node\nGRID,1,,0.,0.,0.\n$ second\nGRID,2,,0.,0.,0.\n$ dangling\n").unwrap();
        assert_eq!(deck.cards[0].comments(), [" first node"]);
        assert_eq!(deck.cards[1].comments(), [" second"]);
        assert_eq!(deck.trailing_comments, vec![" dangling"]);
    }

    #[test]
    fn written_banner_lines_are_not_comments() {
        let deck = assemble("$bulkdeck: version=msc\n$bulkdeck: punch=true\n$NODES\nGRID,1,,0.,0.,0.\n").unwrap();
        assert!(deck.punch);
        assert!(deck.cards[0].comments().is_empty());
    }

    #[test]
    fn continuation_without_a_card_is_malformed() {
        let err = assemble("        1.0     2.0\n").unwrap_err();
        match err {
            DeckError::Structural { kind, location, .. } => {
                assert_eq!(kind, StructuralKind::MalformedContinuation);
                assert_eq!(location.line, 1);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn typed_accessors_validate_fields() {
        let card = Card::new("grid", &["7", "0", "1.5-3", "x", "", "", "123", "8"]);
        assert_eq!(card.keyword(), "GRID");
        assert_eq!(card.id(1, "nid").unwrap(), 7);
        assert_eq!(card.id_or_blank(2, "cp", 0).unwrap(), 0);
        assert_eq!(card.double(3, "x1").unwrap(), 1.5e-3);
        assert!(card.double(4, "x2").is_err());
        assert_eq!(card.double_or_blank(5, "x3", 0.0).unwrap(), 0.0);
        assert_eq!(card.components_or_blank(7, "ps").unwrap().as_deref(), Some("123"));
        assert!(card.double(8, "seid").is_err());
        assert!(card.expect_max_fields(8).is_err());
        assert!(card.expect_max_fields(9).is_ok());
        assert!(card.id(2, "cp").is_err());
    }
}
