//! The model: every container of a deck plus what the writer needs to
//! reproduce it.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::ControlFlow;
use std::path::Path;

use crate::card::{AssembledDeck, Card, CardAssembler};
use crate::config::{ReadOptions, WriteOptions};
use crate::container::{CardContainer, DuplicatePolicy, Entity, EntityContainer};
use crate::error::{DeckError, Result};
use crate::include::{DeckLine, Includer};
use crate::registry::CardRegistry;
use crate::writer;
use crate::xref::{self, CrossReferences, Link, ResolvedLink, XrefMode, XrefReport};

/// A card whose keyword has no container, kept so it can be written back.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedCard {
    pub card: Card,
    pub ordinal: Option<u64>,
}

/// Entity counts per keyword.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeckStats {
    pub entities: BTreeMap<String, usize>,
    pub rejected: BTreeMap<String, usize>,
    pub punch: bool,
    pub enddata: bool,
}

impl DeckStats {
    pub fn total(&self) -> usize {
        self.entities.values().sum()
    }
}

#[derive(Debug)]
pub struct Model {
    containers: Vec<Box<dyn CardContainer>>,
    index: HashMap<String, usize>,
    executive_control: Vec<String>,
    case_control: Vec<String>,
    rejected: Vec<RejectedCard>,
    trailing_comments: Vec<String>,
    punch: bool,
    has_enddata: bool,
    disabled: HashSet<String>,
    next_ordinal: u64,
    strict_build: bool,
    built: bool,
    xref: Option<CrossReferences>,
    report: Option<XrefReport>,
}

impl Default for Model {
    fn default() -> Self {
        Self::new()
    }
}

impl Model {
    /// An empty punch model holding every built-in record type.
    pub fn new() -> Self {
        Self::with_policy(DuplicatePolicy::Reject, true)
    }

    pub fn with_policy(policy: DuplicatePolicy, strict_build: bool) -> Self {
        let mut model = Self::empty(strict_build);
        for spec in CardRegistry::list() {
            model.push_container(spec.create(policy, strict_build));
        }
        model
    }

    /// A model with no containers; see [`Model::register`].
    pub fn empty(strict_build: bool) -> Self {
        Self {
            containers: Vec::new(),
            index: HashMap::new(),
            executive_control: Vec::new(),
            case_control: Vec::new(),
            rejected: Vec::new(),
            trailing_comments: Vec::new(),
            punch: true,
            has_enddata: false,
            disabled: HashSet::new(),
            next_ordinal: 0,
            strict_build,
            built: false,
            xref: None,
            report: None,
        }
    }

    fn push_container(&mut self, container: Box<dyn CardContainer>) {
        self.index.insert(container.keyword().to_string(), self.containers.len());
        self.containers.push(container);
    }

    /// Add a container for a record type of your own.
    pub fn register(&mut self, container: Box<dyn CardContainer>) -> Result<()> {
        if self.index.contains_key(container.keyword()) {
            return Err(DeckError::DuplicateKeyword {
                keyword: container.keyword().to_string(),
            });
        }
        self.push_container(container);
        self.built = false;
        Ok(())
    }

    /// Read a deck file and everything it includes.
    pub fn read<P: AsRef<Path>>(path: P, options: &ReadOptions) -> Result<Self> {
        Self::read_with_progress(path, options, |_| ControlFlow::Continue(()))
    }

    /// Read deck text held in memory. Includes resolve against the working directory.
    pub fn read_str(text: &str, options: &ReadOptions) -> Result<Self> {
        let lines = Includer::new(options.include_options()).flatten_str(text, Path::new("<memory>"))?;
        Self::from_lines(lines, options, &mut |_| ControlFlow::Continue(()))
    }

    /// Read a deck, reporting the number of stored entities after every card.
    /// Returning [`ControlFlow::Break`] stops with [`DeckError::Cancelled`].
    pub fn read_with_progress<P, F>(path: P, options: &ReadOptions, mut progress: F) -> Result<Self>
    where
        P: AsRef<Path>,
        F: FnMut(usize) -> ControlFlow<()>,
    {
        let path = path.as_ref();
        tracing::info!(path = %path.display(), "reading deck");
        let lines = Includer::new(options.include_options()).flatten(path)?;
        Self::from_lines(lines, options, &mut progress)
    }

    fn from_lines(
        lines: Vec<DeckLine>,
        options: &ReadOptions,
        progress: &mut dyn FnMut(usize) -> ControlFlow<()>,
    ) -> Result<Self> {
        let deck = CardAssembler::new(options.field_width, options.punch).assemble(lines)?;
        let AssembledDeck {
            executive_control,
            case_control,
            cards,
            trailing_comments,
            punch,
            has_enddata,
        } = deck;

        let mut model = Self::with_policy(options.duplicate_policy, options.strict_build);
        model.disabled = options.disabled_cards.iter().map(|k| k.trim().to_ascii_uppercase()).collect();
        model.executive_control = executive_control;
        model.case_control = case_control;
        model.trailing_comments = trailing_comments;
        model.punch = punch;
        model.has_enddata = has_enddata;

        let ncards = cards.len();
        let mut entities = 0;
        for card in cards {
            if model.disabled.contains(card.keyword()) {
                tracing::debug!(keyword = card.keyword(), "skipping disabled card");
                continue;
            }
            let ordinal = model.next_ordinal;
            if model.ingest(card, Some(ordinal))?.is_some() {
                entities += 1;
            }
            if progress(entities).is_break() {
                return Err(DeckError::Cancelled { entities });
            }
        }
        tracing::info!(
            cards = ncards,
            entities,
            rejected = model.rejected.len(),
            punch,
            "read deck"
        );

        model.build(options.xref)?;
        Ok(model)
    }

    /// Add a card built in code. Returns the identifier it was stored under,
    /// or `None` when no container handles its keyword and it was kept as is.
    pub fn add_card(&mut self, card: Card) -> Result<Option<u32>> {
        if self.disabled.contains(card.keyword()) {
            return Ok(None);
        }
        self.ingest(card, None)
    }

    fn ingest(&mut self, card: Card, ordinal: Option<u64>) -> Result<Option<u32>> {
        if self.built && self.strict_build {
            return Err(DeckError::ContainerFinalized {
                keyword: card.keyword().to_string(),
            });
        }
        self.next_ordinal += 1;
        self.built = false;
        self.xref = None;
        self.report = None;
        match self.index.get(card.keyword()) {
            Some(&slot) => self.containers[slot].add_card(&card, ordinal).map(Some),
            None => {
                tracing::warn!(
                    keyword = card.keyword(),
                    location = %card.location().map_or_else(|| "<generated>".to_string(), ToString::to_string),
                    "no container for card; keeping it verbatim"
                );
                self.rejected.push(RejectedCard { card, ordinal });
                Ok(None)
            }
        }
    }

    /// Finalize every container and, when `mode` is given, resolve
    /// cross-references. Without a mode the returned report is empty.
    pub fn build(&mut self, mode: Option<XrefMode>) -> Result<XrefReport> {
        for container in &mut self.containers {
            container.build();
        }
        self.built = true;
        let Some(mode) = mode else {
            return Ok(XrefReport::default());
        };
        let (xref, report) = xref::resolve(&self.containers, &self.index, mode)?;
        self.xref = Some(xref);
        self.report = Some(report.clone());
        Ok(report)
    }

    pub fn is_built(&self) -> bool {
        self.built
    }

    pub fn containers(&self) -> impl Iterator<Item = &dyn CardContainer> + '_ {
        self.containers.iter().map(|c| c.as_ref())
    }

    pub fn container_by_keyword(&self, keyword: &str) -> Result<&dyn CardContainer> {
        let keyword = keyword.trim().to_ascii_uppercase();
        self.index
            .get(&keyword)
            .map(|&slot| self.containers[slot].as_ref())
            .ok_or(DeckError::UnknownKeyword { keyword })
    }

    pub fn container<T: Entity>(&self) -> Result<&EntityContainer<T>> {
        self.index
            .get(T::KEYWORD)
            .and_then(|&slot| self.containers[slot].as_any().downcast_ref())
            .ok_or_else(|| DeckError::UnknownKeyword {
                keyword: T::KEYWORD.to_string(),
            })
    }

    pub fn container_mut<T: Entity>(&mut self) -> Result<&mut EntityContainer<T>> {
        self.built = false;
        self.xref = None;
        self.report = None;
        let slot = self.index.get(T::KEYWORD).copied();
        slot.and_then(|slot| self.containers[slot].as_any_mut().downcast_mut())
            .ok_or_else(|| DeckError::UnknownKeyword {
                keyword: T::KEYWORD.to_string(),
            })
    }

    pub fn get<T: Entity>(&self, id: u32) -> Result<&T> {
        self.container::<T>()?.get(id)
    }

    /// Links out of one entity, available after a cross-referencing build.
    pub fn links(&self, keyword: &str, id: u32) -> Result<&[ResolvedLink]> {
        let xref = self.xref.as_ref().ok_or_else(|| DeckError::NotBuilt {
            keyword: keyword.to_ascii_uppercase(),
        })?;
        Ok(xref.links_from(keyword, id))
    }

    /// The entity a link points at, typed.
    pub fn target<T: Entity>(&self, link: &Link) -> Result<&T> {
        if !link.keyword.eq_ignore_ascii_case(T::KEYWORD) {
            return Err(DeckError::UnknownIdentifier {
                keyword: T::KEYWORD.to_string(),
                id: link.id,
            });
        }
        self.get(link.id)
    }

    pub fn xref_report(&self) -> Option<&XrefReport> {
        self.report.as_ref()
    }

    pub fn executive_control(&self) -> &[String] {
        &self.executive_control
    }

    pub fn case_control(&self) -> &[String] {
        &self.case_control
    }

    /// Give the model control sections; it is then written as a full deck
    /// rather than a punch deck.
    pub fn set_control_sections(&mut self, executive: Vec<String>, case: Vec<String>) {
        self.executive_control = executive;
        self.case_control = case;
        self.punch = false;
    }

    pub fn trailing_comments(&self) -> &[String] {
        &self.trailing_comments
    }

    pub fn rejected(&self) -> &[RejectedCard] {
        &self.rejected
    }

    pub fn rejected_cards(&self) -> impl Iterator<Item = &Card> + '_ {
        self.rejected.iter().map(|r| &r.card)
    }

    pub fn is_punch(&self) -> bool {
        self.punch
    }

    pub fn has_enddata(&self) -> bool {
        self.has_enddata
    }

    pub fn entity_count(&self) -> usize {
        self.containers.iter().map(|c| c.len()).sum()
    }

    pub fn stats(&self) -> DeckStats {
        let mut stats = DeckStats {
            punch: self.punch,
            enddata: self.has_enddata,
            ..DeckStats::default()
        };
        for container in self.containers.iter().filter(|c| !c.is_empty()) {
            stats.entities.insert(container.keyword().to_string(), container.len());
        }
        for card in self.rejected_cards() {
            *stats.rejected.entry(card.keyword().to_string()).or_default() += 1;
        }
        stats
    }

    pub fn write(&self, options: &WriteOptions) -> Result<String> {
        writer::write_model(self, options)
    }

    pub fn write_file<P: AsRef<Path>>(&self, path: P, options: &WriteOptions) -> Result<()> {
        let path = path.as_ref();
        let io_error = |source| DeckError::Io {
            path: path.to_path_buf(),
            chain: Vec::new(),
            source,
        };
        let bytes = options.encoding.encode(&self.write(options)?).map_err(io_error)?;
        std::fs::write(path, bytes).map_err(io_error)
    }

    /// SHA-256 of the written deck, as lowercase hex.
    pub fn digest(&self, options: &WriteOptions) -> Result<String> {
        let mut hasher = Sha256::new();
        hasher.update(self.write(options)?.as_bytes());
        let digest = hasher.finalize();
        Ok(format!("{digest:02x}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::{Bsurf, Cquad4, Grid};
    use pretty_assertions::assert_eq;
    use std::thread;

    const PANEL: &str = "\
GRID,1,,0.,0.,0.
GRID,2,,1.,0.,0.
GRID,3,,1.,1.,0.
GRID,4,,0.,1.,0.
CQUAD4,10,20,1,2,3,4
PSHELL,20,30,.1,30
MAT1,30,2.1+11,,.3
";

    fn lenient() -> ReadOptions {
        ReadOptions::default().with_xref(Some(XrefMode::Lenient))
    }

    #[test]
    fn reads_and_links_a_panel() {
        let model = Model::read_str(PANEL, &ReadOptions::default()).unwrap();
        assert!(model.is_punch());
        assert_eq!(model.entity_count(), 7);
        let links = model.links("CQUAD4", 10).unwrap();
        assert_eq!(links.len(), 5);
        assert_eq!(links[0].target, Link::new("PSHELL", 20));
        let quad: &Cquad4 = model.get(10).unwrap();
        let node: &Grid = model.target(&links[1].target).unwrap();
        assert_eq!(node.nid, quad.nodes[0]);
    }

    #[test]
    fn strict_mode_fails_on_a_dangling_node() {
        let deck = PANEL.replace("CQUAD4,10,20,1,2,3,4", "CQUAD4,10,20,1,2,3,5");
        let err = Model::read_str(&deck, &ReadOptions::default()).unwrap_err();
        match err {
            DeckError::DanglingReference(dangling) => {
                assert_eq!((dangling.keyword.as_str(), dangling.id, dangling.missing), ("CQUAD4", 10, 5));
                assert_eq!(dangling.location.as_ref().map(|l| l.line), Some(5));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn lenient_mode_reports_every_dangling_reference() {
        let deck = format!("{PANEL}BSURF,1,10,11\nCTRIA3,11,21,1,2,3\n");
        let model = Model::read_str(&deck, &lenient()).unwrap();
        let report = model.xref_report().unwrap();
        let missing: Vec<(&str, u32, u32)> = report
            .dangling
            .iter()
            .map(|d| (d.keyword.as_str(), d.id, d.missing))
            .collect();
        assert_eq!(missing, vec![("CTRIA3", 11, 21)]);
        assert_eq!(model.links("BSURF", 1).unwrap()[1].target, Link::new("CTRIA3", 11));
    }

    #[test]
    fn unknown_cards_are_kept_and_counted() {
        let deck = format!("{PANEL}SPC1,1,123,1,2\n");
        let model = Model::read_str(&deck, &ReadOptions::default()).unwrap();
        let stats = model.stats();
        assert_eq!(stats.rejected.get("SPC1"), Some(&1));
        assert_eq!(stats.entities.get("GRID"), Some(&4));
        assert_eq!(stats.total(), 7);
    }

    #[test]
    fn disabled_cards_are_skipped() {
        let mut options = ReadOptions::default().with_xref(None);
        options.disabled_cards = vec!["cquad4".into()];
        let model = Model::read_str(PANEL, &options).unwrap();
        assert!(model.container::<Cquad4>().unwrap().is_empty());
        assert!(model.rejected().is_empty());
    }

    #[test]
    fn adding_after_build_needs_a_relaxed_model() {
        let mut model = Model::new();
        model.add_card(Card::new("GRID", &["1", "", "0.", "0.", "0."])).unwrap();
        model.build(Some(XrefMode::Strict)).unwrap();
        let late = Card::new("GRID", &["2", "", "0.", "0.", "0."]);
        assert!(matches!(
            model.add_card(late.clone()),
            Err(DeckError::ContainerFinalized { .. })
        ));

        let mut relaxed = Model::with_policy(DuplicatePolicy::Reject, false);
        relaxed.add_card(late).unwrap();
        relaxed.build(None).unwrap();
        relaxed.add_card(Card::new("GRID", &["3", "", "0.", "0.", "0."])).unwrap();
        assert!(!relaxed.is_built());
        relaxed.build(None).unwrap();
        assert_eq!(relaxed.entity_count(), 2);
    }

    #[test]
    fn cancelling_stops_at_the_watermark() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("panel.bdf");
        std::fs::write(&path, PANEL).unwrap();
        let err = Model::read_with_progress(&path, &ReadOptions::default(), |count| {
            if count >= 3 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })
        .unwrap_err();
        assert!(matches!(err, DeckError::Cancelled { entities: 3 }));
    }

    #[test]
    fn registering_a_keyword_twice_fails() {
        let mut model = Model::new();
        let err = model
            .register(Box::new(EntityContainer::<Bsurf>::default()))
            .unwrap_err();
        assert!(matches!(err, DeckError::DuplicateKeyword { .. }));
    }

    #[test]
    fn built_model_is_shared_between_readers() {
        let model = Model::read_str(PANEL, &ReadOptions::default()).unwrap();
        let (text, links) = thread::scope(|scope| {
            let writer = scope.spawn(|| model.write(&WriteOptions::default()));
            let resolver = scope.spawn(|| model.links("CQUAD4", 10).map(<[ResolvedLink]>::len));
            (writer.join().unwrap(), resolver.join().unwrap())
        });
        assert!(text.unwrap().contains("CQUAD4        10      20       1       2       3       4"));
        assert_eq!(links.unwrap(), 5);
    }

    #[test]
    fn digest_tracks_content() {
        let model = Model::read_str(PANEL, &ReadOptions::default()).unwrap();
        let options = WriteOptions::default();
        let digest = model.digest(&options).unwrap();
        assert_eq!(digest.len(), 64);
        assert_eq!(digest, model.digest(&options).unwrap());
        let other = Model::read_str(&PANEL.replace("1.,1.,0.", "1.,2.,0."), &ReadOptions::default()).unwrap();
        assert_ne!(digest, other.digest(&options).unwrap());
    }
}
