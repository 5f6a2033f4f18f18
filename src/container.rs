//! Per-keyword entity containers and the contract every container exposes.

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::RangeInclusive;

use crate::card::Card;
use crate::error::{DeckError, Result};
use crate::format::{CardFormat, FieldValue, print_card};
use crate::location::SourceLocation;
use crate::xref::Reference;

/// A typed record parsed from one card.
pub trait Entity: fmt::Debug + Clone + Send + Sync + 'static {
    /// Keyword of the cards this entity is read from.
    const KEYWORD: &'static str;
    /// Group header the writer files this entity under.
    const GROUP: &'static str;

    fn from_card(card: &Card) -> Result<Self>;

    fn id(&self) -> u32;

    /// Field values to print, keyword first. Fields equal to the value a
    /// blank would be read as should be returned blank.
    fn raw_fields(&self) -> Vec<FieldValue>;

    /// Identifiers of other entities this one names.
    fn references(&self) -> Vec<Reference> {
        Vec::new()
    }
}

/// What `add` does with an identifier that is already stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
    #[default]
    Reject,
    LastWriteWins,
}

#[derive(Debug, Clone)]
struct Stored<T> {
    entity: T,
    comments: Vec<String>,
    location: Option<SourceLocation>,
    ordinal: Option<u64>,
}

/// All entities of one record type, keyed by identifier.
///
/// A container starts out building: `add` parses and stores cards in any
/// order. `build` snapshots the sorted identifier index; range queries and
/// writing need it, and with `strict_build` no more entities are accepted.
#[derive(Debug, Clone)]
pub struct EntityContainer<T: Entity> {
    entities: BTreeMap<u32, Stored<T>>,
    index: Option<Vec<u32>>,
    policy: DuplicatePolicy,
    strict_build: bool,
}

impl<T: Entity> Default for EntityContainer<T> {
    fn default() -> Self {
        Self::new(DuplicatePolicy::default(), true)
    }
}

impl<T: Entity> EntityContainer<T> {
    pub fn new(policy: DuplicatePolicy, strict_build: bool) -> Self {
        Self {
            entities: BTreeMap::new(),
            index: None,
            policy,
            strict_build,
        }
    }

    /// Parse `card` and store the entity along with the card's comments.
    pub fn add(&mut self, card: &Card) -> Result<u32> {
        self.add_at(card, None)
    }

    fn add_at(&mut self, card: &Card, ordinal: Option<u64>) -> Result<u32> {
        let entity = T::from_card(card)?;
        self.store(Stored {
            entity,
            comments: card.comments().to_vec(),
            location: card.location().cloned(),
            ordinal,
        })
    }

    /// Store an entity built in code.
    pub fn insert(&mut self, entity: T, comments: Vec<String>) -> Result<u32> {
        self.store(Stored {
            entity,
            comments,
            location: None,
            ordinal: None,
        })
    }

    fn store(&mut self, stored: Stored<T>) -> Result<u32> {
        if self.index.is_some() {
            if self.strict_build {
                return Err(DeckError::ContainerFinalized {
                    keyword: T::KEYWORD.to_string(),
                });
            }
            self.index = None;
        }
        let id = stored.entity.id();
        if let Some(previous) = self.entities.get(&id) {
            match self.policy {
                DuplicatePolicy::Reject => {
                    return Err(DeckError::DuplicateIdentifier {
                        keyword: T::KEYWORD.to_string(),
                        id,
                        location: stored.location.clone(),
                    });
                }
                DuplicatePolicy::LastWriteWins => {
                    let first = previous
                        .location
                        .as_ref()
                        .map_or_else(|| "<generated>".to_string(), ToString::to_string);
                    tracing::warn!(keyword = T::KEYWORD, id, first = %first, "duplicate identifier; keeping the later card");
                }
            }
        }
        self.entities.insert(id, stored);
        Ok(id)
    }

    /// Snapshot the sorted identifier index. Calling it again is a no-op.
    pub fn build(&mut self) {
        if self.index.is_none() {
            self.index = Some(self.entities.keys().copied().collect());
        }
    }

    pub fn is_built(&self) -> bool {
        self.index.is_some()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn contains(&self, id: u32) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn get(&self, id: u32) -> Result<&T> {
        self.entities
            .get(&id)
            .map(|s| &s.entity)
            .ok_or_else(|| DeckError::UnknownIdentifier {
                keyword: T::KEYWORD.to_string(),
                id,
            })
    }

    /// Every listed entity, failing on the first missing identifier.
    pub fn get_many(&self, ids: &[u32]) -> Result<Vec<&T>> {
        ids.iter().map(|&id| self.get(id)).collect()
    }

    /// Entities whose identifiers fall inside `range`, ascending.
    pub fn range(&self, range: RangeInclusive<u32>) -> Result<Vec<&T>> {
        let index = self.index.as_ref().ok_or_else(|| DeckError::NotBuilt {
            keyword: T::KEYWORD.to_string(),
        })?;
        let start = index.partition_point(|id| id < range.start());
        let end = index.partition_point(|id| id <= range.end());
        index[start..end.max(start)].iter().map(|&id| self.get(id)).collect()
    }

    /// Identifiers in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.entities.keys().copied()
    }

    /// Entities in ascending identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.entities.values().map(|s| &s.entity)
    }

    pub fn comments(&self, id: u32) -> &[String] {
        self.entities.get(&id).map(|s| s.comments.as_slice()).unwrap_or(&[])
    }

    pub fn location(&self, id: u32) -> Option<&SourceLocation> {
        self.entities.get(&id).and_then(|s| s.location.as_ref())
    }

    /// One entity as text, comments first.
    pub fn write_entity(&self, id: u32, format: CardFormat) -> Result<String> {
        let stored = self.entities.get(&id).ok_or_else(|| DeckError::UnknownIdentifier {
            keyword: T::KEYWORD.to_string(),
            id,
        })?;
        let mut out = String::new();
        for comment in &stored.comments {
            out.push('$');
            out.push_str(comment);
            out.push('\n');
        }
        let card = print_card(&stored.entity.raw_fields(), format).map_err(|failure| DeckError::FieldFormat {
            keyword: T::KEYWORD.to_string(),
            id,
            position: failure.position,
            message: failure.message,
        })?;
        out.push_str(&card);
        Ok(out)
    }

    /// All entities in ascending identifier order.
    pub fn write(&self, format: CardFormat) -> Result<String> {
        let index = self.index.as_ref().ok_or_else(|| DeckError::NotBuilt {
            keyword: T::KEYWORD.to_string(),
        })?;
        let mut out = String::new();
        for &id in index {
            out.push_str(&self.write_entity(id, format)?);
        }
        Ok(out)
    }
}

/// The object-safe face of a container, used by the model to hold
/// containers of every record type side by side.
pub trait CardContainer: fmt::Debug + Send + Sync {
    fn keyword(&self) -> &'static str;
    fn group(&self) -> &'static str;
    /// Parse and store a card read at position `ordinal` of the deck.
    fn add_card(&mut self, card: &Card, ordinal: Option<u64>) -> Result<u32>;
    fn build(&mut self);
    fn is_built(&self) -> bool;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn contains(&self, id: u32) -> bool;
    fn ids(&self) -> Vec<u32>;
    /// Every reference held, by referencing identifier, in ascending order.
    fn references(&self) -> Vec<(u32, Reference)>;
    fn location(&self, id: u32) -> Option<&SourceLocation>;
    /// Deck position of every entity that was read from a deck.
    fn ordinals(&self) -> Vec<(u64, u32)>;
    fn write(&self, format: CardFormat) -> Result<String>;
    fn write_entity(&self, id: u32, format: CardFormat) -> Result<String>;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Entity> CardContainer for EntityContainer<T> {
    fn keyword(&self) -> &'static str {
        T::KEYWORD
    }

    fn group(&self) -> &'static str {
        T::GROUP
    }

    fn add_card(&mut self, card: &Card, ordinal: Option<u64>) -> Result<u32> {
        self.add_at(card, ordinal)
    }

    fn build(&mut self) {
        EntityContainer::build(self);
    }

    fn is_built(&self) -> bool {
        EntityContainer::is_built(self)
    }

    fn len(&self) -> usize {
        EntityContainer::len(self)
    }

    fn contains(&self, id: u32) -> bool {
        EntityContainer::contains(self, id)
    }

    fn ids(&self) -> Vec<u32> {
        EntityContainer::ids(self).collect()
    }

    fn references(&self) -> Vec<(u32, Reference)> {
        self.entities
            .iter()
            .flat_map(|(&id, s)| s.entity.references().into_iter().map(move |r| (id, r)))
            .collect()
    }

    fn location(&self, id: u32) -> Option<&SourceLocation> {
        EntityContainer::location(self, id)
    }

    fn ordinals(&self) -> Vec<(u64, u32)> {
        self.entities
            .iter()
            .filter_map(|(&id, s)| s.ordinal.map(|o| (o, id)))
            .collect()
    }

    fn write(&self, format: CardFormat) -> Result<String> {
        EntityContainer::write(self, format)
    }

    fn write_entity(&self, id: u32, format: CardFormat) -> Result<String> {
        EntityContainer::write_entity(self, id, format)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
