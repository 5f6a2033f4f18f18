//! Serializing a built model back into deck text.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::card::Card;
use crate::config::WriteOptions;
use crate::error::{DeckError, Result};
use crate::format::{CardFormat, print_card};
use crate::model::Model;
use crate::registry::CardRegistry;

/// Prefix of the provenance comments written at the top of every deck.
pub const BANNER_PREFIX: &str = "$bulkdeck:";
/// Dialect written into the banner.
pub const FORMAT_VERSION: &str = "msc";
/// Group header above cards no container accepted.
pub const REJECT_GROUP: &str = "REJECT_CARDS";

/// Order cards are written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardOrder {
    /// Container by container, each in ascending identifier order.
    #[default]
    Grouped,
    /// The order cards were read in; cards created in code follow, grouped.
    Interspersed,
}

impl fmt::Display for CardOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CardOrder::Grouped => write!(f, "grouped"),
            CardOrder::Interspersed => write!(f, "interspersed"),
        }
    }
}

/// Whether the written deck ends with `ENDDATA`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TerminatorPolicy {
    /// Same as the deck that was read; models built in code get none.
    #[default]
    Preserve,
    ForcePresent,
    ForceAbsent,
}

impl TerminatorPolicy {
    pub fn resolve(self, original: bool) -> bool {
        match self {
            TerminatorPolicy::Preserve => original,
            TerminatorPolicy::ForcePresent => true,
            TerminatorPolicy::ForceAbsent => false,
        }
    }
}

/// True for comment lines the writer produces itself: banner lines and
/// group headers. The reader drops them.
pub fn is_generated_comment(line: &str) -> bool {
    let line = line.trim();
    let Some(rest) = line.strip_prefix('$') else {
        return false;
    };
    let banner = &BANNER_PREFIX[1..];
    if rest.get(..banner.len()).is_some_and(|head| head.eq_ignore_ascii_case(banner)) {
        return true;
    }
    let rest = rest.trim();
    rest.eq_ignore_ascii_case(REJECT_GROUP)
        || CardRegistry::groups().iter().any(|group| rest.eq_ignore_ascii_case(group))
}

fn push_comments(out: &mut String, comments: &[String]) {
    for comment in comments {
        out.push('$');
        out.push_str(comment);
        out.push('\n');
    }
}

fn write_rejected(out: &mut String, card: &Card, format: CardFormat) -> Result<()> {
    push_comments(out, card.comments());
    let text = print_card(&card.to_values(), format).map_err(|failure| DeckError::FieldFormat {
        keyword: card.keyword().to_string(),
        id: card.field(1).parse().unwrap_or(0),
        position: failure.position,
        message: failure.message,
    })?;
    out.push_str(&text);
    Ok(())
}

/// Render `model` as deck text.
pub fn write_model(model: &Model, options: &WriteOptions) -> Result<String> {
    if let Some(open) = model.containers().find(|c| !c.is_built()) {
        return Err(DeckError::NotBuilt {
            keyword: open.keyword().to_string(),
        });
    }
    let format = options.card_format();
    let mut out = String::new();

    out.push_str(&format!("{BANNER_PREFIX} version={FORMAT_VERSION}\n"));
    out.push_str(&format!("{BANNER_PREFIX} punch={}\n", model.is_punch()));
    out.push_str(&format!("{BANNER_PREFIX} encoding={}\n", options.encoding));

    if !model.is_punch() {
        for line in model.executive_control() {
            out.push_str(line);
            out.push('\n');
        }
        out.push_str("CEND\n");
        for line in model.case_control() {
            out.push_str(line);
            out.push('\n');
        }
        out.push_str("BEGIN BULK\n");
    }

    match options.order {
        CardOrder::Grouped => write_grouped(model, format, &mut out)?,
        CardOrder::Interspersed => write_interspersed(model, format, &mut out)?,
    }

    push_comments(&mut out, model.trailing_comments());
    if options.enddata.resolve(model.has_enddata()) {
        out.push_str("ENDDATA\n");
    }
    tracing::debug!(
        bytes = out.len(),
        width = %format.width,
        order = %options.order,
        "wrote deck"
    );
    Ok(out)
}

fn write_grouped(model: &Model, format: CardFormat, out: &mut String) -> Result<()> {
    let mut group = None;
    for container in model.containers().filter(|c| !c.is_empty()) {
        if group != Some(container.group()) {
            group = Some(container.group());
            out.push_str(&format!("${}\n", container.group()));
        }
        out.push_str(&container.write(format)?);
    }
    let rejected: Vec<&Card> = model.rejected_cards().collect();
    if !rejected.is_empty() {
        out.push_str(&format!("${REJECT_GROUP}\n"));
        for card in rejected {
            write_rejected(out, card, format)?;
        }
    }
    Ok(())
}

enum Slot<'a> {
    Entity { container: usize, id: u32 },
    Rejected(&'a Card),
}

fn write_interspersed(model: &Model, format: CardFormat, out: &mut String) -> Result<()> {
    let containers: Vec<_> = model.containers().collect();
    let mut slots: Vec<(u64, Slot<'_>)> = Vec::new();
    for (k, container) in containers.iter().enumerate() {
        slots.extend(
            container
                .ordinals()
                .into_iter()
                .map(|(ordinal, id)| (ordinal, Slot::Entity { container: k, id })),
        );
    }
    slots.extend(
        model
            .rejected()
            .iter()
            .filter_map(|r| r.ordinal.map(|ordinal| (ordinal, Slot::Rejected(&r.card)))),
    );
    slots.sort_by_key(|(ordinal, _)| *ordinal);

    for (_, slot) in &slots {
        match slot {
            Slot::Entity { container, id } => out.push_str(&containers[*container].write_entity(*id, format)?),
            Slot::Rejected(card) => write_rejected(out, card, format)?,
        }
    }

    for container in &containers {
        let placed: HashSet<u32> = container.ordinals().into_iter().map(|(_, id)| id).collect();
        for id in container.ids().into_iter().filter(|id| !placed.contains(id)) {
            out.push_str(&container.write_entity(id, format)?);
        }
    }
    for rejected in model.rejected().iter().filter(|r| r.ordinal.is_none()) {
        write_rejected(out, &rejected.card, format)?;
    }
    Ok(())
}
