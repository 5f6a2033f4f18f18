//! Cross-reference resolution over a built set of containers.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::container::CardContainer;
use crate::error::{DeckError, Result};
use crate::location::SourceLocation;

/// What to do with references whose target does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum XrefMode {
    /// Fail on the first dangling reference.
    #[default]
    Strict,
    /// Record dangling references in the report and keep going.
    Lenient,
}

impl fmt::Display for XrefMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XrefMode::Strict => write!(f, "strict"),
            XrefMode::Lenient => write!(f, "lenient"),
        }
    }
}

/// A raw identifier an entity holds, with the keywords it may point into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Reference {
    pub field: &'static str,
    pub targets: &'static [&'static str],
    pub id: u32,
}

impl Reference {
    pub fn new(field: &'static str, targets: &'static [&'static str], id: u32) -> Self {
        Self { field, targets, id }
    }

    /// `None` for identifier 0, which means "no reference" (basic system, unused material).
    pub fn optional(field: &'static str, targets: &'static [&'static str], id: u32) -> Option<Self> {
        (id != 0).then(|| Self::new(field, targets, id))
    }
}

/// An entity named by keyword and identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Link {
    pub keyword: String,
    pub id: u32,
}

impl Link {
    pub fn new<S: Into<String>>(keyword: S, id: u32) -> Self {
        Self {
            keyword: keyword.into(),
            id,
        }
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.keyword, self.id)
    }
}

/// One resolved reference: the field it came from and the entity it names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedLink {
    pub field: &'static str,
    pub target: Link,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DanglingReference {
    pub keyword: String,
    pub id: u32,
    pub field: &'static str,
    pub targets: &'static [&'static str],
    pub missing: u32,
    pub location: Option<SourceLocation>,
}

impl fmt::Display for DanglingReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(location) = &self.location {
            write!(f, "{location}: ")?;
        }
        write!(
            f,
            "{} {} field {} names {} {} which does not exist",
            self.keyword,
            self.id,
            self.field,
            self.targets.join("/"),
            self.missing
        )
    }
}

/// Outcome of one resolution pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct XrefReport {
    pub resolved: usize,
    pub dangling: Vec<DanglingReference>,
}

impl XrefReport {
    pub fn is_clean(&self) -> bool {
        self.dangling.is_empty()
    }
}

/// Resolved links of every entity, looked up by the referencing entity.
#[derive(Debug, Clone, Default)]
pub struct CrossReferences {
    links: HashMap<Link, Vec<ResolvedLink>>,
}

impl CrossReferences {
    pub fn links_from(&self, keyword: &str, id: u32) -> &[ResolvedLink] {
        self.links
            .get(&Link::new(keyword.to_ascii_uppercase(), id))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.links.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

/// Resolve every reference held by `containers`.
///
/// Containers are visited in registration order and entities in ascending
/// identifier order, so the report is the same for the same input. A target
/// listing several keywords resolves to the first one holding the identifier.
pub fn resolve(
    containers: &[Box<dyn CardContainer>],
    index: &HashMap<String, usize>,
    mode: XrefMode,
) -> Result<(CrossReferences, XrefReport)> {
    if let Some(open) = containers.iter().find(|c| !c.is_built()) {
        return Err(DeckError::NotBuilt {
            keyword: open.keyword().to_string(),
        });
    }

    let mut xref = CrossReferences::default();
    let mut report = XrefReport::default();
    for container in containers {
        for (id, reference) in container.references() {
            let target = reference.targets.iter().find(|keyword| {
                index
                    .get(**keyword)
                    .is_some_and(|&slot| containers[slot].contains(reference.id))
            });
            match target {
                Some(keyword) => {
                    report.resolved += 1;
                    xref.links
                        .entry(Link::new(container.keyword(), id))
                        .or_default()
                        .push(ResolvedLink {
                            field: reference.field,
                            target: Link::new(*keyword, reference.id),
                        });
                }
                None => {
                    let dangling = DanglingReference {
                        keyword: container.keyword().to_string(),
                        id,
                        field: reference.field,
                        targets: reference.targets,
                        missing: reference.id,
                        location: container.location(id).cloned(),
                    };
                    if mode == XrefMode::Strict {
                        return Err(DeckError::DanglingReference(Box::new(dangling)));
                    }
                    tracing::warn!("{dangling}");
                    report.dangling.push(dangling);
                }
            }
        }
    }
    tracing::info!(
        resolved = report.resolved,
        dangling = report.dangling.len(),
        %mode,
        "cross-referenced model"
    );
    Ok((xref, report))
}
