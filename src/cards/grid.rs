use crate::card::Card;
use crate::container::Entity;
use crate::error::Result;
use crate::format::FieldValue;
use crate::xref::Reference;

/// A node: position `xyz` in system `cp`, displacements in system `cd`.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    pub nid: u32,
    pub cp: u32,
    pub xyz: [f64; 3],
    pub cd: u32,
    /// Permanent single-point constraint components.
    pub ps: Option<String>,
    pub seid: u32,
}

impl Grid {
    pub fn new(nid: u32, xyz: [f64; 3]) -> Self {
        Self {
            nid,
            cp: 0,
            xyz,
            cd: 0,
            ps: None,
            seid: 0,
        }
    }
}

impl Entity for Grid {
    const KEYWORD: &'static str = "GRID";
    const GROUP: &'static str = "NODES";

    fn from_card(card: &Card) -> Result<Self> {
        card.expect_max_fields(9)?;
        Ok(Self {
            nid: card.id(1, "nid")?,
            cp: card.id_or_blank(2, "cp", 0)?,
            xyz: [
                card.double_or_blank(3, "x1", 0.0)?,
                card.double_or_blank(4, "x2", 0.0)?,
                card.double_or_blank(5, "x3", 0.0)?,
            ],
            cd: card.id_or_blank(6, "cd", 0)?,
            ps: card.components_or_blank(7, "ps")?,
            seid: card.id_or_blank(8, "seid", 0)?,
        })
    }

    fn id(&self) -> u32 {
        self.nid
    }

    fn raw_fields(&self) -> Vec<FieldValue> {
        vec![
            FieldValue::from(Self::KEYWORD),
            FieldValue::from(self.nid),
            FieldValue::int_or_blank(self.cp, 0),
            FieldValue::from(self.xyz[0]),
            FieldValue::from(self.xyz[1]),
            FieldValue::from(self.xyz[2]),
            FieldValue::int_or_blank(self.cd, 0),
            FieldValue::from(self.ps.as_deref()),
            FieldValue::int_or_blank(self.seid, 0),
        ]
    }

    fn references(&self) -> Vec<Reference> {
        [
            Reference::optional("cp", &["CORD2R"], self.cp),
            Reference::optional("cd", &["CORD2R"], self.cd),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}
