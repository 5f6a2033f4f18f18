use crate::card::Card;
use crate::container::Entity;
use crate::error::Result;
use crate::format::{FieldValue, collapse_thru};
use crate::xref::Reference;

/// Shortest run of consecutive element ids written as `a THRU b`.
const THRU_RUN: usize = 3;

/// Contact surface made of shell elements.
#[derive(Debug, Clone, PartialEq)]
pub struct Bsurf {
    pub sid: u32,
    pub eids: Vec<u32>,
}

impl Entity for Bsurf {
    const KEYWORD: &'static str = "BSURF";
    const GROUP: &'static str = "CONTACT";

    fn from_card(card: &Card) -> Result<Self> {
        Ok(Self {
            sid: card.id(1, "sid")?,
            eids: card.id_list(2, "eid")?,
        })
    }

    fn id(&self) -> u32 {
        self.sid
    }

    fn raw_fields(&self) -> Vec<FieldValue> {
        let mut fields = vec![FieldValue::from(Self::KEYWORD), FieldValue::from(self.sid)];
        fields.extend(collapse_thru(&self.eids, THRU_RUN));
        fields
    }

    fn references(&self) -> Vec<Reference> {
        self.eids
            .iter()
            .map(|&eid| Reference::new("eid", &["CQUAD4", "CTRIA3"], eid))
            .collect()
    }
}
