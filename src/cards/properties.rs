use crate::card::Card;
use crate::container::Entity;
use crate::error::Result;
use crate::format::FieldValue;
use crate::xref::Reference;

const DEFAULT_BENDING: f64 = 1.0;
const DEFAULT_TS_T: f64 = 0.833333;

/// Shell property: membrane, bending and transverse shear materials.
#[derive(Debug, Clone, PartialEq)]
pub struct Pshell {
    pub pid: u32,
    pub mid1: Option<u32>,
    pub t: Option<f64>,
    pub mid2: Option<u32>,
    /// Bending stiffness parameter 12I/T^3.
    pub bending: f64,
    pub mid3: Option<u32>,
    /// Transverse shear thickness ratio TS/T.
    pub ts_t: f64,
    pub nsm: f64,
}

impl Pshell {
    pub fn new(pid: u32, mid: u32, t: f64) -> Self {
        Self {
            pid,
            mid1: Some(mid),
            t: Some(t),
            mid2: Some(mid),
            bending: DEFAULT_BENDING,
            mid3: None,
            ts_t: DEFAULT_TS_T,
            nsm: 0.0,
        }
    }
}

impl Entity for Pshell {
    const KEYWORD: &'static str = "PSHELL";
    const GROUP: &'static str = "PROPERTIES";

    fn from_card(card: &Card) -> Result<Self> {
        card.expect_max_fields(9)?;
        Ok(Self {
            pid: card.id(1, "pid")?,
            mid1: card.optional_id(2, "mid1")?,
            t: card.optional_double(3, "t")?,
            mid2: card.optional_id(4, "mid2")?,
            bending: card.double_or_blank(5, "12I/T^3", DEFAULT_BENDING)?,
            mid3: card.optional_id(6, "mid3")?,
            ts_t: card.double_or_blank(7, "ts/t", DEFAULT_TS_T)?,
            nsm: card.double_or_blank(8, "nsm", 0.0)?,
        })
    }

    fn id(&self) -> u32 {
        self.pid
    }

    fn raw_fields(&self) -> Vec<FieldValue> {
        vec![
            FieldValue::from(Self::KEYWORD),
            FieldValue::from(self.pid),
            FieldValue::from(self.mid1),
            FieldValue::from(self.t),
            FieldValue::from(self.mid2),
            FieldValue::real_or_blank(self.bending, DEFAULT_BENDING),
            FieldValue::from(self.mid3),
            FieldValue::real_or_blank(self.ts_t, DEFAULT_TS_T),
            FieldValue::real_or_blank(self.nsm, 0.0),
        ]
    }

    fn references(&self) -> Vec<Reference> {
        [("mid1", self.mid1), ("mid2", self.mid2), ("mid3", self.mid3)]
            .into_iter()
            .filter_map(|(field, mid)| mid.map(|mid| Reference::new(field, &["MAT1"], mid)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{CardFormat, print_card};
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_are_written_blank() {
        let pshell = Pshell::from_card(&Card::new("PSHELL", &["1", "3", ".25", "3"])).unwrap();
        assert_eq!(pshell, Pshell::new(1, 3, 0.25));
        assert_eq!(
            print_card(&pshell.raw_fields(), CardFormat::small()).unwrap(),
            "PSHELL         1       3     .25       3\n"
        );
    }

    #[test]
    fn blank_materials_are_not_references() {
        let pshell = Pshell::from_card(&Card::new("PSHELL", &["1", "3", ".25"])).unwrap();
        let refs: Vec<(&str, u32)> = pshell.references().iter().map(|r| (r.field, r.id)).collect();
        assert_eq!(refs, vec![("mid1", 3)]);
    }
}
