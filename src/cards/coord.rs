use crate::card::Card;
use crate::container::Entity;
use crate::error::{DeckError, Result};
use crate::format::FieldValue;
use crate::xref::Reference;

/// Rectangular coordinate system defined by three points in system `rid`:
/// origin `a`, a point `b` on the z axis and a point `c` in the xz plane.
#[derive(Debug, Clone, PartialEq)]
pub struct Cord2r {
    pub cid: u32,
    pub rid: u32,
    pub a: [f64; 3],
    pub b: [f64; 3],
    pub c: [f64; 3],
}

impl Cord2r {
    fn point(card: &Card, start: usize, names: [&'static str; 3]) -> Result<[f64; 3]> {
        Ok([
            card.double_or_blank(start, names[0], 0.0)?,
            card.double_or_blank(start + 1, names[1], 0.0)?,
            card.double_or_blank(start + 2, names[2], 0.0)?,
        ])
    }
}

impl Entity for Cord2r {
    const KEYWORD: &'static str = "CORD2R";
    const GROUP: &'static str = "COORDS";

    fn from_card(card: &Card) -> Result<Self> {
        card.expect_max_fields(12)?;
        let coord = Self {
            cid: card.id(1, "cid")?,
            rid: card.id_or_blank(2, "rid", 0)?,
            a: Self::point(card, 3, ["a1", "a2", "a3"])?,
            b: Self::point(card, 6, ["b1", "b2", "b3"])?,
            c: Self::point(card, 9, ["c1", "c2", "c3"])?,
        };
        if coord.a == coord.b {
            return Err(DeckError::InvalidField {
                location: card.location().cloned(),
                keyword: Self::KEYWORD.to_string(),
                position: 6,
                name: "b1",
                message: "z axis point coincides with the origin".into(),
            });
        }
        Ok(coord)
    }

    fn id(&self) -> u32 {
        self.cid
    }

    fn raw_fields(&self) -> Vec<FieldValue> {
        let mut fields = vec![
            FieldValue::from(Self::KEYWORD),
            FieldValue::from(self.cid),
            FieldValue::int_or_blank(self.rid, 0),
        ];
        fields.extend([self.a, self.b, self.c].iter().flatten().copied().map(FieldValue::from));
        fields
    }

    fn references(&self) -> Vec<Reference> {
        Reference::optional("rid", &["CORD2R"], self.rid).into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_three_points_across_a_continuation() {
        let card = Card::new("CORD2R", &["2", "1", "0.", "0.", "0.", "0.", "0.", "1.", "1.", "0.", "0."]);
        let coord = Cord2r::from_card(&card).unwrap();
        assert_eq!(coord.b, [0.0, 0.0, 1.0]);
        assert_eq!(coord.c, [1.0, 0.0, 0.0]);
        assert_eq!(coord.references()[0].id, 1);
        assert_eq!(coord.raw_fields().len(), 12);
    }

    #[test]
    fn degenerate_axis_is_rejected() {
        let card = Card::new("CORD2R", &["2", "", "0.", "0.", "0.", "0.", "0.", "0."]);
        assert!(Cord2r::from_card(&card).is_err());
    }
}
