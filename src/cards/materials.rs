use crate::card::Card;
use crate::container::Entity;
use crate::error::{DeckError, Result};
use crate::format::FieldValue;

/// Isotropic material. At least one of the Young's and shear moduli is given.
#[derive(Debug, Clone, PartialEq)]
pub struct Mat1 {
    pub mid: u32,
    pub e: Option<f64>,
    pub g: Option<f64>,
    pub nu: Option<f64>,
    pub rho: f64,
    pub a: f64,
    pub tref: f64,
    pub ge: f64,
}

impl Mat1 {
    pub fn new(mid: u32, e: f64, nu: f64) -> Self {
        Self {
            mid,
            e: Some(e),
            g: None,
            nu: Some(nu),
            rho: 0.0,
            a: 0.0,
            tref: 0.0,
            ge: 0.0,
        }
    }
}

impl Entity for Mat1 {
    const KEYWORD: &'static str = "MAT1";
    const GROUP: &'static str = "MATERIALS";

    fn from_card(card: &Card) -> Result<Self> {
        card.expect_max_fields(9)?;
        let mat = Self {
            mid: card.id(1, "mid")?,
            e: card.optional_double(2, "e")?,
            g: card.optional_double(3, "g")?,
            nu: card.optional_double(4, "nu")?,
            rho: card.double_or_blank(5, "rho", 0.0)?,
            a: card.double_or_blank(6, "a", 0.0)?,
            tref: card.double_or_blank(7, "tref", 0.0)?,
            ge: card.double_or_blank(8, "ge", 0.0)?,
        };
        if mat.e.is_none() && mat.g.is_none() {
            return Err(DeckError::InvalidField {
                location: card.location().cloned(),
                keyword: Self::KEYWORD.to_string(),
                position: 2,
                name: "e",
                message: "one of E and G must be given".into(),
            });
        }
        Ok(mat)
    }

    fn id(&self) -> u32 {
        self.mid
    }

    fn raw_fields(&self) -> Vec<FieldValue> {
        vec![
            FieldValue::from(Self::KEYWORD),
            FieldValue::from(self.mid),
            FieldValue::from(self.e),
            FieldValue::from(self.g),
            FieldValue::from(self.nu),
            FieldValue::real_or_blank(self.rho, 0.0),
            FieldValue::real_or_blank(self.a, 0.0),
            FieldValue::real_or_blank(self.tref, 0.0),
            FieldValue::real_or_blank(self.ge, 0.0),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{CardFormat, print_card};
    use pretty_assertions::assert_eq;

    #[test]
    fn wide_moduli_use_implicit_exponents() {
        let mat = Mat1::from_card(&Card::new("MAT1", &["1", "2.1+11", "", ".3", "7850."])).unwrap();
        assert_eq!(mat.e, Some(2.1e11));
        assert_eq!(
            print_card(&mat.raw_fields(), CardFormat::small()).unwrap(),
            "MAT1           1  2.1+11              .3   7850.\n"
        );
    }

    #[test]
    fn needs_a_modulus() {
        assert!(Mat1::from_card(&Card::new("MAT1", &["1", "", "", ".3"])).is_err());
    }
}
